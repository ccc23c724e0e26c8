//! beeper - hot-reloading host for the step-sequenced synth module.
//! Uses winit + glutin + glow + imgui-rs for the window; everything drawn
//! comes from the module.

use std::num::NonZeroU32;

use beeper::draw::{to_imgui, DrawBuffer};
use beeper::error::{HostError, Result};
use beeper::input::frame_input;
use beeper::ModuleHost;
use bp_master::BeeperConfig;

use glow::HasContext;
use glutin::config::ConfigTemplateBuilder;
use glutin::context::{ContextApi, ContextAttributesBuilder, Version};
use glutin::display::GetGlDisplay;
use glutin::prelude::*;
use glutin::surface::{SurfaceAttributesBuilder, WindowSurface};
use glutin_winit::DisplayBuilder;

use imgui_glow_renderer::AutoRenderer;
use imgui_winit_support::{HiDpiMode, WinitPlatform};

use raw_window_handle::HasWindowHandle;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::window::{Window, WindowAttributes, WindowId};

#[cfg(feature = "hot-reload")]
type Host = beeper::ReloadHost;
#[cfg(not(feature = "hot-reload"))]
type Host = beeper::StaticHost;

fn main() {
    beeper::init_logging();
    if let Err(e) = run() {
        tracing::error!("{e}");
        eprintln!("beeper: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let config = BeeperConfig::load()?;

    let mut draw = DrawBuffer::boxed();
    let host = <Host as ModuleHost>::load(&config.module, draw.renderer())?;

    let event_loop = EventLoop::new().map_err(window_err)?;

    let mut imgui = imgui::Context::create();
    imgui.set_ini_filename(None);
    imgui.style_mut().use_dark_colors();
    imgui.fonts().add_font(&[imgui::FontSource::DefaultFontData {
        config: Some(imgui::FontConfig {
            size_pixels: 14.0,
            ..Default::default()
        }),
    }]);

    let platform = WinitPlatform::new(&mut imgui);

    let mut state = AppState {
        gl: None,
        imgui,
        platform,
        renderer: None,
        host,
        draw,
        width: config.export.width,
        height: config.export.height,
        error: None,
    };

    event_loop.run_app(&mut state).map_err(window_err)?;
    state.host.cleanup();
    match state.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn window_err(e: impl std::fmt::Display) -> HostError {
    HostError::Window(e.to_string())
}

struct GlObjects {
    window: Window,
    surface: glutin::surface::Surface<WindowSurface>,
    context: glutin::context::PossiblyCurrentContext,
}

struct AppState {
    gl: Option<GlObjects>,
    imgui: imgui::Context,
    platform: WinitPlatform,
    renderer: Option<AutoRenderer>,
    host: Host,
    /// Target of the renderer table handed to the module; must stay boxed.
    draw: Box<DrawBuffer>,
    width: u32,
    height: u32,
    /// Fatal error that stopped the event loop.
    error: Option<HostError>,
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gl.is_some() {
            return;
        }
        if let Err(e) = self.create_window(event_loop).and_then(|_| self.host.init()) {
            self.fail(event_loop, e);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if let Some(gl) = &self.gl {
            let wrapped: winit::event::Event<()> = winit::event::Event::WindowEvent {
                window_id,
                event: event.clone(),
            };
            self.platform
                .handle_event(self.imgui.io_mut(), &gl.window, &wrapped);
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if let Some(gl) = &self.gl {
                    if let (Some(w), Some(h)) = (NonZeroU32::new(size.width), NonZeroU32::new(size.height)) {
                        gl.surface.resize(&gl.context, w, h);
                    }
                }
            }
            WindowEvent::RedrawRequested => match self.render() {
                Ok(()) if self.host.quit_requested() => event_loop.exit(),
                Ok(()) => {}
                Err(e) => self.fail(event_loop, e),
            },
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(gl) = &self.gl {
            gl.window.request_redraw();
        }
    }
}

impl AppState {
    fn fail(&mut self, event_loop: &ActiveEventLoop, error: HostError) {
        self.error.get_or_insert(error);
        event_loop.exit();
    }

    fn create_window(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let (window, gl_config) = create_gl_window(event_loop, self.width, self.height)?;

        self.platform
            .attach_window(self.imgui.io_mut(), &window, HiDpiMode::Default);

        let (surface, context) = create_gl_surface(&window, &gl_config)?;
        let glow_ctx = create_glow_context(&gl_config);
        let renderer = AutoRenderer::new(glow_ctx, &mut self.imgui).map_err(window_err)?;

        self.gl = Some(GlObjects {
            window,
            surface,
            context,
        });
        self.renderer = Some(renderer);
        Ok(())
    }

    /// One host tick: reload check, module update, then present.
    fn render(&mut self) -> Result<()> {
        self.host.reload_if_stale()?;

        let Some(gl) = &self.gl else { return Ok(()) };
        let Some(renderer) = &mut self.renderer else {
            return Ok(());
        };

        self.platform
            .prepare_frame(self.imgui.io_mut(), &gl.window)
            .map_err(window_err)?;

        let ui = self.imgui.new_frame();
        self.host.update(frame_input(ui));
        self.draw.replay(ui);
        self.platform.prepare_render(ui, &gl.window);

        let draw_data = self.imgui.render();

        let [r, g, b, a] = to_imgui(self.draw.clear_color());
        unsafe {
            let gl_ctx = renderer.gl_context();
            gl_ctx.clear_color(r, g, b, a);
            gl_ctx.clear(glow::COLOR_BUFFER_BIT);
        }

        renderer.render(draw_data).map_err(window_err)?;

        gl.surface.swap_buffers(&gl.context).map_err(window_err)
    }
}

fn create_gl_window(
    event_loop: &ActiveEventLoop,
    width: u32,
    height: u32,
) -> Result<(Window, glutin::config::Config)> {
    let window_attrs = WindowAttributes::default()
        .with_inner_size(LogicalSize::new(width as f32, height as f32))
        .with_title("beeper");

    let template = ConfigTemplateBuilder::new();
    let display_builder = DisplayBuilder::new().with_window_attributes(Some(window_attrs));

    let (window, gl_config) = display_builder
        .build(event_loop, template, |configs| {
            configs
                .reduce(|a, b| if a.num_samples() > b.num_samples() { a } else { b })
                .expect("glutin offers at least one config")
        })
        .map_err(window_err)?;

    let window = window.ok_or_else(|| HostError::Window("no window created".to_string()))?;
    Ok((window, gl_config))
}

fn create_gl_surface(
    window: &Window,
    gl_config: &glutin::config::Config,
) -> Result<(
    glutin::surface::Surface<WindowSurface>,
    glutin::context::PossiblyCurrentContext,
)> {
    let raw_handle = window.window_handle().map_err(window_err)?.as_raw();

    let gl_display = gl_config.display();

    let context_attrs = ContextAttributesBuilder::new()
        .with_context_api(ContextApi::OpenGl(Some(Version::new(3, 3))))
        .build(Some(raw_handle));

    let gl_context = unsafe { gl_display.create_context(gl_config, &context_attrs) }.map_err(window_err)?;

    let size = window.inner_size();
    let surface_attrs = SurfaceAttributesBuilder::<WindowSurface>::new().build(
        raw_handle,
        NonZeroU32::MIN.saturating_add(size.width.saturating_sub(1)),
        NonZeroU32::MIN.saturating_add(size.height.saturating_sub(1)),
    );

    let surface =
        unsafe { gl_display.create_window_surface(gl_config, &surface_attrs) }.map_err(window_err)?;

    let context = gl_context.make_current(&surface).map_err(window_err)?;

    Ok((surface, context))
}

fn create_glow_context(gl_config: &glutin::config::Config) -> glow::Context {
    let gl_display = gl_config.display();
    unsafe { glow::Context::from_loader_function_cstr(|s| gl_display.get_proc_address(s)) }
}
