//! What the window loop needs from a module host.
//!
//! With the `hot-reload` feature the module is a separate code image that
//! [`crate::ReloadHost`] loads and swaps. Without it, [`StaticHost`] links the
//! module into the binary and calls it directly.

use bp_ir::abi::STATUS_OK;
use bp_ir::{FrameInput, HandoffError, HostContext, RendererTable};
use bp_master::config::ModuleConfig;

use crate::error::{HostError, Result};

pub trait ModuleHost: Sized {
    /// Make the module callable. Does not run its `init` yet.
    fn load(config: &ModuleConfig, renderer: RendererTable) -> Result<Self>;

    /// Run the module's `init`, once the window exists.
    fn init(&mut self) -> Result<()>;

    fn update(&mut self, input: FrameInput);

    fn quit_requested(&self) -> bool;

    /// Swap in a newer build if one is ready. Returns whether it did.
    fn reload_if_stale(&mut self) -> Result<bool>;

    /// Run the module's `cleanup`. Safe to call more than once.
    fn cleanup(&mut self);
}

/// Turn a module status code into `Ok`, or the host error for that call.
pub(crate) fn check_status(code: u32, error: impl FnOnce(u32, &'static str) -> HostError) -> Result<()> {
    if code == STATUS_OK {
        Ok(())
    } else {
        Err(error(code, HandoffError::describe_code(code)))
    }
}

/// The module compiled into the host. Nothing is watched or reloaded.
pub struct StaticHost {
    ctx: HostContext,
    initialized: bool,
}

impl ModuleHost for StaticHost {
    fn load(_config: &ModuleConfig, renderer: RendererTable) -> Result<Self> {
        tracing::info!("module linked statically, hot reload disabled");
        Ok(Self {
            ctx: HostContext::new(renderer),
            initialized: false,
        })
    }

    fn init(&mut self) -> Result<()> {
        let code = bp_module::init(&mut self.ctx);
        check_status(code, |code, reason| HostError::InitFailed { code, reason })?;
        self.initialized = true;
        Ok(())
    }

    fn update(&mut self, input: FrameInput) {
        self.ctx.input = input;
        bp_module::update(&mut self.ctx);
    }

    fn quit_requested(&self) -> bool {
        self.ctx.quit_requested
    }

    fn reload_if_stale(&mut self) -> Result<bool> {
        Ok(false)
    }

    fn cleanup(&mut self) {
        if self.initialized {
            bp_module::cleanup(&mut self.ctx);
            self.initialized = false;
        }
    }
}

impl Drop for StaticHost {
    fn drop(&mut self) {
        self.cleanup();
    }
}
