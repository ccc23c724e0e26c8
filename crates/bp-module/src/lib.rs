//! The hot-swappable half of beeper.
//!
//! Built as a `cdylib` exporting five `extern "C"` entry points. The host
//! calls them with a [`HostContext`] whose `state` pointer this module owns;
//! the host never looks inside it.

pub mod state;
pub mod ui;

use bp_ir::abi::{STATUS_AUDIO_INIT_FAILED, STATUS_CONFIG_FAILED, STATUS_OK};
use bp_ir::{HostContext, StateHandoff};
use bp_master::BeeperConfig;

pub use state::{ModuleState, Preview, UiState, STATE_VERSION};

/// This code image has its own copy of the tracing dispatcher, so it needs
/// its own subscriber after every load.
fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();
}

fn state_mut(ctx: &mut HostContext) -> Option<&mut ModuleState> {
    // SAFETY: `state` is either null or the pointer `init`/`post_reload`
    // stored, which stays valid until `cleanup` or `pre_reload` clears it.
    unsafe { ctx.state.cast::<ModuleState>().as_mut() }
}

/// Allocate state, open audio and start playing.
pub fn init(ctx: &mut HostContext) -> u32 {
    init_logging();
    let config = match BeeperConfig::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{e}");
            return STATUS_CONFIG_FAILED;
        }
    };
    let mut state = match ModuleState::new(config) {
        Ok(state) => Box::new(state),
        Err(e) => {
            tracing::error!("{e}");
            return STATUS_CONFIG_FAILED;
        }
    };
    if let Err(e) = state.start() {
        tracing::error!("audio init failed: {e}");
        return STATUS_AUDIO_INIT_FAILED;
    }
    tracing::info!(
        title = %state.controller.composition().title,
        steps = state.controller.composition().step_count,
        tracks = state.controller.composition().tracks.len(),
        "module initialised"
    );
    ctx.state = Box::into_raw(state).cast();
    STATUS_OK
}

pub fn update(ctx: &mut HostContext) {
    let state = ctx.state.cast::<ModuleState>();
    // SAFETY: see `state_mut`; the context itself is borrowed separately below.
    let Some(state) = (unsafe { state.as_mut() }) else {
        return;
    };
    ui::update(state, ctx);
}

/// Stop audio and free the state.
pub fn cleanup(ctx: &mut HostContext) {
    if state_mut(ctx).is_none() {
        return;
    }
    // SAFETY: non-null, produced by Box::into_raw in `init`/`post_reload`.
    drop(unsafe { Box::from_raw(ctx.state.cast::<ModuleState>()) });
    ctx.state = core::ptr::null_mut();
    tracing::info!("module cleaned up");
}

/// Tear down audio and hand the state out for the next code image.
pub fn pre_reload(ctx: &mut HostContext) -> StateHandoff {
    let Some(state) = state_mut(ctx) else {
        return StateHandoff::empty();
    };
    state.suspend();
    // SAFETY: as in `cleanup`; ownership moves into the handoff.
    let state = unsafe { Box::from_raw(ctx.state.cast::<ModuleState>()) };
    ctx.state = core::ptr::null_mut();
    tracing::info!("module suspended for reload");
    state.into_handoff()
}

/// Adopt state from the previous code image and reopen audio.
pub fn post_reload(ctx: &mut HostContext, handoff: StateHandoff) -> u32 {
    init_logging();
    // SAFETY: a handoff that passes validation came from `pre_reload`.
    let mut state = match unsafe { ModuleState::adopt(handoff) } {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("rejecting handoff: {e}");
            return e.code();
        }
    };
    state.resume();
    tracing::info!(position = state.controller.position(), "module resumed");
    ctx.state = Box::into_raw(state).cast();
    STATUS_OK
}

/// # Safety
/// `ctx` must be null or point to a live `HostContext`.
#[no_mangle]
pub unsafe extern "C" fn beeper_init(ctx: *mut HostContext) -> u32 {
    match ctx.as_mut() {
        Some(ctx) => init(ctx),
        None => STATUS_CONFIG_FAILED,
    }
}

/// # Safety
/// `ctx` must be null or point to a live `HostContext`.
#[no_mangle]
pub unsafe extern "C" fn beeper_update(ctx: *mut HostContext) {
    if let Some(ctx) = ctx.as_mut() {
        update(ctx);
    }
}

/// # Safety
/// `ctx` must be null or point to a live `HostContext`.
#[no_mangle]
pub unsafe extern "C" fn beeper_cleanup(ctx: *mut HostContext) {
    if let Some(ctx) = ctx.as_mut() {
        cleanup(ctx);
    }
}

/// # Safety
/// `ctx` must be null or point to a live `HostContext`.
#[no_mangle]
pub unsafe extern "C" fn beeper_pre_reload(ctx: *mut HostContext) -> StateHandoff {
    match ctx.as_mut() {
        Some(ctx) => pre_reload(ctx),
        None => StateHandoff::empty(),
    }
}

/// # Safety
/// `ctx` must be null or point to a live `HostContext`; `handoff` must come
/// from `beeper_pre_reload`.
#[no_mangle]
pub unsafe extern "C" fn beeper_post_reload(ctx: *mut HostContext, handoff: StateHandoff) -> u32 {
    match ctx.as_mut() {
        Some(ctx) => post_reload(ctx, handoff),
        None => bp_ir::HandoffError::NullState.code(),
    }
}

// Keep the exported signatures in step with the host's function types.
const _: bp_ir::abi::InitFn = beeper_init;
const _: bp_ir::abi::UpdateFn = beeper_update;
const _: bp_ir::abi::CleanupFn = beeper_cleanup;
const _: bp_ir::abi::PreReloadFn = beeper_pre_reload;
const _: bp_ir::abi::PostReloadFn = beeper_post_reload;
