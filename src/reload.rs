//! Loading, watching and hot-swapping the module.
//!
//! The host owns one [`HostContext`] for the life of the process. The
//! module's state pointer lives in that context; the host never looks
//! inside it, and only carries it across a reload as a [`StateHandoff`].

use std::ffi::CStr;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use bp_ir::abi::{
    CleanupFn, InitFn, PostReloadFn, PreReloadFn, UpdateFn, CLEANUP_SYMBOL, INIT_SYMBOL,
    POST_RELOAD_SYMBOL, PRE_RELOAD_SYMBOL, UPDATE_SYMBOL,
};
use bp_ir::{FrameInput, HostContext, RendererTable};
use bp_master::config::ModuleConfig;
use libloading::Library;

use crate::error::{HostError, Result};
use crate::host::{check_status, ModuleHost};

/// A build is newer than the loaded image and no build is in progress.
pub fn should_reload(modified: SystemTime, loaded_at: SystemTime, lock_present: bool) -> bool {
    !lock_present && modified > loaded_at
}

/// The on-disk artifact and the lock file a build holds while writing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactWatch {
    library: PathBuf,
    lock: PathBuf,
}

impl ArtifactWatch {
    pub fn new(library: impl Into<PathBuf>, lock: impl Into<PathBuf>) -> Self {
        Self {
            library: library.into(),
            lock: lock.into(),
        }
    }

    pub fn library(&self) -> &Path {
        &self.library
    }

    /// Modification time of the artifact, if it exists.
    pub fn modified(&self) -> Option<SystemTime> {
        std::fs::metadata(&self.library).and_then(|m| m.modified()).ok()
    }

    pub fn lock_present(&self) -> bool {
        self.lock.exists()
    }

    /// Whether the artifact has changed since `loaded_at` and is ready.
    pub fn is_stale(&self, loaded_at: SystemTime) -> bool {
        let Some(modified) = self.modified() else {
            return false;
        };
        let lock_present = self.lock_present();
        if lock_present && modified > loaded_at {
            tracing::debug!(lock = %self.lock.display(), "build in progress, reload deferred");
        }
        should_reload(modified, loaded_at, lock_present)
    }
}

/// The five entry points, copied out of the library.
#[derive(Clone, Copy)]
struct ModuleApi {
    init: InitFn,
    update: UpdateFn,
    cleanup: CleanupFn,
    pre_reload: PreReloadFn,
    post_reload: PostReloadFn,
}

/// One mapped code image.
///
/// The entry points are only valid while `library` is alive, so they never
/// leave this struct.
pub struct LoadedModule {
    api: ModuleApi,
    library: Option<Library>,
    shadow: PathBuf,
    /// Artifact modification time observed when this image was loaded.
    loaded_at: SystemTime,
}

impl LoadedModule {
    /// Copy the artifact to a fresh file in `shadow_dir` and open that copy.
    ///
    /// The loader caches images by path, so reopening the artifact itself
    /// could hand back the old code.
    pub fn load(watch: &ArtifactWatch, shadow_dir: &Path, generation: u64) -> Result<Self> {
        let source = watch.library();
        let loaded_at = watch
            .modified()
            .ok_or_else(|| HostError::MissingArtifact(source.to_path_buf()))?;

        let shadow = shadow_path(source, shadow_dir, generation);
        std::fs::create_dir_all(shadow_dir)
            .and_then(|_| std::fs::copy(source, &shadow))
            .map_err(|source_err| HostError::ShadowCopy {
                path: source.to_path_buf(),
                source: source_err,
            })?;

        // SAFETY: loading runs the library's initialisers; the artifact is
        // our own module build.
        let library = unsafe { Library::new(&shadow) }.map_err(|e| {
            let _ = std::fs::remove_file(&shadow);
            HostError::Load {
                path: source.to_path_buf(),
                source: e,
            }
        })?;

        let api = match resolve(&library, source) {
            Ok(api) => api,
            Err(e) => {
                drop(library);
                let _ = std::fs::remove_file(&shadow);
                return Err(e);
            }
        };

        tracing::info!(path = %source.display(), shadow = %shadow.display(), ?loaded_at, "module loaded");
        Ok(Self {
            api,
            library: Some(library),
            shadow,
            loaded_at,
        })
    }

    pub fn loaded_at(&self) -> SystemTime {
        self.loaded_at
    }
}

impl Drop for LoadedModule {
    fn drop(&mut self) {
        if let Some(library) = self.library.take() {
            if let Err(e) = library.close() {
                tracing::warn!("closing module: {e}");
            }
        }
        let _ = std::fs::remove_file(&self.shadow);
    }
}

fn shadow_path(source: &Path, shadow_dir: &Path, generation: u64) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "module".to_string());
    let name = match source.extension() {
        Some(ext) => format!("{stem}-{}-{generation}.{}", std::process::id(), ext.to_string_lossy()),
        None => format!("{stem}-{}-{generation}", std::process::id()),
    };
    shadow_dir.join(name)
}

fn resolve(library: &Library, path: &Path) -> Result<ModuleApi> {
    Ok(ModuleApi {
        init: symbol::<InitFn>(library, path, INIT_SYMBOL)?,
        update: symbol::<UpdateFn>(library, path, UPDATE_SYMBOL)?,
        cleanup: symbol::<CleanupFn>(library, path, CLEANUP_SYMBOL)?,
        pre_reload: symbol::<PreReloadFn>(library, path, PRE_RELOAD_SYMBOL)?,
        post_reload: symbol::<PostReloadFn>(library, path, POST_RELOAD_SYMBOL)?,
    })
}

fn symbol<T: Copy>(library: &Library, path: &Path, name: &[u8]) -> Result<T> {
    // SAFETY: T is one of the function types the module exports under `name`.
    unsafe { library.get::<T>(name) }
        .map(|sym| *sym)
        .map_err(|e| HostError::MissingSymbol {
            path: path.to_path_buf(),
            symbol: CStr::from_bytes_with_nul(name)
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
            source: e,
        })
}

/// The reload state machine: Loaded, then Stale, Reloading, Loaded again,
/// until exit.
pub struct ReloadHost {
    watch: ArtifactWatch,
    shadow_dir: PathBuf,
    module: Option<LoadedModule>,
    generation: u64,
    ctx: HostContext,
    initialized: bool,
}

impl ReloadHost {
    /// Load the module. A missing or malformed artifact is fatal.
    pub fn load(config: &ModuleConfig, renderer: RendererTable) -> Result<Self> {
        let watch = ArtifactWatch::new(&config.library_path, &config.lock_path);
        let module = LoadedModule::load(&watch, &config.shadow_dir, 0)?;
        Ok(Self {
            watch,
            shadow_dir: config.shadow_dir.clone(),
            module: Some(module),
            generation: 0,
            ctx: HostContext::new(renderer),
            initialized: false,
        })
    }

    fn api(&self) -> Option<ModuleApi> {
        self.module.as_ref().map(|m| m.api)
    }

    /// Call the module's `init`. Called once, after the window exists.
    pub fn init(&mut self) -> Result<()> {
        let Some(api) = self.api() else {
            return Ok(());
        };
        // SAFETY: the entry point belongs to the library held in `self.module`.
        let code = unsafe { (api.init)(&mut self.ctx) };
        check_status(code, |code, reason| HostError::InitFailed { code, reason })?;
        self.initialized = true;
        Ok(())
    }

    /// Run one frame of the module with this frame's input.
    pub fn update(&mut self, input: FrameInput) {
        let Some(api) = self.api() else {
            return;
        };
        self.ctx.input = input;
        // SAFETY: as in `init`.
        unsafe { (api.update)(&mut self.ctx) };
    }

    pub fn quit_requested(&self) -> bool {
        self.ctx.quit_requested
    }

    pub fn is_stale(&self) -> bool {
        self.module
            .as_ref()
            .is_some_and(|m| self.watch.is_stale(m.loaded_at()))
    }

    /// Reload when a newer build is ready. Returns whether a reload happened.
    pub fn reload_if_stale(&mut self) -> Result<bool> {
        if !self.is_stale() {
            return Ok(false);
        }
        self.reload()?;
        Ok(true)
    }

    /// Hand the state out, swap the code image, hand the state back in.
    ///
    /// The module stops its audio device in `pre_reload`, so no callback can
    /// run while the old image is unmapped.
    pub fn reload(&mut self) -> Result<()> {
        tracing::info!(path = %self.watch.library().display(), "reloading module");
        let Some(old) = self.module.take() else {
            return Ok(());
        };

        // SAFETY: the entry point belongs to `old`, which is still loaded.
        let handoff = unsafe { (old.api.pre_reload)(&mut self.ctx) };
        drop(old);

        self.generation += 1;
        let module = LoadedModule::load(&self.watch, &self.shadow_dir, self.generation)?;
        let post_reload = module.api.post_reload;
        self.module = Some(module);

        // SAFETY: the entry point belongs to the library just stored.
        let code = unsafe { post_reload(&mut self.ctx, handoff) };
        check_status(code, |code, reason| HostError::HandoffRejected { code, reason })?;
        tracing::info!(generation = self.generation, "module reloaded");
        Ok(())
    }

    /// Call the module's `cleanup` and unmap it. Safe to call more than once.
    pub fn cleanup(&mut self) {
        if self.initialized {
            if let Some(api) = self.api() {
                // SAFETY: as in `init`.
                unsafe { (api.cleanup)(&mut self.ctx) };
            }
            self.initialized = false;
        }
        self.module = None;
    }
}

impl ModuleHost for ReloadHost {
    fn load(config: &ModuleConfig, renderer: RendererTable) -> Result<Self> {
        ReloadHost::load(config, renderer)
    }

    fn init(&mut self) -> Result<()> {
        ReloadHost::init(self)
    }

    fn update(&mut self, input: FrameInput) {
        ReloadHost::update(self, input)
    }

    fn quit_requested(&self) -> bool {
        ReloadHost::quit_requested(self)
    }

    fn reload_if_stale(&mut self) -> Result<bool> {
        ReloadHost::reload_if_stale(self)
    }

    fn cleanup(&mut self) {
        ReloadHost::cleanup(self)
    }
}

impl Drop for ReloadHost {
    fn drop(&mut self) {
        self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn reload_needs_newer_artifact_and_no_lock() {
        let t0 = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
        let t1 = t0 + Duration::from_secs(1);
        assert!(should_reload(t1, t0, false));
        assert!(!should_reload(t1, t0, true));
        assert!(!should_reload(t0, t0, false));
        assert!(!should_reload(t0, t1, false));
    }

    #[test]
    fn shadow_names_are_unique_per_generation() {
        let dir = Path::new("/tmp/hot");
        let a = shadow_path(Path::new("build/libbp_module.so"), dir, 0);
        let b = shadow_path(Path::new("build/libbp_module.so"), dir, 1);
        assert_ne!(a, b);
        assert_eq!(a.extension().and_then(|e| e.to_str()), Some("so"));
        assert!(a.starts_with(dir));
    }
}
