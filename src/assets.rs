//! Asynchronous font loading for text labels.
//!
//! Loaders report completion through a callback that may run on any
//! thread. The [`AssetInbox`] collects those completions so the render
//! tick can insert the finished labels into the scene graph itself.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use glam::Vec3;
use log::error;
use parking_lot::{Condvar, Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::error::AssetLoadError;

/// A loaded font. The glyph data is kept opaque; the rendering engine
/// shapes text from it.
#[derive(Debug, Clone, PartialEq)]
pub struct FontFace {
    pub family: String,
    pub data: Arc<[u8]>,
}

impl FontFace {
    pub fn new(family: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            family: family.into(),
            data: data.into(),
        }
    }
}

pub type FontCallback = Box<dyn FnOnce(Result<FontFace, AssetLoadError>) + Send>;

pub trait AssetLoader: Send + Sync {
    /// Starts loading `path`. `on_loaded` is called exactly once, possibly
    /// before this returns and possibly on another thread.
    fn load_font(&self, path: &str, on_loaded: FontCallback);
}

/// Reads fonts from disk below `root`, one short-lived thread per request.
#[derive(Debug, Clone)]
pub struct FsAssetLoader {
    root: PathBuf,
}

impl FsAssetLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetLoader for FsAssetLoader {
    fn load_font(&self, path: &str, on_loaded: FontCallback) {
        load_on_worker(self.root.join(path), on_loaded, |job| {
            thread::Builder::new()
                .name("font-loader".to_string())
                .spawn(job)
                .map(drop)
        });
    }
}

type LoadJob = Box<dyn FnOnce() + Send>;

/// Reads `path` on a worker started by `spawn`. If the worker never starts,
/// `on_loaded` gets the spawn error instead.
fn load_on_worker(
    path: PathBuf,
    on_loaded: FontCallback,
    spawn: impl FnOnce(LoadJob) -> io::Result<()>,
) {
    let slot = Arc::new(Mutex::new(Some(on_loaded)));
    let job: LoadJob = {
        let slot = Arc::clone(&slot);
        let path = path.clone();
        Box::new(move || {
            let on_loaded = slot.lock().take();
            if let Some(on_loaded) = on_loaded {
                on_loaded(read_font(&path));
            }
        })
    };
    if let Err(source) = spawn(job) {
        error!("unable to start font loader for {}: {source}", path.display());
        let on_loaded = slot.lock().take();
        if let Some(on_loaded) = on_loaded {
            on_loaded(Err(AssetLoadError::Io { path, source }));
        }
    }
}

fn read_font(path: &Path) -> Result<FontFace, AssetLoadError> {
    let data = fs::read(path).map_err(|source| AssetLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if data.is_empty() {
        return Err(AssetLoadError::Empty {
            path: path.to_path_buf(),
        });
    }
    Ok(FontFace::new(family_name(path), data))
}

/// `fonts/optimer_bold.typeface.json` is family `optimer_bold`.
fn family_name(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.split('.').next())
        .filter(|name| !name.is_empty())
        .unwrap_or("unknown")
        .to_string()
}

/// Serves pre-registered fonts and resolves synchronously.
#[derive(Debug, Default)]
pub struct MemoryAssetLoader {
    fonts: RwLock<HashMap<String, FontFace>>,
}

impl MemoryAssetLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, path: impl Into<String>, font: FontFace) {
        self.fonts.write().insert(path.into(), font);
    }
}

impl AssetLoader for MemoryAssetLoader {
    fn load_font(&self, path: &str, on_loaded: FontCallback) {
        let font = self.fonts.read().get(path).cloned();
        on_loaded(font.ok_or_else(|| AssetLoadError::Missing(path.to_string())));
    }
}

impl<T> AssetLoader for Arc<T>
where
    T: AssetLoader + ?Sized,
{
    fn load_font(&self, path: &str, on_loaded: FontCallback) {
        (**self).load_font(path, on_loaded)
    }
}

/// A text label waiting for its font.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRequest {
    pub content: String,
    pub font: String,
    pub size: f32,
    pub color: Color,
    pub position: Vec3,
    /// Euler XYZ in radians.
    #[serde(default)]
    pub rotation: Vec3,
}

#[derive(Debug)]
pub struct LoadedText {
    pub request: TextRequest,
    pub result: Result<FontFace, AssetLoadError>,
}

#[derive(Debug, Default)]
struct InboxState {
    pending: usize,
    completed: Vec<LoadedText>,
}

/// Completed text loads waiting to be picked up by the render tick.
#[derive(Debug, Clone, Default)]
pub struct AssetInbox {
    state: Arc<(Mutex<InboxState>, Condvar)>,
}

impl AssetInbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks `loader` for the request's font; the outcome lands in this
    /// inbox.
    pub fn request_text(&self, loader: &dyn AssetLoader, request: TextRequest) {
        self.state.0.lock().pending += 1;
        let inbox = self.clone();
        let path = request.font.clone();
        loader.load_font(
            &path,
            Box::new(move |result| inbox.complete(LoadedText { request, result })),
        );
    }

    fn complete(&self, loaded: LoadedText) {
        let (lock, ready) = &*self.state;
        let mut state = lock.lock();
        state.pending = state.pending.saturating_sub(1);
        state.completed.push(loaded);
        ready.notify_all();
    }

    /// Takes every completed load, in completion order.
    pub fn drain(&self) -> Vec<LoadedText> {
        std::mem::take(&mut self.state.0.lock().completed)
    }

    /// Loads that have been requested but not completed.
    pub fn pending(&self) -> usize {
        self.state.0.lock().pending
    }

    /// Blocks until nothing is pending or `timeout` passes. Returns whether
    /// all loads finished. Meant for headless runs, never for the render
    /// loop.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let (lock, ready) = &*self.state;
        let mut state = lock.lock();
        if state.pending == 0 {
            return true;
        }
        ready.wait_while_for(&mut state, |state| state.pending > 0, timeout);
        state.pending == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(font: &str) -> TextRequest {
        TextRequest {
            content: "Welcome".to_string(),
            font: font.to_string(),
            size: 0.5,
            color: Color::from_hex(0xff0000),
            position: Vec3::new(-4.0, 5.0, -14.0),
            rotation: Vec3::ZERO,
        }
    }

    #[test]
    fn family_comes_from_the_file_name() {
        assert_eq!(
            family_name(Path::new("fonts/optimer_bold.typeface.json")),
            "optimer_bold"
        );
    }

    #[test]
    fn memory_loader_resolves_into_the_inbox() {
        let loader = MemoryAssetLoader::new();
        loader.register("fonts/a.json", FontFace::new("a", vec![1, 2, 3]));
        let inbox = AssetInbox::new();

        inbox.request_text(&loader, request("fonts/a.json"));
        inbox.request_text(&loader, request("fonts/missing.json"));
        assert_eq!(inbox.pending(), 0);

        let loaded = inbox.drain();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].result.as_ref().unwrap().family, "a");
        assert!(matches!(loaded[1].result, Err(AssetLoadError::Missing(_))));
        assert!(inbox.drain().is_empty());
    }

    struct NoThreads;

    impl AssetLoader for NoThreads {
        fn load_font(&self, path: &str, on_loaded: FontCallback) {
            load_on_worker(PathBuf::from(path), on_loaded, |_job| {
                Err(io::Error::new(io::ErrorKind::Other, "thread limit reached"))
            });
        }
    }

    #[test]
    fn worker_start_failure_still_completes_the_load() {
        let inbox = AssetInbox::new();
        inbox.request_text(&NoThreads, request("fonts/optimer_bold.typeface.json"));
        assert_eq!(inbox.pending(), 0);
        assert!(inbox.wait_idle(Duration::ZERO));

        let loaded = inbox.drain();
        assert_eq!(loaded.len(), 1);
        match &loaded[0].result {
            Err(AssetLoadError::Io { path, source }) => {
                assert_eq!(path, Path::new("fonts/optimer_bold.typeface.json"));
                assert_eq!(source.to_string(), "thread limit reached");
            }
            other => panic!("expected an io error, got {other:?}"),
        }
    }

    #[test]
    fn fs_loader_reports_from_its_thread() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("fonts")).unwrap();
        fs::write(dir.path().join("fonts/optimer_bold.typeface.json"), b"{}").unwrap();
        fs::write(dir.path().join("fonts/blank.json"), b"").unwrap();

        let loader = FsAssetLoader::new(dir.path());
        let inbox = AssetInbox::new();
        inbox.request_text(&loader, request("fonts/optimer_bold.typeface.json"));
        inbox.request_text(&loader, request("fonts/blank.json"));
        inbox.request_text(&loader, request("fonts/nope.json"));
        assert!(inbox.wait_idle(Duration::from_secs(5)));

        let loaded = inbox.drain();
        assert_eq!(loaded.len(), 3);
        let by_font = |font: &str| {
            loaded
                .iter()
                .find(|item| item.request.font == font)
                .map(|item| &item.result)
                .unwrap()
        };
        assert_eq!(
            by_font("fonts/optimer_bold.typeface.json").as_ref().unwrap().family,
            "optimer_bold"
        );
        assert!(matches!(by_font("fonts/blank.json"), Err(AssetLoadError::Empty { .. })));
        assert!(matches!(by_font("fonts/nope.json"), Err(AssetLoadError::Io { .. })));
    }
}
