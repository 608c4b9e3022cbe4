//! Ordered preload of AR runtime assets.
//!
//! The AR studio needs its runtime files (capture model, colored variant,
//! page marker) fully loaded before any capture feature is enabled. Files
//! load strictly in manifest order; the first failure stops the preload and
//! names the file that broke. There is no retry.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, TryRecvError};
use std::thread;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PreloadError {
    #[error("failed to load runtime asset {path}: {source}")]
    Fetch {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// One fully loaded runtime asset.
#[derive(Debug, Clone)]
pub struct LoadedAsset {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

/// Events sent from the loader thread.
enum PreloadEvent {
    Loaded { path: PathBuf, index: usize },
    Ready(Vec<LoadedAsset>),
    Failed(PreloadError),
}

/// Where the preload currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreloadState {
    Loading,
    Ready,
    Failed(String),
}

/// Load every manifest file in order, stopping at the first failure.
///
/// The returned set is complete by construction: an `Ok` means all files
/// loaded, in order.
pub fn preload_with<F>(manifest: &[PathBuf], mut fetch: F) -> Result<Vec<LoadedAsset>, PreloadError>
where
    F: FnMut(&Path) -> io::Result<Vec<u8>>,
{
    let mut loaded = Vec::with_capacity(manifest.len());
    for path in manifest {
        let bytes = fetch(path).map_err(|source| PreloadError::Fetch {
            path: path.clone(),
            source,
        })?;
        loaded.push(LoadedAsset {
            path: path.clone(),
            bytes,
        });
    }
    Ok(loaded)
}

/// Background preloader polled by the UI each frame.
pub struct RuntimePreloader {
    receiver: Receiver<PreloadEvent>,
    state: PreloadState,
    loaded: usize,
    total: usize,
}

impl RuntimePreloader {
    /// Start loading from disk on a background thread.
    pub fn spawn(manifest: Vec<PathBuf>) -> Self {
        Self::spawn_with(manifest, |path| std::fs::read(path))
    }

    /// Start loading with a custom fetch function.
    pub fn spawn_with<F>(manifest: Vec<PathBuf>, mut fetch: F) -> Self
    where
        F: FnMut(&Path) -> io::Result<Vec<u8>> + Send + 'static,
    {
        let (sender, receiver) = channel();
        let total = manifest.len();
        thread::spawn(move || {
            let mut loaded = Vec::with_capacity(manifest.len());
            for (index, path) in manifest.iter().enumerate() {
                match fetch(path) {
                    Ok(bytes) => {
                        loaded.push(LoadedAsset {
                            path: path.clone(),
                            bytes,
                        });
                        let _ = sender.send(PreloadEvent::Loaded {
                            path: path.clone(),
                            index,
                        });
                    }
                    Err(source) => {
                        let _ = sender.send(PreloadEvent::Failed(PreloadError::Fetch {
                            path: path.clone(),
                            source,
                        }));
                        return;
                    }
                }
            }
            let _ = sender.send(PreloadEvent::Ready(loaded));
        });
        Self {
            receiver,
            state: PreloadState::Loading,
            loaded: 0,
            total,
        }
    }

    /// Drain pending loader events. Returns the assets on the transition to
    /// ready; afterwards only the state remains.
    pub fn poll(&mut self) -> Option<Vec<LoadedAsset>> {
        let mut ready = None;
        loop {
            match self.receiver.try_recv() {
                Ok(PreloadEvent::Loaded { path, index }) => {
                    self.loaded = index + 1;
                    log::info!(
                        "runtime asset {}/{} loaded: {}",
                        index + 1,
                        self.total,
                        path.display()
                    );
                }
                Ok(PreloadEvent::Ready(assets)) => {
                    self.state = PreloadState::Ready;
                    log::info!("AR runtime ready ({} assets)", assets.len());
                    ready = Some(assets);
                }
                Ok(PreloadEvent::Failed(err)) => {
                    log::error!("{}", err);
                    self.state = PreloadState::Failed(err.to_string());
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        ready
    }

    pub fn state(&self) -> &PreloadState {
        &self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == PreloadState::Ready
    }

    /// (loaded, total) for the progress display.
    pub fn progress(&self) -> (usize, usize) {
        (self.loaded, self.total)
    }
}
