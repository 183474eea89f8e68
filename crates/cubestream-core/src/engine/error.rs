use super::config::ConfigError;
use super::timeline::TimelineError;
use crate::core::io::cube::CubeError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Failed to read snapshot '{path}': {source}", path = .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: CubeError,
    },

    #[error("Snapshot '{path}' has {found} atoms but the scene was built for {expected}", path = .path.display())]
    AtomCountMismatch {
        path: PathBuf,
        expected: usize,
        found: usize,
    },

    #[error("Snapshot '{path}' has grid {found:?} but the volume was built for {expected:?}", path = .path.display())]
    GridDimensionsChanged {
        path: PathBuf,
        expected: [usize; 3],
        found: [usize; 3],
    },

    #[error("Volume timeline error: {0}")]
    Timeline(#[from] TimelineError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Stream has already been started")]
    AlreadyStarted,

    #[error("Failed to spawn the producer thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Producer thread panicked")]
    WorkerPanicked,
}

impl StreamError {
    /// Whether the error came from reading or validating a snapshot file.
    pub fn is_snapshot_error(&self) -> bool {
        matches!(
            self,
            StreamError::Parse { .. }
                | StreamError::AtomCountMismatch { .. }
                | StreamError::GridDimensionsChanged { .. }
        )
    }
}
