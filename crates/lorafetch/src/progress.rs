use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Stages of a single acquisition.
///
/// Direct downloads go `Downloading -> Done`; archives go
/// `Downloading -> Scanning -> Extracting -> Done`. `Failed` can follow any stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireState {
    Downloading,
    Scanning,
    Extracting,
    Done,
    Failed,
}

impl fmt::Display for AcquireState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AcquireState::Downloading => "downloading",
            AcquireState::Scanning => "scanning",
            AcquireState::Extracting => "extracting",
            AcquireState::Done => "done",
            AcquireState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Events emitted while a resource is being acquired
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    StateChanged {
        url: Arc<str>,
        state: AcquireState,
    },
    /// Bytes written so far in the current stage
    Progress {
        url: Arc<str>,
        bytes: u64,
        total_bytes: Option<u64>,
    },
    Finished {
        url: Arc<str>,
        path: PathBuf,
    },
}

/// Receiver for [`ProgressEvent`]s
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;
