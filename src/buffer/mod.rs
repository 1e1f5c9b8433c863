mod target;

pub use target::{AccessMode, TargetHandle, TargetManager};

use std::path::PathBuf;

use thiserror::Error;

/// ターゲット操作のエラー
#[derive(Debug, Error)]
pub enum BufferError {
    #[error(
        "The input file '{}' could not be opened\n errno is '{} - {}'",
        .path.display(),
        .source.raw_os_error().unwrap_or(0),
        .source
    )]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("'{}' is open read-only", .0.display())]
    ReadOnly(PathBuf),

    #[error("no target is open")]
    NoTarget,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
