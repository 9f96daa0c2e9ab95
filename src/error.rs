use thiserror::Error;

/// 对账核心统一错误类型
/// 前四类是本地操作错误, 后四类对应上游协作方失败
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("extraction failed: {0}")]
    Extraction(String),

    #[error("match service failed: {0}")]
    MatchService(String),

    #[error("persistence failed: {0}")]
    Persistence(String),

    #[error("export failed: {0}")]
    Export(String),
}

pub type ReconcileResult<T> = Result<T, ReconcileError>;

impl From<reqwest::Error> for ReconcileError {
    fn from(error: reqwest::Error) -> Self {
        ReconcileError::Transport(error.to_string())
    }
}

impl From<csv::Error> for ReconcileError {
    fn from(error: csv::Error) -> Self {
        ReconcileError::Export(error.to_string())
    }
}
