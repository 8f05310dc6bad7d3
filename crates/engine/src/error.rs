use taflow_core::{IndicatorError, ParamError};

/// Errors surfaced by the instance manager.
///
/// Unknown instance keys are not errors: update and query paths report them
/// as absence, since deactivation can race with live feeds.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("unknown indicator '{0}'")]
    UnknownIndicator(String),
    #[error("invalid parameter: {0}")]
    InvalidParameter(#[from] ParamError),
    #[error("insufficient data: {required} candles required, {available} available")]
    InsufficientData { required: usize, available: usize },
    #[error("indicator error: {0}")]
    Indicator(IndicatorError),
    #[error("concurrent update of instance '{0}'")]
    ReentrantUpdate(String),
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<IndicatorError> for EngineError {
    fn from(err: IndicatorError) -> Self {
        match err {
            IndicatorError::InvalidParameter(p) => EngineError::InvalidParameter(p),
            other => EngineError::Indicator(other),
        }
    }
}
