use thiserror::Error;

/// Failures raised by the chart pipeline and its controllers.
///
/// Every variant is local to one chart initialization or update; nothing
/// here is retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChartError {
    /// A control the update expects is not present on the page
    #[error("UI element '{0}' not found")]
    MissingUiElement(String),

    #[error("invalid timestamp '{0}'")]
    InvalidTimestamp(String),

    #[error("invalid color format '{0}', expected rgba(r, g, b, a)")]
    InvalidColorFormat(String),

    /// The dataset rows are absent at chart initialization
    #[error("source data is undefined or invalid")]
    MissingSourceData,

    #[error("invalid value '{value}' for control '{id}'")]
    InvalidControlValue { id: String, value: String },
}

pub type ChartResult<T> = std::result::Result<T, ChartError>;
