use crate::model::Month;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CfoError {
    #[error("invalid calendar month {0}: must be between 1 and 12")]
    InvalidMonth(u32),

    #[error("invalid month string '{0}': expected YYYY-MM")]
    MonthParse(String),

    #[error("invalid reporting period: start {start} is after end {end}")]
    InvalidPeriod { start: Month, end: Month },

    #[error("no FX rate for {currency} in {month}")]
    FxRateMissing { currency: String, month: Month },

    #[error("{count} FX rates for {currency} in {month}: expected exactly one")]
    FxRateAmbiguous {
        currency: String,
        month: Month,
        count: usize,
    },

    #[error("division by zero: {0} is zero")]
    ZeroDenominator(String),

    #[error("no actual transactions between {start} and {end}")]
    EmptyPeriod { start: Month, end: Month },

    #[error("cash balance table is empty")]
    CashBalanceMissing,

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[cfg(feature = "openai")]
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[cfg(feature = "openai")]
    #[error("chat completion failed: {0}")]
    CompletionFailed(String),

    #[cfg(feature = "openai")]
    #[error("model requested unknown tool: {0}")]
    UnknownTool(String),

    #[cfg(feature = "openai")]
    #[error("tool loop did not terminate within {0} rounds")]
    ToolLoopExceeded(usize),
}

pub type Result<T> = std::result::Result<T, CfoError>;
