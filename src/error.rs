// Error types shared by the converters, the stores and the payment step
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Booking data not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Invalid confirmation number: {0:?}")]
    InvalidConfirmationNo(String),

    #[error("Invalid XML structure: {0}")]
    InvalidStructure(String),

    #[error("XML parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, BookingError>;

impl BookingError {
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        BookingError::NotFound { path: path.into() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, BookingError::NotFound { .. })
    }

    // HTTP-equivalent status class for the boundary layer
    pub fn status_class(&self) -> u16 {
        match self {
            BookingError::NotFound { .. } => 404,
            BookingError::InvalidConfirmationNo(_) => 400,
            _ => 500,
        }
    }
}

impl From<quick_xml::Error> for BookingError {
    fn from(err: quick_xml::Error) -> Self {
        BookingError::Parse(err.to_string())
    }
}

impl From<roxmltree::Error> for BookingError {
    fn from(err: roxmltree::Error) -> Self {
        match err {
            roxmltree::Error::NoRootNode => BookingError::InvalidStructure(err.to_string()),
            other => BookingError::Parse(other.to_string()),
        }
    }
}
