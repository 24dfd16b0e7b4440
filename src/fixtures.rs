// Resolution and reading of booking fixtures on disk
//
// Two naming conventions live side by side in the same directory:
// booking_<id>.xml for the tree converters and <id>.xml for the flat converter.
use crate::error::{BookingError, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureNaming {
    // booking_<id>.xml
    Prefixed,
    // <id>.xml
    Bare,
}

impl FixtureNaming {
    pub fn file_name(self, confirmation_no: &str) -> String {
        match self {
            FixtureNaming::Prefixed => format!("booking_{}.xml", confirmation_no),
            FixtureNaming::Bare => format!("{}.xml", confirmation_no),
        }
    }
}

// A confirmation number becomes part of a file name, so it must stay a single
// path component inside the directory it is joined onto
pub fn validate_confirmation_no(confirmation_no: &str) -> Result<()> {
    let invalid = confirmation_no.is_empty()
        || confirmation_no.contains(['/', '\\', '\0'])
        || confirmation_no == "."
        || confirmation_no == "..";
    if invalid {
        return Err(BookingError::InvalidConfirmationNo(confirmation_no.to_string()));
    }
    Ok(())
}

pub fn fixture_path(
    data_dir: &Path,
    confirmation_no: &str,
    naming: FixtureNaming,
) -> Result<PathBuf> {
    validate_confirmation_no(confirmation_no)?;
    Ok(data_dir.join(naming.file_name(confirmation_no)))
}

fn map_read_error(err: std::io::Error, path: &Path) -> BookingError {
    if err.kind() == ErrorKind::NotFound {
        BookingError::not_found(path)
    } else {
        BookingError::Io(err)
    }
}

pub fn read_document(path: &Path) -> Result<String> {
    debug!(path = %path.display(), "reading booking document");
    std::fs::read_to_string(path).map_err(|e| map_read_error(e, path))
}

pub async fn read_document_async(path: &Path) -> Result<String> {
    debug!(path = %path.display(), "reading booking document");
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| map_read_error(e, path))
}
