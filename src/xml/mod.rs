// XML-to-structured-data converters for reservation confirmations
//
// Three strategies read the same class of documents:
// - library: quick-xml event reader producing a generic JSON tree
// - dom: roxmltree DOM walk producing ParsedNode
// - flat: single-level regex scan projected into ProjectedBooking
pub mod dom;
pub mod flat;
pub mod library;

pub use dom::{parsed_node_from_str, Children, ParsedNode, TEXT_KEY};
pub use flat::{flat_record_from_str, FlatRecord, FlatValue, ProjectedBooking, RateAmount};
pub use library::{library_tree_from_str, tree_child_tags, ATTR_KEY, CHAR_KEY};

use crate::config::BookingConfig;
use crate::error::Result;
use crate::fixtures::{fixture_path, FixtureNaming};
use std::path::{Path, PathBuf};

// Stateless apart from the fixture directory, so one instance can serve concurrent requests
#[derive(Debug, Clone)]
pub struct BookingParser {
    data_dir: PathBuf,
}

impl BookingParser {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn from_config(config: &BookingConfig) -> Self {
        Self::new(config.data_dir.clone())
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub(crate) fn document_path(
        &self,
        confirmation_no: &str,
        naming: FixtureNaming,
    ) -> Result<PathBuf> {
        fixture_path(&self.data_dir, confirmation_no, naming)
    }
}

// A small reservation used by the inline tests of every converter
#[cfg(test)]
pub(crate) const SMALL_RESERVATION_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<reservation status="RESERVED">
  <confirmation_no>173903</confirmation_no>
  <stay>
    <arrival>2024-08-18</arrival>
    <departure>2024-08-20</departure>
  </stay>
  <guest type="primary">
    <first_name>John</first_name>
    <last_name>Doe</last_name>
  </guest>
</reservation>
"#;
