// Booking retrieval: pick a converter, parse the fixture, hand the result to the store

use crate::config::BookingConfig;
use crate::error::Result;
use crate::store::{BookingRecord, BookingStore};
use crate::xml::BookingParser;
use async_trait::async_trait;
use futures::future::join_all;
use std::fmt;
use std::sync::Arc;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ParseStrategy {
    // quick-xml backed tree, booking_<id>.xml
    #[default]
    Library,
    // DOM walk into ParsedNode, booking_<id>.xml
    #[value(alias = "dom")]
    Custom,
    // regex scan projected into ProjectedBooking, <id>.xml
    #[value(alias = "regex")]
    Flat,
}

impl fmt::Display for ParseStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParseStrategy::Library => "library",
            ParseStrategy::Custom => "custom",
            ParseStrategy::Flat => "flat",
        };
        f.write_str(name)
    }
}

#[async_trait]
pub trait BookingRetriever: Send + Sync + 'static {
    // Parse the booking for a confirmation number and store it
    async fn retrieve(&self, confirmation_no: &str, strategy: ParseStrategy)
        -> Result<BookingRecord>;

    // Independent retrievals run concurrently; results come back in input order
    async fn retrieve_many(
        &self,
        confirmation_nos: &[String],
        strategy: ParseStrategy,
    ) -> Vec<(String, Result<BookingRecord>)>;
}

pub struct BookingService<S: BookingStore> {
    parser: BookingParser,
    store: Arc<S>,
}

impl<S: BookingStore> BookingService<S> {
    pub fn new(parser: BookingParser, store: Arc<S>) -> Self {
        Self { parser, store }
    }

    pub fn from_config(config: &BookingConfig, store: Arc<S>) -> Self {
        Self::new(BookingParser::from_config(config), store)
    }

    pub fn parser(&self) -> &BookingParser {
        &self.parser
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    async fn parse(&self, confirmation_no: &str, strategy: ParseStrategy) -> Result<BookingRecord> {
        match strategy {
            ParseStrategy::Library => self
                .parser
                .parse_document(confirmation_no)
                .await
                .map(BookingRecord::Tree),
            ParseStrategy::Custom => self
                .parser
                .parse_document_custom(confirmation_no)
                .map(BookingRecord::Node),
            ParseStrategy::Flat => self
                .parser
                .parse_document_flat(confirmation_no)
                .map(BookingRecord::Projected),
        }
    }
}

#[async_trait]
impl<S: BookingStore> BookingRetriever for BookingService<S> {
    #[instrument(skip(self))]
    async fn retrieve(
        &self,
        confirmation_no: &str,
        strategy: ParseStrategy,
    ) -> Result<BookingRecord> {
        let record = match self.parse(confirmation_no, strategy).await {
            Ok(record) => record,
            Err(e) => {
                warn!(confirmation_no, %strategy, error = %e, "booking retrieval failed");
                return Err(e);
            }
        };

        self.store.store(confirmation_no, record.clone()).await?;
        info!(confirmation_no, %strategy, "booking retrieved and stored");
        Ok(record)
    }

    async fn retrieve_many(
        &self,
        confirmation_nos: &[String],
        strategy: ParseStrategy,
    ) -> Vec<(String, Result<BookingRecord>)> {
        let lookups = confirmation_nos.iter().map(|confirmation_no| async move {
            let result = self.retrieve(confirmation_no, strategy).await;
            (confirmation_no.clone(), result)
        });
        join_all(lookups).await
    }
}
