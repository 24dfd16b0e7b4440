// Hotel booking retrieval core

pub mod config;
pub mod error;
pub mod fixtures;
pub mod logging;
pub mod payment;
pub mod retrieval;
pub mod store;
pub mod xml;

// Re-export key types for convenience
pub use config::BookingConfig;
pub use error::{BookingError, Result};
pub use payment::PaymentService;
pub use retrieval::{BookingRetriever, BookingService, ParseStrategy};
pub use store::{BookingRecord, BookingStore, JsonFileBookingStore, MemoryBookingStore};
pub use xml::{
    BookingParser, Children, FlatRecord, FlatValue, ParsedNode, ProjectedBooking, RateAmount,
};
