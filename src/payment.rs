// Payment URL generation from previously stored bookings
use crate::config::BookingConfig;
use crate::error::Result;
use crate::store::{BookingRecord, BookingStore};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use url::form_urlencoded;

// Interpolated when a stored booking carries no amount
pub const MISSING_AMOUNT: &str = "undefined";

pub struct PaymentService<S: BookingStore> {
    store: Arc<S>,
    base_url: String,
}

impl<S: BookingStore> PaymentService<S> {
    pub fn new(store: Arc<S>, base_url: impl Into<String>) -> Self {
        Self {
            store,
            base_url: base_url.into(),
        }
    }

    pub fn from_config(store: Arc<S>, config: &BookingConfig) -> Self {
        Self::new(store, config.payment_base_url.clone())
    }

    #[instrument(skip(self))]
    pub async fn generate_payment_url(&self, confirmation_no: &str) -> Result<String> {
        let record = self.store.get(confirmation_no).await?;

        let amount = booking_amount(&record)?.unwrap_or_else(|| {
            warn!(confirmation_no, "stored booking has no amount");
            MISSING_AMOUNT.to_string()
        });

        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("orderId", confirmation_no)
            .append_pair("amount", &amount)
            .finish();
        let url = format!("{}?{}", self.base_url, query);

        info!(confirmation_no, %url, "generated payment url");
        Ok(url)
    }
}

// Amount of a stored booking, whichever converter produced it
pub fn booking_amount(record: &BookingRecord) -> Result<Option<String>> {
    match record {
        BookingRecord::Projected(booking) => {
            Ok(booking.rateamount.amount.as_ref().map(ToString::to_string))
        }
        other => Ok(find_amount(&other.to_json()?)),
    }
}

// Depth-first, document-order search for the first usable "amount" key
fn find_amount(value: &Value) -> Option<String> {
    match value {
        Value::Object(object) => {
            if let Some(amount) = object.get("amount").and_then(scalar_text) {
                return Some(amount);
            }
            object.values().find_map(find_amount)
        }
        Value::Array(items) => items.iter().find_map(find_amount),
        _ => None,
    }
}

// "120.5", 120.5, ["120.5"], {"#text": "120.5"} or {"_": "120.5"}
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => items.first().and_then(scalar_text),
        Value::Object(object) => object
            .get(crate::xml::TEXT_KEY)
            .or_else(|| object.get(crate::xml::CHAR_KEY))
            .and_then(scalar_text),
        _ => None,
    }
}
