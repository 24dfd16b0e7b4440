// Flat regex converter and projection into the fixed booking shape
//
// The scan is deliberately single-level: it only sees <tag>text</tag> pairs whose
// content has no '<', so elements with children (or with attributes) never
// surface. Only their innermost leaves do. This is documented behaviour.
use super::BookingParser;
use crate::error::Result;
use crate::fixtures::{read_document, FixtureNaming};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::ser::{Serialize, Serializer};
use std::fmt;
use tracing::{debug, instrument};

// The regex crate has no backreferences; matching names are checked after the scan
static LEAF_ELEMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<([A-Za-z0-9_]+)>([^<]*)</([A-Za-z0-9_]+)>").expect("leaf element pattern")
});

static NUMERIC_LITERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?([0-9]+(\.[0-9]*)?|\.[0-9]+)([eE][+-]?[0-9]+)?$")
        .expect("numeric literal pattern")
});

#[derive(Debug, Clone, PartialEq)]
pub enum FlatValue {
    Number(f64),
    Text(String),
}

// Largest integer an f64 holds exactly
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

impl FlatValue {
    // A value is numeric iff its whole trimmed content is a decimal literal
    // that fits a finite f64; overflowing literals such as 1e400 stay text
    pub fn coerce(content: &str) -> Self {
        let trimmed = content.trim();
        if NUMERIC_LITERAL.is_match(trimmed) {
            if let Ok(number) = trimmed.parse::<f64>() {
                if number.is_finite() {
                    return FlatValue::Number(number);
                }
            }
        }
        FlatValue::Text(content.to_string())
    }

    fn as_integer(&self) -> Option<i64> {
        match self {
            FlatValue::Number(n) if n.fract() == 0.0 && n.abs() <= MAX_EXACT_INTEGER => {
                Some(*n as i64)
            }
            _ => None,
        }
    }
}

impl fmt::Display for FlatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.as_integer(), self) {
            (Some(integer), _) => write!(f, "{}", integer),
            (None, FlatValue::Number(n)) => write!(f, "{}", n),
            (None, FlatValue::Text(s)) => f.write_str(s),
        }
    }
}

// Whole numbers serialize as JSON integers so 173903 does not become 173903.0
impl Serialize for FlatValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match (self.as_integer(), self) {
            (Some(integer), _) => serializer.serialize_i64(integer),
            (None, FlatValue::Number(n)) => serializer.serialize_f64(*n),
            (None, FlatValue::Text(s)) => serializer.serialize_str(s),
        }
    }
}

/// Tag name to scalar value, in first-seen order. A repeated tag overwrites
/// the earlier value in place.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FlatRecord {
    fields: Vec<(String, FlatValue)>,
}

impl FlatRecord {
    pub fn insert(&mut self, tag: &str, value: FlatValue) {
        match self.fields.iter_mut().find(|(key, _)| key == tag) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((tag.to_string(), value)),
        }
    }

    pub fn get(&self, tag: &str) -> Option<&FlatValue> {
        self.fields
            .iter()
            .find(|(key, _)| key == tag)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FlatValue)> {
        self.fields.iter().map(|(key, value)| (key.as_str(), value))
    }
}

pub fn flat_record_from_str(xml: &str) -> FlatRecord {
    let mut record = FlatRecord::default();
    for captures in LEAF_ELEMENT.captures_iter(xml) {
        let (open, content, close) = (&captures[1], &captures[2], &captures[3]);
        if open != close {
            continue;
        }
        record.insert(open, FlatValue::coerce(content));
    }
    record
}

#[derive(Debug, Clone, PartialEq, Default, serde::Serialize)]
pub struct RateAmount {
    pub amount: Option<FlatValue>,
    pub currency: Option<FlatValue>,
}

// Fixed-shape booking; every field absent from the source serializes as null
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize)]
pub struct ProjectedBooking {
    pub confirmation_no: Option<FlatValue>,
    pub resv_name_id: Option<FlatValue>,
    pub arrival: Option<FlatValue>,
    pub departure: Option<FlatValue>,
    pub adults: Option<FlatValue>,
    pub children: Option<FlatValue>,
    pub roomtype: Option<FlatValue>,
    pub ratecode: Option<FlatValue>,
    pub rateamount: RateAmount,
    pub guarantee: Option<FlatValue>,
    pub method_payment: Option<FlatValue>,
    pub computed_resv_status: Option<FlatValue>,
    pub last_name: Option<FlatValue>,
    pub first_name: Option<FlatValue>,
    pub title: Option<FlatValue>,
    pub phone_number: Option<FlatValue>,
    pub email: Option<FlatValue>,
    pub booking_balance: Option<FlatValue>,
    pub booking_created_date: Option<FlatValue>,
}

pub const PROJECTED_FIELDS: [&str; 19] = [
    "confirmation_no",
    "resv_name_id",
    "arrival",
    "departure",
    "adults",
    "children",
    "roomtype",
    "ratecode",
    "rateamount",
    "guarantee",
    "method_payment",
    "computed_resv_status",
    "last_name",
    "first_name",
    "title",
    "phone_number",
    "email",
    "booking_balance",
    "booking_created_date",
];

impl ProjectedBooking {
    pub fn from_flat(record: &FlatRecord) -> Self {
        let field = |tag: &str| record.get(tag).cloned();
        Self {
            confirmation_no: field("confirmation_no"),
            resv_name_id: field("resv_name_id"),
            arrival: field("arrival"),
            departure: field("departure"),
            adults: field("adults"),
            children: field("children"),
            roomtype: field("roomtype"),
            ratecode: field("ratecode"),
            rateamount: RateAmount {
                amount: field("amount"),
                currency: field("currency"),
            },
            guarantee: field("guarantee"),
            method_payment: field("method_payment"),
            computed_resv_status: field("computed_resv_status"),
            last_name: field("last_name"),
            first_name: field("first_name"),
            title: field("title"),
            phone_number: field("phone_number"),
            email: field("email"),
            booking_balance: field("booking_balance"),
            booking_created_date: field("booking_created_date"),
        }
    }
}

impl From<&FlatRecord> for ProjectedBooking {
    fn from(record: &FlatRecord) -> Self {
        ProjectedBooking::from_flat(record)
    }
}

impl BookingParser {
    #[instrument(skip(self))]
    pub fn parse_document_flat(&self, confirmation_no: &str) -> Result<ProjectedBooking> {
        let path = self.document_path(confirmation_no, FixtureNaming::Bare)?;
        let xml = read_document(&path)?;
        let record = flat_record_from_str(&xml);
        debug!(path = %path.display(), tags = record.len(), "flat converter scanned document");
        Ok(ProjectedBooking::from_flat(&record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::SMALL_RESERVATION_XML;
    use serde_json::{json, Value};
    use test_case::test_case;

    #[test]
    fn test_numeric_coercion_on_confirmation_fragment() {
        let record =
            flat_record_from_str("<confirmation_no>173903</confirmation_no><adults>2</adults>");
        assert_eq!(record.get("confirmation_no"), Some(&FlatValue::Number(173903.0)));
        assert_eq!(record.get("adults"), Some(&FlatValue::Number(2.0)));
    }

    #[test_case("2", FlatValue::Number(2.0); "integer")]
    #[test_case(" 120.50 ", FlatValue::Number(120.5); "padded decimal")]
    #[test_case("-3", FlatValue::Number(-3.0); "negative")]
    #[test_case(".5", FlatValue::Number(0.5); "leading dot")]
    #[test_case("1e3", FlatValue::Number(1000.0); "exponent")]
    #[test_case("2024-08-18", FlatValue::Text("2024-08-18".to_string()); "date stays text")]
    #[test_case("USD", FlatValue::Text("USD".to_string()); "word")]
    #[test_case("12abc", FlatValue::Text("12abc".to_string()); "numeric prefix only")]
    #[test_case("", FlatValue::Text(String::new()); "empty")]
    #[test_case("   ", FlatValue::Text("   ".to_string()); "whitespace")]
    #[test_case("0x1F", FlatValue::Text("0x1F".to_string()); "hex is not decimal")]
    #[test_case("1e400", FlatValue::Text("1e400".to_string()); "overflow stays text")]
    #[test_case("-1e400", FlatValue::Text("-1e400".to_string()); "negative overflow stays text")]
    fn test_coerce(content: &str, expected: FlatValue) {
        assert_eq!(FlatValue::coerce(content), expected);
    }

    #[test]
    fn test_last_occurrence_wins() {
        let record = flat_record_from_str("<a>1</a><b>x</b><a>second</a>");
        assert_eq!(record.len(), 2);
        assert_eq!(record.get("a"), Some(&FlatValue::Text("second".to_string())));
        // Overwrite keeps the first-seen position
        assert_eq!(record.iter().map(|(k, _)| k).collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_nested_elements_are_invisible() {
        let record = flat_record_from_str(SMALL_RESERVATION_XML);
        assert!(record.get("stay").is_none());
        assert!(record.get("guest").is_none());
        // Elements with attributes never match the bare <tag> pattern
        assert!(record.get("reservation").is_none());
        assert_eq!(record.get("arrival"), Some(&FlatValue::Text("2024-08-18".to_string())));
        assert_eq!(record.get("first_name"), Some(&FlatValue::Text("John".to_string())));
    }

    #[test]
    fn test_mismatched_close_tag_is_skipped() {
        let record = flat_record_from_str("<a>1</b><c>2</c>");
        assert!(record.get("a").is_none());
        assert_eq!(record.get("c"), Some(&FlatValue::Number(2.0)));
    }

    #[test]
    fn test_projection_has_fixed_shape() {
        let record = flat_record_from_str("<adults>2</adults><unrelated>x</unrelated>");
        let projected = ProjectedBooking::from_flat(&record);
        let value = serde_json::to_value(&projected).unwrap();

        let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, PROJECTED_FIELDS.to_vec());
        assert_eq!(value["adults"], json!(2));
        assert_eq!(value["email"], Value::Null);
        assert_eq!(value["rateamount"], json!({ "amount": null, "currency": null }));
    }

    #[test]
    fn test_projection_maps_rate_amount() {
        let record = flat_record_from_str(
            "<rateamount><amount>120.5</amount><currency>USD</currency></rateamount>",
        );
        let projected = ProjectedBooking::from_flat(&record);
        assert_eq!(projected.rateamount.amount, Some(FlatValue::Number(120.5)));
        assert_eq!(
            projected.rateamount.currency,
            Some(FlatValue::Text("USD".to_string()))
        );
    }

    #[test]
    fn test_display_and_json_for_whole_numbers() {
        assert_eq!(FlatValue::Number(173903.0).to_string(), "173903");
        assert_eq!(FlatValue::Number(120.5).to_string(), "120.5");
        assert_eq!(serde_json::to_value(FlatValue::Number(2.0)).unwrap(), json!(2));
        assert_eq!(serde_json::to_value(FlatValue::Number(0.25)).unwrap(), json!(0.25));
    }

    #[test]
    fn test_overflowing_amount_serializes_as_text() {
        let record = flat_record_from_str("<amount>1e400</amount>");
        let projected = ProjectedBooking::from_flat(&record);
        assert_eq!(
            serde_json::to_value(&projected).unwrap()["rateamount"]["amount"],
            json!("1e400")
        );
    }

    #[test]
    fn test_missing_document_is_not_found() {
        let parser = BookingParser::new("samples/bookings");
        let err = parser.parse_document_flat("does-not-exist").unwrap_err();
        assert!(err.is_not_found());
    }
}
