//! The quote document model.
//!
//! A quote is a title, a client, an intro paragraph and a list of labelled
//! groups of priced line items. It is stored as a single JSON document; this
//! module owns both the lenient reading rules and the canonical writing rules.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::Result;

/// A complete price quote.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Heading of the quote sheet.
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,

    /// Who the quote is addressed to.
    #[serde(default, deserialize_with = "lenient_string")]
    pub client: String,

    /// Free-form introduction; newlines are preserved.
    #[serde(default, deserialize_with = "lenient_string")]
    pub intro: String,

    /// Line item groups in display order.
    #[serde(default, deserialize_with = "lenient_list")]
    pub groups: Vec<Group>,

    /// Sum of all item prices as of the last save.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_total",
        serialize_with = "serialize_optional_number"
    )]
    pub total: Option<f64>,
}

/// A labelled block of line items.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Group {
    /// Label shown in the spanning group cell.
    #[serde(default, deserialize_with = "lenient_string")]
    pub label: String,

    /// Items in display order.
    #[serde(default, deserialize_with = "lenient_list")]
    pub items: Vec<Item>,
}

/// A single priced line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// What is being quoted.
    #[serde(rename = "type", default, deserialize_with = "lenient_string")]
    pub kind: String,

    /// Where it comes from (brand, country, supplier).
    #[serde(default, deserialize_with = "lenient_string")]
    pub origin: String,

    /// Unit price.
    #[serde(
        default,
        deserialize_with = "lenient_price",
        serialize_with = "serialize_number"
    )]
    pub price: f64,

    /// Free-form remarks.
    #[serde(default, deserialize_with = "lenient_string")]
    pub notes: String,

    /// Draw the type, origin and price cells emphasised.
    #[serde(
        default,
        skip_serializing_if = "is_false",
        deserialize_with = "lenient_flag"
    )]
    pub highlight: bool,
}

impl Quote {
    /// Parse a document leniently from JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not JSON or the top level is not an
    /// object.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Serialize as two-space indented JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_pretty_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Trim text, drop empty rows and recompute the stored total.
    ///
    /// Items with no type, no origin and a zero price are dropped. Groups with
    /// no label and no remaining items are dropped.
    #[must_use]
    pub fn normalized(self) -> Self {
        let groups: Vec<Group> = self
            .groups
            .into_iter()
            .map(Group::normalized)
            .filter(|group| !group.label.is_empty() || !group.items.is_empty())
            .collect();

        let mut quote = Self {
            title: self.title.trim().to_string(),
            client: self.client.trim().to_string(),
            intro: self.intro.trim().to_string(),
            groups,
            total: None,
        };
        quote.total = Some(quote.computed_total());
        quote
    }

    /// Sum of every item price across all groups.
    #[must_use]
    pub fn computed_total(&self) -> f64 {
        self.groups.iter().map(Group::subtotal).sum()
    }

    /// Number of items across all groups.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.groups.iter().map(|group| group.items.len()).sum()
    }

    /// True when nothing has been entered at all.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.title.is_empty()
            && self.client.is_empty()
            && self.intro.is_empty()
            && self.groups.is_empty()
    }
}

impl Group {
    /// Sum of this group's item prices.
    #[must_use]
    pub fn subtotal(&self) -> f64 {
        self.items.iter().map(|item| item.price).sum()
    }

    fn normalized(self) -> Self {
        Self {
            label: self.label.trim().to_string(),
            items: self
                .items
                .into_iter()
                .map(Item::normalized)
                .filter(|item| !item.is_empty())
                .collect(),
        }
    }
}

impl Item {
    /// True when the row carries no type, no origin and no price.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kind.is_empty() && self.origin.is_empty() && self.price == 0.0
    }

    fn normalized(self) -> Self {
        Self {
            kind: self.kind.trim().to_string(),
            origin: self.origin.trim().to_string(),
            price: self.price,
            notes: self.notes.trim().to_string(),
            highlight: self.highlight,
        }
    }
}

/// Coerce a loosely typed value into a finite number, or zero.
///
/// Numbers pass through, strings are parsed after trimming (an empty string is
/// zero), booleans count as 0/1. Anything else is zero.
#[must_use]
pub fn coerce_number(value: &Value) -> f64 {
    let number = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => parse_number(s),
        Value::Bool(b) => f64::from(u8::from(*b)),
        _ => 0.0,
    };
    if number.is_finite() {
        number
    } else {
        0.0
    }
}

/// Parse a user-typed number, falling back to zero.
#[must_use]
pub fn parse_number(raw: &str) -> f64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed.parse::<f64>() {
        Ok(n) if n.is_finite() => n,
        _ => 0.0,
    }
}

/// Render a number the way a person would type it back in.
///
/// Integral values lose their fractional part (`1500`, not `1500.0`).
#[must_use]
pub fn plain_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 9.0e15 {
        #[allow(clippy::cast_possible_truncation)]
        let whole = value as i64;
        whole.to_string()
    } else {
        value.to_string()
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    })
}

fn lenient_list<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_price<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(coerce_number(&Value::deserialize(deserializer)?))
}

fn lenient_total<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        other => Some(coerce_number(&other)),
    })
}

fn lenient_flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(truthy(&Value::deserialize(deserializer)?))
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(value: &bool) -> bool {
    !*value
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn serialize_number<S>(value: &f64, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if value.fract() == 0.0 && value.abs() < 9.0e15 {
        #[allow(clippy::cast_possible_truncation)]
        let whole = *value as i64;
        serializer.serialize_i64(whole)
    } else {
        serializer.serialize_f64(*value)
    }
}

#[allow(clippy::ref_option)]
fn serialize_optional_number<S>(
    value: &Option<f64>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(number) => serialize_number(number, serializer),
        None => serializer.serialize_none(),
    }
}
