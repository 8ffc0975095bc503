// dwt_core/src/domain.rs
use serde::{Deserialize, Serialize};
use time::Date;
use time::macros::format_description;

use crate::error::{DwtError, Result};

/// `YYYY-MM-DD`
pub const DATE_LEN: usize = 10;
pub const SNAPSHOT_VERSION: u32 = 2;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Dog {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub breed: String,
}

impl Dog {
    pub fn new(name: impl Into<String>, owner: impl Into<String>, breed: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            owner: owner.into(),
            breed: breed.into(),
        }
    }

    /// Identity used for the case-insensitive uniqueness check.
    pub fn same_identity(&self, name: &str, owner: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
            && self.owner.to_lowercase() == owner.to_lowercase()
    }
}

/// One weight observation. `dog_id` is a weak reference.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: String,
    #[serde(rename = "dogId")]
    pub dog_id: String,
    #[serde(rename = "dtISO")]
    pub date: String,
    pub weight: f64,
    #[serde(default)]
    pub notes: String,
}

/// Full export of the record set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub dogs: Vec<Dog>,
    pub entries: Vec<Entry>,
    pub exported_at: String,
    pub version: u32,
}

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// First `DATE_LEN` characters (not bytes) of a stored date value.
pub fn date_prefix(s: &str) -> &str {
    match s.char_indices().nth(DATE_LEN) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}

/// Validate a calendar date and return it as `YYYY-MM-DD`.
pub fn parse_date(s: &str) -> Result<String> {
    let fmt = format_description!("[year]-[month]-[day]");
    let d = Date::parse(s.trim(), fmt)
        .map_err(|e| DwtError::InvalidInput(format!("date {s:?} is not YYYY-MM-DD: {e}")))?;
    Ok(d.format(fmt)?)
}

pub fn round_weight(w: f64) -> f64 {
    (w * 100.0).round() / 100.0
}

pub fn validate_weight(w: f64) -> Result<f64> {
    if !w.is_finite() || w <= 0.0 {
        return Err(DwtError::InvalidInput(format!(
            "weight must be a positive number of kilograms, got {w}"
        )));
    }
    Ok(round_weight(w))
}

/// Plain decimal with `,` or `.` as separator. No range check.
pub fn parse_decimal(text: &str) -> Option<f64> {
    text.trim().replace(',', ".").parse().ok()
}

/// Parse user-typed kilograms; `,` is accepted as the decimal separator.
pub fn parse_weight(text: &str) -> Result<f64> {
    let w = parse_decimal(text)
        .ok_or_else(|| DwtError::InvalidInput(format!("{text:?} is not a number (e.g. 21.3)")))?;
    validate_weight(w)
}
