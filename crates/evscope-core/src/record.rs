//! Vehicle registration records
//!
//! Field names follow the registration feed exactly. Every field is optional on
//! the wire; the accessors decide what "missing" means for each one.

use serde::{Deserialize, Deserializer, Serialize};

/// Bucket used for blank make/model values.
pub const UNKNOWN_LABEL: &str = "Unknown";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VehicleRecord {
    #[serde(
        rename = "Make",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub make: Option<String>,
    #[serde(
        rename = "Model",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub model: Option<String>,
    #[serde(
        rename = "Model Year",
        default,
        deserialize_with = "lenient_year",
        skip_serializing_if = "Option::is_none"
    )]
    pub model_year: Option<i32>,
    #[serde(
        rename = "Electric Vehicle Type",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub electric_vehicle_type: Option<String>,
    #[serde(
        rename = "Clean Alternative Fuel Vehicle (CAFV) Eligibility",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub cafv_eligibility: Option<String>,
    #[serde(
        rename = "Base MSRP",
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub base_msrp: Option<f64>,
    #[serde(
        rename = "Electric Range",
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub electric_range: Option<f64>,
    #[serde(
        rename = "County",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub county: Option<String>,
    #[serde(
        rename = "City",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub city: Option<String>,
    #[serde(
        rename = "State",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub state: Option<String>,
    #[serde(
        rename = "Country",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub country: Option<String>,
}

impl VehicleRecord {
    pub fn make(&self) -> &str {
        non_blank(&self.make).unwrap_or(UNKNOWN_LABEL)
    }

    pub fn model(&self) -> &str {
        non_blank(&self.model).unwrap_or(UNKNOWN_LABEL)
    }

    /// `"<make> <model>"`, the label used for per-vehicle series.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.make(), self.model())
    }

    pub fn model_year(&self) -> Option<i32> {
        self.model_year
    }

    /// Base MSRP when known. Zero, negative and non-finite prices are unknown.
    pub fn msrp(&self) -> Option<f64> {
        positive(self.base_msrp)
    }

    /// Electric range when known. Zero means the range was never researched.
    pub fn range(&self) -> Option<f64> {
        positive(self.electric_range)
    }

    pub fn county(&self) -> Option<&str> {
        non_blank(&self.county)
    }

    pub fn city(&self) -> Option<&str> {
        non_blank(&self.city)
    }

    pub fn state(&self) -> Option<&str> {
        non_blank(&self.state)
    }

    pub fn country(&self) -> Option<&str> {
        non_blank(&self.country)
    }

    /// County, else city, else state. The first non-blank value wins; values are
    /// never combined.
    pub fn region_key(&self) -> Option<&str> {
        self.county().or_else(|| self.city()).or_else(|| self.state())
    }

    pub fn ev_type_raw(&self) -> Option<&str> {
        non_blank(&self.electric_vehicle_type)
    }

    pub fn eligibility_raw(&self) -> Option<&str> {
        non_blank(&self.cafv_eligibility)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

// =============================================================================
// Lenient field decoding
// =============================================================================

// Feed exports disagree on whether numbers are quoted, so every field accepts
// numbers, strings and nulls. Anything else decodes as missing.
#[derive(Deserialize)]
#[serde(untagged)]
enum LenientValue {
    Number(f64),
    Text(String),
    Other(serde::de::IgnoredAny),
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<LenientValue>::deserialize(deserializer)? {
        Some(LenientValue::Text(s)) => Some(s),
        Some(LenientValue::Number(n)) if n.fract() == 0.0 && n.abs() < 1e15 => {
            Some(format!("{}", n as i64))
        }
        Some(LenientValue::Number(n)) => Some(n.to_string()),
        Some(LenientValue::Other(_)) | None => None,
    })
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<LenientValue>::deserialize(deserializer)? {
        Some(LenientValue::Number(n)) => Some(n),
        Some(LenientValue::Text(s)) => s.trim().replace(',', "").parse::<f64>().ok(),
        Some(LenientValue::Other(_)) | None => None,
    }
    .filter(|n| n.is_finite()))
}

fn lenient_year<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let number = match Option::<LenientValue>::deserialize(deserializer)? {
        Some(LenientValue::Number(n)) => Some(n),
        Some(LenientValue::Text(s)) => s.trim().parse::<f64>().ok(),
        Some(LenientValue::Other(_)) | None => None,
    };

    Ok(number
        .filter(|n| n.is_finite() && n.fract() == 0.0)
        .filter(|n| *n >= f64::from(i32::MIN) && *n <= f64::from(i32::MAX))
        .map(|n| n as i32))
}
