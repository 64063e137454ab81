//! Category classification for eligibility and vehicle type fields
//!
//! Both classifiers are total: every record resolves to a category, including
//! records with missing or unexpected values.

use crate::VehicleRecord;
use serde::{Serialize, Serializer};
use std::fmt;

/// CAFV eligibility category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Eligibility {
    Eligible,
    Unknown,
    Ineligible,
    /// Missing value or a string outside the three known feed values.
    Unclassified,
}

impl Eligibility {
    pub const COUNT: usize = 4;
    pub const ALL: [Eligibility; Self::COUNT] = [
        Eligibility::Eligible,
        Eligibility::Unknown,
        Eligibility::Ineligible,
        Eligibility::Unclassified,
    ];

    /// Bar order of the CAFV chart. Unclassified is appended separately when present.
    pub const FEED_ORDER: [Eligibility; 3] = [
        Eligibility::Eligible,
        Eligibility::Unknown,
        Eligibility::Ineligible,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Eligibility::Eligible => "Clean Alternative Fuel Vehicle Eligible",
            Eligibility::Unknown => "Eligibility unknown as battery range has not been researched",
            Eligibility::Ineligible => "Not eligible due to low battery range",
            Eligibility::Unclassified => "Unclassified",
        }
    }

    /// Short identifier used by CLI flags and config files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Eligibility::Eligible => "eligible",
            Eligibility::Unknown => "unknown",
            Eligibility::Ineligible => "ineligible",
            Eligibility::Unclassified => "unclassified",
        }
    }

    pub fn iter() -> impl Iterator<Item = Eligibility> {
        Self::ALL.iter().copied()
    }

    /// Exact feed string match after trimming. Never fails.
    pub fn from_feed(value: Option<&str>) -> Eligibility {
        let Some(value) = value.map(str::trim) else {
            return Eligibility::Unclassified;
        };
        Self::FEED_ORDER
            .iter()
            .copied()
            .find(|e| e.label() == value)
            .unwrap_or(Eligibility::Unclassified)
    }

    /// Accepts either the short identifier or the feed label.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Eligibility> {
        let s = s.trim();
        Self::iter().find(|e| e.as_str().eq_ignore_ascii_case(s) || e.label() == s)
    }
}

impl fmt::Display for Eligibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Eligibility {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

pub fn classify_eligibility(record: &VehicleRecord) -> Eligibility {
    Eligibility::from_feed(record.eligibility_raw())
}

const BEV_LABEL: &str = "Battery Electric Vehicle (BEV)";
const PHEV_LABEL: &str = "Plug-in Hybrid Electric Vehicle (PHEV)";
const UNSPECIFIED_LABEL: &str = "Unspecified";

/// Electric vehicle type. The feed vocabulary is open-ended, so unexpected
/// strings are kept verbatim as their own category.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EvType {
    BatteryElectric,
    PlugInHybrid,
    Other(String),
    Unspecified,
}

impl EvType {
    pub fn label(&self) -> &str {
        match self {
            EvType::BatteryElectric => BEV_LABEL,
            EvType::PlugInHybrid => PHEV_LABEL,
            EvType::Other(raw) => raw,
            EvType::Unspecified => UNSPECIFIED_LABEL,
        }
    }

    /// A literal "Unspecified" joins the missing-value bucket, since both
    /// group under the same label.
    pub fn from_feed(value: Option<&str>) -> EvType {
        match value.map(str::trim).filter(|s| !s.is_empty()) {
            None => EvType::Unspecified,
            Some(BEV_LABEL) => EvType::BatteryElectric,
            Some(PHEV_LABEL) => EvType::PlugInHybrid,
            Some(other) if other.eq_ignore_ascii_case(UNSPECIFIED_LABEL) => EvType::Unspecified,
            Some(other) => EvType::Other(other.to_string()),
        }
    }

    /// Accepts `bev`/`phev` shorthands as well as any label grouping emits,
    /// ignoring ASCII case.
    pub fn parse_filter(s: &str) -> EvType {
        let s = s.trim();
        match s.to_ascii_lowercase().as_str() {
            "bev" => return EvType::BatteryElectric,
            "phev" => return EvType::PlugInHybrid,
            _ => {}
        }
        [EvType::BatteryElectric, EvType::PlugInHybrid, EvType::Unspecified]
            .into_iter()
            .find(|known| known.label().eq_ignore_ascii_case(s))
            .unwrap_or_else(|| EvType::from_feed(Some(s)))
    }

    /// Label equality ignoring ASCII case, used by record filters.
    pub fn matches(&self, other: &EvType) -> bool {
        self.label().eq_ignore_ascii_case(other.label())
    }
}

impl fmt::Display for EvType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub fn classify_ev_type(record: &VehicleRecord) -> EvType {
    EvType::from_feed(record.ev_type_raw())
}
