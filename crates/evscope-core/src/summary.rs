//! Fleet-wide headline figures

use crate::classifier::{classify_eligibility, Eligibility};
use crate::metrics::{average_of, percent_of, round_to};
use crate::VehicleRecord;
use serde::Serialize;
use std::collections::HashSet;

/// CAFV eligibility counts. `total` always equals the sum of the four counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityBreakdown {
    pub eligible: usize,
    pub unknown: usize,
    pub ineligible: usize,
    pub unclassified: usize,
    pub total: usize,
}

impl EligibilityBreakdown {
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a VehicleRecord>,
    {
        let mut breakdown = Self::default();
        for record in records {
            match classify_eligibility(record) {
                Eligibility::Eligible => breakdown.eligible += 1,
                Eligibility::Unknown => breakdown.unknown += 1,
                Eligibility::Ineligible => breakdown.ineligible += 1,
                Eligibility::Unclassified => breakdown.unclassified += 1,
            }
            breakdown.total += 1;
        }
        breakdown
    }

    pub fn count(&self, category: Eligibility) -> usize {
        match category {
            Eligibility::Eligible => self.eligible,
            Eligibility::Unknown => self.unknown,
            Eligibility::Ineligible => self.ineligible,
            Eligibility::Unclassified => self.unclassified,
        }
    }

    /// Share of `category`, rounded to one decimal.
    pub fn percent(&self, category: Eligibility) -> f64 {
        round_to(percent_of(self.count(category), self.total), 1)
    }

    pub fn percentages(&self) -> [(Eligibility, f64); Eligibility::COUNT] {
        Eligibility::ALL.map(|category| (category, self.percent(category)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetSummary {
    pub total_vehicles: usize,
    pub eligibility: EligibilityBreakdown,
    pub eligible_percent: f64,
    /// Mean over vehicles with a known price only.
    pub average_msrp: Option<f64>,
    /// Mean over vehicles with a known range only.
    pub average_range: Option<f64>,
    pub priced_vehicles: usize,
    pub ranged_vehicles: usize,
    pub distinct_makers: usize,
    pub model_year_start: Option<i32>,
    pub model_year_end: Option<i32>,
}

pub fn fleet_summary(records: &[VehicleRecord]) -> FleetSummary {
    let eligibility = EligibilityBreakdown::from_records(records);
    let eligible_percent = eligibility.percent(Eligibility::Eligible);

    let makers: HashSet<&str> = records.iter().map(|r| r.make()).collect();
    let years = records.iter().filter_map(|r| r.model_year());

    FleetSummary {
        total_vehicles: records.len(),
        eligible_percent,
        average_msrp: average_of(records, |r| r.msrp()).map(|v| round_to(v, 2)),
        average_range: average_of(records, |r| r.range()).map(|v| round_to(v, 1)),
        priced_vehicles: records.iter().filter(|r| r.msrp().is_some()).count(),
        ranged_vehicles: records.iter().filter(|r| r.range().is_some()).count(),
        distinct_makers: makers.len(),
        model_year_start: years.clone().min(),
        model_year_end: years.max(),
        eligibility,
    }
}
