//! Record fixtures shared by the unit tests.

use crate::VehicleRecord;

pub(crate) fn record(make: &str, model: &str) -> VehicleRecord {
    VehicleRecord {
        make: Some(make.to_string()),
        model: Some(model.to_string()),
        ..Default::default()
    }
}

pub(crate) fn priced(make: &str, model: &str, msrp: f64, range: f64) -> VehicleRecord {
    VehicleRecord {
        base_msrp: Some(msrp),
        electric_range: Some(range),
        ..record(make, model)
    }
}

pub(crate) fn eligible(make: &str, eligibility: &str) -> VehicleRecord {
    VehicleRecord {
        cafv_eligibility: Some(eligibility.to_string()),
        ..record(make, "X")
    }
}

pub(crate) fn located(make: &str, county: &str, city: &str, state: &str) -> VehicleRecord {
    VehicleRecord {
        county: Some(county.to_string()),
        city: Some(city.to_string()),
        state: Some(state.to_string()),
        ..record(make, "X")
    }
}

pub(crate) fn dated(make: &str, model: &str, year: i32) -> VehicleRecord {
    VehicleRecord {
        model_year: Some(year),
        ..record(make, model)
    }
}
