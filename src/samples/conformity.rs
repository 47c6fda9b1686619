//! Sensory conformity encoding and the completeness rule that gates the
//! `analyses_en_cours -> waiting_reading` transition.

use super::models::{Conformity, Model};
use crate::common::errors::BusinessResult;
use crate::validation_error;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;

const PH_MIN: Decimal = Decimal::ZERO;
const PH_MAX: Decimal = Decimal::from_parts(14, 0, 0, false, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SensoryAttribute {
    Smell,
    Texture,
    Taste,
    Aspect,
}

impl SensoryAttribute {
    pub const ALL: [SensoryAttribute; 4] = [
        SensoryAttribute::Smell,
        SensoryAttribute::Texture,
        SensoryAttribute::Taste,
        SensoryAttribute::Aspect,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SensoryAttribute::Smell => "smell",
            SensoryAttribute::Texture => "texture",
            SensoryAttribute::Taste => "taste",
            SensoryAttribute::Aspect => "aspect",
        }
    }

    pub fn value_of(self, sample: &Model) -> Conformity {
        match self {
            SensoryAttribute::Smell => sample.smell,
            SensoryAttribute::Texture => sample.texture,
            SensoryAttribute::Taste => sample.taste,
            SensoryAttribute::Aspect => sample.aspect,
        }
    }
}

impl Conformity {
    /// Flip between conforming and non-conforming. An untested value lands on `C`.
    pub fn toggle(self) -> Self {
        match self {
            Conformity::NotTested | Conformity::NonConforming => Conformity::Conforming,
            Conformity::Conforming => Conformity::NonConforming,
        }
    }

    pub fn is_tested(self) -> bool {
        self != Conformity::NotTested
    }

    pub fn code(self) -> &'static str {
        match self {
            Conformity::NotTested => "N",
            Conformity::Conforming => "C",
            Conformity::NonConforming => "NC",
        }
    }

    /// A technician may record `C` or `NC`; `N` only exists before the first judgment.
    pub fn require_tested(self, attribute: SensoryAttribute) -> BusinessResult<Self> {
        if self.is_tested() {
            Ok(self)
        } else {
            Err(validation_error!(
                attribute.as_str(),
                "can only be set to C or NC"
            ))
        }
    }
}

/// Parse a pH reading. Out-of-range or non-numeric input is rejected, never clamped.
pub fn parse_ph(raw: &str) -> BusinessResult<Decimal> {
    let raw = raw.trim().replace(',', ".");
    let value = Decimal::from_str(&raw)
        .map_err(|_| validation_error!("ph", format!("'{raw}' is not a number")))?;
    if value < PH_MIN || value > PH_MAX {
        return Err(validation_error!(
            "ph",
            format!("{value} is outside the 0 to 14 range")
        ));
    }
    Ok(value)
}

/// Canonical stored form of a pH reading, e.g. `"6,50"` -> `"6.5"`.
pub fn normalize_ph(raw: &str) -> BusinessResult<String> {
    parse_ph(raw).map(|value| value.normalize().to_string())
}

/// Names of the fields still preventing the sample from leaving analysis.
pub fn missing_sensory_fields(sample: &Model) -> Vec<&'static str> {
    let mut missing: Vec<&'static str> = SensoryAttribute::ALL
        .into_iter()
        .filter(|attribute| !attribute.value_of(sample).is_tested())
        .map(SensoryAttribute::as_str)
        .collect();

    let ph_valid = sample
        .ph
        .as_deref()
        .is_some_and(|ph| !ph.trim().is_empty() && parse_ph(ph).is_ok());
    if !ph_valid {
        missing.push("ph");
    }
    missing
}

pub fn is_sample_sensory_complete(sample: &Model) -> bool {
    missing_sensory_fields(sample).is_empty()
}
