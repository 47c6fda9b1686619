//! Date and time formats accepted at the API boundary.
//!
//! Fabrication and best-before dates arrive either as ISO `yyyy-mm-dd` or as the
//! day-first `dd-mm-yyyy` / `dd/mm/yyyy` used on paper forms. Everything is parsed
//! here into `NaiveDate` and always written back out as ISO.

use crate::common::errors::BusinessResult;
use crate::validation_error;
use chrono::{NaiveDate, NaiveTime};

const ISO_DATE: &str = "%Y-%m-%d";
const DAY_FIRST_FORMATS: [&str; 2] = ["%d-%m-%Y", "%d/%m/%Y"];
const READY_TIME: &str = "%H:%M";

/// Parse a calendar date in any accepted input format.
pub fn parse_date(field: &str, raw: &str) -> BusinessResult<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, ISO_DATE) {
        return Ok(date);
    }
    DAY_FIRST_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
        .ok_or_else(|| {
            validation_error!(
                field,
                format!("'{raw}' is not a date (expected yyyy-mm-dd or dd-mm-yyyy)")
            )
        })
}

/// Parse an optional date field; blank input clears the value.
pub fn parse_optional_date(field: &str, raw: Option<&str>) -> BusinessResult<Option<NaiveDate>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_date(field, value).map(Some),
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(ISO_DATE).to_string()
}

/// Normalize an `HH:MM` ready time, accepting a single-digit hour.
pub fn parse_ready_time(raw: &str) -> BusinessResult<String> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, READY_TIME)
        .map(|time| time.format(READY_TIME).to_string())
        .map_err(|_| validation_error!("ready_time", format!("'{raw}' is not an HH:MM time")))
}
