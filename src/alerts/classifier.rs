//! Advisory urgency of a sample, recomputed on every read.
//!
//! The thresholds are fixed and independent of the per-bacterium delay table: they only
//! watch the two assays run on nearly every sample.

use super::models::Urgency;
use crate::bacteria::readings::MicroField;
use crate::samples::models::Model as Sample;
use chrono::{DateTime, Duration, Utc};

/// Entero still unread this long after creation raises a warning
pub const WARNING_AFTER_HOURS: i64 = 24;
/// Yeast/mold still unread this long after creation is urgent
pub const URGENT_AFTER_DAYS: i64 = 5;

fn thresholds_reached(sample: &Sample, now: DateTime<Utc>) -> (bool, bool) {
    let elapsed = now - sample.created_at;
    (
        elapsed >= Duration::hours(WARNING_AFTER_HOURS),
        elapsed >= Duration::days(URGENT_AFTER_DAYS),
    )
}

/// Completed and rejected samples are closed and never flagged.
pub fn classify(sample: &Sample, now: DateTime<Utc>) -> Urgency {
    if sample.status.is_closed() {
        return Urgency::None;
    }
    let (warning, urgent) = thresholds_reached(sample, now);
    if urgent && !MicroField::YeastMold.is_filled(sample) {
        Urgency::Urgent
    } else if warning && !MicroField::Enterobacteria.is_filled(sample) {
        Urgency::Warning
    } else {
        Urgency::None
    }
}

/// Result fields whose absence drives the classification at `now`
pub fn missing_fields(sample: &Sample, now: DateTime<Utc>) -> Vec<String> {
    let (warning, urgent) = thresholds_reached(sample, now);
    let mut missing = Vec::new();
    if warning && !MicroField::Enterobacteria.is_filled(sample) {
        missing.push(MicroField::Enterobacteria.column_name().to_string());
    }
    if urgent && !MicroField::YeastMold.is_filled(sample) {
        missing.push(MicroField::YeastMold.column_name().to_string());
    }
    missing
}
