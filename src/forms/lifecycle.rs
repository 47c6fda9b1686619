//! Form and sample lifecycle: which role may do what, in which form status, and the
//! preconditions each transition checks before anything is written.
//!
//! Everything here is pure. Services load the rows, ask this module, then write.

use super::models::FormStatus;
use crate::bacteria::incubation::Bacterium;
use crate::bacteria::models::{Model as Selection, SelectionStatus};
use crate::bacteria::readings::MicroField;
use crate::common::auth::Role;
use crate::common::errors::BusinessError;
use crate::samples::conformity::{is_sample_sensory_complete, missing_sensory_fields};
use crate::samples::models::{Model as Sample, SampleStatus};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    CreateForm,
    EditDraft,
    CancelDraft,
    SendToTechnician,
    RejectSample,
    EditResults,
    SubmitSensory,
    SubmitReading,
}

impl Action {
    fn describe(self) -> &'static str {
        match self {
            Action::Read => "read forms",
            Action::CreateForm => "create forms",
            Action::EditDraft => "edit draft samples",
            Action::CancelDraft => "cancel drafts",
            Action::SendToTechnician => "send forms to the technician",
            Action::RejectSample => "reject samples",
            Action::EditResults => "edit analysis results",
            Action::SubmitSensory => "submit sensory results",
            Action::SubmitReading => "submit bacteria readings",
        }
    }

    /// Form status the action is confined to, if any
    pub fn required_status(self) -> Option<FormStatus> {
        match self {
            Action::EditDraft | Action::CancelDraft | Action::SendToTechnician => {
                Some(FormStatus::Draft)
            }
            Action::EditResults | Action::SubmitSensory => Some(FormStatus::AnalysesEnCours),
            Action::SubmitReading => Some(FormStatus::WaitingReading),
            Action::Read | Action::CreateForm | Action::RejectSample => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleViolation {
    WrongRole {
        role: String,
        action: Action,
    },
    WrongStage {
        action: Action,
        expected: FormStatus,
        actual: FormStatus,
    },
    SkippedStage {
        from: FormStatus,
        to: FormStatus,
    },
    FormCompleted,
    NoActiveSamples,
    NoBacteriaSelected,
    UnknownBacteria(Vec<String>),
    SharedResultField(Vec<String>),
    IncompleteSensory(Vec<String>),
    SampleRejected {
        number: String,
    },
    LastActiveSample {
        number: String,
    },
    SampleAheadOfForm {
        sample: SampleStatus,
        form: FormStatus,
    },
    SelectionCompleted {
        bacterium: String,
    },
    ReadingNotDue {
        bacterium: String,
        due_at: Option<DateTime<Utc>>,
    },
    EmptyReading {
        bacterium: String,
        field: MicroField,
    },
}

impl fmt::Display for LifecycleViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleViolation::WrongRole { role, action } => {
                write!(f, "role '{role}' may not {}", action.describe())
            }
            LifecycleViolation::WrongStage {
                action,
                expected,
                actual,
            } => write!(
                f,
                "cannot {} while the form is {actual}, it must be {expected}",
                action.describe()
            ),
            LifecycleViolation::SkippedStage { from, to } => {
                write!(f, "a form cannot move from {from} to {to}")
            }
            LifecycleViolation::FormCompleted => f.write_str("the form is already completed"),
            LifecycleViolation::NoActiveSamples => {
                f.write_str("the form has no sample left to analyse")
            }
            LifecycleViolation::NoBacteriaSelected => {
                f.write_str("select at least one bacterium to analyse")
            }
            LifecycleViolation::UnknownBacteria(names) => {
                write!(f, "unknown bacteria: {}", names.join(", "))
            }
            LifecycleViolation::SharedResultField(names) => write!(
                f,
                "these bacteria record into the same result field: {}",
                names.join(", ")
            ),
            LifecycleViolation::IncompleteSensory(samples) => write!(
                f,
                "{} sample(s) still miss sensory results or pH",
                samples.len()
            ),
            LifecycleViolation::SampleRejected { number } => {
                write!(f, "sample #{number} is rejected")
            }
            LifecycleViolation::LastActiveSample { number } => write!(
                f,
                "sample #{number} is the last one left to analyse and cannot be rejected"
            ),
            LifecycleViolation::SampleAheadOfForm { sample, form } => {
                write!(f, "a sample cannot be {sample} while its form is {form}")
            }
            LifecycleViolation::SelectionCompleted { bacterium } => {
                write!(f, "the {bacterium} reading is already completed")
            }
            LifecycleViolation::ReadingNotDue { bacterium, due_at } => match due_at {
                Some(due_at) => write!(f, "{bacterium} cannot be read before {due_at}"),
                None => write!(f, "{bacterium} plates have not been seeded yet"),
            },
            LifecycleViolation::EmptyReading { bacterium, .. } => {
                write!(f, "enter at least one {bacterium} result before completing")
            }
        }
    }
}

impl From<LifecycleViolation> for BusinessError {
    fn from(violation: LifecycleViolation) -> Self {
        let message = violation.to_string();
        match violation {
            LifecycleViolation::WrongRole { action, .. } => BusinessError::Forbidden {
                action: action.describe().to_string(),
                resource: "with this role".to_string(),
            },
            LifecycleViolation::NoActiveSamples => {
                precondition("samples_present", message, vec!["samples".to_string()])
            }
            LifecycleViolation::NoBacteriaSelected => {
                precondition("bacteria_selected", message, vec!["bacteria".to_string()])
            }
            LifecycleViolation::IncompleteSensory(samples) => {
                precondition("sensory_complete", message, samples)
            }
            LifecycleViolation::EmptyReading { field, .. } => precondition(
                "reading_present",
                message,
                vec![field.column_name().to_string()],
            ),
            LifecycleViolation::UnknownBacteria(_) | LifecycleViolation::SharedResultField(_) => {
                BusinessError::ValidationError {
                    field: "bacteria".to_string(),
                    message,
                }
            }
            LifecycleViolation::SampleAheadOfForm { .. } => BusinessError::InternalError { message },
            LifecycleViolation::WrongStage { .. } => business_rule("form_status", message),
            LifecycleViolation::SkippedStage { .. } => business_rule("no_skipped_stage", message),
            LifecycleViolation::FormCompleted => business_rule("form_completed", message),
            LifecycleViolation::SampleRejected { .. } => business_rule("sample_rejected", message),
            LifecycleViolation::LastActiveSample { .. } => {
                business_rule("last_active_sample", message)
            }
            LifecycleViolation::SelectionCompleted { .. } => {
                business_rule("selection_completed", message)
            }
            LifecycleViolation::ReadingNotDue { .. } => business_rule("reading_not_due", message),
        }
    }
}

fn precondition(rule: &str, message: String, missing: Vec<String>) -> BusinessError {
    BusinessError::PreconditionFailed {
        rule: rule.to_string(),
        message,
        missing,
    }
}

fn business_rule(rule: &str, message: String) -> BusinessError {
    BusinessError::BusinessRuleViolation {
        rule: rule.to_string(),
        message,
    }
}

pub type LifecycleResult<T> = Result<T, LifecycleViolation>;

/// Coordinators prepare and send forms, technicians record results, guests only read.
pub fn authorize(role: &Role, action: Action) -> LifecycleResult<()> {
    let allowed = match action {
        Action::Read => matches!(role, Role::Coordinator | Role::Technician | Role::Guest),
        Action::CreateForm
        | Action::EditDraft
        | Action::CancelDraft
        | Action::SendToTechnician
        | Action::RejectSample => *role == Role::Coordinator,
        Action::EditResults | Action::SubmitSensory | Action::SubmitReading => {
            *role == Role::Technician
        }
    };
    if allowed {
        Ok(())
    } else {
        Err(LifecycleViolation::WrongRole {
            role: role.as_str().to_string(),
            action,
        })
    }
}

/// Role check first, then the form status the action is confined to
pub fn check_action(role: &Role, action: Action, status: FormStatus) -> LifecycleResult<()> {
    authorize(role, action)?;
    if action == Action::RejectSample && status == FormStatus::Completed {
        return Err(LifecycleViolation::FormCompleted);
    }
    match action.required_status() {
        Some(expected) if expected != status => Err(LifecycleViolation::WrongStage {
            action,
            expected,
            actual: status,
        }),
        _ => Ok(()),
    }
}

/// Forms only ever move one stage forward
pub fn check_transition(from: FormStatus, to: FormStatus) -> LifecycleResult<()> {
    if to.stage() == from.stage() + 1 {
        Ok(())
    } else {
        Err(LifecycleViolation::SkippedStage { from, to })
    }
}

/// Sample status mirroring a form status
pub fn sample_status_for(form: FormStatus) -> SampleStatus {
    match form {
        FormStatus::Draft => SampleStatus::Pending,
        FormStatus::AnalysesEnCours => SampleStatus::AnalysesEnCours,
        FormStatus::WaitingReading => SampleStatus::WaitingReading,
        FormStatus::Completed => SampleStatus::Completed,
    }
}

pub fn ensure_sample_within_form(sample: SampleStatus, form: FormStatus) -> LifecycleResult<()> {
    match sample.stage() {
        Some(stage) if stage > form.stage() => {
            Err(LifecycleViolation::SampleAheadOfForm { sample, form })
        }
        _ => Ok(()),
    }
}

pub fn ensure_not_rejected(sample: &Sample) -> LifecycleResult<()> {
    if sample.status.is_rejected() {
        Err(LifecycleViolation::SampleRejected {
            number: sample.number.clone(),
        })
    } else {
        Ok(())
    }
}

/// Once the form is sent, a rejection must leave at least one live sample to carry
/// the form through to completion.
pub fn check_reject(samples: &[Sample], sample: &Sample, form: FormStatus) -> LifecycleResult<()> {
    ensure_not_rejected(sample)?;
    if form == FormStatus::Draft || active_samples(samples).any(|other| other.id != sample.id) {
        Ok(())
    } else {
        Err(LifecycleViolation::LastActiveSample {
            number: sample.number.clone(),
        })
    }
}

pub fn active_samples(samples: &[Sample]) -> impl Iterator<Item = &Sample> {
    samples.iter().filter(|sample| !sample.status.is_rejected())
}

/// `draft -> analyses_en_cours`: at least one live sample and a valid, non-empty
/// bacteria selection. Returns the resolved bacteria in selection order, deduplicated.
pub fn check_send(samples: &[Sample], bacteria: &[String]) -> LifecycleResult<Vec<Bacterium>> {
    if active_samples(samples).next().is_none() {
        return Err(LifecycleViolation::NoActiveSamples);
    }
    if bacteria.iter().all(|name| name.trim().is_empty()) {
        return Err(LifecycleViolation::NoBacteriaSelected);
    }

    let mut resolved: Vec<Bacterium> = Vec::new();
    let mut unknown = Vec::new();
    for name in bacteria.iter().filter(|name| !name.trim().is_empty()) {
        match Bacterium::from_name(name) {
            Some(bacterium) if !resolved.contains(&bacterium) => resolved.push(bacterium),
            Some(_) => {}
            None => unknown.push(name.trim().to_string()),
        }
    }
    if !unknown.is_empty() {
        return Err(LifecycleViolation::UnknownBacteria(unknown));
    }

    let mut fields = HashSet::new();
    let shared: Vec<String> = resolved
        .iter()
        .filter(|bacterium| !fields.insert(MicroField::for_bacterium(**bacterium)))
        .map(|bacterium| bacterium.display_name().to_string())
        .collect();
    if !shared.is_empty() {
        return Err(LifecycleViolation::SharedResultField(shared));
    }
    Ok(resolved)
}

/// Live samples still missing sensory fields, as `#number: field, field`
pub fn incomplete_samples(samples: &[Sample]) -> Vec<String> {
    active_samples(samples)
        .filter(|sample| !is_sample_sensory_complete(sample))
        .map(|sample| {
            let missing = missing_sensory_fields(sample);
            format!("#{}: {}", sample.number, missing.join(", "))
        })
        .collect()
}

/// `analyses_en_cours -> waiting_reading`
pub fn check_sensory_complete(samples: &[Sample]) -> LifecycleResult<()> {
    if active_samples(samples).next().is_none() {
        return Err(LifecycleViolation::NoActiveSamples);
    }
    let incomplete = incomplete_samples(samples);
    if incomplete.is_empty() {
        Ok(())
    } else {
        Err(LifecycleViolation::IncompleteSensory(incomplete))
    }
}

/// Any write to a selection: not completed, and its incubation delay has elapsed
pub fn check_reading_allowed(selection: &Selection, now: DateTime<Utc>) -> LifecycleResult<()> {
    if selection.status == SelectionStatus::Completed {
        return Err(LifecycleViolation::SelectionCompleted {
            bacterium: selection.bacteria_name.clone(),
        });
    }
    if !selection.is_ready(now) {
        return Err(LifecycleViolation::ReadingNotDue {
            bacterium: selection.bacteria_name.clone(),
            due_at: selection.due_at,
        });
    }
    Ok(())
}

/// Completing a bacterium needs at least one recorded value among live samples
pub fn check_reading_complete(
    selection: &Selection,
    field: MicroField,
    samples: &[Sample],
) -> LifecycleResult<()> {
    if active_samples(samples).any(|sample| field.is_filled(sample)) {
        Ok(())
    } else {
        Err(LifecycleViolation::EmptyReading {
            bacterium: selection.bacteria_name.clone(),
            field,
        })
    }
}

/// The form archives itself once every selection is completed
pub fn all_readings_complete(selections: &[Selection]) -> bool {
    !selections.is_empty()
        && selections
            .iter()
            .all(|selection| selection.status == SelectionStatus::Completed)
}
