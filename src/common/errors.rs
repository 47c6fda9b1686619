use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde_json::json;
use std::fmt;

/// Custom error types for business logic validation and application errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusinessError {
    /// Validation errors for user input (400 Bad Request)
    ValidationError { field: String, message: String },
    /// Business rule violations (422 Unprocessable Entity)
    BusinessRuleViolation { rule: String, message: String },
    /// Lifecycle precondition failures naming what is missing (422 Unprocessable Entity)
    PreconditionFailed {
        rule: String,
        message: String,
        missing: Vec<String>,
    },
    /// Resource not found (404 Not Found)
    NotFound { resource: String, id: String },
    /// Duplicate resource (409 Conflict)
    Duplicate { resource: String, field: String },
    /// Stale version on a compare-and-swap write (409 Conflict)
    Conflict { resource: String, id: String },
    /// Permission denied (403 Forbidden)
    Forbidden { action: String, resource: String },
    /// External service errors (502 Bad Gateway)
    ExternalServiceError { service: String, message: String },
    /// Generic application error (500 Internal Server Error)
    InternalError { message: String },
}

impl fmt::Display for BusinessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusinessError::ValidationError { field, message } => {
                write!(f, "Validation error in field '{field}': {message}")
            }
            BusinessError::BusinessRuleViolation { rule, message } => {
                write!(f, "Business rule '{rule}' violated: {message}")
            }
            BusinessError::PreconditionFailed {
                rule,
                message,
                missing,
            } => {
                write!(f, "Precondition '{rule}' failed: {message}")?;
                if !missing.is_empty() {
                    write!(f, " (missing: {})", missing.join(", "))?;
                }
                Ok(())
            }
            BusinessError::NotFound { resource, id } => {
                write!(f, "{resource} with id '{id}' not found")
            }
            BusinessError::Duplicate { resource, field } => {
                write!(f, "{resource} with this {field} already exists")
            }
            BusinessError::Conflict { resource, id } => {
                write!(
                    f,
                    "{resource} '{id}' was modified by someone else, reload and retry"
                )
            }
            BusinessError::Forbidden { action, resource } => {
                write!(f, "Not authorized to {action} {resource}")
            }
            BusinessError::ExternalServiceError { service, message } => {
                write!(f, "External service '{service}' error: {message}")
            }
            BusinessError::InternalError { message } => {
                write!(f, "Internal error: {message}")
            }
        }
    }
}

impl std::error::Error for BusinessError {}

impl BusinessError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            BusinessError::ValidationError { .. } => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            BusinessError::BusinessRuleViolation { .. } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "BUSINESS_RULE_VIOLATION",
            ),
            BusinessError::PreconditionFailed { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "PRECONDITION_FAILED")
            }
            BusinessError::NotFound { .. } => (StatusCode::NOT_FOUND, "RESOURCE_NOT_FOUND"),
            BusinessError::Duplicate { .. } => (StatusCode::CONFLICT, "DUPLICATE_RESOURCE"),
            BusinessError::Conflict { .. } => (StatusCode::CONFLICT, "VERSION_CONFLICT"),
            BusinessError::Forbidden { .. } => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            BusinessError::ExternalServiceError { .. } => {
                (StatusCode::BAD_GATEWAY, "EXTERNAL_SERVICE_ERROR")
            }
            BusinessError::InternalError { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        }
    }
}

/// Convert `BusinessError` to HTTP responses
impl IntoResponse for BusinessError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status_and_code();
        let kind = format!("{self:?}");
        let kind = kind.split([' ', '{']).next().unwrap_or("Unknown");

        let mut error = json!({
            "code": error_code,
            "message": self.to_string(),
            "type": kind,
        });
        if let BusinessError::PreconditionFailed { missing, .. } = &self {
            error["missing"] = json!(missing);
        }
        if status.is_server_error() {
            tracing::error!("{self}");
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}

/// Maps storage errors onto the business taxonomy
pub struct ErrorMapper;

impl ErrorMapper {
    /// Map `DbErr` to the appropriate business error given a resource context
    pub fn map_db_error(err: DbErr, context: &str) -> BusinessError {
        match err {
            DbErr::RecordNotFound(msg) => BusinessError::NotFound {
                resource: Self::extract_resource_from_context(context),
                id: Self::extract_id_from_message(&msg),
            },
            DbErr::Conn(conn_err) => BusinessError::ExternalServiceError {
                service: "database".to_string(),
                message: conn_err.to_string(),
            },
            DbErr::ConnectionAcquire(acquire_err) => BusinessError::ExternalServiceError {
                service: "database".to_string(),
                message: acquire_err.to_string(),
            },
            DbErr::Exec(exec_err) => {
                let err_msg = exec_err.to_string();
                if err_msg.contains("UNIQUE constraint") || err_msg.contains("duplicate key") {
                    BusinessError::Duplicate {
                        resource: Self::extract_resource_from_context(context),
                        field: "name".to_string(),
                    }
                } else {
                    BusinessError::InternalError { message: err_msg }
                }
            }
            _ => BusinessError::InternalError {
                message: err.to_string(),
            },
        }
    }

    /// Helper to extract resource name from context
    fn extract_resource_from_context(context: &str) -> String {
        context.replace('_', " ")
    }

    /// Helper to extract ID from error messages like "Sample with id 'abc' not found"
    fn extract_id_from_message(msg: &str) -> String {
        if let Some(start_pos) = msg.find(" id '") {
            let after_id = &msg[start_pos + 5..];
            if let Some(end_pos) = after_id.find('\'') {
                return after_id[..end_pos].to_string();
            }
        }

        msg.split_whitespace()
            .find_map(|word| {
                let cleaned = word.trim_matches('\'').trim_matches('"');
                (cleaned.len() == 36 && cleaned.matches('-').count() == 4)
                    .then(|| cleaned.to_string())
            })
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// Convenience macros for creating business errors
#[macro_export]
macro_rules! validation_error {
    ($field:expr, $message:expr) => {
        $crate::common::errors::BusinessError::ValidationError {
            field: $field.to_string(),
            message: $message.to_string(),
        }
    };
}

#[macro_export]
macro_rules! business_rule_violation {
    ($rule:expr, $message:expr) => {
        $crate::common::errors::BusinessError::BusinessRuleViolation {
            rule: $rule.to_string(),
            message: $message.to_string(),
        }
    };
}

#[macro_export]
macro_rules! not_found {
    ($resource:expr, $id:expr) => {
        $crate::common::errors::BusinessError::NotFound {
            resource: $resource.to_string(),
            id: $id.to_string(),
        }
    };
}

#[macro_export]
macro_rules! version_conflict {
    ($resource:expr, $id:expr) => {
        $crate::common::errors::BusinessError::Conflict {
            resource: $resource.to_string(),
            id: $id.to_string(),
        }
    };
}

/// Extension trait to add business error conversion to `DbErr`
pub trait DbErrorExt {
    fn to_business_error(self, context: &str) -> BusinessError;
}

impl DbErrorExt for DbErr {
    fn to_business_error(self, context: &str) -> BusinessError {
        ErrorMapper::map_db_error(self, context)
    }
}

/// Untagged database errors surface as internal errors; call sites that know their
/// resource use `to_business_error` instead.
impl From<DbErr> for BusinessError {
    fn from(err: DbErr) -> Self {
        ErrorMapper::map_db_error(err, "record")
    }
}

/// Result type alias for business operations
pub type BusinessResult<T> = Result<T, BusinessError>;
