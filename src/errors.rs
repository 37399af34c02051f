//! Error types for the table reconciler.
//!
//! This module maps AWS SDK errors to `ApiError` kinds and defines the
//! operation-level `ReconcileError` surfaced to callers.
//! Service errors are classified from typed `SdkError` metadata, not debug output.

use aws_sdk_keyspaces::error::{ProvideErrorMetadata, SdkError};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::identity::TableId;

/// Input that failed validation before any remote call was made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unexpected format for ID ({id}), expected KEYSPACE-NAME/TABLE-NAME")]
    MalformedId { id: String },

    #[error("{field} ({name}) must be between 1 and 48 characters")]
    NameLength { field: &'static str, name: String },

    #[error("{field} ({name}) must consist of alphanumerics and underscores and start with an alphanumeric")]
    NamePattern { field: &'static str, name: String },

    #[error("invalid {field}: {reason}")]
    Field { field: &'static str, reason: String },
}

/// Category of a remote API failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    NotFound,
    ResourceInUse,
    Validation,
    AccessDenied,
    Credentials,
    Throttling,
    Connection,
    Service,
}

impl ApiErrorKind {
    fn name(&self) -> &'static str {
        match self {
            ApiErrorKind::NotFound => "not found",
            ApiErrorKind::ResourceInUse => "resource in use",
            ApiErrorKind::Validation => "validation",
            ApiErrorKind::AccessDenied => "access denied",
            ApiErrorKind::Credentials => "credentials",
            ApiErrorKind::Throttling => "throttling",
            ApiErrorKind::Connection => "connection",
            ApiErrorKind::Service => "service",
        }
    }
}

/// Failure returned by the remote control-plane or tagging API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} error: {message}", .kind.name())]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub code: Option<String>,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: None,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::NotFound, message)
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ApiErrorKind::NotFound
    }
}

/// Why a status poll stopped without reaching its target.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WaitError {
    #[error(
        "timeout while waiting for state to become '{expected}' (last state: '{last_state}', timeout: {timeout:?})"
    )]
    Timeout {
        last_state: String,
        expected: String,
        timeout: Duration,
    },

    #[error("unexpected state '{state}', wanted target '{expected}'")]
    UnexpectedState { state: String, expected: String },

    #[error("resource disappeared while waiting for state '{expected}'")]
    NotFound { expected: String },

    #[error("wait cancelled")]
    Cancelled,

    #[error(transparent)]
    Probe(#[from] ApiError),
}

/// Lifecycle step an error occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
        })
    }
}

/// Error returned by every reconciler operation.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("creating Keyspaces Table ({id}): {source}")]
    Create { id: TableId, source: ApiError },

    #[error("reading Keyspaces Table ({id}): {source}")]
    Read { id: TableId, source: ApiError },

    #[error("reading Keyspaces Table ({id}): not found after successful create")]
    NotFoundAfterCreate { id: TableId },

    #[error("updating Keyspaces Table ({id}): {source}")]
    Update { id: TableId, source: ApiError },

    #[error("deleting Keyspaces Table ({id}): {source}")]
    Delete { id: TableId, source: ApiError },

    #[error("waiting for Keyspaces Table ({id}) {operation}: {source}")]
    Wait {
        operation: Operation,
        id: TableId,
        source: WaitError,
    },

    #[error("updating Keyspaces Table ({id}) tags: {source}")]
    Tags { id: TableId, source: ApiError },

    #[error("listing tags for Keyspaces Table ({id}): {source}")]
    ListTags { id: TableId, source: ApiError },

    #[error("Keyspaces Table ({id}) {operation} cancelled")]
    Cancelled { operation: Operation, id: TableId },
}

impl ReconcileError {
    /// True when the caller should treat the failure as a deadline overrun.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            ReconcileError::Wait {
                source: WaitError::Timeout { .. },
                ..
            }
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ReconcileError::Cancelled { .. })
    }
}

// ========== TYPED ERROR MAPPING ==========

/// Map non-service `SdkError` variants (dispatch failures, timeouts, etc.).
///
/// Returns `Some(ApiError)` for non-service errors, `None` for `ServiceError`.
fn map_outer_sdk_error<E, R>(err: &SdkError<E, R>) -> Option<ApiError>
where
    E: fmt::Debug,
    R: fmt::Debug,
{
    match err {
        SdkError::DispatchFailure(dispatch) => {
            let msg = if dispatch.is_timeout() {
                "Connection timed out to Keyspaces. Check your network or endpoint."
            } else if dispatch.is_io() {
                "Connection failed to Keyspaces (I/O error). Check if the endpoint is reachable."
            } else {
                "Connection failed to Keyspaces. Check if the endpoint is reachable."
            };
            Some(ApiError::new(ApiErrorKind::Connection, msg))
        }
        SdkError::TimeoutError(_) => Some(ApiError::new(
            ApiErrorKind::Connection,
            "Connection timed out to Keyspaces. Check your network or endpoint.",
        )),
        SdkError::ConstructionFailure(err) => {
            let msg = format!("{:?}", err);
            if msg.contains("credentials")
                || msg.contains("Credentials")
                || msg.contains("NoCredentialsError")
            {
                Some(ApiError::new(
                    ApiErrorKind::Credentials,
                    "No AWS credentials found. Configure credentials via environment variables \
                    (AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY), AWS profile, or IAM role.",
                ))
            } else {
                Some(ApiError::new(
                    ApiErrorKind::Service,
                    format!("Failed to build request: {}", msg),
                ))
            }
        }
        SdkError::ResponseError(err) => Some(ApiError::new(
            ApiErrorKind::Service,
            format!("Invalid response from Keyspaces: {:?}", err),
        )),
        SdkError::ServiceError(_) => None,
        _ => Some(ApiError::new(
            ApiErrorKind::Service,
            format!("Unknown error from Keyspaces: {:?}", err),
        )),
    }
}

/// Map a Keyspaces service error code to an error kind.
fn map_service_code(code: Option<&str>) -> ApiErrorKind {
    match code {
        Some("ResourceNotFoundException") => ApiErrorKind::NotFound,
        Some("ConflictException") => ApiErrorKind::ResourceInUse,
        Some("ValidationException") => ApiErrorKind::Validation,
        Some("AccessDeniedException") | Some("AccessDenied") => ApiErrorKind::AccessDenied,
        Some("UnrecognizedClientException")
        | Some("InvalidSignatureException")
        | Some("SignatureDoesNotMatch")
        | Some("ExpiredTokenException")
        | Some("ExpiredToken") => ApiErrorKind::Credentials,
        Some("ServiceQuotaExceededException")
        | Some("ThrottlingException")
        | Some("Throttling")
        | Some("TooManyRequestsException") => ApiErrorKind::Throttling,
        _ => ApiErrorKind::Service,
    }
}

/// Map Keyspaces SDK errors using typed `SdkError` variants.
///
/// For `ServiceError`, uses `ProvideErrorMetadata` to get the error code and message
/// instead of parsing debug strings.
pub fn map_sdk_error<E, R>(err: SdkError<E, R>) -> ApiError
where
    E: ProvideErrorMetadata + fmt::Debug + fmt::Display,
    R: fmt::Debug,
{
    // Check outer SdkError variants first (dispatch, timeout, etc.)
    if let Some(api_err) = map_outer_sdk_error(&err) {
        return api_err;
    }

    // ServiceError: classify by error code
    if let Some(service_err) = err.as_service_error() {
        let code = service_err.code();
        let message = service_err
            .message()
            .map(|m| m.to_string())
            .unwrap_or_else(|| service_err.to_string());
        let api_err = ApiError::new(map_service_code(code), message);
        return match code {
            Some(code) => api_err.with_code(code),
            None => api_err,
        };
    }

    ApiError::new(
        ApiErrorKind::Service,
        format!("Unexpected Keyspaces error: {:?}", err),
    )
}
