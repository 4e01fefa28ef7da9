use crate::resilience::classifier::ErrorKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

/// Why an operation produced an empty value without a remote error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FallbackReason {
    /// No live session; the remote was never called
    NotConnected,
    /// The remote reported legitimate absence
    NotFound,
    /// The caller cancelled before a result arrived
    Cancelled,
    /// The requested time window ends before it starts
    InvalidRange,
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotConnected => "not_connected",
            Self::NotFound => "not_found",
            Self::Cancelled => "cancelled",
            Self::InvalidRange => "invalid_range",
        })
    }
}

/// Tagged outcome of a guarded, retried remote operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationResult<T> {
    Success(T),
    EmptyFallback(FallbackReason),
    Fatal(ErrorKind),
}

impl<T> OperationResult<T> {
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> OperationResult<U> {
        match self {
            Self::Success(value) => OperationResult::Success(f(value)),
            Self::EmptyFallback(reason) => OperationResult::EmptyFallback(reason),
            Self::Fatal(kind) => OperationResult::Fatal(kind),
        }
    }

    /// The fallback cause, or `None` for `Success`
    pub const fn report(&self) -> Option<FallbackReport> {
        match self {
            Self::Success(_) => None,
            Self::EmptyFallback(reason) => Some(FallbackReport::Empty(*reason)),
            Self::Fatal(kind) => Some(FallbackReport::Fatal(*kind)),
        }
    }
}

/// Cause attached to a value that was substituted by the normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FallbackReport {
    Empty(FallbackReason),
    Fatal(ErrorKind),
}

impl fmt::Display for FallbackReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty(reason) => write!(f, "{}", reason),
            Self::Fatal(kind) => write!(f, "fatal_{}", kind),
        }
    }
}

/// Collapse a result into a plain value, substituting `empty` on any
/// non-success outcome and logging the cause once.
pub fn normalize<T>(operation: &str, result: OperationResult<T>, empty: T) -> T {
    normalize_with_reason(operation, result, empty).0
}

/// Same as [`normalize`], also returning the cause when `empty` was used so
/// callers can tell a fallback apart from an authentic empty answer.
pub fn normalize_with_reason<T>(
    operation: &str,
    result: OperationResult<T>,
    empty: T,
) -> (T, Option<FallbackReport>) {
    let report = result.report();
    match result {
        OperationResult::Success(value) => (value, None),
        OperationResult::EmptyFallback(FallbackReason::NotFound) => {
            info!(
                operation,
                reason = %FallbackReason::NotFound,
                fallback = true,
                "Remote reported no data, returning empty value"
            );
            (empty, report)
        }
        OperationResult::EmptyFallback(reason) => {
            warn!(
                operation,
                reason = %reason,
                fallback = true,
                "Operation skipped, returning empty value"
            );
            (empty, report)
        }
        OperationResult::Fatal(kind) => {
            warn!(
                operation,
                reason = %kind,
                fallback = true,
                "Operation failed, returning empty value"
            );
            (empty, report)
        }
    }
}
