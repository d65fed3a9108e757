//! Reply unification and typed error classification.
//!
//! Servers signal failure two ways: the call itself fails, or the call
//! returns a document whose `ok` field is not `1`. [`check_reply`] folds the
//! second style into the first, and [`CommandError`] carries an
//! [`ErrorClass`] so callers match on a type instead of re-parsing messages.

use std::fmt;

use serde_json::Value;

use crate::transport::Document;

/// Failure categories the orchestrator reacts to differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// The endpoint is not accepting connections.
    Connectivity,
    /// The command or its replication wait timed out.
    Timeout,
    /// Credentials were rejected or missing.
    Auth,
    /// Key material for authentication has not propagated yet.
    TransientSecurity,
    /// The object being created already exists.
    AlreadyExists,
    /// Any other rejection.
    Rejected,
}

impl ErrorClass {
    /// Returns true if the endpoint could not be reached at all.
    #[must_use]
    pub const fn is_connection_level(self) -> bool {
        matches!(self, Self::Connectivity | Self::Timeout)
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Connectivity => "connectivity",
            Self::Timeout => "timeout",
            Self::Auth => "auth",
            Self::TransientSecurity => "transient security",
            Self::AlreadyExists => "already exists",
            Self::Rejected => "rejected",
        };
        write!(f, "{s}")
    }
}

/// A failed administrative command.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{class} error: {message}")]
pub struct CommandError {
    /// Failure category.
    pub class: ErrorClass,
    /// Numeric server error code, when the server sent one.
    pub code: Option<i64>,
    /// Human-readable message.
    pub message: String,
    /// The raw reply document, when the failure came from a reply.
    pub reply: Option<Document>,
}

impl CommandError {
    /// Creates an error without a reply document.
    #[must_use]
    pub fn new(class: ErrorClass, message: impl Into<String>) -> Self {
        Self {
            class,
            code: None,
            message: message.into(),
            reply: None,
        }
    }

    /// The endpoint refused or dropped the connection.
    #[must_use]
    pub fn connectivity(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Connectivity, message)
    }

    /// The request timed out.
    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Timeout, message)
    }

    /// Builds a classified error from a failure reply.
    #[must_use]
    pub fn from_reply(reply: Document) -> Self {
        let code = reply.get("code").and_then(Value::as_i64);
        let code_name = reply.get("codeName").and_then(Value::as_str).unwrap_or("");
        let message = reply
            .get("errmsg")
            .and_then(Value::as_str)
            .map_or_else(|| reply.to_string(), str::to_string);

        Self {
            class: classify(code, code_name, &message),
            code,
            message,
            reply: Some(reply),
        }
    }
}

/// Decides the error class of a failure reply.
fn classify(code: Option<i64>, code_name: &str, message: &str) -> ErrorClass {
    let lowered = message.to_ascii_lowercase();

    match (code, code_name) {
        (Some(211), _) | (_, "KeyNotFound") => ErrorClass::TransientSecurity,
        (Some(50 | 89 | 202 | 262), _)
        | (_, "MaxTimeMSExpired" | "NetworkTimeout" | "ExceededTimeLimit") => ErrorClass::Timeout,
        (Some(11000 | 51003), _) | (_, "DuplicateKey") => ErrorClass::AlreadyExists,
        (Some(13 | 18), _) | (_, "Unauthorized" | "AuthenticationFailed") => ErrorClass::Auth,
        (Some(6 | 7 | 9001), _) | (_, "HostUnreachable" | "HostNotFound" | "SocketException") => {
            ErrorClass::Connectivity
        }
        _ if lowered.contains("no keys found for hmac") => ErrorClass::TransientSecurity,
        _ if lowered.contains("timed out") => ErrorClass::Timeout,
        _ if lowered.contains("already exists") => ErrorClass::AlreadyExists,
        _ if lowered.contains("authentication failed") => ErrorClass::Auth,
        _ => ErrorClass::Rejected,
    }
}

/// Returns true if the reply's `ok` field signals success.
#[must_use]
pub fn reply_ok(reply: &Document) -> bool {
    match reply.get("ok") {
        Some(Value::Bool(ok)) => *ok,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v >= 1.0),
        _ => false,
    }
}

/// Folds the `ok`-field convention into a `Result`.
///
/// # Errors
///
/// Returns a classified [`CommandError`] if the reply is not `ok`.
pub fn check_reply(reply: Document) -> Result<Document, CommandError> {
    if reply_ok(&reply) {
        Ok(reply)
    } else {
        Err(CommandError::from_reply(reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn failure(code: i64, code_name: &str, errmsg: &str) -> CommandError {
        check_reply(json!({"ok": 0, "code": code, "codeName": code_name, "errmsg": errmsg}))
            .unwrap_err()
    }

    #[test]
    fn test_ok_replies_pass_through() {
        let reply = check_reply(json!({"ok": 1, "shardAdded": "rs1"})).unwrap();
        assert_eq!(reply["shardAdded"], "rs1");
        assert!(check_reply(json!({"ok": 1.0})).is_ok());
        assert!(check_reply(json!({"ok": true})).is_ok());
    }

    #[test]
    fn test_missing_or_zero_ok_is_failure() {
        let err = check_reply(json!({"errmsg": "no"})).unwrap_err();
        assert_eq!(err.class, ErrorClass::Rejected);
        assert!(err.reply.is_some());
        assert!(check_reply(json!({"ok": 0})).is_err());
    }

    #[test]
    fn test_reply_without_errmsg_surfaces_document() {
        let err = check_reply(json!({"ok": 0, "note": "shard busy"})).unwrap_err();
        assert!(err.message.contains("shard busy"));
    }

    #[test]
    fn test_classification_by_code() {
        assert_eq!(failure(211, "", "").class, ErrorClass::TransientSecurity);
        assert_eq!(failure(50, "", "").class, ErrorClass::Timeout);
        assert_eq!(failure(51003, "Location51003", "").class, ErrorClass::AlreadyExists);
        assert_eq!(failure(18, "AuthenticationFailed", "").class, ErrorClass::Auth);
        assert_eq!(failure(6, "HostUnreachable", "").class, ErrorClass::Connectivity);
        assert_eq!(failure(23, "AlreadyInitialized", "").class, ErrorClass::Rejected);
    }

    #[test]
    fn test_classification_by_message() {
        assert_eq!(
            failure(
                1,
                "",
                "Cache Reader No keys found for HMAC that is valid for time"
            )
            .class,
            ErrorClass::TransientSecurity
        );
        assert_eq!(
            failure(64, "WriteConcernFailed", "waiting for replication timed out").class,
            ErrorClass::Timeout
        );
        assert_eq!(
            failure(2, "", "User \"root@admin\" already exists").class,
            ErrorClass::AlreadyExists
        );
    }

    #[test]
    fn test_connection_level_classes() {
        assert!(ErrorClass::Connectivity.is_connection_level());
        assert!(ErrorClass::Timeout.is_connection_level());
        assert!(!ErrorClass::Auth.is_connection_level());
    }

    #[test]
    fn test_display_includes_class() {
        let err = CommandError::connectivity("connection refused");
        assert_eq!(err.to_string(), "connectivity error: connection refused");
    }
}
