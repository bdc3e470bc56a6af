// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{fmt, io, result};

use reqwest::StatusCode;
use thiserror::Error;

pub(crate) type Result<T, E = Error> = result::Result<T, E>;

#[derive(Error, Debug)]
pub(crate) enum Error {
    #[error("IO operation failed: {0}")]
    Io(#[from] io::Error),
    #[error("JSON format error: {0}")]
    Json(serde_json::Error),
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("access token could not be decoded: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("API error: {0}")]
    Api(#[from] ApiError),
    #[error("no refresh token")]
    NoRefreshToken,
    #[error("you must log in to do that")]
    NotAuthenticated,
    #[error("your account is not allowed to do that")]
    NotPrivileged,
    #[error("no conversation is selected")]
    NoConversation,
    #[error("message is empty")]
    EmptyMessage,
    #[error("internal communication error: {0}")]
    Internal(#[from] Internal),
    #[error("command execution failed")]
    Command,
    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    /// The server's response status, if this error came from one.
    pub(crate) fn status(&self) -> Option<StatusCode> {
        match *self {
            Self::Api(ref e) => Some(e.status),
            Self::Io(_)
            | Self::Json(_)
            | Self::Http(_)
            | Self::Token(_)
            | Self::NoRefreshToken
            | Self::NotAuthenticated
            | Self::NotPrivileged
            | Self::NoConversation
            | Self::EmptyMessage
            | Self::Internal(_)
            | Self::Command
            | Self::Cancelled => None,
        }
    }

    pub(crate) fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }

    /// The server-provided `detail` message, if any.
    pub(crate) fn detail(&self) -> Option<&str> {
        match *self {
            Self::Api(ref e) => e.detail(),
            Self::Io(_)
            | Self::Json(_)
            | Self::Http(_)
            | Self::Token(_)
            | Self::NoRefreshToken
            | Self::NotAuthenticated
            | Self::NotPrivileged
            | Self::NoConversation
            | Self::EmptyMessage
            | Self::Internal(_)
            | Self::Command
            | Self::Cancelled => None,
        }
    }

    /// The `detail` message, or failing that the first field validation
    /// message the server reported.
    pub(crate) fn detail_or_field_error(&self) -> Option<&str> {
        match *self {
            Self::Api(ref e) => e.detail().or_else(|| e.first_field_error()),
            Self::Io(_)
            | Self::Json(_)
            | Self::Http(_)
            | Self::Token(_)
            | Self::NoRefreshToken
            | Self::NotAuthenticated
            | Self::NotPrivileged
            | Self::NoConversation
            | Self::EmptyMessage
            | Self::Internal(_)
            | Self::Command
            | Self::Cancelled => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        // LINT: Deliberate fall-through that should catch future cases added to
        // the enum.
        #[allow(clippy::wildcard_enum_match_arm)]
        match value.classify() {
            serde_json::error::Category::Io => Self::Io(value.into()),
            _ => Self::Json(value),
        }
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::Io(value.into())
    }
}

/// A non-success response from the API.
#[derive(Debug, Clone)]
pub(crate) struct ApiError {
    pub(crate) status: StatusCode,
    pub(crate) body: serde_json::Value,
}

impl ApiError {
    pub(crate) const fn new(status: StatusCode, body: serde_json::Value) -> Self {
        Self { status, body }
    }

    pub(crate) fn detail(&self) -> Option<&str> {
        self.body.get("detail").and_then(serde_json::Value::as_str)
    }

    /// Validation errors come back as `{"field": ["message", ...], ...}`. The
    /// first message of the first field wins; field order is the server's.
    pub(crate) fn first_field_error(&self) -> Option<&str> {
        let first = self.body.as_object()?.values().next()?;
        match *first {
            serde_json::Value::Array(ref messages) => messages.first()?.as_str(),
            serde_json::Value::String(ref message) => Some(message),
            serde_json::Value::Null
            | serde_json::Value::Bool(_)
            | serde_json::Value::Number(_)
            | serde_json::Value::Object(_) => None,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.detail().or_else(|| self.first_field_error()) {
            Some(message) => write!(f, "server responded with {}: {}", self.status, message),
            None => write!(f, "server responded with {}", self.status),
        }
    }
}

impl std::error::Error for ApiError {}

#[derive(Error, Debug)]
pub(crate) enum Internal {
    #[error("session state channel is closed")]
    ChannelClosed,
    #[error("no data directory is available for this user")]
    NoProjectDirs,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn detail_takes_precedence_over_field_errors() {
        let err = Error::from(ApiError::new(
            StatusCode::BAD_REQUEST,
            json!({"detail": "No active account found", "id_no": ["bad"]}),
        ));

        assert_eq!(err.detail_or_field_error(), Some("No active account found"));
    }

    #[test]
    fn first_field_error_follows_server_order() {
        let err = ApiError::new(
            StatusCode::BAD_REQUEST,
            serde_json::from_str(
                r#"{"password": ["This password is too common.", "Too short."], "email": ["Enter a valid email address."]}"#,
            )
            .unwrap(),
        );

        assert_eq!(err.first_field_error(), Some("This password is too common."));
        assert_eq!(
            err.to_string(),
            "server responded with 400 Bad Request: This password is too common."
        );
    }

    #[test]
    fn non_api_errors_have_no_message() {
        assert_eq!(Error::NoRefreshToken.detail_or_field_error(), None);
        assert_eq!(Error::NoRefreshToken.to_string(), "no refresh token");
        assert!(!Error::Command.is_unauthorized());
    }
}
