#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]

pub mod api_tokens;
pub mod app;
pub mod battery;
pub mod capabilities;
pub mod config;
pub mod geo;
pub mod mapbox;
pub mod model;
pub mod notifications;
pub mod persistence;
pub mod stations;
pub mod vehicles;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub use app::{App, Event, ViewModel};
pub use capabilities::{Capabilities, Effect};
pub use model::Model;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Network,
    Timeout,
    Authentication,
    Validation,
    NotFound,
    RateLimited,
    Deserialization,
    Location,
    LocationPermissionDenied,
    Internal,
    Unknown,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Network => "NETWORK_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::Authentication => "AUTH_ERROR",
            Self::Validation => "VALIDATION_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::RateLimited => "RATE_LIMITED",
            Self::Deserialization => "DESERIALIZATION_ERROR",
            Self::Location => "LOCATION_ERROR",
            Self::LocationPermissionDenied => "LOCATION_PERMISSION_DENIED",
            Self::Internal => "INTERNAL_ERROR",
            Self::Unknown => "UNKNOWN_ERROR",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppError {
    pub kind: ErrorKind,
    pub message: String,
    pub internal_message: Option<String>,
    pub context: HashMap<String, String>,
}

impl AppError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            internal_message: None,
            context: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_internal(mut self, internal: impl Into<String>) -> Self {
        self.internal_message = Some(internal.into());
        self
    }

    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }

    #[must_use]
    pub fn user_facing_message(&self) -> String {
        match self.kind {
            ErrorKind::Network => {
                "Unable to connect. Please check your internet connection and try again.".into()
            }
            ErrorKind::Timeout => "The request timed out. Please try again.".into(),
            ErrorKind::Authentication => {
                "The mapping service rejected your access token. Please check it and try again."
                    .into()
            }
            ErrorKind::Validation | ErrorKind::Location | ErrorKind::LocationPermissionDenied => {
                self.message.clone()
            }
            ErrorKind::NotFound => "The requested item could not be found.".into(),
            ErrorKind::RateLimited => "Too many requests. Please wait a moment and try again.".into(),
            ErrorKind::Deserialization => {
                "Received data in an unexpected format. Please try again later.".into()
            }
            ErrorKind::Internal | ErrorKind::Unknown => {
                "An unexpected error occurred. Please try again.".into()
            }
        }
    }

    #[must_use]
    pub fn from_http_status(status: u16, body: Option<&[u8]>) -> Self {
        let kind = match status {
            400 | 422 => ErrorKind::Validation,
            401 | 403 => ErrorKind::Authentication,
            404 => ErrorKind::NotFound,
            408 => ErrorKind::Timeout,
            429 => ErrorKind::RateLimited,
            500..=599 => ErrorKind::Internal,
            _ => ErrorKind::Unknown,
        };

        let message = body
            .and_then(|b| serde_json::from_slice::<ServiceErrorResponse>(b).ok())
            .map(|e| e.message)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("HTTP error: {status}"));

        Self::new(kind, message).with_context("http_status", status.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message)?;
        if let Some(internal) = &self.internal_message {
            write!(f, " (internal: {internal})")?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}

/// Error body shape used by the mapping service.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ServiceErrorResponse {
    #[serde(default)]
    message: String,
}

pub type AppResult<T> = Result<T, AppError>;

impl From<geo::CoordinateError> for AppError {
    fn from(e: geo::CoordinateError) -> Self {
        AppError::new(ErrorKind::Validation, e.to_string())
    }
}

impl From<mapbox::TokenError> for AppError {
    fn from(e: mapbox::TokenError) -> Self {
        AppError::new(ErrorKind::Validation, e.to_string())
    }
}

impl From<mapbox::RequestError> for AppError {
    fn from(e: mapbox::RequestError) -> Self {
        match e {
            mapbox::RequestError::Token(inner) => inner.into(),
            other @ mapbox::RequestError::InvalidBaseUrl { .. } => {
                AppError::new(ErrorKind::Internal, "Mapping service is misconfigured")
                    .with_internal(other.to_string())
            }
        }
    }
}

impl From<api_tokens::ApiTokenError> for AppError {
    fn from(e: api_tokens::ApiTokenError) -> Self {
        match e {
            api_tokens::ApiTokenError::EmptyName => {
                AppError::new(ErrorKind::Validation, "Please provide a name for your token")
            }
            api_tokens::ApiTokenError::NotFound(_) => {
                AppError::new(ErrorKind::NotFound, e.to_string())
            }
        }
    }
}
