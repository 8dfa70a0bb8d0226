//! The value every handler and middleware returns.
//!
//! # Responsibilities
//! - Carry either a success payload or a rejection status
//! - Capture JSON serialization eagerly so failures surface as 500s
//!
//! # Design Decisions
//! - Exactly one variant is populated per value
//! - `Ok(Payload::Empty)` means "success, no body"
//! - `Err { cause: None }` means "reject with only a status line"

use axum::http::StatusCode;
use bytes::Bytes;
use serde::Serialize;
use std::fmt;

/// Boxed error carried by a rejection or a failed payload.
pub struct Cause(Box<dyn std::error::Error + Send + Sync>);

impl Cause {
    /// Wrap any error.
    pub fn new<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self(error.into())
    }

    /// The text written to the client for this cause.
    pub fn message(&self) -> String {
        self.0.to_string()
    }

    /// Borrow the underlying error.
    pub fn inner(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self.0.as_ref()
    }
}

impl fmt::Debug for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cause({:?})", self.0)
    }
}

impl fmt::Display for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for Cause {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for Cause {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

/// Success body of an [`Outcome`].
#[derive(Debug)]
pub enum Payload {
    /// No body; status line only.
    Empty,
    /// Written verbatim, no content-type override.
    Text(String),
    /// Written verbatim.
    Bytes(Bytes),
    /// An error mistakenly returned as success. Materialized as a 500.
    Failure(Cause),
    /// Serialized JSON, or the serialization error.
    Json(serde_json::Result<Vec<u8>>),
}

/// Result of a handler or middleware stage.
#[derive(Debug)]
pub enum Outcome {
    Ok(Payload),
    Err {
        status: StatusCode,
        cause: Option<Cause>,
    },
}

impl Outcome {
    /// Success with a JSON body.
    pub fn ok<T: Serialize + ?Sized>(value: &T) -> Self {
        Outcome::Ok(Payload::Json(serde_json::to_vec(value)))
    }

    /// Success with a plain text body.
    pub fn text(value: impl Into<String>) -> Self {
        Outcome::Ok(Payload::Text(value.into()))
    }

    /// Success with a raw byte body.
    pub fn bytes(value: impl Into<Bytes>) -> Self {
        Outcome::Ok(Payload::Bytes(value.into()))
    }

    /// Success without a body.
    pub fn empty() -> Self {
        Outcome::Ok(Payload::Empty)
    }

    /// Success carrying an error value. Degrades to a 500 when written.
    pub fn failure(cause: impl Into<Cause>) -> Self {
        Outcome::Ok(Payload::Failure(cause.into()))
    }

    /// Rejection with a status and a message for the client.
    pub fn err(status: StatusCode, cause: impl Into<Cause>) -> Self {
        Outcome::Err {
            status,
            cause: Some(cause.into()),
        }
    }

    /// Rejection with only a status line.
    pub fn reject(status: StatusCode) -> Self {
        Outcome::Err {
            status,
            cause: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Ok(_))
    }

    pub fn is_err(&self) -> bool {
        !self.is_ok()
    }

    /// Status this outcome maps to; 200 for every success.
    pub fn status(&self) -> StatusCode {
        match self {
            Outcome::Ok(_) => StatusCode::OK,
            Outcome::Err { status, .. } => *status,
        }
    }

    /// Cause of a rejection, if any.
    pub fn cause(&self) -> Option<&Cause> {
        match self {
            Outcome::Ok(_) => None,
            Outcome::Err { cause, .. } => cause.as_ref(),
        }
    }
}
