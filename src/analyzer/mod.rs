//! Remote document analysis.
//!
//! The remote service is a black box: we give it bytes and a model name, and
//! it eventually gives us back a structured document. We don't model its full
//! schema. Results are plain [`Value`] trees, and [`crate::mapper`] picks out
//! the handful of fields we care about.

use std::{error, fmt};

use crate::{models::DocumentModel, prelude::*};

pub mod azure;
#[cfg(test)]
pub mod fake;

/// Interface to a remote document analysis service.
#[async_trait]
pub trait DocumentAnalyzer: Send + Sync + 'static {
    /// Analyze a document with the specified model, and wait for the result.
    ///
    /// Errors reported by the remote service should be returned as (or wrap)
    /// [`RemoteServiceError`], so callers can tell them apart from our own
    /// bugs.
    async fn analyze(&self, data: Vec<u8>, model: DocumentModel) -> Result<Value>;
}

/// An error reported by, or while talking to, the remote analysis service.
#[derive(Debug)]
pub enum RemoteServiceError {
    /// We couldn't reach the service, or the connection failed.
    Transport(reqwest::Error),

    /// The service rejected our request, or the analysis itself failed.
    Service {
        /// The HTTP status, if the error came from an HTTP response rather than
        /// from a failed operation.
        status: Option<u16>,
        /// The service's error code.
        code: String,
        /// The service's error message.
        message: String,
    },
}

impl fmt::Display for RemoteServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteServiceError::Transport(err) => {
                write!(f, "could not reach analysis service: {err}")
            }
            RemoteServiceError::Service {
                status: Some(status),
                code,
                message,
            } => write!(f, "{code}: {message} (HTTP {status})"),
            RemoteServiceError::Service {
                status: None,
                code,
                message,
            } => write!(f, "{code}: {message}"),
        }
    }
}

impl error::Error for RemoteServiceError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            RemoteServiceError::Transport(err) => Some(err),
            RemoteServiceError::Service { .. } => None,
        }
    }
}

impl From<reqwest::Error> for RemoteServiceError {
    fn from(err: reqwest::Error) -> Self {
        RemoteServiceError::Transport(err)
    }
}
