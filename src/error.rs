//! Error kinds shared by the invokers, the endpoint and the sampling run.

use std::time::Duration;

use thiserror::Error;

use crate::Backend;

#[derive(Debug, Error)]
pub enum BenchError {
    /// Malformed backend or `n` at the endpoint boundary.
    #[error("{0}")]
    InvalidInput(String),

    /// Non-zero exit or trap inside a sandbox.
    #[error("{backend} sandbox fault: {message}")]
    SandboxFault { backend: Backend, message: String },

    /// Samples of one case disagree on the computed result.
    #[error("non-deterministic result for {backend} n={n}: {results:?}")]
    NonDeterminism {
        backend: Backend,
        n: i64,
        results: Vec<String>,
    },

    #[error("request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    /// The endpoint answered with a non-success status and an `error` body.
    #[error("endpoint returned {status}: {message}")]
    Endpoint { status: u16, message: String },

    #[error("http transport error: {0}")]
    Http(String),

    /// Workload stdout did not match the expected JSON contract.
    #[error("unexpected workload output: {0}")]
    Workload(String),

    #[error("cannot summarize an empty case")]
    EmptySamples,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl BenchError {
    pub fn sandbox(backend: Backend, message: impl Into<String>) -> Self {
        BenchError::SandboxFault {
            backend,
            message: message.into(),
        }
    }

    /// HTTP status the invocation endpoint answers with for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            BenchError::InvalidInput(_) => 400,
            _ => 500,
        }
    }
}
