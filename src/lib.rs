use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub mod client;
pub mod determinism;
pub mod endpoint;
pub mod error;
pub mod harness;
pub mod invoker;
pub mod report;
pub mod schema;
pub mod stats;

pub use error::BenchError;

/// Sandboxing backend a workload invocation runs in.
#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Fresh wasmtime engine/store/instance per call.
    Wasm,
    /// Fresh single-use container per call.
    Container,
}

impl Backend {
    pub const ALL: [Backend; 2] = [Backend::Wasm, Backend::Container];

    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Wasm => "wasm",
            Backend::Container => "container",
        }
    }

    /// Parses the `backend` query value accepted by the invocation endpoint.
    pub fn parse(raw: &str) -> Option<Backend> {
        match raw {
            "wasm" => Some(Backend::Wasm),
            "container" => Some(Backend::Container),
            _ => None,
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
