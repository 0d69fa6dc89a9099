//! Cold invocation of the factorial workload inside a sandbox.
//!
//! Every call builds its sandbox from scratch: a fresh wasmtime engine, store and
//! WASI context, or a fresh `--rm` container. Nothing is pooled or memoized, since a
//! reused resource would turn a cold-start measurement into a warm one.

pub mod container;
pub mod wasm;

use std::time::Instant;

use crate::error::BenchError;
use crate::schema::{Invocation, WorkloadOutput};
use crate::Backend;

pub use container::{ContainerConfig, ContainerInvoker};
pub use wasm::{WasmConfig, WasmInvoker};

/// One sandboxing backend able to run the workload for a single input.
pub trait SandboxInvoker: Send + Sync {
    fn backend(&self) -> Backend;

    /// Performs one cold invocation. Blocks until the sandbox has exited.
    fn invoke(&self, n: i64) -> Result<Invocation, BenchError>;
}

/// How a sandboxed program terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SandboxExit {
    /// Exit status 0, including a WASI `proc_exit(0)` surfacing as a trap.
    NormalExit,
    /// Any other status.
    FaultExit(i32),
}

impl SandboxExit {
    pub fn from_code(code: i32) -> Self {
        if code == 0 {
            SandboxExit::NormalExit
        } else {
            SandboxExit::FaultExit(code)
        }
    }

    pub fn is_normal(&self) -> bool {
        matches!(self, SandboxExit::NormalExit)
    }
}

/// Nanoseconds since `start`, saturating at `u64::MAX`.
pub fn elapsed_ns(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_nanos()).unwrap_or(u64::MAX)
}

/// Self-reported `exec_ns` must fit inside the wall time measured around it.
pub fn check_exec_within(wall_ns: u64, exec_ns: u64) -> Result<(), BenchError> {
    if exec_ns > wall_ns {
        return Err(BenchError::Workload(format!(
            "reported exec_ns {exec_ns} exceeds measured wall time {wall_ns}ns"
        )));
    }
    Ok(())
}

/// Parses the single JSON line a workload writes to stdout.
pub fn parse_workload_output(raw: &str) -> Result<WorkloadOutput, BenchError> {
    let line = raw.trim();
    if line.is_empty() {
        return Err(BenchError::Workload("workload produced no output".to_string()));
    }
    serde_json::from_str(line).map_err(|e| BenchError::Workload(format!("{e}: {line}")))
}

/// Routes an invocation to the invoker for its backend.
///
/// This is the only place the pipeline branches on `Backend`.
pub struct Dispatcher {
    invokers: Vec<Box<dyn SandboxInvoker>>,
}

impl Dispatcher {
    pub fn new(wasm: WasmConfig, container: ContainerConfig) -> Self {
        Self::from_invokers(vec![
            Box::new(WasmInvoker::new(wasm)),
            Box::new(ContainerInvoker::new(container)),
        ])
    }

    pub fn from_invokers(invokers: Vec<Box<dyn SandboxInvoker>>) -> Self {
        Self { invokers }
    }

    pub fn invoke(&self, backend: Backend, n: i64) -> Result<Invocation, BenchError> {
        let invoker = self
            .invokers
            .iter()
            .find(|inv| inv.backend() == backend)
            .ok_or_else(|| BenchError::Config(format!("no invoker registered for {backend}")))?;
        let invocation = invoker.invoke(n)?;
        tracing::debug!(
            backend = %backend,
            n,
            startup_ns = invocation.startup_ns(),
            wall_ns = invocation.wall_ns(),
            exec_ns = invocation.exec_ns,
            "invocation finished"
        );
        Ok(invocation)
    }
}
