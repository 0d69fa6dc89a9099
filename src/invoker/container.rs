//! Container backend: one `docker run --rm <image> <n>` per invocation.

use std::process::Command;
use std::time::Instant;

use super::{check_exec_within, elapsed_ns, parse_workload_output, SandboxExit, SandboxInvoker};
use crate::error::BenchError;
use crate::schema::{Invocation, SandboxTiming};
use crate::Backend;

/// Command line is `runtime run_args... image n`.
#[derive(Clone, Debug)]
pub struct ContainerConfig {
    pub runtime: String,
    pub run_args: Vec<String>,
    pub image: String,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            runtime: "docker".to_string(),
            run_args: vec!["run".to_string(), "--rm".to_string()],
            image: "faas-compare-factorial-py:0.1".to_string(),
        }
    }
}

pub struct ContainerInvoker {
    config: ContainerConfig,
}

impl ContainerInvoker {
    pub fn new(config: ContainerConfig) -> Self {
        Self { config }
    }

    fn command(&self, n: i64) -> Command {
        let mut cmd = Command::new(&self.config.runtime);
        cmd.args(&self.config.run_args)
            .arg(&self.config.image)
            .arg(n.to_string());
        cmd
    }
}

impl SandboxInvoker for ContainerInvoker {
    fn backend(&self) -> Backend {
        Backend::Container
    }

    fn invoke(&self, n: i64) -> Result<Invocation, BenchError> {
        let mut cmd = self.command(n);

        let t0 = Instant::now();
        let output = cmd.output().map_err(|e| {
            BenchError::sandbox(
                Backend::Container,
                format!("failed to spawn {}: {e}", self.config.runtime),
            )
        })?;
        let total_container_ns = elapsed_ns(t0);

        // A missing code means the process was killed by a signal.
        let exit = SandboxExit::from_code(output.status.code().unwrap_or(-1));
        if let SandboxExit::FaultExit(code) = exit {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BenchError::sandbox(
                Backend::Container,
                format!("container failed rc={code} stderr={}", stderr.trim()),
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let payload = parse_workload_output(&stdout)?;
        check_exec_within(total_container_ns, payload.exec_ns)?;

        Ok(Invocation {
            backend: Backend::Container,
            n,
            result: payload.result,
            timing: SandboxTiming::Container {
                total_container_ns,
                startup_container_ns: total_container_ns - payload.exec_ns,
            },
            exec_ns: payload.exec_ns,
        })
    }
}
