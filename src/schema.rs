use serde::{Deserialize, Serialize};

use crate::Backend;

/// JSON line a workload prints on stdout. Extra fields (`backend`, `n`) are ignored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkloadOutput {
    pub result: String,
    pub exec_ns: u64,
}

/// Backend-specific timing of one cold invocation.
///
/// The two startup numbers are not comparable: the WASM one is measured directly
/// around compile + instantiate, the container one is `total - exec` and so also
/// carries process spawn, runtime daemon and teardown cost.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum SandboxTiming {
    Wasm {
        startup_wasm_ns: u64,
        total_exec_wasm_ns: u64,
    },
    Container {
        total_container_ns: u64,
        startup_container_ns: u64,
    },
}

/// Timing breakdown and result of a single cold invocation, as served by the endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Invocation {
    pub backend: Backend,
    pub n: i64,
    pub result: String,
    #[serde(flatten)]
    pub timing: SandboxTiming,
    /// Self-reported by the workload, pure computation only.
    pub exec_ns: u64,
}

impl Invocation {
    pub fn startup_ns(&self) -> u64 {
        match self.timing {
            SandboxTiming::Wasm {
                startup_wasm_ns, ..
            } => startup_wasm_ns,
            SandboxTiming::Container {
                startup_container_ns,
                ..
            } => startup_container_ns,
        }
    }

    /// Wall clock of the execution phase: the `_start` call for WASM, spawn-to-exit
    /// for containers. Always `>= exec_ns`.
    pub fn wall_ns(&self) -> u64 {
        match self.timing {
            SandboxTiming::Wasm {
                total_exec_wasm_ns, ..
            } => total_exec_wasm_ns,
            SandboxTiming::Container {
                total_container_ns,
                ..
            } => total_container_ns,
        }
    }
}

/// One retained measurement as seen from the caller's side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Sample {
    pub host_total_ns: u64,
    pub startup_ns: u64,
    pub exec_ns: u64,
    pub result: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Stat {
    pub median: u64,
    pub p95: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Summary {
    pub count: usize,
    pub host_total_ns: Stat,
    pub startup_ns: Stat,
    pub exec_ns: Stat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Case {
    pub backend: Backend,
    pub n: i64,
    pub summary: Summary,
    #[serde(rename = "raw")]
    pub samples: Vec<Sample>,
}

/// Run configuration embedded in the report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunSpec {
    pub inputs: Vec<i64>,
    pub repeats: usize,
    pub warmup_discarded: usize,
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMeta {
    pub schema_version: u32,
    pub bench_version: String,
    pub timestamp_utc: String,
    pub git_sha: Option<String>,
    pub wasm_module_sha256: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub run: RunMeta,
    pub spec: RunSpec,
    pub cases: Vec<Case>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wasm_invocation_uses_wasm_field_names() {
        let inv = Invocation {
            backend: Backend::Wasm,
            n: 5,
            result: "120".into(),
            timing: SandboxTiming::Wasm {
                startup_wasm_ns: 900,
                total_exec_wasm_ns: 50,
            },
            exec_ns: 7,
        };
        let v = serde_json::to_value(&inv).unwrap();
        assert_eq!(
            v,
            json!({
                "backend": "wasm",
                "n": 5,
                "result": "120",
                "startup_wasm_ns": 900,
                "total_exec_wasm_ns": 50,
                "exec_ns": 7,
            })
        );
    }

    #[test]
    fn container_payload_parses_into_container_timing() {
        let body = r#"{"backend":"container","n":34,"result":"295232799039604140847618609643520000000",
            "total_container_ns":400000000,"startup_container_ns":399990000,"exec_ns":10000}"#;
        let inv: Invocation = serde_json::from_str(body).unwrap();
        assert_eq!(inv.backend, Backend::Container);
        assert_eq!(inv.startup_ns(), 399_990_000);
        assert_eq!(inv.wall_ns(), 400_000_000);
        assert_eq!(inv.exec_ns, 10_000);
    }

    #[test]
    fn case_serializes_samples_as_raw() {
        let stat = Stat { median: 1, p95: 1 };
        let case = Case {
            backend: Backend::Wasm,
            n: 0,
            summary: Summary {
                count: 1,
                host_total_ns: stat,
                startup_ns: stat,
                exec_ns: stat,
            },
            samples: vec![Sample {
                host_total_ns: 1,
                startup_ns: 1,
                exec_ns: 1,
                result: "1".into(),
            }],
        };
        let v = serde_json::to_value(&case).unwrap();
        assert_eq!(v["raw"][0]["result"], "1");
        assert!(v.get("samples").is_none());
    }
}
