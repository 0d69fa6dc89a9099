use std::time::Instant;

use crate::error::BenchError;
use crate::invoker::{elapsed_ns, Dispatcher};
use crate::schema::{Invocation, RunSpec, Sample};
use crate::Backend;

pub const DEFAULT_INPUTS: [i64; 7] = [0, 1, 2, 5, 10, 20, 34];
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/invoke/";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Profile {
    Quick,
    Full,
}

impl Profile {
    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::Quick => "quick",
            Profile::Full => "full",
        }
    }

    pub fn warmup_iters(&self) -> usize {
        1
    }

    pub fn repeats(&self) -> usize {
        match self {
            Profile::Quick => 5,
            Profile::Full => 30,
        }
    }
}

#[derive(Clone, Debug)]
pub struct BenchConfig {
    pub inputs: Vec<i64>,
    pub backends: Vec<Backend>,
    /// Samples retained per case.
    pub repeats: usize,
    /// Leading invocations discarded per case.
    pub warmup: usize,
    pub base_url: String,
}

impl BenchConfig {
    pub fn for_profile(profile: Profile) -> Self {
        Self {
            inputs: DEFAULT_INPUTS.to_vec(),
            backends: Backend::ALL.to_vec(),
            repeats: profile.repeats(),
            warmup: profile.warmup_iters(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), BenchError> {
        if self.repeats == 0 {
            return Err(BenchError::Config("repeats must be at least 1".into()));
        }
        if self.inputs.is_empty() {
            return Err(BenchError::Config("at least one input is required".into()));
        }
        if self.backends.is_empty() {
            return Err(BenchError::Config("at least one backend is required".into()));
        }
        Ok(())
    }

    pub fn run_spec(&self) -> RunSpec {
        RunSpec {
            inputs: self.inputs.clone(),
            repeats: self.repeats,
            warmup_discarded: self.warmup,
            base_url: self.base_url.clone(),
        }
    }
}

/// Something that can perform one invocation for a (backend, input) pair:
/// the HTTP endpoint client, or the in-process dispatcher.
pub trait Invoke {
    fn invoke(&self, backend: Backend, n: i64) -> Result<Invocation, BenchError>;
}

impl Invoke for Dispatcher {
    fn invoke(&self, backend: Backend, n: i64) -> Result<Invocation, BenchError> {
        Dispatcher::invoke(self, backend, n)
    }
}

/// Issues `warmup + repeats` strictly sequential invocations and keeps the last `repeats`.
///
/// The first failure aborts the case; no partial sample set is returned and nothing
/// is retried.
pub fn sample_case<I: Invoke + ?Sized>(
    invoker: &I,
    backend: Backend,
    n: i64,
    repeats: usize,
    warmup: usize,
) -> Result<Vec<Sample>, BenchError> {
    let mut samples = Vec::with_capacity(repeats);

    for i in 0..repeats + warmup {
        let t0 = Instant::now();
        let invocation = invoker.invoke(backend, n)?;
        let host_total_ns = elapsed_ns(t0);

        if i < warmup {
            tracing::debug!(backend = %backend, n, host_total_ns, "warmup invocation discarded");
            continue;
        }

        samples.push(Sample {
            host_total_ns,
            startup_ns: invocation.startup_ns(),
            exec_ns: invocation.exec_ns,
            result: invocation.result,
        });
    }

    Ok(samples)
}


#[cfg(test)]
mod tests {
    use super::testing::Scripted;
    use super::*;

    #[test]
    fn thirty_repeats_one_warmup_issues_31_calls() {
        let script = Scripted::constant("120", 31);
        let samples = sample_case(&script, Backend::Wasm, 5, 30, 1).unwrap();
        assert_eq!(script.calls.get(), 31);
        assert_eq!(samples.len(), 30);
    }

    #[test]
    fn warmup_prefix_is_dropped_in_order() {
        let script = Scripted::constant("1", 4);
        let samples = sample_case(&script, Backend::Wasm, 0, 2, 2).unwrap();
        // exec_ns carries the call index in the scripted invoker.
        let order: Vec<u64> = samples.iter().map(|s| s.exec_ns).collect();
        assert_eq!(order, vec![2, 3]);
        assert_eq!(samples[0].startup_ns, 1_002);
    }

    #[test]
    fn failure_aborts_case_without_retry() {
        let script = Scripted::new(vec![
            Ok("120".into()),
            Ok("120".into()),
            Err(BenchError::sandbox(Backend::Container, "rc=1")),
            Ok("120".into()),
        ]);
        let err = sample_case(&script, Backend::Container, 5, 3, 1).unwrap_err();
        assert!(matches!(err, BenchError::SandboxFault { .. }));
        assert_eq!(script.calls.get(), 3);
    }

    #[test]
    fn failure_during_warmup_also_aborts() {
        let script = Scripted::new(vec![Err(BenchError::Timeout {
            url: "http://127.0.0.1:8000/invoke/".into(),
            timeout: std::time::Duration::from_secs(30),
        })]);
        assert!(matches!(
            sample_case(&script, Backend::Wasm, 1, 5, 1),
            Err(BenchError::Timeout { .. })
        ));
    }

    #[test]
    fn profiles_match_expected_sizes() {
        let full = BenchConfig::for_profile(Profile::Full);
        assert_eq!((full.repeats, full.warmup), (30, 1));
        assert_eq!(full.inputs, DEFAULT_INPUTS.to_vec());
        assert_eq!(BenchConfig::for_profile(Profile::Quick).repeats, 5);
    }

    #[test]
    fn zero_repeats_is_rejected() {
        let mut cfg = BenchConfig::for_profile(Profile::Quick);
        cfg.repeats = 0;
        assert!(matches!(cfg.validate(), Err(BenchError::Config(_))));
    }

    #[test]
    fn run_spec_mirrors_config() {
        let cfg = BenchConfig::for_profile(Profile::Full);
        let spec = cfg.run_spec();
        assert_eq!(spec.warmup_discarded, 1);
        assert_eq!(spec.base_url, DEFAULT_BASE_URL);
    }
}
