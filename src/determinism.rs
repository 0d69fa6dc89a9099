use std::collections::BTreeSet;

use crate::error::BenchError;
use crate::schema::Sample;
use crate::Backend;

/// Fails with `NonDeterminism` if the samples of one case report more than one result.
///
/// The offending values are reported sorted so the error is stable across runs.
pub fn check_deterministic(backend: Backend, n: i64, samples: &[Sample]) -> Result<(), BenchError> {
    let distinct: BTreeSet<&str> = samples.iter().map(|s| s.result.as_str()).collect();
    if distinct.len() > 1 {
        return Err(BenchError::NonDeterminism {
            backend,
            n,
            results: distinct.into_iter().map(str::to_string).collect(),
        });
    }
    Ok(())
}
