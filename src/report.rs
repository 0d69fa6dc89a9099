//! Runs every (backend, input) case and persists the report once, atomically.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

use crate::determinism::check_deterministic;
use crate::error::BenchError;
use crate::harness::{sample_case, BenchConfig, Invoke};
use crate::schema::{Case, Report, RunMeta};
use crate::stats::summarize;

pub const SCHEMA_VERSION: u32 = 1;

/// Samples, checks and summarizes every case, backends outer, inputs inner, both in
/// configured order. The first error of any kind aborts the whole run.
pub fn run_suite<I: Invoke + ?Sized>(invoker: &I, cfg: &BenchConfig) -> Result<Vec<Case>, BenchError> {
    cfg.validate()?;
    let mut cases = Vec::with_capacity(cfg.backends.len() * cfg.inputs.len());

    for &backend in &cfg.backends {
        for &n in &cfg.inputs {
            let samples = sample_case(invoker, backend, n, cfg.repeats, cfg.warmup)?;
            check_deterministic(backend, n, &samples)?;
            let summary = summarize(&samples)?;
            tracing::info!(
                median_host_total_ns = summary.host_total_ns.median,
                median_exec_ns = summary.exec_ns.median,
                "done: {backend} n={n}"
            );
            cases.push(Case {
                backend,
                n,
                summary,
                samples,
            });
        }
    }

    Ok(cases)
}

fn git_sha_short() -> Option<String> {
    std::env::var("GIT_SHA")
        .ok()
        .or_else(|| std::env::var("GITHUB_SHA").ok())
        .map(|s| s.chars().take(12).collect())
}

fn hex32(d: [u8; 32]) -> String {
    let mut s = String::with_capacity(64);
    for b in d {
        s.push_str(&format!("{:02x}", b));
    }
    s
}

/// Hex SHA-256 of the WASM artifact, if it can be read.
pub fn file_sha256(path: &Path) -> Option<String> {
    let bytes = fs::read(path).ok()?;
    let digest: [u8; 32] = Sha256::digest(&bytes).into();
    Some(hex32(digest))
}

/// Module whose digest belongs in the report. Only an in-process run is known to
/// execute the local artifact; a remote endpoint may serve a different build.
pub fn sampled_module(direct: bool, module: &Path) -> Option<&Path> {
    direct.then_some(module)
}

pub fn run_meta(started_at: DateTime<Utc>, wasm_module: Option<&Path>) -> RunMeta {
    RunMeta {
        schema_version: SCHEMA_VERSION,
        bench_version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp_utc: started_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        git_sha: git_sha_short(),
        wasm_module_sha256: wasm_module.and_then(file_sha256),
    }
}

pub fn assemble(run: RunMeta, cfg: &BenchConfig, cases: Vec<Case>) -> Report {
    Report {
        run,
        spec: cfg.run_spec(),
        cases,
    }
}

pub fn report_file_name(started_at: DateTime<Utc>) -> String {
    format!("bench-v1-{}.json", started_at.format("%Y%m%d-%H%M%S"))
}

/// Writes the report into `dir` under its timestamped name.
///
/// The JSON goes to a temp file in the same directory which is then renamed into
/// place, so the artifact either appears complete or not at all. An existing
/// report with the same name is never overwritten.
pub fn write_report(report: &Report, dir: &Path, started_at: DateTime<Utc>) -> Result<PathBuf, BenchError> {
    fs::create_dir_all(dir)?;
    let json = serde_json::to_string_pretty(report)?;
    let path = dir.join(report_file_name(started_at));

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(json.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist_noclobber(&path).map_err(|e| BenchError::Io(e.error))?;

    Ok(path)
}
