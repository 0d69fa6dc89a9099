//! Deterministic workload: prints `n!` and the time spent computing it.
//!
//! Output is a single JSON line on stdout:
//! `{"backend": "...", "n": 5, "result": "120", "exec_ns": 840}`.
//! Exits with status 2 if argv[1] is missing, not a non-negative integer, or
//! larger than the biggest `n` whose factorial fits in a `u128`.

use std::hint::black_box;
use std::process::ExitCode;
use std::time::Instant;

use serde_json::json;

/// Largest n with n! <= u128::MAX.
const MAX_N: u32 = 34;

fn factorial(n: u32) -> u128 {
    (2..=n as u128).product()
}

fn parse_n(arg: Option<String>) -> Option<u32> {
    arg?.trim().parse::<u32>().ok().filter(|n| *n <= MAX_N)
}

fn main() -> ExitCode {
    let Some(n) = parse_n(std::env::args().nth(1)) else {
        eprintln!("usage: factorial_wasi <n>  (0 <= n <= {MAX_N})");
        return ExitCode::from(2);
    };
    let backend = std::env::var("FAAS_BACKEND").unwrap_or_else(|_| "wasm".to_string());

    let t0 = Instant::now();
    let result = black_box(factorial(black_box(n)));
    let exec_ns = t0.elapsed().as_nanos() as u64;

    println!(
        "{}",
        json!({
            "backend": backend,
            "n": n,
            "result": result.to_string(),
            "exec_ns": exec_ns,
        })
    );
    ExitCode::SUCCESS
}
