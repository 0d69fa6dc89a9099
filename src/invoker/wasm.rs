//! WASM backend: wasmtime with WASI preview1, stdout captured to a scoped temp file.

use std::path::PathBuf;
use std::time::Instant;

use wasmtime::{Engine, Linker, Module, Store};
use wasmtime_wasi::preview1::{self, WasiP1Ctx};
use wasmtime_wasi::{I32Exit, OutputFile, WasiCtxBuilder};

use super::{check_exec_within, elapsed_ns, parse_workload_output, SandboxExit, SandboxInvoker};
use crate::error::BenchError;
use crate::schema::{Invocation, SandboxTiming};
use crate::Backend;

#[derive(Clone, Debug)]
pub struct WasmConfig {
    /// Compiled workload (`.wasm`, or `.wat` text).
    pub module_path: PathBuf,
    /// argv[0] handed to the program.
    pub program_name: String,
    /// Where stdout capture files are created; system temp dir if unset.
    pub capture_dir: Option<PathBuf>,
}

impl Default for WasmConfig {
    fn default() -> Self {
        Self {
            module_path: PathBuf::from("artifacts/wasm/factorial.wasm"),
            program_name: "factorial_wasi".to_string(),
            capture_dir: None,
        }
    }
}

pub struct WasmInvoker {
    config: WasmConfig,
}

fn fault(e: impl std::fmt::Display) -> BenchError {
    BenchError::sandbox(Backend::Wasm, e.to_string())
}

/// Maps the outcome of `_start` onto a termination kind.
///
/// WASI programs usually leave through `proc_exit`, which wasmtime reports as an
/// `I32Exit` error even for status 0. Any other error is a trap.
fn classify(outcome: wasmtime::Result<()>) -> Result<SandboxExit, BenchError> {
    match outcome {
        Ok(()) => Ok(SandboxExit::NormalExit),
        Err(e) => match e.downcast_ref::<I32Exit>() {
            Some(exit) => Ok(SandboxExit::from_code(exit.0)),
            None => Err(fault(format!("trap: {e:#}"))),
        },
    }
}

impl WasmInvoker {
    pub fn new(config: WasmConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WasmConfig {
        &self.config
    }
}

impl SandboxInvoker for WasmInvoker {
    fn backend(&self) -> Backend {
        Backend::Wasm
    }

    fn invoke(&self, n: i64) -> Result<Invocation, BenchError> {
        let engine = Engine::default();
        let mut linker: Linker<WasiP1Ctx> = Linker::new(&engine);
        preview1::add_to_linker_sync(&mut linker, |cx| cx).map_err(fault)?;

        // Removed when dropped, on every return path below.
        let mut builder = tempfile::Builder::new();
        builder.prefix("wasi_out_").suffix(".txt");
        let capture = match &self.config.capture_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        let stdout = capture.reopen()?;

        let t0 = Instant::now();
        let module = Module::from_file(&engine, &self.config.module_path)
            .map_err(|e| fault(format!("load {}: {e:#}", self.config.module_path.display())))?;
        let mut wasi = WasiCtxBuilder::new();
        wasi.args(&[self.config.program_name.clone(), n.to_string()])
            .stdout(OutputFile::new(stdout));
        let mut store = Store::new(&engine, wasi.build_p1());
        let instance = linker
            .instantiate(&mut store, &module)
            .map_err(|e| fault(format!("instantiate: {e:#}")))?;
        let startup_wasm_ns = elapsed_ns(t0);

        let t1 = Instant::now();
        let outcome = instance
            .get_typed_func::<(), ()>(&mut store, "_start")
            .and_then(|start| start.call(&mut store, ()));
        let total_exec_wasm_ns = elapsed_ns(t1);
        drop(store);

        if let SandboxExit::FaultExit(code) = classify(outcome)? {
            return Err(fault(format!("program exited with status {code}")));
        }

        let raw = std::fs::read_to_string(capture.path())?;
        let output = parse_workload_output(&raw)?;
        check_exec_within(total_exec_wasm_ns, output.exec_ns)?;

        Ok(Invocation {
            backend: Backend::Wasm,
            n,
            result: output.result,
            timing: SandboxTiming::Wasm {
                startup_wasm_ns,
                total_exec_wasm_ns,
            },
            exec_ns: output.exec_ns,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, TempDir};

    /// Module that prints `stdout` to fd 1 and then optionally calls `proc_exit`.
    fn workload_wat(stdout: &str, exit_code: Option<i32>) -> String {
        let escaped = stdout
            .replace('\\', "\\\\")
            .replace('"', "\\\"")
            .replace('\n', "\\n");
        let exit = exit_code
            .map(|code| format!("(call $proc_exit (i32.const {code}))"))
            .unwrap_or_default();
        format!(
            r#"(module
  (import "wasi_snapshot_preview1" "fd_write" (func $fd_write (param i32 i32 i32 i32) (result i32)))
  (import "wasi_snapshot_preview1" "proc_exit" (func $proc_exit (param i32)))
  (memory (export "memory") 1)
  (data (i32.const 64) "{escaped}")
  (func (export "_start")
    (i32.store (i32.const 0) (i32.const 64))
    (i32.store (i32.const 4) (i32.const {len}))
    (drop (call $fd_write (i32.const 1) (i32.const 0) (i32.const 1) (i32.const 8)))
    {exit}))"#,
            len = stdout.len()
        )
    }

    fn invoker_for(wat: &str) -> (TempDir, WasmInvoker) {
        let dir = tempdir().unwrap();
        let module_path = dir.path().join("workload.wat");
        std::fs::write(&module_path, wat).unwrap();
        let capture_dir = dir.path().join("capture");
        std::fs::create_dir(&capture_dir).unwrap();
        let invoker = WasmInvoker::new(WasmConfig {
            module_path,
            capture_dir: Some(capture_dir),
            ..WasmConfig::default()
        });
        (dir, invoker)
    }

    fn capture_files(dir: &TempDir) -> usize {
        std::fs::read_dir(dir.path().join("capture")).unwrap().count()
    }

    const OUT: &str = "{\"backend\":\"wasm\",\"n\":5,\"result\":\"120\",\"exec_ns\":42}\n";

    #[test]
    fn proc_exit_zero_is_success() {
        let (dir, invoker) = invoker_for(&workload_wat(OUT, Some(0)));
        let inv = invoker.invoke(5).unwrap();
        assert_eq!(inv.backend, Backend::Wasm);
        assert_eq!(inv.n, 5);
        assert_eq!(inv.result, "120");
        assert_eq!(inv.exec_ns, 42);
        assert!(matches!(inv.timing, SandboxTiming::Wasm { .. }));
        assert!(inv.startup_ns() > 0);
        assert_eq!(capture_files(&dir), 0);
    }

    #[test]
    fn returning_from_start_is_success() {
        let (_dir, invoker) = invoker_for(&workload_wat(OUT, None));
        assert_eq!(invoker.invoke(5).unwrap().result, "120");
    }

    #[test]
    fn nonzero_exit_is_fault_and_capture_is_removed() {
        let (dir, invoker) = invoker_for(&workload_wat(OUT, Some(3)));
        match invoker.invoke(5) {
            Err(BenchError::SandboxFault { backend, message }) => {
                assert_eq!(backend, Backend::Wasm);
                assert!(message.contains("status 3"), "{message}");
            }
            other => panic!("expected SandboxFault, got {other:?}"),
        }
        assert_eq!(capture_files(&dir), 0);
    }

    #[test]
    fn trap_is_fault() {
        let wat = r#"(module (memory (export "memory") 1) (func (export "_start") unreachable))"#;
        let (dir, invoker) = invoker_for(wat);
        assert!(matches!(invoker.invoke(1), Err(BenchError::SandboxFault { .. })));
        assert_eq!(capture_files(&dir), 0);
    }

    #[test]
    fn missing_module_is_fault() {
        let dir = tempdir().unwrap();
        let invoker = WasmInvoker::new(WasmConfig {
            module_path: dir.path().join("absent.wasm"),
            capture_dir: Some(dir.path().to_path_buf()),
            ..WasmConfig::default()
        });
        assert!(matches!(invoker.invoke(1), Err(BenchError::SandboxFault { .. })));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn garbled_stdout_is_workload_error() {
        let (dir, invoker) = invoker_for(&workload_wat("not json\n", Some(0)));
        assert!(matches!(invoker.invoke(1), Err(BenchError::Workload(_))));
        assert_eq!(capture_files(&dir), 0);
    }

    #[test]
    fn exec_exceeding_call_time_is_workload_error() {
        let out = "{\"result\":\"1\",\"exec_ns\":1000000000000000}\n";
        let (dir, invoker) = invoker_for(&workload_wat(out, Some(0)));
        match invoker.invoke(0) {
            Err(BenchError::Workload(message)) => assert!(message.contains("exceeds"), "{message}"),
            other => panic!("expected Workload error, got {other:?}"),
        }
        assert_eq!(capture_files(&dir), 0);
    }

    #[test]
    fn repeated_invocations_each_start_cold() {
        let (_dir, invoker) = invoker_for(&workload_wat(OUT, Some(0)));
        for _ in 0..3 {
            assert_eq!(invoker.invoke(5).unwrap().result, "120");
        }
    }
}
