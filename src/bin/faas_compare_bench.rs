use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use faas_compare_bench::client::EndpointClient;
use faas_compare_bench::harness::{BenchConfig, Invoke, Profile, DEFAULT_BASE_URL, DEFAULT_INPUTS};
use faas_compare_bench::invoker::{ContainerConfig, Dispatcher, WasmConfig};
use faas_compare_bench::report;
use faas_compare_bench::Backend;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ProfileArg {
    Quick,
    Full,
}

impl From<ProfileArg> for Profile {
    fn from(v: ProfileArg) -> Self {
        match v {
            ProfileArg::Quick => Profile::Quick,
            ProfileArg::Full => Profile::Full,
        }
    }
}

/// Where the sandboxes get their workload from.
#[derive(ClapArgs, Debug, Clone)]
struct SandboxArgs {
    /// Compiled WASI workload module.
    #[arg(long, env = "FAAS_WASM_MODULE", default_value = "artifacts/wasm/factorial.wasm")]
    wasm_module: PathBuf,

    /// Container runtime binary.
    #[arg(long, env = "FAAS_CONTAINER_RUNTIME", default_value = "docker")]
    container_runtime: String,

    /// Image run once per container invocation.
    #[arg(long, env = "FAAS_CONTAINER_IMAGE", default_value = "faas-compare-factorial-py:0.1")]
    image: String,
}

impl SandboxArgs {
    fn wasm_config(&self) -> WasmConfig {
        WasmConfig {
            module_path: self.wasm_module.clone(),
            ..WasmConfig::default()
        }
    }

    fn container_config(&self) -> ContainerConfig {
        ContainerConfig {
            runtime: self.container_runtime.clone(),
            image: self.image.clone(),
            ..ContainerConfig::default()
        }
    }

    fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(self.wasm_config(), self.container_config())
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve `GET /invoke/?backend=..&n=..` backed by the local sandboxes.
    Serve {
        #[arg(long, env = "FAAS_LISTEN", default_value = "127.0.0.1:8000")]
        listen: SocketAddr,

        #[command(flatten)]
        sandbox: SandboxArgs,
    },

    /// Sample every (backend, input) case and write a JSON report.
    Run {
        #[arg(long, value_enum, default_value_t = ProfileArg::Full)]
        profile: ProfileArg,

        /// Inputs to benchmark, in report order.
        #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_INPUTS)]
        inputs: Vec<i64>,

        /// Backends to benchmark, in report order.
        #[arg(long, value_enum, value_delimiter = ',', default_values_t = Backend::ALL)]
        backends: Vec<Backend>,

        /// Retained samples per case (overrides the profile).
        #[arg(long)]
        repeats: Option<usize>,

        /// Discarded leading invocations per case (overrides the profile).
        #[arg(long)]
        warmup: Option<usize>,

        #[arg(long, env = "FAAS_BASE_URL", default_value = DEFAULT_BASE_URL)]
        base_url: String,

        /// Invoke the sandboxes in-process instead of through the endpoint.
        #[arg(long, default_value_t = false)]
        direct: bool,

        #[arg(long, env = "FAAS_RESULTS_DIR", default_value = "results")]
        results_dir: PathBuf,

        /// Print the report to stdout instead of writing a file.
        #[arg(long, default_value_t = false)]
        stdout: bool,

        #[command(flatten)]
        sandbox: SandboxArgs,
    },

    /// One direct cold invocation, printed as JSON.
    Once {
        #[arg(long, value_enum)]
        backend: Backend,

        #[arg(long, default_value_t = 34)]
        n: i64,

        #[command(flatten)]
        sandbox: SandboxArgs,
    },
}

#[derive(Parser, Debug)]
#[command(name = "faas-compare-bench")]
#[command(about = "Cold-start latency benchmark for WASM vs container sandboxes (JSON output)")]
struct Cli {
    /// Debug-level logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.cmd {
        Command::Serve { listen, sandbox } => {
            let dispatcher = Arc::new(sandbox.dispatcher());
            let rt = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
            rt.block_on(faas_compare_bench::endpoint::serve(listen, dispatcher))
                .with_context(|| format!("endpoint on {listen} stopped"))?;
        }
        Command::Run {
            profile,
            inputs,
            backends,
            repeats,
            warmup,
            base_url,
            direct,
            results_dir,
            stdout,
            sandbox,
        } => {
            let profile: Profile = profile.into();
            let mut cfg = BenchConfig::for_profile(profile);
            cfg.inputs = inputs;
            cfg.backends = backends;
            cfg.repeats = repeats.unwrap_or(cfg.repeats);
            cfg.warmup = warmup.unwrap_or(cfg.warmup);
            cfg.base_url = if direct { "direct://".to_string() } else { base_url };
            cfg.validate()?;

            info!(
                profile = profile.as_str(),
                repeats = cfg.repeats,
                warmup = cfg.warmup,
                base_url = %cfg.base_url,
                "Starting benchmark run"
            );

            let started_at = chrono::Utc::now();
            let invoker: Box<dyn Invoke> = if direct {
                Box::new(sandbox.dispatcher())
            } else {
                Box::new(EndpointClient::new(cfg.base_url.clone())?)
            };
            let cases = report::run_suite(invoker.as_ref(), &cfg)?;
            let meta = report::run_meta(
                started_at,
                report::sampled_module(direct, &sandbox.wasm_module),
            );
            let report = report::assemble(meta, &cfg, cases);

            if stdout {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                let path = report::write_report(&report, &results_dir, started_at)?;
                println!("Saved: {}", path.display());
            }
        }
        Command::Once { backend, n, sandbox } => {
            let invocation = sandbox.dispatcher().invoke(backend, n)?;
            println!("{}", serde_json::to_string_pretty(&invocation)?);
        }
    }

    Ok(())
}
