//! argorender - render Argo CD Applications locally

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;
mod display;
mod error;
mod exit_codes;
mod telemetry;

use commands::detect::DetectArgs;
use commands::template::TemplateArgs;

#[derive(Parser)]
#[command(name = "argorender")]
#[command(version)]
#[command(about = "Render Argo CD Applications locally with Helm, Kustomize or plain directories", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: <config dir>/argorender/config.yaml)
    #[arg(long, global = true, env = "ARGORENDER_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,

    /// Log filter, e.g. `info` or `argorender_engine=trace`
    #[arg(long, global = true, env = "ARGORENDER_LOG_LEVEL")]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render every source of an Application to manifests
    Template(TemplateArgs),

    /// Show the detected type of every source without rendering
    Detect(DetectArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    miette::set_panic_hook();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if err.use_stderr() => {
            let _ = err.print();
            return ExitCode::from(exit_codes::USAGE_ERROR as u8);
        }
        // --help and --version
        Err(err) => err.exit(),
    };

    telemetry::init(cli.debug, cli.log_level.as_deref());

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Template(args) => commands::template::run(args, config).await,
        Commands::Detect(args) => commands::detect::run(args, config).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let code = err.exit_code();
            eprintln!("{:?}", miette::Report::new(err));
            ExitCode::from(code as u8)
        }
    }
}
