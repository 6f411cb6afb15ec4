use chlog::cli::{Cli, Commands};
use chlog::context::resolve_contexts;
use chlog::convert::{ConvertOptions, Converter};
use chlog::engine::SerdeEngine;
use chlog::output::{ExitCode, OutputContext};
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let out = OutputContext::new(cli.quiet);

    let code = match run(cli, &out) {
        Ok(code) => code,
        Err(e) => {
            let _ = out.print_error(format!("Error: {e:#}"));
            ExitCode::GenericError
        }
    };
    if code != ExitCode::Success {
        std::process::exit(code.code());
    }
}

fn run(cli: Cli, out: &OutputContext) -> anyhow::Result<ExitCode> {
    match cli.command {
        Commands::Convert(args) => {
            let opts = ConvertOptions {
                target: args.format,
                database_type: args.database_type,
                input: args.input,
                output: args.output,
            };
            let summary = Converter::new(opts, Box::new(SerdeEngine)).run(out)?;
            if summary.report.is_empty() {
                Ok(ExitCode::Success)
            } else {
                out.print_error(summary.report.to_string().trim_end())?;
                Ok(summary.status().exit_code())
            }
        }
        Commands::Context(args) => {
            let contexts = resolve_contexts(&SerdeEngine, &args.changelog)?;
            out.print_result(serde_json::to_string(&contexts)?)?;
            Ok(ExitCode::Success)
        }
    }
}
