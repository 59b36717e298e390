use std::env;
use std::io;
use std::process::ExitCode;

use map_tools::{parse_args, run, usage_text, MapToolError, ParsedArgs};
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    init_tracing();

    let args = env::args().skip(1).collect::<Vec<_>>();
    let result = parse_args(&args).and_then(|parsed| match parsed {
        ParsedArgs::Help => {
            println!("{}", usage_text());
            Ok(())
        }
        ParsedArgs::Command(kind) => run(kind, &mut io::stdout()),
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(MapToolError::Usage(message)) => {
            eprintln!("{message}");
            ExitCode::from(2)
        }
        Err(err) => {
            error!(error = %err, "map_tool_failed");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .init();
}
