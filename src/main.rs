use clap::Parser;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use atdraw::cli::args::Cli;
use atdraw::cli::commands::execute_command;
use atdraw::cli::output;

fn main() {
    let cli = Cli::parse();

    init_tracing(cli.debug);

    if let Err(e) = execute_command(&cli) {
        output::error(&e);
        std::process::exit(e.exit_code());
    }
}

/// Level for the crate's own spans; `None` defers to `RUST_LOG`.
fn crate_level(count: u8) -> Option<&'static str> {
    match count {
        0 => None,
        1 => Some("info"),
        2 => Some("debug"),
        _ => Some("trace"),
    }
}

fn init_tracing(count: u8) {
    if count > 3 {
        output::warning("-ddd is the most verbose level");
    }

    let filter = match crate_level(count) {
        Some(level) => EnvFilter::new(format!("warn,atdraw={level}")),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(count >= 2)
        .with_span_events(if count >= 3 {
            FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        })
        .with_filter(filter);

    tracing_subscriber::registry().with(layer).init();
    tracing::info!(level = crate_level(count), "tracing initialized");
}
