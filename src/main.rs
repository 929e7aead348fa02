use clap::Parser;
use miette::Result;
use orch::cli::{Cli, GlobalOpts};
use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins over `--verbose` and `--debug-headers`
fn init_logging(global: &GlobalOpts) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let mut filter = EnvFilter::new(if global.verbose { "debug" } else { "warn" });
        if global.debug_headers {
            if let Ok(directive) = "orch::http=info".parse() {
                filter = filter.add_directive(directive);
            }
        }
        filter
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    // Install miette's fancy error handler for beautiful diagnostics
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    init_logging(&cli.global);

    orch::cli::commands::run(cli)
}
