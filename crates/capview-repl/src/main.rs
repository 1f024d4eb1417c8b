//! capview entry point.
//!
//! Browse a directory through a confined view:
//! ```bash
//! cargo run -p capview-repl -- --root /storage/emulated/0
//! ```

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use capview_repl::Args;

fn main() -> Result<()> {
    // RUST_LOG wins over the default filter.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("capview=info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    capview_repl::run(Args::parse())
}
