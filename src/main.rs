use anyhow::Result;
use ruleboard::{Session, SessionOptions};
use std::io;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the session protocol
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let Some(options) = SessionOptions::from_args(std::env::args().skip(1))? else {
        print!("{}", SessionOptions::usage());
        return Ok(());
    };

    let mut session = Session::new(options);
    session.run(io::stdin().lock(), io::stdout())
}
