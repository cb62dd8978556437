//! sourcemark CLI — news digests with scannable source links.
//!
//! Builds an EPUB digest from a calibre recipe, stamps every article with
//! its source URL and a QR code, and optionally mails the result.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    // SMTP credentials may live in a local .env; process env wins.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
