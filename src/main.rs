//! Shredkit CLI: manage the shred list and trigger secure erasure.

use anyhow::Result;
use clap::Parser;
use shredkit::engine::{Cli, handle_command};
use std::time::Instant;

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();

    handle_command(&cli)?;

    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(())
}
