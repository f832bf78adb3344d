//! Command handlers wiring the CLI to the engine.

use anyhow::{Context, Result};
use log::{info, warn};
use std::path::{Path, PathBuf};

use crate::engine::{Cli, Commands, ShredEngine};
use crate::entropy;
use crate::types::{ENTROPY_UNKNOWN, ShredderSettings};
use crate::utils::settings_toml::{apply_file_to_settings, load_settings_toml};
use crate::utils::setup_logging;

/// Settings and db path: `.shredkit.toml` first, then CLI flags on top.
fn setup_operation(cli: &Cli) -> (ShredderSettings, PathBuf) {
    setup_logging(cli.verbose);

    let mut settings = ShredderSettings::default();
    let mut db_path = None;
    if let Some(file) = load_settings_toml(Path::new(".")) {
        db_path = apply_file_to_settings(&file, &mut settings);
    }
    if let Some(threads) = cli.threads {
        settings.thread_number = threads;
    }
    if let Some(method) = cli.method {
        settings.method = method;
    }
    if cli.parallel_erase {
        settings.multithreaded_erase = true;
    }
    if cli.no_ntfs_erase {
        settings.ntfs_erase = false;
    }

    let db_path = cli
        .db
        .clone()
        .or(db_path)
        .unwrap_or_else(|| cli.db_path());
    (settings, db_path)
}

pub fn handle_command(cli: &Cli) -> Result<()> {
    let (settings, db_path) = setup_operation(cli);
    let engine = ShredEngine::new(settings, &db_path)
        .with_context(|| format!("open work list at {}", db_path.display()))?;

    // Ctrl-C stops the entropy workers; erasure proper is not cancellable.
    let interrupt_handle = engine.clone();
    ctrlc::set_handler(move || {
        warn!("interrupt requested; stopping entropy checks");
        interrupt_handle.interrupt_checks();
    })
    .context("set Ctrl+C handler")?;

    match &cli.command {
        Commands::Submit { paths, system } => handle_submit(&engine, paths, *system),
        Commands::Remove { paths } => handle_remove(&engine, paths),
        Commands::List => handle_list(&engine),
        Commands::Clean { user_only } => handle_clean(&engine, *user_only),
        Commands::Erase => handle_erase(&engine),
    }
}

fn handle_submit(engine: &ShredEngine, paths: &[PathBuf], system: bool) -> Result<()> {
    let mut submitted = 0usize;
    for path in paths {
        match engine.submit(&path.to_string_lossy(), system, false, None) {
            Ok(()) => submitted += 1,
            Err(err) => warn!("{}: {}", path.display(), err),
        }
    }
    // Let entropy classification settle before the process exits.
    engine.wait_for_checks();
    info!("Submitted {} of {} paths", submitted, paths.len());
    Ok(())
}

fn handle_remove(engine: &ShredEngine, paths: &[PathBuf]) -> Result<()> {
    for path in paths {
        match engine.remove(&path.to_string_lossy()) {
            Ok(true) => info!("Removed {}", path.display()),
            Ok(false) => warn!("Not in the shred list: {}", path.display()),
            Err(err) => warn!("{}: {}", path.display(), err),
        }
    }
    Ok(())
}

fn handle_list(engine: &ShredEngine) -> Result<()> {
    let files = engine.files_prepared()?;
    let dirs = engine.directories_prepared()?;

    if files.is_empty() && dirs.is_empty() {
        info!("Shred list is empty.");
        return Ok(());
    }
    for (path, entropy_value) in &files {
        let class = if *entropy_value == ENTROPY_UNKNOWN {
            entropy::EntropyClass::Unknown
        } else {
            entropy::estimate(
                *entropy_value,
                std::fs::metadata(path).map(|m| m.len()).unwrap_or(0),
            )
        };
        info!("{}  entropy={:.3}  [{}]", path, entropy_value, class.description());
    }
    for dir in &dirs {
        info!("{}  [directory]", dir);
    }
    info!("{} files, {} directories prepared", files.len(), dirs.len());
    Ok(())
}

fn handle_clean(engine: &ShredEngine, user_only: bool) -> Result<()> {
    if user_only {
        engine.clean_user_files().context("clean user entries")?;
        info!("Dropped user-added entries.");
    } else {
        engine.clean().context("clean shred list")?;
        info!("Dropped the whole shred list.");
    }
    Ok(())
}

fn handle_erase(engine: &ShredEngine) -> Result<()> {
    let files = engine.files_prepared()?.len();
    let dirs = engine.directories_prepared()?.len();
    info!("Shredding {} files and {} directories…", files, dirs);
    engine.erase_files().context("erase files")?;
    info!("Done.");
    Ok(())
}
