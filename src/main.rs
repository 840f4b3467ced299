use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use seqview::config::AppConfig;
use seqview::model::{Catalog, Orientation, SettingValue};
use seqview::persist::PersistentStore;
use seqview::settings::SettingsStore;
use seqview::tasks::{spawn_export, spawn_import, spawn_revert, TaskOutcome};
use seqview::viewport::Viewport;
use seqview::visualization::VisualizationSettings;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "seqview")]
#[command(about = "Inspect and edit sequence viewer preferences.", long_about = None)]
struct Args {
    /// Read and write preferences in this DIR instead of the default location.
    #[arg(short = 'd', long = "dir", value_name = "DIR", global = true)]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print a stored preference.
    Get { key: String },
    /// Store a preference. TYPE is one of color, int, double, boolean, text, set, list, macros.
    Set {
        key: String,
        #[arg(value_name = "TYPE")]
        value_type: String,
        value: String,
    },
    /// Delete a stored preference.
    Clear { key: String },
    /// List every stored preference.
    List,
    /// Write all stored preferences to FILE.
    Export {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Load preferences from FILE, overwriting keys it contains.
    Import {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Delete all stored preferences.
    Revert,
    /// Upgrade preference files written by older versions.
    Migrate,
    /// Print the genomic range drawn at pixel X.
    Map {
        start: i64,
        zoom: f64,
        x: i64,
        /// Draw the reverse strand.
        #[arg(short = 'r', long = "reverse")]
        reverse: bool,
        /// Window width in pixels.
        #[arg(short = 'w', long = "window", value_name = "N")]
        window: Option<u32>,
    },
}

fn load_persisted(store: &mut SettingsStore) -> Result<Vec<String>> {
    let keys = match store.persistent_store() {
        Some(persistent) => persistent.keys()?,
        None => Vec::new(),
    };
    for key in &keys {
        store.get_persistent(key);
    }
    Ok(keys)
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let mut config = AppConfig::load_default()?;
    if let Some(dir) = args.dir {
        config.settings_dir = dir;
    }
    let dir = config.settings_dir.clone();

    match args.command {
        Command::Get { key } => {
            let mut store = SettingsStore::with_persistence(&dir);
            match store.get_persistent(&key) {
                Some(value) => println!("{} ({}) = {}", key, value.type_name(), value),
                None => println!("{} is not set", key),
            }
        }
        Command::Set { key, value_type, value } => {
            let value = SettingValue::parse_typed(&value_type, &value)
                .with_context(|| format!("Cannot store '{}'", key))?;
            PersistentStore::open(&dir).save(&key, &value)?;
            println!("{} = {}", key, value);
        }
        Command::Clear { key } => {
            if PersistentStore::open(&dir).remove(&key)? {
                println!("Cleared {}", key);
            } else {
                println!("{} is not set", key);
            }
        }
        Command::List => {
            let mut store = SettingsStore::with_persistence(&dir);
            load_persisted(&mut store)?;
            for (key, value) in store.iter() {
                println!("{} ({}) = {}", key, value.type_name(), value);
            }
        }
        Command::Export { file } => {
            let mut store = SettingsStore::with_persistence(&dir);
            load_persisted(&mut store)?;
            if let TaskOutcome::Exported { path, count } = spawn_export(file, store.snapshot()).wait()? {
                println!("Exported {} preferences to {}", count, path.display());
            }
        }
        Command::Import { file } => {
            let outcome = spawn_import(file).wait()?;
            let TaskOutcome::Imported { values } = &outcome else {
                anyhow::bail!("Unexpected import result");
            };
            let keys: Vec<String> = values.keys().cloned().collect();
            let mut settings = VisualizationSettings::new(
                SettingsStore::with_persistence(&dir),
                Box::new(Catalog::default()),
            );
            settings.apply_outcome(outcome);
            let persistent = PersistentStore::open(&dir);
            for key in &keys {
                if let Some(value) = settings.store().get(key) {
                    persistent.save(key, value)?;
                }
            }
            println!("Imported {} preferences into {}", keys.len(), dir.display());
        }
        Command::Revert => {
            if let TaskOutcome::Reverted { keys } = spawn_revert(dir.clone()).wait()? {
                println!("Removed {} preferences from {}", keys.len(), dir.display());
            }
        }
        Command::Migrate => {
            let migrated = PersistentStore::open(&dir).migrate()?;
            println!("Migrated {} preference files", migrated);
        }
        Command::Map { start, zoom, x, reverse, window } => {
            let orientation = if reverse { Orientation::Reverse } else { Orientation::Direct };
            let view = Viewport::new(start, zoom, orientation, window.unwrap_or(config.window_size));
            let [first, last] = view.genomic_from_screen(x);
            info!("[VIEWPORT] {:?}", view);
            println!("pixel {} -> {}..{} (viewport {}..{})", x, first, last, view.start, view.end());
        }
    }

    Ok(())
}
