#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
//! ** pagecond **
//! Inspect how extra page conditions resolve for a map and a game state snapshot.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use log::info;

use pagecond_engine::{
    ExtraConditions, GameMap, load_config, native_meets_conditions, with_extra_conditions,
    loader::{load_map, load_state},
};

#[derive(Parser)]
#[command(author, version, about = "Resolve extra event page conditions.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Select the active page of every event for a given game state.
    Probe(ProbeArgs),
    /// Print the extracted condition record of every page.
    Inspect(MapArgs),
}

#[derive(Args)]
struct MapArgs {
    /// Host map file (JSON).
    #[arg(long)]
    map: PathBuf,
    /// Map id used for self-switch keys.
    #[arg(long, default_value_t = 1)]
    map_id: i32,
    /// Configuration file (TOML); defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args)]
struct ProbeArgs {
    #[command(flatten)]
    map: MapArgs,
    /// Game state snapshot (RON or JSON).
    #[arg(long)]
    state: PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Probe(args) => probe(&args),
        Commands::Inspect(args) => inspect(&args),
    }
}

fn load(args: &MapArgs) -> Result<(GameMap, ExtraConditions)> {
    let config = args.config.as_deref().map(load_config).unwrap_or_default();
    let map = load_map(&args.map, args.map_id).context("while loading map")?;
    Ok((map, ExtraConditions::new(config)))
}

fn probe(args: &ProbeArgs) -> Result<()> {
    let (mut map, extra) = load(&args.map)?;
    let state = load_state(&args.state).context("while loading state")?;
    let gate = with_extra_conditions(native_meets_conditions, &extra);
    map.refresh(&state, &gate).context("while selecting event pages")?;
    info!("page selection finished for map {}", map.map_id);

    for event in &map.events {
        let page = match event.page_index {
            Some(index) => format!("page {}", index + 1).bright_green(),
            None => "no page".bright_red(),
        };
        let tagged = if extra.applies_to(&event.note) { "" } else { " (untagged)" };
        println!("{:>4} {:<24} {page}{}", event.id, event.name.bold(), tagged.dimmed());
    }
    Ok(())
}

fn inspect(args: &MapArgs) -> Result<()> {
    let (map, extra) = load(args)?;
    for event in &map.events {
        println!("{} {}", format!("#{}", event.id).bright_yellow(), event.name.bold());
        for (index, page) in event.pages.iter().enumerate() {
            let record = extra.record_for(event, page);
            let rendered = serde_json::to_string_pretty(record).context("while rendering condition record")?;
            println!("  page {}: {rendered}", index + 1);
        }
    }
    Ok(())
}
