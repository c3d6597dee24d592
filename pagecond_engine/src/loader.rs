//! Loaders for map definitions and game state snapshots.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use log::{info, warn};
use pagecond_data::{MapDef, validate_map};

use crate::host::GameMap;
use crate::state::GameSnapshot;

/// Load a map definition from the host's JSON map file.
pub fn load_map_def(path: &Path) -> Result<MapDef> {
    let text = fs::read_to_string(path).with_context(|| format!("reading map from '{}'", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing map JSON from '{}'", path.display()))
}

/// Load, validate and build a runtime map.
///
/// Validation problems are logged rather than fatal; the host accepts such maps too.
pub fn load_map(path: &Path, map_id: i32) -> Result<GameMap> {
    let def = load_map_def(path)?;
    for problem in validate_map(&def) {
        warn!("map '{}': {problem}", path.display());
    }
    Ok(GameMap::from_def(map_id, &def))
}

/// Load a state snapshot from RON (`.ron`) or JSON (`.json`).
pub fn load_state(path: &Path) -> Result<GameSnapshot> {
    let text = fs::read_to_string(path).with_context(|| format!("reading state from '{}'", path.display()))?;
    let state: GameSnapshot = match path.extension().and_then(|ext| ext.to_str()) {
        Some("ron") => ron::from_str(&text).with_context(|| format!("parsing state RON from '{}'", path.display()))?,
        Some("json") => {
            serde_json::from_str(&text).with_context(|| format!("parsing state JSON from '{}'", path.display()))?
        },
        other => bail!("unsupported state file extension {other:?} for '{}'", path.display()),
    };
    info!(
        "state loaded from '{}': {} switch(es) on, {} variable(s), party of {}",
        path.display(),
        state.switches.len(),
        state.variables.len(),
        state.party.len()
    );
    Ok(state)
}
