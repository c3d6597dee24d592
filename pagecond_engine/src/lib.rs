#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]

pub const PAGECOND_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod config;
pub mod evaluate;
pub mod extract;
pub mod gate;
pub mod host;
pub mod loader;
pub mod record;
pub mod script;
pub mod state;

// Re-exports for convenience
pub use config::{Config, load_config};
pub use evaluate::{Evaluator, check_polarity};
pub use extract::extract;
pub use gate::{ExtraConditions, with_extra_conditions};
pub use host::{GameMap, MapEvent, Page, native_meets_conditions};
pub use record::{ConditionRecord, RelationalCheck, RelationalOp};
pub use script::{PageScript, ScriptError, ScriptHost, ScriptValue};
pub use state::{EvalContext, GameSnapshot, GameState, SelfSwitchKey};
