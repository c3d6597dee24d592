use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Instruction code the host uses for plugin commands.
pub const PLUGIN_COMMAND_CODE: i32 = 357;

/// A map as stored by the host: a sparse list of events.
///
/// Index 0 is conventionally `null`, and deleted events leave `null` holes.
/// Any other map fields (tileset, dimensions, ...) are ignored.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MapDef {
    #[serde(default)]
    pub events: Vec<Option<EventDef>>,
}

/// One map event and its alternative pages.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EventDef {
    pub id: i32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub pages: Vec<PageDef>,
}

/// One page of an event: native activation conditions plus its instruction list.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PageDef {
    #[serde(default)]
    pub conditions: NativeConditionsDef,
    #[serde(default)]
    pub list: Vec<InstructionDef>,
}

/// The host's own page conditions, exactly as they appear in map files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NativeConditionsDef {
    pub switch1_valid: bool,
    pub switch1_id: i32,
    pub switch2_valid: bool,
    pub switch2_id: i32,
    pub variable_valid: bool,
    pub variable_id: i32,
    pub variable_value: i64,
    pub self_switch_valid: bool,
    pub self_switch_ch: String,
    pub item_valid: bool,
    pub item_id: i32,
    pub actor_valid: bool,
    pub actor_id: i32,
}

impl Default for NativeConditionsDef {
    fn default() -> Self {
        Self {
            switch1_valid: false,
            switch1_id: 1,
            switch2_valid: false,
            switch2_id: 1,
            variable_valid: false,
            variable_id: 1,
            variable_value: 0,
            self_switch_valid: false,
            self_switch_ch: "A".to_string(),
            item_valid: false,
            item_id: 1,
            actor_valid: false,
            actor_id: 1,
        }
    }
}

/// A single entry of a page's instruction list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct InstructionDef {
    pub code: i32,
    #[serde(default)]
    pub indent: i32,
    #[serde(default)]
    pub parameters: Vec<Value>,
}

impl InstructionDef {
    /// Build a plugin command instruction (`code` 357) with the host's parameter layout:
    /// `[plugin, command, display text, args]`.
    pub fn plugin_command(plugin: &str, command: &str, args: Map<String, Value>) -> Self {
        Self {
            code: PLUGIN_COMMAND_CODE,
            indent: 0,
            parameters: vec![
                Value::String(plugin.to_string()),
                Value::String(command.to_string()),
                Value::String(String::new()),
                Value::Object(args),
            ],
        }
    }

    /// View this instruction as a plugin command, if it is one.
    pub fn as_plugin_command(&self) -> Option<PluginCommand<'_>> {
        if self.code != PLUGIN_COMMAND_CODE {
            return None;
        }
        let plugin = self.parameters.first()?.as_str()?;
        let command = self.parameters.get(1).and_then(Value::as_str).unwrap_or_default();
        let args = self.parameters.get(3).and_then(Value::as_object);
        Some(PluginCommand { plugin, command, args })
    }
}

/// Borrowed view over a plugin command instruction.
#[derive(Debug, Clone, Copy)]
pub struct PluginCommand<'a> {
    pub plugin: &'a str,
    pub command: &'a str,
    pub args: Option<&'a Map<String, Value>>,
}

impl<'a> PluginCommand<'a> {
    /// Look up a named argument.
    pub fn arg(&self, name: &str) -> Option<&'a Value> {
        self.args.and_then(|args| args.get(name))
    }
}

/// Entry of the `conditionExternalSelfSwitches` argument.
///
/// Ids are kept as raw JSON because the host writes them as strings while
/// hand-edited data often uses numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ExternalSelfSwitchDef {
    #[serde(rename = "mapID", default)]
    pub map_id: Value,
    #[serde(rename = "eventID", default)]
    pub event_id: Value,
    #[serde(default)]
    pub letter: String,
}

/// Entry of the `conditionVariable` argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct VariableConditionDef {
    #[serde(rename = "variableID", default)]
    pub variable_id: Value,
    #[serde(default)]
    pub operator: String,
    #[serde(default)]
    pub value: Value,
}
