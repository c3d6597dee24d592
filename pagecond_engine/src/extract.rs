//! Condition extraction.
//!
//! Scans a page's instruction list for this system's plugin commands and folds every
//! declaration into one normalized, deduplicated [`ConditionRecord`].

mod args;

use std::collections::{BTreeSet, HashSet};

use log::{debug, warn};
use pagecond_data::{ExternalSelfSwitchDef, InstructionDef, PluginCommand, VariableConditionDef};
use serde_json::Value;

use crate::record::{ConditionRecord, RelationalCheck, RelationalOp};
use crate::state::SelfSwitchKey;

use args::{loose_int, loose_text, parse_entry, parse_list};

/// Command requiring its conditions to hold (ON, present, in party, ...).
pub const COMMAND_CONDITIONS: &str = "extraPageConditions";
/// Command requiring its conditions to be negated (OFF, absent, out of party).
pub const COMMAND_NEGATED: &str = "extraPageConditionsNegated";
/// Command that permanently disables a page.
pub const COMMAND_LOCK: &str = "extraPageConditionsLockPage";

pub const ARG_SELF_SWITCH_FREE: &str = "conditionSelfSwitchFree";
pub const ARG_SELF_SWITCH_SELECT: &str = "conditionSelfSwitchSelect";
pub const ARG_EXTERNAL_SELF_SWITCHES: &str = "conditionExternalSelfSwitches";
pub const ARG_SWITCH: &str = "conditionSwitch";
pub const ARG_VARIABLE: &str = "conditionVariable";
pub const ARG_ITEM: &str = "conditionItem";
pub const ARG_ACTOR: &str = "conditionActor";
pub const ARG_SCRIPT_CALL: &str = "conditionScriptCall";

/// Build the condition record of one page.
///
/// `plugin_name` is the identifier the host writes as the first plugin command
/// parameter; `map_id` and `event_id` locate the page's own self-switches.
pub fn extract(plugin_name: &str, list: &[InstructionDef], map_id: i32, event_id: i32) -> ConditionRecord {
    let commands: Vec<PluginCommand<'_>> = list
        .iter()
        .filter_map(InstructionDef::as_plugin_command)
        .filter(|cmd| cmd.plugin == plugin_name)
        .collect();

    if commands.iter().any(|cmd| cmd.command == COMMAND_LOCK) {
        debug!("page of event {event_id} on map {map_id} is locked");
        return ConditionRecord::locked();
    }

    let mut positive = Vec::new();
    let mut negative = Vec::new();
    for cmd in commands {
        match cmd.command {
            COMMAND_CONDITIONS => positive.push(cmd),
            COMMAND_NEGATED => negative.push(cmd),
            other => warn!("unknown page condition command '{other}' on event {event_id}; ignoring it"),
        }
    }

    let record = ConditionRecord {
        locked: false,
        self_switches_on: collect_self_switches(&positive, map_id, event_id),
        self_switches_off: collect_self_switches(&negative, map_id, event_id),
        switches_on: collect_ids(&positive, ARG_SWITCH),
        switches_off: collect_ids(&negative, ARG_SWITCH),
        items_present: collect_ids(&positive, ARG_ITEM),
        items_absent: collect_ids(&negative, ARG_ITEM),
        actors_in_party: collect_ids(&positive, ARG_ACTOR),
        actors_absent: collect_ids(&negative, ARG_ACTOR),
        relational_checks: collect_relational_checks(&positive),
        predicates: collect_predicates(&positive),
    };
    debug!(
        "extracted {} extra condition(s) for event {event_id} on map {map_id}",
        record.condition_count()
    );
    record
}

/// Own-event letters (free text and fixed options) plus external self-switches.
fn collect_self_switches(commands: &[PluginCommand<'_>], map_id: i32, event_id: i32) -> BTreeSet<SelfSwitchKey> {
    let mut keys = BTreeSet::new();
    for cmd in commands {
        let letters = parse_list(cmd.arg(ARG_SELF_SWITCH_FREE), ARG_SELF_SWITCH_FREE)
            .into_iter()
            .chain(parse_list(cmd.arg(ARG_SELF_SWITCH_SELECT), ARG_SELF_SWITCH_SELECT));
        for entry in letters {
            let Some(letter) = loose_text(&entry) else {
                warn!("self switch entry {entry} is not text; ignoring it");
                continue;
            };
            insert_self_switch(&mut keys, map_id, event_id, &letter);
        }

        for entry in parse_list(cmd.arg(ARG_EXTERNAL_SELF_SWITCHES), ARG_EXTERNAL_SELF_SWITCHES) {
            let external: ExternalSelfSwitchDef = match parse_entry(&entry) {
                Ok(def) => def,
                Err(e) => {
                    warn!("malformed external self switch entry ({e}); ignoring it");
                    continue;
                },
            };
            let target_map = id_or_fallback(&external.map_id, map_id);
            let target_event = id_or_fallback(&external.event_id, event_id);
            insert_self_switch(&mut keys, target_map, target_event, &external.letter);
        }
    }
    keys
}

fn insert_self_switch(keys: &mut BTreeSet<SelfSwitchKey>, map_id: i32, event_id: i32, letter: &str) {
    let letter = letter.trim();
    if letter.is_empty() {
        warn!("self switch with an empty letter (map {map_id}, event {event_id}); ignoring it");
        return;
    }
    keys.insert(SelfSwitchKey::new(map_id, event_id, letter));
}

/// Zero, missing and unreadable ids refer to the page's own map or event.
fn id_or_fallback(value: &Value, fallback: i32) -> i32 {
    loose_int(value)
        .filter(|id| *id != 0)
        .and_then(|id| i32::try_from(id).ok())
        .unwrap_or(fallback)
}

/// Positive integer ids (switches, items, actors) declared under `arg`.
fn collect_ids(commands: &[PluginCommand<'_>], arg: &str) -> BTreeSet<i32> {
    let mut ids = BTreeSet::new();
    for cmd in commands {
        for entry in parse_list(cmd.arg(arg), arg) {
            let Some(id) = loose_int(&entry).and_then(|id| i32::try_from(id).ok()) else {
                warn!("'{arg}' entry {entry} is not an id; ignoring it");
                continue;
            };
            if id > 0 {
                ids.insert(id);
            }
        }
    }
    ids
}

fn collect_relational_checks(commands: &[PluginCommand<'_>]) -> Vec<RelationalCheck> {
    let mut checks = Vec::new();
    let mut seen = HashSet::new();
    for cmd in commands {
        for entry in parse_list(cmd.arg(ARG_VARIABLE), ARG_VARIABLE) {
            let def: VariableConditionDef = match parse_entry(&entry) {
                Ok(def) => def,
                Err(e) => {
                    warn!("malformed variable condition entry ({e}); ignoring it");
                    continue;
                },
            };
            let Some(check) = cook_relational_check(&def) else {
                continue;
            };
            if seen.insert(check.clone()) {
                checks.push(check);
            }
        }
    }
    checks
}

fn cook_relational_check(def: &VariableConditionDef) -> Option<RelationalCheck> {
    let Some(variable_id) = loose_int(&def.variable_id).and_then(|id| i32::try_from(id).ok()) else {
        warn!("variable condition has unreadable variable id {}; ignoring it", def.variable_id);
        return None;
    };
    if variable_id <= 0 {
        return None;
    }
    let comparand = loose_int(&def.value);
    if comparand.is_none() {
        warn!(
            "variable condition on variable {variable_id} has non-numeric value {}; only '!==' can hold",
            def.value
        );
    }
    Some(RelationalCheck {
        variable_id,
        operator: RelationalOp::from_symbol(&def.operator),
        comparand,
    })
}

fn collect_predicates(commands: &[PluginCommand<'_>]) -> Vec<String> {
    let mut bodies = Vec::new();
    let mut seen = HashSet::new();
    for cmd in commands {
        for entry in parse_list(cmd.arg(ARG_SCRIPT_CALL), ARG_SCRIPT_CALL) {
            let Some(body) = loose_text(&entry) else {
                warn!("script call entry {entry} is not text; ignoring it");
                continue;
            };
            let body = body.trim().to_string();
            if seen.insert(body.clone()) {
                bodies.push(body);
            }
        }
    }
    bodies
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, json};

    const PLUGIN: &str = crate::config::DEFAULT_PLUGIN_NAME;

    fn command(name: &str, args: &[(&str, Value)]) -> InstructionDef {
        let mut map = Map::new();
        for (key, value) in args {
            map.insert((*key).to_string(), value.clone());
        }
        InstructionDef::plugin_command(PLUGIN, name, map)
    }

    fn text_line() -> InstructionDef {
        InstructionDef {
            code: 401,
            indent: 0,
            parameters: vec![json!("Hello")],
        }
    }

    #[test]
    fn no_matching_commands_yield_empty_record() {
        let list = vec![text_line(), InstructionDef::default()];
        assert!(extract(PLUGIN, &list, 1, 1).is_empty());
    }

    #[test]
    fn commands_of_other_plugins_are_ignored() {
        let mut map = Map::new();
        map.insert(ARG_SWITCH.into(), json!("[\"5\"]"));
        let list = vec![InstructionDef::plugin_command("SomethingElse", COMMAND_CONDITIONS, map)];
        assert!(extract(PLUGIN, &list, 1, 1).is_empty());
    }

    #[test]
    fn lock_command_wins_over_everything() {
        let list = vec![
            command(COMMAND_CONDITIONS, &[(ARG_SWITCH, json!("[\"5\"]"))]),
            command(COMMAND_LOCK, &[]),
        ];
        let record = extract(PLUGIN, &list, 1, 1);
        assert_eq!(record, ConditionRecord::locked());
    }

    #[test]
    fn ids_are_split_by_polarity_and_deduplicated() {
        let list = vec![
            command(
                COMMAND_CONDITIONS,
                &[
                    (ARG_SWITCH, json!("[\"5\",\"6\"]")),
                    (ARG_ITEM, json!("[\"3\"]")),
                    (ARG_ACTOR, json!("[\"1\"]")),
                ],
            ),
            command(COMMAND_CONDITIONS, &[(ARG_SWITCH, json!("[\"5\"]"))]),
            command(
                COMMAND_NEGATED,
                &[
                    (ARG_SWITCH, json!("[\"7\"]")),
                    (ARG_ITEM, json!("[\"4\"]")),
                    (ARG_ACTOR, json!("[\"2\"]")),
                ],
            ),
        ];
        let record = extract(PLUGIN, &list, 1, 1);
        assert_eq!(record.switches_on, [5, 6].into_iter().collect());
        assert_eq!(record.switches_off, [7].into_iter().collect());
        assert_eq!(record.items_present, [3].into_iter().collect());
        assert_eq!(record.items_absent, [4].into_iter().collect());
        assert_eq!(record.actors_in_party, [1].into_iter().collect());
        assert_eq!(record.actors_absent, [2].into_iter().collect());
    }

    #[test]
    fn non_positive_and_unreadable_ids_are_dropped() {
        let list = vec![command(COMMAND_CONDITIONS, &[(ARG_SWITCH, json!("[\"0\",\"-2\",\"x\",\"9\"]"))])];
        let record = extract(PLUGIN, &list, 1, 1);
        assert_eq!(record.switches_on, [9].into_iter().collect());
    }

    #[test]
    fn same_key_on_both_sides_is_kept() {
        let list = vec![
            command(COMMAND_CONDITIONS, &[(ARG_SWITCH, json!("[\"5\"]"))]),
            command(COMMAND_NEGATED, &[(ARG_SWITCH, json!("[\"5\"]"))]),
        ];
        let record = extract(PLUGIN, &list, 1, 1);
        assert!(record.switches_on.contains(&5));
        assert!(record.switches_off.contains(&5));
    }

    #[test]
    fn self_switch_letters_are_merged_and_trimmed() {
        let list = vec![command(
            COMMAND_CONDITIONS,
            &[
                (ARG_SELF_SWITCH_FREE, json!("[\" A \",\"custom\",\"  \"]")),
                (ARG_SELF_SWITCH_SELECT, json!("[\"A\",\"B\"]")),
            ],
        )];
        let record = extract(PLUGIN, &list, 2, 8);
        let expected: BTreeSet<_> = ["A", "B", "custom"]
            .into_iter()
            .map(|l| SelfSwitchKey::new(2, 8, l))
            .collect();
        assert_eq!(record.self_switches_on, expected);
    }

    #[test]
    fn external_self_switches_fall_back_per_entry() {
        let entries = json!([
            "{\"mapID\":\"3\",\"eventID\":\"4\",\"letter\":\"C\"}",
            "{\"mapID\":\"0\",\"eventID\":\"0\",\"letter\":\"D\"}",
            "{\"mapID\":\"0\",\"eventID\":\"6\",\"letter\":\"\"}",
            "not json"
        ]);
        let list = vec![command(
            COMMAND_NEGATED,
            &[(ARG_EXTERNAL_SELF_SWITCHES, Value::String(entries.to_string()))],
        )];
        let record = extract(PLUGIN, &list, 1, 2);
        let expected: BTreeSet<_> = [SelfSwitchKey::new(3, 4, "C"), SelfSwitchKey::new(1, 2, "D")]
            .into_iter()
            .collect();
        assert_eq!(record.self_switches_off, expected);
        assert!(record.self_switches_on.is_empty());
    }

    #[test]
    fn variable_checks_keep_order_and_collapse_duplicates() {
        let entries = json!([
            "{\"variableID\":\"10\",\"operator\":\">=\",\"value\":\"50\"}",
            "{\"variableID\":\"2\",\"operator\":\" === \",\"value\":\"1\"}",
            "{\"variableID\":\"10\",\"operator\":\">=\",\"value\":\"50\"}",
            "{\"variableID\":\"3\",\"operator\":\"=>\",\"value\":\"1\"}"
        ]);
        let list = vec![command(
            COMMAND_CONDITIONS,
            &[(ARG_VARIABLE, Value::String(entries.to_string()))],
        )];
        let record = extract(PLUGIN, &list, 1, 1);
        let ops: Vec<_> = record
            .relational_checks
            .iter()
            .map(|c| (c.variable_id, c.operator.clone(), c.comparand))
            .collect();
        assert_eq!(
            ops,
            vec![
                (10, RelationalOp::Ge, Some(50)),
                (2, RelationalOp::Eq, Some(1)),
                (3, RelationalOp::Unrecognized("=>".into()), Some(1)),
            ]
        );
    }

    #[test]
    fn malformed_variable_entries_are_skipped() {
        let entries = json!([
            "{\"variableID\":\"10\",\"operator\":\">=\"",
            "{\"variableID\":\"x\",\"operator\":\">=\",\"value\":\"1\"}",
            "{\"variableID\":\"4\",\"operator\":\"<\",\"value\":\"9\"}"
        ]);
        let list = vec![command(
            COMMAND_CONDITIONS,
            &[(ARG_VARIABLE, Value::String(entries.to_string()))],
        )];
        let record = extract(PLUGIN, &list, 1, 1);
        assert_eq!(record.relational_checks.len(), 1);
        assert_eq!(record.relational_checks[0].variable_id, 4);
    }

    #[test]
    fn non_numeric_value_is_kept_without_a_comparand() {
        let entries = json!(["{\"variableID\":\"3\",\"operator\":\"<\",\"value\":\"\"}"]);
        let list = vec![command(
            COMMAND_CONDITIONS,
            &[(ARG_VARIABLE, Value::String(entries.to_string()))],
        )];
        let record = extract(PLUGIN, &list, 1, 1);
        assert_eq!(
            record.relational_checks,
            vec![RelationalCheck {
                variable_id: 3,
                operator: RelationalOp::Lt,
                comparand: None,
            }]
        );
    }

    #[test]
    fn unknown_command_under_the_plugin_is_ignored() {
        let list = vec![command("extraPageConditionsBogus", &[(ARG_SWITCH, json!("[\"5\"]"))])];
        let record = extract(PLUGIN, &list, 1, 1);
        assert!(record.is_empty());
        assert!(!record.locked);
    }

    #[test]
    fn default_plugin_name_matches_authored_maps() {
        let mut args = Map::new();
        args.insert(ARG_SWITCH.into(), json!("[\"5\"]"));
        let list = vec![InstructionDef::plugin_command(
            "GGZironExtraPageConditions",
            COMMAND_CONDITIONS,
            args,
        )];
        let record = extract(&crate::config::Config::default().plugin_name, &list, 1, 1);
        assert_eq!(record.switches_on, BTreeSet::from([5]));
    }

    #[test]
    fn whole_argument_malformed_is_empty() {
        let list = vec![command(COMMAND_CONDITIONS, &[(ARG_VARIABLE, json!("[{broken"))])];
        assert!(extract(PLUGIN, &list, 1, 1).relational_checks.is_empty());
    }

    #[test]
    fn predicates_are_trimmed_and_deduplicated_in_order() {
        let list = vec![
            command(
                COMMAND_CONDITIONS,
                &[(ARG_SCRIPT_CALL, json!(["return switch(1);", "  return true;  "]))],
            ),
            command(COMMAND_CONDITIONS, &[(ARG_SCRIPT_CALL, json!(["return true;"]))]),
        ];
        let record = extract(PLUGIN, &list, 1, 1);
        assert_eq!(record.predicates, vec!["return switch(1);", "return true;"]);
    }

    #[test]
    fn negated_command_ignores_positive_only_arguments() {
        let list = vec![command(
            COMMAND_NEGATED,
            &[
                (ARG_SCRIPT_CALL, json!(["return false;"])),
                (
                    ARG_VARIABLE,
                    json!(["{\"variableID\":\"1\",\"operator\":\">\",\"value\":\"0\"}"]),
                ),
            ],
        )];
        let record = extract(PLUGIN, &list, 1, 1);
        assert!(record.is_empty());
    }

    #[test]
    fn extraction_is_repeatable() {
        let list = vec![
            command(COMMAND_CONDITIONS, &[(ARG_SWITCH, json!("[\"2\",\"1\"]"))]),
            command(COMMAND_NEGATED, &[(ARG_ITEM, json!("[\"8\"]"))]),
        ];
        assert_eq!(extract(PLUGIN, &list, 1, 1), extract(PLUGIN, &list, 1, 1));
    }
}
