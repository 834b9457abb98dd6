use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog;
use crate::experience;
use crate::state::{Character, Equipment, StateGraph};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueKind {
    HpExceedsMax,
    MpExceedsMax,
    HpNotInitialized,
    MpNotInitialized,
    LevelOutOfRange,
    LevelExperienceMismatch,
    UnknownEquipment,
    UnknownCommand,
    SpellOutOfBounds,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub kind: IssueKind,
    pub severity: Severity,
    pub message: String,
    /// Offending character, when the issue is character-scoped.
    pub character_id: Option<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub errors: Vec<Issue>,
    pub warnings: Vec<Issue>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn push(&mut self, issue: Issue) {
        match issue.severity {
            Severity::Error => self.errors.push(issue),
            Severity::Warning => self.warnings.push(issue),
        }
    }
}

/// Walk the state graph and report every violation found, errors first
/// in character order.
pub fn validate(graph: &StateGraph) -> ValidationResult {
    let mut result = ValidationResult::default();
    for character in &graph.characters {
        validate_character(character, &mut result);
    }
    debug!(
        errors = result.errors.len(),
        warnings = result.warnings.len(),
        "validated state graph"
    );
    result
}

fn validate_character(c: &Character, result: &mut ValidationResult) {
    let id = Some(c.id);
    let who = display_name(c);

    if c.hp.max == 0 {
        if c.hp.current > 0 {
            result.push(Issue {
                kind: IssueKind::HpNotInitialized,
                severity: Severity::Warning,
                message: format!("{who}: HP {} with uninitialized max", c.hp.current),
                character_id: id,
            });
        }
    } else if c.hp.current > c.hp.max {
        result.push(Issue {
            kind: IssueKind::HpExceedsMax,
            severity: Severity::Error,
            message: format!("{who}: HP {} exceeds max {}", c.hp.current, c.hp.max),
            character_id: id,
        });
    }

    if c.mp.max == 0 {
        if c.mp.current > 0 {
            result.push(Issue {
                kind: IssueKind::MpNotInitialized,
                severity: Severity::Warning,
                message: format!("{who}: MP {} with uninitialized max", c.mp.current),
                character_id: id,
            });
        }
    } else if c.mp.current > c.mp.max {
        result.push(Issue {
            kind: IssueKind::MpExceedsMax,
            severity: Severity::Error,
            message: format!("{who}: MP {} exceeds max {}", c.mp.current, c.mp.max),
            character_id: id,
        });
    }

    if !(experience::MIN_LEVEL..=experience::MAX_LEVEL).contains(&c.level) {
        result.push(Issue {
            kind: IssueKind::LevelOutOfRange,
            severity: Severity::Error,
            message: format!("{who}: level {} outside 1-99", c.level),
            character_id: id,
        });
    } else if !experience::is_consistent(c.level, c.exp) {
        result.push(Issue {
            kind: IssueKind::LevelExperienceMismatch,
            severity: Severity::Error,
            message: format!(
                "{who}: experience {} implies level {}, stored level is {}",
                c.exp,
                experience::level_for_exp(c.exp),
                c.level
            ),
            character_id: id,
        });
    }

    for (item, slot_name) in c.equipment.slots().into_iter().zip(Equipment::slot_names()) {
        if !catalog::is_known_item(item) {
            result.push(Issue {
                kind: IssueKind::UnknownEquipment,
                severity: Severity::Error,
                message: format!("{who}: {slot_name} holds unknown item {item}"),
                character_id: id,
            });
        }
    }

    for command in c.commands {
        if command as usize >= catalog::COMMAND_COUNT {
            result.push(Issue {
                kind: IssueKind::UnknownCommand,
                severity: Severity::Error,
                message: format!("{who}: command id {command} out of table bounds"),
                character_id: id,
            });
        }
    }

    if c.spells.len() != catalog::SPELL_COUNT {
        result.push(Issue {
            kind: IssueKind::SpellOutOfBounds,
            severity: Severity::Error,
            message: format!(
                "{who}: spell table has {} entries, expected {}",
                c.spells.len(),
                catalog::SPELL_COUNT
            ),
            character_id: id,
        });
    }
    for (spell_id, &value) in c.spells.iter().enumerate() {
        if value > 100 {
            result.push(Issue {
                kind: IssueKind::SpellOutOfBounds,
                severity: Severity::Error,
                message: format!("{who}: spell {spell_id} progress {value} exceeds 100"),
                character_id: id,
            });
        }
    }
}

fn display_name(c: &Character) -> String {
    if c.name.is_empty() {
        format!("character {}", c.id)
    } else {
        c.name.clone()
    }
}

/// Repair the documented subset of validation errors in place and return
/// how many individual fixes were applied. Running it again right away
/// fixes nothing.
///
/// Fixed here: HP/MP clamped to max, unknown equipment zeroed, experience
/// rewritten from the stored level. Warnings and command/spell range
/// errors are reported by [`validate`] but never repaired.
pub fn auto_fix(graph: &mut StateGraph) -> usize {
    let mut fixes = 0usize;

    for character in &mut graph.characters {
        if character.hp.max > 0 && character.hp.current > character.hp.max {
            character.hp.current = character.hp.max;
            fixes += 1;
        }
        if character.mp.max > 0 && character.mp.current > character.mp.max {
            character.mp.current = character.mp.max;
            fixes += 1;
        }

        for slot in character.equipment.slots_mut() {
            if !catalog::is_known_item(*slot) {
                *slot = catalog::EMPTY_ITEM;
                fixes += 1;
            }
        }

        if (experience::MIN_LEVEL..=experience::MAX_LEVEL).contains(&character.level)
            && !experience::is_consistent(character.level, character.exp)
        {
            character.exp = experience::exp_for_level(character.level);
            fixes += 1;
        }
    }

    if fixes > 0 {
        debug!(fixes, "auto-fix repaired state graph");
    }
    fixes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StatPair;

    fn graph_with(f: impl FnOnce(&mut Character)) -> StateGraph {
        let mut graph = StateGraph::default();
        f(graph.character_mut(0).unwrap());
        graph
    }

    #[test]
    fn default_graph_is_valid() {
        let result = validate(&StateGraph::default());
        assert!(result.is_valid());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn overflowing_hp_is_an_error_and_clamps() {
        let mut graph = graph_with(|c| {
            c.hp = StatPair { current: 9999, max: 100 };
        });

        let result = validate(&graph);
        assert!(
            result
                .errors
                .iter()
                .any(|i| i.kind == IssueKind::HpExceedsMax && i.character_id == Some(0))
        );

        assert_eq!(auto_fix(&mut graph), 1);
        assert_eq!(graph.character(0).unwrap().hp.current, 100);
        assert!(validate(&graph).is_valid());
    }

    #[test]
    fn zero_max_is_a_warning_not_an_error() {
        let graph = graph_with(|c| {
            c.hp = StatPair { current: 50, max: 0 };
        });
        let result = validate(&graph);
        assert!(result.is_valid());
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].kind, IssueKind::HpNotInitialized);

        // Warnings are never auto-fixed.
        let mut graph = graph;
        assert_eq!(auto_fix(&mut graph), 0);
        assert_eq!(graph.character(0).unwrap().hp.current, 50);
    }

    #[test]
    fn unknown_equipment_is_zeroed() {
        let mut graph = graph_with(|c| {
            c.equipment.weapon = 999;
            c.equipment.relic1 = 301;
        });
        let result = validate(&graph);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, IssueKind::UnknownEquipment);

        assert_eq!(auto_fix(&mut graph), 1);
        let equipment = graph.character(0).unwrap().equipment;
        assert_eq!(equipment.weapon, catalog::EMPTY_ITEM);
        assert_eq!(equipment.relic1, 301);
    }

    #[test]
    fn experience_drift_is_rewritten_from_level() {
        let mut graph = graph_with(|c| {
            c.level = 10;
            c.exp = 2_000_000;
        });
        assert!(
            validate(&graph)
                .errors
                .iter()
                .any(|i| i.kind == IssueKind::LevelExperienceMismatch)
        );

        assert_eq!(auto_fix(&mut graph), 1);
        assert_eq!(
            graph.character(0).unwrap().exp,
            experience::exp_for_level(10)
        );
    }

    #[test]
    fn auto_fix_is_idempotent() {
        let mut graph = graph_with(|c| {
            c.hp = StatPair { current: 500, max: 100 };
            c.mp = StatPair { current: 80, max: 20 };
            c.equipment.helmet = 4242;
            c.level = 50;
            c.exp = 1;
        });

        let first = auto_fix(&mut graph);
        assert_eq!(first, 4);
        assert_eq!(auto_fix(&mut graph), 0);
    }

    #[test]
    fn command_and_spell_bounds_are_errors_but_not_fixed() {
        let mut graph = graph_with(|c| {
            c.commands[3] = 200;
            c.spells[7] = 180;
        });
        let result = validate(&graph);
        assert!(result.errors.iter().any(|i| i.kind == IssueKind::UnknownCommand));
        assert!(result.errors.iter().any(|i| i.kind == IssueKind::SpellOutOfBounds));

        assert_eq!(auto_fix(&mut graph), 0);
        assert_eq!(graph.character(0).unwrap().commands[3], 200);
    }
}
