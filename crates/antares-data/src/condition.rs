//! Level conditions.
//!
//! A [`Condition`] is a predicate the evaluator polls every condition
//! tick (and on demand after actions that can change its truth). When
//! the comparison comes out true the condition's action list fires with
//! the resolved subject and object; a non-persistent condition then
//! disables itself.

use antares_math::{Fixed, Ticks};
use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::{Screen, Zoom};

/// Comparison applied between the computed value and the stored one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConditionOp {
    #[default]
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl ConditionOp {
    /// Apply the op to an ordering-comparable pair.
    #[inline]
    pub fn compare<T: PartialOrd>(self, lhs: T, rhs: T) -> bool {
        match self {
            ConditionOp::Eq => lhs == rhs,
            ConditionOp::Ne => lhs != rhs,
            ConditionOp::Lt => lhs < rhs,
            ConditionOp::Gt => lhs > rhs,
            ConditionOp::Le => lhs <= rhs,
            ConditionOp::Ge => lhs >= rhs,
        }
    }

    /// Apply the op to a boolean predicate (only Eq and Ne make sense).
    #[inline]
    pub fn matches(self, truth: bool, value: bool) -> bool {
        match self {
            ConditionOp::Ne => truth != value,
            _ => truth == value,
        }
    }
}

/// What a subject condition compares the subject against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubjectValue {
    Control,
    Target,
    Flagship,
}

/// The predicate payload.
///
/// Kinds that read local player state (computer, autopilot, zoom,
/// message) are not net-safe: two players evaluating them can disagree.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ConditionKind {
    /// Local player's autopilot state. Not net-safe.
    Autopilot { value: bool },
    /// Whether the local player's build object is building. Not
    /// net-safe.
    Building { value: bool },
    /// Local player's mini-computer (screen, line); line < 0 compares
    /// the screen alone. Not net-safe.
    Computer {
        screen: Screen,
        #[serde(default = "minus_one")]
        line: i32,
    },
    /// A score counter of an admiral.
    Counter {
        player: i32,
        counter: usize,
        value: i32,
    },
    /// Whether an initial is destroyed (an unrevealed hidden initial
    /// counts as destroyed).
    Destroyed { initial: i32, value: bool },
    /// Distance between subject and object. Undefined when either is
    /// missing or the pair is extremely distant.
    Distance { value: u32 },
    /// Always false.
    False,
    /// Health fraction of the subject.
    Health { value: f64 },
    /// Local player's current message (id, page). Not net-safe.
    Message { id: i32, page: i32 },
    /// Whether the subject's target is the object.
    Ordered,
    /// Owner of the subject.
    Owner { player: i32 },
    /// Ship count of an admiral.
    Ships { player: i32, value: i32 },
    /// Speed of the subject.
    Speed { value: Fixed },
    /// Compares the subject against the local player's control, target,
    /// or flagship. Not net-safe.
    Subject { value: SubjectValue },
    /// Game time; with `legacy_start_time`, setup time weighs 1/3.
    Time {
        duration: Ticks,
        #[serde(default)]
        legacy_start_time: bool,
    },
    /// Local player's zoom level. Not net-safe.
    Zoom { value: Zoom },
}

fn minus_one() -> i32 {
    -1
}

/// One polled level condition.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Condition {
    #[serde(flatten)]
    pub kind: ConditionKind,
    #[serde(default)]
    pub op: ConditionOp,
    /// Keep firing every time the predicate is true.
    #[serde(default)]
    pub persistent: bool,
    #[serde(default = "enabled")]
    pub initially_enabled: bool,
    /// Initial index resolved as the action subject; -1 is none.
    #[serde(default = "minus_one")]
    pub subject: i32,
    /// Initial index resolved as the action direct object; -1 is none.
    #[serde(default = "minus_one")]
    pub object: i32,
    #[serde(default)]
    pub action: Vec<Action>,
}

fn enabled() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn op_boundaries() {
        assert!(ConditionOp::Ge.compare(5, 5));
        assert!(!ConditionOp::Gt.compare(5, 5));
        assert!(ConditionOp::Le.compare(5, 5));
        assert!(!ConditionOp::Lt.compare(5, 5));
        assert!(ConditionOp::Eq.compare(5, 5));
        assert!(!ConditionOp::Ne.compare(5, 5));
    }

    #[test]
    fn boolean_ops_reduce_to_eq_ne() {
        assert!(ConditionOp::Eq.matches(true, true));
        assert!(!ConditionOp::Eq.matches(true, false));
        assert!(ConditionOp::Ne.matches(true, false));
        // Ordering ops on booleans behave as equality, like the original.
        assert!(ConditionOp::Ge.matches(false, false));
    }

    #[test]
    fn condition_deserializes_flat() {
        let json = r#"{
            "type": "time",
            "duration": 1800,
            "op": "ge",
            "persistent": false,
            "action": []
        }"#;
        let c: Condition = serde_json::from_str(json).unwrap();
        assert!(matches!(
            c.kind,
            ConditionKind::Time {
                duration: Ticks(1800),
                legacy_start_time: false
            }
        ));
        assert_eq!(c.op, ConditionOp::Ge);
        assert!(c.initially_enabled);
        assert_eq!(c.subject, -1);
    }
}
