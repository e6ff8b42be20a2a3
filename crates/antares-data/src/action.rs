//! Scripted actions.
//!
//! An [`Action`] is one step of a script attached to an object hook
//! (destroy, expire, create, collide, activate, arrive) or to a
//! condition. The [`Verb`] carries the payload; the common fields
//! select who the verb applies to and when.

use antares_math::{Fixed, Point, Ticks};
use serde::{Deserialize, Serialize};

use crate::Screen;
use crate::Zoom;

// ---------------------------------------------------------------------------
// Common fields
// ---------------------------------------------------------------------------

/// Owner relationship filter between subject and direct object.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OwnerFilter {
    #[default]
    Any,
    Same,
    Different,
}

/// One scripted step.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Action {
    pub verb: Verb,

    /// Apply to the subject rather than the direct object.
    #[serde(default)]
    pub reflexive: bool,
    /// The direct object must have ALL of these attribute bits.
    #[serde(default)]
    pub inclusive_filter: u32,
    /// All-ones selects the level-key-tag filter instead.
    #[serde(default)]
    pub exclusive_filter: u32,
    /// Tag matched against the direct object's template when the
    /// exclusive filter is all-ones.
    #[serde(default)]
    pub level_key_tag: String,
    #[serde(default)]
    pub owner: OwnerFilter,
    /// Delay before this step (and the rest of its list) runs.
    #[serde(default)]
    pub delay: Ticks,
    /// Substitute the resolved initial for the subject; -1 is none.
    #[serde(default = "minus_one")]
    pub initial_subject_override: i32,
    /// Substitute the resolved initial for the direct object; -1 is none.
    #[serde(default = "minus_one")]
    pub initial_direct_override: i32,
}

fn minus_one() -> i32 {
    -1
}

impl Action {
    /// Whether executing this verb can change the truth of a level
    /// condition, forcing a re-check after the list runs.
    pub fn check_conditions(&self) -> bool {
        matches!(
            self.verb,
            Verb::ChangeScore { .. }
                | Verb::DisplayMessage { .. }
                | Verb::Alter(Alter::Owner { .. })
                | Verb::Alter(Alter::Occupation { .. })
                | Verb::Alter(Alter::ConditionTrueYet { .. })
                | Verb::Alter(Alter::Hidden { .. })
                | Verb::Alter(Alter::AbsoluteCash { .. })
        )
    }

    /// The template this action spawns, if any.
    pub fn created_base(&self) -> Option<&str> {
        match &self.verb {
            Verb::CreateObject { base, .. } => Some(base),
            Verb::Alter(Alter::BaseType { base, .. }) => Some(base),
            Verb::Alter(Alter::EquipWeapon { base, .. }) => Some(base),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Verbs
// ---------------------------------------------------------------------------

/// Which of an object's three weapon slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Weapon {
    Pulse,
    Beam,
    Special,
}

/// How a Die verb kills.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KillKind {
    /// Free the focus without running its destroy pipeline.
    Expire,
    /// Run the full destroy pipeline on the subject.
    Destroy,
    /// Free the focus as-is.
    None,
}

/// Velocity-altering sub-verbs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PushKind {
    /// Zero the focus velocity.
    Stop,
    /// Accelerate along the focus heading.
    Boost,
    /// Set velocity along the focus heading.
    Cruise,
    /// Set velocity along the subject heading.
    Set,
    /// Impart a mass-scaled collision impulse from the subject.
    Collide,
    /// Proportional brake.
    Decelerate,
}

/// The action payload.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Verb {
    /// Does nothing. Malformed actions degrade to this.
    None,

    /// Spawn `count_min + rand(count_range)` copies of a template.
    CreateObject {
        base: String,
        #[serde(skip)]
        base_id: Option<super::BaseId>,
        #[serde(default = "one")]
        count_min: i32,
        #[serde(default)]
        count_range: i32,
        #[serde(default)]
        relative_velocity: bool,
        #[serde(default)]
        relative_direction: bool,
        /// Random placement jitter, plus or minus.
        #[serde(default)]
        distance: i32,
        /// Inherit the subject's destination.
        #[serde(default)]
        inherit: bool,
        /// Consume a draw even when the count range is the meaningless 1.
        #[serde(default)]
        legacy_random: bool,
    },

    /// Play a sound id drawn from `[id_min, id_min + id_range)`.
    PlaySound {
        #[serde(default)]
        priority: u8,
        #[serde(default)]
        persistence: Ticks,
        /// Not positional.
        #[serde(default)]
        absolute: bool,
        #[serde(default)]
        volume: i32,
        id_min: i32,
        #[serde(default)]
        id_range: i32,
    },

    /// Mutate a field of the focus.
    Alter(Alter),

    /// Spawn a particle burst at the focus.
    MakeSparks {
        count: i32,
        decay: i32,
        velocity_range: Fixed,
        hue: u8,
    },

    /// Spawn energy pods totaling `percent` of the focus energy.
    ReleaseEnergy { percent: Fixed },

    /// Enter landing presence with the given shrink speed.
    LandAt { speed: i32 },

    /// Enter warp-in presence.
    EnterWarp,

    /// Push styled text onto the message carousel.
    DisplayMessage { id: i32, page: i32 },

    /// Add to one of an admiral's score counters.
    ChangeScore {
        /// Scenario player index; absent means the focus owner.
        #[serde(default)]
        player: Option<i32>,
        which: usize,
        amount: i32,
    },

    /// End the level.
    DeclareWinner {
        #[serde(default)]
        player: Option<i32>,
        #[serde(default)]
        next_level: Option<i32>,
        #[serde(default)]
        text: String,
    },

    /// Kill the focus or subject.
    Die { kind: KillKind },

    /// Set the subject's destination to the direct object.
    SetDestination,

    /// Force-fire a weapon slot regardless of cooldown.
    ActivateSpecial,
    ActivatePulse,
    ActivateBeam,

    /// Drive the screen-flash transition.
    ColorFlash { length: i32, hue: u8, shade: u8 },

    /// Clear the focus's target.
    NilTarget,

    /// OR bits into the inhibited-key mask.
    DisableKeys { mask: u32 },
    /// Clear bits from the inhibited-key mask.
    EnableKeys { mask: u32 },

    /// Set the instrument zoom level.
    SetZoom { level: Zoom },

    /// Select a mini-computer screen and line.
    ComputerSelect {
        screen: Screen,
        #[serde(default = "minus_one")]
        line: i32,
    },

    /// Rebind a resolved initial slot to the focus (tutorial handoff).
    AssumeInitialObject { which: i32 },
}

fn one() -> i32 {
    1
}

// ---------------------------------------------------------------------------
// Alter sub-verbs
// ---------------------------------------------------------------------------

/// Field mutations applied to the focus.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "alter", rename_all = "kebab-case")]
pub enum Alter {
    /// Add to (or subtract from) health, with the destroy pipeline on
    /// underflow.
    Health { amount: i32 },
    /// Add to energy, overflowing into the battery.
    Energy { amount: i32 },
    /// Velocity change; see [`PushKind`].
    Velocity {
        kind: PushKind,
        #[serde(default)]
        value: Fixed,
    },
    Thrust {
        #[serde(default)]
        relative: bool,
        minimum: Fixed,
        #[serde(default)]
        range: Fixed,
    },
    /// Cap speed; absent restores the template's maximum.
    MaxVelocity {
        #[serde(default)]
        value: Option<Fixed>,
    },
    MaxThrust { value: Fixed },
    MaxTurnRate { value: Fixed },
    /// Rescale the focus sprite; 4096 = 100%.
    Scale { value: i32 },
    /// Set or clear attribute bits.
    Attributes {
        #[serde(default)]
        clear: bool,
        bits: u32,
    },
    /// Rewrite the focus's level key tag.
    LevelKeyTag { tag: String },
    /// Rewrite the focus's order key tag.
    OrderKeyTag { tag: String },
    /// Rewrite the focus's engage key tag.
    EngageKeyTag { tag: String },
    /// Change owner.
    Owner {
        /// Scenario player index; absent takes an owner from subject or
        /// direct depending on reflexivity.
        #[serde(default)]
        player: Option<i32>,
    },
    /// Teleport relative to the level origin, subject, or object.
    Location {
        origin: MoveOrigin,
        #[serde(default)]
        to: Point,
        #[serde(default)]
        distance: i32,
    },
    /// Re-equip a weapon slot with another template.
    EquipWeapon {
        which: Weapon,
        base: String,
        #[serde(skip)]
        base_id: Option<super::BaseId>,
    },
    /// Reveal initially-hidden scenario objects.
    Hidden { first: usize, count: usize },
    /// Begin cloaking.
    Cloak,
    /// Knock systems offline for a mass-scaled random time.
    Offline { minimum: Fixed, range: Fixed },
    /// Impart a mass-scaled random spin.
    Spin { minimum: Fixed, range: Fixed },
    /// Rewrite the focus from a different template.
    BaseType {
        base: String,
        #[serde(skip)]
        base_id: Option<super::BaseId>,
        #[serde(default)]
        keep_ammo: bool,
    },
    /// Set or clear condition true-yet latches.
    ConditionTrueYet {
        true_yet: bool,
        first: usize,
        #[serde(default)]
        count: usize,
    },
    /// Add to a neutral-death base's occupation force.
    Occupation { amount: i32 },
    /// Pay an admiral directly.
    AbsoluteCash {
        /// Pay the focus owner rather than a named player.
        #[serde(default)]
        relative: bool,
        amount: Fixed,
        #[serde(default)]
        player: Option<i32>,
    },
    /// Reset or extend the expiry clock.
    Age {
        #[serde(default)]
        relative: bool,
        minimum: Ticks,
        #[serde(default)]
        range: Ticks,
    },
    /// Overwrite location in absolute universe coordinates (rotated by
    /// the level angle when relative).
    AbsoluteLocation {
        #[serde(default)]
        relative: bool,
        at: Point,
    },
}

/// Where an altered location is measured from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MoveOrigin {
    Level,
    Subject,
    Object,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verb_round_trips_through_json() {
        let json = r#"{
            "verb": {
                "type": "create-object",
                "base": "fighter",
                "count_min": 2,
                "count_range": 3,
                "relative_velocity": true
            },
            "delay": 10
        }"#;
        let action: Action = serde_json::from_str(json).unwrap();
        assert_eq!(action.delay, Ticks(10));
        match &action.verb {
            Verb::CreateObject {
                base, count_min, ..
            } => {
                assert_eq!(base, "fighter");
                assert_eq!(*count_min, 2);
            }
            other => panic!("wrong verb: {other:?}"),
        }
        let text = serde_json::to_string(&action).unwrap();
        let back: Action = serde_json::from_str(&text).unwrap();
        assert_eq!(back.initial_subject_override, -1);
    }

    #[test]
    fn alter_verbs_carry_tags() {
        let json = r#"{ "verb": { "type": "alter", "alter": "health", "amount": -50 } }"#;
        let action: Action = serde_json::from_str(json).unwrap();
        assert!(matches!(
            action.verb,
            Verb::Alter(Alter::Health { amount: -50 })
        ));
    }

    #[test]
    fn condition_affecting_verbs_flagged() {
        let score = Action {
            verb: Verb::ChangeScore {
                player: None,
                which: 0,
                amount: 1,
            },
            reflexive: false,
            inclusive_filter: 0,
            exclusive_filter: 0,
            level_key_tag: String::new(),
            owner: OwnerFilter::Any,
            delay: Ticks::ZERO,
            initial_subject_override: -1,
            initial_direct_override: -1,
        };
        assert!(score.check_conditions());

        let mut sound = score.clone();
        sound.verb = Verb::PlaySound {
            priority: 0,
            persistence: Ticks::ZERO,
            absolute: true,
            volume: 255,
            id_min: 500,
            id_range: 0,
        };
        assert!(!sound.check_conditions());
    }
}
