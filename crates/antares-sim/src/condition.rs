//! The level-condition evaluator.
//!
//! Every condition tick -- and on demand after any action that could
//! change an answer -- the evaluator walks the level's condition list,
//! resolves each enabled condition's subject and object placements, and
//! compares the computed value against the stored one. A hit enqueues
//! the condition's actions; a non-persistent hit disables itself first.
//!
//! Kinds that read local player state (computer, autopilot, zoom,
//! message) are not net-safe and are documented as such in the data
//! model.

use antares_data::object::attr;
use antares_data::{Condition, ConditionKind};
use antares_math::{lsqrt_fixed, Ticks};
use tracing::debug;

use crate::action::{exec, ActionRef};
use crate::game::Game;
use crate::handle::{AdmHandle, ObjHandle};
use crate::initial::resolve_initial;
use crate::obj::MAXIMUM_RELEVANT_DISTANCE_SQUARED;

/// Walk the condition list once.
pub fn check_conditions(g: &mut Game) {
    let plug = g.plug.clone();
    let Some(level) = plug.levels.get(g.level) else {
        return;
    };
    for (n, condition) in level.conditions.iter().enumerate() {
        if !g.condition_enabled.get(n).copied().unwrap_or(false) {
            continue;
        }
        let subject = resolve_initial(g, condition.subject);
        let object = resolve_initial(g, condition.object);
        if is_true(g, condition, subject, object) {
            if !condition.persistent {
                g.condition_enabled[n] = false;
            }
            debug!(condition = n, "condition fired");
            exec(g, ActionRef::Condition(n), 0, subject, object, None);
        }
    }
}

fn is_true(g: &Game, condition: &Condition, subject: ObjHandle, object: ObjHandle) -> bool {
    let op = condition.op;
    match &condition.kind {
        ConditionKind::Autopilot { value } => {
            let on = g
                .obj(g.ship)
                .map(|s| s.attributes & attr::ON_AUTO_PILOT != 0)
                .unwrap_or(false);
            op.matches(on, *value)
        }

        ConditionKind::Building { value } => {
            let building = g
                .admiral
                .index()
                .and_then(|a| g.admirals.get(a))
                .and_then(|a| a.build_at.index())
                .and_then(|n| g.destinations.get(n))
                .map(|d| d.build_object.is_some())
                .unwrap_or(false);
            op.matches(building, *value)
        }

        ConditionKind::Computer { screen, line } => {
            let same = if *line < 0 {
                g.computer_screen == *screen
            } else {
                g.computer_screen == *screen && g.computer_line == *line
            };
            op.matches(same, true)
        }

        ConditionKind::Counter {
            player,
            counter,
            value,
        } => {
            let current = crate::admiral::admiral_score(g, AdmHandle(*player), *counter);
            op.compare(current, *value)
        }

        ConditionKind::Destroyed { initial, value } => {
            // An unrevealed hidden initial counts as destroyed.
            let alive = resolve_initial_ref(g, *initial).is_some();
            op.matches(!alive, *value)
        }

        ConditionKind::Distance { value } => {
            let (Some(s), Some(o)) = (g.obj(subject), g.obj(object)) else {
                return false;
            };
            let dh = s.location.dh(o.location).unsigned_abs();
            let dv = s.location.dv(o.location).unsigned_abs();
            let distance = if dh > crate::obj::MAXIMUM_RELEVANT_DISTANCE
                || dv > crate::obj::MAXIMUM_RELEVANT_DISTANCE
            {
                MAXIMUM_RELEVANT_DISTANCE_SQUARED
            } else {
                dh * dh + dv * dv
            };
            // Extremely distant pairs have no defined distance.
            if distance >= MAXIMUM_RELEVANT_DISTANCE_SQUARED {
                return false;
            }
            op.compare(distance, *value)
        }

        ConditionKind::False => false,

        ConditionKind::Health { value } => {
            let fraction = match g.obj(subject) {
                Some(s) => {
                    let max = s.max_health(&g.plug);
                    if max > 0 {
                        f64::from(s.health) / f64::from(max)
                    } else {
                        0.0
                    }
                }
                None => 0.0,
            };
            op.compare(fraction, *value)
        }

        ConditionKind::Message { id, page } => {
            op.matches(g.current_message == (*id, *page), true)
        }

        ConditionKind::Ordered => {
            let (Some(s), Some(o)) = (g.obj(subject), g.obj(object)) else {
                return false;
            };
            op.matches(s.dest_object == object && s.dest_object_id == o.id, true)
        }

        ConditionKind::Owner { player } => {
            let Some(s) = g.obj(subject) else {
                return false;
            };
            op.matches(s.owner == AdmHandle(*player), true)
        }

        ConditionKind::Ships { player, value } => {
            let count = AdmHandle(*player)
                .index()
                .and_then(|a| g.admirals.get(a))
                .map(|a| a.ships_left)
                .unwrap_or(0);
            op.compare(count, *value)
        }

        ConditionKind::Speed { value } => {
            let Some(s) = g.obj(subject) else {
                return false;
            };
            let speed = lsqrt_fixed(
                (s.velocity.h * s.velocity.h) + (s.velocity.v * s.velocity.v),
            );
            op.compare(speed, *value)
        }

        ConditionKind::Subject { value } => {
            let local = g.admiral.index().and_then(|a| g.admirals.get(a));
            let Some(local) = local else { return false };
            let which = match value {
                antares_data::SubjectValue::Control => local.control,
                antares_data::SubjectValue::Target => local.target,
                antares_data::SubjectValue::Flagship => local.flagship,
            };
            op.matches(subject.is_some() && subject == which, true)
        }

        ConditionKind::Time {
            duration,
            legacy_start_time,
        } => {
            let elapsed = g.time - g.start_time;
            let value = if *legacy_start_time {
                // Backward compatibility: setup time weighs one third.
                let setup_len = Ticks::ZERO - g.start_time.since_epoch();
                let setup = if elapsed < setup_len { elapsed } else { setup_len };
                setup / 3 + (elapsed - setup)
            } else {
                elapsed
            };
            op.compare(value, *duration)
        }

        ConditionKind::Zoom { value } => op.compare(g.zoom, *value),
    }
}

/// Like [`resolve_initial`], but read-only.
fn resolve_initial_ref(g: &Game, number: i32) -> Option<ObjHandle> {
    if number < 0 {
        return None;
    }
    let n = number as usize;
    let handle = *g.initials.get(n)?;
    let id = *g.initial_ids.get(n)?;
    g.obj_checked(handle, id)
        .filter(|o| o.active == crate::obj::Activity::InUse)
        .map(|_| handle)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use antares_data::condition::ConditionOp;
    use antares_math::Fixed;

    #[test]
    fn ge_fires_at_threshold_gt_does_not() {
        assert!(ConditionOp::Ge.compare(Ticks(90), Ticks(90)));
        assert!(!ConditionOp::Gt.compare(Ticks(90), Ticks(90)));
    }

    #[test]
    fn fixed_speeds_compare_by_magnitude() {
        let slow = Fixed::from_float(0.5);
        let fast = Fixed::from_long(2);
        assert!(ConditionOp::Lt.compare(slow, fast));
        assert!(ConditionOp::Ge.compare(fast, fast));
    }
}
