//! Plugin loading and reference resolution.
//!
//! [`Plugin::load`] turns the loader's JSON document into fully resolved
//! tables: every by-name template reference (weapon slots, spawn verbs,
//! morph targets, placements) becomes a [`BaseId`], and the four blessed
//! objects are required to exist. A plugin that fails any of this is
//! rejected outright; the engine never starts on half-valid data.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::action::{Action, Alter, Verb};
use crate::initial::MAX_SHIP_CAN_BUILD;
use crate::level::Level;
use crate::object::{BaseId, BaseObject};
use crate::race::Race;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a plugin was rejected at load.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("malformed plugin document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("info identifier {0:?} is not a 40-character lowercase hex hash")]
    BadIdentifier(String),

    #[error("no {which} defined")]
    MissingBlessed { which: &'static str },

    #[error("unknown object {name:?} referenced by {referenced_by}")]
    UnknownObject {
        name: String,
        referenced_by: String,
    },

    #[error("level {level:?} player {player} names unknown race {race}")]
    UnknownRace {
        level: String,
        player: usize,
        race: i32,
    },

    #[error("initial {index} of level {level:?} offers {count} buildables (max {MAX_SHIP_CAN_BUILD})")]
    TooManyBuildables {
        level: String,
        index: usize,
        count: usize,
    },
}

// ---------------------------------------------------------------------------
// Info
// ---------------------------------------------------------------------------

/// Plugin identity plus the blessed template references the engine
/// cannot run without.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Info {
    /// 40-character lowercase hexadecimal content hash.
    pub identifier: String,
    #[serde(default)]
    pub format: i32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub urls: Vec<String>,

    pub warp_in_flare: String,
    pub warp_out_flare: String,
    pub player_body: String,
    pub energy_blob: String,
}

/// Resolved blessed ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blessed {
    pub warp_in_flare: BaseId,
    pub warp_out_flare: BaseId,
    pub player_body: BaseId,
    pub energy_blob: BaseId,
}

// ---------------------------------------------------------------------------
// Plugin
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct PluginFile {
    info: Info,
    #[serde(default)]
    objects: Vec<BaseObject>,
    #[serde(default)]
    races: Vec<Race>,
    #[serde(default)]
    levels: Vec<Level>,
}

/// A fully loaded, fully resolved plugin. Immutable after load; shared
/// read-only with the simulation.
#[derive(Clone, Debug)]
pub struct Plugin {
    pub info: Info,
    pub blessed: Blessed,
    pub objects: Vec<BaseObject>,
    pub races: Vec<Race>,
    pub levels: Vec<Level>,
    names: BTreeMap<String, BaseId>,
}

impl Plugin {
    /// Parse and resolve a plugin document.
    pub fn load(text: &str) -> Result<Plugin, LoadError> {
        let file: PluginFile = serde_json::from_str(text)?;
        Plugin::from_parts(file.info, file.objects, file.races, file.levels)
    }

    /// Resolve already-parsed tables. Exposed so tests can build
    /// plugins without going through JSON.
    pub fn from_parts(
        info: Info,
        mut objects: Vec<BaseObject>,
        races: Vec<Race>,
        mut levels: Vec<Level>,
    ) -> Result<Plugin, LoadError> {
        if info.identifier.len() != 40
            || !info
                .identifier
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
        {
            return Err(LoadError::BadIdentifier(info.identifier.clone()));
        }

        let mut names = BTreeMap::new();
        for (n, base) in objects.iter().enumerate() {
            names.insert(base.name.clone(), BaseId(n as u32));
        }

        let lookup = |name: &str, referenced_by: &dyn Fn() -> String| {
            names
                .get(name)
                .copied()
                .ok_or_else(|| LoadError::UnknownObject {
                    name: name.to_owned(),
                    referenced_by: referenced_by(),
                })
        };

        // Weapon slots and action spawn targets on every template.
        for n in 0..objects.len() {
            let owner_name = objects[n].name.clone();
            let base = &mut objects[n];
            for weapon in [&mut base.pulse, &mut base.beam, &mut base.special]
                .into_iter()
                .flatten()
            {
                weapon.base_id = Some(lookup(&weapon.base, &|| format!("object {owner_name:?}"))?);
            }
            for list in [
                &mut base.destroy,
                &mut base.expire,
                &mut base.create,
                &mut base.collide,
                &mut base.activate,
                &mut base.arrive,
            ] {
                resolve_actions(list, &names, &owner_name)?;
            }
        }

        // Blessed references.
        let blessed = Blessed {
            warp_in_flare: names
                .get(&info.warp_in_flare)
                .copied()
                .ok_or(LoadError::MissingBlessed {
                    which: "warp in flare",
                })?,
            warp_out_flare: names.get(&info.warp_out_flare).copied().ok_or(
                LoadError::MissingBlessed {
                    which: "warp out flare",
                },
            )?,
            player_body: names
                .get(&info.player_body)
                .copied()
                .ok_or(LoadError::MissingBlessed {
                    which: "player body",
                })?,
            energy_blob: names
                .get(&info.energy_blob)
                .copied()
                .ok_or(LoadError::MissingBlessed {
                    which: "energy blob",
                })?,
        };

        // Level placements and condition actions.
        let race_by_id: BTreeMap<i32, usize> =
            races.iter().enumerate().map(|(i, r)| (r.id, i)).collect();
        for level in &mut levels {
            let level_name = level.name.clone();
            for (p, player) in level.players.iter().enumerate() {
                if !race_by_id.contains_key(&player.race) && !races.is_empty() {
                    return Err(LoadError::UnknownRace {
                        level: level_name.clone(),
                        player: p,
                        race: player.race,
                    });
                }
            }
            for (index, initial) in level.initials.iter_mut().enumerate() {
                if initial.build.len() > MAX_SHIP_CAN_BUILD {
                    return Err(LoadError::TooManyBuildables {
                        level: level_name.clone(),
                        index,
                        count: initial.build.len(),
                    });
                }
                // Remap through the owner's race, then to a template id.
                let shipname = match initial.owner.and_then(|o| {
                    level
                        .players
                        .get(o as usize)
                        .and_then(|p| race_by_id.get(&p.race))
                        .map(|&r| races[r].ship(&initial.base).to_owned())
                }) {
                    Some(name) => name,
                    None => initial.base.clone(),
                };
                initial.base_id = Some(lookup(&shipname, &|| {
                    format!("initial {index} of level {level_name:?}")
                })?);
            }
            for condition in &mut level.conditions {
                resolve_actions(&mut condition.action, &names, &level_name)?;
            }
        }

        debug!(
            objects = objects.len(),
            levels = levels.len(),
            "plugin {:?} loaded",
            info.title
        );

        Ok(Plugin {
            info,
            blessed,
            objects,
            races,
            levels,
            names,
        })
    }

    /// The template for an id. Ids come only from this plugin's own
    /// resolution pass, so the index is always in range.
    #[inline]
    pub fn base(&self, id: BaseId) -> &BaseObject {
        &self.objects[id.0 as usize]
    }

    /// Look up a template by interned name.
    pub fn base_named(&self, name: &str) -> Option<BaseId> {
        self.names.get(name).copied()
    }

    /// Look up a race by numeric id.
    pub fn race(&self, id: i32) -> Option<&Race> {
        self.races.iter().find(|r| r.id == id)
    }

    /// Resolve a buildable name for an admiral of the given race.
    pub fn buildable(&self, race: i32, name: &str) -> Option<BaseId> {
        let shipname = match self.race(race) {
            Some(r) => r.ship(name),
            None => name,
        };
        self.base_named(shipname)
    }
}

fn resolve_actions(
    list: &mut [Action],
    names: &BTreeMap<String, BaseId>,
    owner: &str,
) -> Result<(), LoadError> {
    for action in list {
        let target: Option<(&str, &mut Option<BaseId>)> = match &mut action.verb {
            Verb::CreateObject { base, base_id, .. } => Some((base.as_str(), base_id)),
            Verb::Alter(Alter::BaseType { base, base_id, .. }) => Some((base.as_str(), base_id)),
            Verb::Alter(Alter::EquipWeapon { base, base_id, .. }) => {
                Some((base.as_str(), base_id))
            }
            _ => None,
        };
        if let Some((name, slot)) = target {
            let id = names
                .get(name)
                .copied()
                .ok_or_else(|| LoadError::UnknownObject {
                    name: name.to_owned(),
                    referenced_by: format!("an action of {owner:?}"),
                })?;
            *slot = Some(id);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::attr;

    fn bare(name: &str) -> BaseObject {
        serde_json::from_value(serde_json::json!({
            "name": name,
            "attributes": 0,
        }))
        .unwrap()
    }

    fn info() -> Info {
        Info {
            identifier: "0123456789abcdef0123456789abcdef01234567".to_owned(),
            format: 1,
            title: "test".to_owned(),
            author: String::new(),
            version: String::new(),
            urls: vec![],
            warp_in_flare: "warp-in".to_owned(),
            warp_out_flare: "warp-out".to_owned(),
            player_body: "body".to_owned(),
            energy_blob: "blob".to_owned(),
        }
    }

    fn blessed_objects() -> Vec<BaseObject> {
        ["warp-in", "warp-out", "body", "blob"]
            .iter()
            .map(|n| bare(n))
            .collect()
    }

    #[test]
    fn missing_blessed_reference_is_fatal() {
        let objects = vec![bare("warp-in"), bare("warp-out"), bare("body")];
        let err = Plugin::from_parts(info(), objects, vec![], vec![]).unwrap_err();
        assert!(matches!(
            err,
            LoadError::MissingBlessed {
                which: "energy blob"
            }
        ));
    }

    #[test]
    fn bad_identifier_is_fatal() {
        let mut i = info();
        i.identifier = "ABC".to_owned();
        let err = Plugin::from_parts(i, blessed_objects(), vec![], vec![]).unwrap_err();
        assert!(matches!(err, LoadError::BadIdentifier(_)));
    }

    #[test]
    fn weapon_names_resolve_to_ids() {
        let mut objects = blessed_objects();
        let mut gun = bare("gun");
        gun.attributes = attr::CAN_COLLIDE;
        objects.push(gun);
        let mut ship: BaseObject = serde_json::from_value(serde_json::json!({
            "name": "ship",
            "attributes": 0,
            "pulse": { "base": "gun" }
        }))
        .unwrap();
        ship.short_name = "sh".to_owned();
        objects.push(ship);

        let plug = Plugin::from_parts(info(), objects, vec![], vec![]).unwrap();
        let ship_id = plug.base_named("ship").unwrap();
        let gun_id = plug.base_named("gun").unwrap();
        assert_eq!(
            plug.base(ship_id).pulse.as_ref().unwrap().base_id,
            Some(gun_id)
        );
    }

    #[test]
    fn unknown_spawn_target_is_fatal() {
        let mut objects = blessed_objects();
        let shooter: BaseObject = serde_json::from_value(serde_json::json!({
            "name": "shooter",
            "attributes": 0,
            "destroy": [
                { "verb": { "type": "create-object", "base": "missing" } }
            ]
        }))
        .unwrap();
        objects.push(shooter);
        let err = Plugin::from_parts(info(), objects, vec![], vec![]).unwrap_err();
        assert!(matches!(err, LoadError::UnknownObject { .. }));
    }
}
