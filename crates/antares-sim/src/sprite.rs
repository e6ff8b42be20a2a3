//! The drawable-snapshot store.
//!
//! Rasterization is a collaborator concern; the simulation only keeps
//! the per-object drawing state the renderer snapshots between ticks:
//! screen position, shape index, scale, style (hit flash / cloak fade),
//! and radar dot size. Slots flagged `kill_me` are reaped by the cull
//! step at the end of each tick.

use antares_math::Point;
use serde::{Deserialize, Serialize};

use crate::handle::SpriteHandle;

/// Largest on-screen offset a sprite position is clamped to.
pub const SPRITE_MAX_SIZE: i32 = 4096;

/// Render style for one sprite.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpriteStyle {
    #[default]
    Normal,
    /// Tinted by (hue, amount); used for shield flash and cloak fade.
    Color,
}

/// One drawable entry.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Sprite {
    pub active: bool,
    pub kill_me: bool,
    /// Sprite resource name from the template.
    pub table: Option<String>,
    pub where_: Point,
    pub which_shape: i32,
    /// 4096 = 100%.
    pub scale: i32,
    pub layer: i16,
    pub style: SpriteStyle,
    pub style_hue: u8,
    pub style_data: i32,
    /// Radar dot size; zero hides the dot.
    pub tiny_size: i32,
    /// Radar strobe phase for badly damaged ships; zero is steady.
    pub tiny_dim: u8,
}

/// Fixed-capacity sprite arena.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Sprites {
    slots: Vec<Sprite>,
}

impl Sprites {
    pub fn new(capacity: usize) -> Sprites {
        Sprites {
            slots: vec![Sprite::default(); capacity],
        }
    }

    /// Claim a free slot. Returns the null handle if the arena is full.
    pub fn add(&mut self, sprite: Sprite) -> SpriteHandle {
        for (n, slot) in self.slots.iter_mut().enumerate() {
            if !slot.active {
                *slot = Sprite {
                    active: true,
                    kill_me: false,
                    ..sprite
                };
                return SpriteHandle(n as i32);
            }
        }
        SpriteHandle::NONE
    }

    pub fn get(&self, h: SpriteHandle) -> Option<&Sprite> {
        h.index().and_then(|n| self.slots.get(n)).filter(|s| s.active)
    }

    pub fn get_mut(&mut self, h: SpriteHandle) -> Option<&mut Sprite> {
        h.index()
            .and_then(|n| self.slots.get_mut(n))
            .filter(|s| s.active)
    }

    /// Reap slots flagged for removal.
    pub fn cull(&mut self) {
        for slot in &mut self.slots {
            if slot.kill_me {
                *slot = Sprite::default();
            }
        }
    }

    /// Iterate live sprites for the renderer snapshot.
    pub fn iter(&self) -> impl Iterator<Item = (SpriteHandle, &Sprite)> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.active)
            .map(|(n, s)| (SpriteHandle(n as i32), s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_cull() {
        let mut sprites = Sprites::new(2);
        let a = sprites.add(Sprite {
            which_shape: 7,
            ..Sprite::default()
        });
        assert!(a.is_some());
        assert_eq!(sprites.get(a).unwrap().which_shape, 7);

        sprites.get_mut(a).unwrap().kill_me = true;
        sprites.cull();
        assert!(sprites.get(a).is_none());
    }

    #[test]
    fn full_arena_returns_none() {
        let mut sprites = Sprites::new(1);
        assert!(sprites.add(Sprite::default()).is_some());
        assert!(sprites.add(Sprite::default()).is_none());
    }
}
