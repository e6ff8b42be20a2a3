//! Simulation time units.
//!
//! A minor tick is 1/60 s and is the unit of game time. A major tick is
//! three minor ticks -- the fundamental integration step. Game time is a
//! signed instant so that a level's pre-start warmup can run at negative
//! time.

use std::ops;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Ticks
// ---------------------------------------------------------------------------

/// A duration in minor ticks (1/60 s each).
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Ticks(pub i64);

impl Ticks {
    pub const ZERO: Ticks = Ticks(0);

    #[inline]
    pub const fn count(self) -> i64 {
        self.0
    }
}

/// Whole seconds as ticks.
#[inline]
pub const fn secs(n: i64) -> Ticks {
    Ticks(n * 60)
}

/// The fundamental integration step: three minor ticks.
pub const MAJOR_TICK: Ticks = Ticks(3);
/// How often level conditions are evaluated.
pub const CONDITION_TICK: Ticks = Ticks(90);
/// AI decisions happen every this many cycles.
pub const DECIDE_EVERY_CYCLES: i64 = 3;

impl ops::Add for Ticks {
    type Output = Ticks;
    #[inline]
    fn add(self, other: Ticks) -> Ticks {
        Ticks(self.0 + other.0)
    }
}

impl ops::Sub for Ticks {
    type Output = Ticks;
    #[inline]
    fn sub(self, other: Ticks) -> Ticks {
        Ticks(self.0 - other.0)
    }
}

impl ops::Neg for Ticks {
    type Output = Ticks;
    #[inline]
    fn neg(self) -> Ticks {
        Ticks(-self.0)
    }
}

impl ops::AddAssign for Ticks {
    #[inline]
    fn add_assign(&mut self, other: Ticks) {
        self.0 += other.0;
    }
}

impl ops::SubAssign for Ticks {
    #[inline]
    fn sub_assign(&mut self, other: Ticks) {
        self.0 -= other.0;
    }
}

impl ops::Mul<i64> for Ticks {
    type Output = Ticks;
    #[inline]
    fn mul(self, n: i64) -> Ticks {
        Ticks(self.0 * n)
    }
}

impl ops::Div<i64> for Ticks {
    type Output = Ticks;
    #[inline]
    fn div(self, n: i64) -> Ticks {
        Ticks(self.0 / n)
    }
}

impl ops::Rem for Ticks {
    type Output = Ticks;
    #[inline]
    fn rem(self, other: Ticks) -> Ticks {
        Ticks(self.0 % other.0)
    }
}

// ---------------------------------------------------------------------------
// GameTime
// ---------------------------------------------------------------------------

/// An instant on the game clock, in minor ticks since the level epoch.
///
/// Negative during the warmup that runs before a level's nominal start.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct GameTime(pub i64);

impl GameTime {
    pub const ZERO: GameTime = GameTime(0);

    /// The duration since the epoch.
    #[inline]
    pub const fn since_epoch(self) -> Ticks {
        Ticks(self.0)
    }
}

impl ops::Add<Ticks> for GameTime {
    type Output = GameTime;
    #[inline]
    fn add(self, d: Ticks) -> GameTime {
        GameTime(self.0 + d.0)
    }
}

impl ops::Sub<Ticks> for GameTime {
    type Output = GameTime;
    #[inline]
    fn sub(self, d: Ticks) -> GameTime {
        GameTime(self.0 - d.0)
    }
}

impl ops::Sub for GameTime {
    type Output = Ticks;
    #[inline]
    fn sub(self, other: GameTime) -> Ticks {
        Ticks(self.0 - other.0)
    }
}

impl ops::AddAssign<Ticks> for GameTime {
    #[inline]
    fn add_assign(&mut self, d: Ticks) {
        self.0 += d.0;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds_are_sixty_ticks() {
        assert_eq!(secs(1), Ticks(60));
        assert_eq!(secs(15), Ticks(900));
    }

    #[test]
    fn game_time_spans_warmup() {
        let start = GameTime::ZERO - secs(10);
        assert_eq!(start.0, -600);
        let later = start + MAJOR_TICK * 200;
        assert_eq!(later, GameTime::ZERO);
        assert_eq!(later - start, secs(10));
    }

    #[test]
    fn condition_tick_cadence() {
        let start = GameTime::ZERO - secs(3);
        let mut fires = 0;
        let mut t = start;
        for _ in 0..120 {
            t += MAJOR_TICK;
            if ((t - start) % CONDITION_TICK) == Ticks::ZERO {
                fires += 1;
            }
        }
        assert_eq!(fires, 4);
    }
}
