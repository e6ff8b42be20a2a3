//! Antares math -- deterministic numeric primitives for the simulation.
//!
//! Everything the engine computes with must be bit-for-bit reproducible
//! across platforms and across replays of a recorded game, so this crate
//! avoids floating point in every simulation-facing path. It provides:
//!
//! - [`Fixed`]: the signed 32-bit fixed-point scalar (8 fractional bits)
//!   used for velocities, thrusts, and masses, including the two
//!   historical fixed-to-integer conversions that differ on negative
//!   values.
//! - [`rotation`]: a 360-entry unit-vector table and integer-angle
//!   helpers; all direction math goes through the table, never through
//!   trig functions.
//! - [`Random`]: the linear congruential generator threaded through the
//!   global stream and every object's substream.
//! - [`special`]: integer square roots and the slope-scan angle finder.
//! - Tick/time units and universe-space geometry.

#![deny(unsafe_code)]

pub mod fixed;
pub mod geometry;
pub mod random;
pub mod rotation;
pub mod special;
pub mod units;

pub use fixed::{evil_fixed_to_long, more_evil_fixed_to_long, Fixed, FixedPoint, FIXED_NONE};
pub use geometry::{Coord, Point, Rect, UNIVERSAL_CENTER};
pub use random::{Random, Tag};
pub use rotation::{
    add_angle, angle_difference, angle_from_vector, rot_point, ROT_0, ROT_180, ROT_45, ROT_90,
    ROT_POS,
};
pub use special::{angle_from_slope, fix_ratio, lsqrt, lsqrt_fixed, ratio_to_angle, wsqrt};
pub use units::{secs, GameTime, Ticks, CONDITION_TICK, DECIDE_EVERY_CYCLES, MAJOR_TICK};
