//! Line entities: bolts, beams, rays, lightning.
//!
//! A vector has a start pinned to its owning object and an end that is
//! either a fixed relative coordinate or another object. Stale endpoint
//! referents kill the owning object. Lightning keeps a small polyline
//! buffer the renderer jitters between endpoints.

use antares_data::{VectorFrame, VectorKind};
use antares_math::{add_angle, evil_fixed_to_long, rot_point, Coord, Fixed, Point};
use serde::{Deserialize, Serialize};

use crate::handle::{ObjHandle, VectorHandle};
use crate::obj::{MAXIMUM_RELEVANT_DISTANCE, NO_SHIP};

/// Capacity of the vector arena.
pub const MAX_VECTORS: usize = 32;

/// Points in the lightning polyline.
pub const BOLT_POINT_NUM: usize = 10;

/// One live vector.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Vector {
    pub active: bool,
    pub kill_me: bool,

    /// Beam endpoints pin to objects; bolts do not.
    pub is_ray: bool,
    /// End is a fixed coordinate relative to the from-object.
    pub to_coord: bool,
    pub lightning: bool,
    pub visible: bool,

    /// Bolt color index, or a hue for beams.
    pub color: u8,
    pub hue: Option<u8>,
    pub accuracy: i32,
    pub range: i32,

    pub object_location: Coord,
    pub last_global_location: Coord,
    pub last_apparent_location: Coord,

    pub from_object: ObjHandle,
    pub from_object_id: i32,
    pub to_object: ObjHandle,
    pub to_object_id: i32,
    pub to_relative_coord: Point,

    /// Color-cycling state for hued beams.
    pub bolt_state: i32,
    /// Screen-space polyline for lightning rendering.
    pub bolt_points: [Point; BOLT_POINT_NUM],
}

/// Fixed-capacity vector arena.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Vectors {
    slots: Vec<Vector>,
}

impl Vectors {
    pub fn new() -> Vectors {
        Vectors {
            slots: vec![Vector::default(); MAX_VECTORS],
        }
    }

    /// Claim a slot for a template's vector frame at `location`.
    pub fn add(&mut self, location: Coord, frame: &VectorFrame) -> VectorHandle {
        for (n, v) in self.slots.iter_mut().enumerate() {
            if v.active {
                continue;
            }
            *v = Vector {
                active: true,
                kill_me: false,
                is_ray: frame.kind != VectorKind::Bolt,
                to_coord: matches!(
                    frame.kind,
                    VectorKind::BeamToCoord | VectorKind::BeamToCoordLightning
                ),
                lightning: matches!(
                    frame.kind,
                    VectorKind::BeamToObjectLightning | VectorKind::BeamToCoordLightning
                ),
                visible: match frame.kind {
                    VectorKind::Bolt => frame.color != 0,
                    _ => frame.hue.is_some(),
                },
                color: frame.color,
                hue: frame.hue,
                accuracy: frame.accuracy,
                range: frame.range,
                object_location: location,
                last_global_location: location,
                last_apparent_location: location,
                from_object: ObjHandle::NONE,
                from_object_id: NO_SHIP,
                to_object: ObjHandle::NONE,
                to_object_id: NO_SHIP,
                ..Vector::default()
            };
            return VectorHandle(n as i32);
        }
        VectorHandle::NONE
    }

    pub fn get(&self, h: VectorHandle) -> Option<&Vector> {
        h.index().and_then(|n| self.slots.get(n)).filter(|v| v.active)
    }

    pub fn get_mut(&mut self, h: VectorHandle) -> Option<&mut Vector> {
        h.index()
            .and_then(|n| self.slots.get_mut(n))
            .filter(|v| v.active)
    }

    /// Reap slots flagged for removal.
    pub fn cull(&mut self) {
        for v in &mut self.slots {
            if v.kill_me {
                v.active = false;
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (VectorHandle, &Vector)> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, v)| v.active)
            .map(|(n, v)| (VectorHandle(n as i32), v))
    }
}

impl Default for Vectors {
    fn default() -> Self {
        Vectors::new()
    }
}

/// Compute the fixed relative endpoint for a ray fired at `angle`.
pub fn relative_coord_from_angle(range: i32, mut angle: i32) -> Point {
    let range = Fixed::from_long(range);
    add_angle(&mut angle, -90);
    let (fcos, fsin) = rot_point(angle);
    // The h term multiplies by zero; kept because the full rotation is
    // what the data format describes.
    Point::new(
        evil_fixed_to_long((Fixed::ZERO * -fcos) - (range * -fsin)),
        evil_fixed_to_long((Fixed::ZERO * -fsin) + (range * -fcos)),
    )
}

/// Point a freshly created beam at the shooter's target, falling back
/// to a fixed coordinate when the target is missing or out of range.
///
/// `vector_obj` is the beam's own object; `source` is the shooter.
pub fn set_attributes(g: &mut crate::game::Game, vector_obj: ObjHandle, source: ObjHandle) {
    let Some(vi) = vector_obj.index() else { return };
    let Some(si) = source.index() else { return };
    let vector_h = g.objects[vi].vector;

    let (source_id, source_target, source_target_id, source_loc, source_angle, source_dir) = {
        let s = &g.objects[si];
        (
            s.id,
            s.target,
            s.target_id,
            s.location,
            s.target_angle,
            s.direction,
        )
    };
    let (v_range, v_accuracy, v_to_coord, v_is_ray) = match g.vectors.get(vector_h) {
        Some(v) => (v.range, v.accuracy, v.to_coord, v.is_ray),
        None => return,
    };
    if let Some(v) = g.vectors.get_mut(vector_h) {
        v.from_object = source;
        v.from_object_id = source_id;
    }

    let target_snapshot = g
        .obj_checked(source_target, source_target_id)
        .map(|t| (t.id, t.location));

    let mut targeted = false;
    if let Some((tid, tloc)) = target_snapshot {
        let vloc = g.objects[vi].location;
        let h = vloc.dh(tloc).unsigned_abs();
        let dv = vloc.dv(tloc).unsigned_abs();
        let in_range = (u64::from(h) * u64::from(h) + u64::from(dv) * u64::from(dv))
            <= (i64::from(v_range) * i64::from(v_range)) as u64
            && h <= MAXIMUM_RELEVANT_DISTANCE
            && dv <= MAXIMUM_RELEVANT_DISTANCE;
        if in_range {
            if v_to_coord {
                let acc = v_accuracy;
                let jh = g.objects[vi].random.next(acc << 1);
                let jv = g.objects[vi].random.next(acc << 1);
                let coord = Point::new(
                    source_loc.dh(tloc) - acc + jh,
                    source_loc.dv(tloc) - acc + jv,
                );
                if let Some(v) = g.vectors.get_mut(vector_h) {
                    v.to_relative_coord = coord;
                }
            } else if let Some(v) = g.vectors.get_mut(vector_h) {
                v.to_object = source_target;
                v.to_object_id = tid;
            }
            targeted = true;
        }
    }

    if !targeted {
        let angle = if source_target.is_some() {
            source_angle
        } else {
            source_dir
        };
        let coord = relative_coord_from_angle(v_range, angle);
        if let Some(v) = g.vectors.get_mut(vector_h) {
            if v_is_ray {
                v.to_coord = true;
            }
            v.to_relative_coord = coord;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bolt_frame() -> VectorFrame {
        VectorFrame {
            kind: VectorKind::Bolt,
            color: 5,
            hue: None,
            accuracy: 0,
            range: 64,
        }
    }

    #[test]
    fn add_reuses_culled_slots() {
        let mut vectors = Vectors::new();
        let at = Coord::new(100, 100);
        let h = vectors.add(at, &bolt_frame());
        assert!(h.is_some());
        vectors.get_mut(h).unwrap().kill_me = true;
        vectors.cull();
        assert!(vectors.get(h).is_none());
        let h2 = vectors.add(at, &bolt_frame());
        assert_eq!(h, h2, "freed slot is reused first");
    }

    #[test]
    fn relative_coord_points_along_angle() {
        // Angle 0 is up the v axis; the endpoint lands range below in
        // coordinate terms because motion subtracts.
        let p = relative_coord_from_angle(100, 0);
        assert!(p.v.abs() > 90, "endpoint {p:?} should be mostly vertical");
        assert!(p.h.abs() < 10);
    }
}
