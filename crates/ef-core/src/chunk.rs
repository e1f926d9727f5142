use std::collections::VecDeque;
use std::fmt;

use glam::DVec2;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::energy::EnergyType;

/// Unique identifier for an energy chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkId(pub Uuid);

impl ChunkId {
    /// Generate a new random chunk ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ChunkId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// An ordered list of waypoints a chunk travels toward, front first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnergyChunkPath {
    waypoints: VecDeque<DVec2>,
}

impl EnergyChunkPath {
    /// Build a path from waypoints in travel order.
    pub fn new(waypoints: impl IntoIterator<Item = DVec2>) -> Self {
        Self {
            waypoints: waypoints.into_iter().collect(),
        }
    }

    /// Whether every waypoint has been reached.
    pub fn is_complete(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Remaining waypoints in travel order.
    pub fn waypoints(&self) -> impl Iterator<Item = &DVec2> {
        self.waypoints.iter()
    }

    /// The final waypoint, if any remain.
    pub fn end(&self) -> Option<DVec2> {
        self.waypoints.back().copied()
    }

    /// Distance left to travel from `position` through every waypoint.
    pub fn remaining_length(&self, position: DVec2) -> f64 {
        let mut length = 0.0;
        let mut from = position;
        for &to in &self.waypoints {
            length += from.distance(to);
            from = to;
        }
        length
    }

    /// Move `distance` along the path starting from `position`.
    ///
    /// Returns the new position and whether the path is now complete.
    /// Leftover distance after the final waypoint is discarded.
    pub fn advance(&mut self, position: DVec2, distance: f64) -> (DVec2, bool) {
        let mut position = position;
        let mut budget = distance.max(0.0);
        while let Some(&target) = self.waypoints.front() {
            let gap = position.distance(target);
            if gap <= budget {
                position = target;
                budget -= gap;
                self.waypoints.pop_front();
            } else {
                position += (target - position) * (budget / gap);
                break;
            }
        }
        (position, self.waypoints.is_empty())
    }
}

/// A discrete packet of energy moving through the simulation.
#[derive(Debug, Clone)]
pub struct EnergyChunk {
    id: ChunkId,
    /// What form of energy this chunk represents.
    pub energy_type: EnergyType,
    /// Current position in model space.
    pub position: DVec2,
    /// Whether the renderer should draw this chunk.
    pub visible: bool,
    path: EnergyChunkPath,
}

impl EnergyChunk {
    /// Create a chunk at rest at `position`.
    pub fn new(energy_type: EnergyType, position: DVec2, visible: bool) -> Self {
        Self {
            id: ChunkId::new(),
            energy_type,
            position,
            visible,
            path: EnergyChunkPath::default(),
        }
    }

    /// This chunk's identity.
    pub fn id(&self) -> ChunkId {
        self.id
    }

    /// The path currently being followed.
    pub fn path(&self) -> &EnergyChunkPath {
        &self.path
    }

    /// Replace the current path.
    pub fn set_path(&mut self, path: EnergyChunkPath) {
        self.path = path;
    }

    /// Whether the chunk still has waypoints ahead of it.
    pub fn is_moving(&self) -> bool {
        !self.path.is_complete()
    }

    /// Advance along the path at `speed` for `dt` seconds.
    ///
    /// Returns `true` once the final waypoint has been reached.
    pub fn step(&mut self, speed: f64, dt: f64) -> bool {
        let (position, done) = self.path.advance(self.position, speed * dt);
        self.position = position;
        done
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_ids_are_unique() {
        let a = EnergyChunk::new(EnergyType::Light, DVec2::ZERO, true);
        let b = EnergyChunk::new(EnergyType::Light, DVec2::ZERO, true);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn chunk_id_display_is_short() {
        assert_eq!(ChunkId::new().to_string().len(), 8);
    }

    #[test]
    fn path_advance_partial_segment() {
        let mut path = EnergyChunkPath::new([DVec2::new(1.0, 0.0)]);
        let (pos, done) = path.advance(DVec2::ZERO, 0.25);
        assert!(!done);
        assert!((pos - DVec2::new(0.25, 0.0)).length() < 1e-12);
    }

    #[test]
    fn path_advance_crosses_waypoints() {
        let mut path = EnergyChunkPath::new([DVec2::new(1.0, 0.0), DVec2::new(1.0, 1.0)]);
        let (pos, done) = path.advance(DVec2::ZERO, 1.5);
        assert!(!done);
        assert!((pos - DVec2::new(1.0, 0.5)).length() < 1e-12);
        assert_eq!(path.waypoints().count(), 1);
        assert!((path.remaining_length(pos) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn path_advance_finishes_exactly_at_end() {
        let mut path = EnergyChunkPath::new([DVec2::new(0.0, 2.0)]);
        let (pos, done) = path.advance(DVec2::ZERO, 10.0);
        assert!(done);
        assert_eq!(pos, DVec2::new(0.0, 2.0));
        assert!(path.is_complete());
        assert_eq!(path.end(), None);
    }

    #[test]
    fn empty_path_is_complete_immediately() {
        let mut chunk = EnergyChunk::new(EnergyType::Thermal, DVec2::new(3.0, 4.0), false);
        assert!(!chunk.is_moving());
        assert!(chunk.step(1.0, 1.0));
        assert_eq!(chunk.position, DVec2::new(3.0, 4.0));
    }

    #[test]
    fn chunk_step_uses_speed_and_dt() {
        let mut chunk = EnergyChunk::new(EnergyType::Electrical, DVec2::ZERO, true);
        chunk.set_path(EnergyChunkPath::new([DVec2::new(1.0, 0.0)]));
        assert!(!chunk.step(0.5, 1.0));
        assert!((chunk.position.x - 0.5).abs() < 1e-12);
        assert!(chunk.step(0.5, 1.0));
        assert!(!chunk.is_moving());
    }
}
