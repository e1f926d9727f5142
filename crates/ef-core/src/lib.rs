//! Core types for the energy forms engine.
//!
//! Everything here is independent of the thermal model and the element
//! pipeline: energy types and flows, the discrete [`EnergyChunk`] and the
//! path it travels, rate smoothing, and shared positions with a follower.

/// Moving-average smoothing over a fixed window.
pub mod average;
/// Energy chunks, their identifiers, and waypoint paths.
pub mod chunk;
/// Physical constants and tuning defaults.
pub mod constants;
/// Energy types and continuous energy flows.
pub mod energy;
/// Error types used throughout the workspace.
pub mod error;
/// Shared positions and the element follower.
pub mod follower;
/// Axis-aligned rectangles for bounds and contact tests.
pub mod rect;

/// Re-export of [`average::MovingAverageCalculator`].
pub use average::MovingAverageCalculator;
/// Re-exports of chunk types.
pub use chunk::{ChunkId, EnergyChunk, EnergyChunkPath};
/// Re-exports of energy types.
pub use energy::{Energy, EnergyType};
/// Re-exports of error types.
pub use error::{EfError, EfResult};
/// Re-exports of follower types.
pub use follower::{ElementFollower, PositionHandle};
/// Re-export of [`rect::Rect`].
pub use rect::Rect;

/// Re-export of the vector type used for positions.
pub use glam::DVec2;
