//! Fixed-timestep simulation for the energy forms engine.
//!
//! Provides a system-based tick loop around the energy system pipeline and
//! the thermal scene. The live [`ef_systems::PipelineSelection`] is owned
//! here and handed to systems through the [`SimContext`].

/// Simulation clock for tracking ticks and elapsed time.
pub mod clock;
/// Configuration types for simulation runs.
pub mod config;
/// Mutable context passed to systems each tick.
pub mod context;
/// Energy systems: drives the source-converter-user pipeline.
pub mod energy;
/// Error types for the simulation crate.
pub mod error;
/// Simulation event types and the event log.
pub mod event;
/// Top-level simulation orchestrator.
pub mod simulation;
/// Serializable snapshots of simulation state.
pub mod snapshot;
/// The trait that all simulation systems implement.
pub mod system;
/// Thermal system: burners, heat exchange and thermometers.
pub mod thermal;

/// Re-export of [`clock::SimClock`].
pub use clock::SimClock;
/// Re-export of [`config::SimConfig`].
pub use config::SimConfig;
/// Re-export of [`context::SimContext`].
pub use context::SimContext;
/// Re-export of [`energy::EnergySystemsSystem`].
pub use energy::EnergySystemsSystem;
/// Re-exports of [`error::SimError`] and [`error::SimResult`].
pub use error::{SimError, SimResult};
/// Re-exports of the event types.
pub use event::{ChunkTotals, EventLog, SimEvent, SimEventKind};
/// Re-export of [`simulation::Simulation`].
pub use simulation::Simulation;
/// Re-exports of snapshot types.
pub use snapshot::{ContainerSnapshot, ElementOutput, SimSnapshot};
/// Re-export of [`system::System`].
pub use system::System;
/// Re-export of [`thermal::ThermalSystem`].
pub use thermal::ThermalSystem;
