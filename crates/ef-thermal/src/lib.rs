//! Thermal energy containers and heat equilibration.
//!
//! Blocks, beakers of liquid, and the surrounding air are lumped bodies
//! holding thermal energy. Once per tick the [`ThermalEquilibrationStepper`]
//! moves heat between bodies in contact, and a [`Burner`] can heat or cool
//! whatever rests on it.

/// Burners that heat or cool the containers resting on them.
pub mod burner;
/// Material categories and their constant tables.
pub mod category;
/// The thermal energy container.
pub mod container;
/// Contact detection and the per-tick equilibration stepper.
pub mod equilibration;
/// Thermometers that follow containers and sense their temperature.
pub mod thermometer;

/// Re-exports of burner types.
pub use burner::{Burner, BurnerOutput};
/// Re-exports of category types.
pub use category::{HeatTransferTable, MaterialProperties, ThermalCategory, ThermalProperties};
/// Re-exports of container types.
pub use container::{ContainerId, RemovalOutcome, ThermalEnergyContainer};
/// Re-exports of equilibration types.
pub use equilibration::{
    ContactPair, EquilibrationReport, HeatTransfer, ThermalEquilibrationStepper, detect_contacts,
};
/// Re-export of [`thermometer::Thermometer`].
pub use thermometer::Thermometer;
