use ef_core::constants::{
    BURNER_SMOOTHING_WINDOW, CONVERTER_SMOOTHING_WINDOW, DEFAULT_DT, ENERGY_CHUNK_VELOCITY,
    ENERGY_PER_CHUNK, EXEMPT_LINGER_TIME, TEAPOT_SMOOTHING_WINDOW,
};
use ef_core::EfError;
use ef_systems::ElementConfig;
use ef_thermal::{HeatTransferTable, ThermalProperties};
use serde::{Deserialize, Serialize};

use crate::error::SimResult;

/// Configuration for a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Seconds per tick.
    pub dt: f64,
    /// RNG seed for deterministic simulation.
    pub seed: u64,
    /// Maximum event log size (oldest events dropped when exceeded). 0 = unlimited.
    pub max_events: usize,
    /// Chunk travel speed, in m/s.
    pub chunk_speed: f64,
    /// Energy represented by one chunk, in J.
    pub energy_per_chunk: f64,
    /// How long exempt chunks linger before hand-off, in seconds.
    pub exempt_linger_time: f64,
    /// Smoothing window for converter output.
    pub converter_smoothing_window: usize,
    /// Smoothing window for teapot steam.
    pub teapot_smoothing_window: usize,
    /// Smoothing window for burner display.
    pub burner_smoothing_window: usize,
    /// Whether energy chunks start out visible.
    pub chunks_visible: bool,
    /// Specific heat and density per material.
    pub thermal: ThermalProperties,
    /// Heat transfer coefficients.
    pub heat_transfer: HeatTransferTable,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            dt: DEFAULT_DT,
            seed: 42,
            max_events: 0,
            chunk_speed: ENERGY_CHUNK_VELOCITY,
            energy_per_chunk: ENERGY_PER_CHUNK,
            exempt_linger_time: EXEMPT_LINGER_TIME,
            converter_smoothing_window: CONVERTER_SMOOTHING_WINDOW,
            teapot_smoothing_window: TEAPOT_SMOOTHING_WINDOW,
            burner_smoothing_window: BURNER_SMOOTHING_WINDOW,
            chunks_visible: true,
            thermal: ThermalProperties::default(),
            heat_transfer: HeatTransferTable::default(),
        }
    }
}

impl SimConfig {
    /// Set the timestep in seconds.
    pub fn with_dt(mut self, dt: f64) -> Self {
        self.dt = dt;
        self
    }

    /// Set the RNG seed for deterministic simulation.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the maximum event log size (0 = unlimited).
    pub fn with_max_events(mut self, max: usize) -> Self {
        self.max_events = max;
        self
    }

    /// Set the chunk travel speed.
    pub fn with_chunk_speed(mut self, speed: f64) -> Self {
        self.chunk_speed = speed;
        self
    }

    /// Set the energy per chunk.
    pub fn with_energy_per_chunk(mut self, energy: f64) -> Self {
        self.energy_per_chunk = energy;
        self
    }

    /// Set whether chunks start out visible.
    pub fn with_chunks_visible(mut self, visible: bool) -> Self {
        self.chunks_visible = visible;
        self
    }

    /// Replace the material table.
    pub fn with_thermal(mut self, thermal: ThermalProperties) -> Self {
        self.thermal = thermal;
        self
    }

    /// Replace the heat transfer table.
    pub fn with_heat_transfer(mut self, table: HeatTransferTable) -> Self {
        self.heat_transfer = table;
        self
    }

    /// Parse a configuration from JSON and validate it. Missing fields take
    /// their default values.
    pub fn from_json(json: &str) -> SimResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| EfError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every field.
    pub fn validate(&self) -> SimResult<()> {
        EfError::ensure_positive("timestep", self.dt)?;
        self.element_config().validate()?;
        if self.burner_smoothing_window == 0 {
            return Err(EfError::InvalidWindowSize.into());
        }
        self.thermal.validate()?;
        self.heat_transfer.validate()?;
        Ok(())
    }

    /// The subset of settings every energy system element shares.
    pub fn element_config(&self) -> ElementConfig {
        ElementConfig {
            energy_per_chunk: self.energy_per_chunk,
            chunk_speed: self.chunk_speed,
            exempt_linger_time: self.exempt_linger_time,
            converter_smoothing_window: self.converter_smoothing_window,
            teapot_smoothing_window: self.teapot_smoothing_window,
        }
    }
}
