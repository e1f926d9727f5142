use ef_core::constants::{
    CONVERTER_SMOOTHING_WINDOW, ENERGY_CHUNK_VELOCITY, ENERGY_PER_CHUNK, EXEMPT_LINGER_TIME,
    TEAPOT_SMOOTHING_WINDOW,
};
use ef_core::{EfError, EfResult};
use serde::{Deserialize, Serialize};

/// Chunk and smoothing parameters shared by every element in a pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementConfig {
    /// Energy represented by one chunk, in J.
    pub energy_per_chunk: f64,
    /// Chunk travel speed along every path, in m/s.
    pub chunk_speed: f64,
    /// How long an exempt chunk loops near its emission point, in seconds.
    pub exempt_linger_time: f64,
    /// Window for smoothing converter output.
    pub converter_smoothing_window: usize,
    /// Window for smoothing teapot steam.
    pub teapot_smoothing_window: usize,
}

impl Default for ElementConfig {
    fn default() -> Self {
        Self {
            energy_per_chunk: ENERGY_PER_CHUNK,
            chunk_speed: ENERGY_CHUNK_VELOCITY,
            exempt_linger_time: EXEMPT_LINGER_TIME,
            converter_smoothing_window: CONVERTER_SMOOTHING_WINDOW,
            teapot_smoothing_window: TEAPOT_SMOOTHING_WINDOW,
        }
    }
}

impl ElementConfig {
    /// Set the energy per chunk.
    pub fn with_energy_per_chunk(mut self, energy: f64) -> Self {
        self.energy_per_chunk = energy;
        self
    }

    /// Set the chunk speed.
    pub fn with_chunk_speed(mut self, speed: f64) -> Self {
        self.chunk_speed = speed;
        self
    }

    /// Set the exempt-chunk linger time.
    pub fn with_exempt_linger_time(mut self, seconds: f64) -> Self {
        self.exempt_linger_time = seconds;
        self
    }

    /// Check every parameter once, before any element is built.
    pub fn validate(&self) -> EfResult<()> {
        EfError::ensure_positive("energy per chunk", self.energy_per_chunk)?;
        EfError::ensure_positive("chunk speed", self.chunk_speed)?;
        EfError::ensure_positive("exempt linger time", self.exempt_linger_time)?;
        if self.converter_smoothing_window == 0 || self.teapot_smoothing_window == 0 {
            return Err(EfError::InvalidWindowSize);
        }
        Ok(())
    }

    /// Height of the loop an exempt chunk travels so that it takes
    /// `exempt_linger_time` to return.
    pub(crate) fn linger_rise(&self) -> f64 {
        self.chunk_speed * self.exempt_linger_time / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(ElementConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_quantum_rejected() {
        let err = ElementConfig::default()
            .with_energy_per_chunk(0.0)
            .validate()
            .unwrap_err();
        assert!(matches!(err, EfError::InvalidQuantity { what: "energy per chunk", .. }));
    }

    #[test]
    fn zero_window_rejected() {
        let config = ElementConfig {
            teapot_smoothing_window: 0,
            ..ElementConfig::default()
        };
        assert_eq!(config.validate().unwrap_err(), EfError::InvalidWindowSize);
    }

    #[test]
    fn linger_rise_matches_round_trip_time() {
        let config = ElementConfig::default()
            .with_chunk_speed(0.1)
            .with_exempt_linger_time(2.0);
        // Up and back down at 0.1 m/s takes 2 s.
        assert!((config.linger_rise() - 0.1).abs() < 1e-12);
    }
}
