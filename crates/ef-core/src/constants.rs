//! Shared physical and tuning constants.
//!
//! Units are SI throughout: joules, watts (J/s), kelvin, kilograms, metres.

/// Room temperature in kelvin; the ambient air temperature.
pub const ROOM_TEMPERATURE: f64 = 296.0;

/// Freezing point of water in kelvin.
pub const FREEZING_POINT_TEMPERATURE: f64 = 273.15;

/// Boiling point of water in kelvin.
pub const WATER_BOILING_POINT_TEMPERATURE: f64 = 373.15;

/// Peak continuous output of any energy source, in J/s.
pub const MAX_ENERGY_PRODUCTION_RATE: f64 = 10_000.0;

/// Default energy represented by one chunk in the systems pipeline, in J.
pub const ENERGY_PER_CHUNK: f64 = 2_500.0;

/// Default chunk travel speed along paths, in m/s.
pub const ENERGY_CHUNK_VELOCITY: f64 = 0.04;

/// Default time an exempt chunk loops near its emission point, in seconds.
pub const EXEMPT_LINGER_TIME: f64 = 0.5;

/// Default simulation timestep, in seconds.
pub const DEFAULT_DT: f64 = 1.0 / 60.0;

/// Default smoothing window for converter output rates.
pub const CONVERTER_SMOOTHING_WINDOW: usize = 10;

/// Default smoothing window for the teapot's steam power.
pub const TEAPOT_SMOOTHING_WINDOW: usize = 30;

/// Default smoothing window for burner output.
pub const BURNER_SMOOTHING_WINDOW: usize = 20;

/// Peak heat a burner can add to or remove from what rests on it, in J/s.
pub const MAX_BURNER_RATE: f64 = 5_000.0;

/// Energy a fully fed biker can spend before tiring, in J.
pub const BIKER_ENERGY_RESERVE: f64 = 200_000.0;

/// Horizontal distance between adjacent pipeline slots, in m.
pub const ELEMENT_SPACING: f64 = 0.12;

/// Temperature difference below which two bodies count as equilibrated, in K.
pub const EQUILIBRIUM_TOLERANCE: f64 = 1e-3;
