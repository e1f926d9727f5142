//! The concrete elements that can be placed in a pipeline, and the
//! kind-specific physics each one runs on top of the shared chunk logic.

use std::f64::consts::{PI, TAU};

use ef_core::constants::{BIKER_ENERGY_RESERVE, MAX_ENERGY_PRODUCTION_RATE, ROOM_TEMPERATURE};
use ef_core::{EfResult, Energy, EnergyType, MovingAverageCalculator};
use ef_thermal::{HeatTransferTable, ThermalCategory, ThermalEnergyContainer, ThermalProperties};

/// Peak generator wheel speed, in rad/s.
const MAX_WHEEL_SPEED: f64 = 4.0 * PI;

/// Peak fan blade speed, in rad/s.
const MAX_BLADE_SPEED: f64 = 6.0 * PI;

/// How quickly the fan blades approach their target speed, per second.
const BLADE_RESPONSE: f64 = 2.0;

/// Volume of water in the heater's beaker, in m³.
const HEATER_BEAKER_VOLUME: f64 = 0.0005;

/// Position in the pipeline an element can occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementRole {
    /// Produces energy from nothing upstream.
    Source,
    /// Turns one form of energy into another mid-pipeline.
    Converter,
    /// Terminal consumer.
    User,
}

/// A concrete element together with its control and animation state.
#[derive(Debug, Clone)]
pub enum ElementKind {
    /// Falling water turning a wheel.
    Faucet {
        /// Tap opening, 0..=1.
        flow_proportion: f64,
    },
    /// Sunlight, partly blocked by clouds.
    Sun {
        /// Cloud cover, 0..=1.
        cloudiness: f64,
    },
    /// Steam from a kettle on a burner.
    Teapot {
        /// Burner setting, 0..=1.
        heat_proportion: f64,
        /// Smoothed steam output; steam builds up and dies down gradually.
        steam: MovingAverageCalculator,
    },
    /// A cyclist pedalling a wheel.
    Biker {
        /// Pedal effort, 0..=1.
        crank_proportion: f64,
        /// Chemical energy left before the rider tires, in J.
        reserve: f64,
    },
    /// Spinning wheel driving a dynamo.
    Generator {
        /// Wheel angle, radians in `0..TAU`.
        wheel_angle: f64,
        /// Wheel speed, rad/s.
        wheel_velocity: f64,
    },
    /// Photovoltaic panel.
    SolarPanel,
    /// Electric fan.
    Fan {
        /// Blade angle, radians in `0..TAU`.
        blade_angle: f64,
        /// Blade speed, rad/s.
        blade_velocity: f64,
    },
    /// Filament bulb; mostly heat.
    IncandescentBulb {
        /// Brightness, 0..=1.
        lit_proportion: f64,
    },
    /// Compact fluorescent bulb; mostly light.
    FluorescentBulb {
        /// Brightness, 0..=1.
        lit_proportion: f64,
    },
    /// Immersion heater warming a beaker of water.
    BeakerHeater {
        /// The water being heated.
        beaker: Box<ThermalEnergyContainer>,
        /// Coefficient between the beaker and the room, W/K.
        air_coefficient: f64,
        /// Coil brightness, 0..=1.
        coil_glow: f64,
    },
}

impl ElementKind {
    /// A closed faucet.
    pub fn faucet() -> Self {
        Self::Faucet {
            flow_proportion: 0.0,
        }
    }

    /// A sun with clear skies.
    pub fn sun() -> Self {
        Self::Sun { cloudiness: 0.0 }
    }

    /// A cold teapot whose steam is smoothed over `window` ticks.
    pub fn teapot(window: usize) -> EfResult<Self> {
        Ok(Self::Teapot {
            heat_proportion: 0.0,
            steam: MovingAverageCalculator::new(window, 0.0)?,
        })
    }

    /// A rested biker, not yet pedalling.
    pub fn biker() -> Self {
        Self::Biker {
            crank_proportion: 0.0,
            reserve: BIKER_ENERGY_RESERVE,
        }
    }

    /// A stationary generator.
    pub fn generator() -> Self {
        Self::Generator {
            wheel_angle: 0.0,
            wheel_velocity: 0.0,
        }
    }

    /// A solar panel.
    pub fn solar_panel() -> Self {
        Self::SolarPanel
    }

    /// A fan at rest.
    pub fn fan() -> Self {
        Self::Fan {
            blade_angle: 0.0,
            blade_velocity: 0.0,
        }
    }

    /// An unlit incandescent bulb.
    pub fn incandescent_bulb() -> Self {
        Self::IncandescentBulb {
            lit_proportion: 0.0,
        }
    }

    /// An unlit fluorescent bulb.
    pub fn fluorescent_bulb() -> Self {
        Self::FluorescentBulb {
            lit_proportion: 0.0,
        }
    }

    /// A heater in a beaker of room-temperature water.
    pub fn beaker_heater(props: &ThermalProperties, table: &HeatTransferTable) -> EfResult<Self> {
        let beaker =
            ThermalEnergyContainer::with_volume(ThermalCategory::Water, HEATER_BEAKER_VOLUME, props)?;
        Ok(Self::BeakerHeater {
            beaker: Box::new(beaker),
            air_coefficient: table.coefficient(ThermalCategory::Water, ThermalCategory::Air),
            coil_glow: 0.0,
        })
    }

    /// Which pipeline stage this kind belongs in.
    pub fn role(&self) -> ElementRole {
        match self {
            Self::Faucet { .. } | Self::Sun { .. } | Self::Teapot { .. } | Self::Biker { .. } => {
                ElementRole::Source
            }
            Self::Generator { .. } | Self::SolarPanel => ElementRole::Converter,
            Self::Fan { .. }
            | Self::IncandescentBulb { .. }
            | Self::FluorescentBulb { .. }
            | Self::BeakerHeater { .. } => ElementRole::User,
        }
    }

    /// Icon identifier for carousel selection.
    pub fn icon(&self) -> &'static str {
        match self {
            Self::Faucet { .. } => "faucet",
            Self::Sun { .. } => "sun",
            Self::Teapot { .. } => "teapot",
            Self::Biker { .. } => "biker",
            Self::Generator { .. } => "generator",
            Self::SolarPanel => "solar_panel",
            Self::Fan { .. } => "fan",
            Self::IncandescentBulb { .. } => "incandescent_bulb",
            Self::FluorescentBulb { .. } => "fluorescent_bulb",
            Self::BeakerHeater { .. } => "beaker_heater",
        }
    }

    /// The form of energy this element sends onward (or, for users, mostly emits).
    pub fn output_type(&self) -> EnergyType {
        match self {
            Self::Faucet { .. } | Self::Teapot { .. } | Self::Biker { .. } => EnergyType::Mechanical,
            Self::Sun { .. } => EnergyType::Light,
            Self::Generator { .. } | Self::SolarPanel => EnergyType::Electrical,
            Self::Fan { .. } => EnergyType::Mechanical,
            Self::IncandescentBulb { .. } | Self::FluorescentBulb { .. } => EnergyType::Light,
            Self::BeakerHeater { .. } => EnergyType::Thermal,
        }
    }

    /// For converters, the single input form they can use.
    pub fn accepted_input(&self) -> Option<EnergyType> {
        match self {
            Self::Generator { .. } => Some(EnergyType::Mechanical),
            Self::SolarPanel => Some(EnergyType::Light),
            _ => None,
        }
    }

    /// For converters, the share of accepted input that leaves as output.
    pub fn efficiency(&self) -> f64 {
        match self {
            Self::Generator { .. } => 0.8,
            Self::SolarPanel => 0.6,
            _ => 1.0,
        }
    }

    /// For users, the share of absorbed chunks that leave as [`Self::output_type`];
    /// the rest leave as heat.
    pub fn primary_fraction(&self) -> f64 {
        match self {
            Self::Fan { .. } => 0.75,
            Self::IncandescentBulb { .. } => 0.2,
            Self::FluorescentBulb { .. } => 0.6,
            _ => 1.0,
        }
    }

    /// The main control of a source, 0..=1.
    pub fn control(&self) -> Option<f64> {
        match self {
            Self::Faucet { flow_proportion } => Some(*flow_proportion),
            Self::Sun { cloudiness } => Some(*cloudiness),
            Self::Teapot {
                heat_proportion, ..
            } => Some(*heat_proportion),
            Self::Biker {
                crank_proportion, ..
            } => Some(*crank_proportion),
            _ => None,
        }
    }

    /// Set the main control of a source, clamped to 0..=1.
    ///
    /// Returns `false` if this kind has no control.
    pub fn set_control(&mut self, value: f64) -> bool {
        let value = value.clamp(0.0, 1.0);
        match self {
            Self::Faucet { flow_proportion } => *flow_proportion = value,
            Self::Sun { cloudiness } => *cloudiness = value,
            Self::Teapot {
                heat_proportion, ..
            } => *heat_proportion = value,
            Self::Biker {
                crank_proportion, ..
            } => *crank_proportion = value,
            _ => return false,
        }
        true
    }

    /// Refill a tired biker. Returns `false` for other kinds.
    pub fn replenish(&mut self) -> bool {
        match self {
            Self::Biker { reserve, .. } => {
                *reserve = BIKER_ENERGY_RESERVE;
                true
            }
            _ => false,
        }
    }

    /// Current source output in J/s, without advancing anything.
    pub fn source_rate(&self) -> f64 {
        match self {
            Self::Faucet { flow_proportion } => MAX_ENERGY_PRODUCTION_RATE * flow_proportion,
            Self::Sun { cloudiness } => MAX_ENERGY_PRODUCTION_RATE * (1.0 - cloudiness),
            Self::Teapot { steam, .. } => MAX_ENERGY_PRODUCTION_RATE * steam.average(),
            Self::Biker {
                crank_proportion,
                reserve,
            } => {
                if *reserve > 0.0 {
                    MAX_ENERGY_PRODUCTION_RATE * crank_proportion
                } else {
                    0.0
                }
            }
            _ => 0.0,
        }
    }

    /// Advance a source by `dt` and return what it produced this tick, in J/s.
    pub(crate) fn produce(&mut self, dt: f64) -> f64 {
        if let Self::Teapot {
            heat_proportion,
            steam,
        } = self
        {
            steam.add_value(*heat_proportion);
        }
        let rate = self.source_rate();
        if let Self::Biker { reserve, .. } = self {
            let spend = (rate * dt).min(*reserve);
            *reserve -= spend;
            return if dt > 0.0 { spend / dt } else { rate };
        }
        rate
    }

    /// Update converter animation for an output of `rate` J/s.
    pub(crate) fn advance_converter(&mut self, dt: f64, rate: f64) {
        if let Self::Generator {
            wheel_angle,
            wheel_velocity,
        } = self
        {
            *wheel_velocity = MAX_WHEEL_SPEED * (rate / MAX_ENERGY_PRODUCTION_RATE).min(1.0);
            *wheel_angle = (*wheel_angle + *wheel_velocity * dt).rem_euclid(TAU);
        }
    }

    /// Feed a user `input` for `dt` seconds and return the primary output.
    pub(crate) fn consume(&mut self, dt: f64, input: Energy) -> Energy {
        let proportion = (input.rate / MAX_ENERGY_PRODUCTION_RATE).clamp(0.0, 1.0);
        let primary = self.primary_fraction();
        let output_type = self.output_type();
        match self {
            Self::Fan {
                blade_angle,
                blade_velocity,
            } => {
                let target = MAX_BLADE_SPEED * proportion;
                *blade_velocity += (target - *blade_velocity) * (BLADE_RESPONSE * dt).min(1.0);
                *blade_angle = (*blade_angle + *blade_velocity * dt).rem_euclid(TAU);
            }
            Self::IncandescentBulb { lit_proportion } | Self::FluorescentBulb { lit_proportion } => {
                *lit_proportion = proportion;
            }
            Self::BeakerHeater {
                beaker,
                air_coefficient,
                coil_glow,
            } => {
                *coil_glow = proportion;
                beaker.add_energy(input.amount(dt));
                beaker.exchange_with_reservoir(ROOM_TEMPERATURE, *air_coefficient, dt);
            }
            _ => {}
        }
        Energy::new(output_type, input.rate * primary)
    }

    /// The heated water, for beaker heaters.
    pub fn beaker(&self) -> Option<&ThermalEnergyContainer> {
        match self {
            Self::BeakerHeater { beaker, .. } => Some(beaker),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_partition_kinds() {
        assert_eq!(ElementKind::faucet().role(), ElementRole::Source);
        assert_eq!(ElementKind::sun().role(), ElementRole::Source);
        assert_eq!(ElementKind::generator().role(), ElementRole::Converter);
        assert_eq!(ElementKind::solar_panel().role(), ElementRole::Converter);
        assert_eq!(ElementKind::fan().role(), ElementRole::User);
        assert_eq!(ElementKind::fluorescent_bulb().role(), ElementRole::User);
    }

    #[test]
    fn faucet_rate_scales_with_flow() {
        let mut faucet = ElementKind::faucet();
        assert_eq!(faucet.source_rate(), 0.0);
        assert!(faucet.set_control(0.5));
        assert!((faucet.source_rate() - MAX_ENERGY_PRODUCTION_RATE / 2.0).abs() < 1e-9);
        faucet.set_control(4.0);
        assert_eq!(faucet.control(), Some(1.0));
    }

    #[test]
    fn clouds_dim_the_sun() {
        let mut sun = ElementKind::sun();
        assert_eq!(sun.source_rate(), MAX_ENERGY_PRODUCTION_RATE);
        sun.set_control(1.0);
        assert_eq!(sun.source_rate(), 0.0);
    }

    #[test]
    fn teapot_steam_builds_gradually() {
        let mut teapot = ElementKind::teapot(4).unwrap();
        teapot.set_control(1.0);
        let first = teapot.produce(0.1);
        assert!((first - MAX_ENERGY_PRODUCTION_RATE / 4.0).abs() < 1e-9);
        for _ in 0..3 {
            teapot.produce(0.1);
        }
        assert!((teapot.source_rate() - MAX_ENERGY_PRODUCTION_RATE).abs() < 1e-9);
    }

    #[test]
    fn biker_tires_and_recovers() {
        let mut biker = ElementKind::biker();
        biker.set_control(1.0);
        let seconds = BIKER_ENERGY_RESERVE / MAX_ENERGY_PRODUCTION_RATE;
        let mut produced = 0.0;
        for _ in 0..(seconds as usize + 5) {
            produced += biker.produce(1.0);
        }
        assert!((produced - BIKER_ENERGY_RESERVE).abs() < 1e-6);
        assert_eq!(biker.source_rate(), 0.0);
        assert!(biker.replenish());
        assert!(biker.source_rate() > 0.0);
        assert!(!ElementKind::sun().replenish());
    }

    #[test]
    fn controls_only_on_sources() {
        let mut fan = ElementKind::fan();
        assert!(!fan.set_control(0.5));
        assert_eq!(fan.control(), None);
    }

    #[test]
    fn generator_wheel_turns_with_output() {
        let mut generator = ElementKind::generator();
        generator.advance_converter(0.1, MAX_ENERGY_PRODUCTION_RATE);
        match generator {
            ElementKind::Generator {
                wheel_angle,
                wheel_velocity,
            } => {
                assert!((wheel_velocity - MAX_WHEEL_SPEED).abs() < 1e-9);
                assert!(wheel_angle > 0.0);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn fan_blades_ease_toward_target() {
        let mut fan = ElementKind::fan();
        let input = Energy::new(EnergyType::Electrical, MAX_ENERGY_PRODUCTION_RATE);
        let out = fan.consume(0.1, input);
        assert_eq!(out.energy_type, EnergyType::Mechanical);
        assert!((out.rate - MAX_ENERGY_PRODUCTION_RATE * 0.75).abs() < 1e-9);
        if let ElementKind::Fan { blade_velocity, .. } = fan {
            assert!(blade_velocity > 0.0 && blade_velocity < MAX_BLADE_SPEED);
        }
    }

    #[test]
    fn beaker_heater_warms_water() {
        let mut heater = ElementKind::beaker_heater(
            &ThermalProperties::default(),
            &HeatTransferTable::default(),
        )
        .unwrap();
        let input = Energy::new(EnergyType::Electrical, MAX_ENERGY_PRODUCTION_RATE);
        for _ in 0..60 {
            heater.consume(1.0 / 60.0, input);
        }
        let beaker = heater.beaker().unwrap();
        assert!(beaker.temperature() > ROOM_TEMPERATURE + 4.0);
    }

    #[test]
    fn idle_beaker_stays_at_room_temperature() {
        let mut heater = ElementKind::beaker_heater(
            &ThermalProperties::default(),
            &HeatTransferTable::default(),
        )
        .unwrap();
        heater.consume(1.0, Energy::none(EnergyType::Electrical));
        let beaker = heater.beaker().unwrap();
        assert!((beaker.temperature() - ROOM_TEMPERATURE).abs() < 1e-9);
    }
}
