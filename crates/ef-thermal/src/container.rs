use std::fmt;

use ef_core::constants::ROOM_TEMPERATURE;
use ef_core::{DVec2, EfError, EfResult, PositionHandle, Rect};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::category::{ThermalCategory, ThermalProperties};

/// Unique identifier for a thermal container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerId(pub Uuid);

impl ContainerId {
    /// Generate a new random container ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ContainerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// Result of taking energy out of a container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RemovalOutcome {
    /// Energy actually removed, in J.
    pub removed: f64,
    /// Whether the request exceeded the stored energy and was cut short.
    pub clamped: bool,
}

/// A lumped body holding thermal energy.
///
/// Temperature is always derived as `energy / (mass * specific_heat)`; only
/// the energy is stored.
///
/// A clone keeps the id but gets its own position, so moving the clone does
/// not move the original or anything following it.
#[derive(Debug)]
pub struct ThermalEnergyContainer {
    id: ContainerId,
    category: ThermalCategory,
    mass: f64,
    specific_heat: f64,
    energy: f64,
    position: PositionHandle,
    size: DVec2,
}

impl Clone for ThermalEnergyContainer {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            category: self.category,
            mass: self.mass,
            specific_heat: self.specific_heat,
            energy: self.energy,
            position: self.position.detached(),
            size: self.size,
        }
    }
}

impl ThermalEnergyContainer {
    /// A container of `mass` kg at room temperature.
    pub fn new(category: ThermalCategory, mass: f64, props: &ThermalProperties) -> EfResult<Self> {
        let mass = EfError::ensure_positive("mass", mass)?;
        let specific_heat = props.get(category).specific_heat;
        Ok(Self {
            id: ContainerId::new(),
            category,
            mass,
            specific_heat,
            energy: mass * specific_heat * ROOM_TEMPERATURE,
            position: PositionHandle::new(DVec2::ZERO),
            size: DVec2::splat(0.05),
        })
    }

    /// A container sized by `volume` m³, its mass taken from the category density.
    pub fn with_volume(
        category: ThermalCategory,
        volume: f64,
        props: &ThermalProperties,
    ) -> EfResult<Self> {
        let volume = EfError::ensure_positive("volume", volume)?;
        Self::new(category, volume * props.get(category).density, props)
    }

    /// The ambient air body.
    pub fn air(props: &ThermalProperties) -> EfResult<Self> {
        Ok(Self::with_volume(ThermalCategory::Air, 1.0, props)?.with_size(DVec2::new(10.0, 10.0)))
    }

    /// Set the starting temperature in kelvin.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.set_temperature(temperature);
        self
    }

    /// Set where the container rests (bottom centre).
    pub fn at(self, position: DVec2) -> Self {
        Self {
            position: PositionHandle::new(position),
            ..self
        }
    }

    /// Set the bounding width and height.
    pub fn with_size(mut self, size: DVec2) -> Self {
        self.size = size;
        self
    }

    /// This container's identity.
    pub fn id(&self) -> ContainerId {
        self.id
    }

    /// What the container is made of.
    pub fn category(&self) -> ThermalCategory {
        self.category
    }

    /// Mass in kg.
    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Specific heat in J/(kg·K).
    pub fn specific_heat(&self) -> f64 {
        self.specific_heat
    }

    /// Heat capacity `m·c` in J/K.
    pub fn heat_capacity(&self) -> f64 {
        self.mass * self.specific_heat
    }

    /// Stored thermal energy in J.
    pub fn energy(&self) -> f64 {
        self.energy
    }

    /// Temperature in kelvin.
    pub fn temperature(&self) -> f64 {
        self.energy / self.heat_capacity()
    }

    /// Shared position handle, for followers and dragging.
    pub fn position(&self) -> &PositionHandle {
        &self.position
    }

    /// Current bounds.
    pub fn bounds(&self) -> Rect {
        Rect::resting_on(self.position.get(), self.size)
    }

    /// Add energy. Negative amounts are routed through [`Self::remove_energy`].
    pub fn add_energy(&mut self, amount: f64) {
        if amount < 0.0 {
            self.remove_energy(-amount);
        } else {
            self.energy += amount;
        }
    }

    /// Remove energy, clamping at zero.
    pub fn remove_energy(&mut self, amount: f64) -> RemovalOutcome {
        let requested = amount.max(0.0);
        if requested > self.energy {
            let removed = self.energy;
            warn!(
                container = %self.id,
                requested,
                available = removed,
                "energy removal clamped at zero"
            );
            self.energy = 0.0;
            RemovalOutcome {
                removed,
                clamped: true,
            }
        } else {
            self.energy -= requested;
            RemovalOutcome {
                removed: requested,
                clamped: false,
            }
        }
    }

    /// Overwrite stored energy, clamping negatives to zero.
    pub fn set_energy(&mut self, energy: f64) {
        self.energy = energy.max(0.0);
    }

    /// Overwrite stored energy so the temperature reads `temperature` K.
    pub fn set_temperature(&mut self, temperature: f64) {
        self.set_energy(temperature * self.heat_capacity());
    }

    /// Energy that would have to leave this container to bring it to `temperature`.
    pub fn energy_beyond(&self, temperature: f64) -> f64 {
        self.energy - temperature * self.heat_capacity()
    }

    /// Exchange heat with an infinite reservoir held at `reservoir_temperature`.
    ///
    /// The exchanged amount is `coefficient * ΔT * dt`, capped so this
    /// container never passes the reservoir temperature in one step. Returns
    /// the energy gained (negative if lost).
    pub fn exchange_with_reservoir(
        &mut self,
        reservoir_temperature: f64,
        coefficient: f64,
        dt: f64,
    ) -> f64 {
        let delta_t = reservoir_temperature - self.temperature();
        let cap = delta_t.abs() * self.heat_capacity();
        let amount = (coefficient * delta_t.abs() * dt).min(cap);
        if delta_t > 0.0 {
            self.add_energy(amount);
            amount
        } else {
            -self.remove_energy(amount).removed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iron(mass: f64) -> ThermalEnergyContainer {
        ThermalEnergyContainer::new(ThermalCategory::Iron, mass, &ThermalProperties::default())
            .unwrap()
    }

    #[test]
    fn starts_at_room_temperature() {
        let c = iron(1.0);
        assert!((c.temperature() - ROOM_TEMPERATURE).abs() < 1e-9);
        assert!((c.energy() - 450.0 * ROOM_TEMPERATURE).abs() < 1e-6);
    }

    #[test]
    fn zero_mass_rejected() {
        let err = ThermalEnergyContainer::new(
            ThermalCategory::Brick,
            0.0,
            &ThermalProperties::default(),
        )
        .unwrap_err();
        assert!(matches!(err, EfError::InvalidQuantity { what: "mass", .. }));
    }

    #[test]
    fn volume_uses_density() {
        let props = ThermalProperties::default();
        let water = ThermalEnergyContainer::with_volume(ThermalCategory::Water, 0.001, &props)
            .unwrap();
        assert!((water.mass() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn temperature_follows_energy() {
        let mut c = iron(2.0).with_temperature(300.0);
        c.add_energy(900.0);
        assert!((c.temperature() - 301.0).abs() < 1e-9);
        c.add_energy(-1800.0);
        assert!((c.temperature() - 299.0).abs() < 1e-9);
    }

    #[test]
    fn removal_clamps_at_zero() {
        let mut c = iron(1.0).with_temperature(1.0);
        let outcome = c.remove_energy(10_000.0);
        assert!(outcome.clamped);
        assert!((outcome.removed - 450.0).abs() < 1e-9);
        assert_eq!(c.energy(), 0.0);
        assert_eq!(c.temperature(), 0.0);
    }

    #[test]
    fn removal_within_budget_not_clamped() {
        let mut c = iron(1.0).with_temperature(10.0);
        let outcome = c.remove_energy(450.0);
        assert!(!outcome.clamped);
        assert!((c.temperature() - 9.0).abs() < 1e-9);
    }

    #[test]
    fn reservoir_exchange_never_overshoots() {
        let mut c = iron(0.01).with_temperature(400.0);
        let gained = c.exchange_with_reservoir(ROOM_TEMPERATURE, 1e6, 1.0);
        assert!(gained < 0.0);
        assert!((c.temperature() - ROOM_TEMPERATURE).abs() < 1e-9);
    }

    #[test]
    fn reservoir_exchange_warms_cold_body() {
        let mut c = iron(1.0).with_temperature(250.0);
        let gained = c.exchange_with_reservoir(ROOM_TEMPERATURE, 50.0, 0.1);
        assert!((gained - 50.0 * 46.0 * 0.1).abs() < 1e-9);
        assert!(c.temperature() > 250.0);
    }

    #[test]
    fn bounds_follow_position_handle() {
        let c = iron(1.0)
            .at(DVec2::new(1.0, 0.0))
            .with_size(DVec2::new(0.2, 0.2));
        assert!(c.bounds().contains(DVec2::new(1.0, 0.1)));
        c.position().set(DVec2::new(5.0, 0.0));
        assert!(!c.bounds().contains(DVec2::new(1.0, 0.1)));
        assert!(c.bounds().contains(DVec2::new(5.0, 0.1)));
    }

    #[test]
    fn clone_moves_independently() {
        let original = iron(1.0).at(DVec2::new(1.0, 0.0));
        let copy = original.clone();
        assert_eq!(copy.id(), original.id());
        copy.position().set(DVec2::new(4.0, 0.0));
        assert_eq!(original.position().get(), DVec2::new(1.0, 0.0));
        assert!(!copy.position().same_as(original.position()));
    }
}
