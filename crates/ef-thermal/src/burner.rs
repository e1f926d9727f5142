use ef_core::constants::MAX_BURNER_RATE;
use ef_core::{DVec2, EfError, EfResult, MovingAverageCalculator, PositionHandle, Rect};

use crate::container::ThermalEnergyContainer;

/// What a burner delivered in one step.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BurnerOutput {
    /// Net energy added across all containers on the burner (negative when cooling), in J.
    pub delivered: f64,
    /// Number of containers resting on the burner.
    pub containers_heated: usize,
    /// Whether cooling was cut short because a container ran out of energy.
    pub clamped: bool,
}

/// A stove element that heats or cools whatever rests on it.
#[derive(Debug, Clone)]
pub struct Burner {
    position: PositionHandle,
    size: DVec2,
    heat_cool_level: f64,
    max_rate: f64,
    smoothed: MovingAverageCalculator,
}

impl Burner {
    /// A burner at `position` whose flame/ice display is smoothed over `window` ticks.
    pub fn new(position: DVec2, window: usize) -> EfResult<Self> {
        Ok(Self {
            position: PositionHandle::new(position),
            size: DVec2::new(0.1, 0.02),
            heat_cool_level: 0.0,
            max_rate: MAX_BURNER_RATE,
            smoothed: MovingAverageCalculator::new(window, 0.0)?,
        })
    }

    /// Override the peak heating/cooling rate in J/s.
    pub fn with_max_rate(mut self, max_rate: f64) -> EfResult<Self> {
        self.max_rate = EfError::ensure_positive("burner rate", max_rate)?;
        Ok(self)
    }

    /// Set the control level: -1 is full cooling, +1 full heating.
    pub fn set_heat_cool_level(&mut self, level: f64) {
        self.heat_cool_level = level.clamp(-1.0, 1.0);
    }

    /// Current control level.
    pub fn heat_cool_level(&self) -> f64 {
        self.heat_cool_level
    }

    /// Shared position handle.
    pub fn position(&self) -> &PositionHandle {
        &self.position
    }

    /// The burner's top surface; containers touching it are heated.
    pub fn bounds(&self) -> Rect {
        Rect::resting_on(self.position.get() - DVec2::new(0.0, self.size.y), self.size)
    }

    /// Whether `container` rests on this burner.
    pub fn is_on_burner(&self, container: &ThermalEnergyContainer) -> bool {
        !container.category().is_air() && self.bounds().intersects(&container.bounds())
    }

    /// Smoothed heating rate in J/s, for display.
    pub fn smoothed_rate(&self) -> f64 {
        self.smoothed.average()
    }

    /// Heat or cool every container on the burner for `dt` seconds.
    ///
    /// The energy is split evenly between the containers on the burner;
    /// with nothing on it, nothing is delivered.
    pub fn step(&mut self, dt: f64, containers: &mut [ThermalEnergyContainer]) -> BurnerOutput {
        let rate = self.heat_cool_level * self.max_rate;
        self.smoothed.add_value(rate);

        let on_burner: Vec<usize> = containers
            .iter()
            .enumerate()
            .filter(|(_, c)| self.is_on_burner(c))
            .map(|(i, _)| i)
            .collect();
        let mut output = BurnerOutput {
            containers_heated: on_burner.len(),
            ..BurnerOutput::default()
        };
        if on_burner.is_empty() || rate == 0.0 {
            return output;
        }

        let share = rate * dt / on_burner.len() as f64;
        for i in on_burner {
            if share >= 0.0 {
                containers[i].add_energy(share);
                output.delivered += share;
            } else {
                let removal = containers[i].remove_energy(-share);
                output.delivered -= removal.removed;
                output.clamped |= removal.clamped;
            }
        }
        output
    }

    /// Turn the burner off and clear its display history.
    pub fn reset(&mut self) {
        self.heat_cool_level = 0.0;
        self.smoothed.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::{ThermalCategory, ThermalProperties};

    fn block_at(x: f64) -> ThermalEnergyContainer {
        ThermalEnergyContainer::new(ThermalCategory::Iron, 1.0, &ThermalProperties::default())
            .unwrap()
            .at(DVec2::new(x, 0.0))
            .with_size(DVec2::splat(0.05))
            .with_temperature(300.0)
    }

    #[test]
    fn level_is_clamped() {
        let mut burner = Burner::new(DVec2::ZERO, 5).unwrap();
        burner.set_heat_cool_level(3.0);
        assert_eq!(burner.heat_cool_level(), 1.0);
        burner.set_heat_cool_level(-3.0);
        assert_eq!(burner.heat_cool_level(), -1.0);
    }

    #[test]
    fn heats_only_what_rests_on_it() {
        let mut burner = Burner::new(DVec2::ZERO, 5).unwrap();
        burner.set_heat_cool_level(1.0);
        let mut cs = vec![block_at(0.0), block_at(2.0)];
        let out = burner.step(0.1, &mut cs);
        assert_eq!(out.containers_heated, 1);
        assert!((out.delivered - MAX_BURNER_RATE * 0.1).abs() < 1e-9);
        assert!(cs[0].temperature() > 300.0);
        assert!((cs[1].temperature() - 300.0).abs() < 1e-12);
    }

    #[test]
    fn splits_between_stacked_containers() {
        let mut burner = Burner::new(DVec2::ZERO, 5).unwrap();
        burner.set_heat_cool_level(0.5);
        let mut cs = vec![block_at(0.0), block_at(0.03)];
        let before: Vec<f64> = cs.iter().map(|c| c.energy()).collect();
        burner.step(1.0, &mut cs);
        for (c, b) in cs.iter().zip(before) {
            assert!((c.energy() - b - MAX_BURNER_RATE * 0.25).abs() < 1e-9);
        }
    }

    #[test]
    fn cooling_clamps_at_zero() {
        let mut burner = Burner::new(DVec2::ZERO, 5).unwrap();
        burner.set_heat_cool_level(-1.0);
        let mut cs = vec![block_at(0.0).with_temperature(1.0)];
        let out = burner.step(10.0, &mut cs);
        assert!(out.clamped);
        assert_eq!(cs[0].energy(), 0.0);
        assert!((out.delivered + 450.0).abs() < 1e-9);
    }

    #[test]
    fn smoothed_rate_ramps() {
        let mut burner = Burner::new(DVec2::ZERO, 4).unwrap();
        burner.set_heat_cool_level(1.0);
        let mut none: Vec<ThermalEnergyContainer> = Vec::new();
        burner.step(0.1, &mut none);
        assert!((burner.smoothed_rate() - MAX_BURNER_RATE / 4.0).abs() < 1e-9);
        for _ in 0..4 {
            burner.step(0.1, &mut none);
        }
        assert!((burner.smoothed_rate() - MAX_BURNER_RATE).abs() < 1e-9);
        burner.reset();
        assert_eq!(burner.smoothed_rate(), 0.0);
    }
}
