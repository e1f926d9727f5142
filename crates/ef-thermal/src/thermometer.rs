use ef_core::{ElementFollower, PositionHandle};

use crate::container::ThermalEnergyContainer;

/// A probe that reads the temperature of whatever it touches.
///
/// Attached to a container, it moves with it through an [`ElementFollower`].
#[derive(Debug, Clone)]
pub struct Thermometer {
    follower: ElementFollower,
    sensed: f64,
}

impl Thermometer {
    /// A free thermometer at `position`, initially reading `ambient`.
    pub fn new(position: PositionHandle, ambient: f64) -> Self {
        Self {
            follower: ElementFollower::new(position),
            sensed: ambient,
        }
    }

    /// Stick to `container`, keeping the current offset.
    pub fn attach_to(&mut self, container: &ThermalEnergyContainer) {
        self.follower.start_following(container.position().clone());
    }

    /// Detach from any container.
    pub fn detach(&mut self) {
        self.follower.stop_following();
    }

    /// Whether the thermometer is riding on a container.
    pub fn is_attached(&self) -> bool {
        self.follower.is_following()
    }

    /// Last sensed temperature in kelvin.
    pub fn sensed_temperature(&self) -> f64 {
        self.sensed
    }

    /// Shared position handle of the probe tip.
    pub fn position(&self) -> &PositionHandle {
        self.follower.position()
    }

    /// Follow the attached container, then sense.
    ///
    /// Reads the last container in `containers` whose bounds hold the probe
    /// tip (later entries are drawn on top), or `ambient` if none does.
    pub fn update(&mut self, containers: &[ThermalEnergyContainer], ambient: f64) -> f64 {
        self.follower.update();
        let tip = self.follower.position().get();
        self.sensed = containers
            .iter()
            .rev()
            .find(|c| !c.category().is_air() && c.bounds().contains(tip))
            .map_or(ambient, |c| c.temperature());
        self.sensed
    }

    /// Return to the starting position, detached.
    pub fn reset(&mut self, ambient: f64) {
        self.follower.stop_following();
        self.follower.reset();
        self.sensed = ambient;
    }
}
