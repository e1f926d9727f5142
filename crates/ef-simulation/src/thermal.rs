use ef_core::constants::{EQUILIBRIUM_TOLERANCE, ROOM_TEMPERATURE};
use ef_core::{DVec2, EfError, PositionHandle};
use ef_thermal::{
    Burner, ContactPair, ContainerId, EquilibrationReport, ThermalEnergyContainer,
    ThermalEquilibrationStepper, Thermometer, detect_contacts,
};
use tracing::debug;

use crate::config::SimConfig;
use crate::context::SimContext;
use crate::error::SimResult;
use crate::event::SimEventKind;
use crate::system::System;

/// Owns the thermal scene: containers, burners and thermometers.
///
/// Each tick burners heat what rests on them, then heat equilibrates
/// across every contact, then thermometers take their readings.
#[derive(Debug)]
pub struct ThermalSystem {
    containers: Vec<ThermalEnergyContainer>,
    burners: Vec<Burner>,
    thermometers: Vec<Thermometer>,
    stepper: ThermalEquilibrationStepper,
    contacts: Vec<ContactPair>,
    detect: bool,
    ambient: f64,
    burner_window: usize,
    last_report: EquilibrationReport,
    external: f64,
    settled: bool,
}

impl ThermalSystem {
    /// An empty scene using the tables in `config`.
    pub fn new(config: &SimConfig) -> Self {
        Self {
            containers: Vec::new(),
            burners: Vec::new(),
            thermometers: Vec::new(),
            stepper: ThermalEquilibrationStepper::new(config.heat_transfer.clone()),
            contacts: Vec::new(),
            detect: true,
            ambient: ROOM_TEMPERATURE,
            burner_window: config.burner_smoothing_window,
            last_report: EquilibrationReport::default(),
            external: 0.0,
            settled: false,
        }
    }

    /// Enable or disable overlap-based contact detection.
    pub fn with_contact_detection(mut self, enabled: bool) -> Self {
        self.detect = enabled;
        self
    }

    /// Enable or disable exchange with the air container.
    pub fn with_ambient_exchange(mut self, enabled: bool) -> Self {
        self.stepper = self.stepper.with_ambient_exchange(enabled);
        self
    }

    /// Add a container to the scene.
    pub fn add_container(&mut self, container: ThermalEnergyContainer) -> ContainerId {
        let id = container.id();
        self.containers.push(container);
        self.settled = false;
        id
    }

    /// Declare an explicit contact, on top of any detected ones.
    pub fn add_contact(&mut self, a: ContainerId, b: ContainerId) -> SimResult<()> {
        for id in [a, b] {
            if self.container(id).is_none() {
                return Err(EfError::UnknownContainer(id.0).into());
            }
        }
        self.contacts.push(ContactPair::new(a, b));
        Ok(())
    }

    /// Place a burner at `position`. Returns its index.
    pub fn add_burner(&mut self, position: DVec2) -> SimResult<usize> {
        self.burners.push(Burner::new(position, self.burner_window)?);
        Ok(self.burners.len() - 1)
    }

    /// Place a free thermometer at `position`. Returns its index.
    pub fn add_thermometer(&mut self, position: DVec2) -> usize {
        self.thermometers
            .push(Thermometer::new(PositionHandle::new(position), self.ambient));
        self.thermometers.len() - 1
    }

    /// Stick thermometer `index` to container `id`.
    pub fn attach_thermometer(&mut self, index: usize, id: ContainerId) -> SimResult<()> {
        let container = self
            .containers
            .iter()
            .find(|c| c.id() == id)
            .ok_or(EfError::UnknownContainer(id.0))?;
        let thermometer = self
            .thermometers
            .get_mut(index)
            .ok_or_else(|| EfError::Config(format!("no thermometer {index}")))?;
        thermometer.attach_to(container);
        Ok(())
    }

    /// Look up a container.
    pub fn container(&self, id: ContainerId) -> Option<&ThermalEnergyContainer> {
        self.containers.iter().find(|c| c.id() == id)
    }

    /// Look up a container for mutation.
    pub fn container_mut(&mut self, id: ContainerId) -> Option<&mut ThermalEnergyContainer> {
        self.settled = false;
        self.containers.iter_mut().find(|c| c.id() == id)
    }

    /// Every container, in insertion order.
    pub fn containers(&self) -> &[ThermalEnergyContainer] {
        &self.containers
    }

    /// A burner, for adjusting its level.
    pub fn burner_mut(&mut self, index: usize) -> Option<&mut Burner> {
        self.settled = false;
        self.burners.get_mut(index)
    }

    /// Every burner.
    pub fn burners(&self) -> &[Burner] {
        &self.burners
    }

    /// Every thermometer.
    pub fn thermometers(&self) -> &[Thermometer] {
        &self.thermometers
    }

    /// Temperature of the surroundings.
    pub fn ambient(&self) -> f64 {
        self.ambient
    }

    /// What the last equilibration did.
    pub fn last_report(&self) -> &EquilibrationReport {
        &self.last_report
    }

    /// Energy added or removed by burners since the start, in J.
    pub fn external_energy(&self) -> f64 {
        self.external
    }

    /// Total energy held by non-air containers, in J.
    pub fn total_energy(&self) -> f64 {
        self.containers
            .iter()
            .filter(|c| !c.category().is_air())
            .map(ThermalEnergyContainer::energy)
            .sum()
    }

    /// The common temperature if every non-air container is within tolerance of it.
    fn common_temperature(&self) -> Option<f64> {
        let mut temps = self
            .containers
            .iter()
            .filter(|c| !c.category().is_air())
            .map(ThermalEnergyContainer::temperature);
        let first = temps.next()?;
        let (min, max) = temps.fold((first, first), |(lo, hi), t| (lo.min(t), hi.max(t)));
        (max - min < EQUILIBRIUM_TOLERANCE).then_some((min + max) / 2.0)
    }
}

impl System for ThermalSystem {
    fn name(&self) -> &'static str {
        "thermal"
    }

    fn tick(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        let dt = ctx.dt();

        for (index, burner) in self.burners.iter_mut().enumerate() {
            let output = burner.step(dt, &mut self.containers);
            self.external += output.delivered;
            if output.clamped {
                ctx.emit(
                    SimEventKind::EnergyClamped { burner: index },
                    format!("burner {index} cooled a container to zero energy"),
                );
            }
        }

        let mut contacts = self.contacts.clone();
        if self.detect {
            contacts.extend(detect_contacts(&self.containers));
        }
        self.last_report = self.stepper.step(&mut self.containers, &contacts, dt);
        debug!(
            transfers = self.last_report.transfers.len(),
            moved = self.last_report.total_moved(),
            "thermal step"
        );

        for thermometer in &mut self.thermometers {
            thermometer.update(&self.containers, self.ambient);
        }

        let common = self.common_temperature();
        match common {
            Some(temperature) if !self.settled => {
                self.settled = true;
                ctx.emit(
                    SimEventKind::EquilibriumReached { temperature },
                    format!("thermal equilibrium at {temperature:.2} K"),
                );
            }
            None => self.settled = false,
            _ => {}
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
