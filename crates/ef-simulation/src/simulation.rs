use ef_core::EfError;
use ef_systems::PipelineSelection;

use crate::clock::SimClock;
use crate::config::SimConfig;
use crate::context::SimContext;
use crate::energy::EnergySystemsSystem;
use crate::error::{SimError, SimResult};
use crate::event::EventLog;
use crate::snapshot::{ContainerSnapshot, ElementOutput, SimSnapshot};
use crate::system::System;
use crate::thermal::ThermalSystem;
use tracing::warn;

/// The top-level simulation orchestrator.
///
/// Owns the clock, event log, live pipeline selection and registered
/// systems. Drives the fixed-timestep tick loop.
pub struct Simulation {
    config: SimConfig,
    clock: SimClock,
    events: EventLog,
    selection: PipelineSelection,
    systems: Vec<Box<dyn System>>,
    initialized: bool,
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("tick", &self.clock.tick())
            .field("selection", &self.selection)
            .field("systems", &self.systems.len())
            .field("events", &self.events.len())
            .finish()
    }
}

impl Simulation {
    /// Create an empty simulation after validating `config`.
    pub fn new(config: SimConfig) -> SimResult<Self> {
        config.validate()?;
        Ok(Self {
            clock: SimClock::new(config.dt),
            events: EventLog::new(config.max_events),
            selection: PipelineSelection::default(),
            systems: Vec::new(),
            initialized: false,
            config,
        })
    }

    /// A simulation with the built-in energy systems and an empty thermal scene.
    pub fn with_default_systems(config: SimConfig) -> SimResult<Self> {
        let mut sim = Self::new(config)?;
        let energy = EnergySystemsSystem::with_default_carousels(&sim.config)?;
        let thermal = ThermalSystem::new(&sim.config);
        sim.add_system(energy);
        sim.add_system(thermal);
        Ok(sim)
    }

    /// Register a system. Systems are ticked in registration order.
    pub fn add_system<S: System + 'static>(&mut self, system: S) {
        self.systems.push(Box::new(system));
    }

    /// Names of the registered systems, in tick order.
    pub fn system_names(&self) -> Vec<&'static str> {
        self.systems.iter().map(|s| s.name()).collect()
    }

    /// Initialize all registered systems.
    pub fn init(&mut self) -> SimResult<()> {
        if self.initialized {
            return Ok(());
        }
        for i in 0..self.systems.len() {
            let mut system = std::mem::replace(&mut self.systems[i], Box::new(NoopSystem));
            let mut ctx = SimContext {
                clock: &self.clock,
                events: &mut self.events,
                selection: &self.selection,
            };
            let result = system.init(&mut ctx);
            self.systems[i] = system;
            result?;
        }
        self.initialized = true;
        Ok(())
    }

    /// Advance the simulation by one tick.
    pub fn tick(&mut self) -> SimResult<()> {
        if !self.initialized {
            self.init()?;
        }

        self.clock.advance();

        for i in 0..self.systems.len() {
            let mut system = std::mem::replace(&mut self.systems[i], Box::new(NoopSystem));
            let mut ctx = SimContext {
                clock: &self.clock,
                events: &mut self.events,
                selection: &self.selection,
            };
            let result = system.tick(&mut ctx);
            if let Err(err) = &result {
                warn!(system = system.name(), tick = self.clock.tick(), %err, "system tick failed");
            }
            self.systems[i] = system;
            result?;
        }
        Ok(())
    }

    /// Advance the simulation by `n` ticks.
    pub fn run(&mut self, n: u64) -> SimResult<()> {
        for _ in 0..n {
            self.tick()?;
        }
        Ok(())
    }

    /// Choose the live energy system chain. Takes effect on the next tick.
    ///
    /// The selection is checked against the carousels of the registered
    /// energy system, if there is one.
    pub fn select(&mut self, selection: PipelineSelection) -> SimResult<()> {
        if let Some(energy) = self.get_system::<EnergySystemsSystem>() {
            energy.pipeline().validate(&selection)?;
        }
        self.selection = selection;
        Ok(())
    }

    /// The live energy system chain.
    pub fn selection(&self) -> &PipelineSelection {
        &self.selection
    }

    /// The configuration this simulation was built from.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// The simulation clock.
    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    /// Everything that happened so far.
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Access a system by downcasting to a concrete type.
    pub fn get_system<T: System + 'static>(&self) -> Option<&T> {
        self.systems
            .iter()
            .find_map(|s| s.as_any().downcast_ref::<T>())
    }

    /// Access a system mutably by downcasting to a concrete type.
    pub fn get_system_mut<T: System + 'static>(&mut self) -> Option<&mut T> {
        self.systems
            .iter_mut()
            .find_map(|s| s.as_any_mut().downcast_mut::<T>())
    }

    /// The current tick number.
    pub fn current_tick(&self) -> u64 {
        self.clock.tick()
    }

    /// Capture chunks, element outputs and thermal state.
    pub fn snapshot(&self) -> SimSnapshot {
        let mut snapshot = SimSnapshot {
            tick: self.clock.tick(),
            elapsed_seconds: self.clock.elapsed_seconds(),
            selection: self.selection.clone(),
            chunks: Vec::new(),
            outputs: Vec::new(),
            containers: Vec::new(),
            thermometers: Vec::new(),
        };

        if let Some(energy) = self.get_system::<EnergySystemsSystem>() {
            let pipeline = energy.pipeline();
            snapshot.chunks = pipeline.chunk_views();
            snapshot.outputs = self
                .selection
                .chain()
                .into_iter()
                .filter_map(|r| {
                    pipeline.element(r).map(|e| ElementOutput {
                        element: r,
                        icon: e.icon().to_string(),
                        energy: e.energy_output_rate(),
                    })
                })
                .collect();
        }

        if let Some(thermal) = self.get_system::<ThermalSystem>() {
            snapshot.containers = thermal
                .containers()
                .iter()
                .map(|c| ContainerSnapshot {
                    id: c.id(),
                    category: c.category(),
                    energy: c.energy(),
                    temperature: c.temperature(),
                })
                .collect();
            snapshot.thermometers = thermal
                .thermometers()
                .iter()
                .map(|t| t.sensed_temperature())
                .collect();
        }
        snapshot
    }

    /// Load container energies from `snapshot`. Only allowed before the first tick.
    pub fn restore_thermal(&mut self, snapshot: &SimSnapshot) -> SimResult<()> {
        let tick = self.clock.tick();
        if tick > 0 {
            return Err(SimError::AlreadyStarted(tick));
        }
        let thermal = self
            .get_system_mut::<ThermalSystem>()
            .ok_or(SimError::MissingSystem("thermal"))?;
        for saved in &snapshot.containers {
            if thermal.container(saved.id).is_none() {
                return Err(EfError::UnknownContainer(saved.id.0).into());
            }
        }
        for saved in &snapshot.containers {
            if let Some(container) = thermal.container_mut(saved.id) {
                container.set_energy(saved.energy);
            }
        }
        Ok(())
    }
}

/// Placeholder system used during the swap-and-tick pattern.
#[derive(Debug)]
struct NoopSystem;

impl System for NoopSystem {
    fn name(&self) -> &'static str {
        "noop"
    }
    fn tick(&mut self, _ctx: &mut SimContext<'_>) -> SimResult<()> {
        Ok(())
    }
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
