use ef_systems::PipelineSelection;

use crate::clock::SimClock;
use crate::event::{EventLog, SimEvent, SimEventKind};

/// Mutable context passed to each system during a tick.
pub struct SimContext<'a> {
    /// The clock, already advanced for this tick.
    pub clock: &'a SimClock,
    /// Where systems record what happened.
    pub events: &'a mut EventLog,
    /// The live energy system chain.
    pub selection: &'a PipelineSelection,
}

impl SimContext<'_> {
    /// Emit a simulation event at the current tick.
    pub fn emit(&mut self, kind: SimEventKind, description: impl Into<String>) {
        self.events
            .push(SimEvent::new(self.clock.tick(), kind, description));
    }

    /// The current tick number.
    pub fn tick(&self) -> u64 {
        self.clock.tick()
    }

    /// Seconds per tick.
    pub fn dt(&self) -> f64 {
        self.clock.dt()
    }
}
