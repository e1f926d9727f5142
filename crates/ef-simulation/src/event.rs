use std::collections::VecDeque;

use ef_systems::PipelineSelection;

/// Something worth reporting that happened during a tick.
#[derive(Debug, Clone, PartialEq)]
pub enum SimEventKind {
    // Energy systems
    /// A new chain went live.
    PipelineSwitched {
        /// The chain now live.
        selection: PipelineSelection,
    },
    /// Chunks were created along the live chain.
    ChunkEmitted {
        /// How many this tick.
        count: u64,
    },
    /// Chunks were absorbed along the live chain.
    ChunkConsumed {
        /// How many this tick.
        count: u64,
    },
    /// Chunks arrived at an element that was no longer active and were held.
    ChunkRedirected {
        /// How many this tick.
        count: usize,
    },

    // Thermal
    /// A burner tried to cool a container below zero energy.
    EnergyClamped {
        /// Index of the burner.
        burner: usize,
    },
    /// Every body settled within tolerance of a common temperature.
    EquilibriumReached {
        /// The shared temperature in kelvin.
        temperature: f64,
    },
}

impl SimEventKind {
    /// Short machine-readable label for filtering.
    pub fn label(&self) -> &'static str {
        match self {
            Self::PipelineSwitched { .. } => "pipeline_switched",
            Self::ChunkEmitted { .. } => "chunk_emitted",
            Self::ChunkConsumed { .. } => "chunk_consumed",
            Self::ChunkRedirected { .. } => "chunk_redirected",
            Self::EnergyClamped { .. } => "energy_clamped",
            Self::EquilibriumReached { .. } => "equilibrium_reached",
        }
    }

    /// Whether this event concerns energy chunks.
    pub fn is_chunk_event(&self) -> bool {
        matches!(
            self,
            Self::ChunkEmitted { .. } | Self::ChunkConsumed { .. } | Self::ChunkRedirected { .. }
        )
    }
}

/// One entry in the [`EventLog`].
#[derive(Debug, Clone)]
pub struct SimEvent {
    /// Tick at which it was raised.
    pub tick: u64,
    /// What happened.
    pub kind: SimEventKind,
    /// Text for logs and inspectors.
    pub description: String,
}

impl SimEvent {
    /// An event raised at `tick`.
    pub fn new(tick: u64, kind: SimEventKind, description: impl Into<String>) -> Self {
        Self {
            tick,
            kind,
            description: description.into(),
        }
    }
}

/// Totals of the aggregated chunk events in a log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkTotals {
    /// Sum of `ChunkEmitted` counts.
    pub emitted: u64,
    /// Sum of `ChunkConsumed` counts.
    pub consumed: u64,
    /// Sum of `ChunkRedirected` counts.
    pub redirected: u64,
}

/// Events raised during a run, oldest first.
///
/// With a non-zero capacity the oldest entries are dropped once it is
/// exceeded.
#[derive(Debug, Default)]
pub struct EventLog {
    entries: VecDeque<SimEvent>,
    capacity: usize,
}

impl EventLog {
    /// A log holding at most `capacity` events, or unbounded for 0.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity,
        }
    }

    /// Record an event.
    pub fn push(&mut self, event: SimEvent) {
        self.entries.push_back(event);
        while self.capacity > 0 && self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Every retained event, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &SimEvent> {
        self.entries.iter()
    }

    /// The most recent event.
    pub fn last(&self) -> Option<&SimEvent> {
        self.entries.back()
    }

    /// Events raised at `tick`.
    pub fn events_at_tick(&self, tick: u64) -> Vec<&SimEvent> {
        self.iter().filter(|e| e.tick == tick).collect()
    }

    /// Events whose [`SimEventKind::label`] is `label`.
    pub fn events_labelled(&self, label: &str) -> Vec<&SimEvent> {
        self.iter().filter(|e| e.kind.label() == label).collect()
    }

    /// Sum the chunk counts over every retained event.
    pub fn chunk_totals(&self) -> ChunkTotals {
        self.iter()
            .fold(ChunkTotals::default(), |mut totals, e| {
                match e.kind {
                    SimEventKind::ChunkEmitted { count } => totals.emitted += count,
                    SimEventKind::ChunkConsumed { count } => totals.consumed += count,
                    SimEventKind::ChunkRedirected { count } => totals.redirected += count as u64,
                    _ => {}
                }
                totals
            })
    }

    /// Number of retained events.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is retained.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every event.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emitted(tick: u64, count: u64) -> SimEvent {
        SimEvent::new(tick, SimEventKind::ChunkEmitted { count }, "emitted")
    }

    #[test]
    fn capacity_drops_oldest() {
        let mut log = EventLog::new(3);
        for tick in 0..7 {
            log.push(emitted(tick, 1));
        }
        let ticks: Vec<u64> = log.iter().map(|e| e.tick).collect();
        assert_eq!(ticks, vec![4, 5, 6]);
        assert_eq!(log.last().map(|e| e.tick), Some(6));
    }

    #[test]
    fn zero_capacity_keeps_everything() {
        let mut log = EventLog::new(0);
        for tick in 0..500 {
            log.push(emitted(tick, 1));
        }
        assert_eq!(log.len(), 500);
        log.clear();
        assert!(log.is_empty());
        assert!(log.last().is_none());
    }

    #[test]
    fn filters_by_tick_and_label() {
        let mut log = EventLog::new(0);
        log.push(emitted(1, 2));
        log.push(SimEvent::new(
            1,
            SimEventKind::EquilibriumReached { temperature: 300.0 },
            "settled",
        ));
        log.push(emitted(2, 1));
        assert_eq!(log.events_at_tick(1).len(), 2);
        assert!(log.events_at_tick(3).is_empty());
        assert_eq!(log.events_labelled("chunk_emitted").len(), 2);
        assert!(log.events_labelled("energy_clamped").is_empty());
    }

    #[test]
    fn chunk_totals_sum_counts() {
        let mut log = EventLog::new(0);
        log.push(emitted(1, 2));
        log.push(emitted(2, 3));
        log.push(SimEvent::new(2, SimEventKind::ChunkConsumed { count: 4 }, "consumed"));
        log.push(SimEvent::new(3, SimEventKind::ChunkRedirected { count: 1 }, "held"));
        log.push(SimEvent::new(3, SimEventKind::EnergyClamped { burner: 0 }, "clamped"));
        assert_eq!(
            log.chunk_totals(),
            ChunkTotals {
                emitted: 5,
                consumed: 4,
                redirected: 1,
            }
        );
    }

    #[test]
    fn chunk_events_are_classified() {
        assert!(SimEventKind::ChunkRedirected { count: 2 }.is_chunk_event());
        assert!(!SimEventKind::EnergyClamped { burner: 0 }.is_chunk_event());
        let switched = SimEventKind::PipelineSwitched {
            selection: PipelineSelection::default(),
        };
        assert_eq!(switched.label(), "pipeline_switched");
        assert!(!switched.is_chunk_event());
    }
}
