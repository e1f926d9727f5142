use ef_core::Energy;
use ef_systems::{ChunkView, ElementRef, PipelineSelection};
use ef_thermal::{ContainerId, ThermalCategory};
use serde::{Deserialize, Serialize};

use crate::error::SimResult;

/// Output of one element in the live chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementOutput {
    /// Which element.
    pub element: ElementRef,
    /// Its icon identifier.
    pub icon: String,
    /// What it sent onward on the last tick.
    pub energy: Energy,
}

/// State of one thermal container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerSnapshot {
    /// Container identity.
    pub id: ContainerId,
    /// Material.
    pub category: ThermalCategory,
    /// Stored energy in J.
    pub energy: f64,
    /// Derived temperature in K.
    pub temperature: f64,
}

/// A serializable picture of the whole simulation at one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimSnapshot {
    /// Tick number.
    pub tick: u64,
    /// Simulated seconds.
    pub elapsed_seconds: f64,
    /// The live chain.
    pub selection: PipelineSelection,
    /// Every chunk on an element or a link.
    pub chunks: Vec<ChunkView>,
    /// Output of each live element, source first.
    pub outputs: Vec<ElementOutput>,
    /// Every thermal container.
    pub containers: Vec<ContainerSnapshot>,
    /// Thermometer readings in K.
    pub thermometers: Vec<f64>,
}

impl SimSnapshot {
    /// Render as pretty-printed JSON.
    pub fn to_json(&self) -> SimResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a snapshot previously produced by [`Self::to_json`].
    pub fn from_json(json: &str) -> SimResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
