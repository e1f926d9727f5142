use std::collections::HashSet;
use std::fmt;

use ef_core::constants::ELEMENT_SPACING;
use ef_core::{
    ChunkId, DVec2, EfError, EfResult, Energy, EnergyChunk, EnergyChunkPath, EnergyType,
};
use ef_thermal::{HeatTransferTable, ThermalProperties};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::ElementConfig;
use crate::element::{ElementState, EnergySystemElement};
use crate::kind::{ElementKind, ElementRole};

/// Below this length a link is treated as already traversed.
const ZERO_LINK: f64 = 1e-12;

/// One of the three carousels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Energy sources.
    Source,
    /// Converters.
    Converter,
    /// End users.
    User,
}

impl Stage {
    fn slot(self) -> usize {
        match self {
            Self::Source => 0,
            Self::Converter => 1,
            Self::User => 2,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Converter => "converter",
            Self::User => "user",
        }
    }
}

impl From<ElementRole> for Stage {
    fn from(role: ElementRole) -> Self {
        match role {
            ElementRole::Source => Self::Source,
            ElementRole::Converter => Self::Converter,
            ElementRole::User => Self::User,
        }
    }
}

/// Address of an element on a carousel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementRef {
    /// Which carousel.
    pub stage: Stage,
    /// Position on the carousel.
    pub index: usize,
}

impl ElementRef {
    /// Shorthand constructor.
    pub fn new(stage: Stage, index: usize) -> Self {
        Self { stage, index }
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.stage.name(), self.index)
    }
}

/// The live chain: one source, any number of converters, one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSelection {
    /// Index on the source carousel.
    pub source: usize,
    /// Indices on the converter carousel, in chain order.
    pub converters: Vec<usize>,
    /// Index on the user carousel.
    pub user: usize,
}

impl PipelineSelection {
    /// A source wired straight to a user.
    pub fn new(source: usize, user: usize) -> Self {
        Self {
            source,
            converters: Vec::new(),
            user,
        }
    }

    /// Append a converter to the chain.
    pub fn with_converter(mut self, index: usize) -> Self {
        self.converters.push(index);
        self
    }

    /// Every element of the chain, source first.
    pub fn chain(&self) -> Vec<ElementRef> {
        std::iter::once(ElementRef::new(Stage::Source, self.source))
            .chain(
                self.converters
                    .iter()
                    .map(|&i| ElementRef::new(Stage::Converter, i)),
            )
            .chain(std::iter::once(ElementRef::new(Stage::User, self.user)))
            .collect()
    }
}

impl Default for PipelineSelection {
    fn default() -> Self {
        Self::new(0, 0).with_converter(0)
    }
}

/// A chunk travelling along a link between two elements.
#[derive(Debug, Clone)]
struct TransitChunk {
    chunk: EnergyChunk,
    from: ElementRef,
    to: ElementRef,
}

/// Where a chunk currently lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkLocation {
    /// On an element, possibly flagged outgoing.
    Resident(ElementRef),
    /// Parked by an inactive consumer.
    Holding(ElementRef),
    /// On the link between two elements.
    Transit {
        /// Sending element.
        from: ElementRef,
        /// Receiving element.
        to: ElementRef,
    },
}

/// What a renderer needs to draw one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChunkView {
    /// Chunk identity.
    pub id: ChunkId,
    /// Form of energy, for colouring.
    pub energy_type: EnergyType,
    /// Current position.
    pub position: DVec2,
    /// Whether to draw it.
    pub visible: bool,
}

/// Summary of one pipeline step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineStepReport {
    /// Output of each chain element, source first.
    pub outputs: Vec<Energy>,
    /// Chunks created along the chain.
    pub emitted: u64,
    /// Chunks absorbed along the chain.
    pub consumed: u64,
    /// Chunks extracted and sent onto links.
    pub handed_off: usize,
    /// Chunks that reached the end of a link.
    pub arrived: usize,
    /// Arrivals parked because the receiver was not active.
    pub redirected: usize,
}

/// Three carousels of elements and the chunks travelling between them.
#[derive(Debug)]
pub struct EnergySystemPipeline {
    carousels: [Vec<EnergySystemElement>; 3],
    transit: Vec<TransitChunk>,
    config: ElementConfig,
    chunks_visible: bool,
    rng: StdRng,
}

impl EnergySystemPipeline {
    /// An empty pipeline. `seed` drives exhaust jitter.
    pub fn new(config: ElementConfig, seed: u64) -> EfResult<Self> {
        config.validate()?;
        Ok(Self {
            carousels: [Vec::new(), Vec::new(), Vec::new()],
            transit: Vec::new(),
            config,
            chunks_visible: true,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// A pipeline stocked with every built-in element.
    ///
    /// Sources: faucet, sun, teapot, biker. Converters: generator, solar
    /// panel. Users: fan, incandescent bulb, fluorescent bulb, beaker heater.
    pub fn with_default_carousels(
        config: ElementConfig,
        props: &ThermalProperties,
        table: &HeatTransferTable,
        seed: u64,
    ) -> EfResult<Self> {
        let mut pipeline = Self::new(config, seed)?;
        let teapot = ElementKind::teapot(pipeline.config.teapot_smoothing_window)?;
        let kinds = [
            ElementKind::faucet(),
            ElementKind::sun(),
            teapot,
            ElementKind::biker(),
            ElementKind::generator(),
            ElementKind::solar_panel(),
            ElementKind::fan(),
            ElementKind::incandescent_bulb(),
            ElementKind::fluorescent_bulb(),
            ElementKind::beaker_heater(props, table)?,
        ];
        for kind in kinds {
            pipeline.add_element(kind)?;
        }
        Ok(pipeline)
    }

    /// Build an element of `kind` and put it on the matching carousel.
    pub fn add_element(&mut self, kind: ElementKind) -> EfResult<ElementRef> {
        let mut element = EnergySystemElement::new(kind, &self.config)?;
        element.set_chunks_visible(self.chunks_visible);
        let stage = Stage::from(element.role());
        let carousel = &mut self.carousels[stage.slot()];
        carousel.push(element);
        Ok(ElementRef::new(stage, carousel.len() - 1))
    }

    /// Shared element parameters.
    pub fn config(&self) -> &ElementConfig {
        &self.config
    }

    /// Every element on one carousel.
    pub fn carousel(&self, stage: Stage) -> &[EnergySystemElement] {
        &self.carousels[stage.slot()]
    }

    /// Look up an element.
    pub fn element(&self, r: ElementRef) -> Option<&EnergySystemElement> {
        self.carousels[r.stage.slot()].get(r.index)
    }

    /// Look up an element for mutation, e.g. to change its controls.
    pub fn element_mut(&mut self, r: ElementRef) -> Option<&mut EnergySystemElement> {
        Self::slot_mut(&mut self.carousels, r)
    }

    fn slot_mut(
        carousels: &mut [Vec<EnergySystemElement>; 3],
        r: ElementRef,
    ) -> Option<&mut EnergySystemElement> {
        carousels[r.stage.slot()].get_mut(r.index)
    }

    /// Check every index of `selection` against the carousels.
    pub fn validate(&self, selection: &PipelineSelection) -> EfResult<()> {
        let mut seen = HashSet::new();
        for r in selection.chain() {
            let len = self.carousels[r.stage.slot()].len();
            if r.index >= len {
                return Err(EfError::SelectionOutOfRange {
                    stage: r.stage.name(),
                    index: r.index,
                    len,
                });
            }
            if !seen.insert(r) {
                return Err(EfError::Config(format!("{r} selected twice")));
            }
        }
        Ok(())
    }

    /// Switch the live chain from `previous` to `next`.
    ///
    /// Active elements keeping their place in the chain are left running.
    /// Departing elements are deactivated and cleared, links that no longer
    /// exist lose their chunks, and arriving elements, including stopped ones
    /// at the same place, are activated and pre-loaded for the rate they will
    /// receive.
    pub fn apply_selection(
        &mut self,
        previous: Option<&PipelineSelection>,
        next: &PipelineSelection,
    ) -> EfResult<()> {
        self.validate(next)?;
        let old_chain = previous.map(PipelineSelection::chain).unwrap_or_default();
        let new_chain = next.chain();
        let kept: Vec<bool> = new_chain
            .iter()
            .enumerate()
            .map(|(i, r)| {
                old_chain.get(i) == Some(r)
                    && self.element(*r).is_some_and(EnergySystemElement::is_active)
            })
            .collect();

        for (i, r) in old_chain.iter().enumerate() {
            if kept.get(i).copied().unwrap_or(false) {
                continue;
            }
            if let Some(element) = Self::slot_mut(&mut self.carousels, *r) {
                element.deactivate();
                element.clear_energy_chunks();
            }
        }

        let live_links: Vec<(ElementRef, ElementRef)> = new_chain
            .windows(2)
            .enumerate()
            .filter(|(i, _)| kept[*i] && kept[*i + 1])
            .map(|(_, pair)| (pair[0], pair[1]))
            .collect();
        let before = self.transit.len();
        self.transit.retain(|t| live_links.contains(&(t.from, t.to)));
        let dropped = before - self.transit.len();

        let last = new_chain.len() - 1;
        let mut upstream = Energy::none(EnergyType::Hidden);
        for (i, r) in new_chain.iter().enumerate() {
            let Some(element) = Self::slot_mut(&mut self.carousels, *r) else {
                continue;
            };
            element.set_position(DVec2::new(i as f64 * ELEMENT_SPACING, 0.0));
            element.set_downstream_in_place(i < last);
            if !kept[i] {
                element.activate();
                let placed = element.pre_load_energy_chunks(upstream);
                debug!(element = %r, placed, "pre-loaded chunks");
            }
            upstream = element.steady_output(upstream);
        }

        info!(
            source = next.source,
            converters = ?next.converters,
            user = next.user,
            dropped,
            "pipeline switched"
        );
        Ok(())
    }

    /// Bring `selection` live from scratch.
    pub fn activate(&mut self, selection: &PipelineSelection) -> EfResult<()> {
        self.apply_selection(None, selection)
    }

    /// Stop every element of `selection`; their chunks play out and dissipate.
    pub fn deactivate(&mut self, selection: &PipelineSelection) {
        for r in selection.chain() {
            if let Some(element) = Self::slot_mut(&mut self.carousels, r) {
                element.deactivate();
            }
        }
    }

    /// Advance the pipeline by `dt` seconds along the live `selection`.
    ///
    /// Transit chunks land first, then each chain element steps in order
    /// with the previous element's output as input, then outgoing chunks
    /// are handed onto their links.
    pub fn step(&mut self, dt: f64, selection: &PipelineSelection) -> PipelineStepReport {
        let mut report = PipelineStepReport::default();
        let chain = selection.chain();
        self.land_transit(dt, &mut report);

        let mut input = Energy::none(EnergyType::Hidden);
        for r in &chain {
            let Some(element) = Self::slot_mut(&mut self.carousels, *r) else {
                continue;
            };
            let emitted = element.emitted_count();
            let consumed = element.consumed_count();
            input = element.step(dt, input, &mut self.rng);
            report.emitted += element.emitted_count() - emitted;
            report.consumed += element.consumed_count() - consumed;
            report.outputs.push(input);
        }

        for (slot, carousel) in self.carousels.iter_mut().enumerate() {
            for (index, element) in carousel.iter_mut().enumerate() {
                let in_chain = chain
                    .iter()
                    .any(|r| r.stage.slot() == slot && r.index == index);
                if !in_chain && element.state() == ElementState::Clearing {
                    element.step(dt, Energy::none(EnergyType::Hidden), &mut self.rng);
                }
            }
        }

        for pair in chain.windows(2) {
            self.hand_off(pair[0], pair[1], &mut report);
        }
        report
    }

    fn land_transit(&mut self, dt: f64, report: &mut PipelineStepReport) {
        let speed = self.config.chunk_speed;
        let mut arrivals: Vec<TransitChunk> = Vec::new();
        let mut travelling = Vec::with_capacity(self.transit.len());
        for mut t in self.transit.drain(..) {
            if t.chunk.step(speed, dt) {
                arrivals.push(t);
            } else {
                travelling.push(t);
            }
        }
        self.transit = travelling;
        report.arrived += arrivals.len();
        for t in arrivals {
            self.deliver(t.to, vec![t.chunk], report);
        }
    }

    fn deliver(
        &mut self,
        to: ElementRef,
        chunks: Vec<EnergyChunk>,
        report: &mut PipelineStepReport,
    ) {
        let Some(receiver) = Self::slot_mut(&mut self.carousels, to) else {
            return;
        };
        if !receiver.is_active() {
            report.redirected += chunks.len();
        }
        let rejected = receiver.inject_energy_chunks(chunks);
        if !rejected.is_empty() {
            debug!(element = %to, count = rejected.len(), "receiver rejected chunks");
        }
    }

    fn hand_off(&mut self, from: ElementRef, to: ElementRef, report: &mut PipelineStepReport) {
        let Some(sender) = Self::slot_mut(&mut self.carousels, from) else {
            return;
        };
        let outgoing = sender.extract_outgoing_energy_chunks();
        if outgoing.is_empty() {
            return;
        }
        let Some(target) = self.element(to).map(EnergySystemElement::input_point) else {
            return;
        };
        report.handed_off += outgoing.len();
        debug!(from = %from, to = %to, count = outgoing.len(), "handing off chunks");

        let mut immediate = Vec::new();
        for mut chunk in outgoing {
            if chunk.position.distance(target) < ZERO_LINK {
                immediate.push(chunk);
            } else {
                chunk.set_path(EnergyChunkPath::new([target]));
                self.transit.push(TransitChunk { chunk, from, to });
            }
        }
        if !immediate.is_empty() {
            report.arrived += immediate.len();
            self.deliver(to, immediate, report);
        }
    }

    /// Show or hide every chunk, wherever it is.
    pub fn set_energy_chunks_visible(&mut self, visible: bool) {
        self.chunks_visible = visible;
        for element in self.carousels.iter_mut().flatten() {
            element.set_chunks_visible(visible);
        }
        for t in &mut self.transit {
            t.chunk.visible = visible;
        }
    }

    /// Every chunk's custody location.
    pub fn chunk_locations(&self) -> Vec<(ChunkId, ChunkLocation)> {
        let mut locations = Vec::new();
        for (r, element) in self.elements() {
            for chunk in element.energy_chunks() {
                locations.push((chunk.id(), ChunkLocation::Resident(r)));
            }
            for chunk in element.holding() {
                locations.push((chunk.id(), ChunkLocation::Holding(r)));
            }
        }
        for t in &self.transit {
            locations.push((
                t.chunk.id(),
                ChunkLocation::Transit {
                    from: t.from,
                    to: t.to,
                },
            ));
        }
        locations
    }

    /// Drawable state of every chunk on an element or a link.
    pub fn chunk_views(&self) -> Vec<ChunkView> {
        self.elements()
            .flat_map(|(_, e)| e.energy_chunks())
            .chain(self.transit.iter().map(|t| &t.chunk))
            .map(|c| ChunkView {
                id: c.id(),
                energy_type: c.energy_type,
                position: c.position,
                visible: c.visible,
            })
            .collect()
    }

    /// Number of chunks on links.
    pub fn transit_count(&self) -> usize {
        self.transit.len()
    }

    /// Every element with its address.
    pub fn elements(&self) -> impl Iterator<Item = (ElementRef, &EnergySystemElement)> {
        [Stage::Source, Stage::Converter, Stage::User]
            .into_iter()
            .flat_map(move |stage| {
                self.carousels[stage.slot()]
                    .iter()
                    .enumerate()
                    .map(move |(index, e)| (ElementRef::new(stage, index), e))
            })
    }
}
