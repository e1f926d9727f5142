use std::collections::HashMap;
use std::mem;

use ef_core::{
    ChunkId, DVec2, EfResult, Energy, EnergyChunk, EnergyChunkPath, EnergyType,
    MovingAverageCalculator,
};
use rand::Rng;
use tracing::debug;

use crate::config::ElementConfig;
use crate::kind::{ElementKind, ElementRole};

/// Horizontal spread of exhaust endpoints, in m.
const EXHAUST_JITTER: f64 = 0.01;

/// Rounding slack when deciding a user's output mix.
const MIX_EPSILON: f64 = 1e-9;

/// Lifecycle of an element within the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementState {
    /// Not in the live chain.
    Inactive,
    /// In the live chain; producing and handing off.
    Active,
    /// Switched out; remaining chunks finish their paths and dissipate.
    Clearing,
}

/// Local attachment points, relative to the element's position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementLayout {
    /// Where incoming chunks arrive.
    pub input: DVec2,
    /// Where chunks are absorbed or converted.
    pub center: DVec2,
    /// Where produced chunks leave.
    pub output: DVec2,
    /// Direction dissipating chunks travel.
    pub exhaust: DVec2,
}

impl Default for ElementLayout {
    fn default() -> Self {
        Self {
            input: DVec2::new(-0.04, 0.0),
            center: DVec2::ZERO,
            output: DVec2::new(0.04, 0.0),
            exhaust: DVec2::new(0.0, 0.06),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Leg {
    /// Travelling from the input point to the center.
    Inbound,
    /// Looping near the output point before being handed off.
    Lingering,
    /// Parked at the output point, waiting for extraction.
    Outgoing,
    /// Heading away to dissipate.
    Exhaust,
    /// Leaving a user after being consumed.
    Radiating,
}

/// Chunk emission state for sources and converters.
#[derive(Debug, Clone)]
struct ProducerBlock {
    quantum: f64,
    energy_since_last_chunk: f64,
    transfer_next_available_chunk: bool,
    downstream_in_place: bool,
    outgoing: Vec<ChunkId>,
    emitted: u64,
}

impl ProducerBlock {
    fn new(quantum: f64) -> Self {
        Self {
            quantum,
            energy_since_last_chunk: 0.0,
            transfer_next_available_chunk: true,
            downstream_in_place: false,
            outgoing: Vec::new(),
            emitted: 0,
        }
    }
}

/// Chunk receiving state for converters and users.
#[derive(Debug, Clone, Default)]
struct ConsumerBlock {
    incoming: Vec<ChunkId>,
    holding: Vec<EnergyChunk>,
    consumed: u64,
    mix: f64,
}

/// Conversion state for converters.
#[derive(Debug, Clone)]
struct ConverterBlock {
    accepted: EnergyType,
    efficiency: f64,
    waste_since_last_chunk: f64,
    smoothed_output: MovingAverageCalculator,
}

/// One element of an energy system: a source, converter or user.
///
/// Every element owns the chunks travelling across it. Which of the
/// producer, consumer and converter blocks are present follows from the
/// element's role.
#[derive(Debug, Clone)]
pub struct EnergySystemElement {
    kind: ElementKind,
    role: ElementRole,
    state: ElementState,
    position: DVec2,
    layout: ElementLayout,
    chunks: Vec<EnergyChunk>,
    legs: HashMap<ChunkId, Leg>,
    producer: Option<ProducerBlock>,
    consumer: Option<ConsumerBlock>,
    converter: Option<ConverterBlock>,
    last_output: Energy,
    chunks_visible: bool,
    dissipated: u64,
    config: ElementConfig,
}

impl EnergySystemElement {
    /// Build an inactive element of `kind`.
    pub fn new(kind: ElementKind, config: &ElementConfig) -> EfResult<Self> {
        let role = kind.role();
        let producer = matches!(role, ElementRole::Source | ElementRole::Converter)
            .then(|| ProducerBlock::new(config.energy_per_chunk));
        let consumer = matches!(role, ElementRole::Converter | ElementRole::User)
            .then(ConsumerBlock::default);
        let converter = match kind.accepted_input() {
            Some(accepted) => Some(ConverterBlock {
                accepted,
                efficiency: kind.efficiency(),
                waste_since_last_chunk: 0.0,
                smoothed_output: MovingAverageCalculator::new(
                    config.converter_smoothing_window,
                    0.0,
                )?,
            }),
            None => None,
        };
        let last_output = Energy::none(kind.output_type());
        Ok(Self {
            kind,
            role,
            state: ElementState::Inactive,
            position: DVec2::ZERO,
            layout: ElementLayout::default(),
            chunks: Vec::new(),
            legs: HashMap::new(),
            producer,
            consumer,
            converter,
            last_output,
            chunks_visible: true,
            dissipated: 0,
            config: config.clone(),
        })
    }

    /// Override the attachment points.
    pub fn with_layout(mut self, layout: ElementLayout) -> Self {
        self.layout = layout;
        self
    }

    /// The concrete element and its controls.
    pub fn kind(&self) -> &ElementKind {
        &self.kind
    }

    /// Mutable access to the element's controls.
    pub fn kind_mut(&mut self) -> &mut ElementKind {
        &mut self.kind
    }

    /// Source, converter or user.
    pub fn role(&self) -> ElementRole {
        self.role
    }

    /// Icon identifier.
    pub fn icon(&self) -> &'static str {
        self.kind.icon()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ElementState {
        self.state
    }

    /// Whether the element is live in the pipeline.
    pub fn is_active(&self) -> bool {
        self.state == ElementState::Active
    }

    /// Position of the element's origin.
    pub fn position(&self) -> DVec2 {
        self.position
    }

    /// Move the element. Chunks already in flight keep their paths.
    pub fn set_position(&mut self, position: DVec2) {
        self.position = position;
    }

    /// Absolute input point.
    pub fn input_point(&self) -> DVec2 {
        self.position + self.layout.input
    }

    /// Absolute center point.
    pub fn center_point(&self) -> DVec2 {
        self.position + self.layout.center
    }

    /// Absolute output point.
    pub fn output_point(&self) -> DVec2 {
        self.position + self.layout.output
    }

    /// Tell a producer whether anything is linked after it.
    pub fn set_downstream_in_place(&mut self, in_place: bool) {
        if let Some(producer) = self.producer.as_mut() {
            producer.downstream_in_place = in_place;
        }
    }

    /// Whether a producer has a linked element after it.
    pub fn downstream_in_place(&self) -> bool {
        self.producer.as_ref().is_some_and(|p| p.downstream_in_place)
    }

    /// Chunks currently on the element, outgoing ones included.
    pub fn energy_chunks(&self) -> &[EnergyChunk] {
        &self.chunks
    }

    /// Chunks parked by an inactive consumer.
    pub fn holding(&self) -> &[EnergyChunk] {
        self.consumer
            .as_ref()
            .map(|c| c.holding.as_slice())
            .unwrap_or_default()
    }

    /// IDs flagged for hand-off.
    pub fn outgoing_ids(&self) -> &[ChunkId] {
        self.producer
            .as_ref()
            .map(|p| p.outgoing.as_slice())
            .unwrap_or_default()
    }

    /// IDs still travelling in from the input point.
    pub fn incoming_ids(&self) -> &[ChunkId] {
        self.consumer
            .as_ref()
            .map(|c| c.incoming.as_slice())
            .unwrap_or_default()
    }

    /// Energy accumulated toward the next chunk, in J.
    pub fn energy_since_last_chunk(&self) -> f64 {
        self.producer
            .as_ref()
            .map_or(0.0, |p| p.energy_since_last_chunk)
    }

    /// Chunks emitted since construction.
    pub fn emitted_count(&self) -> u64 {
        self.producer.as_ref().map_or(0, |p| p.emitted)
    }

    /// Chunks absorbed since construction.
    pub fn consumed_count(&self) -> u64 {
        self.consumer.as_ref().map_or(0, |c| c.consumed)
    }

    /// Chunks that reached the end of an exhaust path.
    pub fn dissipated_count(&self) -> u64 {
        self.dissipated
    }

    /// Output from the most recent step. Zero unless active.
    pub fn energy_output_rate(&self) -> Energy {
        self.last_output
    }

    /// Output this element would settle at when fed `input` continuously.
    pub fn steady_output(&self, input: Energy) -> Energy {
        let output_type = self.kind.output_type();
        match self.role {
            ElementRole::Source => Energy::new(output_type, self.kind.source_rate()),
            ElementRole::Converter => match self.converter.as_ref() {
                Some(c) if c.accepted == input.energy_type => {
                    Energy::new(output_type, input.rate * c.efficiency)
                }
                _ => Energy::none(output_type),
            },
            ElementRole::User => {
                Energy::new(output_type, input.rate * self.kind.primary_fraction())
            }
        }
    }

    /// Show or hide every chunk this element holds, and any it creates later.
    pub fn set_chunks_visible(&mut self, visible: bool) {
        self.chunks_visible = visible;
        for chunk in &mut self.chunks {
            chunk.visible = visible;
        }
        if let Some(consumer) = self.consumer.as_mut() {
            for chunk in &mut consumer.holding {
                chunk.visible = visible;
            }
        }
    }

    /// Go live.
    pub fn activate(&mut self) {
        self.state = ElementState::Active;
        if let Some(producer) = self.producer.as_mut() {
            producer.transfer_next_available_chunk = true;
        }
    }

    /// Stop producing. Chunks still on the element finish and dissipate.
    pub fn deactivate(&mut self) {
        if self.state != ElementState::Active {
            return;
        }
        self.state = ElementState::Clearing;
        self.last_output = Energy::none(self.kind.output_type());
        let parked = match self.producer.as_mut() {
            Some(producer) => {
                producer.downstream_in_place = false;
                mem::take(&mut producer.outgoing)
            }
            None => Vec::new(),
        };
        let exhaust = self.layout.exhaust;
        for chunk in self.chunks.iter_mut().filter(|c| parked.contains(&c.id())) {
            chunk.set_path(EnergyChunkPath::new([chunk.position + exhaust]));
            self.legs.insert(chunk.id(), Leg::Exhaust);
        }
    }

    /// Drop every chunk, including held ones, and forget accumulated energy.
    pub fn clear_energy_chunks(&mut self) {
        self.chunks.clear();
        self.legs.clear();
        if let Some(producer) = self.producer.as_mut() {
            producer.outgoing.clear();
            producer.energy_since_last_chunk = 0.0;
        }
        if let Some(consumer) = self.consumer.as_mut() {
            consumer.incoming.clear();
            consumer.holding.clear();
            consumer.mix = 0.0;
        }
        if let Some(converter) = self.converter.as_mut() {
            converter.waste_since_last_chunk = 0.0;
            converter.smoothed_output.reset();
        }
        if self.state == ElementState::Clearing {
            self.state = ElementState::Inactive;
        }
    }

    /// Take ownership of the chunks flagged for hand-off.
    pub fn extract_outgoing_energy_chunks(&mut self) -> Vec<EnergyChunk> {
        let outgoing = match self.producer.as_mut() {
            Some(producer) => mem::take(&mut producer.outgoing),
            None => return Vec::new(),
        };
        if outgoing.is_empty() {
            return Vec::new();
        }
        let (extracted, resident): (Vec<_>, Vec<_>) = mem::take(&mut self.chunks)
            .into_iter()
            .partition(|c| outgoing.contains(&c.id()));
        self.chunks = resident;
        for chunk in &extracted {
            self.legs.remove(&chunk.id());
        }
        extracted
    }

    /// Accept chunks arriving at the input point.
    ///
    /// Returns the chunks a source cannot take. An inactive consumer parks
    /// them in its holding list instead.
    pub fn inject_energy_chunks(&mut self, chunks: Vec<EnergyChunk>) -> Vec<EnergyChunk> {
        if self.consumer.is_none() {
            return chunks;
        }
        let path_end = [self.input_point(), self.center_point()];
        let active = self.is_active();
        for mut chunk in chunks {
            let id = chunk.id();
            if self.holds(id) {
                continue;
            }
            chunk.visible = self.chunks_visible;
            let Some(consumer) = self.consumer.as_mut() else {
                break;
            };
            if active {
                chunk.set_path(EnergyChunkPath::new(path_end));
                consumer.incoming.push(id);
                self.legs.insert(id, Leg::Inbound);
                self.chunks.push(chunk);
            } else {
                debug!(element = self.kind.icon(), chunk = %id, "holding chunk for inactive element");
                consumer.holding.push(chunk);
            }
        }
        Vec::new()
    }

    /// Spread chunks along the inbound leg as if `incoming` had been flowing
    /// for a while. Returns the number placed.
    pub fn pre_load_energy_chunks(&mut self, incoming: Energy) -> usize {
        if self.consumer.is_none() || !self.is_active() || !incoming.is_flowing() {
            return 0;
        }
        let start = self.input_point();
        let end = self.center_point();
        let transit_time = self.layout.input.distance(self.layout.center) / self.config.chunk_speed;
        let count = (incoming.rate * transit_time / self.config.energy_per_chunk).floor() as usize;
        for i in 0..count {
            let along = (i as f64 + 0.5) / count as f64;
            let mut chunk = EnergyChunk::new(
                incoming.energy_type,
                start.lerp(end, along),
                self.chunks_visible,
            );
            chunk.set_path(EnergyChunkPath::new([end]));
            let id = chunk.id();
            if let Some(consumer) = self.consumer.as_mut() {
                consumer.incoming.push(id);
            }
            self.legs.insert(id, Leg::Inbound);
            self.chunks.push(chunk);
        }
        count
    }

    /// Advance the element by `dt` seconds, fed by `input`.
    ///
    /// Chunks move first, then an active element produces. Returns the
    /// element's output for the next element in the chain.
    pub fn step<R: Rng + ?Sized>(&mut self, dt: f64, input: Energy, rng: &mut R) -> Energy {
        self.move_chunks(dt, rng);

        if self.is_active() {
            self.last_output = self.produce(dt, input);
            self.emit_chunks(rng);
        } else {
            self.last_output = Energy::none(self.kind.output_type());
        }

        if self.state == ElementState::Clearing && self.chunks.is_empty() {
            self.state = ElementState::Inactive;
        }
        self.last_output
    }

    fn holds(&self, id: ChunkId) -> bool {
        self.legs.contains_key(&id)
            || self
                .consumer
                .as_ref()
                .is_some_and(|c| c.holding.iter().any(|h| h.id() == id))
    }

    fn move_chunks<R: Rng + ?Sized>(&mut self, dt: f64, rng: &mut R) {
        let speed = self.config.chunk_speed;
        let mut finished = Vec::new();
        for chunk in &mut self.chunks {
            let leg = self.legs.get(&chunk.id()).copied();
            if leg == Some(Leg::Outgoing) {
                continue;
            }
            if chunk.step(speed, dt) {
                finished.push((chunk.id(), leg));
            }
        }

        for (id, leg) in finished {
            match leg {
                Some(Leg::Inbound) => self.absorb(id, rng),
                Some(Leg::Lingering) => self.release_lingering(id, rng),
                Some(Leg::Exhaust) => {
                    self.discard(id);
                    self.dissipated += 1;
                }
                Some(Leg::Radiating) | None => {
                    self.discard(id);
                }
                Some(Leg::Outgoing) => {}
            }
        }
    }

    fn absorb<R: Rng + ?Sized>(&mut self, id: ChunkId, rng: &mut R) {
        let Some(consumer) = self.consumer.as_mut() else {
            return;
        };
        consumer.incoming.retain(|c| *c != id);
        consumer.consumed += 1;

        match self.role {
            ElementRole::Converter => {
                let Some(chunk) = self.discard(id) else {
                    return;
                };
                let quantum = self.config.energy_per_chunk;
                if let (Some(converter), Some(producer)) =
                    (self.converter.as_mut(), self.producer.as_mut())
                {
                    if chunk.energy_type == converter.accepted {
                        let useful = quantum * converter.efficiency;
                        producer.energy_since_last_chunk += useful;
                        converter.waste_since_last_chunk += quantum - useful;
                    } else {
                        converter.waste_since_last_chunk += quantum;
                    }
                }
            }
            ElementRole::User => {
                consumer.mix += self.kind.primary_fraction();
                let energy_type = if consumer.mix >= 1.0 - MIX_EPSILON {
                    consumer.mix -= 1.0;
                    self.kind.output_type()
                } else {
                    EnergyType::Thermal
                };
                let path = self.exhaust_path(self.center_point(), rng);
                if let Some(chunk) = self.chunks.iter_mut().find(|c| c.id() == id) {
                    chunk.energy_type = energy_type;
                    chunk.set_path(path);
                }
                self.legs.insert(id, Leg::Radiating);
            }
            ElementRole::Source => {}
        }
    }

    fn release_lingering<R: Rng + ?Sized>(&mut self, id: ChunkId, rng: &mut R) {
        let hand_off = self.is_active() && self.downstream_in_place();
        if hand_off {
            if let Some(producer) = self.producer.as_mut() {
                producer.outgoing.push(id);
            }
            self.legs.insert(id, Leg::Outgoing);
            return;
        }
        let path = self.exhaust_path(self.output_point(), rng);
        if let Some(chunk) = self.chunks.iter_mut().find(|c| c.id() == id) {
            chunk.set_path(path);
        }
        self.legs.insert(id, Leg::Exhaust);
    }

    fn produce(&mut self, dt: f64, input: Energy) -> Energy {
        let output_type = self.kind.output_type();
        match self.role {
            ElementRole::Source => {
                let rate = self.kind.produce(dt);
                if let Some(producer) = self.producer.as_mut() {
                    producer.energy_since_last_chunk += rate * dt;
                }
                Energy::new(output_type, rate)
            }
            ElementRole::Converter => {
                let Some(converter) = self.converter.as_mut() else {
                    return Energy::none(output_type);
                };
                let rate = if input.energy_type == converter.accepted {
                    input.rate * converter.efficiency
                } else {
                    0.0
                };
                converter.smoothed_output.add_value(rate);
                let smoothed = converter.smoothed_output.average();
                self.kind.advance_converter(dt, smoothed);
                Energy::new(output_type, smoothed)
            }
            ElementRole::User => self.kind.consume(dt, input),
        }
    }

    fn emit_chunks<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let origin = self.output_point();
        let linger = EnergyChunkPath::new([origin + DVec2::new(0.0, self.config.linger_rise()), origin]);
        let output_type = self.kind.output_type();

        loop {
            let Some(producer) = self.producer.as_mut() else {
                break;
            };
            if producer.energy_since_last_chunk < producer.quantum {
                break;
            }
            producer.energy_since_last_chunk -= producer.quantum;
            producer.emitted += 1;

            let mut chunk = EnergyChunk::new(output_type, origin, self.chunks_visible);
            let id = chunk.id();
            let leg = if !producer.downstream_in_place {
                Leg::Exhaust
            } else if producer.transfer_next_available_chunk {
                producer.transfer_next_available_chunk = false;
                producer.outgoing.push(id);
                Leg::Outgoing
            } else {
                producer.transfer_next_available_chunk = true;
                chunk.set_path(linger.clone());
                Leg::Lingering
            };
            if leg == Leg::Exhaust {
                chunk.set_path(self.exhaust_path(origin, rng));
            }
            debug!(element = self.kind.icon(), chunk = %id, ?leg, "emitted chunk");
            self.legs.insert(id, leg);
            self.chunks.push(chunk);
        }

        let center = self.center_point();
        loop {
            let Some(converter) = self.converter.as_mut() else {
                break;
            };
            if converter.waste_since_last_chunk < self.config.energy_per_chunk {
                break;
            }
            converter.waste_since_last_chunk -= self.config.energy_per_chunk;
            let mut chunk = EnergyChunk::new(EnergyType::Thermal, center, self.chunks_visible);
            chunk.set_path(self.exhaust_path(center, rng));
            self.legs.insert(chunk.id(), Leg::Exhaust);
            self.chunks.push(chunk);
        }
    }

    fn exhaust_path<R: Rng + ?Sized>(&self, from: DVec2, rng: &mut R) -> EnergyChunkPath {
        let jitter = rng.random_range(-EXHAUST_JITTER..=EXHAUST_JITTER);
        EnergyChunkPath::new([from + self.layout.exhaust + DVec2::new(jitter, 0.0)])
    }

    fn discard(&mut self, id: ChunkId) -> Option<EnergyChunk> {
        self.legs.remove(&id);
        let index = self.chunks.iter().position(|c| c.id() == id)?;
        Some(self.chunks.remove(index))
    }
}
