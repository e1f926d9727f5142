//! Energy system elements and the pipeline that links them.
//!
//! A pipeline holds three carousels: sources, converters and users. The
//! live [`PipelineSelection`] picks one source, any number of converters and
//! one user; energy flows down that chain both as a continuous
//! [`ef_core::Energy`] rate and as discrete chunks handed from element to
//! element.

/// Chunk and smoothing parameters shared by all elements.
pub mod config;
/// A single element and its chunk bookkeeping.
pub mod element;
/// The concrete element kinds.
pub mod kind;
/// Carousels, selection, hand-off and transit.
pub mod pipeline;

/// Re-export of [`config::ElementConfig`].
pub use config::ElementConfig;
/// Re-exports of element types.
pub use element::{ElementLayout, ElementState, EnergySystemElement};
/// Re-exports of kind types.
pub use kind::{ElementKind, ElementRole};
/// Re-exports of pipeline types.
pub use pipeline::{
    ChunkLocation, ChunkView, ElementRef, EnergySystemPipeline, PipelineSelection,
    PipelineStepReport, Stage,
};
