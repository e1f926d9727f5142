use ef_systems::{EnergySystemPipeline, PipelineSelection, PipelineStepReport};

use crate::config::SimConfig;
use crate::context::SimContext;
use crate::error::SimResult;
use crate::event::SimEventKind;
use crate::system::System;

/// Drives the energy system pipeline along the live selection.
///
/// A change of selection is applied at the start of the next tick, before
/// the pipeline steps.
#[derive(Debug)]
pub struct EnergySystemsSystem {
    pipeline: EnergySystemPipeline,
    applied: Option<PipelineSelection>,
    last_report: PipelineStepReport,
}

impl EnergySystemsSystem {
    /// Wrap an existing pipeline.
    pub fn new(pipeline: EnergySystemPipeline) -> Self {
        Self {
            pipeline,
            applied: None,
            last_report: PipelineStepReport::default(),
        }
    }

    /// A pipeline with every built-in element, configured from `config`.
    pub fn with_default_carousels(config: &SimConfig) -> SimResult<Self> {
        let mut pipeline = EnergySystemPipeline::with_default_carousels(
            config.element_config(),
            &config.thermal,
            &config.heat_transfer,
            config.seed,
        )?;
        pipeline.set_energy_chunks_visible(config.chunks_visible);
        Ok(Self::new(pipeline))
    }

    /// The pipeline.
    pub fn pipeline(&self) -> &EnergySystemPipeline {
        &self.pipeline
    }

    /// The pipeline, for adjusting element controls.
    pub fn pipeline_mut(&mut self) -> &mut EnergySystemPipeline {
        &mut self.pipeline
    }

    /// The selection most recently applied to the pipeline.
    pub fn applied_selection(&self) -> Option<&PipelineSelection> {
        self.applied.as_ref()
    }

    /// What the last pipeline step did.
    pub fn last_report(&self) -> &PipelineStepReport {
        &self.last_report
    }

    fn sync_selection(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        if self.applied.as_ref() == Some(ctx.selection) {
            return Ok(());
        }
        self.pipeline
            .apply_selection(self.applied.as_ref(), ctx.selection)?;
        self.applied = Some(ctx.selection.clone());
        ctx.emit(
            SimEventKind::PipelineSwitched {
                selection: ctx.selection.clone(),
            },
            format!(
                "pipeline switched to source {} / converters {:?} / user {}",
                ctx.selection.source, ctx.selection.converters, ctx.selection.user
            ),
        );
        Ok(())
    }
}

impl System for EnergySystemsSystem {
    fn name(&self) -> &'static str {
        "energy_systems"
    }

    fn init(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        self.sync_selection(ctx)
    }

    fn tick(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        self.sync_selection(ctx)?;
        let report = self.pipeline.step(ctx.dt(), ctx.selection);

        if report.emitted > 0 {
            ctx.emit(
                SimEventKind::ChunkEmitted {
                    count: report.emitted,
                },
                format!("{} chunk(s) emitted", report.emitted),
            );
        }
        if report.consumed > 0 {
            ctx.emit(
                SimEventKind::ChunkConsumed {
                    count: report.consumed,
                },
                format!("{} chunk(s) consumed", report.consumed),
            );
        }
        if report.redirected > 0 {
            ctx.emit(
                SimEventKind::ChunkRedirected {
                    count: report.redirected,
                },
                format!("{} chunk(s) held by inactive elements", report.redirected),
            );
        }
        self.last_report = report;
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
