//! Pipeline Runner: drives one model through the bring-up stages
//!
//! ```text
//! Start → Created → Loaded → Compiled → Initialized → Summarized
//!    ↘        ↘         ↘          ↘            ↘
//!                       Failed(stage)
//! ```
use std::io::Write;
use std::time::Instant;

use crate::context::ExecutionContext;
use crate::data_model::{
    BringupReport, ModelFormat, ModelKind, ShapeDescriptor, StageRecord, SummaryLevel,
};
use crate::error::{BringupError, ExitStatus};
use crate::runtime::{ModelHandle, ModelRuntime, RuntimeError};
use crate::stage::{PipelineStage, PipelineState};

pub struct BringupPipeline<R: ModelRuntime> {
    runtime: R,
    kind: ModelKind,
    format: ModelFormat,
    tracker: StageTracker,
}

#[derive(Debug, Default)]
struct StageTracker {
    state: PipelineState,
    records: Vec<StageRecord>,
}

impl<R: ModelRuntime> BringupPipeline<R> {
    pub fn new(runtime: R) -> Self {
        Self {
            runtime,
            kind: ModelKind::NeuralNet,
            format: ModelFormat::Ini,
            tracker: StageTracker::default(),
        }
    }

    pub fn state(&self) -> &PipelineState {
        &self.tracker.state
    }

    /// Completed stages of the last run, in order
    pub fn records(&self) -> &[StageRecord] {
        &self.tracker.records
    }

    /// Run every stage against a fresh model, writing the shape lines and the
    /// three summaries to `out`. The first failing stage ends the run.
    pub fn run(
        &mut self,
        ctx: &ExecutionContext,
        out: &mut dyn Write,
    ) -> Result<BringupReport, BringupError> {
        let span = tracing::info_span!(
            "bringup",
            trace_id = %ctx.trace_id,
            config = %ctx.config_path.display(),
            started_at = %ctx.started_at
        );
        let _guard = span.enter();

        let tracker = &mut self.tracker;
        *tracker = StageTracker::default();

        let (runtime, kind, format) = (&self.runtime, self.kind, self.format);
        let mut model = tracker.enter(PipelineStage::Created, || runtime.create_model(kind))?;

        tracker.enter(PipelineStage::Loaded, || model.load(&ctx.config_path, format))?;
        tracker.enter(PipelineStage::Compiled, || model.compile())?;
        tracker.enter(PipelineStage::Initialized, || model.initialize(ctx.seed))?;

        let (inputs, outputs) = tracker.enter(PipelineStage::Summarized, || {
            let dims = report_dimensions(&model, out)?;
            for level in SummaryLevel::ALL {
                writeln!(out, "{}", level.label())?;
                model.summarize(out, level)?;
            }
            out.flush()?;
            Ok(dims)
        })?;

        let report = BringupReport {
            trace_id: ctx.trace_id.clone(),
            seed: ctx.seed,
            stages: tracker.records.clone(),
            inputs,
            outputs,
        };
        tracing::debug!(
            report = %serde_json::to_string(&report).unwrap_or_default(),
            "bring-up finished"
        );
        Ok(report)
    }

    /// Run and map the outcome to a process status. Failures are written to
    /// `err` as a single diagnostic line.
    pub fn execute(
        &mut self,
        ctx: &ExecutionContext,
        out: &mut dyn Write,
        err: &mut dyn Write,
    ) -> ExitStatus {
        match self.run(ctx, out) {
            Ok(_) => ExitStatus::Ok,
            Err(e) => {
                let _ = writeln!(err, "{}", e);
                ExitStatus::from(&e)
            }
        }
    }
}

impl StageTracker {
    fn enter<T>(
        &mut self,
        stage: PipelineStage,
        op: impl FnOnce() -> Result<T, RuntimeError>,
    ) -> Result<T, BringupError> {
        if !self.state.can_enter(stage) {
            let source = RuntimeError::InvalidState(format!(
                "cannot enter {} from {:?}",
                stage, self.state
            ));
            self.state.fail(stage, source.to_string());
            return Err(BringupError::at(stage, source));
        }

        let start = Instant::now();
        match op() {
            Ok(value) => {
                let latency_ms = start.elapsed().as_millis() as u64;
                self.state.advance(stage);
                self.records.push(StageRecord { stage, latency_ms });
                tracing::info!(%stage, latency_ms, "stage complete");
                Ok(value)
            }
            Err(source) => {
                self.state.fail(stage, source.to_string());
                tracing::debug!(action = stage.verb(), error = %source, "stage failed");
                Err(BringupError::at(stage, source))
            }
        }
    }
}

fn report_dimensions<M: ModelHandle>(
    model: &M,
    out: &mut dyn Write,
) -> Result<(Vec<ShapeDescriptor>, Vec<ShapeDescriptor>), RuntimeError> {
    let inputs = model.input_dimensions();
    let outputs = model.output_dimensions();

    for dim in &inputs {
        writeln!(out, "INPUT_SHAPE : {}, {}, {}", dim.channel, dim.height, dim.width)?;
        writeln!(out, "BATCH_SIZE: {}", dim.batch)?;
    }
    for dim in &outputs {
        writeln!(out, "OUTPUT_SHAPE : {}, {}, {}", dim.channel, dim.height, dim.width)?;
    }

    Ok((inputs, outputs))
}
