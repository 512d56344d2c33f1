//! The event loop.

use crate::error::PipelineError;
use crate::summary::{EventOutcome, FailedEvent, RunSummary};
use crate::writer::EventWriter;
use parking_lot::Mutex;
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, warn};
use tracklab_core::{Collection, ConfigError, EventContext, PipelineResources, Stage};
use tracklab_types::EventIndex;

/// Stops a running [`Sequencer`] between events.
///
/// Events already started run to completion; the rest are counted as
/// skipped.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Runs a validated stage list over a range of events.
pub struct Sequencer {
    resources: Arc<PipelineResources>,
    stages: Vec<Box<dyn Stage>>,
    writers: Vec<Mutex<Box<dyn EventWriter>>>,
    skip: u64,
    stop: StopHandle,
}

impl Sequencer {
    /// Validate the stage order and initialize every stage.
    ///
    /// Fails if the list is empty, if a stage reads a collection no
    /// earlier stage writes, or if any stage rejects the resources.
    pub fn build(
        resources: Arc<PipelineResources>,
        stages: Vec<Box<dyn Stage>>,
    ) -> Result<Self, ConfigError> {
        if stages.is_empty() {
            return Err(ConfigError::EmptyPipeline);
        }

        let mut available = BTreeSet::new();
        for stage in &stages {
            if let Some(&collection) = stage.reads().iter().find(|c| !available.contains(*c)) {
                return Err(ConfigError::MissingInput {
                    stage: stage.name().to_string(),
                    collection,
                });
            }
            available.extend(stage.writes());
        }

        for stage in &stages {
            stage.initialize(&resources)?;
            debug!(stage = stage.name(), "Initialized stage");
        }

        info!(
            stages = stages.len(),
            geometry = resources.geometry.name(),
            seed = resources.random.seed(),
            "Built pipeline"
        );
        Ok(Self {
            resources,
            stages,
            writers: Vec::new(),
            skip: 0,
            stop: StopHandle::default(),
        })
    }

    pub fn add_writer(&mut self, writer: Box<dyn EventWriter>) {
        self.writers.push(Mutex::new(writer));
    }

    /// Start at event `skip` instead of 0.
    pub fn with_skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn resources(&self) -> &PipelineResources {
        &self.resources
    }

    /// Process events `skip..skip + num_events`.
    ///
    /// `num_workers` of 1 runs in index order on the calling thread, 0 uses
    /// one worker per core, anything else a pool of that size. Per-event
    /// results do not depend on the worker count.
    pub fn run(&self, num_events: u64, num_workers: usize) -> Result<RunSummary, PipelineError> {
        let started = Instant::now();
        let end = self.skip.checked_add(num_events).ok_or_else(|| {
            ConfigError::invalid("events", "first event plus event count exceeds the index range")
        })?;
        let indices: Vec<EventIndex> = (self.skip..end).map(EventIndex).collect();
        info!(
            first = self.skip,
            events = num_events,
            workers = num_workers,
            "Starting run"
        );

        let outcomes: Vec<(EventIndex, EventOutcome)> = if num_workers == 1 {
            indices.iter().map(|&i| (i, self.process(i))).collect()
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(num_workers)
                .build()?;
            pool.install(|| indices.par_iter().map(|&i| (i, self.process(i))).collect())
        };

        for writer in &self.writers {
            let mut writer = writer.lock();
            writer.finish().map_err(|source| PipelineError::Output {
                writer: writer.name().to_string(),
                source,
            })?;
        }

        let summary = RunSummary::collect(num_events, outcomes, started.elapsed());
        summary.log();
        Ok(summary)
    }

    fn process(&self, index: EventIndex) -> EventOutcome {
        if self.stop.is_stopped() {
            return EventOutcome::Skipped;
        }
        let span = info_span!("event", index = index.0);
        let _guard = span.enter();
        let started = Instant::now();

        let mut ctx = EventContext::new(index, self.resources.random.event_stream(index));
        for stage in &self.stages {
            if let Err(err) = stage.execute(&mut ctx, &self.resources) {
                warn!(stage = stage.name(), error = %err, "Stage failed");
                return EventOutcome::Failed(FailedEvent {
                    event: index,
                    stage: err.stage().to_string(),
                    reason: err.to_string(),
                });
            }
        }

        for writer in &self.writers {
            let mut writer = writer.lock();
            if let Err(err) = writer.write(&ctx) {
                warn!(writer = writer.name(), error = %err, "Writer failed");
                return EventOutcome::Failed(FailedEvent {
                    event: index,
                    stage: format!("writer:{}", writer.name()),
                    reason: err.to_string(),
                });
            }
        }

        let counts = self
            .stages
            .iter()
            .flat_map(|stage| stage.writes())
            .collect::<BTreeSet<Collection>>()
            .into_iter()
            .map(|collection| (collection, ctx.data.len_of(collection)))
            .collect();
        EventOutcome::Succeeded {
            latency: started.elapsed(),
            counts,
        }
    }
}
