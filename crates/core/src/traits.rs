//! Core trait for pipeline stages.

use crate::context::{Collection, EventContext};
use crate::error::{ConfigError, StageError};
use crate::resources::PipelineResources;

/// One step of the per-event processing chain.
///
/// Stages are built once from immutable configuration and shared by all
/// event workers, so `execute` takes `&self`:
///
/// - **Per-event**: All event state lives in the [`EventContext`]
/// - **Deterministic**: Randomness comes only from the context's stream
/// - **Declared data flow**: `reads` and `writes` let the sequencer check
///   the stage order before any event runs
///
/// # Example
///
/// ```ignore
/// impl Stage for TrackSelectionStage {
///     fn name(&self) -> &str {
///         "track-selection"
///     }
///
///     fn reads(&self) -> Vec<Collection> {
///         vec![Collection::Tracks]
///     }
///
///     fn writes(&self) -> Vec<Collection> {
///         vec![Collection::Tracks]
///     }
///
///     fn execute(&self, ctx: &mut EventContext, _: &PipelineResources) -> Result<(), StageError> {
///         ctx.data.tracks = apply(&ctx.data.tracks, &self.criteria);
///         Ok(())
///     }
/// }
/// ```
pub trait Stage: Send + Sync {
    /// Name used in logs and failure reports.
    fn name(&self) -> &str;

    /// Collections this stage needs from earlier stages.
    fn reads(&self) -> Vec<Collection>;

    /// Collections this stage produces or replaces.
    fn writes(&self) -> Vec<Collection>;

    /// Validate the stage against the run's resources.
    ///
    /// Called once while the pipeline is built. Errors abort the run
    /// before any event is processed.
    fn initialize(&self, resources: &PipelineResources) -> Result<(), ConfigError> {
        let _ = resources;
        Ok(())
    }

    /// Process one event.
    ///
    /// # Guarantees
    ///
    /// - **Sequential**: Never called concurrently for the same event
    /// - **Isolated**: An error aborts this event only
    fn execute(
        &self,
        ctx: &mut EventContext,
        resources: &PipelineResources,
    ) -> Result<(), StageError>;
}
