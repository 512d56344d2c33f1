//! Event output.

use crate::error::OutputError;
use parking_lot::Mutex;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracklab_core::{EventContext, EventData};
use tracklab_types::{
    EventIndex, Measurement, ParticleRecord, Seed, SimulatedHit, SpacePoint, TrackCandidate,
};

/// Receives every successfully processed event.
///
/// The sequencer serializes calls to one writer, but events may arrive
/// out of index order when several workers run.
pub trait EventWriter: Send {
    fn name(&self) -> &str;

    fn write(&mut self, ctx: &EventContext) -> Result<(), OutputError>;

    /// Called once after the last event.
    fn finish(&mut self) -> Result<(), OutputError> {
        Ok(())
    }
}

/// Serialized form of one event.
#[derive(Debug, Serialize)]
pub struct EventRecord<'a> {
    pub event: u64,
    pub generated_particles: &'a [ParticleRecord],
    pub particles: &'a [ParticleRecord],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hits: Option<&'a [SimulatedHit]>,
    pub measurements: &'a [Measurement],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub space_points: Option<&'a [SpacePoint]>,
    pub seeds: &'a [Seed],
    pub tracks: &'a [TrackCandidate],
}

impl<'a> EventRecord<'a> {
    pub fn new(index: EventIndex, data: &'a EventData) -> Self {
        Self {
            event: index.0,
            generated_particles: &data.generated_particles,
            particles: &data.particles,
            hits: None,
            measurements: &data.measurements,
            space_points: None,
            seeds: &data.seeds,
            tracks: &data.tracks,
        }
    }
}

/// Writes one pretty-printed JSON file per event into a directory.
#[derive(Debug)]
pub struct JsonEventWriter {
    directory: PathBuf,
    include_hits: bool,
    include_space_points: bool,
}

impl JsonEventWriter {
    /// Create the writer, creating `directory` if needed.
    pub fn new(directory: impl Into<PathBuf>) -> Result<Self, OutputError> {
        let directory = directory.into();
        fs::create_dir_all(&directory).map_err(|source| OutputError::Io {
            path: directory.clone(),
            source,
        })?;
        Ok(Self {
            directory,
            include_hits: false,
            include_space_points: false,
        })
    }

    pub fn with_hits(mut self, include: bool) -> Self {
        self.include_hits = include;
        self
    }

    pub fn with_space_points(mut self, include: bool) -> Self {
        self.include_space_points = include;
        self
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// File an event is written to, e.g. `event000000042.json`.
    pub fn path_for(&self, index: EventIndex) -> PathBuf {
        self.directory.join(format!("event{:09}.json", index.0))
    }
}

impl EventWriter for JsonEventWriter {
    fn name(&self) -> &str {
        "json"
    }

    fn write(&mut self, ctx: &EventContext) -> Result<(), OutputError> {
        let mut record = EventRecord::new(ctx.index(), &ctx.data);
        if self.include_hits {
            record.hits = Some(&ctx.data.hits);
        }
        if self.include_space_points {
            record.space_points = Some(&ctx.data.space_points);
        }

        let path = self.path_for(ctx.index());
        let io_error = |source| OutputError::Io {
            path: path.clone(),
            source,
        };
        let mut out = BufWriter::new(File::create(&path).map_err(io_error)?);
        serde_json::to_writer_pretty(&mut out, &record)?;
        out.flush().map_err(io_error)?;
        Ok(())
    }
}

/// Shared list of collected events.
pub type CollectedEvents = Arc<Mutex<Vec<(EventIndex, EventData)>>>;

/// Keeps a copy of every event in memory.
#[derive(Debug, Default)]
pub struct CollectingWriter {
    events: CollectedEvents,
}

impl CollectingWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the collected events, usable after the writer has been
    /// handed to the sequencer.
    pub fn events(&self) -> CollectedEvents {
        Arc::clone(&self.events)
    }
}

impl EventWriter for CollectingWriter {
    fn name(&self) -> &str {
        "collect"
    }

    fn write(&mut self, ctx: &EventContext) -> Result<(), OutputError> {
        self.events.lock().push((ctx.index(), ctx.data.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracklab_core::RandomNumbers;
    use tracklab_types::{GeometryId, ParticleId, Vector3};

    fn context(index: u64) -> EventContext {
        let index = EventIndex(index);
        let mut ctx = EventContext::new(index, RandomNumbers::new(1).event_stream(index));
        ctx.data.hits.push(SimulatedHit {
            particle: ParticleId::new(1, 1),
            surface: GeometryId::new(8, 2, 3),
            position: Vector3::new(32.0, 0.0, 1.0),
            direction: Vector3::x(),
            momentum: 2.0,
            index: 0,
        });
        ctx
    }

    #[test]
    fn test_json_writer_names_files_by_event() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = JsonEventWriter::new(dir.path().join("out")).unwrap();
        writer.write(&context(42)).unwrap();

        let path = dir.path().join("out").join("event000000042.json");
        assert_eq!(writer.path_for(EventIndex(42)), path);
        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["event"], 42);
        assert!(value["tracks"].as_array().unwrap().is_empty());
        assert!(value.get("hits").is_none());
        assert!(value.get("space_points").is_none());
    }

    #[test]
    fn test_json_writer_optional_collections() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = JsonEventWriter::new(dir.path())
            .unwrap()
            .with_hits(true)
            .with_space_points(true);
        writer.write(&context(3)).unwrap();

        let text = fs::read_to_string(writer.path_for(EventIndex(3))).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["hits"].as_array().unwrap().len(), 1);
        assert!(value["space_points"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_collecting_writer_shares_events() {
        let mut writer = CollectingWriter::new();
        let events = writer.events();
        writer.write(&context(0)).unwrap();
        writer.write(&context(1)).unwrap();
        let events = events.lock();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].0, EventIndex(1));
        assert_eq!(events[1].1.hits.len(), 1);
    }
}
