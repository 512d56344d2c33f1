//! End-to-end runs of the reconstruction chain on the generic detector.

use std::collections::HashSet;
use tracklab_chain::{build_sequencer, run, ChainError, RunConfig};
use tracklab_core::ConfigError;
use tracklab_generation::{GeneratorConfig, ParticleGunConfig};
use tracklab_seeding::{GbtsTablePaths, SeedingAlgorithmTag, SeedingConfig};
use tracklab_selection::{Range, TrackCriteria};
use tracklab_sequencer::CollectingWriter;
use tracklab_types::{EventIndex, MeasurementIndex};

fn gun_config(events: u64) -> RunConfig {
    RunConfig::default().with_events(events).with_generator(
        GeneratorConfig::ParticleGun(
            ParticleGunConfig::default()
                .with_count(2)
                .with_momentum(1.0, 10.0, true)
                .with_eta(-4.0, 4.0),
        ),
    )
}

fn collect(config: &RunConfig) -> Vec<(EventIndex, tracklab_core::EventData)> {
    let mut sequencer = build_sequencer(config).unwrap();
    let writer = CollectingWriter::new();
    let events = writer.events();
    sequencer.add_writer(Box::new(writer));

    let summary = sequencer.run(config.events, config.workers).unwrap();
    assert!(summary.is_complete(), "failed events: {:?}", summary.failed);

    let mut events = events.lock().clone();
    events.sort_by_key(|(index, _)| *index);
    events
}

#[test]
fn test_particle_gun_kinematics() {
    let events = collect(&gun_config(5));
    assert_eq!(events.len(), 5);

    for (_, data) in &events {
        assert_eq!(data.generated_particles.len(), 2);
        for particle in &data.generated_particles {
            let (pt, eta) = (particle.pt(), particle.eta());
            assert!(pt >= 1.0 - 1e-9 && pt <= 10.0 + 1e-9, "pt {pt}");
            assert!(eta.abs() <= 4.0 + 1e-9, "eta {eta}");
        }
    }
}

#[test]
fn test_results_independent_of_worker_count() {
    let sequential = collect(&gun_config(6).with_workers(1));
    let parallel = collect(&gun_config(6).with_workers(3));
    assert_eq!(sequential, parallel);
}

#[test]
fn test_seeds_and_tracks_reference_existing_measurements() {
    for (index, data) in collect(&gun_config(4)) {
        let known: HashSet<MeasurementIndex> =
            data.measurements.iter().map(|m| m.index).collect();

        for seed in &data.seeds {
            for m in seed.measurements() {
                assert!(known.contains(m), "event {index}: seed uses unknown {m:?}");
            }
        }
        for track in &data.tracks {
            assert!(track.seed < data.seeds.len());
            for m in &track.measurements {
                assert!(known.contains(m), "event {index}: track uses unknown {m:?}");
            }
        }
    }
}

#[test]
fn test_track_selection_keeps_exactly_the_passing_tracks() {
    let min_measurements = 7;
    let unselected = collect(&gun_config(4));
    let selected = collect(&gun_config(4).with_track_selection(
        TrackCriteria::default()
            .with_eta(Range::new(-4.0, 4.0))
            .with_min_measurements(min_measurements),
    ));
    assert_eq!(unselected.len(), selected.len());

    let (mut kept, mut dropped) = (0, 0);
    for ((index, all), (_, filtered)) in unselected.iter().zip(&selected) {
        let expected: Vec<_> = all
            .tracks
            .iter()
            .filter(|track| {
                let eta = track.parameters.eta();
                track.n_measurements() >= min_measurements && eta >= -4.0 && eta < 4.0
            })
            .cloned()
            .collect();
        assert_eq!(filtered.tracks, expected, "event {index}");
        assert_eq!(filtered.seeds, all.seeds, "event {index}");

        kept += expected.len();
        dropped += all.tracks.len() - expected.len();
    }
    assert!(kept > 0, "no track passed the selection");
    assert!(dropped > 0, "the selection removed nothing");
}

#[test]
fn test_gbts_without_tables_fails_at_build() {
    let config = gun_config(1)
        .with_seeding(SeedingConfig::default().with_algorithm(SeedingAlgorithmTag::Gbts));

    match build_sequencer(&config) {
        Err(ChainError::Config(ConfigError::MissingTable { variant, .. })) => {
            assert_eq!(variant, "gbts")
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("pipeline built without graph seeding tables"),
    }
}

#[test]
fn test_gbts_chain_with_tables() {
    let dir = tempfile::tempdir().unwrap();
    let (selection, mapping, connector) = tracklab_test_helpers::gbts_tables();
    let paths = GbtsTablePaths {
        geometry_selection: Some(dir.path().join("selection.json")),
        layer_mapping: Some(dir.path().join("mapping.csv")),
        connector: Some(dir.path().join("connector.txt")),
    };
    std::fs::write(paths.geometry_selection.as_ref().unwrap(), selection).unwrap();
    std::fs::write(paths.layer_mapping.as_ref().unwrap(), mapping).unwrap();
    std::fs::write(paths.connector.as_ref().unwrap(), connector).unwrap();

    let config = gun_config(3).with_seeding(
        SeedingConfig::default()
            .with_algorithm(SeedingAlgorithmTag::Gbts)
            .with_tables(paths),
    );

    let summary = run(&config).unwrap();
    assert_eq!(summary.succeeded, 3);
    assert!(summary.failed.is_empty());
}

#[test]
fn test_json_output_written() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("events");
    let config = gun_config(3).with_output_directory(&output);

    let summary = run(&config).unwrap();
    assert_eq!(summary.succeeded, 3);

    for index in 0..3 {
        let path = output.join(format!("event{index:09}.json"));
        let text = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["event"], index);
        assert_eq!(value["generated_particles"].as_array().unwrap().len(), 2);
        assert!(value.get("hits").is_none());
    }
}
