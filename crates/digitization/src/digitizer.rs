//! Hit grouping, merging and smearing.

use crate::config::SmearingMap;
use rand::Rng;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;
use tracklab_detector::{Surface, TrackingGeometry};
use tracklab_types::{
    GeometryId, HitIndex, Matrix2, Measurement, MeasurementIndex, SimulatedHit, Vector2,
};

/// A hit could not be digitized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DigitizationError {
    #[error("hit on surface {0} which is not part of the geometry")]
    UnknownSurface(GeometryId),

    #[error("no smearing configuration for surface {0}")]
    MissingSmearing(GeometryId),
}

struct Cluster {
    local: Vector2<f64>,
    hits: Vec<HitIndex>,
}

impl Cluster {
    fn add(&mut self, local: Vector2<f64>, hit: HitIndex) {
        let n = self.hits.len() as f64;
        self.local = (self.local * n + local) / (n + 1.0);
        self.hits.push(hit);
    }
}

/// Turn hits into measurements.
///
/// Surfaces are processed in `GeometryId` order and hits within a surface
/// in input order, so the output is fully determined by the input and the
/// generator state.
pub fn digitize(
    hits: &[SimulatedHit],
    geometry: &dyn TrackingGeometry,
    smearing: &SmearingMap,
    rng: &mut impl Rng,
) -> Result<Vec<Measurement>, DigitizationError> {
    let mut by_surface: BTreeMap<GeometryId, Vec<usize>> = BTreeMap::new();
    for (i, hit) in hits.iter().enumerate() {
        by_surface.entry(hit.surface).or_default().push(i);
    }

    let mut measurements = Vec::with_capacity(hits.len());
    let mut dropped = 0usize;
    for (id, indices) in by_surface {
        let surface = geometry
            .surface(id)
            .ok_or(DigitizationError::UnknownSurface(id))?;
        let region = smearing
            .lookup(id)
            .ok_or(DigitizationError::MissingSmearing(id))?;

        for cluster in cluster_hits(surface, hits, &indices, smearing.merge_distance()) {
            let smeared = region
                .loc0
                .smear(cluster.local.x, rng)
                .zip(region.loc1.smear(cluster.local.y, rng));
            let Some(((loc0, var0), (loc1, var1))) = smeared else {
                dropped += 1;
                continue;
            };
            let local = Vector2::new(loc0, loc1);
            measurements.push(Measurement {
                index: MeasurementIndex(measurements.len() as u32),
                surface: id,
                local,
                covariance: Matrix2::new(var0, 0.0, 0.0, var1),
                global: surface.local_to_global(&local),
                hits: cluster.hits,
            });
        }
    }

    if dropped > 0 {
        debug!(dropped, "Dropped clusters outside the smearing range");
    }
    Ok(measurements)
}

/// Greedily merge hits closer than `merge_distance` to a cluster centroid.
fn cluster_hits(
    surface: &Surface,
    hits: &[SimulatedHit],
    indices: &[usize],
    merge_distance: f64,
) -> Vec<Cluster> {
    let mut clusters: Vec<Cluster> = Vec::with_capacity(indices.len());
    for &i in indices {
        let local = surface.global_to_local(&hits[i].position);
        let hit = HitIndex(i as u32);
        let target = (merge_distance > 0.0)
            .then(|| {
                clusters
                    .iter_mut()
                    .find(|c| (c.local - local).norm() < merge_distance)
            })
            .flatten();
        match target {
            Some(cluster) => cluster.add(local, hit),
            None => clusters.push(Cluster {
                local,
                hits: vec![hit],
            }),
        }
    }
    clusters
}
