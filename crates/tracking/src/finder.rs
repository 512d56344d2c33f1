//! Branching track finder.
//!
//! Each seed is fitted and extended outward layer by layer. On a sensitive
//! layer every measurement compatible with the extrapolation opens a
//! branch, up to the configured limits; a layer without one counts as a
//! missed layer. The best branch of each seed becomes a candidate.

use crate::ambiguity::resolve_ambiguities;
use crate::config::TrackFindingConfig;
use crate::fit::{fit_helix, FitPoint, HelixFit};
use nalgebra::Vector3;
use std::collections::HashMap;
use tracing::{debug, trace};
use tracklab_detector::{Crossing, Helix, MagneticField, TrackingGeometry};
use tracklab_types::{Measurement, MeasurementIndex, RegionId, Seed, TrackCandidate};

/// Minimum variance of a fit coordinate (mm²).
const MIN_VARIANCE: f64 = 1e-6;

/// Geometry, field and measurements of one event.
struct EventView<'a> {
    measurements: &'a [Measurement],
    by_region: HashMap<RegionId, Vec<usize>>,
    geometry: &'a dyn TrackingGeometry,
    field: &'a dyn MagneticField,
}

impl<'a> EventView<'a> {
    fn new(
        measurements: &'a [Measurement],
        geometry: &'a dyn TrackingGeometry,
        field: &'a dyn MagneticField,
    ) -> Self {
        let mut by_region: HashMap<RegionId, Vec<usize>> = HashMap::new();
        for (i, measurement) in measurements.iter().enumerate() {
            by_region.entry(measurement.region()).or_default().push(i);
        }
        Self {
            measurements,
            by_region,
            geometry,
            field,
        }
    }

    fn measurement(&self, index: MeasurementIndex) -> Option<&'a Measurement> {
        self.measurements.get(index.as_usize())
    }

    fn fit_point(&self, measurement: &Measurement) -> FitPoint {
        let barrel = self
            .geometry
            .layer(measurement.region())
            .map_or(true, |layer| layer.is_barrel());
        let (var_transverse, var_longitudinal) = if barrel {
            (measurement.var_loc0(), measurement.var_loc1())
        } else {
            let slope = measurement.z() / measurement.r().max(1.0);
            (measurement.var_loc1(), measurement.var_loc0() * slope * slope)
        };
        FitPoint {
            position: measurement.global,
            var_transverse: var_transverse.max(MIN_VARIANCE),
            var_longitudinal: var_longitudinal.max(MIN_VARIANCE),
        }
    }

    fn fit(&self, measurements: &[MeasurementIndex]) -> Option<HelixFit> {
        let points = measurements
            .iter()
            .map(|&m| self.measurement(m).map(|m| self.fit_point(m)))
            .collect::<Option<Vec<_>>>()?;
        fit_helix(&points)
    }

    /// Measurements on the crossed layer compatible with the prediction,
    /// best first.
    fn compatible(
        &self,
        crossing: &Crossing,
        branch: &Branch,
        config: &TrackFindingConfig,
    ) -> Vec<(MeasurementIndex, f64)> {
        let region = self.geometry.layers()[crossing.layer].region();
        let extrapolation_var = config.extrapolation_sigma * config.extrapolation_sigma;
        let mut found: Vec<(MeasurementIndex, f64)> = self
            .by_region
            .get(&region)
            .into_iter()
            .flatten()
            .filter_map(|&i| {
                let measurement = &self.measurements[i];
                if branch.measurements.contains(&measurement.index) {
                    return None;
                }
                let surface = self.geometry.surface(measurement.surface)?;
                let residual = measurement.local - surface.global_to_local(&crossing.position);
                let chi2 = residual.x * residual.x / (measurement.var_loc0() + extrapolation_var)
                    + residual.y * residual.y / (measurement.var_loc1() + extrapolation_var);
                (chi2 < config.chi2_cut).then_some((measurement.index, chi2))
            })
            .collect();
        found.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        found.truncate(config.max_branches_per_layer);
        found
    }
}

/// One trajectory hypothesis under construction.
#[derive(Debug, Clone)]
struct Branch {
    measurements: Vec<MeasurementIndex>,
    fit: HelixFit,
    position: Vector3<f64>,
    direction: Vector3<f64>,
    holes: u32,
    /// Layers missed since the last measurement.
    missed: u32,
    steps: u32,
}

impl Branch {
    fn helix(&self, field: &dyn MagneticField) -> Helix {
        let bz = field.bz_at(&self.position);
        let parameters = self.fit.parameters(bz);
        if parameters.q_over_p == 0.0 {
            Helix::new(self.position, self.direction, 1.0, 0.0, bz)
        } else {
            Helix::new(
                self.position,
                self.direction,
                parameters.p(),
                parameters.charge(),
                bz,
            )
        }
    }

    fn advance(&mut self, crossing: &Crossing) {
        self.position = crossing.position;
        self.direction = crossing.direction;
    }

    /// Branch continued with a measurement; `None` if the refit fails.
    fn extend(&self, view: &EventView<'_>, index: MeasurementIndex) -> Option<Branch> {
        let measurement = view.measurement(index)?;
        let mut measurements = self.measurements.clone();
        measurements.push(index);
        let fit = view.fit(&measurements)?;
        Some(Branch {
            direction: fit.direction_at(&measurement.global),
            position: measurement.global,
            measurements,
            fit,
            holes: self.holes + self.missed,
            missed: 0,
            steps: self.steps,
        })
    }

    fn is_better_than(&self, other: &Branch) -> bool {
        let (n, m) = (self.measurements.len(), other.measurements.len());
        n > m || (n == m && self.chi2_per_ndf() < other.chi2_per_ndf())
    }

    fn chi2_per_ndf(&self) -> f64 {
        self.fit.chi2 / f64::from(self.fit.ndf.max(1))
    }
}

/// Extend every seed into a track candidate and resolve shared
/// measurements between the candidates.
///
/// Candidates carry the index of their seed. Seeds whose measurements
/// cannot be fitted produce no candidate.
pub fn find_tracks(
    seeds: &[Seed],
    measurements: &[Measurement],
    geometry: &dyn TrackingGeometry,
    field: &dyn MagneticField,
    config: &TrackFindingConfig,
) -> Vec<TrackCandidate> {
    let view = EventView::new(measurements, geometry, field);
    let bz = field.bz_at(&Vector3::zeros());

    let candidates: Vec<TrackCandidate> = seeds
        .iter()
        .enumerate()
        .filter_map(|(seed_index, seed)| {
            let best = extend_seed(&view, seed, config)?;
            if best.measurements.len() < config.min_measurements {
                trace!(
                    seed = seed_index,
                    measurements = best.measurements.len(),
                    "Candidate too short"
                );
                return None;
            }
            Some(TrackCandidate {
                seed: seed_index,
                parameters: best.fit.parameters(bz),
                chi2: best.fit.chi2,
                ndf: best.fit.ndf,
                holes: best.holes,
                shared: 0,
                measurements: best.measurements,
            })
        })
        .collect();

    let before = candidates.len();
    let tracks = resolve_ambiguities(candidates, config.max_overlap);
    debug!(
        seeds = seeds.len(),
        candidates = before,
        tracks = tracks.len(),
        "Resolved track candidates"
    );
    tracks
}

/// Best branch grown from one seed.
fn extend_seed(view: &EventView<'_>, seed: &Seed, config: &TrackFindingConfig) -> Option<Branch> {
    let mut ordered: Vec<&Measurement> = seed
        .measurements()
        .iter()
        .map(|&m| view.measurement(m))
        .collect::<Option<_>>()?;
    ordered.sort_by(|a, b| a.r().total_cmp(&b.r()));
    let seed_measurements: Vec<MeasurementIndex> = ordered.iter().map(|m| m.index).collect();

    let fit = view.fit(&seed_measurements)?;
    let outermost = ordered.last()?;
    let mut active = vec![Branch {
        direction: fit.direction_at(&outermost.global),
        position: outermost.global,
        measurements: seed_measurements,
        fit,
        holes: 0,
        missed: 0,
        steps: 0,
    }];
    let mut created = 1;
    let mut best: Option<Branch> = None;

    while let Some(mut branch) = active.pop() {
        while branch.steps < config.max_steps {
            branch.steps += 1;
            let Some(crossing) = view.geometry.next_crossing(&branch.helix(view.field)) else {
                break;
            };
            if !view.geometry.layers()[crossing.layer].is_sensitive() {
                branch.advance(&crossing);
                continue;
            }

            let compatible = view.compatible(&crossing, &branch, config);
            if compatible.is_empty() {
                branch.missed += 1;
                if branch.holes + branch.missed > config.max_holes {
                    break;
                }
                branch.advance(&crossing);
                continue;
            }

            let mut children = compatible
                .iter()
                .filter_map(|&(index, _)| branch.extend(view, index));
            let Some(first) = children.next() else {
                break;
            };
            for child in children {
                if created >= config.max_branches {
                    break;
                }
                created += 1;
                active.push(child);
            }
            branch = first;
        }

        if best.as_ref().map_or(true, |b| branch.is_better_than(b)) {
            best = Some(branch);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tracklab_detector::{ConstantField, DetectorGeometry};
    use tracklab_test_helpers::helix_track_measurements;
    use tracklab_types::Vector2;

    fn seed(indices: &[u32]) -> Seed {
        Seed::new(
            indices.iter().copied().map(MeasurementIndex).collect(),
            RegionId::new(8, 2),
            0.0,
            1.0,
        )
        .unwrap()
    }

    fn indices(track: &TrackCandidate) -> Vec<u32> {
        track.measurements.iter().map(|m| m.0).collect()
    }

    #[test]
    fn test_seed_extended_through_all_layers() {
        let geometry = DetectorGeometry::generic().unwrap();
        let field = ConstantField::solenoid(2.0);
        let measurements = helix_track_measurements(&geometry, 2.0, 2.0, 0.5, 0.7, 1.0, 10.0, 0);
        assert_eq!(measurements.len(), 9);

        let tracks = find_tracks(
            &[seed(&[0, 1, 2])],
            &measurements,
            &geometry,
            &field,
            &TrackFindingConfig::default(),
        );
        assert_eq!(tracks.len(), 1);
        let track = &tracks[0];
        assert_eq!(indices(track), (0..9).collect::<Vec<_>>());
        assert_eq!(track.seed, 0);
        assert_eq!(track.holes, 0);
        assert_eq!(track.shared, 0);
        assert_eq!(track.ndf, 13);
        assert_relative_eq!(track.parameters.pt(), 2.0, max_relative = 1e-4);
        assert_relative_eq!(track.parameters.z0, 10.0, epsilon = 1e-3);
    }

    #[test]
    fn test_missing_measurement_is_a_hole() {
        let geometry = DetectorGeometry::generic().unwrap();
        let field = ConstantField::solenoid(2.0);
        let mut measurements =
            helix_track_measurements(&geometry, 2.0, 2.0, 0.5, 0.7, 1.0, 10.0, 0);
        // Displace the second strip measurement far off the trajectory.
        measurements[5].local += Vector2::new(50.0, 0.0);

        let tracks = find_tracks(
            &[seed(&[0, 1, 2])],
            &measurements,
            &geometry,
            &field,
            &TrackFindingConfig::default(),
        );
        assert_eq!(tracks.len(), 1);
        assert_eq!(indices(&tracks[0]), vec![0, 1, 2, 3, 4, 6, 7, 8]);
        assert_eq!(tracks[0].holes, 1);
    }

    #[test]
    fn test_too_many_holes_stops_the_branch() {
        let geometry = DetectorGeometry::generic().unwrap();
        let field = ConstantField::solenoid(2.0);
        let mut measurements =
            helix_track_measurements(&geometry, 2.0, 2.0, 0.5, 0.7, 1.0, 10.0, 0);
        for i in [5, 6] {
            measurements[i].local += Vector2::new(50.0, 0.0);
        }

        let config = TrackFindingConfig::default()
            .with_max_holes(1)
            .with_min_measurements(3);
        let tracks = find_tracks(&[seed(&[0, 1, 2])], &measurements, &geometry, &field, &config);
        assert_eq!(indices(&tracks[0]), vec![0, 1, 2, 3, 4]);
        assert_eq!(tracks[0].holes, 0);

        let config = config.with_min_measurements(6);
        assert!(
            find_tracks(&[seed(&[0, 1, 2])], &measurements, &geometry, &field, &config).is_empty()
        );
    }

    #[test]
    fn test_separate_tracks_do_not_mix() {
        let geometry = DetectorGeometry::generic().unwrap();
        let field = ConstantField::solenoid(2.0);
        let mut measurements =
            helix_track_measurements(&geometry, 2.0, 2.0, 0.5, 0.7, 1.0, 10.0, 0);
        measurements.extend(helix_track_measurements(
            &geometry, 2.0, 1.2, -0.2, 2.5, -1.0, -5.0, 9,
        ));
        assert_eq!(measurements.len(), 18);

        let tracks = find_tracks(
            &[seed(&[0, 1, 2]), seed(&[9, 10, 11])],
            &measurements,
            &geometry,
            &field,
            &TrackFindingConfig::default(),
        );
        assert_eq!(tracks.len(), 2);
        assert_eq!(indices(&tracks[0]), (0..9).collect::<Vec<_>>());
        assert_eq!(indices(&tracks[1]), (9..18).collect::<Vec<_>>());
        assert_eq!(tracks[1].parameters.charge(), -1.0);
    }

    #[test]
    fn test_duplicate_seeds_resolved_to_one_track() {
        let geometry = DetectorGeometry::generic().unwrap();
        let field = ConstantField::solenoid(2.0);
        let measurements = helix_track_measurements(&geometry, 2.0, 2.0, 0.5, 0.7, 1.0, 10.0, 0);

        let tracks = find_tracks(
            &[seed(&[0, 1, 2]), seed(&[1, 2, 3])],
            &measurements,
            &geometry,
            &field,
            &TrackFindingConfig::default(),
        );
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].n_measurements(), 9);
    }

    #[test]
    fn test_seed_with_missing_measurement_is_skipped() {
        let geometry = DetectorGeometry::generic().unwrap();
        let field = ConstantField::solenoid(2.0);
        let measurements = helix_track_measurements(&geometry, 2.0, 2.0, 0.5, 0.7, 1.0, 10.0, 0);
        let tracks = find_tracks(
            &[seed(&[0, 1, 40])],
            &measurements,
            &geometry,
            &field,
            &TrackFindingConfig::default(),
        );
        assert!(tracks.is_empty());
    }
}
