//! Segment graph: nodes, edges, neighbour links and levels.

use super::geometry::GbtsGeometry;
use super::tables::Connection;
use super::GbtsConfig;
use std::f64::consts::PI;
use tracing::warn;
use tracklab_types::kinematics::{wrap_phi, CURVATURE_CONSTANT};
use tracklab_types::SpacePoint;

/// Edges a single node may start.
const MAX_SEG_PER_NODE: usize = 1000;

/// A space point placed on a logical layer.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Node {
    pub point: usize,
    pub layer: usize,
    pub r: f64,
    pub z: f64,
    pub phi: f64,
}

/// A segment from an outer to an inner node.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Edge {
    pub outer: usize,
    pub inner: usize,
    /// e^-η of the segment direction.
    pub exp_eta: f64,
    /// Azimuth change per unit radius.
    pub curvature: f64,
    /// Azimuth extrapolated to the beam line.
    pub phi0: f64,
    /// Compatible edges continuing inward from `inner`.
    pub neighbours: Vec<usize>,
    pub level: u32,
}

/// A connection between two logical layers present in the geometry.
#[derive(Debug, Clone)]
pub(crate) struct LayerLink {
    pub src: usize,
    pub dst: usize,
    pub connection: Connection,
}

#[derive(Debug, Default)]
pub(crate) struct Graph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Graph {
    /// Place space points on logical layers, form edges along the allowed
    /// links, connect neighbouring edges and assign levels.
    pub fn build(
        points: &[SpacePoint],
        geometry: &GbtsGeometry,
        links: &[LayerLink],
        config: &GbtsConfig,
        bz: f64,
    ) -> Self {
        let mut graph = Graph::default();
        let mut bins: Vec<Vec<usize>> = vec![Vec::new(); geometry.n_bins()];
        for (i, point) in points.iter().enumerate() {
            let Some(layer) = geometry.layer_of(point.surface) else {
                continue;
            };
            let logical = &geometry.layers()[layer];
            let r = point.r();
            if r <= 0.0 {
                continue;
            }
            let bin = logical.first_bin + logical.bin_of((point.z() / r).asinh());
            bins[bin].push(graph.nodes.len());
            graph.nodes.push(Node {
                point: i,
                layer,
                r,
                z: point.z(),
                phi: point.phi(),
            });
        }
        for bin in &mut bins {
            bin.sort_by(|&a, &b| graph.nodes[a].phi.total_cmp(&graph.nodes[b].phi));
        }

        graph.add_edges(&bins, geometry, links, config, bz);
        graph.link_neighbours(config);
        graph.assign_levels(config.cca_iterations);
        graph
    }

    fn add_edges(
        &mut self,
        bins: &[Vec<usize>],
        geometry: &GbtsGeometry,
        links: &[LayerLink],
        config: &GbtsConfig,
        bz: f64,
    ) {
        let max_curvature = if config.min_pt > 0.0 {
            CURVATURE_CONSTANT * bz.abs() / 2.0 / (0.8 * config.min_pt)
        } else {
            f64::INFINITY
        };
        let max_tau = config.eta_max.sinh();
        let mut per_node = vec![0usize; self.nodes.len()];

        for link in links {
            let src = &geometry.layers()[link.src];
            let dst = &geometry.layers()[link.dst];
            for src_bin in 0..src.n_bins {
                for dst_bin in 0..dst.n_bins {
                    if !link.connection.allows(src_bin, src.n_bins, dst_bin, dst.n_bins) {
                        continue;
                    }
                    let inner_nodes = &bins[dst.first_bin + dst_bin];
                    for &outer in &bins[src.first_bin + src_bin] {
                        let n1 = &self.nodes[outer];
                        let window = 0.001 + max_curvature.min(PI) * n1.r;
                        for inner in phi_window(&self.nodes, inner_nodes, n1.phi, window) {
                            if per_node[outer] >= MAX_SEG_PER_NODE {
                                break;
                            }
                            let Some(edge) =
                                self.segment(outer, inner, config, max_curvature, max_tau)
                            else {
                                continue;
                            };
                            if self.edges.len() >= config.max_edges {
                                warn!(
                                    max_edges = config.max_edges,
                                    "Edge limit reached, graph is truncated"
                                );
                                return;
                            }
                            per_node[outer] += 1;
                            self.edges.push(edge);
                        }
                    }
                }
            }
        }
    }

    fn segment(
        &self,
        outer: usize,
        inner: usize,
        config: &GbtsConfig,
        max_curvature: f64,
        max_tau: f64,
    ) -> Option<Edge> {
        let n1 = &self.nodes[outer];
        let n2 = &self.nodes[inner];
        let dr = n1.r - n2.r;
        if dr < config.min_delta_radius {
            return None;
        }
        let tau = (n1.z - n2.z) / dr;
        if tau.abs() > max_tau {
            return None;
        }
        let z0 = n2.z - n2.r * tau;
        if z0 < config.z_min || z0 > config.z_max {
            return None;
        }
        let curvature = wrap_phi(n1.phi - n2.phi) / dr;
        // Forward segments are allowed less bending.
        let max_kappa = if tau.abs() < 4.0 {
            0.8f64.sqrt() * max_curvature
        } else {
            0.6f64.sqrt() * max_curvature
        };
        if curvature.abs() > max_kappa {
            return None;
        }
        Some(Edge {
            outer,
            inner,
            exp_eta: (1.0 + tau * tau).sqrt() - tau,
            curvature,
            phi0: wrap_phi(n2.phi - curvature * n2.r),
            neighbours: Vec::new(),
            level: 1,
        })
    }

    fn link_neighbours(&mut self, config: &GbtsConfig) {
        let mut by_outer: Vec<Vec<usize>> = vec![Vec::new(); self.nodes.len()];
        for (i, edge) in self.edges.iter().enumerate() {
            by_outer[edge.outer].push(i);
        }
        for i in 0..self.edges.len() {
            let edge = &self.edges[i];
            let mut compatible: Vec<(f64, usize)> = by_outer[edge.inner]
                .iter()
                .filter_map(|&j| {
                    let next = &self.edges[j];
                    if (next.exp_eta / edge.exp_eta - 1.0).abs() > config.tau_ratio_cut {
                        return None;
                    }
                    if wrap_phi(next.phi0 - edge.phi0).abs() > config.phi_cut {
                        return None;
                    }
                    let delta_curvature = (next.curvature - edge.curvature).abs();
                    (delta_curvature <= config.curvature_cut).then_some((delta_curvature, j))
                })
                .collect();
            compatible.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
            compatible.truncate(config.max_neighbours);
            self.edges[i].neighbours = compatible.into_iter().map(|(_, j)| j).collect();
        }
    }

    /// Iterative connected-component analysis: an edge moves up a level
    /// while one of its neighbours shares its level.
    fn assign_levels(&mut self, iterations: usize) {
        for _ in 0..iterations {
            let next: Vec<u32> = self
                .edges
                .iter()
                .map(|edge| {
                    let promoted = edge
                        .neighbours
                        .iter()
                        .any(|&j| self.edges[j].level == edge.level);
                    edge.level + u32::from(promoted)
                })
                .collect();
            let mut changed = false;
            for (edge, level) in self.edges.iter_mut().zip(next) {
                if edge.level != level {
                    edge.level = level;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
    }

    pub fn max_level(&self) -> u32 {
        self.edges.iter().map(|e| e.level).max().unwrap_or(0)
    }
}

/// Nodes of a phi-sorted bin within `half_width` of `center`, including
/// across the ±π boundary.
fn phi_window(nodes: &[Node], sorted: &[usize], center: f64, half_width: f64) -> Vec<usize> {
    if half_width >= PI {
        return sorted.to_vec();
    }
    let mut found = Vec::new();
    for shift in [-2.0 * PI, 0.0, 2.0 * PI] {
        let low = center - half_width + shift;
        let high = center + half_width + shift;
        if high < -PI || low > PI {
            continue;
        }
        let start = sorted.partition_point(|&i| nodes[i].phi < low);
        found.extend(
            sorted[start..]
                .iter()
                .take_while(|&&i| nodes[i].phi <= high)
                .copied(),
        );
    }
    found
}
