//! Graph-based track seeding.
//!
//! ```text
//!  space points ──► nodes on logical layers (eta-binned)
//!                        │
//!                        ▼  connection table: outer layer ──► inner layer
//!                      edges (dr, tau, z0, curvature cuts)
//!                        │
//!                        ▼  compatible inward continuations
//!                    neighbour links ──► levels (connected components)
//!                        │
//!                        ▼  highest level first
//!                    filtered chains ──► seeds (innermost 3-4 nodes)
//! ```
//!
//! The three lookup tables are mandatory; building the seeder without one
//! of them is a configuration error.

mod filter;
mod geometry;
mod graph;
mod tables;

pub use geometry::{GbtsGeometry, LayerKind, LogicalLayer};
pub use tables::{
    Connection, ConnectionTable, GeometrySelection, LayerCode, LayerMapping, SelectionEntry,
};

use filter::TrackingFilter;
use graph::{Graph, LayerLink};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};
use tracklab_core::ConfigError;
use tracklab_detector::TrackingGeometry;
use tracklab_types::{Seed, SpacePoint, MAX_SEED_SIZE, MIN_SEED_SIZE};

const VARIANT: &str = "gbts";

/// Cuts and limits of the graph-based seed finder. Lengths in mm, momenta
/// in GeV.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GbtsConfig {
    pub min_pt: f64,
    /// Largest |η| of an edge.
    pub eta_max: f64,
    /// Collision region an edge must point back to.
    pub z_min: f64,
    pub z_max: f64,
    pub min_delta_radius: f64,
    /// Edges per event; the graph is truncated beyond this.
    pub max_edges: usize,
    /// Lowest edge level a seed may start from.
    pub min_level: u32,
    /// Overrides the connection table's eta bin width.
    pub eta_bin_width: Option<f64>,
    pub tau_ratio_cut: f64,
    pub phi_cut: f64,
    pub curvature_cut: f64,
    pub max_neighbours: usize,
    pub cca_iterations: usize,
    /// Filter states explored per starting edge.
    pub max_edge_states: usize,
}

impl Default for GbtsConfig {
    fn default() -> Self {
        Self {
            min_pt: 0.9,
            eta_max: 4.5,
            z_min: -150.0,
            z_max: 150.0,
            min_delta_radius: 2.0,
            max_edges: 2_000_000,
            min_level: 2,
            eta_bin_width: None,
            tau_ratio_cut: 0.007,
            phi_cut: 0.012,
            curvature_cut: 0.001,
            max_neighbours: 6,
            cca_iterations: 15,
            max_edge_states: 2500,
        }
    }
}

impl GbtsConfig {
    pub fn with_min_pt(mut self, min_pt: f64) -> Self {
        self.min_pt = min_pt;
        self
    }

    pub fn with_min_level(mut self, min_level: u32) -> Self {
        self.min_level = min_level;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        ConfigError::check_range("gbts.z", self.z_min, self.z_max)?;
        if !(self.min_pt >= 0.0) {
            return Err(ConfigError::invalid("gbts.min_pt", "must not be negative"));
        }
        if !(self.eta_max > 0.0) {
            return Err(ConfigError::invalid("gbts.eta_max", "must be positive"));
        }
        if let Some(width) = self.eta_bin_width {
            if !(width > 0.0) {
                return Err(ConfigError::invalid("gbts.eta_bin_width", "must be positive"));
            }
        }
        if !(self.min_delta_radius > 0.0) {
            return Err(ConfigError::invalid("gbts.min_delta_radius", "must be positive"));
        }
        if self.min_level < 2 {
            return Err(ConfigError::invalid(
                "gbts.min_level",
                "seeds need at least two linked edges",
            ));
        }
        if self.max_edges == 0 || self.max_edge_states == 0 {
            return Err(ConfigError::invalid(
                "gbts",
                "max_edges and max_edge_states must be positive",
            ));
        }
        Ok(())
    }
}

/// Locations of the lookup tables.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GbtsTablePaths {
    pub geometry_selection: Option<PathBuf>,
    pub layer_mapping: Option<PathBuf>,
    pub connector: Option<PathBuf>,
}

/// Parsed lookup tables.
#[derive(Clone, Debug)]
pub struct GbtsTables {
    pub selection: GeometrySelection,
    pub mapping: LayerMapping,
    pub connections: ConnectionTable,
}

impl GbtsTables {
    /// Load all three tables; a missing path is reported before any file
    /// is read.
    pub fn load(paths: &GbtsTablePaths) -> Result<Self, ConfigError> {
        let missing = |table| ConfigError::MissingTable {
            variant: VARIANT,
            table,
        };
        let selection = paths
            .geometry_selection
            .as_deref()
            .ok_or_else(|| missing("geometry selection"))?;
        let mapping = paths
            .layer_mapping
            .as_deref()
            .ok_or_else(|| missing("layer mapping"))?;
        let connector = paths
            .connector
            .as_deref()
            .ok_or_else(|| missing("connection"))?;

        Ok(Self {
            selection: GeometrySelection::load(selection)?,
            mapping: LayerMapping::load(mapping)?,
            connections: ConnectionTable::load(connector)?,
        })
    }
}

/// A ready-to-run graph-based seed finder for one detector.
#[derive(Debug)]
pub struct GbtsSeeding {
    config: GbtsConfig,
    geometry: GbtsGeometry,
    links: Vec<LayerLink>,
}

impl GbtsSeeding {
    pub fn build(
        config: GbtsConfig,
        tables: GbtsTables,
        detector: &dyn TrackingGeometry,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let eta_bin_width = config
            .eta_bin_width
            .unwrap_or(tables.connections.eta_bin_width);
        let geometry =
            GbtsGeometry::build(detector, &tables.selection, &tables.mapping, eta_bin_width);

        let mut links = Vec::with_capacity(tables.connections.connections.len());
        for connection in tables.connections.connections {
            let src = geometry.layer_index(connection.src);
            let dst = geometry.layer_index(connection.dst);
            match src.zip(dst) {
                Some((src, dst)) => links.push(LayerLink {
                    src,
                    dst,
                    connection,
                }),
                None => debug!(
                    src = connection.src,
                    dst = connection.dst,
                    "Connection between layers absent from the geometry ignored"
                ),
            }
        }
        // Edges are laid down in table stage order.
        links.sort_by_key(|link| link.connection.stage);

        info!(
            logical_layers = geometry.layers().len(),
            eta_bins = geometry.n_bins(),
            links = links.len(),
            "Built graph-based seeding"
        );
        Ok(Self {
            config,
            geometry,
            links,
        })
    }

    pub fn config(&self) -> &GbtsConfig {
        &self.config
    }

    pub fn geometry(&self) -> &GbtsGeometry {
        &self.geometry
    }

    /// Number of usable layer-to-layer links.
    pub fn n_links(&self) -> usize {
        self.links.len()
    }

    /// Find seeds among `points` in a field `bz` (T).
    pub fn find_seeds(&self, points: &[SpacePoint], bz: f64) -> Vec<Seed> {
        if self.links.is_empty() {
            return Vec::new();
        }
        let graph = Graph::build(points, &self.geometry, &self.links, &self.config, bz);
        let seeds = self.extract_seeds(&graph, points);
        debug!(
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            max_level = graph.max_level(),
            seeds = seeds.len(),
            "Graph-based seeding"
        );
        seeds
    }

    fn extract_seeds(&self, graph: &Graph, points: &[SpacePoint]) -> Vec<Seed> {
        let mut order: Vec<usize> = (0..graph.edges.len())
            .filter(|&i| graph.edges[i].level >= self.config.min_level)
            .collect();
        order.sort_by(|&a, &b| graph.edges[b].level.cmp(&graph.edges[a].level).then(a.cmp(&b)));

        let mut used = vec![false; graph.edges.len()];
        let mut filter = TrackingFilter::new(graph, &self.config);
        let mut seeds = Vec::new();
        for start in order {
            if used[start] {
                continue;
            }
            let Some(state) = filter.follow(start) else {
                continue;
            };
            if state.edges.iter().any(|&e| used[e]) {
                continue;
            }
            let nodes = state.nodes(graph);
            if nodes.len() < MIN_SEED_SIZE {
                continue;
            }
            for &e in &state.edges {
                used[e] = true;
            }

            let nodes = &nodes[..nodes.len().min(MAX_SEED_SIZE)];
            let first = &graph.nodes[nodes[0]];
            let second = &graph.nodes[nodes[1]];
            let z_vertex = first.z - first.r * (second.z - first.z) / (second.r - first.r);
            let measurements = nodes
                .iter()
                .map(|&n| points[graph.nodes[n].point].measurement)
                .collect();
            match Seed::new(
                measurements,
                points[first.point].region(),
                z_vertex,
                state.score,
            ) {
                Ok(seed) => seeds.push(seed),
                Err(error) => debug!(%error, "Discarded graph seed"),
            }
        }
        seeds
    }
}
