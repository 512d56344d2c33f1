//! Track following through the segment graph.
//!
//! A chain of edges is followed inward from a starting edge. Each node
//! updates two independent linear filters: one in the transverse plane,
//! in a frame rotated onto the starting edge, with state
//! (y, dy/dx, d²y/dx²), and one in r–z with state (z, dz/dr). Nodes are
//! rewarded by a fixed amount and penalised by their χ², and the chain with
//! the highest score wins.

use super::graph::{Graph, Node};
use super::GbtsConfig;
use nalgebra::{Matrix2, Matrix3, Vector2, Vector3};

const SIGMA_T: f64 = 0.0003;
const SIGMA_W: f64 = 0.00009;
const SIGMA_MS: f64 = 0.016;
const SIGMA_X: f64 = 0.25;
const SIGMA_Y: f64 = 2.5;
const WEIGHT_X: f64 = 0.5;
const WEIGHT_Y: f64 = 0.5;
const ADD_HIT: f64 = 14.0;
const MAX_CHI2: f64 = 60.0;

/// Filter state of a partially followed chain.
#[derive(Debug, Clone)]
pub(crate) struct EdgeState {
    /// Edges from the outermost inward.
    pub edges: Vec<usize>,
    /// Chain score.
    pub score: f64,
    origin: Vector2<f64>,
    axis: Vector2<f64>,
    x: Vector3<f64>,
    cx: Matrix3<f64>,
    y: Vector2<f64>,
    cy: Matrix2<f64>,
    last_x: f64,
    last_r: f64,
}

impl EdgeState {
    fn initialize(graph: &Graph, edge: usize) -> Option<Self> {
        let e = &graph.edges[edge];
        let outer = &graph.nodes[e.outer];
        let inner = &graph.nodes[e.inner];
        let origin = position(outer);
        let axis = (position(inner) - origin).try_normalize(1e-9)?;
        let tau = (outer.z - inner.z) / (outer.r - inner.r);

        let mut state = Self {
            edges: vec![edge],
            score: 0.0,
            origin,
            axis,
            x: Vector3::zeros(),
            cx: Matrix3::from_diagonal(&Vector3::new(0.25, 0.001, 0.001)),
            y: Vector2::new(outer.z, tau),
            cy: Matrix2::from_diagonal(&Vector2::new(1.5, 0.001)),
            last_x: 0.0,
            last_r: outer.r,
        };
        state.update(inner).then_some(state)
    }

    /// Add a node to the chain. Returns false if the node is incompatible,
    /// leaving the state in an unspecified condition.
    fn update(&mut self, node: &Node) -> bool {
        let offset = position(node) - self.origin;
        let normal = Vector2::new(-self.axis.y, self.axis.x);
        let x = offset.dot(&self.axis);
        let measured_y = offset.dot(&normal);

        let dx = x - self.last_x;
        let fx = Matrix3::new(1.0, dx, 0.5 * dx * dx, 0.0, 1.0, dx, 0.0, 0.0, 1.0);
        let predicted_x = fx * self.x;
        let mut cx = fx * self.cx * fx.transpose();
        cx[(1, 1)] += SIGMA_T * SIGMA_T;
        cx[(2, 2)] += SIGMA_W * SIGMA_W;

        let dr = node.r - self.last_r;
        let fy = Matrix2::new(1.0, dr, 0.0, 1.0);
        let predicted_y = fy * self.y;
        let mut cy = fy * self.cy * fy.transpose();
        cy[(1, 1)] += SIGMA_MS * SIGMA_MS;

        let residual_x = measured_y - predicted_x[0];
        let variance_x = cx[(0, 0)] + SIGMA_X * SIGMA_X;
        let chi2_x = residual_x * residual_x / variance_x;

        let residual_y = node.z - predicted_y[0];
        let variance_y = cy[(0, 0)] + SIGMA_Y * SIGMA_Y;
        let chi2_y = residual_y * residual_y / variance_y;

        if chi2_x > MAX_CHI2 || chi2_y > MAX_CHI2 {
            return false;
        }

        let gain_x: Vector3<f64> = cx.column(0) / variance_x;
        self.x = predicted_x + gain_x * residual_x;
        self.cx = cx - gain_x * cx.row(0);

        let gain_y: Vector2<f64> = cy.column(0) / variance_y;
        self.y = predicted_y + gain_y * residual_y;
        self.cy = cy - gain_y * cy.row(0);

        self.last_x = x;
        self.last_r = node.r;
        self.score += ADD_HIT - WEIGHT_X * chi2_x - WEIGHT_Y * chi2_y;
        true
    }

    /// Nodes of the chain ordered from the innermost outward.
    pub fn nodes(&self, graph: &Graph) -> Vec<usize> {
        let mut nodes = Vec::with_capacity(self.edges.len() + 1);
        if let Some(&first) = self.edges.first() {
            nodes.push(graph.edges[first].outer);
        }
        nodes.extend(self.edges.iter().map(|&e| graph.edges[e].inner));
        nodes.reverse();
        nodes
    }
}

fn position(node: &Node) -> Vector2<f64> {
    Vector2::new(node.r * node.phi.cos(), node.r * node.phi.sin())
}

/// Follows chains of decreasing level from a starting edge.
pub(crate) struct TrackingFilter<'a> {
    graph: &'a Graph,
    max_states: usize,
    states: usize,
}

impl<'a> TrackingFilter<'a> {
    pub fn new(graph: &'a Graph, config: &GbtsConfig) -> Self {
        Self {
            graph,
            max_states: config.max_edge_states,
            states: 0,
        }
    }

    /// Best-scoring chain starting at `edge`.
    pub fn follow(&mut self, edge: usize) -> Option<EdgeState> {
        self.states = 0;
        let initial = EdgeState::initialize(self.graph, edge)?;
        let mut best = None;
        self.extend(edge, initial, &mut best);
        best
    }

    fn extend(&mut self, edge: usize, state: EdgeState, best: &mut Option<EdgeState>) {
        let graph = self.graph;
        self.states += 1;
        let current = &graph.edges[edge];
        let mut extended = false;
        for &next in &current.neighbours {
            if self.states >= self.max_states {
                break;
            }
            let candidate = &graph.edges[next];
            if candidate.level + 1 != current.level {
                continue;
            }
            let mut branch = state.clone();
            if branch.update(&graph.nodes[candidate.inner]) {
                branch.edges.push(next);
                extended = true;
                self.extend(next, branch, best);
            }
        }
        if !extended && best.as_ref().map_or(true, |b| state.score > b.score) {
            *best = Some(state);
        }
    }
}
