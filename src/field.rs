//! Node population: timed decay, bounded size, adjacency connections.

use glam::Vec3;
use std::collections::VecDeque;

use crate::params::Settings;

/// Amplitude above which a node is classified as high-energy at creation
pub const HIGH_ENERGY_GATE: f32 = 0.5;

/// Connection opacity = average pair life x this base
const CONNECTION_BASE_OPACITY: f32 = 0.8;

/// One spawned visual unit.
///
/// Position, decay rate, amplitude and the high-energy flag are frozen at
/// creation; only `life` changes afterwards, by exactly one decrement per
/// frame.
#[derive(Debug, Clone)]
pub struct Node {
    pub position: Vec3,
    pub life: f32,
    pub decay: f32,
    pub amplitude: f32,
    pub peak_magnitude: u8,
    pub high_energy: bool,
    pub size: f32,
}

impl Node {
    pub fn new(position: Vec3, amplitude: f32, peak_magnitude: u8, settings: &Settings) -> Self {
        Self {
            position,
            life: 1.0,
            decay: settings.decay_per_frame(),
            amplitude,
            peak_magnitude,
            high_energy: amplitude > HIGH_ENERGY_GATE,
            size: settings.node_size,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.life > 0.0
    }
}

/// Link between two consecutive nodes, recomputed every frame
#[derive(Debug, Clone)]
pub struct Connection {
    pub from: Vec3,
    pub to: Vec3,
    pub opacity: f32,
}

/// The bounded, ordered node population.
///
/// Insertion order is creation order. The cap is enforced by evicting
/// from the front, so survivors after any eviction are exactly the most
/// recently created nodes.
pub struct NodeField {
    nodes: VecDeque<Node>,
    connections: Vec<Connection>,
    max_nodes: usize,
}

impl NodeField {
    pub fn new(max_nodes: usize) -> Self {
        Self {
            nodes: VecDeque::new(),
            connections: Vec::new(),
            max_nodes,
        }
    }

    /// Append a newly created node, evicting the oldest past the cap
    pub fn spawn(&mut self, node: Node) {
        self.nodes.push_back(node);
        while self.nodes.len() > self.max_nodes {
            self.nodes.pop_front();
        }
    }

    /// Advance every node by one frame tick.
    ///
    /// Decays all life values, drops dead nodes (order preserved among
    /// survivors) and rebuilds the connection set. Returns how many nodes
    /// expired this tick.
    pub fn advance(&mut self) -> usize {
        for node in &mut self.nodes {
            node.life -= node.decay;
        }

        let before = self.nodes.len();
        self.nodes.retain(Node::is_alive);
        let expired = before - self.nodes.len();

        self.rebuild_connections();
        expired
    }

    fn rebuild_connections(&mut self) {
        self.connections.clear();
        for (current, next) in self.nodes.iter().zip(self.nodes.iter().skip(1)) {
            let avg_life = (current.life + next.life) / 2.0;
            self.connections.push(Connection {
                from: current.position,
                to: next.position,
                opacity: avg_life * CONNECTION_BASE_OPACITY,
            });
        }
    }

    /// Drop every node and connection unconditionally
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.connections.clear();
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in creation order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }
}
