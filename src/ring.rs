use crate::state::NodeStat;
use std::collections::HashMap;
use std::f64::consts::PI;

/// Angular positions for an ordered membership list, starting at the top
/// of the ring (-pi/2) and proceeding clockwise in list order.
///
/// Stable for a fixed order; a reorder between polls re-angles every
/// node. The backend is assumed to report a stable order.
pub fn layout(nodes: &[String]) -> Vec<(String, f64)> {
    let step = 2.0 * PI / nodes.len().max(1) as f64;
    nodes
        .iter()
        .enumerate()
        .map(|(i, id)| (id.clone(), i as f64 * step - PI / 2.0))
        .collect()
}

/// Persistent visual object for one live node identity.
#[derive(Clone, Debug)]
pub struct VisualNode {
    pub id: String,
    pub angle: f64,
    pub x: f64,
    pub y: f64,
    pub stat: NodeStat,
}

/// Identity-keyed collection of visual nodes, diffed against each
/// reconciled membership list instead of rebuilt, so selection and hover
/// stick to the right identity as other nodes join or leave.
pub struct NodeGraph {
    nodes: HashMap<String, VisualNode>,
    order: Vec<String>,
    radius: f64,
}

impl NodeGraph {
    pub fn new(radius: f64) -> Self {
        Self {
            nodes: HashMap::new(),
            order: Vec::new(),
            radius,
        }
    }

    /// Diff-and-patch against the current membership: entering identities
    /// get a fresh VisualNode at their ring position, retained ones are
    /// refreshed in place, exiting ones are dropped. Afterwards the node
    /// set is in bijection with `nodes`.
    pub fn update(&mut self, nodes: &[String], stats: &HashMap<String, NodeStat>) {
        self.nodes.retain(|id, _| nodes.contains(id));

        for (id, angle) in layout(nodes) {
            let x = angle.cos() * self.radius;
            let y = angle.sin() * self.radius;
            let stat = stats.get(&id).cloned().unwrap_or_else(|| NodeStat {
                address: id.clone(),
                ..NodeStat::default()
            });

            match self.nodes.get_mut(&id) {
                Some(vn) => {
                    vn.angle = angle;
                    vn.x = x;
                    vn.y = y;
                    vn.stat = stat;
                }
                None => {
                    self.nodes.insert(
                        id.clone(),
                        VisualNode {
                            id: id.clone(),
                            angle,
                            x,
                            y,
                            stat,
                        },
                    );
                }
            }
        }

        self.order = nodes.to_vec();
    }

    pub fn get(&self, id: &str) -> Option<&VisualNode> {
        self.nodes.get(id)
    }

    /// Nodes in ring order.
    pub fn iter(&self) -> impl Iterator<Item = &VisualNode> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    pub fn ids(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// First node whose identity contains `hint`, in ring order.
    pub fn find_containing(&self, hint: &str) -> Option<&VisualNode> {
        self.order
            .iter()
            .find(|id| id.contains(hint))
            .and_then(|id| self.nodes.get(id))
    }

    pub fn nth(&self, idx: usize) -> Option<&VisualNode> {
        self.order.get(idx).and_then(|id| self.nodes.get(id))
    }
}
