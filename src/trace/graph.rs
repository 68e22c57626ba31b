use std::ops::Range;

use kurbo::Point;

use crate::chain::PixelChain;

pub type NodeId = usize;
pub type EdgeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Degree 1: a stroke end.
    End,
    /// Degree 3 or more.
    Junction,
    /// Degree 0: a lone pixel.
    Isolated,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub pixel: (u32, u32),
    pub degree: usize,
    pub incident_edges: Vec<EdgeId>,
}

impl Node {
    pub fn position(&self) -> Point {
        Point::new(self.pixel.0 as f64, self.pixel.1 as f64)
    }
}

/// A pixel run between two nodes, or a node-less closed loop.
#[derive(Debug, Clone)]
pub struct Edge {
    pub id: EdgeId,
    /// Start node; `None` for node-less loops.
    pub a: Option<NodeId>,
    /// End node; `None` for node-less loops and truncated walks.
    pub b: Option<NodeId>,
    /// Walked pixel centers, including the end node pixels.
    pub points: Vec<Point>,
    /// The slice of `points` this edge owns. Node pixels belong to the
    /// node, and a closed loop's repeated start is not counted twice.
    pub owned: Range<usize>,
    pub closed: bool,
    /// The walk ran out of unvisited neighbors before reaching a node.
    pub truncated: bool,
}

impl Edge {
    pub fn owned_points(&self) -> &[Point] {
        &self.points[self.owned.clone()]
    }

    /// The fitting input for this edge.
    pub fn chain(&self) -> Option<PixelChain> {
        if self.closed {
            PixelChain::closed(self.points.clone())
        } else {
            PixelChain::open(self.points.clone())
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Graph {
    pub width: u32,
    pub height: u32,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Graph {
    pub fn num_junctions(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Junction)
            .count()
    }

    pub fn num_ends(&self) -> usize {
        self.nodes.iter().filter(|n| n.kind == NodeKind::End).count()
    }

    pub fn iter_edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    /// Node pixels plus every edge's owned pixels. Equals the mask's
    /// foreground count for a consistent trace.
    pub fn accounted_pixels(&self) -> usize {
        self.nodes.len() + self.edges.iter().map(|e| e.owned.len()).sum::<usize>()
    }

    pub fn num_truncated(&self) -> usize {
        self.edges.iter().filter(|e| e.truncated).count()
    }
}
