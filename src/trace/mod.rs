//! Pixel mask → graph of junction/end nodes and pixel-chain edges.
//!
//! Connectivity is 8-way with cardinal preference: a diagonal step is not a
//! link when either cardinal pixel bridging the same pair is foreground, so
//! a stair-step corner reads as one path instead of a triangle. Pixels whose
//! degree is not 2 become nodes; every maximal degree-2 run is walked into
//! an edge. Whatever degree-2 pixels remain afterwards form node-less loops.

mod graph;

pub use graph::{Edge, EdgeId, Graph, Node, NodeId, NodeKind};

use kurbo::Point;
use log::debug;

use crate::mask::PixelMask;

const DX: [i64; 8] = [1, 1, 0, -1, -1, -1, 0, 1];
const DY: [i64; 8] = [0, -1, -1, -1, 0, 1, 1, 1];

/// Trace a mask into its path graph.
pub fn build_graph(mask: &PixelMask) -> Graph {
    let mut tracer = Tracer::new(mask);
    tracer.trace_from_nodes();
    tracer.trace_loops();
    let graph = tracer.finish();

    debug!(
        "traced {} nodes ({} junctions, {} ends), {} edges, {} truncated",
        graph.nodes.len(),
        graph.num_junctions(),
        graph.num_ends(),
        graph.edges.len(),
        graph.num_truncated(),
    );
    graph
}

struct Walk {
    pixels: Vec<usize>,
    end_node: Option<NodeId>,
    closed: bool,
    truncated: bool,
}

struct Tracer {
    width: usize,
    height: usize,
    active: Vec<bool>,
    node_at: Vec<Option<NodeId>>,
    owned: Vec<bool>,
    used_link: Vec<u8>,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

impl Tracer {
    fn new(mask: &PixelMask) -> Self {
        let width = mask.width() as usize;
        let height = mask.height() as usize;
        let n = width * height;

        let mut active = vec![false; n];
        for (x, y) in mask.iter_foreground() {
            active[y as usize * width + x as usize] = true;
        }

        let mut tracer = Self {
            width,
            height,
            active,
            node_at: vec![None; n],
            owned: vec![false; n],
            used_link: vec![0; n],
            nodes: Vec::new(),
            edges: Vec::new(),
        };

        for p in 0..n {
            if !tracer.active[p] {
                continue;
            }
            let degree = (0..8u8)
                .filter(|&dir| tracer.connected_neighbor(p, dir).is_some())
                .count();
            if degree == 2 {
                continue;
            }
            let id = tracer.nodes.len();
            tracer.node_at[p] = Some(id);
            tracer.nodes.push(Node {
                id,
                kind: kind_from_degree(degree),
                pixel: ((p % width) as u32, (p / width) as u32),
                degree,
                incident_edges: Vec::new(),
            });
        }
        tracer
    }

    /// Walk every unused link out of every node.
    fn trace_from_nodes(&mut self) {
        for node_id in 0..self.nodes.len() {
            let (x, y) = self.nodes[node_id].pixel;
            let start = y as usize * self.width + x as usize;
            for dir in 0..8u8 {
                let Some(first) = self.connected_neighbor(start, dir) else {
                    continue;
                };
                if self.is_link_used(start, dir) || self.owned[first] {
                    continue;
                }
                let walk = self.walk(start, first, dir);
                self.push_edge(Some(node_id), walk);
            }
        }
    }

    /// Degree-2 pixels not reached from any node lie on closed loops.
    fn trace_loops(&mut self) {
        for p in 0..self.active.len() {
            if !self.active[p] || self.node_at[p].is_some() || self.owned[p] {
                continue;
            }
            let Some((dir, first)) = (0..8u8)
                .filter_map(|dir| self.connected_neighbor(p, dir).map(|nb| (dir, nb)))
                .find(|&(dir, nb)| !self.is_link_used(p, dir) && !self.owned[nb])
            else {
                continue;
            };
            self.owned[p] = true;
            let walk = self.walk(p, first, dir);
            self.push_edge(None, walk);
        }
    }

    fn walk(&mut self, start: usize, first: usize, start_dir: u8) -> Walk {
        let mut pixels = vec![start];
        let mut prev = start;
        let mut cur = first;
        let mut dir = start_dir;
        let mut end_node = None;
        let mut closed = false;
        let mut truncated = false;

        for _ in 0..self.active.len() {
            self.mark_link_both(prev, dir, cur);
            pixels.push(cur);

            if cur == start {
                closed = true;
                end_node = self.node_at[cur];
                break;
            }
            if let Some(id) = self.node_at[cur] {
                end_node = Some(id);
                break;
            }
            self.owned[cur] = true;

            let Some((next_dir, next)) = self.find_next(cur, prev, start) else {
                truncated = true;
                debug!(
                    "walk from ({}, {}) dead-ends at ({}, {})",
                    start % self.width,
                    start / self.width,
                    cur % self.width,
                    cur / self.width,
                );
                break;
            };
            prev = cur;
            cur = next;
            dir = next_dir;
        }

        Walk {
            pixels,
            end_node,
            closed,
            truncated,
        }
    }

    /// The next unvisited step out of `cur`, never back to `prev`.
    fn find_next(&self, cur: usize, prev: usize, start: usize) -> Option<(u8, usize)> {
        (0..8u8).find_map(|dir| {
            let nb = self.connected_neighbor(cur, dir)?;
            if nb == prev || self.is_link_used(cur, dir) {
                return None;
            }
            if self.owned[nb] && nb != start {
                return None;
            }
            Some((dir, nb))
        })
    }

    fn push_edge(&mut self, a: Option<NodeId>, walk: Walk) {
        let n = walk.pixels.len();
        let starts_at_node = a.is_some();
        let ends_at_node = walk.end_node.is_some() && !walk.truncated;
        let owned_start = usize::from(starts_at_node);
        let owned_end = if ends_at_node || (walk.closed && !starts_at_node) {
            n - 1
        } else {
            n
        };

        let id = self.edges.len();
        let b = if walk.truncated { None } else { walk.end_node };
        let points = walk
            .pixels
            .iter()
            .map(|&p| Point::new((p % self.width) as f64, (p / self.width) as f64))
            .collect();
        self.edges.push(Edge {
            id,
            a,
            b,
            points,
            owned: owned_start..owned_end.max(owned_start),
            closed: walk.closed,
            truncated: walk.truncated,
        });
    }

    fn finish(mut self) -> Graph {
        for edge in &self.edges {
            for node in [edge.a, edge.b].into_iter().flatten() {
                let incident = &mut self.nodes[node].incident_edges;
                if incident.last() != Some(&edge.id) {
                    incident.push(edge.id);
                }
            }
        }
        Graph {
            width: self.width as u32,
            height: self.height as u32,
            nodes: self.nodes,
            edges: self.edges,
        }
    }

    #[inline]
    fn is_link_used(&self, p: usize, dir: u8) -> bool {
        self.used_link[p] & (1 << dir) != 0
    }

    #[inline]
    fn mark_link_both(&mut self, a: usize, dir_ab: u8, b: usize) {
        self.used_link[a] |= 1 << dir_ab;
        self.used_link[b] |= 1 << ((dir_ab + 4) & 7);
    }

    #[inline]
    fn is_active(&self, x: i64, y: i64) -> bool {
        x >= 0
            && y >= 0
            && (x as usize) < self.width
            && (y as usize) < self.height
            && self.active[y as usize * self.width + x as usize]
    }

    /// The neighbor in direction `dir` if it is foreground and linked.
    fn connected_neighbor(&self, p: usize, dir: u8) -> Option<usize> {
        let x = (p % self.width) as i64;
        let y = (p / self.width) as i64;
        let dx = DX[dir as usize];
        let dy = DY[dir as usize];
        if !self.is_active(x + dx, y + dy) {
            return None;
        }
        if dx != 0 && dy != 0 && (self.is_active(x + dx, y) || self.is_active(x, y + dy)) {
            return None;
        }
        Some((y + dy) as usize * self.width + (x + dx) as usize)
    }
}

fn kind_from_degree(degree: usize) -> NodeKind {
    match degree {
        0 => NodeKind::Isolated,
        1 => NodeKind::End,
        _ => NodeKind::Junction,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_conserves_pixels(mask: &PixelMask) -> Graph {
        let graph = build_graph(mask);
        assert_eq!(
            graph.accounted_pixels(),
            mask.count_foreground(),
            "node + owned edge pixels must equal the foreground count"
        );
        let mut seen = std::collections::HashSet::new();
        for node in &graph.nodes {
            assert!(seen.insert(node.pixel), "node pixel {:?} counted twice", node.pixel);
        }
        for edge in &graph.edges {
            for p in edge.owned_points() {
                let key = (p.x as u32, p.y as u32);
                assert!(seen.insert(key), "pixel {:?} owned twice", key);
            }
        }
        graph
    }

    #[test]
    fn horizontal_run_is_one_edge() {
        let mask = PixelMask::from_ascii(
            "
            .......
            .#####.
            .......
            ",
        );
        let graph = assert_conserves_pixels(&mask);
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.num_ends(), 2);
        assert_eq!(graph.edges.len(), 1);
        let edge = &graph.edges[0];
        assert_eq!(edge.points.len(), 5);
        assert_eq!(edge.owned.len(), 3);
        assert!(!edge.closed && !edge.truncated);
    }

    #[test]
    fn stair_step_diagonal_is_suppressed() {
        // The corner pixel bridges the two arms, so the diagonal between the
        // arm ends is not a link and the corner keeps degree 2.
        let mask = PixelMask::from_ascii(
            "
            #...
            #...
            ####
            ",
        );
        let graph = assert_conserves_pixels(&mask);
        assert_eq!(graph.num_junctions(), 0);
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].points.len(), 6);
    }

    #[test]
    fn tee_has_one_junction_and_three_edges() {
        let mask = PixelMask::from_ascii(
            "
            #######
            ...#...
            ...#...
            ...#...
            ",
        );
        let graph = assert_conserves_pixels(&mask);
        assert_eq!(graph.num_junctions(), 1);
        assert_eq!(graph.num_ends(), 3);
        assert_eq!(graph.edges.len(), 3);
        let junction = graph.nodes.iter().find(|n| n.kind == NodeKind::Junction).unwrap();
        assert_eq!(junction.pixel, (3, 0));
        assert_eq!(junction.incident_edges.len(), 3);
    }

    #[test]
    fn square_outline_is_a_nodeless_loop() {
        let mask = PixelMask::from_ascii(
            "
            #####
            #...#
            #...#
            #####
            ",
        );
        let graph = assert_conserves_pixels(&mask);
        assert!(graph.nodes.is_empty());
        assert_eq!(graph.edges.len(), 1);
        let edge = &graph.edges[0];
        assert!(edge.closed);
        assert_eq!(edge.points.first(), edge.points.last());
        assert_eq!(edge.owned.len(), 14);
    }

    #[test]
    fn isolated_pixel_is_a_node_without_edges() {
        let mask = PixelMask::from_ascii(
            "
            ...
            .#.
            ...
            ",
        );
        let graph = assert_conserves_pixels(&mask);
        assert_eq!(graph.nodes.len(), 1);
        assert_eq!(graph.nodes[0].kind, NodeKind::Isolated);
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn solid_blob_conserves_pixels() {
        let mask = PixelMask::from_ascii(
            "
            .....#....
            ..#####...
            .######...
            ..####.###
            ...##.....
            ",
        );
        assert_conserves_pixels(&mask);
    }

    #[test]
    fn plus_and_loop_with_tail() {
        let mask = PixelMask::from_ascii(
            "
            ..#.......####
            ..#.......#..#
            #####.....####
            ..#.........#.
            ..#.........#.
            ",
        );
        let graph = assert_conserves_pixels(&mask);
        assert!(graph.num_junctions() >= 2);
    }

    #[test]
    fn empty_mask_has_empty_graph() {
        let graph = build_graph(&PixelMask::new(4, 4));
        assert!(graph.nodes.is_empty() && graph.edges.is_empty());
    }
}
