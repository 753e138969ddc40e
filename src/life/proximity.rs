//! Grouping graph: undirected edges between boids within the neighbor radius.
//!
//! The graph is rebuilt from scratch every frame and keeps no edges across
//! frames. Pair search is O(N^2), which is fine for flocks of tens of boids.

use super::boid::Boid;

#[derive(Debug, Clone)]
pub struct ProximityGraph {
    radius: f32,
    adjacency: Vec<Vec<usize>>,
}

impl ProximityGraph {
    pub fn new(radius: f32, boid_count: usize) -> Self {
        Self {
            radius,
            adjacency: vec![Vec::new(); boid_count],
        }
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Recompute all edges from the current positions.
    pub fn rebuild(&mut self, boids: &[Boid]) {
        self.adjacency.resize_with(boids.len(), Vec::new);
        for list in &mut self.adjacency {
            list.clear();
        }
        for i in 0..boids.len() {
            for j in (i + 1)..boids.len() {
                if boids[i].pos.distance(boids[j].pos) <= self.radius {
                    self.adjacency[i].push(j);
                    self.adjacency[j].push(i);
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.adjacency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    /// Neighbors of `boid` in ascending index order.
    pub fn neighbors(&self, boid: usize) -> &[usize] {
        self.adjacency.get(boid).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn are_neighbors(&self, a: usize, b: usize) -> bool {
        self.neighbors(a).binary_search(&b).is_ok()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(Vec::len).sum::<usize>() / 2
    }

    /// Flood fill from `start`; returns the connected component sorted ascending.
    pub fn component(&self, start: usize) -> Vec<usize> {
        if start >= self.adjacency.len() {
            return Vec::new();
        }
        let mut visited = vec![false; self.adjacency.len()];
        let mut stack = vec![start];
        let mut out = Vec::new();
        while let Some(b) = stack.pop() {
            if visited[b] {
                continue;
            }
            visited[b] = true;
            out.push(b);
            for &n in &self.adjacency[b] {
                if !visited[n] {
                    stack.push(n);
                }
            }
        }
        out.sort_unstable();
        out
    }

    /// All connected components, ordered by their lowest member.
    pub fn components(&self) -> Vec<Vec<usize>> {
        let mut seen = vec![false; self.adjacency.len()];
        let mut out = Vec::new();
        for b in 0..self.adjacency.len() {
            if seen[b] {
                continue;
            }
            let comp = self.component(b);
            for &m in &comp {
                seen[m] = true;
            }
            out.push(comp);
        }
        out
    }
}
