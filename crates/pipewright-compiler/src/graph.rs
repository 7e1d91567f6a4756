//! Directed graph utility
//!
//! One implementation of cycle detection and topological ordering, shared by
//! the file import graph and the job `needs` graph. An edge `a -> b` reads
//! "a depends on b". Nodes and successors are kept in `Ord` order so every
//! traversal, and therefore every diagnostic built from one, is deterministic.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// A directed graph over ordered node identities
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digraph<N: Ord + Clone> {
    adjacency: BTreeMap<N, BTreeSet<N>>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

impl<N: Ord + Clone> Default for Digraph<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: Ord + Clone> Digraph<N> {
    pub fn new() -> Self {
        Self {
            adjacency: BTreeMap::new(),
        }
    }

    /// Add a node without edges. Adding an existing node is a no-op.
    pub fn add_node(&mut self, node: N) {
        self.adjacency.entry(node).or_default();
    }

    /// Add the edge `from -> to`, creating both nodes as needed
    pub fn add_edge(&mut self, from: N, to: N) {
        self.adjacency.entry(to.clone()).or_default();
        self.adjacency.entry(from).or_default().insert(to);
    }

    pub fn contains(&self, node: &N) -> bool {
        self.adjacency.contains_key(node)
    }

    pub fn has_edge(&self, from: &N, to: &N) -> bool {
        self.adjacency
            .get(from)
            .map(|succ| succ.contains(to))
            .unwrap_or(false)
    }

    /// All nodes in order
    pub fn nodes(&self) -> impl Iterator<Item = &N> {
        self.adjacency.keys()
    }

    /// Direct successors (dependencies) of a node, in order
    pub fn successors(&self, node: &N) -> impl Iterator<Item = &N> {
        self.adjacency.get(node).into_iter().flatten()
    }

    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(BTreeSet::len).sum()
    }

    /// Graph restricted to the nodes accepted by `keep`
    pub fn subgraph(&self, keep: impl Fn(&N) -> bool) -> Self {
        let adjacency = self
            .adjacency
            .iter()
            .filter(|(node, _)| keep(node))
            .map(|(node, succ)| {
                let succ = succ.iter().filter(|s| keep(s)).cloned().collect();
                (node.clone(), succ)
            })
            .collect();
        Self { adjacency }
    }

    pub fn has_cycle(&self) -> bool {
        self.find_cycle().is_some()
    }

    /// First cycle found by a three-color depth-first search.
    ///
    /// White nodes are unvisited, gray nodes are on the current path and
    /// black nodes are finished. The first edge into a gray node closes a
    /// cycle, returned as the path from that node back to itself
    /// (`[a, b, a]`).
    pub fn find_cycle(&self) -> Option<Vec<N>> {
        let mut color: BTreeMap<&N, Color> =
            self.adjacency.keys().map(|n| (n, Color::White)).collect();
        let mut path = Vec::new();

        for start in self.adjacency.keys() {
            if color[start] == Color::White {
                if let Some(cycle) = self.visit(start, &mut color, &mut path) {
                    return Some(cycle);
                }
            }
        }
        None
    }

    fn visit<'a>(
        &'a self,
        node: &'a N,
        color: &mut BTreeMap<&'a N, Color>,
        path: &mut Vec<&'a N>,
    ) -> Option<Vec<N>> {
        color.insert(node, Color::Gray);
        path.push(node);

        for next in self.successors(node) {
            match color.get(next).copied().unwrap_or(Color::White) {
                Color::White => {
                    if let Some(cycle) = self.visit(next, color, path) {
                        return Some(cycle);
                    }
                }
                Color::Gray => {
                    let start = path.iter().position(|n| *n == next).unwrap_or(0);
                    let mut cycle: Vec<N> = path[start..].iter().map(|n| (*n).clone()).collect();
                    cycle.push(next.clone());
                    return Some(cycle);
                }
                Color::Black => {}
            }
        }

        path.pop();
        color.insert(node, Color::Black);
        None
    }

    /// Every node that lies on at least one cycle.
    ///
    /// Computed from strongly connected components: a node is cyclic when its
    /// component has more than one member or it has an edge to itself.
    pub fn cyclic_nodes(&self) -> BTreeSet<N> {
        let mut tarjan = Tarjan {
            graph: self,
            index: 0,
            indices: BTreeMap::new(),
            lowlink: BTreeMap::new(),
            stack: Vec::new(),
            on_stack: BTreeSet::new(),
            cyclic: BTreeSet::new(),
        };
        for node in self.adjacency.keys() {
            if !tarjan.indices.contains_key(node) {
                tarjan.strong_connect(node);
            }
        }
        tarjan.cyclic
    }

    /// Shortest cycle through `node`, as `[node, .., node]`
    pub fn cycle_through(&self, node: &N) -> Option<Vec<N>> {
        let mut parent: BTreeMap<&N, &N> = BTreeMap::new();
        let mut queue: VecDeque<&N> = VecDeque::new();
        let mut seen: BTreeSet<&N> = BTreeSet::new();

        for next in self.successors(node) {
            if next == node {
                return Some(vec![node.clone(), node.clone()]);
            }
            if seen.insert(next) {
                parent.insert(next, node);
                queue.push_back(next);
            }
        }

        while let Some(current) = queue.pop_front() {
            for next in self.successors(current) {
                if next == node {
                    let mut cycle = vec![node.clone()];
                    let mut walk = current;
                    let mut reversed = vec![walk.clone()];
                    while let Some(prev) = parent.get(walk) {
                        if *prev == node {
                            break;
                        }
                        reversed.push((*prev).clone());
                        walk = prev;
                    }
                    cycle.extend(reversed.into_iter().rev());
                    cycle.push(node.clone());
                    return Some(cycle);
                }
                if seen.insert(next) {
                    parent.insert(next, current);
                    queue.push_back(next);
                }
            }
        }
        None
    }

    /// Order in which every node comes after all of its dependencies.
    ///
    /// Kahn's algorithm; among nodes that are ready at the same time the
    /// smallest one goes first. Returns the cycle that blocks ordering when
    /// the graph is cyclic.
    pub fn topological_order(&self) -> Result<Vec<N>, Vec<N>> {
        let mut remaining: BTreeMap<&N, usize> = BTreeMap::new();
        let mut dependents: BTreeMap<&N, Vec<&N>> = BTreeMap::new();
        for (node, succ) in &self.adjacency {
            remaining.insert(node, succ.len());
            for dep in succ {
                dependents.entry(dep).or_default().push(node);
            }
        }

        let mut ready: BTreeSet<&N> = remaining
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(node, _)| *node)
            .collect();
        let mut order = Vec::with_capacity(self.adjacency.len());

        while let Some(node) = ready.pop_first() {
            order.push(node.clone());
            for dependent in dependents.get(node).into_iter().flatten() {
                if let Some(count) = remaining.get_mut(dependent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(dependent);
                    }
                }
            }
        }

        if order.len() == self.adjacency.len() {
            Ok(order)
        } else {
            Err(self.find_cycle().unwrap_or_default())
        }
    }
}

struct Tarjan<'a, N: Ord + Clone> {
    graph: &'a Digraph<N>,
    index: usize,
    indices: BTreeMap<&'a N, usize>,
    lowlink: BTreeMap<&'a N, usize>,
    stack: Vec<&'a N>,
    on_stack: BTreeSet<&'a N>,
    cyclic: BTreeSet<N>,
}

impl<'a, N: Ord + Clone> Tarjan<'a, N> {
    fn strong_connect(&mut self, node: &'a N) {
        self.indices.insert(node, self.index);
        self.lowlink.insert(node, self.index);
        self.index += 1;
        self.stack.push(node);
        self.on_stack.insert(node);

        let graph = self.graph;
        for next in graph.successors(node) {
            if !self.indices.contains_key(next) {
                self.strong_connect(next);
                let low = self.lowlink[node].min(self.lowlink[next]);
                self.lowlink.insert(node, low);
            } else if self.on_stack.contains(next) {
                let low = self.lowlink[node].min(self.indices[next]);
                self.lowlink.insert(node, low);
            }
        }

        if self.lowlink[node] == self.indices[node] {
            let mut component = Vec::new();
            while let Some(member) = self.stack.pop() {
                self.on_stack.remove(member);
                component.push(member);
                if member == node {
                    break;
                }
            }
            if component.len() > 1 || graph.has_edge(node, node) {
                self.cyclic.extend(component.into_iter().cloned());
            }
        }
    }
}
