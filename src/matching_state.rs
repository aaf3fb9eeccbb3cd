//! Matching State
//!
//! The arena shared by the cardinality and weighted matchers: flat vertex
//! tables, the blossom table and the BFS queue, together with the
//! alternating-tree operations that read and label it. Vertices and blossoms
//! are both identified by integer ids; a blossom id below the vertex count is
//! the trivial blossom wrapping that vertex.
//!

use super::pairing_graph::*;
use super::util::*;
use derivative::Derivative;
use std::collections::BTreeMap;
use std::collections::VecDeque;

/// alternating-tree label; labels are only meaningful on top-level blossoms,
/// a vertex's effective label is that of its top-level blossom
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    None,
    S,
    T,
}

/// one blossom record; trivial blossoms wrap a single vertex and carry no
/// junction edges
#[derive(Debug, Clone)]
pub struct BlossomNode {
    /// the immediately enclosing blossom, if any
    pub parent: Option<BlossomIndex>,
    /// ordered cyclic list of sub-blossom ids; length 1 for trivial blossoms,
    /// odd and at least 3 otherwise, with the base child at index 0
    pub children: Vec<BlossomIndex>,
    /// the vertex through which this blossom connects to its alternating tree;
    /// it is unmatched or its mate lies outside the blossom
    pub base: VertexIndex,
    pub label: Label,
    /// the vertex on the far side of the edge that labelled this blossom;
    /// None for alternating-tree roots
    pub label_end: Option<VertexIndex>,
    /// the vertex inside this blossom touched by the labelling edge
    pub label_edge_vertex: Option<VertexIndex>,
    /// junction edges of the cycle: edges[i] joins children[i] to
    /// children[i + 1], cyclically
    pub edges: Vec<(VertexIndex, VertexIndex)>,
    /// dual variable; only meaningful for non-trivial blossoms
    pub dual: Weight,
}

impl BlossomNode {
    pub fn trivial(vertex: VertexIndex) -> Self {
        Self {
            parent: None,
            children: vec![vertex],
            base: vertex,
            label: Label::None,
            label_end: None,
            label_edge_vertex: None,
            edges: Vec::new(),
            dual: 0,
        }
    }
}

/// the odd cycle discovered between two S-vertices of the same alternating
/// tree, ready to be contracted into a blossom; children[0] is the lowest
/// common ancestor and edges[i] joins children[i] to children[i + 1]
#[derive(Debug, Clone)]
pub struct BlossomCycle {
    pub children: Vec<BlossomIndex>,
    pub edges: Vec<(VertexIndex, VertexIndex)>,
}

#[derive(Derivative)]
#[derivative(Debug)]
pub struct MatcherState {
    /// number of vertices in the input graph
    pub vertex_num: VertexNum,
    /// local copy of the input graph; weights are doubled in weighted mode so
    /// the caller's graph is never mutated
    #[derivative(Debug = "ignore")]
    pub graph: PairingGraph,
    /// matched partner of each vertex
    pub mate: Vec<Option<VertexIndex>>,
    /// top-level blossom containing each vertex
    pub in_blossom: Vec<BlossomIndex>,
    /// all live blossoms; trivial entries 0..vertex_num are always present
    pub blossoms: BTreeMap<BlossomIndex, BlossomNode>,
    /// id for the next non-trivial blossom
    pub next_blossom_id: BlossomIndex,
    /// BFS queue of S-vertices waiting to be scanned
    pub queue: VecDeque<VertexIndex>,
    /// vertex dual variables; all zero in unweighted mode
    pub dual: Vec<Weight>,
    /// whether the weighted matcher prefers more matched pairs over weight
    pub max_cardinality: bool,
}

impl MatcherState {
    /// state for the cardinality matcher: no duals, every edge usable
    pub fn new_unweighted(graph: &PairingGraph) -> Self {
        Self::build(graph.clone(), 0, false)
    }

    /// state for the weighted matcher: weights doubled, vertex duals start at
    /// the maximum doubled edge weight
    pub fn new_weighted(graph: &PairingGraph, max_cardinality: bool) -> Self {
        let mut copy = graph.clone();
        copy.double_weights();
        let initial_dual = std::cmp::max(0, copy.max_edge_weight());
        Self::build(copy, initial_dual, max_cardinality)
    }

    fn build(graph: PairingGraph, initial_dual: Weight, max_cardinality: bool) -> Self {
        let vertex_num = graph.node_num();
        let mut blossoms = BTreeMap::new();
        for vertex in 0..vertex_num {
            blossoms.insert(vertex, BlossomNode::trivial(vertex));
        }
        Self {
            vertex_num,
            graph,
            mate: vec![None; vertex_num],
            in_blossom: (0..vertex_num).collect(),
            blossoms,
            next_blossom_id: vertex_num,
            queue: VecDeque::new(),
            dual: vec![initial_dual; vertex_num],
            max_cardinality,
        }
    }

    pub fn is_trivial(&self, blossom: BlossomIndex) -> bool {
        blossom < self.vertex_num
    }

    pub fn blossom(&self, blossom: BlossomIndex) -> &BlossomNode {
        self.blossoms
            .get(&blossom)
            .unwrap_or_else(|| panic!("blossom {blossom} missing from the blossom table"))
    }

    pub fn blossom_mut(&mut self, blossom: BlossomIndex) -> &mut BlossomNode {
        self.blossoms
            .get_mut(&blossom)
            .unwrap_or_else(|| panic!("blossom {blossom} missing from the blossom table"))
    }

    /// walk the blossom chain from a vertex's innermost blossom toward the top,
    /// invoking the callback per blossom; the callback returns true to stop
    pub fn traverse_blossom_chain(
        &self,
        vertex: VertexIndex,
        mut callback: impl FnMut(BlossomIndex, &BlossomNode) -> bool,
    ) {
        let mut current = self.in_blossom[vertex];
        let mut steps = 0;
        loop {
            steps += 1;
            assert!(
                steps <= TRAVERSAL_STEP_LIMIT,
                "blossom chain from vertex {vertex} exceeds the step budget, cycle suspected at blossom {current}"
            );
            let node = self.blossom(current);
            if callback(current, node) {
                return;
            }
            match node.parent {
                Some(parent) => current = parent,
                None => return,
            }
        }
    }

    /// the top-level blossom containing a vertex
    pub fn top_blossom(&self, vertex: VertexIndex) -> BlossomIndex {
        let mut top = self.in_blossom[vertex];
        self.traverse_blossom_chain(vertex, |blossom, node| {
            top = blossom;
            node.parent.is_none()
        });
        top
    }

    /// base vertex and id of the top-level blossom containing a vertex
    pub fn find_base_with_top(&self, vertex: VertexIndex) -> (VertexIndex, BlossomIndex) {
        let top = self.top_blossom(vertex);
        (self.blossom(top).base, top)
    }

    /// the effective label of a vertex, read through its top-level blossom
    pub fn vertex_label(&self, vertex: VertexIndex) -> Label {
        self.blossom(self.top_blossom(vertex)).label
    }

    /// all vertices inside a blossom, collected through trivial children
    pub fn blossom_leaves(&self, blossom: BlossomIndex) -> Vec<VertexIndex> {
        let mut leaves = Vec::new();
        let mut stack = vec![blossom];
        let mut steps = 0;
        while let Some(current) = stack.pop() {
            steps += 1;
            assert!(
                steps <= TRAVERSAL_STEP_LIMIT,
                "leaf collection of blossom {blossom} exceeds the step budget, cycle suspected"
            );
            if self.is_trivial(current) {
                leaves.push(current);
            } else {
                // reversed push keeps the child order on the stack
                for &child in self.blossom(current).children.iter().rev() {
                    stack.push(child);
                }
            }
        }
        leaves
    }

    /// the direct child of `blossom` that contains `vertex`; walks upward from
    /// the vertex's trivial blossom, which differs from the innermost lookup
    /// and is what expansion needs
    pub fn direct_child_containing(&self, blossom: BlossomIndex, vertex: VertexIndex) -> BlossomIndex {
        let mut current = vertex;
        let mut steps = 0;
        loop {
            steps += 1;
            assert!(
                steps <= TRAVERSAL_STEP_LIMIT,
                "direct-child walk from vertex {vertex} exceeds the step budget"
            );
            match self.blossom(current).parent {
                Some(parent) if parent == blossom => return current,
                Some(parent) => current = parent,
                None => panic!("vertex {vertex} is not inside blossom {blossom}"),
            }
        }
    }

    /// a blossom is an alternating-tree root iff it is S-labelled with no
    /// labelling edge
    pub fn is_tree_root(&self, blossom: BlossomIndex) -> bool {
        let node = self.blossom(blossom);
        node.label == Label::S && node.label_end.is_none()
    }

    /// follow labelling edges from a vertex's top-level blossom toward its
    /// tree root; the callback returns true to stop early
    pub fn traverse_toward_root(
        &self,
        vertex: VertexIndex,
        mut callback: impl FnMut(BlossomIndex, &BlossomNode) -> bool,
    ) {
        let mut current = self.top_blossom(vertex);
        let mut steps = 0;
        loop {
            steps += 1;
            assert!(
                steps <= TRAVERSAL_STEP_LIMIT,
                "alternating-tree walk from vertex {vertex} exceeds the step budget, cycle suspected at blossom {current}"
            );
            let node = self.blossom(current);
            if callback(current, node) {
                return;
            }
            match node.label_end {
                Some(end) => current = self.top_blossom(end),
                None => return,
            }
        }
    }

    /// the path of top-level blossoms from a vertex to its tree root, plus the
    /// (label_edge_vertex, label_end) edge that leaves each blossom on the path
    pub fn build_path_to_root_with_edges(
        &self,
        vertex: VertexIndex,
    ) -> (Vec<BlossomIndex>, Vec<(VertexIndex, VertexIndex)>) {
        let mut path = Vec::new();
        let mut edges = Vec::new();
        self.traverse_toward_root(vertex, |blossom, node| {
            path.push(blossom);
            match node.label_end {
                Some(end) => {
                    let touched = node
                        .label_edge_vertex
                        .unwrap_or_else(|| panic!("blossom {blossom} has a label end but no labelled edge vertex"));
                    edges.push((touched, end));
                    false
                }
                None => true, // root reached
            }
        });
        (path, edges)
    }

    /// find the odd cycle closed by the S-S edge (u, w): build u's path to its
    /// root, then walk from w until entering it; the first shared blossom is
    /// the lowest common ancestor. Returns None when the endpoints live in
    /// different alternating trees, in which case the edge is augmenting.
    pub fn find_blossom_cycle(&self, u: VertexIndex, w: VertexIndex) -> Option<BlossomCycle> {
        let (u_path, u_edges) = self.build_path_to_root_with_edges(u);
        let mut position = BTreeMap::new();
        for (index, &blossom) in u_path.iter().enumerate() {
            position.insert(blossom, index);
        }
        let mut w_path = Vec::new();
        let mut w_edges = Vec::new();
        let mut lca_position = None;
        self.traverse_toward_root(w, |blossom, node| {
            if let Some(&index) = position.get(&blossom) {
                lca_position = Some(index);
                return true;
            }
            match node.label_end {
                Some(end) => {
                    let touched = node
                        .label_edge_vertex
                        .unwrap_or_else(|| panic!("blossom {blossom} has a label end but no labelled edge vertex"));
                    w_path.push(blossom);
                    w_edges.push((touched, end));
                    false
                }
                None => true, // reached a different root: no common ancestor
            }
        });
        let lca = lca_position?;
        // cycle: lca, then u's path below the lca reversed, then w's path; the
        // junction edges follow the same order, closed by the scanned edge
        let mut children = vec![u_path[lca]];
        children.extend(u_path[..lca].iter().rev().copied());
        children.extend(w_path.iter().copied());
        let mut edges: Vec<(VertexIndex, VertexIndex)> = u_edges[..lca]
            .iter()
            .rev()
            .map(|&(touched, end)| (end, touched))
            .collect();
        edges.push((u, w));
        edges.extend(w_edges.iter().copied());
        debug_assert!(children.len() >= 3, "blossom cycle must span at least three blossoms");
        debug_assert!(children.len() % 2 == 1, "blossom cycle must be odd");
        debug_assert_eq!(children.len(), edges.len());
        Some(BlossomCycle { children, edges })
    }

    /// clear the reached-from-outside mark of a single vertex
    pub(crate) fn clear_vertex_mark(&mut self, vertex: VertexIndex) {
        let node = self.blossom_mut(vertex);
        node.label = Label::None;
        node.label_end = None;
        node.label_edge_vertex = None;
    }

    /// label the top-level blossom of a vertex. S-labels push the blossom base
    /// onto the BFS queue; T-labels immediately S-label the base's mate, which
    /// couples the T-blossom with its matched S-blossom.
    pub fn assign_label(&mut self, vertex: VertexIndex, label: Label, label_end: Option<VertexIndex>) {
        let top = self.top_blossom(vertex);
        assert!(
            self.blossom(top).label == Label::None && self.blossom(vertex).label == Label::None,
            "vertex {vertex} in blossom {top} is already labelled, double labelling is a matcher bug"
        );
        let label_edge_vertex = label_end.map(|_| vertex);
        {
            let node = self.blossom_mut(top);
            node.label = label;
            node.label_end = label_end;
            node.label_edge_vertex = label_edge_vertex;
        }
        if top != vertex {
            // remember the labelling edge on the vertex itself; T-blossom
            // expansion re-labels through these marks
            let node = self.blossom_mut(vertex);
            node.label = label;
            node.label_end = label_end;
            node.label_edge_vertex = label_edge_vertex;
        }
        match label {
            Label::S => {
                let base = self.blossom(top).base;
                self.queue.push_back(base);
            }
            Label::T => {
                let base = self.blossom(top).base;
                let mate = self.mate[base]
                    .unwrap_or_else(|| panic!("T-labelled blossom {top} has an unmatched base {base}"));
                self.assign_label(mate, Label::S, Some(base));
            }
            Label::None => panic!("cannot assign the empty label"),
        }
    }

    /// label every free top-level blossom's base as an S-root; a blossom is
    /// free iff no vertex inside it is matched
    pub fn label_free_roots(&mut self) {
        let tops: Vec<BlossomIndex> = self
            .blossoms
            .iter()
            .filter(|(_, node)| node.parent.is_none())
            .map(|(&id, _)| id)
            .collect();
        for top in tops {
            if self.blossom(top).label != Label::None {
                continue;
            }
            let free = self
                .blossom_leaves(top)
                .iter()
                .all(|&leaf| self.mate[leaf].is_none());
            if free {
                let base = self.blossom(top).base;
                self.assign_label(base, Label::S, None);
            }
        }
    }

    /// scan the neighbours of an S-vertex, labelling what can be labelled.
    /// Returns the first edge the caller has to act on: either an edge to a
    /// free unlabelled vertex (augmenting endpoint) or an edge to another
    /// S-blossom (blossom creation or augmentation, depending on the roots).
    pub fn scan_and_label(&mut self, vertex: VertexIndex, tight_only: bool) -> Option<(VertexIndex, VertexIndex)> {
        let top = self.top_blossom(vertex);
        debug_assert!(
            self.blossom(top).label == Label::S,
            "scanned vertex {vertex} must sit in an S-blossom"
        );
        let neighbours: Vec<VertexIndex> = self.graph.neighbours(vertex).collect();
        for w in neighbours {
            let w_top = self.top_blossom(w);
            if top == w_top {
                continue; // internal edge
            }
            if tight_only && !self.is_edge_tight(vertex, w) {
                continue;
            }
            match self.blossom(w_top).label {
                Label::None => {
                    if self.mate[w].is_none() {
                        // truly free, not merely the base's mate
                        return Some((vertex, w));
                    }
                    self.assign_label(w, Label::T, Some(vertex));
                }
                Label::S => return Some((vertex, w)),
                Label::T => {
                    // inside a T-blossom but not yet reached from outside:
                    // record the reaching edge for delta-4 expansion
                    if self.blossom(w).label == Label::None {
                        let node = self.blossom_mut(w);
                        node.label = Label::T;
                        node.label_end = Some(vertex);
                        node.label_edge_vertex = Some(w);
                    }
                }
            }
        }
        None
    }

    /// drop every non-trivial blossom and all labels; called at the start of
    /// each stage, since alternating trees are only meaningful within one
    pub fn reset_stage(&mut self) {
        self.queue.clear();
        let vertex_num = self.vertex_num;
        self.blossoms.retain(|&id, _| id < vertex_num);
        for (&id, node) in self.blossoms.iter_mut() {
            node.parent = None;
            node.children = vec![id];
            node.edges.clear();
            node.base = id;
            node.label = Label::None;
            node.label_end = None;
            node.label_edge_vertex = None;
            node.dual = 0;
        }
        for vertex in 0..vertex_num {
            self.in_blossom[vertex] = vertex;
        }
        self.next_blossom_id = vertex_num;
    }

    /// refill the queue with every vertex whose top-level blossom is
    /// S-labelled, so BFS can resume after a dual update
    pub fn requeue_s_vertices(&mut self) {
        self.queue.clear();
        for vertex in 0..self.vertex_num {
            if self.vertex_label(vertex) == Label::S {
                self.queue.push_back(vertex);
            }
        }
    }

    /// the matching as a key-to-key map in node insertion order
    pub fn mate_map(&self) -> MateMap {
        let mut map = MateMap::new();
        for vertex in 0..self.vertex_num {
            let key = self.graph.node_key(vertex).to_string();
            let mate_key = self.mate[vertex].map(|mate| self.graph.node_key(mate).to_string());
            map.insert(key, mate_key);
        }
        map
    }

    /// mate symmetry must hold between stages; a violation is a matcher bug
    pub fn assert_mate_symmetry(&self) {
        for vertex in 0..self.vertex_num {
            if let Some(mate) = self.mate[vertex] {
                assert_eq!(
                    self.mate[mate],
                    Some(vertex),
                    "mate asymmetry between vertices {vertex} and {mate}"
                );
            }
        }
    }
}
