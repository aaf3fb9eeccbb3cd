//! Blossom Lifecycle
//!
//! Creation of a blossom from an odd cycle, expansion back into its children
//! (either while augmenting or when a T-blossom's dual reaches zero), and the
//! mate flipping that augments the matching along an alternating path.
//!

use super::matching_state::*;
use super::util::*;

impl MatcherState {
    /// contract an odd cycle of top-level blossoms into a new blossom. The new
    /// blossom inherits label, labelling edge and base from the cycle's lowest
    /// common ancestor, which sits at children[0]. Leaves that previously
    /// lived in T-blossoms are pushed onto the BFS queue: they just became
    /// part of an S-blossom and may now discover new neighbours.
    pub fn add_blossom(&mut self, cycle: BlossomCycle) -> BlossomIndex {
        let BlossomCycle { children, edges } = cycle;
        let id = self.next_blossom_id;
        self.next_blossom_id += 1;
        let base_blossom = self.blossom(children[0]);
        assert!(
            base_blossom.label == Label::S,
            "blossom cycle root {} must be S-labelled",
            children[0]
        );
        let base = base_blossom.base;
        let label_end = base_blossom.label_end;
        let label_edge_vertex = base_blossom.label_edge_vertex;
        for &child in children.iter() {
            self.blossom_mut(child).parent = Some(id);
        }
        self.blossoms.insert(
            id,
            BlossomNode {
                parent: None,
                children: children.clone(),
                base,
                label: Label::S,
                label_end,
                label_edge_vertex,
                edges,
                dual: 0,
            },
        );
        for &child in children.iter() {
            for leaf in self.blossom_leaves(child) {
                if self.blossom(self.in_blossom[leaf]).label == Label::T {
                    self.queue.push_back(leaf);
                }
                self.in_blossom[leaf] = id;
            }
        }
        id
    }

    /// dissolve a blossom, restoring its children to top level.
    ///
    /// With `endstage` set this is the augmentation-time expansion: child
    /// labels are cleared and the matching is flipped along the cycle arc from
    /// the entry child to the base, stepping in the direction that traverses
    /// an even number of junction edges. Without `endstage` this is the
    /// delta-4 expansion of a T-blossom whose dual reached zero: child labels
    /// are preserved and the cycle is re-labelled so the alternating tree
    /// stays consistent.
    pub fn expand_blossom(&mut self, blossom: BlossomIndex, entry_vertex: VertexIndex, endstage: bool) {
        assert!(!self.is_trivial(blossom), "cannot expand trivial blossom {blossom}");
        let entry_child = self.direct_child_containing(blossom, entry_vertex);
        let node = self
            .blossoms
            .remove(&blossom)
            .unwrap_or_else(|| panic!("blossom {blossom} missing from the blossom table"));
        let entry_index = node
            .children
            .iter()
            .position(|&child| child == entry_child)
            .unwrap_or_else(|| panic!("entry child {entry_child} not among children of blossom {blossom}"));
        for &child in node.children.iter() {
            let child_node = self.blossom_mut(child);
            child_node.parent = None;
            if endstage {
                child_node.label = Label::None;
                child_node.label_end = None;
                child_node.label_edge_vertex = None;
            }
            for leaf in self.blossom_leaves(child) {
                self.in_blossom[leaf] = child;
            }
        }
        if endstage {
            self.flip_cycle_matching(&node, entry_index, entry_vertex);
        } else {
            self.relabel_expanded_children(&node, entry_index);
        }
    }

    /// walk the cycle from the entry child to the base child in pairs,
    /// matching the junction edge inside each pair; stepping forward when the
    /// entry index is odd and backward when it is even traverses an even
    /// number of edges, which the alternating flip requires
    fn flip_cycle_matching(&mut self, node: &BlossomNode, entry_index: usize, entry_vertex: VertexIndex) {
        if !self.is_trivial(node.children[entry_index]) {
            self.expand_blossom(node.children[entry_index], entry_vertex, true);
        }
        let len = node.children.len();
        let forward = entry_index % 2 == 1;
        let mut j = entry_index;
        while j != 0 {
            j = if forward { (j + 1) % len } else { j - 1 };
            let (inside_first, inside_second) = if forward {
                node.edges[j]
            } else {
                let (a, b) = node.edges[j - 1];
                (b, a)
            };
            let first = node.children[j];
            if !self.is_trivial(first) {
                self.expand_blossom(first, inside_first, true);
            }
            j = if forward { (j + 1) % len } else { j - 1 };
            let second = node.children[j];
            if !self.is_trivial(second) {
                self.expand_blossom(second, inside_second, true);
            }
            self.mate[inside_first] = Some(inside_second);
            self.mate[inside_second] = Some(inside_first);
        }
    }

    /// delta-4 re-labelling. Phase 1 walks from the entry child to the base,
    /// re-labelling the walked children T/S alternately through the junction
    /// edges; phase 2 scans the opposite arc for children whose leaves were
    /// reached from outside the blossom and re-attaches them under a fresh
    /// T-label.
    fn relabel_expanded_children(&mut self, node: &BlossomNode, entry_index: usize) {
        if node.label != Label::T {
            return; // only an expanded T-blossom forces re-labelling mid-stage
        }
        let len = node.children.len();
        let mut outside = node
            .label_end
            .unwrap_or_else(|| panic!("T-blossom has no labelling edge"));
        let mut inside = node
            .label_edge_vertex
            .unwrap_or_else(|| panic!("T-blossom has no labelled edge vertex"));
        let entry_child = node.children[entry_index];
        let forward = entry_index % 2 == 1;
        let step = |j: usize| {
            if forward {
                (j + 1) % len
            } else {
                (j + len - 1) % len
            }
        };
        // phase 1
        let mut j = entry_index;
        while j != 0 {
            let next_inside = if forward {
                node.edges[j].1
            } else {
                node.edges[j - 1].0
            };
            self.clear_vertex_mark(inside);
            self.clear_vertex_mark(next_inside);
            self.assign_label(inside, Label::T, Some(outside));
            j = step(j);
            let (o, i) = if forward {
                node.edges[j]
            } else {
                let (a, b) = node.edges[j - 1];
                (b, a)
            };
            outside = o;
            inside = i;
            j = step(j);
        }
        // the base child is re-labelled T directly, without stepping through
        // to its mate
        let base_child = node.children[0];
        for target in [base_child, inside] {
            let record = self.blossom_mut(target);
            record.label = Label::T;
            record.label_end = Some(outside);
            record.label_edge_vertex = Some(inside);
        }
        // phase 2
        j = step(0);
        while node.children[j] != entry_child {
            let child = node.children[j];
            if self.blossom(child).label == Label::S {
                j = step(j);
                continue;
            }
            let mut reached = None;
            for leaf in self.blossom_leaves(child) {
                if self.blossom(leaf).label != Label::None {
                    reached = Some(leaf);
                    break;
                }
            }
            if let Some(leaf) = reached {
                debug_assert_eq!(self.blossom(leaf).label, Label::T);
                let leaf_end = self
                    .blossom(leaf)
                    .label_end
                    .unwrap_or_else(|| panic!("marked leaf {leaf} has no labelling edge"));
                self.clear_vertex_mark(leaf);
                let base_mate = self.mate[self.blossom(child).base]
                    .unwrap_or_else(|| panic!("re-attached child {child} has an unmatched base"));
                self.clear_vertex_mark(base_mate);
                self.assign_label(leaf, Label::T, Some(leaf_end));
            }
            j = step(j);
        }
    }

    /// augment along the path whose free endpoints are u and v: match them to
    /// each other, then walk from each endpoint toward its root rearranging
    /// mates. Each walk writes only one mate direction; the two walks together
    /// produce the symmetric relation.
    pub fn augment_matching(&mut self, u: VertexIndex, v: VertexIndex) {
        self.augment_from_vertex(u, v);
        self.augment_from_vertex(v, u);
        #[cfg(debug_assertions)]
        self.assert_mate_symmetry();
    }

    fn augment_from_vertex(&mut self, start: VertexIndex, start_mate: VertexIndex) {
        let mut s = start;
        let mut mate = start_mate;
        let mut steps = 0;
        loop {
            steps += 1;
            assert!(
                steps <= TRAVERSAL_STEP_LIMIT,
                "augmenting walk from vertex {start} exceeds the step budget, cycle suspected"
            );
            let top = self.top_blossom(s);
            // the walk sits on S-blossoms, except for a free unlabelled
            // endpoint reached directly by the scan
            debug_assert!(
                self.blossom(top).label != Label::T,
                "augmenting walk stepped into a T-blossom"
            );
            // capture the tree edge before the expansion clears it
            let label_end = self.blossom(top).label_end;
            if !self.is_trivial(top) {
                self.expand_blossom(top, s, true);
            }
            self.mate[s] = Some(mate);
            let t = match label_end {
                Some(t) => t,
                None => return, // reached the tree root
            };
            let t_top = self.top_blossom(t);
            debug_assert!(
                self.blossom(t_top).label == Label::T,
                "augmenting walk expects T-blossoms on the odd positions"
            );
            let next_s = self
                .blossom(t_top)
                .label_end
                .unwrap_or_else(|| panic!("T-blossom {t_top} on an augmenting path has no labelling edge"));
            let edge_vertex = self
                .blossom(t_top)
                .label_edge_vertex
                .unwrap_or_else(|| panic!("T-blossom {t_top} on an augmenting path has no labelled edge vertex"));
            if !self.is_trivial(t_top) {
                self.expand_blossom(t_top, edge_vertex, true);
            }
            self.mate[edge_vertex] = Some(next_s);
            s = next_s;
            mate = edge_vertex;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::pairing_graph::PairingGraph;
    use super::*;

    /// triangle a-b-c with a tail a-d; b and c matched inside the triangle
    /// once the blossom dissolves
    fn triangle_with_tail() -> MatcherState {
        let mut graph = PairingGraph::new();
        for key in ["a", "b", "c", "d"] {
            graph.add_node(key);
        }
        graph.add_edge("a", "b", 1);
        graph.add_edge("b", "c", 1);
        graph.add_edge("c", "a", 1);
        graph.add_edge("a", "d", 1);
        let mut state = MatcherState::new_unweighted(&graph);
        state.mate[0] = Some(1);
        state.mate[1] = Some(0);
        state
    }

    #[test]
    fn blossom_cycle_creation_from_scan() {
        // cargo test blossom_cycle_creation_from_scan -- --nocapture
        let mut state = triangle_with_tail();
        state.label_free_roots(); // c and d are free roots
        assert_eq!(state.vertex_label(2), Label::S);
        assert_eq!(state.vertex_label(3), Label::S);
        // scanning c T-labels b, S-labels a, then hits the S-S edge (c, a)
        let edge = state.scan_and_label(2, false);
        assert_eq!(edge, Some((2, 0)));
        let cycle = state.find_blossom_cycle(2, 0).expect("same tree, cycle expected");
        assert_eq!(cycle.children, vec![2, 0, 1]);
        assert_eq!(cycle.edges, vec![(2, 0), (0, 1), (1, 2)]);
        let blossom = state.add_blossom(cycle);
        assert_eq!(blossom, 4);
        assert_eq!(state.blossom(blossom).base, 2);
        assert_eq!(state.blossom(blossom).label, Label::S);
        assert!(state.is_tree_root(blossom));
        assert_eq!(state.top_blossom(0), blossom);
        assert_eq!(state.top_blossom(1), blossom);
        assert_eq!(state.blossom_leaves(blossom), vec![2, 0, 1]);
        // b sat in a T-blossom before contraction, so it re-enters the queue
        assert!(state.queue.contains(&1));
        assert_eq!(state.direct_child_containing(blossom, 1), 1);
    }

    #[test]
    fn blossom_cycle_augment_through_blossom() {
        // cargo test blossom_cycle_augment_through_blossom -- --nocapture
        let mut state = triangle_with_tail();
        state.label_free_roots();
        state.scan_and_label(2, false);
        let cycle = state.find_blossom_cycle(2, 0).unwrap();
        state.add_blossom(cycle);
        // d reaches a inside the S-blossom; the roots differ, so this edge
        // augments right through the contracted cycle
        let edge = state.scan_and_label(3, false);
        assert_eq!(edge, Some((3, 0)));
        assert!(state.find_blossom_cycle(3, 0).is_none());
        state.augment_matching(3, 0);
        assert_eq!(state.mate[3], Some(0));
        assert_eq!(state.mate[0], Some(3));
        assert_eq!(state.mate[1], Some(2));
        assert_eq!(state.mate[2], Some(1));
        // the blossom dissolved during augmentation
        assert!(!state.blossoms.contains_key(&4));
        for vertex in 0..4 {
            assert_eq!(state.top_blossom(vertex), vertex);
        }
    }

    /// contracted triangle {c, a, b} hanging T-labelled under S-root d, with
    /// base c matched to outside vertex e
    fn t_labelled_blossom_state() -> (MatcherState, BlossomIndex) {
        let mut graph = PairingGraph::new();
        for key in ["a", "b", "c", "d", "e"] {
            graph.add_node(key);
        }
        graph.add_edge("a", "b", 1);
        graph.add_edge("b", "c", 1);
        graph.add_edge("c", "a", 1);
        graph.add_edge("d", "a", 1);
        graph.add_edge("c", "e", 1);
        let mut state = MatcherState::new_unweighted(&graph);
        state.mate[0] = Some(1);
        state.mate[1] = Some(0);
        state.mate[2] = Some(4);
        state.mate[4] = Some(2);
        state.label_free_roots(); // d is the only free root
        assert_eq!(state.vertex_label(3), Label::S);
        // contract the triangle with base c, then hand-label it T as if d had
        // reached it through the edge (d, a)
        state.blossom_mut(2).label = Label::S;
        let blossom = state.add_blossom(BlossomCycle {
            children: vec![2, 0, 1],
            edges: vec![(2, 0), (0, 1), (1, 2)],
        });
        {
            let record = state.blossom_mut(blossom);
            record.label = Label::T;
            record.label_end = Some(3);
            record.label_edge_vertex = Some(0);
        }
        state.blossom_mut(2).label = Label::None;
        // the matched S-vertex coupled through the base
        {
            let record = state.blossom_mut(4);
            record.label = Label::S;
            record.label_end = Some(2);
            record.label_edge_vertex = Some(4);
        }
        (state, blossom)
    }

    #[test]
    fn blossom_cycle_delta4_relabel() {
        // cargo test blossom_cycle_delta4_relabel -- --nocapture
        let (mut state, blossom) = t_labelled_blossom_state();
        state.expand_blossom(blossom, 0, false);
        assert!(!state.blossoms.contains_key(&blossom));
        // entry child a stays T through the original edge, its mate b turns S,
        // and the base child c is re-attached T through the junction edge
        assert_eq!(state.blossom(0).label, Label::T);
        assert_eq!(state.blossom(0).label_end, Some(3));
        assert_eq!(state.blossom(1).label, Label::S);
        assert_eq!(state.blossom(2).label, Label::T);
        assert_eq!(state.blossom(2).label_end, Some(1));
        assert_eq!(state.blossom(2).label_edge_vertex, Some(2));
        for vertex in [0, 1, 2] {
            assert_eq!(state.top_blossom(vertex), vertex);
        }
        // b became an S-vertex and entered the queue
        assert!(state.queue.contains(&1));
    }
}
