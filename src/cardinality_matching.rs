//! Cardinality Matching
//!
//! Maximum-cardinality matching on an undirected graph: label the free roots,
//! grow alternating trees by BFS, contract odd cycles into blossoms and
//! augment whenever two trees touch. The per-stage BFS driver here is shared
//! with the weighted matcher, which restricts it to tight edges.
//!

use super::matching_state::*;
use super::pairing_graph::*;

impl MatcherState {
    /// BFS over the queue until an augmenting path is found or the queue
    /// drains. On an S-S edge inside one tree the cycle is contracted and the
    /// scanned vertex re-queued (its remaining neighbours were not examined);
    /// across two trees the matching is augmented and the stage is over.
    /// Returns whether an augmentation happened.
    pub fn run_bfs(&mut self, tight_only: bool) -> bool {
        while let Some(vertex) = self.queue.pop_front() {
            let edge = match self.scan_and_label(vertex, tight_only) {
                Some(edge) => edge,
                None => continue,
            };
            let (s, w) = edge;
            if self.vertex_label(w) == Label::S {
                match self.find_blossom_cycle(s, w) {
                    Some(cycle) => {
                        self.add_blossom(cycle);
                        self.queue.push_back(s);
                    }
                    None => {
                        self.augment_matching(s, w);
                        return true;
                    }
                }
            } else {
                // an unlabelled, truly free neighbour ends the path directly
                self.augment_matching(s, w);
                return true;
            }
        }
        false
    }
}

/// maximum-cardinality matching; the returned map carries every vertex of the
/// graph, unmatched ones map to None
pub fn maximum_matching(graph: &PairingGraph) -> MateMap {
    let mut state = MatcherState::new_unweighted(graph);
    let mut augmented = true;
    while augmented {
        state.reset_stage();
        state.label_free_roots();
        augmented = state.run_bfs(false);
    }
    state.mate_map()
}

#[cfg(test)]
pub mod tests {
    use super::super::util::*;
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::rand_core::RngCore;

    pub fn graph_from_edges(node_num: usize, edges: &[(usize, usize, Weight)]) -> PairingGraph {
        let mut graph = PairingGraph::new();
        for index in 0..node_num {
            graph.add_node(&format!("v{index}"));
        }
        for &(u, v, weight) in edges {
            graph.add_edge(&format!("v{u}"), &format!("v{v}"), weight);
        }
        graph
    }

    pub fn matched_count(matching: &MateMap) -> usize {
        matching.values().filter(|mate| mate.is_some()).count()
    }

    /// symmetry and single-partner validity of a mate map
    pub fn assert_valid_matching(matching: &MateMap) {
        for (vertex, mate) in matching.iter() {
            if let Some(mate) = mate {
                assert_ne!(vertex, mate, "vertex {vertex} matched to itself");
                assert_eq!(
                    matching.get(mate).cloned().flatten().as_ref(),
                    Some(vertex),
                    "mate relation of {vertex} and {mate} is asymmetric"
                );
            }
        }
    }

    /// exponential reference: try every subset of edges
    fn brute_force_matching_size(node_num: usize, edges: &[(usize, usize, Weight)]) -> usize {
        fn recurse(edges: &[(usize, usize, Weight)], used: &mut [bool]) -> usize {
            match edges.split_first() {
                None => 0,
                Some((&(u, v, _), rest)) => {
                    let skip = recurse(rest, used);
                    if !used[u] && !used[v] {
                        used[u] = true;
                        used[v] = true;
                        let take = 1 + recurse(rest, used);
                        used[u] = false;
                        used[v] = false;
                        skip.max(take)
                    } else {
                        skip
                    }
                }
            }
        }
        recurse(edges, &mut vec![false; node_num])
    }

    #[test]
    fn cardinality_matching_boundaries() {
        // cargo test cardinality_matching_boundaries -- --nocapture
        let empty = maximum_matching(&PairingGraph::new());
        assert!(empty.is_empty());
        let single = maximum_matching(&graph_from_edges(1, &[]));
        assert_eq!(single.len(), 1);
        assert_eq!(single["v0"], None);
    }

    #[test]
    fn cardinality_matching_path_of_four() {
        // cargo test cardinality_matching_path_of_four -- --nocapture
        let graph = graph_from_edges(4, &[(0, 1, 1), (1, 2, 1), (2, 3, 1)]);
        let matching = maximum_matching(&graph);
        assert_valid_matching(&matching);
        assert_eq!(matched_count(&matching), 4);
        assert_eq!(matching["v0"], Some("v1".to_string()));
        assert_eq!(matching["v2"], Some("v3".to_string()));
    }

    #[test]
    fn cardinality_matching_pentagon() {
        // cargo test cardinality_matching_pentagon -- --nocapture
        let graph = graph_from_edges(5, &[(0, 1, 1), (1, 2, 1), (2, 3, 1), (3, 4, 1), (4, 0, 1)]);
        let matching = maximum_matching(&graph);
        assert_valid_matching(&matching);
        assert_eq!(matched_count(&matching), 4);
    }

    #[test]
    fn cardinality_matching_augments_through_blossom() {
        // cargo test cardinality_matching_augments_through_blossom -- --nocapture
        // triangle 0-1-2 with tails 0-3 and 1-4: the perfect-side matching
        // requires augmenting through the contracted triangle
        let graph = graph_from_edges(5, &[(0, 1, 1), (1, 2, 1), (2, 0, 1), (0, 3, 1), (1, 4, 1)]);
        let matching = maximum_matching(&graph);
        assert_valid_matching(&matching);
        assert_eq!(matched_count(&matching), 4);
        assert_eq!(
            matched_count(&matching),
            2 * brute_force_matching_size(5, &graph.edges())
        );
    }

    #[test]
    fn cardinality_matching_is_maximum_on_random_graphs() {
        // cargo test cardinality_matching_is_maximum_on_random_graphs -- --nocapture
        for seed in 0..30u64 {
            let mut rng = DeterministicRng::seed_from_u64(seed);
            let node_num = 4 + (rng.next_u64() % 6) as usize;
            let mut edges = Vec::new();
            for u in 0..node_num {
                for v in (u + 1)..node_num {
                    if rng.next_u64() % 2 == 0 {
                        edges.push((u, v, 1));
                    }
                }
            }
            let graph = graph_from_edges(node_num, &edges);
            let matching = maximum_matching(&graph);
            assert_valid_matching(&matching);
            assert_eq!(
                matched_count(&matching),
                2 * brute_force_matching_size(node_num, &edges),
                "seed {seed} found a non-maximum matching"
            );
        }
    }

    #[test]
    fn cardinality_matching_is_deterministic() {
        // cargo test cardinality_matching_is_deterministic -- --nocapture
        let graph = graph_from_edges(
            6,
            &[(0, 1, 1), (1, 2, 1), (2, 0, 1), (2, 3, 1), (3, 4, 1), (4, 5, 1), (5, 3, 1)],
        );
        let first = maximum_matching(&graph);
        let second = maximum_matching(&graph);
        assert_eq!(first, second);
    }
}
