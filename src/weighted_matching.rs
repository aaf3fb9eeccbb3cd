//! Weighted Matching
//!
//! Maximum-weight matching: the cardinality machinery restricted to tight
//! edges, interleaved with dual updates that uncover new ones. With
//! `max_cardinality` set (the default of the pairing driver) the matcher
//! first maximises the number of matched pairs and only then the weight,
//! which is what the Swiss reduction relies on.
//!

use super::dual_engine::*;
use super::matching_state::*;
use super::pairing_graph::*;
use super::util::*;

/// maximum-weight matching over integer edge weights; the input graph is
/// copied, callers never see their weights doubled
pub fn maximum_weight_matching(graph: &PairingGraph, max_cardinality: bool) -> MateMap {
    let mut state = MatcherState::new_weighted(graph, max_cardinality);
    let mut augmented = true;
    while augmented {
        state.reset_stage();
        state.label_free_roots();
        augmented = false;
        let mut delta_rounds = 0;
        loop {
            if state.run_bfs(true) {
                augmented = true;
                break;
            }
            // BFS stalled: find the smallest dual update that makes progress
            let delta = match state.compute_min_delta() {
                Some(delta) => delta,
                None => break,
            };
            if delta.value() == 0 {
                break;
            }
            if !max_cardinality {
                // the termination bound caps how much weight the trees may
                // still gain; past it the stage cannot improve the matching
                if let Some(bound) = state.s_dual_termination_bound() {
                    if bound <= delta.value() {
                        break;
                    }
                }
            }
            state.apply_dual_update(delta.value());
            if let Delta::Blossom { blossom, .. } = delta {
                let entry = state
                    .blossom(blossom)
                    .label_edge_vertex
                    .unwrap_or_else(|| panic!("expanding blossom {blossom} without a labelling edge"));
                state.expand_blossom(blossom, entry, false);
            }
            state.requeue_s_vertices();
            delta_rounds += 1;
            assert!(
                delta_rounds <= TRAVERSAL_STEP_LIMIT,
                "dual updates without augmentation exceed the step budget, matcher stuck"
            );
        }
    }
    state.mate_map()
}
