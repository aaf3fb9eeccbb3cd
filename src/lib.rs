extern crate cfg_if;
extern crate derivative;
extern crate indexmap;
extern crate itertools;
extern crate rand;
extern crate rand_xoshiro;
extern crate serde;
#[macro_use]
extern crate serde_json;
extern crate thiserror;
#[cfg(test)]
extern crate test_case;

pub mod blossom_cycle;
pub mod cardinality_matching;
pub mod dual_engine;
pub mod example_tournaments;
pub mod matching_state;
pub mod pairing_graph;
pub mod pairing_solver;
pub mod swiss_criteria;
pub mod util;
pub mod weight_encoder;
pub mod weighted_matching;

pub use cardinality_matching::maximum_matching;
pub use pairing_graph::{MateMap, PairingGraph};
pub use pairing_solver::{
    generate_weighted_pairing, generate_weighted_pairing_with_options, CardinalityValidationError,
    PairingError, PairingOptions,
};
pub use weighted_matching::maximum_weight_matching;

use util::*;

/// total weight of a matching against the graph it was computed on, every
/// matched pair counted once
pub fn matching_total_weight(graph: &PairingGraph, matching: &MateMap) -> Weight {
    let mut total = 0;
    for (vertex, mate) in matching.iter() {
        if let Some(mate) = mate {
            let u = graph
                .node_index(vertex)
                .unwrap_or_else(|| panic!("matching names unknown vertex {vertex}"));
            let v = graph
                .node_index(mate)
                .unwrap_or_else(|| panic!("matching names unknown vertex {mate}"));
            if u < v {
                total += graph
                    .edge_weight(u, v)
                    .unwrap_or_else(|| panic!("matched pair ({vertex}, {mate}) has no edge"));
            }
        }
    }
    total
}
