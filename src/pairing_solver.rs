//! Pairing Solver
//!
//! The round driver: validate the player records, build the weighted
//! compatibility graph, run maximum-weight matching at full cardinality and
//! decode the mate map into coloured pairs plus the optional bye. A pure
//! function of the players and the round number; the persistence layer on top
//! assigns board numbers to the ordered pairs.
//!

use super::pairing_graph::*;
use super::swiss_criteria::*;
use super::util::*;
use super::weight_encoder::*;
use super::weighted_matching::*;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeSet;
use thiserror::Error;

/// the compatibility graph was too sparse to cover the field; the caller may
/// surface both counts to the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("pairing failed: expected {expected} matched vertices, found {actual}")]
pub struct CardinalityValidationError {
    pub expected: usize,
    pub actual: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PairingError {
    #[error(transparent)]
    Cardinality(#[from] CardinalityValidationError),
    #[error("round number must be at least 1")]
    InvalidRoundNumber,
    #[error("duplicate entity id {entity_id}")]
    DuplicateEntity { entity_id: String },
    #[error("duplicate pairing number {pairing_number}")]
    DuplicatePairingNumber { pairing_number: usize },
    #[error("pairing number {pairing_number} out of range for {player_count} players")]
    PairingNumberOutOfRange { pairing_number: usize, player_count: usize },
    #[error("player {player} references unknown opponent {opponent}")]
    UnknownOpponent { player: String, opponent: String },
    #[error("player {player} carries a game from round {game_round} while pairing round {round_number}")]
    GameFromTheFuture {
        player: String,
        game_round: RoundNumber,
        round_number: RoundNumber,
    },
}

/// driver knobs; everything defaults off
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PairingOptions {
    /// emit structured JSON records to stderr while pairing; production runs
    /// stay silent
    #[serde(default)]
    pub debug: bool,
}

/// pair one round with default options
pub fn generate_weighted_pairing(
    players: &[PlayerEntry],
    round_number: RoundNumber,
) -> Result<RoundPairing, PairingError> {
    generate_weighted_pairing_with_options(players, round_number, &PairingOptions::default())
}

pub fn generate_weighted_pairing_with_options(
    players: &[PlayerEntry],
    round_number: RoundNumber,
    options: &PairingOptions,
) -> Result<RoundPairing, PairingError> {
    validate_players(players, round_number)?;
    let context = WeightContext::new(players, round_number);
    let multipliers = criterion_multipliers(&context);
    assert_weight_headroom(&context, &multipliers);
    let graph = build_pairing_graph(players, &context, &multipliers);
    if options.debug {
        eprintln!(
            "{}",
            json!({
                "event": "pairing_graph_built",
                "round": round_number,
                "players": context.player_count,
                "edges": graph.edge_num(),
                "bye_node": context.odd_player_count,
            })
        );
    }
    let matching = maximum_weight_matching(&graph, true);
    validate_cardinality(&matching, &context)?;
    let pairing = decode_matching(players, &matching);
    if options.debug {
        eprintln!(
            "{}",
            json!({
                "event": "pairing_decoded",
                "round": round_number,
                "pairs": pairing.pairs.len(),
                "bye": pairing.bye,
            })
        );
    }
    Ok(pairing)
}

/// reject broken inputs before any graph is built
fn validate_players(players: &[PlayerEntry], round_number: RoundNumber) -> Result<(), PairingError> {
    if round_number < 1 {
        return Err(PairingError::InvalidRoundNumber);
    }
    let mut ids = BTreeSet::new();
    let mut numbers = BTreeSet::new();
    for player in players {
        if !ids.insert(player.entity_id.as_str()) {
            return Err(PairingError::DuplicateEntity {
                entity_id: player.entity_id.clone(),
            });
        }
        if player.pairing_number >= players.len() {
            return Err(PairingError::PairingNumberOutOfRange {
                pairing_number: player.pairing_number,
                player_count: players.len(),
            });
        }
        if !numbers.insert(player.pairing_number) {
            return Err(PairingError::DuplicatePairingNumber {
                pairing_number: player.pairing_number,
            });
        }
    }
    for player in players {
        for game in player.previous_games.iter() {
            if game.round_number >= round_number {
                return Err(PairingError::GameFromTheFuture {
                    player: player.entity_id.clone(),
                    game_round: game.round_number,
                    round_number,
                });
            }
            if !ids.contains(game.opponent_id.as_str()) {
                return Err(PairingError::UnknownOpponent {
                    player: player.entity_id.clone(),
                    opponent: game.opponent_id.clone(),
                });
            }
        }
    }
    Ok(())
}

/// the encoder's weights must leave room for doubling and for the dual sums
/// the matcher accumulates
fn assert_weight_headroom(context: &WeightContext, multipliers: &[Weight]) {
    let max_weight = max_possible_edge_weight(context, multipliers);
    let budget = Weight::MAX / (4 * (context.edge_count as Weight + 2));
    assert!(
        max_weight <= budget,
        "edge weight bound {max_weight} is too close to the integer limit for {} boards, enable the wide weight type",
        context.edge_count
    );
}

/// every player must be covered, plus the bye node when the field is odd
fn validate_cardinality(matching: &MateMap, context: &WeightContext) -> Result<(), CardinalityValidationError> {
    let expected = if context.odd_player_count {
        context.player_count + 1
    } else {
        context.player_count
    };
    let actual = matching.values().filter(|mate| mate.is_some()).count();
    if actual != expected {
        return Err(CardinalityValidationError { expected, actual });
    }
    Ok(())
}

/// walk the mate map once, skipping vertices already handled; the bye node
/// yields the bye recipient, every other matched pair is coloured by the
/// FIDE rule
fn decode_matching(players: &[PlayerEntry], matching: &MateMap) -> RoundPairing {
    let by_id: IndexMap<&str, &PlayerEntry> = players
        .iter()
        .map(|player| (player.entity_id.as_str(), player))
        .collect();
    let mut pairs = Vec::new();
    let mut bye = None;
    let mut processed = BTreeSet::new();
    for (vertex, mate) in matching.iter() {
        let mate = match mate {
            Some(mate) => mate,
            None => continue,
        };
        if processed.contains(vertex.as_str()) {
            continue;
        }
        processed.insert(vertex.clone());
        processed.insert(mate.clone());
        if vertex == PAB_NODE_KEY {
            bye = Some(mate.clone());
            continue;
        }
        if mate == PAB_NODE_KEY {
            bye = Some(vertex.clone());
            continue;
        }
        let a = by_id[vertex.as_str()];
        let b = by_id[mate.as_str()];
        let (white, black) = assign_colours(a, b);
        pairs.push(ColouredPair {
            white_id: white.entity_id.clone(),
            black_id: black.entity_id.clone(),
        });
    }
    RoundPairing { pairs, bye }
}
