//! Weight Encoder
//!
//! Reduction of the FIDE priority order to integer edge weights. Every
//! quality criterion prices an edge with a penalty between zero and a
//! per-edge maximum; the mixed-radix layout, with base `K * max + 1` per
//! criterion, guarantees that no amount of lower-priority goodness summed
//! over the K boards of a matching can overtake a single step of a
//! higher-priority criterion. Maximum-weight matching on the resulting graph
//! therefore orders matchings lexicographically by the criteria.
//!

use super::pairing_graph::*;
use super::swiss_criteria::*;
use super::util::*;
use itertools::Itertools;
use std::collections::BTreeMap;

/// the distinguished vertex a player is matched to when receiving the
/// pairing-allocated bye; never a valid player id
pub const PAB_NODE_KEY: &str = "::pab::";

/// per-round facts every criterion prices against
#[derive(Debug, Clone)]
pub struct WeightContext {
    /// the round being paired, 1-based
    pub round_number: RoundNumber,
    pub player_count: usize,
    /// K, the number of boards
    pub edge_count: usize,
    /// highest current score, in half-points
    pub max_score: Score,
    pub odd_player_count: bool,
    /// score -> number of players holding it
    pub scoregroup_sizes: BTreeMap<Score, usize>,
}

impl WeightContext {
    pub fn new(players: &[PlayerEntry], round_number: RoundNumber) -> Self {
        let mut scoregroup_sizes = BTreeMap::new();
        let mut max_score = 0;
        for player in players {
            *scoregroup_sizes.entry(player.score).or_insert(0) += 1;
            if player.score > max_score {
                max_score = player.score;
            }
        }
        Self {
            round_number,
            player_count: players.len(),
            edge_count: players.len() / 2,
            max_score,
            odd_player_count: players.len() % 2 == 1,
            scoregroup_sizes,
        }
    }

    pub fn scoregroup_size(&self, score: Score) -> usize {
        self.scoregroup_sizes.get(&score).copied().unwrap_or(0)
    }
}

/// the two edge populations of the pairing graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    Regular,
    Bye,
}

/// one edge being priced
#[derive(Debug, Clone, Copy)]
pub enum EdgeInput<'a> {
    Pair { a: &'a PlayerEntry, b: &'a PlayerEntry },
    ByeCandidate { player: &'a PlayerEntry },
}

impl<'a> EdgeInput<'a> {
    pub fn kind(&self) -> EdgeKind {
        match self {
            Self::Pair { .. } => EdgeKind::Regular,
            Self::ByeCandidate { .. } => EdgeKind::Bye,
        }
    }
}

/// the FIDE quality criteria, highest priority first. The score tier folds
/// C6, C7 and C8 into one |score difference| penalty: same-score pairs
/// dominate, and among cross-score pairs smaller gaps win. Completion of the
/// following brackets (C8) is approximated by that dominance cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Criterion {
    /// C5: maximise the number of pairs
    MaximisePairs,
    /// C6/C7/C8: pair within the scoregroup, float as shallowly as possible
    ScoreTier,
    /// C9: the bye goes to the lowest-scoring eligible player
    ByePlacement,
    /// C10: topscorer colour difference beyond +2 or -2
    TopscorerWideImbalance,
    /// C11: topscorer holding one colour three times in a row
    TopscorerTripleColour,
    /// C12: colour preference not granted
    MissedPreference,
    /// C13: strong colour preference not granted
    MissedStrongPreference,
    /// C14: moved-down player downfloating again
    MdpRepeatDownfloat,
    /// C15: resident upfloating again
    ResidentRepeatUpfloat,
    /// C16: moved-down player downfloated two rounds ago
    MdpDownfloatTwoAgo,
    /// C17: resident upfloated two rounds ago
    ResidentUpfloatTwoAgo,
    /// C18: score difference carried by a repeated downfloat
    RepeatDownfloatScoreDiff,
    /// C19: score difference carried by a repeated upfloat
    RepeatUpfloatScoreDiff,
    /// C20: score difference of a downfloat repeated from two rounds ago
    DownfloatTwoAgoScoreDiff,
    /// C21: score difference of an upfloat repeated from two rounds ago
    UpfloatTwoAgoScoreDiff,
    /// Dutch S1/S2 split: prefer pairing-number gaps of half the scoregroup
    Ranking,
}

impl Criterion {
    pub const PRIORITY_ORDER: [Criterion; 16] = [
        Criterion::MaximisePairs,
        Criterion::ScoreTier,
        Criterion::ByePlacement,
        Criterion::TopscorerWideImbalance,
        Criterion::TopscorerTripleColour,
        Criterion::MissedPreference,
        Criterion::MissedStrongPreference,
        Criterion::MdpRepeatDownfloat,
        Criterion::ResidentRepeatUpfloat,
        Criterion::MdpDownfloatTwoAgo,
        Criterion::ResidentUpfloatTwoAgo,
        Criterion::RepeatDownfloatScoreDiff,
        Criterion::RepeatUpfloatScoreDiff,
        Criterion::DownfloatTwoAgoScoreDiff,
        Criterion::UpfloatTwoAgoScoreDiff,
        Criterion::Ranking,
    ];

    pub fn applies_to(&self, kind: EdgeKind) -> bool {
        match self {
            Self::MaximisePairs | Self::Ranking => true,
            Self::ByePlacement => kind == EdgeKind::Bye,
            _ => kind == EdgeKind::Regular,
        }
    }

    /// the largest penalty this criterion can hand a single edge
    pub fn per_edge_max(&self, context: &WeightContext) -> Weight {
        match self {
            Self::MaximisePairs => 1,
            Self::ScoreTier
            | Self::ByePlacement
            | Self::RepeatDownfloatScoreDiff
            | Self::RepeatUpfloatScoreDiff
            | Self::DownfloatTwoAgoScoreDiff
            | Self::UpfloatTwoAgoScoreDiff => context.max_score as Weight,
            Self::TopscorerWideImbalance
            | Self::TopscorerTripleColour
            | Self::MissedPreference
            | Self::MissedStrongPreference => 2,
            Self::MdpRepeatDownfloat
            | Self::ResidentRepeatUpfloat
            | Self::MdpDownfloatTwoAgo
            | Self::ResidentUpfloatTwoAgo => 1,
            Self::Ranking => context.player_count.saturating_sub(1) as Weight,
        }
    }

    /// the actual penalty of one edge; zero is ideal
    pub fn penalty(&self, input: &EdgeInput, context: &WeightContext) -> Weight {
        match (self, input) {
            (Self::MaximisePairs, _) => 0,
            (Self::ScoreTier, EdgeInput::Pair { a, b }) => (a.score - b.score).abs() as Weight,
            (Self::ByePlacement, EdgeInput::ByeCandidate { player }) => player.score as Weight,
            (Self::TopscorerWideImbalance, EdgeInput::Pair { a, b }) => {
                colour_violations(a, b, context.round_number).topscorer_wide_imbalance as Weight
            }
            (Self::TopscorerTripleColour, EdgeInput::Pair { a, b }) => {
                colour_violations(a, b, context.round_number).topscorer_triple_colour as Weight
            }
            (Self::MissedPreference, EdgeInput::Pair { a, b }) => {
                colour_violations(a, b, context.round_number).missed_preference as Weight
            }
            (Self::MissedStrongPreference, EdgeInput::Pair { a, b }) => {
                colour_violations(a, b, context.round_number).missed_strong_preference as Weight
            }
            (Self::MdpRepeatDownfloat, EdgeInput::Pair { a, b }) => {
                float_violations(a, b, context.round_number).mdp_repeat_downfloat as Weight
            }
            (Self::ResidentRepeatUpfloat, EdgeInput::Pair { a, b }) => {
                float_violations(a, b, context.round_number).resident_repeat_upfloat as Weight
            }
            (Self::MdpDownfloatTwoAgo, EdgeInput::Pair { a, b }) => {
                float_violations(a, b, context.round_number).mdp_downfloat_two_ago as Weight
            }
            (Self::ResidentUpfloatTwoAgo, EdgeInput::Pair { a, b }) => {
                float_violations(a, b, context.round_number).resident_upfloat_two_ago as Weight
            }
            (Self::RepeatDownfloatScoreDiff, EdgeInput::Pair { a, b }) => {
                float_violations(a, b, context.round_number).repeat_downfloat_score_diff as Weight
            }
            (Self::RepeatUpfloatScoreDiff, EdgeInput::Pair { a, b }) => {
                float_violations(a, b, context.round_number).repeat_upfloat_score_diff as Weight
            }
            (Self::DownfloatTwoAgoScoreDiff, EdgeInput::Pair { a, b }) => {
                float_violations(a, b, context.round_number).downfloat_two_ago_score_diff as Weight
            }
            (Self::UpfloatTwoAgoScoreDiff, EdgeInput::Pair { a, b }) => {
                float_violations(a, b, context.round_number).upfloat_two_ago_score_diff as Weight
            }
            (Self::Ranking, EdgeInput::Pair { a, b }) => {
                if a.score != b.score {
                    // cross-score pairs sit outside the S1/S2 split entirely
                    return self.per_edge_max(context);
                }
                let actual = (a.pairing_number as Weight - b.pairing_number as Weight).abs();
                let ideal = (context.scoregroup_size(a.score) / 2) as Weight;
                (actual - ideal).abs()
            }
            (Self::Ranking, EdgeInput::ByeCandidate { player }) => {
                // the lowest-ranked eligible candidate is the ideal recipient
                context.player_count.saturating_sub(1) as Weight - player.pairing_number as Weight
            }
            _ => panic!("criterion {self:?} priced against the wrong edge kind"),
        }
    }
}

/// suffix products of the per-criterion bases, highest priority first;
/// multipliers[i] is what one penalty step of criterion i is worth
pub fn criterion_multipliers(context: &WeightContext) -> Vec<Weight> {
    let order = &Criterion::PRIORITY_ORDER;
    let mut multipliers = vec![1 as Weight; order.len()];
    for index in (0..order.len() - 1).rev() {
        let base = context.edge_count as Weight * order[index + 1].per_edge_max(context) + 1;
        multipliers[index] = multipliers[index + 1] * base;
    }
    multipliers
}

/// weight of one edge: the sum of `(max - penalty) * multiplier` over every
/// criterion applicable to its kind, so lower penalties mean higher weight
pub fn edge_weight(input: &EdgeInput, context: &WeightContext, multipliers: &[Weight]) -> Weight {
    let kind = input.kind();
    let mut weight = 0;
    for (index, criterion) in Criterion::PRIORITY_ORDER.iter().enumerate() {
        if !criterion.applies_to(kind) {
            continue;
        }
        let max = criterion.per_edge_max(context);
        let penalty = criterion.penalty(input, context);
        debug_assert!(
            (0..=max).contains(&penalty),
            "criterion {criterion:?} produced penalty {penalty} outside 0..={max}"
        );
        weight += (max - penalty) * multipliers[index];
    }
    weight
}

/// an upper bound on any edge weight this context can produce, used by the
/// driver's overflow sanity check
pub fn max_possible_edge_weight(context: &WeightContext, multipliers: &[Weight]) -> Weight {
    Criterion::PRIORITY_ORDER
        .iter()
        .enumerate()
        .map(|(index, criterion)| criterion.per_edge_max(context) * multipliers[index])
        .sum()
}

/// build the compatibility graph: one node per player in input order, an edge
/// for every pair admissible under C1 and C3, and, for an odd field, the
/// distinguished bye node connected to every player who can still receive it
pub fn build_pairing_graph(
    players: &[PlayerEntry],
    context: &WeightContext,
    multipliers: &[Weight],
) -> PairingGraph {
    let mut graph = PairingGraph::new();
    for player in players {
        graph.add_node(&player.entity_id);
    }
    if context.odd_player_count {
        graph.add_node(PAB_NODE_KEY);
    }
    for (a, b) in players.iter().tuple_combinations() {
        if have_met(a, b) || !colour_compatible(a, b, context.round_number) {
            continue;
        }
        let weight = edge_weight(&EdgeInput::Pair { a, b }, context, multipliers);
        graph.add_edge(&a.entity_id, &b.entity_id, weight);
    }
    if context.odd_player_count {
        for player in players {
            if pab_eligible(player) {
                let weight = edge_weight(&EdgeInput::ByeCandidate { player }, context, multipliers);
                graph.add_edge(&player.entity_id, PAB_NODE_KEY, weight);
            }
        }
    }
    graph
}
