//! Swiss Criteria
//!
//! The FIDE side of the reduction: admissibility of a pair under the absolute
//! criteria (C1 no repeat, C3 colour compatibility), bye eligibility, the
//! colour assignment rule of C.04.2.D, and the per-pair violation counts the
//! weight encoder turns into penalties (C10 through C21).
//!

use super::util::*;
use std::cmp::Ordering;

/// a topscorer has more than 50% of the maximum score achievable before this
/// round; topscorers live under relaxed colour constraints
pub fn is_topscorer(player: &PlayerEntry, round_number: RoundNumber) -> bool {
    // maximum achievable so far is a win per round, 2 half-points each
    player.score > (round_number as Score - 1)
}

/// C1: two players shall not meet twice
pub fn have_met(a: &PlayerEntry, b: &PlayerEntry) -> bool {
    a.has_played(&b.entity_id) || b.has_played(&a.entity_id)
}

/// an absolute colour preference pins the next colour (imbalance of two or
/// more); only topscorers may play against it
pub fn absolute_colour_preference(player: &PlayerEntry) -> Option<Colour> {
    if player.colour_index >= 2 {
        Some(Colour::Black)
    } else if player.colour_index <= -2 {
        Some(Colour::White)
    } else {
        None
    }
}

/// a strong preference arises from any imbalance
pub fn strong_colour_preference(player: &PlayerEntry) -> Option<Colour> {
    if player.colour_index >= 1 {
        Some(Colour::Black)
    } else if player.colour_index <= -1 {
        Some(Colour::White)
    } else {
        None
    }
}

/// the colour a player would rather have: balance the index, or alternate
/// from the latest game when the index is level
pub fn preferred_colour(player: &PlayerEntry) -> Option<Colour> {
    strong_colour_preference(player).or_else(|| player.last_colour().map(|colour| colour.opposite()))
}

/// C3: a pair is admissible unless both players carry the same absolute
/// preference and neither is a topscorer
pub fn colour_compatible(a: &PlayerEntry, b: &PlayerEntry, round_number: RoundNumber) -> bool {
    match (absolute_colour_preference(a), absolute_colour_preference(b)) {
        (Some(first), Some(second)) if first == second => {
            is_topscorer(a, round_number) || is_topscorer(b, round_number)
        }
        _ => true,
    }
}

/// a player may receive the pairing-allocated bye only once
pub fn pab_eligible(player: &PlayerEntry) -> bool {
    !player.received_bye
}

/// the colour assignment rule of FIDE C.04.2.D, returned as (white, black).
/// The player with the smaller (more due-white) colour index plays white;
/// level indices alternate against the most recent round where the two
/// histories differ; identical histories grant the higher-ranked player
/// their due colour, defaulting to white
pub fn assign_colours<'a>(p: &'a PlayerEntry, q: &'a PlayerEntry) -> (&'a PlayerEntry, &'a PlayerEntry) {
    match p.colour_index.cmp(&q.colour_index) {
        Ordering::Less => (p, q),
        Ordering::Greater => (q, p),
        Ordering::Equal => {
            let p_colours = p.colours_most_recent_first();
            let q_colours = q.colours_most_recent_first();
            for (p_colour, q_colour) in p_colours.iter().zip(q_colours.iter()) {
                if p_colour != q_colour {
                    // whoever had white at the first difference plays black now
                    return if *p_colour == Colour::White { (q, p) } else { (p, q) };
                }
            }
            let (higher, lower) = if p.pairing_number <= q.pairing_number {
                (p, q)
            } else {
                (q, p)
            };
            let due = match preferred_colour(higher) {
                Some(colour) => colour,
                None => Colour::White,
            };
            match due {
                Colour::White => (higher, lower),
                Colour::Black => (lower, higher),
            }
        }
    }
}

/// colour-quality violation counts of one prospective pair, evaluated against
/// the colours the pair would actually receive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColourViolations {
    /// topscorers whose colour difference would pass +2 or -2 (C10)
    pub topscorer_wide_imbalance: u32,
    /// topscorers who would hold the same colour three times in a row (C11)
    pub topscorer_triple_colour: u32,
    /// players not receiving their colour preference (C12)
    pub missed_preference: u32,
    /// players with a strong preference not receiving it (C13)
    pub missed_strong_preference: u32,
}

pub fn colour_violations(a: &PlayerEntry, b: &PlayerEntry, round_number: RoundNumber) -> ColourViolations {
    let (white, black) = assign_colours(a, b);
    let mut violations = ColourViolations::default();
    for (player, colour) in [(white, Colour::White), (black, Colour::Black)] {
        let topscorer = is_topscorer(player, round_number);
        let new_index = player.colour_index + colour.index_delta();
        if topscorer && new_index.abs() > 2 {
            violations.topscorer_wide_imbalance += 1;
        }
        if topscorer {
            let recent = player.colours_most_recent_first();
            if recent.len() >= 2 && recent[0] == colour && recent[1] == colour {
                violations.topscorer_triple_colour += 1;
            }
        }
        if let Some(preference) = preferred_colour(player) {
            if preference != colour {
                violations.missed_preference += 1;
            }
        }
        if let Some(preference) = strong_colour_preference(player) {
            if preference != colour {
                violations.missed_strong_preference += 1;
            }
        }
    }
    violations
}

/// float-quality violations of one prospective pair; all zero for same-score
/// pairs, otherwise the higher-scored player is the moved-down player and the
/// lower-scored one the upfloating resident
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FloatViolations {
    /// the MDP downfloated in the previous round as well (C14)
    pub mdp_repeat_downfloat: u32,
    /// the resident upfloated in the previous round as well (C15)
    pub resident_repeat_upfloat: u32,
    /// the MDP downfloated two rounds ago (C16)
    pub mdp_downfloat_two_ago: u32,
    /// the resident upfloated two rounds ago (C17)
    pub resident_upfloat_two_ago: u32,
    /// score difference carried by a repeated downfloat (C18)
    pub repeat_downfloat_score_diff: Score,
    /// score difference carried by a repeated upfloat (C19)
    pub repeat_upfloat_score_diff: Score,
    /// score difference carried by a downfloat repeated from two rounds ago (C20)
    pub downfloat_two_ago_score_diff: Score,
    /// score difference carried by an upfloat repeated from two rounds ago (C21)
    pub upfloat_two_ago_score_diff: Score,
}

pub fn float_violations(a: &PlayerEntry, b: &PlayerEntry, round_number: RoundNumber) -> FloatViolations {
    let mut violations = FloatViolations::default();
    if a.score == b.score {
        return violations;
    }
    let (mdp, resident) = if a.score > b.score { (a, b) } else { (b, a) };
    let score_diff = mdp.score - resident.score;
    if round_number >= 2 {
        let previous = round_number - 1;
        if mdp.float_history.downfloated_in(previous) {
            violations.mdp_repeat_downfloat = 1;
            violations.repeat_downfloat_score_diff = score_diff;
        }
        if resident.float_history.upfloated_in(previous) {
            violations.resident_repeat_upfloat = 1;
            violations.repeat_upfloat_score_diff = score_diff;
        }
    }
    if round_number >= 3 {
        let two_ago = round_number - 2;
        if mdp.float_history.downfloated_in(two_ago) {
            violations.mdp_downfloat_two_ago = 1;
            violations.downfloat_two_ago_score_diff = score_diff;
        }
        if resident.float_history.upfloated_in(two_ago) {
            violations.resident_upfloat_two_ago = 1;
            violations.upfloat_two_ago_score_diff = score_diff;
        }
    }
    violations
}
