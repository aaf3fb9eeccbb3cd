use serde::{Deserialize, Serialize};

cfg_if::cfg_if! {
    if #[cfg(feature="i64_weight")] {
        /// use i64 to store edge weights, enough for club-sized tournaments
        pub type Weight = i64;
    } else {
        /// the mixed-radix criterion encoding needs wide integers; i128 holds the
        /// deepest multiplier for tournaments of up to roughly a hundred players
        pub type Weight = i128;
    }
}

pub type VertexIndex = usize;
pub type VertexNum = usize;
/// blossom ids share the vertex index space: ids below the vertex count are
/// trivial blossoms, ids at or above it are non-trivial
pub type BlossomIndex = usize;
pub type RoundNumber = u32;
/// score in half-point units (a win is 2, a draw 1, a loss 0)
pub type Score = i64;

/// step budget for blossom-chain and alternating-tree traversals; exceeding it
/// indicates a cycle in the matcher state and aborts with a diagnostic
pub const TRAVERSAL_STEP_LIMIT: usize = 1_000_000;

/// the colour a player holds in one game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Colour {
    White,
    Black,
}

impl Colour {
    pub fn opposite(&self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }

    /// the colour-index contribution of playing this colour
    pub fn index_delta(&self) -> i32 {
        match self {
            Self::White => 1,
            Self::Black => -1,
        }
    }
}

/// one finished game from a player's history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameRecord {
    /// the opponent in that game
    pub opponent_id: String,
    /// the colour this player held
    pub colour: Colour,
    /// the round the game was played in (1-based)
    pub round_number: RoundNumber,
}

/// rounds in which a player was paired outside their scoregroup
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FloatHistory {
    /// rounds in which the player was paired against a lower scoregroup
    pub downfloated_rounds: Vec<RoundNumber>,
    /// rounds in which the player was paired against a higher scoregroup
    pub upfloated_rounds: Vec<RoundNumber>,
}

impl FloatHistory {
    pub fn downfloated_in(&self, round: RoundNumber) -> bool {
        self.downfloated_rounds.contains(&round)
    }

    pub fn upfloated_in(&self, round: RoundNumber) -> bool {
        self.upfloated_rounds.contains(&round)
    }
}

/// everything the engine consumes about one player; assembled by the caller
/// from its own storage before a round is paired
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlayerEntry {
    /// stable identifier, unique within the round
    pub entity_id: String,
    /// 0-based rank after the initial ordering step (score desc, rating desc,
    /// deterministic tiebreak); assigned upstream, unique within the round
    pub pairing_number: usize,
    /// accumulated score in half-point units
    pub score: Score,
    /// accumulated colour imbalance: +1 per white game, -1 per black game
    pub colour_index: i32,
    /// finished games, byes excluded
    pub previous_games: Vec<GameRecord>,
    /// whether the player already received a pairing-allocated bye
    pub received_bye: bool,
    /// up/down float bookkeeping
    #[serde(default)]
    pub float_history: FloatHistory,
}

impl PlayerEntry {
    /// a bare player with no history, as it looks before round 1
    pub fn new(entity_id: String, pairing_number: usize) -> Self {
        Self {
            entity_id,
            pairing_number,
            score: 0,
            colour_index: 0,
            previous_games: Vec::new(),
            received_bye: false,
            float_history: FloatHistory::default(),
        }
    }

    pub fn has_played(&self, opponent_id: &str) -> bool {
        self.previous_games.iter().any(|game| game.opponent_id == opponent_id)
    }

    /// colours held, most recent round first
    pub fn colours_most_recent_first(&self) -> Vec<Colour> {
        let mut games: Vec<&GameRecord> = self.previous_games.iter().collect();
        games.sort_by(|a, b| b.round_number.cmp(&a.round_number));
        games.iter().map(|game| game.colour).collect()
    }

    /// the colour held in the most recent game, if any
    pub fn last_colour(&self) -> Option<Colour> {
        self.colours_most_recent_first().first().copied()
    }
}

/// one decoded pairing with colours assigned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColouredPair {
    pub white_id: String,
    pub black_id: String,
}

/// the result of pairing one round: ordered coloured pairs plus the
/// pairing-allocated bye recipient when the player count is odd
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundPairing {
    pub pairs: Vec<ColouredPair>,
    pub bye: Option<String>,
}

impl RoundPairing {
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty() && self.bye.is_none()
    }

    /// ids of every player covered by this pairing, pairs first
    pub fn covered_players(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::with_capacity(self.pairs.len() * 2 + 1);
        for pair in self.pairs.iter() {
            ids.push(pair.white_id.as_str());
            ids.push(pair.black_id.as_str());
        }
        if let Some(bye) = &self.bye {
            ids.push(bye.as_str());
        }
        ids
    }
}

pub type DeterministicRng = rand_xoshiro::Xoshiro256StarStar;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn util_colour_history_ordering() {
        // cargo test util_colour_history_ordering -- --nocapture
        let mut player = PlayerEntry::new("p1".to_string(), 0);
        player.previous_games = vec![
            GameRecord { opponent_id: "a".to_string(), colour: Colour::White, round_number: 1 },
            GameRecord { opponent_id: "c".to_string(), colour: Colour::White, round_number: 3 },
            GameRecord { opponent_id: "b".to_string(), colour: Colour::Black, round_number: 2 },
        ];
        assert_eq!(
            player.colours_most_recent_first(),
            vec![Colour::White, Colour::Black, Colour::White]
        );
        assert_eq!(player.last_colour(), Some(Colour::White));
        assert!(player.has_played("b"));
        assert!(!player.has_played("d"));
    }

    #[test]
    fn util_round_pairing_serde_round_trip() {
        // cargo test util_round_pairing_serde_round_trip -- --nocapture
        let pairing = RoundPairing {
            pairs: vec![ColouredPair { white_id: "a".to_string(), black_id: "b".to_string() }],
            bye: Some("c".to_string()),
        };
        let text = serde_json::to_string(&pairing).unwrap();
        let parsed: RoundPairing = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, pairing);
        assert_eq!(parsed.covered_players(), vec!["a", "b", "c"]);
    }
}
