//! Minimal iterated prisoner's dilemma match runtime.
//!
//! A two-player sequential game loop with move histories and standard
//! payoffs. One match, two players; tournament scheduling and
//! population-scale selection are out of scope.

use async_trait::async_trait;
use std::fmt;

/// A move in the iterated prisoner's dilemma.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    Cooperate,
    Defect,
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Move::Cooperate => write!(f, "C"),
            Move::Defect => write!(f, "D"),
        }
    }
}

/// Standard payoff matrix: reward 3, sucker 0, temptation 5, punishment 1.
pub fn payoff(own: Move, other: Move) -> u32 {
    match (own, other) {
        (Move::Cooperate, Move::Cooperate) => 3,
        (Move::Cooperate, Move::Defect) => 0,
        (Move::Defect, Move::Cooperate) => 5,
        (Move::Defect, Move::Defect) => 1,
    }
}

/// A per-round decision function.
///
/// Strategies receive read-only views of both move histories and must
/// return a legal move every round.
#[async_trait]
pub trait Strategy: Send {
    /// The strategy's display name.
    fn name(&self) -> &str;

    /// Choose a move given both players' histories so far.
    async fn play(&mut self, own_history: &[Move], opponent_history: &[Move]) -> Move;
}

/// Cooperate first, then mirror the opponent's previous move.
pub struct TitForTat;

#[async_trait]
impl Strategy for TitForTat {
    fn name(&self) -> &str {
        "Tit For Tat"
    }

    async fn play(&mut self, _own_history: &[Move], opponent_history: &[Move]) -> Move {
        opponent_history.last().copied().unwrap_or(Move::Cooperate)
    }
}

/// Ordered move histories for both players of a match.
#[derive(Debug, Default, Clone)]
pub struct MatchState {
    first: Vec<Move>,
    second: Vec<Move>,
}

impl MatchState {
    /// The first player's move history.
    pub fn first(&self) -> &[Move] {
        &self.first
    }

    /// The second player's move history.
    pub fn second(&self) -> &[Move] {
        &self.second
    }

    /// Number of completed rounds.
    pub fn rounds(&self) -> usize {
        self.first.len()
    }
}

/// Outcome of a completed match.
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    /// Cumulative scores for (first, second).
    pub scores: (u32, u32),

    /// Per-round move pairs in play order.
    pub moves: Vec<(Move, Move)>,

    /// Name of the higher-scoring player, or `None` on a tie.
    pub winner: Option<String>,
}

/// A two-player iterated match.
pub struct Match {
    first: Box<dyn Strategy>,
    second: Box<dyn Strategy>,
    state: MatchState,
}

impl Match {
    /// Create a match between two strategies.
    pub fn new(first: Box<dyn Strategy>, second: Box<dyn Strategy>) -> Self {
        Self {
            first,
            second,
            state: MatchState::default(),
        }
    }

    /// Play `turns` rounds and return the outcome.
    ///
    /// Rounds are strictly sequential: both moves for round N (and their
    /// side effects inside the strategies) complete before round N+1
    /// starts. Moves are revealed simultaneously within a round; each
    /// strategy sees histories only up to the previous round.
    pub async fn play(&mut self, turns: usize) -> MatchOutcome {
        let mut scores = (0u32, 0u32);
        let mut moves = Vec::with_capacity(turns);

        for _ in 0..turns {
            let move_a = self
                .first
                .play(&self.state.first, &self.state.second)
                .await;
            let move_b = self
                .second
                .play(&self.state.second, &self.state.first)
                .await;

            self.state.first.push(move_a);
            self.state.second.push(move_b);

            scores.0 += payoff(move_a, move_b);
            scores.1 += payoff(move_b, move_a);
            moves.push((move_a, move_b));

            tracing::info!(
                round = self.state.rounds(),
                first = %move_a,
                second = %move_b,
                "round complete"
            );
        }

        let winner = match scores.0.cmp(&scores.1) {
            std::cmp::Ordering::Greater => Some(self.first.name().to_string()),
            std::cmp::Ordering::Less => Some(self.second.name().to_string()),
            std::cmp::Ordering::Equal => None,
        };

        MatchOutcome {
            scores,
            moves,
            winner,
        }
    }

    /// The match state so far.
    pub fn state(&self) -> &MatchState {
        &self.state
    }
}
