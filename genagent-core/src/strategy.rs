//! Memory-backed game strategy.
//!
//! [`MemoryStrategy`] binds the decision engine and the mutation
//! controller into a single per-round decision function for the match
//! runtime. Each round: record the opponent's previous move as a memory
//! event, advance the logical clock, trigger a trait mutation, then ask
//! the agent whether to cooperate. Every failure path inside these steps
//! degrades to a legal move; a round never aborts the match.

use crate::agent::GenerativeAgent;
use crate::match_play::{Move, Strategy};
use crate::mutation::TraitMutationController;
use async_trait::async_trait;
use tracing::info;

/// The fixed binary question put to the agent each round.
pub const DECISION_QUESTION: &str = "Should I cooperate with my opponent?";

/// Option labels for the decision question.
pub const DECISION_OPTIONS: [&str; 2] = ["Yes", "No"];

/// Configuration for the strategy adapter.
#[derive(Debug, Clone)]
pub struct StrategyConfig {
    /// Move emitted when decision-making fails end to end.
    ///
    /// Cooperate by default: the cost of a wrong conservative guess is
    /// one round's payoff, while aborting forfeits the rest of the match.
    pub default_move: Move,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            default_move: Move::Cooperate,
        }
    }
}

/// A strategy whose moves come from a memory-backed agent.
pub struct MemoryStrategy {
    agent: GenerativeAgent,
    mutation: TraitMutationController,
    config: StrategyConfig,
    time_step: u64,
}

impl MemoryStrategy {
    /// Create a strategy over an agent and a mutation controller.
    ///
    /// The logical time-step counter starts at 0 and advances once per
    /// round regardless of outcome.
    pub fn new(agent: GenerativeAgent, mutation: TraitMutationController) -> Self {
        Self {
            agent,
            mutation,
            config: StrategyConfig::default(),
            time_step: 0,
        }
    }

    /// Configure the strategy.
    pub fn with_config(mut self, config: StrategyConfig) -> Self {
        self.config = config;
        self
    }

    /// Current logical time step.
    pub fn time_step(&self) -> u64 {
        self.time_step
    }

    /// The underlying agent.
    pub fn agent(&self) -> &GenerativeAgent {
        &self.agent
    }
}

#[async_trait]
impl Strategy for MemoryStrategy {
    fn name(&self) -> &str {
        "GenAgent"
    }

    async fn play(&mut self, _own_history: &[Move], opponent_history: &[Move]) -> Move {
        // Record the opponent's previous move, if there is one, at the
        // current (pre-increment) time step.
        if let Some(last) = opponent_history.last() {
            let verb = match last {
                Move::Cooperate => "cooperated",
                Move::Defect => "defected",
            };
            self.agent
                .remember(
                    &format!("Opponent {verb} in the last round"),
                    self.time_step,
                )
                .await;
        }

        self.time_step += 1;

        // Advisory mutation runs before the decision; its failure is
        // handled inside the controller and never blocks the move.
        self.mutation.run(self.time_step, &mut self.agent).await;

        let answer = self
            .agent
            .decide(DECISION_QUESTION, &DECISION_OPTIONS)
            .await;

        let chosen = if answer == "Yes" {
            Move::Cooperate
        } else if answer == "No" {
            Move::Defect
        } else {
            // decide() fail-opens to a configured option, so this arm only
            // fires when that option is outside the Yes/No set.
            self.config.default_move
        };

        info!(round = self.time_step, answer = %answer, %chosen, "move emitted");
        chosen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryStore, NodeType};
    use crate::testing::{
        AdvisoryOutcome, MockAdvisoryOracle, MockDecisionOracle, MockOutcome,
    };
    use std::sync::Arc;
    use tempfile::TempDir;
    use uuid::Uuid;

    async fn strategy_with(
        temp_dir: &TempDir,
        decision: MockDecisionOracle,
        advisory: MockAdvisoryOracle,
    ) -> MemoryStrategy {
        let store = MemoryStore::open_or_create(temp_dir.path(), Uuid::new_v4())
            .await
            .unwrap();
        let agent = GenerativeAgent::new(store, Arc::new(decision));
        let mutation = TraitMutationController::new(Arc::new(advisory));
        MemoryStrategy::new(agent, mutation)
    }

    fn observation_count(strategy: &MemoryStrategy) -> usize {
        strategy
            .agent()
            .store()
            .nodes()
            .iter()
            .filter(|n| n.node_type == NodeType::Observation)
            .count()
    }

    // Scenario A: no opponent history, oracle answers Yes.
    #[tokio::test]
    async fn test_first_round_cooperates_without_observation() {
        let temp_dir = TempDir::new().unwrap();
        let mut strategy = strategy_with(
            &temp_dir,
            MockDecisionOracle::always("Yes"),
            MockAdvisoryOracle::scripted(vec![AdvisoryOutcome::Unavailable]),
        )
        .await;

        let chosen = strategy.play(&[], &[]).await;

        assert_eq!(chosen, Move::Cooperate);
        assert_eq!(observation_count(&strategy), 0);
        assert_eq!(strategy.time_step(), 1);
    }

    // Scenario B: opponent defected last round, oracle answers No.
    #[tokio::test]
    async fn test_defection_is_remembered_before_deciding() {
        let temp_dir = TempDir::new().unwrap();
        let mut strategy = strategy_with(
            &temp_dir,
            MockDecisionOracle::always("No"),
            MockAdvisoryOracle::scripted(vec![AdvisoryOutcome::Unavailable]),
        )
        .await;

        let chosen = strategy
            .play(&[Move::Cooperate], &[Move::Defect])
            .await;

        assert_eq!(chosen, Move::Defect);
        assert_eq!(observation_count(&strategy), 1);
        let observation = &strategy.agent().store().nodes()[0];
        assert!(observation.content.contains("defected"));
        assert_eq!(observation.created, 0);
    }

    // Scenario C: transport failure at the decision oracle.
    #[tokio::test]
    async fn test_transport_error_emits_conservative_default() {
        let temp_dir = TempDir::new().unwrap();
        let mut strategy = strategy_with(
            &temp_dir,
            MockDecisionOracle::scripted(vec![MockOutcome::Unavailable]),
            MockAdvisoryOracle::scripted(vec![AdvisoryOutcome::Unavailable]),
        )
        .await;

        let chosen = strategy.play(&[], &[]).await;
        assert_eq!(chosen, Move::Cooperate);
    }

    // Scenario D: advisory succeeds over a store holding ids {0, 1, 2}.
    #[tokio::test]
    async fn test_adjustment_takes_max_id_plus_one() {
        let temp_dir = TempDir::new().unwrap();
        let agent_id = Uuid::new_v4();
        let path = crate::memory::nodes_path(temp_dir.path(), agent_id);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let seeded = serde_json::json!([
            {"node_id": 0, "node_type": "observation", "content": "a",
             "importance": 50, "created": 0, "last_retrieved": 0, "pointer_id": null},
            {"node_id": 1, "node_type": "observation", "content": "b",
             "importance": 50, "created": 1, "last_retrieved": 1, "pointer_id": null},
            {"node_id": 2, "node_type": "observation", "content": "c",
             "importance": 50, "created": 2, "last_retrieved": 2, "pointer_id": null}
        ]);
        std::fs::write(&path, seeded.to_string()).unwrap();

        let store = MemoryStore::load(temp_dir.path(), agent_id).await.unwrap();
        let agent =
            GenerativeAgent::new(store, Arc::new(MockDecisionOracle::always("Yes")));
        let mutation =
            TraitMutationController::new(Arc::new(MockAdvisoryOracle::always_succeeding(1)));
        let mut strategy = MemoryStrategy::new(agent, mutation);

        strategy.play(&[], &[]).await;

        let adjustment = strategy
            .agent()
            .store()
            .nodes()
            .iter()
            .find(|n| n.node_type == NodeType::TraitAdjustment)
            .expect("adjustment should be appended");
        assert_eq!(adjustment.node_id, 3);
    }

    #[tokio::test]
    async fn test_failing_advisory_never_blocks_the_move() {
        let temp_dir = TempDir::new().unwrap();
        let mut strategy = strategy_with(
            &temp_dir,
            MockDecisionOracle::always("No"),
            MockAdvisoryOracle::scripted(vec![
                AdvisoryOutcome::SchemaViolation,
                AdvisoryOutcome::Unavailable,
            ]),
        )
        .await;

        assert_eq!(strategy.play(&[], &[]).await, Move::Defect);
        assert_eq!(
            strategy.play(&[Move::Defect], &[Move::Cooperate]).await,
            Move::Defect
        );
        assert_eq!(strategy.time_step(), 2);
    }

    #[tokio::test]
    async fn test_full_match_against_tit_for_tat() {
        use crate::match_play::{Match, TitForTat};

        let temp_dir = TempDir::new().unwrap();
        let strategy = strategy_with(
            &temp_dir,
            MockDecisionOracle::scripted(vec![
                MockOutcome::Answer("No".to_string()),
                MockOutcome::Answer("No".to_string()),
                MockOutcome::Answer("Yes".to_string()),
            ]),
            MockAdvisoryOracle::always_succeeding(1),
        )
        .await;

        let mut game = Match::new(Box::new(strategy), Box::new(TitForTat));
        let outcome = game.play(3).await;

        // D/C, D/D, C/D -> 5+1+0 vs 0+1+5.
        assert_eq!(outcome.scores, (6, 6));
        assert_eq!(
            outcome.moves,
            vec![
                (Move::Defect, Move::Cooperate),
                (Move::Defect, Move::Defect),
                (Move::Cooperate, Move::Defect),
            ]
        );
    }
}
