//! Trait mutation controller.
//!
//! On a configurable cadence, asks the advisory oracle for a
//! trait-adjustment recommendation and merges it into the agent's memory
//! stream as a new durable node. Mutation is advisory: a failure at the
//! oracle call or the append is logged and the round proceeds without a
//! new suggestion.

use crate::agent::GenerativeAgent;
use crate::memory::{NodeDraft, NodeType};
use crate::oracles::AdvisoryOracle;
use serde::Deserialize;
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::{error, info};

/// System prompt for the advisory oracle.
pub const COACH_SYSTEM_PROMPT: &str = "You are a strategy coach for game-theoretic agents.";

/// User prompt steering the backend toward one of the four strategic axes.
///
/// The axes follow the iterated prisoner's dilemma strategy literature:
/// nice (cooperation), retaliatory (punishment), forgiving
/// (reconciliation), clear (consistency).
pub const COACH_USER_PROMPT: &str = "Analyze the agent's iterated prisoner's dilemma strategy \
    and suggest a trait adjustment to maximize points. The point is to win at any cost. \
    Focus on one of: Nice (cooperation), Retaliatory (punishment), \
    Forgiving (reconciliation), Clear (consistency). \
    Format: 'Trait: adjustment direction with strategic reasoning'. \
    Reply with a JSON object with fields: content (string, the recommendation), \
    importance (integer salience), created (integer time step), \
    last_retrieved (integer time step).";

fn default_importance() -> i64 {
    85
}

/// A trait-adjustment record as returned by the advisory oracle.
///
/// Everything a [`crate::memory::MemoryNode`] holds except `node_id`,
/// which is assigned by the store at append time. A placeholder id in the
/// backend's payload is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct TraitAdjustment {
    /// The natural-language recommendation.
    pub content: String,

    /// Salience score; the backend's schema default is 85.
    #[serde(default = "default_importance")]
    pub importance: i64,

    /// Logical time step the adjustment was produced for.
    pub created: u64,

    /// Logical time step of last retrieval.
    pub last_retrieved: u64,
}

impl TraitAdjustment {
    /// Convert into a store draft tagged as a trait adjustment.
    pub fn into_draft(self) -> NodeDraft {
        NodeDraft {
            node_type: NodeType::TraitAdjustment,
            content: self.content,
            importance: self.importance,
            created: self.created,
            last_retrieved: self.last_retrieved,
            pointer_id: None,
        }
    }
}

/// Configuration for the mutation controller.
#[derive(Debug, Clone)]
pub struct MutationConfig {
    /// Trigger a mutation every `cadence` rounds.
    ///
    /// Defaults to 1, i.e. every round. The observed reference behavior
    /// was an always-true modulus; the divisor is explicit here so the
    /// frequency can be tuned.
    pub cadence: NonZeroU32,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            cadence: NonZeroU32::new(1).expect("1 is non-zero"),
        }
    }
}

/// Periodically merges advisory trait adjustments into agent memory.
///
/// Append-only semantics: every successful trigger appends a new distinct
/// node. Running twice in the same round yields two suggestions, not an
/// overwrite; the trait history is a log of independent recommendations,
/// not a current-state register.
pub struct TraitMutationController {
    advisory: Arc<dyn AdvisoryOracle>,
    config: MutationConfig,
}

impl TraitMutationController {
    /// Create a controller over an advisory oracle.
    pub fn new(advisory: Arc<dyn AdvisoryOracle>) -> Self {
        Self {
            advisory,
            config: MutationConfig::default(),
        }
    }

    /// Configure the controller.
    pub fn with_config(mut self, config: MutationConfig) -> Self {
        self.config = config;
        self
    }

    /// Whether round `round` is on the mutation cadence.
    pub fn is_due(&self, round: u64) -> bool {
        round % u64::from(self.config.cadence.get()) == 0
    }

    /// Run one mutation trigger for `round`.
    ///
    /// Off-cadence rounds are skipped. Failures at the oracle call or the
    /// append are logged and swallowed; the absence of a new advisory must
    /// never block the round's move decision. Retries, if any, belong to
    /// the oracle client's transport layer.
    pub async fn run(&self, round: u64, agent: &mut GenerativeAgent) {
        if !self.is_due(round) {
            return;
        }

        let adjustment = match self
            .advisory
            .request_adjustment(COACH_SYSTEM_PROMPT, COACH_USER_PROMPT)
            .await
        {
            Ok(adjustment) => adjustment,
            Err(e) => {
                error!(round, error = %e, "advisory oracle failed; no adjustment this round");
                return;
            }
        };

        match agent.append_adjustment(adjustment).await {
            Ok(node_id) => {
                info!(round, node_id, "trait adjustment appended");
            }
            Err(e) => {
                error!(round, error = %e, "failed to persist trait adjustment");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::testing::{AdvisoryOutcome, MockAdvisoryOracle, MockDecisionOracle};
    use tempfile::TempDir;
    use uuid::Uuid;

    async fn temp_agent(temp_dir: &TempDir) -> GenerativeAgent {
        let store = MemoryStore::open_or_create(temp_dir.path(), Uuid::new_v4())
            .await
            .unwrap();
        GenerativeAgent::new(store, Arc::new(MockDecisionOracle::always("Yes")))
    }

    #[test]
    fn test_trait_adjustment_importance_defaults() {
        let adjustment: TraitAdjustment = serde_json::from_str(
            r#"{"content": "Clear: stay predictable", "created": 2, "last_retrieved": 2}"#,
        )
        .unwrap();
        assert_eq!(adjustment.importance, 85);
    }

    #[test]
    fn test_trait_adjustment_ignores_backend_placeholder_id() {
        let adjustment: TraitAdjustment = serde_json::from_str(
            r#"{"node_id": 999, "content": "Nice: cooperate more", "importance": 70,
                "created": 1, "last_retrieved": 1}"#,
        )
        .unwrap();
        assert_eq!(adjustment.content, "Nice: cooperate more");
    }

    #[tokio::test]
    async fn test_successful_mutation_appends_with_next_id() {
        let temp_dir = TempDir::new().unwrap();
        let mut agent = temp_agent(&temp_dir).await;

        // Pre-existing nodes take ids 1..=3.
        for time_step in 0..3 {
            agent.remember("warmup", time_step).await;
        }

        let controller =
            TraitMutationController::new(Arc::new(MockAdvisoryOracle::always_succeeding(4)));
        controller.run(4, &mut agent).await;

        let last = agent.store().nodes().last().unwrap();
        assert_eq!(last.node_id, 4);
        assert_eq!(last.node_type, NodeType::TraitAdjustment);
    }

    #[tokio::test]
    async fn test_failing_oracle_leaves_store_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let mut agent = temp_agent(&temp_dir).await;

        let controller = TraitMutationController::new(Arc::new(MockAdvisoryOracle::scripted(
            vec![AdvisoryOutcome::Unavailable, AdvisoryOutcome::SchemaViolation],
        )));

        controller.run(1, &mut agent).await;
        controller.run(2, &mut agent).await;

        assert!(agent.store().is_empty());
    }

    #[tokio::test]
    async fn test_cadence_gates_triggers() {
        let temp_dir = TempDir::new().unwrap();
        let mut agent = temp_agent(&temp_dir).await;

        let controller =
            TraitMutationController::new(Arc::new(MockAdvisoryOracle::always_succeeding(1)))
                .with_config(MutationConfig {
                    cadence: NonZeroU32::new(3).unwrap(),
                });

        for round in 1..=6 {
            controller.run(round, &mut agent).await;
        }

        // Rounds 3 and 6 are on cadence.
        assert_eq!(agent.store().len(), 2);
    }

    #[tokio::test]
    async fn test_double_trigger_appends_two_nodes() {
        let temp_dir = TempDir::new().unwrap();
        let mut agent = temp_agent(&temp_dir).await;

        let controller =
            TraitMutationController::new(Arc::new(MockAdvisoryOracle::always_succeeding(1)));

        controller.run(1, &mut agent).await;
        controller.run(1, &mut agent).await;

        assert_eq!(agent.store().len(), 2);
        let ids: Vec<u64> = agent.store().nodes().iter().map(|n| n.node_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }
}
