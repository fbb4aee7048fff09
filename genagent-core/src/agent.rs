//! Memory-backed agent decision engine.
//!
//! The [`GenerativeAgent`] owns one memory store and composes it with the
//! decision oracle: game rounds are translated into memory writes via
//! `remember`, and binary move decisions come from `decide`. Both
//! operations fail open; a storage or oracle failure degrades memory
//! fidelity or falls back to the configured default option, it never
//! aborts the caller's round.

use crate::memory::{MemoryError, MemoryStore, NodeDraft};
use crate::mutation::TraitAdjustment;
use crate::oracles::DecisionOracle;
use std::sync::Arc;
use tracing::{error, warn};

/// Configuration for the decision engine.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Option returned by `decide` when the oracle fails.
    ///
    /// Fixed to "Yes" (cooperate) by default; kept configurable because
    /// the conservative default is a tunable policy, not a constant.
    pub default_option: String,

    /// Salience score assigned to observation nodes.
    pub observation_importance: i64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            default_option: "Yes".to_string(),
            observation_importance: crate::memory::DEFAULT_OBSERVATION_IMPORTANCE,
        }
    }
}

/// The memory-backed decision-making entity.
pub struct GenerativeAgent {
    store: MemoryStore,
    decision: Arc<dyn DecisionOracle>,
    config: AgentConfig,
}

impl GenerativeAgent {
    /// Create an agent over a loaded memory store and a decision oracle.
    pub fn new(store: MemoryStore, decision: Arc<dyn DecisionOracle>) -> Self {
        Self {
            store,
            decision,
            config: AgentConfig::default(),
        }
    }

    /// Configure the agent.
    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    /// Record an observed event at the given logical time step.
    ///
    /// Storage failure is logged and swallowed: a lost memory write
    /// degrades recall, not game correctness.
    pub async fn remember(&mut self, event: &str, time_step: u64) {
        let mut draft = NodeDraft::observation(event, time_step);
        draft.importance = self.config.observation_importance;

        match self.store.append(draft).await {
            Ok(node_id) => {
                tracing::debug!(node_id, time_step, event, "observation recorded");
            }
            Err(e) => {
                warn!(time_step, event, error = %e, "failed to record observation");
            }
        }
    }

    /// Ask the decision oracle a closed question and return the selected
    /// option.
    ///
    /// Any oracle failure is logged (with the raw payload carried inside
    /// the error) and replaced by the configured default option.
    pub async fn decide(&self, question: &str, options: &[&str]) -> String {
        match self.decision.classify(question, options).await {
            Ok(option) => option,
            Err(e) => {
                error!(
                    question,
                    error = %e,
                    default = %self.config.default_option,
                    "decision oracle failed; falling back to default option"
                );
                self.config.default_option.clone()
            }
        }
    }

    /// Append a trait-adjustment record, assigning it a fresh node id.
    ///
    /// Unlike `remember`, storage failures propagate; the mutation
    /// controller decides how to degrade.
    pub async fn append_adjustment(
        &mut self,
        adjustment: TraitAdjustment,
    ) -> Result<u64, MemoryError> {
        self.store.append(adjustment.into_draft()).await
    }

    /// The agent's memory store.
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// Mutable access to the memory store.
    pub fn store_mut(&mut self) -> &mut MemoryStore {
        &mut self.store
    }
}
