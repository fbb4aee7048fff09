//! Testing utilities for the agent core.
//!
//! Scripted mock oracles for deterministic tests without API calls. Each
//! mock pops outcomes from a queue in order and falls back to a default
//! once exhausted.

use crate::mutation::TraitAdjustment;
use crate::oracles::{AdvisoryOracle, DecisionOracle};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// A scripted outcome for the mock decision oracle.
#[derive(Debug, Clone)]
pub enum MockOutcome {
    /// Return this answer (matched against the options like a real reply).
    Answer(String),
    /// Fail with a malformed-response error.
    Malformed,
    /// Fail with an unrecognized-option error.
    Unrecognized,
    /// Fail with a transport error.
    Unavailable,
}

/// A decision oracle that returns scripted outcomes in order.
pub struct MockDecisionOracle {
    outcomes: Mutex<VecDeque<MockOutcome>>,
    /// Answer returned once the script is exhausted.
    fallback: String,
}

impl MockDecisionOracle {
    /// Create a mock with scripted outcomes; falls back to "Yes" after.
    pub fn scripted(outcomes: Vec<MockOutcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            fallback: "Yes".to_string(),
        }
    }

    /// Create a mock that always returns the same answer.
    pub fn always(answer: impl Into<String>) -> Self {
        let answer = answer.into();
        Self {
            outcomes: Mutex::new(VecDeque::new()),
            fallback: answer,
        }
    }
}

#[async_trait]
impl DecisionOracle for MockDecisionOracle {
    async fn classify(
        &self,
        _question: &str,
        options: &[&str],
    ) -> Result<String, oracle::Error> {
        let outcome = self
            .outcomes
            .lock()
            .expect("mock queue poisoned")
            .pop_front()
            .unwrap_or_else(|| MockOutcome::Answer(self.fallback.clone()));

        match outcome {
            MockOutcome::Answer(answer) => {
                let normalized = answer.trim().to_lowercase();
                options
                    .iter()
                    .find(|option| option.trim().to_lowercase() == normalized)
                    .map(|option| option.to_string())
                    .ok_or(oracle::Error::UnrecognizedOption { answer })
            }
            MockOutcome::Malformed => Err(oracle::Error::MalformedResponse {
                detail: "missing `responses` field".to_string(),
                raw: "{}".to_string(),
            }),
            MockOutcome::Unrecognized => Err(oracle::Error::UnrecognizedOption {
                answer: "Maybe".to_string(),
            }),
            MockOutcome::Unavailable => Err(oracle::Error::BackendUnavailable(
                "connection refused".to_string(),
            )),
        }
    }
}

/// A scripted outcome for the mock advisory oracle.
#[derive(Debug, Clone)]
pub enum AdvisoryOutcome {
    /// Return this adjustment.
    Adjustment(TraitAdjustment),
    /// Fail with a schema-violation error.
    SchemaViolation,
    /// Fail with a transport error.
    Unavailable,
}

/// An advisory oracle that returns scripted outcomes in order.
pub struct MockAdvisoryOracle {
    outcomes: Mutex<VecDeque<AdvisoryOutcome>>,
    /// Adjustment returned once the script is exhausted.
    fallback: TraitAdjustment,
}

impl MockAdvisoryOracle {
    /// Create a mock with scripted outcomes; succeeds with a canned
    /// adjustment after the script runs out.
    pub fn scripted(outcomes: Vec<AdvisoryOutcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            fallback: sample_adjustment(0),
        }
    }

    /// Create a mock that always succeeds with a canned adjustment.
    pub fn always_succeeding(time_step: u64) -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::new()),
            fallback: sample_adjustment(time_step),
        }
    }
}

#[async_trait]
impl AdvisoryOracle for MockAdvisoryOracle {
    async fn request_adjustment(
        &self,
        _system: &str,
        _user: &str,
    ) -> Result<TraitAdjustment, oracle::Error> {
        let outcome = self
            .outcomes
            .lock()
            .expect("mock queue poisoned")
            .pop_front()
            .unwrap_or_else(|| AdvisoryOutcome::Adjustment(self.fallback.clone()));

        match outcome {
            AdvisoryOutcome::Adjustment(adjustment) => Ok(adjustment),
            AdvisoryOutcome::SchemaViolation => Err(oracle::Error::SchemaViolation {
                detail: "missing field `content`".to_string(),
                raw: "{}".to_string(),
            }),
            AdvisoryOutcome::Unavailable => Err(oracle::Error::BackendUnavailable(
                "connection refused".to_string(),
            )),
        }
    }
}

/// A canned trait adjustment for tests.
pub fn sample_adjustment(time_step: u64) -> TraitAdjustment {
    TraitAdjustment {
        content: "Retaliatory: punish defection immediately to deter exploitation".to_string(),
        importance: 85,
        created: time_step,
        last_retrieved: time_step,
    }
}
