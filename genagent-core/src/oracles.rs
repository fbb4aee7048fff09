//! Oracle seams for the decision engine.
//!
//! Two narrow traits sit between the agent core and the reasoning backend
//! so decision and mutation logic can be exercised with scripted mocks
//! (see [`crate::testing`]). The real [`oracle::Oracle`] client implements
//! both.

use crate::mutation::TraitAdjustment;
use async_trait::async_trait;

/// Categorical classification against a closed option set.
#[async_trait]
pub trait DecisionOracle: Send + Sync {
    /// Ask `question` and select one of `options`.
    async fn classify(&self, question: &str, options: &[&str])
        -> Result<String, oracle::Error>;
}

/// Structured extraction of trait-adjustment records.
#[async_trait]
pub trait AdvisoryOracle: Send + Sync {
    /// Request a trait adjustment given a system/user prompt pair.
    async fn request_adjustment(
        &self,
        system: &str,
        user: &str,
    ) -> Result<TraitAdjustment, oracle::Error>;
}

#[async_trait]
impl DecisionOracle for oracle::Oracle {
    async fn classify(
        &self,
        question: &str,
        options: &[&str],
    ) -> Result<String, oracle::Error> {
        oracle::Oracle::classify(self, question, options).await
    }
}

#[async_trait]
impl AdvisoryOracle for oracle::Oracle {
    async fn request_adjustment(
        &self,
        system: &str,
        user: &str,
    ) -> Result<TraitAdjustment, oracle::Error> {
        self.extract(system, user).await
    }
}
