//! Memory-backed generative agent for the iterated prisoner's dilemma.
//!
//! This crate provides:
//! - An append-only, durable memory stream per agent
//! - A decision engine that turns oracle queries into game moves
//! - A trait mutation controller that merges advisory recommendations
//!   back into memory
//! - A minimal two-player match runtime to bind it all together
//!
//! # Quick Start
//!
//! ```ignore
//! use genagent_core::{
//!     GenerativeAgent, Match, MemoryStore, MemoryStrategy, TitForTat,
//!     TraitMutationController,
//! };
//! use std::sync::Arc;
//! use uuid::Uuid;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Arc::new(oracle::Oracle::from_env()?);
//!     let store = MemoryStore::open_or_create("agent_bank", Uuid::new_v4()).await?;
//!
//!     let agent = GenerativeAgent::new(store, client.clone());
//!     let mutation = TraitMutationController::new(client);
//!     let strategy = MemoryStrategy::new(agent, mutation);
//!
//!     let mut game = Match::new(Box::new(strategy), Box::new(TitForTat));
//!     let outcome = game.play(10).await;
//!     println!("scores: {:?}", outcome.scores);
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod match_play;
pub mod memory;
pub mod mutation;
pub mod oracles;
pub mod strategy;
pub mod testing;

// Primary public API
pub use agent::{AgentConfig, GenerativeAgent};
pub use match_play::{Match, MatchOutcome, MatchState, Move, Strategy, TitForTat};
pub use memory::{MemoryError, MemoryNode, MemoryStore, NodeDraft, NodeType};
pub use mutation::{MutationConfig, TraitAdjustment, TraitMutationController};
pub use oracles::{AdvisoryOracle, DecisionOracle};
pub use strategy::{MemoryStrategy, StrategyConfig};
