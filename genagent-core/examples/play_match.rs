//! Play one iterated prisoner's dilemma match: memory-backed agent vs.
//! Tit-for-Tat.
//!
//! Requires OPENAI_API_KEY (read from the environment or a .env file).
//! The agent's memory stream is persisted under ./agent_bank/<agent-id>/.

use genagent_core::{
    GenerativeAgent, Match, MemoryStore, MemoryStrategy, TitForTat, TraitMutationController,
};
use std::sync::Arc;
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let client = Arc::new(oracle::Oracle::from_env()?);

    let agent_id = Uuid::new_v4();
    let store = MemoryStore::open_or_create("agent_bank", agent_id).await?;
    println!("Agent {agent_id} memory at {}", store.path().display());

    let agent = GenerativeAgent::new(store, client.clone());
    let mutation = TraitMutationController::new(client);
    let strategy = MemoryStrategy::new(agent, mutation);

    let mut game = Match::new(Box::new(strategy), Box::new(TitForTat));
    let outcome = game.play(10).await;

    for (round, (a, b)) in outcome.moves.iter().enumerate() {
        println!("round {:>2}: GenAgent {a}  TitForTat {b}", round + 1);
    }
    println!("scores: GenAgent {} TitForTat {}", outcome.scores.0, outcome.scores.1);
    match outcome.winner {
        Some(name) => println!("winner: {name}"),
        None => println!("draw"),
    }

    Ok(())
}
