//! Drill content engine: batch fan-out generation of language exercises,
//! adaptive scoring with streak multipliers, levels, and a Wordle mini-game.

pub mod config;
pub mod domain;
pub mod error;
pub mod generation;
pub mod level;
pub mod logic;
pub mod openai;
pub mod scoring;
pub mod seeds;
pub mod state;
pub mod telemetry;
pub mod util;
pub mod verify;
pub mod wordle;

pub use error::{EngineError, GenerationError, Result};
pub use generation::{partition_and_generate, TextGenerator};
