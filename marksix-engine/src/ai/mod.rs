//! Stratégie `ai` : consigne, appel du service de génération et extraction des numéros.

pub mod client;
pub mod parse;
pub mod prompt;

use std::time::Duration;

use crate::error::AiError;

pub use client::HttpTextGenerator;
pub use parse::{ParsedNumbers, parse_numbers};
pub use prompt::build_prompt;

/// Nombre de tirages récents inclus dans la consigne.
pub const AI_HISTORY: u32 = 10;

pub const MIN_TIMEOUT_SECS: u64 = 30;
pub const MAX_TIMEOUT_SECS: u64 = 120;

pub fn clamp_timeout(secs: u64) -> Duration {
    Duration::from_secs(secs.clamp(MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS))
}

pub trait TextGenerator {
    fn generate_text(&self, prompt: &str, timeout: Duration) -> Result<String, AiError>;
}
