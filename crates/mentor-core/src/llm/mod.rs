mod traits;
mod gemini;
pub mod fallback;

pub use traits::*;
pub use gemini::{mask_key, GeminiClient};
pub use fallback::{AttemptError, ChainFailure, FallbackChain, ModelCandidate, Served, Tier};
