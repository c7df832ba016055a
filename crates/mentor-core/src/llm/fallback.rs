use crate::error::{ErrorKind, MentorError};
use std::future::Future;

/// Position of a model in the fallback order. Only affects how the answer is labelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Primary,
    Fallback,
    Safety,
}

impl Tier {
    fn for_position(index: usize, total: usize) -> Self {
        match index {
            0 => Tier::Primary,
            i if total > 2 && i == total - 1 => Tier::Safety,
            _ => Tier::Fallback,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCandidate {
    pub model: String,
    pub tier: Tier,
}

/// A failed attempt against one model.
#[derive(Debug)]
pub struct AttemptError {
    pub model: String,
    pub error: MentorError,
}

impl AttemptError {
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }
}

/// The first successful attempt, plus whatever failed before it.
#[derive(Debug)]
pub struct Served<T> {
    pub value: T,
    pub model: String,
    pub tier: Tier,
    pub failures: Vec<AttemptError>,
}

/// Every attempted model failed, or a non-retryable error stopped the chain.
#[derive(Debug)]
pub struct ChainFailure {
    pub attempts: Vec<AttemptError>,
    pub short_circuited: bool,
}

impl ChainFailure {
    /// Category of the first (root) failure.
    pub fn kind(&self) -> ErrorKind {
        self.attempts
            .first()
            .map(|a| a.kind())
            .unwrap_or(ErrorKind::Unknown)
    }

    /// One line per attempted model.
    pub fn summary(&self) -> String {
        self.attempts
            .iter()
            .map(|a| format!("{}: {}", a.model, a.error))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl std::fmt::Display for ChainFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.summary())
    }
}

/// Ordered list of models tried one after another until one answers.
#[derive(Debug, Clone)]
pub struct FallbackChain {
    candidates: Vec<ModelCandidate>,
}

impl FallbackChain {
    pub fn new<S: AsRef<str>>(models: &[S]) -> Self {
        let total = models.len();
        let candidates = models
            .iter()
            .enumerate()
            .map(|(i, m)| ModelCandidate {
                model: m.as_ref().to_string(),
                tier: Tier::for_position(i, total),
            })
            .collect();
        Self { candidates }
    }

    pub fn candidates(&self) -> &[ModelCandidate] {
        &self.candidates
    }

    pub fn primary(&self) -> Option<&ModelCandidate> {
        self.candidates.first()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Runs `attempt` against each candidate in order.
    ///
    /// Returns the first success. A failure classified as non-retryable stops
    /// the chain immediately; every failure is kept for the report.
    pub async fn run<T, F, Fut>(&self, mut attempt: F) -> Result<Served<T>, ChainFailure>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<T, MentorError>>,
    {
        let mut failures: Vec<AttemptError> = Vec::new();

        for candidate in &self.candidates {
            match attempt(candidate.model.clone()).await {
                Ok(value) => {
                    if !failures.is_empty() {
                        tracing::info!(
                            "Model {} answered after {} failed attempt(s)",
                            candidate.model,
                            failures.len()
                        );
                    }
                    return Ok(Served {
                        value,
                        model: candidate.model.clone(),
                        tier: candidate.tier,
                        failures,
                    });
                }
                Err(error) => {
                    let kind = error.kind();
                    tracing::warn!(
                        "Model {} failed ({:?}): {}",
                        candidate.model,
                        kind,
                        error
                    );
                    failures.push(AttemptError {
                        model: candidate.model.clone(),
                        error,
                    });
                    if !kind.is_retryable() {
                        tracing::warn!("Non-retryable failure, skipping remaining models");
                        return Err(ChainFailure {
                            attempts: failures,
                            short_circuited: true,
                        });
                    }
                }
            }
        }

        Err(ChainFailure {
            attempts: failures,
            short_circuited: false,
        })
    }
}

impl Default for FallbackChain {
    fn default() -> Self {
        Self::new(crate::constants::models::DEFAULT_CHAIN)
    }
}
