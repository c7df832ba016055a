use crate::auth::AuthContext;
use crate::session::{ChatSession, SessionKey, SessionRepository};

/// Latest unsaved snapshot of a session whose remote write failed.
#[derive(Debug, Clone)]
pub struct PendingWrite {
    pub session: ChatSession,
    pub last_error: String,
}

/// Result of a flush for one pending session.
#[derive(Debug, Clone, PartialEq)]
pub enum FlushResult {
    Saved { handle: String, remote_id: String },
    StillDirty { handle: String, error: String },
}

/// Write-ahead queue of sessions the store has not acknowledged yet.
///
/// Keyed by the session handle; a newer snapshot replaces the older one since
/// every save writes the whole transcript.
#[derive(Debug, Default)]
pub struct Outbox {
    pending: Vec<PendingWrite>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn contains(&self, handle: &str) -> bool {
        self.pending.iter().any(|p| p.session.handle() == handle)
    }

    pub fn pending(&self) -> impl Iterator<Item = &PendingWrite> {
        self.pending.iter()
    }

    /// Records a failed write, replacing any older snapshot of the same session.
    pub fn record(&mut self, session: &ChatSession, error: impl Into<String>) {
        let entry = PendingWrite {
            session: session.clone(),
            last_error: error.into(),
        };
        match self
            .pending
            .iter()
            .position(|p| p.session.handle() == session.handle())
        {
            Some(index) => self.pending[index] = entry,
            None => self.pending.push(entry),
        }
    }

    /// Drops the entry for a session that has since been saved some other way.
    pub fn acknowledge(&mut self, handle: &str) {
        self.pending.retain(|p| p.session.handle() != handle);
    }

    /// The persisted key a flushed draft received, if any.
    pub fn take_key(results: &[FlushResult], handle: &str) -> Option<SessionKey> {
        results.iter().find_map(|r| match r {
            FlushResult::Saved { handle: h, remote_id } if h == handle => {
                Some(SessionKey::Persisted {
                    remote_id: remote_id.clone(),
                })
            }
            _ => None,
        })
    }

    /// Retries every pending write in insertion order.
    pub async fn flush(
        &mut self,
        repo: &SessionRepository,
        auth: &AuthContext,
    ) -> Vec<FlushResult> {
        let mut results = Vec::with_capacity(self.pending.len());
        let mut remaining = Vec::new();

        for mut entry in std::mem::take(&mut self.pending) {
            let handle = entry.session.handle().to_string();
            match repo.save(auth, &mut entry.session).await {
                Ok(remote_id) => results.push(FlushResult::Saved { handle, remote_id }),
                Err(e) => {
                    let error = e.to_string();
                    entry.last_error = error.clone();
                    results.push(FlushResult::StillDirty { handle, error });
                    remaining.push(entry);
                }
            }
        }

        self.pending = remaining;
        results
    }
}
