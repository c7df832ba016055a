mod model;
mod repository;
pub mod outbox;

pub use model::{title_from_text, ChatMessage, ChatSession, SessionKey, SyncState};
pub use repository::SessionRepository;
pub use outbox::{FlushResult, Outbox, PendingWrite};
