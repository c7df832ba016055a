pub mod error;
pub mod constants;
pub mod llm;
pub mod context;
pub mod config;
pub mod store;
pub mod session;
pub mod auth;
pub mod users;
pub mod generator;
pub mod chat;

// Re-export key types
pub use error::{ErrorKind, MentorError};
pub use llm::{FallbackChain, GeminiClient, HistoryEntry, Role, TextGenerator, Tier};
pub use context::{InstructionBuilder, Mode};
pub use config::{RemoteConfig, Settings};
pub use store::{MemoryStore, RestStore, RowStore};
pub use session::{ChatMessage, ChatSession, Outbox, SessionKey, SessionRepository, SyncState};
pub use auth::{AuthContext, LocalState};
pub use users::{UserProfile, UserRole, UserService, UserSummary};
pub use generator::{ConnectionReport, GeneratedReply, GenerationFailure, ResponseGenerator};
pub use chat::{Conversation, TurnOutcome, TurnState};
