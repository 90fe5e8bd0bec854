//! Repository implementations for database operations.

pub mod closet;
pub mod search_history;
pub mod squad;

pub use closet::ClosetRepository;
pub use search_history::{SearchHistoryRepository, DEFAULT_RECENT_LIMIT};
pub use squad::SquadRepository;
