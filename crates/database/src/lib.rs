//! Persistence layer for the Lendline chat backend.
//!
//! Owns the SQLite pool, the embedded migrations, and the repositories that
//! implement room identity, the append-only message log, and per-viewer read
//! state. Every operation re-reads current state from the pool; nothing is
//! cached across calls.

pub mod connection;
pub mod entities;
pub mod migrations;
pub mod repos;
pub mod types;

pub use connection::prepare_database;
pub use entities::{Message, Participant, Room, EMPTY_ROOM_PREVIEW, PHOTO_PREVIEW};
pub use migrations::{run_migrations, MIGRATOR};
pub use repos::{MessageRepository, ParticipantRepository, ReadTracker, RoomRepository};
pub use types::{ChatError, ChatResult};
