pub mod message_repository;
pub mod participant_repository;
pub mod read_tracker;
pub mod room_repository;

pub use message_repository::MessageRepository;
pub use participant_repository::ParticipantRepository;
pub use read_tracker::ReadTracker;
pub use room_repository::RoomRepository;
