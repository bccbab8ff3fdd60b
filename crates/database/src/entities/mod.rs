pub mod message;
pub mod participant;
pub mod room;

pub use message::{Message, EMPTY_ROOM_PREVIEW, PHOTO_PREVIEW};
pub use participant::Participant;
pub use room::Room;
