mod errors;

pub use errors::{ChatError, ChatResult};
