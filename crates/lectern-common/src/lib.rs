pub mod errors;
pub mod id;

pub use errors::{ConfigError, LecternError, StorageError};
pub use id::{new_id, ParticipantId};

pub type Result<T> = std::result::Result<T, LecternError>;
