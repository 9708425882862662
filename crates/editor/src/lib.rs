pub mod config;
pub mod logging;
mod session;

pub use session::{fatal, EditError, Session};

pub use hexed_buffer::{Blob, Direction, PasteMode, SaveError};
