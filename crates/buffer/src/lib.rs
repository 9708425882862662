mod blob;
mod error;
mod search;

pub use blob::{
    load::{LoadOptions, DEFAULT_LARGE_FILE_THRESHOLD},
    storage::PAGE_SIZE,
    Blob, PasteMode,
};
pub use error::{LoadError, SaveError};
pub use search::{Direction, Searcher};
