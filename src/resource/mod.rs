// Resource Module
// Loading of game data and the small text tables that index it

pub mod lines;
pub mod loader;
pub mod propfile;

pub use lines::{LineEntry, LineTable};
pub use loader::{FsLoader, LoaderError, LoaderResult, MemoryLoader, ResourceLoader};
pub use propfile::{parse_propfile, PropertyFile};
