pub mod codec;
pub mod database;
pub mod entry;
pub mod error;
pub mod table;

pub use database::{Database, TableDescriptor, TABLE_INFO_FILE};
pub use entry::{Entry, EntryId, ParseFn, ID_FIELD};
pub use error::{LinebaseError, Result};
pub use table::Table;
