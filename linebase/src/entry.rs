// Leaf vocabulary shared by the codec, table engine and registry.

use std::collections::HashMap;

/// Name of the reserved field every persisted entry carries.
pub const ID_FIELD: &str = "id";

/// The id of a table entry. Positive, unique within a table, allocated
/// as (max existing id) + 1 by a directory scan.
pub type EntryId = u64;

/// A raw table entry: field name to unparsed field value.
///
/// Field values are plain strings that may represent numbers, booleans,
/// dates and so on. Typing is deferred entirely to the per-table parse
/// hook, which converts a raw entry into whatever the caller works with.
pub type Entry = HashMap<String, String>;

/// Per-table hook converting a raw entry into the caller's typed value.
pub type ParseFn<T> = Box<dyn Fn(Entry) -> T + Send + Sync>;
