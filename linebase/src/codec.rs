// Record codec - one entry to/from its newline-delimited on-disk text.

use crate::entry::Entry;
use crate::error::{LinebaseError, Result};

/// Serialize an entry into its on-disk text: one field value per line, in
/// `fieldnames` order, no trailing newline.
///
/// Every schema field must be present and non-empty. The entry may hold at
/// most one key beyond the schema (the merged-in `id`); anything past that
/// fails with `TooManyFields`. Keys outside the schema are not written.
pub fn serialize(fieldnames: &[String], entry: &Entry) -> Result<String> {
    let mut values = Vec::with_capacity(fieldnames.len());
    for fieldname in fieldnames {
        match entry.get(fieldname).map(String::as_str) {
            None | Some("") => return Err(LinebaseError::MissingField(fieldname.clone())),
            Some(value) => values.push(value),
        }
    }

    if entry.len() > fieldnames.len() + 1 {
        return Err(LinebaseError::TooManyFields {
            got: entry.len(),
            expected: fieldnames.len(),
        });
    }

    Ok(values.join("\n"))
}

/// Deserialize on-disk text into an entry by zipping lines against
/// `fieldnames` positionally.
///
/// Deliberately lenient: excess lines are dropped, and a truncated file
/// leaves the remaining fields absent from the returned entry. No type
/// conversion happens here; that belongs to the table's parse hook.
pub fn deserialize(fieldnames: &[String], text: &str) -> Entry {
    let mut entry = Entry::new();
    for (fieldname, value) in fieldnames.iter().zip(text.split('\n')) {
        entry.insert(fieldname.clone(), value.to_string());
    }
    entry
}
