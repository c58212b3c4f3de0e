use crate::codec;
use crate::entry::{Entry, EntryId, ParseFn, ID_FIELD};
use crate::error::{LinebaseError, Result};
use std::fs;
use std::path::PathBuf;

/// One comparison against a single raw field value.
/// Relational kinds compare the value parsed as f64; an unparseable value
/// becomes NaN and never matches. String kinds compare the raw string.
enum Comparison<'a> {
    Equals(&'a str),
    NotEquals(&'a str),
    GreaterThan(f64),
    LessThan(f64),
    AtLeast(f64),
    AtMost(f64),
    Contains(&'a str),
    NotContains(&'a str),
    StartsWith(&'a str),
    EndsWith(&'a str),
}

impl Comparison<'_> {
    /// Absent fields never match, whatever the kind.
    fn matches(&self, value: Option<&str>) -> bool {
        let Some(value) = value else { return false };
        match *self {
            Comparison::Equals(operand) => value == operand,
            Comparison::NotEquals(operand) => value != operand,
            Comparison::GreaterThan(operand) => as_number(value) > operand,
            Comparison::LessThan(operand) => as_number(value) < operand,
            Comparison::AtLeast(operand) => as_number(value) >= operand,
            Comparison::AtMost(operand) => as_number(value) <= operand,
            Comparison::Contains(operand) => value.contains(operand),
            Comparison::NotContains(operand) => !value.contains(operand),
            Comparison::StartsWith(operand) => value.starts_with(operand),
            Comparison::EndsWith(operand) => value.ends_with(operand),
        }
    }
}

fn as_number(value: &str) -> f64 {
    value.parse().unwrap_or(f64::NAN)
}

/// A handle to one table: a directory of record files, one file per entry,
/// named by entry id. Every operation re-scans disk; the filesystem is the
/// only source of truth and the only index.
///
/// `T` is the parsed-value type produced by the table's parse hook. The
/// default hook is the plain `From<Entry>` conversion (identity for the
/// default `T = Entry`); install a table-specific hook with
/// [`Table::set_parse_function`].
pub struct Table<T = Entry> {
    name: String,
    folder: PathBuf,
    fieldnames: Vec<String>,
    parse: ParseFn<T>,
}

impl<T: From<Entry> + 'static> Table<T> {
    /// Create a handle over `folder` with the given field schema.
    ///
    /// Tables are normally instantiated by [`Database::connect`] from the
    /// manifest; constructing one directly is useful for standalone use.
    ///
    /// [`Database::connect`]: crate::Database::connect
    pub fn new(name: String, folder: PathBuf, fieldnames: Vec<String>) -> Self {
        Table {
            name,
            folder,
            fieldnames,
            parse: Box::new(T::from),
        }
    }
}

impl<T> std::fmt::Debug for Table<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.name)
            .field("folder", &self.folder)
            .field("fieldnames", &self.fieldnames)
            .field("parse", &"<parse fn>")
            .finish()
    }
}

impl<T> Table<T> {
    /// The name of the table.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The ordered field schema defining the on-disk layout.
    pub fn fieldnames(&self) -> &[String] {
        &self.fieldnames
    }

    /// Path of the record file backing the entry with the given id.
    pub fn entry_path(&self, id: EntryId) -> PathBuf {
        self.folder.join(id.to_string())
    }

    /// Replace the table's parse hook. Affects this table only and never
    /// retroactively alters values already returned.
    pub fn set_parse_function(&mut self, parse: impl Fn(Entry) -> T + Send + Sync + 'static) {
        self.parse = Box::new(parse);
    }

    /// Every existing entry id, sorted ascending.
    /// Files whose names are not decimal ids are ignored.
    fn entry_ids(&self) -> Result<Vec<EntryId>> {
        let mut ids = Vec::new();
        for dirent in fs::read_dir(&self.folder)? {
            let name = dirent?.file_name();
            if let Ok(id) = name.to_string_lossy().parse::<EntryId>() {
                ids.push(id);
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }

    /// Next available id: max existing + 1, or 1 for an empty table.
    fn next_id(&self) -> Result<EntryId> {
        Ok(self.entry_ids()?.last().map_or(1, |max| max + 1))
    }

    fn read_raw(&self, id: EntryId) -> Result<Option<Entry>> {
        let path = self.entry_path(id);
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(path)?;
        Ok(Some(codec::deserialize(&self.fieldnames, &text)))
    }

    fn write_entry(&self, id: EntryId, entry: &Entry) -> Result<()> {
        let text = codec::serialize(&self.fieldnames, entry)?;
        fs::write(self.entry_path(id), text)?;
        Ok(())
    }

    fn all_raw(&self) -> Result<Vec<Entry>> {
        let mut entries = Vec::new();
        for id in self.entry_ids()? {
            match self.read_raw(id)? {
                Some(entry) => entries.push(entry),
                // an external writer removed the file between scan and read
                None => log::warn!("entry {id} in table '{}' vanished during scan", self.name),
            }
        }
        Ok(entries)
    }

    fn not_found(&self, id: EntryId) -> LinebaseError {
        LinebaseError::EntryNotFound {
            table: self.name.clone(),
            id,
        }
    }

    // ── CRUD ───────────────────────────────────────────────────────

    /// Get the entry with the given id, or `None` if it does not exist.
    pub fn get(&self, id: EntryId) -> Result<Option<T>> {
        Ok(self.read_raw(id)?.map(|entry| (self.parse)(entry)))
    }

    /// Create a new entry. Allocates the next id, merges it into the data
    /// under `id`, writes the record file and returns the parsed result.
    pub fn post(&self, mut data: Entry) -> Result<T> {
        let id = self.next_id()?;
        data.insert(ID_FIELD.to_string(), id.to_string());
        self.write_entry(id, &data)?;
        Ok((self.parse)(data))
    }

    /// Update an entry in place: shallow-merge `updated_fields` over the
    /// current raw record (updated keys win, the id stays untouched) and
    /// rewrite the file in full. Returns the parsed merged entry.
    pub fn patch(&self, id: EntryId, updated_fields: Entry) -> Result<T> {
        let mut merged = self.read_raw(id)?.ok_or_else(|| self.not_found(id))?;
        merged.extend(updated_fields);
        merged.insert(ID_FIELD.to_string(), id.to_string());
        self.write_entry(id, &merged)?;
        Ok((self.parse)(merged))
    }

    /// Delete an entry, returning the parsed value it held just before
    /// deletion.
    pub fn delete(&self, id: EntryId) -> Result<T> {
        let entry = self.read_raw(id)?.ok_or_else(|| self.not_found(id))?;
        fs::remove_file(self.entry_path(id))?;
        Ok((self.parse)(entry))
    }

    // ── Filter-query get methods ───────────────────────────────────

    /// Get every entry in the table, ordered by id ascending.
    pub fn get_all(&self) -> Result<Vec<T>> {
        Ok(self
            .all_raw()?
            .into_iter()
            .map(|entry| (self.parse)(entry))
            .collect())
    }

    fn filtered_raw(&self, filter: impl Fn(&Entry) -> bool) -> Result<Vec<Entry>> {
        Ok(self.all_raw()?.into_iter().filter(|e| filter(e)).collect())
    }

    /// Exactly-one contract shared by every `get_unique_*` variant.
    fn parse_unique(&self, mut matches: Vec<Entry>) -> Result<T> {
        let count = matches.len();
        match matches.pop() {
            Some(entry) if count == 1 => Ok((self.parse)(entry)),
            _ => Err(LinebaseError::ExpectedUniqueResult(count)),
        }
    }

    fn get_matching(&self, fieldname: &str, comparison: Comparison<'_>) -> Result<Vec<T>> {
        self.get_with_filter(|entry| comparison.matches(entry.get(fieldname).map(String::as_str)))
    }

    fn get_unique_matching(&self, fieldname: &str, comparison: Comparison<'_>) -> Result<T> {
        let matches = self
            .filtered_raw(|entry| comparison.matches(entry.get(fieldname).map(String::as_str)))?;
        self.parse_unique(matches)
    }

    /// Get all entries that pass the given filter over the raw record.
    pub fn get_with_filter(&self, filter: impl Fn(&Entry) -> bool) -> Result<Vec<T>> {
        Ok(self
            .filtered_raw(filter)?
            .into_iter()
            .map(|entry| (self.parse)(entry))
            .collect())
    }

    /// Get the sole entry that passes the given filter.
    /// Fails with `ExpectedUniqueResult` unless exactly one entry matches.
    pub fn get_unique_with_filter(&self, filter: impl Fn(&Entry) -> bool) -> Result<T> {
        let matches = self.filtered_raw(filter)?;
        self.parse_unique(matches)
    }

    /// Get all entries where `fieldname` equals `value`.
    pub fn get_where(&self, fieldname: &str, value: &str) -> Result<Vec<T>> {
        self.get_matching(fieldname, Comparison::Equals(value))
    }

    /// Get the sole entry where `fieldname` equals `value`.
    pub fn get_unique_where(&self, fieldname: &str, value: &str) -> Result<T> {
        self.get_unique_matching(fieldname, Comparison::Equals(value))
    }

    /// Get all entries where `fieldname` does not equal `value`.
    pub fn get_where_not(&self, fieldname: &str, value: &str) -> Result<Vec<T>> {
        self.get_matching(fieldname, Comparison::NotEquals(value))
    }

    /// Get the sole entry where `fieldname` does not equal `value`.
    pub fn get_unique_where_not(&self, fieldname: &str, value: &str) -> Result<T> {
        self.get_unique_matching(fieldname, Comparison::NotEquals(value))
    }

    /// Get all entries where `fieldname`, read as a number, is greater
    /// than `value`.
    pub fn get_where_gt(&self, fieldname: &str, value: f64) -> Result<Vec<T>> {
        self.get_matching(fieldname, Comparison::GreaterThan(value))
    }

    /// Get the sole entry where `fieldname` is greater than `value`.
    pub fn get_unique_where_gt(&self, fieldname: &str, value: f64) -> Result<T> {
        self.get_unique_matching(fieldname, Comparison::GreaterThan(value))
    }

    /// Get all entries where `fieldname`, read as a number, is less than
    /// `value`.
    pub fn get_where_lt(&self, fieldname: &str, value: f64) -> Result<Vec<T>> {
        self.get_matching(fieldname, Comparison::LessThan(value))
    }

    /// Get the sole entry where `fieldname` is less than `value`.
    pub fn get_unique_where_lt(&self, fieldname: &str, value: f64) -> Result<T> {
        self.get_unique_matching(fieldname, Comparison::LessThan(value))
    }

    /// Get all entries where `fieldname` is greater than or equal to `value`.
    pub fn get_where_gte(&self, fieldname: &str, value: f64) -> Result<Vec<T>> {
        self.get_matching(fieldname, Comparison::AtLeast(value))
    }

    /// Get the sole entry where `fieldname` is greater than or equal to
    /// `value`.
    pub fn get_unique_where_gte(&self, fieldname: &str, value: f64) -> Result<T> {
        self.get_unique_matching(fieldname, Comparison::AtLeast(value))
    }

    /// Get all entries where `fieldname` is less than or equal to `value`.
    pub fn get_where_lte(&self, fieldname: &str, value: f64) -> Result<Vec<T>> {
        self.get_matching(fieldname, Comparison::AtMost(value))
    }

    /// Get the sole entry where `fieldname` is less than or equal to `value`.
    pub fn get_unique_where_lte(&self, fieldname: &str, value: f64) -> Result<T> {
        self.get_unique_matching(fieldname, Comparison::AtMost(value))
    }

    /// Get all entries where `fieldname` contains `value`.
    pub fn get_where_contains(&self, fieldname: &str, value: &str) -> Result<Vec<T>> {
        self.get_matching(fieldname, Comparison::Contains(value))
    }

    /// Get the sole entry where `fieldname` contains `value`.
    pub fn get_unique_where_contains(&self, fieldname: &str, value: &str) -> Result<T> {
        self.get_unique_matching(fieldname, Comparison::Contains(value))
    }

    /// Get all entries where `fieldname` does not contain `value`.
    pub fn get_where_not_contains(&self, fieldname: &str, value: &str) -> Result<Vec<T>> {
        self.get_matching(fieldname, Comparison::NotContains(value))
    }

    /// Get the sole entry where `fieldname` does not contain `value`.
    pub fn get_unique_where_not_contains(&self, fieldname: &str, value: &str) -> Result<T> {
        self.get_unique_matching(fieldname, Comparison::NotContains(value))
    }

    /// Get all entries where `fieldname` starts with `value`.
    pub fn get_where_starts_with(&self, fieldname: &str, value: &str) -> Result<Vec<T>> {
        self.get_matching(fieldname, Comparison::StartsWith(value))
    }

    /// Get the sole entry where `fieldname` starts with `value`.
    pub fn get_unique_where_starts_with(&self, fieldname: &str, value: &str) -> Result<T> {
        self.get_unique_matching(fieldname, Comparison::StartsWith(value))
    }

    /// Get all entries where `fieldname` ends with `value`.
    pub fn get_where_ends_with(&self, fieldname: &str, value: &str) -> Result<Vec<T>> {
        self.get_matching(fieldname, Comparison::EndsWith(value))
    }

    /// Get the sole entry where `fieldname` ends with `value`.
    pub fn get_unique_where_ends_with(&self, fieldname: &str, value: &str) -> Result<T> {
        self.get_unique_matching(fieldname, Comparison::EndsWith(value))
    }

    // ── Filter-query patch methods ─────────────────────────────────

    /// Ids of every entry whose raw record passes the filter, in id order.
    fn ids_with_filter(&self, filter: impl Fn(&Entry) -> bool) -> Result<Vec<EntryId>> {
        let mut ids = Vec::new();
        for id in self.entry_ids()? {
            if let Some(entry) = self.read_raw(id)? {
                if filter(&entry) {
                    ids.push(id);
                }
            }
        }
        Ok(ids)
    }

    fn ids_matching(&self, fieldname: &str, comparison: &Comparison<'_>) -> Result<Vec<EntryId>> {
        self.ids_with_filter(|entry| comparison.matches(entry.get(fieldname).map(String::as_str)))
    }

    fn patch_matching(
        &self,
        fieldname: &str,
        comparison: Comparison<'_>,
        updated_fields: Entry,
    ) -> Result<()> {
        for id in self.ids_matching(fieldname, &comparison)? {
            self.patch(id, updated_fields.clone())?;
        }
        Ok(())
    }

    /// Apply `updated_fields` to every entry in the table.
    pub fn patch_all(&self, updated_fields: Entry) -> Result<()> {
        for id in self.entry_ids()? {
            self.patch(id, updated_fields.clone())?;
        }
        Ok(())
    }

    /// Apply `updated_fields` to every entry that passes the filter.
    pub fn patch_with_filter(
        &self,
        filter: impl Fn(&Entry) -> bool,
        updated_fields: Entry,
    ) -> Result<()> {
        for id in self.ids_with_filter(filter)? {
            self.patch(id, updated_fields.clone())?;
        }
        Ok(())
    }

    /// Apply `updated_fields` to every entry where `fieldname` equals `value`.
    pub fn patch_where(&self, fieldname: &str, value: &str, updated_fields: Entry) -> Result<()> {
        self.patch_matching(fieldname, Comparison::Equals(value), updated_fields)
    }

    /// Apply `updated_fields` where `fieldname` does not equal `value`.
    pub fn patch_where_not(
        &self,
        fieldname: &str,
        value: &str,
        updated_fields: Entry,
    ) -> Result<()> {
        self.patch_matching(fieldname, Comparison::NotEquals(value), updated_fields)
    }

    /// Apply `updated_fields` where `fieldname` is greater than `value`.
    pub fn patch_where_gt(&self, fieldname: &str, value: f64, updated_fields: Entry) -> Result<()> {
        self.patch_matching(fieldname, Comparison::GreaterThan(value), updated_fields)
    }

    /// Apply `updated_fields` where `fieldname` is less than `value`.
    pub fn patch_where_lt(&self, fieldname: &str, value: f64, updated_fields: Entry) -> Result<()> {
        self.patch_matching(fieldname, Comparison::LessThan(value), updated_fields)
    }

    /// Apply `updated_fields` where `fieldname` is at least `value`.
    pub fn patch_where_gte(
        &self,
        fieldname: &str,
        value: f64,
        updated_fields: Entry,
    ) -> Result<()> {
        self.patch_matching(fieldname, Comparison::AtLeast(value), updated_fields)
    }

    /// Apply `updated_fields` where `fieldname` is at most `value`.
    pub fn patch_where_lte(
        &self,
        fieldname: &str,
        value: f64,
        updated_fields: Entry,
    ) -> Result<()> {
        self.patch_matching(fieldname, Comparison::AtMost(value), updated_fields)
    }

    /// Apply `updated_fields` where `fieldname` contains `value`.
    pub fn patch_where_contains(
        &self,
        fieldname: &str,
        value: &str,
        updated_fields: Entry,
    ) -> Result<()> {
        self.patch_matching(fieldname, Comparison::Contains(value), updated_fields)
    }

    /// Apply `updated_fields` where `fieldname` does not contain `value`.
    pub fn patch_where_not_contains(
        &self,
        fieldname: &str,
        value: &str,
        updated_fields: Entry,
    ) -> Result<()> {
        self.patch_matching(fieldname, Comparison::NotContains(value), updated_fields)
    }

    /// Apply `updated_fields` where `fieldname` starts with `value`.
    pub fn patch_where_starts_with(
        &self,
        fieldname: &str,
        value: &str,
        updated_fields: Entry,
    ) -> Result<()> {
        self.patch_matching(fieldname, Comparison::StartsWith(value), updated_fields)
    }

    /// Apply `updated_fields` where `fieldname` ends with `value`.
    pub fn patch_where_ends_with(
        &self,
        fieldname: &str,
        value: &str,
        updated_fields: Entry,
    ) -> Result<()> {
        self.patch_matching(fieldname, Comparison::EndsWith(value), updated_fields)
    }

    // ── Filter-query delete methods ────────────────────────────────

    fn delete_matching(&self, fieldname: &str, comparison: Comparison<'_>) -> Result<()> {
        for id in self.ids_matching(fieldname, &comparison)? {
            self.delete(id)?;
        }
        Ok(())
    }

    /// Delete every entry in the table.
    pub fn delete_all(&self) -> Result<()> {
        for id in self.entry_ids()? {
            self.delete(id)?;
        }
        Ok(())
    }

    /// Delete every entry that passes the filter.
    pub fn delete_with_filter(&self, filter: impl Fn(&Entry) -> bool) -> Result<()> {
        for id in self.ids_with_filter(filter)? {
            self.delete(id)?;
        }
        Ok(())
    }

    /// Delete every entry where `fieldname` equals `value`.
    pub fn delete_where(&self, fieldname: &str, value: &str) -> Result<()> {
        self.delete_matching(fieldname, Comparison::Equals(value))
    }

    /// Delete every entry where `fieldname` does not equal `value`.
    pub fn delete_where_not(&self, fieldname: &str, value: &str) -> Result<()> {
        self.delete_matching(fieldname, Comparison::NotEquals(value))
    }

    /// Delete every entry where `fieldname` is greater than `value`.
    pub fn delete_where_gt(&self, fieldname: &str, value: f64) -> Result<()> {
        self.delete_matching(fieldname, Comparison::GreaterThan(value))
    }

    /// Delete every entry where `fieldname` is less than `value`.
    pub fn delete_where_lt(&self, fieldname: &str, value: f64) -> Result<()> {
        self.delete_matching(fieldname, Comparison::LessThan(value))
    }

    /// Delete every entry where `fieldname` is at least `value`.
    pub fn delete_where_gte(&self, fieldname: &str, value: f64) -> Result<()> {
        self.delete_matching(fieldname, Comparison::AtLeast(value))
    }

    /// Delete every entry where `fieldname` is at most `value`.
    pub fn delete_where_lte(&self, fieldname: &str, value: f64) -> Result<()> {
        self.delete_matching(fieldname, Comparison::AtMost(value))
    }

    /// Delete every entry where `fieldname` contains `value`.
    pub fn delete_where_contains(&self, fieldname: &str, value: &str) -> Result<()> {
        self.delete_matching(fieldname, Comparison::Contains(value))
    }

    /// Delete every entry where `fieldname` does not contain `value`.
    pub fn delete_where_not_contains(&self, fieldname: &str, value: &str) -> Result<()> {
        self.delete_matching(fieldname, Comparison::NotContains(value))
    }

    /// Delete every entry where `fieldname` starts with `value`.
    pub fn delete_where_starts_with(&self, fieldname: &str, value: &str) -> Result<()> {
        self.delete_matching(fieldname, Comparison::StartsWith(value))
    }

    /// Delete every entry where `fieldname` ends with `value`.
    pub fn delete_where_ends_with(&self, fieldname: &str, value: &str) -> Result<()> {
        self.delete_matching(fieldname, Comparison::EndsWith(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn fieldnames(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    fn entry(pairs: &[(&str, &str)]) -> Entry {
        pairs
            .iter()
            .map(|(field, value)| (field.to_string(), value.to_string()))
            .collect()
    }

    fn setup_songs() -> (TempDir, Table) {
        let tmp = TempDir::new().unwrap();
        let folder = tmp.path().join("Songs");
        fs::create_dir_all(&folder).unwrap();
        let table = Table::new(
            "Songs".to_string(),
            folder,
            fieldnames(&["id", "title", "artists", "duration"]),
        );
        (tmp, table)
    }

    fn song(title: &str, artists: &str, duration: &str) -> Entry {
        entry(&[
            ("title", title),
            ("artists", artists),
            ("duration", duration),
        ])
    }

    #[test]
    fn post_assigns_ids_starting_at_one() {
        let (_tmp, table) = setup_songs();

        let first = table.post(song("A", "X", "120")).unwrap();
        let second = table.post(song("B", "Y", "95")).unwrap();

        assert_eq!(first["id"], "1");
        assert_eq!(second["id"], "2");
    }

    #[test]
    fn post_then_get_returns_posted_data_plus_id() {
        let (_tmp, table) = setup_songs();

        table.post(song("A", "X", "120")).unwrap();

        let fetched = table.get(1).unwrap().unwrap();
        let mut expected = song("A", "X", "120");
        expected.insert("id".to_string(), "1".to_string());
        assert_eq!(fetched, expected);
    }

    #[test]
    fn record_file_layout_is_one_value_per_line_in_schema_order() {
        let (_tmp, table) = setup_songs();

        table.post(song("A", "X", "120")).unwrap();

        let text = fs::read_to_string(table.entry_path(1)).unwrap();
        assert_eq!(text, "1\nA\nX\n120");
    }

    #[test]
    fn deleted_ids_leave_gaps_but_the_tail_is_max_plus_one() {
        let (_tmp, table) = setup_songs();

        table.post(song("A", "X", "1")).unwrap();
        table.post(song("B", "Y", "2")).unwrap();
        table.post(song("C", "Z", "3")).unwrap();
        table.delete(2).unwrap();

        let next = table.post(song("D", "W", "4")).unwrap();
        assert_eq!(next["id"], "4");
        assert!(table.get(2).unwrap().is_none());
    }

    #[test]
    fn post_propagates_codec_errors() {
        let (_tmp, table) = setup_songs();

        let err = table.post(entry(&[("title", "A")])).unwrap_err();
        assert!(matches!(err, LinebaseError::MissingField(_)));
    }

    #[test]
    fn get_returns_none_for_unknown_id() {
        let (_tmp, table) = setup_songs();
        assert!(table.get(42).unwrap().is_none());
    }

    #[test]
    fn patch_overwrites_named_fields_and_preserves_the_rest() {
        let (_tmp, table) = setup_songs();
        table.post(song("A", "X", "120")).unwrap();

        let patched = table.patch(1, entry(&[("duration", "150")])).unwrap();

        assert_eq!(patched["title"], "A");
        assert_eq!(patched["artists"], "X");
        assert_eq!(patched["duration"], "150");
        assert_eq!(patched["id"], "1");

        let fetched = table.get(1).unwrap().unwrap();
        assert_eq!(fetched, patched);
    }

    #[test]
    fn patch_cannot_reassign_the_id() {
        let (_tmp, table) = setup_songs();
        table.post(song("A", "X", "120")).unwrap();

        let patched = table.patch(1, entry(&[("id", "999")])).unwrap();

        assert_eq!(patched["id"], "1");
        assert!(table.get(999).unwrap().is_none());
    }

    #[test]
    fn patch_unknown_id_fails() {
        let (_tmp, table) = setup_songs();

        let err = table.patch(7, entry(&[("title", "B")])).unwrap_err();
        assert!(matches!(
            err,
            LinebaseError::EntryNotFound { id: 7, ref table } if table == "Songs"
        ));
    }

    #[test]
    fn delete_returns_the_final_state_and_removes_the_file() {
        let (_tmp, table) = setup_songs();
        table.post(song("A", "X", "120")).unwrap();

        let deleted = table.delete(1).unwrap();
        assert_eq!(deleted["title"], "A");
        assert!(!table.entry_path(1).exists());
        assert!(table.get(1).unwrap().is_none());

        let err = table.delete(1).unwrap_err();
        assert!(matches!(err, LinebaseError::EntryNotFound { id: 1, .. }));
    }

    #[test]
    fn get_all_is_ordered_by_id_ascending() {
        let (_tmp, table) = setup_songs();
        for title in ["A", "B", "C"] {
            table.post(song(title, "X", "1")).unwrap();
        }

        let all = table.get_all().unwrap();
        let ids: Vec<&str> = all.iter().map(|e| e["id"].as_str()).collect();
        assert_eq!(ids, ["1", "2", "3"]);
    }

    #[test]
    fn where_and_unique_where_agree_on_the_match_set() {
        let (_tmp, table) = setup_songs();
        table.post(song("A", "X", "120")).unwrap();
        table.post(song("B", "X", "95")).unwrap();

        let by_artist = table.get_where("artists", "X").unwrap();
        assert_eq!(by_artist.len(), 2);
        let err = table.get_unique_where("artists", "X").unwrap_err();
        assert!(matches!(err, LinebaseError::ExpectedUniqueResult(2)));

        let by_title = table.get_where("title", "A").unwrap();
        assert_eq!(by_title.len(), 1);
        let unique = table.get_unique_where("title", "A").unwrap();
        assert_eq!(unique, by_title[0]);
    }

    #[test]
    fn relational_queries_compare_numerically() {
        let (_tmp, table) = setup_songs();
        table.post(song("A", "X", "120")).unwrap();

        assert_eq!(table.get_where_gt("duration", 100.0).unwrap().len(), 1);
        assert_eq!(table.get_where_gt("duration", 200.0).unwrap().len(), 0);
        assert_eq!(table.get_where_lt("duration", 121.0).unwrap().len(), 1);
        assert_eq!(table.get_where_gte("duration", 120.0).unwrap().len(), 1);
        assert_eq!(table.get_where_lte("duration", 119.0).unwrap().len(), 0);

        let err = table.get_unique_where_gt("duration", 200.0).unwrap_err();
        assert!(matches!(err, LinebaseError::ExpectedUniqueResult(0)));
    }

    #[test]
    fn unparseable_values_never_match_relational_queries() {
        let (_tmp, table) = setup_songs();
        table.post(song("A", "X", "not-a-number")).unwrap();

        assert!(table.get_where_gt("duration", -1e9).unwrap().is_empty());
        assert!(table.get_where_lt("duration", 1e9).unwrap().is_empty());
        assert!(table.get_where_lte("duration", 1e9).unwrap().is_empty());
    }

    #[test]
    fn string_queries_match_on_raw_values() {
        let (_tmp, table) = setup_songs();
        table.post(song("Nightcall", "Kavinsky", "258")).unwrap();
        table.post(song("Daylight", "Joji", "163")).unwrap();

        assert_eq!(table.get_where_contains("title", "light").unwrap().len(), 1);
        assert_eq!(
            table.get_where_not_contains("title", "light").unwrap().len(),
            1
        );
        assert_eq!(
            table
                .get_unique_where_starts_with("title", "Night")
                .unwrap()["artists"],
            "Kavinsky"
        );
        assert_eq!(
            table.get_unique_where_ends_with("title", "call").unwrap()["title"],
            "Nightcall"
        );
        assert_eq!(table.get_where_not("artists", "Joji").unwrap().len(), 1);
    }

    #[test]
    fn filter_queries_see_raw_entries() {
        let (_tmp, table) = setup_songs();
        table.post(song("A", "X", "120")).unwrap();
        table.post(song("B", "Y", "95")).unwrap();

        let long = table
            .get_with_filter(|e| e["duration"].parse::<u32>().unwrap_or(0) > 100)
            .unwrap();
        assert_eq!(long.len(), 1);
        assert_eq!(long[0]["title"], "A");

        let unique = table.get_unique_with_filter(|e| e["artists"] == "Y").unwrap();
        assert_eq!(unique["title"], "B");

        let err = table.get_unique_with_filter(|_| true).unwrap_err();
        assert!(matches!(err, LinebaseError::ExpectedUniqueResult(2)));
    }

    #[test]
    fn patch_where_updates_only_matching_entries() {
        let (_tmp, table) = setup_songs();
        table.post(song("A", "X", "120")).unwrap();
        table.post(song("B", "Y", "95")).unwrap();

        table
            .patch_where("artists", "X", entry(&[("artists", "Z")]))
            .unwrap();

        assert_eq!(table.get(1).unwrap().unwrap()["artists"], "Z");
        assert_eq!(table.get(2).unwrap().unwrap()["artists"], "Y");
    }

    #[test]
    fn patch_all_touches_every_entry() {
        let (_tmp, table) = setup_songs();
        table.post(song("A", "X", "120")).unwrap();
        table.post(song("B", "Y", "95")).unwrap();

        table.patch_all(entry(&[("artists", "Various")])).unwrap();

        for parsed in table.get_all().unwrap() {
            assert_eq!(parsed["artists"], "Various");
        }
    }

    #[test]
    fn patch_with_filter_targets_real_ids_even_after_deletions() {
        let (_tmp, table) = setup_songs();
        table.post(song("A", "X", "120")).unwrap();
        table.post(song("B", "Y", "95")).unwrap();
        table.post(song("C", "Y", "301")).unwrap();
        table.delete(1).unwrap();

        table
            .patch_with_filter(|e| e["title"] == "C", entry(&[("duration", "300")]))
            .unwrap();

        assert_eq!(table.get(3).unwrap().unwrap()["duration"], "300");
        assert_eq!(table.get(2).unwrap().unwrap()["duration"], "95");
    }

    #[test]
    fn patch_where_gt_uses_the_numeric_predicate() {
        let (_tmp, table) = setup_songs();
        table.post(song("A", "X", "120")).unwrap();
        table.post(song("B", "Y", "95")).unwrap();

        table
            .patch_where_gt("duration", 100.0, entry(&[("artists", "Long")]))
            .unwrap();

        assert_eq!(table.get(1).unwrap().unwrap()["artists"], "Long");
        assert_eq!(table.get(2).unwrap().unwrap()["artists"], "Y");
    }

    #[test]
    fn delete_where_removes_only_matching_entries() {
        let (_tmp, table) = setup_songs();
        table.post(song("A", "X", "120")).unwrap();
        table.post(song("B", "Y", "95")).unwrap();

        table.delete_where("artists", "X").unwrap();

        assert!(table.get(1).unwrap().is_none());
        assert!(table.get(2).unwrap().is_some());
    }

    #[test]
    fn delete_with_filter_and_delete_all() {
        let (_tmp, table) = setup_songs();
        table.post(song("A", "X", "120")).unwrap();
        table.post(song("B", "Y", "95")).unwrap();
        table.post(song("C", "Z", "63")).unwrap();

        table
            .delete_with_filter(|e| e["duration"].parse::<u32>().unwrap_or(0) < 100)
            .unwrap();
        assert_eq!(table.get_all().unwrap().len(), 1);

        table.delete_all().unwrap();
        assert!(table.get_all().unwrap().is_empty());
    }

    #[test]
    fn delete_where_lt_uses_the_numeric_predicate() {
        let (_tmp, table) = setup_songs();
        table.post(song("A", "X", "120")).unwrap();
        table.post(song("B", "Y", "95")).unwrap();

        table.delete_where_lt("duration", 100.0).unwrap();

        assert!(table.get(2).unwrap().is_none());
        assert!(table.get(1).unwrap().is_some());
    }

    #[test]
    fn non_numeric_file_names_are_ignored_by_the_scan() {
        let (_tmp, table) = setup_songs();
        table.post(song("A", "X", "120")).unwrap();
        fs::write(table.entry_path(1).with_file_name(".keep"), "").unwrap();

        assert_eq!(table.get_all().unwrap().len(), 1);
        let next = table.post(song("B", "Y", "95")).unwrap();
        assert_eq!(next["id"], "2");
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Song {
        id: EntryId,
        title: String,
        duration: u32,
    }

    impl From<Entry> for Song {
        fn from(entry: Entry) -> Self {
            Song {
                id: entry["id"].parse().unwrap_or_default(),
                title: entry["title"].clone(),
                duration: entry["duration"].parse().unwrap_or_default(),
            }
        }
    }

    #[test]
    fn typed_table_parses_through_the_default_from_conversion() {
        let tmp = TempDir::new().unwrap();
        let folder = tmp.path().join("Songs");
        fs::create_dir_all(&folder).unwrap();
        let table: Table<Song> = Table::new(
            "Songs".to_string(),
            folder,
            fieldnames(&["id", "title", "artists", "duration"]),
        );

        let posted = table.post(song("A", "X", "120")).unwrap();
        assert_eq!(
            posted,
            Song {
                id: 1,
                title: "A".to_string(),
                duration: 120
            }
        );

        let matches = table.get_where_gt("duration", 100.0).unwrap();
        assert_eq!(matches, vec![posted]);
    }

    #[test]
    fn installed_parse_hook_replaces_the_default() {
        let (_tmp, mut table) = setup_songs();
        table.post(song("A", "X", "120")).unwrap();

        table.set_parse_function(|mut entry| {
            entry.insert("seen".to_string(), "yes".to_string());
            entry
        });

        let fetched = table.get(1).unwrap().unwrap();
        assert_eq!(fetched["seen"], "yes");
    }
}
