use crate::entry::{Entry, EntryId};
use crate::error::{LinebaseError, Result};
use crate::table::Table;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the manifest file listing the database's tables.
pub const TABLE_INFO_FILE: &str = "table.info";

/// One manifest line: a table's name and ordered field schema.
///
/// Manifests written by older tooling also carry a `folder` key; the folder
/// is always derived from the table name, so the key is accepted and
/// ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct TableDescriptor {
    pub name: String,
    #[serde(default)]
    pub folder: Option<String>,
    pub fieldnames: Vec<String>,
}

/// The entry point for a linebase database: a root directory holding the
/// `table.info` manifest and one subdirectory of record files per table.
///
/// A `Database` is an explicit handle the caller constructs once and passes
/// around. It starts unconnected; [`connect`](Database::connect) loads the
/// table catalog from the manifest, and every table-scoped operation
/// requires the connected state.
///
/// `T` is the parsed-value type shared by the catalog. The default
/// `Database<Entry>` returns raw entries; callers whose tables parse to
/// different domain shapes bind `T` to their own sum type and install one
/// hook per table with
/// [`set_table_parse_function`](Database::set_table_parse_function).
pub struct Database<T = Entry> {
    root: PathBuf,
    tables: Vec<Table<T>>,
    connected: bool,
}

impl<T> std::fmt::Debug for Database<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("root", &self.root)
            .field("tables", &self.tables)
            .field("connected", &self.connected)
            .finish()
    }
}

impl<T: From<Entry> + 'static> Database<T> {
    /// Create an unconnected handle over the given root directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Database {
            root: root.into(),
            tables: Vec::new(),
            connected: false,
        }
    }

    /// Create a handle and connect it in one step.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let mut db = Database::new(root);
        db.connect()?;
        Ok(db)
    }

    /// Connect to the database: create the root directory if needed, then
    /// load one table per non-blank manifest line.
    ///
    /// Fails with `AlreadyConnected` when called on a connected handle.
    /// Each table's directory is created if missing, so a freshly
    /// connected table is immediately writable.
    pub fn connect(&mut self) -> Result<()> {
        if self.connected {
            return Err(LinebaseError::AlreadyConnected);
        }

        fs::create_dir_all(&self.root)?;

        let manifest = self.root.join(TABLE_INFO_FILE);
        if manifest.exists() {
            let raw = fs::read_to_string(&manifest)?;
            for line in raw.lines().filter(|line| !line.trim().is_empty()) {
                let descriptor: TableDescriptor = serde_json::from_str(line)?;
                let folder = self.root.join(&descriptor.name);
                fs::create_dir_all(&folder)?;
                self.tables
                    .push(Table::new(descriptor.name, folder, descriptor.fieldnames));
            }
        }

        self.connected = true;
        log::debug!(
            "connected to {}: {} tables",
            self.root.display(),
            self.tables.len()
        );
        Ok(())
    }
}

impl<T> Database<T> {
    /// Disconnect, dropping the table catalog. The handle can be
    /// reconnected later.
    pub fn disconnect(&mut self) -> Result<()> {
        if !self.connected {
            return Err(LinebaseError::NotConnected);
        }
        self.tables.clear();
        self.connected = false;
        log::debug!("disconnected from {}", self.root.display());
        Ok(())
    }

    /// The root directory of the database.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether the handle is currently connected.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Get a connected table by name.
    pub fn table(&self, tablename: &str) -> Result<&Table<T>> {
        if !self.connected {
            return Err(LinebaseError::NotConnected);
        }
        self.tables
            .iter()
            .find(|table| table.name() == tablename)
            .ok_or_else(|| LinebaseError::TableNotFound(tablename.to_string()))
    }

    fn table_mut(&mut self, tablename: &str) -> Result<&mut Table<T>> {
        if !self.connected {
            return Err(LinebaseError::NotConnected);
        }
        self.tables
            .iter_mut()
            .find(|table| table.name() == tablename)
            .ok_or_else(|| LinebaseError::TableNotFound(tablename.to_string()))
    }

    /// Install the parse hook for the named table.
    pub fn set_table_parse_function(
        &mut self,
        tablename: &str,
        parse: impl Fn(Entry) -> T + Send + Sync + 'static,
    ) -> Result<()> {
        self.table_mut(tablename)?.set_parse_function(parse);
        Ok(())
    }

    // ── CRUD ───────────────────────────────────────────────────────

    /// Get an entry by id from the given table.
    pub fn get(&self, tablename: &str, id: EntryId) -> Result<Option<T>> {
        self.table(tablename)?.get(id)
    }

    /// Create a new entry in the given table.
    pub fn post(&self, tablename: &str, data: Entry) -> Result<T> {
        self.table(tablename)?.post(data)
    }

    /// Update an entry in the given table.
    pub fn patch(&self, tablename: &str, id: EntryId, updated_fields: Entry) -> Result<T> {
        self.table(tablename)?.patch(id, updated_fields)
    }

    /// Delete an entry from the given table.
    pub fn delete(&self, tablename: &str, id: EntryId) -> Result<T> {
        self.table(tablename)?.delete(id)
    }

    // ── Filter-query get methods ───────────────────────────────────

    /// Get every entry in the given table.
    pub fn get_all(&self, tablename: &str) -> Result<Vec<T>> {
        self.table(tablename)?.get_all()
    }

    /// Get all entries that pass the given filter.
    pub fn get_with_filter(
        &self,
        tablename: &str,
        filter: impl Fn(&Entry) -> bool,
    ) -> Result<Vec<T>> {
        self.table(tablename)?.get_with_filter(filter)
    }

    /// Get the sole entry that passes the given filter.
    pub fn get_unique_with_filter(
        &self,
        tablename: &str,
        filter: impl Fn(&Entry) -> bool,
    ) -> Result<T> {
        self.table(tablename)?.get_unique_with_filter(filter)
    }

    /// Get all entries where `fieldname` equals `value`.
    pub fn get_where(&self, tablename: &str, fieldname: &str, value: &str) -> Result<Vec<T>> {
        self.table(tablename)?.get_where(fieldname, value)
    }

    /// Get the sole entry where `fieldname` equals `value`.
    pub fn get_unique_where(&self, tablename: &str, fieldname: &str, value: &str) -> Result<T> {
        self.table(tablename)?.get_unique_where(fieldname, value)
    }

    /// Get all entries where `fieldname` does not equal `value`.
    pub fn get_where_not(&self, tablename: &str, fieldname: &str, value: &str) -> Result<Vec<T>> {
        self.table(tablename)?.get_where_not(fieldname, value)
    }

    /// Get the sole entry where `fieldname` does not equal `value`.
    pub fn get_unique_where_not(&self, tablename: &str, fieldname: &str, value: &str) -> Result<T> {
        self.table(tablename)?.get_unique_where_not(fieldname, value)
    }

    /// Get all entries where `fieldname` is greater than `value`.
    pub fn get_where_gt(&self, tablename: &str, fieldname: &str, value: f64) -> Result<Vec<T>> {
        self.table(tablename)?.get_where_gt(fieldname, value)
    }

    /// Get the sole entry where `fieldname` is greater than `value`.
    pub fn get_unique_where_gt(&self, tablename: &str, fieldname: &str, value: f64) -> Result<T> {
        self.table(tablename)?.get_unique_where_gt(fieldname, value)
    }

    /// Get all entries where `fieldname` is less than `value`.
    pub fn get_where_lt(&self, tablename: &str, fieldname: &str, value: f64) -> Result<Vec<T>> {
        self.table(tablename)?.get_where_lt(fieldname, value)
    }

    /// Get the sole entry where `fieldname` is less than `value`.
    pub fn get_unique_where_lt(&self, tablename: &str, fieldname: &str, value: f64) -> Result<T> {
        self.table(tablename)?.get_unique_where_lt(fieldname, value)
    }

    /// Get all entries where `fieldname` is greater than or equal to `value`.
    pub fn get_where_gte(&self, tablename: &str, fieldname: &str, value: f64) -> Result<Vec<T>> {
        self.table(tablename)?.get_where_gte(fieldname, value)
    }

    /// Get the sole entry where `fieldname` is greater than or equal to
    /// `value`.
    pub fn get_unique_where_gte(&self, tablename: &str, fieldname: &str, value: f64) -> Result<T> {
        self.table(tablename)?.get_unique_where_gte(fieldname, value)
    }

    /// Get all entries where `fieldname` is less than or equal to `value`.
    pub fn get_where_lte(&self, tablename: &str, fieldname: &str, value: f64) -> Result<Vec<T>> {
        self.table(tablename)?.get_where_lte(fieldname, value)
    }

    /// Get the sole entry where `fieldname` is less than or equal to `value`.
    pub fn get_unique_where_lte(&self, tablename: &str, fieldname: &str, value: f64) -> Result<T> {
        self.table(tablename)?.get_unique_where_lte(fieldname, value)
    }

    /// Get all entries where `fieldname` contains `value`.
    pub fn get_where_contains(
        &self,
        tablename: &str,
        fieldname: &str,
        value: &str,
    ) -> Result<Vec<T>> {
        self.table(tablename)?.get_where_contains(fieldname, value)
    }

    /// Get the sole entry where `fieldname` contains `value`.
    pub fn get_unique_where_contains(
        &self,
        tablename: &str,
        fieldname: &str,
        value: &str,
    ) -> Result<T> {
        self.table(tablename)?
            .get_unique_where_contains(fieldname, value)
    }

    /// Get all entries where `fieldname` does not contain `value`.
    pub fn get_where_not_contains(
        &self,
        tablename: &str,
        fieldname: &str,
        value: &str,
    ) -> Result<Vec<T>> {
        self.table(tablename)?
            .get_where_not_contains(fieldname, value)
    }

    /// Get the sole entry where `fieldname` does not contain `value`.
    pub fn get_unique_where_not_contains(
        &self,
        tablename: &str,
        fieldname: &str,
        value: &str,
    ) -> Result<T> {
        self.table(tablename)?
            .get_unique_where_not_contains(fieldname, value)
    }

    /// Get all entries where `fieldname` starts with `value`.
    pub fn get_where_starts_with(
        &self,
        tablename: &str,
        fieldname: &str,
        value: &str,
    ) -> Result<Vec<T>> {
        self.table(tablename)?
            .get_where_starts_with(fieldname, value)
    }

    /// Get the sole entry where `fieldname` starts with `value`.
    pub fn get_unique_where_starts_with(
        &self,
        tablename: &str,
        fieldname: &str,
        value: &str,
    ) -> Result<T> {
        self.table(tablename)?
            .get_unique_where_starts_with(fieldname, value)
    }

    /// Get all entries where `fieldname` ends with `value`.
    pub fn get_where_ends_with(
        &self,
        tablename: &str,
        fieldname: &str,
        value: &str,
    ) -> Result<Vec<T>> {
        self.table(tablename)?.get_where_ends_with(fieldname, value)
    }

    /// Get the sole entry where `fieldname` ends with `value`.
    pub fn get_unique_where_ends_with(
        &self,
        tablename: &str,
        fieldname: &str,
        value: &str,
    ) -> Result<T> {
        self.table(tablename)?
            .get_unique_where_ends_with(fieldname, value)
    }

    // ── Filter-query patch methods ─────────────────────────────────

    /// Apply `updated_fields` to every entry in the given table.
    pub fn patch_all(&self, tablename: &str, updated_fields: Entry) -> Result<()> {
        self.table(tablename)?.patch_all(updated_fields)
    }

    /// Apply `updated_fields` to every entry that passes the filter.
    pub fn patch_with_filter(
        &self,
        tablename: &str,
        filter: impl Fn(&Entry) -> bool,
        updated_fields: Entry,
    ) -> Result<()> {
        self.table(tablename)?
            .patch_with_filter(filter, updated_fields)
    }

    /// Apply `updated_fields` where `fieldname` equals `value`.
    pub fn patch_where(
        &self,
        tablename: &str,
        fieldname: &str,
        value: &str,
        updated_fields: Entry,
    ) -> Result<()> {
        self.table(tablename)?
            .patch_where(fieldname, value, updated_fields)
    }

    /// Apply `updated_fields` where `fieldname` does not equal `value`.
    pub fn patch_where_not(
        &self,
        tablename: &str,
        fieldname: &str,
        value: &str,
        updated_fields: Entry,
    ) -> Result<()> {
        self.table(tablename)?
            .patch_where_not(fieldname, value, updated_fields)
    }

    /// Apply `updated_fields` where `fieldname` is greater than `value`.
    pub fn patch_where_gt(
        &self,
        tablename: &str,
        fieldname: &str,
        value: f64,
        updated_fields: Entry,
    ) -> Result<()> {
        self.table(tablename)?
            .patch_where_gt(fieldname, value, updated_fields)
    }

    /// Apply `updated_fields` where `fieldname` is less than `value`.
    pub fn patch_where_lt(
        &self,
        tablename: &str,
        fieldname: &str,
        value: f64,
        updated_fields: Entry,
    ) -> Result<()> {
        self.table(tablename)?
            .patch_where_lt(fieldname, value, updated_fields)
    }

    /// Apply `updated_fields` where `fieldname` is at least `value`.
    pub fn patch_where_gte(
        &self,
        tablename: &str,
        fieldname: &str,
        value: f64,
        updated_fields: Entry,
    ) -> Result<()> {
        self.table(tablename)?
            .patch_where_gte(fieldname, value, updated_fields)
    }

    /// Apply `updated_fields` where `fieldname` is at most `value`.
    pub fn patch_where_lte(
        &self,
        tablename: &str,
        fieldname: &str,
        value: f64,
        updated_fields: Entry,
    ) -> Result<()> {
        self.table(tablename)?
            .patch_where_lte(fieldname, value, updated_fields)
    }

    /// Apply `updated_fields` where `fieldname` contains `value`.
    pub fn patch_where_contains(
        &self,
        tablename: &str,
        fieldname: &str,
        value: &str,
        updated_fields: Entry,
    ) -> Result<()> {
        self.table(tablename)?
            .patch_where_contains(fieldname, value, updated_fields)
    }

    /// Apply `updated_fields` where `fieldname` does not contain `value`.
    pub fn patch_where_not_contains(
        &self,
        tablename: &str,
        fieldname: &str,
        value: &str,
        updated_fields: Entry,
    ) -> Result<()> {
        self.table(tablename)?
            .patch_where_not_contains(fieldname, value, updated_fields)
    }

    /// Apply `updated_fields` where `fieldname` starts with `value`.
    pub fn patch_where_starts_with(
        &self,
        tablename: &str,
        fieldname: &str,
        value: &str,
        updated_fields: Entry,
    ) -> Result<()> {
        self.table(tablename)?
            .patch_where_starts_with(fieldname, value, updated_fields)
    }

    /// Apply `updated_fields` where `fieldname` ends with `value`.
    pub fn patch_where_ends_with(
        &self,
        tablename: &str,
        fieldname: &str,
        value: &str,
        updated_fields: Entry,
    ) -> Result<()> {
        self.table(tablename)?
            .patch_where_ends_with(fieldname, value, updated_fields)
    }

    // ── Filter-query delete methods ────────────────────────────────

    /// Delete every entry in the given table.
    pub fn delete_all(&self, tablename: &str) -> Result<()> {
        self.table(tablename)?.delete_all()
    }

    /// Delete every entry that passes the filter.
    pub fn delete_with_filter(
        &self,
        tablename: &str,
        filter: impl Fn(&Entry) -> bool,
    ) -> Result<()> {
        self.table(tablename)?.delete_with_filter(filter)
    }

    /// Delete every entry where `fieldname` equals `value`.
    pub fn delete_where(&self, tablename: &str, fieldname: &str, value: &str) -> Result<()> {
        self.table(tablename)?.delete_where(fieldname, value)
    }

    /// Delete every entry where `fieldname` does not equal `value`.
    pub fn delete_where_not(&self, tablename: &str, fieldname: &str, value: &str) -> Result<()> {
        self.table(tablename)?.delete_where_not(fieldname, value)
    }

    /// Delete every entry where `fieldname` is greater than `value`.
    pub fn delete_where_gt(&self, tablename: &str, fieldname: &str, value: f64) -> Result<()> {
        self.table(tablename)?.delete_where_gt(fieldname, value)
    }

    /// Delete every entry where `fieldname` is less than `value`.
    pub fn delete_where_lt(&self, tablename: &str, fieldname: &str, value: f64) -> Result<()> {
        self.table(tablename)?.delete_where_lt(fieldname, value)
    }

    /// Delete every entry where `fieldname` is at least `value`.
    pub fn delete_where_gte(&self, tablename: &str, fieldname: &str, value: f64) -> Result<()> {
        self.table(tablename)?.delete_where_gte(fieldname, value)
    }

    /// Delete every entry where `fieldname` is at most `value`.
    pub fn delete_where_lte(&self, tablename: &str, fieldname: &str, value: f64) -> Result<()> {
        self.table(tablename)?.delete_where_lte(fieldname, value)
    }

    /// Delete every entry where `fieldname` contains `value`.
    pub fn delete_where_contains(
        &self,
        tablename: &str,
        fieldname: &str,
        value: &str,
    ) -> Result<()> {
        self.table(tablename)?.delete_where_contains(fieldname, value)
    }

    /// Delete every entry where `fieldname` does not contain `value`.
    pub fn delete_where_not_contains(
        &self,
        tablename: &str,
        fieldname: &str,
        value: &str,
    ) -> Result<()> {
        self.table(tablename)?
            .delete_where_not_contains(fieldname, value)
    }

    /// Delete every entry where `fieldname` starts with `value`.
    pub fn delete_where_starts_with(
        &self,
        tablename: &str,
        fieldname: &str,
        value: &str,
    ) -> Result<()> {
        self.table(tablename)?
            .delete_where_starts_with(fieldname, value)
    }

    /// Delete every entry where `fieldname` ends with `value`.
    pub fn delete_where_ends_with(
        &self,
        tablename: &str,
        fieldname: &str,
        value: &str,
    ) -> Result<()> {
        self.table(tablename)?
            .delete_where_ends_with(fieldname, value)
    }
}
