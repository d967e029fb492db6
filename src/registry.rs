//! The table-registry facade: maps table name to [`SegmentSet`], encodes and
//! decodes caller records, and exposes the user-facing API.
//!
//! A table's value type is fixed by its first `create_table`/`append`/`get`
//! call and checked on every subsequent call against that table.

use crate::errors::RegistryError;
use crate::key::Key;
use crate::segment::StoredRecord;
use crate::segment_set::SegmentSet;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::any::TypeId;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, instrument};

const BINCODE_CONFIG: bincode::config::Configuration = bincode::config::standard();
const TABLES_DIR: &str = "inksacks";

/// Configuration for a registry, carried as a value rather than a global.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Per-table capacity: no segment holds more than this many rows.
    pub max_rows_per_segment: u32,
    /// Root directory under which `inksacks/<table>/` is stored.
    pub root: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_rows_per_segment: 1000,
            root: PathBuf::from("."),
        }
    }
}

struct Table {
    set: SegmentSet,
    value_type: TypeId,
    value_type_name: &'static str,
}

/// Maps table name to segment set; the single entry point callers use to
/// create tables, append records, scan ranges, and commit.
pub struct Registry {
    config: EngineConfig,
    tables: HashMap<String, Table>,
}

impl Registry {
    /// Scans `<root>/inksacks/` for existing table directories and opens
    /// each as a [`SegmentSet`].
    ///
    /// Table directories found on disk are reopened as untyped schemas:
    /// the first `create_table::<T>` (or `append`/`get`) call against that
    /// name after reopening fixes `T` for the remainder of the process.
    #[instrument(skip_all, fields(root = ?config.root))]
    pub fn open(config: EngineConfig) -> Result<Registry, RegistryError> {
        let tables_dir = config.root.join(TABLES_DIR);
        fs::create_dir_all(&tables_dir).map_err(|e| RegistryError::Io {
            path: tables_dir.clone(),
            source: e,
        })?;

        let mut tables = HashMap::new();
        let mut entries: Vec<_> = fs::read_dir(&tables_dir)
            .map_err(|e| RegistryError::Io {
                path: tables_dir.clone(),
                source: e,
            })?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
            .collect();
        entries.sort_by_key(|e| e.file_name());

        for entry in entries {
            let name = entry.file_name().to_string_lossy().into_owned();
            let set = SegmentSet::open(entry.path(), config.max_rows_per_segment)?;
            debug!(table = %name, "reopened existing table");
            tables.insert(
                name,
                Table {
                    set,
                    value_type: TypeId::of::<()>(),
                    value_type_name: "<unknown, not yet re-typed>",
                },
            );
        }

        info!(tables = tables.len(), "registry opened");
        Ok(Registry { config, tables })
    }

    /// Registers a new table named `name`, storing values of type `T`.
    /// Fails with `TableExists` if the name is already registered.
    #[instrument(skip(self), fields(table = %name))]
    pub fn create_table<T: 'static>(&mut self, name: &str) -> Result<(), RegistryError> {
        if self.tables.contains_key(name) {
            return Err(RegistryError::TableExists(name.to_string()));
        }
        let dir = self.config.root.join(TABLES_DIR).join(name);
        let set = SegmentSet::open(&dir, self.config.max_rows_per_segment)?;
        self.tables.insert(
            name.to_string(),
            Table {
                set,
                value_type: TypeId::of::<T>(),
                value_type_name: std::any::type_name::<T>(),
            },
        );
        info!("table created");
        Ok(())
    }

    /// Encodes `record` and appends it to `table` under an auto-assigned
    /// key, returning that key.
    #[instrument(skip(self, record), fields(table = %table))]
    pub fn append<T: Serialize + 'static>(
        &mut self,
        table: &str,
        record: &T,
    ) -> Result<Key, RegistryError> {
        let entry = self.table_mut(table, TypeId::of::<T>(), std::any::type_name::<T>())?;
        let bytes = bincode::serde::encode_to_vec(record, BINCODE_CONFIG).map_err(|e| {
            RegistryError::Encode {
                table: table.to_string(),
                source: e,
            }
        })?;
        Ok(entry.set.auto_append(bytes)?)
    }

    /// Scans `table` for every record whose key lies in `[from, to]`,
    /// decoding each as `T`, and returns the decoded records alongside
    /// their keys, both in ascending key order.
    #[instrument(skip(self), fields(table = %table, %from, %to))]
    pub fn get<T: DeserializeOwned + 'static>(
        &mut self,
        table: &str,
        from: Key,
        to: Key,
    ) -> Result<(Vec<T>, Vec<Key>), RegistryError> {
        let entry = self.table_mut(table, TypeId::of::<T>(), std::any::type_name::<T>())?;
        let records: Vec<StoredRecord> = entry.set.get_all(from, to)?;

        let mut values = Vec::with_capacity(records.len());
        let mut keys = Vec::with_capacity(records.len());
        for record in records {
            let (value, _): (T, usize) =
                bincode::serde::decode_from_slice(&record.value, BINCODE_CONFIG).map_err(|e| {
                    RegistryError::Decode {
                        table: table.to_string(),
                        source: e,
                    }
                })?;
            values.push(value);
            keys.push(record.key);
        }
        Ok((values, keys))
    }

    /// Commits every registered table's segment set, surfacing the first
    /// error.
    #[instrument(skip(self))]
    pub fn commit(&mut self) -> Result<(), RegistryError> {
        for (name, table) in &mut self.tables {
            table.set.commit().map_err(|e| {
                debug!(table = %name, "commit failed");
                e
            })?;
        }
        Ok(())
    }

    /// Looks up `table`, checking (and, for a freshly-reopened table,
    /// fixing) its registered value type against `T`.
    fn table_mut(
        &mut self,
        table: &str,
        type_id: TypeId,
        type_name: &'static str,
    ) -> Result<&mut Table, RegistryError> {
        let entry = self
            .tables
            .get_mut(table)
            .ok_or_else(|| RegistryError::TableNotFound(table.to_string()))?;

        if entry.value_type == TypeId::of::<()>() {
            // Reopened from disk with no schema hint yet supplied; adopt T.
            entry.value_type = type_id;
            entry.value_type_name = type_name;
        } else if entry.value_type != type_id {
            return Err(RegistryError::SchemaMismatch {
                table: table.to_string(),
                expected: entry.value_type_name,
                actual: type_name,
            });
        }
        Ok(entry)
    }
}
