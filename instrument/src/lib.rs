//! Structured event capture for search diagnostics.
//!
//! A `tracing` subscriber turns every info-level event into a row of the table
//! named by its `target`. Columns appear the first time a field is seen and
//! are padded with defaults for rows that do not carry them, so every table
//! stays rectangular and converts directly into a polars `DataFrame`.
//!
//! ```ignore
//! // In planner code:
//! tracing::info!(target: "expand", iteration, action = name, wait);
//!
//! // In a test:
//! let (result, recording) = instrument::record(|| planner.calculate_buildorder(&root, &goal));
//! let expand = recording.table("expand").unwrap();
//! ```

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use polars::prelude::*;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Record};
use tracing::{Event, Id, Metadata, Subscriber};

// ============================================================================
// Tables
// ============================================================================

/// Values of one field across all rows of a table.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    U64(Vec<u64>),
    I64(Vec<i64>),
    F64(Vec<f64>),
    Bool(Vec<bool>),
    Str(Vec<String>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::U64(v) => v.len(),
            ColumnData::I64(v) => v.len(),
            ColumnData::F64(v) => v.len(),
            ColumnData::Bool(v) => v.len(),
            ColumnData::Str(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn resize(&mut self, rows: usize) {
        match self {
            ColumnData::U64(v) => v.resize(rows, 0),
            ColumnData::I64(v) => v.resize(rows, 0),
            ColumnData::F64(v) => v.resize(rows, 0.0),
            ColumnData::Bool(v) => v.resize(rows, false),
            ColumnData::Str(v) => v.resize(rows, String::new()),
        }
    }

    fn to_column(&self, name: &str) -> Column {
        match self {
            ColumnData::U64(v) => Column::new(name.into(), v),
            ColumnData::I64(v) => Column::new(name.into(), v),
            ColumnData::F64(v) => Column::new(name.into(), v),
            ColumnData::Bool(v) => Column::new(name.into(), v),
            ColumnData::Str(v) => Column::new(name.into(), v),
        }
    }
}

/// All events recorded under one target.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventTable {
    pub columns: BTreeMap<String, ColumnData>,
    pub rows: usize,
}

impl EventTable {
    pub fn column(&self, name: &str) -> Option<&ColumnData> {
        self.columns.get(name)
    }

    pub fn u64s(&self, name: &str) -> Option<&[u64]> {
        match self.columns.get(name)? {
            ColumnData::U64(v) => Some(v),
            _ => None,
        }
    }

    pub fn f64s(&self, name: &str) -> Option<&[f64]> {
        match self.columns.get(name)? {
            ColumnData::F64(v) => Some(v),
            _ => None,
        }
    }

    pub fn strs(&self, name: &str) -> Option<&[String]> {
        match self.columns.get(name)? {
            ColumnData::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Bring every column up to `rows` entries.
    fn align(&mut self) {
        for column in self.columns.values_mut() {
            if column.len() < self.rows {
                column.resize(self.rows);
            }
        }
    }

    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let columns: Vec<Column> = self
            .columns
            .iter()
            .map(|(name, data)| data.to_column(name))
            .collect();
        DataFrame::new(columns)
    }
}

/// Every table captured on the current thread, keyed by target.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recording {
    pub tables: BTreeMap<String, EventTable>,
}

impl Recording {
    pub fn table(&self, target: &str) -> Option<&EventTable> {
        self.tables.get(target)
    }

    /// Rows recorded under `target`, zero if it never fired
    pub fn rows(&self, target: &str) -> usize {
        self.tables.get(target).map_or(0, |t| t.rows)
    }

    /// Tables that fail to convert are skipped.
    pub fn to_dataframes(&self) -> HashMap<String, DataFrame> {
        self.tables
            .iter()
            .filter_map(|(name, table)| table.to_dataframe().ok().map(|df| (name.clone(), df)))
            .collect()
    }
}

thread_local! {
    static RECORDING: RefCell<Recording> = RefCell::default();
}

// ============================================================================
// Subscriber
// ============================================================================

struct RowVisitor<'a> {
    table: &'a mut EventTable,
}

impl RowVisitor<'_> {
    /// Append to the named column, creating it padded to the rows seen so far.
    fn push(&mut self, field: &Field, empty: impl FnOnce(usize) -> ColumnData, append: impl FnOnce(&mut ColumnData)) {
        let rows = self.table.rows;
        let column = self
            .table
            .columns
            .entry(field.name().to_string())
            .or_insert_with(|| empty(rows));
        append(column);
    }
}

impl Visit for RowVisitor<'_> {
    fn record_u64(&mut self, field: &Field, value: u64) {
        self.push(field, |n| ColumnData::U64(vec![0; n]), |c| {
            if let ColumnData::U64(v) = c {
                v.push(value);
            }
        });
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.push(field, |n| ColumnData::I64(vec![0; n]), |c| {
            if let ColumnData::I64(v) = c {
                v.push(value);
            }
        });
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.push(field, |n| ColumnData::F64(vec![0.0; n]), |c| {
            if let ColumnData::F64(v) = c {
                v.push(value);
            }
        });
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.push(field, |n| ColumnData::Bool(vec![false; n]), |c| {
            if let ColumnData::Bool(v) = c {
                v.push(value);
            }
        });
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.push(field, |n| ColumnData::Str(vec![String::new(); n]), |c| {
            if let ColumnData::Str(v) = c {
                v.push(value.to_string());
            }
        });
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.record_str(field, &format!("{value:?}"));
    }
}

/// Collects info-level events into thread-local tables. Spans are ignored.
pub struct TableSubscriber;

impl Subscriber for TableSubscriber {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.is_event() && *metadata.level() <= tracing::Level::INFO
    }

    fn new_span(&self, _span: &Attributes<'_>) -> Id {
        Id::from_u64(1)
    }

    fn record(&self, _span: &Id, _values: &Record<'_>) {}

    fn record_follows_from(&self, _span: &Id, _follows: &Id) {}

    fn event(&self, event: &Event<'_>) {
        let target = event.metadata().target().to_string();
        RECORDING.with(|recording| {
            let mut recording = recording.borrow_mut();
            let table = recording.tables.entry(target).or_default();
            table.align();
            event.record(&mut RowVisitor { table: &mut *table });
            table.rows += 1;
            table.align();
        });
    }

    fn enter(&self, _span: &Id) {}

    fn exit(&self, _span: &Id) {}
}

/// Install [`TableSubscriber`] as the process-wide default. Later calls are no-ops.
pub fn install_subscriber() {
    let _ = tracing::subscriber::set_global_default(TableSubscriber);
}

/// Take everything recorded on this thread.
pub fn drain() -> Recording {
    RECORDING.with(|r| std::mem::take(&mut *r.borrow_mut()))
}

pub fn clear() {
    RECORDING.with(|r| *r.borrow_mut() = Recording::default());
}

/// Run `f` with [`TableSubscriber`] as the thread's default and return what it recorded.
/// Anything recorded earlier on this thread is discarded.
pub fn record<R>(f: impl FnOnce() -> R) -> (R, Recording) {
    clear();
    let result = tracing::subscriber::with_default(TableSubscriber, f);
    (result, drain())
}

pub fn drain_to_dataframes() -> HashMap<String, DataFrame> {
    drain().to_dataframes()
}

// ============================================================================
// Persistence
// ============================================================================

fn io_error(error: std::io::Error) -> PolarsError {
    PolarsError::IO {
        error: error.into(),
        msg: None,
    }
}

/// Write each frame as `{dir}/{name}.parquet`.
pub fn save_parquet(dfs: &mut HashMap<String, DataFrame>, dir: &Path) -> PolarsResult<()> {
    std::fs::create_dir_all(dir).map_err(io_error)?;
    for (name, df) in dfs.iter_mut() {
        let file = std::fs::File::create(dir.join(format!("{name}.parquet"))).map_err(io_error)?;
        ParquetWriter::new(file).finish(df)?;
    }
    Ok(())
}

/// Keep ASCII alphanumerics, map the rest to `_`, cap at 60 chars.
fn sanitize(name: &str) -> String {
    name.chars()
        .take(60)
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// RAII guard for one recorded run.
///
/// Clears the thread's tables and installs the global subscriber on creation.
/// On drop the tables are written to `{parent}/{unix_secs}_{name}/*.parquet`,
/// followed by an empty `_ready` sentinel once every file is complete.
pub struct ScopedRecorder {
    run_dir: PathBuf,
    run_name: String,
    dfs: Option<HashMap<String, DataFrame>>,
}

impl ScopedRecorder {
    pub fn new(parent: impl Into<PathBuf>, name: &str) -> Self {
        let secs = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let run_name = format!("{secs}_{}", sanitize(name));
        let run_dir = parent.into().join(&run_name);
        clear();
        install_subscriber();
        Self {
            run_dir,
            run_name,
            dfs: None,
        }
    }

    /// Drains on first call and caches the frames for later calls and for drop.
    pub fn get(&mut self) -> &HashMap<String, DataFrame> {
        self.dfs.get_or_insert_with(drain_to_dataframes)
    }

    pub fn run_name(&self) -> &str {
        &self.run_name
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }
}

impl Drop for ScopedRecorder {
    fn drop(&mut self) {
        let mut dfs = self.dfs.take().unwrap_or_else(drain_to_dataframes);
        if dfs.is_empty() {
            return;
        }
        if let Err(e) = save_parquet(&mut dfs, &self.run_dir) {
            eprintln!("ScopedRecorder({}): failed to write parquet: {e}", self.run_name);
            return;
        }
        if let Err(e) = std::fs::File::create(self.run_dir.join("_ready")) {
            eprintln!("ScopedRecorder({}): failed to write _ready: {e}", self.run_name);
        }
    }
}
