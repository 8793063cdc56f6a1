// ============================================================
// Layer 6 — Result Table
// ============================================================
// An in-memory table of result rows that is rewritten to a CSV
// file after every run, so a crashed sweep keeps everything it
// finished.
//
// Writes go to `<file>.tmp` first and are then renamed over the
// real file. A crash mid-write leaves the previous table intact
// instead of a half-written one.
//
// Reading goes through the csv crate, so quoted cells are fine.
// Columns are matched by name (extra columns such as a pandas
// index column are ignored). Any other problem (missing file,
// missing column, bad cell) makes `load_or_empty` start from an
// empty table, as a sweep would rather retrain than refuse to run.

use anyhow::{ensure, Context, Result};
use csv::{ReaderBuilder, StringRecord, Trim, Writer};
use std::{fs, path::{Path, PathBuf}};

use crate::domain::run_key::RunKey;
use crate::domain::traits::TabularRecord;

pub struct ResultTable<R: TabularRecord> {
    path: PathBuf,
    rows: Vec<R>,
}

impl<R: TabularRecord> ResultTable<R> {
    /// An empty table that will be written to `path`.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), rows: Vec::new() }
    }

    /// Read `path`, failing on any problem.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let text = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read result table '{}'", path.display()))?;
        let rows = parse_rows(&text)
            .with_context(|| format!("Malformed result table '{}'", path.display()))?;
        Ok(Self { path, rows })
    }

    /// Resume from `path` if it holds a readable table, otherwise start empty.
    pub fn load_or_empty(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match Self::load(&path) {
            Ok(table) => {
                tracing::info!("Resuming from {} rows in '{}'", table.rows.len(), path.display());
                table
            }
            Err(e) => {
                tracing::debug!("Starting a fresh result table: {:#}", e);
                Self::empty(path)
            }
        }
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, key: &RunKey) -> bool {
        self.rows.iter().any(|r| &r.key() == key)
    }

    pub fn push(&mut self, row: R) {
        self.rows.push(row);
    }

    /// Rewrite the whole file atomically.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create '{}'", parent.display()))?;
        }

        let mut writer = Writer::from_writer(Vec::new());
        writer.write_record(R::HEADER)?;
        for row in &self.rows {
            writer.write_record(row.to_fields())?;
        }
        let text = writer.into_inner().map_err(|e| e.into_error())?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, text).with_context(|| format!("Cannot write '{}'", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Cannot replace '{}'", self.path.display()))?;

        tracing::debug!("Wrote {} rows to '{}'", self.rows.len(), self.path.display());
        Ok(())
    }
}

fn parse_rows<R: TabularRecord>(text: &str) -> Result<Vec<R>> {
    let table = CsvColumns::parse(text)?;
    let rows  = table.select(R::HEADER)?;
    rows.iter()
        .enumerate()
        .map(|(i, fields)| R::from_fields(fields).with_context(|| format!("row {}", i + 1)))
        .collect()
}

// ─── CsvColumns ───────────────────────────────────────────────────────────────
/// A CSV table held in memory, with cells looked up by column name.
pub struct CsvColumns {
    header:  StringRecord,
    records: Vec<StringRecord>,
}

impl CsvColumns {
    pub fn parse(text: &str) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(text.as_bytes());

        let header = reader.headers().context("cannot read the header row")?.clone();
        ensure!(!header.is_empty(), "file is empty");

        let records = reader
            .records()
            .enumerate()
            .map(|(i, r)| r.with_context(|| format!("row {}", i + 1)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { header, records })
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.header.iter().any(|h| h == name)
    }

    /// The cells of every row, ordered like `wanted`.
    pub fn select(&self, wanted: &[&str]) -> Result<Vec<Vec<&str>>> {
        let columns = wanted
            .iter()
            .map(|name| {
                self.header
                    .iter()
                    .position(|h| h == *name)
                    .with_context(|| format!("missing column '{name}'"))
            })
            .collect::<Result<Vec<usize>>>()?;

        self.records
            .iter()
            .enumerate()
            .map(|(i, record)| {
                columns
                    .iter()
                    .map(|&c| record.get(c))
                    .collect::<Option<Vec<&str>>>()
                    .with_context(|| format!("row {} has {} cells", i + 1, record.len()))
            })
            .collect()
    }
}
