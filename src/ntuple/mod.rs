/// Columnar ntuple access for simulator output files
///
/// This module provides:
/// - A small trait over "open file, list tables, list columns, read a column"
/// - A Geant4 CSV ntuple backend (plain or gzip-compressed)
/// - A ROOT TTree backend when built with the `root` feature
///
/// Files are opened through [`open`], which picks the backend from the path.

pub mod g4csv;
#[cfg(feature = "root")]
pub mod root;

use std::path::{Path, PathBuf};

use crate::error::{AnalysisError, Result};

pub use self::g4csv::CsvNtupleFile;

pub trait NtupleFile {
    /// Raw table names as stored in the file (may carry `;N` cycle suffixes)
    fn table_names(&self) -> Vec<String>;

    /// Column names of `table`
    fn columns(&mut self, table: &str) -> Result<Vec<String>>;

    /// All values of one column, in row order
    fn read_column(&mut self, table: &str, column: &str) -> Result<Vec<f64>>;
}

/// Drop a ROOT-style cycle suffix: `NeutronTracks;1` -> `NeutronTracks`.
pub fn strip_cycle(name: &str) -> &str {
    name.split(';').next().unwrap_or(name)
}

/// Table names without cycle suffixes, deduplicated, in file order.
pub fn available_tables(file: &dyn NtupleFile) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for raw in file.table_names() {
        let clean = strip_cycle(&raw).to_string();
        if !names.contains(&clean) {
            names.push(clean);
        }
    }
    names
}

/// Resolve `table` against the file's tables, ignoring cycle suffixes.
/// Returns the raw name to pass back to the backend.
pub fn resolve_table(file: &dyn NtupleFile, table: &str) -> Result<String> {
    file.table_names()
        .into_iter()
        .find(|raw| strip_cycle(raw) == table)
        .ok_or_else(|| AnalysisError::TableNotFound {
            table: table.to_string(),
            available: available_tables(file),
        })
}

/// Open a simulator output file. `.root` goes to the ROOT reader, anything
/// else is treated as a Geant4 CSV ntuple set.
pub fn open(path: &Path) -> Result<Box<dyn NtupleFile>> {
    let is_root = path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("root"))
        .unwrap_or(false);

    if is_root {
        if !path.exists() {
            return Err(AnalysisError::FileNotFound(path.to_path_buf()));
        }
        return open_root(path);
    }

    Ok(Box::new(CsvNtupleFile::open(path)?))
}

/// Files on disk that make up the container at `path`; empty when nothing
/// has been written yet.
pub fn container_files(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        return vec![path.to_path_buf()];
    }
    match CsvNtupleFile::open(path) {
        Ok(csv) => csv.table_paths().map(|(_, p)| p.to_path_buf()).collect(),
        Err(_) => Vec::new(),
    }
}

#[cfg(feature = "root")]
fn open_root(path: &Path) -> Result<Box<dyn NtupleFile>> {
    Ok(Box::new(root::RootNtupleFile::open(path)?))
}

#[cfg(not(feature = "root"))]
fn open_root(path: &Path) -> Result<Box<dyn NtupleFile>> {
    Err(AnalysisError::InvalidConfig(format!(
        "'{}' is a ROOT file; rebuild with `--features root` or have the simulator write CSV ntuples",
        path.display()
    )))
}
