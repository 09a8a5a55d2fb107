// ntuple/g4csv.rs
// Reader for Geant4 CSV ntuples.
//
// G4CsvAnalysisManager writes each ntuple of `NeutronData.csv` to its own
// file `NeutronData_nt_<ntuple>.csv`, with a `#`-prefixed header:
//
//   #class tools::wcsv::ntuple
//   #title Neutron tracks
//   #separator 44
//   #vector_separator 59
//   #column double KineticEnergy_eV
//   #column int NumSteps
//   0.0213,17
//
// A plain CSV with a header row (e.g. exported from a dataframe) is accepted
// too; its table name is the file stem.

use flate2::read::GzDecoder;
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use super::NtupleFile;
use crate::error::{AnalysisError, Result};

const NTUPLE_INFIX: &str = "_nt_";

#[derive(Debug, Clone)]
struct ParsedTable {
    columns: Vec<String>,
    /// Column-major values
    values: Vec<Vec<f64>>,
}

pub struct CsvNtupleFile {
    tables: BTreeMap<String, PathBuf>,
    parsed: HashMap<String, ParsedTable>,
}

fn is_gz(path: &Path) -> bool {
    path.extension()
        .map(|e| e.eq_ignore_ascii_case("gz"))
        .unwrap_or(false)
}

/// File name without `.csv` / `.csv.gz`.
fn strip_csv_ext(name: &str) -> &str {
    let name = name.strip_suffix(".gz").unwrap_or(name);
    name.strip_suffix(".csv").unwrap_or(name)
}

fn is_csv_name(name: &str) -> bool {
    name.ends_with(".csv") || name.ends_with(".csv.gz")
}

impl CsvNtupleFile {
    /// `path` may name a single ntuple file (`X_nt_T.csv`), a plain CSV, or
    /// the Geant4 base file name (`X.csv`) whose `X_nt_*.csv` siblings hold
    /// the tables.
    pub fn open(path: &Path) -> Result<Self> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| AnalysisError::FileNotFound(path.to_path_buf()))?;
        let stem = strip_csv_ext(file_name);

        let mut tables = BTreeMap::new();

        if path.is_file() {
            let table = match stem.split_once(NTUPLE_INFIX) {
                Some((_, t)) if !t.is_empty() => t.to_string(),
                _ => stem.to_string(),
            };
            tables.insert(table, path.to_path_buf());
        } else {
            let dir = match path.parent() {
                Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
                _ => PathBuf::from("."),
            };
            let prefix = format!("{}{}", stem, NTUPLE_INFIX);
            if let Ok(entries) = fs::read_dir(&dir) {
                for entry in entries.flatten() {
                    let name = entry.file_name().to_string_lossy().to_string();
                    if !(name.starts_with(&prefix) && is_csv_name(&name)) {
                        continue;
                    }
                    let table = strip_csv_ext(&name[prefix.len()..]).to_string();
                    if !table.is_empty() {
                        tables.insert(table, entry.path());
                    }
                }
            }
        }

        if tables.is_empty() {
            return Err(AnalysisError::FileNotFound(path.to_path_buf()));
        }

        Ok(Self {
            tables,
            parsed: HashMap::new(),
        })
    }

    /// Files backing each table, e.g. for renaming after a sweep point
    pub fn table_paths(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.tables.iter().map(|(k, v)| (k.as_str(), v.as_path()))
    }

    fn table(&mut self, table: &str) -> Result<&ParsedTable> {
        if !self.parsed.contains_key(table) {
            let path = self
                .tables
                .get(table)
                .ok_or_else(|| AnalysisError::TableNotFound {
                    table: table.to_string(),
                    available: self.tables.keys().cloned().collect(),
                })?
                .clone();
            let parsed = parse_table(&path)?;
            self.parsed.insert(table.to_string(), parsed);
        }
        // inserted above
        self.parsed
            .get(table)
            .ok_or_else(|| AnalysisError::Parse(format!("table '{}' not cached", table)))
    }
}

impl NtupleFile for CsvNtupleFile {
    fn table_names(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    fn columns(&mut self, table: &str) -> Result<Vec<String>> {
        Ok(self.table(table)?.columns.clone())
    }

    fn read_column(&mut self, table: &str, column: &str) -> Result<Vec<f64>> {
        let parsed = self.table(table)?;
        let idx = parsed
            .columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| AnalysisError::MissingColumn(vec![column.to_string()]))?;
        Ok(parsed.values[idx].clone())
    }
}

fn read_text(path: &Path) -> Result<String> {
    let file = File::open(path)?;
    let mut text = String::new();
    if is_gz(path) {
        GzDecoder::new(BufReader::new(file)).read_to_string(&mut text)?;
    } else {
        BufReader::new(file).read_to_string(&mut text)?;
    }
    Ok(text)
}

fn parse_table(path: &Path) -> Result<ParsedTable> {
    let text = read_text(path)?;

    let mut columns: Vec<String> = Vec::new();
    let mut separator = b',';

    for line in text.lines() {
        let trimmed = line.trim();
        if !trimmed.starts_with('#') {
            break;
        }
        let mut parts = trimmed[1..].split_whitespace();
        match parts.next() {
            Some("separator") => {
                if let Some(code) = parts.next().and_then(|c| c.parse::<u8>().ok()) {
                    separator = code;
                }
            }
            // `#column <type> <name>`
            Some("column") => {
                if let Some(name) = parts.nth(1) {
                    columns.push(name.to_string());
                }
            }
            _ => {}
        }
    }

    // header lines are skipped by the reader as comments
    let has_header_row = columns.is_empty();

    let mut reader = ::csv::ReaderBuilder::new()
        .delimiter(separator)
        .has_headers(has_header_row)
        .comment(Some(b'#'))
        .trim(::csv::Trim::All)
        .flexible(false)
        .from_reader(text.as_bytes());

    if has_header_row {
        columns = reader
            .headers()?
            .iter()
            .map(|h| h.to_string())
            .collect();
    }

    let mut values: Vec<Vec<f64>> = vec![Vec::new(); columns.len()];
    for (row_idx, record) in reader.records().enumerate() {
        let record = record?;
        if record.len() != columns.len() {
            return Err(AnalysisError::Parse(format!(
                "{}: row {} has {} fields, expected {}",
                path.display(),
                row_idx + 1,
                record.len(),
                columns.len()
            )));
        }
        for (col, field) in record.iter().enumerate() {
            let v = field.parse::<f64>().map_err(|e| {
                AnalysisError::Parse(format!(
                    "{}: row {}, column '{}': {}",
                    path.display(),
                    row_idx + 1,
                    columns[col],
                    e
                ))
            })?;
            values[col].push(v);
        }
    }

    Ok(ParsedTable { columns, values })
}
