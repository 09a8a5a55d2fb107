// loader.rs
// Loads the detected-neutron ntuple into an in-memory record set

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use ultraviolet::{DVec2, DVec3};

use crate::error::{AnalysisError, Result};
use crate::ntuple;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Column {
    KineticEnergy,
    FinalTime,
    TrackLength,
    FinalPosX,
    FinalPosY,
    NumSteps,
    DirX,
    DirY,
    DirZ,
}

impl Column {
    /// Column name as written by the simulator
    pub fn name(&self) -> &'static str {
        match self {
            Column::KineticEnergy => "KineticEnergy_eV",
            Column::FinalTime => "FinalTime_ns",
            Column::TrackLength => "TotalTrackLength_mm",
            Column::FinalPosX => "FinalPosX_mm",
            Column::FinalPosY => "FinalPosY_mm",
            Column::NumSteps => "NumSteps",
            Column::DirX => "DirX",
            Column::DirY => "DirY",
            Column::DirZ => "DirZ",
        }
    }
}

pub const ANGULAR_COLUMNS: [Column; 3] = [Column::DirX, Column::DirY, Column::DirZ];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadMode {
    /// Every base column including `NumSteps` must exist
    Strict,
    /// Load whatever subset of the base columns exists
    Lenient,
}

impl LoadMode {
    pub fn base_columns(&self) -> &'static [Column] {
        match self {
            LoadMode::Strict => &[
                Column::KineticEnergy,
                Column::FinalTime,
                Column::TrackLength,
                Column::FinalPosX,
                Column::FinalPosY,
                Column::NumSteps,
            ],
            LoadMode::Lenient => &[
                Column::KineticEnergy,
                Column::FinalTime,
                Column::TrackLength,
                Column::FinalPosX,
                Column::FinalPosY,
            ],
        }
    }
}

/// One neutron crossing into the detector
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub kinetic_energy_ev: f64,
    pub final_time_ns: Option<f64>,
    pub track_length_mm: Option<f64>,
    pub final_pos_mm: Option<DVec2>,
    pub num_steps: Option<f64>,
    /// Direction cosines; `z` is cos(theta) relative to the beam axis
    pub direction: Option<DVec3>,
}

impl Record {
    pub fn with_energy(kinetic_energy_ev: f64) -> Self {
        Self {
            kinetic_energy_ev,
            final_time_ns: None,
            track_length_mm: None,
            final_pos_mm: None,
            num_steps: None,
            direction: None,
        }
    }

    pub fn value(&self, column: Column) -> Option<f64> {
        match column {
            Column::KineticEnergy => Some(self.kinetic_energy_ev),
            Column::FinalTime => self.final_time_ns,
            Column::TrackLength => self.track_length_mm,
            Column::FinalPosX => self.final_pos_mm.map(|p| p.x),
            Column::FinalPosY => self.final_pos_mm.map(|p| p.y),
            Column::NumSteps => self.num_steps,
            Column::DirX => self.direction.map(|d| d.x),
            Column::DirY => self.direction.map(|d| d.y),
            Column::DirZ => self.direction.map(|d| d.z),
        }
    }
}

/// Records of one run plus the columns that were actually loaded
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    records: Vec<Record>,
    columns: Vec<Column>,
}

impl RecordSet {
    pub fn new(records: Vec<Record>, columns: Vec<Column>) -> Self {
        Self { records, columns }
    }

    /// Same columns, different rows
    pub fn with_records(&self, records: Vec<Record>) -> Self {
        Self {
            records,
            columns: self.columns.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn has(&self, column: Column) -> bool {
        self.columns.contains(&column)
    }

    pub fn has_angular(&self) -> bool {
        ANGULAR_COLUMNS.iter().all(|c| self.has(*c))
    }

    /// Values of one column across all records that carry it
    pub fn values(&self, column: Column) -> Vec<f64> {
        self.records.iter().filter_map(|r| r.value(column)).collect()
    }
}

#[derive(Debug, Clone)]
pub struct LoadedData {
    pub records: RecordSet,
    pub angular_present: bool,
}

/// Open `path`, resolve `table`, check columns and read them into records.
/// The file handle is dropped before returning on every path.
pub fn load_records(path: &Path, table: &str, mode: LoadMode) -> Result<LoadedData> {
    log::info!("--- Loading file: {}...", path.display());

    let mut file = ntuple::open(path).map_err(|e| {
        if let AnalysisError::FileNotFound(_) = e {
            log::error!(
                "File not found. Make sure '{}' is in the working directory.",
                path.display()
            );
        }
        e
    })?;

    let raw_table = ntuple::resolve_table(&*file, table).map_err(|e| {
        if let AnalysisError::TableNotFound { available, .. } = &e {
            log::error!("Ntuple '{}' not found in file.", table);
            log::error!("Available ntuples: {:?}", available);
        }
        e
    })?;

    let available = file.columns(&raw_table)?;
    let is_available = |c: &Column| available.iter().any(|a| a == c.name());

    let base = mode.base_columns();
    let missing: Vec<Column> = base.iter().copied().filter(|c| !is_available(c)).collect();
    let mut to_load: Vec<Column> = base.iter().copied().filter(|c| is_available(c)).collect();

    if !missing.is_empty() {
        let names: Vec<String> = missing.iter().map(|c| c.name().to_string()).collect();
        match mode {
            LoadMode::Strict => {
                log::error!("Base column(s) missing from ntuple: {:?}", names);
                return Err(AnalysisError::MissingColumn(names));
            }
            LoadMode::Lenient => {
                log::warn!("Ntuple is missing column(s): {:?}", names);
                if to_load.is_empty() {
                    log::error!("None of the requested columns exist. Cannot continue.");
                    return Err(AnalysisError::MissingColumn(names));
                }
                let loading: Vec<&str> = to_load.iter().map(|c| c.name()).collect();
                log::warn!("Loading only the available columns: {:?}", loading);
                if !to_load.contains(&Column::KineticEnergy) {
                    log::error!("'{}' is essential and was not found.", Column::KineticEnergy.name());
                    return Err(AnalysisError::MissingColumn(vec![
                        Column::KineticEnergy.name().to_string(),
                    ]));
                }
            }
        }
    }

    let angular_present = match ANGULAR_COLUMNS.iter().find(|c| !is_available(*c)) {
        Some(absent) => {
            log::info!(
                "Angular column '{}' not found; angular analysis will be skipped.",
                absent.name()
            );
            false
        }
        None => {
            log::info!("Angular data (DirX, DirY, DirZ) found and loaded.");
            to_load.extend_from_slice(&ANGULAR_COLUMNS);
            true
        }
    };

    let mut data: HashMap<Column, Vec<f64>> = HashMap::new();
    for column in &to_load {
        data.insert(*column, file.read_column(&raw_table, column.name())?);
    }
    drop(file);

    let rows = data.get(&Column::KineticEnergy).map(|v| v.len()).unwrap_or(0);
    if let Some((column, values)) = data.iter().find(|(_, v)| v.len() != rows) {
        return Err(AnalysisError::Parse(format!(
            "column '{}' has {} rows, expected {}",
            column.name(),
            values.len(),
            rows
        )));
    }

    let get = |c: Column, i: usize| data.get(&c).map(|v| v[i]);
    let has_pos = to_load.contains(&Column::FinalPosX) && to_load.contains(&Column::FinalPosY);

    let records = (0..rows)
        .map(|i| Record {
            kinetic_energy_ev: data[&Column::KineticEnergy][i],
            final_time_ns: get(Column::FinalTime, i),
            track_length_mm: get(Column::TrackLength, i),
            final_pos_mm: if has_pos {
                Some(DVec2::new(
                    data[&Column::FinalPosX][i],
                    data[&Column::FinalPosY][i],
                ))
            } else {
                None
            },
            num_steps: get(Column::NumSteps, i),
            direction: if angular_present {
                Some(DVec3::new(
                    data[&Column::DirX][i],
                    data[&Column::DirY][i],
                    data[&Column::DirZ][i],
                ))
            } else {
                None
            },
        })
        .collect();

    log::info!("Data loaded. {} neutrons detected.", rows);

    Ok(LoadedData {
        records: RecordSet::new(records, to_load),
        angular_present,
    })
}

#[cfg(test)]
pub(crate) fn test_records(energies: &[f64]) -> RecordSet {
    RecordSet::new(
        energies.iter().map(|e| Record::with_energy(*e)).collect(),
        vec![Column::KineticEnergy],
    )
}
