/// Export sweep results to CSV, one row per completed geometry
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

use super::config::GeometryPoint;
use crate::classify::BandCounts;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    #[serde(rename = "Ancho_(cm)")]
    pub width_cm: f64,
    #[serde(rename = "Alto_(cm)")]
    pub height_cm: f64,
    #[serde(rename = "Espesor_(cm)")]
    pub thickness_cm: f64,
    #[serde(rename = "Detectados")]
    pub detected: usize,
    #[serde(rename = "Termicos")]
    pub thermal: usize,
    #[serde(rename = "Epitermicos")]
    pub epithermal: usize,
    #[serde(rename = "Rapidos")]
    pub fast: usize,
}

impl SummaryRow {
    pub fn new(point: &GeometryPoint, counts: BandCounts) -> Self {
        let (w, h, t) = point.full_dimensions();
        Self {
            width_cm: w,
            height_cm: h,
            thickness_cm: t,
            detected: counts.total(),
            thermal: counts.thermal,
            epithermal: counts.epithermal,
            fast: counts.fast,
        }
    }
}

/// Write all rows with a header line. An empty sweep still gets the header.
pub fn write_results_csv<P: AsRef<Path>>(path: P, rows: &[SummaryRow]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(File::create(path)?);
    writer.write_record([
        "Ancho_(cm)",
        "Alto_(cm)",
        "Espesor_(cm)",
        "Detectados",
        "Termicos",
        "Epitermicos",
        "Rapidos",
    ])?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn read_results_csv<P: AsRef<Path>>(path: P) -> Result<Vec<SummaryRow>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(x: f64, thermal: usize) -> SummaryRow {
        SummaryRow::new(
            &GeometryPoint { x, y: 1.0, z: 0.5 },
            BandCounts {
                thermal,
                epithermal: 2,
                fast: 3,
            },
        )
    }

    #[test]
    fn header_matches_expected_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resultados_parafina.csv");
        write_results_csv(&path, &[row(0.5, 1)]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("Ancho_(cm),Alto_(cm),Espesor_(cm),Detectados,Termicos,Epitermicos,Rapidos")
        );
        assert_eq!(lines.next(), Some("1.0,2.0,1.0,6,1,2,3"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn rows_read_back_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("r.csv");
        let rows = vec![row(0.5, 10), row(1.5, 0)];
        write_results_csv(&path, &rows).unwrap();
        assert_eq!(read_results_csv(&path).unwrap(), rows);
    }

    #[test]
    fn empty_sweep_writes_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r.csv");
        write_results_csv(&path, &[]).unwrap();
        assert!(read_results_csv(&path).unwrap().is_empty());
        assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 1);
    }
}
