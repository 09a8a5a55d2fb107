// ntuple/root.rs
// ROOT TTree reader, compiled only with the `root` feature

use oxyroot::{Named, RootFile};
use std::path::Path;

use super::NtupleFile;
use crate::error::{AnalysisError, Result};

pub struct RootNtupleFile {
    file: RootFile,
    /// Names of the TTree keys only; histograms and other objects are left out
    trees: Vec<String>,
}

fn root_err(e: impl std::fmt::Display) -> AnalysisError {
    AnalysisError::Parse(e.to_string())
}

impl RootNtupleFile {
    pub fn open(path: &Path) -> Result<Self> {
        let file = RootFile::open(path).map_err(root_err)?;
        let trees = file
            .keys()
            .iter()
            .filter(|k| k.class_name() == "TTree")
            .map(|k| k.name().to_string())
            .collect();
        Ok(Self { file, trees })
    }
}

impl NtupleFile for RootNtupleFile {
    fn table_names(&self) -> Vec<String> {
        self.trees.clone()
    }

    fn columns(&mut self, table: &str) -> Result<Vec<String>> {
        let tree = self
            .file
            .get_tree(super::strip_cycle(table))
            .map_err(root_err)?;
        let names: Vec<String> = tree.branches().map(|b| b.name().to_string()).collect();
        Ok(names)
    }

    fn read_column(&mut self, table: &str, column: &str) -> Result<Vec<f64>> {
        let tree = self
            .file
            .get_tree(super::strip_cycle(table))
            .map_err(root_err)?;
        let branch = tree
            .branch(column)
            .ok_or_else(|| AnalysisError::MissingColumn(vec![column.to_string()]))?;

        // Geant4 writes D columns as double and I columns (step counts) as int
        let values: Vec<f64> = match branch.as_iter::<f64>() {
            Ok(it) => it.collect(),
            Err(_) => branch
                .as_iter::<i32>()
                .map_err(root_err)?
                .map(f64::from)
                .collect(),
        };
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxyroot::WriterTree;

    fn write_tree(path: &Path) {
        let mut file = RootFile::create(path).unwrap();
        let mut tree = WriterTree::new("NeutronTracks");
        tree.new_branch("KineticEnergy_eV", vec![0.01f64, 0.5, 2.0e6].into_iter());
        tree.new_branch("NumSteps", vec![12i32, 7, 1].into_iter());
        tree.write(&mut file).unwrap();
        file.close().unwrap();
    }

    #[test]
    fn reads_double_and_int_branches() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("NeutronData.root");
        write_tree(&path);

        let mut f = RootNtupleFile::open(&path).unwrap();
        assert_eq!(f.table_names(), vec!["NeutronTracks"]);

        let mut cols = f.columns("NeutronTracks").unwrap();
        cols.sort();
        assert_eq!(cols, vec!["KineticEnergy_eV", "NumSteps"]);

        assert_eq!(
            f.read_column("NeutronTracks", "KineticEnergy_eV").unwrap(),
            vec![0.01, 0.5, 2.0e6]
        );
        assert_eq!(
            f.read_column("NeutronTracks", "NumSteps").unwrap(),
            vec![12.0, 7.0, 1.0]
        );
    }

    #[test]
    fn absent_branch_is_missing_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("NeutronData.root");
        write_tree(&path);

        let mut f = RootNtupleFile::open(&path).unwrap();
        assert!(matches!(
            f.read_column("NeutronTracks", "DirZ"),
            Err(AnalysisError::MissingColumn(_))
        ));
    }

    #[test]
    fn loader_reads_root_container() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("NeutronData.root");
        write_tree(&path);

        let loaded = crate::loader::load_records(
            &path,
            "NeutronTracks",
            crate::loader::LoadMode::Lenient,
        )
        .unwrap();
        assert_eq!(loaded.records.len(), 3);
        assert!(!loaded.angular_present);
    }
}
