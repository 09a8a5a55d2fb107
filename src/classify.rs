// classify.rs
// Energy-band classification of detected neutrons

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::{EPITHERMAL_MAX_EV, THERMAL_MAX_EV};
use crate::error::{AnalysisError, Result};
use crate::loader::{Record, RecordSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnergyBand {
    Thermal,
    Epithermal,
    Fast,
}

impl fmt::Display for EnergyBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EnergyBand::Thermal => "thermal",
            EnergyBand::Epithermal => "epithermal",
            EnergyBand::Fast => "fast",
        };
        f.write_str(name)
    }
}

/// Upper band edges in eV. Bands are half-open: thermal `[0, thermal_max)`,
/// epithermal `[thermal_max, epithermal_max)`, fast `[epithermal_max, inf)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub thermal_max_ev: f64,
    pub epithermal_max_ev: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            thermal_max_ev: THERMAL_MAX_EV,
            epithermal_max_ev: EPITHERMAL_MAX_EV,
        }
    }
}

impl Thresholds {
    pub fn new(thermal_max_ev: f64, epithermal_max_ev: f64) -> Result<Self> {
        let t = Self {
            thermal_max_ev,
            epithermal_max_ev,
        };
        t.validate()?;
        Ok(t)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.thermal_max_ev.is_finite() && self.epithermal_max_ev.is_finite()) {
            return Err(AnalysisError::InvalidConfig(
                "energy thresholds must be finite".into(),
            ));
        }
        if self.thermal_max_ev <= 0.0 || self.thermal_max_ev >= self.epithermal_max_ev {
            return Err(AnalysisError::InvalidConfig(format!(
                "need 0 < thermal_max_ev ({}) < epithermal_max_ev ({})",
                self.thermal_max_ev, self.epithermal_max_ev
            )));
        }
        Ok(())
    }

    /// Band of a single kinetic energy. Anything below the thermal edge
    /// (including nonsensical negative values) counts as thermal so the
    /// three bands always cover every record.
    pub fn classify(&self, energy_ev: f64) -> EnergyBand {
        if energy_ev < self.thermal_max_ev {
            EnergyBand::Thermal
        } else if energy_ev < self.epithermal_max_ev {
            EnergyBand::Epithermal
        } else {
            EnergyBand::Fast
        }
    }
}

/// Band counts only; what the sweep driver keeps per geometry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandCounts {
    pub thermal: usize,
    pub epithermal: usize,
    pub fast: usize,
}

impl BandCounts {
    pub fn tally<I>(energies: I, thresholds: &Thresholds) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let mut counts = Self::default();
        for e in energies {
            match thresholds.classify(e) {
                EnergyBand::Thermal => counts.thermal += 1,
                EnergyBand::Epithermal => counts.epithermal += 1,
                EnergyBand::Fast => counts.fast += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.thermal + self.epithermal + self.fast
    }
}

/// Three disjoint subsets of a record set, built by copying; the input is never touched.
#[derive(Debug, Clone)]
pub struct BandPartition {
    pub thermal: RecordSet,
    pub epithermal: RecordSet,
    pub fast: RecordSet,
}

impl BandPartition {
    pub fn band(&self, band: EnergyBand) -> &RecordSet {
        match band {
            EnergyBand::Thermal => &self.thermal,
            EnergyBand::Epithermal => &self.epithermal,
            EnergyBand::Fast => &self.fast,
        }
    }

    pub fn counts(&self) -> BandCounts {
        BandCounts {
            thermal: self.thermal.len(),
            epithermal: self.epithermal.len(),
            fast: self.fast.len(),
        }
    }
}

pub fn partition(records: &RecordSet, thresholds: &Thresholds) -> BandPartition {
    let mut thermal: Vec<Record> = Vec::new();
    let mut epithermal: Vec<Record> = Vec::new();
    let mut fast: Vec<Record> = Vec::new();

    for r in records.iter() {
        match thresholds.classify(r.kinetic_energy_ev) {
            EnergyBand::Thermal => thermal.push(r.clone()),
            EnergyBand::Epithermal => epithermal.push(r.clone()),
            EnergyBand::Fast => fast.push(r.clone()),
        }
    }

    BandPartition {
        thermal: records.with_records(thermal),
        epithermal: records.with_records(epithermal),
        fast: records.with_records(fast),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::test_records;

    #[test]
    fn band_edges_are_half_open() {
        let t = Thresholds::default();
        assert_eq!(t.classify(0.0), EnergyBand::Thermal);
        assert_eq!(t.classify(0.0249), EnergyBand::Thermal);
        assert_eq!(t.classify(0.025), EnergyBand::Epithermal);
        assert_eq!(t.classify(0.999), EnergyBand::Epithermal);
        assert_eq!(t.classify(1.0), EnergyBand::Fast);
        assert_eq!(t.classify(4.2e6), EnergyBand::Fast);
    }

    #[test]
    fn three_record_scenario_one_per_band() {
        let records = test_records(&[0.01, 0.5, 2.0]);
        let p = partition(&records, &Thresholds::default());
        assert_eq!(p.counts(), BandCounts { thermal: 1, epithermal: 1, fast: 1 });
        assert_eq!(p.thermal.records()[0].kinetic_energy_ev, 0.01);
        assert_eq!(p.epithermal.records()[0].kinetic_energy_ev, 0.5);
        assert_eq!(p.fast.records()[0].kinetic_energy_ev, 2.0);
    }

    #[test]
    fn random_energies_are_partitioned_exactly() {
        fastrand::seed(7);
        let thresholds = Thresholds::default();
        let energies: Vec<f64> = (0..5000)
            .map(|_| 10f64.powf(fastrand::f64() * 10.0 - 4.0))
            .collect();
        let records = test_records(&energies);
        let p = partition(&records, &thresholds);

        assert_eq!(p.counts().total(), records.len());
        assert_eq!(p.counts(), BandCounts::tally(energies.iter().copied(), &thresholds));
        for band in [EnergyBand::Thermal, EnergyBand::Epithermal, EnergyBand::Fast] {
            assert!(p
                .band(band)
                .iter()
                .all(|r| thresholds.classify(r.kinetic_energy_ev) == band));
        }
        // input untouched
        assert_eq!(records.len(), 5000);
    }

    #[test]
    fn negative_energy_lands_in_thermal() {
        let counts = BandCounts::tally([-1.0], &Thresholds::default());
        assert_eq!(counts.thermal, 1);
    }

    #[test]
    fn new_rejects_bad_edges() {
        assert!(Thresholds::new(0.025, 1.0).is_ok());
        assert!(Thresholds::new(1.0, 0.5).is_err());
        assert!(Thresholds::new(f64::NAN, 1.0).is_err());
        assert!(Thresholds::new(0.0, 1.0).is_err());
    }
}
