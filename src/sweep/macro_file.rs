/// Geant4 macro generation for one sweep point
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use super::config::{fmt_cm, round_cm, BeamConfig, GeometryPoint};
use crate::error::Result;

/// Macro text that sizes the block, places the gun just upstream of it and fires `events` primaries.
pub fn build_macro(point: &GeometryPoint, beam: &BeamConfig, events: u64) -> String {
    let mut m = String::new();
    // writing to a String cannot fail
    let _ = writeln!(m, "/control/verbose 2");
    let _ = writeln!(m, "/run/verbose 1");
    let _ = writeln!(m, "/event/verbose 0");
    let _ = writeln!(m, "/tracking/verbose 0");
    let _ = writeln!(m);
    let _ = writeln!(m, "/detector/setParaffinX {} cm", fmt_cm(point.x));
    let _ = writeln!(m, "/detector/setParaffinY {} cm", fmt_cm(point.y));
    let _ = writeln!(m, "/detector/setParaffinZ {} cm", fmt_cm(point.z));
    let _ = writeln!(m);
    let _ = writeln!(m, "/run/initialize");
    let _ = writeln!(m);
    let _ = writeln!(m, "# Beam");
    let _ = writeln!(m, "/gun/particle {}", beam.particle);
    let _ = writeln!(m, "/gun/energy {}", beam.energy);
    let _ = writeln!(
        m,
        "/gun/position 0 0 -{} cm",
        fmt_cm(round_cm(point.z + beam.source_offset_cm))
    );
    let [dx, dy, dz] = beam.direction;
    let _ = writeln!(m, "/gun/direction {} {} {}", dx, dy, dz);
    let _ = writeln!(m, "/gun/number {}", beam.number);
    let _ = writeln!(m);
    let _ = writeln!(m, "# Run");
    let _ = writeln!(m, "/run/beamOn {}", events);
    m
}

pub fn write_macro(path: &Path, text: &str) -> Result<()> {
    fs::write(path, text)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macro_sets_geometry_and_gun() {
        let point = GeometryPoint {
            x: 1.5,
            y: 2.0,
            z: 0.7,
        };
        let text = build_macro(&point, &BeamConfig::default(), 1_000_000);
        assert!(text.contains("/detector/setParaffinX 1.5 cm\n"));
        assert!(text.contains("/detector/setParaffinY 2.0 cm\n"));
        assert!(text.contains("/detector/setParaffinZ 0.7 cm\n"));
        // 0.7 + 0.1 without the float tail
        assert!(text.contains("/gun/position 0 0 -0.8 cm\n"));
        assert!(text.contains("/gun/particle neutron\n"));
        assert!(text.contains("/gun/energy 4.2 MeV\n"));
        assert!(text.contains("/gun/direction 0 0 1\n"));
        assert!(text.ends_with("/run/beamOn 1000000\n"));

        let init = text.find("/run/initialize").unwrap();
        let geometry = text.find("/detector/setParaffinZ").unwrap();
        let gun = text.find("/gun/particle").unwrap();
        assert!(geometry < init && init < gun);
    }

    #[test]
    fn macro_is_written_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auto.mac");
        write_macro(&path, "/run/beamOn 1\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "/run/beamOn 1\n");
    }
}
