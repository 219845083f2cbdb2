//! End-to-end runs of the command-line pipeline over gcode written to a temp dir.

#![allow(clippy::unwrap_used)]

use clap::Parser;
use multipart_print::cli::Cli;
use multipart_print::error::SkipReason;
use multipart_print::extractor::extract_estimates;
use multipart_print::{aggregate::aggregate, run};
use serde_json::Value;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write_gcode(dir: &Path, name: &str, mm: &str, cost: &str, time: &str) -> PathBuf {
    let path = dir.join(name);
    let contents = format!(
        "; generated by Slic3r Prusa Edition 1.42.0-beta2\n\
         G21 ; set units to millimeters\n\
         G90 ; use absolute coordinates\n\
         G1 Z0.250 F7800.000\n\
         M107\n\
         ; filament used = {mm}mm (2.41cm3)\n\
         ; filament used = 2.99\n\
         ; filament cost = {cost}\n\
         ; total layers count = 57\n\
         ; estimated printing time (normal mode) = {time}\n\
         ; estimated printing time (silent mode) = {time}\n\
         \n\
         ; avoid_crossing_perimeters = 0\n"
    );
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn mixed_batch_yields_one_record_per_good_file() {
    let dir = TempDir::new().unwrap();
    let good = write_gcode(dir.path(), "good.gcode", "1000.00", "1.111", "1d 1s");
    let missing = dir.path().join("missing.gcode");
    let malformed = dir.path().join("malformed.gcode");
    fs::write(&malformed, "G28\nG1 X1 Y1\n").unwrap();

    let extraction = extract_estimates([&missing, &good, &malformed]).unwrap();

    assert_eq!(extraction.records.len(), 1);
    assert_eq!(extraction.records[0].source, good);
    assert_eq!(extraction.skipped.len(), 2);
    assert!(matches!(extraction.skipped[0], SkipReason::NotFound(_)));
    assert!(matches!(extraction.skipped[1], SkipReason::MissingEstimateBlock(_)));

    let total = aggregate(&extraction.records);
    assert_eq!(total.record_count, 1);
    assert_eq!(total.filament_used_m, 1.0);
    assert_eq!(total.filament_cost, 1.11);
    assert_eq!(total.print_time.num_seconds(), 86_401);
}

#[test]
fn run_writes_json_summary_for_a_folder() {
    let dir = TempDir::new().unwrap();
    let parts = dir.path().join("parts");
    fs::create_dir(&parts).unwrap();
    write_gcode(&parts, "base-0.2mm.gcode", "1000.00", "1.111", "2h 3m 10s");
    write_gcode(&parts, "lid-0.2mm.gcode", "2500.00", "2.222", "50s");
    fs::write(parts.join("broken.gcode"), "; filament used = 1.00mm\n").unwrap();
    fs::write(parts.join("lid.stl"), "solid lid\nendsolid lid\n").unwrap();
    let output = dir.path().join("out").join("summary.json");

    let cli = Cli::try_parse_from([
        OsStr::new("multipart-print"),
        parts.as_os_str(),
        OsStr::new("--format"),
        OsStr::new("json"),
        OsStr::new("--output"),
        output.as_os_str(),
    ])
    .unwrap();
    run(&cli).unwrap();

    let json: Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    let records = json["records"].as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert!(records[0]["file"].as_str().unwrap().ends_with("base-0.2mm.gcode"));
    assert_eq!(records[0]["print_time"], "2h 3m 10s");
    assert_eq!(json["skipped"].as_array().unwrap().len(), 1);
    assert!(json["skipped"][0]["file"]
        .as_str()
        .unwrap()
        .ends_with("broken.gcode"));
    assert_eq!(json["aggregate"]["files"], 2);
    assert_eq!(json["aggregate"]["filament_used_m"], 3.5);
    assert_eq!(json["aggregate"]["filament_cost"], 3.33);
    assert_eq!(json["aggregate"]["print_time_seconds"], 7_440);
}

#[test]
fn run_rejects_missing_folder() {
    let cli = Cli::try_parse_from(["multipart-print", "/nonexistent/folder"]).unwrap();
    assert!(run(&cli).is_err());
}

#[test]
fn run_with_slice_requires_the_slicer_binary() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("part.stl"), "solid part\nendsolid part\n").unwrap();
    let missing_binary = dir.path().join("bin").join("slic3r");

    let cli = Cli::try_parse_from([
        OsStr::new("multipart-print"),
        dir.path().as_os_str(),
        OsStr::new("--slice"),
        OsStr::new("--slicer"),
        missing_binary.as_os_str(),
    ])
    .unwrap();
    let err = run(&cli).unwrap_err();
    assert!(err.to_string().contains("Slicer binary not found"));
}

/// A stand-in for slic3r: writes a fixed estimate block to the `--output` path,
/// or fails for models whose name contains "broken".
#[cfg(unix)]
#[test]
fn slices_models_with_external_binary_and_totals_them() {
    use multipart_print::slicer::{SliceOptions, Slicer, SlicerConfig};
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let binary = dir.path().join("fake-slic3r");
    fs::write(
        &binary,
        "#!/bin/sh\n\
         out=''\n\
         while [ \"$#\" -gt 0 ]; do\n\
         case \"$1\" in\n\
         *broken*) echo 'mesh is not manifold' >&2; exit 3 ;;\n\
         --output) out=\"$2\" ;;\n\
         esac\n\
         shift\n\
         done\n\
         printf '; filament used = 1250.00mm (3.01cm3)\\n; filament used = 3.73\\n; filament cost = 0.09\\n; total layers count = 40\\n; estimated printing time (normal mode) = 41m 7s\\n' > \"$out\"\n",
    )
    .unwrap();
    fs::set_permissions(&binary, fs::Permissions::from_mode(0o755)).unwrap();
    let profile = dir.path().join("profile.ini");
    fs::write(&profile, "layer_height = 0.2\n").unwrap();

    let good = dir.path().join("bracket.stl");
    let broken = dir.path().join("broken.stl");
    fs::write(&good, "solid bracket\nendsolid bracket\n").unwrap();
    fs::write(&broken, "solid broken\nendsolid broken\n").unwrap();

    let config = SlicerConfig { binary, profile };
    config.validate().unwrap();
    let slicer = Slicer::new(config, SliceOptions::new(0.2, true).unwrap());

    let produced = slicer.slice_all(&[&good, &broken]);
    assert_eq!(produced, vec![dir.path().join("bracket-0.2mm.gcode")]);

    let extraction = extract_estimates(&produced).unwrap();
    assert_eq!(extraction.records.len(), 1);
    let record = &extraction.records[0];
    assert_eq!(record.filament_used_m, 1.25);
    assert_eq!(record.print_time.to_string(), "41m 7s");
}
