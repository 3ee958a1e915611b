use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const ALPHA_TABLE: &str = "Incident projectile: 4He\n\
Material composition:\n\
13 27Al 1\n\
---------------------------------\n\
theta_min: 0 theta_max: 60 theta_step: 20\n\
E_final(MeV) E_loss(MeV)\n\
begin_theta 0\n1.0 0.9\n5.0 0.5\n10.0 0.3\nend_theta\n\
begin_theta 20\n1.0 1.0\n5.0 0.55\n10.0 0.33\nend_theta\n\
begin_theta 40\n2.0 0.8\nend_theta\n\
begin_theta 60\nend_theta\n";

const CONFIG: &str = r#"{
    "target": { "thicknessUgCm2": 60.0, "elements": [ { "z": 6, "a": 12, "stoich": 1 } ] },
    "focalPlane": { "fieldKg": 7.8, "angleDeg": 20.0, "calibration": [80.0, 0.01] }
}"#;

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sabre-recon"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("binary should run")
}

fn stdout_json(output: &Output) -> Value {
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

fn write_fixture(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).expect("fixture should be written");
    path
}

fn path_arg(path: &Path) -> &str {
    path.to_str().expect("temp paths are UTF-8")
}

#[test]
fn table_info_reports_key_and_bins() {
    let temp = TempDir::new().expect("tempdir should be created");
    let table = write_fixture(temp.path(), "alpha_al.txt", ALPHA_TABLE);

    let summary = stdout_json(&run(&["table-info", path_arg(&table)]));
    assert_eq!(summary["kind"], "energy-loss");
    assert_eq!(summary["projectile"], "4He");
    assert_eq!(summary["material"], "27Al");
    assert_eq!(summary["thetaStepDeg"], 20.0);
    assert_eq!(summary["bins"], 4);
    assert_eq!(summary["fittedBins"], 2);

    let punch = stdout_json(&run(&["table-info", "--punch", path_arg(&table)]));
    assert_eq!(punch["kind"], "punch-through");
}

#[test]
fn missing_table_exits_with_io_code() {
    let temp = TempDir::new().expect("tempdir should be created");
    let missing = temp.path().join("absent.txt");

    let output = run(&["table-info", path_arg(&missing)]);
    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR: [IO.TABLE_READ]"), "stderr: {stderr}");
    assert!(stderr.contains("FATAL EXIT CODE: 3"));
}

#[test]
fn malformed_table_exits_with_input_code() {
    let temp = TempDir::new().expect("tempdir should be created");
    let broken = ALPHA_TABLE.replace("theta_step: 20", "theta_step: 10");
    let table = write_fixture(temp.path(), "broken.txt", &broken);

    let output = run(&["table-info", path_arg(&table)]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("[INPUT.TABLE_BIN_COUNT]"));
}

#[test]
fn target_loss_forward_and_reverse_bracket_the_energy() {
    let temp = TempDir::new().expect("tempdir should be created");
    let config = write_fixture(temp.path(), "recon.json", CONFIG);
    let common = [
        "target-loss",
        "--config",
        path_arg(&config),
        "--z",
        "2",
        "--a",
        "4",
        "--energy",
        "5.0",
        "--angle",
        "30",
    ];

    let forward = stdout_json(&run(&common));
    let forward_loss = forward["lossMev"].as_f64().expect("loss should be numeric");
    assert!(forward_loss > 0.0 && forward_loss < 0.5, "loss {forward_loss}");
    assert!((forward["otherEnergyMev"].as_f64().unwrap() - (5.0 - forward_loss)).abs() < 1.0e-12);
    assert_eq!(forward["depthFraction"], 1.0);

    let mut reverse_args = common.to_vec();
    reverse_args.push("--reverse");
    let reverse = stdout_json(&run(&reverse_args));
    let reverse_loss = reverse["lossMev"].as_f64().expect("loss should be numeric");
    // Above the Bragg peak the faster incoming particle loses slightly less.
    assert!(reverse_loss > 0.0 && reverse_loss < forward_loss);
    assert!((forward_loss - reverse_loss) < 0.1 * forward_loss);
    assert!((reverse["otherEnergyMev"].as_f64().unwrap() - (5.0 + reverse_loss)).abs() < 1.0e-12);

    let mut half_args = common.to_vec();
    half_args.extend(["--depth", "0.5"]);
    let half = stdout_json(&run(&half_args));
    assert!(half["lossMev"].as_f64().unwrap() < forward_loss);
}

#[test]
fn fp_excitation_prints_reconstruction_result() {
    let temp = TempDir::new().expect("tempdir should be created");
    let config = write_fixture(temp.path(), "recon.json", CONFIG);

    let report = stdout_json(&run(&[
        "fp-excitation",
        "--config",
        path_arg(&config),
        "--xavg=-25.0",
        "--beam-ke",
        "16.0",
        "--target",
        "6,12",
        "--projectile",
        "1,2",
        "--ejectile",
        "1,1",
    ]));
    assert_eq!(report["residual"]["z"], 6);
    assert_eq!(report["residual"]["a"], 13);
    let result = &report["result"];
    let excitation = result["excitation"].as_f64().expect("excitation should be numeric");
    assert!(excitation.is_finite() && excitation != -100.0);
    assert!(result["ejectThetaCm"].as_f64().unwrap() > 0.0);
    assert!(result["recoveredKe"].as_f64().unwrap() > 0.0);
}

#[test]
fn unknown_isotope_and_bad_arguments_exit_with_input_code() {
    let temp = TempDir::new().expect("tempdir should be created");
    let config = write_fixture(temp.path(), "recon.json", CONFIG);

    let output = run(&[
        "fp-excitation",
        "--config",
        path_arg(&config),
        "--xavg",
        "0",
        "--beam-ke",
        "16.0",
        "--target",
        "26,56",
        "--projectile",
        "1,2",
        "--ejectile",
        "1,1",
    ]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("[INPUT.UNKNOWN_ISOTOPE]"));

    let output = run(&["fp-excitation", "--target", "7,6"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("[INPUT.CLI_USAGE]"));

    let output = run(&[]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn missing_config_exits_with_io_code() {
    let temp = TempDir::new().expect("tempdir should be created");
    let missing = temp.path().join("none.json");

    let output = run(&[
        "target-loss",
        "--config",
        path_arg(&missing),
        "--z",
        "2",
        "--a",
        "4",
        "--energy",
        "5",
        "--angle",
        "0",
    ]);
    assert_eq!(output.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&output.stderr).contains("[IO.CONFIG_READ]"));
}

#[test]
fn help_exits_cleanly() {
    let output = run(&["--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("table-info"));
    assert!(stdout.contains("fp-excitation"));
}
