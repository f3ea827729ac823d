use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use rstest::rstest;

fn init_project() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    cargo_bin_cmd!("tickflow")
        .args(["init", dir.path().to_str().unwrap(), "--name", "fusion"])
        .assert()
        .success();
    dir
}

fn motor_values(path: &std::path::Path) -> Vec<f64> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .enumerate()
        .map(|(i, line)| {
            let (index, value) = line.split_once(", ").unwrap();
            assert_eq!(index, i.to_string());
            value.parse().unwrap()
        })
        .collect()
}

#[test]
fn test_init_and_run() {
    let dir = init_project();

    assert!(dir.path().join("tickflow.yaml").exists());
    assert!(dir.path().join("data/sensor_1.csv").exists());
    assert!(dir.path().join("data/sensor_2.csv").exists());
    assert!(dir.path().join("data/sensor_3.csv").exists());

    let output = cargo_bin_cmd!("tickflow")
        .args(["--config", dir.path().to_str().unwrap(), "run", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["cycles_completed"], 10);
    assert_eq!(report["stopped_at_cycle"], 10);
    assert_eq!(report["stop_reason"]["reason"], "exhausted");
    assert_eq!(report["stop_reason"]["connector"], "c1");
    assert_eq!(report["connectors"].as_array().unwrap().len(), 11);

    let out = dir.path().join("out");
    let motor_a = motor_values(&out.join("motorA.csv"));
    let motor_b = motor_values(&out.join("motorB.csv"));
    assert_eq!(motor_a.len(), 10);
    assert_eq!(motor_b.len(), 10);
    for (a, b) in motor_a.iter().zip(&motor_b) {
        assert!((-1.0..=1.0).contains(a), "{a} out of range");
        assert_eq!(*b, -a);
    }

    let c1 = std::fs::read_to_string(out.join("c1.txt")).unwrap();
    assert_eq!(c1.lines().next(), Some("0,4"));
    assert_eq!(c1.lines().count(), 10);

    let diagnostics = std::fs::read_to_string(out.join("run.log")).unwrap();
    assert!(diagnostics.contains("Program Started"));
    assert!(diagnostics.contains("Program Ended"));
}

#[test]
fn test_run_with_cycle_limit() {
    let dir = init_project();

    let output = cargo_bin_cmd!("tickflow")
        .args([
            "--config",
            dir.path().to_str().unwrap(),
            "run",
            "--max-cycles",
            "3",
            "--json",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["cycles_completed"], 3);
    assert_eq!(report["stop_reason"]["reason"], "cycle_limit");
    assert_eq!(motor_values(&dir.path().join("out/motorA.csv")).len(), 3);
}

#[test]
fn test_validate_and_show() {
    let dir = init_project();
    let config = dir.path().join("tickflow.yaml");

    cargo_bin_cmd!("tickflow")
        .args(["--config", config.to_str().unwrap(), "validate"])
        .assert()
        .success();
    assert!(!dir.path().join("out").exists(), "validate must not create outputs");

    cargo_bin_cmd!("tickflow")
        .args(["--config", config.to_str().unwrap(), "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Pipeline: fusion"))
        .stdout(predicate::str::contains("SensorFusion"))
        .stdout(predicate::str::contains("MotorA Port 1, MotorB Port 1"));
}

#[rstest]
#[case::unbound_port("{ name: c1, from: Scale, to: [Out] }", "Scale Port 1")]
#[case::unknown_node(
    "{ name: c1, from: Nope, to: [Scale.1] }",
    "unknown node 'Nope'"
)]
#[case::port_out_of_range(
    "{ name: c1, from: Scale, to: [Scale.2] }",
    "port 2 does not exist"
)]
#[case::self_loop("{ name: c1, from: Scale, to: [Scale.1] }", "dependency cycle")]
fn test_validate_reports_wiring_errors(#[case] connector: &str, #[case] expected: &str) {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("tickflow.yaml"),
        format!(
            r#"
name: broken
nodes:
  - {{ name: Scale, type: transform, functor: {{ kind: doubler }} }}
  - {{ name: Out, type: console_sink }}
connectors:
  - {connector}
"#
        ),
    )
    .unwrap();

    cargo_bin_cmd!("tickflow")
        .args(["--config", dir.path().to_str().unwrap(), "validate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(expected));
}

#[test]
fn test_missing_config() {
    let dir = tempfile::tempdir().unwrap();
    cargo_bin_cmd!("tickflow")
        .args(["--config", dir.path().to_str().unwrap(), "run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}

#[test]
fn test_init_refuses_existing_project() {
    let dir = init_project();
    cargo_bin_cmd!("tickflow")
        .args(["init", dir.path().to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already contains"));
}
