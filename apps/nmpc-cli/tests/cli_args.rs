use std::path::PathBuf;
use std::process::Command;

fn cli() -> Command {
    Command::new(env!("CARGO_BIN_EXE_nmpc-cli"))
}

fn configs_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../configs")
}

#[test]
fn wrong_argument_count_prints_usage() {
    let output = cli().arg("only_one.yaml").output().unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Usage"), "stderr: {stderr}");
}

#[test]
fn unknown_model_is_rejected() {
    let dir = configs_dir().join("dipc");
    let output = cli()
        .arg(dir.join("nmpc.yaml"))
        .arg(dir.join("model.yaml"))
        .arg(dir.join("model.yaml"))
        .args(["--model", "tank"])
        .output()
        .unwrap();
    assert!(!output.status.success());
}

#[test]
fn missing_model_parameter_exits_with_failure() {
    let dir = configs_dir();
    let out = std::env::temp_dir().join("nmpc_cli_missing_g");
    let output = cli()
        .arg(dir.join("dipc/nmpc.yaml"))
        .arg(dir.join("invalid/dipc_model_missing_g.yaml"))
        .arg(dir.join("dipc/model.yaml"))
        .arg("--output-dir")
        .arg(&out)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("model.g"), "stderr: {stderr}");
    assert!(!String::from_utf8_lossy(&output.stdout).contains("Closed loop finished"));
}
