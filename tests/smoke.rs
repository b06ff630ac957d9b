use assert_cmd::Command;

#[test]
fn cli_help_runs() {
    let mut cmd = Command::cargo_bin("policyiq").expect("binary exists");
    cmd.arg("--help").assert().success();
}

#[test]
fn analyze_help_lists_the_law_flag() {
    let mut cmd = Command::cargo_bin("policyiq").expect("binary exists");
    let out = cmd.args(["analyze", "--help"]).assert().success();
    let stdout = String::from_utf8_lossy(&out.get_output().stdout).to_string();
    assert!(stdout.contains("--law"));
}
