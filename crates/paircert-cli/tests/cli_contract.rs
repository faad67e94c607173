//! Exit-code and stream contract tests against the built binary.
//!
//! Validation paths must fail with exit 2 before the external generator is
//! ever touched, so none of these tests needs a PICT install unless they
//! stage their own fake one.

use std::fs;
use std::process::Command;

fn paircert() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_paircert"));
    // Keep the host environment from leaking a real generator in.
    cmd.env_remove("PAIRCERT_PICT");
    cmd
}

fn write_model(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("model.pict");
    fs::write(&path, "A: a1, a2\nB: b1, b2\n").expect("write model");
    path
}

#[test]
fn help_advertises_the_command_set() {
    let output = paircert().arg("--help").output().expect("run --help");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["generate", "verify", "doctor", "wizard", "version", "licenses"] {
        assert!(stdout.contains(command), "help should mention `{command}`");
    }
}

#[test]
fn version_subcommand_prints_the_package_version() {
    let output = paircert().arg("version").output().expect("run version");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("paircert "));
}

#[test]
fn licenses_mention_pict() {
    let output = paircert().arg("licenses").output().expect("run licenses");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("PICT"));
}

#[test]
fn zero_tries_is_a_validation_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let model = write_model(dir.path());
    let output = paircert()
        .args(["generate", "--model"])
        .arg(&model)
        .args(["--tries", "0"])
        .output()
        .expect("run generate");
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn tries_above_max_tries_is_a_validation_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let model = write_model(dir.path());
    let output = paircert()
        .args(["generate", "--model"])
        .arg(&model)
        .args(["--tries", "10", "--max-tries", "5"])
        .output()
        .expect("run generate");
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn strength_one_is_a_validation_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let model = write_model(dir.path());
    let output = paircert()
        .args(["generate", "--model"])
        .arg(&model)
        .args(["--strength", "1"])
        .output()
        .expect("run generate");
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn nonpositive_timeouts_are_validation_errors() {
    let dir = tempfile::tempdir().expect("tempdir");
    let model = write_model(dir.path());
    for flag in ["--pict-timeout-sec", "--total-timeout-sec"] {
        let output = paircert()
            .args(["generate", "--model"])
            .arg(&model)
            .args([flag, "0"])
            .output()
            .expect("run generate");
        assert_eq!(output.status.code(), Some(2), "{flag}=0 should exit 2");
    }
}

#[test]
fn require_verified_with_no_verify_is_contradictory() {
    let dir = tempfile::tempdir().expect("tempdir");
    let model = write_model(dir.path());
    let output = paircert()
        .args(["generate", "--model"])
        .arg(&model)
        .args(["--no-verify", "--require-verified"])
        .output()
        .expect("run generate");
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn missing_model_file_is_a_validation_error() {
    let output = paircert()
        .args(["generate", "--model", "definitely-not-here.pict"])
        .output()
        .expect("run generate");
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn non_utf8_model_is_a_validation_error_not_a_crash() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("model.pict");
    fs::write(&path, [0x41u8, 0xff, 0xfe, 0x0a]).expect("write bytes");
    let output = paircert()
        .args(["generate", "--model"])
        .arg(&path)
        .output()
        .expect("run generate");
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("UTF-8"), "stderr: {stderr}");
    assert!(!stderr.contains("panicked"), "stderr: {stderr}");
}

#[test]
fn malformed_model_reports_the_line_number() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("model.pict");
    fs::write(&path, "A: a1, a2\nbroken line\n").expect("write model");
    let output = paircert()
        .args(["generate", "--model"])
        .arg(&path)
        .output()
        .expect("run generate");
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("line 2"), "stderr: {stderr}");
}

#[test]
fn dry_run_plans_seeds_without_a_generator() {
    let dir = tempfile::tempdir().expect("tempdir");
    let model = write_model(dir.path());
    let output = paircert()
        .args(["generate", "--model"])
        .arg(&model)
        .args(["--dry-run", "--deterministic", "--seed", "5", "--tries", "3"])
        .output()
        .expect("run generate");
    assert_eq!(output.status.code(), Some(0));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("5 through 7"), "stderr: {stderr}");
    // The plan is diagnostics, not an artifact.
    assert!(output.stdout.is_empty());
}

#[test]
fn verify_accepts_a_complete_csv_suite() {
    let dir = tempfile::tempdir().expect("tempdir");
    let model = write_model(dir.path());
    let cases = dir.path().join("cases.csv");
    fs::write(&cases, "A,B\na1,b1\na1,b2\na2,b1\na2,b2\n").expect("write cases");
    let output = paircert()
        .args(["verify", "--model"])
        .arg(&model)
        .arg("--cases")
        .arg(&cases)
        .output()
        .expect("run verify");
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn verify_reports_missing_pairs_with_exit_four() {
    let dir = tempfile::tempdir().expect("tempdir");
    let model = write_model(dir.path());
    let cases = dir.path().join("cases.csv");
    fs::write(&cases, "A,B\na1,b1\na1,b2\na2,b1\n").expect("write cases");
    let output = paircert()
        .args(["verify", "--model"])
        .arg(&model)
        .arg("--cases")
        .arg(&cases)
        .output()
        .expect("run verify");
    assert_eq!(output.status.code(), Some(4));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("(A: a2, B: b2)"), "stderr: {stderr}");
}

#[test]
fn verify_accepts_the_structured_json_shape() {
    let dir = tempfile::tempdir().expect("tempdir");
    let model = write_model(dir.path());
    let cases = dir.path().join("cases.json");
    fs::write(
        &cases,
        r#"{"metadata": {"n": 4}, "test_cases": [
            {"A": "a1", "B": "b1"},
            {"A": "a1", "B": "b2"},
            {"A": "a2", "B": "b1"},
            {"A": "a2", "B": "b2"}
        ]}"#,
    )
    .expect("write cases");
    let output = paircert()
        .args(["verify", "--model"])
        .arg(&model)
        .arg("--cases")
        .arg(&cases)
        .output()
        .expect("run verify");
    assert_eq!(output.status.code(), Some(0));
}

#[cfg(unix)]
mod with_fake_generator {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    /// Stage a stub generator that prints a fixed full 2x2 suite.
    fn stage_fake_pict(dir: &Path) -> PathBuf {
        let path = dir.join("pict");
        fs::write(
            &path,
            "#!/bin/sh\nprintf 'A\\tB\\na1\\tb1\\na1\\tb2\\na2\\tb1\\na2\\tb2\\n'\n",
        )
        .expect("write fake pict");
        let mut perms = fs::metadata(&path).expect("stat").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).expect("chmod");
        path
    }

    #[test]
    fn json_output_carries_the_metadata_contract() {
        let dir = tempfile::tempdir().expect("tempdir");
        let model = write_model(dir.path());
        let pict = stage_fake_pict(dir.path());
        let output = paircert()
            .args(["generate", "--model"])
            .arg(&model)
            .arg("--pict-path")
            .arg(&pict)
            .args(["--format", "json", "--deterministic", "--seed", "9"])
            .output()
            .expect("run generate");
        assert_eq!(output.status.code(), Some(0), "stderr: {}", String::from_utf8_lossy(&output.stderr));

        let value: serde_json::Value =
            serde_json::from_slice(&output.stdout).expect("stdout is pure JSON");
        let metadata = &value["metadata"];
        assert_eq!(metadata["n"], 4);
        assert_eq!(metadata["lb"], 4);
        assert_eq!(metadata["verified"], true);
        assert_eq!(metadata["seed"], 9);
        assert_eq!(metadata["provably_minimum"], true);
        assert_eq!(metadata["early_stopped"], true);
        assert_eq!(value["test_cases"].as_array().map(Vec::len), Some(4));
    }

    #[test]
    fn identical_deterministic_runs_are_byte_identical() {
        let dir = tempfile::tempdir().expect("tempdir");
        let model = write_model(dir.path());
        let pict = stage_fake_pict(dir.path());
        let run = || {
            paircert()
                .args(["generate", "--model"])
                .arg(&model)
                .arg("--pict-path")
                .arg(&pict)
                .args(["--format", "json", "--deterministic", "--seed", "123"])
                .output()
                .expect("run generate")
        };
        let first = run();
        let second = run();
        assert_eq!(first.status.code(), Some(0));
        assert_eq!(first.stdout, second.stdout);
    }

    #[test]
    fn no_verify_marks_the_output_unverified() {
        let dir = tempfile::tempdir().expect("tempdir");
        let model = write_model(dir.path());
        let pict = stage_fake_pict(dir.path());
        let output = paircert()
            .args(["generate", "--model"])
            .arg(&model)
            .arg("--pict-path")
            .arg(&pict)
            .args(["--format", "json", "--no-verify"])
            .output()
            .expect("run generate");
        assert_eq!(output.status.code(), Some(0));
        let value: serde_json::Value =
            serde_json::from_slice(&output.stdout).expect("stdout is pure JSON");
        assert_eq!(value["metadata"]["verified"], false);
        assert_eq!(value["metadata"]["provably_minimum"], false);
    }

    #[test]
    fn doctor_passes_against_the_fake_generator() {
        let dir = tempfile::tempdir().expect("tempdir");
        // Doctor's canary model uses safe names a/b.
        let pict = dir.path().join("pict");
        fs::write(
            &pict,
            "#!/bin/sh\nprintf 'a\\tb\\nA1\\tB1\\nA1\\tB2\\nA2\\tB1\\nA2\\tB2\\n'\n",
        )
        .expect("write fake pict");
        let mut perms = fs::metadata(&pict).expect("stat").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&pict, perms).expect("chmod");

        let output = paircert()
            .arg("doctor")
            .arg("--pict-path")
            .arg(&pict)
            .output()
            .expect("run doctor");
        assert_eq!(output.status.code(), Some(0), "stderr: {}", String::from_utf8_lossy(&output.stderr));
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("Doctor checks passed."));
    }

    #[test]
    fn slow_generator_times_out_with_exit_five() {
        let dir = tempfile::tempdir().expect("tempdir");
        let model = write_model(dir.path());
        let pict = dir.path().join("pict");
        fs::write(&pict, "#!/bin/sh\nsleep 30\n").expect("write fake pict");
        let mut perms = fs::metadata(&pict).expect("stat").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&pict, perms).expect("chmod");

        let output = paircert()
            .args(["generate", "--model"])
            .arg(&model)
            .arg("--pict-path")
            .arg(&pict)
            .args([
                "--pict-timeout-sec",
                "0.2",
                "--total-timeout-sec",
                "1",
                "--tries",
                "2",
            ])
            .output()
            .expect("run generate");
        assert_eq!(output.status.code(), Some(5));
    }
}
