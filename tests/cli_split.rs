use std::fs;
use std::process::Command;

use tempfile::tempdir;

const RESPONSES: &str = "CELL_LINE_NAME,DRUG_NAME,LN_IC50\n\
A,X,0.1\nA,Y,0.2\nB,X,0.3\nB,Y,0.4\nC,X,0.5\nC,Y,0.6\nD,X,0.7\nD,Y,0.8\nE,X,0.9\nE,Y,1.0\n";

#[test]
fn split_cli_writes_one_test_row_per_record() {
    let tmp = tempdir().expect("temporary directory");
    let responses_path = tmp.path().join("responses.csv");
    let config_path = tmp.path().join("cv.toml");
    let out_path = tmp.path().join("folds.tsv");
    fs::write(&responses_path, RESPONSES).expect("write responses");
    fs::write(&config_path, "n_cv_splits = 5\nvalidation_ratio = 0.25\n").expect("write config");

    let exe = env!("CARGO_BIN_EXE_dreval");
    let status = Command::new(exe)
        .args([
            "split",
            responses_path.to_str().expect("path str"),
            "--config",
            config_path.to_str().expect("path str"),
            "--random-state",
            "7",
            "--out",
            out_path.to_str().expect("path str"),
        ])
        .status()
        .expect("run dreval cli");
    assert!(status.success(), "CLI exited with status {status:?}");

    let written = fs::read_to_string(&out_path).expect("fold file");
    let mut lines = written.lines();
    assert_eq!(lines.next(), Some("fold\trole\tindex\tcell_line_id\tdrug_id"));

    let rows: Vec<Vec<&str>> = lines.map(|l| l.split('\t').collect()).collect();
    // Every fold lists all ten records once.
    assert_eq!(rows.len(), 5 * 10);
    let mut tested: Vec<usize> = rows
        .iter()
        .filter(|r| r[1] == "test")
        .map(|r| r[2].parse().expect("index"))
        .collect();
    tested.sort_unstable();
    assert_eq!(tested, (0..10).collect::<Vec<_>>());
    assert_eq!(rows.iter().filter(|r| r[1] == "validation").count(), 5 * 2);
}

#[test]
fn split_cli_rejects_unimplemented_modes() {
    let tmp = tempdir().expect("temporary directory");
    let responses_path = tmp.path().join("responses.csv");
    fs::write(&responses_path, RESPONSES).expect("write responses");

    let output = Command::new(env!("CARGO_BIN_EXE_dreval"))
        .args([
            "split",
            responses_path.to_str().expect("path str"),
            "--mode",
            "LCO",
        ])
        .output()
        .expect("run dreval cli");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not implemented"), "unexpected stderr: {stderr}");
}

#[test]
fn describe_cli_summarizes_the_response_table() {
    let tmp = tempdir().expect("temporary directory");
    let responses_path = tmp.path().join("responses.csv");
    fs::write(&responses_path, RESPONSES).expect("write responses");

    let output = Command::new(env!("CARGO_BIN_EXE_dreval"))
        .args(["describe", responses_path.to_str().expect("path str")])
        .output()
        .expect("run dreval cli");
    assert!(output.status.success(), "CLI exited with status {:?}", output.status);

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert!(lines.contains(&"Target type: IC50"), "unexpected stdout: {stdout}");
    assert!(lines.contains(&"Records: 10"), "unexpected stdout: {stdout}");
    assert!(lines.contains(&"Cell lines: 5"), "unexpected stdout: {stdout}");
    assert!(lines.contains(&"Drugs: 2"), "unexpected stdout: {stdout}");
    assert!(
        lines.contains(&"Response range: (0.100, 1.000), mean 0.550"),
        "unexpected stdout: {stdout}"
    );
}
