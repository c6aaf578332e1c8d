use regex::Regex;
use std::fs;
use std::io::Write;
use std::process::{Command, Output};

fn scatterforge(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_scatterforge"))
        .args(args)
        .output()
        .expect("Failed to execute binary")
}

#[test]
fn test_search_prints_json_report() {
    let out = scatterforge(&[
        "search", "-f", "sphere", "-d", "2", "--max-iter", "15", "-S", "3", "--json",
    ]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    let report: serde_json::Value = serde_json::from_slice(&out.stdout).expect("stdout is JSON");
    assert_eq!(report["seed"], 3);
    assert_eq!(report["best"]["params"].as_array().unwrap().len(), 2);
    assert!(report["best"]["cost"].as_f64().unwrap() < 1.0);
}

#[test]
fn test_search_table_output() {
    let out = scatterforge(&[
        "search", "-f", "quadratic-bowl", "--max-iter", "10", "--seed", "1",
    ]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    let best = Regex::new(r"Best cost.*\d\.\d{6}e-?\d+").unwrap();
    assert!(best.is_match(&stdout), "stdout:\n{}", stdout);
    assert!(stdout.contains("quadratic-bowl"));
}

#[test]
fn test_stats_log_and_saved_state_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("stats.tsv");
    let state = dir.path().join("state");

    let out = scatterforge(&[
        "search",
        "-f",
        "rosenbrock",
        "-d",
        "3",
        "--max-iter",
        "20",
        "--perform-stop-criteria",
        "false",
        "--report-interval",
        "5",
        "-S",
        "8",
        "--stats-log",
        log.to_str().unwrap(),
        "--save-state",
        state.to_str().unwrap(),
    ]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    let text = fs::read_to_string(&log).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 1 + 4 + 1);
    assert!(lines[0].starts_with("Iterations\t"));
    assert!(lines[4].starts_with("20\t"));
    assert_eq!(*lines.last().unwrap(), "#eof");

    let inspect = scatterforge(&["inspect", state.to_str().unwrap()]);
    assert!(inspect.status.success(), "stderr: {}", String::from_utf8_lossy(&inspect.stderr));
    let stdout = String::from_utf8_lossy(&inspect.stdout);
    assert!(stdout.contains("20 members, 3 dimensions, 4 sub-regions"), "{}", stdout);

    // Resume from the saved files
    let resume = scatterforge(&[
        "search",
        "-f",
        "rosenbrock",
        "-d",
        "3",
        "--max-iter",
        "5",
        "--perform-warm-start",
        "true",
        "--ref-set-file",
        state.join("ref_set.tsv").to_str().unwrap(),
        "--freq-mat-file",
        state.join("freq_mat.tsv").to_str().unwrap(),
        "--prob-mat-file",
        state.join("prob_mat.tsv").to_str().unwrap(),
        "--json",
    ]);
    assert!(resume.status.success(), "stderr: {}", String::from_utf8_lossy(&resume.stderr));
}

#[test]
fn test_config_file_with_cli_override() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{ "search": {{ "max_iter": 3, "seed": 77 }}, "sets": {{ "ref_set_size": 8 }} }}"#
    )
    .unwrap();

    let out = scatterforge(&[
        "--config",
        file.path().to_str().unwrap(),
        "search",
        "--max-iter",
        "4",
        "--perform-stop-criteria",
        "false",
        "--json",
    ]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(report["iterations"], 4);
    assert_eq!(report["seed"], 77);
    assert_eq!(report["reference_set"]["members"].as_array().unwrap().len(), 8);
}

#[test]
fn test_invalid_sizes_exit_with_error() {
    let out = scatterforge(&["search", "--ref-set-size", "7"]);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("ref_set_size"), "stderr: {}", stderr);
}

#[test]
fn test_functions_lists_benchmarks() {
    let out = scatterforge(&["functions"]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    for name in ["sphere", "quadratic-bowl", "rosenbrock", "rastrigin", "ackley", "griewank"] {
        assert!(stdout.contains(name), "missing {}", name);
    }
}
