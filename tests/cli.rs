use assert_cmd::Command;
use assert_fs::TempDir;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

#[test]
fn cli_nests_a_job_file() -> Result<(), Box<dyn std::error::Error>> {
    let job = fixture("job.json");
    let tmp = TempDir::new()?;
    Command::cargo_bin("polynest")?
        .current_dir(&tmp)
        .args([
            "--job",
            job.to_str().unwrap(),
            "--rotations",
            "1",
            "--population-size",
            "4",
            "--max-generations",
            "3",
            "--seed",
            "1",
            "--svg",
            "nested.svg",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("placements written"));

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(tmp.path().join("placements.json"))?)?;
    let placements = report["placements"].as_array().unwrap();
    let unplaced = report["unplaced"].as_array().unwrap();
    assert_eq!(placements.len() + unplaced.len(), 4);
    assert!(!placements.is_empty());

    let svg = fs::read_to_string(tmp.path().join("nested.svg"))?;
    assert!(svg.starts_with("<svg"));
    tmp.close()?;
    Ok(())
}

#[test]
fn cli_runs_are_deterministic() -> Result<(), Box<dyn std::error::Error>> {
    let job = fixture("job.json");
    let run = || -> Result<String, Box<dyn std::error::Error>> {
        let tmp = TempDir::new()?;
        Command::cargo_bin("polynest")?
            .current_dir(&tmp)
            .args([
                "--job",
                job.to_str().unwrap(),
                "--rotations",
                "4",
                "--population-size",
                "4",
                "--max-generations",
                "3",
                "--seed",
                "5",
            ])
            .assert()
            .success();
        let out = fs::read_to_string(tmp.path().join("placements.json"))?;
        tmp.close()?;
        Ok(out)
    };
    assert_eq!(run()?, run()?);
    Ok(())
}

#[test]
fn cli_rejects_unknown_job_keys() -> Result<(), Box<dyn std::error::Error>> {
    let job = fixture("bad_job.json");
    let tmp = TempDir::new()?;
    Command::cargo_bin("polynest")?
        .current_dir(&tmp)
        .args(["--job", job.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse"));
    tmp.close()?;
    Ok(())
}

#[test]
fn cli_reports_progress_when_asked() -> Result<(), Box<dyn std::error::Error>> {
    let job = fixture("job.json");
    let tmp = TempDir::new()?;
    Command::cargo_bin("polynest")?
        .current_dir(&tmp)
        .args([
            "--job",
            job.to_str().unwrap(),
            "--rotations",
            "1",
            "--population-size",
            "4",
            "--max-generations",
            "2",
            "--seed",
            "1",
            "--progress",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("generation 0"));
    tmp.close()?;
    Ok(())
}
