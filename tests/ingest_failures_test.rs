use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

#[test]
fn ingest_fails_cleanly_when_catalog_is_missing() {
    let tmp = tempdir().expect("tempdir");

    assert_cmd::cargo::cargo_bin_cmd!("sda-ingest")
        .current_dir(tmp.path())
        .env("SDA_HOME", tmp.path())
        .env("SDA_CONFIG_PATH", tmp.path().join("absent.toml"))
        .arg("ingest")
        .arg("--catalog")
        .arg(tmp.path().join("nowhere.csv"))
        .arg("--dry-run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("record catalog unavailable"));
}

#[test]
fn ingest_requires_the_api_key_before_touching_the_network() {
    let tmp = tempdir().expect("tempdir");
    let catalog = tmp.path().join("reports.csv");
    fs::write(
        &catalog,
        "url,title,description,date,ingested\nhttps://x/doc1,Doc 1,First,2025-01-02,False\n",
    )
    .expect("write catalog");

    assert_cmd::cargo::cargo_bin_cmd!("sda-ingest")
        .current_dir(tmp.path())
        .env("SDA_HOME", tmp.path())
        .env("SDA_CONFIG_PATH", tmp.path().join("absent.toml"))
        .env_remove("SDA_API_KEY")
        .arg("ingest")
        .arg("--catalog")
        .arg(&catalog)
        .assert()
        .failure()
        .stderr(predicate::str::contains("SDA_API_KEY is required"));
}

#[test]
fn check_requires_the_api_key_too() {
    let tmp = tempdir().expect("tempdir");
    let catalog = tmp.path().join("reports.csv");
    fs::write(
        &catalog,
        "url,title,description,date,ingested\nhttps://x/doc1,Doc 1,First,2025-01-02,False\n",
    )
    .expect("write catalog");

    assert_cmd::cargo::cargo_bin_cmd!("sda-ingest")
        .current_dir(tmp.path())
        .env("SDA_HOME", tmp.path())
        .env("SDA_CONFIG_PATH", tmp.path().join("absent.toml"))
        .env_remove("SDA_API_KEY")
        .arg("check")
        .arg("--catalog")
        .arg(&catalog)
        .assert()
        .failure()
        .stderr(predicate::str::contains("SDA_API_KEY is required"));
}
