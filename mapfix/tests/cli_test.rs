//! End-to-end exit-code and output contracts for the mapfix CLI

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn mapfix() -> Command {
    Command::cargo_bin("mapfix").expect("binary builds")
}

fn mapping_dir(root: &TempDir) -> PathBuf {
    let dir = root.path().join("env/dev/mappings");
    fs::create_dir_all(&dir).expect("create mappings dir");
    dir
}

#[test]
fn fix_rewrites_discovered_files() {
    let root = TempDir::new().unwrap();
    let file = mapping_dir(&root).join("orders.json");
    fs::write(
        &file,
        serde_json::json!({
            "mappings": [{
                "source": {"name": "Order; Qty", "type": "Int32"}
            }]
        })
        .to_string(),
    )
    .unwrap();

    mapfix()
        .arg("--root")
        .arg(root.path())
        .arg("fix")
        .assert()
        .success()
        .stdout(predicate::str::contains("Processed 1 of 1"));

    let written = fs::read_to_string(&file).unwrap();
    let value: serde_json::Value = serde_json::from_str(&written).unwrap();
    assert_eq!(value["mappings"][0]["sink"]["name"], "Order__Qty");
    assert!(value["mappings"][0]["source"].get("type").is_none());
    assert!(written.ends_with('\n'));
}

#[test]
fn fix_isolates_malformed_files_and_exits_nonzero() {
    let root = TempDir::new().unwrap();
    let dir = mapping_dir(&root);
    fs::write(dir.join("bad.json"), "{broken").unwrap();
    let good = dir.join("good.json");
    fs::write(
        &good,
        serde_json::json!({"mappings": [{"source": {"name": "a b"}}]}).to_string(),
    )
    .unwrap();

    mapfix()
        .arg("--root")
        .arg(root.path())
        .arg("fix")
        .assert()
        .failure()
        .stderr(predicate::str::contains("bad.json"));

    // The good file was still processed
    let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&good).unwrap()).unwrap();
    assert_eq!(value["mappings"][0]["sink"]["name"], "a_b");
}

#[test]
fn check_isolates_malformed_files_and_exits_nonzero() {
    let root = TempDir::new().unwrap();
    let dir = mapping_dir(&root);
    fs::write(dir.join("bad.json"), "{broken").unwrap();
    let good = dir.join("good.json");
    fs::write(
        &good,
        serde_json::json!({
            "mappings": [{
                "source": {"name": "Order Qty"},
                "sink": {"name": "Order_Qty"}
            }]
        })
        .to_string(),
    )
    .unwrap();
    let before = fs::read_to_string(&good).unwrap();

    mapfix()
        .arg("--root")
        .arg(root.path())
        .arg("check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("bad.json").and(predicate::str::contains("unreadable")));

    // The clean file was still checked and left untouched
    assert_eq!(fs::read_to_string(&good).unwrap(), before);
}

#[test]
fn check_passes_clean_file_silently() {
    let root = TempDir::new().unwrap();
    let file = mapping_dir(&root).join("orders.json");
    fs::write(
        &file,
        serde_json::json!({
            "mappings": [{
                "source": {"name": "Order Qty"},
                "sink": {"name": "Order_Qty"}
            }]
        })
        .to_string(),
    )
    .unwrap();
    let before = fs::read_to_string(&file).unwrap();

    mapfix()
        .arg("--root")
        .arg(root.path())
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("WARN").not());

    assert_eq!(fs::read_to_string(&file).unwrap(), before, "clean file untouched");
}

#[test]
fn check_fails_when_a_sink_name_drifted() {
    let root = TempDir::new().unwrap();
    let file = mapping_dir(&root).join("orders.json");
    fs::write(
        &file,
        serde_json::json!({
            "mappings": [{
                "source": {"name": "Order; Qty"},
                "sink": {"name": "Order; Qty"}
            }]
        })
        .to_string(),
    )
    .unwrap();

    mapfix()
        .arg("--root")
        .arg(root.path())
        .arg("check")
        .assert()
        .failure()
        .stdout(predicate::str::contains("was modified"));

    let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&file).unwrap()).unwrap();
    assert_eq!(value["mappings"][0]["sink"]["name"], "Order__Qty");
}

#[test]
fn check_warns_on_identical_source_and_sink_names() {
    let root = TempDir::new().unwrap();
    let file = mapping_dir(&root).join("orders.json");
    fs::write(
        &file,
        serde_json::json!({
            "mappings": [{
                "source": {"name": "order_qty"},
                "sink": {"name": "order_qty"}
            }]
        })
        .to_string(),
    )
    .unwrap();

    mapfix()
        .arg("--root")
        .arg(root.path())
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("WARN").and(predicate::str::contains("order_qty")));
}

#[test]
fn fix_then_check_is_a_fixed_point() {
    let root = TempDir::new().unwrap();
    let file = mapping_dir(&root).join("orders.json");
    fs::write(
        &file,
        serde_json::json!({
            "mappings": [{
                "source": {"name": "Total {Gross} Amount", "ordinal": 1}
            }]
        })
        .to_string(),
    )
    .unwrap();

    mapfix().arg("--root").arg(root.path()).arg("fix").assert().success();
    let after_fix = fs::read_to_string(&file).unwrap();

    mapfix().arg("--root").arg(root.path()).arg("check").assert().success();
    assert_eq!(fs::read_to_string(&file).unwrap(), after_fix);
}
