// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Behaviour that must hold across commands and output formats.

mod common;

use amd_smi::device::PlatformInfo;
use amd_smi::mock::SimulatedLibrary;
use amd_smi::native::{BadPage, PageStatus};
use common::{keys_at, two_gpus, Harness};
use tempfile::TempDir;

fn page(address: u64, status: PageStatus) -> BadPage {
    BadPage {
        page_address: address,
        page_size: 4096,
        status,
    }
}

/// Human rendering of a JSON leaf: unit values print as "value unit".
fn human_leaf(leaf: &serde_json::Value) -> String {
    match leaf {
        serde_json::Value::Object(map) => match (map.get("value"), map.get("unit")) {
            (Some(value), Some(serde_json::Value::String(unit))) => format!("{} {unit}", human_leaf(value)),
            _ => panic!("unexpected nested object {leaf}"),
        },
        serde_json::Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[tokio::test]
async fn test_repeated_runs_are_identical() {
    let mut harness = Harness::new(two_gpus());
    let (_, first) = harness.run(&["static", "--json"]).await;
    let (_, second) = harness.run(&["static", "--json"]).await;
    assert!(!first.is_empty());
    assert_eq!(first, second);

    let (_, first) = harness.run(&["metric", "--csv"]).await;
    let (_, second) = harness.run(&["metric", "--csv"]).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_field_order_follows_enumeration() {
    let mut harness = Harness::new(SimulatedLibrary::new().gpus(1).throttle(0));
    let (_, text) = harness.run(&["metric", "--power", "--json"]).await;
    assert_eq!(keys_at(&text, 4), ["gpu", "power"]);
    assert_eq!(
        keys_at(&text, 8),
        [
            "socket_power",
            "gfx_voltage",
            "soc_voltage",
            "mem_voltage",
            "throttle_status",
            "power_management"
        ]
    );
}

#[tokio::test]
async fn test_json_and_human_carry_the_same_leaves() {
    let lib = || SimulatedLibrary::new().gpus(1).throttle(0).power_management(true);
    let mut json = Harness::new(lib());
    let mut human = Harness::new(lib());
    let (_, json_text) = json.run(&["metric", "--power", "--json"]).await;
    let (_, human_text) = human.run(&["metric", "--power"]).await;

    let parsed: serde_json::Value = serde_json::from_str(&json_text).unwrap();
    let power = parsed["power"].as_object().unwrap();
    assert!(!power.is_empty());
    for (key, leaf) in power {
        let line = format!("{}: {}", key.to_uppercase(), human_leaf(leaf));
        assert!(human_text.contains(&line), "missing {line:?} in\n{human_text}");
    }
}

#[tokio::test]
async fn test_csv_rows_share_one_header() {
    let mut harness = Harness::new(two_gpus());
    let (code, text) = harness.run(&["metric", "--power", "--temperature", "--csv"]).await;
    assert_eq!(code, 0);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3, "{text}");
    assert!(lines[0].starts_with("gpu,"));
    let columns = lines[0].split(',').count();
    for line in &lines[1..] {
        assert_eq!(line.split(',').count(), columns, "{line}");
    }
    assert!(lines[1].starts_with("0,"));
    assert!(lines[2].starts_with("1,"));
}

#[tokio::test]
async fn test_failed_query_only_blanks_its_fields() {
    let lib = SimulatedLibrary::new().gpus(1).throttle(0).fail("power_info");
    let mut harness = Harness::new(lib);
    let (code, text) = harness.run(&["metric", "--usage", "--power", "--json"]).await;
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed["power"]["socket_power"], "N/A");
    assert_eq!(parsed["power"]["gfx_voltage"], "N/A");
    assert_eq!(parsed["power"]["throttle_status"], "UNTHROTTLED");
    assert_eq!(parsed["usage"]["gfx_activity"]["value"], 35);
    assert_eq!(parsed["usage"]["umc_activity"]["value"], 12);
}

#[tokio::test]
async fn test_failed_static_group_keeps_the_others() {
    let lib = SimulatedLibrary::new().gpus(1).fail("gpu_vram_info");
    let mut harness = Harness::new(lib);
    let (code, text) = harness.run(&["static", "--asic", "--vram", "--json"]).await;
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    for leaf in parsed["vram"].as_object().unwrap().values() {
        assert_eq!(leaf, "N/A");
    }
    assert_ne!(parsed["asic"]["market_name"], "N/A");
}

#[tokio::test(start_paused = true)]
async fn test_watch_iterations_write_one_tree_each() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("metric.json");
    let mut harness = Harness::new(SimulatedLibrary::new().gpus(1));
    let (code, printed) = harness
        .run(&[
            "metric",
            "--power",
            "--watch",
            "1",
            "--iterations",
            "3",
            "--json",
            "--file",
            path.to_str().unwrap(),
        ])
        .await;
    assert_eq!(code, 0);
    assert!(printed.is_empty());

    let contents = std::fs::read_to_string(&path).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&contents).unwrap();
    let trees = parsed.as_array().unwrap();
    assert_eq!(trees.len(), 3);
    for tree in trees {
        assert_eq!(tree["gpu"], 0);
        assert!(tree["power"].is_object());
    }
}

#[tokio::test(start_paused = true)]
async fn test_watch_time_bounds_tree_count() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("metric.json");
    let mut harness = Harness::new(SimulatedLibrary::new().gpus(1));
    let (code, _) = harness
        .run(&[
            "metric",
            "--power",
            "--watch",
            "1",
            "--watch-time",
            "5",
            "--json",
            "--file",
            path.to_str().unwrap(),
        ])
        .await;
    assert_eq!(code, 0);

    let contents = std::fs::read_to_string(&path).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&contents).unwrap();
    let trees = parsed.as_array().unwrap().len();
    assert!((4..=6).contains(&trees), "got {trees} trees");
}

#[tokio::test]
async fn test_metric_without_flags_covers_every_class() {
    let lib = SimulatedLibrary::new().gpus(1).cpus(1, 2);
    let mut harness = Harness::on(lib, PlatformInfo::linux_baremetal(true, true));
    let (code, text) = harness.run(&["metric"]).await;
    assert_eq!(code, 0, "{text}");

    let gpu = text.find("GPU: 0").expect("GPU section");
    let cpu = text.find("CPU: 0").expect("CPU section");
    let core = text.find("CORE: 0").expect("core section");
    assert!(gpu < cpu && cpu < core, "{text}");
    assert!(text.contains("CORE: 1"), "{text}");
}

#[tokio::test]
async fn test_bad_pages_bucketed_by_status() {
    let pages = vec![
        page(0x1000, PageStatus::Reserved),
        page(0x2000, PageStatus::Pending),
        page(0x3000, PageStatus::Pending),
        page(0x4000, PageStatus::Unreservable),
    ];
    let mut harness = Harness::new(SimulatedLibrary::new().gpus(1).bad_pages(0, pages));
    let (code, text) = harness.run(&["bad-pages", "--json"]).await;
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();

    assert_eq!(parsed["retired"]["status"], "RESERVED");
    assert_eq!(parsed["retired"]["page_address"], 0x1000);
    let pending = parsed["pending"].as_array().unwrap();
    assert_eq!(pending.len(), 2);
    assert!(pending.iter().all(|entry| entry["status"] == "PENDING"));
    assert_eq!(parsed["un_res"]["status"], "UNRESERVABLE");
}

#[tokio::test]
async fn test_empty_bad_page_bucket_reads_as_text() {
    let lib = SimulatedLibrary::new().gpus(1).bad_pages(0, vec![page(0x1000, PageStatus::Pending)]);
    let mut harness = Harness::new(lib);
    let (_, text) = harness.run(&["bad-pages", "--retired", "--json"]).await;
    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed["retired"], "No bad pages found.");
    assert!(parsed.get("pending").is_none());
}

fn unique_columns(header: &str) -> Vec<&str> {
    let columns: Vec<&str> = header.split(',').collect();
    for (n, column) in columns.iter().enumerate() {
        assert!(!columns[n + 1..].contains(column), "duplicate column {column} in {header}");
    }
    columns
}

#[tokio::test]
async fn test_csv_groups_keep_every_leaf() {
    let mut harness = Harness::new(SimulatedLibrary::new().gpus(1));
    let (code, text) = harness.run(&["metric", "--pcie", "--fan", "--csv"]).await;
    assert_eq!(code, 0);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2, "{text}");
    let columns = unique_columns(lines[0]);
    assert!(columns.contains(&"speed"), "{text}");
    assert!(columns.contains(&"fan_speed"), "{text}");

    let cells: Vec<&str> = lines[1].split(',').collect();
    assert_eq!(cells.len(), columns.len());
    let fan_speed = columns.iter().position(|c| *c == "fan_speed").unwrap();
    assert_eq!(cells[fan_speed], "120");
}

#[tokio::test]
async fn test_core_csv_has_one_column_per_value() {
    let lib = SimulatedLibrary::new().gpus(1).cpus(1, 2);
    let mut harness = Harness::on(lib, PlatformInfo::linux_baremetal(true, true));
    let (code, text) = harness
        .run(&["metric", "-O", "0", "--core-boost-limit", "--core-energy", "--csv"])
        .await;
    assert_eq!(code, 0, "{text}");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2, "{text}");
    assert_eq!(unique_columns(lines[0]), ["core", "boost_limit", "core_energy"]);
    assert!(lines[1].starts_with("0,"), "{text}");
    assert!(lines[1].split(',').all(|cell| !cell.is_empty()), "{text}");

    let (_, json) = harness
        .run(&["metric", "-O", "0", "--core-boost-limit", "--json"])
        .await;
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed["boost_limit"]["unit"], "MHz");
    assert!(parsed["boost_limit"].get("value").is_some_and(|v| !v.is_object()));
}
