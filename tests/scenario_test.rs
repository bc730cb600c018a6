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

//! End-to-end runs of whole command lines against the simulated library.

mod common;

use amd_smi::mock::SimulatedLibrary;
use amd_smi::native::{BadPage, EngineTime, PageStatus, ProcessInfo, ProcessMemory, VramInfo};
use common::{keys_at, two_gpus, Harness};
use tempfile::TempDir;

fn versioned() -> SimulatedLibrary {
    SimulatedLibrary::new().gpus(1).lib_version(24, 0, 1, 5)
}

#[tokio::test]
async fn test_version_human() {
    let mut harness = Harness::new(versioned());
    let (code, text) = harness.run(&["version"]).await;
    assert_eq!(code, 0);
    assert_eq!(
        text,
        "AMDSMI Tool: 1.0.0 | AMDSMI Library version: 24.0.1.5 | ROCm version: 6.0.0\n"
    );
}

#[tokio::test]
async fn test_version_json() {
    let mut harness = Harness::new(versioned());
    let (code, text) = harness.run(&["version", "--json"]).await;
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(
        parsed,
        serde_json::json!({
            "tool": "AMDSMI Tool",
            "version": "1.0.0",
            "amdsmi_library_version": "24.0.1.5",
            "rocm_version": "6.0.0"
        })
    );
    assert_eq!(
        keys_at(&text, 4),
        ["tool", "version", "amdsmi_library_version", "rocm_version"]
    );
}

#[tokio::test]
async fn test_version_csv() {
    let mut harness = Harness::new(versioned());
    let (_, text) = harness.run(&["version", "--csv"]).await;
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "tool,version,amdsmi_library_version,rocm_version");
    assert_eq!(lines[1], "AMDSMI Tool,1.0.0,24.0.1.5,6.0.0");
    assert_eq!(lines.len(), 2);
}

#[tokio::test]
async fn test_list_json_two_gpus() {
    let mut harness = Harness::new(two_gpus());
    let (code, text) = harness.run(&["list", "--json"]).await;
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    let entries = parsed.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    for (i, entry) in entries.iter().enumerate() {
        assert_eq!(entry["gpu"], i);
    }
    let keys = keys_at(&text, 8);
    let expected = ["gpu", "bdf", "uuid", "kfd_id", "node_id", "partition_id"];
    assert_eq!(keys[..6], expected);
    assert_eq!(keys[6..], expected);
    assert_eq!(entries[0]["bdf"], "0000:03:00.0");
    assert_eq!(entries[1]["uuid"], "bbbbbbbb-bbbb-bbbb-bbbb-bbbbbbbbbbbb");
}

#[tokio::test]
async fn test_static_vram_human() {
    let lib = SimulatedLibrary::new().gpus(1).vram(VramInfo {
        vram_type: 22,
        vendor: "SAMSUNG".to_string(),
        size_mb: 65536,
        bit_width: 4096,
    });
    let mut harness = Harness::new(lib);
    let (code, text) = harness.run(&["static", "--vram"]).await;
    assert_eq!(code, 0);
    assert!(text.contains("TYPE: GDDR6"), "{text}");
    assert!(text.contains("VENDOR: SAMSUNG"), "{text}");
    assert!(text.contains("SIZE: 65536 MB"), "{text}");
    assert!(!text.contains("ASIC"), "{text}");
}

#[tokio::test]
async fn test_metric_power_json() {
    let lib = SimulatedLibrary::new().gpus(1).throttle(0).power_management(true);
    let mut harness = Harness::new(lib);
    let (code, text) = harness.run(&["metric", "--power", "--json"]).await;
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed["power"]["throttle_status"], "UNTHROTTLED");
    assert_eq!(parsed["power"]["power_management"], "ENABLED");
    assert_eq!(parsed["power"]["socket_power"]["unit"], "W");
}

#[tokio::test]
async fn test_bad_pages_pending_json() {
    let page = |address: u64, status: PageStatus| BadPage {
        page_address: address,
        page_size: 4096,
        status,
    };
    let lib = SimulatedLibrary::new().gpus(1).bad_pages(
        0,
        vec![page(0x1000, PageStatus::Pending), page(0x2000, PageStatus::Pending)],
    );
    let mut harness = Harness::new(lib);
    let (code, text) = harness.run(&["bad-pages", "--pending", "--json"]).await;
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    let pending = parsed["pending"].as_array().unwrap();
    assert_eq!(pending.len(), 2);
    for entry in pending {
        assert_eq!(entry["page_size"], 4096);
        assert_eq!(entry["status"], "PENDING");
        assert!(entry.get("page_address").is_some());
    }
    assert!(parsed.get("retired").is_none());
}

#[tokio::test]
async fn test_bad_pages_pending_human() {
    let lib = SimulatedLibrary::new().gpus(1).bad_pages(
        0,
        vec![
            BadPage {
                page_address: 0x1000,
                page_size: 4096,
                status: PageStatus::Pending,
            },
            BadPage {
                page_address: 0x2000,
                page_size: 4096,
                status: PageStatus::Pending,
            },
        ],
    );
    let mut harness = Harness::new(lib);
    let (_, text) = harness.run(&["bad-pages", "--pending"]).await;
    assert_eq!(text.matches("STATUS: PENDING").count(), 2, "{text}");
}

#[tokio::test(start_paused = true)]
async fn test_monitor_watch_to_csv_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("monitor.csv");
    let mut harness = Harness::new(SimulatedLibrary::new().gpus(1));
    let (code, printed) = harness
        .run(&[
            "monitor",
            "--watch",
            "1",
            "--iterations",
            "2",
            "--csv",
            "--file",
            path.to_str().unwrap(),
        ])
        .await;
    assert_eq!(code, 0);
    assert!(printed.is_empty());

    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 3, "{contents}");
    assert_eq!(
        lines[0],
        "timestamp,gpu,power_usage,hotspot_temperature,memory_temperature,gfx,gfx_clock,mem,mem_clock,\
         encoder,encoder_clock,decoder,decoder_clock,single_bit_ecc,double_bit_ecc,pcie_replay,\
         vram_used,vram_total,pcie_bw"
    );
    for line in &lines[1..] {
        assert_eq!(line.split(',').count(), 19);
    }
}

#[tokio::test]
async fn test_monitor_human_table() {
    let mut harness = Harness::new(SimulatedLibrary::new().gpus(2));
    let (code, text) = harness.run(&["monitor", "-p", "-t"]).await;
    assert_eq!(code, 0);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "GPU  POWER     GPU_T     MEM_T");
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with("  0  165 W"), "{text}");
}

#[tokio::test]
async fn test_monitor_process_table() {
    let mut harness = Harness::new(SimulatedLibrary::new().gpus(1));
    let (code, text) = harness.run(&["monitor", "--power-usage", "--process"]).await;
    assert_eq!(code, 0);
    assert!(text.contains("PROCESS INFO:"), "{text}");
    assert!(text.contains("No running processes detected"), "{text}");
}

fn python_job() -> ProcessInfo {
    ProcessInfo {
        name: "python3".to_string(),
        pid: 4242,
        mem: 1_572_864,
        engine_usage: EngineTime { gfx: 1_000, enc: 0 },
        memory_usage: ProcessMemory {
            gtt_mem: 2048,
            cpu_mem: 0,
            vram_mem: 1_572_864,
        },
        container_name: String::new(),
    }
}

#[tokio::test]
async fn test_monitor_process_json_document() {
    let lib = SimulatedLibrary::new().gpus(1).processes(0, vec![python_job()]);
    let mut harness = Harness::new(lib);
    let (code, text) = harness
        .run(&["monitor", "--power-usage", "--process", "--json"])
        .await;
    assert_eq!(code, 0, "{text}");
    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    let gpus = parsed["gpu_data"].as_array().unwrap();
    assert_eq!(gpus.len(), 1);
    assert_eq!(gpus[0]["gpu"], 0);
    assert!(gpus[0]["power_usage"].is_object());

    let processes = parsed["process_list"].as_array().unwrap();
    assert_eq!(processes.len(), 1);
    assert_eq!(processes[0]["gpu"], 0);
    assert_eq!(processes[0]["pid"], 4242);
    assert_eq!(processes[0]["name"], "python3");
}

#[tokio::test(start_paused = true)]
async fn test_monitor_watch_file_keeps_process_rows() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("m.csv");
    let lib = SimulatedLibrary::new().gpus(1).processes(0, vec![python_job()]);
    let mut harness = Harness::new(lib);
    let (code, printed) = harness
        .run(&[
            "monitor",
            "--power-usage",
            "--process",
            "-w",
            "1",
            "-i",
            "2",
            "--csv",
            "--file",
            path.to_str().unwrap(),
        ])
        .await;
    assert_eq!(code, 0);
    assert!(printed.is_empty());

    let contents = std::fs::read_to_string(&path).unwrap();
    let (metrics, processes) = contents.split_once("\n\n").expect("two csv blocks");
    let metric_lines: Vec<&str> = metrics.lines().collect();
    assert_eq!(metric_lines[0], "timestamp,gpu,power_usage");
    assert_eq!(metric_lines.len(), 3, "{contents}");

    let process_lines: Vec<&str> = processes.lines().collect();
    assert!(process_lines[0].starts_with("timestamp,gpu,name,pid,"), "{contents}");
    assert_eq!(process_lines.len(), 3, "{contents}");
    for line in &process_lines[1..] {
        let cells: Vec<&str> = line.split(',').collect();
        assert_eq!(cells[1..4], ["0", "python3", "4242"], "{line}");
    }
}

#[tokio::test(start_paused = true)]
async fn test_monitor_watch_json_file_keeps_process_rows() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("m.json");
    let lib = SimulatedLibrary::new().gpus(1).processes(0, vec![python_job()]);
    let mut harness = Harness::new(lib);
    let (code, _) = harness
        .run(&[
            "monitor",
            "--process",
            "-w",
            "1",
            "-i",
            "2",
            "--json",
            "--file",
            path.to_str().unwrap(),
        ])
        .await;
    assert_eq!(code, 0);

    let contents = std::fs::read_to_string(&path).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&contents).unwrap();
    assert_eq!(parsed["gpu_data"].as_array().unwrap().len(), 2);
    let processes = parsed["process_list"].as_array().unwrap();
    assert_eq!(processes.len(), 2);
    assert!(processes.iter().all(|row| row["pid"] == 4242 && row["timestamp"].is_i64()));
}

#[tokio::test]
async fn test_xgmi_metric_switch_matches_default() {
    let mut harness = Harness::new(two_gpus().xgmi_links(true));
    let (_, default) = harness.run(&["xgmi", "--json"]).await;
    let (code, explicit) = harness.run(&["xgmi", "-m", "--json"]).await;
    assert_eq!(code, 0);
    assert!(!explicit.is_empty());
    assert_eq!(default, explicit);
}

#[tokio::test]
async fn test_xgmi_metric_json() {
    let mut harness = Harness::new(two_gpus().xgmi_links(true));
    let (code, text) = harness.run(&["xgmi", "--json"]).await;
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    let first = &parsed[0];
    assert_eq!(first["bit_rate"]["unit"], "Gb/s");
    assert_eq!(first["link_type"], "XGMI");
    assert_eq!(first["link_metrics"]["0000:03:00.0"]["read"], "N/A");
    assert_eq!(first["link_metrics"]["0000:83:00.0"]["read"]["unit"], "KB");
}

#[tokio::test]
async fn test_topology_human_tables() {
    let mut harness = Harness::new(two_gpus().xgmi_links(true));
    let (code, text) = harness.run(&["topology", "--link-type", "--weight"]).await;
    assert_eq!(code, 0);
    assert!(text.contains("WEIGHT TABLE:"), "{text}");
    assert!(text.contains("LINK TYPE TABLE:"), "{text}");
    assert!(!text.contains("ACCESS TABLE:"), "{text}");
    assert!(text.contains("SELF"));
    assert!(text.contains("XGMI"));
    assert!(text.trim_end().ends_with("<BW from>-<BW to>"));

    let lines: Vec<&str> = text.lines().collect();
    let weight = lines.iter().position(|line| *line == "WEIGHT TABLE:").unwrap();
    assert!(lines[weight + 1].contains("0000:03:00.0"), "{text}");
    assert!(lines[weight + 2].starts_with("0000:03:00.0"), "{text}");
    assert!(lines[weight + 3].starts_with("0000:83:00.0"), "{text}");
    assert_eq!(lines[weight + 4], "", "{text}");
}

#[tokio::test]
async fn test_parse_error_renders_in_requested_format() {
    let mut harness = Harness::new(SimulatedLibrary::new().gpus(1));
    let (code, text) = harness.run(&["bogus", "--json"]).await;
    assert_eq!(code, -1);
    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed["code"], -1);
    assert!(parsed["error"].is_string());
}
