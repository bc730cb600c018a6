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

//! `set`, `reset` and `event` against the simulated library's state.

mod common;

use amd_smi::device::PlatformInfo;
use amd_smi::mock::SimulatedLibrary;
use amd_smi::native::{EventKind, SmiLibrary, Status};
use amd_smi::Error;
use common::Harness;

fn gpu0() -> amd_smi::native::ProcessorHandle {
    SimulatedLibrary::gpu_handle(0)
}

#[tokio::test]
async fn test_set_requires_elevation() {
    let mut harness = Harness::new(SimulatedLibrary::new().gpus(1));
    let (code, text) = harness.run(&["set", "--fan", "50%", "--json"]).await;
    assert_eq!(code, Error::PermissionDenied.code());
    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed["code"], Error::PermissionDenied.code());
    assert_eq!(harness.lib.fan_speed(gpu0(), 0), Ok(120));
}

#[tokio::test]
async fn test_set_without_settings_is_rejected() {
    let mut harness = Harness::new(SimulatedLibrary::new().gpus(1)).elevated();
    let (code, _) = harness.run(&["set"]).await;
    assert_eq!(code, -9);
}

#[tokio::test]
async fn test_set_fan_and_power_cap() {
    let mut harness = Harness::new(SimulatedLibrary::new().gpus(1)).elevated();
    let (code, text) = harness
        .run(&["set", "--fan", "50%", "--power-cap", "500", "--json"])
        .await;
    assert_eq!(code, 0, "{text}");
    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed["gpu"], 0);
    assert_eq!(parsed["fan"], "Successfully set fan speed 128");
    assert_eq!(parsed["powercap"], "Successfully set power cap to 500 W");

    assert_eq!(harness.lib.fan_speed(gpu0(), 0), Ok(128));
    let cap = harness.lib.power_cap_info(gpu0(), 0).unwrap();
    assert_eq!(cap.power_cap, 500_000_000);

    let (_, text) = harness.run(&["set", "--power-cap", "500", "--json"]).await;
    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed["powercap"], "Power cap is already set to 500 W");
}

#[tokio::test]
async fn test_power_cap_out_of_range() {
    let mut harness = Harness::new(SimulatedLibrary::new().gpus(1)).elevated();
    let (code, _) = harness.run(&["set", "--power-cap", "9999"]).await;
    assert_eq!(code, -5);
    let cap = harness.lib.power_cap_info(gpu0(), 0).unwrap();
    assert_eq!(cap.power_cap, 750_000_000);
}

#[tokio::test]
async fn test_unsupported_setting_reads_na() {
    let lib = SimulatedLibrary::new().gpus(1).fail("set_perf_level");
    let mut harness = Harness::new(lib).elevated();
    let (code, text) = harness
        .run(&["set", "--fan", "10", "--perf-level", "HIGH", "--json"])
        .await;
    assert_eq!(code, 0, "{text}");
    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed["fan"], "Successfully set fan speed 10");
    assert_eq!(parsed["perflevel"], "N/A");
}

#[tokio::test]
async fn test_permission_failure_aborts() {
    let lib = SimulatedLibrary::new()
        .gpus(1)
        .fail_with("set_fan_speed", Status::NoPerm);
    let mut harness = Harness::new(lib).elevated();
    let (code, _) = harness.run(&["set", "--fan", "10"]).await;
    assert_eq!(code, Error::PermissionDenied.code());
}

#[tokio::test]
async fn test_reset_restores_defaults() {
    let mut harness = Harness::new(SimulatedLibrary::new().gpus(2)).elevated();
    let (code, _) = harness.run(&["set", "--fan", "200", "--power-cap", "300"]).await;
    assert_eq!(code, 0);

    let (code, text) = harness.run(&["reset", "--fans", "--power-cap", "--json"]).await;
    assert_eq!(code, 0, "{text}");
    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    let entries = parsed.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["fans"], "Successfully reset fan speed");
    assert_eq!(entries[0]["power_cap"], "Successfully reset power cap to 750 W");

    for index in 0..2 {
        let handle = SimulatedLibrary::gpu_handle(index);
        assert_eq!(harness.lib.fan_speed(handle, 0), Ok(120));
        assert_eq!(harness.lib.power_cap_info(handle, 0).unwrap().power_cap, 750_000_000);
    }
}

#[tokio::test]
async fn test_reset_requires_elevation() {
    let mut harness = Harness::new(SimulatedLibrary::new().gpus(1));
    let (code, _) = harness.run(&["reset", "--fans"]).await;
    assert_eq!(code, Error::PermissionDenied.code());
}

#[tokio::test]
async fn test_event_prints_pending_notifications() {
    let lib = SimulatedLibrary::new()
        .gpus(2)
        .event(1, EventKind::VmFault, "page fault at 0x1000");
    let mut harness = Harness::new(lib).stop_after("q\n");
    let (code, text) = harness.run(&["event"]).await;
    assert_eq!(code, 0);
    assert!(text.contains("EVENT LISTENING:"), "{text}");
    let line = text
        .lines()
        .find(|line| line.starts_with("GPU[1]:"))
        .unwrap_or_else(|| panic!("no event line in\n{text}"));
    assert!(line.contains("VM_FAULT"), "{line}");
    assert!(line.ends_with("page fault at 0x1000"), "{line}");
}

#[tokio::test]
async fn test_set_rejects_mixed_device_classes() {
    let lib = SimulatedLibrary::new().gpus(1).cpus(1, 2);
    let mut harness = Harness::on(lib, PlatformInfo::linux_baremetal(true, true)).elevated();

    let (code, _) = harness
        .run(&["set", "-U", "0", "-O", "0", "--core-boost-limit", "500"])
        .await;
    assert_eq!(code, -1);

    let (code, text) = harness
        .run(&["set", "--fan", "10", "--cpu-pwr-limit", "100", "--json"])
        .await;
    assert_eq!(code, -1);
    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed["code"], -1);
    assert_eq!(harness.lib.fan_speed(gpu0(), 0), Ok(120));
}
