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

//! Device selection from the command line.

mod common;

use common::{two_gpus, Harness};

#[tokio::test]
async fn test_selector_forms_pick_the_same_gpu() {
    let mut harness = Harness::new(two_gpus());
    let (code, by_index) = harness.run(&["list", "--json", "-g", "1"]).await;
    assert_eq!(code, 0);

    for selector in [
        "0000:83:00.0",
        "83:00.0",
        "bbbbbbbb-bbbb-bbbb-bbbb-bbbbbbbbbbbb",
        "BBBBBBBB-BBBB-BBBB-BBBB-BBBBBBBBBBBB",
    ] {
        let (code, text) = harness.run(&["list", "--json", "-g", selector]).await;
        assert_eq!(code, 0, "{selector}");
        assert_eq!(text, by_index, "{selector}");
    }

    let parsed: serde_json::Value = serde_json::from_str(&by_index).unwrap();
    assert_eq!(parsed["gpu"], 1);
    assert_eq!(parsed["bdf"], "0000:83:00.0");
}

#[tokio::test]
async fn test_all_and_repeated_selectors() {
    let mut harness = Harness::new(two_gpus());
    let (_, all) = harness.run(&["list", "--json", "-g", "all"]).await;
    let (_, unfiltered) = harness.run(&["list", "--json"]).await;
    assert_eq!(all, unfiltered);

    let (_, text) = harness.run(&["list", "--json", "-g", "1", "0", "1"]).await;
    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    let gpus: Vec<u64> = parsed
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["gpu"].as_u64().unwrap())
        .collect();
    assert_eq!(gpus, [1, 0]);
}

#[tokio::test]
async fn test_unknown_device_is_reported() {
    let mut harness = Harness::new(two_gpus());
    let (code, text) = harness.run(&["list", "--json", "-g", "7"]).await;
    assert_eq!(code, -3);
    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed["code"], -3);

    let (code, _) = harness
        .run(&["list", "-g", "cccccccc-cccc-cccc-cccc-cccccccccccc"])
        .await;
    assert_eq!(code, -3);
}

#[tokio::test]
async fn test_malformed_selector_is_a_bad_value() {
    let mut harness = Harness::new(two_gpus());
    let (code, _) = harness.run(&["list", "-g", "not-a-device"]).await;
    assert_eq!(code, -5);
}
