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

//! Indented human readable backend.
//!
//! Keys are upper-cased and nested maps indent by four spaces. A map stored
//! under the spacing marker key contributes its children one level deeper
//! without printing a heading of its own.

use crate::common::config::AppConfig;

use super::table;
use super::value::{Record, Value};

/// Render one result tree. Every line ends with a newline.
pub fn render(record: &Record) -> String {
    let mut out = String::new();
    render_record(record, 0, &mut out);
    out
}

/// Render one tabular row.
pub fn render_tabular(record: &Record) -> String {
    table::render_row(record)
}

fn indent(level: usize) -> String {
    " ".repeat(level * AppConfig::HUMAN_INDENT)
}

fn display_key(key: &str) -> String {
    // Process rows are stored as process_info_0, process_info_1, ...
    if let Some(suffix) = key.strip_prefix("process_info_") {
        if !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_digit()) {
            return "PROCESS_INFO".to_string();
        }
    }
    key.to_uppercase()
}

fn render_record(record: &Record, level: usize, out: &mut String) {
    for (key, value) in record.iter() {
        if key == AppConfig::SPACING_REMOVAL_KEY {
            if let Value::Map(inner) = value {
                render_record(inner, level + 1, out);
                continue;
            }
        }
        let key = display_key(key);
        match value {
            Value::Map(inner) if inner.is_empty() => {
                out.push_str(&format!("{}{key}: {{}}\n", indent(level)));
            }
            Value::Map(inner) => {
                out.push_str(&format!("{}{key}:\n", indent(level)));
                render_record(inner, level + 1, out);
            }
            Value::List(items) if items.is_empty() => {
                out.push_str(&format!("{}{key}: []\n", indent(level)));
            }
            Value::List(items) => {
                out.push_str(&format!("{}{key}:\n", indent(level)));
                render_items(items, level + 1, out);
            }
            leaf => out.push_str(&format!("{}{key}: {leaf}\n", indent(level))),
        }
    }
}

fn render_items(items: &[Value], level: usize, out: &mut String) {
    for item in items {
        match item {
            Value::Map(inner) => render_record(inner, level, out),
            Value::List(nested) => render_items(nested, level + 1, out),
            leaf => out.push_str(&format!("{}{leaf}\n", indent(level))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_indentation() {
        let record = Record::new().with("gpu", 0).with(
            "vram",
            Record::new()
                .with("type", "HBM3")
                .with("size", Value::with_unit(196_608u64, "MB")),
        );
        assert_eq!(
            render(&record),
            "GPU: 0\nVRAM:\n    TYPE: HBM3\n    SIZE: 196608 MB\n"
        );
    }

    #[test]
    fn test_spacing_marker_is_removed() {
        let record = Record::new().with("gpu", 1).with(
            AppConfig::SPACING_REMOVAL_KEY,
            Record::new().with("bdf", "0000:23:00.0"),
        );
        assert_eq!(render(&record), "GPU: 1\n    BDF: 0000:23:00.0\n");
    }

    #[test]
    fn test_lists_and_process_keys() {
        let record = Record::new()
            .with("vcn_activity", vec![Value::from(6), Value::na()])
            .with("process_info_0", Record::new().with("pid", 42));
        assert_eq!(
            render(&record),
            "VCN_ACTIVITY:\n    6\n    N/A\nPROCESS_INFO:\n    PID: 42\n"
        );
    }
}
