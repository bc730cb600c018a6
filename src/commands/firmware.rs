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

//! `firmware`: microcode versions and, on hypervisors, firmware error
//! records.
//!
//! CSV prints one row per firmware entry; the other formats keep the list
//! inside the device tree.

use crate::error::{DeviceClass, Result};
use crate::native::{FwEntry, FwErrorRecord, ProcessorHandle};
use crate::output::{Output, OutputFormat, Record, Value};

use super::dispatch::{self, Emit};
use super::field::tolerant;
use super::Ctx;

pub fn run(ctx: &Ctx<'_>, output: &mut Output) -> Result<()> {
    dispatch::fan_out(ctx, output, &[DeviceClass::Gpu], Emit::default(), |ctx, _, handle| {
        Ok(firmware(ctx, handle))
    })
}

fn firmware(ctx: &Ctx<'_>, handle: ProcessorHandle) -> Vec<Record> {
    let format = ctx.format();
    let fw_list = ctx
        .wants(DeviceClass::Gpu, "ucode-list")
        .then(|| tolerant("fw_info", ctx.lib.fw_info(handle)).unwrap_or_default());
    let error_records = ctx
        .wants(DeviceClass::Gpu, "error-records")
        .then(|| tolerant("fw_error_records", ctx.lib.fw_error_records(handle)).unwrap_or_default());

    if format == OutputFormat::Csv {
        let mut rows: Vec<Record> = fw_list.iter().flatten().map(fw_entry).collect();
        rows.extend(error_records.iter().flatten().map(error_record));
        if rows.is_empty() {
            rows.push(Record::new());
        }
        return rows;
    }

    let mut values = Record::new();
    if let Some(entries) = fw_list {
        values.insert("fw_list", listing(entries.iter().map(fw_entry), "FW", format));
    }
    if let Some(records) = error_records {
        values.insert("error_records", listing(records.iter().map(error_record), "RECORD", format));
    }
    vec![values]
}

fn fw_entry(entry: &FwEntry) -> Record {
    Record::new()
        .with("fw_id", entry.fw_id.as_str())
        .with("fw_version", entry.fw_version)
}

fn error_record(record: &FwErrorRecord) -> Record {
    Record::new()
        .with("fw_id", record.fw_id.as_str())
        .with("error_count", record.error_count)
}

/// Human mode labels each entry `<label> <index>`.
fn listing(entries: impl Iterator<Item = Record>, label: &str, format: OutputFormat) -> Value {
    let items = entries.enumerate().map(|(i, entry)| match format {
        OutputFormat::Human => Value::from(Record::new().with(format!("{label} {i}"), entry)),
        _ => Value::from(entry),
    });
    Value::List(items.collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::human;

    #[test]
    fn test_human_listing_labels_entries() {
        let entries = [
            FwEntry { fw_id: "SMU".to_string(), fw_version: 5_570_816 },
            FwEntry { fw_id: "PSP_SOSDRV".to_string(), fw_version: 2_818_110 },
        ];
        let record = Record::new().with(
            "fw_list",
            listing(entries.iter().map(fw_entry), "FW", OutputFormat::Human),
        );
        let text = human::render(&record);
        assert!(text.starts_with("FW_LIST:\n    FW 0:\n        FW_ID: SMU\n"));
        assert!(text.contains("    FW 1:\n        FW_ID: PSP_SOSDRV\n"));
    }

    #[test]
    fn test_json_listing_is_plain() {
        let entries = [FwEntry { fw_id: "SMC".to_string(), fw_version: 1 }];
        let value = listing(entries.iter().map(fw_entry), "FW", OutputFormat::Json);
        assert_eq!(
            serde_json::to_string(&value).unwrap(),
            r#"[{"fw_id":"SMC","fw_version":1}]"#
        );
    }
}
