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

//! Result store and the three output backends.
//!
//! Handlers write into an [`Output`] and never touch the destination
//! directly. The same stored tree is rendered as indented or tabular human
//! text, pretty JSON, or flat CSV depending on [`OutputFormat`].

pub mod csv;
pub mod destination;
pub mod human;
pub mod json;
pub mod store;
pub mod table;
pub mod value;

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;

use crate::common::config::AppConfig;
use crate::error::{DeviceClass, Error, Result};

pub use store::{ResultStore, SecondaryTable};
pub use value::{Record, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
    Csv,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Human => "txt",
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        }
    }
}

/// Where rendered text goes.
#[derive(Debug, Clone, Default)]
pub enum Sink {
    #[default]
    Stdout,
    File(PathBuf),
    /// In-memory capture; behaves like standard output.
    Memory(Arc<Mutex<Vec<u8>>>),
}

impl Sink {
    /// A fresh capture buffer and the sink writing into it.
    pub fn memory() -> (Self, Arc<Mutex<Vec<u8>>>) {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        (Sink::Memory(Arc::clone(&buffer)), buffer)
    }

    pub fn is_file(&self) -> bool {
        matches!(self, Sink::File(_))
    }

    fn write(&self, text: &str, truncate: bool) -> Result<()> {
        match self {
            Sink::Stdout => {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(text.as_bytes())?;
                stdout.flush()?;
            }
            Sink::File(path) => {
                let mut file = OpenOptions::new()
                    .create(true)
                    .write(true)
                    .append(!truncate)
                    .truncate(truncate)
                    .open(path)?;
                file.write_all(text.as_bytes())?;
            }
            Sink::Memory(buffer) => {
                let mut buffer = buffer.lock().unwrap_or_else(PoisonError::into_inner);
                if truncate {
                    buffer.clear();
                }
                buffer.extend_from_slice(text.as_bytes());
            }
        }
        Ok(())
    }
}

/// The emitter: owns the result store, the format and the destination.
#[derive(Debug, Default)]
pub struct Output {
    format: OutputFormat,
    sink: Sink,
    store: ResultStore,
    table_header: String,
    header_printed: bool,
    primary_key: String,
}

impl Output {
    pub fn new(format: OutputFormat, sink: Sink) -> Self {
        Self {
            format,
            sink,
            ..Self::default()
        }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    pub fn is_csv(&self) -> bool {
        self.format == OutputFormat::Csv
    }

    pub fn is_human(&self) -> bool {
        self.format == OutputFormat::Human
    }

    pub fn sink(&self) -> &Sink {
        &self.sink
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    /// Start a device tree with its identity key.
    pub fn begin_device(&mut self, class: DeviceClass, id: usize) {
        self.store.put(class.key(), id);
    }

    /// Unix time; stored before the identity key so it leads every row.
    pub fn put_timestamp(&mut self) {
        self.store.put("timestamp", Utc::now().timestamp());
    }

    /// Store one field group. CSV lifts map children to the top level.
    pub fn put(&mut self, key: &str, value: impl Into<Value>) {
        match (self.format, value.into()) {
            (OutputFormat::Csv, Value::Map(record)) => self.store.merge_group(key, record.flatten(false)),
            (_, value) => self.store.put(key, value),
        }
    }

    /// Store the handler's `values` tree at the top of the device tree.
    pub fn put_values(&mut self, values: Record) {
        if self.is_csv() {
            self.store.merge(values.flatten(false));
        } else {
            self.store.merge(values);
        }
    }

    /// Store a pairwise grid; CSV prefixes every cell with its table name.
    pub fn put_grid(&mut self, values: Record) {
        if self.is_csv() {
            self.store.merge(values.flatten(true));
        } else {
            self.store.merge(values);
        }
    }

    pub fn snapshot(&mut self) {
        self.store.snapshot();
    }

    /// Move this iteration's rows, secondary tables included, into the
    /// watch buffer.
    pub fn take_watch(&mut self, multiple: bool) {
        self.store.take_watch(multiple);
        self.store.take_watch_secondary();
    }

    pub fn add_secondary(&mut self, table: SecondaryTable) {
        self.store.add_secondary(table);
    }

    /// JSON key of the main rows when secondary tables share the document.
    pub fn set_primary_key(&mut self, key: impl Into<String>) {
        self.primary_key = key.into();
    }

    pub fn set_table_header(&mut self, header: impl Into<String>) {
        self.table_header = header.into();
    }

    /// Forget results that were never printed or moved to the watch buffer.
    pub fn discard_pending(&mut self) {
        self.store.discard_pending();
    }

    /// Drop printed per-device results before the next device class.
    pub fn reset(&mut self) {
        self.store.clear_current();
        self.store.clear_multiple();
    }

    pub fn watch_len(&self) -> usize {
        self.store.watch().len()
    }

    /// Render the current tree, or the multi-device buffer, to the sink.
    ///
    /// While watching into a file nothing is written here; the iteration
    /// stays in the watch buffer until [`flush_watch`](Self::flush_watch).
    pub fn print(&mut self, multiple: bool, watching: bool, tabular: bool) -> Result<()> {
        if watching && self.sink.is_file() {
            return Ok(());
        }
        let rows: Vec<Record> = if multiple {
            self.store.multiple().to_vec()
        } else if self.store.current().is_empty() {
            Vec::new()
        } else {
            vec![self.store.current().clone()]
        };
        let secondary = self.store.take_secondary();

        let text = match self.format {
            OutputFormat::Json => {
                if rows.is_empty() && secondary.is_empty() {
                    return Ok(());
                }
                let body = match self.document(&rows, &secondary) {
                    Some(document) => json::render(&document)?,
                    None if rows.is_empty() => return Ok(()),
                    None if multiple => json::render(&rows)?,
                    None => json::render(&rows[0])?,
                };
                format!("{body}\n")
            }
            OutputFormat::Csv => Self::render_csv(&rows, &secondary),
            OutputFormat::Human => {
                let mut text = String::new();
                if tabular && !self.header_printed && !self.table_header.is_empty() {
                    text.push_str(&self.table_header);
                    text.push('\n');
                    self.header_printed = true;
                }
                text.push_str(&self.render_human_rows(&rows, tabular));
                text.push_str(&self.render_human_tables(!text.is_empty(), &secondary));
                text
            }
        };
        if text.is_empty() {
            return Ok(());
        }
        self.sink.write(&text, false)
    }

    /// One JSON object holding the main rows and every keyed secondary
    /// table, or `None` when there is nothing keyed to add.
    fn document(&self, rows: &[Record], tables: &[SecondaryTable]) -> Option<Record> {
        let keyed: Vec<&SecondaryTable> = tables.iter().filter(|table| !table.key.is_empty()).collect();
        if keyed.is_empty() {
            return None;
        }
        let primary = if self.primary_key.is_empty() {
            AppConfig::PRIMARY_JSON_KEY
        } else {
            self.primary_key.as_str()
        };
        let mut document = Record::new().with(primary, rows.to_vec());
        for table in keyed {
            document.insert(table.key.as_str(), table.rows.clone());
        }
        Some(document)
    }

    fn render_csv(rows: &[Record], tables: &[SecondaryTable]) -> String {
        let mut text = csv::render(rows);
        for table in tables.iter().filter(|t| !t.key.is_empty() && !t.rows.is_empty()) {
            text.push('\n');
            text.push_str(&csv::render(&table.rows));
        }
        text
    }

    /// Titled tables after the main rows, separated by blank lines.
    fn render_human_tables(&self, after_rows: bool, tables: &[SecondaryTable]) -> String {
        let mut text = String::new();
        for (n, table) in tables.iter().enumerate() {
            if after_rows || n > 0 {
                text.push('\n');
            }
            if !table.title.is_empty() {
                text.push_str(&table.title);
                text.push('\n');
            }
            if !table.header.is_empty() {
                text.push_str(&table.header);
                text.push('\n');
            }
            text.push_str(&self.render_human_rows(&table.rows, true));
        }
        text
    }

    fn render_human_rows(&self, rows: &[Record], tabular: bool) -> String {
        let mut text = String::new();
        for row in rows {
            if tabular {
                text.push_str(&human::render_tabular(row));
                text.push('\n');
            } else {
                text.push_str(&human::render(row));
                text.push('\n');
            }
        }
        text
    }

    /// Write the whole watch buffer to a file destination in one go.
    pub fn flush_watch(&mut self, tabular: bool) -> Result<()> {
        if !self.sink.is_file() {
            return Ok(());
        }
        let rows = self.store.watch().to_vec();
        let secondary = self.store.watch_secondary().to_vec();
        let text = match self.format {
            OutputFormat::Json => match self.document(&rows, &secondary) {
                Some(document) => format!("{}\n", json::render(&document)?),
                None => format!("{}\n", json::render(&rows)?),
            },
            OutputFormat::Csv => Self::render_csv(&rows, &secondary),
            OutputFormat::Human => {
                let mut text = String::new();
                if tabular && !self.table_header.is_empty() {
                    text.push_str(&self.table_header);
                    text.push('\n');
                }
                text.push_str(&self.render_human_rows(&rows, tabular));
                text.push_str(&self.render_human_tables(!text.is_empty(), &secondary));
                text
            }
        };
        self.sink.write(&text, true)
    }

    /// Render an error in the selected format.
    pub fn print_error(&self, error: &Error) -> Result<()> {
        self.sink.write(&format!("{}\n", error.render(self.format)), false)
    }

    /// Write a preformatted line.
    pub fn print_text(&self, text: &str) -> Result<()> {
        self.sink.write(&format!("{text}\n"), false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn captured(buffer: &Arc<Mutex<Vec<u8>>>) -> String {
        String::from_utf8(buffer.lock().unwrap().clone()).unwrap()
    }

    #[test]
    fn test_json_single_and_multiple() {
        let (sink, buffer) = Sink::memory();
        let mut output = Output::new(OutputFormat::Json, sink);
        output.begin_device(DeviceClass::Gpu, 0);
        output.put("bdf", "0000:03:00.0");
        output.print(false, false, false).unwrap();
        assert_eq!(captured(&buffer), "{\n    \"gpu\": 0,\n    \"bdf\": \"0000:03:00.0\"\n}\n");

        let (sink, buffer) = Sink::memory();
        let mut output = Output::new(OutputFormat::Json, sink);
        for id in 0..2 {
            output.begin_device(DeviceClass::Gpu, id);
            output.snapshot();
        }
        output.print(true, false, false).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&captured(&buffer)).unwrap();
        assert_eq!(parsed.as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_csv_flattens_groups() {
        let (sink, buffer) = Sink::memory();
        let mut output = Output::new(OutputFormat::Csv, sink);
        output.begin_device(DeviceClass::Gpu, 0);
        output.put_values(
            Record::new().with(
                "power",
                Record::new()
                    .with("socket_power", Value::with_unit(165u32, "W"))
                    .with("throttle_status", "UNTHROTTLED"),
            ),
        );
        output.print(false, false, false).unwrap();
        assert_eq!(captured(&buffer), "gpu,socket_power,throttle_status\n0,165,UNTHROTTLED\n");
    }

    #[test]
    fn test_table_header_printed_once() {
        let (sink, buffer) = Sink::memory();
        let mut output = Output::new(OutputFormat::Human, sink);
        output.set_table_header("GPU  POWER");
        for _ in 0..2 {
            output.begin_device(DeviceClass::Gpu, 0);
            output.put("power_usage", Value::with_unit(165u32, "W"));
            output.print(false, true, true).unwrap();
            output.take_watch(false);
        }
        assert_eq!(captured(&buffer), "GPU  POWER\n  0  165 W\n  0  165 W\n");
        assert_eq!(output.watch_len(), 2);
    }

    #[test]
    fn test_watch_to_file_flushes_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("watch.csv");
        let mut output = Output::new(OutputFormat::Csv, Sink::File(path.clone()));
        for id in 0..3 {
            output.begin_device(DeviceClass::Gpu, id);
            output.print(false, true, false).unwrap();
            output.take_watch(false);
        }
        assert!(!path.exists() || std::fs::read_to_string(&path).unwrap().is_empty());
        output.flush_watch(false).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "gpu\n0\n1\n2\n");
    }

    fn process_table(pid: u32) -> SecondaryTable {
        SecondaryTable {
            title: "PROCESS INFO:".to_string(),
            header: String::new(),
            key: "process_list".to_string(),
            rows: vec![Record::new().with("gpu", 0).with("pid", pid)],
        }
    }

    #[test]
    fn test_json_document_carries_secondary_rows() {
        let (sink, buffer) = Sink::memory();
        let mut output = Output::new(OutputFormat::Json, sink);
        output.set_primary_key("gpu_data");
        output.begin_device(DeviceClass::Gpu, 0);
        output.add_secondary(process_table(4242));
        output.print(false, false, true).unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&captured(&buffer)).unwrap();
        assert_eq!(parsed["gpu_data"][0]["gpu"], 0);
        assert_eq!(parsed["process_list"][0]["pid"], 4242);
    }

    #[test]
    fn test_watch_flush_appends_secondary_block() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("watch.csv");
        let mut output = Output::new(OutputFormat::Csv, Sink::File(path.clone()));
        for id in 0..2 {
            output.begin_device(DeviceClass::Gpu, id);
            output.add_secondary(process_table(4242 + id as u32));
            output.print(false, true, false).unwrap();
            output.take_watch(false);
        }
        output.flush_watch(false).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "gpu\n0\n1\n\ngpu,pid\n0,4242\n0,4243\n"
        );
    }

    #[test]
    fn test_error_rendering_goes_to_sink() {
        let (sink, buffer) = Sink::memory();
        let output = Output::new(OutputFormat::Csv, sink);
        output.print_error(&Error::Unknown).unwrap();
        assert_eq!(
            captured(&buffer),
            "error,code\nAn unknown error has occurred. Run 'help' for more info.,-100\n"
        );
    }
}
