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

//! Buffers between the handlers and the emitter.

use super::value::{Record, Value};

/// Header and filled rows for a row set whose members disagree on keys.
pub fn union_fill(rows: &[Record]) -> (Vec<String>, Vec<Record>) {
    let mut header: Vec<String> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !header.iter().any(|k| k == key) {
                header.push(key.to_string());
            }
        }
    }
    let filled = rows
        .iter()
        .map(|row| {
            let mut row = row.clone();
            for key in &header {
                if !row.contains_key(key) {
                    row.insert(key.clone(), Value::NotAvailable);
                }
            }
            row
        })
        .collect();
    (header, filled)
}

/// A parallel table printed after the main one.
///
/// `key` names the rows when JSON puts both tables in one document; a
/// table without a key only appears in human output.
#[derive(Debug, Clone, Default)]
pub struct SecondaryTable {
    pub title: String,
    pub header: String,
    pub key: String,
    pub rows: Vec<Record>,
}

#[derive(Debug, Default)]
pub struct ResultStore {
    current: Record,
    multiple: Vec<Record>,
    watch: Vec<Record>,
    secondary: Vec<SecondaryTable>,
    watch_secondary: Vec<SecondaryTable>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.current.insert(key, value);
    }

    pub fn merge(&mut self, values: Record) {
        self.current.merge(values);
    }

    /// Merge a flattened group without clobbering leaves already stored.
    pub fn merge_group(&mut self, group: &str, values: Record) {
        self.current.merge_distinct(group, values);
    }

    pub fn current(&self) -> &Record {
        &self.current
    }

    pub fn multiple(&self) -> &[Record] {
        &self.multiple
    }

    pub fn watch(&self) -> &[Record] {
        &self.watch
    }

    /// Move the current tree into the multi-device buffer.
    pub fn snapshot(&mut self) {
        if self.current.is_empty() {
            return;
        }
        self.multiple.push(std::mem::take(&mut self.current));
    }

    /// Move the current tree, or every buffered tree, into the watch buffer.
    pub fn take_watch(&mut self, multiple: bool) {
        if multiple {
            self.watch.append(&mut self.multiple);
        } else if !self.current.is_empty() {
            self.watch.push(std::mem::take(&mut self.current));
        }
    }

    /// Drop everything not yet moved to the watch buffer.
    pub fn discard_pending(&mut self) {
        self.current.clear();
        self.multiple.clear();
        self.secondary.clear();
    }

    pub fn clear_current(&mut self) {
        self.current.clear();
    }

    pub fn clear_multiple(&mut self) {
        self.multiple.clear();
    }

    pub fn add_secondary(&mut self, table: SecondaryTable) {
        self.secondary.push(table);
    }

    pub fn take_secondary(&mut self) -> Vec<SecondaryTable> {
        std::mem::take(&mut self.secondary)
    }

    /// Append pending secondary rows to the watch buffer, one table per
    /// title and key.
    pub fn take_watch_secondary(&mut self) {
        for table in std::mem::take(&mut self.secondary) {
            match self
                .watch_secondary
                .iter_mut()
                .find(|buffered| buffered.key == table.key && buffered.title == table.title)
            {
                Some(buffered) => buffered.rows.extend(table.rows),
                None => self.watch_secondary.push(table),
            }
        }
    }

    pub fn watch_secondary(&self) -> &[SecondaryTable] {
        &self.watch_secondary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_and_watch() {
        let mut store = ResultStore::new();
        store.put("gpu", 0);
        store.snapshot();
        store.put("gpu", 1);
        store.snapshot();
        assert!(store.current().is_empty());
        assert_eq!(store.multiple().len(), 2);

        store.take_watch(true);
        assert!(store.multiple().is_empty());
        assert_eq!(store.watch().len(), 2);

        store.put("gpu", 0);
        store.take_watch(false);
        assert_eq!(store.watch().len(), 3);
    }

    #[test]
    fn test_watch_secondary_accumulates_per_table() {
        let mut store = ResultStore::new();
        for pid in [10, 20] {
            store.add_secondary(SecondaryTable {
                title: "PROCESS INFO:".to_string(),
                key: "process_list".to_string(),
                rows: vec![Record::new().with("pid", pid)],
                ..SecondaryTable::default()
            });
            store.take_watch_secondary();
        }
        assert!(store.take_secondary().is_empty());
        let buffered = store.watch_secondary();
        assert_eq!(buffered.len(), 1);
        assert_eq!(buffered[0].rows.len(), 2);
        assert_eq!(buffered[0].rows[1].get("pid"), Some(&Value::from(20)));
    }

    #[test]
    fn test_empty_snapshot_is_ignored() {
        let mut store = ResultStore::new();
        store.snapshot();
        assert!(store.multiple().is_empty());
    }

    #[test]
    fn test_union_fill_orders_by_first_sight() {
        let rows = vec![
            Record::new().with("a", 1),
            Record::new().with("b", 2).with("a", 3),
        ];
        let (header, filled) = union_fill(&rows);
        assert_eq!(header, vec!["a", "b"]);
        assert_eq!(filled[0].get("b"), Some(&Value::NotAvailable));
        assert_eq!(filled[1].keys().collect::<Vec<_>>(), vec!["b", "a"]);
    }
}
