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

//! Result tree values.
//!
//! A [`Record`] is an insertion-ordered map; the order in which a handler
//! inserts keys is the order every backend prints them in. Leaves are
//! [`Value`]s, which carry their own unit annotation so the emitter can
//! decide per format whether to print `"165 W"`, `{"value": 165, "unit": "W"}`
//! or a bare `165`.

use std::fmt;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::common::config::AppConfig;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    Bool(bool),
    WithUnit { value: Box<Value>, unit: String },
    NotAvailable,
    List(Vec<Value>),
    Map(Record),
}

impl Value {
    pub fn na() -> Self {
        Value::NotAvailable
    }

    pub fn with_unit(value: impl Into<Value>, unit: &str) -> Self {
        match value.into() {
            Value::NotAvailable => Value::NotAvailable,
            inner => Value::WithUnit {
                value: Box::new(inner),
                unit: unit.to_string(),
            },
        }
    }

    /// `Some(v)` becomes `v`, `None` the sentinel.
    pub fn opt<T: Into<Value>>(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::NotAvailable)
    }

    pub fn is_na(&self) -> bool {
        matches!(self, Value::NotAvailable)
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Map(record) => Some(record),
            _ => None,
        }
    }

    /// The value with its unit stripped.
    pub fn bare(&self) -> &Value {
        match self {
            Value::WithUnit { value, .. } => value.bare(),
            other => other,
        }
    }

    /// Numeric view used by averaging columns.
    pub fn as_f64(&self) -> Option<f64> {
        match self.bare() {
            Value::Int(v) => Some(*v as f64),
            Value::UInt(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Text for a CSV cell: units dropped, containers rendered inline.
    pub fn csv_text(&self) -> String {
        match self {
            Value::WithUnit { value, .. } => value.csv_text(),
            Value::List(items) => format!(
                "[{}]",
                items.iter().map(Value::csv_text).collect::<Vec<_>>().join(", ")
            ),
            Value::Map(record) => format!(
                "{{{}}}",
                record
                    .iter()
                    .map(|(k, v)| format!("{k}: {}", v.csv_text()))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            other => other.to_string(),
        }
    }
}

fn float_text(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// Human rendering of a leaf. Containers are rendered by the human backend.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::UInt(v) => write!(f, "{v}"),
            Value::Float(v) => f.write_str(&float_text(*v)),
            Value::Str(s) => f.write_str(s),
            Value::Bool(b) => write!(f, "{b}"),
            Value::WithUnit { value, unit } => write!(f, "{value} {unit}"),
            Value::NotAvailable => f.write_str(AppConfig::NOT_AVAILABLE),
            Value::List(_) | Value::Map(_) => f.write_str(&self.csv_text()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Int(v) => serializer.serialize_i64(*v),
            Value::UInt(v) => serializer.serialize_u64(*v),
            Value::Float(v) if v.is_finite() => serializer.serialize_f64(*v),
            Value::Float(_) | Value::NotAvailable => {
                serializer.serialize_str(AppConfig::NOT_AVAILABLE)
            }
            Value::Str(s) => serializer.serialize_str(s),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::WithUnit { value, unit } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("value", value)?;
                map.serialize_entry("unit", unit)?;
                map.end()
            }
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(record) => record.serialize(serializer),
        }
    }
}

macro_rules! value_from {
    ($variant:ident as $target:ty: $($source:ty),*) => {
        $(impl From<$source> for Value {
            fn from(v: $source) -> Self {
                Value::$variant(<$target>::from(v))
            }
        })*
    };
}

value_from!(Int as i64: i64, i32, i16, i8);
value_from!(UInt as u64: u64, u32, u16, u8);
value_from!(Float as f64: f64, f32);

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::UInt(v as u64)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Record> for Value {
    fn from(v: Record) -> Self {
        Value::Map(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

/// Insertion-ordered string-keyed map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    entries: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite. An overwritten key keeps its original position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries.iter_mut().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let position = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(position).1)
    }

    /// Move every entry of `other` into `self`, in order.
    pub fn merge(&mut self, other: Record) {
        for (key, value) in other.entries {
            self.insert(key, value);
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Collapse one level of nesting the way the CSV backend expects.
    ///
    /// A nested map with several entries has its own nested maps prefixed
    /// `parent_child` (except the `gfx` group); a single-entry map is
    /// lifted as is. With `prefix_parent` every scalar child is also
    /// prefixed with the outer key, which the topology grids rely on.
    pub fn flatten(&self, prefix_parent: bool) -> Record {
        let mut output = Record::new();
        for (key, value) in self.iter() {
            let Value::Map(inner) = value else {
                output.insert(key, value.clone());
                continue;
            };
            let lifted = if inner.len() > 1 || prefix_parent {
                let mut with_parent = Record::new();
                for (parent, child) in inner.iter() {
                    match child {
                        Value::Map(grandchildren) if parent == "gfx" => {
                            for (child_key, v) in grandchildren.iter() {
                                with_parent.insert(child_key, v.clone());
                            }
                        }
                        Value::Map(grandchildren) => {
                            for (child_key, v) in grandchildren.iter() {
                                with_parent.insert(format!("{parent}_{child_key}"), v.clone());
                            }
                        }
                        scalar if prefix_parent => {
                            with_parent.insert(format!("{key}_{parent}"), scalar.clone());
                        }
                        scalar => with_parent.insert(parent, scalar.clone()),
                    }
                }
                with_parent
            } else {
                inner.clone()
            };
            output.merge_distinct(key, lifted.flatten(false));
        }
        output
    }

    /// Merge `other`, renaming any key already present to `group_key`
    /// so flattened groups never overwrite each other's leaves.
    pub fn merge_distinct(&mut self, group: &str, other: Record) {
        for (key, value) in other.entries {
            if !self.contains_key(&key) {
                self.insert(key, value);
                continue;
            }
            let mut renamed = format!("{group}_{key}");
            let mut n = 1;
            while self.contains_key(&renamed) {
                n += 1;
                renamed = format!("{group}_{key}_{n}");
            }
            self.insert(renamed, value);
        }
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (key, value) in iter {
            record.insert(key, value);
        }
        record
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_first_position() {
        let mut record = Record::new().with("b", 1).with("a", 2);
        record.insert("b", 3);
        assert_eq!(record.keys().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(record.get("b"), Some(&Value::Int(3)));
    }

    #[test]
    fn test_unit_rendering() {
        let power = Value::with_unit(165u32, "W");
        assert_eq!(power.to_string(), "165 W");
        assert_eq!(power.csv_text(), "165");
        assert_eq!(
            serde_json::to_string(&power).unwrap(),
            r#"{"value":165,"unit":"W"}"#
        );
        assert_eq!(Value::with_unit(Value::na(), "W"), Value::NotAvailable);
    }

    #[test]
    fn test_serialize_preserves_order() {
        let record = Record::new().with("zeta", 1).with("alpha", Value::na());
        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            r#"{"zeta":1,"alpha":"N/A"}"#
        );
    }

    #[test]
    fn test_flatten_prefixes_nested_groups() {
        let clock = Record::new()
            .with("gfx_0", Record::new().with("clk", 2100).with("min_clk", 500))
            .with("mem_0", Record::new().with("clk", 900).with("min_clk", 900));
        let usage = Record::new().with("gfx_activity", 35).with("umc_activity", 12);
        let single = Record::new().with("speed", 120);
        let record = Record::new()
            .with("gpu", 0)
            .with("usage", usage)
            .with("clock", clock)
            .with("fan", single);
        let flat = record.flatten(false);
        assert_eq!(
            flat.keys().collect::<Vec<_>>(),
            vec![
                "gpu",
                "gfx_activity",
                "umc_activity",
                "gfx_0_clk",
                "gfx_0_min_clk",
                "mem_0_clk",
                "mem_0_min_clk",
                "speed"
            ]
        );
    }

    #[test]
    fn test_flatten_keeps_colliding_leaves() {
        let record = Record::new()
            .with("pcie", Record::new().with("width", 16).with("speed", 16.0))
            .with("fan", Record::new().with("speed", 120).with("max", 255))
            .with(
                "dimm_power_consumption",
                Record::new().with("dimm_address", "0x80").with("power", 7),
            )
            .with(
                "dimm_thermal_sensor",
                Record::new().with("dimm_address", "0x90").with("temperature", 40),
            );
        let flat = record.flatten(false);
        assert_eq!(
            flat.keys().collect::<Vec<_>>(),
            vec![
                "width",
                "speed",
                "fan_speed",
                "max",
                "dimm_address",
                "power",
                "dimm_thermal_sensor_dimm_address",
                "temperature"
            ]
        );
        assert_eq!(flat.get("speed"), Some(&Value::from(16.0)));
        assert_eq!(flat.get("fan_speed"), Some(&Value::from(120)));
        assert_eq!(flat.get("dimm_thermal_sensor_dimm_address"), Some(&Value::from("0x90")));
    }

    #[test]
    fn test_merge_distinct_numbers_repeated_groups() {
        let mut record = Record::new().with("link", 0).with("xgmi_link", 1);
        record.merge_distinct("xgmi", Record::new().with("link", 2));
        assert_eq!(record.get("xgmi_link_2"), Some(&Value::from(2)));
        assert_eq!(record.len(), 3);
    }

    #[test]
    fn test_flatten_topology_override() {
        let record = Record::new().with("access", Record::new().with("0000:03:00.0", "SELF"));
        let flat = record.flatten(true);
        assert_eq!(flat.keys().collect::<Vec<_>>(), vec!["access_0000:03:00.0"]);
    }

    #[test]
    fn test_float_text() {
        assert_eq!(Value::from(2.0f64).to_string(), "2.0");
        assert_eq!(Value::from(2.5f64).to_string(), "2.5");
    }
}
