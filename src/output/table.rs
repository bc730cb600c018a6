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

//! Fixed-width columns for the tabular human views.

use super::value::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub width: usize,
    pub align: Align,
    /// Spaces written after the cell.
    pub gap: usize,
}

impl Column {
    const fn right(width: usize) -> Self {
        Self {
            width,
            align: Align::Right,
            gap: 0,
        }
    }

    const fn left(width: usize) -> Self {
        Self {
            width,
            align: Align::Left,
            gap: 0,
        }
    }

    pub fn pad(&self, text: &str) -> String {
        let cell = match self.align {
            Align::Right => format!("{text:>width$}", width = self.width),
            Align::Left => format!("{text:<width$}", width = self.width),
        };
        format!("{cell}{}", " ".repeat(self.gap))
    }
}

const EXACT_COLUMNS: &[(&str, Column)] = &[
    ("gpu", Column::right(3)),
    (
        "timestamp",
        Column {
            width: 10,
            align: Align::Right,
            gap: 2,
        },
    ),
    ("power_usage", Column::right(7)),
    ("gfx_clock", Column::right(11)),
    ("mem_clock", Column::right(11)),
    ("encoder_clock", Column::right(11)),
    ("decoder_clock", Column::right(11)),
    ("vram_used", Column::right(11)),
    ("vram_total", Column::right(12)),
    ("pcie_bw", Column::right(12)),
    ("pcie_replay", Column::right(13)),
    ("throttle_status", Column::right(13)),
    ("bdf", Column::left(13)),
    ("bit_rate", Column::left(9)),
    ("max_bandwidth", Column::left(14)),
    ("link_type", Column::left(10)),
    ("RW", Column::left(52)),
];

const DEFAULT_COLUMN: Column = Column::right(10);

/// Column layout for a key.
pub fn column_for(key: &str) -> Column {
    if let Some((_, column)) = EXACT_COLUMNS.iter().find(|(name, _)| *name == key) {
        return *column;
    }
    if key.starts_with("gpu_") || key.starts_with("bdf_") {
        return Column::left(13);
    }
    if key.contains("ecc") {
        return Column::right(12);
    }
    DEFAULT_COLUMN
}

/// One table line, trailing whitespace trimmed.
pub fn render_row(row: &Record) -> String {
    let mut line = String::new();
    for (key, value) in row.iter() {
        line.push_str(&column_for(key).pad(&value.to_string()));
    }
    line.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::value::Value;

    #[test]
    fn test_known_widths() {
        assert_eq!(column_for("gpu").width, 3);
        assert_eq!(column_for("single_bit_ecc").width, 12);
        assert_eq!(column_for("pcie_replay").width, 13);
        assert_eq!(column_for("gpu_3").align, Align::Left);
        assert_eq!(column_for("bdf_1").width, 13);
        assert_eq!(column_for("unheard_of"), DEFAULT_COLUMN);
    }

    #[test]
    fn test_row_alignment() {
        let row = Record::new()
            .with("timestamp", 1_700_000_000i64)
            .with("gpu", 0)
            .with("power_usage", Value::with_unit(165u32, "W"));
        assert_eq!(render_row(&row), "1700000000    0  165 W");
    }

    #[test]
    fn test_left_aligned_row_is_trimmed() {
        let row = Record::new().with("bdf", "0000:03:00.0").with("gpu_0", "SELF");
        assert_eq!(render_row(&row), "0000:03:00.0 SELF");
    }
}
