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

//! CSV backend. Rows are expected flat already; see [`Record::flatten`].

use super::store::union_fill;
use super::value::Record;

fn quote(cell: &str) -> String {
    if cell.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

/// Header plus one line per row. The header is the first row's keys
/// followed by keys first seen in later rows; missing cells read `N/A`.
pub fn render(rows: &[Record]) -> String {
    if rows.is_empty() {
        return String::new();
    }
    let (header, rows) = union_fill(rows);
    let mut out = header.iter().map(|k| quote(k)).collect::<Vec<_>>().join(",");
    out.push('\n');
    for row in &rows {
        let line = header
            .iter()
            .map(|key| row.get(key).map(|v| quote(&v.csv_text())).unwrap_or_default())
            .collect::<Vec<_>>()
            .join(",");
        out.push_str(&line);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::value::Value;

    #[test]
    fn test_union_header_and_fill() {
        let rows = vec![
            Record::new().with("gpu", 0).with("power", Value::with_unit(165u32, "W")),
            Record::new().with("gpu", 1).with("temp", 40),
        ];
        assert_eq!(render(&rows), "gpu,power,temp\n0,165,N/A\n1,N/A,40\n");
    }

    #[test]
    fn test_quoting() {
        let rows = vec![Record::new().with("name", "a,b").with("note", "say \"hi\"")];
        assert_eq!(render(&rows), "name,note\n\"a,b\",\"say \"\"hi\"\"\"\n");
    }

    #[test]
    fn test_empty() {
        assert_eq!(render(&[]), "");
    }
}
