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

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

use crate::common::config::AppConfig;
use crate::error::Result;

/// Pretty JSON with four-space indentation, no trailing newline.
pub fn render<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let mut buffer = Vec::new();
    let formatter = PrettyFormatter::with_indent(AppConfig::JSON_INDENT);
    let mut serializer = Serializer::with_formatter(&mut buffer, formatter);
    value.serialize(&mut serializer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::value::Record;

    #[test]
    fn test_four_space_indent() {
        let record = Record::new().with("gpu", 0);
        assert_eq!(render(&record).unwrap(), "{\n    \"gpu\": 0\n}");
    }

    #[test]
    fn test_array_of_records() {
        let rows = vec![Record::new().with("gpu", 0), Record::new().with("gpu", 1)];
        let text = render(&rows).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed[1]["gpu"], 1);
    }
}
