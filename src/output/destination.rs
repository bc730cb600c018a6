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

//! `--file` destination resolution.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::debug;

use crate::common::config::AppConfig;
use crate::error::{Error, Result};

use super::OutputFormat;

/// Turn the user's `--file` argument into the file the emitter writes.
///
/// A directory gets a fresh `<unix-time>-amdsmi-output.<ext>` inside it. A
/// missing file is created when its parent exists, with its extension
/// switched to the output format's. An existing file is used as is.
pub fn resolve_file(requested: &Path, format: OutputFormat) -> Result<PathBuf> {
    let invalid = || Error::InvalidFilePath(requested.display().to_string());

    let path = if requested.is_dir() {
        let name = format!(
            "{}-{}.{}",
            Utc::now().timestamp(),
            AppConfig::OUTPUT_FILE_STEM,
            format.extension()
        );
        requested.join(name)
    } else if requested.is_file() {
        requested.to_path_buf()
    } else {
        let parent = match requested.parent() {
            Some(parent) if parent.as_os_str().is_empty() => Path::new("."),
            Some(parent) => parent,
            None => return Err(invalid()),
        };
        if !parent.is_dir() || requested.file_name().is_none() {
            return Err(invalid());
        }
        let mut path = requested.to_path_buf();
        if path.extension().and_then(|ext| ext.to_str()) != Some(format.extension()) {
            path.set_extension(format.extension());
        }
        path
    };

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| {
            debug!("Cannot open output file {}: {e}", path.display());
            invalid()
        })?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_directory_gets_generated_name() {
        let dir = TempDir::new().unwrap();
        let path = resolve_file(dir.path(), OutputFormat::Csv).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.ends_with("-amdsmi-output.csv"));
        assert!(path.exists());
    }

    #[test]
    fn test_missing_file_extension_adjusted() {
        let dir = TempDir::new().unwrap();
        let path = resolve_file(&dir.path().join("report.txt"), OutputFormat::Json).unwrap();
        assert_eq!(path, dir.path().join("report.json"));
        assert!(path.exists());
    }

    #[test]
    fn test_existing_file_kept() {
        let dir = TempDir::new().unwrap();
        let existing = dir.path().join("keep.log");
        std::fs::write(&existing, "x").unwrap();
        assert_eq!(resolve_file(&existing, OutputFormat::Csv).unwrap(), existing);
    }

    #[test]
    fn test_missing_parent_rejected() {
        let dir = TempDir::new().unwrap();
        let err = resolve_file(&dir.path().join("nope/out.json"), OutputFormat::Json).unwrap_err();
        assert_eq!(err.code(), -4);
    }
}
