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

use std::path::PathBuf;

/// Application configuration constants
pub struct AppConfig;

impl AppConfig {
    // Presentation
    pub const NOT_AVAILABLE: &'static str = "N/A";
    pub const SPACING_REMOVAL_KEY: &'static str = "AMDSMI_SPACING_REMOVAL";
    pub const HUMAN_INDENT: usize = 4;
    pub const JSON_INDENT: &'static [u8] = b"    ";
    pub const NO_BAD_PAGES: &'static str = "No bad pages found.";
    pub const NO_PROCESSES: &'static str = "No running processes detected";
    pub const TOOL_NAME: &'static str = "AMDSMI Tool";
    pub const PRIMARY_JSON_KEY: &'static str = "devices";

    // File output
    pub const OUTPUT_FILE_STEM: &'static str = "amdsmi-output";

    // Metric thresholds
    pub const DEEP_SLEEP_THRESHOLD_MHZ: u64 = 140;
    pub const MAX_FAN_SPEED: u64 = 255;
    pub const VOLTAGE_CURVE_POINTS: usize = 3;
    pub const MAX_OVERDRIVE_PERCENT: u32 = 20;
    pub const MAX_CLOCK_LEVEL: u32 = 63;

    // Events
    pub const EVENT_READ_TIMEOUT_MS: u32 = 2000;

    // RAS blocks reported by `metric --ecc-blocks`
    pub const ECC_BLOCK_WHITELIST: &'static [&'static str] =
        &["UMC", "SDMA", "GFX", "MMHUB", "PCIE_BIF", "HDP", "XGMI_WAFL"];

    // Native library discovery
    pub const LIBRARY_NAME: &'static str = "libamd_smi.so";
    pub const LIBRARY_SEARCH_PATHS: &'static [&'static str] = &[
        "/opt/rocm/lib",
        "/opt/rocm/lib64",
        "/usr/lib",
        "/usr/lib64",
        "/usr/local/lib",
        "/usr/lib/x86_64-linux-gnu",
    ];
    pub const DEFAULT_ROCM_PATH: &'static str = "/opt/rocm";
}

/// Environment-specific configuration
pub struct EnvConfig;

impl EnvConfig {
    pub const LIB_PATH_VAR: &'static str = "AMDSMI_LIB_PATH";
    pub const MOCK_VAR: &'static str = "AMDSMI_MOCK";
    pub const ROCM_PATH_VAR: &'static str = "ROCM_PATH";

    /// Explicit shared object path, if the user pinned one.
    pub fn library_path() -> Option<PathBuf> {
        std::env::var_os(Self::LIB_PATH_VAR)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
    }

    /// Candidate shared object paths in search order.
    pub fn library_candidates() -> Vec<PathBuf> {
        let mut candidates = Vec::new();
        if let Some(path) = Self::library_path() {
            candidates.push(path);
        }
        candidates.push(Self::rocm_path().join("lib").join(AppConfig::LIBRARY_NAME));
        for dir in AppConfig::LIBRARY_SEARCH_PATHS {
            let path = PathBuf::from(dir).join(AppConfig::LIBRARY_NAME);
            if !candidates.contains(&path) {
                candidates.push(path);
            }
        }
        candidates
    }

    /// Whether the simulated library was requested.
    pub fn use_mock() -> bool {
        std::env::var(Self::MOCK_VAR)
            .map(|value| matches!(value.as_str(), "1" | "true" | "yes"))
            .unwrap_or(false)
    }

    pub fn rocm_path() -> PathBuf {
        std::env::var_os(Self::ROCM_PATH_VAR)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(AppConfig::DEFAULT_ROCM_PATH))
    }

    /// ROCm release string from `$ROCM_PATH/.info/version`.
    pub fn rocm_version() -> Option<String> {
        let contents = std::fs::read_to_string(Self::rocm_path().join(".info").join("version")).ok()?;
        contents
            .lines()
            .next()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_candidates_are_unique() {
        let candidates = EnvConfig::library_candidates();
        let mut deduped = candidates.clone();
        deduped.dedup();
        assert_eq!(candidates.len(), deduped.len());
        assert!(candidates
            .iter()
            .all(|path| path.ends_with(AppConfig::LIBRARY_NAME)));
    }

    #[test]
    fn test_ecc_whitelist_contents() {
        assert_eq!(AppConfig::ECC_BLOCK_WHITELIST.len(), 7);
        assert!(AppConfig::ECC_BLOCK_WHITELIST.contains(&"XGMI_WAFL"));
        assert!(!AppConfig::ECC_BLOCK_WHITELIST.contains(&"ATHUB"));
    }
}
