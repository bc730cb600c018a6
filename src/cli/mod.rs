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

//! Command line model.
//!
//! The command tree is not a fixed derive: which subcommands and flags exist
//! depends on the platform the tool runs on, so [`catalogue`] lists them as
//! data and [`parser`] builds the clap tree for the current platform.

pub mod catalogue;
pub mod parser;
pub mod validators;

use std::path::PathBuf;

use clap::ValueEnum;

use crate::error::DeviceClass;
use crate::output::OutputFormat;

pub use parser::{parse, Parsed};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandName {
    Version,
    List,
    Static,
    Firmware,
    BadPages,
    Metric,
    Process,
    Profile,
    Event,
    Topology,
    Set,
    Reset,
    Monitor,
    Xgmi,
}

impl CommandName {
    pub fn as_str(self) -> &'static str {
        match self {
            CommandName::Version => "version",
            CommandName::List => "list",
            CommandName::Static => "static",
            CommandName::Firmware => "firmware",
            CommandName::BadPages => "bad-pages",
            CommandName::Metric => "metric",
            CommandName::Process => "process",
            CommandName::Profile => "profile",
            CommandName::Event => "event",
            CommandName::Topology => "topology",
            CommandName::Set => "set",
            CommandName::Reset => "reset",
            CommandName::Monitor => "monitor",
            CommandName::Xgmi => "xgmi",
        }
    }

    /// Subcommands whose handlers change device state.
    pub fn is_mutator(self) -> bool {
        matches!(self, CommandName::Set | CommandName::Reset)
    }
}

/// `--loglevel` choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    /// `tracing` filter directive for this level.
    pub fn directive(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error | LogLevel::Critical => "error",
        }
    }
}

/// Watch loop bounds, in seconds and iterations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchArgs {
    pub interval: u64,
    pub duration: Option<u64>,
    pub iterations: Option<u64>,
}

/// One flag the user passed, with its raw values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagValue {
    pub id: &'static str,
    pub class: Option<DeviceClass>,
    pub values: Vec<String>,
}

/// A parsed and validated command line.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub command: CommandName,
    pub format: OutputFormat,
    pub file: Option<PathBuf>,
    pub loglevel: Option<LogLevel>,
    pub gpu: Option<Vec<String>>,
    pub cpu: Option<Vec<String>>,
    pub core: Option<Vec<String>>,
    pub watch: Option<WatchArgs>,
    flags: Vec<FlagValue>,
}

impl Invocation {
    pub fn new(command: CommandName) -> Self {
        Self {
            command,
            format: OutputFormat::Human,
            file: None,
            loglevel: None,
            gpu: None,
            cpu: None,
            core: None,
            watch: None,
            flags: Vec::new(),
        }
    }

    pub(crate) fn push_flag(&mut self, flag: FlagValue) {
        self.flags.push(flag);
    }

    /// Whether the subcommand flag `id` was given.
    pub fn flag(&self, id: &str) -> bool {
        self.flags.iter().any(|f| f.id == id)
    }

    /// First value of flag `id`.
    pub fn one(&self, id: &str) -> Option<&str> {
        self.many(id).and_then(|values| values.first()).map(String::as_str)
    }

    /// All values of flag `id`.
    pub fn many(&self, id: &str) -> Option<&[String]> {
        self.flags
            .iter()
            .find(|f| f.id == id)
            .map(|f| f.values.as_slice())
    }

    /// Subcommand flags in the order they were declared.
    pub fn flags(&self) -> &[FlagValue] {
        &self.flags
    }

    /// Whether any field flag for `class` was given.
    pub fn has_class_flags(&self, class: DeviceClass) -> bool {
        self.flags.iter().any(|f| f.class == Some(class))
    }

    pub fn selector(&self, class: DeviceClass) -> Option<&[String]> {
        match class {
            DeviceClass::Gpu => self.gpu.as_deref(),
            DeviceClass::Cpu => self.cpu.as_deref(),
            DeviceClass::Core => self.core.as_deref(),
        }
    }

    pub fn has_selector(&self) -> bool {
        self.gpu.is_some() || self.cpu.is_some() || self.core.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_accessors() {
        let mut invocation = Invocation::new(CommandName::Set);
        invocation.push_flag(FlagValue {
            id: "clk-level",
            class: Some(DeviceClass::Gpu),
            values: vec!["sclk".to_string(), "1".to_string()],
        });
        assert!(invocation.flag("clk-level"));
        assert_eq!(invocation.one("clk-level"), Some("sclk"));
        assert_eq!(invocation.many("clk-level").map(<[String]>::len), Some(2));
        assert!(invocation.has_class_flags(DeviceClass::Gpu));
        assert!(!invocation.has_class_flags(DeviceClass::Cpu));
        assert!(!invocation.flag("fan"));
    }

    #[test]
    fn test_log_level_directives() {
        assert_eq!(LogLevel::Warning.directive(), "warn");
        assert_eq!(LogLevel::Critical.directive(), "error");
    }
}
