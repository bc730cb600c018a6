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

//! `process`: compute processes running on each GPU.

use humansize::{format_size, WINDOWS};

use crate::cli::validators;
use crate::common::config::AppConfig;
use crate::error::{DeviceClass, Result};
use crate::native::{ProcessInfo, ProcessorHandle};
use crate::output::{Output, OutputFormat, Record, Value};

use super::dispatch::{self, Emit};
use super::{watch, Ctx};

pub async fn run(ctx: &Ctx<'_>, output: &mut Output) -> Result<()> {
    match ctx.args.watch {
        Some(bounds) => watch::run(bounds, output, false, |output| collect(ctx, output, true)).await,
        None => collect(ctx, output, false),
    }
}

fn collect(ctx: &Ctx<'_>, output: &mut Output, watching: bool) -> Result<()> {
    let opts = Emit {
        watching,
        ..Emit::default()
    };
    dispatch::fan_out(ctx, output, &[DeviceClass::Gpu], opts, |ctx, _, handle| processes(ctx, handle))
}

/// Which parts of an entry survive `--general` / `--engine`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Sections {
    mem_usage: bool,
    usage: bool,
    memory_usage: bool,
}

impl Sections {
    fn from_flags(general: bool, engine: bool) -> Self {
        match (general, engine) {
            (false, false) => Sections {
                mem_usage: true,
                usage: true,
                memory_usage: true,
            },
            (general, engine) => Sections {
                mem_usage: general,
                usage: engine,
                memory_usage: false,
            },
        }
    }
}

fn processes(ctx: &Ctx<'_>, handle: ProcessorHandle) -> Result<Vec<Record>> {
    let list = ctx.lib.process_list(handle)?;
    let sections = Sections::from_flags(ctx.args.flag("general"), ctx.args.flag("engine"));
    let pid = ctx.args.one("pid").map(validators::non_negative_int).transpose()?;
    let name = ctx.args.one("name").map(str::to_lowercase);
    let human = ctx.format() == OutputFormat::Human;

    let entries: Vec<Record> = list
        .iter()
        .filter(|info| pid.map_or(true, |pid| u64::from(info.pid) == pid))
        .filter(|info| name.as_ref().map_or(true, |name| info.name.to_lowercase() == *name))
        .map(|info| entry(info, sections, human))
        .collect();

    if entries.is_empty() {
        return Ok(vec![Record::new().with("process_info", AppConfig::NO_PROCESSES)]);
    }
    // CSV prints one row per process.
    if ctx.format() == OutputFormat::Csv {
        return Ok(entries);
    }
    let values = entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| (format!("process_info_{i}"), entry))
        .collect();
    Ok(vec![values])
}

/// Byte count; human output reads `1.5 MB` style sizes.
pub(super) fn bytes(count: u64, human: bool) -> Value {
    if human {
        Value::from(format_size(count, WINDOWS))
    } else {
        Value::with_unit(count, "B")
    }
}

fn entry(info: &ProcessInfo, sections: Sections, human: bool) -> Record {
    let mut record = Record::new()
        .with("name", info.name.as_str())
        .with("pid", info.pid);
    if sections.mem_usage {
        record.insert("mem_usage", bytes(info.mem, human));
    }
    if sections.usage {
        record.insert(
            "usage",
            Record::new()
                .with("gfx", Value::with_unit(info.engine_usage.gfx, "ns"))
                .with("enc", Value::with_unit(info.engine_usage.enc, "ns")),
        );
    }
    if sections.memory_usage {
        let memory = &info.memory_usage;
        record.insert(
            "memory_usage",
            Record::new()
                .with("gtt_mem", bytes(memory.gtt_mem, human))
                .with("cpu_mem", bytes(memory.cpu_mem, human))
                .with("vram_mem", bytes(memory.vram_mem, human)),
        );
    }
    record
}

/// Flat row for the monitor's process table.
pub(super) fn monitor_row(info: &ProcessInfo, human: bool) -> Record {
    Record::new()
        .with("name", info.name.as_str())
        .with("pid", info.pid)
        .with("gtt_mem", bytes(info.memory_usage.gtt_mem, human))
        .with("cpu_mem", bytes(info.memory_usage.cpu_mem, human))
        .with("vram_mem", bytes(info.memory_usage.vram_mem, human))
        .with("mem_usage", bytes(info.mem, human))
        .with("gfx", Value::with_unit(info.engine_usage.gfx, "ns"))
        .with("enc", Value::with_unit(info.engine_usage.enc, "ns"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::{EngineTime, ProcessMemory};

    fn sample() -> ProcessInfo {
        ProcessInfo {
            name: "python3".to_string(),
            pid: 4242,
            mem: 1_572_864,
            engine_usage: EngineTime { gfx: 1_000, enc: 0 },
            memory_usage: ProcessMemory {
                gtt_mem: 2048,
                cpu_mem: 0,
                vram_mem: 1_572_864,
            },
            container_name: String::new(),
        }
    }

    #[test]
    fn test_general_keeps_memory_only() {
        let record = entry(&sample(), Sections::from_flags(true, false), false);
        assert_eq!(record.keys().collect::<Vec<_>>(), vec!["name", "pid", "mem_usage"]);
    }

    #[test]
    fn test_engine_keeps_usage_only() {
        let record = entry(&sample(), Sections::from_flags(false, true), false);
        assert_eq!(record.keys().collect::<Vec<_>>(), vec!["name", "pid", "usage"]);
        let usage = record.get("usage").and_then(Value::as_record).unwrap();
        assert_eq!(usage.get("gfx").unwrap().to_string(), "1000 ns");
    }

    #[test]
    fn test_human_sizes() {
        let record = entry(&sample(), Sections::from_flags(false, false), true);
        let text = record.get("mem_usage").unwrap().to_string();
        assert!(text.contains("MB"), "got {text}");
        assert!(record.contains_key("memory_usage"));
    }
}
