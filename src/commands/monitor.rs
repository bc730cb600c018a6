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

//! `monitor`: one dense row per GPU, optionally followed by the processes
//! running on the selected GPUs.
//!
//! Column order is fixed so the rows line up with the classic `dmon` view.

use chrono::Utc;

use crate::common::config::AppConfig;
use crate::error::{DeviceClass, Result};
use crate::native::{ClockType, MemoryType, MetricValue, ProcessorHandle, TemperatureMetric, TemperatureSensor};
use crate::output::store::SecondaryTable;
use crate::output::table::render_row;
use crate::output::{Output, OutputFormat, Record, Value};

use super::dispatch::{self, Emit};
use super::field::tolerant;
use super::{process, watch, Ctx};

const MIB: u64 = 1024 * 1024;

/// A column switch and the columns it turns on, in display order.
const GROUPS: &[(&str, &[(&str, &str)])] = &[
    ("power-usage", &[("power_usage", "POWER")]),
    (
        "temperature",
        &[("hotspot_temperature", "GPU_T"), ("memory_temperature", "MEM_T")],
    ),
    ("gfx", &[("gfx", "GFX%"), ("gfx_clock", "GFX_CLK")]),
    ("mem", &[("mem", "MEM%"), ("mem_clock", "MEM_CLK")]),
    ("encoder", &[("encoder", "ENC%"), ("encoder_clock", "ENC_CLK")]),
    ("decoder", &[("decoder", "DEC%"), ("decoder_clock", "DEC_CLK")]),
    (
        "ecc",
        &[
            ("single_bit_ecc", "SINGLE_ECC"),
            ("double_bit_ecc", "DOUBLE_ECC"),
            ("pcie_replay", "PCIE_REPLAY"),
        ],
    ),
    ("vram-usage", &[("vram_used", "VRAM_USED"), ("vram_total", "VRAM_TOTAL")]),
    ("pcie", &[("pcie_bw", "PCIE_BW")]),
];

const PROCESS_HEADER: &[(&str, &str)] = &[
    ("gpu", "GPU"),
    ("name", "NAME"),
    ("pid", "PID"),
    ("gtt_mem", "GTT_MEM"),
    ("cpu_mem", "CPU_MEM"),
    ("vram_mem", "VRAM_MEM"),
    ("mem_usage", "MEM_USAGE"),
    ("gfx", "GFX"),
    ("enc", "ENC"),
];

pub async fn run(ctx: &Ctx<'_>, output: &mut Output) -> Result<()> {
    let columns = Columns::from_args(ctx);
    let human = ctx.format() == OutputFormat::Human;
    match ctx.args.watch {
        Some(bounds) => watch::run(bounds, output, human, |output| collect(ctx, output, &columns, true)).await,
        None => collect(ctx, output, &columns, false),
    }
}

/// Enabled columns in display order.
struct Columns {
    keys: Vec<&'static str>,
    labels: Vec<&'static str>,
    processes: bool,
}

impl Columns {
    /// No column switch means every column.
    fn from_args(ctx: &Ctx<'_>) -> Self {
        Self::select(|flag| ctx.args.flag(flag))
    }

    fn select(given: impl Fn(&str) -> bool) -> Self {
        let any = GROUPS.iter().any(|(flag, _)| given(flag));
        let mut keys = Vec::new();
        let mut labels = Vec::new();
        for (flag, columns) in GROUPS {
            if any && !given(flag) {
                continue;
            }
            for (key, label) in columns.iter() {
                keys.push(*key);
                labels.push(*label);
            }
        }
        Self {
            keys,
            labels,
            processes: given("process"),
        }
    }

    fn enabled(&self, key: &str) -> bool {
        self.keys.contains(&key)
    }

    fn header(&self, timestamp: bool) -> String {
        let mut header = Record::new();
        if timestamp {
            header.insert("timestamp", "TIMESTAMP");
        }
        header.insert("gpu", "GPU");
        for (key, label) in self.keys.iter().zip(&self.labels) {
            header.insert(*key, *label);
        }
        render_row(&header)
    }
}

fn collect(ctx: &Ctx<'_>, output: &mut Output, columns: &Columns, watching: bool) -> Result<()> {
    let human = ctx.format() == OutputFormat::Human;
    let handles: Vec<ProcessorHandle> = dispatch::targets(ctx, &[DeviceClass::Gpu])?
        .into_iter()
        .flat_map(|target| target.handles)
        .collect();

    let rows: Vec<(usize, Record)> = handles
        .iter()
        .map(|handle| (ctx.id(*handle), row(ctx, *handle, columns)))
        .collect();

    if human {
        output.set_table_header(columns.header(watching));
    }
    if columns.processes {
        output.set_primary_key("gpu_data");
        output.add_secondary(processes(ctx, &handles, human, watching));
    }

    let opts = Emit {
        tabular: human,
        timestamp: watching,
        grid: false,
        watching,
    };
    dispatch::emit(output, DeviceClass::Gpu, rows, opts)
}

fn mhz(ctx: &Ctx<'_>, handle: ProcessorHandle, clock: ClockType) -> Value {
    let current = tolerant(clock.name(), ctx.lib.clock_info(handle, clock)).and_then(|info| info.clk.available());
    Value::with_unit(Value::opt(current), "MHz")
}

fn celsius(ctx: &Ctx<'_>, handle: ProcessorHandle, sensor: TemperatureSensor) -> Value {
    let current = tolerant("temperature", ctx.lib.temperature(handle, sensor, TemperatureMetric::Current));
    Value::with_unit(Value::opt(current), "\u{b0}C")
}

fn percent(value: Option<u64>) -> Value {
    Value::with_unit(Value::opt(value), "%")
}

fn megabytes(bytes: Option<u64>) -> Value {
    Value::with_unit(Value::opt(bytes.map(|bytes| bytes / MIB)), "MB")
}

/// Mean over the slots that report a value; absent slots are skipped.
fn average<T: MetricValue>(slots: &[T]) -> Option<u64> {
    let present: Vec<u64> = slots.iter().filter_map(|slot| slot.available()).collect();
    if present.is_empty() {
        return None;
    }
    let total: u64 = present.iter().sum();
    Some((total as f64 / present.len() as f64).round() as u64)
}

fn row(ctx: &Ctx<'_>, handle: ProcessorHandle, columns: &Columns) -> Record {
    let lib = ctx.lib;
    // Replay counters move when other queries run first.
    let link = columns
        .keys
        .iter()
        .any(|key| matches!(*key, "pcie_replay" | "pcie_bw"))
        .then(|| tolerant("pcie_info", lib.pcie_info(handle)))
        .flatten();
    let activity = (columns.enabled("gfx") || columns.enabled("mem"))
        .then(|| tolerant("gpu_activity", lib.gpu_activity(handle)))
        .flatten();
    let ecc = columns
        .enabled("single_bit_ecc")
        .then(|| tolerant("total_ecc_count", lib.total_ecc_count(handle)))
        .flatten();

    let mut record = Record::new();
    for key in &columns.keys {
        let value = match *key {
            "power_usage" => {
                let watts = tolerant("power_info", lib.power_info(handle)).and_then(|info| {
                    info.current_socket_power
                        .available()
                        .or_else(|| info.average_socket_power.available())
                });
                Value::with_unit(Value::opt(watts), "W")
            }
            "hotspot_temperature" => celsius(ctx, handle, TemperatureSensor::Hotspot),
            "memory_temperature" => celsius(ctx, handle, TemperatureSensor::Vram),
            "gfx" => percent(activity.map(|a| u64::from(a.gfx_activity))),
            "gfx_clock" => mhz(ctx, handle, ClockType::Gfx),
            "mem" => percent(activity.map(|a| u64::from(a.umc_activity))),
            "mem_clock" => mhz(ctx, handle, ClockType::Mem),
            "encoder" => {
                let metrics = tolerant("gpu_metrics", lib.gpu_metrics(handle));
                percent(metrics.and_then(|m| average(&m.vcn_activity)))
            }
            "encoder_clock" => mhz(ctx, handle, ClockType::Vclk0),
            // No per-engine decode activity is exposed.
            "decoder" => Value::na(),
            "decoder_clock" => mhz(ctx, handle, ClockType::Dclk0),
            "single_bit_ecc" => Value::opt(ecc.map(|c| c.correctable_count)),
            "double_bit_ecc" => Value::opt(ecc.map(|c| c.uncorrectable_count)),
            "pcie_replay" => Value::opt(link.and_then(|l| l.metric.pcie_replay_count.available())),
            "vram_used" => megabytes(tolerant("vram_used", lib.memory_usage(handle, MemoryType::Vram))),
            "vram_total" => megabytes(tolerant("vram_total", lib.memory_total(handle, MemoryType::Vram))),
            "pcie_bw" => Value::with_unit(
                Value::opt(link.and_then(|l| l.metric.pcie_bandwidth.available())),
                "Mb/s",
            ),
            _ => Value::na(),
        };
        record.insert(*key, value);
    }
    record
}

/// The process list printed after the metric rows. Watch iterations stamp
/// every row so buffered iterations stay distinguishable.
fn processes(ctx: &Ctx<'_>, handles: &[ProcessorHandle], human: bool, watching: bool) -> SecondaryTable {
    let stamp = || {
        let mut row = Record::new();
        if watching {
            row.insert("timestamp", Utc::now().timestamp());
        }
        row
    };
    let mut rows = Vec::new();
    for handle in handles {
        let id = ctx.id(*handle);
        for info in tolerant("process_list", ctx.lib.process_list(*handle)).unwrap_or_default() {
            let mut row = stamp().with("gpu", id);
            row.merge(process::monitor_row(&info, human));
            rows.push(row);
        }
    }
    if rows.is_empty() {
        rows.push(stamp().with("process_info", AppConfig::NO_PROCESSES));
    }
    let mut header = Record::new();
    if watching {
        header.insert("timestamp", "TIMESTAMP");
    }
    header.merge(PROCESS_HEADER.iter().map(|(key, label)| (*key, *label)).collect());
    SecondaryTable {
        title: "PROCESS INFO:".to_string(),
        header: render_row(&header),
        key: "process_list".to_string(),
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_switch_enables_every_column() {
        let columns = Columns::select(|_| false);
        assert_eq!(columns.keys.len(), 17);
        assert_eq!(columns.keys.first(), Some(&"power_usage"));
        assert_eq!(columns.keys.last(), Some(&"pcie_bw"));
        assert!(!columns.processes);
    }

    #[test]
    fn test_switches_keep_fixed_order() {
        let columns = Columns::select(|flag| matches!(flag, "pcie" | "temperature"));
        assert_eq!(
            columns.keys,
            vec!["hotspot_temperature", "memory_temperature", "pcie_bw"]
        );
    }

    #[test]
    fn test_process_switch_alone_keeps_all_columns() {
        let columns = Columns::select(|flag| flag == "process");
        assert_eq!(columns.keys.len(), 17);
        assert!(columns.processes);
    }

    #[test]
    fn test_encoder_average_skips_absent_slots() {
        assert_eq!(average(&[10u16, 20, u16::MAX, u16::MAX]), Some(15));
        assert_eq!(average(&[u16::MAX; 4]), None);
    }

    #[test]
    fn test_header_follows_columns() {
        let columns = Columns::select(|flag| flag == "power-usage");
        assert_eq!(columns.header(false), "GPU  POWER");
        assert!(columns.header(true).starts_with(" TIMESTAMP"));
    }
}
