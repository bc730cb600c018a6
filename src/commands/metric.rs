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

//! `metric`: live telemetry for GPUs, CPU sockets and CPU cores.
//!
//! Every group is gathered independently; a failing call only blanks the
//! fields it feeds. PCIe counters are read before anything else because
//! other queries on some ASICs bump the replay and NAK counters.

use crate::cli::validators;
use crate::common::config::AppConfig;
use crate::error::{DeviceClass, Result};
use crate::native::{
    ClockType, GpuBlock, GpuMetrics, MemoryType, MetricValue, ProcessorHandle, TemperatureMetric,
    TemperatureSensor,
};
use crate::output::{Output, Record, Value};

use super::dispatch::{self, Emit};
use super::field::{enabled, field, field_unit, metric, na_record, tolerant};
use super::{watch, Ctx};

const MIB: u64 = 1024 * 1024;

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
    dispatch::fan_out(
        ctx,
        output,
        &[DeviceClass::Gpu, DeviceClass::Cpu, DeviceClass::Core],
        opts,
        |ctx, class, handle| {
            let record = match class {
                DeviceClass::Gpu => gpu(ctx, handle),
                DeviceClass::Cpu => cpu(ctx, handle)?,
                DeviceClass::Core => core(ctx, handle),
            };
            Ok(vec![record])
        },
    )
}

fn gpu(ctx: &Ctx<'_>, handle: ProcessorHandle) -> Record {
    let wants = |id: &str| ctx.wants(DeviceClass::Gpu, id);

    let link = wants("pcie").then(|| pcie(ctx, handle));
    let metrics = tolerant("gpu_metrics", ctx.lib.gpu_metrics(handle));
    let metrics = metrics.as_ref();

    let mut values = Record::new();
    if wants("usage") {
        values.insert("usage", usage(ctx, handle, metrics));
    }
    if wants("power") {
        values.insert("power", power(ctx, handle, metrics));
    }
    if wants("clock") {
        values.insert("clock", clocks(ctx, handle, metrics));
    }
    if wants("temperature") {
        values.insert("temperature", temperatures(ctx, handle));
    }
    if let Some(link) = link {
        values.insert("pcie", link);
    }
    if wants("ecc") {
        values.insert("ecc", ecc(ctx, handle));
    }
    if wants("ecc-blocks") {
        values.insert("ecc_blocks", ecc_blocks(ctx, handle));
    }
    if wants("fan") {
        values.insert("fan", fan(ctx, handle));
    }
    if wants("voltage-curve") {
        values.insert("voltage_curve", voltage_curve(ctx, handle));
    }
    if wants("overdrive") {
        values.insert("overdrive", field_unit("overdrive", ctx.lib.overdrive_level(handle), "%"));
    }
    if wants("perf-level") {
        let level = ctx.lib.perf_level(handle).map(|level| level.name());
        values.insert("perf_level", field("perf_level", level));
    }
    if wants("xgmi-err") {
        let status = ctx.lib.xgmi_error_status(handle).map(|status| status.name());
        values.insert("xgmi_err", field("xgmi_err", status));
    }
    if wants("energy") {
        values.insert("energy", energy(ctx, handle));
    }
    if wants("mem-usage") {
        values.insert("mem_usage", memory(ctx, handle));
    }
    if wants("throttle") {
        values.insert("throttle", throttle(ctx, handle));
    }
    values
}

/// A unitless gpu_metrics counter.
fn count<T: MetricValue>(raw: T) -> Value {
    Value::opt(raw.available())
}

fn percent_list<T: MetricValue>(slots: &[T]) -> Value {
    Value::List(slots.iter().map(|slot| metric(*slot, "%")).collect())
}

fn usage(ctx: &Ctx<'_>, handle: ProcessorHandle, metrics: Option<&GpuMetrics>) -> Record {
    let activity = tolerant("gpu_activity", ctx.lib.gpu_activity(handle));
    let percent = |value: Option<u32>| Value::with_unit(Value::opt(value), "%");

    Record::new()
        .with("gfx_activity", percent(activity.map(|a| a.gfx_activity)))
        .with("umc_activity", percent(activity.map(|a| a.umc_activity)))
        .with("mm_activity", percent(activity.map(|a| a.mm_activity)))
        .with("vcn_activity", metrics.map_or(Value::na(), |m| percent_list(&m.vcn_activity)))
        .with("jpeg_activity", metrics.map_or(Value::na(), |m| percent_list(&m.jpeg_activity)))
}

fn power(ctx: &Ctx<'_>, handle: ProcessorHandle, metrics: Option<&GpuMetrics>) -> Record {
    let info = tolerant("power_info", ctx.lib.power_info(handle));
    let socket_power = info.and_then(|info| {
        info.current_socket_power
            .available()
            .or_else(|| info.average_socket_power.available())
    });
    let volts = |pick: fn(&crate::native::PowerInfo) -> u32| {
        info.as_ref().map_or(Value::na(), |info| metric(pick(info), "mV"))
    };
    let throttle_status = metrics.map_or(Value::na(), |m| {
        Value::from(if m.throttle_status == 0 { "UNTHROTTLED" } else { "THROTTLED" })
    });
    let management = tolerant("power_management", ctx.lib.is_power_management_enabled(handle));

    Record::new()
        .with("socket_power", Value::with_unit(Value::opt(socket_power), "W"))
        .with("gfx_voltage", volts(|info| info.gfx_voltage))
        .with("soc_voltage", volts(|info| info.soc_voltage))
        .with("mem_voltage", volts(|info| info.mem_voltage))
        .with("throttle_status", throttle_status)
        .with("power_management", management.map_or(Value::na(), enabled))
}

/// One clock slot. `locked` is only known for graphics clocks.
fn clock_slot(current: Option<u64>, range: Option<(u32, u32)>, locked: Option<bool>) -> Record {
    let mhz = |value: Option<u64>| Value::with_unit(Value::opt(value), "MHz");
    let deep_sleep = current.map(|clk| enabled(clk <= AppConfig::DEEP_SLEEP_THRESHOLD_MHZ));

    Record::new()
        .with("clk", mhz(current))
        .with("min_clk", mhz(range.map(|(min, _)| u64::from(min))))
        .with("max_clk", mhz(range.map(|(_, max)| u64::from(max))))
        .with("clk_locked", locked.map_or(Value::na(), enabled))
        .with("deep_sleep", Value::opt(deep_sleep))
}

fn clocks(ctx: &Ctx<'_>, handle: ProcessorHandle, metrics: Option<&GpuMetrics>) -> Record {
    let range = |clock: ClockType| {
        tolerant(clock.name(), ctx.lib.clock_info(handle, clock)).map(|info| (info.min_clk, info.max_clk))
    };
    let mut record = Record::new();

    let gfx_range = range(ClockType::Gfx);
    for slot in 0..8 {
        let current = metrics.and_then(|m| m.current_gfxclks[slot].available());
        let locked = metrics.map(|m| (m.gfxclk_lock_status >> slot) & 1 == 1);
        record.insert(format!("gfx_{slot}"), clock_slot(current, gfx_range, locked));
    }

    let mem_current = metrics.and_then(|m| m.current_uclk.available());
    record.insert("mem_0", clock_slot(mem_current, range(ClockType::Mem), None));

    for (name, clock) in [("vclk", ClockType::Vclk0), ("dclk", ClockType::Dclk0)] {
        let clock_range = range(clock);
        let slots = metrics.map(|m| match clock {
            ClockType::Vclk0 => m.current_vclk0s,
            _ => m.current_dclk0s,
        });
        for slot in 0..4 {
            let current = slots.and_then(|slots| slots[slot].available());
            record.insert(format!("{name}_{slot}"), clock_slot(current, clock_range, None));
        }
    }
    record
}

fn temperatures(ctx: &Ctx<'_>, handle: ProcessorHandle) -> Record {
    let sensors = [
        ("edge", TemperatureSensor::Edge),
        ("hotspot", TemperatureSensor::Hotspot),
        ("mem", TemperatureSensor::Vram),
    ];
    sensors
        .into_iter()
        .map(|(key, sensor)| {
            // A zero critical limit means the sensor is not wired up.
            let critical = tolerant(key, ctx.lib.temperature(handle, sensor, TemperatureMetric::Critical));
            let current = match critical {
                Some(0) => None,
                _ => tolerant(key, ctx.lib.temperature(handle, sensor, TemperatureMetric::Current)),
            };
            (key, Value::with_unit(Value::opt(current), "\u{b0}C"))
        })
        .collect()
}

fn pcie(ctx: &Ctx<'_>, handle: ProcessorHandle) -> Record {
    let keys = [
        "width",
        "speed",
        "bandwidth",
        "replay_count",
        "l0_to_recovery_count",
        "replay_roll_over_count",
        "nak_sent_count",
        "nak_received_count",
    ];
    let mut record = match tolerant("pcie_info", ctx.lib.pcie_info(handle)) {
        Some(info) => {
            let m = info.metric;
            Record::new()
                .with("width", count(m.pcie_width))
                .with("speed", Value::with_unit(f64::from(m.pcie_speed) / 1000.0, "GT/s"))
                .with("bandwidth", metric(m.pcie_bandwidth, "Mb/s"))
                .with("replay_count", count(m.pcie_replay_count))
                .with("l0_to_recovery_count", count(m.pcie_l0_to_recovery_count))
                .with("replay_roll_over_count", count(m.pcie_replay_roll_over_count))
                .with("nak_sent_count", count(m.pcie_nak_sent_count))
                .with("nak_received_count", count(m.pcie_nak_received_count))
        }
        None => na_record(&keys),
    };

    let throughput = tolerant("pcie_throughput", ctx.lib.pcie_throughput(handle));
    let rate = |bytes: Option<u64>| {
        let mbits = bytes
            .zip(throughput.map(|t| t.max_pkt_size))
            .map(|(count, size)| packets_to_mib(count, size));
        Value::with_unit(Value::opt(mbits), "Mb/s")
    };
    record.insert("current_bandwidth_sent", rate(throughput.map(|t| t.sent)));
    record.insert("current_bandwidth_received", rate(throughput.map(|t| t.received)));
    record.insert("max_packet_size", Value::opt(throughput.map(|t| t.max_pkt_size)));
    record
}

/// Packet count times packet size in MiB, saturating instead of wrapping.
fn packets_to_mib(count: u64, size: u64) -> u64 {
    count.saturating_mul(size) / MIB
}

fn ecc(ctx: &Ctx<'_>, handle: ProcessorHandle) -> Record {
    let total = tolerant("total_ecc_count", ctx.lib.total_ecc_count(handle));
    let umc = tolerant("umc_ecc_count", ctx.lib.ecc_count(handle, GpuBlock::Umc));
    let cache = |pick: fn(&crate::native::EccCount) -> u64| {
        total
            .as_ref()
            .zip(umc.as_ref())
            .map(|(total, umc)| pick(total).saturating_sub(pick(umc)))
    };

    Record::new()
        .with("total_correctable_count", Value::opt(total.map(|t| t.correctable_count)))
        .with("total_uncorrectable_count", Value::opt(total.map(|t| t.uncorrectable_count)))
        .with("total_deferred_count", Value::opt(total.and_then(|t| t.deferred_count)))
        .with("cache_correctable_count", Value::opt(cache(|c| c.correctable_count)))
        .with("cache_uncorrectable_count", Value::opt(cache(|c| c.uncorrectable_count)))
}

fn ecc_blocks(ctx: &Ctx<'_>, handle: ProcessorHandle) -> Record {
    let enabled_mask = tolerant("ecc_enabled_blocks", ctx.lib.ecc_enabled_blocks(handle));
    GpuBlock::ALL
        .iter()
        .filter(|block| AppConfig::ECC_BLOCK_WHITELIST.contains(&block.name()))
        .filter(|block| enabled_mask.map_or(true, |mask| mask & block.bit() != 0))
        .map(|block| {
            let counts = tolerant(block.name(), ctx.lib.ecc_count(handle, *block));
            let record = Record::new()
                .with("correctable_count", Value::opt(counts.map(|c| c.correctable_count)))
                .with("uncorrectable_count", Value::opt(counts.map(|c| c.uncorrectable_count)))
                .with("deferred_count", Value::opt(counts.and_then(|c| c.deferred_count)));
            (block.name(), record)
        })
        .collect()
}

fn fan(ctx: &Ctx<'_>, handle: ProcessorHandle) -> Record {
    let speed = tolerant("fan_speed", ctx.lib.fan_speed(handle, 0));
    let max = tolerant("fan_speed_max", ctx.lib.fan_speed_max(handle, 0));
    let usage = speed.zip(max).and_then(|(speed, max)| {
        (max > 0).then(|| (speed as f64 / max as f64 * 100.0).round() as i64)
    });

    Record::new()
        .with("speed", Value::opt(speed))
        .with("max", Value::opt(max))
        .with("rpm", field("fan_rpms", ctx.lib.fan_rpms(handle, 0)))
        .with("usage", Value::with_unit(Value::opt(usage), "%"))
}

fn voltage_curve(ctx: &Ctx<'_>, handle: ProcessorHandle) -> Record {
    let curve = tolerant("od_volt_curve", ctx.lib.od_volt_curve(handle));
    (0..AppConfig::VOLTAGE_CURVE_POINTS)
        .map(|point| {
            let value = curve
                .as_ref()
                .and_then(|curve| curve.points.get(point))
                .filter(|p| p.frequency != 0 || p.voltage != 0)
                .map_or(Value::na(), |p| Value::from(format!("{} Mhz {} mV", p.frequency, p.voltage)));
            (format!("voltage_point_{point}"), value)
        })
        .collect()
}

fn energy(ctx: &Ctx<'_>, handle: ProcessorHandle) -> Record {
    let joules = tolerant("energy_count", ctx.lib.energy_count(handle)).map(|count| {
        let micro = count.accumulator as f64 * f64::from(count.counter_resolution);
        (micro / 1_000_000.0 * 1000.0).round() / 1000.0
    });
    Record::new().with("total_energy_consumption", Value::with_unit(Value::opt(joules), "J"))
}

fn memory(ctx: &Ctx<'_>, handle: ProcessorHandle) -> Record {
    let mut record = Record::new();
    for (suffix, kind) in [
        ("vram", MemoryType::Vram),
        ("visible_vram", MemoryType::VisVram),
        ("gtt", MemoryType::Gtt),
    ] {
        let total = tolerant(suffix, ctx.lib.memory_total(handle, kind)).map(|bytes| bytes / MIB);
        let used = tolerant(suffix, ctx.lib.memory_usage(handle, kind)).map(|bytes| bytes / MIB);
        let free = total.zip(used).map(|(total, used)| total.saturating_sub(used));
        let mb = |value: Option<u64>| Value::with_unit(Value::opt(value), "MB");
        record.insert(format!("total_{suffix}"), mb(total));
        record.insert(format!("used_{suffix}"), mb(used));
        record.insert(format!("free_{suffix}"), mb(free));
    }
    record
}

fn throttle(ctx: &Ctx<'_>, handle: ProcessorHandle) -> Record {
    let keys = [
        "accumulation_counter",
        "prochot_violation_status",
        "ppt_violation_status",
        "socket_thermal_violation_status",
        "vr_thermal_violation_status",
        "hbm_thermal_violation_status",
        "prochot_violation_activity",
        "ppt_violation_activity",
        "socket_thermal_violation_activity",
        "vr_thermal_violation_activity",
        "hbm_thermal_violation_activity",
    ];
    let Some(status) = tolerant("violation_status", ctx.lib.violation_status(handle)) else {
        return na_record(&keys);
    };
    let active = |flag: bool| Value::from(if flag { "ACTIVE" } else { "NOT ACTIVE" });
    Record::new()
        .with("accumulation_counter", count(status.acc_counter))
        .with("prochot_violation_status", active(status.active_prochot_thrm))
        .with("ppt_violation_status", active(status.active_ppt_pwr))
        .with("socket_thermal_violation_status", active(status.active_socket_thrm))
        .with("vr_thermal_violation_status", active(status.active_vr_thrm))
        .with("hbm_thermal_violation_status", active(status.active_hbm_thrm))
        .with("prochot_violation_activity", metric(status.per_prochot_thrm, "%"))
        .with("ppt_violation_activity", metric(status.per_ppt_pwr, "%"))
        .with("socket_thermal_violation_activity", metric(status.per_socket_thrm, "%"))
        .with("vr_thermal_violation_activity", metric(status.per_vr_thrm, "%"))
        .with("hbm_thermal_violation_activity", metric(status.per_hbm_thrm, "%"))
}

fn cpu(ctx: &Ctx<'_>, handle: ProcessorHandle) -> Result<Record> {
    let lib = ctx.lib;
    let wants = |id: &str| ctx.wants(DeviceClass::Cpu, id);
    let mut values = Record::new();

    if wants("cpu-power-metrics") {
        values.insert(
            "power_metrics",
            Record::new()
                .with("socket_power", field_unit("socket_power", lib.cpu_socket_power(handle), "mW"))
                .with(
                    "socket_power_limit",
                    field_unit("socket_power_limit", lib.cpu_socket_power_cap(handle), "mW"),
                )
                .with(
                    "socket_max_power_limit",
                    field_unit("socket_max_power_limit", lib.cpu_socket_power_cap_max(handle), "mW"),
                ),
        );
    }
    if wants("cpu-prochot") {
        let status = lib.cpu_prochot_status(handle).map(|status| status != 0);
        let status = tolerant("prochot_status", status).map_or(Value::na(), enabled);
        values.insert("prochot", Record::new().with("prochot_status", status));
    }
    if wants("cpu-freq-metrics") {
        values.insert("freq_metrics", frequencies(ctx, handle));
    }
    if wants("cpu-c0-res") {
        let residency = field_unit("c0_residency", lib.cpu_c0_residency(handle), "%");
        values.insert("c0_residency", Record::new().with("residency", residency));
    }
    if wants("cpu-lclk-dpm-level") {
        if let Some(nbio) = ctx.args.one("cpu-lclk-dpm-level") {
            let nbio = validators::byte(nbio)?;
            let level = tolerant("lclk_dpm_level", lib.cpu_lclk_dpm_level(handle, nbio));
            values.insert(
                "socket_dpm",
                Record::new()
                    .with("nbio_id", nbio)
                    .with("max_dpm_level", Value::opt(level.map(|l| l.max_dpm_level)))
                    .with("min_dpm_level", Value::opt(level.map(|l| l.min_dpm_level))),
            );
        }
    }
    if wants("cpu-pwr-svi-telemetry-rails") {
        let power = field_unit("svi_power", lib.cpu_svi_power(handle), "mW");
        values.insert("svi_power", Record::new().with("power", power));
    }
    for (flag, key, xgmi) in [
        ("cpu-io-bandwidth", "io_bandwidth", false),
        ("cpu-xgmi-bandwidth", "xgmi_bandwidth", true),
    ] {
        if !wants(flag) {
            continue;
        }
        let Some([bw_type, link]) = ctx.args.many(flag) else {
            continue;
        };
        let bw_type = validators::byte(bw_type)?;
        let bandwidth = if xgmi {
            lib.cpu_xgmi_bandwidth(handle, bw_type, link)
        } else {
            lib.cpu_io_bandwidth(handle, bw_type, link)
        };
        values.insert(
            key,
            Record::new()
                .with("bw_type", bw_type)
                .with("link", link.as_str())
                .with("bandwidth", field_unit(key, bandwidth, "Mbps")),
        );
    }
    if wants("cpu-metrics-ver") {
        let version = field("metrics_table_version", lib.cpu_metrics_table_version(handle));
        values.insert("metrics_version", Record::new().with("version", version));
    }
    if wants("cpu-metrics-table") {
        let table = tolerant("metrics_table", lib.cpu_metrics_table(handle)).map_or(Value::na(), |entries| {
            entries
                .into_iter()
                .map(|entry| {
                    let value = if entry.unit.is_empty() {
                        Value::from(entry.value)
                    } else {
                        Value::with_unit(entry.value, &entry.unit)
                    };
                    (entry.name, value)
                })
                .collect::<Record>()
                .into()
        });
        values.insert("metrics_table", table);
    }
    if wants("cpu-socket-energy") {
        let energy = tolerant("socket_energy", lib.cpu_socket_energy(handle))
            .map(|micro| (micro as f64 / 1_000_000.0 * 1000.0).round() / 1000.0);
        values.insert(
            "socket_energy",
            Record::new().with("energy", Value::with_unit(Value::opt(energy), "J")),
        );
    }
    if wants("cpu-ddr-bandwidth") {
        let ddr = tolerant("ddr_bandwidth", lib.cpu_ddr_bandwidth(handle));
        values.insert(
            "ddr_bandwidth",
            Record::new()
                .with("max_ddr_bw", Value::with_unit(Value::opt(ddr.map(|d| d.max_bw)), "GB/s"))
                .with("current_utilized_bw", Value::with_unit(Value::opt(ddr.map(|d| d.utilized_bw)), "GB/s"))
                .with("current_utilized_pct", Value::with_unit(Value::opt(ddr.map(|d| d.utilized_pct)), "%")),
        );
    }
    if wants("cpu-temp") {
        let temperature = field_unit("socket_temperature", lib.cpu_socket_temperature(handle), "\u{b0}C");
        values.insert("cpu_temp", Record::new().with("temperature", temperature));
    }
    values.merge(dimms(ctx, handle)?);
    Ok(values)
}

fn frequencies(ctx: &Ctx<'_>, handle: ProcessorHandle) -> Record {
    let lib = ctx.lib;
    let clocks = tolerant("fclk_mclk", lib.cpu_fclk_mclk(handle));
    let limit = tolerant("current_freq_limit", lib.cpu_current_freq_limit(handle));
    let range = tolerant("socket_freq_range", lib.cpu_socket_freq_range(handle));
    let mhz = |value: Option<u32>| Value::with_unit(Value::opt(value), "MHz");

    Record::new()
        .with(
            "fclkmemclk",
            Record::new()
                .with("fclk", mhz(clocks.map(|(fclk, _)| fclk)))
                .with("mclk", mhz(clocks.map(|(_, mclk)| mclk))),
        )
        .with("cclkfreqlimit", field_unit("cclk_limit", lib.cpu_cclk_limit(handle), "MHz"))
        .with(
            "soc_current_active_freq_limit",
            Record::new()
                .with("freq", mhz(limit.as_ref().map(|l| u32::from(l.freq))))
                .with(
                    "freq_src",
                    limit.map_or(Value::na(), |l| Value::from(l.sources)),
                ),
        )
        .with(
            "soc_freq_range",
            Record::new()
                .with("max_socket_freq", mhz(range.map(|r| u32::from(r.fmax))))
                .with("min_socket_freq", mhz(range.map(|r| u32::from(r.fmin)))),
        )
}

/// DIMM groups; each needs a DIMM address from its flag.
fn dimms(ctx: &Ctx<'_>, handle: ProcessorHandle) -> Result<Record> {
    let lib = ctx.lib;
    let address = |flag: &str| -> Result<Option<u8>> {
        if !ctx.wants(DeviceClass::Cpu, flag) {
            return Ok(None);
        }
        ctx.args.one(flag).map(validators::byte).transpose()
    };
    let mut values = Record::new();

    if let Some(addr) = address("cpu-dimm-temp-range-rate")? {
        let range = tolerant("dimm_temp_range", lib.cpu_dimm_temp_range(handle, addr));
        values.insert(
            "dimm_temp_range_rate",
            Record::new()
                .with("dimm_address", format!("{addr:#x}"))
                .with("temp_range", Value::opt(range.map(|r| r.range)))
                .with("refresh_rate", Value::opt(range.map(|r| r.refresh_rate))),
        );
    }
    if let Some(addr) = address("cpu-dimm-pow-consumption")? {
        let power = tolerant("dimm_power", lib.cpu_dimm_power(handle, addr));
        values.insert(
            "dimm_power_consumption",
            Record::new()
                .with("dimm_address", format!("{addr:#x}"))
                .with("power", Value::with_unit(Value::opt(power.map(|p| p.power)), "mW"))
                .with("update_rate", Value::with_unit(Value::opt(power.map(|p| p.update_rate)), "ms")),
        );
    }
    if let Some(addr) = address("cpu-dimm-thermal-sensor")? {
        let thermal = tolerant("dimm_thermal", lib.cpu_dimm_thermal(handle, addr));
        values.insert(
            "dimm_thermal_sensor",
            Record::new()
                .with("dimm_address", format!("{addr:#x}"))
                .with("sensor", Value::opt(thermal.map(|t| t.sensor)))
                .with("update_rate", Value::with_unit(Value::opt(thermal.map(|t| t.update_rate)), "ms"))
                .with("temperature", Value::with_unit(Value::opt(thermal.map(|t| t.temp)), "\u{b0}C")),
        );
    }
    Ok(values)
}

fn core(ctx: &Ctx<'_>, handle: ProcessorHandle) -> Record {
    let lib = ctx.lib;
    let wants = |id: &str| ctx.wants(DeviceClass::Core, id);
    let mut values = Record::new();

    if wants("core-boost-limit") {
        let limit = field_unit("core_boost_limit", lib.core_boost_limit(handle), "MHz");
        values.insert("boost_limit", limit);
    }
    if wants("core-curr-active-freq-core-limit") {
        let limit = field_unit("core_freq_limit", lib.core_current_freq_limit(handle), "MHz");
        values.insert("curr_active_freq_core_limit", limit);
    }
    if wants("core-energy") {
        let energy = tolerant("core_energy", lib.core_energy(handle))
            .map(|micro| (micro as f64 / 1_000_000.0 * 1000.0).round() / 1000.0);
        values.insert("core_energy", Value::with_unit(Value::opt(energy), "J"));
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packets_to_mib_saturates() {
        assert_eq!(packets_to_mib(2048, 512), 1);
        assert_eq!(packets_to_mib(u64::MAX, 4096), u64::MAX / MIB);
    }

    #[test]
    fn test_clock_slot_deep_sleep_threshold() {
        let slot = clock_slot(Some(140), Some((100, 2100)), Some(true));
        assert_eq!(slot.get("deep_sleep"), Some(&Value::from("ENABLED")));
        assert_eq!(slot.get("clk_locked"), Some(&Value::from("ENABLED")));

        let slot = clock_slot(Some(141), None, None);
        assert_eq!(slot.get("deep_sleep"), Some(&Value::from("DISABLED")));
        assert!(slot.get("clk_locked").is_some_and(Value::is_na));
        assert!(slot.get("min_clk").is_some_and(Value::is_na));
    }

    #[test]
    fn test_unavailable_slot_is_blank() {
        let slot = clock_slot(None, Some((500, 2100)), None);
        assert!(slot.get("clk").is_some_and(Value::is_na));
        assert!(slot.get("deep_sleep").is_some_and(Value::is_na));
        assert_eq!(slot.get("max_clk").map(ToString::to_string).as_deref(), Some("2100 MHz"));
    }

    #[test]
    fn test_percent_list_marks_absent_slots() {
        let list = percent_list(&[6u16, u16::MAX]);
        assert_eq!(list.csv_text(), "[6, N/A]");
    }
}
