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

//! `set`: apply device settings.
//!
//! Every given option calls one mutator and leaves a result string under
//! its own key, so successes and failures of one invocation are reported
//! side by side.

use tracing::{debug, info};

use crate::cli::catalogue::{COMPUTE_PARTITIONS, MEMORY_PARTITIONS, PERF_LEVELS, POWER_PROFILES};
use crate::cli::validators;
use crate::error::{DeviceClass, Error, Result};
use crate::native::{PerfLevel, PowerProfile, ProcessorHandle};
use crate::output::{Output, Record, Value};

use super::dispatch::{self, Emit};
use super::field::{applied, tolerant};
use super::Ctx;

const MICROWATTS_PER_WATT: u64 = 1_000_000;

pub fn run(ctx: &Ctx<'_>, output: &mut Output) -> Result<()> {
    if !ctx.elevated {
        return Err(Error::PermissionDenied);
    }
    let classes = [DeviceClass::Gpu, DeviceClass::Cpu, DeviceClass::Core];
    dispatch::fan_out(ctx, output, &classes, Emit::default(), |ctx, class, handle| {
        let record = match class {
            DeviceClass::Gpu => gpu(ctx, handle)?,
            DeviceClass::Cpu => cpu(ctx, handle)?,
            DeviceClass::Core => core(ctx, handle)?,
        };
        Ok(vec![record])
    })
}

fn invalid(token: &str) -> Error {
    Error::InvalidParameterValue(token.to_string())
}

fn u32_value(token: &str) -> Result<u32> {
    let value = validators::non_negative_int(token)?;
    u32::try_from(value).map_err(|_| invalid(token))
}

/// Every value of a multi-value option as a byte.
fn byte_values(values: &[String]) -> Result<Vec<u8>> {
    values.iter().map(|value| validators::byte(value)).collect()
}

fn pair(values: &[String]) -> Result<(u8, u8)> {
    match byte_values(values)?.as_slice() {
        [first, second] => Ok((*first, *second)),
        _ => Err(Error::MissingParameterValue(values.join(" "))),
    }
}

fn gpu(ctx: &Ctx<'_>, handle: ProcessorHandle) -> Result<Record> {
    let lib = ctx.lib;
    let args = ctx.args;
    let mut record = Record::new();

    if let Some(token) = args.one("fan") {
        let speed = validators::fan_speed(token)?;
        let value = applied("fan", lib.set_fan_speed(handle, 0, speed), |()| {
            format!("Successfully set fan speed {speed}")
        })?;
        record.insert("fan", value);
    }
    if let Some(token) = args.one("perf-level") {
        let name = validators::choice(token, PERF_LEVELS)?;
        let level = PerfLevel::from_name(name).ok_or_else(|| invalid(token))?;
        let value = applied("perf_level", lib.set_perf_level(handle, level), |()| {
            format!("Successfully set performance level {name}")
        })?;
        record.insert("perflevel", value);
    }
    if let Some(token) = args.one("profile") {
        let name = validators::choice(token, POWER_PROFILES)?;
        let profile = PowerProfile::from_name(name).ok_or_else(|| invalid(token))?;
        let value = applied("power_profile", lib.set_power_profile(handle, profile), |()| {
            format!("Successfully set profile {name}")
        })?;
        record.insert("profile", value);
    }
    if let Some(token) = args.one("perf-determinism") {
        let sclk_max = validators::non_negative_int(token)?;
        let value = applied("perf_determinism", lib.set_perf_determinism(handle, sclk_max), |()| {
            format!("Successfully enabled performance determinism and set GFX clock frequency to {sclk_max}")
        })?;
        record.insert("perfdeterminism", value);
    }
    if let Some(token) = args.one("compute-partition") {
        let name = validators::choice(token, COMPUTE_PARTITIONS)?;
        let value = applied("compute_partition", lib.set_compute_partition(handle, name), |()| {
            format!("Successfully set compute partition to {name}")
        })?;
        record.insert("computepartition", value);
    }
    if let Some(token) = args.one("memory-partition") {
        let name = validators::choice(token, MEMORY_PARTITIONS)?;
        let value = applied("memory_partition", lib.set_memory_partition(handle, name), |()| {
            format!("Successfully set memory partition to {name}")
        })?;
        record.insert("memorypartition", value);
    }
    if let Some(token) = args.one("power-cap") {
        record.insert("powercap", power_cap(ctx, handle, token)?);
    }
    if let Some(token) = args.one("soc-pstate") {
        let policy = u32_value(token)?;
        let value = applied("soc_pstate", lib.set_soc_pstate(handle, policy), |()| {
            format!("Successfully set the soc pstate policy to {policy}")
        })?;
        record.insert("socpstate", value);
    }
    if let Some(token) = args.one("xgmi-plpd") {
        let policy = u32_value(token)?;
        let value = applied("xgmi_plpd", lib.set_xgmi_plpd(handle, policy), |()| {
            format!("Successfully set the xgmi plpd policy to {policy}")
        })?;
        record.insert("xgmiplpd", value);
    }
    if let Some(token) = args.one("process-isolation") {
        let state = u32_value(token)?;
        let value = applied("process_isolation", lib.set_process_isolation(handle, state), |()| {
            let verb = if state == 1 { "enabled" } else { "disabled" };
            format!("Successfully {verb} process isolation")
        })?;
        record.insert("process_isolation", value);
    }
    if let Some(values) = args.many("clk-limit") {
        let [clock, limit, amount] = values else {
            return Err(Error::MissingParameterValue(values.join(" ")));
        };
        let clock = validators::clock_type(clock)?;
        let limit = validators::clock_limit(limit)?;
        let amount = validators::non_negative_int(amount)?;
        let value = applied("clk_limit", lib.set_clock_limit(handle, clock, limit, amount), |()| {
            format!(
                "Successfully changed {} clock {} frequency to {amount} MHz",
                clock.name(),
                limit.name()
            )
        })?;
        record.insert("clk_limit", value);
    }
    if let Some(values) = args.many("clk-level") {
        let Some((clock, levels)) = values.split_first() else {
            return Err(Error::MissingParameterValue("CLK_TYPE".to_string()));
        };
        let clock = validators::clock_type(clock)?;
        let bitmask = validators::clock_level_bitmask(levels)?;
        let value = applied("clk_level", lib.set_clk_freq(handle, clock, bitmask), |()| {
            format!("Successfully set {} clock frequency levels {}", clock.name(), levels.join(" "))
        })?;
        record.insert("clk_level", value);
    }
    if let Some(token) = args.one("overdrive") {
        let percent = validators::overdrive_percent(token)?;
        let value = applied("overdrive", lib.set_overdrive_level(handle, percent), |()| {
            format!("Successfully set overdrive level to {percent}%")
        })?;
        record.insert("overdrive", value);
    }

    info!("Applied {} GPU setting(s)", record.len());
    Ok(record)
}

/// Range-check the requested cap against what the board accepts.
fn power_cap(ctx: &Ctx<'_>, handle: ProcessorHandle, token: &str) -> Result<Value> {
    let watts = validators::positive_int(token)?;
    let Some(info) = tolerant("power_cap_info", ctx.lib.power_cap_info(handle, 0)) else {
        return Ok(Value::na());
    };
    let min = info.min_power_cap / MICROWATTS_PER_WATT;
    let max = info.max_power_cap / MICROWATTS_PER_WATT;
    if !(min..=max).contains(&watts) {
        debug!("Power cap {watts} W outside {min}..={max} W");
        return Err(invalid(token));
    }
    if info.power_cap / MICROWATTS_PER_WATT == watts {
        return Ok(Value::from(format!("Power cap is already set to {watts} W")));
    }
    applied("power_cap", ctx.lib.set_power_cap(handle, 0, watts * MICROWATTS_PER_WATT), |()| {
        format!("Successfully set power cap to {watts} W")
    })
}

fn cpu(ctx: &Ctx<'_>, handle: ProcessorHandle) -> Result<Record> {
    let lib = ctx.lib;
    let args = ctx.args;
    let mut record = Record::new();

    if let Some(token) = args.one("cpu-pwr-limit") {
        let limit = u32_value(token)?;
        if let Some(max) = tolerant("socket_power_cap_max", lib.cpu_socket_power_cap_max(handle)) {
            if limit > max {
                return Err(invalid(token));
            }
        }
        let value = applied("cpu_power_limit", lib.set_cpu_socket_power_cap(handle, limit), |()| {
            format!("Successfully set the power limit to {limit} mW")
        })?;
        record.insert("cpu_pwr_limit", value);
    }
    if let Some(values) = args.many("cpu-xgmi-link-width") {
        let (min, max) = pair(values)?;
        let value = applied("cpu_xgmi_link_width", lib.set_cpu_xgmi_width(handle, min, max), |()| {
            format!("Successfully set the xgmi link width to {min}-{max}")
        })?;
        record.insert("cpu_xgmi_link_width", value);
    }
    if let Some(values) = args.many("cpu-lclk-dpm-level") {
        let (nbio, min, max) = match byte_values(values)?.as_slice() {
            [nbio, min, max] => (*nbio, *min, *max),
            _ => return Err(Error::MissingParameterValue(values.join(" "))),
        };
        let value = applied("cpu_lclk_dpm_level", lib.set_cpu_lclk_dpm_level(handle, nbio, min, max), |()| {
            format!("Successfully set the lclk dpm level of NBIO {nbio} to {min}-{max}")
        })?;
        record.insert("cpu_lclk_dpm_level", value);
    }
    if let Some(token) = args.one("cpu-pwr-eff-mode") {
        let mode = validators::byte(token)?;
        let value = applied("cpu_pwr_eff_mode", lib.set_cpu_pwr_efficiency_mode(handle, mode), |()| {
            format!("Successfully set the power efficiency mode to {mode}")
        })?;
        record.insert("cpu_pwr_eff_mode", value);
    }
    if let Some(values) = args.many("cpu-gmi3-link-width") {
        let (min, max) = pair(values)?;
        let value = applied("cpu_gmi3_link_width", lib.set_cpu_gmi3_link_width(handle, min, max), |()| {
            format!("Successfully set the gmi3 link width to {min}-{max}")
        })?;
        record.insert("cpu_gmi3_link_width", value);
    }
    if let Some(token) = args.one("cpu-pcie-link-rate") {
        let rate = validators::byte(token)?;
        let value = applied("cpu_pcie_link_rate", lib.set_cpu_pcie_link_rate(handle, rate), |previous| {
            format!("Successfully set the pcie link rate to {rate} (previous mode {previous})")
        })?;
        record.insert("cpu_pcie_link_rate", value);
    }
    if let Some(values) = args.many("cpu-df-pstate-range") {
        let (max, min) = pair(values)?;
        let value = applied("cpu_df_pstate_range", lib.set_cpu_df_pstate_range(handle, max, min), |()| {
            format!("Successfully set the df pstate range to {max}-{min}")
        })?;
        record.insert("cpu_df_pstate_range", value);
    }
    if args.flag("cpu-enable-apb") {
        let value = applied("cpu_enable_apb", lib.cpu_apb_enable(handle), |()| {
            "Successfully enabled the DF pstate performance boost algorithm".to_string()
        })?;
        record.insert("cpu_enable_apb", value);
    }
    if let Some(token) = args.one("cpu-disable-apb") {
        let pstate = validators::byte(token)?;
        let value = applied("cpu_disable_apb", lib.cpu_apb_disable(handle, pstate), |()| {
            format!("Successfully disabled the DF pstate performance boost algorithm at pstate {pstate}")
        })?;
        record.insert("cpu_disable_apb", value);
    }
    if let Some(token) = args.one("soc-boost-limit") {
        let limit = u32_value(token)?;
        let value = applied("soc_boost_limit", lib.set_cpu_socket_boost_limit(handle, limit), |()| {
            format!("Successfully set the socket boost limit to {limit} MHz")
        })?;
        record.insert("soc_boost_limit", value);
    }
    Ok(record)
}

fn core(ctx: &Ctx<'_>, handle: ProcessorHandle) -> Result<Record> {
    let mut record = Record::new();
    if let Some(token) = ctx.args.one("core-boost-limit") {
        let limit = u32_value(token)?;
        let value = applied("core_boost_limit", ctx.lib.set_core_boost_limit(handle, limit), |()| {
            format!("Successfully set the core boost limit to {limit} MHz")
        })?;
        record.insert("core_boost_limit", value);
    }
    Ok(record)
}
