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

//! `reset`: return GPU settings to their defaults.

use crate::error::{DeviceClass, Error, Result};
use crate::native::{NativeResult, PerfLevel, PowerProfile, ProcessorHandle};
use crate::output::{Output, Record, Value};

use super::dispatch::{self, Emit};
use super::field::{applied, tolerant};
use super::Ctx;

pub fn run(ctx: &Ctx<'_>, output: &mut Output) -> Result<()> {
    if !ctx.elevated {
        return Err(Error::PermissionDenied);
    }
    dispatch::fan_out(ctx, output, &[DeviceClass::Gpu], Emit::default(), |ctx, _, handle| {
        Ok(vec![gpu(ctx, handle)?])
    })
}

/// Run `second` only when `first` succeeded.
fn both(first: NativeResult<()>, second: impl FnOnce() -> NativeResult<()>) -> NativeResult<()> {
    first.and_then(|()| second())
}

fn gpu(ctx: &Ctx<'_>, handle: ProcessorHandle) -> Result<Record> {
    let lib = ctx.lib;
    let args = ctx.args;
    let mut record = Record::new();
    let done = |thing: &'static str| move |()| format!("Successfully reset {thing}");

    if args.flag("gpureset") {
        record.insert("gpu_reset", applied("gpu_reset", lib.reset_gpu(handle), done("GPU"))?);
    }
    if args.flag("clocks") {
        let result = both(lib.set_overdrive_level(handle, 0), || {
            lib.set_perf_level(handle, PerfLevel::Auto)
        });
        record.insert("clocks", applied("clocks", result, done("clocks and overdrive"))?);
    }
    if args.flag("fans") {
        record.insert("fans", applied("fans", lib.reset_fan(handle, 0), done("fan speed"))?);
    }
    if args.flag("profile") {
        let result = both(lib.set_power_profile(handle, PowerProfile::BootupDefault), || {
            lib.set_perf_level(handle, PerfLevel::Auto)
        });
        record.insert("profile", applied("profile", result, done("power profile"))?);
    }
    if args.flag("xgmierr") {
        let result = lib.reset_xgmi_error(handle);
        record.insert("xgmierr", applied("xgmi_error", result, done("XGMI error count"))?);
    }
    if args.flag("perf-determinism") {
        let result = lib.set_perf_level(handle, PerfLevel::Auto);
        record.insert(
            "perf_determinism",
            applied("perf_determinism", result, done("performance determinism"))?,
        );
    }
    if args.flag("compute-partition") {
        let result = lib.reset_compute_partition(handle);
        record.insert(
            "compute_partition",
            applied("compute_partition", result, done("compute partition"))?,
        );
    }
    if args.flag("memory-partition") {
        let result = lib.reset_memory_partition(handle);
        record.insert(
            "memory_partition",
            applied("memory_partition", result, done("memory partition"))?,
        );
    }
    if args.flag("power-cap") {
        let value = match tolerant("power_cap_info", lib.power_cap_info(handle, 0)) {
            Some(info) => {
                let result = lib.set_power_cap(handle, 0, info.default_power_cap);
                applied("power_cap", result, |()| {
                    format!("Successfully reset power cap to {} W", info.default_power_cap / 1_000_000)
                })?
            }
            None => Value::na(),
        };
        record.insert("power_cap", value);
    }
    if args.flag("clean-local-data") {
        let result = lib.clean_local_data(handle);
        record.insert(
            "clean_local_data",
            applied("clean_local_data", result, |()| "Successfully cleaned local data".to_string())?,
        );
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::Status;

    #[test]
    fn test_second_step_skipped_after_failure() {
        let mut ran = false;
        let result = both(Err(Status::NotSupported), || {
            ran = true;
            Ok(())
        });
        assert_eq!(result, Err(Status::NotSupported));
        assert!(!ran);
        assert_eq!(both(Ok(()), || Ok(())), Ok(()));
    }
}
