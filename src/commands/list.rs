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

//! `list` / `discovery`: device identities.

use crate::error::{DeviceClass, Result};
use crate::native::ProcessorHandle;
use crate::output::{Output, OutputFormat, Record, Value};

use super::dispatch::{self, Emit};
use super::field::{field, tolerant};
use super::Ctx;

pub fn run(ctx: &Ctx<'_>, output: &mut Output) -> Result<()> {
    dispatch::fan_out(
        ctx,
        output,
        &[DeviceClass::Gpu, DeviceClass::Cpu],
        Emit::default(),
        |ctx, class, handle| Ok(vec![identity(ctx, class, handle)]),
    )
}

fn identity(ctx: &Ctx<'_>, class: DeviceClass, handle: ProcessorHandle) -> Record {
    if class != DeviceClass::Gpu {
        return Record::new();
    }
    let (bdf_key, uuid_key) = match ctx.format() {
        OutputFormat::Csv => ("gpu_bdf", "gpu_uuid"),
        _ => ("bdf", "uuid"),
    };
    let kfd = tolerant("kfd_info", ctx.lib.gpu_kfd_info(handle));

    Record::new()
        .with(bdf_key, field("bdf", ctx.lib.gpu_bdf(handle).map(|bdf| bdf.to_string())))
        .with(uuid_key, field("uuid", ctx.lib.gpu_uuid(handle)))
        .with("kfd_id", Value::opt(kfd.map(|k| k.kfd_id)))
        .with("node_id", Value::opt(kfd.map(|k| k.node_id)))
        .with("partition_id", Value::opt(kfd.map(|k| k.current_partition_id)))
}
