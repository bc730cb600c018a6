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

//! `static`: identity, limits and configuration that do not change while
//! the driver is loaded.

use crate::error::{DeviceClass, Result};
use crate::native::{
    vram_type_name, DpmPolicy, GpuBlock, NativeResult, ProcessorHandle, TemperatureMetric,
    TemperatureSensor,
};
use crate::output::{Output, OutputFormat, Record, Value};

use super::dispatch::{self, Emit};
use super::field::{enabled, field, field_unit, hex, na_record, tolerant};
use super::Ctx;

const MICRO: u64 = 1_000_000;

pub fn run(ctx: &Ctx<'_>, output: &mut Output) -> Result<()> {
    dispatch::fan_out(
        ctx,
        output,
        &[DeviceClass::Gpu, DeviceClass::Cpu],
        Emit::default(),
        |ctx, class, handle| {
            let record = match class {
                DeviceClass::Gpu => gpu(ctx, handle),
                _ => cpu(ctx, handle),
            };
            Ok(vec![record])
        },
    )
}

/// Build a group from one native call, or fill `keys` with the sentinel.
fn group<T>(key: &str, result: NativeResult<T>, keys: &[&str], build: impl FnOnce(T) -> Record) -> Record {
    tolerant(key, result).map(build).unwrap_or_else(|| na_record(keys))
}

fn gpu(ctx: &Ctx<'_>, handle: ProcessorHandle) -> Record {
    let lib = ctx.lib;
    let wants = |id: &str| ctx.wants(DeviceClass::Gpu, id);
    let mut values = Record::new();

    if wants("asic") {
        let keys = [
            "market_name",
            "vendor_id",
            "vendor_name",
            "subvendor_id",
            "device_id",
            "subsystem_id",
            "rev_id",
            "asic_serial",
            "oam_id",
            "num_compute_units",
            "target_graphics_version",
        ];
        let asic = group("asic", lib.gpu_asic_info(handle), &keys, |asic| {
            Record::new()
                .with("market_name", asic.market_name)
                .with("vendor_id", hex(asic.vendor_id))
                .with("vendor_name", asic.vendor_name)
                .with("subvendor_id", hex(asic.subvendor_id))
                .with("device_id", hex(asic.device_id))
                .with("subsystem_id", hex(asic.subsystem_id))
                .with("rev_id", hex(asic.rev_id))
                .with("asic_serial", asic.asic_serial)
                .with("oam_id", asic.oam_id)
                .with("num_compute_units", asic.num_compute_units)
                .with("target_graphics_version", asic.target_graphics_version)
        });
        values.insert("asic", asic);
    }

    if wants("bus") {
        let mut bus = Record::new().with("bdf", field("bdf", lib.gpu_bdf(handle).map(|b| b.to_string())));
        let keys = ["max_pcie_width", "max_pcie_speed", "pcie_interface_version", "slot_type"];
        bus.merge(group("bus", lib.pcie_info(handle), &keys, |pcie| {
            let info = pcie.static_info;
            Record::new()
                .with("max_pcie_width", info.max_pcie_width)
                .with(
                    "max_pcie_speed",
                    Value::with_unit(f64::from(info.max_pcie_speed) / 1000.0, "GT/s"),
                )
                .with("pcie_interface_version", format!("Gen {}", info.pcie_interface_version))
                .with("slot_type", info.slot_type.name())
        }));
        values.insert("bus", bus);
    }

    if wants("vbios") {
        let keys = ["name", "build_date", "part_number", "version"];
        let vbios = group("vbios", lib.gpu_vbios_info(handle), &keys, |vbios| {
            Record::new()
                .with("name", vbios.name)
                .with("build_date", vbios.build_date)
                .with("part_number", vbios.part_number)
                .with("version", vbios.version)
        });
        values.insert("vbios", vbios);
    }

    if wants("limit") {
        values.insert("limit", limits(ctx, handle));
    }

    if wants("driver") {
        let driver = group("driver", lib.gpu_driver_info(handle), &["name", "version"], |driver| {
            Record::new().with("name", driver.name).with("version", driver.version)
        });
        values.insert("driver", driver);
    }

    if wants("board") {
        let keys = ["model_number", "product_serial", "fru_id", "product_name", "manufacturer_name"];
        let board = group("board", lib.gpu_board_info(handle), &keys, |board| {
            Record::new()
                .with("model_number", board.model_number)
                .with("product_serial", board.product_serial)
                .with("fru_id", board.fru_id)
                .with("product_name", board.product_name.trim())
                .with("manufacturer_name", board.manufacturer_name)
        });
        values.insert("board", board);
    }

    if wants("ras") {
        values.insert("ras", ras(ctx, handle));
    }

    if wants("partition") {
        let keys = ["compute_partition", "memory_partition", "partition_id"];
        let partition = group("partition", lib.gpu_partition(handle), &keys, |p| {
            Record::new()
                .with("compute_partition", p.compute_partition)
                .with("memory_partition", p.memory_partition)
                .with("partition_id", p.partition_id)
        });
        values.insert("partition", partition);
    }

    if wants("soc-pstate") {
        values.insert("soc_pstate", policy("soc_pstate", lib.soc_pstate(handle)));
    }

    if wants("xgmi-plpd") {
        values.insert("xgmi_plpd", policy("xgmi_plpd", lib.xgmi_plpd(handle)));
    }

    if wants("process-isolation") {
        let isolation = tolerant("process_isolation", lib.process_isolation(handle));
        values.insert("process_isolation", isolation.map_or(Value::na(), |state| enabled(state != 0)));
    }

    if wants("numa") {
        let numa = group("numa", lib.numa_info(handle), &["node", "affinity"], |numa| {
            let node_or_none = |v: i32| if v < 0 { Value::from("NONE") } else { Value::from(v) };
            Record::new()
                .with("node", node_or_none(numa.node))
                .with("affinity", node_or_none(numa.affinity))
        });
        values.insert("numa", numa);
    }

    if wants("vram") {
        let keys = ["type", "vendor", "size", "bit_width"];
        let vram = group("vram", lib.gpu_vram_info(handle), &keys, |vram| {
            let vendor = vram.vendor.replace("PLACEHOLDER", "");
            Record::new()
                .with("type", vram_type_name(vram.vram_type))
                .with("vendor", vendor.trim())
                .with("size", Value::with_unit(vram.size_mb, "MB"))
                .with("bit_width", vram.bit_width)
        });
        values.insert("vram", vram);
    }

    if wants("cache") {
        values.insert("cache", cache(ctx, handle, ctx.format() == OutputFormat::Human));
    }

    values
}

fn limits(ctx: &Ctx<'_>, handle: ProcessorHandle) -> Record {
    let caps = tolerant("power_cap_info", ctx.lib.power_cap_info(handle, 0));
    let watts = |uw: Option<u64>| Value::with_unit(Value::opt(uw.map(|v| v / MICRO)), "W");

    let mut limit = Record::new()
        .with("max_power", watts(caps.map(|c| c.max_power_cap)))
        .with("min_power", watts(caps.map(|c| c.min_power_cap)))
        .with("socket_power", watts(caps.map(|c| c.power_cap)));

    let sensors = [
        ("edge", TemperatureSensor::Edge),
        ("hotspot", TemperatureSensor::Hotspot),
        ("vram", TemperatureSensor::Vram),
    ];
    for (stage, metric) in [("slowdown", TemperatureMetric::Critical), ("shutdown", TemperatureMetric::Emergency)] {
        for (name, sensor) in sensors {
            let key = format!("{stage}_{name}_temperature");
            let value = field_unit(&key, ctx.lib.temperature(handle, sensor, metric), "\u{b0}C");
            limit.insert(key, value);
        }
    }
    limit
}

fn ras(ctx: &Ctx<'_>, handle: ProcessorHandle) -> Record {
    let keys = ["eeprom_version", "parity_schema", "single_bit_schema", "double_bit_schema", "poison_schema"];
    let mut ras = group("ras", ctx.lib.ras_features(handle), &keys, |features| {
        Record::new()
            .with("eeprom_version", hex(features.eeprom_version))
            .with("parity_schema", enabled(features.parity_schema))
            .with("single_bit_schema", enabled(features.single_bit_schema))
            .with("double_bit_schema", enabled(features.double_bit_schema))
            .with("poison_schema", enabled(features.poison_schema))
    });

    let blocks: Record = GpuBlock::ALL
        .iter()
        .map(|block| {
            let state = tolerant(block.name(), ctx.lib.ras_block_state(handle, *block));
            (block.name(), Value::opt(state.map(|s| s.name())))
        })
        .collect();
    ras.insert("ecc_block_state", blocks);
    ras
}

fn policy(key: &str, result: NativeResult<DpmPolicy>) -> Record {
    group(key, result, &["num_supported", "current_id", "policies"], |policy| {
        let policies: Vec<Value> = policy
            .policies
            .iter()
            .map(|(id, description)| {
                Record::new()
                    .with("policy_id", *id)
                    .with("policy_description", description.as_str())
                    .into()
            })
            .collect();
        Record::new()
            .with("num_supported", policy.policies.len())
            .with("current_id", policy.current)
            .with("policies", Value::List(policies))
    })
}

/// Cache entries; the human view keys them `cache_0`, `cache_1`, ... and
/// joins the property list.
fn cache(ctx: &Ctx<'_>, handle: ProcessorHandle, human: bool) -> Value {
    let Some(entries) = tolerant("cache", ctx.lib.gpu_cache_info(handle)) else {
        return Value::na();
    };
    let records = entries.into_iter().map(|entry| {
        let properties = if human {
            Value::from(entry.properties.join(", "))
        } else {
            Value::from(entry.properties)
        };
        Record::new()
            .with("cache_properties", properties)
            .with("cache_size", Value::with_unit(entry.cache_size_kb, "KB"))
            .with("cache_level", entry.cache_level)
            .with("max_num_cu_shared", entry.max_num_cu_shared)
            .with("num_cache_instance", entry.num_cache_instance)
    });

    if human {
        records
            .enumerate()
            .map(|(i, record)| (format!("cache_{i}"), record))
            .collect::<Record>()
            .into()
    } else {
        Value::List(records.map(Value::from).collect())
    }
}

fn cpu(ctx: &Ctx<'_>, handle: ProcessorHandle) -> Record {
    let mut values = Record::new();
    if ctx.wants(DeviceClass::Cpu, "smu") {
        let version = ctx
            .lib
            .cpu_smu_fw_version(handle)
            .map(|v| format!("{}.{}.{}", v.major, v.minor, v.debug));
        values.insert("smu", Record::new().with("fw_version", field("smu_fw_version", version)));
    }
    if ctx.wants(DeviceClass::Cpu, "interface-ver") {
        let proto = field("hsmp_proto_version", ctx.lib.cpu_hsmp_proto_version(handle));
        values.insert("interface_version", Record::new().with("proto_version", proto));
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_group() {
        let policy = policy(
            "soc_pstate",
            Ok(DpmPolicy {
                current: 1,
                policies: vec![(0, "pstate_default".to_string()), (1, "soc_pstate_0".to_string())],
            }),
        );
        assert_eq!(policy.get("num_supported"), Some(&Value::UInt(2)));
        assert_eq!(policy.get("current_id"), Some(&Value::UInt(1)));
    }

    #[test]
    fn test_failed_group_fills_sentinels() {
        let policy = policy("xgmi_plpd", Err(crate::native::Status::NotSupported));
        assert_eq!(policy.keys().collect::<Vec<_>>(), vec!["num_supported", "current_id", "policies"]);
        assert!(policy.iter().all(|(_, v)| v.is_na()));
    }
}
