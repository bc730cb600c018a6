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

use crate::device::Bdf;
use crate::native::*;

use super::constants::*;
use super::events::SimulatedEventReader;
use super::SimulatedLibrary;

const MB: u64 = 1024 * 1024;

fn temps_for(sensor: TemperatureSensor) -> Option<(i64, i64, i64)> {
    match sensor {
        TemperatureSensor::Edge => Some(EDGE_TEMPS),
        TemperatureSensor::Hotspot => Some(HOTSPOT_TEMPS),
        TemperatureSensor::Vram => Some(VRAM_TEMPS),
        _ => None,
    }
}

fn clock_for(clock: ClockType) -> Option<ClockInfo> {
    let (clk, min_clk, max_clk) = match clock {
        ClockType::Gfx => (u32::from(GFX_CLOCK_SLOTS[0]), 500, 2100),
        ClockType::Mem => (u32::from(UCLK_MHZ), 900, 1300),
        ClockType::Soc => (1100, 28, 1143),
        ClockType::Vclk0 | ClockType::Vclk1 => (u32::from(VCLK_MHZ), 914, 1333),
        ClockType::Dclk0 | ClockType::Dclk1 => (u32::from(DCLK_MHZ), 711, 1143),
        ClockType::Df => (1400, 1200, 1400),
        ClockType::Dcef | ClockType::Pcie => return None,
    };
    Some(ClockInfo {
        clk,
        min_clk,
        max_clk,
        clk_locked: false,
        clk_deep_sleep: u64::from(clk) <= 140,
    })
}

impl SmiLibrary for SimulatedLibrary {
    fn init(&self, flags: InitFlags) -> NativeResult<()> {
        self.guard("init")?;
        let wants_gpus = flags.contains(InitFlags::AMD_GPUS);
        let wants_cpus = flags.contains(InitFlags::AMD_CPUS);
        if (wants_gpus && !self.has_gpus()) || (wants_cpus && !self.has_cpus()) {
            return Err(Status::InitError);
        }
        Ok(())
    }

    fn shut_down(&self) -> NativeResult<()> {
        self.guard("shut_down")
    }

    fn socket_handles(&self) -> NativeResult<Vec<SocketHandle>> {
        self.guard("socket_handles")?;
        Ok(self.socket_list())
    }

    fn processor_handles(&self, socket: SocketHandle) -> NativeResult<Vec<ProcessorHandle>> {
        self.guard("processor_handles")?;
        self.socket_members(socket)
    }

    fn processor_type(&self, handle: ProcessorHandle) -> NativeResult<ProcessorType> {
        self.guard("processor_type")?;
        if self.gpu_index(handle).is_ok() {
            Ok(ProcessorType::AmdGpu)
        } else if self.cpu_index(handle).is_ok() {
            Ok(ProcessorType::AmdCpu)
        } else if self.core_index(handle).is_ok() {
            Ok(ProcessorType::AmdCpuCore)
        } else {
            Err(Status::Inval)
        }
    }

    fn processor_handle_from_bdf(&self, bdf: &Bdf) -> NativeResult<ProcessorHandle> {
        self.guard("processor_handle_from_bdf")?;
        (0..self.gpu_count())
            .map(SimulatedLibrary::gpu_handle)
            .find(|h| self.sim_gpu(*h).map(|g| g.bdf == *bdf).unwrap_or(false))
            .ok_or(Status::NotFound)
    }

    fn lib_version(&self) -> NativeResult<LibVersion> {
        self.guard("lib_version")?;
        Ok(self.version.clone())
    }

    fn gpu_bdf(&self, handle: ProcessorHandle) -> NativeResult<Bdf> {
        self.guard("gpu_bdf")?;
        Ok(self.sim_gpu(handle)?.bdf)
    }

    fn gpu_uuid(&self, handle: ProcessorHandle) -> NativeResult<String> {
        self.guard("gpu_uuid")?;
        Ok(self.sim_gpu(handle)?.uuid.clone())
    }

    fn gpu_kfd_info(&self, handle: ProcessorHandle) -> NativeResult<KfdInfo> {
        self.guard("gpu_kfd_info")?;
        let index = self.gpu_index(handle)?;
        Ok(KfdInfo {
            kfd_id: 45_412 + index as u64 * 8_000,
            node_id: index as u32 + 2,
            current_partition_id: 0,
        })
    }

    fn gpu_asic_info(&self, handle: ProcessorHandle) -> NativeResult<AsicInfo> {
        self.guard("gpu_asic_info")?;
        let index = self.gpu_index(handle)?;
        Ok(AsicInfo {
            market_name: DEFAULT_AMD_GPU_NAME.to_string(),
            vendor_id: AMD_VENDOR_ID,
            vendor_name: DEFAULT_AMD_VENDOR_NAME.to_string(),
            subvendor_id: AMD_VENDOR_ID,
            device_id: MI300X_DEVICE_ID,
            subsystem_id: MI300X_DEVICE_ID as u32,
            rev_id: 0,
            asic_serial: format!("0x{:016X}", 0x5E29_1B1A_0000_0000u64 + index as u64),
            oam_id: index as u32,
            num_compute_units: MI300X_COMPUTE_UNITS,
            target_graphics_version: DEFAULT_TARGET_GRAPHICS_VERSION.to_string(),
        })
    }

    fn gpu_board_info(&self, handle: ProcessorHandle) -> NativeResult<BoardInfo> {
        self.guard("gpu_board_info")?;
        let index = self.gpu_index(handle)?;
        Ok(BoardInfo {
            model_number: "102-G30211-0C".to_string(),
            product_serial: format!("69225100{:04}", 1124 + index),
            fru_id: "113-AMDG302110C-D01".to_string(),
            product_name: DEFAULT_AMD_BOARD_NAME.to_string(),
            manufacturer_name: "AMD".to_string(),
        })
    }

    fn gpu_driver_info(&self, handle: ProcessorHandle) -> NativeResult<DriverInfo> {
        self.guard("gpu_driver_info")?;
        self.gpu_index(handle)?;
        Ok(DriverInfo {
            name: "amdgpu".to_string(),
            version: DEFAULT_AMD_DRIVER_VERSION.to_string(),
            date: "2015/01/01 00:00".to_string(),
        })
    }

    fn gpu_vbios_info(&self, handle: ProcessorHandle) -> NativeResult<VbiosInfo> {
        self.guard("gpu_vbios_info")?;
        self.gpu_index(handle)?;
        Ok(VbiosInfo {
            name: "AMD MI300X_HW_SRIOV_CVS_1VF".to_string(),
            build_date: "2023/05/31 15:38".to_string(),
            part_number: "113-M3000100-102".to_string(),
            version: DEFAULT_AMD_VBIOS_VERSION.to_string(),
        })
    }

    fn gpu_vram_info(&self, handle: ProcessorHandle) -> NativeResult<VramInfo> {
        self.guard("gpu_vram_info")?;
        Ok(self.sim_gpu(handle)?.vram.clone())
    }

    fn gpu_cache_info(&self, handle: ProcessorHandle) -> NativeResult<Vec<CacheInfo>> {
        self.guard("gpu_cache_info")?;
        self.gpu_index(handle)?;
        let props = |list: &[&str]| list.iter().map(|p| p.to_string()).collect();
        Ok(vec![
            CacheInfo {
                cache_level: 1,
                cache_size_kb: 32,
                properties: props(&["DATA_CACHE", "SIMD_CACHE"]),
                max_num_cu_shared: 1,
                num_cache_instance: MI300X_COMPUTE_UNITS,
            },
            CacheInfo {
                cache_level: 2,
                cache_size_kb: 4096,
                properties: props(&["DATA_CACHE", "SIMD_CACHE"]),
                max_num_cu_shared: 38,
                num_cache_instance: 8,
            },
            CacheInfo {
                cache_level: 3,
                cache_size_kb: 262_144,
                properties: props(&["DATA_CACHE", "SIMD_CACHE"]),
                max_num_cu_shared: MI300X_COMPUTE_UNITS,
                num_cache_instance: 1,
            },
        ])
    }

    fn power_cap_info(&self, handle: ProcessorHandle, _sensor: u32) -> NativeResult<PowerCapInfo> {
        self.guard("power_cap_info")?;
        let index = self.gpu_index(handle)?;
        let power_cap = self.lock_state()[index].power_cap;
        Ok(PowerCapInfo {
            power_cap,
            default_power_cap: POWER_CAP_UW,
            dpm_cap: 0,
            min_power_cap: 0,
            max_power_cap: POWER_CAP_UW,
        })
    }

    fn gpu_partition(&self, handle: ProcessorHandle) -> NativeResult<PartitionInfo> {
        self.guard("gpu_partition")?;
        let index = self.gpu_index(handle)?;
        let state = self.lock_state();
        Ok(PartitionInfo {
            compute_partition: state[index].compute_partition.clone(),
            memory_partition: state[index].memory_partition.clone(),
            partition_id: 0,
        })
    }

    fn soc_pstate(&self, handle: ProcessorHandle) -> NativeResult<DpmPolicy> {
        self.guard("soc_pstate")?;
        let index = self.gpu_index(handle)?;
        Ok(DpmPolicy {
            current: self.lock_state()[index].soc_pstate,
            policies: vec![
                (0, "pstate_default".to_string()),
                (1, "soc_pstate_0".to_string()),
                (2, "soc_pstate_1".to_string()),
                (3, "soc_pstate_2".to_string()),
            ],
        })
    }

    fn xgmi_plpd(&self, handle: ProcessorHandle) -> NativeResult<DpmPolicy> {
        self.guard("xgmi_plpd")?;
        let index = self.gpu_index(handle)?;
        Ok(DpmPolicy {
            current: self.lock_state()[index].xgmi_plpd,
            policies: vec![
                (0, "plpd_disallow".to_string()),
                (1, "plpd_default".to_string()),
                (2, "plpd_optimized".to_string()),
            ],
        })
    }

    fn process_isolation(&self, handle: ProcessorHandle) -> NativeResult<u32> {
        self.guard("process_isolation")?;
        let index = self.gpu_index(handle)?;
        Ok(self.lock_state()[index].process_isolation)
    }

    fn ras_features(&self, handle: ProcessorHandle) -> NativeResult<RasFeatures> {
        self.guard("ras_features")?;
        self.gpu_index(handle)?;
        Ok(RasFeatures {
            eeprom_version: 0x10000,
            parity_schema: false,
            single_bit_schema: true,
            double_bit_schema: true,
            poison_schema: true,
        })
    }

    fn ras_block_state(&self, handle: ProcessorHandle, block: GpuBlock) -> NativeResult<RasState> {
        self.guard("ras_block_state")?;
        let enabled = self.ecc_enabled_blocks(handle)?;
        Ok(if enabled & block.bit() != 0 {
            RasState::Enabled
        } else {
            RasState::Disabled
        })
    }

    fn numa_info(&self, handle: ProcessorHandle) -> NativeResult<NumaInfo> {
        self.guard("numa_info")?;
        let index = self.gpu_index(handle)?;
        let node = if index < 4 { 0 } else { 1 };
        Ok(NumaInfo {
            node,
            affinity: node,
        })
    }

    fn fw_info(&self, handle: ProcessorHandle) -> NativeResult<Vec<FwEntry>> {
        self.guard("fw_info")?;
        self.gpu_index(handle)?;
        let entry = |id: &str, version: u64| FwEntry {
            fw_id: id.to_string(),
            fw_version: version,
        };
        Ok(vec![
            entry("CP_MEC1", 0x9E),
            entry("CP_MEC2", 0x9E),
            entry("RLC", 0x0C),
            entry("SDMA0", 0x13),
            entry("VCN", 0x0E01_1000),
            entry("PSP_SOSDRV", 0x0021_0037),
            entry("SMC", 0x0055_5A00),
        ])
    }

    fn fw_error_records(&self, handle: ProcessorHandle) -> NativeResult<Vec<FwErrorRecord>> {
        self.guard("fw_error_records")?;
        self.gpu_index(handle)?;
        Ok(vec![
            FwErrorRecord {
                fw_id: "PSP_SOSDRV".to_string(),
                error_count: 0,
            },
            FwErrorRecord {
                fw_id: "SMC".to_string(),
                error_count: 0,
            },
        ])
    }

    fn gpu_activity(&self, handle: ProcessorHandle) -> NativeResult<EngineActivity> {
        self.guard("gpu_activity")?;
        self.gpu_index(handle)?;
        Ok(EngineActivity {
            gfx_activity: 35,
            umc_activity: 12,
            mm_activity: 0,
        })
    }

    fn gpu_metrics(&self, handle: ProcessorHandle) -> NativeResult<GpuMetrics> {
        self.guard("gpu_metrics")?;
        let index = self.gpu_index(handle)?;
        let mut jpeg_activity = [u16::MAX; 32];
        jpeg_activity[..4].copy_from_slice(&[0, 0, 0, 0]);
        Ok(GpuMetrics {
            temperature_edge: EDGE_TEMPS.0 as u16,
            temperature_hotspot: HOTSPOT_TEMPS.0 as u16,
            temperature_mem: VRAM_TEMPS.0 as u16,
            average_socket_power: u16::MAX,
            current_socket_power: CURRENT_SOCKET_POWER_W as u16,
            energy_accumulator: 21_535_146_287 + index as u64,
            average_gfx_activity: 35,
            average_umc_activity: 12,
            vcn_activity: [6, 2, u16::MAX, u16::MAX],
            jpeg_activity,
            current_gfxclks: GFX_CLOCK_SLOTS,
            current_uclk: UCLK_MHZ,
            current_vclk0s: [VCLK_MHZ; 4],
            current_dclk0s: [DCLK_MHZ; 4],
            gfxclk_lock_status: 0b0000_0011,
            throttle_status: self.throttle_status,
            current_fan_speed: u16::MAX,
            pcie_link_width: 16,
            pcie_link_speed: 320,
            pcie_bandwidth_inst: 21,
            pcie_replay_count_acc: 0,
            xgmi_link_width: 16,
            xgmi_link_speed: 32,
            xgmi_read_data_acc: [1024; 8],
            xgmi_write_data_acc: [2048; 8],
        })
    }

    fn temperature(
        &self,
        handle: ProcessorHandle,
        sensor: TemperatureSensor,
        metric: TemperatureMetric,
    ) -> NativeResult<i64> {
        self.guard("temperature")?;
        self.gpu_index(handle)?;
        let (current, critical, emergency) = temps_for(sensor).ok_or(Status::NotSupported)?;
        match metric {
            TemperatureMetric::Current => Ok(current),
            TemperatureMetric::Critical => Ok(critical),
            TemperatureMetric::Emergency => Ok(emergency),
            _ => Err(Status::NotSupported),
        }
    }

    fn fan_rpms(&self, handle: ProcessorHandle, _sensor: u32) -> NativeResult<i64> {
        self.guard("fan_rpms")?;
        self.gpu_index(handle)?;
        Ok(FAN_RPM)
    }

    fn fan_speed(&self, handle: ProcessorHandle, _sensor: u32) -> NativeResult<i64> {
        self.guard("fan_speed")?;
        let index = self.gpu_index(handle)?;
        Ok(self.lock_state()[index].fan_speed)
    }

    fn fan_speed_max(&self, handle: ProcessorHandle, _sensor: u32) -> NativeResult<u64> {
        self.guard("fan_speed_max")?;
        self.gpu_index(handle)?;
        Ok(FAN_SPEED_MAX)
    }

    fn power_info(&self, handle: ProcessorHandle) -> NativeResult<PowerInfo> {
        self.guard("power_info")?;
        self.gpu_index(handle)?;
        Ok(PowerInfo {
            current_socket_power: CURRENT_SOCKET_POWER_W,
            average_socket_power: u32::MAX,
            gfx_voltage: 900,
            soc_voltage: 800,
            mem_voltage: 1100,
            power_limit: (POWER_CAP_UW / 1_000_000) as u32,
        })
    }

    fn is_power_management_enabled(&self, handle: ProcessorHandle) -> NativeResult<bool> {
        self.guard("is_power_management_enabled")?;
        self.gpu_index(handle)?;
        Ok(self.power_management)
    }

    fn clock_info(&self, handle: ProcessorHandle, clock: ClockType) -> NativeResult<ClockInfo> {
        self.guard("clock_info")?;
        self.gpu_index(handle)?;
        clock_for(clock).ok_or(Status::NotSupported)
    }

    fn pcie_info(&self, handle: ProcessorHandle) -> NativeResult<PcieInfo> {
        self.guard("pcie_info")?;
        self.gpu_index(handle)?;
        Ok(PcieInfo {
            static_info: PcieStatic {
                max_pcie_width: 16,
                max_pcie_speed: 32_000,
                pcie_interface_version: 5,
                slot_type: SlotType::Oam,
            },
            metric: PcieMetric {
                pcie_width: 16,
                pcie_speed: 32_000,
                pcie_bandwidth: 1_200,
                pcie_replay_count: 0,
                pcie_l0_to_recovery_count: 0,
                pcie_replay_roll_over_count: 0,
                pcie_nak_sent_count: 0,
                pcie_nak_received_count: 0,
            },
        })
    }

    fn pcie_throughput(&self, handle: ProcessorHandle) -> NativeResult<PcieThroughput> {
        self.guard("pcie_throughput")?;
        self.gpu_index(handle)?;
        Ok(PcieThroughput {
            sent: 8_192,
            received: 4_096,
            max_pkt_size: 256,
        })
    }

    fn total_ecc_count(&self, handle: ProcessorHandle) -> NativeResult<EccCount> {
        self.guard("total_ecc_count")?;
        self.gpu_index(handle)?;
        Ok(EccCount {
            correctable_count: 4,
            uncorrectable_count: 1,
            deferred_count: Some(0),
        })
    }

    fn ecc_count(&self, handle: ProcessorHandle, block: GpuBlock) -> NativeResult<EccCount> {
        self.guard("ecc_count")?;
        self.gpu_index(handle)?;
        let (correctable_count, uncorrectable_count) = match block {
            GpuBlock::Umc => (3, 1),
            GpuBlock::Gfx => (1, 0),
            _ => (0, 0),
        };
        Ok(EccCount {
            correctable_count,
            uncorrectable_count,
            deferred_count: Some(0),
        })
    }

    fn ecc_enabled_blocks(&self, handle: ProcessorHandle) -> NativeResult<u64> {
        self.guard("ecc_enabled_blocks")?;
        self.gpu_index(handle)?;
        Ok([
            GpuBlock::Umc,
            GpuBlock::Sdma,
            GpuBlock::Gfx,
            GpuBlock::Mmhub,
            GpuBlock::PcieBif,
            GpuBlock::Hdp,
            GpuBlock::XgmiWafl,
        ]
        .iter()
        .fold(0, |mask, block| mask | block.bit()))
    }

    fn bad_pages(&self, handle: ProcessorHandle) -> NativeResult<Vec<BadPage>> {
        self.guard("bad_pages")?;
        Ok(self.sim_gpu(handle)?.bad_pages.clone())
    }

    fn od_volt_curve(&self, handle: ProcessorHandle) -> NativeResult<OdVoltCurve> {
        self.guard("od_volt_curve")?;
        self.gpu_index(handle)?;
        Ok(OdVoltCurve {
            points: vec![
                VoltCurvePoint {
                    frequency: 500,
                    voltage: 650,
                },
                VoltCurvePoint {
                    frequency: 1300,
                    voltage: 780,
                },
                VoltCurvePoint {
                    frequency: 0,
                    voltage: 0,
                },
            ],
        })
    }

    fn perf_level(&self, handle: ProcessorHandle) -> NativeResult<PerfLevel> {
        self.guard("perf_level")?;
        let index = self.gpu_index(handle)?;
        Ok(self.lock_state()[index].perf_level)
    }

    fn overdrive_level(&self, handle: ProcessorHandle) -> NativeResult<u32> {
        self.guard("overdrive_level")?;
        let index = self.gpu_index(handle)?;
        Ok(self.lock_state()[index].overdrive)
    }

    fn energy_count(&self, handle: ProcessorHandle) -> NativeResult<EnergyCount> {
        self.guard("energy_count")?;
        let index = self.gpu_index(handle)?;
        Ok(EnergyCount {
            accumulator: 21_535_146 + index as u64,
            counter_resolution: 15.3,
            timestamp: 1_700_000_000_000,
        })
    }

    fn xgmi_error_status(&self, handle: ProcessorHandle) -> NativeResult<XgmiStatus> {
        self.guard("xgmi_error_status")?;
        self.gpu_index(handle)?;
        Ok(XgmiStatus::NoErrors)
    }

    fn memory_total(&self, handle: ProcessorHandle, kind: MemoryType) -> NativeResult<u64> {
        self.guard("memory_total")?;
        let gpu = self.sim_gpu(handle)?;
        Ok(match kind {
            MemoryType::Vram | MemoryType::VisVram => gpu.vram.size_mb * MB,
            MemoryType::Gtt => GTT_SIZE_MB * MB,
        })
    }

    fn memory_usage(&self, handle: ProcessorHandle, kind: MemoryType) -> NativeResult<u64> {
        self.guard("memory_usage")?;
        self.gpu_index(handle)?;
        Ok(match kind {
            MemoryType::Vram | MemoryType::VisVram => VRAM_USED_MB * MB,
            MemoryType::Gtt => GTT_USED_MB * MB,
        })
    }

    fn violation_status(&self, handle: ProcessorHandle) -> NativeResult<ViolationStatus> {
        self.guard("violation_status")?;
        self.gpu_index(handle)?;
        let throttled = self.throttle_status != 0;
        Ok(ViolationStatus {
            acc_counter: 1_024,
            per_ppt_pwr: if throttled { 5 } else { 0 },
            active_ppt_pwr: throttled,
            ..ViolationStatus::default()
        })
    }

    fn process_list(&self, handle: ProcessorHandle) -> NativeResult<Vec<ProcessInfo>> {
        self.guard("process_list")?;
        Ok(self.sim_gpu(handle)?.processes.clone())
    }

    fn topo_link_type(&self, src: ProcessorHandle, dst: ProcessorHandle) -> NativeResult<(u64, LinkType)> {
        self.guard("topo_link_type")?;
        let (a, b) = (self.gpu_index(src)?, self.gpu_index(dst)?);
        if a == b {
            return Ok((0, LinkType::Unknown));
        }
        if self.xgmi {
            Ok((1, LinkType::Xgmi))
        } else {
            let same_node = self.numa_info(src)?.node == self.numa_info(dst)?.node;
            Ok((if same_node { 2 } else { 3 }, LinkType::Pcie))
        }
    }

    fn topo_link_weight(&self, src: ProcessorHandle, dst: ProcessorHandle) -> NativeResult<u64> {
        self.guard("topo_link_weight")?;
        let (hops, link) = self.topo_link_type(src, dst)?;
        Ok(match link {
            LinkType::Xgmi => 15,
            LinkType::Pcie => 20 * hops,
            LinkType::Unknown => 0,
        })
    }

    fn minmax_bandwidth(&self, src: ProcessorHandle, dst: ProcessorHandle) -> NativeResult<(u64, u64)> {
        self.guard("minmax_bandwidth")?;
        match self.topo_link_type(src, dst)?.1 {
            LinkType::Xgmi => Ok((50_000, 100_000)),
            _ => Err(Status::NotSupported),
        }
    }

    fn is_p2p_accessible(&self, src: ProcessorHandle, dst: ProcessorHandle) -> NativeResult<bool> {
        self.guard("is_p2p_accessible")?;
        self.gpu_index(src)?;
        self.gpu_index(dst)?;
        Ok(true)
    }

    fn p2p_status(&self, src: ProcessorHandle, dst: ProcessorHandle) -> NativeResult<P2pCaps> {
        self.guard("p2p_status")?;
        let xgmi = self.topo_link_type(src, dst)?.1 == LinkType::Xgmi;
        Ok(P2pCaps {
            coherent: xgmi,
            atomics_32bit: true,
            atomics_64bit: xgmi,
            dma: true,
            bi_directional: true,
        })
    }

    fn xgmi_link_info(&self, handle: ProcessorHandle) -> NativeResult<XgmiLinkInfo> {
        self.guard("xgmi_link_info")?;
        let own = self.gpu_index(handle)?;
        if !self.xgmi {
            return Err(Status::NotSupported);
        }
        let links = (0..self.gpu_count())
            .filter(|peer| *peer != own)
            .filter_map(|peer| self.sim_gpu(SimulatedLibrary::gpu_handle(peer)).ok())
            .enumerate()
            .map(|(n, peer)| LinkMetric {
                bdf: peer.bdf,
                bit_rate: 32,
                max_bandwidth: 512,
                link_type: LinkType::Xgmi,
                read: 1_024 * (n as u64 + 1),
                write: 2_048 * (n as u64 + 1),
            })
            .collect();
        Ok(XgmiLinkInfo {
            bit_rate: 32,
            max_width: 16,
            links,
        })
    }

    // Mutators

    fn set_fan_speed(&self, handle: ProcessorHandle, _sensor: u32, speed: u64) -> NativeResult<()> {
        self.guard("set_fan_speed")?;
        let index = self.gpu_index(handle)?;
        if speed > FAN_SPEED_MAX {
            return Err(Status::Inval);
        }
        self.lock_state()[index].fan_speed = speed as i64;
        Ok(())
    }

    fn reset_fan(&self, handle: ProcessorHandle, _sensor: u32) -> NativeResult<()> {
        self.guard("reset_fan")?;
        let index = self.gpu_index(handle)?;
        self.lock_state()[index].fan_speed = FAN_SPEED;
        Ok(())
    }

    fn set_perf_level(&self, handle: ProcessorHandle, level: PerfLevel) -> NativeResult<()> {
        self.guard("set_perf_level")?;
        let index = self.gpu_index(handle)?;
        self.lock_state()[index].perf_level = level;
        Ok(())
    }

    fn set_power_profile(&self, handle: ProcessorHandle, _profile: PowerProfile) -> NativeResult<()> {
        self.guard("set_power_profile")?;
        self.gpu_index(handle)?;
        Ok(())
    }

    fn set_overdrive_level(&self, handle: ProcessorHandle, percent: u32) -> NativeResult<()> {
        self.guard("set_overdrive_level")?;
        let index = self.gpu_index(handle)?;
        if percent > 20 {
            return Err(Status::Inval);
        }
        self.lock_state()[index].overdrive = percent;
        Ok(())
    }

    fn set_perf_determinism(&self, handle: ProcessorHandle, _sclk_max: u64) -> NativeResult<()> {
        self.guard("set_perf_determinism")?;
        let index = self.gpu_index(handle)?;
        self.lock_state()[index].perf_level = PerfLevel::Determinism;
        Ok(())
    }

    fn set_compute_partition(&self, handle: ProcessorHandle, partition: &str) -> NativeResult<()> {
        self.guard("set_compute_partition")?;
        let index = self.gpu_index(handle)?;
        if !["SPX", "DPX", "TPX", "QPX", "CPX"].contains(&partition) {
            return Err(Status::Inval);
        }
        self.lock_state()[index].compute_partition = partition.to_string();
        Ok(())
    }

    fn reset_compute_partition(&self, handle: ProcessorHandle) -> NativeResult<()> {
        self.guard("reset_compute_partition")?;
        let index = self.gpu_index(handle)?;
        self.lock_state()[index].compute_partition = "SPX".to_string();
        Ok(())
    }

    fn set_memory_partition(&self, handle: ProcessorHandle, partition: &str) -> NativeResult<()> {
        self.guard("set_memory_partition")?;
        let index = self.gpu_index(handle)?;
        if !["NPS1", "NPS2", "NPS4", "NPS8"].contains(&partition) {
            return Err(Status::Inval);
        }
        self.lock_state()[index].memory_partition = partition.to_string();
        Ok(())
    }

    fn reset_memory_partition(&self, handle: ProcessorHandle) -> NativeResult<()> {
        self.guard("reset_memory_partition")?;
        let index = self.gpu_index(handle)?;
        self.lock_state()[index].memory_partition = "NPS1".to_string();
        Ok(())
    }

    fn set_power_cap(&self, handle: ProcessorHandle, _sensor: u32, cap: u64) -> NativeResult<()> {
        self.guard("set_power_cap")?;
        let index = self.gpu_index(handle)?;
        if cap > POWER_CAP_UW {
            return Err(Status::Inval);
        }
        self.lock_state()[index].power_cap = cap;
        Ok(())
    }

    fn set_soc_pstate(&self, handle: ProcessorHandle, policy: u32) -> NativeResult<()> {
        self.guard("set_soc_pstate")?;
        let index = self.gpu_index(handle)?;
        if policy > 3 {
            return Err(Status::Inval);
        }
        self.lock_state()[index].soc_pstate = policy;
        Ok(())
    }

    fn set_xgmi_plpd(&self, handle: ProcessorHandle, policy: u32) -> NativeResult<()> {
        self.guard("set_xgmi_plpd")?;
        let index = self.gpu_index(handle)?;
        if policy > 2 {
            return Err(Status::Inval);
        }
        self.lock_state()[index].xgmi_plpd = policy;
        Ok(())
    }

    fn set_process_isolation(&self, handle: ProcessorHandle, enabled: u32) -> NativeResult<()> {
        self.guard("set_process_isolation")?;
        let index = self.gpu_index(handle)?;
        self.lock_state()[index].process_isolation = enabled;
        Ok(())
    }

    fn set_clock_limit(
        &self,
        handle: ProcessorHandle,
        clock: ClockType,
        _limit: ClockLimit,
        _value: u64,
    ) -> NativeResult<()> {
        self.guard("set_clock_limit")?;
        self.gpu_index(handle)?;
        clock_for(clock).map(|_| ()).ok_or(Status::NotSupported)
    }

    fn set_clk_freq(&self, handle: ProcessorHandle, clock: ClockType, _bitmask: u64) -> NativeResult<()> {
        self.guard("set_clk_freq")?;
        self.gpu_index(handle)?;
        clock_for(clock).map(|_| ()).ok_or(Status::NotSupported)
    }

    fn reset_gpu(&self, handle: ProcessorHandle) -> NativeResult<()> {
        self.guard("reset_gpu")?;
        let index = self.gpu_index(handle)?;
        self.lock_state()[index] = Default::default();
        Ok(())
    }

    fn reset_xgmi_error(&self, handle: ProcessorHandle) -> NativeResult<()> {
        self.guard("reset_xgmi_error")?;
        self.gpu_index(handle).map(|_| ())
    }

    fn clean_local_data(&self, handle: ProcessorHandle) -> NativeResult<()> {
        self.guard("clean_local_data")?;
        self.gpu_index(handle).map(|_| ())
    }

    fn event_reader(&self, handle: ProcessorHandle, mask: u64) -> NativeResult<Box<dyn EventReader>> {
        self.guard("event_reader")?;
        let index = self.gpu_index(handle)?;
        let pending = self
            .events
            .iter()
            .filter(|(gpu, kind, _)| *gpu == index && mask & kind.mask() != 0)
            .map(|(_, kind, message)| EventNotification {
                processor: handle,
                kind: *kind,
                message: message.clone(),
            })
            .collect();
        Ok(Box::new(SimulatedEventReader::new(pending)))
    }

    // CPU socket

    fn cpu_hsmp_proto_version(&self, handle: ProcessorHandle) -> NativeResult<u32> {
        self.guard("cpu_hsmp_proto_version")?;
        self.cpu_index(handle)?;
        Ok(5)
    }

    fn cpu_smu_fw_version(&self, handle: ProcessorHandle) -> NativeResult<SmuFwVersion> {
        self.guard("cpu_smu_fw_version")?;
        self.cpu_index(handle)?;
        Ok(SmuFwVersion {
            major: 85,
            minor: 90,
            debug: 0,
        })
    }

    fn cpu_socket_power(&self, handle: ProcessorHandle) -> NativeResult<u32> {
        self.guard("cpu_socket_power")?;
        self.cpu_index(handle)?;
        Ok(CPU_SOCKET_POWER_MW)
    }

    fn cpu_socket_power_cap(&self, handle: ProcessorHandle) -> NativeResult<u32> {
        self.guard("cpu_socket_power_cap")?;
        self.cpu_index(handle)?;
        Ok(CPU_POWER_CAP_MW)
    }

    fn cpu_socket_power_cap_max(&self, handle: ProcessorHandle) -> NativeResult<u32> {
        self.guard("cpu_socket_power_cap_max")?;
        self.cpu_index(handle)?;
        Ok(CPU_POWER_CAP_MW)
    }

    fn cpu_prochot_status(&self, handle: ProcessorHandle) -> NativeResult<u32> {
        self.guard("cpu_prochot_status")?;
        self.cpu_index(handle)?;
        Ok(0)
    }

    fn cpu_fclk_mclk(&self, handle: ProcessorHandle) -> NativeResult<(u32, u32)> {
        self.guard("cpu_fclk_mclk")?;
        self.cpu_index(handle)?;
        Ok((1800, 1800))
    }

    fn cpu_cclk_limit(&self, handle: ProcessorHandle) -> NativeResult<u32> {
        self.guard("cpu_cclk_limit")?;
        self.cpu_index(handle)?;
        Ok(CPU_BOOST_LIMIT_MHZ)
    }

    fn cpu_current_freq_limit(&self, handle: ProcessorHandle) -> NativeResult<FreqLimit> {
        self.guard("cpu_current_freq_limit")?;
        self.cpu_index(handle)?;
        Ok(FreqLimit {
            freq: CPU_BOOST_LIMIT_MHZ as u16,
            sources: vec!["HSMP Agent".to_string()],
        })
    }

    fn cpu_socket_freq_range(&self, handle: ProcessorHandle) -> NativeResult<SocketFreqRange> {
        self.guard("cpu_socket_freq_range")?;
        self.cpu_index(handle)?;
        Ok(SocketFreqRange {
            fmax: CPU_BOOST_LIMIT_MHZ as u16,
            fmin: CPU_MIN_FREQ_MHZ,
        })
    }

    fn cpu_c0_residency(&self, handle: ProcessorHandle) -> NativeResult<u32> {
        self.guard("cpu_c0_residency")?;
        self.cpu_index(handle)?;
        Ok(12)
    }

    fn cpu_lclk_dpm_level(&self, handle: ProcessorHandle, nbio_id: u8) -> NativeResult<DpmLevel> {
        self.guard("cpu_lclk_dpm_level")?;
        self.cpu_index(handle)?;
        if nbio_id >= CPU_NBIO_COUNT {
            return Err(Status::Inval);
        }
        Ok(DpmLevel {
            max_dpm_level: 3,
            min_dpm_level: 0,
        })
    }

    fn cpu_svi_power(&self, handle: ProcessorHandle) -> NativeResult<u32> {
        self.guard("cpu_svi_power")?;
        self.cpu_index(handle)?;
        Ok(150_000)
    }

    fn cpu_io_bandwidth(&self, handle: ProcessorHandle, _bw_type: u8, link: &str) -> NativeResult<u32> {
        self.guard("cpu_io_bandwidth")?;
        self.cpu_index(handle)?;
        if !CPU_LINK_NAMES.contains(&link) {
            return Err(Status::Inval);
        }
        Ok(2_048)
    }

    fn cpu_xgmi_bandwidth(&self, handle: ProcessorHandle, _bw_type: u8, link: &str) -> NativeResult<u32> {
        self.guard("cpu_xgmi_bandwidth")?;
        self.cpu_index(handle)?;
        if !CPU_LINK_NAMES.contains(&link) {
            return Err(Status::Inval);
        }
        Ok(4_096)
    }

    fn cpu_metrics_table_version(&self, handle: ProcessorHandle) -> NativeResult<u32> {
        self.guard("cpu_metrics_table_version")?;
        self.cpu_index(handle)?;
        Ok(4)
    }

    fn cpu_metrics_table(&self, handle: ProcessorHandle) -> NativeResult<Vec<MetricsTableEntry>> {
        self.guard("cpu_metrics_table")?;
        self.cpu_index(handle)?;
        let entry = |name: &str, value: f64, unit: &str| MetricsTableEntry {
            name: name.to_string(),
            value,
            unit: unit.to_string(),
        };
        Ok(vec![
            entry("mtbl_accumulation_counter", 1_024.0, ""),
            entry("mtbl_max_socket_temperature", 48.0, "C"),
            entry("mtbl_socket_power", 175.2, "W"),
            entry("mtbl_timestamp_raw", 1_700_000_000.0, "s"),
            entry("mtbl_fclk_frequency", 1_800.0, "MHz"),
        ])
    }

    fn cpu_socket_energy(&self, handle: ProcessorHandle) -> NativeResult<u64> {
        self.guard("cpu_socket_energy")?;
        let index = self.cpu_index(handle)?;
        Ok(123_456_789_000 + index as u64)
    }

    fn cpu_ddr_bandwidth(&self, handle: ProcessorHandle) -> NativeResult<DdrBandwidth> {
        self.guard("cpu_ddr_bandwidth")?;
        self.cpu_index(handle)?;
        Ok(DdrBandwidth {
            max_bw: 460,
            utilized_bw: 23,
            utilized_pct: 5,
        })
    }

    fn cpu_socket_temperature(&self, handle: ProcessorHandle) -> NativeResult<u32> {
        self.guard("cpu_socket_temperature")?;
        self.cpu_index(handle)?;
        Ok(48)
    }

    fn cpu_dimm_temp_range(&self, handle: ProcessorHandle, _dimm_addr: u8) -> NativeResult<DimmTempRange> {
        self.guard("cpu_dimm_temp_range")?;
        self.cpu_index(handle)?;
        Ok(DimmTempRange {
            range: 3,
            refresh_rate: 0,
        })
    }

    fn cpu_dimm_power(&self, handle: ProcessorHandle, dimm_addr: u8) -> NativeResult<DimmPower> {
        self.guard("cpu_dimm_power")?;
        self.cpu_index(handle)?;
        Ok(DimmPower {
            power: 1_200,
            update_rate: 511,
            dimm_addr,
        })
    }

    fn cpu_dimm_thermal(&self, handle: ProcessorHandle, dimm_addr: u8) -> NativeResult<DimmThermal> {
        self.guard("cpu_dimm_thermal")?;
        self.cpu_index(handle)?;
        Ok(DimmThermal {
            sensor: 0x29,
            update_rate: 511,
            dimm_addr,
            temp: 35.25,
        })
    }

    // CPU core

    fn core_boost_limit(&self, handle: ProcessorHandle) -> NativeResult<u32> {
        self.guard("core_boost_limit")?;
        self.core_index(handle)?;
        Ok(CPU_BOOST_LIMIT_MHZ)
    }

    fn core_current_freq_limit(&self, handle: ProcessorHandle) -> NativeResult<u32> {
        self.guard("core_current_freq_limit")?;
        self.core_index(handle)?;
        Ok(CPU_BOOST_LIMIT_MHZ)
    }

    fn core_energy(&self, handle: ProcessorHandle) -> NativeResult<u64> {
        self.guard("core_energy")?;
        let index = self.core_index(handle)?;
        Ok(2_345_678_000 + index as u64)
    }

    // CPU mutators

    fn set_cpu_socket_power_cap(&self, handle: ProcessorHandle, cap: u32) -> NativeResult<()> {
        self.guard("set_cpu_socket_power_cap")?;
        self.cpu_index(handle)?;
        if cap > CPU_POWER_CAP_MW {
            return Err(Status::Inval);
        }
        Ok(())
    }

    fn set_cpu_xgmi_width(&self, handle: ProcessorHandle, min: u8, max: u8) -> NativeResult<()> {
        self.guard("set_cpu_xgmi_width")?;
        self.cpu_index(handle)?;
        if min > max {
            return Err(Status::Inval);
        }
        Ok(())
    }

    fn set_cpu_gmi3_link_width(&self, handle: ProcessorHandle, min: u8, max: u8) -> NativeResult<()> {
        self.guard("set_cpu_gmi3_link_width")?;
        self.cpu_index(handle)?;
        if min > max {
            return Err(Status::Inval);
        }
        Ok(())
    }

    fn set_cpu_lclk_dpm_level(&self, handle: ProcessorHandle, nbio_id: u8, min: u8, max: u8) -> NativeResult<()> {
        self.guard("set_cpu_lclk_dpm_level")?;
        self.cpu_index(handle)?;
        if nbio_id >= CPU_NBIO_COUNT || min > max {
            return Err(Status::Inval);
        }
        Ok(())
    }

    fn set_cpu_pwr_efficiency_mode(&self, handle: ProcessorHandle, mode: u8) -> NativeResult<()> {
        self.guard("set_cpu_pwr_efficiency_mode")?;
        self.cpu_index(handle)?;
        if mode > 3 {
            return Err(Status::Inval);
        }
        Ok(())
    }

    fn set_cpu_pcie_link_rate(&self, handle: ProcessorHandle, rate: u8) -> NativeResult<u8> {
        self.guard("set_cpu_pcie_link_rate")?;
        self.cpu_index(handle)?;
        if rate > 2 {
            return Err(Status::Inval);
        }
        Ok(0)
    }

    fn set_cpu_df_pstate_range(&self, handle: ProcessorHandle, max: u8, min: u8) -> NativeResult<()> {
        self.guard("set_cpu_df_pstate_range")?;
        self.cpu_index(handle)?;
        if max > min || min > 2 {
            return Err(Status::Inval);
        }
        Ok(())
    }

    fn cpu_apb_enable(&self, handle: ProcessorHandle) -> NativeResult<()> {
        self.guard("cpu_apb_enable")?;
        self.cpu_index(handle).map(|_| ())
    }

    fn cpu_apb_disable(&self, handle: ProcessorHandle, pstate: u8) -> NativeResult<()> {
        self.guard("cpu_apb_disable")?;
        self.cpu_index(handle)?;
        if pstate > 2 {
            return Err(Status::Inval);
        }
        Ok(())
    }

    fn set_cpu_socket_boost_limit(&self, handle: ProcessorHandle, _limit: u32) -> NativeResult<()> {
        self.guard("set_cpu_socket_boost_limit")?;
        self.cpu_index(handle).map(|_| ())
    }

    fn set_core_boost_limit(&self, handle: ProcessorHandle, _limit: u32) -> NativeResult<()> {
        self.guard("set_core_boost_limit")?;
        self.core_index(handle).map(|_| ())
    }
}
