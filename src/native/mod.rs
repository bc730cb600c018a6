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

//! Boundary to the AMD SMI management library.
//!
//! [`SmiLibrary`] is the only way the rest of the crate talks to hardware.
//! Every operation has a default body returning
//! [`Status::NotSupported`], so a backend implements only what it can
//! actually serve and the command layer turns the rest into `"N/A"`.

pub mod dynamic;
pub mod status;
pub mod types;

pub use dynamic::DynamicLibrary;
pub use status::{NativeResult, Status};
pub use types::*;

use crate::device::Bdf;

/// Blocking reader for driver event notifications on one GPU.
pub trait EventReader: Send {
    /// Wait up to `timeout_ms` for pending events. An empty vector means the
    /// timeout elapsed.
    fn read(&mut self, timeout_ms: u32) -> NativeResult<Vec<EventNotification>>;

    /// Stop delivery and release the notification channel.
    fn stop(&mut self) -> NativeResult<()>;
}

/// Operations the command layer consumes from the native library.
pub trait SmiLibrary: Send + Sync {
    // Init, teardown and discovery

    fn init(&self, flags: InitFlags) -> NativeResult<()>;

    fn shut_down(&self) -> NativeResult<()> {
        Ok(())
    }

    fn socket_handles(&self) -> NativeResult<Vec<SocketHandle>>;

    fn processor_handles(&self, socket: SocketHandle) -> NativeResult<Vec<ProcessorHandle>>;

    fn processor_type(&self, handle: ProcessorHandle) -> NativeResult<ProcessorType>;

    fn processor_handle_from_bdf(&self, _bdf: &Bdf) -> NativeResult<ProcessorHandle> {
        Err(Status::NotSupported)
    }

    fn lib_version(&self) -> NativeResult<LibVersion> {
        Err(Status::NotSupported)
    }

    // GPU identity and static information

    fn gpu_bdf(&self, handle: ProcessorHandle) -> NativeResult<Bdf>;

    fn gpu_uuid(&self, _handle: ProcessorHandle) -> NativeResult<String> {
        Err(Status::NotSupported)
    }

    fn gpu_kfd_info(&self, _handle: ProcessorHandle) -> NativeResult<KfdInfo> {
        Err(Status::NotSupported)
    }

    fn gpu_asic_info(&self, _handle: ProcessorHandle) -> NativeResult<AsicInfo> {
        Err(Status::NotSupported)
    }

    fn gpu_board_info(&self, _handle: ProcessorHandle) -> NativeResult<BoardInfo> {
        Err(Status::NotSupported)
    }

    fn gpu_driver_info(&self, _handle: ProcessorHandle) -> NativeResult<DriverInfo> {
        Err(Status::NotSupported)
    }

    fn gpu_vbios_info(&self, _handle: ProcessorHandle) -> NativeResult<VbiosInfo> {
        Err(Status::NotSupported)
    }

    fn gpu_vram_info(&self, _handle: ProcessorHandle) -> NativeResult<VramInfo> {
        Err(Status::NotSupported)
    }

    fn gpu_cache_info(&self, _handle: ProcessorHandle) -> NativeResult<Vec<CacheInfo>> {
        Err(Status::NotSupported)
    }

    fn power_cap_info(&self, _handle: ProcessorHandle, _sensor: u32) -> NativeResult<PowerCapInfo> {
        Err(Status::NotSupported)
    }

    fn gpu_partition(&self, _handle: ProcessorHandle) -> NativeResult<PartitionInfo> {
        Err(Status::NotSupported)
    }

    fn soc_pstate(&self, _handle: ProcessorHandle) -> NativeResult<DpmPolicy> {
        Err(Status::NotSupported)
    }

    fn xgmi_plpd(&self, _handle: ProcessorHandle) -> NativeResult<DpmPolicy> {
        Err(Status::NotSupported)
    }

    fn process_isolation(&self, _handle: ProcessorHandle) -> NativeResult<u32> {
        Err(Status::NotSupported)
    }

    fn ras_features(&self, _handle: ProcessorHandle) -> NativeResult<RasFeatures> {
        Err(Status::NotSupported)
    }

    fn ras_block_state(&self, _handle: ProcessorHandle, _block: GpuBlock) -> NativeResult<RasState> {
        Err(Status::NotSupported)
    }

    fn numa_info(&self, _handle: ProcessorHandle) -> NativeResult<NumaInfo> {
        Err(Status::NotSupported)
    }

    fn fw_info(&self, _handle: ProcessorHandle) -> NativeResult<Vec<FwEntry>> {
        Err(Status::NotSupported)
    }

    fn fw_error_records(&self, _handle: ProcessorHandle) -> NativeResult<Vec<FwErrorRecord>> {
        Err(Status::NotSupported)
    }

    // GPU dynamic information

    fn gpu_activity(&self, _handle: ProcessorHandle) -> NativeResult<EngineActivity> {
        Err(Status::NotSupported)
    }

    fn gpu_metrics(&self, _handle: ProcessorHandle) -> NativeResult<GpuMetrics> {
        Err(Status::NotSupported)
    }

    fn temperature(
        &self,
        _handle: ProcessorHandle,
        _sensor: TemperatureSensor,
        _metric: TemperatureMetric,
    ) -> NativeResult<i64> {
        Err(Status::NotSupported)
    }

    fn fan_rpms(&self, _handle: ProcessorHandle, _sensor: u32) -> NativeResult<i64> {
        Err(Status::NotSupported)
    }

    fn fan_speed(&self, _handle: ProcessorHandle, _sensor: u32) -> NativeResult<i64> {
        Err(Status::NotSupported)
    }

    fn fan_speed_max(&self, _handle: ProcessorHandle, _sensor: u32) -> NativeResult<u64> {
        Err(Status::NotSupported)
    }

    fn power_info(&self, _handle: ProcessorHandle) -> NativeResult<PowerInfo> {
        Err(Status::NotSupported)
    }

    fn is_power_management_enabled(&self, _handle: ProcessorHandle) -> NativeResult<bool> {
        Err(Status::NotSupported)
    }

    fn clock_info(&self, _handle: ProcessorHandle, _clock: ClockType) -> NativeResult<ClockInfo> {
        Err(Status::NotSupported)
    }

    fn pcie_info(&self, _handle: ProcessorHandle) -> NativeResult<PcieInfo> {
        Err(Status::NotSupported)
    }

    fn pcie_throughput(&self, _handle: ProcessorHandle) -> NativeResult<PcieThroughput> {
        Err(Status::NotSupported)
    }

    fn total_ecc_count(&self, _handle: ProcessorHandle) -> NativeResult<EccCount> {
        Err(Status::NotSupported)
    }

    fn ecc_count(&self, _handle: ProcessorHandle, _block: GpuBlock) -> NativeResult<EccCount> {
        Err(Status::NotSupported)
    }

    fn ecc_enabled_blocks(&self, _handle: ProcessorHandle) -> NativeResult<u64> {
        Err(Status::NotSupported)
    }

    fn bad_pages(&self, _handle: ProcessorHandle) -> NativeResult<Vec<BadPage>> {
        Err(Status::NotSupported)
    }

    fn od_volt_curve(&self, _handle: ProcessorHandle) -> NativeResult<OdVoltCurve> {
        Err(Status::NotSupported)
    }

    fn perf_level(&self, _handle: ProcessorHandle) -> NativeResult<PerfLevel> {
        Err(Status::NotSupported)
    }

    fn overdrive_level(&self, _handle: ProcessorHandle) -> NativeResult<u32> {
        Err(Status::NotSupported)
    }

    fn energy_count(&self, _handle: ProcessorHandle) -> NativeResult<EnergyCount> {
        Err(Status::NotSupported)
    }

    fn xgmi_error_status(&self, _handle: ProcessorHandle) -> NativeResult<XgmiStatus> {
        Err(Status::NotSupported)
    }

    fn memory_total(&self, _handle: ProcessorHandle, _kind: MemoryType) -> NativeResult<u64> {
        Err(Status::NotSupported)
    }

    fn memory_usage(&self, _handle: ProcessorHandle, _kind: MemoryType) -> NativeResult<u64> {
        Err(Status::NotSupported)
    }

    fn violation_status(&self, _handle: ProcessorHandle) -> NativeResult<ViolationStatus> {
        Err(Status::NotSupported)
    }

    fn process_list(&self, _handle: ProcessorHandle) -> NativeResult<Vec<ProcessInfo>> {
        Err(Status::NotSupported)
    }

    // Topology and XGMI

    fn topo_link_type(
        &self,
        _src: ProcessorHandle,
        _dst: ProcessorHandle,
    ) -> NativeResult<(u64, LinkType)> {
        Err(Status::NotSupported)
    }

    fn topo_link_weight(&self, _src: ProcessorHandle, _dst: ProcessorHandle) -> NativeResult<u64> {
        Err(Status::NotSupported)
    }

    fn minmax_bandwidth(
        &self,
        _src: ProcessorHandle,
        _dst: ProcessorHandle,
    ) -> NativeResult<(u64, u64)> {
        Err(Status::NotSupported)
    }

    fn is_p2p_accessible(&self, _src: ProcessorHandle, _dst: ProcessorHandle) -> NativeResult<bool> {
        Err(Status::NotSupported)
    }

    fn p2p_status(&self, _src: ProcessorHandle, _dst: ProcessorHandle) -> NativeResult<P2pCaps> {
        Err(Status::NotSupported)
    }

    fn xgmi_link_info(&self, _handle: ProcessorHandle) -> NativeResult<XgmiLinkInfo> {
        Err(Status::NotSupported)
    }

    // GPU mutators

    fn set_fan_speed(&self, _handle: ProcessorHandle, _sensor: u32, _speed: u64) -> NativeResult<()> {
        Err(Status::NotSupported)
    }

    fn reset_fan(&self, _handle: ProcessorHandle, _sensor: u32) -> NativeResult<()> {
        Err(Status::NotSupported)
    }

    fn set_perf_level(&self, _handle: ProcessorHandle, _level: PerfLevel) -> NativeResult<()> {
        Err(Status::NotSupported)
    }

    fn set_power_profile(&self, _handle: ProcessorHandle, _profile: PowerProfile) -> NativeResult<()> {
        Err(Status::NotSupported)
    }

    fn set_overdrive_level(&self, _handle: ProcessorHandle, _percent: u32) -> NativeResult<()> {
        Err(Status::NotSupported)
    }

    fn set_perf_determinism(&self, _handle: ProcessorHandle, _sclk_max: u64) -> NativeResult<()> {
        Err(Status::NotSupported)
    }

    fn set_compute_partition(&self, _handle: ProcessorHandle, _partition: &str) -> NativeResult<()> {
        Err(Status::NotSupported)
    }

    fn reset_compute_partition(&self, _handle: ProcessorHandle) -> NativeResult<()> {
        Err(Status::NotSupported)
    }

    fn set_memory_partition(&self, _handle: ProcessorHandle, _partition: &str) -> NativeResult<()> {
        Err(Status::NotSupported)
    }

    fn reset_memory_partition(&self, _handle: ProcessorHandle) -> NativeResult<()> {
        Err(Status::NotSupported)
    }

    /// `cap` is in microwatts.
    fn set_power_cap(&self, _handle: ProcessorHandle, _sensor: u32, _cap: u64) -> NativeResult<()> {
        Err(Status::NotSupported)
    }

    fn set_soc_pstate(&self, _handle: ProcessorHandle, _policy: u32) -> NativeResult<()> {
        Err(Status::NotSupported)
    }

    fn set_xgmi_plpd(&self, _handle: ProcessorHandle, _policy: u32) -> NativeResult<()> {
        Err(Status::NotSupported)
    }

    fn set_process_isolation(&self, _handle: ProcessorHandle, _enabled: u32) -> NativeResult<()> {
        Err(Status::NotSupported)
    }

    fn set_clock_limit(
        &self,
        _handle: ProcessorHandle,
        _clock: ClockType,
        _limit: ClockLimit,
        _value: u64,
    ) -> NativeResult<()> {
        Err(Status::NotSupported)
    }

    fn set_clk_freq(&self, _handle: ProcessorHandle, _clock: ClockType, _bitmask: u64) -> NativeResult<()> {
        Err(Status::NotSupported)
    }

    fn reset_gpu(&self, _handle: ProcessorHandle) -> NativeResult<()> {
        Err(Status::NotSupported)
    }

    fn reset_xgmi_error(&self, _handle: ProcessorHandle) -> NativeResult<()> {
        Err(Status::NotSupported)
    }

    fn clean_local_data(&self, _handle: ProcessorHandle) -> NativeResult<()> {
        Err(Status::NotSupported)
    }

    // Events

    fn event_reader(&self, _handle: ProcessorHandle, _mask: u64) -> NativeResult<Box<dyn EventReader>> {
        Err(Status::NotSupported)
    }

    // CPU socket

    fn cpu_hsmp_proto_version(&self, _handle: ProcessorHandle) -> NativeResult<u32> {
        Err(Status::NotSupported)
    }

    fn cpu_smu_fw_version(&self, _handle: ProcessorHandle) -> NativeResult<SmuFwVersion> {
        Err(Status::NotSupported)
    }

    /// mW
    fn cpu_socket_power(&self, _handle: ProcessorHandle) -> NativeResult<u32> {
        Err(Status::NotSupported)
    }

    fn cpu_socket_power_cap(&self, _handle: ProcessorHandle) -> NativeResult<u32> {
        Err(Status::NotSupported)
    }

    fn cpu_socket_power_cap_max(&self, _handle: ProcessorHandle) -> NativeResult<u32> {
        Err(Status::NotSupported)
    }

    fn cpu_prochot_status(&self, _handle: ProcessorHandle) -> NativeResult<u32> {
        Err(Status::NotSupported)
    }

    /// `(fclk, mclk)` in MHz.
    fn cpu_fclk_mclk(&self, _handle: ProcessorHandle) -> NativeResult<(u32, u32)> {
        Err(Status::NotSupported)
    }

    fn cpu_cclk_limit(&self, _handle: ProcessorHandle) -> NativeResult<u32> {
        Err(Status::NotSupported)
    }

    fn cpu_current_freq_limit(&self, _handle: ProcessorHandle) -> NativeResult<FreqLimit> {
        Err(Status::NotSupported)
    }

    fn cpu_socket_freq_range(&self, _handle: ProcessorHandle) -> NativeResult<SocketFreqRange> {
        Err(Status::NotSupported)
    }

    fn cpu_c0_residency(&self, _handle: ProcessorHandle) -> NativeResult<u32> {
        Err(Status::NotSupported)
    }

    fn cpu_lclk_dpm_level(&self, _handle: ProcessorHandle, _nbio_id: u8) -> NativeResult<DpmLevel> {
        Err(Status::NotSupported)
    }

    /// mW
    fn cpu_svi_power(&self, _handle: ProcessorHandle) -> NativeResult<u32> {
        Err(Status::NotSupported)
    }

    /// Mbps
    fn cpu_io_bandwidth(&self, _handle: ProcessorHandle, _bw_type: u8, _link: &str) -> NativeResult<u32> {
        Err(Status::NotSupported)
    }

    /// Mbps
    fn cpu_xgmi_bandwidth(&self, _handle: ProcessorHandle, _bw_type: u8, _link: &str) -> NativeResult<u32> {
        Err(Status::NotSupported)
    }

    fn cpu_metrics_table_version(&self, _handle: ProcessorHandle) -> NativeResult<u32> {
        Err(Status::NotSupported)
    }

    fn cpu_metrics_table(&self, _handle: ProcessorHandle) -> NativeResult<Vec<MetricsTableEntry>> {
        Err(Status::NotSupported)
    }

    /// µJ
    fn cpu_socket_energy(&self, _handle: ProcessorHandle) -> NativeResult<u64> {
        Err(Status::NotSupported)
    }

    fn cpu_ddr_bandwidth(&self, _handle: ProcessorHandle) -> NativeResult<DdrBandwidth> {
        Err(Status::NotSupported)
    }

    /// °C
    fn cpu_socket_temperature(&self, _handle: ProcessorHandle) -> NativeResult<u32> {
        Err(Status::NotSupported)
    }

    fn cpu_dimm_temp_range(&self, _handle: ProcessorHandle, _dimm_addr: u8) -> NativeResult<DimmTempRange> {
        Err(Status::NotSupported)
    }

    fn cpu_dimm_power(&self, _handle: ProcessorHandle, _dimm_addr: u8) -> NativeResult<DimmPower> {
        Err(Status::NotSupported)
    }

    fn cpu_dimm_thermal(&self, _handle: ProcessorHandle, _dimm_addr: u8) -> NativeResult<DimmThermal> {
        Err(Status::NotSupported)
    }

    // CPU core

    /// MHz
    fn core_boost_limit(&self, _handle: ProcessorHandle) -> NativeResult<u32> {
        Err(Status::NotSupported)
    }

    /// MHz
    fn core_current_freq_limit(&self, _handle: ProcessorHandle) -> NativeResult<u32> {
        Err(Status::NotSupported)
    }

    /// µJ
    fn core_energy(&self, _handle: ProcessorHandle) -> NativeResult<u64> {
        Err(Status::NotSupported)
    }

    // CPU mutators

    /// mW
    fn set_cpu_socket_power_cap(&self, _handle: ProcessorHandle, _cap: u32) -> NativeResult<()> {
        Err(Status::NotSupported)
    }

    fn set_cpu_xgmi_width(&self, _handle: ProcessorHandle, _min: u8, _max: u8) -> NativeResult<()> {
        Err(Status::NotSupported)
    }

    fn set_cpu_gmi3_link_width(&self, _handle: ProcessorHandle, _min: u8, _max: u8) -> NativeResult<()> {
        Err(Status::NotSupported)
    }

    fn set_cpu_lclk_dpm_level(
        &self,
        _handle: ProcessorHandle,
        _nbio_id: u8,
        _min: u8,
        _max: u8,
    ) -> NativeResult<()> {
        Err(Status::NotSupported)
    }

    fn set_cpu_pwr_efficiency_mode(&self, _handle: ProcessorHandle, _mode: u8) -> NativeResult<()> {
        Err(Status::NotSupported)
    }

    /// Returns the previous link rate mode.
    fn set_cpu_pcie_link_rate(&self, _handle: ProcessorHandle, _rate: u8) -> NativeResult<u8> {
        Err(Status::NotSupported)
    }

    fn set_cpu_df_pstate_range(&self, _handle: ProcessorHandle, _max: u8, _min: u8) -> NativeResult<()> {
        Err(Status::NotSupported)
    }

    fn cpu_apb_enable(&self, _handle: ProcessorHandle) -> NativeResult<()> {
        Err(Status::NotSupported)
    }

    fn cpu_apb_disable(&self, _handle: ProcessorHandle, _pstate: u8) -> NativeResult<()> {
        Err(Status::NotSupported)
    }

    /// MHz
    fn set_cpu_socket_boost_limit(&self, _handle: ProcessorHandle, _limit: u32) -> NativeResult<()> {
        Err(Status::NotSupported)
    }

    /// MHz
    fn set_core_boost_limit(&self, _handle: ProcessorHandle, _limit: u32) -> NativeResult<()> {
        Err(Status::NotSupported)
    }
}
