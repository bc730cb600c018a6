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

//! Owned Rust mirrors of the records the AMD SMI library hands back.
//!
//! Numeric fields keep the library's units (µW, MT/s, bytes) and its
//! all-ones "not available" convention; handlers convert both when they
//! attach units to a value.

use std::ops::BitOr;

use crate::device::Bdf;

/// Opaque processor handle owned by the native library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessorHandle(pub u64);

/// Opaque socket handle owned by the native library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SocketHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorType {
    Unknown,
    AmdGpu,
    AmdCpu,
    NonAmdGpu,
    NonAmdCpu,
    AmdCpuCore,
    AmdApu,
}

impl ProcessorType {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            1 => ProcessorType::AmdGpu,
            2 => ProcessorType::AmdCpu,
            3 => ProcessorType::NonAmdGpu,
            4 => ProcessorType::NonAmdCpu,
            5 => ProcessorType::AmdCpuCore,
            6 => ProcessorType::AmdApu,
            _ => ProcessorType::Unknown,
        }
    }
}

/// `amdsmi_init` flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitFlags(pub u64);

impl InitFlags {
    pub const ALL_PROCESSORS: InitFlags = InitFlags(0);
    pub const AMD_CPUS: InitFlags = InitFlags(1 << 0);
    pub const AMD_GPUS: InitFlags = InitFlags(1 << 1);

    pub fn contains(self, other: InitFlags) -> bool {
        self.0 == 0 || self.0 & other.0 == other.0
    }
}

impl BitOr for InitFlags {
    type Output = InitFlags;

    fn bitor(self, rhs: InitFlags) -> InitFlags {
        InitFlags(self.0 | rhs.0)
    }
}

/// Values the library reports as all-ones when a sensor is absent.
pub trait MetricValue: Copy {
    fn available(self) -> Option<u64>;
}

impl MetricValue for u16 {
    fn available(self) -> Option<u64> {
        (self != u16::MAX).then_some(u64::from(self))
    }
}

impl MetricValue for u32 {
    fn available(self) -> Option<u64> {
        (self != u32::MAX && self != u32::from(u16::MAX)).then_some(u64::from(self))
    }
}

impl MetricValue for u64 {
    fn available(self) -> Option<u64> {
        (self != u64::MAX && self != u64::from(u32::MAX)).then_some(self)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibVersion {
    pub year: u32,
    pub major: u32,
    pub minor: u32,
    pub release: u32,
    pub build: String,
}

impl LibVersion {
    /// `year.major.minor.release`
    pub fn dotted(&self) -> String {
        format!("{}.{}.{}.{}", self.year, self.major, self.minor, self.release)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AsicInfo {
    pub market_name: String,
    pub vendor_id: u32,
    pub vendor_name: String,
    pub subvendor_id: u32,
    pub device_id: u64,
    pub subsystem_id: u32,
    pub rev_id: u32,
    pub asic_serial: String,
    pub oam_id: u32,
    pub num_compute_units: u32,
    pub target_graphics_version: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardInfo {
    pub model_number: String,
    pub product_serial: String,
    pub fru_id: String,
    pub product_name: String,
    pub manufacturer_name: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DriverInfo {
    pub name: String,
    pub version: String,
    pub date: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VbiosInfo {
    pub name: String,
    pub build_date: String,
    pub part_number: String,
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VramInfo {
    /// Raw `amdsmi_vram_type_t`.
    pub vram_type: u32,
    pub vendor: String,
    pub size_mb: u64,
    pub bit_width: u32,
}

/// Name for a raw `amdsmi_vram_type_t`. The enum's `MAX` alias shares the
/// GDDR7 value, so anything at or past it reads as GDDR7.
pub fn vram_type_name(raw: u32) -> &'static str {
    match raw {
        1 => "HBM",
        2 => "HBM2",
        3 => "HBM2E",
        4 => "HBM3",
        10 => "DDR2",
        11 => "DDR3",
        12 => "DDR4",
        17 => "GDDR1",
        18 => "GDDR2",
        19 => "GDDR3",
        20 => "GDDR4",
        21 => "GDDR5",
        22 => "GDDR6",
        23.. => "GDDR7",
        _ => "UNKNOWN",
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheInfo {
    pub cache_level: u32,
    pub cache_size_kb: u32,
    pub properties: Vec<String>,
    pub max_num_cu_shared: u32,
    pub num_cache_instance: u32,
}

/// Power caps in microwatts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PowerCapInfo {
    pub power_cap: u64,
    pub default_power_cap: u64,
    pub dpm_cap: u64,
    pub min_power_cap: u64,
    pub max_power_cap: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlotType {
    Pcie,
    Oam,
    Cem,
    #[default]
    Unknown,
}

impl SlotType {
    pub fn name(self) -> &'static str {
        match self {
            SlotType::Pcie => "PCIE",
            SlotType::Oam => "OAM",
            SlotType::Cem => "CEM",
            SlotType::Unknown => "UNKNOWN",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PcieStatic {
    pub max_pcie_width: u16,
    /// MT/s
    pub max_pcie_speed: u32,
    pub pcie_interface_version: u32,
    pub slot_type: SlotType,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PcieMetric {
    pub pcie_width: u16,
    /// MT/s
    pub pcie_speed: u32,
    /// Mb/s
    pub pcie_bandwidth: u32,
    pub pcie_replay_count: u64,
    pub pcie_l0_to_recovery_count: u64,
    pub pcie_replay_roll_over_count: u64,
    pub pcie_nak_sent_count: u64,
    pub pcie_nak_received_count: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PcieInfo {
    pub static_info: PcieStatic,
    pub metric: PcieMetric,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PcieThroughput {
    pub sent: u64,
    pub received: u64,
    pub max_pkt_size: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KfdInfo {
    pub kfd_id: u64,
    pub node_id: u32,
    pub current_partition_id: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RasFeatures {
    pub eeprom_version: u32,
    pub parity_schema: bool,
    pub single_bit_schema: bool,
    pub double_bit_schema: bool,
    pub poison_schema: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasState {
    None,
    Disabled,
    Parity,
    SingleCorrectable,
    MultiUncorrectable,
    Poison,
    Enabled,
    Invalid,
}

impl RasState {
    pub fn name(self) -> &'static str {
        match self {
            RasState::None => "NONE",
            RasState::Disabled => "DISABLED",
            RasState::Parity => "PARITY",
            RasState::SingleCorrectable => "SING_C",
            RasState::MultiUncorrectable => "MULT_UC",
            RasState::Poison => "POISON",
            RasState::Enabled => "ENABLED",
            RasState::Invalid => "INVALID",
        }
    }

    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => RasState::None,
            1 => RasState::Disabled,
            2 => RasState::Parity,
            3 => RasState::SingleCorrectable,
            4 => RasState::MultiUncorrectable,
            5 => RasState::Poison,
            6 => RasState::Enabled,
            _ => RasState::Invalid,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuBlock {
    Umc,
    Sdma,
    Gfx,
    Mmhub,
    Athub,
    PcieBif,
    Hdp,
    XgmiWafl,
    Df,
    Smn,
    Sem,
    Mp0,
    Mp1,
    Fuse,
}

impl GpuBlock {
    pub const ALL: [GpuBlock; 14] = [
        GpuBlock::Umc,
        GpuBlock::Sdma,
        GpuBlock::Gfx,
        GpuBlock::Mmhub,
        GpuBlock::Athub,
        GpuBlock::PcieBif,
        GpuBlock::Hdp,
        GpuBlock::XgmiWafl,
        GpuBlock::Df,
        GpuBlock::Smn,
        GpuBlock::Sem,
        GpuBlock::Mp0,
        GpuBlock::Mp1,
        GpuBlock::Fuse,
    ];

    /// `amdsmi_gpu_block_t` bit.
    pub fn bit(self) -> u64 {
        1 << (GpuBlock::ALL.iter().position(|b| *b == self).unwrap_or(0) as u64)
    }

    pub fn name(self) -> &'static str {
        match self {
            GpuBlock::Umc => "UMC",
            GpuBlock::Sdma => "SDMA",
            GpuBlock::Gfx => "GFX",
            GpuBlock::Mmhub => "MMHUB",
            GpuBlock::Athub => "ATHUB",
            GpuBlock::PcieBif => "PCIE_BIF",
            GpuBlock::Hdp => "HDP",
            GpuBlock::XgmiWafl => "XGMI_WAFL",
            GpuBlock::Df => "DF",
            GpuBlock::Smn => "SMN",
            GpuBlock::Sem => "SEM",
            GpuBlock::Mp0 => "MP0",
            GpuBlock::Mp1 => "MP1",
            GpuBlock::Fuse => "FUSE",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EccCount {
    pub correctable_count: u64,
    pub uncorrectable_count: u64,
    /// Older library releases do not report deferred errors.
    pub deferred_count: Option<u64>,
}

/// Coarse engine activity in percent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineActivity {
    pub gfx_activity: u32,
    pub umc_activity: u32,
    pub mm_activity: u32,
}

/// Subset of `amdsmi_gpu_metrics_t` the tool reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GpuMetrics {
    pub temperature_edge: u16,
    pub temperature_hotspot: u16,
    pub temperature_mem: u16,
    pub average_socket_power: u16,
    pub current_socket_power: u16,
    pub energy_accumulator: u64,
    pub average_gfx_activity: u16,
    pub average_umc_activity: u16,
    pub vcn_activity: [u16; 4],
    pub jpeg_activity: [u16; 32],
    pub current_gfxclks: [u16; 8],
    pub current_uclk: u16,
    pub current_vclk0s: [u16; 4],
    pub current_dclk0s: [u16; 4],
    pub gfxclk_lock_status: u32,
    pub throttle_status: u32,
    pub current_fan_speed: u16,
    pub pcie_link_width: u16,
    pub pcie_link_speed: u16,
    pub pcie_bandwidth_inst: u64,
    pub pcie_replay_count_acc: u64,
    pub xgmi_link_width: u16,
    pub xgmi_link_speed: u16,
    pub xgmi_read_data_acc: [u64; 8],
    pub xgmi_write_data_acc: [u64; 8],
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PowerInfo {
    /// W, all-ones on ASICs that only report an average.
    pub current_socket_power: u32,
    /// W
    pub average_socket_power: u32,
    /// mV
    pub gfx_voltage: u32,
    pub soc_voltage: u32,
    pub mem_voltage: u32,
    /// W
    pub power_limit: u32,
}

/// Clock state in MHz.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClockInfo {
    pub clk: u32,
    pub min_clk: u32,
    pub max_clk: u32,
    pub clk_locked: bool,
    pub clk_deep_sleep: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClockType {
    Gfx,
    Df,
    Dcef,
    Soc,
    Mem,
    Pcie,
    Vclk0,
    Vclk1,
    Dclk0,
    Dclk1,
}

impl ClockType {
    pub fn raw(self) -> u32 {
        match self {
            ClockType::Gfx => 0,
            ClockType::Df => 1,
            ClockType::Dcef => 2,
            ClockType::Soc => 3,
            ClockType::Mem => 4,
            ClockType::Pcie => 5,
            ClockType::Vclk0 => 6,
            ClockType::Vclk1 => 7,
            ClockType::Dclk0 => 8,
            ClockType::Dclk1 => 9,
        }
    }

    /// Accepts the spellings operators use on the command line.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "sclk" | "gfx" | "sys" | "gfxclk" => Some(ClockType::Gfx),
            "fclk" | "df" => Some(ClockType::Df),
            "dcefclk" | "dcef" => Some(ClockType::Dcef),
            "socclk" | "soc" => Some(ClockType::Soc),
            "mclk" | "mem" | "uclk" => Some(ClockType::Mem),
            "pcie" => Some(ClockType::Pcie),
            "vclk0" => Some(ClockType::Vclk0),
            "vclk1" => Some(ClockType::Vclk1),
            "dclk0" => Some(ClockType::Dclk0),
            "dclk1" => Some(ClockType::Dclk1),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ClockType::Gfx => "GFX",
            ClockType::Df => "DF",
            ClockType::Dcef => "DCEF",
            ClockType::Soc => "SOC",
            ClockType::Mem => "MEM",
            ClockType::Pcie => "PCIE",
            ClockType::Vclk0 => "VCLK0",
            ClockType::Vclk1 => "VCLK1",
            ClockType::Dclk0 => "DCLK0",
            ClockType::Dclk1 => "DCLK1",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockLimit {
    Min,
    Max,
}

impl ClockLimit {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "min" => Some(ClockLimit::Min),
            "max" => Some(ClockLimit::Max),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ClockLimit::Min => "min",
            ClockLimit::Max => "max",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemperatureSensor {
    Edge,
    Hotspot,
    Vram,
    Hbm0,
    Hbm1,
    Hbm2,
    Hbm3,
    Plx,
}

impl TemperatureSensor {
    pub fn raw(self) -> u32 {
        match self {
            TemperatureSensor::Edge => 0,
            TemperatureSensor::Hotspot => 1,
            TemperatureSensor::Vram => 2,
            TemperatureSensor::Hbm0 => 3,
            TemperatureSensor::Hbm1 => 4,
            TemperatureSensor::Hbm2 => 5,
            TemperatureSensor::Hbm3 => 6,
            TemperatureSensor::Plx => 7,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemperatureMetric {
    Current,
    Max,
    Min,
    MaxHyst,
    MinHyst,
    Critical,
    CriticalHyst,
    Emergency,
    EmergencyHyst,
    CritMin,
    CritMinHyst,
    Offset,
    Lowest,
    Highest,
}

impl TemperatureMetric {
    pub fn raw(self) -> u32 {
        self as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryType {
    Vram,
    VisVram,
    Gtt,
}

impl MemoryType {
    pub fn raw(self) -> u32 {
        match self {
            MemoryType::Vram => 0,
            MemoryType::VisVram => 1,
            MemoryType::Gtt => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VoltCurvePoint {
    /// MHz
    pub frequency: u64,
    /// mV
    pub voltage: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OdVoltCurve {
    pub points: Vec<VoltCurvePoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerfLevel {
    Auto,
    Low,
    High,
    Manual,
    StableStd,
    StablePeak,
    StableMinMclk,
    StableMinSclk,
    Determinism,
    Unknown,
}

impl PerfLevel {
    pub const SETTABLE: [PerfLevel; 9] = [
        PerfLevel::Auto,
        PerfLevel::Low,
        PerfLevel::High,
        PerfLevel::Manual,
        PerfLevel::StableStd,
        PerfLevel::StablePeak,
        PerfLevel::StableMinMclk,
        PerfLevel::StableMinSclk,
        PerfLevel::Determinism,
    ];

    pub fn raw(self) -> u32 {
        match self {
            PerfLevel::Unknown => 0x100,
            other => PerfLevel::SETTABLE
                .iter()
                .position(|level| *level == other)
                .unwrap_or(0) as u32,
        }
    }

    pub fn from_raw(raw: u32) -> Self {
        PerfLevel::SETTABLE
            .get(raw as usize)
            .copied()
            .unwrap_or(PerfLevel::Unknown)
    }

    pub fn name(self) -> &'static str {
        match self {
            PerfLevel::Auto => "AMDSMI_DEV_PERF_LEVEL_AUTO",
            PerfLevel::Low => "AMDSMI_DEV_PERF_LEVEL_LOW",
            PerfLevel::High => "AMDSMI_DEV_PERF_LEVEL_HIGH",
            PerfLevel::Manual => "AMDSMI_DEV_PERF_LEVEL_MANUAL",
            PerfLevel::StableStd => "AMDSMI_DEV_PERF_LEVEL_STABLE_STD",
            PerfLevel::StablePeak => "AMDSMI_DEV_PERF_LEVEL_STABLE_PEAK",
            PerfLevel::StableMinMclk => "AMDSMI_DEV_PERF_LEVEL_STABLE_MIN_MCLK",
            PerfLevel::StableMinSclk => "AMDSMI_DEV_PERF_LEVEL_STABLE_MIN_SCLK",
            PerfLevel::Determinism => "AMDSMI_DEV_PERF_LEVEL_DETERMINISM",
            PerfLevel::Unknown => "AMDSMI_DEV_PERF_LEVEL_UNKNOWN",
        }
    }

    /// Short command-line spelling: `AUTO`, `STABLE_PEAK`, ...
    pub fn short_name(self) -> &'static str {
        self.name().trim_start_matches("AMDSMI_DEV_PERF_LEVEL_")
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let upper = name.to_ascii_uppercase();
        PerfLevel::SETTABLE
            .iter()
            .copied()
            .find(|level| level.short_name() == upper || level.name() == upper)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerProfile {
    Custom,
    Video,
    PowerSaving,
    Compute,
    Vr,
    FullScreen3d,
    BootupDefault,
}

impl PowerProfile {
    pub const ALL: [PowerProfile; 7] = [
        PowerProfile::Custom,
        PowerProfile::Video,
        PowerProfile::PowerSaving,
        PowerProfile::Compute,
        PowerProfile::Vr,
        PowerProfile::FullScreen3d,
        PowerProfile::BootupDefault,
    ];

    pub fn mask(self) -> u64 {
        match self {
            PowerProfile::Custom => 0x1,
            PowerProfile::Video => 0x2,
            PowerProfile::PowerSaving => 0x4,
            PowerProfile::Compute => 0x8,
            PowerProfile::Vr => 0x10,
            PowerProfile::FullScreen3d => 0x20,
            PowerProfile::BootupDefault => 0x40,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PowerProfile::Custom => "CUSTOM",
            PowerProfile::Video => "VIDEO",
            PowerProfile::PowerSaving => "POWER_SAVING",
            PowerProfile::Compute => "COMPUTE",
            PowerProfile::Vr => "VR",
            PowerProfile::FullScreen3d => "3D_FULL_SCR",
            PowerProfile::BootupDefault => "BOOTUP_DEFAULT",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let upper = name.to_ascii_uppercase();
        PowerProfile::ALL.iter().copied().find(|p| p.name() == upper)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EnergyCount {
    pub accumulator: u64,
    pub counter_resolution: f32,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XgmiStatus {
    NoErrors,
    Error,
    MultipleErrors,
}

impl XgmiStatus {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => XgmiStatus::NoErrors,
            1 => XgmiStatus::Error,
            _ => XgmiStatus::MultipleErrors,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            XgmiStatus::NoErrors => "NO_ERRORS",
            XgmiStatus::Error => "ERROR",
            XgmiStatus::MultipleErrors => "MULTIPLE_ERRORS",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStatus {
    Reserved,
    Pending,
    Unreservable,
}

impl PageStatus {
    pub fn name(self) -> &'static str {
        match self {
            PageStatus::Reserved => "RESERVED",
            PageStatus::Pending => "PENDING",
            PageStatus::Unreservable => "UNRESERVABLE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BadPage {
    pub page_address: u64,
    pub page_size: u64,
    pub status: PageStatus,
}

/// Time spent on each engine, in nanoseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineTime {
    pub gfx: u64,
    pub enc: u64,
}

/// Memory footprint in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessMemory {
    pub gtt_mem: u64,
    pub cpu_mem: u64,
    pub vram_mem: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessInfo {
    pub name: String,
    pub pid: u32,
    pub mem: u64,
    pub engine_usage: EngineTime,
    pub memory_usage: ProcessMemory,
    pub container_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FwEntry {
    pub fw_id: String,
    pub fw_version: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FwErrorRecord {
    pub fw_id: String,
    pub error_count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionInfo {
    pub compute_partition: String,
    pub memory_partition: String,
    pub partition_id: u32,
}

/// SoC P-state or XGMI PLPD policy table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DpmPolicy {
    pub current: u32,
    pub policies: Vec<(u32, String)>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NumaInfo {
    /// `-1` when the device is not bound to a node.
    pub node: i32,
    pub affinity: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkType {
    #[default]
    Unknown,
    Pcie,
    Xgmi,
}

impl LinkType {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            1 => LinkType::Pcie,
            2 => LinkType::Xgmi,
            _ => LinkType::Unknown,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LinkType::Unknown => "UNKNOWN",
            LinkType::Pcie => "PCIE",
            LinkType::Xgmi => "XGMI",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct P2pCaps {
    pub coherent: bool,
    pub atomics_32bit: bool,
    pub atomics_64bit: bool,
    pub dma: bool,
    pub bi_directional: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkMetric {
    pub bdf: Bdf,
    /// Gb/s
    pub bit_rate: u32,
    /// Gb/s
    pub max_bandwidth: u32,
    pub link_type: LinkType,
    /// KB
    pub read: u64,
    /// KB
    pub write: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XgmiLinkInfo {
    /// Gb/s
    pub bit_rate: u32,
    pub max_width: u32,
    pub links: Vec<LinkMetric>,
}

/// Throttle accounting since boot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViolationStatus {
    pub acc_counter: u64,
    /// Percent of samples in each violation.
    pub per_prochot_thrm: u64,
    pub per_ppt_pwr: u64,
    pub per_socket_thrm: u64,
    pub per_vr_thrm: u64,
    pub per_hbm_thrm: u64,
    pub active_prochot_thrm: bool,
    pub active_ppt_pwr: bool,
    pub active_socket_thrm: bool,
    pub active_vr_thrm: bool,
    pub active_hbm_thrm: bool,
}

// CPU side

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SmuFwVersion {
    pub major: u8,
    pub minor: u8,
    pub debug: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FreqLimit {
    /// MHz
    pub freq: u16,
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SocketFreqRange {
    pub fmax: u16,
    pub fmin: u16,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DpmLevel {
    pub max_dpm_level: u8,
    pub min_dpm_level: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DdrBandwidth {
    /// Gbps
    pub max_bw: u32,
    pub utilized_bw: u32,
    pub utilized_pct: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DimmTempRange {
    pub range: u8,
    pub refresh_rate: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DimmPower {
    /// mW
    pub power: u16,
    /// ms
    pub update_rate: u16,
    pub dimm_addr: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DimmThermal {
    pub sensor: u16,
    /// ms
    pub update_rate: u16,
    pub dimm_addr: u8,
    /// °C
    pub temp: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricsTableEntry {
    pub name: String,
    pub value: f64,
    pub unit: String,
}

// Events

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    VmFault,
    ThermalThrottle,
    GpuPreReset,
    GpuPostReset,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [
        EventKind::VmFault,
        EventKind::ThermalThrottle,
        EventKind::GpuPreReset,
        EventKind::GpuPostReset,
    ];

    pub fn raw(self) -> u32 {
        match self {
            EventKind::VmFault => 1,
            EventKind::ThermalThrottle => 2,
            EventKind::GpuPreReset => 3,
            EventKind::GpuPostReset => 4,
        }
    }

    pub fn from_raw(raw: u32) -> Option<Self> {
        EventKind::ALL.iter().copied().find(|kind| kind.raw() == raw)
    }

    pub fn mask(self) -> u64 {
        1 << (self.raw() - 1)
    }

    pub fn all_mask() -> u64 {
        EventKind::ALL.iter().fold(0, |mask, kind| mask | kind.mask())
    }

    pub fn name(self) -> &'static str {
        match self {
            EventKind::VmFault => "VM_FAULT",
            EventKind::ThermalThrottle => "THERMAL_THROTTLE",
            EventKind::GpuPreReset => "GPU_PRE_RESET",
            EventKind::GpuPostReset => "GPU_POST_RESET",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventNotification {
    pub processor: ProcessorHandle,
    pub kind: EventKind,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vram_type_ceiling() {
        assert_eq!(vram_type_name(22), "GDDR6");
        assert_eq!(vram_type_name(23), "GDDR7");
        assert_eq!(vram_type_name(99), "GDDR7");
        assert_eq!(vram_type_name(0), "UNKNOWN");
    }

    #[test]
    fn test_metric_sentinels() {
        assert_eq!(u16::MAX.available(), None);
        assert_eq!(42u16.available(), Some(42));
        assert_eq!(u32::MAX.available(), None);
        assert_eq!(u64::MAX.available(), None);
        assert_eq!(0u64.available(), Some(0));
    }

    #[test]
    fn test_perf_level_names() {
        assert_eq!(PerfLevel::from_name("stable_peak"), Some(PerfLevel::StablePeak));
        assert_eq!(PerfLevel::from_raw(0x100), PerfLevel::Unknown);
        assert_eq!(PerfLevel::Determinism.raw(), 8);
        assert_eq!(PerfLevel::Auto.short_name(), "AUTO");
    }

    #[test]
    fn test_gpu_block_bits() {
        assert_eq!(GpuBlock::Umc.bit(), 0x1);
        assert_eq!(GpuBlock::XgmiWafl.bit(), 0x80);
        assert_eq!(GpuBlock::Fuse.bit(), 0x2000);
    }

    #[test]
    fn test_event_mask() {
        assert_eq!(EventKind::VmFault.mask(), 0b0001);
        assert_eq!(EventKind::all_mask(), 0b1111);
    }

    #[test]
    fn test_init_flags() {
        let both = InitFlags::AMD_GPUS | InitFlags::AMD_CPUS;
        assert!(both.contains(InitFlags::AMD_GPUS));
        assert!(!InitFlags::AMD_CPUS.contains(InitFlags::AMD_GPUS));
        assert!(InitFlags::ALL_PROCESSORS.contains(InitFlags::AMD_GPUS));
    }
}
