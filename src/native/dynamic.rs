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

//! `libamd_smi.so` loaded at runtime through `libloading`.
//!
//! Only the entry points whose C layouts are stable across library releases
//! are bound here. Everything else falls through to the trait defaults and
//! is reported as not supported.

use std::ffi::{c_char, c_void, CStr};
use std::path::{Path, PathBuf};

use libloading::{Library, Symbol};
use tracing::debug;

use crate::common::config::EnvConfig;
use crate::device::Bdf;

use super::{
    AsicInfo, ClockInfo, ClockType, EccCount, EnergyCount, EngineActivity, GpuBlock, InitFlags,
    LibVersion, MemoryType, NativeResult, PcieThroughput, PerfLevel, PowerCapInfo, PowerInfo,
    ProcessorHandle, ProcessorType, SmiLibrary, SocketHandle, Status, TemperatureMetric,
    TemperatureSensor, VbiosInfo,
};

const MAX_STRING_LENGTH: usize = 64;
const NORMAL_STRING_LENGTH: usize = 32;
const MAX_DATE_LENGTH: usize = 32;
const GPU_UUID_SIZE: usize = 38;

#[repr(C)]
struct RawVersion {
    year: u32,
    major: u32,
    minor: u32,
    release: u32,
    build: *const c_char,
}

#[repr(C)]
struct RawEngineUsage {
    gfx_activity: u32,
    umc_activity: u32,
    mm_activity: u32,
    reserved: [u32; 13],
}

#[repr(C)]
struct RawPowerInfo {
    average_socket_power: u32,
    gfx_voltage: u32,
    soc_voltage: u32,
    mem_voltage: u32,
    power_limit: u32,
    reserved: [u32; 11],
}

#[repr(C)]
struct RawClockInfo {
    cur_clk: u32,
    min_clk: u32,
    max_clk: u32,
    reserved: [u32; 5],
}

#[repr(C)]
struct RawPowerCapInfo {
    power_cap: u64,
    default_power_cap: u64,
    dpm_cap: u64,
    min_power_cap: u64,
    max_power_cap: u64,
    reserved: [u64; 3],
}

#[repr(C)]
struct RawErrorCount {
    correctable_count: u64,
    uncorrectable_count: u64,
    reserved: [u64; 2],
}

#[repr(C)]
struct RawAsicInfo {
    market_name: [c_char; MAX_STRING_LENGTH],
    vendor_id: u32,
    subvendor_id: u32,
    device_id: u64,
    rev_id: u32,
    asic_serial: [c_char; NORMAL_STRING_LENGTH],
    reserved: [u32; 3],
}

#[repr(C)]
struct RawVbiosInfo {
    name: [c_char; MAX_STRING_LENGTH],
    build_date: [c_char; MAX_DATE_LENGTH],
    part_number: [c_char; MAX_STRING_LENGTH],
    version: [c_char; NORMAL_STRING_LENGTH],
    reserved: [u32; 16],
}

type RawHandle = *mut c_void;

type InitFn = unsafe extern "C" fn(u64) -> u32;
type ShutDownFn = unsafe extern "C" fn() -> u32;
type SocketHandlesFn = unsafe extern "C" fn(*mut u32, *mut RawHandle) -> u32;
type ProcessorHandlesFn = unsafe extern "C" fn(RawHandle, *mut u32, *mut RawHandle) -> u32;
type ProcessorTypeFn = unsafe extern "C" fn(RawHandle, *mut u32) -> u32;
type BdfFn = unsafe extern "C" fn(RawHandle, *mut u64) -> u32;
type UuidFn = unsafe extern "C" fn(RawHandle, *mut u32, *mut c_char) -> u32;
type LibVersionFn = unsafe extern "C" fn(*mut RawVersion) -> u32;
type StructFn<T> = unsafe extern "C" fn(RawHandle, *mut T) -> u32;
type ClockInfoFn = unsafe extern "C" fn(RawHandle, u32, *mut RawClockInfo) -> u32;
type TempFn = unsafe extern "C" fn(RawHandle, u32, u32, *mut i64) -> u32;
type FanI64Fn = unsafe extern "C" fn(RawHandle, u32, *mut i64) -> u32;
type FanU64Fn = unsafe extern "C" fn(RawHandle, u32, *mut u64) -> u32;
type PowerCapFn = unsafe extern "C" fn(RawHandle, u32, *mut RawPowerCapInfo) -> u32;
type EnergyFn = unsafe extern "C" fn(RawHandle, *mut u64, *mut f32, *mut u64) -> u32;
type ThroughputFn = unsafe extern "C" fn(RawHandle, *mut u64, *mut u64, *mut u64) -> u32;
type EccBlockFn = unsafe extern "C" fn(RawHandle, u64, *mut RawErrorCount) -> u32;
type U32OutFn = unsafe extern "C" fn(RawHandle, *mut u32) -> u32;
type MemoryFn = unsafe extern "C" fn(RawHandle, u32, *mut u64) -> u32;
type SetFanFn = unsafe extern "C" fn(RawHandle, u32, u64) -> u32;
type HandleU32Fn = unsafe extern "C" fn(RawHandle, u32) -> u32;
type SetPowerCapFn = unsafe extern "C" fn(RawHandle, u32, u64) -> u32;
type HandleFn = unsafe extern "C" fn(RawHandle) -> u32;

/// The vendor library, opened from the first candidate path that loads.
pub struct DynamicLibrary {
    library: Library,
    path: PathBuf,
}

// The library serialises access internally; handles are plain tokens.
unsafe impl Send for DynamicLibrary {}
unsafe impl Sync for DynamicLibrary {}

impl DynamicLibrary {
    /// Search the configured locations and open the first library found.
    pub fn load() -> NativeResult<Self> {
        for candidate in EnvConfig::library_candidates() {
            match Self::open(&candidate) {
                Ok(lib) => return Ok(lib),
                Err(e) => debug!("Failed to load {}: {e}", candidate.display()),
            }
        }
        Err(Status::FailLoadModule)
    }

    pub fn open(path: &Path) -> Result<Self, libloading::Error> {
        debug!("Trying to load library at: {}", path.display());
        let library = unsafe { Library::new(path) }?;
        debug!("Loaded {}", path.display());
        Ok(Self {
            library,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn symbol<T>(&self, name: &[u8]) -> NativeResult<Symbol<'_, T>> {
        unsafe { self.library.get::<T>(name) }.map_err(|e| {
            debug!(
                "Missing symbol {}: {e}",
                String::from_utf8_lossy(name.strip_suffix(b"\0").unwrap_or(name))
            );
            Status::FailLoadSymbol
        })
    }

    fn read_struct<T>(&self, name: &[u8], handle: ProcessorHandle) -> NativeResult<T> {
        let f = self.symbol::<StructFn<T>>(name)?;
        let mut out = std::mem::MaybeUninit::<T>::zeroed();
        Status::check(unsafe { f(raw(handle), out.as_mut_ptr()) })?;
        Ok(unsafe { out.assume_init() })
    }

    fn call_handle(&self, name: &[u8], handle: ProcessorHandle) -> NativeResult<()> {
        let f = self.symbol::<HandleFn>(name)?;
        Status::check(unsafe { f(raw(handle)) })
    }

    fn handles_via<F>(&self, fetch: F) -> NativeResult<Vec<RawHandle>>
    where
        F: Fn(*mut u32, *mut RawHandle) -> u32,
    {
        let mut count = 0u32;
        Status::check(fetch(&mut count, std::ptr::null_mut()))?;
        let mut handles: Vec<RawHandle> = vec![std::ptr::null_mut(); count as usize];
        Status::check(fetch(&mut count, handles.as_mut_ptr()))?;
        handles.truncate(count as usize);
        Ok(handles)
    }
}

fn raw(handle: ProcessorHandle) -> RawHandle {
    handle.0 as usize as RawHandle
}

fn wrap(ptr: RawHandle) -> u64 {
    ptr as usize as u64
}

fn c_chars(buf: &[c_char]) -> String {
    let bytes: Vec<u8> = buf
        .iter()
        .take_while(|c| **c != 0)
        .map(|c| *c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).trim().to_string()
}

impl SmiLibrary for DynamicLibrary {
    fn init(&self, flags: InitFlags) -> NativeResult<()> {
        let f = self.symbol::<InitFn>(b"amdsmi_init\0")?;
        Status::check(unsafe { f(flags.0) })
    }

    fn shut_down(&self) -> NativeResult<()> {
        let f = self.symbol::<ShutDownFn>(b"amdsmi_shut_down\0")?;
        Status::check(unsafe { f() })
    }

    fn socket_handles(&self) -> NativeResult<Vec<SocketHandle>> {
        let f = self.symbol::<SocketHandlesFn>(b"amdsmi_get_socket_handles\0")?;
        let handles = self.handles_via(|count, out| unsafe { f(count, out) })?;
        Ok(handles.into_iter().map(|h| SocketHandle(wrap(h))).collect())
    }

    fn processor_handles(&self, socket: SocketHandle) -> NativeResult<Vec<ProcessorHandle>> {
        let f = self.symbol::<ProcessorHandlesFn>(b"amdsmi_get_processor_handles\0")?;
        let socket = socket.0 as usize as RawHandle;
        let handles = self.handles_via(|count, out| unsafe { f(socket, count, out) })?;
        Ok(handles
            .into_iter()
            .map(|h| ProcessorHandle(wrap(h)))
            .collect())
    }

    fn processor_type(&self, handle: ProcessorHandle) -> NativeResult<ProcessorType> {
        let f = self.symbol::<ProcessorTypeFn>(b"amdsmi_get_processor_type\0")?;
        let mut kind = 0u32;
        Status::check(unsafe { f(raw(handle), &mut kind) })?;
        Ok(ProcessorType::from_raw(kind))
    }

    fn lib_version(&self) -> NativeResult<LibVersion> {
        let f = self.symbol::<LibVersionFn>(b"amdsmi_get_lib_version\0")?;
        let mut version = RawVersion {
            year: 0,
            major: 0,
            minor: 0,
            release: 0,
            build: std::ptr::null(),
        };
        Status::check(unsafe { f(&mut version) })?;
        let build = if version.build.is_null() {
            String::new()
        } else {
            unsafe { CStr::from_ptr(version.build) }
                .to_string_lossy()
                .into_owned()
        };
        Ok(LibVersion {
            year: version.year,
            major: version.major,
            minor: version.minor,
            release: version.release,
            build,
        })
    }

    fn gpu_bdf(&self, handle: ProcessorHandle) -> NativeResult<Bdf> {
        let f = self.symbol::<BdfFn>(b"amdsmi_get_gpu_device_bdf\0")?;
        let mut packed = 0u64;
        Status::check(unsafe { f(raw(handle), &mut packed) })?;
        Ok(Bdf::from_packed(packed))
    }

    fn gpu_uuid(&self, handle: ProcessorHandle) -> NativeResult<String> {
        let f = self.symbol::<UuidFn>(b"amdsmi_get_gpu_device_uuid\0")?;
        let mut buf: [c_char; GPU_UUID_SIZE] = [0; GPU_UUID_SIZE];
        let mut len = GPU_UUID_SIZE as u32;
        Status::check(unsafe { f(raw(handle), &mut len, buf.as_mut_ptr()) })?;
        Ok(c_chars(&buf))
    }

    fn gpu_asic_info(&self, handle: ProcessorHandle) -> NativeResult<AsicInfo> {
        let info: RawAsicInfo = self.read_struct(b"amdsmi_get_gpu_asic_info\0", handle)?;
        Ok(AsicInfo {
            market_name: c_chars(&info.market_name),
            vendor_id: info.vendor_id,
            subvendor_id: info.subvendor_id,
            device_id: info.device_id,
            rev_id: info.rev_id,
            asic_serial: c_chars(&info.asic_serial),
            ..AsicInfo::default()
        })
    }

    fn gpu_vbios_info(&self, handle: ProcessorHandle) -> NativeResult<VbiosInfo> {
        let info: RawVbiosInfo = self.read_struct(b"amdsmi_get_gpu_vbios_info\0", handle)?;
        Ok(VbiosInfo {
            name: c_chars(&info.name),
            build_date: c_chars(&info.build_date),
            part_number: c_chars(&info.part_number),
            version: c_chars(&info.version),
        })
    }

    fn power_cap_info(&self, handle: ProcessorHandle, sensor: u32) -> NativeResult<PowerCapInfo> {
        let f = self.symbol::<PowerCapFn>(b"amdsmi_get_power_cap_info\0")?;
        let mut info = std::mem::MaybeUninit::<RawPowerCapInfo>::zeroed();
        Status::check(unsafe { f(raw(handle), sensor, info.as_mut_ptr()) })?;
        let info = unsafe { info.assume_init() };
        Ok(PowerCapInfo {
            power_cap: info.power_cap,
            default_power_cap: info.default_power_cap,
            dpm_cap: info.dpm_cap,
            min_power_cap: info.min_power_cap,
            max_power_cap: info.max_power_cap,
        })
    }

    fn gpu_activity(&self, handle: ProcessorHandle) -> NativeResult<EngineActivity> {
        let usage: RawEngineUsage = self.read_struct(b"amdsmi_get_gpu_activity\0", handle)?;
        Ok(EngineActivity {
            gfx_activity: usage.gfx_activity,
            umc_activity: usage.umc_activity,
            mm_activity: usage.mm_activity,
        })
    }

    fn temperature(
        &self,
        handle: ProcessorHandle,
        sensor: TemperatureSensor,
        metric: TemperatureMetric,
    ) -> NativeResult<i64> {
        let f = self.symbol::<TempFn>(b"amdsmi_get_temp_metric\0")?;
        let mut value = 0i64;
        Status::check(unsafe { f(raw(handle), sensor.raw(), metric.raw(), &mut value) })?;
        Ok(value)
    }

    fn fan_rpms(&self, handle: ProcessorHandle, sensor: u32) -> NativeResult<i64> {
        let f = self.symbol::<FanI64Fn>(b"amdsmi_get_gpu_fan_rpms\0")?;
        let mut value = 0i64;
        Status::check(unsafe { f(raw(handle), sensor, &mut value) })?;
        Ok(value)
    }

    fn fan_speed(&self, handle: ProcessorHandle, sensor: u32) -> NativeResult<i64> {
        let f = self.symbol::<FanI64Fn>(b"amdsmi_get_gpu_fan_speed\0")?;
        let mut value = 0i64;
        Status::check(unsafe { f(raw(handle), sensor, &mut value) })?;
        Ok(value)
    }

    fn fan_speed_max(&self, handle: ProcessorHandle, sensor: u32) -> NativeResult<u64> {
        let f = self.symbol::<FanU64Fn>(b"amdsmi_get_gpu_fan_speed_max\0")?;
        let mut value = 0u64;
        Status::check(unsafe { f(raw(handle), sensor, &mut value) })?;
        Ok(value)
    }

    fn power_info(&self, handle: ProcessorHandle) -> NativeResult<PowerInfo> {
        let info: RawPowerInfo = self.read_struct(b"amdsmi_get_power_info\0", handle)?;
        Ok(PowerInfo {
            // Not reported by this layout.
            current_socket_power: u32::MAX,
            average_socket_power: info.average_socket_power,
            gfx_voltage: info.gfx_voltage,
            soc_voltage: info.soc_voltage,
            mem_voltage: info.mem_voltage,
            power_limit: info.power_limit,
        })
    }

    fn clock_info(&self, handle: ProcessorHandle, clock: ClockType) -> NativeResult<ClockInfo> {
        let f = self.symbol::<ClockInfoFn>(b"amdsmi_get_clock_info\0")?;
        let mut info = std::mem::MaybeUninit::<RawClockInfo>::zeroed();
        Status::check(unsafe { f(raw(handle), clock.raw(), info.as_mut_ptr()) })?;
        let info = unsafe { info.assume_init() };
        Ok(ClockInfo {
            clk: info.cur_clk,
            min_clk: info.min_clk,
            max_clk: info.max_clk,
            clk_locked: false,
            clk_deep_sleep: false,
        })
    }

    fn pcie_throughput(&self, handle: ProcessorHandle) -> NativeResult<PcieThroughput> {
        let f = self.symbol::<ThroughputFn>(b"amdsmi_get_gpu_pci_throughput\0")?;
        let (mut sent, mut received, mut max_pkt_size) = (0u64, 0u64, 0u64);
        Status::check(unsafe { f(raw(handle), &mut sent, &mut received, &mut max_pkt_size) })?;
        Ok(PcieThroughput {
            sent,
            received,
            max_pkt_size,
        })
    }

    fn total_ecc_count(&self, handle: ProcessorHandle) -> NativeResult<EccCount> {
        let count: RawErrorCount = self.read_struct(b"amdsmi_get_gpu_total_ecc_count\0", handle)?;
        Ok(EccCount {
            correctable_count: count.correctable_count,
            uncorrectable_count: count.uncorrectable_count,
            deferred_count: None,
        })
    }

    fn ecc_count(&self, handle: ProcessorHandle, block: GpuBlock) -> NativeResult<EccCount> {
        let f = self.symbol::<EccBlockFn>(b"amdsmi_get_gpu_ecc_count\0")?;
        let mut count = std::mem::MaybeUninit::<RawErrorCount>::zeroed();
        Status::check(unsafe { f(raw(handle), block.bit(), count.as_mut_ptr()) })?;
        let count = unsafe { count.assume_init() };
        Ok(EccCount {
            correctable_count: count.correctable_count,
            uncorrectable_count: count.uncorrectable_count,
            deferred_count: None,
        })
    }

    fn perf_level(&self, handle: ProcessorHandle) -> NativeResult<PerfLevel> {
        let f = self.symbol::<U32OutFn>(b"amdsmi_get_gpu_perf_level\0")?;
        let mut level = 0u32;
        Status::check(unsafe { f(raw(handle), &mut level) })?;
        Ok(PerfLevel::from_raw(level))
    }

    fn overdrive_level(&self, handle: ProcessorHandle) -> NativeResult<u32> {
        let f = self.symbol::<U32OutFn>(b"amdsmi_get_gpu_overdrive_level\0")?;
        let mut od = 0u32;
        Status::check(unsafe { f(raw(handle), &mut od) })?;
        Ok(od)
    }

    fn energy_count(&self, handle: ProcessorHandle) -> NativeResult<EnergyCount> {
        let f = self.symbol::<EnergyFn>(b"amdsmi_get_energy_count\0")?;
        let (mut accumulator, mut resolution, mut timestamp) = (0u64, 0f32, 0u64);
        Status::check(unsafe { f(raw(handle), &mut accumulator, &mut resolution, &mut timestamp) })?;
        Ok(EnergyCount {
            accumulator,
            counter_resolution: resolution,
            timestamp,
        })
    }

    fn memory_total(&self, handle: ProcessorHandle, kind: MemoryType) -> NativeResult<u64> {
        let f = self.symbol::<MemoryFn>(b"amdsmi_get_gpu_memory_total\0")?;
        let mut total = 0u64;
        Status::check(unsafe { f(raw(handle), kind.raw(), &mut total) })?;
        Ok(total)
    }

    fn memory_usage(&self, handle: ProcessorHandle, kind: MemoryType) -> NativeResult<u64> {
        let f = self.symbol::<MemoryFn>(b"amdsmi_get_gpu_memory_usage\0")?;
        let mut used = 0u64;
        Status::check(unsafe { f(raw(handle), kind.raw(), &mut used) })?;
        Ok(used)
    }

    fn set_fan_speed(&self, handle: ProcessorHandle, sensor: u32, speed: u64) -> NativeResult<()> {
        let f = self.symbol::<SetFanFn>(b"amdsmi_set_gpu_fan_speed\0")?;
        Status::check(unsafe { f(raw(handle), sensor, speed) })
    }

    fn reset_fan(&self, handle: ProcessorHandle, sensor: u32) -> NativeResult<()> {
        let f = self.symbol::<HandleU32Fn>(b"amdsmi_reset_gpu_fan\0")?;
        Status::check(unsafe { f(raw(handle), sensor) })
    }

    fn set_perf_level(&self, handle: ProcessorHandle, level: PerfLevel) -> NativeResult<()> {
        let f = self.symbol::<HandleU32Fn>(b"amdsmi_set_gpu_perf_level\0")?;
        Status::check(unsafe { f(raw(handle), level.raw()) })
    }

    fn set_overdrive_level(&self, handle: ProcessorHandle, percent: u32) -> NativeResult<()> {
        let f = self.symbol::<HandleU32Fn>(b"amdsmi_set_gpu_overdrive_level\0")?;
        Status::check(unsafe { f(raw(handle), percent) })
    }

    fn set_power_cap(&self, handle: ProcessorHandle, sensor: u32, cap: u64) -> NativeResult<()> {
        let f = self.symbol::<SetPowerCapFn>(b"amdsmi_set_power_cap\0")?;
        Status::check(unsafe { f(raw(handle), sensor, cap) })
    }

    fn reset_gpu(&self, handle: ProcessorHandle) -> NativeResult<()> {
        self.call_handle(b"amdsmi_reset_gpu\0", handle)
    }

    fn reset_xgmi_error(&self, handle: ProcessorHandle) -> NativeResult<()> {
        self.call_handle(b"amdsmi_reset_gpu_xgmi_error\0", handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_c_chars_stops_at_nul() {
        let mut buf: [c_char; 8] = [0; 8];
        for (slot, byte) in buf.iter_mut().zip(b"MI300X\0z") {
            *slot = *byte as c_char;
        }
        assert_eq!(c_chars(&buf), "MI300X");
    }

    #[test]
    fn test_handle_conversion_round_trip() {
        let handle = ProcessorHandle(0xdead_beef);
        assert_eq!(wrap(raw(handle)), 0xdead_beef);
    }

    #[test]
    fn test_open_missing_library_fails() {
        assert!(DynamicLibrary::open(Path::new("/nonexistent/libamd_smi.so")).is_err());
    }
}
