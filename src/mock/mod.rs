//! Simulated AMD SMI library
//!
//! This module provides a deterministic in-process stand-in for the native
//! library so the whole command surface can run without hardware. It backs
//! the integration tests and `AMDSMI_MOCK=1` runs of the binary.

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

pub mod constants;
pub mod events;
mod library;

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::device::Bdf;
use crate::native::{
    BadPage, EventKind, LibVersion, NativeResult, PerfLevel, ProcessInfo, ProcessorHandle,
    SocketHandle, Status, VramInfo,
};

use constants::*;

const GPU_HANDLE_BASE: u64 = 0x1000;
const CPU_HANDLE_BASE: u64 = 0x2000;
const CORE_HANDLE_BASE: u64 = 0x3000;

/// One simulated accelerator.
#[derive(Debug, Clone)]
pub struct SimGpu {
    pub bdf: Bdf,
    pub uuid: String,
    pub vram: VramInfo,
    pub bad_pages: Vec<BadPage>,
    pub processes: Vec<ProcessInfo>,
}

impl SimGpu {
    fn generated(index: usize) -> Self {
        let bus = (0x03 + 0x20 * index) as u8;
        Self {
            bdf: Bdf::new(0, bus, 0, 0),
            uuid: format!("{index:02x}ff74a1-0000-1000-80c4-d2d2d2d2d2{index:02x}"),
            vram: VramInfo {
                vram_type: HBM3_RAW_TYPE,
                vendor: "SAMSUNG".to_string(),
                size_mb: VRAM_SIZE_MB,
                bit_width: VRAM_BIT_WIDTH,
            },
            bad_pages: Vec::new(),
            processes: Vec::new(),
        }
    }
}

/// Settings the mutators change and later reads observe.
#[derive(Debug, Clone)]
pub(crate) struct GpuState {
    pub fan_speed: i64,
    pub perf_level: PerfLevel,
    pub overdrive: u32,
    pub power_cap: u64,
    pub compute_partition: String,
    pub memory_partition: String,
    pub soc_pstate: u32,
    pub xgmi_plpd: u32,
    pub process_isolation: u32,
}

impl Default for GpuState {
    fn default() -> Self {
        Self {
            fan_speed: FAN_SPEED,
            perf_level: PerfLevel::Auto,
            overdrive: 0,
            power_cap: POWER_CAP_UW,
            compute_partition: "SPX".to_string(),
            memory_partition: "NPS1".to_string(),
            soc_pstate: 0,
            xgmi_plpd: 1,
            process_isolation: 0,
        }
    }
}

/// Deterministic implementation of [`crate::native::SmiLibrary`].
///
/// ```
/// use amd_smi::mock::SimulatedLibrary;
///
/// let lib = SimulatedLibrary::new().gpus(2).cpus(1, 4).fail("gpu_vram_info");
/// assert_eq!(lib.gpu_count(), 2);
/// ```
#[derive(Debug)]
pub struct SimulatedLibrary {
    gpus: Vec<SimGpu>,
    cpus: usize,
    cores_per_cpu: usize,
    version: LibVersion,
    failures: HashMap<String, Status>,
    throttle_status: u32,
    power_management: bool,
    xgmi: bool,
    events: Vec<(usize, EventKind, String)>,
    state: Mutex<Vec<GpuState>>,
}

impl Default for SimulatedLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedLibrary {
    /// An empty system. Add devices with [`gpus`](Self::gpus),
    /// [`gpu`](Self::gpu) and [`cpus`](Self::cpus).
    pub fn new() -> Self {
        Self {
            gpus: Vec::new(),
            cpus: 0,
            cores_per_cpu: 0,
            version: LibVersion {
                year: 24,
                major: 7,
                minor: 1,
                release: 0,
                build: "24.7.1.0".to_string(),
            },
            failures: HashMap::new(),
            throttle_status: 0,
            power_management: true,
            xgmi: false,
            events: Vec::new(),
            state: Mutex::new(Vec::new()),
        }
    }

    /// Append `count` GPUs with generated BDFs and UUIDs.
    pub fn gpus(mut self, count: usize) -> Self {
        for _ in 0..count {
            let gpu = SimGpu::generated(self.gpus.len());
            self.push_gpu(gpu);
        }
        self
    }

    /// Append one GPU with a fixed identity.
    pub fn gpu(mut self, bdf: Bdf, uuid: &str) -> Self {
        let mut gpu = SimGpu::generated(self.gpus.len());
        gpu.bdf = bdf;
        gpu.uuid = uuid.to_string();
        self.push_gpu(gpu);
        self
    }

    pub fn cpus(mut self, sockets: usize, cores_per_cpu: usize) -> Self {
        self.cpus = sockets;
        self.cores_per_cpu = cores_per_cpu;
        self
    }

    pub fn lib_version(mut self, year: u32, major: u32, minor: u32, release: u32) -> Self {
        self.version = LibVersion {
            year,
            major,
            minor,
            release,
            build: format!("{year}.{major}.{minor}.{release}"),
        };
        self
    }

    /// Replace the VRAM description of every GPU.
    pub fn vram(mut self, vram: VramInfo) -> Self {
        for gpu in &mut self.gpus {
            gpu.vram = vram.clone();
        }
        self
    }

    /// Reserved page records for the GPU at `index`.
    pub fn bad_pages(mut self, index: usize, pages: Vec<BadPage>) -> Self {
        if let Some(gpu) = self.gpus.get_mut(index) {
            gpu.bad_pages = pages;
        }
        self
    }

    /// Running processes for the GPU at `index`.
    pub fn processes(mut self, index: usize, processes: Vec<ProcessInfo>) -> Self {
        if let Some(gpu) = self.gpus.get_mut(index) {
            gpu.processes = processes;
        }
        self
    }

    /// Make the named [`SmiLibrary`](crate::native::SmiLibrary) operation
    /// fail with `NOT_SUPPORTED`.
    pub fn fail(self, operation: &str) -> Self {
        self.fail_with(operation, Status::NotSupported)
    }

    pub fn fail_with(mut self, operation: &str, status: Status) -> Self {
        self.failures.insert(operation.to_string(), status);
        self
    }

    /// gpu_metrics throttle bitmask; nonzero also marks PPT violations active.
    pub fn throttle(mut self, status: u32) -> Self {
        self.throttle_status = status;
        self
    }

    pub fn power_management(mut self, enabled: bool) -> Self {
        self.power_management = enabled;
        self
    }

    /// Connect every GPU pair over XGMI instead of PCIe.
    pub fn xgmi_links(mut self, enabled: bool) -> Self {
        self.xgmi = enabled;
        self
    }

    /// Queue a driver event for delivery on the GPU at `index`.
    pub fn event(mut self, index: usize, kind: EventKind, message: &str) -> Self {
        self.events.push((index, kind, message.to_string()));
        self
    }

    pub fn gpu_count(&self) -> usize {
        self.gpus.len()
    }

    pub fn gpu_handle(index: usize) -> ProcessorHandle {
        ProcessorHandle(GPU_HANDLE_BASE + index as u64)
    }

    fn push_gpu(&mut self, gpu: SimGpu) {
        self.gpus.push(gpu);
        self.lock_state().push(GpuState::default());
    }

    pub(crate) fn lock_state(&self) -> MutexGuard<'_, Vec<GpuState>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Injected failure for `operation`, if any.
    pub(crate) fn guard(&self, operation: &str) -> NativeResult<()> {
        match self.failures.get(operation) {
            Some(status) => Err(*status),
            None => Ok(()),
        }
    }

    pub(crate) fn gpu_index(&self, handle: ProcessorHandle) -> NativeResult<usize> {
        handle
            .0
            .checked_sub(GPU_HANDLE_BASE)
            .map(|i| i as usize)
            .filter(|i| *i < self.gpus.len() && handle.0 < CPU_HANDLE_BASE)
            .ok_or(Status::Inval)
    }

    pub(crate) fn sim_gpu(&self, handle: ProcessorHandle) -> NativeResult<&SimGpu> {
        let index = self.gpu_index(handle)?;
        self.gpus.get(index).ok_or(Status::Inval)
    }

    pub(crate) fn cpu_index(&self, handle: ProcessorHandle) -> NativeResult<usize> {
        match handle.0.checked_sub(CPU_HANDLE_BASE) {
            Some(i) if (i as usize) < self.cpus && handle.0 < CORE_HANDLE_BASE => Ok(i as usize),
            _ => Err(Status::Inval),
        }
    }

    pub(crate) fn core_index(&self, handle: ProcessorHandle) -> NativeResult<usize> {
        match handle.0.checked_sub(CORE_HANDLE_BASE) {
            Some(i) if (i as usize) < self.cpus * self.cores_per_cpu => Ok(i as usize),
            _ => Err(Status::Inval),
        }
    }

    /// GPUs sit one per socket, followed by the CPU sockets.
    pub(crate) fn socket_list(&self) -> Vec<SocketHandle> {
        (0..(self.gpus.len() + self.cpus) as u64)
            .map(SocketHandle)
            .collect()
    }

    pub(crate) fn socket_members(&self, socket: SocketHandle) -> NativeResult<Vec<ProcessorHandle>> {
        let index = socket.0 as usize;
        if index < self.gpus.len() {
            return Ok(vec![Self::gpu_handle(index)]);
        }
        let cpu = index - self.gpus.len();
        if cpu >= self.cpus {
            return Err(Status::Inval);
        }
        let mut members = vec![ProcessorHandle(CPU_HANDLE_BASE + cpu as u64)];
        members.extend(
            (0..self.cores_per_cpu)
                .map(|core| ProcessorHandle(CORE_HANDLE_BASE + (cpu * self.cores_per_cpu + core) as u64)),
        );
        Ok(members)
    }

    pub(crate) fn has_gpus(&self) -> bool {
        !self.gpus.is_empty()
    }

    pub(crate) fn has_cpus(&self) -> bool {
        self.cpus > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::{InitFlags, ProcessorType, SmiLibrary};

    #[test]
    fn test_generated_identities_are_distinct() {
        let lib = SimulatedLibrary::new().gpus(3);
        let bdfs: Vec<_> = (0..3)
            .map(|i| lib.gpu_bdf(SimulatedLibrary::gpu_handle(i)).unwrap())
            .collect();
        assert_eq!(bdfs[0].to_string(), "0000:03:00.0");
        assert_eq!(bdfs[1].to_string(), "0000:23:00.0");
        assert_ne!(
            lib.gpu_uuid(SimulatedLibrary::gpu_handle(0)).unwrap(),
            lib.gpu_uuid(SimulatedLibrary::gpu_handle(1)).unwrap()
        );
    }

    #[test]
    fn test_socket_layout() {
        let lib = SimulatedLibrary::new().gpus(1).cpus(1, 2);
        let sockets = lib.socket_handles().unwrap();
        assert_eq!(sockets.len(), 2);
        let cpu_members = lib.processor_handles(sockets[1]).unwrap();
        assert_eq!(cpu_members.len(), 3);
        assert_eq!(lib.processor_type(cpu_members[0]).unwrap(), ProcessorType::AmdCpu);
        assert_eq!(lib.processor_type(cpu_members[2]).unwrap(), ProcessorType::AmdCpuCore);
    }

    #[test]
    fn test_init_requires_devices() {
        let lib = SimulatedLibrary::new().gpus(1);
        assert!(lib.init(InitFlags::AMD_GPUS).is_ok());
        assert!(lib.init(InitFlags::AMD_CPUS).is_err());
        assert!(lib.init(InitFlags::AMD_GPUS | InitFlags::AMD_CPUS).is_err());
    }

    #[test]
    fn test_failure_injection() {
        let lib = SimulatedLibrary::new().gpus(1).fail("gpu_activity");
        let handle = SimulatedLibrary::gpu_handle(0);
        assert_eq!(lib.gpu_activity(handle), Err(Status::NotSupported));
        assert!(lib.power_info(handle).is_ok());
    }

    #[test]
    fn test_mutators_are_observed() {
        let lib = SimulatedLibrary::new().gpus(1);
        let handle = SimulatedLibrary::gpu_handle(0);
        lib.set_perf_level(handle, PerfLevel::High).unwrap();
        assert_eq!(lib.perf_level(handle).unwrap(), PerfLevel::High);
        lib.set_power_cap(handle, 0, 500_000_000).unwrap();
        assert_eq!(lib.power_cap_info(handle, 0).unwrap().power_cap, 500_000_000);
    }
}
