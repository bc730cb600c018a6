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

use std::fmt;
use std::path::Path;
use std::process::Command;

use tracing::debug;

use crate::native::{InitFlags, SmiLibrary};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsKind {
    Linux,
    Windows,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Baremetal,
    VirtualGuest,
    Hypervisor,
}

/// What the tool is running on. Computed once at startup and never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformInfo {
    pub os: OsKind,
    pub role: Role,
    pub gpu_initialised: bool,
    pub cpu_initialised: bool,
}

// Host side of AMD MxGPU virtualisation binds PFs to this driver.
const HYPERVISOR_DRIVER_PATH: &str = "/sys/bus/pci/drivers/gim";

impl PlatformInfo {
    pub fn new(os: OsKind, role: Role, gpu_initialised: bool, cpu_initialised: bool) -> Self {
        Self {
            os,
            role,
            gpu_initialised,
            cpu_initialised,
        }
    }

    /// Linux bare-metal host with the given device families up.
    pub fn linux_baremetal(gpu_initialised: bool, cpu_initialised: bool) -> Self {
        Self::new(OsKind::Linux, Role::Baremetal, gpu_initialised, cpu_initialised)
    }

    /// Probe the host and initialise the library for every family it serves.
    pub fn detect(lib: &dyn SmiLibrary) -> Self {
        let os = if cfg!(windows) {
            OsKind::Windows
        } else {
            OsKind::Linux
        };
        let role = detect_role(os);
        let (gpu_initialised, cpu_initialised) = initialise(lib);
        debug!("Platform: os={os:?} role={role:?} gpu={gpu_initialised} cpu={cpu_initialised}");
        Self::new(os, role, gpu_initialised, cpu_initialised)
    }

    pub fn is_linux(&self) -> bool {
        self.os == OsKind::Linux
    }

    pub fn is_windows(&self) -> bool {
        self.os == OsKind::Windows
    }

    pub fn is_baremetal(&self) -> bool {
        self.role == Role::Baremetal
    }

    pub fn is_virtual_guest(&self) -> bool {
        self.role == Role::VirtualGuest
    }

    pub fn is_hypervisor(&self) -> bool {
        self.role == Role::Hypervisor
    }
}

impl fmt::Display for PlatformInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let os = match self.os {
            OsKind::Linux => "Linux",
            OsKind::Windows => "Windows",
        };
        let role = match self.role {
            Role::Baremetal => "Baremetal",
            Role::VirtualGuest => "Guest",
            Role::Hypervisor => "Hypervisor",
        };
        write!(f, "{os} {role}")
    }
}

fn initialise(lib: &dyn SmiLibrary) -> (bool, bool) {
    let both = InitFlags::AMD_GPUS | InitFlags::AMD_CPUS;
    if lib.init(both).is_ok() {
        return (true, true);
    }
    let gpu = lib.init(InitFlags::AMD_GPUS).is_ok();
    let cpu = lib.init(InitFlags::AMD_CPUS).is_ok();
    (gpu, cpu)
}

fn detect_role(os: OsKind) -> Role {
    if os != OsKind::Linux {
        return Role::Baremetal;
    }
    if Path::new(HYPERVISOR_DRIVER_PATH).exists() {
        return Role::Hypervisor;
    }
    if cpu_reports_hypervisor() {
        Role::VirtualGuest
    } else {
        Role::Baremetal
    }
}

fn cpu_reports_hypervisor() -> bool {
    if let Ok(cpuinfo) = std::fs::read_to_string("/proc/cpuinfo") {
        return cpuinfo_has_hypervisor_flag(&cpuinfo);
    }
    match Command::new("lscpu").output() {
        Ok(output) => String::from_utf8_lossy(&output.stdout).contains("hypervisor"),
        Err(e) => {
            debug!("lscpu unavailable: {e}");
            false
        }
    }
}

fn cpuinfo_has_hypervisor_flag(cpuinfo: &str) -> bool {
    cpuinfo
        .lines()
        .filter(|line| line.starts_with("flags"))
        .any(|line| line.split_whitespace().any(|flag| flag == "hypervisor"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hypervisor_flag_detection() {
        let guest = "processor\t: 0\nflags\t\t: fpu vme de hypervisor lahf_lm\n";
        let host = "processor\t: 0\nflags\t\t: fpu vme de pse lahf_lm\n";
        assert!(cpuinfo_has_hypervisor_flag(guest));
        assert!(!cpuinfo_has_hypervisor_flag(host));
    }

    #[test]
    fn test_display() {
        let info = PlatformInfo::new(OsKind::Linux, Role::VirtualGuest, true, false);
        assert_eq!(info.to_string(), "Linux Guest");
        assert!(info.is_virtual_guest());
        assert!(!info.is_baremetal());
    }
}
