//! Fixed values reported by the simulated library

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

// Identity
pub const DEFAULT_AMD_GPU_NAME: &str = "AMD Instinct MI300X";
pub const DEFAULT_AMD_BOARD_NAME: &str = "AMD Instinct MI300X OAM";
pub const DEFAULT_AMD_VENDOR_NAME: &str = "Advanced Micro Devices Inc. [AMD/ATI]";
pub const DEFAULT_AMD_DRIVER_VERSION: &str = "6.8.5";
pub const DEFAULT_AMD_VBIOS_VERSION: &str = "022.040.003.043.000001";
pub const DEFAULT_TARGET_GRAPHICS_VERSION: &str = "gfx942";
pub const AMD_VENDOR_ID: u32 = 0x1002;
pub const MI300X_DEVICE_ID: u64 = 0x74a1;
pub const MI300X_COMPUTE_UNITS: u32 = 304;

// Memory
pub const HBM3_RAW_TYPE: u32 = 4;
pub const VRAM_SIZE_MB: u64 = 196_608;
pub const VRAM_BIT_WIDTH: u32 = 8192;
pub const VRAM_USED_MB: u64 = 283;
pub const GTT_SIZE_MB: u64 = 128 * 1024;
pub const GTT_USED_MB: u64 = 11;

// Power, in the library's native units
pub const POWER_CAP_UW: u64 = 750_000_000;
pub const CURRENT_SOCKET_POWER_W: u32 = 165;

// Clocks, MHz
pub const GFX_CLOCK_SLOTS: [u16; 8] = [2100, 2100, 138, 138, 2100, 2100, 132, 132];
pub const UCLK_MHZ: u16 = 900;
pub const VCLK_MHZ: u16 = 29;
pub const DCLK_MHZ: u16 = 22;

// Temperatures, °C: (current, critical, emergency)
pub const EDGE_TEMPS: (i64, i64, i64) = (38, 100, 105);
pub const HOTSPOT_TEMPS: (i64, i64, i64) = (45, 110, 115);
pub const VRAM_TEMPS: (i64, i64, i64) = (36, 105, 110);

// Fan
pub const FAN_SPEED: i64 = 120;
pub const FAN_SPEED_MAX: u64 = 255;
pub const FAN_RPM: i64 = 2000;

// CPU side
pub const CPU_SOCKET_POWER_MW: u32 = 175_218;
pub const CPU_POWER_CAP_MW: u32 = 400_000;
pub const CPU_BOOST_LIMIT_MHZ: u32 = 3700;
pub const CPU_MIN_FREQ_MHZ: u16 = 400;
pub const CPU_LINK_NAMES: [&str; 8] = ["P0", "P1", "P2", "P3", "G0", "G1", "G2", "G3"];
pub const CPU_NBIO_COUNT: u8 = 4;
