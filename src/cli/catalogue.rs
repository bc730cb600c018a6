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

//! The complete command and flag catalogue.
//!
//! Every subcommand and flag the tool knows is listed here once, with the
//! platform predicate that decides whether it is registered. The parser
//! materialises the registered subset; the full table is still consulted
//! to tell "not supported here" apart from "never heard of it".

use crate::device::PlatformInfo;
use crate::error::DeviceClass;

use super::CommandName;

pub type Predicate = fn(&PlatformInfo) -> bool;

/// How many values a flag takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Switch,
    One(&'static str),
    Exact(&'static [&'static str]),
    AtLeastOne(&'static str),
}

/// Validator applied to a flag's values at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    None,
    Text,
    PositiveInt,
    NonNegativeInt,
    /// Every value fits in a byte, `0x` prefix allowed.
    Bytes,
    FanSpeed,
    Overdrive,
    /// `CLK_TYPE LEVEL...`
    ClockLevel,
    /// `CLK_TYPE LIM_TYPE VALUE`
    ClockLimit,
    /// `BW_TYPE LINK_NAME`
    Link,
    Choice(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy)]
pub struct FlagSpec {
    pub id: &'static str,
    pub short: Option<char>,
    pub aliases: &'static [&'static str],
    pub help: &'static str,
    pub arity: Arity,
    pub check: Check,
    /// Device class the flag selects fields for, if any.
    pub class: Option<DeviceClass>,
    pub when: Predicate,
}

impl FlagSpec {
    /// The id doubles as the long name.
    pub fn long(&self) -> &'static str {
        self.id
    }

    pub fn takes_value(&self) -> bool {
        self.arity != Arity::Switch
    }

    /// Whether `token` (`-x`, `--name`) spells this flag.
    pub fn matches(&self, token: &str) -> bool {
        if let Some(long) = token.strip_prefix("--") {
            let long = long.split('=').next().unwrap_or(long);
            return long == self.id || self.aliases.contains(&long);
        }
        match (token.strip_prefix('-'), self.short) {
            (Some(rest), Some(short)) => rest.starts_with(short),
            _ => false,
        }
    }
}

/// Which selector flags a subcommand accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Devices {
    None,
    Gpu,
    All,
}

#[derive(Debug, Clone, Copy)]
pub struct CommandSpec {
    pub name: CommandName,
    pub aliases: &'static [&'static str],
    pub about: &'static str,
    pub when: Predicate,
    pub devices: Devices,
    pub watch: bool,
    pub flags: &'static [FlagSpec],
}

impl CommandSpec {
    pub fn matches(&self, token: &str) -> bool {
        self.name.as_str() == token || self.aliases.contains(&token)
    }

    /// Flags registered on `platform`.
    pub fn registered_flags<'a>(
        &'a self,
        platform: &'a PlatformInfo,
    ) -> impl Iterator<Item = &'a FlagSpec> + 'a {
        self.flags.iter().filter(move |flag| (flag.when)(platform))
    }
}

// Platform predicates

fn always(_: &PlatformInfo) -> bool {
    true
}

fn never(_: &PlatformInfo) -> bool {
    false
}

fn gpu(p: &PlatformInfo) -> bool {
    p.gpu_initialised
}

fn cpu(p: &PlatformInfo) -> bool {
    p.cpu_initialised
}

fn baremetal(p: &PlatformInfo) -> bool {
    p.is_linux() && p.is_baremetal()
}

fn baremetal_gpu(p: &PlatformInfo) -> bool {
    baremetal(p) && p.gpu_initialised
}

fn baremetal_cpu(p: &PlatformInfo) -> bool {
    baremetal(p) && p.cpu_initialised
}

fn host_gpu(p: &PlatformInfo) -> bool {
    (p.is_hypervisor() || baremetal(p)) && p.gpu_initialised
}

fn hypervisor_gpu(p: &PlatformInfo) -> bool {
    p.is_hypervisor() && p.gpu_initialised
}

fn linux_host_gpu(p: &PlatformInfo) -> bool {
    p.is_linux() && !p.is_virtual_guest() && p.gpu_initialised
}

fn linux_gpu(p: &PlatformInfo) -> bool {
    p.is_linux() && p.gpu_initialised
}

fn mutators(p: &PlatformInfo) -> bool {
    baremetal(p) || p.cpu_initialised
}

const fn switch(id: &'static str, short: Option<char>, help: &'static str) -> FlagSpec {
    FlagSpec {
        id,
        short,
        aliases: &[],
        help,
        arity: Arity::Switch,
        check: Check::None,
        class: None,
        when: always,
    }
}

const fn value(
    id: &'static str,
    short: Option<char>,
    arity: Arity,
    check: Check,
    help: &'static str,
) -> FlagSpec {
    FlagSpec {
        id,
        short,
        aliases: &[],
        help,
        arity,
        check,
        class: None,
        when: always,
    }
}

const fn on(mut flag: FlagSpec, class: DeviceClass, when: Predicate) -> FlagSpec {
    flag.class = Some(class);
    flag.when = when;
    flag
}

const fn gpu_flag(flag: FlagSpec, when: Predicate) -> FlagSpec {
    on(flag, DeviceClass::Gpu, when)
}

const fn cpu_flag(flag: FlagSpec, when: Predicate) -> FlagSpec {
    on(flag, DeviceClass::Cpu, when)
}

const fn core_flag(flag: FlagSpec, when: Predicate) -> FlagSpec {
    on(flag, DeviceClass::Core, when)
}

const fn aliased(mut flag: FlagSpec, aliases: &'static [&'static str]) -> FlagSpec {
    flag.aliases = aliases;
    flag
}

pub const COMPUTE_PARTITIONS: &[&str] = &["SPX", "DPX", "TPX", "QPX", "CPX"];
pub const MEMORY_PARTITIONS: &[&str] = &["NPS1", "NPS2", "NPS4", "NPS8"];
pub const PERF_LEVELS: &[&str] = &[
    "AUTO",
    "LOW",
    "HIGH",
    "MANUAL",
    "STABLE_STD",
    "STABLE_PEAK",
    "STABLE_MIN_MCLK",
    "STABLE_MIN_SCLK",
    "DETERMINISM",
];
pub const POWER_PROFILES: &[&str] = &[
    "CUSTOM",
    "VIDEO",
    "POWER_SAVING",
    "COMPUTE",
    "VR",
    "3D_FULL_SCR",
    "BOOTUP_DEFAULT",
];
const ISOLATION_STATES: &[&str] = &["0", "1"];

/// `--json`, `--csv`, `--file`, `--loglevel`; accepted by every subcommand.
pub const MODIFIER_FLAGS: &[FlagSpec] = &[
    switch("json", None, "Displays output in JSON format"),
    switch("csv", None, "Displays output in CSV format"),
    value("file", None, Arity::One("FILE"), Check::Text, "Saves output into a file on the provided path"),
    value(
        "loglevel",
        None,
        Arity::One("LEVEL"),
        Check::None,
        "Set the logging level from the possible choices: DEBUG, INFO, WARNING, ERROR, CRITICAL",
    ),
];

pub const DEVICE_FLAGS: &[FlagSpec] = &[
    on(
        value("gpu", Some('g'), Arity::AtLeastOne("GPU"), Check::Text, "Select a GPU ID, BDF, or UUID, or all"),
        DeviceClass::Gpu,
        gpu,
    ),
    on(
        value("cpu", Some('U'), Arity::AtLeastOne("CPU"), Check::Text, "Select a CPU ID, or all"),
        DeviceClass::Cpu,
        cpu,
    ),
    on(
        value("core", Some('O'), Arity::AtLeastOne("CORE"), Check::Text, "Select a Core ID, or all"),
        DeviceClass::Core,
        cpu,
    ),
];

pub const WATCH_FLAGS: &[FlagSpec] = &[
    value("watch", Some('w'), Arity::One("INTERVAL"), Check::PositiveInt, "Reprint the command in a loop of INTERVAL seconds"),
    value(
        "watch-time",
        Some('W'),
        Arity::One("TIME"),
        Check::PositiveInt,
        "The total TIME to watch the given command",
    ),
    value(
        "iterations",
        Some('i'),
        Arity::One("ITERATIONS"),
        Check::PositiveInt,
        "Total number of ITERATIONS to loop on the given command",
    ),
];

const STATIC_FLAGS: &[FlagSpec] = &[
    gpu_flag(switch("asic", Some('a'), "All asic information"), gpu),
    gpu_flag(switch("bus", Some('b'), "All bus information"), gpu),
    gpu_flag(switch("vbios", Some('V'), "All video bios information (if available)"), gpu),
    gpu_flag(switch("limit", Some('l'), "All limit metric values (i.e. power and thermal limits)"), host_gpu),
    gpu_flag(switch("driver", Some('d'), "Displays driver version"), gpu),
    gpu_flag(switch("vram", Some('v'), "All vram information"), gpu),
    gpu_flag(switch("cache", Some('c'), "All cache information"), gpu),
    gpu_flag(switch("board", Some('B'), "All board information"), gpu),
    gpu_flag(switch("ras", Some('r'), "Displays RAS features information"), host_gpu),
    gpu_flag(switch("partition", Some('p'), "Partition information"), host_gpu),
    gpu_flag(switch("soc-pstate", Some('P'), "The available soc pstate policy"), host_gpu),
    gpu_flag(switch("xgmi-plpd", Some('x'), "The available XGMI per-link power down policy"), host_gpu),
    gpu_flag(switch("process-isolation", Some('R'), "The process isolation status"), gpu),
    gpu_flag(switch("numa", Some('u'), "All numa node information"), linux_host_gpu),
    cpu_flag(switch("smu", Some('s'), "All SMU FW information"), cpu),
    cpu_flag(switch("interface-ver", Some('I'), "Displays hsmp interface version"), cpu),
];

const FIRMWARE_FLAGS: &[FlagSpec] = &[
    gpu_flag(
        aliased(switch("ucode-list", Some('f'), "All FW list information"), &["fw-list"]),
        gpu,
    ),
    gpu_flag(switch("error-records", Some('e'), "All error records information"), hypervisor_gpu),
];

const BAD_PAGES_FLAGS: &[FlagSpec] = &[
    gpu_flag(switch("pending", Some('p'), "Displays all pending retired pages"), gpu),
    gpu_flag(switch("retired", Some('r'), "Displays retired pages"), gpu),
    gpu_flag(switch("un-res", Some('u'), "Displays unreservable pages"), gpu),
];

const METRIC_FLAGS: &[FlagSpec] = &[
    gpu_flag(switch("mem-usage", Some('m'), "Memory usage per block"), gpu),
    gpu_flag(switch("usage", Some('u'), "Displays engine usage information"), gpu),
    gpu_flag(switch("power", Some('p'), "Current power usage"), gpu),
    gpu_flag(switch("clock", Some('c'), "Average, max, and current clock frequencies"), gpu),
    gpu_flag(switch("temperature", Some('t'), "Current temperatures"), gpu),
    gpu_flag(switch("pcie", Some('P'), "Current PCIe speed, width, and replay count"), gpu),
    gpu_flag(switch("ecc", Some('e'), "Total number of ECC errors"), gpu),
    gpu_flag(switch("ecc-blocks", Some('k'), "Number of ECC errors per block"), gpu),
    gpu_flag(switch("fan", Some('f'), "Current fan speed"), baremetal_gpu),
    gpu_flag(switch("voltage-curve", Some('C'), "Display voltage curve"), baremetal_gpu),
    gpu_flag(switch("overdrive", Some('o'), "Current GPU clock overdrive level"), baremetal_gpu),
    gpu_flag(switch("perf-level", Some('l'), "Current DPM performance level"), baremetal_gpu),
    gpu_flag(switch("xgmi-err", Some('x'), "XGMI error information since last read"), baremetal_gpu),
    gpu_flag(switch("energy", Some('E'), "Amount of energy consumed"), baremetal_gpu),
    gpu_flag(switch("throttle", Some('T'), "Displays throttle accumulators since boot"), baremetal_gpu),
    cpu_flag(switch("cpu-power-metrics", None, "CPU power metrics"), cpu),
    cpu_flag(switch("cpu-prochot", None, "Displays prochot status"), cpu),
    cpu_flag(switch("cpu-freq-metrics", None, "Displays currentFclkMemclk frequencies and cclk frequency limit"), cpu),
    cpu_flag(switch("cpu-c0-res", None, "Displays C0 residency"), cpu),
    cpu_flag(
        value("cpu-lclk-dpm-level", None, Arity::One("NBIOID"), Check::Bytes, "Displays lclk dpm level range"),
        cpu,
    ),
    cpu_flag(switch("cpu-pwr-svi-telemetry-rails", None, "Displays svi based telemetry for all rails"), cpu),
    cpu_flag(
        value(
            "cpu-io-bandwidth",
            None,
            Arity::Exact(&["IO_BW", "LINKID_NAME"]),
            Check::Link,
            "Displays current IO bandwidth for the selected CPU",
        ),
        cpu,
    ),
    cpu_flag(
        value(
            "cpu-xgmi-bandwidth",
            None,
            Arity::Exact(&["XGMI_BW", "LINKID_NAME"]),
            Check::Link,
            "Displays current XGMI bandwidth for the selected CPU",
        ),
        cpu,
    ),
    cpu_flag(switch("cpu-metrics-ver", None, "Displays metrics table version"), cpu),
    cpu_flag(switch("cpu-metrics-table", None, "Displays metric table"), cpu),
    cpu_flag(switch("cpu-socket-energy", None, "Displays socket energy for the selected CPU socket"), cpu),
    cpu_flag(switch("cpu-ddr-bandwidth", None, "Displays per socket max ddr bw, current utilized bw and current utilized ddr bw in percentage"), cpu),
    cpu_flag(switch("cpu-temp", None, "Displays cpu socket temperature"), cpu),
    cpu_flag(
        value("cpu-dimm-temp-range-rate", None, Arity::One("DIMM_ADDR"), Check::Bytes, "Displays dimm temperature range and refresh rate"),
        cpu,
    ),
    cpu_flag(
        value("cpu-dimm-pow-consumption", None, Arity::One("DIMM_ADDR"), Check::Bytes, "Displays dimm power consumption"),
        cpu,
    ),
    cpu_flag(
        value("cpu-dimm-thermal-sensor", None, Arity::One("DIMM_ADDR"), Check::Bytes, "Displays dimm thermal sensor"),
        cpu,
    ),
    core_flag(switch("core-boost-limit", None, "Get boost limit for the selected cores"), cpu),
    core_flag(switch("core-curr-active-freq-core-limit", None, "Get Current CCLK limit set per Core"), cpu),
    core_flag(switch("core-energy", None, "Displays core energy for the selected core"), cpu),
];

const PROCESS_FLAGS: &[FlagSpec] = &[
    gpu_flag(switch("general", Some('G'), "pid, process name, memory usage"), gpu),
    gpu_flag(switch("engine", Some('e'), "All engine usages"), gpu),
    gpu_flag(value("pid", Some('p'), Arity::One("PID"), Check::NonNegativeInt, "Gets all process information about the specified process based on Process ID"), gpu),
    gpu_flag(value("name", Some('n'), Arity::One("NAME"), Check::Text, "Gets all process information about the specified process based on Process Name"), gpu),
];

const TOPOLOGY_FLAGS: &[FlagSpec] = &[
    gpu_flag(switch("access", Some('a'), "Displays link accessibility between GPUs"), gpu),
    gpu_flag(switch("weight", Some('w'), "Displays relative weight between GPUs"), gpu),
    gpu_flag(switch("hops", Some('o'), "Displays the number of hops between GPUs"), gpu),
    gpu_flag(switch("link-type", Some('t'), "Displays the link type between GPUs"), gpu),
    gpu_flag(switch("numa-bw", Some('b'), "Display max and min bandwidth between nodes"), gpu),
    gpu_flag(switch("coherent", Some('c'), "Display cache coherant (or non-coherant) link capability between nodes"), gpu),
    gpu_flag(switch("atomics", Some('n'), "Display 32 and 64-bit atomic io link capability between nodes"), gpu),
    gpu_flag(switch("dma", Some('d'), "Display P2P direct memory access (DMA) link capability between nodes"), gpu),
    gpu_flag(switch("bi-dir", Some('z'), "Display P2P bi-directional link capability between nodes"), gpu),
];

const XGMI_FLAGS: &[FlagSpec] = &[gpu_flag(switch("metric", Some('m'), "Metric XGMI information"), gpu)];

const SET_FLAGS: &[FlagSpec] = &[
    gpu_flag(value("fan", Some('f'), Arity::One("%"), Check::FanSpeed, "Set GPU fan speed (0-255 or 0-100%)"), baremetal_gpu),
    gpu_flag(value("perf-level", Some('l'), Arity::One("LEVEL"), Check::Choice(PERF_LEVELS), "Set one of the following performance levels"), baremetal_gpu),
    gpu_flag(value("profile", Some('P'), Arity::One("SETPROFILE"), Check::Choice(POWER_PROFILES), "Set power profile level"), baremetal_gpu),
    gpu_flag(value("perf-determinism", Some('d'), Arity::One("SCLKMAX"), Check::NonNegativeInt, "Enable performance determinism and set GFX clock frequency limit value"), baremetal_gpu),
    gpu_flag(value("compute-partition", Some('C'), Arity::One("PARTITION"), Check::Choice(COMPUTE_PARTITIONS), "Set one of the following the compute partition modes"), baremetal_gpu),
    gpu_flag(value("memory-partition", Some('M'), Arity::One("PARTITION"), Check::Choice(MEMORY_PARTITIONS), "Set one of the following the memory partition modes"), baremetal_gpu),
    gpu_flag(value("power-cap", Some('o'), Arity::One("WATTS"), Check::PositiveInt, "Set power capacity limit"), baremetal_gpu),
    gpu_flag(value("soc-pstate", Some('p'), Arity::One("POLICY_ID"), Check::NonNegativeInt, "Set the GPU soc pstate policy using policy id"), baremetal_gpu),
    gpu_flag(value("xgmi-plpd", Some('x'), Arity::One("POLICY_ID"), Check::NonNegativeInt, "Set the GPU XGMI per-link power down policy using policy id"), baremetal_gpu),
    gpu_flag(value("process-isolation", Some('R'), Arity::One("STATUS"), Check::Choice(ISOLATION_STATES), "Enable or disable the GPU process isolation: 0 for disable and 1 for enable"), gpu),
    gpu_flag(value("clk-limit", Some('L'), Arity::Exact(&["CLK_TYPE", "LIM_TYPE", "VALUE"]), Check::ClockLimit, "Set the sclk (aka gfxclk) or mclk minimum and maximum frequencies"), baremetal_gpu),
    gpu_flag(value("clk-level", Some('c'), Arity::AtLeastOne("CLK_TYPE PERF_LEVELS"), Check::ClockLevel, "Set the clock frequency levels for the given clock type"), baremetal_gpu),
    gpu_flag(value("overdrive", Some('D'), Arity::One("PERCENT"), Check::Overdrive, "Set GPU overdrive level (0-20%)"), baremetal_gpu),
    cpu_flag(value("cpu-pwr-limit", None, Arity::One("PWR_LIMIT"), Check::NonNegativeInt, "Set power limit for the given socket. Input parameter is power limit value"), baremetal_cpu),
    cpu_flag(value("cpu-xgmi-link-width", None, Arity::Exact(&["MIN_WIDTH", "MAX_WIDTH"]), Check::Bytes, "Set max and Min linkwidth"), baremetal_cpu),
    cpu_flag(value("cpu-lclk-dpm-level", None, Arity::Exact(&["NBIOID", "MIN_DPM", "MAX_DPM"]), Check::Bytes, "Sets the max and min dpm level on a given NBIO"), baremetal_cpu),
    cpu_flag(value("cpu-pwr-eff-mode", None, Arity::One("MODE"), Check::Bytes, "Sets the power efficency mode policy"), baremetal_cpu),
    cpu_flag(value("cpu-gmi3-link-width", None, Arity::Exact(&["MIN_LW", "MAX_LW"]), Check::Bytes, "Sets max and min gmi3 link width range"), baremetal_cpu),
    cpu_flag(value("cpu-pcie-link-rate", None, Arity::One("LINK_RATE"), Check::Bytes, "Sets pcie link rate"), baremetal_cpu),
    cpu_flag(value("cpu-df-pstate-range", None, Arity::Exact(&["MAX_PSTATE", "MIN_PSTATE"]), Check::Bytes, "Sets max and min df-pstates"), baremetal_cpu),
    cpu_flag(switch("cpu-enable-apb", None, "Enables the DF p-state performance boost algorithm"), baremetal_cpu),
    cpu_flag(value("cpu-disable-apb", None, Arity::One("DF_PSTATE"), Check::Bytes, "Disables the DF p-state performance boost algorithm"), baremetal_cpu),
    cpu_flag(value("soc-boost-limit", None, Arity::One("BOOST_LIMIT"), Check::NonNegativeInt, "Sets the boost limit for the given socket"), baremetal_cpu),
    core_flag(value("core-boost-limit", None, Arity::One("BOOST_LIMIT"), Check::NonNegativeInt, "Sets the boost limit for the given core"), baremetal_cpu),
];

const RESET_FLAGS: &[FlagSpec] = &[
    gpu_flag(switch("gpureset", Some('G'), "Reset the specified GPU"), baremetal_gpu),
    gpu_flag(switch("clocks", Some('c'), "Reset clocks and overdrive to default"), baremetal_gpu),
    gpu_flag(switch("fans", Some('f'), "Reset fans to automatic (driver) control"), baremetal_gpu),
    gpu_flag(switch("profile", Some('p'), "Reset power profile back to default"), baremetal_gpu),
    gpu_flag(switch("xgmierr", Some('x'), "Reset XGMI error counts"), baremetal_gpu),
    gpu_flag(switch("perf-determinism", Some('d'), "Disable performance determinism"), baremetal_gpu),
    gpu_flag(switch("compute-partition", Some('C'), "Reset compute partitions on the specified GPU"), baremetal_gpu),
    gpu_flag(switch("memory-partition", Some('M'), "Reset memory partitions on the specified GPU"), baremetal_gpu),
    gpu_flag(switch("power-cap", Some('o'), "Reset the power cap to the default value"), baremetal_gpu),
    gpu_flag(switch("clean-local-data", Some('l'), "Clean up local data in LDS/GPRs"), baremetal_gpu),
];

const MONITOR_FLAGS: &[FlagSpec] = &[
    gpu_flag(switch("power-usage", Some('p'), "Monitor power usage in Watts"), gpu),
    gpu_flag(switch("temperature", Some('t'), "Monitor temperature in Celsius"), gpu),
    gpu_flag(switch("gfx", Some('u'), "Monitor graphics utilization (%) and clock (MHz)"), gpu),
    gpu_flag(switch("mem", Some('m'), "Monitor memory utilization (%) and clock (MHz)"), gpu),
    gpu_flag(switch("encoder", Some('n'), "Monitor encoder utilization (%) and clock (MHz)"), gpu),
    gpu_flag(switch("decoder", Some('d'), "Monitor decoder utilization (%) and clock (MHz)"), gpu),
    gpu_flag(switch("ecc", Some('e'), "Monitor ECC single bit, ECC double bit, and PCIe replay error counts"), gpu),
    gpu_flag(switch("vram-usage", Some('v'), "Monitor memory usage in MB"), gpu),
    gpu_flag(switch("pcie", Some('r'), "Monitor PCIe bandwidth in Mb/s"), gpu),
    gpu_flag(switch("process", Some('q'), "Enable Process information table below monitor output"), gpu),
];

pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: CommandName::Version,
        aliases: &[],
        about: "Display version information",
        when: always,
        devices: Devices::None,
        watch: false,
        flags: &[],
    },
    CommandSpec {
        name: CommandName::List,
        aliases: &["discovery"],
        about: "List GPU information",
        when: always,
        devices: Devices::All,
        watch: false,
        flags: &[],
    },
    CommandSpec {
        name: CommandName::Static,
        aliases: &[],
        about: "Gets static information about the specified GPU",
        when: always,
        devices: Devices::All,
        watch: false,
        flags: STATIC_FLAGS,
    },
    CommandSpec {
        name: CommandName::Firmware,
        aliases: &["ucode"],
        about: "Gets firmware information about the specified GPU",
        when: gpu,
        devices: Devices::Gpu,
        watch: false,
        flags: FIRMWARE_FLAGS,
    },
    CommandSpec {
        name: CommandName::BadPages,
        aliases: &[],
        about: "Gets bad page information about the specified GPU",
        when: gpu,
        devices: Devices::Gpu,
        watch: false,
        flags: BAD_PAGES_FLAGS,
    },
    CommandSpec {
        name: CommandName::Metric,
        aliases: &[],
        about: "Gets metric/performance information about the specified GPU",
        when: always,
        devices: Devices::All,
        watch: true,
        flags: METRIC_FLAGS,
    },
    CommandSpec {
        name: CommandName::Process,
        aliases: &[],
        about: "Lists general process information running on the specified GPU",
        when: gpu,
        devices: Devices::Gpu,
        watch: true,
        flags: PROCESS_FLAGS,
    },
    CommandSpec {
        name: CommandName::Profile,
        aliases: &[],
        about: "Displays information about all profiles and current profile",
        when: never,
        devices: Devices::Gpu,
        watch: false,
        flags: &[],
    },
    CommandSpec {
        name: CommandName::Event,
        aliases: &[],
        about: "Displays event information for the given GPU",
        when: gpu,
        devices: Devices::Gpu,
        watch: false,
        flags: &[],
    },
    CommandSpec {
        name: CommandName::Topology,
        aliases: &[],
        about: "Displays topology information of the devices",
        when: gpu,
        devices: Devices::Gpu,
        watch: false,
        flags: TOPOLOGY_FLAGS,
    },
    CommandSpec {
        name: CommandName::Set,
        aliases: &[],
        about: "Set options for devices",
        when: mutators,
        devices: Devices::All,
        watch: false,
        flags: SET_FLAGS,
    },
    CommandSpec {
        name: CommandName::Reset,
        aliases: &[],
        about: "Reset options for devices",
        when: mutators,
        devices: Devices::Gpu,
        watch: false,
        flags: RESET_FLAGS,
    },
    CommandSpec {
        name: CommandName::Monitor,
        aliases: &["dmon"],
        about: "Monitor metrics for target devices",
        when: linux_gpu,
        devices: Devices::Gpu,
        watch: true,
        flags: MONITOR_FLAGS,
    },
    CommandSpec {
        name: CommandName::Xgmi,
        aliases: &[],
        about: "Displays xgmi information of the devices",
        when: gpu,
        devices: Devices::Gpu,
        watch: false,
        flags: XGMI_FLAGS,
    },
];

/// Catalogue entry for a subcommand name or alias.
pub fn command(token: &str) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|spec| spec.matches(token))
}

pub fn spec_of(name: CommandName) -> &'static CommandSpec {
    COMMANDS
        .iter()
        .find(|spec| spec.name == name)
        .unwrap_or(&COMMANDS[0])
}

/// Device flags a subcommand exposes before platform filtering.
pub fn device_flags(spec: &CommandSpec) -> &'static [FlagSpec] {
    match spec.devices {
        Devices::None => &[],
        Devices::Gpu => &DEVICE_FLAGS[..1],
        Devices::All => DEVICE_FLAGS,
    }
}

/// Every flag `spec` knows about, registered on this platform or not.
pub fn all_flags(spec: &CommandSpec) -> impl Iterator<Item = &'static FlagSpec> {
    let watch: &'static [FlagSpec] = if spec.watch { WATCH_FLAGS } else { &[] };
    MODIFIER_FLAGS
        .iter()
        .chain(device_flags(spec))
        .chain(watch)
        .chain(spec.flags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{OsKind, Role};

    #[test]
    fn test_aliases_resolve() {
        assert_eq!(command("discovery").map(|c| c.name), Some(CommandName::List));
        assert_eq!(command("ucode").map(|c| c.name), Some(CommandName::Firmware));
        assert_eq!(command("dmon").map(|c| c.name), Some(CommandName::Monitor));
        assert!(command("bogus").is_none());
    }

    #[test]
    fn test_short_flags_unique_per_command() {
        for spec in COMMANDS {
            let mut shorts: Vec<char> = all_flags(spec).filter_map(|f| f.short).collect();
            let total = shorts.len();
            shorts.sort_unstable();
            shorts.dedup();
            assert_eq!(shorts.len(), total, "duplicate short flag in {}", spec.name.as_str());
        }
    }

    #[test]
    fn test_guest_hides_host_flags() {
        let guest = PlatformInfo::new(OsKind::Linux, Role::VirtualGuest, true, false);
        let metric = spec_of(CommandName::Metric);
        let ids: Vec<&str> = metric.registered_flags(&guest).map(|f| f.id).collect();
        assert!(ids.contains(&"power"));
        assert!(!ids.contains(&"fan"));
        assert!(!ids.contains(&"cpu-temp"));
        assert!(!(spec_of(CommandName::Set).when)(&guest));
        assert!(!(spec_of(CommandName::Profile).when)(&guest));
    }

    #[test]
    fn test_flag_token_matching() {
        let flag = &FIRMWARE_FLAGS[0];
        assert!(flag.matches("--ucode-list"));
        assert!(flag.matches("--fw-list"));
        assert!(flag.matches("-f"));
        assert!(!flag.matches("--fan"));
    }
}
