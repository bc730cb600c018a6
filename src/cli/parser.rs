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

use std::path::PathBuf;

use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command, ValueEnum};
use tracing::debug;

use crate::device::PlatformInfo;
use crate::error::{DeviceClass, Error, Result};
use crate::output::OutputFormat;

use super::catalogue::{self, Arity, Check, CommandSpec, FlagSpec};
use super::validators;
use super::{FlagValue, Invocation, LogLevel, WatchArgs};

/// Outcome of a successful parse.
#[derive(Debug, Clone)]
pub enum Parsed {
    Run(Invocation),
    /// Help was requested, or no subcommand was given.
    Help(String),
}

const BIN_NAME: &str = "amd-smi";

fn arg_for(flag: &FlagSpec) -> Arg {
    let mut arg = Arg::new(flag.id).long(flag.long()).help(flag.help);
    if let Some(short) = flag.short {
        arg = arg.short(short);
    }
    if !flag.aliases.is_empty() {
        arg = arg.visible_aliases(flag.aliases.iter().copied());
    }
    match flag.arity {
        Arity::Switch => arg.action(ArgAction::SetTrue),
        Arity::One(name) => arg.value_name(name).num_args(1).action(ArgAction::Set),
        Arity::Exact(names) => arg
            .value_names(names.iter().copied())
            .num_args(names.len())
            .action(ArgAction::Set),
        Arity::AtLeastOne(name) => arg.value_name(name).num_args(1..).action(ArgAction::Append),
    }
}

fn modifier_arg(flag: &FlagSpec) -> Arg {
    let arg = arg_for(flag).global(true);
    if flag.id == "loglevel" {
        arg.value_parser(value_parser!(LogLevel)).ignore_case(true)
    } else {
        arg
    }
}

fn subcommand_for(spec: &CommandSpec, platform: &PlatformInfo) -> Command {
    let mut command = Command::new(spec.name.as_str()).about(spec.about);
    if !spec.aliases.is_empty() {
        command = command.visible_aliases(spec.aliases.iter().copied());
    }
    for flag in catalogue::device_flags(spec).iter().filter(|f| (f.when)(platform)) {
        command = command.arg(arg_for(flag));
    }
    if spec.watch {
        command = command.args(catalogue::WATCH_FLAGS.iter().map(arg_for));
    }
    command.args(spec.registered_flags(platform).map(arg_for))
}

/// The clap tree for `platform`: only registered subcommands and flags.
pub fn command_tree(platform: &PlatformInfo) -> Command {
    let mut root = Command::new(BIN_NAME)
        .about("AMD System Management Interface")
        .version(env!("CARGO_PKG_VERSION"))
        .disable_version_flag(true)
        .disable_help_subcommand(true)
        .args(catalogue::MODIFIER_FLAGS.iter().map(modifier_arg));
    for spec in catalogue::COMMANDS.iter().filter(|spec| (spec.when)(platform)) {
        root = root.subcommand(subcommand_for(spec, platform));
    }
    root
}

/// Output format requested on a command line, even one that fails to parse,
/// so parse errors render the way the user asked.
pub fn requested_format<S: AsRef<str>>(args: &[S]) -> OutputFormat {
    let mut format = OutputFormat::Human;
    for arg in args.iter().map(AsRef::as_ref) {
        match arg {
            "--json" => format = OutputFormat::Json,
            "--csv" => format = OutputFormat::Csv,
            _ => {}
        }
    }
    format
}

/// `--loglevel` value, read ahead of parsing so logging is up before the
/// parser and the device probe run.
pub fn requested_loglevel<S: AsRef<str>>(args: &[S]) -> Option<LogLevel> {
    let mut level = None;
    let mut tokens = args.iter().map(AsRef::as_ref);
    while let Some(arg) = tokens.next() {
        let value = match arg.strip_prefix("--loglevel") {
            Some("") => tokens.next(),
            Some(rest) => rest.strip_prefix('='),
            None => None,
        };
        if let Some(value) = value {
            level = LogLevel::from_str(value, true).ok().or(level);
        }
    }
    level
}

/// First positional token, skipping modifier values.
fn subcommand_token(args: &[String]) -> Option<&str> {
    let mut skip_next = false;
    for arg in args.iter().skip(1) {
        if skip_next {
            skip_next = false;
            continue;
        }
        if arg.starts_with('-') {
            skip_next = catalogue::MODIFIER_FLAGS
                .iter()
                .any(|flag| flag.takes_value() && flag.matches(arg) && !arg.contains('='));
            continue;
        }
        return Some(arg);
    }
    None
}

fn context(err: &clap::Error, kind: ContextKind) -> Option<String> {
    match err.get(kind) {
        Some(ContextValue::String(value)) => Some(value.clone()),
        Some(ContextValue::Strings(values)) => values.first().cloned(),
        _ => None,
    }
}

/// `--gpu <GPU>...` becomes `--gpu`.
fn arg_token(err: &clap::Error) -> String {
    context(err, ContextKind::InvalidArg)
        .and_then(|arg| arg.split_whitespace().next().map(str::to_string))
        .unwrap_or_default()
}

fn map_clap_error(err: &clap::Error, spec: Option<&CommandSpec>) -> Error {
    debug!("clap rejected the command line: {:?}", err.kind());
    match err.kind() {
        ErrorKind::InvalidSubcommand => {
            let token = context(err, ContextKind::InvalidSubcommand).unwrap_or_default();
            if catalogue::command(&token).is_some() {
                Error::CommandNotSupported(token)
            } else {
                Error::InvalidCommand(token)
            }
        }
        ErrorKind::UnknownArgument => {
            let token = arg_token(err);
            let known = spec.is_some_and(|spec| catalogue::all_flags(spec).any(|f| f.matches(&token)));
            if known {
                Error::ParameterNotSupported(token)
            } else {
                Error::InvalidParameter(token)
            }
        }
        ErrorKind::InvalidValue | ErrorKind::ValueValidation => {
            match context(err, ContextKind::InvalidValue) {
                Some(value) if !value.is_empty() => Error::InvalidParameterValue(value),
                _ => Error::MissingParameterValue(arg_token(err)),
            }
        }
        ErrorKind::TooFewValues
        | ErrorKind::WrongNumberOfValues
        | ErrorKind::MissingRequiredArgument => Error::MissingParameterValue(arg_token(err)),
        ErrorKind::ArgumentConflict | ErrorKind::TooManyValues => {
            Error::InvalidParameter(arg_token(err))
        }
        _ => Error::Unknown,
    }
}

fn check_values(flag: &FlagSpec, values: &[String]) -> Result<()> {
    let missing = || Error::MissingParameterValue(format!("--{}", flag.id));
    let nth = |i: usize| values.get(i).map(String::as_str).ok_or_else(missing);

    let checked = match flag.check {
        Check::None => Ok(()),
        Check::Text => values.iter().try_for_each(|v| validators::text(v).map(drop)),
        Check::PositiveInt => values
            .iter()
            .try_for_each(|v| validators::positive_int(v).map(drop)),
        Check::NonNegativeInt => values
            .iter()
            .try_for_each(|v| validators::non_negative_int(v).map(drop)),
        Check::Bytes => values.iter().try_for_each(|v| validators::byte(v).map(drop)),
        Check::FanSpeed => validators::fan_speed(nth(0)?).map(drop),
        Check::Overdrive => validators::overdrive_percent(nth(0)?).map(drop),
        Check::ClockLevel => {
            validators::clock_type(nth(0)?)?;
            validators::clock_level_bitmask(&values[1..]).map(drop)
        }
        Check::ClockLimit => {
            validators::clock_type(nth(0)?)?;
            validators::clock_limit(nth(1)?)?;
            validators::non_negative_int(nth(2)?).map(drop)
        }
        Check::Link => {
            validators::byte(nth(0)?)?;
            validators::text(nth(1)?).map(drop)
        }
        Check::Choice(choices) => validators::choice(nth(0)?, choices).map(drop),
    };
    checked.map_err(|e| match e {
        Error::MissingParameterValue(_) => missing(),
        other => other,
    })
}

fn collect_values(matches: &ArgMatches, id: &str) -> Option<Vec<String>> {
    matches
        .get_many::<String>(id)
        .map(|values| values.cloned().collect())
}

fn watch_args(matches: &ArgMatches) -> Result<Option<WatchArgs>> {
    let watch = matches.get_one::<String>("watch");
    let duration = matches.get_one::<String>("watch-time");
    let iterations = matches.get_one::<String>("iterations");

    if watch.is_none() {
        if duration.is_some() {
            return Err(Error::InvalidParameter("--watch-time".to_string()));
        }
        if iterations.is_some() {
            return Err(Error::InvalidParameter("--iterations".to_string()));
        }
        return Ok(None);
    }

    let positive = |value: Option<&String>, flag: &str| -> Result<Option<u64>> {
        value
            .map(|v| {
                validators::positive_int(v).map_err(|e| match e {
                    Error::MissingParameterValue(_) => Error::MissingParameterValue(flag.to_string()),
                    other => other,
                })
            })
            .transpose()
    };
    Ok(Some(WatchArgs {
        interval: positive(watch, "--watch")?.unwrap_or(1),
        duration: positive(duration, "--watch-time")?,
        iterations: positive(iterations, "--iterations")?,
    }))
}

fn invocation(spec: &CommandSpec, matches: &ArgMatches, platform: &PlatformInfo) -> Result<Invocation> {
    let mut invocation = Invocation::new(spec.name);

    let json = matches.get_flag("json");
    let csv = matches.get_flag("csv");
    invocation.format = match (json, csv) {
        (true, true) => return Err(Error::InvalidParameter("--csv".to_string())),
        (true, false) => OutputFormat::Json,
        (false, true) => OutputFormat::Csv,
        (false, false) => OutputFormat::Human,
    };
    if let Some(file) = matches.get_one::<String>("file") {
        if file.is_empty() {
            return Err(Error::MissingParameterValue("--file".to_string()));
        }
        invocation.file = Some(PathBuf::from(file));
    }
    invocation.loglevel = matches.get_one::<LogLevel>("loglevel").copied();

    for flag in catalogue::device_flags(spec).iter().filter(|f| (f.when)(platform)) {
        let Some(values) = collect_values(matches, flag.id) else {
            continue;
        };
        check_values(flag, &values)?;
        match flag.class {
            Some(DeviceClass::Gpu) => invocation.gpu = Some(values),
            Some(DeviceClass::Cpu) => invocation.cpu = Some(values),
            Some(DeviceClass::Core) => invocation.core = Some(values),
            None => {}
        }
    }

    if spec.watch {
        invocation.watch = watch_args(matches)?;
    }

    for flag in spec.registered_flags(platform) {
        let values = match flag.arity {
            Arity::Switch => matches.get_flag(flag.id).then(Vec::new),
            _ => collect_values(matches, flag.id),
        };
        let Some(values) = values else {
            continue;
        };
        check_values(flag, &values)?;
        invocation.push_flag(FlagValue {
            id: flag.id,
            class: flag.class,
            values,
        });
    }

    if spec.name.is_mutator() {
        if invocation.flags().is_empty() {
            return Err(Error::RequiredCommand(spec.name.as_str().to_string()));
        }
        // A mutation targets exactly one device class, whether named by a
        // selector or implied by the settings.
        let selected = [
            (invocation.gpu.is_some(), DeviceClass::Gpu),
            (invocation.cpu.is_some(), DeviceClass::Cpu),
            (invocation.core.is_some(), DeviceClass::Core),
        ]
        .into_iter()
        .filter_map(|(given, class)| given.then_some(class));
        let mut classes: Vec<DeviceClass> = Vec::new();
        for class in selected.chain(invocation.flags().iter().filter_map(|flag| flag.class)) {
            if !classes.contains(&class) {
                classes.push(class);
            }
        }
        if classes.len() > 1 {
            return Err(Error::InvalidCommand(spec.name.as_str().to_string()));
        }
    }
    Ok(invocation)
}

/// Parse a full command line, program name first.
pub fn parse<I, T>(args: I, platform: &PlatformInfo) -> Result<Parsed>
where
    I: IntoIterator<Item = T>,
    T: Into<String>,
{
    let args: Vec<String> = args.into_iter().map(Into::into).collect();

    let spec = match subcommand_token(&args) {
        Some(token) => match catalogue::command(token) {
            Some(spec) if (spec.when)(platform) => Some(spec),
            Some(_) => return Err(Error::CommandNotSupported(token.to_string())),
            None => return Err(Error::InvalidCommand(token.to_string())),
        },
        None => None,
    };

    let mut tree = command_tree(platform);
    let matches = match tree.try_get_matches_from_mut(&args) {
        Ok(matches) => matches,
        Err(err) => {
            return match err.kind() {
                ErrorKind::DisplayHelp
                | ErrorKind::DisplayVersion
                | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                    Ok(Parsed::Help(err.render().to_string()))
                }
                _ => Err(map_clap_error(&err, spec)),
            };
        }
    };

    let Some((name, sub_matches)) = matches.subcommand() else {
        return Ok(Parsed::Help(tree.render_help().to_string()));
    };
    let spec = catalogue::command(name).ok_or_else(|| Error::InvalidCommand(name.to_string()))?;
    invocation(spec, sub_matches, platform).map(Parsed::Run)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::CommandName;
    use crate::device::{OsKind, Role};

    fn gpu_host() -> PlatformInfo {
        PlatformInfo::linux_baremetal(true, false)
    }

    fn run(args: &[&str], platform: &PlatformInfo) -> Result<Invocation> {
        let mut argv = vec!["amd-smi"];
        argv.extend_from_slice(args);
        match parse(argv, platform)? {
            Parsed::Run(invocation) => Ok(invocation),
            Parsed::Help(_) => panic!("unexpected help output"),
        }
    }

    #[test]
    fn test_loglevel_is_read_before_parsing() {
        assert_eq!(requested_loglevel(&["amd-smi", "list", "--loglevel", "info"]), Some(LogLevel::Info));
        assert_eq!(requested_loglevel(&["amd-smi", "--loglevel=WARNING", "bogus"]), Some(LogLevel::Warning));
        assert_eq!(requested_loglevel(&["amd-smi", "list"]), None);
    }

    #[test]
    fn test_tree_is_well_formed() {
        command_tree(&PlatformInfo::linux_baremetal(true, true)).debug_assert();
        command_tree(&PlatformInfo::new(OsKind::Linux, Role::Hypervisor, true, false)).debug_assert();
    }

    #[test]
    fn test_basic_metric_invocation() {
        let invocation = run(&["metric", "-g", "0", "1", "--power", "--json"], &gpu_host()).unwrap();
        assert_eq!(invocation.command, CommandName::Metric);
        assert_eq!(invocation.format, OutputFormat::Json);
        assert_eq!(invocation.gpu, Some(vec!["0".to_string(), "1".to_string()]));
        assert!(invocation.flag("power"));
        assert!(!invocation.flag("clock"));
    }

    #[test]
    fn test_aliases_map_to_canonical_commands() {
        assert_eq!(run(&["discovery"], &gpu_host()).unwrap().command, CommandName::List);
        assert_eq!(run(&["dmon"], &gpu_host()).unwrap().command, CommandName::Monitor);
        let invocation = run(&["ucode", "--fw-list"], &gpu_host()).unwrap();
        assert!(invocation.flag("ucode-list"));
    }

    #[test]
    fn test_unknown_vs_unsupported_command() {
        assert!(matches!(run(&["bogus"], &gpu_host()), Err(Error::InvalidCommand(t)) if t == "bogus"));
        assert!(matches!(run(&["profile"], &gpu_host()), Err(Error::CommandNotSupported(_))));
        let guest = PlatformInfo::new(OsKind::Linux, Role::VirtualGuest, true, false);
        assert!(matches!(run(&["set", "-f", "50%"], &guest), Err(Error::CommandNotSupported(t)) if t == "set"));
    }

    #[test]
    fn test_unknown_vs_unsupported_flag() {
        assert!(matches!(
            run(&["metric", "--bogus"], &gpu_host()),
            Err(Error::InvalidParameter(t)) if t == "--bogus"
        ));
        let guest = PlatformInfo::new(OsKind::Linux, Role::VirtualGuest, true, false);
        assert!(matches!(
            run(&["metric", "--fan"], &guest),
            Err(Error::ParameterNotSupported(t)) if t == "--fan"
        ));
    }

    #[test]
    fn test_watch_dependencies() {
        assert!(matches!(
            run(&["metric", "--iterations", "3"], &gpu_host()),
            Err(Error::InvalidParameter(t)) if t == "--iterations"
        ));
        assert!(matches!(
            run(&["metric", "-W", "5"], &gpu_host()),
            Err(Error::InvalidParameter(t)) if t == "--watch-time"
        ));
        let invocation = run(&["metric", "-w", "1", "-i", "3"], &gpu_host()).unwrap();
        assert_eq!(
            invocation.watch,
            Some(WatchArgs {
                interval: 1,
                duration: None,
                iterations: Some(3)
            })
        );
        assert!(matches!(
            run(&["metric", "-w", "0"], &gpu_host()),
            Err(Error::InvalidParameterValue(_))
        ));
    }

    #[test]
    fn test_output_modifiers() {
        assert!(matches!(
            run(&["list", "--json", "--csv"], &gpu_host()),
            Err(Error::InvalidParameter(_))
        ));
        let invocation = run(&["--csv", "list", "--file", "/tmp/out"], &gpu_host()).unwrap();
        assert_eq!(invocation.format, OutputFormat::Csv);
        assert_eq!(invocation.file, Some(PathBuf::from("/tmp/out")));
        let invocation = run(&["list", "--loglevel", "DEBUG"], &gpu_host()).unwrap();
        assert_eq!(invocation.loglevel, Some(LogLevel::Debug));
    }

    #[test]
    fn test_missing_and_invalid_values() {
        assert!(matches!(
            run(&["static", "-g"], &gpu_host()),
            Err(Error::MissingParameterValue(t)) if t == "--gpu"
        ));
        assert!(matches!(
            run(&["set", "-f", "300"], &gpu_host()),
            Err(Error::InvalidParameterValue(t)) if t == "300"
        ));
        assert!(matches!(
            run(&["set", "-c", "sclk", "64"], &gpu_host()),
            Err(Error::InvalidParameterValue(t)) if t == "64"
        ));
        assert!(matches!(
            run(&["set", "-C", "bogus"], &gpu_host()),
            Err(Error::InvalidParameterValue(_))
        ));
    }

    #[test]
    fn test_mutator_rules() {
        let both = PlatformInfo::linux_baremetal(true, true);
        assert!(matches!(run(&["set"], &both), Err(Error::RequiredCommand(t)) if t == "set"));
        assert!(matches!(run(&["reset", "-g", "0"], &both), Err(Error::RequiredCommand(_))));
        assert!(matches!(
            run(&["set", "-g", "0", "-U", "0", "-f", "10"], &both),
            Err(Error::InvalidCommand(t)) if t == "set"
        ));
        let invocation = run(&["set", "-g", "0", "-L", "sclk", "max", "2100"], &both).unwrap();
        assert_eq!(invocation.many("clk-limit").map(<[String]>::len), Some(3));
    }

    #[test]
    fn test_mutator_targets_one_class() {
        let both = PlatformInfo::linux_baremetal(true, true);
        for line in [
            &["set", "-U", "0", "-O", "0", "--core-boost-limit", "500"][..],
            &["set", "--fan", "10", "--cpu-pwr-limit", "100"],
            &["set", "-U", "0", "--core-boost-limit", "500"],
            &["set", "-g", "0", "--soc-boost-limit", "500"],
        ] {
            assert!(matches!(run(line, &both), Err(Error::InvalidCommand(_))), "{line:?}");
        }
        assert!(run(&["set", "-U", "0", "--cpu-pwr-limit", "100"], &both).is_ok());
        assert!(run(&["set", "-O", "0", "--core-boost-limit", "500"], &both).is_ok());
        assert!(run(&["set", "--core-boost-limit", "500"], &both).is_ok());
    }

    #[test]
    fn test_help_and_empty_command_line() {
        assert!(matches!(parse(["amd-smi"], &gpu_host()), Ok(Parsed::Help(_))));
        assert!(matches!(parse(["amd-smi", "--help"], &gpu_host()), Ok(Parsed::Help(_))));
        assert!(matches!(parse(["amd-smi", "metric", "-h"], &gpu_host()), Ok(Parsed::Help(text)) if text.contains("--power")));
    }

    #[test]
    fn test_requested_format() {
        assert_eq!(requested_format(&["amd-smi", "bogus", "--json"]), OutputFormat::Json);
        assert_eq!(requested_format(&["amd-smi", "bogus"]), OutputFormat::Human);
    }
}
