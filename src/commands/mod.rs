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

//! Subcommand orchestration.
//!
//! [`App`] owns everything an invocation needs: the native library, the
//! platform report and the output destination. It parses the command
//! line, enumerates devices, and hands a [`Ctx`] to the handler of the
//! selected subcommand.

pub mod dispatch;
pub mod field;
pub mod watch;

mod bad_pages;
mod event;
mod firmware;
mod list;
mod metric;
mod monitor;
mod process;
mod reset;
mod set;
mod static_info;
mod topology;
mod version;
mod xgmi;

use std::io::BufRead;
use std::sync::Arc;

use tracing::{debug, info};

use crate::cli::catalogue::{self, Arity};
use crate::cli::parser::{self, Parsed};
use crate::cli::{CommandName, Invocation};
use crate::common::config::EnvConfig;
use crate::device::{PlatformInfo, Registry};
use crate::error::{DeviceClass, Error, Result};
use crate::native::{ProcessorHandle, SmiLibrary};
use crate::output::destination::resolve_file;
use crate::output::{Output, OutputFormat, Sink};

/// Line source the `event` subcommand watches for its stop request.
pub type StopInput = Box<dyn BufRead + Send>;

/// One configured tool instance.
pub struct App {
    lib: Arc<dyn SmiLibrary>,
    platform: PlatformInfo,
    sink: Sink,
    tool_version: String,
    rocm_version: Option<String>,
    elevated: bool,
    input: Option<StopInput>,
}

impl App {
    pub fn new(lib: Arc<dyn SmiLibrary>, platform: PlatformInfo) -> Self {
        Self {
            lib,
            platform,
            sink: Sink::Stdout,
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            rocm_version: EnvConfig::rocm_version(),
            elevated: false,
            input: None,
        }
    }

    /// Send output somewhere other than standard output.
    pub fn with_sink(mut self, sink: Sink) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_tool_version(mut self, version: impl Into<String>) -> Self {
        self.tool_version = version.into();
        self
    }

    pub fn with_rocm_version(mut self, version: Option<String>) -> Self {
        self.rocm_version = version;
        self
    }

    /// Whether the process may call the mutators.
    pub fn elevated(mut self, elevated: bool) -> Self {
        self.elevated = elevated;
        self
    }

    /// Read the `event` stop request from `input` instead of stdin.
    pub fn with_input(mut self, input: StopInput) -> Self {
        self.input = Some(input);
        self
    }

    pub fn platform(&self) -> &PlatformInfo {
        &self.platform
    }

    /// Run one command line (program name first) and return the exit code.
    ///
    /// Every failure is rendered to the destination in the requested
    /// format before its code is returned.
    pub async fn run<I, T>(&mut self, args: I) -> i32
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        let requested = parser::requested_format(&args);

        let invocation = match parser::parse(args.iter().map(String::as_str), &self.platform) {
            Ok(Parsed::Run(invocation)) => invocation,
            Ok(Parsed::Help(text)) => {
                let output = Output::new(OutputFormat::Human, self.sink.clone());
                return match output.print_text(text.trim_end()) {
                    Ok(()) => 0,
                    Err(e) => e.code(),
                };
            }
            Err(e) => return self.fail(requested, self.sink.clone(), &e),
        };

        let sink = match &invocation.file {
            Some(requested_path) => match resolve_file(requested_path, invocation.format) {
                Ok(path) => Sink::File(path),
                Err(e) => return self.fail(invocation.format, self.sink.clone(), &e),
            },
            None => self.sink.clone(),
        };
        let mut output = Output::new(invocation.format, sink.clone());

        match self.execute(&invocation, &mut output).await {
            Ok(()) => 0,
            Err(e) => self.fail(invocation.format, sink, &e),
        }
    }

    fn fail(&self, format: OutputFormat, sink: Sink, error: &Error) -> i32 {
        debug!("Command failed: {error:?}");
        let output = Output::new(format, sink);
        if let Err(e) = output.print_error(error) {
            debug!("Cannot render error: {e}");
        }
        error.code()
    }

    async fn execute(&mut self, args: &Invocation, output: &mut Output) -> Result<()> {
        let registry = if args.command == CommandName::Version {
            Registry::default()
        } else {
            Registry::enumerate(self.lib.as_ref(), &self.platform)?
        };
        let input = self.input.take();
        let ctx = Ctx {
            lib: &self.lib,
            registry: &registry,
            platform: &self.platform,
            args,
            elevated: self.elevated,
            tool_version: &self.tool_version,
            rocm_version: self.rocm_version.as_deref(),
        };
        info!("Running {}", args.command.as_str());

        match args.command {
            CommandName::Version => version::run(&ctx, output),
            CommandName::List => list::run(&ctx, output),
            CommandName::Static => static_info::run(&ctx, output),
            CommandName::Firmware => firmware::run(&ctx, output),
            CommandName::BadPages => bad_pages::run(&ctx, output),
            CommandName::Metric => metric::run(&ctx, output).await,
            CommandName::Process => process::run(&ctx, output).await,
            CommandName::Event => event::run(&ctx, output, input).await,
            CommandName::Topology => topology::run(&ctx, output),
            CommandName::Xgmi => xgmi::run(&ctx, output),
            CommandName::Set => set::run(&ctx, output),
            CommandName::Reset => reset::run(&ctx, output),
            CommandName::Monitor => monitor::run(&ctx, output).await,
            CommandName::Profile => Err(Error::CommandNotSupported(args.command.as_str().to_string())),
        }
    }
}

/// What a handler sees of the invocation.
pub struct Ctx<'a> {
    pub lib: &'a Arc<dyn SmiLibrary>,
    pub registry: &'a Registry,
    pub platform: &'a PlatformInfo,
    pub args: &'a Invocation,
    pub elevated: bool,
    pub tool_version: &'a str,
    pub rocm_version: Option<&'a str>,
}

impl Ctx<'_> {
    pub fn format(&self) -> OutputFormat {
        self.args.format
    }

    /// Whether the field group behind flag `id` is enabled for `class`.
    ///
    /// With no field flag for the class every switch registered on this
    /// platform counts as given. Flags that carry a value only apply when
    /// the user supplied one.
    pub fn wants(&self, class: DeviceClass, id: &str) -> bool {
        if self.args.has_class_flags(class) {
            return self.args.flag(id);
        }
        catalogue::spec_of(self.args.command)
            .registered_flags(self.platform)
            .any(|flag| flag.id == id && flag.class == Some(class) && flag.arity == Arity::Switch)
    }

    /// Display index of a handle.
    pub fn id(&self, handle: ProcessorHandle) -> usize {
        self.registry.id_of(handle).unwrap_or_default()
    }
}
