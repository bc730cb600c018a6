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

use std::sync::Arc;

use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use amd_smi::cli::parser::{requested_format, requested_loglevel};
use amd_smi::common::config::EnvConfig;
use amd_smi::device::PlatformInfo;
use amd_smi::mock::SimulatedLibrary;
use amd_smi::native::{DynamicLibrary, SmiLibrary};
use amd_smi::output::Output;
use amd_smi::{App, Error, Sink};

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();
    init_logging(&args);

    let lib: Arc<dyn SmiLibrary> = if EnvConfig::use_mock() {
        info!("Using the simulated library");
        Arc::new(SimulatedLibrary::new().gpus(2).cpus(1, 4))
    } else {
        match DynamicLibrary::load() {
            Ok(lib) => {
                info!("Loaded {}", lib.path().display());
                Arc::new(lib)
            }
            Err(status) => {
                let error = Error::from(status);
                let output = Output::new(requested_format(&args), Sink::Stdout);
                if let Err(e) = output.print_error(&error) {
                    debug!("Cannot render error: {e}");
                }
                std::process::exit(error.code());
            }
        }
    };

    let platform = PlatformInfo::detect(lib.as_ref());
    info!("Platform: {platform}");

    // Mutators need root on Linux.
    let elevated = unsafe { libc::geteuid() } == 0;
    let mut app = App::new(Arc::clone(&lib), platform).elevated(elevated);
    let code = app.run(args).await;

    if let Err(status) = lib.shut_down() {
        debug!("Library shutdown failed: {status}");
    }
    std::process::exit(code);
}

/// Log to stderr at the `--loglevel` given, `error` otherwise. `RUST_LOG`
/// takes precedence when set.
fn init_logging(args: &[String]) {
    let level = requested_loglevel(args).map_or("error", |level| level.directive());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
