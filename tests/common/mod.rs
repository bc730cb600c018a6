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

//! Shared harness: run one command line against the simulated library and
//! capture what it printed.

#![allow(dead_code)]

use std::io::Cursor;
use std::sync::{Arc, Mutex};

use amd_smi::device::PlatformInfo;
use amd_smi::mock::SimulatedLibrary;
use amd_smi::native::SmiLibrary;
use amd_smi::{App, Sink};

pub struct Harness {
    pub app: App,
    pub lib: Arc<dyn SmiLibrary>,
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl Harness {
    pub fn new(lib: SimulatedLibrary) -> Self {
        Self::on(lib, PlatformInfo::linux_baremetal(true, false))
    }

    pub fn on(lib: SimulatedLibrary, platform: PlatformInfo) -> Self {
        let lib: Arc<dyn SmiLibrary> = Arc::new(lib);
        let (sink, buffer) = Sink::memory();
        let app = App::new(Arc::clone(&lib), platform)
            .with_sink(sink)
            .with_tool_version("1.0.0")
            .with_rocm_version(Some("6.0.0".to_string()));
        Self { app, lib, buffer }
    }

    pub fn elevated(mut self) -> Self {
        self.app = self.app.elevated(true);
        self
    }

    /// Feed `input` to `event` as its stop request.
    pub fn stop_after(mut self, input: &'static str) -> Self {
        self.app = self.app.with_input(Box::new(Cursor::new(input)));
        self
    }

    /// Run `args` (without the program name) and return the exit code and
    /// everything printed since the previous run.
    pub async fn run(&mut self, args: &[&str]) -> (i32, String) {
        let argv = std::iter::once("amd-smi").chain(args.iter().copied());
        let code = self.app.run(argv).await;
        let mut buffer = self.buffer.lock().unwrap();
        let text = String::from_utf8(buffer.clone()).unwrap();
        buffer.clear();
        (code, text)
    }
}

/// Two GPUs with fixed identities.
pub fn two_gpus() -> SimulatedLibrary {
    SimulatedLibrary::new()
        .gpu(
            "0000:03:00.0".parse().unwrap(),
            "aaaaaaaa-aaaa-aaaa-aaaa-aaaaaaaaaaaa",
        )
        .gpu(
            "0000:83:00.0".parse().unwrap(),
            "bbbbbbbb-bbbb-bbbb-bbbb-bbbbbbbbbbbb",
        )
}

/// Keys of the JSON object fields printed at `indent` spaces, in the order
/// they appear in the text.
pub fn keys_at(text: &str, indent: usize) -> Vec<String> {
    let prefix = format!("{}\"", " ".repeat(indent));
    text.lines()
        .filter_map(|line| line.strip_prefix(&prefix))
        .filter_map(|rest| rest.split_once('"'))
        .map(|(key, _)| key.to_string())
        .collect()
}
