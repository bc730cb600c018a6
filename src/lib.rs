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

pub mod cli;
pub mod commands;
pub mod device;
pub mod error;
pub mod mock;
pub mod native;
pub mod output;

// Only the configuration module of common is part of the library surface
pub mod common {
    pub mod config;
}

pub use commands::App;
pub use error::{Error, Result};
pub use output::{OutputFormat, Sink};
