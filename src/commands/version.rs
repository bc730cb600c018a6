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

use crate::common::config::AppConfig;
use crate::error::Result;
use crate::output::{Output, Record, Value};

use super::field::field;
use super::Ctx;

pub fn run(ctx: &Ctx<'_>, output: &mut Output) -> Result<()> {
    let library = field("amdsmi_library_version", ctx.lib.lib_version().map(|v| v.dotted()));
    let rocm = Value::opt(ctx.rocm_version);

    if output.is_human() {
        return output.print_text(&format!(
            "{}: {} | AMDSMI Library version: {library} | ROCm version: {rocm}",
            AppConfig::TOOL_NAME,
            ctx.tool_version
        ));
    }

    output.put_values(
        Record::new()
            .with("tool", AppConfig::TOOL_NAME)
            .with("version", ctx.tool_version)
            .with("amdsmi_library_version", library)
            .with("rocm_version", rocm),
    );
    output.print(false, false, false)?;
    output.reset();
    Ok(())
}
