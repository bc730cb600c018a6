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

//! Device fan-out.
//!
//! Handlers describe one device; the dispatcher decides which devices of
//! which classes an invocation addresses, runs the handler for each, and
//! hands the rows to the emitter one class at a time.

use tracing::debug;

use crate::common::config::AppConfig;
use crate::error::{DeviceClass, Result};
use crate::native::ProcessorHandle;
use crate::output::{Output, Record};

use super::Ctx;

/// Devices of one class an invocation addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub class: DeviceClass,
    pub handles: Vec<ProcessorHandle>,
}

/// Resolve the selected devices, in GPU, CPU, core order.
///
/// A class with a selector gets the resolved handles. Without any
/// selector, classes that have field flags are targeted in full; when no
/// class has field flags every class with devices is targeted.
pub fn targets(ctx: &Ctx<'_>, classes: &[DeviceClass]) -> Result<Vec<Target>> {
    let args = ctx.args;
    let any_flags = classes.iter().any(|class| args.has_class_flags(*class));
    let mut targets = Vec::new();

    for class in [DeviceClass::Gpu, DeviceClass::Cpu, DeviceClass::Core] {
        if !classes.contains(&class) {
            continue;
        }
        let handles = match args.selector(class) {
            Some(selectors) => ctx.registry.resolve_many(class, selectors)?,
            None if args.has_selector() || any_flags => {
                if args.has_class_flags(class) {
                    ctx.registry.handles(class)
                } else {
                    continue;
                }
            }
            None => ctx.registry.handles(class),
        };
        if handles.is_empty() {
            debug!("No {} devices targeted", class.label());
            continue;
        }
        targets.push(Target { class, handles });
    }
    Ok(targets)
}

/// How a batch of rows is presented.
#[derive(Debug, Clone, Copy, Default)]
pub struct Emit {
    /// Fixed-width rows instead of indented trees.
    pub tabular: bool,
    /// Lead every row with a Unix timestamp.
    pub timestamp: bool,
    /// Pairwise grid; CSV prefixes each cell with its table name.
    pub grid: bool,
    /// Inside a watch loop.
    pub watching: bool,
}

/// Store and print one class's rows.
///
/// More than one row makes the output multi-device: the rows are buffered
/// and printed together as one JSON array or one CSV table.
pub fn emit(output: &mut Output, class: DeviceClass, rows: Vec<(usize, Record)>, opts: Emit) -> Result<()> {
    let multiple = rows.len() > 1;
    for (id, values) in rows {
        if opts.timestamp {
            output.put_timestamp();
        }
        output.begin_device(class, id);
        if opts.grid {
            output.put_grid(values);
        } else if output.is_human() && !opts.tabular {
            output.put(AppConfig::SPACING_REMOVAL_KEY, values);
        } else {
            output.put_values(values);
        }
        if multiple {
            output.snapshot();
        }
    }
    output.print(multiple, opts.watching, opts.tabular)?;
    if opts.watching {
        output.take_watch(multiple);
    } else {
        output.reset();
    }
    Ok(())
}

/// Run `handler` for every targeted device and emit each class in turn.
///
/// A handler returns one or more rows per device; one-to-many handlers
/// (firmware and process lists in CSV) return several.
pub fn fan_out<F>(ctx: &Ctx<'_>, output: &mut Output, classes: &[DeviceClass], opts: Emit, mut handler: F) -> Result<()>
where
    F: FnMut(&Ctx<'_>, DeviceClass, ProcessorHandle) -> Result<Vec<Record>>,
{
    for target in targets(ctx, classes)? {
        let mut rows = Vec::new();
        for handle in &target.handles {
            let id = ctx.id(*handle);
            for record in handler(ctx, target.class, *handle)? {
                rows.push((id, record));
            }
        }
        emit(output, target.class, rows, opts)?;
    }
    Ok(())
}
