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

//! `event`: stream driver notifications until the user asks to stop.
//!
//! Every GPU gets a blocking reader on the blocking pool. Readers poll with
//! a timeout and check a shared stop flag between polls; the main task
//! prints what they send and watches standard input for `q`.

use std::io::{BufRead, BufReader};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Local};
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::common::config::AppConfig;
use crate::error::{DeviceClass, Result};
use crate::native::{EventKind, EventNotification, EventReader, Status};
use crate::output::{Output, Record};

use super::dispatch;
use super::{Ctx, StopInput};

struct Received {
    gpu: usize,
    at: DateTime<Local>,
    event: EventNotification,
}

pub async fn run(ctx: &Ctx<'_>, output: &mut Output, input: Option<StopInput>) -> Result<()> {
    let handles: Vec<_> = dispatch::targets(ctx, &[DeviceClass::Gpu])?
        .into_iter()
        .flat_map(|target| target.handles)
        .collect();

    if output.is_human() {
        output.print_text("EVENT LISTENING:\n")?;
        output.print_text("Press q and hit ENTER when you want to stop")?;
    }

    let stop = Arc::new(AtomicBool::new(false));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut workers = Vec::new();
    for handle in handles {
        let gpu = ctx.id(handle);
        match ctx.lib.event_reader(handle, EventKind::all_mask()) {
            Ok(reader) => workers.push(listen(gpu, reader, Arc::clone(&stop), tx.clone())),
            Err(status) => warn!("Cannot listen for events on GPU {gpu}: {status}"),
        }
    }
    drop(tx);
    info!("Listening for events on {} GPU(s)", workers.len());

    let stop_request = tokio::task::spawn_blocking(move || wait_for_quit(input));
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(stop_request, interrupt);

    loop {
        tokio::select! {
            Some(received) = rx.recv() => emit(output, received)?,
            _ = &mut stop_request => break,
            _ = &mut interrupt => break,
        }
    }

    stop.store(true, Ordering::Relaxed);
    for worker in workers {
        if let Err(e) = worker.await {
            warn!("Event reader did not shut down cleanly: {e}");
        }
    }
    while let Some(received) = rx.recv().await {
        emit(output, received)?;
    }
    Ok(())
}

/// Poll `reader` until `stop` is raised. At least one read always happens.
fn listen(
    gpu: usize,
    mut reader: Box<dyn EventReader>,
    stop: Arc<AtomicBool>,
    tx: UnboundedSender<Received>,
) -> JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        loop {
            match reader.read(AppConfig::EVENT_READ_TIMEOUT_MS) {
                Ok(events) => {
                    for event in events {
                        let received = Received {
                            gpu,
                            at: Local::now(),
                            event,
                        };
                        if tx.send(received).is_err() {
                            return;
                        }
                    }
                }
                Err(Status::NoData) => {}
                Err(status) => debug!("Event read failed on GPU {gpu}: {status}"),
            }
            if stop.load(Ordering::Relaxed) {
                break;
            }
        }
        if let Err(status) = reader.stop() {
            debug!("Cannot stop event reader on GPU {gpu}: {status}");
        }
    })
}

/// Block until a line reading `q` arrives or the input ends.
fn wait_for_quit(input: Option<StopInput>) {
    let reader: StopInput = input.unwrap_or_else(|| Box::new(BufReader::new(std::io::stdin())));
    for line in reader.lines() {
        match line {
            Ok(line) if line.trim() == "q" => return,
            Ok(_) => continue,
            Err(e) => {
                debug!("Cannot read stop request: {e}");
                return;
            }
        }
    }
}

fn emit(output: &mut Output, received: Received) -> Result<()> {
    let time = received.at.format("%Y-%m-%d %H:%M:%S").to_string();
    let name = received.event.kind.name();
    if output.is_human() {
        return output.print_text(&format!(
            "GPU[{}]:\t{time}\t{name}\t{}",
            received.gpu, received.event.message
        ));
    }
    output.begin_device(DeviceClass::Gpu, received.gpu);
    output.put_values(
        Record::new()
            .with("time", time)
            .with("event", name)
            .with("message", received.event.message),
    );
    output.print(false, false, false)?;
    output.reset();
    Ok(())
}
