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

//! Repeat a subcommand at a fixed period.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use crate::cli::WatchArgs;
use crate::error::Result;
use crate::output::Output;

/// Run `iteration` every `args.interval` seconds until a cap is reached or
/// the process is interrupted, then flush a file destination in one write.
///
/// Without caps the loop only ends on interrupt. An interrupt drops any
/// rows not yet moved into the watch buffer.
pub async fn run<F>(args: WatchArgs, output: &mut Output, tabular: bool, mut iteration: F) -> Result<()>
where
    F: FnMut(&mut Output) -> Result<()>,
{
    let period = Duration::from_secs(args.interval);
    let deadline = args
        .duration
        .map(|secs| Instant::now() + Duration::from_secs(secs));
    let expired = |deadline: Option<Instant>| deadline.is_some_and(|at| Instant::now() >= at);

    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);
    let mut interrupt_armed = true;
    let mut completed: u64 = 0;

    loop {
        iteration(output)?;
        completed += 1;
        debug!("Watch iteration {completed} complete");

        if args.iterations.is_some_and(|cap| completed >= cap) || expired(deadline) {
            break;
        }

        tokio::select! {
            _ = tokio::time::sleep(period) => {}
            signal = &mut interrupt, if interrupt_armed => {
                match signal {
                    Ok(()) => {
                        info!("Watch interrupted after {completed} iteration(s)");
                        output.discard_pending();
                        break;
                    }
                    Err(e) => {
                        debug!("Cannot listen for interrupts: {e}");
                        interrupt_armed = false;
                        tokio::time::sleep(period).await;
                    }
                }
            }
        }

        if expired(deadline) {
            break;
        }
    }

    output.flush_watch(tabular)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeviceClass;
    use crate::output::{OutputFormat, Sink};

    fn iteration(output: &mut Output) -> Result<()> {
        output.begin_device(DeviceClass::Gpu, 0);
        output.print(false, true, false)?;
        output.take_watch(false);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_iteration_cap() {
        let (sink, _buffer) = Sink::memory();
        let mut output = Output::new(OutputFormat::Json, sink);
        let args = WatchArgs {
            interval: 1,
            duration: None,
            iterations: Some(3),
        };
        run(args, &mut output, false, iteration).await.unwrap();
        assert_eq!(output.watch_len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_duration_cap() {
        let (sink, _buffer) = Sink::memory();
        let mut output = Output::new(OutputFormat::Json, sink);
        let args = WatchArgs {
            interval: 1,
            duration: Some(5),
            iterations: None,
        };
        run(args, &mut output, false, iteration).await.unwrap();
        let trees = output.watch_len();
        assert!((4..=6).contains(&trees), "got {trees} trees");
    }

    #[tokio::test(start_paused = true)]
    async fn test_whichever_cap_comes_first() {
        let (sink, _buffer) = Sink::memory();
        let mut output = Output::new(OutputFormat::Csv, sink);
        let args = WatchArgs {
            interval: 2,
            duration: Some(3),
            iterations: Some(10),
        };
        run(args, &mut output, false, iteration).await.unwrap();
        assert_eq!(output.watch_len(), 2);
    }
}
