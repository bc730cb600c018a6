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

use std::thread;
use std::time::Duration;

use crate::native::{EventNotification, EventReader, NativeResult};

/// Upper bound on how long an idle read blocks, so stop requests are
/// noticed quickly in tests.
const IDLE_POLL_MS: u32 = 20;

/// Delivers its queued notifications on the first read, then idles.
pub struct SimulatedEventReader {
    pending: Vec<EventNotification>,
    stopped: bool,
}

impl SimulatedEventReader {
    pub fn new(pending: Vec<EventNotification>) -> Self {
        Self {
            pending,
            stopped: false,
        }
    }
}

impl EventReader for SimulatedEventReader {
    fn read(&mut self, timeout_ms: u32) -> NativeResult<Vec<EventNotification>> {
        if !self.stopped && !self.pending.is_empty() {
            return Ok(std::mem::take(&mut self.pending));
        }
        thread::sleep(Duration::from_millis(u64::from(timeout_ms.min(IDLE_POLL_MS))));
        Ok(Vec::new())
    }

    fn stop(&mut self) -> NativeResult<()> {
        self.stopped = true;
        self.pending.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::{EventKind, ProcessorHandle};

    #[test]
    fn test_events_delivered_once() {
        let mut reader = SimulatedEventReader::new(vec![EventNotification {
            processor: ProcessorHandle(0x1000),
            kind: EventKind::VmFault,
            message: "fault at 0x0".to_string(),
        }]);
        assert_eq!(reader.read(1).unwrap().len(), 1);
        assert!(reader.read(1).unwrap().is_empty());
    }

    #[test]
    fn test_stop_discards_pending() {
        let mut reader = SimulatedEventReader::new(vec![EventNotification {
            processor: ProcessorHandle(0x1000),
            kind: EventKind::GpuPreReset,
            message: String::new(),
        }]);
        reader.stop().unwrap();
        assert!(reader.read(1).unwrap().is_empty());
    }
}
