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

//! Tolerant field assembly.
//!
//! A failed native call never aborts a handler: the field it feeds becomes
//! the `N/A` sentinel and the failure is logged at debug level.

use tracing::debug;

use crate::error::{Error, Result};
use crate::native::{MetricValue, NativeResult, Status};
use crate::output::{Record, Value};

/// The call's value, or `None` with the failure logged under `key`.
pub fn tolerant<T>(key: &str, result: NativeResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(status) => {
            debug!("Failed to get {key}: {status}");
            None
        }
    }
}

pub fn field<T: Into<Value>>(key: &str, result: NativeResult<T>) -> Value {
    Value::opt(tolerant(key, result))
}

pub fn field_unit<T: Into<Value>>(key: &str, result: NativeResult<T>, unit: &str) -> Value {
    Value::with_unit(field(key, result), unit)
}

/// A gpu_metrics slot, with the all-ones sentinel read as unavailable.
pub fn metric<T: MetricValue>(raw: T, unit: &str) -> Value {
    Value::with_unit(Value::opt(raw.available()), unit)
}

/// Every key set to the sentinel; used when a whole group's call fails.
pub fn na_record(keys: &[&str]) -> Record {
    keys.iter().map(|key| (key.to_string(), Value::na())).collect()
}

/// `0x`-prefixed lower-case hex.
pub fn hex(value: impl std::fmt::LowerHex) -> Value {
    Value::from(format!("{value:#x}"))
}

/// Result string of one mutator call.
///
/// Other failures leave the sentinel behind, but a permission failure
/// aborts the command.
pub fn applied<T>(key: &str, result: NativeResult<T>, message: impl FnOnce(T) -> String) -> Result<Value> {
    match result {
        Ok(value) => Ok(Value::from(message(value))),
        Err(Status::NoPerm) => Err(Error::PermissionDenied),
        Err(status) => {
            debug!("Failed to apply {key}: {status}");
            Ok(Value::na())
        }
    }
}

pub fn enabled(flag: bool) -> Value {
    Value::from(if flag { "ENABLED" } else { "DISABLED" })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_call_becomes_sentinel() {
        assert_eq!(field::<u32>("power", Err(Status::NotSupported)), Value::NotAvailable);
        assert_eq!(field("power", Ok(165u32)), Value::UInt(165));
        assert_eq!(
            field_unit::<u32>("power", Err(Status::NotSupported), "W"),
            Value::NotAvailable
        );
        assert_eq!(field_unit("power", Ok(165u32), "W").to_string(), "165 W");
    }

    #[test]
    fn test_metric_sentinel_slots() {
        assert!(metric(u16::MAX, "%").is_na());
        assert_eq!(metric(42u16, "%").to_string(), "42 %");
    }

    #[test]
    fn test_helpers() {
        assert_eq!(hex(0x74a1u64).to_string(), "0x74a1");
        assert_eq!(enabled(true).to_string(), "ENABLED");
        let record = na_record(&["a", "b"]);
        assert_eq!(record.len(), 2);
        assert!(record.get("b").is_some_and(Value::is_na));
    }

    #[test]
    fn test_mutator_outcomes() {
        let done = applied("fan", Ok(()), |()| "Successfully set fan speed".to_string()).unwrap();
        assert_eq!(done.to_string(), "Successfully set fan speed");
        assert!(applied("fan", Err::<(), _>(Status::NotSupported), |()| String::new()).unwrap().is_na());
        assert!(matches!(
            applied("fan", Err::<(), _>(Status::NoPerm), |()| String::new()),
            Err(Error::PermissionDenied)
        ));
    }
}
