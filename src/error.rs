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

//! Unified error types for the amd-smi tool.
//!
//! Every failure that reaches the user is one of the variants below. Each
//! variant owns a stable process exit code and renders itself in the
//! output format the user selected, so a `--json` invocation that fails
//! still produces JSON on the output stream.
//!
//! # Example
//!
//! ```rust
//! use amd_smi::{Error, OutputFormat};
//!
//! let err = Error::InvalidParameterValue("abc".to_string());
//! assert_eq!(err.code(), -5);
//! assert_eq!(
//!     err.render(OutputFormat::Human),
//!     "Value 'abc' is not of valid type or format. Run '--help' for more info. Error code: -5"
//! );
//! ```

use thiserror::Error;

use crate::native::Status;
use crate::output::OutputFormat;

/// Device family named in a [`Error::DeviceNotFound`] message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceClass {
    Gpu,
    Cpu,
    Core,
}

impl DeviceClass {
    /// Upper-case label used in device headers and error messages.
    pub fn label(self) -> &'static str {
        match self {
            DeviceClass::Gpu => "GPU",
            DeviceClass::Cpu => "CPU",
            DeviceClass::Core => "CORE",
        }
    }

    /// Lower-case identity key written at the root of every result tree.
    pub fn key(self) -> &'static str {
        match self {
            DeviceClass::Gpu => "gpu",
            DeviceClass::Cpu => "cpu",
            DeviceClass::Core => "core",
        }
    }
}

/// The main error type for amd-smi operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Unknown subcommand, or a device selection that targets incompatible
    /// classes at once.
    #[error("Command '{0}' is invalid. Run '--help' for more info.")]
    InvalidCommand(String),

    /// Unknown flag.
    #[error("Parameter '{0}' is invalid. Run '--help' for more info.")]
    InvalidParameter(String),

    /// A well-formed selector matched no device.
    #[error("{} Device with {}_INDEX '{selector}' cannot be found on the system.", .class.label(), .class.label())]
    DeviceNotFound { class: DeviceClass, selector: String },

    /// The `--file` destination cannot be created.
    #[error("Path '{0}' cannot be found.")]
    InvalidFilePath(String),

    /// A value was rejected by a range or format validator.
    #[error("Value '{0}' is not of valid type or format. Run '--help' for more info.")]
    InvalidParameterValue(String),

    /// A flag that takes a value was given none.
    #[error("Parameter '{0}' requires a value. Run '--help' for more info.")]
    MissingParameterValue(String),

    /// The subcommand exists but is not registered on this platform.
    #[error("Command '{0}' is not supported on the system. Run '--help' for more info.")]
    CommandNotSupported(String),

    /// The flag exists but is not registered on this platform.
    #[error("Parameter '{0}' is not supported on the system. Run '--help' for more info.")]
    ParameterNotSupported(String),

    /// `set` or `reset` was invoked without a sub-action.
    #[error("Command '{0}' requires a target argument. Run '--help' for more info.")]
    RequiredCommand(String),

    /// A mutator needs elevated privileges.
    #[error("{}", native_message(&Status::NoPerm))]
    PermissionDenied,

    /// Propagated failure from the native library.
    #[error("{}", native_message(.0))]
    Native(Status),

    /// Enumeration found no devices for an initialised device family.
    #[error("No AMD {0} devices were discovered on the system")]
    NoDevices(&'static str),

    /// Catch-all for failures without a dedicated kind.
    #[error("An unknown error has occurred. Run 'help' for more info.")]
    Unknown,

    /// An I/O error occurred while writing output.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialisation failed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn native_message(status: &Status) -> String {
    format!(
        "AMDSMI has returned error '{}' - '{}'",
        status.code(),
        status.description()
    )
}

impl From<Status> for Error {
    fn from(status: Status) -> Self {
        match status {
            Status::NoPerm => Error::PermissionDenied,
            other => Error::Native(other),
        }
    }
}

impl Error {
    /// Process exit code for this error.
    pub fn code(&self) -> i32 {
        match self {
            Error::InvalidCommand(_) => -1,
            Error::InvalidParameter(_) => -2,
            Error::DeviceNotFound { .. } => -3,
            Error::InvalidFilePath(_) => -4,
            Error::InvalidParameterValue(_) => -5,
            Error::MissingParameterValue(_) => -6,
            Error::CommandNotSupported(_) => -7,
            Error::ParameterNotSupported(_) => -8,
            Error::RequiredCommand(_) => -9,
            Error::NoDevices(_) => -1,
            Error::PermissionDenied => native_exit_code(Status::NoPerm),
            Error::Native(status) => native_exit_code(*status),
            Error::Unknown | Error::Io(_) | Error::Json(_) => -100,
        }
    }

    /// Render the error in the shape the selected output format uses.
    ///
    /// The returned text carries no trailing newline.
    pub fn render(&self, format: OutputFormat) -> String {
        let message = self.to_string();
        let code = self.code();
        match format {
            OutputFormat::Json => format!(
                "{{\"error\": {}, \"code\": {code}}}",
                serde_json::Value::from(message)
            ),
            OutputFormat::Csv => format!("error,code\n{message},{code}"),
            OutputFormat::Human => format!("{message} Error code: {code}"),
        }
    }
}

fn native_exit_code(status: Status) -> i32 {
    let magnitude = i64::from(status.code());
    // Saturate for the two sentinel codes near u32::MAX.
    (-1000 - magnitude).max(i64::from(i32::MIN)) as i32
}

/// A specialized Result type for amd-smi operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidCommand("foo".to_string());
        assert_eq!(
            err.to_string(),
            "Command 'foo' is invalid. Run '--help' for more info."
        );

        let err = Error::DeviceNotFound {
            class: DeviceClass::Gpu,
            selector: "7".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "GPU Device with GPU_INDEX '7' cannot be found on the system."
        );

        let err = Error::Native(Status::NotSupported);
        assert_eq!(
            err.to_string(),
            "AMDSMI has returned error '2' - 'Command not supported'"
        );
    }

    #[test]
    fn test_exit_codes_are_distinct_for_parser_errors() {
        let errors = [
            Error::InvalidCommand(String::new()),
            Error::InvalidParameter(String::new()),
            Error::DeviceNotFound {
                class: DeviceClass::Cpu,
                selector: String::new(),
            },
            Error::InvalidFilePath(String::new()),
            Error::InvalidParameterValue(String::new()),
            Error::MissingParameterValue(String::new()),
            Error::CommandNotSupported(String::new()),
            Error::ParameterNotSupported(String::new()),
            Error::RequiredCommand(String::new()),
        ];
        let codes: Vec<i32> = errors.iter().map(Error::code).collect();
        assert_eq!(codes, vec![-1, -2, -3, -4, -5, -6, -7, -8, -9]);
    }

    #[test]
    fn test_native_exit_code() {
        assert_eq!(Error::Native(Status::Timeout).code(), -1008);
        assert_eq!(Error::PermissionDenied.code(), -1010);
        assert_eq!(Error::from(Status::NoPerm).code(), -1010);
        assert_eq!(Error::Unknown.code(), -100);
    }

    #[test]
    fn test_render_per_format() {
        let err = Error::InvalidParameter("--bogus".to_string());
        assert_eq!(
            err.render(OutputFormat::Csv),
            "error,code\nParameter '--bogus' is invalid. Run '--help' for more info.,-2"
        );

        let json: serde_json::Value =
            serde_json::from_str(&err.render(OutputFormat::Json)).unwrap();
        assert_eq!(json["code"], -2);
        assert_eq!(
            json["error"],
            "Parameter '--bogus' is invalid. Run '--help' for more info."
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.code(), -100);
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
