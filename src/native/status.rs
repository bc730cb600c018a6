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

use std::fmt;

/// Status codes reported by the AMD SMI library.
///
/// Discriminants match `amdsmi_status_t` so raw codes coming back over the
/// FFI boundary map one-to-one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Inval,
    NotSupported,
    NotYetImplemented,
    FailLoadModule,
    FailLoadSymbol,
    DrmError,
    ApiFailed,
    Timeout,
    Retry,
    NoPerm,
    Interrupt,
    Io,
    AddressFault,
    FileError,
    OutOfResources,
    InternalException,
    InputOutOfBounds,
    InitError,
    RefcountOverflow,
    Busy,
    NotFound,
    NotInit,
    NoSlot,
    NoData,
    InsufficientSize,
    UnexpectedSize,
    UnexpectedData,
    MapError,
    UnknownError,
}

/// Result of a single native call.
pub type NativeResult<T> = std::result::Result<T, Status>;

impl Status {
    /// Convert a raw `amdsmi_status_t` into a result.
    pub fn check(raw: u32) -> NativeResult<()> {
        match raw {
            0 => Ok(()),
            other => Err(Self::from_raw(other)),
        }
    }

    pub fn from_raw(raw: u32) -> Status {
        match raw {
            1 => Status::Inval,
            2 => Status::NotSupported,
            3 => Status::NotYetImplemented,
            4 => Status::FailLoadModule,
            5 => Status::FailLoadSymbol,
            6 => Status::DrmError,
            7 => Status::ApiFailed,
            8 => Status::Timeout,
            9 => Status::Retry,
            10 => Status::NoPerm,
            11 => Status::Interrupt,
            12 => Status::Io,
            13 => Status::AddressFault,
            14 => Status::FileError,
            15 => Status::OutOfResources,
            16 => Status::InternalException,
            17 => Status::InputOutOfBounds,
            18 => Status::InitError,
            19 => Status::RefcountOverflow,
            30 => Status::Busy,
            31 => Status::NotFound,
            32 => Status::NotInit,
            33 => Status::NoSlot,
            40 => Status::NoData,
            41 => Status::InsufficientSize,
            42 => Status::UnexpectedSize,
            43 => Status::UnexpectedData,
            0xFFFF_FFFE => Status::MapError,
            _ => Status::UnknownError,
        }
    }

    pub fn code(self) -> u32 {
        match self {
            Status::Inval => 1,
            Status::NotSupported => 2,
            Status::NotYetImplemented => 3,
            Status::FailLoadModule => 4,
            Status::FailLoadSymbol => 5,
            Status::DrmError => 6,
            Status::ApiFailed => 7,
            Status::Timeout => 8,
            Status::Retry => 9,
            Status::NoPerm => 10,
            Status::Interrupt => 11,
            Status::Io => 12,
            Status::AddressFault => 13,
            Status::FileError => 14,
            Status::OutOfResources => 15,
            Status::InternalException => 16,
            Status::InputOutOfBounds => 17,
            Status::InitError => 18,
            Status::RefcountOverflow => 19,
            Status::Busy => 30,
            Status::NotFound => 31,
            Status::NotInit => 32,
            Status::NoSlot => 33,
            Status::NoData => 40,
            Status::InsufficientSize => 41,
            Status::UnexpectedSize => 42,
            Status::UnexpectedData => 43,
            Status::MapError => 0xFFFF_FFFE,
            Status::UnknownError => 0xFFFF_FFFF,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Status::Inval => "Invalid parameters",
            Status::NotSupported => "Command not supported",
            Status::NotYetImplemented => "Not implemented yet",
            Status::FailLoadModule => "Fail to load lib",
            Status::FailLoadSymbol => "Fail to load symbol",
            Status::DrmError => "Error when call libdrm",
            Status::ApiFailed => "API call failed",
            Status::Timeout => "Timeout in API call",
            Status::Retry => "Retry operation",
            Status::NoPerm => "Permission Denied",
            Status::Interrupt => "An interrupt occurred during execution of function",
            Status::Io => "I/O Error",
            Status::AddressFault => "Bad address",
            Status::FileError => "Problem accessing a file",
            Status::OutOfResources => "Not enough memory",
            Status::InternalException => "An internal exception was caught",
            Status::InputOutOfBounds => "The provided input is out of allowable or safe range",
            Status::InitError => "An error occurred when initializing internal data structures",
            Status::RefcountOverflow => "An internal reference counter exceeded INT32_MAX",
            Status::Busy => "Device busy",
            Status::NotFound => "Device Not found",
            Status::NotInit => "Device not initialized",
            Status::NoSlot => "No more free slot",
            Status::NoData => "No data was found for a given input",
            Status::InsufficientSize => {
                "Not enough resources were available for the operation"
            }
            Status::UnexpectedSize => "An unexpected amount of data was read",
            Status::UnexpectedData => {
                "The data read or provided to function is not what was expected"
            }
            Status::MapError => "The internal library error did not map to a status code",
            Status::UnknownError => "An unknown error occurred",
        }
    }

    /// Statuses that mean the field simply does not exist on this device.
    pub fn is_unsupported(self) -> bool {
        matches!(
            self,
            Status::NotSupported | Status::NotYetImplemented | Status::NoData
        )
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.code())
    }
}

impl std::error::Error for Status {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_codes_round_trip() {
        for raw in [1u32, 2, 8, 10, 19, 30, 33, 40, 43, 0xFFFF_FFFE, 0xFFFF_FFFF] {
            assert_eq!(Status::from_raw(raw).code(), raw);
        }
        assert!(Status::check(0).is_ok());
        assert_eq!(Status::check(10), Err(Status::NoPerm));
    }

    #[test]
    fn test_unmapped_code_is_unknown() {
        assert_eq!(Status::from_raw(25), Status::UnknownError);
    }
}
