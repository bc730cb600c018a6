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
use std::str::FromStr;

/// PCIe bus/device/function address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Bdf {
    pub domain: u16,
    pub bus: u8,
    pub device: u8,
    pub function: u8,
}

/// Why a BDF string was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BdfParseError(pub String);

impl fmt::Display for BdfParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid BDF '{}'", self.0)
    }
}

impl std::error::Error for BdfParseError {}

impl Bdf {
    pub const fn new(domain: u16, bus: u8, device: u8, function: u8) -> Self {
        Self {
            domain,
            bus,
            device,
            function,
        }
    }

    /// Decode the packed `amdsmi_bdf_t` bitfield: function in bits 0-2,
    /// device in 3-7, bus in 8-15, domain above.
    pub fn from_packed(raw: u64) -> Self {
        Self {
            function: (raw & 0x7) as u8,
            device: ((raw >> 3) & 0x1f) as u8,
            bus: ((raw >> 8) & 0xff) as u8,
            domain: ((raw >> 16) & 0xffff) as u16,
        }
    }

    pub fn to_packed(self) -> u64 {
        u64::from(self.function)
            | (u64::from(self.device) << 3)
            | (u64::from(self.bus) << 8)
            | (u64::from(self.domain) << 16)
    }

    /// Parse either `dddd:bb:dd.f` or the short `bb:dd.f` form.
    pub fn parse(input: &str) -> Result<Self, BdfParseError> {
        let err = || BdfParseError(input.to_string());
        let trimmed = input.trim();

        let (location, function) = trimmed.rsplit_once('.').ok_or_else(err)?;
        let parts: Vec<&str> = location.split(':').collect();
        let (domain, bus, device) = match parts.as_slice() {
            [domain, bus, device] => (*domain, *bus, *device),
            [bus, device] => ("0", *bus, *device),
            _ => return Err(err()),
        };

        let field = |text: &str, max_len: usize, limit: u32| -> Result<u32, BdfParseError> {
            if text.is_empty()
                || text.len() > max_len
                || !text.chars().all(|c| c.is_ascii_hexdigit())
            {
                return Err(err());
            }
            let value = u32::from_str_radix(text, 16).map_err(|_| err())?;
            if value > limit {
                return Err(err());
            }
            Ok(value)
        };

        Ok(Self {
            domain: field(domain, 4, 0xffff)? as u16,
            bus: field(bus, 2, 0xff)? as u8,
            device: field(device, 2, 0x1f)? as u8,
            function: field(function, 1, 0x7)? as u8,
        })
    }

    /// Short `bb:dd.f` rendering, meaningful only when the domain is zero.
    pub fn short(&self) -> String {
        format!("{:02x}:{:02x}.{:x}", self.bus, self.device, self.function)
    }
}

impl fmt::Display for Bdf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04x}:{:02x}:{:02x}.{:x}",
            self.domain, self.bus, self.device, self.function
        )
    }
}

impl FromStr for Bdf {
    type Err = BdfParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Bdf::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_extended() {
        let bdf = Bdf::parse("0000:83:00.0").unwrap();
        assert_eq!(bdf, Bdf::new(0, 0x83, 0, 0));
        assert_eq!(bdf.to_string(), "0000:83:00.0");
    }

    #[test]
    fn test_parse_short_defaults_domain() {
        let bdf = Bdf::parse("c1:1f.7").unwrap();
        assert_eq!(bdf, Bdf::new(0, 0xc1, 0x1f, 7));
        assert_eq!(bdf.short(), "c1:1f.7");
    }

    #[test]
    fn test_parse_uppercase_hex() {
        assert_eq!(
            Bdf::parse("00AB:C3:00.1").unwrap(),
            Bdf::new(0xab, 0xc3, 0, 1)
        );
    }

    #[test]
    fn test_rejects_out_of_range_components() {
        assert!(Bdf::parse("0000:03:20.0").is_err()); // device > 31
        assert!(Bdf::parse("0000:03:00.8").is_err()); // function > 7
        assert!(Bdf::parse("10000:03:00.0").is_err());
        assert!(Bdf::parse("0000:103:00.0").is_err());
    }

    #[test]
    fn test_rejects_malformed() {
        for input in ["", "0", "03:00", "0000:03:00", "zz:00.0", "0:0:0:0.0", "0000:03:00.x"] {
            assert!(Bdf::parse(input).is_err(), "{input} should not parse");
        }
    }

    #[test]
    fn test_packed_round_trip() {
        let bdf = Bdf::new(0x0001, 0x83, 0x1f, 0x5);
        assert_eq!(Bdf::from_packed(bdf.to_packed()), bdf);
        assert_eq!(Bdf::from_packed(0x0300), Bdf::new(0, 3, 0, 0));
    }
}
