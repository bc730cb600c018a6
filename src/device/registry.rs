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

//! Device registry: the handle sets enumerated at startup and the
//! resolution of user selectors (index, BDF, UUID, `all`) against them.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::device::{Bdf, PlatformInfo};
use crate::error::{DeviceClass, Error, Result};
use crate::native::{ProcessorHandle, ProcessorType, SmiLibrary};

static UUID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .unwrap_or_else(|_| unreachable!("UUID pattern is a valid regex"))
});

/// One enumerated device and its display identities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEntry {
    pub index: usize,
    pub handle: ProcessorHandle,
    pub bdf: Option<Bdf>,
    pub uuid: Option<String>,
}

/// Read-only after startup.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    gpus: Vec<DeviceEntry>,
    cpus: Vec<DeviceEntry>,
    cores: Vec<DeviceEntry>,
}

impl Registry {
    /// Walk every socket and classify its processors.
    ///
    /// Fails when a device family reported as initialised has no devices.
    pub fn enumerate(lib: &dyn SmiLibrary, platform: &PlatformInfo) -> Result<Self> {
        let mut registry = Registry::default();

        let sockets = match lib.socket_handles() {
            Ok(sockets) => sockets,
            Err(status) => {
                debug!("Socket enumeration failed: {status}");
                Vec::new()
            }
        };

        for socket in sockets {
            let processors = match lib.processor_handles(socket) {
                Ok(processors) => processors,
                Err(status) => {
                    debug!("Processor enumeration failed for socket {socket:?}: {status}");
                    continue;
                }
            };
            for handle in processors {
                match lib.processor_type(handle) {
                    Ok(ProcessorType::AmdGpu) if platform.gpu_initialised => {
                        let index = registry.gpus.len();
                        registry.gpus.push(DeviceEntry {
                            index,
                            handle,
                            bdf: lib.gpu_bdf(handle).ok(),
                            uuid: lib.gpu_uuid(handle).ok(),
                        });
                    }
                    Ok(ProcessorType::AmdCpu) if platform.cpu_initialised => {
                        let index = registry.cpus.len();
                        registry.cpus.push(DeviceEntry {
                            index,
                            handle,
                            bdf: None,
                            uuid: None,
                        });
                    }
                    Ok(ProcessorType::AmdCpuCore) if platform.cpu_initialised => {
                        let index = registry.cores.len();
                        registry.cores.push(DeviceEntry {
                            index,
                            handle,
                            bdf: None,
                            uuid: None,
                        });
                    }
                    Ok(other) => debug!("Skipping processor {handle:?} of type {other:?}"),
                    Err(status) => debug!("Cannot classify processor {handle:?}: {status}"),
                }
            }
        }

        if platform.gpu_initialised && registry.gpus.is_empty() {
            return Err(Error::NoDevices("GPU"));
        }
        if platform.cpu_initialised && registry.cpus.is_empty() && registry.cores.is_empty() {
            return Err(Error::NoDevices("CPU"));
        }

        debug!(
            "Enumerated {} GPU(s), {} CPU socket(s), {} core(s)",
            registry.gpus.len(),
            registry.cpus.len(),
            registry.cores.len()
        );
        Ok(registry)
    }

    pub fn entries(&self, class: DeviceClass) -> &[DeviceEntry] {
        match class {
            DeviceClass::Gpu => &self.gpus,
            DeviceClass::Cpu => &self.cpus,
            DeviceClass::Core => &self.cores,
        }
    }

    pub fn gpus(&self) -> &[DeviceEntry] {
        &self.gpus
    }

    pub fn cpus(&self) -> &[DeviceEntry] {
        &self.cpus
    }

    pub fn cores(&self) -> &[DeviceEntry] {
        &self.cores
    }

    pub fn handles(&self, class: DeviceClass) -> Vec<ProcessorHandle> {
        self.entries(class).iter().map(|entry| entry.handle).collect()
    }

    /// Resolve a single selector token.
    pub fn resolve(&self, class: DeviceClass, selector: &str) -> Result<Vec<ProcessorHandle>> {
        let token = selector.trim();
        if token.is_empty() {
            return Err(Error::MissingParameterValue(format!("--{}", class.key())));
        }
        let entries = self.entries(class);
        let not_found = || Error::DeviceNotFound {
            class,
            selector: token.to_string(),
        };

        if token.eq_ignore_ascii_case("all") {
            return Ok(self.handles(class));
        }

        if token.chars().all(|c| c.is_ascii_digit()) {
            let index: usize = token.parse().map_err(|_| not_found())?;
            return entries
                .get(index)
                .map(|entry| vec![entry.handle])
                .ok_or_else(not_found);
        }

        if let Ok(bdf) = Bdf::parse(token) {
            return entries
                .iter()
                .find(|entry| entry.bdf == Some(bdf))
                .map(|entry| vec![entry.handle])
                .ok_or_else(not_found);
        }

        if let Some(entry) = entries.iter().find(|entry| {
            entry
                .uuid
                .as_deref()
                .is_some_and(|uuid| uuid.eq_ignore_ascii_case(token))
        }) {
            return Ok(vec![entry.handle]);
        }

        if UUID_PATTERN.is_match(token) {
            return Err(not_found());
        }
        Err(Error::InvalidParameterValue(token.to_string()))
    }

    /// Resolve every token given to a selector flag. Tokens may also be
    /// comma separated. Duplicates collapse, first occurrence wins.
    pub fn resolve_many<S: AsRef<str>>(
        &self,
        class: DeviceClass,
        selectors: &[S],
    ) -> Result<Vec<ProcessorHandle>> {
        let mut resolved: Vec<ProcessorHandle> = Vec::new();
        let tokens = selectors
            .iter()
            .flat_map(|s| s.as_ref().split(','))
            .map(str::trim)
            .filter(|t| !t.is_empty());

        let mut seen_any = false;
        for token in tokens {
            seen_any = true;
            for handle in self.resolve(class, token)? {
                if !resolved.contains(&handle) {
                    resolved.push(handle);
                }
            }
        }
        if !seen_any {
            return Err(Error::MissingParameterValue(format!("--{}", class.key())));
        }
        Ok(resolved)
    }

    /// Stable integer identity of a handle within its class.
    pub fn id_of(&self, handle: ProcessorHandle) -> Option<usize> {
        self.entry(handle).map(|entry| entry.index)
    }

    pub fn entry(&self, handle: ProcessorHandle) -> Option<&DeviceEntry> {
        self.gpus
            .iter()
            .chain(self.cpus.iter())
            .chain(self.cores.iter())
            .find(|entry| entry.handle == handle)
    }

    pub fn class_of(&self, handle: ProcessorHandle) -> Option<DeviceClass> {
        if self.gpus.iter().any(|e| e.handle == handle) {
            Some(DeviceClass::Gpu)
        } else if self.cpus.iter().any(|e| e.handle == handle) {
            Some(DeviceClass::Cpu)
        } else if self.cores.iter().any(|e| e.handle == handle) {
            Some(DeviceClass::Core)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::SimulatedLibrary;

    fn two_gpu_registry() -> Registry {
        let lib = SimulatedLibrary::new()
            .gpu(Bdf::new(0, 0x03, 0, 0), "aaaaaaaa-0000-1000-8000-000000000001")
            .gpu(Bdf::new(0, 0x83, 0, 0), "bbbbbbbb-0000-1000-8000-000000000002");
        Registry::enumerate(&lib, &PlatformInfo::linux_baremetal(true, false)).unwrap()
    }

    #[test]
    fn test_selector_forms_agree() {
        let registry = two_gpu_registry();
        for (index, entry) in registry.gpus().iter().enumerate() {
            let bdf = entry.bdf.unwrap();
            let uuid = entry.uuid.clone().unwrap();
            let expected = vec![entry.handle];
            assert_eq!(registry.resolve(DeviceClass::Gpu, &index.to_string()).unwrap(), expected);
            assert_eq!(registry.resolve(DeviceClass::Gpu, &bdf.to_string()).unwrap(), expected);
            assert_eq!(registry.resolve(DeviceClass::Gpu, &bdf.short()).unwrap(), expected);
            assert_eq!(registry.resolve(DeviceClass::Gpu, &uuid.to_uppercase()).unwrap(), expected);
        }
    }

    #[test]
    fn test_all_and_dedup() {
        let registry = two_gpu_registry();
        assert_eq!(registry.resolve(DeviceClass::Gpu, "all").unwrap().len(), 2);
        let handles = registry
            .resolve_many(DeviceClass::Gpu, &["1,0", "1"])
            .unwrap();
        assert_eq!(handles, vec![registry.gpus()[1].handle, registry.gpus()[0].handle]);
    }

    #[test]
    fn test_selector_errors() {
        let registry = two_gpu_registry();
        assert!(matches!(
            registry.resolve(DeviceClass::Gpu, "7"),
            Err(Error::DeviceNotFound { .. })
        ));
        assert!(matches!(
            registry.resolve(DeviceClass::Gpu, "0000:44:00.0"),
            Err(Error::DeviceNotFound { .. })
        ));
        assert!(matches!(
            registry.resolve(DeviceClass::Gpu, "cccccccc-0000-1000-8000-000000000003"),
            Err(Error::DeviceNotFound { .. })
        ));
        assert!(matches!(
            registry.resolve(DeviceClass::Gpu, "gpu-zero"),
            Err(Error::InvalidParameterValue(_))
        ));
        assert!(matches!(
            registry.resolve_many::<&str>(DeviceClass::Gpu, &[]),
            Err(Error::MissingParameterValue(_))
        ));
    }

    #[test]
    fn test_enumeration_requires_devices() {
        let lib = SimulatedLibrary::new().gpus(1);
        let err = Registry::enumerate(&lib, &PlatformInfo::linux_baremetal(true, true)).unwrap_err();
        assert!(matches!(err, Error::NoDevices("CPU")));

        let lib = SimulatedLibrary::new().cpus(1, 2);
        let err = Registry::enumerate(&lib, &PlatformInfo::linux_baremetal(true, true)).unwrap_err();
        assert!(matches!(err, Error::NoDevices("GPU")));
    }

    #[test]
    fn test_classes_are_disjoint() {
        let lib = SimulatedLibrary::new().gpus(1).cpus(2, 3);
        let registry = Registry::enumerate(&lib, &PlatformInfo::linux_baremetal(true, true)).unwrap();
        assert_eq!(registry.gpus().len(), 1);
        assert_eq!(registry.cpus().len(), 2);
        assert_eq!(registry.cores().len(), 6);
        let core = registry.cores()[4].handle;
        assert_eq!(registry.class_of(core), Some(DeviceClass::Core));
        assert_eq!(registry.id_of(core), Some(4));
    }
}
