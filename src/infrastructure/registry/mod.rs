//! YAML-backed instrument registry
//!
//! File layout:
//!
//! ```yaml
//! instruments:
//!   - name: GC-1
//!     kind: chemstation
//!     path: C:/Chem32/1/DATA
//!   - name: GC-2
//!     kind: ps
//!     path: C:/PeakSimple/out
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::debug;

use crate::domain::error::RegistryError;
use crate::domain::models::Instrument;
use crate::domain::ports::InstrumentStore;

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    instruments: Vec<Instrument>,
}

/// Instrument registry persisted as a YAML file
#[derive(Debug, Clone)]
pub struct YamlInstrumentStore {
    path: PathBuf,
}

impl YamlInstrumentStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn io_error(&self, source: std::io::Error) -> RegistryError {
        RegistryError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl InstrumentStore for YamlInstrumentStore {
    /// Missing file means an empty registry
    fn load(&self) -> Result<Vec<Instrument>, RegistryError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "registry file not found, starting empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(self.io_error(e)),
        };

        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }

        let file: RegistryFile =
            serde_yaml::from_str(&contents).map_err(|source| RegistryError::Format {
                path: self.path.clone(),
                source,
            })?;

        check_unique(&file.instruments)?;
        debug!(path = %self.path.display(), count = file.instruments.len(), "registry loaded");
        Ok(file.instruments)
    }

    fn save(&self, instruments: &[Instrument]) -> Result<(), RegistryError> {
        check_unique(instruments)?;

        let file = RegistryFile {
            instruments: instruments.to_vec(),
        };
        let yaml = serde_yaml::to_string(&file).map_err(|source| RegistryError::Format {
            path: self.path.clone(),
            source,
        })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        std::fs::write(&self.path, yaml).map_err(|e| self.io_error(e))?;

        debug!(path = %self.path.display(), count = instruments.len(), "registry saved");
        Ok(())
    }
}

fn check_unique(instruments: &[Instrument]) -> Result<(), RegistryError> {
    let mut seen = HashSet::new();
    for instrument in instruments {
        if !seen.insert(instrument.name.as_str()) {
            return Err(RegistryError::DuplicateName(instrument.name.clone()));
        }
    }
    Ok(())
}
