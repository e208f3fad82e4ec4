//! Calibrated range file
//!
//! ```toml
//! [volt_range]
//! az = [0.82, 1.61]
//! alt = [0.95, 1.48]
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use eigsep_core::config::AxisRanges;
use eigsep_core::traits::RangeStore;

use crate::error::ControllerError;

#[derive(Debug, Serialize, Deserialize)]
struct RangeFile {
    volt_range: AxisRanges,
}

/// Range store backed by a TOML file
#[derive(Debug, Clone)]
pub struct TomlRangeStore {
    path: PathBuf,
}

impl TomlRangeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RangeStore for TomlRangeStore {
    type Error = ControllerError;

    fn load(&mut self) -> Result<Option<AxisRanges>, Self::Error> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ControllerError::ConfigIo {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let file: RangeFile =
            toml::from_str(&text).map_err(|source| ControllerError::ConfigParse {
                path: self.path.clone(),
                source,
            })?;
        Ok(Some(file.volt_range))
    }

    fn store(&mut self, ranges: &AxisRanges) -> Result<(), Self::Error> {
        let text = toml::to_string(&RangeFile {
            volt_range: *ranges,
        })?;
        // write-then-rename so a crash never leaves a truncated file
        let tmp = self.path.with_extension("toml.tmp");
        fs::write(&tmp, text).map_err(|source| ControllerError::StoreWrite {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &self.path).map_err(|source| ControllerError::StoreWrite {
            path: self.path.clone(),
            source,
        })
    }
}
