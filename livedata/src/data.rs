//! Loading of structured data (configurations, queries, settings, schemas)
//! from JSON or YAML files.

use std::fs;
use std::path::Path;

use eyre::{Result, WrapErr};
use serde::de::DeserializeOwned;

use crate::Error;

/// Load structured data from the given file. The format follows the file
/// extension.
pub fn load_data<T, P>(path: P) -> Result<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .ok_or_else(|| Error::CannotDetermineFileType(path.to_path_buf()))?;
    let content = fs::read_to_string(path)
        .map_err(|e| Error::Io(path.display().to_string(), e))?;
    parse_data(&content, ext).wrap_err_with(|| format!("failed to load {}", path.display()))
}

/// Parse structured data in the format designated by the given file
/// extension.
pub fn parse_data<T: DeserializeOwned>(content: &str, ext: &str) -> Result<T, Error> {
    match ext {
        "json" => Ok(serde_json::from_str(content)?),
        "yml" | "yaml" => Ok(serde_yaml::from_str(content)?),
        _ => Err(Error::UnsupportedFileType(ext.to_string())),
    }
}
