//! I/O 支持：JSON 与 RON 序列化，以及按扩展名读取网描述。
use std::fs;
use std::path::Path;

use ron::ser::PrettyConfig;
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

use crate::net::description::NetDescription;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("ron error: {0}")]
    Ron(#[from] ron::Error),
    #[error("ron parse error: {0}")]
    RonParse(#[from] ron::error::SpannedError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub fn to_json_string<T: Serialize>(value: &T) -> Result<String, IoError> {
    Ok(serde_json::to_string_pretty(value)?)
}

pub fn from_json_str<T: DeserializeOwned>(s: &str) -> Result<T, IoError> {
    Ok(serde_json::from_str(s)?)
}

pub fn write_json<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> Result<(), IoError> {
    fs::write(path, to_json_string(value)?)?;
    Ok(())
}

pub fn read_json<P: AsRef<Path>, T: DeserializeOwned>(path: P) -> Result<T, IoError> {
    from_json_str(&fs::read_to_string(path)?)
}

pub fn to_ron_string<T: Serialize>(value: &T) -> Result<String, IoError> {
    let mut pretty = PrettyConfig::default();
    pretty.new_line = "\n".into();
    Ok(ron::ser::to_string_pretty(value, pretty)?)
}

pub fn from_ron_str<T: DeserializeOwned>(s: &str) -> Result<T, IoError> {
    Ok(ron::from_str(s)?)
}

pub fn write_ron<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> Result<(), IoError> {
    fs::write(path, to_ron_string(value)?)?;
    Ok(())
}

pub fn read_ron<P: AsRef<Path>, T: DeserializeOwned>(path: P) -> Result<T, IoError> {
    from_ron_str(&fs::read_to_string(path)?)
}

/// Reads a net description, as RON when the file ends in `.ron` and as JSON otherwise.
pub fn read_description<P: AsRef<Path>>(path: P) -> Result<NetDescription, IoError> {
    let path = path.as_ref();
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("ron") => read_ron(path),
        _ => read_json(path),
    }
}
