use crate::address;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("could not open trace {path:?}")]
    OpenFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    #[serde(rename = "R", alias = "r")]
    Read,
    #[serde(rename = "W", alias = "w")]
    Write,
}

impl Op {
    #[inline]
    #[must_use]
    pub fn is_write(self) -> bool {
        self == Self::Write
    }
}

/// A single line-granular memory reference.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct Access {
    pub core: u32,
    pub op: Op,
    /// Line address, decimal or `0x` prefixed hex.
    #[serde(deserialize_with = "deserialize_address")]
    pub addr: address,
}

fn deserialize_address<'de, D>(deserializer: D) -> Result<address, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let raw = raw.trim();
    let parsed = match raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => raw.parse(),
    };
    parsed.map_err(|err| serde::de::Error::custom(format!("bad address {raw:?}: {err}")))
}

/// Reads a trace of `core,op,addr` records with a header row.
pub fn read<R>(reader: R) -> Result<Vec<Access>, Error>
where
    R: std::io::Read,
{
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(false)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(reader);
    let accesses = csv_reader
        .deserialize()
        .collect::<Result<Vec<Access>, csv::Error>>()?;
    Ok(accesses)
}

pub fn open(path: impl AsRef<Path>) -> Result<Vec<Access>, Error> {
    let path = path.as_ref();
    let file = std::fs::OpenOptions::new()
        .read(true)
        .open(path)
        .map_err(|source| Error::OpenFile {
            path: path.to_path_buf(),
            source,
        })?;
    read(std::io::BufReader::new(file))
}
