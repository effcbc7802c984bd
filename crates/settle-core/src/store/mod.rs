//! Key/value settings store collaborators.

mod json_file;
mod memory;

use crate::error::{Error, Result};

pub use json_file::JsonFileSettingsStore;
pub use memory::MemorySettingsStore;

/// Trait for settings storage operations.
///
/// Values are stored as strings; typed helpers parse on read and fall back
/// to the caller's default when the key is absent.
pub trait SettingsStore: Send + Sync {
    /// Read a raw value
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a raw value
    fn put(&self, key: &str, value: &str) -> Result<()>;

    fn get_bool(&self, key: &str, default: bool) -> Result<bool> {
        Ok(self.get(key)?.map_or(default, |value| parse_bool(&value)))
    }

    fn put_bool(&self, key: &str, value: bool) -> Result<()> {
        self.put(key, if value { "true" } else { "false" })
    }

    fn get_int(&self, key: &str, default: i64) -> Result<i64> {
        match self.get(key)? {
            Some(value) => value.trim().parse().map_err(|_| {
                Error::Storage(format!("value for '{key}' is not an integer: {value}"))
            }),
            None => Ok(default),
        }
    }

    fn put_int(&self, key: &str, value: i64) -> Result<()> {
        self.put(key, &value.to_string())
    }

    /// Read a float; unlike the other helpers, a missing key is an error so
    /// callers can distinguish "never written" from "written as default".
    fn get_float(&self, key: &str) -> Result<f32> {
        let value = self
            .get(key)?
            .ok_or_else(|| Error::Storage(format!("no value stored for '{key}'")))?;
        value
            .trim()
            .parse()
            .map_err(|_| Error::Storage(format!("value for '{key}' is not a number: {value}")))
    }

    fn put_float(&self, key: &str, value: f32) -> Result<()> {
        self.put(key, &value.to_string())
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
