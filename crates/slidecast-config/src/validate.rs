//! Parsing helpers for raw configuration values.
//!
//! Every helper receives the variable name so failures can report it.

use std::net::IpAddr;
use std::path::PathBuf;

use crate::error::{ConfigError, ConfigResult};

/// Parse a TCP port in `1..=65535`.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when the value is not an integer or is zero.
pub fn parse_port(field: &'static str, raw: &str) -> ConfigResult<u16> {
    let port: u16 = raw
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(field, "not_a_port", raw))?;
    if port == 0 {
        return Err(ConfigError::invalid(field, "zero", raw));
    }
    Ok(port)
}

/// Parse an IP address for the listener.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when the value is not an IP address.
pub fn parse_ip(field: &'static str, raw: &str) -> ConfigResult<IpAddr> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::invalid(field, "not_an_ip_address", raw))
}

/// Parse a strictly positive integer.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for non-integers and zero.
pub fn parse_positive_u32(field: &'static str, raw: &str) -> ConfigResult<u32> {
    let value = parse_u32(field, raw)?;
    if value == 0 {
        return Err(ConfigError::invalid(field, "zero", raw));
    }
    Ok(value)
}

/// Parse a non-negative integer.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for anything that is not a `u32`.
pub fn parse_u32(field: &'static str, raw: &str) -> ConfigResult<u32> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::invalid(field, "not_an_integer", raw))
}

/// Parse a strictly positive number of seconds.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for non-numbers, non-finite values and values `<= 0`.
pub fn parse_positive_seconds(field: &'static str, raw: &str) -> ConfigResult<f64> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(field, "not_a_number", raw))?;
    if !value.is_finite() || value <= 0.0 {
        return Err(ConfigError::invalid(field, "not_positive", raw));
    }
    Ok(value)
}

/// Parse a strictly positive whole number of seconds.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for non-integers and zero.
pub fn parse_timeout_secs(field: &'static str, raw: &str) -> ConfigResult<u64> {
    let secs: u64 = raw
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(field, "not_an_integer", raw))?;
    if secs == 0 {
        return Err(ConfigError::invalid(field, "zero", raw));
    }
    Ok(secs)
}

/// Require a non-blank string.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when the value is empty after trimming.
pub fn non_empty(field: &'static str, raw: &str) -> ConfigResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::InvalidField {
            field,
            reason: "empty",
            value: None,
        });
    }
    Ok(trimmed.to_string())
}

/// Require a non-blank filesystem path.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when the value is empty after trimming.
pub fn non_empty_path(field: &'static str, raw: &str) -> ConfigResult<PathBuf> {
    non_empty(field, raw).map(PathBuf::from)
}
