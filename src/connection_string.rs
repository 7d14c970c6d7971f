//! Connection strings: `<prefix>://<host>[:<port>][/<path>]` URIs
//! produced by discovery and consumed by `addDevice`/module creation.
//!
//! The grammar is small and fixed enough to hand-parse without pulling in
//! a regex dependency the rest of the crate has no other use for.

use crate::error::{invalid_parameter, DaqResult};

/// Whether a connection string's host segment is an IPv4/hostname form
/// or a bracket-wrapped IPv6 literal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostType {
    Ipv4,
    Ipv6,
}

/// A parsed connection string: `<prefix>://<host>[:<port>][/<path>]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionString {
    prefix: String,
    host_type: HostType,
    host: String,
    port: Option<u16>,
    path: String,
}

impl ConnectionString {
    /// Parses `value`. Fails with `InvalidParameter` if no `://`
    /// separator or no host is present.
    pub fn parse(value: &str) -> DaqResult<Self> {
        let (prefix, rest) = value
            .split_once("://")
            .ok_or_else(|| invalid_parameter(format!("connection string '{value}' has no scheme separator")))?;
        if prefix.is_empty() {
            return Err(invalid_parameter(format!("connection string '{value}' has an empty scheme")));
        }

        let (host_type, host, after_host) = if let Some(rest) = rest.strip_prefix('[') {
            let (host, after) = rest
                .split_once(']')
                .ok_or_else(|| invalid_parameter(format!("connection string '{value}' has an unterminated IPv6 host")))?;
            if host.is_empty() {
                return Err(invalid_parameter(format!("connection string '{value}' has an empty host")));
            }
            (HostType::Ipv6, host.to_string(), after)
        } else {
            let end = rest.find([':', '/']).unwrap_or(rest.len());
            let host = &rest[..end];
            if host.is_empty() {
                return Err(invalid_parameter(format!("connection string '{value}' has an empty host")));
            }
            (HostType::Ipv4, host.to_string(), &rest[end..])
        };

        let (port_str, path_str) = match after_host.strip_prefix(':') {
            Some(after_colon) => {
                let end = after_colon.find('/').unwrap_or(after_colon.len());
                (Some(&after_colon[..end]), &after_colon[end..])
            }
            None => (None, after_host),
        };

        let port = port_str
            .map(|s| {
                s.parse::<u16>()
                    .map_err(|_| invalid_parameter(format!("connection string '{value}' has an invalid port '{s}'")))
            })
            .transpose()?;

        let path = if path_str.is_empty() { "/".to_string() } else { path_str.to_string() };

        Ok(Self {
            prefix: prefix.to_string(),
            host_type,
            host,
            port,
            path,
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn host_type(&self) -> HostType {
        self.host_type
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// The explicit port, or `default_port` when the connection string
    /// omitted one.
    pub fn port_or(&self, default_port: u16) -> u16 {
        self.port.unwrap_or(default_port)
    }

    pub fn explicit_port(&self) -> Option<u16> {
        self.port
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}
