//! Port specifications: a single port `N` or an inclusive range `A-B`.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserialize, Deserializer, Visitor};

use crate::error::PortError;

/// A port or port range as written in a descriptor.
///
/// The text is kept verbatim and only expanded on demand, so that
/// malformed ranges such as `9-3` surface while generating services.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortSpec(String);

impl PortSpec {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Expands into the ordered list of ports covered.
    pub fn expand(&self) -> Result<Vec<u16>, PortError> {
        parse_ports(&self.0)
    }
}

impl fmt::Display for PortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u16> for PortSpec {
    fn from(port: u16) -> Self {
        PortSpec(port.to_string())
    }
}

impl FromStr for PortSpec {
    type Err = PortError;

    /// Checks the shape (at most two numeric parts) without validating order.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        split_parts(s)?;
        Ok(PortSpec(s.to_owned()))
    }
}

fn split_parts(spec: &str) -> Result<Vec<u16>, PortError> {
    if spec.is_empty() {
        return Err(PortError::Empty);
    }
    let parts: Vec<&str> = spec.split('-').collect();
    if parts.len() > 2 {
        return Err(PortError::InvalidFormat(spec.to_owned()));
    }
    parts
        .into_iter()
        .map(|part| {
            part.parse::<u16>().map_err(|_| PortError::InvalidNumber {
                spec: spec.to_owned(),
                part: part.to_owned(),
            })
        })
        .collect()
}

/// Parses `N` or `A-B` into the inclusive list of ports.
///
/// A range requires `A < B`.
pub fn parse_ports(spec: &str) -> Result<Vec<u16>, PortError> {
    match split_parts(spec)?.as_slice() {
        [port] => Ok(vec![*port]),
        [start, end] if start < end => Ok((*start..=*end).collect()),
        [start, end] => Err(PortError::InvalidRange {
            spec: spec.to_owned(),
            start: *start,
            end: *end,
        }),
        _ => Err(PortError::InvalidFormat(spec.to_owned())),
    }
}

struct PortSpecVisitor;

impl Visitor<'_> for PortSpecVisitor {
    type Value = PortSpec;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a port number or a 'start-end' port range")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<PortSpec, E> {
        u16::try_from(v)
            .map(PortSpec::from)
            .map_err(|_| E::custom(format!("port {v} out of range")))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<PortSpec, E> {
        u16::try_from(v)
            .map(PortSpec::from)
            .map_err(|_| E::custom(format!("port {v} out of range")))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<PortSpec, E> {
        v.parse().map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for PortSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(PortSpecVisitor)
    }
}
