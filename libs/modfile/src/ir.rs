//! Canonical module representation produced by compilation.
//!
//! Everything here is plain data: maps and sets are ordered so that two
//! compilations of the same document compare and serialize identically.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub license: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub author: String,
    pub version: String,
    #[serde(rename = "type")]
    pub module_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub deployment_type: String,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub architectures: BTreeSet<String>,
    pub services: BTreeMap<String, Service>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub aux_services: BTreeMap<String, AuxService>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub aux_img_src: BTreeSet<String>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub volumes: BTreeSet<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub host_resources: BTreeMap<String, HostResource>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub secrets: BTreeMap<String, Secret>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub configs: BTreeMap<String, ConfigEntry>,
    #[serde(skip_serializing_if = "Inputs::is_empty")]
    pub inputs: Inputs,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub name: String,
    pub image: String,
    pub run_config: RunConfig,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub bind_mounts: BTreeMap<String, BindMount>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub tmpfs: BTreeMap<String, TmpfsMount>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub http_endpoints: BTreeMap<String, HttpEndpoint>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<Port>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub required_srv: BTreeSet<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub srv_references: BTreeMap<String, SrvRefTarget>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub volumes: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub ext_dependencies: BTreeMap<String, ExtDependencyTarget>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub host_resources: BTreeMap<String, HostResTarget>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub secret_mounts: BTreeMap<String, SecretTarget>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub secret_vars: BTreeMap<String, SecretTarget>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub configs: BTreeMap<String, String>,
}

/// A helper service: no endpoints, ports, host resources or secrets.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuxService {
    pub name: String,
    pub run_config: RunConfig,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub bind_mounts: BTreeMap<String, BindMount>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub tmpfs: BTreeMap<String, TmpfsMount>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub srv_references: BTreeMap<String, SrvRefTarget>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub volumes: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub ext_dependencies: BTreeMap<String, ExtDependencyTarget>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub configs: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunConfig {
    pub max_retries: u32,
    pub run_once: bool,
    #[serde(with = "humantime_serde")]
    pub stop_timeout: Duration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_signal: Option<String>,
    #[serde(rename = "pseudoTTY")]
    pub pseudo_tty: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BindMount {
    pub source: String,
    pub read_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TmpfsMount {
    pub size: u64,
    pub mode: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpEndpoint {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_conf: Option<ProxyConf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub string_sub: Option<StringSub>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyConf {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    pub websocket: bool,
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub read_timeout: Option<Duration>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StringSub {
    pub replace_once: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mime_types: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub filters: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Port {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub number: u16,
    pub protocol: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub bindings: Vec<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SrvRefTarget {
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtDependencyTarget {
    pub module_id: String,
    pub service: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostResTarget {
    #[serde(rename = "ref")]
    pub reference: String,
    pub read_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecretTarget {
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HostResource {
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
    pub required: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Secret {
    #[serde(rename = "type")]
    pub secret_type: String,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
    pub required: bool,
}

/// Primitive kind of a config entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    #[default]
    String,
    Bool,
    #[serde(rename = "int")]
    Int64,
    #[serde(rename = "float")]
    Float64,
}

impl FromStr for DataType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(DataType::String),
            "bool" => Ok(DataType::Bool),
            "int" | "int64" => Ok(DataType::Int64),
            "float" | "float64" => Ok(DataType::Float64),
            other => Err(ConfigError::InvalidDataType(other.to_owned())),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DataType::String => "string",
            DataType::Bool => "bool",
            DataType::Int64 => "int",
            DataType::Float64 => "float",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ConfigScalar {
    String(String),
    Bool(bool),
    Int64(i64),
    Float64(f64),
}

impl From<String> for ConfigScalar {
    fn from(v: String) -> Self {
        ConfigScalar::String(v)
    }
}

impl From<bool> for ConfigScalar {
    fn from(v: bool) -> Self {
        ConfigScalar::Bool(v)
    }
}

impl From<i64> for ConfigScalar {
    fn from(v: i64) -> Self {
        ConfigScalar::Int64(v)
    }
}

impl From<f64> for ConfigScalar {
    fn from(v: f64) -> Self {
        ConfigScalar::Float64(v)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Scalar(ConfigScalar),
    List(Vec<ConfigScalar>),
}

/// A compiled config entry with typed default and options.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigEntry {
    pub data_type: DataType,
    pub is_slice: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<ConfigValue>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<ConfigScalar>,
    pub opt_ext: bool,
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub ui_type: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub type_opt: BTreeMap<String, ConfigScalar>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,
    pub required: bool,
}

/// Entities that ask the operator for a value at deployment time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Inputs {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub resources: BTreeMap<String, Input>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub secrets: BTreeMap<String, Input>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub configs: BTreeMap<String, Input>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub groups: BTreeMap<String, InputGroup>,
}

impl Inputs {
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
            && self.secrets.is_empty()
            && self.configs.is_empty()
            && self.groups.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Input {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

pub type InputGroup = Input;
