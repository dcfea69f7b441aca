//! Typed shape of a `v1` modfile document.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use super::fields::{ByteSize, Command, FileMode};
use crate::error::ServiceKind;
use crate::port::PortSpec;
use crate::value::RawValue;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModFile {
    pub modfile_version: String,
    pub id: String,
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub license: String,
    pub author: String,
    pub version: String,
    #[serde(rename = "type")]
    pub module_type: String,
    pub deployment_type: String,
    pub architectures: Vec<String>,
    pub services: BTreeMap<String, Service>,
    pub aux_services: BTreeMap<String, AuxService>,
    pub aux_image_sources: Vec<String>,
    pub service_references: BTreeMap<String, Vec<DependencyTarget>>,
    pub volumes: BTreeMap<String, Vec<VolumeTarget>>,
    pub dependencies: BTreeMap<String, ModuleDependency>,
    #[serde(alias = "resources")]
    pub host_resources: BTreeMap<String, HostResource>,
    pub secrets: BTreeMap<String, Secret>,
    pub configs: BTreeMap<String, ConfigValue>,
    pub input_groups: BTreeMap<String, InputGroup>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Service {
    pub name: String,
    pub image: String,
    pub run_config: RunConfig,
    pub include: Vec<BindMount>,
    pub tmpfs: Vec<TmpfsMount>,
    pub http_endpoints: Vec<HttpEndpoint>,
    pub ports: Vec<SrvPort>,
    pub required_services: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuxService {
    pub name: String,
    pub run_config: RunConfig,
    pub include: Vec<BindMount>,
    pub tmpfs: Vec<TmpfsMount>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RunConfig {
    pub max_retries: Option<u32>,
    pub run_once: bool,
    #[serde(with = "humantime_serde")]
    pub stop_timeout: Option<Duration>,
    pub stop_signal: Option<String>,
    #[serde(rename = "pseudoTTY")]
    pub pseudo_tty: bool,
    pub command: Command,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BindMount {
    pub mount_point: String,
    pub source: String,
    pub read_only: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TmpfsMount {
    pub mount_point: String,
    pub size: ByteSize,
    pub mode: Option<FileMode>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HttpEndpoint {
    pub name: String,
    pub path: String,
    pub port: Option<u16>,
    pub ext_path: Option<String>,
    pub proxy_conf: Option<ProxyConf>,
    pub string_sub: Option<StringSub>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProxyConf {
    pub headers: BTreeMap<String, String>,
    pub websocket: bool,
    #[serde(with = "humantime_serde")]
    pub read_timeout: Option<Duration>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StringSub {
    pub replace_once: bool,
    pub mime_types: Vec<String>,
    pub filters: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SrvPort {
    pub name: Option<String>,
    pub port: PortSpec,
    pub host_port: Option<PortSpec>,
    pub protocol: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DependencyTarget {
    pub ref_var: String,
    pub template: Option<String>,
    pub services: Vec<String>,
    pub aux_services: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VolumeTarget {
    pub mount_point: String,
    pub services: Vec<String>,
    pub aux_services: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModuleDependency {
    pub version: String,
    pub required_services: BTreeMap<String, Vec<DependencyTarget>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserInput {
    pub name: String,
    pub description: Option<String>,
    pub group: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HostResource {
    pub tags: Vec<String>,
    pub user_input: Option<UserInput>,
    pub optional: bool,
    pub targets: Vec<HostResourceTarget>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HostResourceTarget {
    pub mount_point: String,
    pub services: Vec<String>,
    pub read_only: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Secret {
    #[serde(rename = "type")]
    pub secret_type: String,
    pub tags: Vec<String>,
    pub user_input: Option<UserInput>,
    pub optional: bool,
    pub targets: Vec<SecretTarget>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SecretTarget {
    pub mount_point: Option<String>,
    pub ref_var: Option<String>,
    pub item: Option<String>,
    pub services: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigValue {
    pub value: RawValue,
    pub options: Vec<RawValue>,
    pub options_ext: bool,
    pub data_type: Option<String>,
    pub is_list: bool,
    pub delimiter: Option<String>,
    pub user_input: Option<ConfigUserInput>,
    pub targets: Vec<ConfigTarget>,
    pub optional: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigUserInput {
    pub name: String,
    pub description: Option<String>,
    pub group: Option<String>,
    #[serde(rename = "type")]
    pub input_type: String,
    pub type_options: BTreeMap<String, RawValue>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigTarget {
    pub ref_var: String,
    pub services: Vec<String>,
    pub aux_services: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InputGroup {
    pub name: String,
    pub description: Option<String>,
    pub group: Option<String>,
}

/// Target entries listing the services (and aux services) they apply to.
pub trait Targets {
    fn services(&self) -> &[String];

    fn aux_services(&self) -> &[String] {
        &[]
    }

    fn ids(&self, kind: ServiceKind) -> &[String] {
        match kind {
            ServiceKind::Service => self.services(),
            ServiceKind::AuxService => self.aux_services(),
        }
    }
}

impl Targets for DependencyTarget {
    fn services(&self) -> &[String] {
        &self.services
    }

    fn aux_services(&self) -> &[String] {
        &self.aux_services
    }
}

impl Targets for VolumeTarget {
    fn services(&self) -> &[String] {
        &self.services
    }

    fn aux_services(&self) -> &[String] {
        &self.aux_services
    }
}

impl Targets for ConfigTarget {
    fn services(&self) -> &[String] {
        &self.services
    }

    fn aux_services(&self) -> &[String] {
        &self.aux_services
    }
}

impl Targets for HostResourceTarget {
    fn services(&self) -> &[String] {
        &self.services
    }
}

impl Targets for SecretTarget {
    fn services(&self) -> &[String] {
        &self.services
    }
}
