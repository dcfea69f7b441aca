use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::time::Duration;

use super::schema;
use crate::error::{GenerateError, MountError, PortError, ServiceError, ServiceKind, ServiceSection};
use crate::ir::{
    AuxService, BindMount, HttpEndpoint, Port, ProxyConf, RunConfig, Service, StringSub,
    TmpfsMount,
};

pub(crate) const DEFAULT_MAX_RETRIES: u32 = 5;
pub(crate) const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(5);
pub(crate) const DEFAULT_TMPFS_MODE: u32 = 0o770;
pub(crate) const DEFAULT_PROTOCOL: &str = "tcp";

pub(crate) fn gen_run_config(rc: &schema::RunConfig) -> RunConfig {
    RunConfig {
        max_retries: rc.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
        run_once: rc.run_once,
        stop_timeout: rc.stop_timeout.unwrap_or(DEFAULT_STOP_TIMEOUT),
        stop_signal: rc.stop_signal.clone(),
        pseudo_tty: rc.pseudo_tty,
        command: rc.command.0.clone(),
    }
}

/// Keyed by mount point. Repeats merge only when source and access mode match.
pub(crate) fn gen_bind_mounts(
    mounts: &[schema::BindMount],
) -> Result<BTreeMap<String, BindMount>, MountError> {
    let mut out = BTreeMap::new();
    for m in mounts {
        let mount = BindMount {
            source: m.source.clone(),
            read_only: m.read_only,
        };
        match out.entry(m.mount_point.clone()) {
            Entry::Occupied(e) if *e.get() == mount => {}
            Entry::Occupied(_) => return Err(MountError::Duplicate(m.mount_point.clone())),
            Entry::Vacant(e) => {
                e.insert(mount);
            }
        }
    }
    Ok(out)
}

/// Keyed by mount point. A repeat with equal size and no mode merges even if
/// the first occurrence set a non-default mode.
pub(crate) fn gen_tmpfs_mounts(
    mounts: &[schema::TmpfsMount],
) -> Result<BTreeMap<String, TmpfsMount>, MountError> {
    let mut out: BTreeMap<String, TmpfsMount> = BTreeMap::new();
    for m in mounts {
        let mode = m.mode.map(|mode| mode.0);
        match out.entry(m.mount_point.clone()) {
            Entry::Occupied(e) => {
                let stored = e.get();
                if stored.size != m.size.0 || mode.is_some_and(|mode| mode != stored.mode) {
                    return Err(MountError::Duplicate(m.mount_point.clone()));
                }
            }
            Entry::Vacant(e) => {
                e.insert(TmpfsMount {
                    size: m.size.0,
                    mode: mode.unwrap_or(DEFAULT_TMPFS_MODE),
                });
            }
        }
    }
    Ok(out)
}

fn gen_proxy_conf(pc: &schema::ProxyConf) -> ProxyConf {
    ProxyConf {
        headers: pc.headers.clone(),
        websocket: pc.websocket,
        read_timeout: pc.read_timeout,
    }
}

fn gen_string_sub(ss: &schema::StringSub) -> StringSub {
    StringSub {
        replace_once: ss.replace_once,
        mime_types: ss.mime_types.clone(),
        filters: ss.filters.clone(),
    }
}

/// Keyed by external path, falling back to the internal path.
pub(crate) fn gen_http_endpoints(
    endpoints: &[schema::HttpEndpoint],
) -> Result<BTreeMap<String, HttpEndpoint>, MountError> {
    let mut out: BTreeMap<String, HttpEndpoint> = BTreeMap::new();
    for ep in endpoints {
        let key = ep.ext_path.clone().unwrap_or_else(|| ep.path.clone());
        match out.entry(key) {
            Entry::Occupied(e) => {
                let stored = e.get();
                if stored.name != ep.name || stored.port != ep.port || stored.path != ep.path {
                    let key = e.key().clone();
                    return Err(match ep.ext_path {
                        Some(_) => MountError::DuplicateEndpoint {
                            key,
                            existing: stored.path.clone(),
                            incoming: ep.path.clone(),
                        },
                        None => MountError::Duplicate(key),
                    });
                }
            }
            Entry::Vacant(e) => {
                e.insert(HttpEndpoint {
                    name: ep.name.clone(),
                    port: ep.port,
                    path: ep.path.clone(),
                    proxy_conf: ep.proxy_conf.as_ref().map(gen_proxy_conf),
                    string_sub: ep.string_sub.as_ref().map(gen_string_sub),
                });
            }
        }
    }
    Ok(out)
}

/// Expands port specs and pairs container ports with host ports.
///
/// Without host ports every container port is published unbound. A single
/// container port takes every host port; otherwise the counts must match
/// and ports pair up positionally.
pub(crate) fn gen_ports(ports: &[schema::SrvPort]) -> Result<Vec<Port>, PortError> {
    let mut out = Vec::new();
    for sp in ports {
        let numbers = sp.port.expand()?;
        let host_ports = match &sp.host_port {
            Some(hp) => hp.expand()?,
            None => Vec::new(),
        };
        let protocol = sp
            .protocol
            .clone()
            .unwrap_or_else(|| DEFAULT_PROTOCOL.to_string());
        let port = |number: u16, bindings: Vec<u16>| Port {
            name: sp.name.clone(),
            number,
            protocol: protocol.clone(),
            bindings,
        };

        if host_ports.is_empty() {
            out.extend(numbers.into_iter().map(|n| port(n, Vec::new())));
            continue;
        }
        if numbers.len() > host_ports.len() {
            return Err(PortError::MorePortsThanHostPorts {
                ports: numbers.len(),
                host_ports: host_ports.len(),
            });
        }
        if numbers.len() > 1 && numbers.len() < host_ports.len() {
            return Err(PortError::FewerPortsThanHostPorts {
                ports: numbers.len(),
                host_ports: host_ports.len(),
            });
        }
        if numbers.len() == 1 {
            out.push(port(numbers[0], host_ports));
        } else {
            out.extend(
                numbers
                    .into_iter()
                    .zip(host_ports)
                    .map(|(n, hp)| port(n, vec![hp])),
            );
        }
    }
    Ok(out)
}

fn service_err(
    kind: ServiceKind,
    service: &str,
    section: ServiceSection,
    source: impl Into<ServiceError>,
) -> GenerateError {
    GenerateError::Service {
        kind,
        service: service.to_owned(),
        section,
        source: source.into(),
    }
}

fn gen_service(id: &str, srv: &schema::Service) -> Result<Service, GenerateError> {
    let kind = ServiceKind::Service;
    Ok(Service {
        name: srv.name.clone(),
        image: srv.image.clone(),
        run_config: gen_run_config(&srv.run_config),
        bind_mounts: gen_bind_mounts(&srv.include)
            .map_err(|e| service_err(kind, id, ServiceSection::BindMounts, e))?,
        tmpfs: gen_tmpfs_mounts(&srv.tmpfs)
            .map_err(|e| service_err(kind, id, ServiceSection::TmpfsMounts, e))?,
        http_endpoints: gen_http_endpoints(&srv.http_endpoints)
            .map_err(|e| service_err(kind, id, ServiceSection::HttpEndpoints, e))?,
        ports: gen_ports(&srv.ports)
            .map_err(|e| service_err(kind, id, ServiceSection::Ports, e))?,
        required_srv: srv.required_services.iter().cloned().collect(),
        ..Default::default()
    })
}

fn gen_aux_service(id: &str, srv: &schema::AuxService) -> Result<AuxService, GenerateError> {
    let kind = ServiceKind::AuxService;
    Ok(AuxService {
        name: srv.name.clone(),
        run_config: gen_run_config(&srv.run_config),
        bind_mounts: gen_bind_mounts(&srv.include)
            .map_err(|e| service_err(kind, id, ServiceSection::BindMounts, e))?,
        tmpfs: gen_tmpfs_mounts(&srv.tmpfs)
            .map_err(|e| service_err(kind, id, ServiceSection::TmpfsMounts, e))?,
        ..Default::default()
    })
}

pub(crate) fn gen_services(
    services: &BTreeMap<String, schema::Service>,
) -> Result<BTreeMap<String, Service>, GenerateError> {
    services
        .iter()
        .map(|(id, srv)| Ok((id.clone(), gen_service(id, srv)?)))
        .collect()
}

pub(crate) fn gen_aux_services(
    services: &BTreeMap<String, schema::AuxService>,
) -> Result<BTreeMap<String, AuxService>, GenerateError> {
    services
        .iter()
        .map(|(id, srv)| Ok((id.clone(), gen_aux_service(id, srv)?)))
        .collect()
}
