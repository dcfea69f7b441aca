//! Wires module-level references onto the services they target.
//!
//! Services live in an arena and are addressed by handle, so each pass can
//! update a service in place while validating targets against the set of
//! declared ids.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use super::schema::{self, Targets};
use crate::error::{GenerateError, RefFamily, ServiceKind};
use crate::ir::{AuxService, ExtDependencyTarget, HostResTarget, SecretTarget, Service, SrvRefTarget};

type Handle = usize;

pub(crate) struct Arena<S> {
    kind: ServiceKind,
    ids: Vec<String>,
    slots: Vec<S>,
    index: HashMap<String, Handle>,
}

impl<S> Arena<S> {
    pub(crate) fn new(kind: ServiceKind, services: BTreeMap<String, S>) -> Self {
        let mut arena = Self {
            kind,
            ids: Vec::with_capacity(services.len()),
            slots: Vec::with_capacity(services.len()),
            index: HashMap::with_capacity(services.len()),
        };
        for (id, srv) in services {
            arena.index.insert(id.clone(), arena.slots.len());
            arena.ids.push(id);
            arena.slots.push(srv);
        }
        arena
    }

    fn handle(&self, family: RefFamily, id: &str) -> Result<Handle, GenerateError> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| GenerateError::UndefinedTarget {
                family,
                kind: self.kind,
                target: id.to_owned(),
            })
    }

    pub(crate) fn into_map(self) -> BTreeMap<String, S> {
        self.ids.into_iter().zip(self.slots).collect()
    }
}

/// A value bound under a key on a service.
trait Binding: PartialEq {
    /// Name of the module-level entry the binding came from.
    fn origin(&self) -> Cow<'_, str>;
}

impl Binding for String {
    fn origin(&self) -> Cow<'_, str> {
        Cow::Borrowed(self)
    }
}

impl Binding for SrvRefTarget {
    fn origin(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.reference)
    }
}

impl Binding for HostResTarget {
    fn origin(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.reference)
    }
}

impl Binding for SecretTarget {
    fn origin(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.reference)
    }
}

impl Binding for ExtDependencyTarget {
    fn origin(&self) -> Cow<'_, str> {
        Cow::Owned(format!("{}:{}", self.module_id, self.service))
    }
}

/// Inserts `value` under `key`; an equal value already present is a no-op.
fn bind<V: Binding>(
    slot: &mut BTreeMap<String, V>,
    family: RefFamily,
    service: &str,
    key: &str,
    value: V,
) -> Result<(), GenerateError> {
    match slot.get(key) {
        Some(existing) if *existing == value => Ok(()),
        Some(existing) => Err(GenerateError::Conflict {
            family,
            target: service.to_owned(),
            key: key.to_owned(),
            existing: existing.origin().into_owned(),
            incoming: value.origin().into_owned(),
        }),
        None => {
            slot.insert(key.to_owned(), value);
            Ok(())
        }
    }
}

/// Reference slots shared by services and aux services.
pub(crate) trait RefSlots {
    fn srv_references(&mut self) -> &mut BTreeMap<String, SrvRefTarget>;
    fn volumes(&mut self) -> &mut BTreeMap<String, String>;
    fn ext_dependencies(&mut self) -> &mut BTreeMap<String, ExtDependencyTarget>;
    fn configs(&mut self) -> &mut BTreeMap<String, String>;
}

macro_rules! impl_ref_slots {
    ($($t:ty),*) => {
        $(impl RefSlots for $t {
            fn srv_references(&mut self) -> &mut BTreeMap<String, SrvRefTarget> {
                &mut self.srv_references
            }

            fn volumes(&mut self) -> &mut BTreeMap<String, String> {
                &mut self.volumes
            }

            fn ext_dependencies(&mut self) -> &mut BTreeMap<String, ExtDependencyTarget> {
                &mut self.ext_dependencies
            }

            fn configs(&mut self) -> &mut BTreeMap<String, String> {
                &mut self.configs
            }
        })*
    };
}

impl_ref_slots!(Service, AuxService);

/// Runs one reference pass for every target id of the arena's kind.
fn for_each_target<'a, S, T: Targets + 'a>(
    arena: &mut Arena<S>,
    family: RefFamily,
    targets: impl IntoIterator<Item = &'a T>,
    mut apply: impl FnMut(&mut S, &str, &T) -> Result<(), GenerateError>,
) -> Result<(), GenerateError> {
    for target in targets {
        for id in target.ids(arena.kind) {
            let h = arena.handle(family, id)?;
            apply(&mut arena.slots[h], id, target)?;
        }
    }
    Ok(())
}

fn set_srv_references<S: RefSlots>(
    arena: &mut Arena<S>,
    refs: &BTreeMap<String, Vec<schema::DependencyTarget>>,
) -> Result<(), GenerateError> {
    let family = RefFamily::ServiceReference;
    for (reference, targets) in refs {
        for_each_target(arena, family, targets, |srv, id, t| {
            let value = SrvRefTarget {
                reference: reference.clone(),
                template: t.template.clone(),
            };
            bind(srv.srv_references(), family, id, &t.ref_var, value)
        })?;
    }
    Ok(())
}

fn set_volumes<S: RefSlots>(
    arena: &mut Arena<S>,
    volumes: &BTreeMap<String, Vec<schema::VolumeTarget>>,
) -> Result<(), GenerateError> {
    let family = RefFamily::Volume;
    for (name, targets) in volumes {
        for_each_target(arena, family, targets, |srv, id, t| {
            bind(srv.volumes(), family, id, &t.mount_point, name.clone())
        })?;
    }
    Ok(())
}

fn set_ext_dependencies<S: RefSlots>(
    arena: &mut Arena<S>,
    deps: &BTreeMap<String, schema::ModuleDependency>,
) -> Result<(), GenerateError> {
    let family = RefFamily::ExtDependency;
    for (module_id, dep) in deps {
        for (service, targets) in &dep.required_services {
            for_each_target(arena, family, targets, |srv, id, t| {
                let value = ExtDependencyTarget {
                    module_id: module_id.clone(),
                    service: service.clone(),
                    template: t.template.clone(),
                };
                bind(srv.ext_dependencies(), family, id, &t.ref_var, value)
            })?;
        }
    }
    Ok(())
}

fn set_configs<S: RefSlots>(
    arena: &mut Arena<S>,
    configs: &BTreeMap<String, schema::ConfigValue>,
) -> Result<(), GenerateError> {
    let family = RefFamily::Config;
    for (name, cfg) in configs {
        for_each_target(arena, family, &cfg.targets, |srv, id, t| {
            bind(srv.configs(), family, id, &t.ref_var, name.clone())
        })?;
    }
    Ok(())
}

fn set_host_resources(
    arena: &mut Arena<Service>,
    resources: &BTreeMap<String, schema::HostResource>,
) -> Result<(), GenerateError> {
    let family = RefFamily::HostResource;
    for (name, res) in resources {
        for_each_target(arena, family, &res.targets, |srv, id, t| {
            let value = HostResTarget {
                reference: name.clone(),
                read_only: t.read_only,
            };
            bind(&mut srv.host_resources, family, id, &t.mount_point, value)
        })?;
    }
    Ok(())
}

/// Secrets bind twice: once by mount point, once by variable. A target may
/// carry either, both or neither.
fn set_secrets(
    arena: &mut Arena<Service>,
    secrets: &BTreeMap<String, schema::Secret>,
) -> Result<(), GenerateError> {
    for (name, secret) in secrets {
        let mounts = secret.targets.iter().filter(|t| t.mount_point.is_some());
        for_each_target(arena, RefFamily::SecretMount, mounts, |srv, id, t| {
            let Some(mount_point) = &t.mount_point else {
                return Ok(());
            };
            let value = SecretTarget {
                reference: name.clone(),
                item: t.item.clone(),
            };
            bind(&mut srv.secret_mounts, RefFamily::SecretMount, id, mount_point, value)
        })?;

        let vars = secret.targets.iter().filter(|t| t.ref_var.is_some());
        for_each_target(arena, RefFamily::SecretVariable, vars, |srv, id, t| {
            let Some(ref_var) = &t.ref_var else {
                return Ok(());
            };
            let value = SecretTarget {
                reference: name.clone(),
                item: t.item.clone(),
            };
            bind(&mut srv.secret_vars, RefFamily::SecretVariable, id, ref_var, value)
        })?;
    }
    Ok(())
}

/// Owns the service tables while reference passes run.
pub(crate) struct Resolver {
    services: Arena<Service>,
    aux_services: Arena<AuxService>,
}

impl Resolver {
    pub(crate) fn new(
        services: BTreeMap<String, Service>,
        aux_services: BTreeMap<String, AuxService>,
    ) -> Self {
        Self {
            services: Arena::new(ServiceKind::Service, services),
            aux_services: Arena::new(ServiceKind::AuxService, aux_services),
        }
    }

    /// Runs every pass in a fixed order; each aux-service pass directly
    /// follows its service pass. Stops at the first error.
    pub(crate) fn resolve(&mut self, mf: &schema::ModFile) -> Result<(), GenerateError> {
        set_srv_references(&mut self.services, &mf.service_references)?;
        set_srv_references(&mut self.aux_services, &mf.service_references)?;
        set_volumes(&mut self.services, &mf.volumes)?;
        set_volumes(&mut self.aux_services, &mf.volumes)?;
        set_ext_dependencies(&mut self.services, &mf.dependencies)?;
        set_ext_dependencies(&mut self.aux_services, &mf.dependencies)?;
        set_host_resources(&mut self.services, &mf.host_resources)?;
        set_secrets(&mut self.services, &mf.secrets)?;
        set_configs(&mut self.services, &mf.configs)?;
        set_configs(&mut self.aux_services, &mf.configs)?;
        debug!(
            services = self.services.slots.len(),
            aux_services = self.aux_services.slots.len(),
            "references resolved"
        );
        Ok(())
    }

    pub(crate) fn finish(self) -> (BTreeMap<String, Service>, BTreeMap<String, AuxService>) {
        (self.services.into_map(), self.aux_services.into_map())
    }
}
