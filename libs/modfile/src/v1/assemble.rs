use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, instrument};

use super::configs::gen_configs;
use super::resolver::Resolver;
use super::schema::{self, ModFile};
use super::services::{gen_aux_services, gen_services};
use crate::error::GenerateError;
use crate::ir::{HostResource, Input, InputGroup, Inputs, Module, Secret};

impl From<&schema::UserInput> for Input {
    fn from(ui: &schema::UserInput) -> Self {
        Input {
            name: ui.name.clone(),
            description: ui.description.clone(),
            group: ui.group.clone(),
        }
    }
}

impl From<&schema::ConfigUserInput> for Input {
    fn from(ui: &schema::ConfigUserInput) -> Self {
        Input {
            name: ui.name.clone(),
            description: ui.description.clone(),
            group: ui.group.clone(),
        }
    }
}

/// Descriptor entries that may ask the operator for a value.
trait UserInputSource {
    fn input(&self) -> Option<Input>;
}

impl UserInputSource for schema::HostResource {
    fn input(&self) -> Option<Input> {
        self.user_input.as_ref().map(Input::from)
    }
}

impl UserInputSource for schema::Secret {
    fn input(&self) -> Option<Input> {
        self.user_input.as_ref().map(Input::from)
    }
}

impl UserInputSource for schema::ConfigValue {
    fn input(&self) -> Option<Input> {
        self.user_input.as_ref().map(Input::from)
    }
}

fn gen_inputs<T: UserInputSource>(entries: &BTreeMap<String, T>) -> BTreeMap<String, Input> {
    entries
        .iter()
        .filter_map(|(id, entry)| entry.input().map(|input| (id.clone(), input)))
        .collect()
}

fn gen_input_groups(groups: &BTreeMap<String, schema::InputGroup>) -> BTreeMap<String, InputGroup> {
    groups
        .iter()
        .map(|(id, g)| {
            let group = InputGroup {
                name: g.name.clone(),
                description: g.description.clone(),
                group: g.group.clone(),
            };
            (id.clone(), group)
        })
        .collect()
}

fn gen_host_resources(
    resources: &BTreeMap<String, schema::HostResource>,
) -> BTreeMap<String, HostResource> {
    resources
        .iter()
        .map(|(id, r)| {
            let res = HostResource {
                tags: r.tags.iter().cloned().collect(),
                required: !r.optional,
            };
            (id.clone(), res)
        })
        .collect()
}

fn gen_secrets(secrets: &BTreeMap<String, schema::Secret>) -> BTreeMap<String, Secret> {
    secrets
        .iter()
        .map(|(id, s)| {
            let secret = Secret {
                secret_type: s.secret_type.clone(),
                tags: s.tags.iter().cloned().collect(),
                required: !s.optional,
            };
            (id.clone(), secret)
        })
        .collect()
}

fn gen_dependencies(deps: &BTreeMap<String, schema::ModuleDependency>) -> BTreeMap<String, String> {
    deps.iter()
        .map(|(id, dep)| (id.clone(), dep.version.clone()))
        .collect()
}

fn to_set(items: &[String]) -> BTreeSet<String> {
    items.iter().cloned().collect()
}

/// Builds the module: configs first, then services, then reference passes.
#[instrument(name = "modfile.v1.generate", skip_all, fields(module = %mf.id))]
pub(crate) fn generate(mf: ModFile) -> Result<Module, GenerateError> {
    let configs = gen_configs(&mf.configs)?;
    debug!(configs = configs.len(), "configs compiled");

    let services = gen_services(&mf.services)?;
    let aux_services = gen_aux_services(&mf.aux_services)?;
    debug!(
        services = services.len(),
        aux_services = aux_services.len(),
        "services generated"
    );

    let mut resolver = Resolver::new(services, aux_services);
    resolver.resolve(&mf)?;
    let (services, aux_services) = resolver.finish();

    let inputs = Inputs {
        resources: gen_inputs(&mf.host_resources),
        secrets: gen_inputs(&mf.secrets),
        configs: gen_inputs(&mf.configs),
        groups: gen_input_groups(&mf.input_groups),
    };

    Ok(Module {
        id: mf.id,
        name: mf.name,
        description: mf.description,
        tags: to_set(&mf.tags),
        license: mf.license,
        author: mf.author,
        version: mf.version,
        module_type: mf.module_type,
        deployment_type: mf.deployment_type,
        architectures: to_set(&mf.architectures),
        services,
        aux_services,
        aux_img_src: to_set(&mf.aux_image_sources),
        volumes: mf.volumes.keys().cloned().collect(),
        dependencies: gen_dependencies(&mf.dependencies),
        host_resources: gen_host_resources(&mf.host_resources),
        secrets: gen_secrets(&mf.secrets),
        configs,
        inputs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inputs_only_for_entries_with_user_input() {
        let mf: ModFile = serde_yaml::from_str(
            r#"
hostResources:
  dev:
    userInput: {name: Device, group: hw}
  auto:
    tags: [x]
secrets:
  key:
    type: api-key
    optional: true
    userInput: {name: Key, description: API key}
inputGroups:
  hw: {name: Hardware}
"#,
        )
        .unwrap();
        let module = generate(mf).unwrap();

        assert_eq!(module.inputs.resources.keys().collect::<Vec<_>>(), vec!["dev"]);
        assert_eq!(module.inputs.resources["dev"].group.as_deref(), Some("hw"));
        assert_eq!(module.inputs.secrets["key"].description.as_deref(), Some("API key"));
        assert_eq!(module.inputs.groups["hw"].name, "Hardware");
        assert!(module.inputs.configs.is_empty());

        assert!(module.host_resources["auto"].required);
        assert!(!module.secrets["key"].required);
        assert_eq!(module.secrets["key"].secret_type, "api-key");
    }

    #[test]
    fn top_level_fields_become_sets() {
        let mf: ModFile = serde_yaml::from_str(
            "id: m\ntags: [b, a, b]\narchitectures: [arm64v8]\nauxImageSources: [ghcr.io/org/*]\nvolumes:\n  data: []\n  cache: []\n",
        )
        .unwrap();
        let module = generate(mf).unwrap();
        assert_eq!(module.tags.iter().collect::<Vec<_>>(), vec!["a", "b"]);
        assert!(module.aux_img_src.contains("ghcr.io/org/*"));
        assert_eq!(module.volumes.iter().collect::<Vec<_>>(), vec!["cache", "data"]);
    }

    #[test]
    fn config_errors_come_before_service_errors() {
        let mf: ModFile = serde_yaml::from_str(
            "services:\n  a:\n    ports:\n      - port: 9-3\nconfigs:\n  c:\n    value: x\n    dataType: bool\n",
        )
        .unwrap();
        let err = generate(mf).unwrap_err();
        assert!(matches!(err, GenerateError::Config { .. }), "got {err:?}");
    }
}
