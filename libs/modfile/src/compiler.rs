use std::sync::OnceLock;

use serde::Deserialize;
use tracing::{debug, field, instrument, Span};

use crate::error::CompileError;
use crate::ir::Module;
use crate::registry::{RegistryError, VersionRegistry};

/// Only the version marker; the rest of the document is decoded by the
/// selected schema version.
#[derive(Debug, Default, Deserialize)]
struct VersionProbe {
    #[serde(rename = "modfileVersion", default)]
    version: Option<String>,
}

/// Compiles raw descriptors against a fixed set of schema versions.
#[derive(Debug)]
pub struct Compiler {
    registry: VersionRegistry,
}

impl Compiler {
    pub fn new(registry: VersionRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &VersionRegistry {
        &self.registry
    }

    /// Reads `modfileVersion`, then decodes and generates with that version.
    #[instrument(name = "modfile.compile", skip_all, fields(version = field::Empty, bytes = raw.len()))]
    pub fn compile(&self, raw: &[u8]) -> Result<Module, CompileError> {
        if self.registry.is_empty() {
            return Err(CompileError::NoDecoders);
        }

        let probe: Option<VersionProbe> =
            serde_yaml::from_slice(raw).map_err(CompileError::Decode)?;
        let version = probe
            .and_then(|p| p.version)
            .filter(|v| !v.is_empty())
            .ok_or(CompileError::NoVersion)?;
        Span::current().record("version", version.as_str());

        let entry = self
            .registry
            .get(&version)
            .ok_or_else(|| CompileError::UnknownVersion(version.clone()))?;

        let module = (entry.compile)(raw)?;
        debug!(
            module = %module.id,
            services = module.services.len(),
            aux_services = module.aux_services.len(),
            configs = module.configs.len(),
            "module compiled"
        );
        Ok(module)
    }
}

static DEFAULT_COMPILER: OnceLock<Result<Compiler, RegistryError>> = OnceLock::new();

/// Compiler over every schema version linked into the binary.
pub fn default_compiler() -> Result<&'static Compiler, CompileError> {
    DEFAULT_COMPILER
        .get_or_init(|| VersionRegistry::discover_and_build().map(Compiler::new))
        .as_ref()
        .map_err(|e| CompileError::Registry(e.clone()))
}

/// Compiles a descriptor with the default compiler.
pub fn compile(raw: &[u8]) -> Result<Module, CompileError> {
    default_compiler()?.compile(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_registry_has_no_decoders() {
        let compiler = Compiler::new(VersionRegistry::default());
        let err = compiler.compile(b"modfileVersion: v1\n").unwrap_err();
        assert!(matches!(err, CompileError::NoDecoders), "got {err:?}");
    }

    #[test]
    fn missing_version() {
        let err = compile(b"id: test\nname: Test\n").unwrap_err();
        assert!(matches!(err, CompileError::NoVersion), "got {err:?}");
        assert_eq!(err.to_string(), "no version");

        let err = compile(b"modfileVersion: ''\n").unwrap_err();
        assert!(matches!(err, CompileError::NoVersion), "got {err:?}");
    }

    #[test]
    fn unknown_version() {
        let err = compile(b"modfileVersion: v9\n").unwrap_err();
        match err {
            CompileError::UnknownVersion(v) => assert_eq!(v, "v9"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn malformed_yaml_is_a_decode_error() {
        let err = compile(b"modfileVersion: [v1\n").unwrap_err();
        assert!(matches!(err, CompileError::Decode(_)), "got {err:?}");
        assert_eq!(err.category(), crate::ErrorCategory::Schema);
    }
}
