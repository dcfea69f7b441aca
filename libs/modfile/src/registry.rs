use std::collections::HashMap;

use thiserror::Error;

use crate::error::{CompileError, GenerateError};
use crate::ir::Module;

/// A schema version: how to decode its documents and how to turn them
/// into a [`Module`].
pub trait SchemaVersion {
    /// Value of `modfileVersion` handled by this implementation.
    const VERSION: &'static str;

    type Descriptor;

    fn decode(raw: &[u8]) -> Result<Self::Descriptor, serde_yaml::Error>;

    fn generate(descriptor: Self::Descriptor) -> Result<Module, GenerateError>;
}

pub type CompileFn = fn(&[u8]) -> Result<Module, CompileError>;

/// Registered decode/generate pipeline for one schema version.
#[derive(Clone, Copy)]
pub struct VersionEntry {
    pub version: &'static str,
    pub compile: CompileFn,
}

impl VersionEntry {
    pub fn of<V: SchemaVersion>() -> Self {
        Self {
            version: V::VERSION,
            compile: compile_with::<V>,
        }
    }
}

impl std::fmt::Debug for VersionEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionEntry")
            .field("version", &self.version)
            .finish()
    }
}

fn compile_with<V: SchemaVersion>(raw: &[u8]) -> Result<Module, CompileError> {
    let descriptor = V::decode(raw).map_err(CompileError::Decode)?;
    tracing::debug!(version = V::VERSION, "descriptor decoded");
    Ok(V::generate(descriptor)?)
}

/// Submitted by each schema version via `inventory::submit!`.
pub struct Registrator(pub fn(&mut RegistryBuilder));

inventory::collect!(Registrator);

/// Immutable table of supported schema versions.
#[derive(Default)]
pub struct VersionRegistry {
    entries: HashMap<&'static str, VersionEntry>,
}

impl std::fmt::Debug for VersionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionRegistry")
            .field("versions", &self.versions())
            .finish()
    }
}

impl VersionRegistry {
    /// Discover via inventory, have registrators fill the builder, then build.
    pub fn discover_and_build() -> Result<Self, RegistryError> {
        let mut b = RegistryBuilder::default();
        for r in ::inventory::iter::<Registrator> {
            r.0(&mut b);
        }
        b.build()
    }

    pub fn get(&self, version: &str) -> Option<&VersionEntry> {
        self.entries.get(version)
    }

    /// Registered versions in ascending order.
    pub fn versions(&self) -> Vec<&'static str> {
        let mut versions: Vec<_> = self.entries.keys().copied().collect();
        versions.sort_unstable();
        versions
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Collects version entries; uniqueness is enforced at build time.
#[derive(Default)]
pub struct RegistryBuilder {
    entries: HashMap<&'static str, VersionEntry>,
    errors: Vec<String>,
}

impl RegistryBuilder {
    pub fn register(&mut self, entry: VersionEntry) {
        if entry.version.is_empty() {
            self.errors
                .push("Schema version with an empty name".to_string());
            return;
        }
        if self.entries.contains_key(entry.version) {
            self.errors.push(format!(
                "Schema version '{}' is already registered",
                entry.version
            ));
            return;
        }
        self.entries.insert(entry.version, entry);
    }

    pub fn build(self) -> Result<VersionRegistry, RegistryError> {
        if !self.errors.is_empty() {
            return Err(RegistryError::InvalidRegistryConfiguration {
                errors: self.errors,
            });
        }
        if self.entries.is_empty() {
            return Err(RegistryError::NoVersions);
        }

        let registry = VersionRegistry {
            entries: self.entries,
        };
        tracing::info!(versions = ?registry.versions(), "Schema versions registered");
        Ok(registry)
    }
}

/// Structured errors for the version registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("no schema versions registered")]
    NoVersions,
    #[error("invalid registry configuration:\n{errors:#?}")]
    InvalidRegistryConfiguration { errors: Vec<String> },
}
