use std::fmt;

use thiserror::Error;

use crate::registry::RegistryError;

/// Coarse classification of compile failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// The document is not valid YAML or does not match the schema shape.
    Schema,
    /// A value cannot be converted to the requested primitive kind.
    TypeCoercion,
    /// A reference names a service that does not exist.
    Referential,
    /// Two entries target the same slot with different content.
    Conflict,
    /// Port or range arithmetic failed.
    Range,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorCategory::Schema => "schema",
            ErrorCategory::TypeCoercion => "type-coercion",
            ErrorCategory::Referential => "referential",
            ErrorCategory::Conflict => "conflict",
            ErrorCategory::Range => "range",
        })
    }
}

/// Top-level error returned by [`crate::compile`].
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("no decoders registered")]
    NoDecoders,

    #[error("no version")]
    NoVersion,

    #[error("no decoder for version '{0}'")]
    UnknownVersion(String),

    #[error("invalid document: {0}")]
    Decode(#[source] serde_yaml::Error),

    #[error(transparent)]
    Generate(#[from] GenerateError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl CompileError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            CompileError::NoDecoders
            | CompileError::NoVersion
            | CompileError::UnknownVersion(_)
            | CompileError::Decode(_)
            | CompileError::Registry(_) => ErrorCategory::Schema,
            CompileError::Generate(e) => e.category(),
        }
    }
}

/// Errors raised while assembling a module from a decoded descriptor.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("error parsing config '{config}': {source}")]
    Config {
        config: String,
        #[source]
        source: ConfigError,
    },

    #[error("{kind} '{service}' invalid {section}: {source}")]
    Service {
        kind: ServiceKind,
        service: String,
        section: ServiceSection,
        #[source]
        source: ServiceError,
    },

    #[error("invalid {family}: {kind} '{target}' not defined")]
    UndefinedTarget {
        family: RefFamily,
        kind: ServiceKind,
        target: String,
    },

    #[error("invalid {family}: '{existing}' & '{incoming}' -> '{target}' -> '{key}'")]
    Conflict {
        family: RefFamily,
        target: String,
        key: String,
        existing: String,
        incoming: String,
    },
}

impl GenerateError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            GenerateError::Config { source, .. } => source.category(),
            GenerateError::Service { source, .. } => source.category(),
            GenerateError::UndefinedTarget { .. } => ErrorCategory::Referential,
            GenerateError::Conflict { .. } => ErrorCategory::Conflict,
        }
    }
}

/// Failure converting an untyped value into a primitive kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid data type '{found}', expected {expected}")]
pub struct CoerceError {
    pub expected: &'static str,
    pub found: &'static str,
}

impl CoerceError {
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::TypeCoercion
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid data type '{0}'")]
    InvalidDataType(String),

    #[error("type mismatch: '{found}' != list")]
    NotAList { found: &'static str },

    #[error("type option '{key}': {source}")]
    TypeOption {
        key: String,
        #[source]
        source: CoerceError,
    },

    #[error(transparent)]
    Value(#[from] CoerceError),
}

impl ConfigError {
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::TypeCoercion
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortError {
    #[error("empty port")]
    Empty,

    #[error("invalid port '{0}'")]
    InvalidFormat(String),

    #[error("invalid port number '{part}' in '{spec}'")]
    InvalidNumber { spec: String, part: String },

    #[error("invalid range '{spec}': {start} >= {end}")]
    InvalidRange { spec: String, start: u16, end: u16 },

    #[error("range mismatch: ports {ports} > host ports {host_ports}")]
    MorePortsThanHostPorts { ports: usize, host_ports: usize },

    #[error("range mismatch: ports {ports} < host ports {host_ports}")]
    FewerPortsThanHostPorts { ports: usize, host_ports: usize },
}

impl PortError {
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::Range
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MountError {
    #[error("duplicate '{0}'")]
    Duplicate(String),

    /// Two endpoints published under the same external path.
    #[error("duplicate '{key}': '{existing}' & '{incoming}'")]
    DuplicateEndpoint {
        key: String,
        existing: String,
        incoming: String,
    },
}

impl MountError {
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::Conflict
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Mount(#[from] MountError),

    #[error(transparent)]
    Port(#[from] PortError),
}

impl ServiceError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ServiceError::Mount(e) => e.category(),
            ServiceError::Port(e) => e.category(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    Service,
    AuxService,
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ServiceKind::Service => "service",
            ServiceKind::AuxService => "aux service",
        })
    }
}

/// Which per-service section a generation error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceSection {
    BindMounts,
    TmpfsMounts,
    HttpEndpoints,
    Ports,
}

impl fmt::Display for ServiceSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ServiceSection::BindMounts => "bind mounts",
            ServiceSection::TmpfsMounts => "tmpfs mounts",
            ServiceSection::HttpEndpoints => "http endpoints",
            ServiceSection::Ports => "ports",
        })
    }
}

/// Reference families wired onto services by the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefFamily {
    ServiceReference,
    Volume,
    ExtDependency,
    HostResource,
    SecretMount,
    SecretVariable,
    Config,
}

impl fmt::Display for RefFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RefFamily::ServiceReference => "service reference",
            RefFamily::Volume => "volume",
            RefFamily::ExtDependency => "external dependency",
            RefFamily::HostResource => "host resource",
            RefFamily::SecretMount => "secret mount",
            RefFamily::SecretVariable => "secret variable",
            RefFamily::Config => "config",
        })
    }
}
