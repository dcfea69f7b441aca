//! Compiles module descriptors ("modfiles") into a canonical [`Module`].
//!
//! ```no_run
//! let raw = std::fs::read("Modfile.yml")?;
//! let module = modfile::compile(&raw)?;
//! println!("{} has {} services", module.id, module.services.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod coerce;
pub mod compiler;
pub mod error;
pub mod ir;
pub mod port;
pub mod registry;
pub mod v1;
pub mod value;

pub use compiler::{compile, default_compiler, Compiler};
pub use error::{CompileError, ErrorCategory, GenerateError};
pub use ir::Module;
pub use registry::{RegistryError, SchemaVersion, VersionEntry, VersionRegistry};
pub use value::RawValue;
