//! Schema version `v1`.

mod assemble;
mod configs;
pub mod fields;
mod resolver;
pub mod schema;
mod services;

use crate::error::GenerateError;
use crate::ir::Module;
use crate::registry::{Registrator, RegistryBuilder, SchemaVersion, VersionEntry};

pub use schema::ModFile;

pub struct V1;

impl SchemaVersion for V1 {
    const VERSION: &'static str = "v1";

    type Descriptor = ModFile;

    fn decode(raw: &[u8]) -> Result<ModFile, serde_yaml::Error> {
        serde_yaml::from_slice(raw)
    }

    fn generate(descriptor: ModFile) -> Result<Module, GenerateError> {
        assemble::generate(descriptor)
    }
}

fn register(b: &mut RegistryBuilder) {
    b.register(VersionEntry::of::<V1>());
}

inventory::submit! {
    Registrator(register)
}
