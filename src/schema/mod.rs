//! Schema definitions: the typed registry, entity structs, and the fixture
//! seeder used by the development fallback.

mod registry;
mod seeder;
pub mod types;

pub use registry::{
    prepare_insert, validate_patch, DefaultValue, EntityKind, FieldSpec, FieldType,
    SchemaDescriptor,
};
pub use seeder::{FixtureSeeder, SeedSummary};
