// intake-core/src/infrastructure/adapters/mod.rs

pub mod local_storage;
pub mod memory;
pub mod normalizer;
pub mod notifier;

pub use local_storage::LocalStorage;
pub use memory::{
    InMemoryEntityRepository, InMemoryFileRepository, InMemoryLineageRepository,
    InMemoryMetadataRepository, InMemoryQualityRepository,
};
pub use notifier::LogNotifier;
