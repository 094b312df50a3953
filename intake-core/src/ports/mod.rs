// intake-core/src/ports/mod.rs
//
// Contracts the use cases depend on. Adapters live in `infrastructure`.

pub mod normalizer;
pub mod notifier;
pub mod parser;
pub mod repository;
pub mod storage;

pub use normalizer::DataNormalizer;
pub use notifier::{Notification, NotificationKind, Notifier};
pub use parser::FileParser;
pub use repository::{
    EntityRepository, FileRepository, LineageRepository, MetadataRepository, MetricsLevel,
    QualityRepository,
};
pub use storage::{ByteStream, Storage};
