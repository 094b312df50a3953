// intake-core/src/domain/file/mod.rs

pub mod checksum;
pub mod metadata;
pub mod parsed;

pub use checksum::compute_checksum;
pub use metadata::{FileFormat, FileMetadata, ProcessingStatus};
pub use parsed::{ParseError, ParsedData, Record};
