// intake-core/src/application/mod.rs

pub mod context;
pub mod lineage;
pub mod normalize;
pub mod process_file;
pub mod scoring;
pub mod validation;

// --- RE-EXPORTS (FACADE PATTERN) ---
// `use intake_core::application::{ProcessFileUseCase, RequestContext};`
// without knowing the file layout.

pub use context::RequestContext;
pub use lineage::LineageTracker;
pub use normalize::{MergeReport, NormalizeDataUseCase, NormalizeRequest, NormalizeResponse};
pub use process_file::{ProcessFileRequest, ProcessFileResponse, ProcessFileUseCase};
pub use scoring::{
    BatchItem, BatchReport, QualityReport, ScoreQualityUseCase, ScoreRequest, ScoreResponse,
    ScoringSettings,
};
pub use validation::ValidateEntitiesUseCase;
