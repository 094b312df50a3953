// intake-core/src/lib.rs

// 1. Documentation is welcome but not enforced yet
#![allow(missing_docs)]
// 2. Memory safety
#![deny(unsafe_code)]
// 3. Robustness
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
// 4. Performance
#![warn(clippy::perf)]

// --- HEXAGONAL MODULES ---

// 1. Ports (Interfaces / Traits)
// Contracts for storage, parsing, normalization, persistence and notification.
pub mod ports;

// 2. Domain (business core)
// Entities, field metadata, validation rules, quality scoring.
// Depends on NOTHING else (no infra, no app).
pub mod domain;

// 3. Infrastructure (Adapters)
// Config files, in-memory repositories, local storage, logging setup.
// Depends on the Domain and the Ports.
pub mod infrastructure;

// 4. Application (Use Cases)
// File processing, normalization, validation, quality scoring, lineage.
// Depends on the Domain and the Ports.
pub mod application;

// --- GLOBAL ERROR HANDLING ---
pub mod error;

// --- RE-EXPORTS (FACADE) ---
// use intake_core::IntakeError;
pub use error::IntakeError;
