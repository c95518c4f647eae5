//! API request handlers.
//!
//! This module contains all HTTP request handlers organized by functionality.

/// Question answering handlers (JSON and streamed).
pub mod ask;
/// Upload log and index listing handlers.
pub mod files;
/// Dependency health check.
pub mod health;
/// Document upload and ingestion.
pub mod upload;
