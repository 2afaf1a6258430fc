//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep transport layers (CLI, HTTP) decoupled from storage details.

pub mod meeting_service;
