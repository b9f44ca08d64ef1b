//! Test module for bangs-core
//!
//! This module contains cross-module tests for:
//! - The lookup pipeline (parse, match, build) and its laws
//! - The engine: readiness gating, suggestion emission, commit resolution
//! - The editing workflow and its interaction with a running engine
//! - Configuration loading and defaults

mod fixtures;
