//! Utility functions for agentboard core
//!
//! This module provides text helpers shared by the editor, renderer and
//! markdown export.

pub mod html;
pub mod text;
