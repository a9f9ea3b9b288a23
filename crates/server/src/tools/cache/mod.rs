//! Cache-related MCP tools.
//!
//! This module provides maintenance tools for the contributor cache.

pub mod purge;

pub use purge::purge_impl;
