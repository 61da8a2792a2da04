//! CLI utilities for Foodshare vCard tools
//!
//! Provides shared CLI functionality:
//! - Output mode selection (human, JSON, quiet)
//! - Status messages and formatting helpers
//! - Progress indicators for directory scans

#![warn(missing_docs)]

pub mod output;
pub mod progress;
