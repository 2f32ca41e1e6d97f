// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests Module
//!
//! Laws of the pure helpers the reconciliation layer relies on: tag planning,
//! serial number cleaning and record comparison.

mod comparison;
mod tag_planning;
