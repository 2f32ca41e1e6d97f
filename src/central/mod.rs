// Copyright (c) 2025 - Cowboy AI, Inc.
//! Central reconciliation machinery
//!
//! - [`ResolutionCache`] - session-scoped natural key → ID cache
//! - [`ReferenceResolver`] - ordered pipeline rewriting symbolic fields to IDs
//! - [`EntityGateway`] - fetch/upsert/update/delete with outcome logging

pub mod cache;
pub mod gateway;
pub mod resolver;

pub use cache::{CacheKey, CachedKind, ResolutionCache};
pub use gateway::{EntityGateway, ExistingPolicy, Lookup, WriteOptions};
pub use resolver::{ReferenceResolver, ResolutionError, ResolutionStep, ResolveContext, PIPELINE};
