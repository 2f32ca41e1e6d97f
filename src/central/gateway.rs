// Copyright (c) 2025 - Cowboy AI, Inc.
//! Entity Gateway - idempotent primitives over any backend collection
//!
//! ```text
//! fetch(collection, key)                  -> Lookup
//! upsert(collection, props, key, options) -> Option<Record>   (at most one create)
//! update(collection, props, key, options) -> Option<Record>
//! delete(collection, key)                 -> Option<Record>
//! ```
//!
//! The gateway is the error boundary of the crate: every backend failure is
//! caught here, recorded as an [`OperationOutcome`](crate::domain::OperationOutcome)
//! and turned into `None`. Nothing below the domain entities raises.

use tracing::{debug, error, info, warn};

use super::resolver::{ReferenceResolver, ResolveContext};
use super::ResolutionCache;
use crate::backend::{Backend, BackendError, Filter, Record};
use crate::domain::{Collection, JobContext, OperationLog, PropertySet};

/// Result of looking up one entity
///
/// Keeps "not there" apart from "could not ask", so a transport error is never
/// read as absence.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Found(Record),
    NotFound,
    Failed(BackendError),
}

impl Lookup {
    pub fn found(self) -> Option<Record> {
        match self {
            Lookup::Found(record) => Some(record),
            _ => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Lookup::NotFound)
    }
}

/// What an upsert does when the entity already exists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExistingPolicy {
    /// Success, return the existing record
    #[default]
    ReturnExisting,
    /// No-op failure, return `None`
    Reject,
}

impl ExistingPolicy {
    pub fn from_flag(return_existing: bool) -> Self {
        if return_existing {
            ExistingPolicy::ReturnExisting
        } else {
            ExistingPolicy::Reject
        }
    }
}

/// Options shared by upsert and update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOptions {
    pub existing: ExistingPolicy,
    pub resolve_references: bool,
    pub context: ResolveContext,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            existing: ExistingPolicy::ReturnExisting,
            resolve_references: true,
            context: ResolveContext::default(),
        }
    }
}

impl WriteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn existing(mut self, policy: ExistingPolicy) -> Self {
        self.existing = policy;
        self
    }

    /// Write the property set as given
    pub fn without_resolution(mut self) -> Self {
        self.resolve_references = false;
        self
    }

    pub fn context(mut self, context: ResolveContext) -> Self {
        self.context = context;
        self
    }
}

/// Get/create/update/delete over named collections, with outcome logging
#[derive(Clone, Copy)]
pub struct EntityGateway<'a> {
    backend: &'a dyn Backend,
    resolver: ReferenceResolver<'a>,
    log: &'a OperationLog,
}

impl<'a> EntityGateway<'a> {
    pub fn new(backend: &'a dyn Backend, cache: &'a ResolutionCache, log: &'a OperationLog) -> Self {
        Self {
            backend,
            resolver: ReferenceResolver::new(backend, cache),
            log,
        }
    }

    pub fn backend(&self) -> &'a dyn Backend {
        self.backend
    }

    pub fn resolver(&self) -> ReferenceResolver<'a> {
        self.resolver
    }

    pub fn log(&self) -> &'a OperationLog {
        self.log
    }

    /// Look up exactly one entity
    pub async fn fetch(&self, collection: Collection, key: &Filter) -> Lookup {
        match self.backend.get(collection, key).await {
            Ok(Some(record)) => {
                debug!("found {} {} for {}", collection, record, key);
                Lookup::Found(record)
            }
            Ok(None) => {
                debug!("no {} matches {}", collection, key);
                Lookup::NotFound
            }
            Err(err) => {
                warn!("lookup of {} {} failed: {}", collection, key, err);
                Lookup::Failed(err)
            }
        }
    }

    /// Create the entity unless one with the natural key exists
    ///
    /// With an empty key the fetch is skipped and the entity is created
    /// directly. A failed fetch never leads to a create.
    pub async fn upsert(
        &self,
        collection: Collection,
        mut properties: PropertySet,
        key: &Filter,
        options: &WriteOptions,
        ctx: &JobContext,
    ) -> Option<Record> {
        if !key.is_empty() {
            match self.fetch(collection, key).await {
                Lookup::Found(existing) => return self.report_existing(existing, options.existing, ctx),
                Lookup::NotFound => {}
                Lookup::Failed(err) => {
                    self.failure(ctx, format!("{} not added to sot; {}", ctx.title, err));
                    return None;
                }
            }
        }

        if options.resolve_references && !self.resolve(&mut properties, &options.context, ctx).await {
            return None;
        }

        match self.backend.create(collection, &properties).await {
            Ok(record) => {
                info!("{} {} added to sot", ctx.title, ctx.target);
                self.log.record(
                    ctx.success(format!("{} added to sot", ctx.title))
                        .with_entity(Some(record.clone())),
                );
                Some(record)
            }
            Err(err) => {
                self.failure(ctx, format!("{} not added to sot; {}", ctx.title, err));
                None
            }
        }
    }

    /// Update the entity identified by `key`; a missing entity is a no-op failure
    pub async fn update(
        &self,
        collection: Collection,
        mut properties: PropertySet,
        key: &Filter,
        options: &WriteOptions,
        ctx: &JobContext,
    ) -> Option<Record> {
        let record = match self.fetch(collection, key).await {
            Lookup::Found(record) => record,
            Lookup::NotFound => {
                self.failure(ctx, format!("{} not found in sot", ctx.title));
                return None;
            }
            Lookup::Failed(err) => {
                self.failure(ctx, format!("{} not updated in sot; {}", ctx.title, err));
                return None;
            }
        };

        if options.resolve_references && !self.resolve(&mut properties, &options.context, ctx).await {
            return None;
        }

        self.update_record(collection, record, &properties, ctx).await
    }

    /// Apply resolved properties to a record already in hand
    pub async fn update_record(
        &self,
        collection: Collection,
        mut record: Record,
        properties: &PropertySet,
        ctx: &JobContext,
    ) -> Option<Record> {
        match self.backend.update(collection, &record, properties).await {
            Ok(true) => {
                info!("{} {} updated in sot", ctx.title, ctx.target);
                record.apply(properties);
                self.log.record(
                    ctx.success(format!("{} updated in sot", ctx.title))
                        .with_entity(Some(record.clone())),
                );
                Some(record)
            }
            Ok(false) => {
                debug!("{} {} unchanged in sot", ctx.title, ctx.target);
                self.log.record(
                    ctx.success(format!("{} unchanged in sot", ctx.title))
                        .with_entity(Some(record.clone())),
                );
                Some(record)
            }
            Err(err) => {
                self.failure(ctx, format!("{} not updated in sot; {}", ctx.title, err));
                None
            }
        }
    }

    /// Delete the entity identified by `key`
    ///
    /// The returned record is the handle of an entity that no longer exists.
    pub async fn delete(&self, collection: Collection, key: &Filter, ctx: &JobContext) -> Option<Record> {
        let record = match self.fetch(collection, key).await {
            Lookup::Found(record) => record,
            Lookup::NotFound => {
                self.failure(ctx, format!("{} not found in sot", ctx.title));
                return None;
            }
            Lookup::Failed(err) => {
                self.failure(ctx, format!("{} not deleted in sot; {}", ctx.title, err));
                return None;
            }
        };

        match self.backend.delete(collection, &record).await {
            Ok(true) => {
                info!("{} {} deleted in sot", ctx.title, ctx.target);
                self.log.record(
                    ctx.success(format!("{} deleted in sot", ctx.title))
                        .with_entity(Some(record.clone())),
                );
                Some(record)
            }
            Ok(false) => {
                self.failure(ctx, format!("{} not found in sot", ctx.title));
                None
            }
            Err(err) => {
                self.failure(ctx, format!("{} not deleted in sot; {}", ctx.title, err));
                None
            }
        }
    }

    /// Resolve references, logging a failure outcome; returns false on failure
    pub async fn resolve(&self, properties: &mut PropertySet, context: &ResolveContext, ctx: &JobContext) -> bool {
        match self.resolver.resolve(properties, context).await {
            Ok(()) => true,
            Err(err) => {
                self.failure(ctx, format!("could not convert properties to IDs; {}", err));
                false
            }
        }
    }

    /// Record a failure outcome
    pub fn failure(&self, ctx: &JobContext, log: String) {
        error!("{}: {}", ctx.target, log);
        self.log.record(ctx.failure(log));
    }

    /// Log an entity found by the caller's own lookup and apply the policy
    pub fn report_existing(&self, record: Record, policy: ExistingPolicy, ctx: &JobContext) -> Option<Record> {
        let line = format!("{} already in sot", ctx.title);
        debug!("{} {}", ctx.target, line);
        match policy {
            ExistingPolicy::ReturnExisting => {
                self.log.record(ctx.success(line).with_entity(Some(record.clone())));
                Some(record)
            }
            ExistingPolicy::Reject => {
                self.log.record(ctx.failure(line).with_entity(Some(record)));
                None
            }
        }
    }
}
