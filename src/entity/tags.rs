// Copyright (c) 2025 - Cowboy AI, Inc.
//! Tag requests for devices and interfaces
//!
//! ```rust,ignore
//! device.tags(["core", "lab"]).add().await;    // merge with current tags
//! device.tags(["core"]).set().await;           // replace
//! device.tags(["lab"]).remove().await;         // subtract
//! device.tags(Vec::<String>::new()).clear().await;
//! ```
//!
//! Every request refetches the entity first, because the tags on a cached
//! handle may be stale.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::backend::Record;
use crate::central::Lookup;
use crate::domain::invariants::plan_tags;
use crate::domain::{Collection, JobContext, PropertySet, TagMode};
use crate::session::SotSession;

/// An entity whose tag list can be modified
#[async_trait]
pub trait Taggable: Send {
    fn session(&self) -> &SotSession;

    fn collection(&self) -> Collection;

    /// Entity title used in log lines, e.g. "Device"
    fn title(&self) -> &'static str;

    /// Context for the outcomes of a tag job
    fn tag_context(&self, job: &str) -> JobContext;

    /// Fetch the backend record, bypassing any cached handle
    async fn refresh(&mut self) -> Lookup;

    /// Rebind after a write
    fn settle(&mut self, record: Option<&Record>);
}

/// Requested tag names, waiting for a mode
pub struct TagRequest<'e, E: Taggable + ?Sized> {
    entity: &'e mut E,
    names: Vec<String>,
}

impl<'e, E: Taggable + ?Sized> TagRequest<'e, E> {
    pub fn new<I, S>(entity: &'e mut E, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entity,
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Union with the current tags
    pub async fn add(self) -> Option<Record> {
        modify_tags(self.entity, &self.names, "add tags", TagMode::Merge, false).await
    }

    /// Exactly the requested tags
    pub async fn set(self) -> Option<Record> {
        modify_tags(self.entity, &self.names, "set tags", TagMode::Replace, false).await
    }

    /// Current tags minus the requested ones
    pub async fn remove(self) -> Option<Record> {
        modify_tags(self.entity, &self.names, "remove tags", TagMode::Remove, false).await
    }

    /// Remove every tag; requested names are ignored
    pub async fn clear(self) -> Option<Record> {
        modify_tags(self.entity, &[], "clear tags", TagMode::Replace, true).await
    }
}

async fn modify_tags<E: Taggable + ?Sized>(
    entity: &mut E,
    names: &[String],
    job: &str,
    mode: TagMode,
    explicit_clear: bool,
) -> Option<Record> {
    let ctx = entity.tag_context(job);
    let collection = entity.collection();
    let title = entity.title();
    let lookup = entity.refresh().await;

    let result = {
        let gateway = entity.session().gateway();
        let record = match lookup {
            Lookup::Found(record) => record,
            Lookup::NotFound => {
                gateway.failure(&ctx, format!("{} not found in sot", title));
                return None;
            }
            Lookup::Failed(err) => {
                gateway.failure(&ctx, format!("{} not updated in sot; {}", title, err));
                return None;
            }
        };

        let resolver = gateway.resolver();
        let mut requested = Vec::with_capacity(names.len());
        for name in names {
            match resolver.resolve_tag(name).await {
                Ok(id) => requested.push(id),
                Err(err) => {
                    warn!("dropping tag {}: {}", name, err);
                    gateway.failure(&ctx, format!("Tag {} not found in sot; dropped", name));
                }
            }
        }

        let current = record.tag_ids();
        match plan_tags(&current, &requested, mode, explicit_clear) {
            None => {
                debug!("tags of {} need no update", ctx.target);
                gateway.log().record(
                    ctx.success(format!("{} unchanged in sot", ctx.title))
                        .with_entity(Some(record.clone())),
                );
                return Some(record);
            }
            Some(tags) => {
                let ids: Vec<serde_json::Value> = tags.into_iter().map(|id| id.to_value()).collect();
                let properties = PropertySet::new().with("tags", ids);
                gateway.update_record(collection, record, &properties, &ctx).await
            }
        }
    };

    entity.settle(result.as_ref());
    result
}
