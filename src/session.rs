// Copyright (c) 2025 - Cowboy AI, Inc.
//! SotSession - explicit session context
//!
//! One session owns everything that lives for the length of a batch job:
//!
//! - the backend connection handle (shared, never rotated)
//! - the [`ResolutionCache`]
//! - the [`OperationLog`]
//! - the configuration and its default tables
//!
//! Domain entities borrow the session; nothing is process-global, so two
//! sessions (or two tests) never see each other's cache or log.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use cim_sot::backend::MemoryBackend;
//! use cim_sot::config::SotConfig;
//! use cim_sot::SotSession;
//!
//! let session = SotSession::new(Arc::new(MemoryBackend::new()), SotConfig::default());
//! assert!(session.log().is_empty());
//! ```

use std::sync::Arc;
use tracing::info;

use crate::backend::Backend;
use crate::central::{EntityGateway, ReferenceResolver, ResolutionCache};
use crate::config::{DefaultsConfig, SotConfig};
use crate::domain::{OperationLog, OperationOutcome};
use crate::entity::{DeviceEntity, Ipam};
use crate::getter::Getter;

/// Backend handle, cache, log and configuration of one logical session
pub struct SotSession {
    backend: Arc<dyn Backend>,
    cache: ResolutionCache,
    log: OperationLog,
    config: SotConfig,
}

impl SotSession {
    pub fn new(backend: Arc<dyn Backend>, config: SotConfig) -> Self {
        Self {
            backend,
            cache: ResolutionCache::new(),
            log: OperationLog::new(),
            config,
        }
    }

    /// Connect to the Nautobot instance named in the configuration
    #[cfg(feature = "nautobot")]
    pub fn connect(config: SotConfig) -> crate::errors::SotResult<Self> {
        config.validate()?;
        let backend = crate::backend::NautobotBackend::new(&config.nautobot)?;
        info!("connected session to {}", config.nautobot.url);
        Ok(Self::new(Arc::new(backend), config))
    }

    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    pub fn config(&self) -> &SotConfig {
        &self.config
    }

    pub fn defaults(&self) -> &DefaultsConfig {
        &self.config.defaults
    }

    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    pub fn log(&self) -> &OperationLog {
        &self.log
    }

    /// Take the outcomes recorded so far
    pub fn drain_log(&self) -> Vec<OperationOutcome> {
        let outcomes = self.log.drain();
        info!("drained {} outcomes", outcomes.len());
        outcomes
    }

    pub fn resolver(&self) -> ReferenceResolver<'_> {
        ReferenceResolver::new(self.backend.as_ref(), &self.cache)
    }

    pub fn gateway(&self) -> EntityGateway<'_> {
        EntityGateway::new(self.backend.as_ref(), &self.cache, &self.log)
    }

    /// Select a device by name
    pub fn device(&self, name: impl Into<String>) -> DeviceEntity<'_> {
        DeviceEntity::new(self, name)
    }

    /// IP addresses, prefixes, VLANs and IP assignment
    pub fn ipam(&self) -> Ipam<'_> {
        Ipam::new(self)
    }

    /// Read and reporting paths
    pub fn getter(&self) -> Getter<'_> {
        Getter::new(self)
    }
}

impl std::fmt::Debug for SotSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SotSession")
            .field("cache", &self.cache)
            .field("log", &self.log.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
