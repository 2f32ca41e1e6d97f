// Copyright (c) 2025 - Cowboy AI, Inc.
//! Operation outcomes and the session's OperationLog
//!
//! Every mutating operation records exactly one [`OperationOutcome`] per step.
//! Outcomes are immutable once recorded. The log keeps them in order in a
//! global list and, when an outcome names a device, in a per-device list as
//! well, so a batch job can report per device what succeeded and what did not.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use crate::backend::Record;

/// Result of one mutating step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationOutcome {
    /// Job label, e.g. "add device"
    pub job: String,
    /// Natural key of the target entity
    pub target: String,
    /// Device the outcome belongs to, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    pub success: bool,
    /// Human-readable log line
    pub log: String,
    pub timestamp: DateTime<Utc>,
    /// Resolved entity handle
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<Record>,
}

impl OperationOutcome {
    pub fn new(
        job: impl Into<String>,
        target: impl Into<String>,
        success: bool,
        log: impl Into<String>,
    ) -> Self {
        Self {
            job: job.into(),
            target: target.into(),
            device: None,
            success,
            log: log.into(),
            timestamp: Utc::now(),
            entity: None,
        }
    }

    pub fn for_device(mut self, device: Option<String>) -> Self {
        self.device = device;
        self
    }

    pub fn with_entity(mut self, entity: Option<Record>) -> Self {
        self.entity = entity;
        self
    }
}

/// Job label, target and owning device shared by the outcomes of one operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobContext {
    pub job: String,
    /// Entity title used in log lines, e.g. "Device", "IP", "VLAN"
    pub title: String,
    pub target: String,
    pub device: Option<String>,
}

impl JobContext {
    pub fn new(job: impl Into<String>, title: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            job: job.into(),
            title: title.into(),
            target: target.into(),
            device: None,
        }
    }

    pub fn on_device(mut self, device: impl Into<String>) -> Self {
        self.device = Some(device.into());
        self
    }

    pub fn success(&self, log: impl Into<String>) -> OperationOutcome {
        OperationOutcome::new(&self.job, &self.target, true, log).for_device(self.device.clone())
    }

    pub fn failure(&self, log: impl Into<String>) -> OperationOutcome {
        OperationOutcome::new(&self.job, &self.target, false, log).for_device(self.device.clone())
    }
}

#[derive(Debug, Default)]
struct LogInner {
    global: Vec<OperationOutcome>,
    by_device: BTreeMap<String, Vec<OperationOutcome>>,
}

/// Ordered, append-only record of operation outcomes for one session
#[derive(Debug, Default)]
pub struct OperationLog {
    inner: Mutex<LogInner>,
}

impl OperationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an outcome to the global list and, if keyed, to its device list
    pub fn record(&self, outcome: OperationOutcome) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(device) = &outcome.device {
            inner
                .by_device
                .entry(device.clone())
                .or_default()
                .push(outcome.clone());
        }
        inner.global.push(outcome);
    }

    /// All outcomes in recording order
    pub fn entries(&self) -> Vec<OperationOutcome> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .global
            .clone()
    }

    /// Outcomes recorded for one device
    pub fn for_device(&self, device: &str) -> Vec<OperationOutcome> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .by_device
            .get(device)
            .cloned()
            .unwrap_or_default()
    }

    /// Per-device view of the log
    pub fn by_device(&self) -> BTreeMap<String, Vec<OperationOutcome>> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .by_device
            .clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).global.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_failures(&self) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .global
            .iter()
            .any(|o| !o.success)
    }

    /// Take every outcome, leaving the log empty
    pub fn drain(&self) -> Vec<OperationOutcome> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.by_device.clear();
        std::mem::take(&mut inner.global)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_keeps_order_and_device_index() {
        let log = OperationLog::new();
        let ctx = JobContext::new("add device", "Device", "sw1").on_device("sw1");

        log.record(ctx.success("Device added to sot"));
        log.record(OperationOutcome::new("add IP", "10.0.0.1/24", false, "IP not added"));
        log.record(ctx.failure("could not mark interface as primary"));

        let entries = log.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].log, "Device added to sot");
        assert_eq!(entries[1].target, "10.0.0.1/24");

        let sw1 = log.for_device("sw1");
        assert_eq!(sw1.len(), 2);
        assert!(sw1[0].success);
        assert!(!sw1[1].success);
        assert!(log.has_failures());
    }

    #[test]
    fn test_drain_empties_log() {
        let log = OperationLog::new();
        log.record(JobContext::new("delete IP", "IP", "10.0.0.1").success("IP deleted in sot"));
        assert_eq!(log.drain().len(), 1);
        assert!(log.is_empty());
        assert!(log.by_device().is_empty());
    }
}
