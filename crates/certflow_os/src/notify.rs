#![forbid(unsafe_code)]

use std::sync::Mutex;

use certflow_kernel_contracts::certification::WorkflowStage;
use certflow_kernel_contracts::ids::CategoryId;
use serde::Serialize;
use tracing::{info, warn};

pub const CERTIFICATION_CHANGED: &str = "certification.changed";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificationChanged {
    pub category_id: CategoryId,
    pub new_stage: WorkflowStage,
}

impl CertificationChanged {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "event": CERTIFICATION_CHANGED,
            "payload": self,
        })
    }
}

/// Fire-and-forget notification of stage transitions. Delivery is best-effort;
/// sinks must not fail the transition that triggered them.
pub trait CertificationEventSink: Send + Sync {
    fn emit(&self, event: &CertificationChanged);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventSink;

impl CertificationEventSink for NoopEventSink {
    fn emit(&self, _event: &CertificationChanged) {}
}

/// Writes each notification as a structured log line.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl CertificationEventSink for TracingEventSink {
    fn emit(&self, event: &CertificationChanged) {
        info!(
            event = CERTIFICATION_CHANGED,
            category_id = %event.category_id,
            new_stage = event.new_stage.as_str(),
            "certification stage changed"
        );
    }
}

/// Keeps every notification in memory, in emission order.
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<CertificationChanged>>,
}

impl RecordingEventSink {
    pub fn events(&self) -> Vec<CertificationChanged> {
        match self.events.lock() {
            Ok(g) => g.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl CertificationEventSink for RecordingEventSink {
    fn emit(&self, event: &CertificationChanged) {
        match self.events.lock() {
            Ok(mut g) => g.push(event.clone()),
            Err(_) => warn!(
                category_id = %event.category_id,
                "recording event sink poisoned; dropping notification"
            ),
        }
    }
}
