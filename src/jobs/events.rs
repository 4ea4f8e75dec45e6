/*!
 * Job lifecycle events and the sinks that receive them.
 *
 * Events are emitted synchronously from the job task, in order. Sinks must
 * not block; forward to a channel when the consumer is slow.
 */

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::database::models::{JobLogLevel, JobStatus};

/// Lifecycle event for a running job
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event")]
pub enum JobEvent {
    #[serde(rename = "job.started")]
    Started {
        job_id: i64,
        total: i64,
        model: String,
        provider_id: i64,
    },

    #[serde(rename = "job.progress")]
    Progress {
        job_id: i64,
        done: i64,
        total: i64,
        status: JobStatus,
        model: String,
    },

    #[serde(rename = "job.item.start")]
    ItemStart {
        job_id: i64,
        unit_id: i64,
        key: String,
        locale: String,
        model: String,
    },

    #[serde(rename = "job.item.done")]
    ItemDone {
        job_id: i64,
        unit_id: i64,
        key: String,
        locale: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        model: String,
    },

    #[serde(rename = "job.log")]
    Log {
        job_id: i64,
        level: JobLogLevel,
        message: String,
        ts: String,
    },
}

impl JobEvent {
    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            JobEvent::Started { .. } => "job.started",
            JobEvent::Progress { .. } => "job.progress",
            JobEvent::ItemStart { .. } => "job.item.start",
            JobEvent::ItemDone { .. } => "job.item.done",
            JobEvent::Log { .. } => "job.log",
        }
    }

    pub fn job_id(&self) -> i64 {
        match self {
            JobEvent::Started { job_id, .. }
            | JobEvent::Progress { job_id, .. }
            | JobEvent::ItemStart { job_id, .. }
            | JobEvent::ItemDone { job_id, .. }
            | JobEvent::Log { job_id, .. } => *job_id,
        }
    }
}

/// Receiver of job events
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &JobEvent);
}

/// Sink that drops every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn emit(&self, _event: &JobEvent) {}
}

/// Sink forwarding events into an unbounded tokio channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<JobEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiving end of its channel
    pub fn new() -> (Self, mpsc::UnboundedReceiver<JobEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: &JobEvent) {
        // A dropped receiver just means nobody is watching anymore
        let _ = self.tx.send(event.clone());
    }
}

/// Sink that keeps every event in memory
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<JobEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events received so far
    pub fn events(&self) -> Vec<JobEvent> {
        self.events.lock().clone()
    }

    /// Events of one job, filtered by wire name
    pub fn named(&self, job_id: i64, name: &str) -> Vec<JobEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.job_id() == job_id && e.name() == name)
            .cloned()
            .collect()
    }
}

impl EventSink for CollectingSink {
    fn emit(&self, event: &JobEvent) {
        self.events.lock().push(event.clone());
    }
}
