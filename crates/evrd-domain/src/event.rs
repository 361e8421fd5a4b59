use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{OrgId, ProjectId, SiteId};

/// Lifecycle state of a row in `event_queue`.
///
/// `Claimed` is a lease state; exactly one of `Sent` or `DeadLetter` is ever
/// the terminal status observed for a given event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Pending,
    Claimed,
    Sent,
    Failed,
    DeadLetter,
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EventStatus::Pending => "pending",
            EventStatus::Claimed => "claimed",
            EventStatus::Sent => "sent",
            EventStatus::Failed => "failed",
            EventStatus::DeadLetter => "dead_letter",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for EventStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(EventStatus::Pending),
            "claimed" => Ok(EventStatus::Claimed),
            "sent" => Ok(EventStatus::Sent),
            "failed" => Ok(EventStatus::Failed),
            "dead_letter" => Ok(EventStatus::DeadLetter),
            other => Err(format!("unknown event status: {other}")),
        }
    }
}

/// An immutable record drawn from `event_queue`.
///
/// Immutable from the router's perspective: the router only ever flips
/// `status` (and the bookkeeping fields that go with it) via the queue
/// adapter; it never rewrites `event_type`/`event_data`/etc.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub event_id: String,
    pub event_type: String,
    pub event_source: String,
    pub event_subject: String,
    pub event_data: Vec<u8>,
    pub content_type: String,
    pub organization_id: OrgId,
    pub project_id: Option<ProjectId>,
    pub site_id: Option<SiteId>,
    pub created_at: DateTime<Utc>,
    pub status: EventStatus,
    pub sent_at: Option<DateTime<Utc>>,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub processing_by: Option<String>,
    pub claimed_at: Option<DateTime<Utc>>,
}
