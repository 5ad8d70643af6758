//! Error taxonomy for the hub client.
//!
//! Validation and policy errors (`UnknownAttribute`, `InvalidAttributeValue`,
//! `GroupReadOnly`, `InvalidSchedule`, the `*NotFound` lookups) are raised
//! before any network call is made. `HubUnreachable` covers every failure
//! of the exchange itself, HTTP status errors included, and is potentially
//! transient; `HubOperation` means the hub responded without a success
//! marker; `Client` is the bucket for anything else unexpected (malformed
//! responses and the like).

use crate::models::hue::{GroupId, LightId, ScheduleId};
use crate::transport::TransportError;
use core::fmt;
use serde_json::Value;

#[derive(Debug)]
pub enum HueError {
    UnknownAttribute(String),
    InvalidAttributeValue { attr: String, value: Value },
    LightNotFound(LightId),
    GroupNotFound(GroupId),
    ScheduleNotFound(ScheduleId),
    GroupReadOnly(GroupId),
    InvalidSchedule(String),
    HubUnreachable(String),
    HubOperation(String),
    Client(String),
}

impl fmt::Display for HueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HueError::UnknownAttribute(attr) => write!(f, "unknown light attribute [{}]", attr),
            HueError::InvalidAttributeValue { attr, value } => {
                write!(f, "light attribute out of allowed range [{}] [{}]", attr, value)
            }
            HueError::LightNotFound(id) => write!(f, "light {} does not exist", id),
            HueError::GroupNotFound(id) => write!(f, "group {} does not exist", id),
            HueError::ScheduleNotFound(id) => write!(f, "schedule {} does not exist", id),
            HueError::GroupReadOnly(id) => write!(f, "group {} is read-only", id),
            HueError::InvalidSchedule(msg) => write!(f, "invalid schedule: {}", msg),
            HueError::HubUnreachable(msg) => write!(f, "hub unreachable: {}", msg),
            HueError::HubOperation(msg) => write!(f, "hub rejected operation: {}", msg),
            HueError::Client(msg) => write!(f, "hub client error: {}", msg),
        }
    }
}

impl std::error::Error for HueError {}

impl From<serde_json::Error> for HueError {
    fn from(value: serde_json::Error) -> Self {
        HueError::Client(format!("malformed hub response: {}", value))
    }
}

impl From<TransportError> for HueError {
    fn from(value: TransportError) -> Self {
        match value {
            TransportError::Transport(msg) => HueError::HubUnreachable(msg),
            TransportError::Http { status, message } => {
                HueError::HubUnreachable(format!("http {}: {}", status, message))
            }
        }
    }
}
