//! Domain and wire models for the hub's resources.
//!
//! The hub's root document keys its collections by string identifiers; light
//! ids are numeric on the wire but carried as strings inside group
//! membership lists. `*Document` types mirror the wire shapes exactly;
//! the plain types are what the client's registries hold.

use crate::error::HueError;
use crate::transport::Method;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

// =====================
// Scalar ID newtype wrappers
// =====================

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LightId(pub i64);

impl fmt::Display for LightId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub String);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScheduleId(pub String);

impl fmt::Display for ScheduleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The hub guarantees a group with this id exists and spans every light.
pub const ALL_LIGHTS_GROUP: &str = "0";

/// Description the hub stores when a schedule is created without one.
pub const DEFAULT_DESCRIPTION: &str = "N/A";

/// Wire layout for schedule timestamps.
///
/// Hub firmware documentation shows a 12-hour hour field here with no AM/PM
/// marker, which cannot represent afternoon times unambiguously. Real
/// bridges accept the 24-hour form, so that is what we emit and parse.
pub const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

pub fn format_time(time: NaiveDateTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

pub fn parse_time(raw: &str) -> Result<NaiveDateTime, HueError> {
    NaiveDateTime::parse_from_str(raw, TIME_FORMAT)
        .map_err(|e| HueError::InvalidSchedule(format!("bad timestamp {:?}: {}", raw, e)))
}

// =====================
// Lights
// =====================

/// Wire shape of one entry in the root document's `lights` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LightDocument {
    pub name: String,
    pub modelid: String,
    pub swversion: String,
    #[serde(rename = "type")]
    pub light_type: String,
    #[serde(default)]
    pub pointsymbol: Option<BTreeMap<String, Value>>,
    #[serde(default)]
    pub state: serde_json::Map<String, Value>,
}

/// One controllable light. The `state` map mirrors the last known hub
/// state; it is updated locally only after a confirmed remote write and
/// replaced wholesale on reload.
#[derive(Debug, Clone)]
pub struct Light {
    pub id: LightId,
    pub name: String,
    pub model_id: String,
    pub sw_version: String,
    pub light_type: String,
    pub point_symbols: Option<BTreeMap<String, Value>>,
    pub state: serde_json::Map<String, Value>,
}

impl Light {
    pub fn from_document(id: LightId, doc: LightDocument) -> Self {
        Light {
            id,
            name: doc.name,
            model_id: doc.modelid,
            sw_version: doc.swversion,
            light_type: doc.light_type,
            point_symbols: doc.pointsymbol,
            state: doc.state,
        }
    }

    pub fn state_attr(&self, attr: &str) -> Option<&Value> {
        self.state.get(attr)
    }

    pub fn is_on(&self) -> bool {
        matches!(self.state_attr("on"), Some(Value::Bool(true)))
    }

    pub fn point_symbol(&self, name: &str) -> Option<&Value> {
        self.point_symbols.as_ref()?.get(name)
    }
}

// =====================
// Groups
// =====================

/// Wire shape shared by the root document's `groups` entries and the
/// dedicated `GET /groups/0` fallback response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupDocument {
    pub name: String,
    pub lights: Vec<String>,
}

/// A named set of lights. Membership is by id; a group never owns light
/// lifetime. Read-only groups (group "0" included) reject every mutation
/// locally, before any request is sent.
#[derive(Debug, Clone)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub lights: Vec<LightId>,
    pub read_only: bool,
}

// =====================
// Schedules and commands
// =====================

/// The request a schedule fires: target path on the hub, opaque attribute
/// body, HTTP method. Pure value, no identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub address: String,
    pub body: Value,
    pub method: Method,
}

impl Command {
    pub fn new(address: impl Into<String>, body: Value) -> Self {
        Command {
            address: address.into(),
            body,
            method: Method::default(),
        }
    }

    /// Parse a command out of untyped input. The three keys `address`,
    /// `body` and `method` must all be present.
    pub fn from_value(value: &Value) -> Result<Command, HueError> {
        let obj = value
            .as_object()
            .ok_or_else(|| HueError::InvalidSchedule("command must be an object".into()))?;
        for key in ["address", "body", "method"] {
            if !obj.contains_key(key) {
                return Err(HueError::InvalidSchedule(format!(
                    "command missing required key {:?}",
                    key
                )));
            }
        }
        serde_json::from_value(value.clone())
            .map_err(|e| HueError::InvalidSchedule(format!("malformed command: {}", e)))
    }
}

/// Wire shape of one entry in the root document's `schedules` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleDocument {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub time: String,
    pub command: Value,
}

/// One future-dated command the hub will execute unattended. Immutable once
/// created except for deletion; recurrences are modeled as N independent
/// schedules.
#[derive(Debug, Clone)]
pub struct Schedule {
    pub id: ScheduleId,
    pub name: String,
    pub description: String,
    pub time: NaiveDateTime,
    pub command: Command,
}

impl Schedule {
    pub fn from_document(id: ScheduleId, doc: ScheduleDocument) -> Result<Self, HueError> {
        let command = Command::from_value(&doc.command)?;
        let time = parse_time(&doc.time)?;
        Ok(Schedule {
            id,
            name: doc.name,
            description: doc.description.unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
            time,
            command,
        })
    }
}

// =====================
// Hub config
// =====================

/// Network/device metadata snapshot from the root document. Read-only;
/// replaced wholesale on reload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    #[serde(default)]
    pub dhcp: bool,
    #[serde(default)]
    pub gateway: String,
    #[serde(rename = "ipaddress", default)]
    pub ip_addr: String,
    #[serde(rename = "linkbutton", default)]
    pub link_button: bool,
    #[serde(default)]
    pub mac: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub netmask: String,
    #[serde(rename = "portalservices", default)]
    pub portal_services: bool,
    #[serde(rename = "proxyaddress", default)]
    pub proxy_addr: String,
    #[serde(default)]
    pub swupdate: Value,
    #[serde(rename = "swversion", default)]
    pub sw_version: String,
    #[serde(default)]
    pub whitelist: BTreeMap<String, Value>,
}

/// The hub's root resource: every collection in one document.
#[derive(Debug, Clone, Deserialize)]
pub struct HubRoot {
    #[serde(default)]
    pub lights: BTreeMap<String, LightDocument>,
    pub config: HubConfig,
    #[serde(default)]
    pub groups: BTreeMap<String, GroupDocument>,
    #[serde(default)]
    pub schedules: BTreeMap<String, ScheduleDocument>,
}
