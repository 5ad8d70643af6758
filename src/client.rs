//! Blocking client for the hub: owns the in-memory registries and
//! orchestrates every round trip.
//!
//! - Single-threaded and synchronous; each operation is at most two
//!   sequential round trips (the group-zero fallback during `load`).
//! - Validation and policy checks run before anything touches the network;
//!   a rejected request sends nothing.
//! - Local state mirrors the hub optimistically: it is only updated after a
//!   request comes back successfully, and it is replaced wholesale on
//!   reload. No internal locking; concurrent callers must serialize access
//!   themselves.

use crate::error::HueError;
use crate::models::hue::{
    format_time, Command, Group, GroupDocument, GroupId, HubConfig, HubRoot, Light, LightId,
    Schedule, ScheduleId, ALL_LIGHTS_GROUP, DEFAULT_DESCRIPTION,
};
use crate::repeat::{self, Repeat};
use crate::transport::{HttpTransport, HubTransport, Method, DEFAULT_PORT};
use crate::validate;
use chrono::{Duration, Local, NaiveDateTime};
use log::{debug, info};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

pub struct HueClient<T: HubTransport = HttpTransport> {
    transport: T,
    lights: BTreeMap<LightId, Light>,
    groups: BTreeMap<GroupId, Group>,
    schedules: BTreeMap<ScheduleId, Schedule>,
    config: Option<HubConfig>,
}

impl HueClient<HttpTransport> {
    /// Connect to a hub at `http://{host}:{port}/api/{app_key}`. No I/O
    /// happens unless `load_now` is set.
    pub fn connect(host: &str, port: u16, app_key: &str, load_now: bool) -> Result<Self, HueError> {
        let mut client = HueClient::with_transport(HttpTransport::new(host, port, app_key));
        if load_now {
            client.load()?;
        }
        Ok(client)
    }

    pub fn connect_default_port(host: &str, app_key: &str, load_now: bool) -> Result<Self, HueError> {
        Self::connect(host, DEFAULT_PORT, app_key, load_now)
    }
}

impl<T: HubTransport> HueClient<T> {
    pub fn with_transport(transport: T) -> Self {
        HueClient {
            transport,
            lights: BTreeMap::new(),
            groups: BTreeMap::new(),
            schedules: BTreeMap::new(),
            config: None,
        }
    }

    fn exchange(&self, path: &str, body: Option<&Value>, method: Method) -> Result<Vec<u8>, HueError> {
        self.transport
            .exchange(path, body, method)
            .map_err(HueError::from)
    }

    // =====================
    // Registry access
    // =====================

    pub fn lights(&self) -> &BTreeMap<LightId, Light> {
        &self.lights
    }

    pub fn groups(&self) -> &BTreeMap<GroupId, Group> {
        &self.groups
    }

    pub fn schedules(&self) -> &BTreeMap<ScheduleId, Schedule> {
        &self.schedules
    }

    pub fn config(&self) -> Option<&HubConfig> {
        self.config.as_ref()
    }

    pub fn light(&self, id: LightId) -> Option<&Light> {
        self.lights.get(&id)
    }

    pub fn group(&self, id: &GroupId) -> Option<&Group> {
        self.groups.get(id)
    }

    pub fn schedule(&self, id: &ScheduleId) -> Option<&Schedule> {
        self.schedules.get(id)
    }

    /// Last known hub value for one state attribute of one light.
    pub fn state_attribute(&self, id: LightId, attr: &str) -> Option<&Value> {
        self.lights.get(&id).and_then(|light| light.state_attr(attr))
    }

    /// A random value within the accepted range of `attr`; never returns a
    /// value `validate` would reject.
    pub fn random_attribute(&self, attr: &str) -> Result<Value, HueError> {
        validate::random_value(attr)
    }

    // =====================
    // Load
    // =====================

    /// Fetch the hub's root document and rebuild every registry from it.
    ///
    /// Population order is load-bearing: lights first (groups resolve light
    /// ids against the light set), then config, groups, schedules. Some hub
    /// firmware omits group "0" from the listing; in that case a second
    /// round trip fetches it and it is inserted locally as read-only.
    /// The registries are committed together once the whole document has
    /// resolved, so a failed reload leaves the previous state untouched.
    pub fn load(&mut self) -> Result<(), HueError> {
        let raw = self.exchange("", None, Method::Get)?;
        let root: HubRoot = serde_json::from_slice(&raw)?;

        let mut lights = BTreeMap::new();
        for (key, doc) in root.lights {
            let id = parse_light_id(&key)?;
            lights.insert(id, Light::from_document(id, doc));
        }

        let mut groups = BTreeMap::new();
        for (key, doc) in root.groups {
            let members = resolve_lights(&lights, &doc.lights)?;
            let read_only = key == ALL_LIGHTS_GROUP;
            let id = GroupId(key);
            groups.insert(
                id.clone(),
                Group { id, name: doc.name, lights: members, read_only },
            );
        }
        if !groups.contains_key(&GroupId(ALL_LIGHTS_GROUP.into())) {
            let raw = self.exchange(&format!("/groups/{}", ALL_LIGHTS_GROUP), None, Method::Get)?;
            let doc: GroupDocument = serde_json::from_slice(&raw)?;
            let members = resolve_lights(&lights, &doc.lights)?;
            let id = GroupId(ALL_LIGHTS_GROUP.into());
            groups.insert(
                id.clone(),
                Group { id, name: doc.name, lights: members, read_only: true },
            );
        }

        let mut schedules = BTreeMap::new();
        for (key, doc) in root.schedules {
            let id = ScheduleId(key);
            let schedule = Schedule::from_document(id.clone(), doc)?;
            schedules.insert(id, schedule);
        }

        self.lights = lights;
        self.config = Some(root.config);
        self.groups = groups;
        self.schedules = schedules;

        info!(
            "Loaded hub state: {} light(s), {} group(s), {} schedule(s)",
            self.lights.len(),
            self.groups.len(),
            self.schedules.len()
        );
        Ok(())
    }

    // =====================
    // Lights
    // =====================

    /// Validate every attribute, then send the whole map to the light's
    /// state resource in one request. A single invalid key aborts the call
    /// before anything is sent. On success the sent keys are merged into
    /// the cached state.
    pub fn set_light_attribute(
        &mut self,
        id: LightId,
        attrs: &Map<String, Value>,
    ) -> Result<(), HueError> {
        if !self.lights.contains_key(&id) {
            return Err(HueError::LightNotFound(id));
        }
        for (attr, value) in attrs {
            validate::validate(attr, value)?;
        }

        let body = Value::Object(attrs.clone());
        self.exchange(&format!("/lights/{}/state", id), Some(&body), Method::Put)?;

        if let Some(light) = self.lights.get_mut(&id) {
            for (attr, value) in attrs {
                light.state.insert(attr.clone(), value.clone());
            }
        }
        debug!("Set {} attribute(s) on light {}", attrs.len(), id);
        Ok(())
    }

    pub fn turn_on(&mut self, id: LightId) -> Result<(), HueError> {
        let mut attrs = Map::new();
        attrs.insert("on".into(), Value::Bool(true));
        self.set_light_attribute(id, &attrs)
    }

    pub fn turn_off(&mut self, id: LightId) -> Result<(), HueError> {
        let mut attrs = Map::new();
        attrs.insert("on".into(), Value::Bool(false));
        self.set_light_attribute(id, &attrs)
    }

    // =====================
    // Groups
    // =====================

    /// Create a group from the given lights. The hub assigns the id, which
    /// is parsed out of the success response's resource path.
    pub fn create_group(&mut self, lights: &[LightId], name: &str) -> Result<GroupId, HueError> {
        for id in lights {
            if !self.lights.contains_key(id) {
                return Err(HueError::LightNotFound(*id));
            }
        }

        let body = json!({
            "lights": light_id_strings(lights),
            "name": name,
        });
        let raw = self.exchange("/groups", Some(&body), Method::Post)?;
        let success = first_success(&raw)?;
        let id = GroupId(created_id(&success)?);

        self.groups.insert(
            id.clone(),
            Group {
                id: id.clone(),
                name: name.to_string(),
                lights: lights.to_vec(),
                read_only: false,
            },
        );
        info!("Created group {} ({:?}) with {} light(s)", id, name, lights.len());
        Ok(id)
    }

    /// Delete a group. Read-only groups (group "0" included) are rejected
    /// locally; the local entry is removed only after the hub confirms.
    pub fn delete_group(&mut self, id: &GroupId) -> Result<(), HueError> {
        let group = self
            .groups
            .get(id)
            .ok_or_else(|| HueError::GroupNotFound(id.clone()))?;
        if group.read_only {
            return Err(HueError::GroupReadOnly(id.clone()));
        }

        let raw = self.exchange(&format!("/groups/{}", id), None, Method::Delete)?;
        first_success(&raw)?;
        self.groups.remove(id);
        info!("Deleted group {}", id);
        Ok(())
    }

    /// Replace a group's membership. Subject to the same read-only policy
    /// as deletion; the local entry is updated only after the hub confirms.
    pub fn set_group_lights(&mut self, id: &GroupId, lights: &[LightId]) -> Result<(), HueError> {
        let group = self
            .groups
            .get(id)
            .ok_or_else(|| HueError::GroupNotFound(id.clone()))?;
        if group.read_only {
            return Err(HueError::GroupReadOnly(id.clone()));
        }
        for light in lights {
            if !self.lights.contains_key(light) {
                return Err(HueError::LightNotFound(*light));
            }
        }

        let body = json!({ "lights": light_id_strings(lights) });
        let raw = self.exchange(&format!("/groups/{}", id), Some(&body), Method::Put)?;
        first_success(&raw)?;
        if let Some(group) = self.groups.get_mut(id) {
            group.lights = lights.to_vec();
        }
        Ok(())
    }

    // =====================
    // Schedules
    // =====================

    /// Create one schedule per occurrence per command.
    ///
    /// With no explicit time the schedule fires 24 hours from now. A repeat
    /// spec of M times every interval creates M independent schedules; an
    /// occurrence with K commands creates K schedules sharing its timestamp.
    /// Malformed input fails before any request is sent.
    pub fn create_schedule(
        &mut self,
        name: &str,
        commands: &[Command],
        description: Option<&str>,
        time: Option<NaiveDateTime>,
        repeats: Option<&Repeat>,
    ) -> Result<Vec<ScheduleId>, HueError> {
        let start = time.unwrap_or_else(|| Local::now().naive_local() + Duration::days(1));
        let description = description.unwrap_or(DEFAULT_DESCRIPTION);
        let times = repeat::occurrences(start, repeats)?;

        let mut created = Vec::with_capacity(times.len() * commands.len());
        for at in &times {
            let time_str = format_time(*at);
            for command in commands {
                let body = json!({
                    "command": command,
                    "description": description,
                    "name": name,
                    "time": time_str,
                });
                let raw = self.exchange("/schedules", Some(&body), Method::Post)?;
                let success = first_success(&raw)?;
                let id = ScheduleId(created_id(&success)?);
                self.schedules.insert(
                    id.clone(),
                    Schedule {
                        id: id.clone(),
                        name: name.to_string(),
                        description: description.to_string(),
                        time: *at,
                        command: command.clone(),
                    },
                );
                created.push(id);
            }
        }
        info!("Created {} schedule(s) named {:?}", created.len(), name);
        Ok(created)
    }

    pub fn delete_schedule(&mut self, id: &ScheduleId) -> Result<(), HueError> {
        if !self.schedules.contains_key(id) {
            return Err(HueError::ScheduleNotFound(id.clone()));
        }

        let raw = self.exchange(&format!("/schedules/{}", id), None, Method::Delete)?;
        first_success(&raw)?;
        self.schedules.remove(id);
        info!("Deleted schedule {}", id);
        Ok(())
    }
}

fn resolve_lights(
    lights: &BTreeMap<LightId, Light>,
    keys: &[String],
) -> Result<Vec<LightId>, HueError> {
    let mut members = Vec::with_capacity(keys.len());
    for key in keys {
        let id = parse_light_id(key)?;
        if !lights.contains_key(&id) {
            return Err(HueError::LightNotFound(id));
        }
        members.push(id);
    }
    Ok(members)
}

fn parse_light_id(key: &str) -> Result<LightId, HueError> {
    key.parse::<i64>()
        .map(LightId)
        .map_err(|_| HueError::Client(format!("non-numeric light id {:?} in hub response", key)))
}

fn light_id_strings(lights: &[LightId]) -> Vec<String> {
    lights.iter().map(|id| id.0.to_string()).collect()
}

/// Mutation responses are arrays whose first element carries either a
/// `success` object or an error indicator. Returns the success payload.
fn first_success(raw: &[u8]) -> Result<Value, HueError> {
    let parsed: Value = serde_json::from_slice(raw)?;
    let first = parsed
        .as_array()
        .and_then(|items| items.first())
        .ok_or_else(|| HueError::Client("empty hub response".into()))?;
    match first.get("success") {
        Some(success) => Ok(success.clone()),
        None => Err(HueError::HubOperation(
            first
                .get("error")
                .map(|e| e.to_string())
                .unwrap_or_else(|| first.to_string()),
        )),
    }
}

/// Extract the trailing segment of the success resource path, i.e. the
/// hub-assigned identifier of the created resource.
fn created_id(success: &Value) -> Result<String, HueError> {
    success
        .get("id")
        .and_then(Value::as_str)
        .map(|path| path.rsplit('/').next().unwrap_or(path).to_string())
        .ok_or_else(|| HueError::Client("success response missing id".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportError;
    use chrono::NaiveDate;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Records every exchange and replays canned responses in order.
    struct FakeTransport {
        calls: RefCell<Vec<(String, Option<Value>, Method)>>,
        responses: RefCell<VecDeque<Vec<u8>>>,
    }

    impl FakeTransport {
        fn new(responses: &[&str]) -> Self {
            FakeTransport {
                calls: RefCell::new(Vec::new()),
                responses: RefCell::new(responses.iter().map(|r| r.as_bytes().to_vec()).collect()),
            }
        }

        fn unreachable() -> Self {
            Self::new(&[])
        }

        fn call_count(&self) -> usize {
            self.calls.borrow().len()
        }

        fn call(&self, index: usize) -> (String, Option<Value>, Method) {
            self.calls.borrow()[index].clone()
        }
    }

    impl HubTransport for FakeTransport {
        fn exchange(
            &self,
            path: &str,
            body: Option<&Value>,
            method: Method,
        ) -> Result<Vec<u8>, TransportError> {
            self.calls
                .borrow_mut()
                .push((path.to_string(), body.cloned(), method));
            self.responses
                .borrow_mut()
                .pop_front()
                .ok_or_else(|| TransportError::Transport("connection refused".into()))
        }
    }

    fn client_with(fake: &FakeTransport) -> HueClient<&FakeTransport> {
        HueClient::with_transport(fake)
    }

    const ROOT_WITH_GROUP_ZERO: &str = r#"{
        "lights": {
            "1": {"name": "Desk", "modelid": "LCT001", "swversion": "65003148",
                  "type": "Extended color light", "pointsymbol": null,
                  "state": {"on": false, "bri": 100}},
            "2": {"name": "Hall", "modelid": "LCT001", "swversion": "65003148",
                  "type": "Extended color light", "pointsymbol": null,
                  "state": {"on": true}}
        },
        "config": {"name": "hub", "swversion": "01005215", "mac": "00:17:88:00:00:00",
                   "dhcp": true, "ipaddress": "192.168.1.2", "gateway": "192.168.1.1",
                   "linkbutton": false, "whitelist": {"appkey": {"name": "test"}}},
        "groups": {
            "0": {"name": "All", "lights": ["1", "2"]},
            "1": {"name": "Office", "lights": ["1"]}
        },
        "schedules": {
            "9": {"name": "wake", "description": "morning", "time": "2024-06-01T07:00:00",
                  "command": {"address": "/api/k/lights/1/state", "body": {"on": true},
                              "method": "PUT"}}
        }
    }"#;

    const ROOT_WITHOUT_GROUP_ZERO: &str = r#"{
        "lights": {
            "1": {"name": "Desk", "modelid": "LCT001", "swversion": "65003148",
                  "type": "Extended color light", "pointsymbol": null,
                  "state": {"on": false}}
        },
        "config": {"name": "hub"},
        "groups": {},
        "schedules": {}
    }"#;

    #[test]
    fn load_populates_registries_in_order() {
        let fake = FakeTransport::new(&[ROOT_WITH_GROUP_ZERO]);
        let mut client = client_with(&fake);
        client.load().expect("load");

        assert_eq!(client.lights().len(), 2);
        assert_eq!(client.groups().len(), 2);
        assert_eq!(client.schedules().len(), 1);
        assert_eq!(fake.call_count(), 1);

        let office = client.group(&GroupId("1".into())).unwrap();
        assert_eq!(office.lights, vec![LightId(1)]);
        assert!(!office.read_only);

        let all = client.group(&GroupId("0".into())).unwrap();
        assert!(all.read_only);

        let config = client.config().unwrap();
        assert_eq!(config.ip_addr, "192.168.1.2");
        assert!(config.whitelist.contains_key("appkey"));

        let schedule = client.schedule(&ScheduleId("9".into())).unwrap();
        assert_eq!(schedule.description, "morning");
        assert_eq!(schedule.command.address, "/api/k/lights/1/state");
    }

    #[test]
    fn load_fetches_implicit_group_zero_when_listing_omits_it() {
        let fake =
            FakeTransport::new(&[ROOT_WITHOUT_GROUP_ZERO, r#"{"name": "All", "lights": ["1"]}"#]);
        let mut client = client_with(&fake);
        client.load().expect("load");

        assert_eq!(fake.call_count(), 2);
        let (path, body, method) = fake.call(1);
        assert_eq!(path, "/groups/0");
        assert_eq!(body, None);
        assert_eq!(method, Method::Get);

        let all = client.group(&GroupId("0".into())).unwrap();
        assert!(all.read_only);
        assert_eq!(all.name, "All");
        assert_eq!(all.lights, vec![LightId(1)]);
    }

    #[test]
    fn load_rejects_groups_referencing_unknown_lights() {
        let root = r#"{
            "lights": {},
            "config": {"name": "hub"},
            "groups": {"1": {"name": "Office", "lights": ["7"]}},
            "schedules": {}
        }"#;
        let fake = FakeTransport::new(&[root]);
        let mut client = client_with(&fake);
        match client.load() {
            Err(HueError::LightNotFound(id)) => assert_eq!(id, LightId(7)),
            other => panic!("expected LightNotFound, got {:?}", other),
        }
    }

    #[test]
    fn set_light_attribute_sends_full_map_and_mirrors_state() {
        let fake = FakeTransport::new(&[
            ROOT_WITH_GROUP_ZERO,
            r#"[{"success": {"/lights/1/state/bri": 200}}]"#,
        ]);
        let mut client = client_with(&fake);
        client.load().expect("load");

        let mut attrs = Map::new();
        attrs.insert("bri".into(), json!(200));
        attrs.insert("on".into(), json!(true));
        client.set_light_attribute(LightId(1), &attrs).expect("set");

        let (path, body, method) = fake.call(1);
        assert_eq!(path, "/lights/1/state");
        assert_eq!(method, Method::Put);
        assert_eq!(body.unwrap(), json!({"bri": 200, "on": true}));

        assert_eq!(client.state_attribute(LightId(1), "bri"), Some(&json!(200)));
        assert_eq!(client.state_attribute(LightId(1), "on"), Some(&json!(true)));
    }

    #[test]
    fn set_light_attribute_with_any_invalid_key_sends_nothing() {
        let fake = FakeTransport::new(&[ROOT_WITH_GROUP_ZERO]);
        let mut client = client_with(&fake);
        client.load().expect("load");
        let calls_after_load = fake.call_count();

        let mut attrs = Map::new();
        attrs.insert("on".into(), json!(true));
        attrs.insert("sat".into(), json!(999));
        match client.set_light_attribute(LightId(1), &attrs) {
            Err(HueError::InvalidAttributeValue { attr, .. }) => assert_eq!(attr, "sat"),
            other => panic!("expected InvalidAttributeValue, got {:?}", other),
        }
        assert_eq!(fake.call_count(), calls_after_load);
        // Cached state untouched, valid key included.
        assert_eq!(client.state_attribute(LightId(1), "on"), Some(&json!(false)));
    }

    #[test]
    fn set_light_attribute_unknown_light() {
        let fake = FakeTransport::new(&[ROOT_WITH_GROUP_ZERO]);
        let mut client = client_with(&fake);
        client.load().expect("load");

        let mut attrs = Map::new();
        attrs.insert("on".into(), json!(true));
        match client.set_light_attribute(LightId(42), &attrs) {
            Err(HueError::LightNotFound(id)) => assert_eq!(id, LightId(42)),
            other => panic!("expected LightNotFound, got {:?}", other),
        }
        assert_eq!(fake.call_count(), 1);
    }

    #[test]
    fn create_group_parses_assigned_id_from_resource_path() {
        let fake = FakeTransport::new(&[
            ROOT_WITH_GROUP_ZERO,
            r#"[{"success": {"id": "/groups/2"}}]"#,
        ]);
        let mut client = client_with(&fake);
        client.load().expect("load");

        let id = client
            .create_group(&[LightId(1), LightId(2)], "Evening")
            .expect("create");
        assert_eq!(id, GroupId("2".into()));

        let (path, body, method) = fake.call(1);
        assert_eq!(path, "/groups");
        assert_eq!(method, Method::Post);
        assert_eq!(body.unwrap(), json!({"lights": ["1", "2"], "name": "Evening"}));

        let group = client.group(&id).unwrap();
        assert_eq!(group.lights, vec![LightId(1), LightId(2)]);
        assert!(!group.read_only);
    }

    #[test]
    fn create_group_without_success_marker_is_hub_operation_error() {
        let fake = FakeTransport::new(&[
            ROOT_WITH_GROUP_ZERO,
            r#"[{"error": {"type": 301, "description": "group table full"}}]"#,
        ]);
        let mut client = client_with(&fake);
        client.load().expect("load");

        match client.create_group(&[LightId(1)], "Overflow") {
            Err(HueError::HubOperation(msg)) => assert!(msg.contains("group table full")),
            other => panic!("expected HubOperation, got {:?}", other),
        }
        assert!(client.group(&GroupId("2".into())).is_none());
    }

    #[test]
    fn delete_group_zero_is_read_only_and_makes_no_network_call() {
        let fake = FakeTransport::new(&[ROOT_WITH_GROUP_ZERO]);
        let mut client = client_with(&fake);
        client.load().expect("load");
        let calls_after_load = fake.call_count();

        match client.delete_group(&GroupId("0".into())) {
            Err(HueError::GroupReadOnly(id)) => assert_eq!(id, GroupId("0".into())),
            other => panic!("expected GroupReadOnly, got {:?}", other),
        }
        assert_eq!(fake.call_count(), calls_after_load);
        assert!(client.group(&GroupId("0".into())).is_some());
    }

    #[test]
    fn delete_group_removes_local_entry_on_confirmed_success() {
        let fake = FakeTransport::new(&[
            ROOT_WITH_GROUP_ZERO,
            r#"[{"success": "/groups/1 deleted"}]"#,
        ]);
        let mut client = client_with(&fake);
        client.load().expect("load");

        client.delete_group(&GroupId("1".into())).expect("delete");
        assert!(client.group(&GroupId("1".into())).is_none());

        let (path, _, method) = fake.call(1);
        assert_eq!(path, "/groups/1");
        assert_eq!(method, Method::Delete);
    }

    #[test]
    fn delete_unknown_group() {
        let fake = FakeTransport::new(&[ROOT_WITH_GROUP_ZERO]);
        let mut client = client_with(&fake);
        client.load().expect("load");

        match client.delete_group(&GroupId("9".into())) {
            Err(HueError::GroupNotFound(id)) => assert_eq!(id, GroupId("9".into())),
            other => panic!("expected GroupNotFound, got {:?}", other),
        }
    }

    #[test]
    fn set_group_lights_updates_membership_after_success() {
        let fake = FakeTransport::new(&[
            ROOT_WITH_GROUP_ZERO,
            r#"[{"success": {"/groups/1/lights": ["1", "2"]}}]"#,
        ]);
        let mut client = client_with(&fake);
        client.load().expect("load");

        client
            .set_group_lights(&GroupId("1".into()), &[LightId(1), LightId(2)])
            .expect("edit");

        let (path, body, method) = fake.call(1);
        assert_eq!(path, "/groups/1");
        assert_eq!(method, Method::Put);
        assert_eq!(body.unwrap(), json!({"lights": ["1", "2"]}));
        let group = client.group(&GroupId("1".into())).unwrap();
        assert_eq!(group.lights, vec![LightId(1), LightId(2)]);
    }

    #[test]
    fn set_group_lights_rejects_read_only_groups_locally() {
        let fake = FakeTransport::new(&[ROOT_WITH_GROUP_ZERO]);
        let mut client = client_with(&fake);
        client.load().expect("load");
        let calls_after_load = fake.call_count();

        match client.set_group_lights(&GroupId("0".into()), &[LightId(1)]) {
            Err(HueError::GroupReadOnly(_)) => {}
            other => panic!("expected GroupReadOnly, got {:?}", other),
        }
        assert_eq!(fake.call_count(), calls_after_load);
    }

    #[test]
    fn create_schedule_expands_repeats_into_independent_schedules() {
        let fake = FakeTransport::new(&[
            ROOT_WITH_GROUP_ZERO,
            r#"[{"success": {"id": "/schedules/10"}}]"#,
            r#"[{"success": {"id": "/schedules/11"}}]"#,
            r#"[{"success": {"id": "/schedules/12"}}]"#,
        ]);
        let mut client = client_with(&fake);
        client.load().expect("load");

        let start = NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(20, 0, 0)
            .unwrap();
        let command = Command::new("/api/k/groups/1/action", json!({"on": false}));
        let repeat = Repeat::new(3, Duration::hours(1));
        let created = client
            .create_schedule("night", &[command.clone()], None, Some(start), Some(&repeat))
            .expect("create");

        assert_eq!(created.len(), 3);
        assert_eq!(fake.call_count(), 4);
        let expected_times = ["2024-06-01T20:00:00", "2024-06-01T21:00:00", "2024-06-01T22:00:00"];
        for (i, expected_time) in expected_times.iter().enumerate() {
            let (path, body, method) = fake.call(i + 1);
            assert_eq!(path, "/schedules");
            assert_eq!(method, Method::Post);
            let body = body.unwrap();
            assert_eq!(body["time"], *expected_time);
            assert_eq!(body["name"], "night");
            assert_eq!(body["description"], DEFAULT_DESCRIPTION);
            assert_eq!(body["command"]["method"], "PUT");
        }

        let last = client.schedule(&ScheduleId("12".into())).unwrap();
        assert_eq!(last.time, start + Duration::hours(2));
        assert_eq!(last.command, command);
    }

    #[test]
    fn schedule_with_multiple_commands_creates_one_schedule_each() {
        let fake = FakeTransport::new(&[
            ROOT_WITH_GROUP_ZERO,
            r#"[{"success": {"id": "/schedules/20"}}]"#,
            r#"[{"success": {"id": "/schedules/21"}}]"#,
        ]);
        let mut client = client_with(&fake);
        client.load().expect("load");

        let start = NaiveDate::from_ymd_opt(2024, 6, 2)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        let commands = [
            Command::new("/api/k/lights/1/state", json!({"on": true})),
            Command::new("/api/k/lights/2/state", json!({"on": true})),
        ];
        let created = client
            .create_schedule("sunrise", &commands, Some("both lamps"), Some(start), None)
            .expect("create");

        assert_eq!(created.len(), 2);
        for id in &created {
            let schedule = client.schedule(id).unwrap();
            assert_eq!(schedule.time, start);
            assert_eq!(schedule.description, "both lamps");
        }
    }

    #[test]
    fn create_schedule_with_bad_repeat_sends_nothing() {
        let fake = FakeTransport::new(&[ROOT_WITH_GROUP_ZERO]);
        let mut client = client_with(&fake);
        client.load().expect("load");
        let calls_after_load = fake.call_count();

        let command = Command::new("/api/k/lights/1/state", json!({"on": true}));
        let zero = Repeat::new(0, Duration::hours(1));
        match client.create_schedule("bad", &[command], None, None, Some(&zero)) {
            Err(HueError::InvalidSchedule(_)) => {}
            other => panic!("expected InvalidSchedule, got {:?}", other),
        }
        assert_eq!(fake.call_count(), calls_after_load);
    }

    #[test]
    fn delete_schedule_round_trip() {
        let fake = FakeTransport::new(&[
            ROOT_WITH_GROUP_ZERO,
            r#"[{"success": "/schedules/9 deleted"}]"#,
        ]);
        let mut client = client_with(&fake);
        client.load().expect("load");

        client.delete_schedule(&ScheduleId("9".into())).expect("delete");
        assert!(client.schedule(&ScheduleId("9".into())).is_none());

        match client.delete_schedule(&ScheduleId("9".into())) {
            Err(HueError::ScheduleNotFound(_)) => {}
            other => panic!("expected ScheduleNotFound, got {:?}", other),
        }
    }

    #[test]
    fn transport_failures_surface_as_hub_unreachable() {
        let fake = FakeTransport::unreachable();
        let mut client = client_with(&fake);
        match client.load() {
            Err(HueError::HubUnreachable(_)) => {}
            other => panic!("expected HubUnreachable, got {:?}", other),
        }
    }

    #[test]
    fn http_status_errors_surface_as_hub_unreachable() {
        struct StatusTransport;

        impl HubTransport for StatusTransport {
            fn exchange(
                &self,
                _path: &str,
                _body: Option<&Value>,
                _method: Method,
            ) -> Result<Vec<u8>, TransportError> {
                Err(TransportError::Http {
                    status: 404,
                    message: "not found".into(),
                })
            }
        }

        let mut client = HueClient::with_transport(StatusTransport);
        match client.load() {
            Err(HueError::HubUnreachable(msg)) => assert!(msg.contains("404")),
            other => panic!("expected HubUnreachable, got {:?}", other),
        }
    }

    #[test]
    fn failed_reload_keeps_previous_registries() {
        let bad_root = r#"{
            "lights": {},
            "config": {"name": "hub"},
            "groups": {"1": {"name": "Office", "lights": ["7"]}},
            "schedules": {}
        }"#;
        let fake = FakeTransport::new(&[ROOT_WITH_GROUP_ZERO, bad_root]);
        let mut client = client_with(&fake);
        client.load().expect("load");

        match client.load() {
            Err(HueError::LightNotFound(id)) => assert_eq!(id, LightId(7)),
            other => panic!("expected LightNotFound, got {:?}", other),
        }

        // Everything from the first load is still in place.
        assert_eq!(client.lights().len(), 2);
        assert_eq!(client.groups().len(), 2);
        assert_eq!(client.schedules().len(), 1);
        assert!(client.group(&GroupId("0".into())).is_some());
        assert_eq!(client.state_attribute(LightId(1), "bri"), Some(&json!(100)));
    }

    #[test]
    fn random_attribute_matches_validator_schema() {
        let fake = FakeTransport::new(&[]);
        let client = client_with(&fake);
        let value = client.random_attribute("hue").expect("random");
        assert!(validate::validate("hue", &value).is_ok());
        match client.random_attribute("nope") {
            Err(HueError::UnknownAttribute(_)) => {}
            other => panic!("expected UnknownAttribute, got {:?}", other),
        }
        assert_eq!(fake.call_count(), 0);
    }

    #[test]
    fn first_success_and_created_id_parse_mutation_responses() {
        let success = first_success(br#"[{"success": {"id": "/schedules/3"}}]"#).unwrap();
        assert_eq!(created_id(&success).unwrap(), "3");

        match first_success(br#"[]"#) {
            Err(HueError::Client(_)) => {}
            other => panic!("expected Client, got {:?}", other),
        }
        match first_success(br#"not json"#) {
            Err(HueError::Client(_)) => {}
            other => panic!("expected Client, got {:?}", other),
        }
    }
}
