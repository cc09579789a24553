//! Wire format of the JSON REST services
//!
//! Requests are wrapped in `{header: {state, policy}, body}`. Responses carry
//! an `output` array plus `ServiceData.modelObjects`, a uid-keyed table of
//! every object the server decided to send along with its properties.
//! A failed call comes back as an exception envelope with a numeric `code`.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::core::reconstruct::{FlatRecord, PropertyTable, RawExpansion};
use crate::error::{TcError, TcResult};
use crate::remote::transport::HttpResponse;

/// Service paths under `JsonRestServices/`
pub mod services {
    pub const LOGIN: &str = "Core-2011-06-Session/login";
    pub const GET_REVISION_RULES: &str = "Cad-2007-01-StructureManagement/getRevisionRules";
    pub const GET_ITEM_FROM_ID: &str = "Core-2007-01-DataManagement/getItemFromId";
    pub const CREATE_BOM_WINDOWS: &str = "Cad-2007-01-StructureManagement/createBOMWindows";
    pub const CLOSE_BOM_WINDOWS: &str = "Cad-2007-01-StructureManagement/closeBOMWindows";
    pub const EXPAND_PS_ALL_LEVELS: &str = "Cad-2007-01-StructureManagement/expandPSAllLevels";
}

/// Wrap a body in the request envelope
pub fn envelope(state: Value, policy: Value, body: Value) -> Value {
    json!({
        "header": {
            "state": state,
            "policy": policy,
        },
        "body": body,
    })
}

/// Session state flags sent with every authenticated call
pub fn client_state() -> Value {
    json!({
        "formatProperties": true,
        "stateless": true,
        "unloadObjects": false,
        "enableServerStateHeaders": true,
        "locale": "en_US",
    })
}

/// Property policy asking for `properties` on objects of `type_name`
pub fn property_policy<'a>(type_name: &str, properties: impl Iterator<Item = &'a str>) -> Value {
    let props: Vec<Value> = properties.map(|p| json!({ "name": p })).collect();
    json!({
        "types": [
            { "name": type_name, "properties": props }
        ]
    })
}

/// Exception envelope returned instead of a normal response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceException {
    pub code: i64,
    pub qname: Option<String>,
    pub message: String,
}

impl ServiceException {
    /// Parse an exception envelope; `None` when the body is a normal response
    pub fn detect(body: &Value) -> Option<Self> {
        let code = body.get("code")?.as_i64()?;
        let qname = body
            .get(".QName")
            .and_then(Value::as_str)
            .map(str::to_string);
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| {
                body.get("messages")
                    .and_then(Value::as_array)
                    .and_then(|m| m.first())
                    .and_then(|m| m.get("message"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or_else(|| format!("server error code {}", code));
        Some(Self {
            code,
            qname,
            message,
        })
    }

    /// Whether this exception means the credentials or the session are no good
    pub fn is_authentication(&self) -> bool {
        self.qname
            .as_deref()
            .is_some_and(|q| q.contains("InvalidCredentials") || q.contains("InvalidUser"))
    }
}

/// Decode a response into `T`
///
/// HTTP 401/403 and authentication exceptions become
/// [`TcError::Authentication`]; other exceptions, error statuses and shape
/// mismatches become [`TcError::Protocol`].
pub fn decode<T: DeserializeOwned>(response: &HttpResponse, operation: &str) -> TcResult<T> {
    if response.status == 401 || response.status == 403 {
        return Err(TcError::Authentication(format!(
            "{} rejected with HTTP {}",
            operation, response.status
        )));
    }

    let value: Value = serde_json::from_str(&response.body).map_err(|e| {
        TcError::Protocol(format!(
            "{} returned HTTP {} with a non-JSON body: {}",
            operation, response.status, e
        ))
    })?;

    if let Some(exception) = ServiceException::detect(&value) {
        return Err(if exception.is_authentication() {
            TcError::Authentication(exception.message)
        } else {
            TcError::Protocol(format!(
                "{} failed ({}): {}",
                operation, exception.code, exception.message
            ))
        });
    }

    if !response.is_success() {
        return Err(TcError::Protocol(format!(
            "{} returned HTTP {}",
            operation, response.status
        )));
    }

    serde_json::from_value(value)
        .map_err(|e| TcError::Protocol(format!("{}: unexpected response shape: {}", operation, e)))
}

/// `{uid, className, type}` reference to a model object
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ObjectRef {
    #[serde(default)]
    pub uid: Option<String>,
}

impl ObjectRef {
    fn uid_of(this: Option<&ObjectRef>) -> Option<&str> {
        this.and_then(|r| r.uid.as_deref()).filter(|u| !u.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PropertyValue {
    #[serde(rename = "dbValues", default)]
    pub db_values: Vec<Value>,
    #[serde(rename = "uiValues", default)]
    pub ui_values: Vec<Value>,
}

impl PropertyValue {
    /// First non-empty display value, falling back to the raw value
    pub fn display(&self) -> Option<String> {
        first_text(&self.ui_values).or_else(|| first_text(&self.db_values))
    }
}

fn first_text(values: &[Value]) -> Option<String> {
    values.iter().find_map(|v| match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelObject {
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(rename = "className", default)]
    pub class_name: Option<String>,
    #[serde(default)]
    pub props: HashMap<String, PropertyValue>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorValue {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub code: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartialError {
    #[serde(rename = "errorValues", default)]
    pub error_values: Vec<ErrorValue>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceData {
    #[serde(rename = "modelObjects", default)]
    pub model_objects: Option<HashMap<String, ModelObject>>,
    #[serde(rename = "partialErrors", default)]
    pub partial_errors: Vec<PartialError>,
}

impl ServiceData {
    pub fn object(&self, uid: &str) -> Option<&ModelObject> {
        self.model_objects.as_ref().and_then(|m| m.get(uid))
    }

    /// Display value of one property of one object
    pub fn display_value(&self, uid: &str, prop: &str) -> Option<String> {
        self.object(uid)
            .and_then(|o| o.props.get(prop))
            .and_then(PropertyValue::display)
    }

    /// First partial error message, if the server reported any
    pub fn first_error(&self) -> Option<&str> {
        self.partial_errors
            .iter()
            .flat_map(|p| p.error_values.iter())
            .map(|e| e.message.as_str())
            .find(|m| !m.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

pub fn login_body(user: &str, password: &str) -> Value {
    envelope(
        json!({}),
        json!({}),
        json!({
            "credentials": {
                "user": user,
                "password": password,
                "role": "",
                "descrimator": "",
                "locale": "",
                "group": "",
            }
        }),
    )
}

// ---------------------------------------------------------------------------
// Revision rules
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RevisionRulesResponse {
    #[serde(default)]
    pub output: Option<Vec<RevisionRuleOutput>>,
    #[serde(rename = "ServiceData", default)]
    pub service_data: Option<ServiceData>,
}

#[derive(Debug, Deserialize)]
pub struct RevisionRuleOutput {
    #[serde(rename = "revRule", default)]
    pub rev_rule: Option<ObjectRef>,
}

pub fn revision_rules_body() -> Value {
    envelope(
        client_state(),
        property_policy("RevisionRule", ["object_name"].into_iter()),
        json!({}),
    )
}

// ---------------------------------------------------------------------------
// Item lookup
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ItemFromIdResponse {
    #[serde(default)]
    pub output: Option<Vec<ItemOutput>>,
    #[serde(rename = "ServiceData", default)]
    pub service_data: Option<ServiceData>,
}

#[derive(Debug, Deserialize)]
pub struct ItemOutput {
    #[serde(default)]
    pub item: Option<ObjectRef>,
    #[serde(rename = "itemRevOutput", default)]
    pub item_rev_output: Vec<ItemRevOutput>,
}

#[derive(Debug, Deserialize)]
pub struct ItemRevOutput {
    #[serde(rename = "itemRevision", default)]
    pub item_revision: Option<ObjectRef>,
}

pub fn item_from_id_body(item_id: &str, revision: &str) -> Value {
    envelope(
        client_state(),
        json!({}),
        json!({
            "infos": [
                { "itemId": item_id, "revIds": [revision] }
            ],
            "nRev": 1,
            "pref": {},
        }),
    )
}

impl ItemFromIdResponse {
    /// `(item uid, revision uid)` of the first match
    pub fn first_match(&self, item_id: &str, revision: &str) -> TcResult<(String, String)> {
        let not_found = || {
            let reason = self
                .service_data
                .as_ref()
                .and_then(ServiceData::first_error)
                .map(|m| format!(": {}", m))
                .unwrap_or_default();
            TcError::NotFound(format!("item {} revision {}{}", item_id, revision, reason))
        };

        let output = self.output.as_ref().ok_or_else(not_found)?;
        let first = output.first().ok_or_else(not_found)?;
        let item_uid = ObjectRef::uid_of(first.item.as_ref())
            .ok_or_else(|| TcError::missing("output[0].item.uid"))?;
        let rev = first.item_rev_output.first().ok_or_else(not_found)?;
        let rev_uid = ObjectRef::uid_of(rev.item_revision.as_ref())
            .ok_or_else(|| TcError::missing("output[0].itemRevOutput[0].itemRevision.uid"))?;
        Ok((item_uid.to_string(), rev_uid.to_string()))
    }
}

// ---------------------------------------------------------------------------
// BOM windows
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreateWindowsResponse {
    #[serde(default)]
    pub output: Option<Vec<WindowOutput>>,
}

#[derive(Debug, Deserialize)]
pub struct WindowOutput {
    #[serde(rename = "bomWindow", default)]
    pub bom_window: Option<ObjectRef>,
    #[serde(rename = "bomLine", default)]
    pub bom_line: Option<ObjectRef>,
}

impl CreateWindowsResponse {
    /// `(window uid, top line uid)`
    pub fn first_window(&self) -> TcResult<(String, String)> {
        let first = self
            .output
            .as_ref()
            .and_then(|o| o.first())
            .ok_or_else(|| TcError::missing("output[0]"))?;
        let window = ObjectRef::uid_of(first.bom_window.as_ref())
            .ok_or_else(|| TcError::missing("output[0].bomWindow.uid"))?;
        let line = ObjectRef::uid_of(first.bom_line.as_ref())
            .ok_or_else(|| TcError::missing("output[0].bomLine.uid"))?;
        Ok((window.to_string(), line.to_string()))
    }
}

pub const CLIENT_ID: &str = "tcbom";

pub fn create_window_body(item_uid: &str, revision_uid: &str, rule_uid: Option<&str>) -> Value {
    let mut info = json!({
        "clientId": CLIENT_ID,
        "item": { "uid": item_uid },
        "itemRev": { "uid": revision_uid },
    });
    if let Some(rule) = rule_uid {
        info["revRuleConfigInfo"] = json!({
            "revRule": { "uid": rule },
            "props": {},
        });
    }
    envelope(client_state(), json!({}), json!({ "info": [info] }))
}

pub fn close_windows_body(window_uids: &[String]) -> Value {
    let windows: Vec<Value> = window_uids.iter().map(|u| json!({ "uid": u })).collect();
    envelope(client_state(), json!({}), json!({ "bomWindows": windows }))
}

// ---------------------------------------------------------------------------
// Full expansion
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ExpandResponse {
    #[serde(default)]
    pub output: Option<Vec<ExpandOutput>>,
    #[serde(rename = "ServiceData", default)]
    pub service_data: Option<ServiceData>,
}

#[derive(Debug, Deserialize)]
pub struct ExpandOutput {
    #[serde(default)]
    pub parent: Option<LineInfo>,
    #[serde(default)]
    pub children: Vec<LineInfo>,
}

#[derive(Debug, Deserialize)]
pub struct LineInfo {
    #[serde(rename = "bomLine", default)]
    pub bom_line: Option<ObjectRef>,
    #[serde(rename = "itemRevOfBOMLine", default)]
    pub item_revision: Option<ObjectRef>,
}

pub fn expand_all_body<'a>(root_line_uid: &str, properties: impl Iterator<Item = &'a str>) -> Value {
    envelope(
        client_state(),
        property_policy("ItemRevision", properties),
        json!({
            "input": {
                "parentBomLines": [ { "uid": root_line_uid } ],
                "excludeFilter": "None",
            },
            "pref": {
                "expItemRev": false,
                "info": [],
            },
        }),
    )
}

impl ExpandResponse {
    /// Normalise into flat records plus a revision property side-table
    pub fn into_raw_expansion(self) -> TcResult<RawExpansion> {
        let output = self.output.ok_or_else(|| TcError::missing("output"))?;
        let service_data = self.service_data.unwrap_or_default();

        let mut records = Vec::with_capacity(output.len());
        for (i, entry) in output.iter().enumerate() {
            let parent = entry
                .parent
                .as_ref()
                .ok_or_else(|| TcError::missing(&format!("output[{}].parent", i)))?;
            let self_ref = ObjectRef::uid_of(parent.bom_line.as_ref())
                .ok_or_else(|| TcError::missing(&format!("output[{}].parent.bomLine.uid", i)))?;
            let revision_ref = ObjectRef::uid_of(parent.item_revision.as_ref()).ok_or_else(|| {
                TcError::missing(&format!("output[{}].parent.itemRevOfBOMLine.uid", i))
            })?;

            let mut child_refs = Vec::with_capacity(entry.children.len());
            for (j, child) in entry.children.iter().enumerate() {
                let uid = ObjectRef::uid_of(child.bom_line.as_ref()).ok_or_else(|| {
                    TcError::missing(&format!("output[{}].children[{}].bomLine.uid", i, j))
                })?;
                child_refs.push(uid.to_string());
            }

            records.push(FlatRecord {
                self_ref: self_ref.to_string(),
                parent_ref: None,
                child_refs,
                revision_ref: revision_ref.to_string(),
            });
        }

        // parent_ref: the first record that lists this line as a child
        let mut parent_of: HashMap<String, String> = HashMap::new();
        for record in &records {
            for child in &record.child_refs {
                parent_of
                    .entry(child.clone())
                    .or_insert_with(|| record.self_ref.clone());
            }
        }
        for record in &mut records {
            record.parent_ref = parent_of.get(&record.self_ref).cloned();
        }

        let mut properties = PropertyTable::new();
        for record in &records {
            if properties.contains_key(&record.revision_ref) {
                continue;
            }
            if let Some(object) = service_data.object(&record.revision_ref) {
                let values: HashMap<String, String> = object
                    .props
                    .iter()
                    .filter_map(|(name, value)| value.display().map(|v| (name.clone(), v)))
                    .collect();
                properties.insert(record.revision_ref.clone(), values);
            }
        }

        Ok(RawExpansion {
            records,
            properties,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_invalid_credentials() {
        let body = json!({
            ".QName": "http://teamcenter.com/Schemas/Soa/2006-03/Exceptions.InvalidCredentialsException",
            "code": 515143,
            "level": 3,
            "message": "The login attempt failed"
        });
        let exc = ServiceException::detect(&body).unwrap();
        assert_eq!(exc.code, 515143);
        assert!(exc.is_authentication());
        assert_eq!(exc.message, "The login attempt failed");
    }

    #[test]
    fn test_normal_body_is_not_exception() {
        assert!(ServiceException::detect(&json!({"output": []})).is_none());
    }

    #[test]
    fn test_decode_maps_401_to_auth() {
        let resp = HttpResponse::new(401, "");
        let err = decode::<Value>(&resp, "expand").unwrap_err();
        assert!(matches!(err, TcError::Authentication(_)));
    }

    #[test]
    fn test_decode_non_json_is_protocol() {
        let resp = HttpResponse::new(200, "<html>maintenance</html>");
        let err = decode::<Value>(&resp, "expand").unwrap_err();
        assert!(matches!(err, TcError::Protocol(_)));
    }

    #[test]
    fn test_property_display_prefers_ui_values() {
        let prop: PropertyValue =
            serde_json::from_value(json!({"dbValues": ["raw"], "uiValues": ["Shown"]})).unwrap();
        assert_eq!(prop.display().as_deref(), Some("Shown"));

        let prop: PropertyValue =
            serde_json::from_value(json!({"dbValues": ["raw"], "uiValues": [""]})).unwrap();
        assert_eq!(prop.display().as_deref(), Some("raw"));

        let prop: PropertyValue = serde_json::from_value(json!({"uiValues": []})).unwrap();
        assert_eq!(prop.display(), None);
    }

    #[test]
    fn test_create_window_body_omits_rule_when_unset() {
        let body = create_window_body("I1", "R1", None);
        assert!(body["body"]["info"][0].get("revRuleConfigInfo").is_none());
        let body = create_window_body("I1", "R1", Some("RR"));
        assert_eq!(body["body"]["info"][0]["revRuleConfigInfo"]["revRule"]["uid"], "RR");
    }

    #[test]
    fn test_expansion_normalises_records() {
        let resp: ExpandResponse = serde_json::from_value(json!({
            "output": [
                {
                    "parent": {"bomLine": {"uid": "L1"}, "itemRevOfBOMLine": {"uid": "R1"}},
                    "children": [
                        {"bomLine": {"uid": "L2"}, "itemRevOfBOMLine": {"uid": "R2"}}
                    ]
                },
                {
                    "parent": {"bomLine": {"uid": "L2"}, "itemRevOfBOMLine": {"uid": "R2"}},
                    "children": []
                }
            ],
            "ServiceData": {
                "modelObjects": {
                    "R1": {"uid": "R1", "props": {"item_id": {"uiValues": ["1001"]}}},
                    "R2": {"uid": "R2", "props": {"item_id": {"dbValues": ["1002"]}}}
                }
            }
        }))
        .unwrap();

        let raw = resp.into_raw_expansion().unwrap();
        assert_eq!(raw.records.len(), 2);
        assert_eq!(raw.records[0].child_refs, vec!["L2"]);
        assert_eq!(raw.records[0].parent_ref, None);
        assert_eq!(raw.records[1].parent_ref.as_deref(), Some("L1"));
        assert_eq!(raw.properties["R2"]["item_id"], "1002");
    }

    #[test]
    fn test_expansion_missing_output_is_protocol() {
        let resp: ExpandResponse = serde_json::from_value(json!({"ServiceData": {}})).unwrap();
        assert!(matches!(
            resp.into_raw_expansion().unwrap_err(),
            TcError::Protocol(_)
        ));
    }

    #[test]
    fn test_item_lookup_empty_output_is_not_found() {
        let resp: ItemFromIdResponse = serde_json::from_value(json!({
            "output": [],
            "ServiceData": {"partialErrors": [{"errorValues": [{"code": 214106, "message": "No item 9999"}]}]}
        }))
        .unwrap();
        let err = resp.first_match("9999", "A").unwrap_err();
        match err {
            TcError::NotFound(msg) => assert!(msg.contains("No item 9999")),
            other => panic!("unexpected {:?}", other),
        }
    }
}
