//! MISP operations exposed to the host platform.
//!
//! Each handler shapes the host's parameters into the request expected by
//! one MISP endpoint and returns the decoded response untouched.

use crate::http::{MispClient, RequestBody};
use crate::mapping::{
    attribute_types, resolve_label, Analysis, Distribution, LabelledCode, ThreatLevel,
};
use crate::payload::{build_payload, is_truthy};
use crate::traits::{ConnectorError, ConnectorResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, error};

/// Every operation the connector can dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    CreateEvent,
    GetEvents,
    GetEvent,
    AddAttributesToEvent,
    DeleteAttribute,
    DeleteEvent,
    AddTag,
    AddTagToEvent,
    RemoveTagFromEvent,
    GetTags,
    RunSearch,
    GetAttributeType,
    GetOrganisations,
    GetUsers,
    GenericRestApiCall,
}

impl Operation {
    pub const ALL: &'static [Operation] = &[
        Operation::CreateEvent,
        Operation::GetEvents,
        Operation::GetEvent,
        Operation::AddAttributesToEvent,
        Operation::DeleteAttribute,
        Operation::DeleteEvent,
        Operation::AddTag,
        Operation::AddTagToEvent,
        Operation::RemoveTagFromEvent,
        Operation::GetTags,
        Operation::RunSearch,
        Operation::GetAttributeType,
        Operation::GetOrganisations,
        Operation::GetUsers,
        Operation::GenericRestApiCall,
    ];

    /// Operation name as used by the host platform.
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::CreateEvent => "create_event",
            Operation::GetEvents => "get_events",
            Operation::GetEvent => "get_event",
            Operation::AddAttributesToEvent => "add_attributes_to_event",
            Operation::DeleteAttribute => "delete_attribute",
            Operation::DeleteEvent => "delete_event",
            Operation::AddTag => "add_tag",
            Operation::AddTagToEvent => "add_tag_to_event",
            Operation::RemoveTagFromEvent => "remove_tag_from_event",
            Operation::GetTags => "get_tags",
            Operation::RunSearch => "run_search",
            Operation::GetAttributeType => "get_attribute_type",
            Operation::GetOrganisations => "get_organisations",
            Operation::GetUsers => "get_users",
            Operation::GenericRestApiCall => "generic_rest_api_call",
        }
    }

    /// Message prefixed to errors raised by this operation.
    pub fn error_context(self) -> Option<&'static str> {
        match self {
            Operation::CreateEvent => Some("Error while creating event in MISP"),
            Operation::GetEvents | Operation::GetEvent => {
                Some("Error while getting event from MISP")
            }
            Operation::AddAttributesToEvent => {
                Some("Error while adding attribute to event in MISP")
            }
            Operation::DeleteAttribute => Some("Error while deleting attribute in MISP"),
            Operation::DeleteEvent => Some("Error while deleting event in MISP"),
            Operation::AddTag => Some("Error while creating tag in MISP"),
            Operation::AddTagToEvent => Some("Error while adding tag to event in MISP"),
            Operation::RemoveTagFromEvent => Some("Error while removing tag from event in MISP"),
            Operation::GetTags => Some("Error while getting tags from MISP"),
            Operation::RunSearch => Some("Error while searching Events/Attributes in MISP"),
            Operation::GetAttributeType
            | Operation::GetOrganisations
            | Operation::GetUsers
            | Operation::GenericRestApiCall => None,
        }
    }

    /// Runs the handler for this operation.
    pub async fn run(
        self,
        client: &MispClient,
        params: &OperationParams,
    ) -> ConnectorResult<Value> {
        let result = match self {
            Operation::CreateEvent => create_event(client, params).await,
            Operation::GetEvents => get_events(client, params).await,
            Operation::GetEvent => get_event(client, params).await,
            Operation::AddAttributesToEvent => add_attributes_to_event(client, params).await,
            Operation::DeleteAttribute => delete_attribute(client, params).await,
            Operation::DeleteEvent => delete_event(client, params).await,
            Operation::AddTag => add_tag(client, params).await,
            Operation::AddTagToEvent => add_tag_to_event(client, params).await,
            Operation::RemoveTagFromEvent => remove_tag_from_event(client, params).await,
            Operation::GetTags => get_tags(client).await,
            Operation::RunSearch => run_search(client, params).await,
            Operation::GetAttributeType => get_attribute_type(params),
            Operation::GetOrganisations => get_organisations(client).await,
            Operation::GetUsers => get_users(client).await,
            Operation::GenericRestApiCall => generic_rest_api_call(client, params).await,
        };

        result.map_err(|e| match self.error_context() {
            Some(context) => e.with_context(context),
            None => e,
        })
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = ConnectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .iter()
            .copied()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| ConnectorError::UnknownOperation(s.to_string()))
    }
}

/// Parameters supplied by the host for one operation call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationParams(Map<String, Value>);

impl OperationParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a parameter.
    pub fn with(mut self, key: &str, value: Value) -> Self {
        self.0.insert(key.to_string(), value);
        self
    }

    /// Gets a parameter value. Explicit `null` reads as absent.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    /// Gets a parameter value, or `null` when absent.
    pub fn value(&self, key: &str) -> Value {
        self.get(key).cloned().unwrap_or(Value::Null)
    }

    /// Gets a parameter as a string. Numbers are rendered as text.
    pub fn get_string(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Gets a required, non-empty parameter as a string.
    pub fn require_string(&self, key: &str) -> ConnectorResult<String> {
        self.get_string(key)
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| {
                ConnectorError::Validation(format!("Missing required parameter: {}", key))
            })
    }
}

impl From<Map<String, Value>> for OperationParams {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for OperationParams {
    type Error = ConnectorError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::default()),
            other => Err(ConnectorError::Validation(format!(
                "Operation parameters must be a JSON object, got: {}",
                other
            ))),
        }
    }
}

/// Reads a required identifier and encodes it as a single path segment.
fn path_id(params: &OperationParams, key: &str) -> ConnectorResult<String> {
    let id = params.require_string(key)?;
    if id == "." || id == ".." {
        return Err(ConnectorError::Validation(format!(
            "Value {} of {} parameter is invalid.",
            id, key
        )));
    }
    Ok(urlencoding::encode(&id).into_owned())
}

fn label_code<T: LabelledCode>(params: &OperationParams, key: &str) -> ConnectorResult<Value> {
    // Codes go out as strings: MISP stores them that way and a numeric zero
    // would be stripped by the payload filter.
    Ok(resolve_label::<T>(params.get(key))?
        .map(|v| Value::String(v.code().to_string()))
        .unwrap_or(Value::Null))
}

/// Keeps only the calendar-date part of an ISO timestamp.
fn date_only(value: Option<&Value>) -> Value {
    match value {
        Some(Value::String(s)) if !s.is_empty() => {
            Value::String(s.split('T').next().unwrap_or_default().to_string())
        }
        _ => Value::Null,
    }
}

/// Reformats a search bound to `YYYY-MM-DD`.
///
/// Accepts RFC 3339 timestamps, naive timestamps, plain dates and epoch
/// seconds.
pub fn format_search_date(value: Option<&Value>) -> ConnectorResult<Option<String>> {
    let date = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(None),
        Some(Value::String(s)) => parse_date(s.trim()),
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
            .map(|dt| dt.date_naive()),
        Some(_) => None,
    };

    date.map(|d| Some(d.format("%Y-%m-%d").to_string()))
        .ok_or_else(|| {
            ConnectorError::Validation(format!(
                "Could not parse date value: {}",
                value.cloned().unwrap_or(Value::Null)
            ))
        })
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

fn additional_attributes(params: &OperationParams) -> ConnectorResult<Map<String, Value>> {
    match params.get("additional_attributes") {
        None => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(Map::new()),
        Some(Value::String(s)) => match serde_json::from_str(s) {
            Ok(Value::Object(map)) => Ok(map),
            _ => Err(ConnectorError::Validation(
                "additional_attributes must be a JSON object".to_string(),
            )),
        },
        Some(_) => Err(ConnectorError::Validation(
            "additional_attributes must be a JSON object".to_string(),
        )),
    }
}

/// Creates an event.
pub async fn create_event(client: &MispClient, params: &OperationParams) -> ConnectorResult<Value> {
    let mut event = Map::new();
    event.insert("date".into(), date_only(params.get("date")));
    event.insert("threat_level_id".into(), label_code::<ThreatLevel>(params, "threat_level")?);
    event.insert("info".into(), params.value("event_info"));
    event.insert("analysis".into(), label_code::<Analysis>(params, "analysis")?);
    event.insert("distribution".into(), label_code::<Distribution>(params, "distribution")?);
    event.insert("published".into(), params.value("published"));

    if let Some(uuid) = params.get("extends_uuid").filter(|v| is_truthy(v)) {
        event.insert("extends_uuid".into(), uuid.clone());
    }
    event.extend(additional_attributes(params)?);

    let payload = build_payload(event)?;
    client.post("events", Value::Object(payload)).await
}

/// Lists events matching a raw search body.
pub async fn get_events(client: &MispClient, params: &OperationParams) -> ConnectorResult<Value> {
    client
        .post("events/index", params.value("searchJSONBody"))
        .await
}

/// Fetches one event.
pub async fn get_event(client: &MispClient, params: &OperationParams) -> ConnectorResult<Value> {
    let event_id = path_id(params, "event_id")?;
    client.get(&format!("events/{}", event_id)).await
}

/// Adds an attribute to an event.
pub async fn add_attributes_to_event(
    client: &MispClient,
    params: &OperationParams,
) -> ConnectorResult<Value> {
    let event_id = path_id(params, "event_id")?;

    let mut attribute = Map::new();
    attribute.insert("value".into(), params.value("value"));
    attribute.insert("type".into(), params.value("type"));
    attribute.insert("category".into(), params.value("category"));
    attribute.insert("distribution".into(), label_code::<Distribution>(params, "distribution")?);
    attribute.insert("to_ids".into(), params.value("to_ids"));
    attribute.insert("comment".into(), params.value("comment"));

    let payload = build_payload(attribute)?;
    client
        .post(&format!("attributes/add/{}", event_id), Value::Object(payload))
        .await
}

/// Deletes an attribute.
pub async fn delete_attribute(
    client: &MispClient,
    params: &OperationParams,
) -> ConnectorResult<Value> {
    let attribute_id = path_id(params, "attribute_id")?;
    client
        .post_empty(&format!("attributes/delete/{}", attribute_id))
        .await
}

/// Deletes an event.
pub async fn delete_event(client: &MispClient, params: &OperationParams) -> ConnectorResult<Value> {
    let event_id = path_id(params, "event_id")?;
    client.delete(&format!("events/delete/{}", event_id)).await
}

fn tag_request(params: &OperationParams) -> Value {
    json!({
        "request": {
            "Event": {
                "id": params.value("event_id"),
                "tag": params.value("tag"),
            }
        }
    })
}

/// Accepts a tag response only if MISP reports it as saved.
fn ensure_saved(response: Value) -> ConnectorResult<Value> {
    if response.get("saved").map(is_truthy).unwrap_or(false) {
        return Ok(response);
    }

    let message = match response.get("errors") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "Request was not saved".to_string(),
        Some(other) => other.to_string(),
    };
    error!("{}", message);
    Err(ConnectorError::Remote(message))
}

/// Attaches a tag to an event.
pub async fn add_tag_to_event(
    client: &MispClient,
    params: &OperationParams,
) -> ConnectorResult<Value> {
    let response = client.post("events/addTag", tag_request(params)).await?;
    ensure_saved(response)
}

/// Detaches a tag from an event.
pub async fn remove_tag_from_event(
    client: &MispClient,
    params: &OperationParams,
) -> ConnectorResult<Value> {
    let response = client.post("events/removeTag", tag_request(params)).await?;
    ensure_saved(response)
}

/// Lists tags.
pub async fn get_tags(client: &MispClient) -> ConnectorResult<Value> {
    client.get("tags").await
}

/// Creates a tag.
pub async fn add_tag(client: &MispClient, params: &OperationParams) -> ConnectorResult<Value> {
    let mut tag = Map::new();
    for key in ["name", "exportable", "hide_tag", "org_id", "user_id", "colour"] {
        tag.insert(key.into(), params.value(key));
    }
    let payload = build_payload(tag)?;
    client.post("tags/add", Value::Object(payload)).await
}

/// Builds the restSearch body for a basic or advanced search.
pub fn search_payload(params: &OperationParams) -> ConnectorResult<Map<String, Value>> {
    let payload = match params.get_string("search_type").as_deref() {
        Some("Advanced") => match params.value("search_filter") {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(ConnectorError::Validation(format!(
                    "search_filter must be a JSON object, got: {}",
                    other
                )))
            }
        },
        Some("Basic") => {
            let mut basic = Map::new();
            basic.insert("page".into(), params.get("page").cloned().unwrap_or(json!(1)));
            basic.insert("limit".into(), params.get("limit").cloned().unwrap_or(json!(10)));
            basic.insert(
                "from".into(),
                format_search_date(params.get("from"))?.map_or(Value::Null, Value::String),
            );
            basic.insert(
                "to".into(),
                format_search_date(params.get("to"))?.map_or(Value::Null, Value::String),
            );
            basic.insert("type".into(), params.get("type").cloned().unwrap_or(json!("")));
            basic
        }
        _ => Map::new(),
    };
    build_payload(payload)
}

/// Searches events or attributes.
pub async fn run_search(client: &MispClient, params: &OperationParams) -> ConnectorResult<Value> {
    let payload = search_payload(params)?;
    let path = match params.get_string("controller").as_deref() {
        Some("Events") => "events/restSearch",
        _ => "attributes/restSearch",
    };
    client.post(path, Value::Object(payload)).await
}

/// Lists organisations.
pub async fn get_organisations(client: &MispClient) -> ConnectorResult<Value> {
    client.get("organisations").await
}

/// Lists users.
pub async fn get_users(client: &MispClient) -> ConnectorResult<Value> {
    client.get("admin/users").await
}

/// Looks up the attribute types allowed in a category. No network call.
pub fn get_attribute_type(params: &OperationParams) -> ConnectorResult<Value> {
    let types = params
        .get_string("category")
        .and_then(|category| attribute_types(&category));
    Ok(types.map_or(Value::Null, |t| json!(t)))
}

/// Calls an arbitrary MISP endpoint.
pub async fn generic_rest_api_call(
    client: &MispClient,
    params: &OperationParams,
) -> ConnectorResult<Value> {
    let method = params.require_string("method")?;
    let method = Method::from_bytes(method.trim().to_uppercase().as_bytes())
        .map_err(|_| ConnectorError::Validation(format!("Invalid HTTP method: {}", method)))?;

    let mut endpoint = params.get_string("endpoint").unwrap_or_default();
    if !endpoint.starts_with('/') {
        endpoint.insert(0, '/');
    }

    let query = match params.get("query_params") {
        Some(Value::Object(map)) => Some(map.clone()),
        None => None,
        Some(other) => {
            return Err(ConnectorError::Validation(format!(
                "query_params must be a JSON object, got: {}",
                other
            )))
        }
    };

    let body = match params.get("payload") {
        None => None,
        Some(Value::String(text)) => Some(RequestBody::Text(text.clone())),
        Some(value) => Some(RequestBody::from(value.clone())),
    };

    debug!(method = %method, endpoint = %endpoint, "Generic REST call");
    client
        .request(method, &endpoint, body, query.as_ref())
        .await
}

/// Connectivity probe used by the health check.
pub async fn login(client: &MispClient) -> ConnectorResult<Value> {
    client.get("events").await
}
