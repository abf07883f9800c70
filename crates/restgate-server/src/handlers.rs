//! Request handling: decoding, authentication and ACL gates, and the
//! four resource actions.

use std::collections::HashMap;
use std::sync::LazyLock;

use axum::body::{Body, to_bytes};
use axum::extract::{Path, Request, State};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use regex::Regex;
use serde_json::{Value, json};

use restgate_auth::{
    API_KEY_PARAM, AUTH_PARAM, AuthMode, Identity, RequestCredentials, SECRET_KEY_PARAM,
};
use restgate_core::{ErrorBody, RequestParams};
use restgate_query::{EndpointQuery, build_query_spec};
use restgate_storage::{FilterableQuery, apply_spec};

use crate::error::{ApiError, error_value};
use crate::format::{OutputFormat, render};
use crate::state::AppState;

/// Parameters consumed by the front-end layer itself; excluded from
/// record payloads on create and update.
const RESERVED_PARAMS: &[&str] = &[
    API_KEY_PARAM,
    SECRET_KEY_PARAM,
    AUTH_PARAM,
    "method",
    "format",
    "callback",
    "suppressResponseCodes",
    "attachment",
    "offset",
    "limit",
    "sort",
    "order",
    "fields",
    "filters",
];

/// Verbs the action map supports, advertised on 405 responses.
const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE";

const BODY_LIMIT: usize = 1024 * 1024;

static ATTACHMENT_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-\p{L}\p{N}_, ]+$").expect("attachment name pattern"));

/// The REST actions verbs map to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Index,
    Create,
    Update,
    Delete,
}

impl Action {
    fn from_method(method: &Method) -> Option<Self> {
        if *method == Method::GET {
            Some(Self::Index)
        } else if *method == Method::POST {
            Some(Self::Create)
        } else if *method == Method::PUT {
            Some(Self::Update)
        } else if *method == Method::DELETE {
            Some(Self::Delete)
        } else {
            None
        }
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Index => "index",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    const fn mutates(self) -> bool {
        !matches!(self, Self::Index)
    }
}

/// Rendering decisions carried from the request parameters.
#[derive(Debug, Clone, Default)]
struct OutputContext {
    format: OutputFormat,
    suppress: bool,
    callback: Option<String>,
    attachment: Option<String>,
}

impl OutputContext {
    fn from_params(params: &RequestParams) -> Result<Self, ApiError> {
        let format = match params.non_empty("format") {
            Some(name) => OutputFormat::from_name(name).ok_or(ApiError::UnknownFormat)?,
            None => OutputFormat::Json,
        };
        let attachment = params
            .non_empty("attachment")
            .filter(|name| ATTACHMENT_NAME.is_match(name))
            .map(ToString::to_string);
        Ok(Self {
            format,
            suppress: params.flag("suppressResponseCodes"),
            callback: params.non_empty("callback").map(ToString::to_string),
            attachment,
        })
    }
}

/// Single entry point for `/{resource}`: resolves the effective method,
/// merges parameters, authenticates, authorizes, and runs the action.
pub async fn handle(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    request: Request,
) -> Response {
    let (parts, body) = request.into_parts();

    let query: HashMap<String, String> = parts
        .uri
        .query()
        .map(|raw| {
            url::form_urlencoded::parse(raw.as_bytes())
                .into_owned()
                .collect()
        })
        .unwrap_or_default();

    let method = effective_method(&parts.method, &query, &parts.headers);
    let Some(action) = Action::from_method(&method) else {
        return method_not_allowed();
    };

    let mut params = RequestParams::from_pairs(query.clone());
    if action.mutates() {
        match read_body_params(&parts.headers, body).await {
            Ok(body_params) => params.merge(body_params),
            Err(error) => return respond_error(error, &OutputContext::default()),
        }
    }

    let context = match OutputContext::from_params(&params) {
        Ok(context) => context,
        Err(error) => return respond_error(error, &OutputContext::default()),
    };

    let credentials = extract_credentials(&parts.headers, &query);

    let response = match run_action(&state, &resource, action, &params, &credentials).await {
        Ok(data) => respond(data, StatusCode::OK, &context),
        Err(error) => respond_error(error, &context),
    };
    finalize(response, action)
}

async fn run_action(
    state: &AppState,
    resource: &str,
    action: Action,
    params: &RequestParams,
    credentials: &RequestCredentials,
) -> Result<Value, ApiError> {
    let identity = state.engine.authenticate(credentials).await?;

    let endpoint = state
        .config
        .endpoints
        .get(resource)
        .ok_or(ApiError::UnknownResource)?;
    authorize(state, &identity, resource, action)?;

    match action {
        Action::Index => index(state, resource, endpoint, params).await,
        Action::Create => create(state, resource, params).await,
        Action::Update => update(state, resource, params).await,
        Action::Delete => delete(state, resource, params).await,
    }
}

fn authorize(
    state: &AppState,
    identity: &Identity,
    resource: &str,
    action: Action,
) -> Result<(), ApiError> {
    // With authentication off there is no user context to authorize.
    if state.engine.mode() == AuthMode::Off {
        return Ok(());
    }
    let action_name = format!("{resource}.{}", action.name());
    if state.acl.can(identity, &action_name) {
        Ok(())
    } else {
        tracing::debug!(action = %action_name, user = ?identity.id, "action not permitted");
        Err(ApiError::Forbidden)
    }
}

// =============================================================================
// Actions
// =============================================================================

async fn index(
    state: &AppState,
    resource: &str,
    endpoint: &EndpointQuery,
    params: &RequestParams,
) -> Result<Value, ApiError> {
    let spec = build_query_spec(params, endpoint)?;
    let mut query = state.store.query(resource).await;
    apply_spec(&spec, &mut query);
    let records = query.execute().await?;
    let data: Vec<Value> = records.iter().map(|record| spec.project(record)).collect();
    Ok(Value::Array(data))
}

async fn create(state: &AppState, resource: &str, params: &RequestParams) -> Result<Value, ApiError> {
    let record = record_from_params(params);
    Ok(state.store.insert(resource, record).await)
}

async fn update(state: &AppState, resource: &str, params: &RequestParams) -> Result<Value, ApiError> {
    let id = params
        .non_empty("id")
        .ok_or_else(|| ApiError::missing_field("id"))?;
    let patch = record_from_params(params);
    Ok(state
        .store
        .update(resource, id, &patch)
        .await
        .unwrap_or(Value::Null))
}

async fn delete(state: &AppState, resource: &str, params: &RequestParams) -> Result<Value, ApiError> {
    let id = params
        .non_empty("id")
        .ok_or_else(|| ApiError::missing_field("id"))?;
    if state.store.delete(resource, id).await {
        Ok(json!({ "id": id, "deleted": true }))
    } else {
        Ok(Value::Null)
    }
}

fn record_from_params(params: &RequestParams) -> Value {
    let mut record = serde_json::Map::new();
    for (key, value) in params.iter() {
        if !RESERVED_PARAMS.contains(&key) {
            record.insert(key.to_string(), Value::String(value.to_string()));
        }
    }
    Value::Object(record)
}

// =============================================================================
// Request decoding
// =============================================================================

/// Resolves the effective method: a `method=` query parameter rewrites a
/// GET, otherwise the `X-HTTP-Method-Override` header is honored.
fn effective_method(
    method: &Method,
    query: &HashMap<String, String>,
    headers: &HeaderMap,
) -> Method {
    if *method == Method::GET
        && let Some(name) = query.get("method")
    {
        return match name.to_ascii_uppercase().as_str() {
            "POST" => Method::POST,
            "PUT" => Method::PUT,
            "DELETE" => Method::DELETE,
            _ => Method::GET,
        };
    }
    if let Some(value) = headers
        .get("x-http-method-override")
        .and_then(|value| value.to_str().ok())
        && let Ok(parsed) = Method::from_bytes(value.to_ascii_uppercase().as_bytes())
    {
        return parsed;
    }
    method.clone()
}

/// Decodes body parameters for mutating methods: JSON bodies by content
/// type, urlencoded forms otherwise.
async fn read_body_params(headers: &HeaderMap, body: Body) -> Result<RequestParams, ApiError> {
    let bytes = to_bytes(body, BODY_LIMIT)
        .await
        .map_err(|_| ApiError::InvalidBody)?;
    if bytes.is_empty() {
        return Ok(RequestParams::new());
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");
    if content_type.contains("application/json") {
        let value: Value = serde_json::from_slice(&bytes).map_err(|_| ApiError::InvalidBody)?;
        Ok(RequestParams::from_json(&value))
    } else {
        Ok(RequestParams::from_pairs(
            url::form_urlencoded::parse(&bytes).into_owned(),
        ))
    }
}

fn extract_credentials(headers: &HeaderMap, query: &HashMap<String, String>) -> RequestCredentials {
    let mut credentials = RequestCredentials::new();
    for name in [API_KEY_PARAM, SECRET_KEY_PARAM, AUTH_PARAM] {
        if let Some(value) = headers.get(name).and_then(|value| value.to_str().ok()) {
            credentials.insert_header(name, value);
        }
        if let Some(value) = query.get(name) {
            credentials.insert_query(name, value.clone());
        }
    }
    credentials
}

// =============================================================================
// Response rendering
// =============================================================================

/// Renders a successful action result, converting an empty 200 into a
/// 404 "No records found".
fn respond(data: Value, code: StatusCode, context: &OutputContext) -> Response {
    if code == StatusCode::OK && payload_is_empty(&data) {
        let body = ErrorBody::new(404, "No records found");
        return respond_with(error_value(&body), StatusCode::NOT_FOUND, context);
    }
    respond_with(data, code, context)
}

fn respond_error(error: ApiError, context: &OutputContext) -> Response {
    tracing::debug!(error = %error, "request failed");
    respond_with(error_value(&error.body()), error.status(), context)
}

fn respond_with(mut data: Value, code: StatusCode, context: &OutputContext) -> Response {
    let actual_code = code;
    let status = if context.suppress {
        // Clients that cannot handle non-200 codes get the real code in
        // the payload instead.
        if let Value::Object(map) = &mut data {
            map.insert("responseCode".to_string(), json!(actual_code.as_u16()));
        }
        StatusCode::OK
    } else {
        code
    };

    let rendered = match render(context.format, &data) {
        Ok(rendered) => rendered,
        Err(error) => {
            tracing::error!(error = %error, "output rendering failed");
            return fallback_error();
        }
    };
    let rendered = if let Some(callback) = &context.callback
        && context.format == OutputFormat::Json
        && actual_code == StatusCode::OK
    {
        format!("{callback}({rendered})")
    } else {
        rendered
    };

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(context.format.mime()),
    );
    if actual_code == StatusCode::UNAUTHORIZED {
        headers.insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("None"));
    }
    if let Some(name) = &context.attachment
        && let Ok(value) = HeaderValue::from_str(&format!(
            "attachment; filename={name}.{}",
            context.format.extension()
        ))
    {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    (status, headers, rendered).into_response()
}

fn payload_is_empty(data: &Value) -> bool {
    match data {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn method_not_allowed() -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(header::ALLOW, HeaderValue::from_static(ALLOWED_METHODS));
    (StatusCode::METHOD_NOT_ALLOWED, headers, Body::empty()).into_response()
}

fn fallback_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        [(header::CONTENT_TYPE, "application/json")],
        r#"{"code":500,"error":"An internal error has occurred"}"#,
    )
        .into_response()
}

fn finalize(mut response: Response, action: Action) -> Response {
    if action.mutates() {
        response.headers_mut().insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-cache, no-store, max-age=0, must-revalidate"),
        );
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_param_rewrites_get_only() {
        let headers = HeaderMap::new();
        let query = HashMap::from([("method".to_string(), "delete".to_string())]);
        assert_eq!(
            effective_method(&Method::GET, &query, &headers),
            Method::DELETE
        );
        // A method param on a POST is ignored.
        assert_eq!(
            effective_method(&Method::POST, &query, &headers),
            Method::POST
        );
        // Unknown method names leave the GET in place.
        let query = HashMap::from([("method".to_string(), "PATCH".to_string())]);
        assert_eq!(effective_method(&Method::GET, &query, &headers), Method::GET);
    }

    #[test]
    fn override_header_applies_without_method_param() {
        let mut headers = HeaderMap::new();
        headers.insert("x-http-method-override", HeaderValue::from_static("PUT"));
        assert_eq!(
            effective_method(&Method::POST, &HashMap::new(), &headers),
            Method::PUT
        );
    }

    #[test]
    fn attachment_names_are_validated() {
        let params = RequestParams::from_pairs([("attachment", "my report_1")]);
        let context = OutputContext::from_params(&params).unwrap();
        assert_eq!(context.attachment.as_deref(), Some("my report_1"));

        let params = RequestParams::from_pairs([("attachment", "../etc/passwd")]);
        let context = OutputContext::from_params(&params).unwrap();
        assert!(context.attachment.is_none());
    }

    #[test]
    fn unknown_format_is_an_error() {
        let params = RequestParams::from_pairs([("format", "yaml")]);
        assert!(matches!(
            OutputContext::from_params(&params),
            Err(ApiError::UnknownFormat)
        ));
    }

    #[test]
    fn reserved_params_are_excluded_from_records() {
        let params = RequestParams::from_pairs([
            ("apiKey", "key-1"),
            ("format", "json"),
            ("name", "alice"),
        ]);
        let record = record_from_params(&params);
        assert_eq!(record, json!({"name": "alice"}));
    }

    #[test]
    fn empty_payload_detection() {
        assert!(payload_is_empty(&Value::Null));
        assert!(payload_is_empty(&json!([])));
        assert!(payload_is_empty(&json!({})));
        assert!(!payload_is_empty(&json!([1])));
        assert!(!payload_is_empty(&json!("x")));
    }
}
