//! Action codec: log, comment and the release relatedwork webhook.

use autorule_core::{Args, Error, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::catalog::{ActionKind, Catalog, COMPONENT_ACTION, DEBUG_LOG_PREFIX};
use crate::codec::WebhookCredentials;

/// Argument that asks for debug log entries in front of the webhook.
pub const DEBUG_ARG: &str = "debug";

/// Body the relatedwork endpoint expects, sent as a JSON string.
#[derive(Debug, Serialize, Deserialize)]
struct RelatedWorkBody {
    category: String,
    title: String,
    url: String,
}

/// Fields of the outgoing webhook value this codec reads back.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebhookValue {
    #[serde(default)]
    url: String,
    #[serde(default)]
    custom_body: String,
}

fn require<'a>(args: &'a Args, kind: ActionKind, name: &str) -> Result<&'a str> {
    match args.get(name) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(Error::missing_argument(kind.name(), name)),
    }
}

fn action_node(kind: ActionKind, value: Value) -> Value {
    json!({
        "component": COMPONENT_ACTION,
        "schemaVersion": kind.schema_version(),
        "type": kind.api_type(),
        "value": value,
        "children": [],
        "conditions": [],
        "connectionId": null,
    })
}

// =============================================================================
// Build
// =============================================================================

/// Whether the args ask for debug expansion of a webhook action.
pub fn wants_debug(kind: ActionKind, args: &Args) -> bool {
    kind == ActionKind::AddReleaseRelatedWork
        && args.get(DEBUG_ARG).map(String::as_str) == Some("true")
}

/// Build one action node. `args` must already be alias-resolved.
pub fn build_action(
    kind: ActionKind,
    args: &Args,
    cloud_id: &str,
    webhook: Option<&WebhookCredentials>,
) -> Result<Value> {
    match kind {
        ActionKind::Log => {
            let message = require(args, kind, "message")?;
            Ok(log_node(message))
        }
        ActionKind::Comment => {
            let message = require(args, kind, "message")?;
            Ok(action_node(
                kind,
                json!({
                    "comment": message,
                    "publicComment": false,
                    "commentVisibility": null,
                    "sendNotifications": true,
                    "addCommentOnce": false,
                }),
            ))
        }
        ActionKind::AddReleaseRelatedWork => build_relatedwork(args, cloud_id, webhook),
    }
}

fn log_node(message: &str) -> Value {
    action_node(ActionKind::Log, Value::String(message.to_string()))
}

fn relatedwork_url(cloud_id: &str, version_field: &str) -> String {
    format!(
        "https://api.atlassian.com/ex/jira/{}/rest/api/3/version/{{{{issue.{}.format(\"###\")}}}}/relatedwork",
        cloud_id, version_field
    )
}

struct RelatedWorkArgs<'a> {
    version_field: &'a str,
    body: RelatedWorkBody,
}

fn relatedwork_args(args: &Args) -> Result<RelatedWorkArgs<'_>> {
    let kind = ActionKind::AddReleaseRelatedWork;
    let version_field = require(args, kind, "version_field")?;
    let category = require(args, kind, "category")?;
    let title = require(args, kind, "title")?;
    let url = require(args, kind, "url")?;
    Ok(RelatedWorkArgs {
        version_field,
        body: RelatedWorkBody {
            category: category.to_string(),
            title: title.to_string(),
            url: url.to_string(),
        },
    })
}

fn build_relatedwork(
    args: &Args,
    cloud_id: &str,
    webhook: Option<&WebhookCredentials>,
) -> Result<Value> {
    let kind = ActionKind::AddReleaseRelatedWork;
    let parsed = relatedwork_args(args)?;
    let credentials = webhook
        .ok_or_else(|| Error::missing_credentials(kind.name(), "webhook_user, webhook_token"))?;
    let custom_body = serde_json::to_string(&parsed.body)?;
    let auth = STANDARD.encode(format!("{}:{}", credentials.user, credentials.token));

    Ok(action_node(
        kind,
        json!({
            "contentType": "custom",
            "continueOnErrorEnabled": false,
            "customBody": custom_body,
            "headers": [{
                "headerSecure": true,
                "id": null,
                "name": "Authorization",
                "value": format!("Basic {}", auth),
            }],
            "method": "POST",
            "responseEnabled": false,
            "sendIssue": false,
            "url": relatedwork_url(cloud_id, parsed.version_field),
        }),
    ))
}

/// The four log entries emitted in front of a debug webhook.
pub fn debug_logs(args: &Args, cloud_id: &str) -> Result<Vec<Value>> {
    let parsed = relatedwork_args(args)?;
    let field = parsed.version_field;
    let custom_body = serde_json::to_string(&parsed.body)?;
    let messages = [
        format!("webhook_url = {}", relatedwork_url(cloud_id, field)),
        format!("request_body = {}", custom_body),
        format!("version_field_value = {{{{issue.{}}}}}", field),
        format!("version_id = {{{{issue.{}.format(\"###\")}}}}", field),
    ];
    Ok(messages
        .iter()
        .map(|m| log_node(&format!("{}{}", DEBUG_LOG_PREFIX, m)))
        .collect())
}

// =============================================================================
// Parse
// =============================================================================

/// True when a log node carries one of the generated debug messages.
pub fn is_debug_log(raw: &Value) -> bool {
    raw.get("type").and_then(Value::as_str) == Some(ActionKind::Log.api_type())
        && raw
            .get("value")
            .and_then(Value::as_str)
            .is_some_and(|m| m.starts_with(DEBUG_LOG_PREFIX))
}

/// Recover the arguments of one action node. Aliases are not applied here.
pub fn parse_action(kind: ActionKind, raw: &Value, catalog: &Catalog) -> Result<Args> {
    let value = raw.get("value").unwrap_or(&Value::Null);
    let mut args = Args::new();
    match kind {
        ActionKind::Log => {
            let message = value
                .as_str()
                .ok_or_else(|| Error::malformed("log action value is not a string"))?;
            args.insert("message".to_string(), message.to_string());
        }
        ActionKind::Comment => {
            let message = value
                .get("comment")
                .and_then(Value::as_str)
                .ok_or_else(|| Error::malformed("comment action has no 'comment' string"))?;
            args.insert("message".to_string(), message.to_string());
        }
        ActionKind::AddReleaseRelatedWork => {
            let webhook = WebhookValue::deserialize(value)
                .map_err(|e| Error::malformed(format!("outgoing webhook value: {}", e)))?;
            let field = catalog.relatedwork_field(&webhook.url).ok_or_else(|| {
                Error::unrecognized("outgoing webhook URL (use the raw escape hatch)", &webhook.url)
            })?;
            let body: RelatedWorkBody = serde_json::from_str(&webhook.custom_body)
                .map_err(|e| Error::malformed(format!("relatedwork request body: {}", e)))?;
            args.insert("version_field".to_string(), field.to_string());
            args.insert("category".to_string(), body.category);
            args.insert("title".to_string(), body.title);
            args.insert("url".to_string(), body.url);
        }
    }
    Ok(args)
}
