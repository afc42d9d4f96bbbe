//! Jira Automation API client implementation.
//!
//! Talks to two surfaces:
//! - the public Automation REST API v1 at
//!   `https://api.atlassian.com/automation/public/jira/<cloud>/rest/v1`
//! - the internal label API on the site itself
//!   (`<site>/gateway/api/automation/internal-api/jira/<cloud>/pro/rest/<project>`)

use std::time::Duration;

use async_trait::async_trait;
use autorule_core::config::ConnectionConfig;
use autorule_core::{
    CreateRuleRequest, Error, Label, Result, RuleApi, RuleState, RuleSummary,
    SetRuleStateRequest, UpdateRuleRequest,
};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::payload::{create_payload, prepare_update};
use crate::wire::{CreateRuleResponse, Myself, RuleEnvelope, RuleSummaryPage, TenantInfo};

/// Host of the public Automation API.
pub const PUBLIC_API_HOST: &str = "https://api.atlassian.com";

const USER_AGENT: &str = "autorule";

fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .expect("Failed to create HTTP client")
}

fn transport_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::RemoteUnavailable(format!("request timed out: {}", e))
    } else {
        Error::RemoteUnavailable(e.to_string())
    }
}

/// Jira Automation API client.
pub struct AutomationClient {
    site_url: String,
    api_base: String,
    cloud_id: String,
    account_id: String,
    email: String,
    token: String,
    client: reqwest::Client,
}

impl AutomationClient {
    /// Connect to the tenant behind `config.site_url`: discovers the cloud id
    /// and the account id of the API user.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        Self::connect_with_api_host(config, PUBLIC_API_HOST).await
    }

    /// Like [`connect`](Self::connect), with the public API served from
    /// `api_host` (for testing with httpmock).
    pub async fn connect_with_api_host(config: &ConnectionConfig, api_host: &str) -> Result<Self> {
        let site_url = config.site_url.trim_end_matches('/').to_string();
        let client = http_client(config.timeout);

        let tenant_url = format!("{}/_edge/tenant_info", site_url);
        debug!(url = tenant_url, "Fetching tenant info");
        let response = client
            .get(&tenant_url)
            .send()
            .await
            .map_err(transport_error)?;
        let tenant: TenantInfo = decode(response).await?;
        if tenant.cloud_id.is_empty() {
            return Err(Error::malformed("tenant info returned an empty cloudId"));
        }

        let myself_url = format!("{}/rest/api/3/myself", site_url);
        debug!(url = myself_url, "Fetching API user");
        let response = client
            .get(&myself_url)
            .basic_auth(&config.email, Some(&config.api_token))
            .send()
            .await
            .map_err(transport_error)?;
        let myself: Myself = decode(response).await?;
        if myself.account_id.is_empty() {
            return Err(Error::malformed("current user has an empty accountId"));
        }

        info!(
            cloud_id = tenant.cloud_id,
            account_id = myself.account_id,
            "Connected to Jira Automation"
        );

        Ok(Self {
            api_base: api_base(api_host, &tenant.cloud_id),
            site_url,
            cloud_id: tenant.cloud_id,
            account_id: myself.account_id,
            email: config.email.clone(),
            token: config.api_token.clone(),
            client,
        })
    }

    /// Create a client with explicit URLs and identity (for testing with
    /// httpmock). Nothing is fetched.
    pub fn with_base_urls(
        site_url: impl Into<String>,
        api_base: impl Into<String>,
        cloud_id: impl Into<String>,
        account_id: impl Into<String>,
        email: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            site_url: site_url.into().trim_end_matches('/').to_string(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            cloud_id: cloud_id.into(),
            account_id: account_id.into(),
            email: email.into(),
            token: token.into(),
            client: http_client(Duration::from_secs(30)),
        }
    }

    pub fn cloud_id(&self) -> &str {
        &self.cloud_id
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    fn internal_base(&self, project_id: &str) -> String {
        format!(
            "{}/gateway/api/automation/internal-api/jira/{}/pro/rest/{}",
            self.site_url, self.cloud_id, project_id
        )
    }

    /// Build request with auth header.
    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .basic_auth(&self.email, Some(&self.token))
    }

    /// Make an authenticated GET request.
    async fn get<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.get_with_query(url, &[]).await
    }

    /// Make an authenticated GET request with query parameters.
    async fn get_with_query<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        debug!(url = url, "Automation GET request");

        let mut builder = self.request(reqwest::Method::GET, url);
        if !query.is_empty() {
            builder = builder.query(query);
        }
        let response = builder.send().await.map_err(transport_error)?;

        decode(response).await
    }

    /// Make an authenticated POST request.
    async fn post<T: serde::de::DeserializeOwned, B: serde::Serialize>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T> {
        debug!(url = url, "Automation POST request");

        let response = self
            .request(reqwest::Method::POST, url)
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;

        decode(response).await
    }

    /// Make an authenticated PUT request; any 2xx (200 or 204) is success.
    async fn put<B: serde::Serialize>(&self, url: &str, body: Option<&B>) -> Result<()> {
        debug!(url = url, "Automation PUT request");

        let mut builder = self.request(reqwest::Method::PUT, url);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let response = builder.send().await.map_err(transport_error)?;

        check_status(response).await.map(|_| ())
    }
}

fn api_base(api_host: &str, cloud_id: &str) -> String {
    format!(
        "{}/automation/public/jira/{}/rest/v1",
        api_host.trim_end_matches('/'),
        cloud_id
    )
}

/// Map non-success responses to [`Error::RemoteRejected`].
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let status_code = status.as_u16();
    let message = response.text().await.unwrap_or_default();
    warn!(
        status = status_code,
        message = message,
        "Automation API error response"
    );
    Err(Error::from_status(status_code, message))
}

async fn decode<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let response = check_status(response).await?;
    response
        .json()
        .await
        .map_err(|e| Error::malformed(format!("Failed to parse response: {}", e)))
}

#[async_trait]
impl RuleApi for AutomationClient {
    async fn list_rules(&self) -> Result<Vec<RuleSummary>> {
        let url = format!("{}/rule/summary", self.api_base);
        let mut rules = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let page: RuleSummaryPage = match &cursor {
                Some(c) => self.get_with_query(&url, &[("cursor", c.as_str())]).await?,
                None => self.get(&url).await?,
            };
            rules.extend(page.data);

            match page.cursor.filter(|c| !c.is_empty()) {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        let rules = rules
            .into_iter()
            .map(|mut r| {
                r.enabled = r.state == RuleState::Enabled.as_str();
                r
            })
            .collect::<Vec<_>>();
        debug!(count = rules.len(), "Listed automation rules");
        Ok(rules)
    }

    async fn get_rule_raw(&self, uuid: &str) -> Result<Value> {
        let url = format!("{}/rule/{}", self.api_base, uuid);
        let envelope: RuleEnvelope = self.get(&url).await?;
        Ok(envelope.rule)
    }

    async fn create_rule(&self, request: CreateRuleRequest) -> Result<String> {
        let url = format!("{}/rule", self.api_base);
        let body = create_payload(&request, &self.cloud_id, &self.account_id);
        let response: CreateRuleResponse = self.post(&url, &body).await?;

        let uuid = response
            .into_uuid()
            .ok_or_else(|| Error::malformed("create rule response has no uuid"))?;
        info!(uuid = uuid, name = request.name, "Created automation rule");
        Ok(uuid)
    }

    async fn update_rule(&self, uuid: &str, request: UpdateRuleRequest) -> Result<()> {
        let current = self.get_rule_raw(uuid).await?;
        let body = prepare_update(&current, &request)?;

        let url = format!("{}/rule/{}", self.api_base, uuid);
        self.put(&url, Some(&body)).await?;
        info!(uuid = uuid, "Updated automation rule");
        Ok(())
    }

    async fn set_rule_state(&self, uuid: &str, enabled: bool) -> Result<()> {
        let url = format!("{}/rule/{}/state", self.api_base, uuid);
        let state = RuleState::from_enabled(enabled);
        self.put(&url, Some(&SetRuleStateRequest { value: state })).await?;
        debug!(uuid = uuid, state = state.as_str(), "Set rule state");
        Ok(())
    }

    async fn list_labels(&self, project_id: &str) -> Result<Vec<Label>> {
        let url = format!("{}/rule-labels", self.internal_base(project_id));
        self.get(&url).await
    }

    async fn add_label_to_rule(&self, project_id: &str, uuid: &str, label_id: u64) -> Result<()> {
        let url = format!(
            "{}/rules/{}/labels/{}",
            self.internal_base(project_id),
            uuid,
            label_id
        );
        self.put::<Value>(&url, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_base() {
        assert_eq!(
            api_base("https://api.atlassian.com/", "c1"),
            "https://api.atlassian.com/automation/public/jira/c1/rest/v1"
        );
    }

    #[test]
    fn test_internal_base() {
        let client = AutomationClient::with_base_urls(
            "https://acme.atlassian.net/",
            "http://localhost",
            "c1",
            "acc-1",
            "bot@example.com",
            "token",
        );
        assert_eq!(
            client.internal_base("10001"),
            "https://acme.atlassian.net/gateway/api/automation/internal-api/jira/c1/pro/rest/10001"
        );
    }

    // =========================================================================
    // Integration tests with httpmock
    // =========================================================================

    mod integration {
        use super::*;
        use httpmock::prelude::*;
        use serde_json::json;

        fn create_client(server: &MockServer) -> AutomationClient {
            AutomationClient::with_base_urls(
                server.base_url(),
                server.base_url(),
                "c1",
                "acc-1",
                "bot@example.com",
                "api-token",
            )
        }

        fn sample_rule_json() -> Value {
            json!({
                "uuid": "r-1",
                "name": "Release notes",
                "state": "ENABLED",
                "created": "2024-01-01T00:00:00Z",
                "updated": "2024-01-02T00:00:00Z",
                "ruleScopeARIs": ["ari:cloud:jira:c1:project/10001"],
                "labels": ["managed-by:terraform"],
                "trigger": {"id": "1", "type": "jira.issue.event.trigger:transitioned"},
                "components": [{"id": "2", "type": "codebarrel.action.log", "value": "hi"}]
            })
        }

        #[tokio::test]
        async fn test_connect() {
            let server = MockServer::start();

            server.mock(|when, then| {
                when.method(GET).path("/_edge/tenant_info");
                then.status(200).json_body(json!({"cloudId": "c-42"}));
            });
            server.mock(|when, then| {
                when.method(GET)
                    .path("/rest/api/3/myself")
                    .header_exists("Authorization");
                then.status(200)
                    .json_body(json!({"accountId": "acc-7", "displayName": "Bot"}));
            });

            let config = ConnectionConfig {
                site_url: format!("{}/", server.base_url()),
                email: "bot@example.com".to_string(),
                api_token: "api-token".to_string(),
                webhook_user: None,
                webhook_token: None,
                timeout: Duration::from_secs(5),
                field_aliases: Default::default(),
            };
            let client = AutomationClient::connect_with_api_host(&config, &server.base_url())
                .await
                .unwrap();

            assert_eq!(client.cloud_id(), "c-42");
            assert_eq!(client.account_id(), "acc-7");
            assert_eq!(
                client.api_base,
                format!("{}/automation/public/jira/c-42/rest/v1", server.base_url())
            );
        }

        #[tokio::test]
        async fn test_connect_unauthorized() {
            let server = MockServer::start();

            server.mock(|when, then| {
                when.method(GET).path("/_edge/tenant_info");
                then.status(200).json_body(json!({"cloudId": "c-42"}));
            });
            server.mock(|when, then| {
                when.method(GET).path("/rest/api/3/myself");
                then.status(401).body("Unauthorized");
            });

            let config = ConnectionConfig {
                site_url: server.base_url(),
                email: "bot@example.com".to_string(),
                api_token: "wrong".to_string(),
                webhook_user: None,
                webhook_token: None,
                timeout: Duration::from_secs(5),
                field_aliases: Default::default(),
            };
            let err = AutomationClient::connect_with_api_host(&config, &server.base_url())
                .await
                .err()
                .unwrap();
            assert_eq!(err.status(), Some(401));
        }

        #[tokio::test]
        async fn test_connect_rejects_empty_identity() {
            for (cloud_id, account_id, expected) in [
                ("", "acc-7", "empty cloudId"),
                ("c-42", "", "empty accountId"),
            ] {
                let server = MockServer::start();
                server.mock(|when, then| {
                    when.method(GET).path("/_edge/tenant_info");
                    then.status(200).json_body(json!({"cloudId": cloud_id}));
                });
                server.mock(|when, then| {
                    when.method(GET).path("/rest/api/3/myself");
                    then.status(200).json_body(json!({"accountId": account_id}));
                });

                let config = ConnectionConfig {
                    site_url: server.base_url(),
                    email: "bot@example.com".to_string(),
                    api_token: "api-token".to_string(),
                    webhook_user: None,
                    webhook_token: None,
                    timeout: Duration::from_secs(5),
                    field_aliases: Default::default(),
                };
                let err = AutomationClient::connect_with_api_host(&config, &server.base_url())
                    .await
                    .err()
                    .unwrap();
                assert!(matches!(err, Error::MalformedPayload { .. }), "{:?}", err);
                assert!(err.to_string().contains(expected), "{}", err);
            }
        }

        #[tokio::test]
        async fn test_list_rules_follows_cursor() {
            let server = MockServer::start();

            let first = server.mock(|when, then| {
                when.method(GET)
                    .path("/rule/summary")
                    .query_param_missing("cursor");
                then.status(200).json_body(json!({
                    "data": [{"uuid": "r-1", "name": "A", "state": "ENABLED"}],
                    "cursor": "page-2"
                }));
            });
            let second = server.mock(|when, then| {
                when.method(GET)
                    .path("/rule/summary")
                    .query_param("cursor", "page-2");
                then.status(200).json_body(json!({
                    "data": [{"uuid": "r-2", "name": "B", "state": "DISABLED"}],
                    "cursor": ""
                }));
            });

            let client = create_client(&server);
            let rules = client.list_rules().await.unwrap();

            first.assert();
            second.assert();
            assert_eq!(rules.len(), 2);
            assert_eq!(rules[0].uuid, "r-1");
            assert!(rules[0].enabled);
            assert_eq!(rules[1].uuid, "r-2");
            assert!(!rules[1].enabled);
        }

        #[tokio::test]
        async fn test_get_rule() {
            let server = MockServer::start();

            server.mock(|when, then| {
                when.method(GET).path("/rule/r-1");
                then.status(200).json_body(json!({"rule": sample_rule_json()}));
            });

            let client = create_client(&server);
            let rule = client.get_rule("r-1").await.unwrap();

            assert_eq!(rule.uuid, "r-1");
            assert!(rule.is_enabled());
            assert_eq!(rule.single_project_id(), Some("10001"));
            assert_eq!(rule.components.len(), 1);
        }

        #[tokio::test]
        async fn test_create_rule() {
            let server = MockServer::start();

            let mock = server.mock(|when, then| {
                when.method(POST)
                    .path("/rule")
                    .body_includes("\"state\":\"DISABLED\"")
                    .body_includes("\"authorAccountId\":\"acc-1\"")
                    .body_includes("ari:cloud:jira:c1:project/10001");
                then.status(201).json_body(json!({"ruleUuid": "r-new"}));
            });

            let client = create_client(&server);
            let uuid = client
                .create_rule(CreateRuleRequest {
                    name: "New".to_string(),
                    project_id: Some("10001".to_string()),
                    trigger: json!({"type": "jira.issue.event.trigger:transitioned"}),
                    components: vec![],
                })
                .await
                .unwrap();

            mock.assert();
            assert_eq!(uuid, "r-new");
        }

        #[tokio::test]
        async fn test_create_rule_without_uuid() {
            let server = MockServer::start();

            server.mock(|when, then| {
                when.method(POST).path("/rule");
                then.status(200).json_body(json!({}));
            });

            let client = create_client(&server);
            let err = client
                .create_rule(CreateRuleRequest {
                    name: "New".to_string(),
                    project_id: None,
                    trigger: json!({}),
                    components: vec![],
                })
                .await
                .unwrap_err();
            assert!(matches!(err, Error::MalformedPayload { .. }));
        }

        #[tokio::test]
        async fn test_update_rule_reads_then_writes() {
            let server = MockServer::start();

            let read = server.mock(|when, then| {
                when.method(GET).path("/rule/r-1");
                then.status(200).json_body(json!({"rule": sample_rule_json()}));
            });
            let write = server.mock(|when, then| {
                when.method(PUT)
                    .path("/rule/r-1")
                    .body_includes("\"name\":\"Renamed\"")
                    .body_includes("\"ruleScopeARIs\":[\"ari:cloud:jira:c1:project/10001\"]");
                then.status(204);
            });

            let client = create_client(&server);
            client
                .update_rule(
                    "r-1",
                    UpdateRuleRequest {
                        name: "Renamed".to_string(),
                        trigger: json!({"type": "jira.issue.event.trigger:transitioned"}),
                        components: vec![json!({"type": "codebarrel.action.log", "value": "new"})],
                    },
                )
                .await
                .unwrap();

            read.assert();
            write.assert();
        }

        #[tokio::test]
        async fn test_update_rule_rejected() {
            let server = MockServer::start();

            server.mock(|when, then| {
                when.method(GET).path("/rule/r-1");
                then.status(200).json_body(json!({"rule": sample_rule_json()}));
            });
            server.mock(|when, then| {
                when.method(PUT).path("/rule/r-1");
                then.status(400).body("Invalid component");
            });

            let client = create_client(&server);
            let err = client
                .update_rule(
                    "r-1",
                    UpdateRuleRequest {
                        name: "x".to_string(),
                        trigger: json!({}),
                        components: vec![],
                    },
                )
                .await
                .unwrap_err();

            assert_eq!(err.status(), Some(400));
            assert_eq!(err.to_string(), "API error: 400 - Invalid component");
        }

        #[tokio::test]
        async fn test_set_rule_state() {
            let server = MockServer::start();

            let mock = server.mock(|when, then| {
                when.method(PUT)
                    .path("/rule/r-1/state")
                    .body_includes("{\"value\":\"DISABLED\"}");
                then.status(200).json_body(json!({}));
            });

            let client = create_client(&server);
            client.set_rule_state("r-1", false).await.unwrap();
            mock.assert();
        }

        #[tokio::test]
        async fn test_list_labels_and_add() {
            let server = MockServer::start();

            server.mock(|when, then| {
                when.method(GET).path(
                    "/gateway/api/automation/internal-api/jira/c1/pro/rest/10001/rule-labels",
                );
                then.status(200).json_body(json!([
                    {"id": 5, "name": "managed-by:terraform"},
                    {"id": 6, "name": "release"}
                ]));
            });
            let add = server.mock(|when, then| {
                when.method(PUT).path(
                    "/gateway/api/automation/internal-api/jira/c1/pro/rest/10001/rules/r-1/labels/5",
                );
                then.status(204);
            });

            let client = create_client(&server);
            let labels = client.list_labels("10001").await.unwrap();
            assert_eq!(labels.len(), 2);
            assert_eq!(labels[0].id, 5);

            client.add_label_to_rule("10001", "r-1", 5).await.unwrap();
            add.assert();
        }

        #[tokio::test]
        async fn test_handle_404() {
            let server = MockServer::start();

            server.mock(|when, then| {
                when.method(GET).path("/rule/missing");
                then.status(404).body("Rule not found");
            });

            let client = create_client(&server);
            let err = client.get_rule_raw("missing").await.unwrap_err();
            assert!(matches!(err, Error::RemoteRejected { status: 404, .. }));
        }

        #[tokio::test]
        async fn test_unreachable_host() {
            let client = AutomationClient::with_base_urls(
                "http://127.0.0.1:1",
                "http://127.0.0.1:1",
                "c1",
                "acc-1",
                "bot@example.com",
                "token",
            );
            let err = client.list_rules().await.unwrap_err();
            assert!(matches!(err, Error::RemoteUnavailable(_)));
        }

        #[tokio::test]
        async fn test_malformed_response() {
            let server = MockServer::start();

            server.mock(|when, then| {
                when.method(GET).path("/rule/r-1");
                then.status(200).body("<html>not json</html>");
            });

            let client = create_client(&server);
            let err = client.get_rule_raw("r-1").await.unwrap_err();
            assert!(matches!(err, Error::MalformedPayload { .. }));
        }
    }
}
