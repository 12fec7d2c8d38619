//! Inventory from hosts linked to a Zabbix template.
//!
//! Three JSON-RPC calls against the Zabbix API:
//! `user.login` for a session, `template.get` to resolve the template name,
//! then `host.get` for every host linked to that template.

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::schema::ZabbixConfig;
use crate::inventory::{Inventory, InventoryError};
use crate::orchestrator::Host;

#[derive(Debug, Deserialize)]
struct RpcReply {
    result: Option<Value>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
    #[serde(default)]
    data: String,
}

pub struct ZabbixInventory {
    client: Client,
    config: ZabbixConfig,
}

impl ZabbixInventory {
    pub fn new(config: ZabbixConfig) -> Result<Self, InventoryError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    async fn call(
        &self,
        method: &str,
        params: Value,
        auth: Option<&str>,
    ) -> Result<Value, InventoryError> {
        let mut body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1,
        });
        if let Some(auth) = auth {
            body["auth"] = Value::from(auth);
        }

        let reply: RpcReply = self
            .client
            .post(&self.config.url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        unwrap_reply(method, reply)
    }

    async fn login(&self) -> Result<String, InventoryError> {
        let result = self
            .call(
                "user.login",
                json!({ "user": self.config.user, "password": self.config.password }),
                None,
            )
            .await?;
        session_id(&result)
    }

    async fn template_id(&self, session: &str) -> Result<String, InventoryError> {
        let result = self
            .call(
                "template.get",
                json!({
                    "output": "templateids",
                    "filter": { "host": [self.config.template_name] },
                }),
                Some(session),
            )
            .await?;
        first_template_id(&result, &self.config.template_name)
    }

    async fn template_hosts(
        &self,
        session: &str,
        template_id: &str,
    ) -> Result<BTreeSet<Host>, InventoryError> {
        let result = self
            .call(
                "host.get",
                json!({ "output": ["host"], "templateids": template_id }),
                Some(session),
            )
            .await?;
        host_names(&result)
    }
}

#[async_trait]
impl Inventory for ZabbixInventory {
    async fn list_target_hosts(&self) -> Result<BTreeSet<Host>, InventoryError> {
        let session = self.login().await?;
        let template_id = self.template_id(&session).await?;
        let hosts = self.template_hosts(&session, &template_id).await?;

        tracing::info!(
            template = %self.config.template_name,
            template_id = %template_id,
            hosts = hosts.len(),
            "Loaded hosts from Zabbix"
        );
        Ok(hosts)
    }
}

fn unwrap_reply(method: &str, reply: RpcReply) -> Result<Value, InventoryError> {
    if let Some(error) = reply.error {
        let message = if error.data.is_empty() {
            error.message
        } else {
            format!("{} {}", error.message, error.data)
        };
        return Err(InventoryError::Api {
            method: method.to_string(),
            code: error.code,
            message,
        });
    }
    reply.result.ok_or_else(|| InventoryError::Response {
        method: method.to_string(),
        detail: "missing result".to_string(),
    })
}

fn session_id(result: &Value) -> Result<String, InventoryError> {
    match result.as_str() {
        Some(id) if !id.is_empty() => Ok(id.to_string()),
        _ => Err(InventoryError::Response {
            method: "user.login".to_string(),
            detail: format!("no session id in {result}"),
        }),
    }
}

fn first_template_id(result: &Value, template_name: &str) -> Result<String, InventoryError> {
    result
        .as_array()
        .and_then(|templates| templates.first())
        .and_then(|t| t.get("templateid"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| InventoryError::TemplateNotFound(template_name.to_string()))
}

fn host_names(result: &Value) -> Result<BTreeSet<Host>, InventoryError> {
    let entries = result.as_array().ok_or_else(|| InventoryError::Response {
        method: "host.get".to_string(),
        detail: format!("expected an array, got {result}"),
    })?;

    Ok(entries
        .iter()
        .filter_map(|entry| entry.get("host").and_then(Value::as_str))
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(Host::from)
        .collect())
}
