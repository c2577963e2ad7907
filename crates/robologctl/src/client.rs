//! Thin JSON-over-HTTP client for the robolog daemon.

use anyhow::{bail, Context, Result};
use serde_json::Value;

pub struct ApiClient {
    base: String,
    pin: Option<String>,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base: String, pin: Option<String>) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
            pin,
            http: reqwest::Client::new(),
        }
    }

    pub async fn get(&self, path: &str) -> Result<Value> {
        self.send(self.http.get(format!("{}{}", self.base, path)))
            .await
    }

    pub async fn post(&self, path: &str, body: Value) -> Result<Value> {
        self.send(self.http.post(format!("{}{}", self.base, path)).json(&body))
            .await
    }

    pub async fn patch(&self, path: &str, body: Value) -> Result<Value> {
        self.send(self.http.patch(format!("{}{}", self.base, path)).json(&body))
            .await
    }

    pub async fn delete(&self, path: &str, body: Value) -> Result<Value> {
        self.send(
            self.http
                .delete(format!("{}{}", self.base, path))
                .json(&body),
        )
        .await
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<Value> {
        let req = match &self.pin {
            Some(pin) => req.header("x-admin-pin", pin),
            None => req,
        };
        let resp = req
            .send()
            .await
            .context("Daemon not reachable. Is robologd running?")?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            bail!("{}: {}", status, text.trim());
        }
        Ok(serde_json::from_str(&text).unwrap_or(Value::Null))
    }
}
