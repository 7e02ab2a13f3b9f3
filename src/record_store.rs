use serde::Serialize;
use serde::de::DeserializeOwned;
use sonic_rs::JsonValueTrait;

use crate::error::{AppError, Result};
use crate::retry::RetryClient;

/// A page of records from a list call.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub list: Vec<T>,
    #[serde(rename = "pageInfo", default)]
    pub page_info: Option<sonic_rs::Value>,
}

#[derive(Debug, Clone, serde::Deserialize)]
struct CountResponse {
    count: u64,
}

/// Filtering and paging options for a list call.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub where_clause: Option<String>,
    pub limit: u32,
    pub offset: u32,
}

impl ListQuery {
    pub fn filtered(where_clause: impl Into<String>, limit: u32) -> Self {
        Self {
            where_clause: Some(where_clause.into()),
            limit,
            offset: 0,
        }
    }
}

/// Client for the hosted record store's generic table/record REST contract.
/// Every call goes through the resilient [`RetryClient`].
#[derive(Clone)]
pub struct RecordStore {
    retry: RetryClient,
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl RecordStore {
    pub fn new(
        http: reqwest::Client,
        retry: RetryClient,
        base_url: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            retry,
            http,
            base_url: base_url.into(),
            token: token.into(),
        }
    }

    fn records_url(&self, table: &str) -> String {
        format!("{}/api/v2/tables/{}/records", self.base_url, table)
    }

    async fn send(&self, request: reqwest::Request) -> Result<reqwest::Response> {
        let response = self.retry.execute(request).await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::RecordStore { status, body });
        }
        Ok(response)
    }

    /// Lists records from `table`, optionally filtered.
    pub async fn list_records<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &ListQuery,
    ) -> Result<ListResponse<T>> {
        let mut params = vec![
            ("limit", query.limit.to_string()),
            ("shuffle", "0".to_string()),
            ("offset", query.offset.to_string()),
        ];
        if let Some(ref clause) = query.where_clause {
            params.push(("where", clause.clone()));
        }

        let request = self
            .http
            .get(self.records_url(table))
            .header("xc-token", &self.token)
            .query(&params)
            .build()?;

        let body = self.send(request).await?.text().await?;
        sonic_rs::from_str(&body)
            .map_err(|e| AppError::Internal(format!("Record store list decode failed: {}", e)))
    }

    /// Counts records in `table` matching `where_clause`.
    pub async fn count_records(&self, table: &str, where_clause: &str) -> Result<u64> {
        let request = self
            .http
            .get(format!("{}/count", self.records_url(table)))
            .header("xc-token", &self.token)
            .query(&[("where", where_clause)])
            .build()?;

        let body = self.send(request).await?.text().await?;
        let counted: CountResponse = sonic_rs::from_str(&body)
            .map_err(|e| AppError::Internal(format!("Record store count decode failed: {}", e)))?;
        Ok(counted.count)
    }

    /// Creates a record in `table`, returning its assigned id.
    pub async fn create_record<T: Serialize>(&self, table: &str, record: &T) -> Result<i64> {
        let request = self
            .http
            .post(self.records_url(table))
            .header("xc-token", &self.token)
            .json(record)
            .build()?;

        let body = self.send(request).await?.text().await?;
        extract_id(&body)
            .ok_or_else(|| AppError::Internal("Record store create returned no id".to_string()))
    }

    /// Patches a record by identity (the body must carry the record id),
    /// returning the patched id.
    pub async fn patch_record<T: Serialize>(&self, table: &str, record: &T) -> Result<i64> {
        let request = self
            .http
            .patch(self.records_url(table))
            .header("xc-token", &self.token)
            .json(record)
            .build()?;

        let body = self.send(request).await?.text().await?;
        extract_id(&body)
            .ok_or_else(|| AppError::Internal("Record store patch returned no id".to_string()))
    }
}

/// The store answers with `Id` or `id` depending on the table; accept both.
fn extract_id(body: &str) -> Option<i64> {
    let value: sonic_rs::Value = sonic_rs::from_str(body).ok()?;
    value
        .get("Id")
        .and_then(|v| v.as_i64())
        .or_else(|| value.get("id").and_then(|v| v.as_i64()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::RetryPolicy;
    use axum::{Router, http::StatusCode, routing::get};
    use std::time::Duration;

    fn store_for(addr: std::net::SocketAddr) -> RecordStore {
        let http = reqwest::Client::new();
        let retry = RetryClient::new(
            http.clone(),
            RetryPolicy::new(Duration::from_secs(2), 0, Duration::from_millis(1)),
        );
        RecordStore::new(http, retry, format!("http://{addr}"), "token")
    }

    #[test]
    fn extracts_either_id_spelling() {
        assert_eq!(extract_id(r#"{"Id": 12}"#), Some(12));
        assert_eq!(extract_id(r#"{"id": 9}"#), Some(9));
        assert_eq!(extract_id(r#"{"ok": true}"#), None);
    }

    #[tokio::test]
    async fn non_2xx_surfaces_as_record_store_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().route(
            "/api/v2/tables/sessions/records",
            get(|| async { (StatusCode::FORBIDDEN, "bad token") }),
        );
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let store = store_for(addr);
        let err = store
            .list_records::<sonic_rs::Value>("sessions", &ListQuery::default())
            .await
            .unwrap_err();
        match err {
            AppError::RecordStore { status, body } => {
                assert_eq!(status, 403);
                assert_eq!(body, "bad token");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
