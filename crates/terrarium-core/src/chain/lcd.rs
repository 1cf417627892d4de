//! Ledger access over the Cosmos SDK REST (LCD) API.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde_json::{Value, json};
use url::Url;

use super::types::{AccountInfo, BroadcastResult, SignedTx, TxOutcome};
use super::{Ledger, LedgerError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// REST client for one LCD endpoint.
#[derive(Debug, Clone)]
pub struct LcdClient {
    base: Url,
    http: reqwest::Client,
}

impl LcdClient {
    pub fn new(base: Url) -> Result<Self, LedgerError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("terrarium/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| LedgerError::Transport {
                url: base.to_string(),
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            base: with_trailing_slash(base),
            http,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url, LedgerError> {
        Ok(self.base.join(path)?)
    }

    /// Send a request, returning status and body text.
    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        url: &Url,
    ) -> Result<(StatusCode, String), LedgerError> {
        let response = request.send().await.map_err(|e| LedgerError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        let status = response.status();
        let body = response.text().await.map_err(|e| LedgerError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        Ok((status, body))
    }

    async fn get_json(&self, url: Url) -> Result<Value, LedgerError> {
        let (status, body) = self.send(self.http.get(url.clone()), &url).await?;
        expect_json(&url, status, &body)
    }

    async fn post_json(&self, url: Url, payload: &Value) -> Result<Value, LedgerError> {
        let (status, body) = self
            .send(self.http.post(url.clone()).json(payload), &url)
            .await?;
        expect_json(&url, status, &body)
    }
}

#[async_trait]
impl Ledger for LcdClient {
    async fn broadcast_sync(&self, tx: &SignedTx) -> Result<BroadcastResult, LedgerError> {
        let url = self.endpoint("cosmos/tx/v1beta1/txs")?;
        let payload = json!({
            "tx_bytes": STANDARD.encode(&tx.bytes),
            "mode": "BROADCAST_MODE_SYNC",
        });
        let body = self.post_json(url.clone(), &payload).await?;
        parse_broadcast_response(&url, &body)
    }

    async fn tx_by_hash(&self, txhash: &str) -> Result<Option<TxOutcome>, LedgerError> {
        let url = self.endpoint(&format!("cosmos/tx/v1beta1/txs/{}", txhash))?;
        let (status, body) = self.send(self.http.get(url.clone()), &url).await?;

        if is_tx_not_found(status, &body) {
            return Ok(None);
        }
        let value = expect_json(&url, status, &body)?;
        parse_tx_response(&url, &value).map(Some)
    }

    async fn account(&self, address: &str) -> Result<AccountInfo, LedgerError> {
        let url = self.endpoint(&format!("cosmos/auth/v1beta1/accounts/{}", address))?;
        let body = self.get_json(url.clone()).await?;
        parse_account(&url, &body)
    }

    async fn simulate(&self, tx: &SignedTx) -> Result<u64, LedgerError> {
        let url = self.endpoint("cosmos/tx/v1beta1/simulate")?;
        let payload = json!({ "tx_bytes": STANDARD.encode(&tx.bytes) });
        let body = self.post_json(url.clone(), &payload).await?;
        field_u64(&body["gas_info"]["gas_used"])
            .ok_or_else(|| decode_error(&url, "missing gas_info.gas_used"))
    }

    async fn contract_query(&self, address: &str, msg: &Value) -> Result<Value, LedgerError> {
        let query = URL_SAFE.encode(msg.to_string());
        let url = self.endpoint(&format!(
            "cosmwasm/wasm/v1/contract/{}/smart/{}",
            address, query
        ))?;
        let mut body = self.get_json(url).await?;
        Ok(body["data"].take())
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn expect_json(url: &Url, status: StatusCode, body: &str) -> Result<Value, LedgerError> {
    if !status.is_success() {
        return Err(LedgerError::Status {
            url: url.to_string(),
            status: status.as_u16(),
            body: body.to_string(),
        });
    }
    serde_json::from_str(body).map_err(|e| decode_error(url, &e.to_string()))
}

fn decode_error(url: &Url, reason: &str) -> LedgerError {
    LedgerError::Decode {
        url: url.to_string(),
        reason: reason.to_string(),
    }
}

/// LCD versions disagree on how an unknown hash is reported: 404, or an
/// error body mentioning "not found".
fn is_tx_not_found(status: StatusCode, body: &str) -> bool {
    if status == StatusCode::NOT_FOUND {
        return true;
    }
    !status.is_success() && body.to_ascii_lowercase().contains("not found")
}

/// Cosmos encodes 64-bit integers as strings.
fn field_u64(value: &Value) -> Option<u64> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    }
}

fn field_str(value: &Value) -> String {
    value.as_str().unwrap_or_default().to_string()
}

pub(crate) fn parse_broadcast_response(url: &Url, body: &Value) -> Result<BroadcastResult, LedgerError> {
    let response = &body["tx_response"];
    let txhash = response["txhash"]
        .as_str()
        .ok_or_else(|| decode_error(url, "missing tx_response.txhash"))?;

    Ok(BroadcastResult {
        txhash: txhash.to_string(),
        code: field_u64(&response["code"]).unwrap_or(0) as u32,
        raw_log: field_str(&response["raw_log"]),
    })
}

pub(crate) fn parse_tx_response(url: &Url, body: &Value) -> Result<TxOutcome, LedgerError> {
    let response = &body["tx_response"];
    let txhash = response["txhash"]
        .as_str()
        .ok_or_else(|| decode_error(url, "missing tx_response.txhash"))?;

    let timestamp = response["timestamp"]
        .as_str()
        .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
        .map(|ts| ts.with_timezone(&Utc));

    Ok(TxOutcome {
        txhash: txhash.to_string(),
        code: field_u64(&response["code"]).unwrap_or(0) as u32,
        raw_log: field_str(&response["raw_log"]),
        height: field_u64(&response["height"]),
        gas_used: field_u64(&response["gas_used"]),
        timestamp,
    })
}

pub(crate) fn parse_account(url: &Url, body: &Value) -> Result<AccountInfo, LedgerError> {
    let base = find_base_account(&body["account"])
        .ok_or_else(|| decode_error(url, "no base account in response"))?;

    Ok(AccountInfo {
        address: field_str(&base["address"]),
        account_number: field_u64(&base["account_number"])
            .ok_or_else(|| decode_error(url, "missing account_number"))?,
        // Fresh accounts omit the sequence
        sequence: field_u64(&base["sequence"]).unwrap_or(0),
    })
}

/// Vesting accounts nest the base account one or two levels down.
fn find_base_account(value: &Value) -> Option<&Value> {
    let object = value.as_object()?;
    if object.contains_key("account_number") {
        return Some(value);
    }
    object.values().find_map(find_base_account)
}
