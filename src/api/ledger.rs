use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{Ledger, SignatureStatus};
use crate::wallet::WalletAddress;

const COMMITMENT: &str = "confirmed";

/// Ledger access over the Solana JSON-RPC API.
#[derive(Clone)]
pub struct SolanaRpc {
    client: Client,
    url: String,
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// Most read methods wrap their payload as `{ context, value }`.
#[derive(Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Deserialize)]
struct BlockhashValue {
    blockhash: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcSignatureStatus {
    err: Option<Value>,
    confirmation_status: Option<String>,
}

impl SolanaRpc {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let response: RpcResponse<T> = self
            .client
            .post(&self.url)
            .json(&RpcRequest {
                jsonrpc: "2.0",
                id: 1,
                method,
                params,
            })
            .send()
            .await
            .with_context(|| format!("Ledger RPC {method} unreachable"))?
            .error_for_status()
            .with_context(|| format!("Ledger RPC {method} returned an error status"))?
            .json()
            .await
            .with_context(|| format!("Failed to parse ledger RPC {method} response"))?;

        if let Some(err) = response.error {
            return Err(anyhow!(
                "Ledger RPC {method} failed ({}): {}",
                err.code,
                err.message
            ));
        }
        response
            .result
            .ok_or_else(|| anyhow!("Ledger RPC {method} returned no result"))
    }
}

fn to_signature_status(status: Option<RpcSignatureStatus>) -> SignatureStatus {
    let Some(status) = status else {
        return SignatureStatus::Pending;
    };
    if let Some(err) = status.err.filter(|err| !err.is_null()) {
        return SignatureStatus::Failed(err.to_string());
    }
    match status.confirmation_status.as_deref() {
        Some("confirmed" | "finalized") => SignatureStatus::Confirmed,
        _ => SignatureStatus::Pending,
    }
}

#[async_trait]
impl Ledger for SolanaRpc {
    async fn latest_blockhash(&self) -> Result<String> {
        let latest: WithContext<BlockhashValue> = self
            .call("getLatestBlockhash", json!([{ "commitment": COMMITMENT }]))
            .await?;
        Ok(latest.value.blockhash)
    }

    async fn signature_status(&self, signature: &str) -> Result<SignatureStatus> {
        let statuses: WithContext<Vec<Option<RpcSignatureStatus>>> = self
            .call(
                "getSignatureStatuses",
                json!([[signature], { "searchTransactionHistory": true }]),
            )
            .await?;
        Ok(to_signature_status(statuses.value.into_iter().next().flatten()))
    }

    async fn balance(&self, wallet: &WalletAddress) -> Result<u64> {
        let balance: WithContext<u64> = self
            .call(
                "getBalance",
                json!([wallet.as_str(), { "commitment": COMMITMENT }]),
            )
            .await?;
        Ok(balance.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statuses(raw: Value) -> SignatureStatus {
        let parsed: RpcResponse<WithContext<Vec<Option<RpcSignatureStatus>>>> =
            serde_json::from_value(raw).unwrap();
        to_signature_status(parsed.result.unwrap().value.into_iter().next().flatten())
    }

    #[test]
    fn unknown_signatures_are_pending() {
        let status = statuses(json!({
            "jsonrpc": "2.0", "id": 1,
            "result": { "context": { "slot": 82 }, "value": [null] }
        }));
        assert_eq!(status, SignatureStatus::Pending);
    }

    #[test]
    fn processed_is_not_yet_confirmed() {
        let status = statuses(json!({
            "jsonrpc": "2.0", "id": 1,
            "result": { "context": { "slot": 82 }, "value": [
                { "slot": 80, "confirmations": 0, "err": null, "confirmationStatus": "processed" }
            ] }
        }));
        assert_eq!(status, SignatureStatus::Pending);
    }

    #[test]
    fn finalized_is_confirmed() {
        let status = statuses(json!({
            "jsonrpc": "2.0", "id": 1,
            "result": { "context": { "slot": 82 }, "value": [
                { "slot": 72, "confirmations": null, "err": null, "confirmationStatus": "finalized" }
            ] }
        }));
        assert_eq!(status, SignatureStatus::Confirmed);
    }

    #[test]
    fn execution_errors_fail_the_payment() {
        let status = statuses(json!({
            "jsonrpc": "2.0", "id": 1,
            "result": { "context": { "slot": 82 }, "value": [
                { "slot": 72, "confirmations": 10, "err": { "InstructionError": [0, { "Custom": 1 }] },
                  "confirmationStatus": "confirmed" }
            ] }
        }));
        assert!(matches!(status, SignatureStatus::Failed(reason) if reason.contains("InstructionError")));
    }

    #[test]
    fn rpc_errors_deserialize() {
        let parsed: RpcResponse<WithContext<u64>> = serde_json::from_value(json!({
            "jsonrpc": "2.0", "id": 1,
            "error": { "code": -32602, "message": "Invalid param: WrongSize" }
        }))
        .unwrap();
        assert!(parsed.result.is_none());
        assert_eq!(parsed.error.unwrap().code, -32602);
    }
}
