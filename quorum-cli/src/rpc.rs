// This file is part of Gear.
//
// Copyright (C) 2025 Gear Technologies Inc.
// SPDX-License-Identifier: GPL-3.0-or-later WITH Classpath-exception-2.0
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! JSON-RPC collaborators backing the workflows.
//!
//! Every ledger chain is served under `{endpoint}/ext/bc/{chain}` with methods
//! namespaced per chain, node-level APIs under `/ext/info` and `/ext/health`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use jsonrpsee::{
    core::{ClientError, client::ClientT, params::ObjectParams},
    http_client::{HttpClient, HttpClientBuilder},
};
use quorum::{
    multisig::{SignedTransaction, SubmitReceipt, Submitter},
    transfer::{Leg, LegError, LegExecutor, LegParams, LegReceipt},
};
use quorum_signer::{Address, Signer};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::time::Duration;
use tokio::time::{Instant, sleep};
use url::Url;

/// How often a pending leg's status is polled.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("failed to encode request: {0}")]
    Encode(String),
}

impl From<serde_json::Error> for RpcError {
    fn from(err: serde_json::Error) -> Self {
        Self::Encode(err.to_string())
    }
}

/// HTTP JSON-RPC client rooted at a node endpoint.
#[derive(Clone, Debug)]
pub struct RpcClient {
    base: Url,
    timeout: Duration,
}

impl RpcClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let mut base =
            Url::parse(endpoint).with_context(|| format!("invalid endpoint '{endpoint}'"))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self { base, timeout })
    }

    pub fn endpoint(&self) -> &str {
        self.base.as_str()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Client for one API path below the endpoint, e.g. `ext/bc/P`.
    fn api(&self, path: &str) -> Result<HttpClient, RpcError> {
        let url = self
            .base
            .join(path)
            .map_err(|err| RpcError::Encode(err.to_string()))?;

        HttpClientBuilder::default()
            .request_timeout(self.timeout)
            .build(url.as_str())
            .map_err(Into::into)
    }

    fn chain(&self, chain: &str) -> Result<HttpClient, RpcError> {
        self.api(&format!("ext/bc/{chain}"))
    }
}

/// Method namespace of a chain's API.
pub fn namespace(chain: &str) -> String {
    match chain {
        "X" => "avm".into(),
        "P" => "platform".into(),
        "C" => "avax".into(),
        other => other.to_lowercase(),
    }
}

fn object_params<const N: usize>(
    entries: [(&str, serde_json::Value); N],
) -> Result<ObjectParams, RpcError> {
    let mut params = ObjectParams::new();
    for (name, value) in entries {
        params.insert(name, value)?;
    }
    Ok(params)
}

async fn call<R: DeserializeOwned>(
    client: &HttpClient,
    method: &str,
    params: ObjectParams,
) -> Result<R, RpcError> {
    tracing::trace!(method, "RPC request");
    Ok(client.request(method, params).await?)
}

#[derive(Deserialize)]
struct IssueTxReply {
    #[serde(rename = "txID")]
    tx_id: String,
}

/// Submits fully signed transactions with `issueTx` on one chain.
#[derive(Clone, Debug)]
pub struct RpcSubmitter {
    client: RpcClient,
    chain: String,
}

impl RpcSubmitter {
    pub fn new(client: RpcClient, chain: impl Into<String>) -> Self {
        Self {
            client,
            chain: chain.into(),
        }
    }
}

#[async_trait]
impl Submitter for RpcSubmitter {
    type Error = RpcError;

    async fn submit(&self, tx: &SignedTransaction) -> Result<SubmitReceipt, RpcError> {
        let bytes = tx
            .encode()
            .map_err(|err| RpcError::Encode(err.to_string()))?;
        let method = format!("{}.issueTx", namespace(&self.chain));

        let reply: IssueTxReply = call(
            &self.client.chain(&self.chain)?,
            &method,
            object_params([
                ("tx", format!("0x{}", hex::encode(bytes)).into()),
                ("encoding", "hex".into()),
            ])?,
        )
        .await?;

        tracing::debug!(tx_id = %reply.tx_id, "Transaction issued");
        Ok(SubmitReceipt { tx_id: reply.tx_id })
    }
}

/// One leg as signed and issued to its ledger.
#[derive(Debug, Serialize)]
struct LegTx<'a> {
    leg: Leg,
    from: &'a str,
    to: &'a str,
    amount: String,
    recipient: Address,
    sender: Address,
    /// Export this leg consumes, when known.
    source_tx: Option<&'a str>,
}

#[derive(Deserialize)]
struct TxStatusReply {
    status: String,
    #[serde(default)]
    reason: Option<String>,
}

/// Signs each leg with a local key, issues it and waits for the verdict.
pub struct RpcLegExecutor<S> {
    client: RpcClient,
    signer: S,
    poll_interval: Duration,
}

impl<S: Signer> RpcLegExecutor<S> {
    pub fn new(client: RpcClient, signer: S) -> Self {
        Self {
            client,
            signer,
            poll_interval: POLL_INTERVAL,
        }
    }

    /// Chain the leg's transaction is issued on.
    fn chain<'a>(params: &'a LegParams) -> &'a str {
        match params.leg {
            Leg::ExportFromSource | Leg::ExportFromIntermediate => &params.from,
            Leg::ImportIntoDestination => &params.to,
        }
    }

    async fn await_acceptance(
        &self,
        client: &HttpClient,
        namespace: &str,
        tx_id: &str,
    ) -> Result<(), LegError> {
        let deadline = Instant::now() + self.client.timeout();
        let method = format!("{namespace}.getTxStatus");

        loop {
            let request = object_params([("txID", tx_id.into())])
                .map_err(|err| LegError::Indeterminate(err.to_string()))?;

            let last = match call::<TxStatusReply>(client, &method, request).await {
                Ok(reply) => match reply.status.as_str() {
                    "Committed" | "Accepted" => return Ok(()),
                    "Rejected" | "Dropped" => {
                        return Err(LegError::Rejected(
                            reply.reason.unwrap_or_else(|| reply.status.to_lowercase()),
                        ));
                    }
                    status => format!("transaction {tx_id} still {status}"),
                },
                Err(err) => {
                    tracing::debug!("Status poll for {tx_id} failed: {err}");
                    err.to_string()
                }
            };

            if Instant::now() + self.poll_interval > deadline {
                return Err(LegError::Indeterminate(last));
            }
            sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl<S: Signer> LegExecutor for RpcLegExecutor<S> {
    async fn execute(
        &self,
        params: &LegParams,
        previous: Option<&LegReceipt>,
    ) -> Result<LegReceipt, LegError> {
        let chain = Self::chain(params);
        let namespace = namespace(chain);

        let tx = LegTx {
            leg: params.leg,
            from: &params.from,
            to: &params.to,
            amount: params.amount.to_string(),
            recipient: params.recipient,
            sender: self.signer.address(),
            source_tx: previous.map(|receipt| receipt.tx_id.as_str()),
        };
        // Nothing has been sent yet, so local failures are definite.
        let bytes = serde_json::to_vec(&tx).map_err(|err| LegError::Rejected(err.to_string()))?;
        let signature = self
            .signer
            .sign(&bytes)
            .map_err(|err| LegError::Rejected(format!("signing failed: {err}")))?;
        let client = self
            .client
            .chain(chain)
            .map_err(|err| LegError::Rejected(err.to_string()))?;
        let request = object_params([
            ("tx", format!("0x{}", hex::encode(&bytes)).into()),
            ("signature", signature.to_string().into()),
            ("encoding", "hex".into()),
        ])
        .map_err(|err| LegError::Rejected(err.to_string()))?;

        tracing::info!("Issuing {} on chain {chain}", params.leg);
        let reply: IssueTxReply = call(&client, &format!("{namespace}.issueTx"), request)
            .await
            .map_err(|err| match err {
                RpcError::Client(ClientError::Call(err)) => {
                    LegError::Rejected(err.message().to_string())
                }
                // The request may have reached the ledger.
                err => LegError::Indeterminate(err.to_string()),
            })?;

        self.await_acceptance(&client, &namespace, &reply.tx_id)
            .await?;

        tracing::info!(tx_id = %reply.tx_id, "{} confirmed", params.leg);
        Ok(LegReceipt {
            leg: params.leg,
            tx_id: reply.tx_id,
        })
    }
}

/// Readiness of one node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NodeStatus {
    pub healthy: bool,
    pub bootstrapped: bool,
    pub version: String,
}

#[derive(Deserialize)]
struct HealthReply {
    healthy: bool,
}

#[derive(Deserialize)]
struct BootstrappedReply {
    #[serde(rename = "isBootstrapped")]
    is_bootstrapped: bool,
}

#[derive(Deserialize)]
struct VersionReply {
    version: String,
}

/// Health, bootstrap and version checks against a single node.
#[derive(Clone, Debug)]
pub struct NodeProbe {
    client: RpcClient,
    chain: String,
}

impl NodeProbe {
    pub fn new(client: RpcClient, chain: impl Into<String>) -> Self {
        Self {
            client,
            chain: chain.into(),
        }
    }

    pub async fn status(&self) -> Result<NodeStatus, RpcError> {
        let health = self.client.api("ext/health")?;
        let info = self.client.api("ext/info")?;

        let HealthReply { healthy } = call(&health, "health.health", ObjectParams::new()).await?;
        let BootstrappedReply { is_bootstrapped } = call(
            &info,
            "info.isBootstrapped",
            object_params([("chain", self.chain.as_str().into())])?,
        )
        .await?;
        let VersionReply { version } =
            call(&info, "info.getNodeVersion", ObjectParams::new()).await?;

        Ok(NodeStatus {
            healthy,
            bootstrapped: is_bootstrapped,
            version,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_namespaces() {
        assert_eq!(namespace("P"), "platform");
        assert_eq!(namespace("X"), "avm");
        assert_eq!(namespace("Subnet1"), "subnet1");
    }

    #[test]
    fn api_paths_are_joined_below_endpoint() {
        let client = RpcClient::new("http://10.0.0.1:9650/node-a", Duration::from_secs(1)).unwrap();
        assert_eq!(client.endpoint(), "http://10.0.0.1:9650/node-a/");
        assert!(client.chain("P").is_ok());
    }

    #[test]
    fn invalid_endpoint_rejected() {
        assert!(RpcClient::new("not an endpoint", Duration::from_secs(1)).is_err());
    }

    #[tokio::test]
    async fn unreachable_node_is_an_error() {
        let client = RpcClient::new("http://127.0.0.1:9", Duration::from_millis(200)).unwrap();
        let probe = NodeProbe::new(client, "P");
        assert!(probe.status().await.is_err());
    }
}
