use anyhow::Result;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::primitives::{SupplyBreakdown, TxRecord};

/// Client for an Etherscan-compatible blockchain data API.
///
/// Each operation is a single call, no retries. Values denominated in wei
/// come back as strings; callers decide how to parse them.
#[derive(Clone)]
pub struct EtherscanClient {
    client: Client,
    base_url: String,
    api_key: String,
}

/// Envelope for `module=...` calls: `{"status", "message", "result"}`.
/// Only `result` matters here; the status fields duplicate what the
/// payload shape already tells us.
#[derive(Debug, Deserialize)]
struct ModuleEnvelope<T> {
    result: T,
}

/// Envelope for `module=proxy` JSON-RPC passthrough calls.
#[derive(Debug, Deserialize)]
struct ProxyEnvelope {
    result: String,
}

#[derive(Debug, Deserialize)]
struct NodeCount {
    #[serde(rename = "TotalNodeCount")]
    total_node_count: String,
}

/// Parse a JSON-RPC hex quantity such as `0x1b4`.
fn parse_hex_quantity(value: &str) -> Result<u128> {
    let digits = value.strip_prefix("0x").unwrap_or(value);
    Ok(u128::from_str_radix(digits, 16)?)
}

impl EtherscanClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
            api_key,
        }
    }

    async fn call<T: DeserializeOwned>(&self, params: &[(&str, &str)]) -> Result<T> {
        let url = format!("{}/api", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(params)
            .query(&[("apikey", self.api_key.as_str())])
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(anyhow::anyhow!(
                "Blockchain data request failed: {}",
                response.status()
            ))
        }
    }

    /// Balance of an address, as the raw wei string the API returned.
    ///
    /// The API answers invalid addresses with a non-numeric result string,
    /// so a failed integer parse at the call site is the invalid-address
    /// signal.
    pub async fn balance(&self, address: &str) -> Result<String> {
        let envelope: ModuleEnvelope<String> = self
            .call(&[
                ("module", "account"),
                ("action", "balance"),
                ("address", address),
                ("tag", "latest"),
            ])
            .await?;
        Ok(envelope.result)
    }

    /// Total supply components (issued, staking rewards, burnt fees).
    pub async fn supply(&self) -> Result<SupplyBreakdown> {
        let envelope: ModuleEnvelope<SupplyBreakdown> = self
            .call(&[("module", "stats"), ("action", "ethsupply2")])
            .await?;
        Ok(envelope.result)
    }

    /// Current gas price in wei.
    pub async fn gas_price(&self) -> Result<u128> {
        let envelope: ProxyEnvelope = self
            .call(&[("module", "proxy"), ("action", "eth_gasPrice")])
            .await?;
        parse_hex_quantity(&envelope.result)
    }

    /// Current block number.
    pub async fn block_number(&self) -> Result<u64> {
        let envelope: ProxyEnvelope = self
            .call(&[("module", "proxy"), ("action", "eth_blockNumber")])
            .await?;
        Ok(parse_hex_quantity(&envelope.result)? as u64)
    }

    /// Total number of discoverable nodes on the network.
    pub async fn node_count(&self) -> Result<u64> {
        let envelope: ModuleEnvelope<NodeCount> = self
            .call(&[("module", "stats"), ("action", "nodecount")])
            .await?;
        Ok(envelope.result.total_node_count.parse()?)
    }

    /// Normal transactions for an address, oldest first. An address with no
    /// transactions yields an empty list.
    pub async fn transactions(&self, address: &str) -> Result<Vec<TxRecord>> {
        let envelope: ModuleEnvelope<Vec<TxRecord>> = self
            .call(&[
                ("module", "account"),
                ("action", "txlist"),
                ("address", address),
                ("startblock", "0"),
                ("endblock", "99999999"),
                ("sort", "asc"),
            ])
            .await?;
        Ok(envelope.result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_quantities() {
        assert_eq!(parse_hex_quantity("0x0").unwrap(), 0);
        assert_eq!(parse_hex_quantity("0x1b4").unwrap(), 436);
        assert_eq!(
            parse_hex_quantity("0x4a817c800").unwrap(),
            20_000_000_000
        );
        assert!(parse_hex_quantity("0xzz").is_err());
    }

    #[test]
    fn deserializes_balance_envelope() {
        let raw = r#"{"status":"1","message":"OK","result":"40891626854930000000000"}"#;
        let envelope: ModuleEnvelope<String> = serde_json::from_str(raw).unwrap();
        assert_eq!(envelope.result, "40891626854930000000000");
    }

    #[test]
    fn deserializes_supply_envelope() {
        let raw = r#"{
            "status": "1",
            "message": "OK",
            "result": {
                "EthSupply": "122373866217800000000000000",
                "Eth2Staking": "1157529105115885000000000",
                "BurntFees": "3102505506455601519229842",
                "WithdrawnTotal": "1170200333006131000000000"
            }
        }"#;
        let envelope: ModuleEnvelope<SupplyBreakdown> = serde_json::from_str(raw).unwrap();
        assert_eq!(
            envelope.result.eth_supply,
            "122373866217800000000000000"
        );
        assert!(envelope.result.net_wei().is_ok());
    }

    #[test]
    fn deserializes_node_count_envelope() {
        let raw = r#"{
            "status": "1",
            "message": "OK",
            "result": {"UTCDate": "2024-01-01", "TotalNodeCount": "7558"}
        }"#;
        let envelope: ModuleEnvelope<NodeCount> = serde_json::from_str(raw).unwrap();
        assert_eq!(envelope.result.total_node_count.parse::<u64>().unwrap(), 7558);
    }

    #[test]
    fn deserializes_empty_txlist() {
        // No transactions found comes back with status 0 and an empty list.
        let raw = r#"{"status":"0","message":"No transactions found","result":[]}"#;
        let envelope: ModuleEnvelope<Vec<TxRecord>> = serde_json::from_str(raw).unwrap();
        assert!(envelope.result.is_empty());
    }
}
