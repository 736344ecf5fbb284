use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Wei per whole ether.
pub const WEI_PER_ETHER: f64 = 1e18;

/// Convert a wei quantity to whole ether.
pub fn wei_to_ether(wei: u128) -> f64 {
    wei as f64 / WEI_PER_ETHER
}

/// Check that a string is a syntactically well-formed Ethereum address:
/// exactly 42 characters, `0x` prefix, 40 hex digits. No partial matching.
pub fn is_valid_address(value: &str) -> bool {
    value.len() == 42
        && value.starts_with("0x")
        && value[2..].bytes().all(|b| b.is_ascii_hexdigit())
}

/// A normal transaction record as returned by the blockchain data API's
/// `txlist` endpoint. All values arrive as strings; field names follow the
/// external API exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxRecord {
    #[serde(rename = "blockNumber")]
    pub block_number: String,
    #[serde(rename = "timeStamp")]
    pub time_stamp: String,
    pub hash: String,
    pub nonce: String,
    #[serde(rename = "blockHash")]
    pub block_hash: String,
    #[serde(rename = "transactionIndex")]
    pub transaction_index: String,
    pub from: String,
    pub to: String,
    /// Transferred amount in wei.
    pub value: String,
    pub gas: String,
    #[serde(rename = "gasPrice")]
    pub gas_price: String,
    #[serde(rename = "isError")]
    pub is_error: String,
    pub txreceipt_status: String,
    pub input: String,
    #[serde(rename = "contractAddress")]
    pub contract_address: String,
    #[serde(rename = "cumulativeGasUsed")]
    pub cumulative_gas_used: String,
    #[serde(rename = "gasUsed")]
    pub gas_used: String,
    pub confirmations: String,
    #[serde(rename = "methodId", default)]
    pub method_id: String,
    #[serde(rename = "functionName", default)]
    pub function_name: String,
}

/// Total supply components from the stats endpoint, all wei strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplyBreakdown {
    #[serde(rename = "EthSupply")]
    pub eth_supply: String,
    #[serde(rename = "Eth2Staking")]
    pub eth2_staking: String,
    #[serde(rename = "BurntFees")]
    pub burnt_fees: String,
}

impl SupplyBreakdown {
    /// Net supply in wei: issued + staking rewards - burnt fees.
    pub fn net_wei(&self) -> anyhow::Result<u128> {
        let issued: u128 = self.eth_supply.parse()?;
        let staking: u128 = self.eth2_staking.parse()?;
        let burnt: u128 = self.burnt_fees.parse()?;
        issued
            .checked_add(staking)
            .and_then(|total| total.checked_sub(burnt))
            .ok_or_else(|| anyhow::anyhow!("supply components out of range"))
    }
}

/// The fixed set of currency codes the conversion endpoint accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Currency {
    Eth,
    Usd,
    Eur,
    Gbp,
}

impl std::str::FromStr for Currency {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_uppercase().as_str() {
            "ETH" => Ok(Currency::Eth),
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            "GBP" => Ok(Currency::Gbp),
            _ => Err(format!("Unknown currency code: {}", value)),
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Currency::Eth => write!(f, "ETH"),
            Currency::Usd => write!(f, "USD"),
            Currency::Eur => write!(f, "EUR"),
            Currency::Gbp => write!(f, "GBP"),
        }
    }
}

/// Database model for cached transactions.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StoredTransaction {
    pub tx_hash: String,
    pub block_number: String,
    pub time_stamp: String,
    pub nonce: String,
    pub block_hash: String,
    pub transaction_index: String,
    pub from_address: String,
    pub to_address: String,
    pub value: String,
    pub gas: String,
    pub gas_price: String,
    pub is_error: String,
    pub receipt_status: String,
    pub input: String,
    pub contract_address: String,
    pub cumulative_gas_used: String,
    pub gas_used: String,
    pub confirmations: String,
    pub method_id: String,
    pub function_name: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_ether_in_wei_converts_to_one() {
        assert_eq!(wei_to_ether(1_000_000_000_000_000_000), 1.0);
    }

    #[test]
    fn zero_wei_converts_to_zero() {
        assert_eq!(wei_to_ether(0), 0.0);
    }

    #[test]
    fn accepts_well_formed_addresses() {
        assert!(is_valid_address(
            "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045"
        ));
        assert!(is_valid_address(
            "0x0000000000000000000000000000000000000000"
        ));
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(!is_valid_address(""));
        assert!(!is_valid_address("0x123"));
        // 40 hex digits but no prefix
        assert!(!is_valid_address(
            "d8dA6BF26964aF9D7eEd9e03E53415D37aA96045ab"
        ));
        // non-hex character in the body
        assert!(!is_valid_address(
            "0xZ8dA6BF26964aF9D7eEd9e03E53415D37aA96045"
        ));
        // 41 hex digits
        assert!(!is_valid_address(
            "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA960455"
        ));
        // multibyte characters must not slip past the byte-length check
        let multibyte = format!("0x{}", "é".repeat(20));
        assert_eq!(multibyte.len(), 42);
        assert!(!is_valid_address(&multibyte));
    }

    #[test]
    fn net_supply_subtracts_burnt_fees() {
        let supply = SupplyBreakdown {
            eth_supply: "100".to_string(),
            eth2_staking: "10".to_string(),
            burnt_fees: "5".to_string(),
        };
        assert_eq!(supply.net_wei().unwrap(), 105);
        assert_eq!(wei_to_ether(supply.net_wei().unwrap()), 105.0 / 1e18);
    }

    #[test]
    fn net_supply_rejects_non_numeric_components() {
        let supply = SupplyBreakdown {
            eth_supply: "not-a-number".to_string(),
            eth2_staking: "10".to_string(),
            burnt_fees: "5".to_string(),
        };
        assert!(supply.net_wei().is_err());
    }

    #[test]
    fn currency_codes_round_trip() {
        for code in ["ETH", "USD", "EUR", "GBP"] {
            let currency: Currency = code.parse().unwrap();
            assert_eq!(currency.to_string(), code);
        }
        assert_eq!("usd".parse::<Currency>().unwrap(), Currency::Usd);
        assert!("DOGE".parse::<Currency>().is_err());
    }

    #[test]
    fn tx_record_uses_external_field_names() {
        let raw = r#"{
            "blockNumber": "19000000",
            "timeStamp": "1704067200",
            "hash": "0xabc",
            "nonce": "7",
            "blockHash": "0xdef",
            "transactionIndex": "3",
            "from": "0x1111111111111111111111111111111111111111",
            "to": "0x2222222222222222222222222222222222222222",
            "value": "1000000000000000000",
            "gas": "21000",
            "gasPrice": "20000000000",
            "isError": "0",
            "txreceipt_status": "1",
            "input": "0x",
            "contractAddress": "",
            "cumulativeGasUsed": "21000",
            "gasUsed": "21000",
            "confirmations": "12",
            "methodId": "0x",
            "functionName": ""
        }"#;
        let record: TxRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.block_number, "19000000");
        assert_eq!(record.txreceipt_status, "1");
        assert_eq!(record.value, "1000000000000000000");
        assert_eq!(record.from, "0x1111111111111111111111111111111111111111");
    }
}
