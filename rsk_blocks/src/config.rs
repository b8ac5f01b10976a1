//! Network identities and the block heights at which the consensus changes
//! relevant to hashing (RSKIPs) activate.

use std::{
    collections::BTreeMap,
    fmt::{self, Display},
    str::FromStr,
};

use log::debug;
use rsk_trie::trie_hashing::TrieFormat;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors encountered while selecting or loading activation heights.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum ConfigError {
    /// No activation table exists for this network.
    #[error("Unknown network {0:?}")]
    UnknownNetwork(String),

    /// An activation table could not be parsed.
    #[error("Invalid activation schedule at {path}: {reason}")]
    InvalidSchedule {
        /// Where in the document parsing failed.
        path: String,
        /// What went wrong.
        reason: String,
    },
}

/// Result alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// The public Rootstock networks.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Rootstock mainnet, chain id 30.
    Mainnet,
    /// Rootstock testnet, chain id 31.
    Testnet,
    /// A local development network, chain id 33.
    Regtest,
}

impl Network {
    /// The EIP-155 chain id of the network.
    pub const fn chain_id(self) -> u64 {
        match self {
            Network::Mainnet => 30,
            Network::Testnet => 31,
            Network::Regtest => 33,
        }
    }

    /// The name used as key in an [`ActivationSchedule`].
    pub const fn name(self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Regtest => "regtest",
        }
    }

    /// Looks a network up by chain id.
    pub fn from_chain_id(id: u64) -> Option<Self> {
        [Network::Mainnet, Network::Testnet, Network::Regtest]
            .into_iter()
            .find(|n| n.chain_id() == id)
    }
}

impl Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Network {
    type Err = ConfigError;

    /// Accepts a network name (any case) or its chain id, in decimal or
    /// `0x` prefixed hex.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let by_id = match lower.strip_prefix("0x") {
            Some(hex) => u64::from_str_radix(hex, 16).ok(),
            None => lower.parse::<u64>().ok(),
        };

        match (lower.as_str(), by_id) {
            ("mainnet", _) => Some(Network::Mainnet),
            ("testnet", _) => Some(Network::Testnet),
            ("regtest", _) => Some(Network::Regtest),
            (_, Some(id)) => Network::from_chain_id(id),
            _ => None,
        }
        .ok_or_else(|| ConfigError::UnknownNetwork(s.to_string()))
    }
}

/// Activation heights of the RSKIPs that change block hashing. `None`
/// means the RSKIP never activates.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ActivationHeights {
    /// Merged-mining proof and coinbase leave the hash preimage.
    pub rskip92: Option<u64>,
    /// Transaction and receipt roots switch from Orchid to RSKIP-107 node
    /// hashing.
    pub rskip126: Option<u64>,
    /// The `ummRoot` field joins the header.
    pub rskip_umm: Option<u64>,
    /// Parallel transaction execution sublists.
    pub rskip144: Option<u64>,
    /// The logs bloom is replaced by a header extension hash.
    pub rskip351: Option<u64>,
}

impl ActivationHeights {
    /// Every RSKIP active from genesis.
    pub const ALL_FROM_GENESIS: Self = Self {
        rskip92: Some(0),
        rskip126: Some(0),
        rskip_umm: Some(0),
        rskip144: Some(0),
        rskip351: Some(0),
    };

    /// The flags in force at block `number`.
    pub fn config_at(&self, number: u64) -> BlockHeaderConfig {
        let active = |h: Option<u64>| h.is_some_and(|h| number >= h);

        BlockHeaderConfig {
            rskip92: active(self.rskip92),
            rskip126: active(self.rskip126),
            rskip_umm: active(self.rskip_umm),
            rskip144: active(self.rskip144),
            rskip351: active(self.rskip351),
        }
    }
}

/// Which hashing rules apply to one block. Selected by block number and
/// network, then passed explicitly to every hash computation.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct BlockHeaderConfig {
    /// Merged-mining proof and coinbase are excluded from the hash.
    pub rskip92: bool,
    /// Transaction and receipt roots use RSKIP-107 hashing.
    pub rskip126: bool,
    /// The header carries `ummRoot`.
    pub rskip_umm: bool,
    /// The header carries parallel execution sublist edges.
    pub rskip144: bool,
    /// The logs bloom is replaced by the header extension.
    pub rskip351: bool,
}

impl BlockHeaderConfig {
    /// The node layout used to hash transaction and receipt tries.
    pub fn trie_format(&self) -> TrieFormat {
        match self.rskip126 {
            true => TrieFormat::Rskip107,
            false => TrieFormat::Orchid,
        }
    }
}

/// Activation heights per network identity.
///
/// Deserializes from a JSON object mapping a network name to its
/// [`ActivationHeights`]:
/// ```json
/// { "mainnet": { "rskip92": 729000, "rskip126": 729000, "rskip_umm": 2392700 } }
/// ```
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ActivationSchedule {
    networks: BTreeMap<String, ActivationHeights>,
}

impl Default for ActivationSchedule {
    fn default() -> Self {
        let mainnet = ActivationHeights {
            rskip92: Some(729_000),
            rskip126: Some(729_000),
            rskip_umm: Some(2_392_700),
            rskip144: None,
            rskip351: None,
        };
        let testnet = ActivationHeights {
            rskip92: Some(0),
            rskip126: Some(0),
            rskip_umm: Some(863_000),
            rskip144: None,
            rskip351: None,
        };

        Self {
            networks: BTreeMap::from([
                (Network::Mainnet.name().to_string(), mainnet),
                (Network::Testnet.name().to_string(), testnet),
                (
                    Network::Regtest.name().to_string(),
                    ActivationHeights::ALL_FROM_GENESIS,
                ),
            ]),
        }
    }
}

impl ActivationSchedule {
    /// Parses a schedule from JSON, reporting the path of the first invalid
    /// entry.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let de = &mut serde_json::Deserializer::from_str(json);
        serde_path_to_error::deserialize(de).map_err(|e| ConfigError::InvalidSchedule {
            path: e.path().to_string(),
            reason: e.inner().to_string(),
        })
    }

    /// Adds or replaces the heights of one network.
    pub fn insert(&mut self, network: impl Into<String>, heights: ActivationHeights) {
        self.networks.insert(network.into(), heights);
    }

    /// Overrides the entries of `self` with every network of `other`.
    pub fn merge(&mut self, other: Self) {
        self.networks.extend(other.networks);
    }

    /// The heights for `network`, which is either a key of this schedule or
    /// anything [`Network`] parses (a known name or chain id).
    pub fn heights(&self, network: &str) -> ConfigResult<&ActivationHeights> {
        if let Some(h) = self.networks.get(network) {
            return Ok(h);
        }

        let known = network.parse::<Network>()?;
        self.networks
            .get(known.name())
            .ok_or_else(|| ConfigError::UnknownNetwork(network.to_string()))
    }

    /// Selects the flags for block `number` of `network`.
    pub fn config_for_block_number(
        &self,
        number: u64,
        network: &str,
    ) -> ConfigResult<BlockHeaderConfig> {
        let config = self.heights(network)?.config_at(number);
        debug!("Block {} on {} hashes with {:?}", number, network, config);

        Ok(config)
    }
}

/// Selects the flags for block `number` of `network` using the built-in
/// schedule.
pub fn config_for_block_number(number: u64, network: &str) -> ConfigResult<BlockHeaderConfig> {
    ActivationSchedule::default().config_for_block_number(number, network)
}

#[cfg(test)]
mod tests {
    use rsk_trie::trie_hashing::TrieFormat;

    use super::{
        config_for_block_number, ActivationHeights, ActivationSchedule, ConfigError, Network,
    };

    #[test]
    fn mainnet_activations() {
        let genesis = config_for_block_number(0, "mainnet").unwrap();
        assert!(!genesis.rskip92 && !genesis.rskip126 && !genesis.rskip_umm);
        assert_eq!(genesis.trie_format(), TrieFormat::Orchid);

        let before_orchid = config_for_block_number(728_999, "mainnet").unwrap();
        assert!(!before_orchid.rskip92);

        let orchid = config_for_block_number(729_000, "mainnet").unwrap();
        assert!(orchid.rskip92 && orchid.rskip126 && !orchid.rskip_umm);
        assert_eq!(orchid.trie_format(), TrieFormat::Rskip107);

        let papyrus = config_for_block_number(2_392_700, "mainnet").unwrap();
        assert!(papyrus.rskip_umm);
        assert!(!papyrus.rskip144 && !papyrus.rskip351);
    }

    #[test]
    fn networks_parse_from_names_and_chain_ids() {
        assert_eq!("mainnet".parse::<Network>(), Ok(Network::Mainnet));
        assert_eq!("TestNet".parse::<Network>(), Ok(Network::Testnet));
        assert_eq!("30".parse::<Network>(), Ok(Network::Mainnet));
        assert_eq!("0x21".parse::<Network>(), Ok(Network::Regtest));
        assert_eq!(
            "ropsten".parse::<Network>(),
            Err(ConfigError::UnknownNetwork("ropsten".into()))
        );

        let regtest = config_for_block_number(1, "33").unwrap();
        assert!(regtest.rskip351 && regtest.rskip144);
    }

    #[test]
    fn unknown_networks_fail() {
        assert_eq!(
            config_for_block_number(1, "devnet"),
            Err(ConfigError::UnknownNetwork("devnet".into()))
        );
    }

    #[test]
    fn schedules_load_from_json() {
        let schedule = ActivationSchedule::from_json(
            r#"{ "devnet": { "rskip92": 10, "rskip351": 20 }, "mainnet": {} }"#,
        )
        .unwrap();

        let c = schedule.config_for_block_number(15, "devnet").unwrap();
        assert!(c.rskip92 && !c.rskip351 && !c.rskip126);
        assert!(schedule.config_for_block_number(20, "devnet").unwrap().rskip351);

        // Overridden: nothing ever activates.
        let m = schedule.config_for_block_number(5_000_000, "30").unwrap();
        assert_eq!(m, ActivationHeights::default().config_at(5_000_000));

        assert!(matches!(
            schedule.config_for_block_number(1, "testnet"),
            Err(ConfigError::UnknownNetwork(_))
        ));
    }

    #[test]
    fn merged_schedules_keep_the_defaults() {
        let mut schedule = ActivationSchedule::default();
        schedule.merge(ActivationSchedule::from_json(r#"{ "regtest": { "rskip92": 5 } }"#).unwrap());

        let regtest = schedule.config_for_block_number(4, "regtest").unwrap();
        assert!(!regtest.rskip92 && !regtest.rskip351);
        assert!(schedule.config_for_block_number(5, "33").unwrap().rskip92);
        assert_eq!(
            schedule.config_for_block_number(729_000, "mainnet"),
            config_for_block_number(729_000, "mainnet")
        );
    }

    #[test]
    fn invalid_schedules_report_the_path() {
        let err = ActivationSchedule::from_json(r#"{ "devnet": { "rskip92": "soon" } }"#)
            .unwrap_err();

        assert!(matches!(
            err,
            ConfigError::InvalidSchedule { ref path, .. } if path == "devnet.rskip92"
        ));
    }
}
