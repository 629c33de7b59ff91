//! Presets for the external binaries the system fronts.
//!
//! Each preset carries the binary name, the façade's minimum supported
//! version and the shape of its version-reporting subcommand; everything
//! beyond that (per-binary argument lists) is built by the callers.

use semver::Version;

use crate::facade::BinaryConfig;

/// The full Cardano node daemon.
pub fn cardano_node() -> BinaryConfig {
    BinaryConfig::new("cardano-node", Version::new(8, 0, 0))
}

/// Chain indexer daemon, fed from the node socket.
pub fn chain_indexer() -> BinaryConfig {
    BinaryConfig::new("cardano-db-sync", Version::new(13, 0, 0))
}

/// Transaction/metadata signing tool. Its `help` output embeds the version
/// banner; there is no dedicated version flag.
pub fn transaction_signer() -> BinaryConfig {
    BinaryConfig::new("cardano-signer", Version::new(1, 16, 0)).with_version_args(&["help"])
}

/// Bridge to Ledger/Trezor hardware wallets.
pub fn hardware_wallet_bridge() -> BinaryConfig {
    BinaryConfig::new("cardano-hw-cli", Version::new(1, 10, 0))
        .with_version_args(&["version"])
}

/// Light client exposing the local chain over the node socket.
pub fn light_client() -> BinaryConfig {
    BinaryConfig::new("ogmios", Version::new(6, 0, 0))
}

/// Certified stake-snapshot downloader.
pub fn snapshot_downloader() -> BinaryConfig {
    BinaryConfig::new("mithril-client", Version::new(0, 5, 17))
}

/// Arguments of the bridge's device-status subcommand, polled by the
/// hardware-wallet handshake.
pub fn bridge_device_status_args() -> Vec<String> {
    vec!["device".to_string(), "version".to_string()]
}

/// Look up a preset by binary name.
pub fn known_binary(name: &str) -> Option<BinaryConfig> {
    match name {
        "cardano-node" => Some(cardano_node()),
        "cardano-db-sync" => Some(chain_indexer()),
        "cardano-signer" => Some(transaction_signer()),
        "cardano-hw-cli" => Some(hardware_wallet_bridge()),
        "ogmios" => Some(light_client()),
        "mithril-client" => Some(snapshot_downloader()),
        _ => None,
    }
}
