//! Symbol canonicalization and ticker collision resolution
//!
//! Both tables are built once on first use and never mutated, so fetchers
//! running on different tasks read them without synchronization.

use crate::error::Result;
use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

/// Alternate tickers some sources use for coins we list under another symbol
static ALT_TO_CANONICAL: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(|| HashMap::from([("MIOTA", "IOTA")]));

/// Tickers shared by several coins, pinned to the listing id of the one we
/// publish. Ordered so the whitelist artifact is byte-stable.
static PINNED_IDS: LazyLock<BTreeMap<&'static str, i64>> = LazyLock::new(|| {
    BTreeMap::from([
        ("BTC", 1),     // Bitcoin
        ("LTC", 2),     // Litecoin
        ("NXT", 66),    // Nxt
        ("DOGE", 74),   // Dogecoin
        ("DASH", 131),  // Dash
        ("XMR", 328),   // Monero
        ("ETH", 1027),  // Ethereum
        ("ZEC", 1437),  // Zcash
        ("BCH", 1831),  // Bitcoin Cash
        ("BTG", 2083),  // Bitcoin Gold
        ("CMT", 2246),  // CyberMiles
        ("KNC", 1982),  // Kyber Network
        ("BTM", 1866),  // Bytom
        ("ICN", 1408),  // Iconomi
        ("GTC", 2336),  // Game.com
        ("BLZ", 2505),  // Bluzelle
        ("HOT", 2682),  // Holo
        ("RCN", 2096),  // Ripio Credit Network
        ("FAIR", 224),  // FairCoin
        ("EDR", 2835),  // Endor Protocol
        ("CPC", 2482),  // CPChain
        ("QBT", 2242),  // Qbao
        ("KEY", 2398),  // Selfkey
        ("RED", 2771),  // RED
        ("HMC", 2484),  // Hi Mutual Society
        ("NET", 1811),  // Nimiq Exchange Token
        ("LNC", 2677),  // Linker Coin
        ("CAN", 2343),  // CanYaCoin
        ("BET", 1771),  // DAO.Casino
        ("SPD", 2616),  // Stipend
        ("CAT", 2334),  // BitClave
        ("GCC", 1531),  // Global Cryptocurrency
        ("PUT", 2419),  // Profile Utility Token
        ("MAG", 2218),  // Magnet
        ("CRC", 2664),  // CryCash
        ("ACC", 2225),  // Accelerator Network
        ("PXC", 35),    // Phoenixcoin
        ("ETT", 1714),  // EncryptoTel [WAVES]
        ("XIN", 2349),  // Mixin
        ("HERO", 1805), // Sovereign Hero
        ("HNC", 1004),  // Helleniccoin
        ("ENT", 1474),  // Eternity
        ("LBTC", 1825), // LiteBitcoin
        ("CMS", 2262),  // COMSA [ETH]
    ])
});

/// Resolves an alternate ticker to the symbol we publish it under.
/// Unknown symbols come back unchanged.
pub fn canonicalize(symbol: &str) -> &str {
    ALT_TO_CANONICAL.get(symbol).copied().unwrap_or(symbol)
}

/// Pinned listing id for `symbol`, if the ticker is known to collide
pub fn pinned_id(symbol: &str) -> Option<i64> {
    PINNED_IDS.get(symbol).copied()
}

/// Whether a record with listing id `id` may be published as `symbol`.
///
/// Symbols without a pinned id cannot be ambiguous and always pass.
pub fn is_authoritative(symbol: &str, id: i64) -> bool {
    match pinned_id(symbol) {
        Some(pinned) => pinned == id,
        None => true,
    }
}

/// The pinned-id table as published next to each snapshot
pub fn whitelist_json() -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(&*PINNED_IDS)?)
}
