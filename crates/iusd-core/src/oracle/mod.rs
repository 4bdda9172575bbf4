//! Price oracle router.
//!
//! Two variants, matching the deployed routers: the production router
//! reports a fixed 1.0 for each recognized stable asset, capped by a
//! price ceiling as a guard against a poisoned upstream feed; the dev
//! router accepts injected prices for arbitrary assets. All prices are
//! wad-scaled (1e18 = $1).

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::constants::WAD;
use crate::errors::{ProtocolError, ProtocolResult};
use crate::types::Address;

/// Where the router's prices come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PriceSource {
    /// Fixed 1.0 for recognized assets, ceiling-capped.
    Production {
        recognized: BTreeSet<Address>,
        price_ceiling: u128,
    },
    /// Injected prices, settable at runtime.
    Dev { prices: BTreeMap<Address, u128> },
}

/// Oracle router addressable by the vault's price provider setting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleRouter {
    address: Address,
    source: PriceSource,
}

impl OracleRouter {
    pub fn production(address: Address, recognized: BTreeSet<Address>) -> Self {
        Self {
            address,
            source: PriceSource::Production {
                recognized,
                price_ceiling: WAD,
            },
        }
    }

    pub fn dev(address: Address) -> Self {
        Self {
            address,
            source: PriceSource::Dev {
                prices: BTreeMap::new(),
            },
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Unit price of an asset, wad-scaled.
    pub fn price(&self, asset: &Address) -> ProtocolResult<u128> {
        match &self.source {
            PriceSource::Production {
                recognized,
                price_ceiling,
            } => {
                if !recognized.contains(asset) {
                    return Err(ProtocolError::PriceNotAvailable);
                }
                Ok(WAD.min(*price_ceiling))
            }
            PriceSource::Dev { prices } => prices
                .get(asset)
                .copied()
                .ok_or(ProtocolError::PriceNotAvailable),
        }
    }

    /// Inject a price. Dev router only.
    pub fn set_price(&mut self, asset: Address, price: u128) -> ProtocolResult<()> {
        match &mut self.source {
            PriceSource::Production { .. } => Err(ProtocolError::PriceNotSettable),
            PriceSource::Dev { prices } => {
                prices.insert(asset, price);
                Ok(())
            }
        }
    }
}
