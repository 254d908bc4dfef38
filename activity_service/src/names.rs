use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::Address;
use futures::future::join_all;
use retry_utils::with_timeout;
use sale_core::{NameResolver, SaleError};
use tracing::debug;

/// ENS lookups under a hard deadline. Reverse lookups degrade to `None` on any failure.
#[derive(Clone)]
pub struct NameLookup {
    resolver: Option<Arc<dyn NameResolver>>,
    timeout: Duration,
}

impl NameLookup {
    pub fn new(resolver: Option<Arc<dyn NameResolver>>, timeout: Duration) -> Self {
        Self { resolver, timeout }
    }

    pub fn disabled() -> Self {
        Self::new(None, Duration::ZERO)
    }

    pub async fn lookup(&self, address: Address) -> Option<String> {
        let resolver = self.resolver.as_ref()?;
        if address == Address::ZERO {
            return None;
        }
        match with_timeout(self.timeout, resolver.lookup_address(address)).await {
            Ok(Ok(name)) => name,
            Ok(Err(e)) => {
                debug!("ENS lookup for {:#x} failed: {}", address, e);
                None
            }
            Err(e) => {
                debug!("ENS lookup for {:#x}: {}", address, e);
                None
            }
        }
    }

    /// Names for every distinct address; addresses without a name are absent from the map
    pub async fn lookup_many(
        &self,
        addresses: impl IntoIterator<Item = Address>,
    ) -> HashMap<Address, String> {
        if self.resolver.is_none() {
            return HashMap::new();
        }
        let distinct: Vec<Address> = addresses
            .into_iter()
            .filter(|a| *a != Address::ZERO)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let names = join_all(distinct.iter().map(|address| self.lookup(*address))).await;
        distinct
            .into_iter()
            .zip(names)
            .filter_map(|(address, name)| name.map(|n| (address, n)))
            .collect()
    }

    /// Forward resolution; unlike reverse lookups a timeout is reported to the caller
    pub async fn resolve(&self, name: &str) -> sale_core::Result<Option<Address>> {
        let Some(resolver) = self.resolver.as_ref() else {
            return Err(SaleError::Configuration("no ENS resolver configured".to_string()));
        };
        with_timeout(self.timeout, resolver.resolve_name(name))
            .await
            .map_err(|_| SaleError::Timeout {
                provider: "ens".to_string(),
            })?
    }
}
