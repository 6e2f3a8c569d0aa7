//! Venue registry with capability descriptors captured at registration.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use super::client::{Capabilities, Capability, VenueClient, VenueError};

struct RegisteredVenue {
    client: Arc<dyn VenueClient>,
    capabilities: Capabilities,
}

/// Name -> client lookup.
///
/// Built once at startup and shared immutably (`Arc<VenueRegistry>`).
/// Venue names are matched case-insensitively against the `VENUE` part of
/// composite symbols.
#[derive(Default)]
pub struct VenueRegistry {
    venues: HashMap<String, RegisteredVenue>,
}

impl VenueRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(name: &str) -> String {
        name.trim().to_ascii_uppercase()
    }

    /// Register a venue. Its capability descriptor is read here, once.
    pub fn register(&mut self, name: &str, client: Arc<dyn VenueClient>) {
        let capabilities = client.capabilities();
        info!(
            venue = %Self::key(name),
            list_open_orders = capabilities.contains(Capability::ListOpenOrders),
            cancel = capabilities.contains(Capability::Cancel),
            last_price = capabilities.contains(Capability::LastPrice),
            "Venue registered"
        );
        self.venues.insert(
            Self::key(name),
            RegisteredVenue {
                client,
                capabilities,
            },
        );
    }

    /// Builder-style `register`.
    #[must_use]
    pub fn with_venue(mut self, name: &str, client: Arc<dyn VenueClient>) -> Self {
        self.register(name, client);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn VenueClient>> {
        self.venues.get(&Self::key(name)).map(|v| v.client.clone())
    }

    pub fn supports(&self, name: &str, cap: Capability) -> bool {
        self.venues
            .get(&Self::key(name))
            .map(|v| v.capabilities.contains(cap))
            .unwrap_or(false)
    }

    /// Client for `name` if it declared `cap`.
    pub fn client_with(
        &self,
        name: &str,
        cap: Capability,
    ) -> Result<Arc<dyn VenueClient>, VenueError> {
        let venue = self
            .venues
            .get(&Self::key(name))
            .ok_or_else(|| VenueError::UnknownVenue(name.to_string()))?;
        if venue.capabilities.contains(cap) {
            Ok(venue.client.clone())
        } else {
            Err(VenueError::Unsupported(cap))
        }
    }

    /// Registered venue names, sorted for deterministic pass order.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.venues.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.venues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.venues.is_empty()
    }
}

impl std::fmt::Debug for VenueRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VenueRegistry")
            .field("venues", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct CancelOnly;

    #[async_trait]
    impl VenueClient for CancelOnly {
        fn capabilities(&self) -> Capabilities {
            Capabilities::none().with(Capability::Cancel)
        }
    }

    #[test]
    fn test_registry_lookup_is_case_insensitive() {
        let registry = VenueRegistry::new().with_venue("Binance", Arc::new(CancelOnly));

        assert!(registry.get("BINANCE").is_some());
        assert!(registry.get("binance").is_some());
        assert!(registry.supports("binance", Capability::Cancel));
        assert!(!registry.supports("binance", Capability::ListOpenOrders));
        assert!(!registry.supports("kraken", Capability::Cancel));
        assert_eq!(registry.names(), vec!["BINANCE".to_string()]);
    }

    #[test]
    fn test_client_with_reports_reason() {
        let registry = VenueRegistry::new().with_venue("binance", Arc::new(CancelOnly));

        assert!(registry.client_with("binance", Capability::Cancel).is_ok());
        assert!(matches!(
            registry.client_with("binance", Capability::LastPrice),
            Err(VenueError::Unsupported(Capability::LastPrice))
        ));
        assert!(matches!(
            registry.client_with("kraken", Capability::Cancel),
            Err(VenueError::UnknownVenue(_))
        ));
    }
}
