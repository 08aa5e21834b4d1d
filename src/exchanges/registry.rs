//! Startup-built lookup of venue adapters

use std::sync::Arc;

use crate::common::errors::{ArbError, Result};
use crate::common::traits::ExchangeAdapter;
use crate::common::types::VenueId;

/// Read-only set of venue adapters, in configured order
#[derive(Clone, Default)]
pub struct VenueRegistry {
    adapters: Vec<Arc<dyn ExchangeAdapter>>,
}

impl VenueRegistry {
    /// Build a registry, rejecting two adapters with the same venue id
    pub fn new(adapters: Vec<Arc<dyn ExchangeAdapter>>) -> Result<Self> {
        for (i, adapter) in adapters.iter().enumerate() {
            let id = adapter.venue_id();
            if adapters[..i].iter().any(|other| other.venue_id() == id) {
                return Err(ArbError::Configuration(format!("venue {} registered twice", id)));
            }
        }
        Ok(Self { adapters })
    }

    pub fn get(&self, venue: &VenueId) -> Result<&Arc<dyn ExchangeAdapter>> {
        self.adapters
            .iter()
            .find(|adapter| adapter.venue_id() == venue)
            .ok_or_else(|| ArbError::UnknownVenue(venue.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ExchangeAdapter>> {
        self.adapters.iter()
    }

    pub fn venue_ids(&self) -> Vec<VenueId> {
        self.adapters.iter().map(|a| a.venue_id().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl std::fmt::Debug for VenueRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VenueRegistry")
            .field("venues", &self.venue_ids())
            .finish()
    }
}
