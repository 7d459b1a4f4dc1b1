//! Common types used across the platform

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identity of the caller performing a mutating operation.
///
/// Threaded explicitly through every service method that writes; the core
/// never reads an ambient "current user".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actor {
    pub user_id: String,
    pub display_name: Option<String>,
}

impl Actor {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

/// Currencies a provider quote can be expressed in
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Usd,
    Pen,
}

impl Currency {
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Pen => "PEN",
        }
    }
}

/// Named stock locations tracked on every SKU
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StockLocation {
    /// US warehouse, where purchases land first
    EnAlmacenUs,
    EnTransitoPeru,
    /// Lima store (La Victoria)
    LaVictoria,
    /// Lima store (San Martín de Porres)
    Smp,
}

impl StockLocation {
    pub const ALL: [StockLocation; 4] = [
        StockLocation::EnAlmacenUs,
        StockLocation::EnTransitoPeru,
        StockLocation::LaVictoria,
        StockLocation::Smp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StockLocation::EnAlmacenUs => "en_almacen_us",
            StockLocation::EnTransitoPeru => "en_transito_peru",
            StockLocation::LaVictoria => "la_victoria",
            StockLocation::Smp => "smp",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "en_almacen_us" => Some(StockLocation::EnAlmacenUs),
            "en_transito_peru" => Some(StockLocation::EnTransitoPeru),
            "la_victoria" => Some(StockLocation::LaVictoria),
            "smp" => Some(StockLocation::Smp),
            _ => None,
        }
    }

    /// Locations whose units can be sold over the counter
    pub fn is_sellable(&self) -> bool {
        matches!(self, StockLocation::LaVictoria | StockLocation::Smp)
    }
}

impl std::fmt::Display for StockLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stock arithmetic failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StockError {
    #[error("insufficient stock at {location}: available {available}, requested {requested}")]
    Insufficient {
        location: StockLocation,
        available: u32,
        requested: u32,
    },

    #[error("stock overflow at {location}")]
    Overflow { location: StockLocation },
}

/// Per-location stock quantities of a SKU.
///
/// Quantities are unsigned, so a negative level cannot be represented; every
/// debit is checked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct StockLevels(BTreeMap<StockLocation, u32>);

impl StockLevels {
    /// All named locations initialised to zero
    pub fn zeroed() -> Self {
        Self(StockLocation::ALL.iter().map(|l| (*l, 0)).collect())
    }

    pub fn get(&self, location: StockLocation) -> u32 {
        self.0.get(&location).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.0.values().map(|q| u64::from(*q)).sum()
    }

    pub fn available_for_sale(&self) -> u64 {
        self.0
            .iter()
            .filter(|(location, _)| location.is_sellable())
            .map(|(_, q)| u64::from(*q))
            .sum()
    }

    pub fn credit(&mut self, location: StockLocation, quantity: u32) -> Result<u32, StockError> {
        let current = self.get(location);
        let next = current
            .checked_add(quantity)
            .ok_or(StockError::Overflow { location })?;
        self.0.insert(location, next);
        Ok(next)
    }

    pub fn debit(&mut self, location: StockLocation, quantity: u32) -> Result<u32, StockError> {
        let current = self.get(location);
        let next = current
            .checked_sub(quantity)
            .ok_or(StockError::Insufficient {
                location,
                available: current,
                requested: quantity,
            })?;
        self.0.insert(location, next);
        Ok(next)
    }

    pub fn iter(&self) -> impl Iterator<Item = (StockLocation, u32)> + '_ {
        self.0.iter().map(|(l, q)| (*l, *q))
    }
}

impl Default for StockLevels {
    fn default() -> Self {
        Self::zeroed()
    }
}

/// Generate an id for an entry embedded in a parent document (e.g. `prov_…`)
pub fn new_entry_id(prefix: &str) -> String {
    format!("{}_{}", prefix, uuid::Uuid::new_v4().simple())
}
