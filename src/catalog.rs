//! Server-controlled catalog of events, waiver texts, license types and
//! merchandise. Loaded once at startup and shared read-only.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashSet;

const BUILTIN_CATALOG: &str = include_str!("../catalog/default.json");

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogWaiver {
    pub version: String,
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogEvent {
    pub id: String,
    pub name: String,
    pub fee_minor: i64,
    #[serde(default)]
    pub waivers: Vec<CatalogWaiver>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LicenseType {
    pub code: String,
    pub name: String,
    pub fee_minor: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Product {
    pub sku: String,
    pub name: String,
    pub price_minor: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub events: Vec<CatalogEvent>,
    #[serde(default)]
    pub licenses: Vec<LicenseType>,
    #[serde(default)]
    pub products: Vec<Product>,
}

impl Catalog {
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_CATALOG).context("embedded catalog is invalid")
    }

    pub fn from_path(path: &str) -> Result<Self> {
        let raw = std::fs::read_to_string(path).with_context(|| format!("reading catalog {path}"))?;
        Self::from_json(&raw).with_context(|| format!("parsing catalog {path}"))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let catalog: Catalog = serde_json::from_str(raw)?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn event(&self, event_id: &str) -> Option<&CatalogEvent> {
        self.events.iter().find(|e| e.id == event_id)
    }

    pub fn license(&self, code: &str) -> Option<&LicenseType> {
        self.licenses.iter().find(|l| l.code.eq_ignore_ascii_case(code))
    }

    pub fn product(&self, sku: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.sku.eq_ignore_ascii_case(sku))
    }

    fn validate(&self) -> Result<()> {
        let mut event_ids = HashSet::new();
        for event in &self.events {
            if !event_ids.insert(event.id.as_str()) {
                bail!("duplicate event id {}", event.id);
            }
            if event.fee_minor <= 0 {
                bail!("event {} must have a positive fee", event.id);
            }
            let mut versions = HashSet::new();
            for waiver in &event.waivers {
                if !versions.insert(waiver.version.as_str()) {
                    bail!("duplicate waiver version {} for event {}", waiver.version, event.id);
                }
                if waiver.text.trim().is_empty() {
                    bail!("empty waiver text for event {} version {}", event.id, waiver.version);
                }
            }
        }
        if self.licenses.iter().any(|l| l.fee_minor <= 0) {
            bail!("license fees must be positive");
        }
        if self.products.iter().any(|p| p.price_minor <= 0) {
            bail!("product prices must be positive");
        }
        Ok(())
    }
}
