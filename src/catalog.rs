//! Service reachability and the conversion-mode catalog.
//!
//! Neither call gates a conversion. Health only drives a status indicator,
//! and the catalog always resolves: when `/modes` cannot be used for any
//! reason the built-in three-mode catalog stands in.

use crate::config::ConversionMode;
use crate::service::{ConversionService, ModeInfo};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{error, warn};

/// Reachability indicator for the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceHealth {
    /// No health check has completed yet.
    #[default]
    Checking,
    Online,
    Offline,
}

/// Probe `/health`. Any failure reads as offline.
pub async fn check_health(service: &dyn ConversionService) -> ServiceHealth {
    match service.health().await {
        Ok(()) => ServiceHealth::Online,
        Err(e) => {
            error!("Server health check failed: {}", e);
            ServiceHealth::Offline
        }
    }
}

/// Where a catalog came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogSource {
    Service,
    BuiltIn,
}

/// Conversion modes offered to the user, keyed by wire name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModeCatalog {
    pub modes: BTreeMap<String, ModeInfo>,
    pub source: CatalogSource,
}

impl ModeCatalog {
    /// The fixed catalog used when the service's one is unavailable.
    pub fn builtin() -> Self {
        let mode = |name: &str, description: &str, features: &[&str]| ModeInfo {
            name: name.to_string(),
            description: description.to_string(),
            features: features.iter().map(|f| f.to_string()).collect(),
        };

        let modes = BTreeMap::from([
            (
                ConversionMode::Basic.as_str().to_string(),
                mode(
                    "Basic",
                    "Convert text and tables only",
                    &["Text formatting", "Tables", "Fast conversion"],
                ),
            ),
            (
                ConversionMode::Enhanced.as_str().to_string(),
                mode(
                    "Enhanced",
                    "Includes images with optimization",
                    &["Text formatting", "Tables", "Images", "Image optimization"],
                ),
            ),
            (
                ConversionMode::Complete.as_str().to_string(),
                mode(
                    "Complete",
                    "Full document with headers and footers",
                    &[
                        "Text formatting",
                        "Tables",
                        "Images",
                        "Headers/Footers",
                        "Page layout",
                    ],
                ),
            ),
        ]);

        Self {
            modes,
            source: CatalogSource::BuiltIn,
        }
    }

    pub fn get(&self, mode: ConversionMode) -> Option<&ModeInfo> {
        self.modes.get(mode.as_str())
    }
}

/// Fetch `/modes`, falling back to [`ModeCatalog::builtin`] on any failure
/// or an empty answer.
pub async fn load_modes(service: &dyn ConversionService) -> ModeCatalog {
    match service.modes().await {
        Ok(modes) if !modes.is_empty() => ModeCatalog {
            modes,
            source: CatalogSource::Service,
        },
        Ok(_) => {
            warn!("Service returned no conversion modes; using built-in modes");
            ModeCatalog::builtin()
        }
        Err(e) => {
            error!("Failed to load conversion modes: {}", e);
            ModeCatalog::builtin()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_has_exactly_three_modes_with_features() {
        let catalog = ModeCatalog::builtin();
        let keys: Vec<_> = catalog.modes.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["basic", "complete", "enhanced"]);
        for info in catalog.modes.values() {
            assert!(!info.features.is_empty(), "{} has no features", info.name);
            assert!(!info.description.is_empty());
        }
        assert_eq!(
            catalog.get(ConversionMode::Complete).unwrap().features.len(),
            5
        );
    }

    #[test]
    fn health_serialises_lowercase() {
        assert_eq!(
            serde_json::to_string(&ServiceHealth::Offline).unwrap(),
            "\"offline\""
        );
    }
}
