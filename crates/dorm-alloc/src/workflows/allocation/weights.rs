use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::domain::{WeightDimension, WeightEntry};

const DEFAULT_QUESTIONNAIRE_WEIGHT: f64 = 0.30;
const DEFAULT_TAG_WEIGHT: f64 = 0.15;
const DEFAULT_MAJOR_WEIGHT: f64 = 0.35;
const DEFAULT_GENDER_WEIGHT: f64 = 0.0;
const DEFAULT_BED_TYPE_WEIGHT: f64 = 0.20;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct DimensionSetting {
    weight: f64,
    enabled: bool,
}

/// Weight snapshot loaded once per run and handed to the scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightConfig {
    settings: BTreeMap<WeightDimension, DimensionSetting>,
}

impl Default for WeightConfig {
    fn default() -> Self {
        let settings = WeightDimension::ordered()
            .into_iter()
            .map(|dimension| {
                let weight = match dimension {
                    WeightDimension::Questionnaire => DEFAULT_QUESTIONNAIRE_WEIGHT,
                    WeightDimension::Tag => DEFAULT_TAG_WEIGHT,
                    WeightDimension::Major => DEFAULT_MAJOR_WEIGHT,
                    WeightDimension::Gender => DEFAULT_GENDER_WEIGHT,
                    WeightDimension::BedType => DEFAULT_BED_TYPE_WEIGHT,
                };
                (
                    dimension,
                    DimensionSetting {
                        weight,
                        enabled: true,
                    },
                )
            })
            .collect();

        Self { settings }
    }
}

impl WeightConfig {
    /// Overlays stored entries on the defaults. Dimensions without a stored
    /// entry keep their default weight; out-of-range weights are clamped.
    pub fn from_entries(entries: &[WeightEntry]) -> Self {
        let mut config = Self::default();
        for entry in entries {
            let weight = if entry.weight.is_finite() {
                entry.weight.clamp(0.0, 1.0)
            } else {
                0.0
            };
            if weight != entry.weight {
                warn!(
                    dimension = entry.dimension.label(),
                    stored = entry.weight,
                    applied = weight,
                    "weight outside [0, 1] clamped"
                );
            }
            config.settings.insert(
                entry.dimension,
                DimensionSetting {
                    weight,
                    enabled: entry.enabled,
                },
            );
        }
        config
    }

    /// Weight of an enabled dimension, `None` when disabled.
    pub fn enabled_weight(&self, dimension: WeightDimension) -> Option<f64> {
        self.settings
            .get(&dimension)
            .filter(|setting| setting.enabled)
            .map(|setting| setting.weight)
    }

    pub fn is_enabled(&self, dimension: WeightDimension) -> bool {
        self.enabled_weight(dimension).is_some()
    }

    /// Effective weight per dimension; disabled dimensions report zero.
    pub fn snapshot(&self) -> BTreeMap<WeightDimension, f64> {
        WeightDimension::ordered()
            .into_iter()
            .map(|dimension| (dimension, self.enabled_weight(dimension).unwrap_or(0.0)))
            .collect()
    }

    pub fn entries(&self) -> Vec<WeightEntry> {
        self.settings
            .iter()
            .map(|(dimension, setting)| WeightEntry {
                dimension: *dimension,
                weight: setting.weight,
                enabled: setting.enabled,
            })
            .collect()
    }
}
