use std::fmt;
use std::str::FromStr;

use anyhow::{Result, anyhow, bail};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MIN_NUMBER: u8 = 1;
pub const MAX_NUMBER: u8 = 49;
pub const NUMBER_COUNT: usize = 49;
pub const NORMAL_COUNT: usize = 6;

/// Les deux loteries suivies indépendamment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Primary,
    Secondary,
}

impl Region {
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Primary => "primary",
            Region::Secondary => "secondary",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Region {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "primary" => Ok(Region::Primary),
            "secondary" => Ok(Region::Secondary),
            other => Err(anyhow!("Région inconnue : '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Random,
    Hot,
    Cold,
    Trend,
    Balanced,
    Hybrid,
    Ai,
}

impl Strategy {
    pub const ALL: [Strategy; 7] = [
        Strategy::Random,
        Strategy::Hot,
        Strategy::Cold,
        Strategy::Trend,
        Strategy::Balanced,
        Strategy::Hybrid,
        Strategy::Ai,
    ];

    /// Stratégies ajustées à chaque cycle de règlement (jamais `ai` ni `random`).
    pub const TUNABLE: [Strategy; 5] = [
        Strategy::Hot,
        Strategy::Cold,
        Strategy::Trend,
        Strategy::Balanced,
        Strategy::Hybrid,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Random => "random",
            Strategy::Hot => "hot",
            Strategy::Cold => "cold",
            Strategy::Trend => "trend",
            Strategy::Balanced => "balanced",
            Strategy::Hybrid => "hybrid",
            Strategy::Ai => "ai",
        }
    }

    pub fn is_tunable(&self) -> bool {
        Self::TUNABLE.contains(self)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_lowercase();
        Strategy::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == s)
            .ok_or_else(|| anyhow!("Stratégie inconnue : '{}'", s))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draw {
    pub region: Region,
    /// Clé d'ordre opaque émise par la source (format propre à chaque région).
    pub sequence_id: String,
    pub date: String,
    pub normal_numbers: [u8; NORMAL_COUNT],
    pub special_number: u8,
}

/// Répartition des 6 choix de la stratégie hybride entre ses sous-pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mix {
    pub hot: u8,
    pub cold: u8,
    pub trend: u8,
}

impl Mix {
    pub fn total(&self) -> u8 {
        self.hot + self.cold + self.trend
    }
}

impl Default for Mix {
    fn default() -> Self {
        Self { hot: 2, cold: 2, trend: 2 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub window: u32,
    pub pool_size: u32,
    /// Répartition basse / moyenne / haute (balanced uniquement).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket_counts: Option<[u8; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mix: Option<Mix>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trend_window: Option<u32>,
    #[serde(default)]
    pub last_accuracy: f64,
    #[serde(default)]
    pub last_total: u32,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl StrategyConfig {
    pub fn defaults(strategy: Strategy) -> Self {
        let (window, pool_size) = match strategy {
            Strategy::Hot | Strategy::Cold => (50, 16),
            Strategy::Trend => (15, 12),
            Strategy::Balanced | Strategy::Hybrid => (60, 16),
            Strategy::Random | Strategy::Ai => (10, 16),
        };
        Self {
            window,
            pool_size,
            bucket_counts: (strategy == Strategy::Balanced).then_some([2, 2, 2]),
            mix: (strategy == Strategy::Hybrid).then(Mix::default),
            trend_window: (strategy == Strategy::Hybrid).then_some(15),
            last_accuracy: 0.0,
            last_total: 0,
            updated_at: None,
        }
    }

    /// Répartition basse / moyenne / haute effective.
    pub fn buckets(&self) -> [u8; 3] {
        self.bucket_counts.unwrap_or([2, 2, 2])
    }

    pub fn mix_or_default(&self) -> Mix {
        self.mix.unwrap_or_default()
    }

    pub fn trend_window_or_default(&self) -> u32 {
        self.trend_window.unwrap_or(15)
    }
}

/// Clé de persistance d'une configuration de stratégie.
pub fn config_key(region: Region, strategy: Strategy) -> String {
    format!("strategy_config_{}_{}", region, strategy)
}

/// Prédiction passée avec le résultat réel une fois connu.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPrediction {
    pub strategy: Strategy,
    pub period: String,
    pub predicted_normals: Vec<u8>,
    pub predicted_special: u8,
    pub actual_special: Option<u8>,
    pub is_resolved: bool,
}

impl ResolvedPrediction {
    pub fn special_hit(&self) -> bool {
        self.actual_special == Some(self.predicted_special)
    }

    pub fn normal_hit(&self) -> bool {
        match self.actual_special {
            Some(actual) => self.predicted_normals.contains(&actual),
            None => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewPrediction {
    pub region: Region,
    pub strategy: Strategy,
    pub period: String,
    pub normal_numbers: [u8; NORMAL_COUNT],
    pub special_number: u8,
    pub prediction_text: Option<String>,
}

pub fn validate_draw(normals: &[u8; NORMAL_COUNT], special: u8) -> Result<()> {
    for &n in normals {
        if !(MIN_NUMBER..=MAX_NUMBER).contains(&n) {
            bail!("Numéro {} hors limites (1-49)", n);
        }
    }
    if !(MIN_NUMBER..=MAX_NUMBER).contains(&special) {
        bail!("Numéro spécial {} hors limites (1-49)", special);
    }
    for i in 0..normals.len() {
        for j in (i + 1)..normals.len() {
            if normals[i] == normals[j] {
                bail!("Numéro en double : {}", normals[i]);
            }
        }
    }
    if normals.contains(&special) {
        bail!("Le numéro spécial {} figure déjà parmi les numéros normaux", special);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_draw_ok() {
        assert!(validate_draw(&[1, 2, 3, 4, 5, 6], 7).is_ok());
        assert!(validate_draw(&[49, 48, 47, 46, 45, 44], 1).is_ok());
    }

    #[test]
    fn test_validate_draw_out_of_range() {
        assert!(validate_draw(&[0, 2, 3, 4, 5, 6], 7).is_err());
        assert!(validate_draw(&[1, 2, 3, 4, 5, 50], 7).is_err());
        assert!(validate_draw(&[1, 2, 3, 4, 5, 6], 50).is_err());
    }

    #[test]
    fn test_validate_draw_duplicates() {
        assert!(validate_draw(&[1, 1, 3, 4, 5, 6], 7).is_err());
        assert!(validate_draw(&[1, 2, 3, 4, 5, 6], 6).is_err());
    }

    #[test]
    fn test_strategy_parse_roundtrip() {
        for strategy in Strategy::ALL {
            assert_eq!(strategy.as_str().parse::<Strategy>().unwrap(), strategy);
        }
        assert!("lucky".parse::<Strategy>().is_err());
    }

    #[test]
    fn test_tunable_excludes_ai_and_random() {
        assert!(!Strategy::Ai.is_tunable());
        assert!(!Strategy::Random.is_tunable());
        assert!(Strategy::Hybrid.is_tunable());
    }

    #[test]
    fn test_config_key_format() {
        assert_eq!(
            config_key(Region::Secondary, Strategy::Balanced),
            "strategy_config_secondary_balanced"
        );
    }

    #[test]
    fn test_defaults_per_family() {
        let balanced = StrategyConfig::defaults(Strategy::Balanced);
        assert_eq!(balanced.bucket_counts, Some([2, 2, 2]));
        assert!(balanced.mix.is_none());

        let hybrid = StrategyConfig::defaults(Strategy::Hybrid);
        assert_eq!(hybrid.mix.map(|m| m.total()), Some(6));
        assert_eq!(hybrid.trend_window, Some(15));

        let trend = StrategyConfig::defaults(Strategy::Trend);
        let hot = StrategyConfig::defaults(Strategy::Hot);
        assert!(trend.window < hot.window);
    }

    #[test]
    fn test_config_json_omits_unused_fields() {
        let json = serde_json::to_string(&StrategyConfig::defaults(Strategy::Hot)).unwrap();
        assert!(!json.contains("bucket_counts"));
        let back: StrategyConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, StrategyConfig::defaults(Strategy::Hot));
    }

    #[test]
    fn test_hits() {
        let prediction = ResolvedPrediction {
            strategy: Strategy::Hot,
            period: "001".to_string(),
            predicted_normals: vec![1, 2, 3, 4, 5, 6],
            predicted_special: 10,
            actual_special: Some(4),
            is_resolved: true,
        };
        assert!(!prediction.special_hit());
        assert!(prediction.normal_hit());
    }
}
