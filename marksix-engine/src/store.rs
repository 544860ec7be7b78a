//! Interfaces vers les collaborateurs de stockage.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use anyhow::{Result, bail};
use marksix_db::db;
use marksix_db::models::{Draw, Region, ResolvedPrediction, Strategy, StrategyConfig, config_key};
use marksix_db::rusqlite::Connection;

pub trait DrawHistory {
    /// Les `window` derniers tirages, le plus récent en premier, sans doublon de `sequence_id`.
    fn history(&self, region: Region, window: u32) -> Result<Vec<Draw>>;
}

pub trait ConfigStore {
    fn get_config(&self, region: Region, strategy: Strategy) -> Result<Option<StrategyConfig>>;
    fn put_config(&self, region: Region, strategy: Strategy, config: &StrategyConfig) -> Result<()>;
}

pub trait PredictionSource {
    /// Prédictions résolues, la plus récente en premier, `strategy = None` pour toutes.
    fn resolved_predictions(
        &self,
        region: Region,
        strategy: Option<Strategy>,
        limit: u32,
    ) -> Result<Vec<ResolvedPrediction>>;
}

impl DrawHistory for Connection {
    fn history(&self, region: Region, window: u32) -> Result<Vec<Draw>> {
        db::fetch_last_draws(self, region, window)
    }
}

impl ConfigStore for Connection {
    fn get_config(&self, region: Region, strategy: Strategy) -> Result<Option<StrategyConfig>> {
        db::get_strategy_config(self, region, strategy)
    }

    fn put_config(&self, region: Region, strategy: Strategy, config: &StrategyConfig) -> Result<()> {
        db::put_strategy_config(self, region, strategy, config)
    }
}

impl PredictionSource for Connection {
    fn resolved_predictions(
        &self,
        region: Region,
        strategy: Option<Strategy>,
        limit: u32,
    ) -> Result<Vec<ResolvedPrediction>> {
        db::fetch_resolved_predictions(self, region, strategy, limit)
    }
}

/// Stockage en mémoire, pour les tests et les simulations hors base.
#[derive(Debug, Default)]
pub struct MemoryStore {
    draws: RefCell<Vec<Draw>>,
    configs: RefCell<HashMap<String, StrategyConfig>>,
    predictions: RefCell<Vec<(Region, ResolvedPrediction)>>,
    fail_writes: Cell<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ajoute un tirage en tête d'historique.
    pub fn push_draw(&self, draw: Draw) {
        self.draws.borrow_mut().insert(0, draw);
    }

    /// Ajoute une prédiction résolue, considérée comme la plus récente.
    pub fn push_prediction(&self, region: Region, prediction: ResolvedPrediction) {
        self.predictions.borrow_mut().insert(0, (region, prediction));
    }

    /// Fait échouer toutes les écritures de configuration suivantes.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }
}

impl DrawHistory for MemoryStore {
    fn history(&self, region: Region, window: u32) -> Result<Vec<Draw>> {
        Ok(self
            .draws
            .borrow()
            .iter()
            .filter(|d| d.region == region)
            .take(window as usize)
            .cloned()
            .collect())
    }
}

impl ConfigStore for MemoryStore {
    fn get_config(&self, region: Region, strategy: Strategy) -> Result<Option<StrategyConfig>> {
        Ok(self.configs.borrow().get(&config_key(region, strategy)).cloned())
    }

    fn put_config(&self, region: Region, strategy: Strategy, config: &StrategyConfig) -> Result<()> {
        if self.fail_writes.get() {
            bail!("écriture refusée pour {}", config_key(region, strategy));
        }
        self.configs
            .borrow_mut()
            .insert(config_key(region, strategy), config.clone());
        Ok(())
    }
}

impl PredictionSource for MemoryStore {
    fn resolved_predictions(
        &self,
        region: Region,
        strategy: Option<Strategy>,
        limit: u32,
    ) -> Result<Vec<ResolvedPrediction>> {
        Ok(self
            .predictions
            .borrow()
            .iter()
            .filter(|(r, p)| *r == region && p.is_resolved && p.actual_special.is_some())
            .filter(|(_, p)| strategy.is_none_or(|s| p.strategy == s))
            .take(limit as usize)
            .map(|(_, p)| p.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marksix_db::models::NewPrediction;

    #[test]
    fn test_sqlite_store_roundtrip() {
        let conn = Connection::open_in_memory().unwrap();
        db::migrate(&conn).unwrap();

        let draw = Draw {
            region: Region::Primary,
            sequence_id: "24/001".to_string(),
            date: "2024-01-02".to_string(),
            normal_numbers: [1, 2, 3, 4, 5, 6],
            special_number: 9,
        };
        db::upsert_draw(&conn, &draw).unwrap();
        assert_eq!(conn.history(Region::Primary, 10).unwrap(), vec![draw.clone()]);

        let config = StrategyConfig::defaults(Strategy::Trend);
        conn.put_config(Region::Primary, Strategy::Trend, &config).unwrap();
        assert_eq!(conn.get_config(Region::Primary, Strategy::Trend).unwrap(), Some(config));

        db::insert_prediction(&conn, &NewPrediction {
            region: Region::Primary,
            strategy: Strategy::Trend,
            period: "24/001".to_string(),
            normal_numbers: [9, 10, 11, 12, 13, 14],
            special_number: 20,
            prediction_text: None,
        }).unwrap();
        db::resolve_predictions(&conn, &draw).unwrap();
        let resolved = conn.resolved_predictions(Region::Primary, Some(Strategy::Trend), 200).unwrap();
        assert_eq!(resolved.len(), 1);
        assert!(resolved[0].normal_hit());
    }

    #[test]
    fn test_memory_store_filters() {
        let store = MemoryStore::new();
        let prediction = |strategy: Strategy, resolved: bool| ResolvedPrediction {
            strategy,
            period: "001".to_string(),
            predicted_normals: vec![1, 2, 3, 4, 5, 6],
            predicted_special: 7,
            actual_special: resolved.then_some(7),
            is_resolved: resolved,
        };
        store.push_prediction(Region::Primary, prediction(Strategy::Hot, true));
        store.push_prediction(Region::Primary, prediction(Strategy::Cold, true));
        store.push_prediction(Region::Primary, prediction(Strategy::Hot, false));
        store.push_prediction(Region::Secondary, prediction(Strategy::Hot, true));

        assert_eq!(store.resolved_predictions(Region::Primary, None, 200).unwrap().len(), 2);
        assert_eq!(store.resolved_predictions(Region::Primary, Some(Strategy::Hot), 200).unwrap().len(), 1);
        assert_eq!(store.resolved_predictions(Region::Primary, None, 1).unwrap().len(), 1);
    }

    #[test]
    fn test_memory_store_failing_writes() {
        let store = MemoryStore::new();
        store.set_fail_writes(true);
        let config = StrategyConfig::defaults(Strategy::Hot);
        assert!(store.put_config(Region::Primary, Strategy::Hot, &config).is_err());
        assert!(store.get_config(Region::Primary, Strategy::Hot).unwrap().is_none());
    }
}
