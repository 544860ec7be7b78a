//! Point d'entrée du moteur : recommandation avec repli et boucle d'ajustement.

use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;

use marksix_db::models::{Draw, Region, Strategy, StrategyConfig};

use crate::accuracy::{AccuracyReport, DEFAULT_ACCURACY_LIMIT, accuracy};
use crate::ai::{AI_HISTORY, TextGenerator, build_prompt, clamp_timeout, parse_numbers};
use crate::analysis::cache::FrequencyCache;
use crate::attributes::{Zodiac, zodiac};
use crate::error::AiError;
use crate::sampler::{Recommendation, SampleRequest, fallback_chain, pick_normals, pick_special, random_normals};
use crate::store::{ConfigStore, PredictionSource};
use crate::tuner::{self, TuneReport};

const DEFAULT_AI_TIMEOUT_SECS: u64 = 60;

pub struct Engine<S> {
    store: S,
    rng: StdRng,
    cache: FrequencyCache,
    generator: Option<Box<dyn TextGenerator>>,
    ai_timeout: Duration,
    accuracy_limit: u32,
}

impl<S: ConfigStore + PredictionSource> Engine<S> {
    pub fn new(store: S) -> Self {
        Self::with_rng(store, StdRng::seed_from_u64(rand::random()))
    }

    pub fn with_seed(store: S, seed: u64) -> Self {
        Self::with_rng(store, StdRng::seed_from_u64(seed))
    }

    fn with_rng(store: S, rng: StdRng) -> Self {
        Self {
            store,
            rng,
            cache: FrequencyCache::new(),
            generator: None,
            ai_timeout: clamp_timeout(DEFAULT_AI_TIMEOUT_SECS),
            accuracy_limit: DEFAULT_ACCURACY_LIMIT,
        }
    }

    pub fn with_generator(mut self, generator: Box<dyn TextGenerator>, timeout: Duration) -> Self {
        self.generator = Some(generator);
        self.ai_timeout = clamp_timeout(timeout.as_secs());
        self
    }

    pub fn with_accuracy_limit(mut self, limit: u32) -> Self {
        self.accuracy_limit = limit;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Configuration courante ; à défaut, les valeurs initiales sont renvoyées.
    ///
    /// Seules les stratégies ajustables voient ces valeurs initiales persistées.
    pub fn config(&self, region: Region, strategy: Strategy) -> StrategyConfig {
        match self.store.get_config(region, strategy) {
            Ok(Some(config)) => config,
            Ok(None) => {
                let config = StrategyConfig::defaults(strategy);
                if !strategy.is_tunable() {
                    return config;
                }
                if let Err(e) = self.store.put_config(region, strategy, &config) {
                    tracing::warn!(%region, %strategy, error = %e, "configuration initiale non enregistrée");
                }
                config
            }
            Err(e) => {
                tracing::warn!(%region, %strategy, error = %e, "lecture de configuration impossible, valeurs par défaut");
                StrategyConfig::defaults(strategy)
            }
        }
    }

    /// À appeler après toute modification de l'historique de `region`.
    pub fn invalidate_history(&mut self, region: Region) {
        self.cache.invalidate(region);
    }

    /// Recommandation pour `strategy` sur `draws` (le plus récent en premier).
    ///
    /// Seule la stratégie `ai` peut échouer ; les autres se replient jusqu'à `random`.
    pub fn recommend(
        &mut self,
        region: Region,
        strategy: Strategy,
        draws: &[Draw],
    ) -> Result<Recommendation, AiError> {
        if strategy == Strategy::Ai {
            return self.recommend_ai(region, draws);
        }

        let mut produced = None;
        for candidate in fallback_chain(strategy) {
            let config = self.config(region, candidate);
            let request = SampleRequest { region, strategy: candidate, draws, config: &config };
            match pick_normals(&request, &mut self.cache, &mut self.rng) {
                Ok(normals) => {
                    produced = Some((candidate, normals));
                    break;
                }
                Err(e) => {
                    tracing::warn!(%region, strategy = %candidate, error = %e, "repli vers la stratégie suivante");
                }
            }
        }
        let (source, normal_numbers) =
            produced.unwrap_or_else(|| (Strategy::Random, random_normals(&mut self.rng)));

        let special_number = pick_special(&normal_numbers, &mut self.rng);
        Ok(Recommendation {
            strategy,
            source,
            normal_numbers,
            special_number,
            special_zodiac: region_zodiac(region, special_number),
            text: None,
        })
    }

    fn recommend_ai(&mut self, region: Region, draws: &[Draw]) -> Result<Recommendation, AiError> {
        let generator = self.generator.as_ref().ok_or(AiError::NotConfigured)?;
        let recent = &draws[..draws.len().min(AI_HISTORY as usize)];
        let prompt = build_prompt(region, recent);

        let text = generator.generate_text(&prompt, self.ai_timeout)?;
        let parsed = parse_numbers(&text).inspect_err(|_| {
            tracing::warn!(%region, "réponse du service de génération inexploitable");
        })?;

        Ok(Recommendation {
            strategy: Strategy::Ai,
            source: Strategy::Ai,
            normal_numbers: parsed.normals,
            special_number: parsed.special,
            special_zodiac: region_zodiac(region, parsed.special),
            text: Some(text),
        })
    }

    pub fn accuracy(&self, region: Region, strategy: Option<Strategy>) -> anyhow::Result<AccuracyReport> {
        accuracy(&self.store, region, strategy, self.accuracy_limit)
    }

    pub fn run_tuning_cycle(&self, region: Region) -> Vec<TuneReport> {
        tuner::run_tuning_cycle(&self.store, region, self.accuracy_limit)
    }
}

fn region_zodiac(region: Region, special: u8) -> Option<Zodiac> {
    match region {
        Region::Primary => zodiac(special),
        Region::Secondary => None,
    }
}
