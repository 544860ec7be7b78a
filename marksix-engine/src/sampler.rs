use rand::RngExt;
use rand::rngs::StdRng;
use serde::Serialize;

use marksix_db::models::{Draw, MAX_NUMBER, NORMAL_COUNT, Region, Strategy, StrategyConfig};

use crate::analysis::cache::FrequencyCache;
use crate::attributes::Zodiac;
use crate::error::SampleError;
use crate::pools::{Pools, build_pools, clamp_pool_size};

#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    /// Stratégie demandée, sous laquelle la recommandation est suivie.
    pub strategy: Strategy,
    /// Stratégie qui a réellement produit les numéros (diffère après un repli).
    pub source: Strategy,
    pub normal_numbers: [u8; NORMAL_COUNT],
    pub special_number: u8,
    pub special_zodiac: Option<Zodiac>,
    /// Réponse brute du service de génération (stratégie `ai` uniquement).
    pub text: Option<String>,
}

/// Stratégies tentées dans l'ordre ; `random` termine toujours la liste.
pub fn fallback_chain(strategy: Strategy) -> Vec<Strategy> {
    match strategy {
        Strategy::Random | Strategy::Ai => vec![Strategy::Random],
        Strategy::Hybrid => vec![Strategy::Hybrid, Strategy::Balanced, Strategy::Random],
        other => vec![other, Strategy::Random],
    }
}

/// Tire `count` numéros distincts de `pool`, hors `exclude`.
pub fn sample_from_pool(
    pool: &[u8],
    count: usize,
    exclude: &[u8],
    rng: &mut StdRng,
) -> Result<Vec<u8>, SampleError> {
    let mut available: Vec<u8> = pool.iter().copied().filter(|n| !exclude.contains(n)).collect();
    if available.len() < count {
        return Err(SampleError::InsufficientPool {
            requested: count,
            available: available.len(),
        });
    }

    // Fisher-Yates partiel : seuls les `count` premiers emplacements sont mélangés.
    for i in 0..count {
        let j = rng.random_range(i..available.len());
        available.swap(i, j);
    }
    available.truncate(count);
    Ok(available)
}

pub fn random_normals(rng: &mut StdRng) -> [u8; NORMAL_COUNT] {
    let mut normals = [0u8; NORMAL_COUNT];
    let mut picked = 0;
    while picked < NORMAL_COUNT {
        let candidate = rng.random_range(1..=MAX_NUMBER);
        if !normals[..picked].contains(&candidate) {
            normals[picked] = candidate;
            picked += 1;
        }
    }
    normals.sort_unstable();
    normals
}

/// Numéro spécial uniforme parmi les 43 numéros non retenus.
pub fn pick_special(normals: &[u8], rng: &mut StdRng) -> u8 {
    let complement: Vec<u8> = (1..=MAX_NUMBER).filter(|n| !normals.contains(n)).collect();
    complement[rng.random_range(0..complement.len())]
}

/// Entrées d'une tentative d'échantillonnage pour une stratégie locale.
pub struct SampleRequest<'a> {
    pub region: Region,
    pub strategy: Strategy,
    /// Historique complet, le plus récent en premier.
    pub draws: &'a [Draw],
    pub config: &'a StrategyConfig,
}

fn window_pools(
    region: Region,
    draws: &[Draw],
    window: u32,
    pool_size: u32,
    cache: &mut FrequencyCache,
) -> Result<Pools, SampleError> {
    let slice = &draws[..draws.len().min(window as usize)];
    let freq = cache.frequencies(region, slice);
    if !freq.has_signal() {
        return Err(SampleError::NoFrequencySignal);
    }
    Ok(build_pools(&freq, clamp_pool_size(pool_size)))
}

/// Tire séquentiellement dans chaque couple (pool, quantité) en excluant les numéros déjà pris.
fn sample_buckets(buckets: &[(&[u8], u8)], rng: &mut StdRng) -> Result<Vec<u8>, SampleError> {
    let mut chosen = Vec::with_capacity(NORMAL_COUNT);
    for &(pool, count) in buckets {
        let picked = sample_from_pool(pool, count as usize, &chosen, rng)?;
        chosen.extend(picked);
    }
    Ok(chosen)
}

/// Choisit les 6 numéros normaux d'une stratégie locale.
///
/// `ai` n'est jamais échantillonné ici : le moteur le traite en amont.
pub fn pick_normals(
    request: &SampleRequest<'_>,
    cache: &mut FrequencyCache,
    rng: &mut StdRng,
) -> Result<[u8; NORMAL_COUNT], SampleError> {
    let config = request.config;
    let chosen = match request.strategy {
        Strategy::Random | Strategy::Ai => return Ok(random_normals(rng)),
        Strategy::Hot | Strategy::Trend => {
            let pools = window_pools(request.region, request.draws, config.window, config.pool_size, cache)?;
            sample_from_pool(&pools.high, NORMAL_COUNT, &[], rng)?
        }
        Strategy::Cold => {
            let pools = window_pools(request.region, request.draws, config.window, config.pool_size, cache)?;
            sample_from_pool(&pools.low, NORMAL_COUNT, &[], rng)?
        }
        Strategy::Balanced => {
            let pools = window_pools(request.region, request.draws, config.window, config.pool_size, cache)?;
            let [low, mid, high] = config.buckets();
            sample_buckets(
                &[
                    (pools.low.as_slice(), low),
                    (pools.mid.as_slice(), mid),
                    (pools.high.as_slice(), high),
                ],
                rng,
            )?
        }
        Strategy::Hybrid => {
            let main = window_pools(request.region, request.draws, config.window, config.pool_size, cache)?;
            let trend = window_pools(
                request.region,
                request.draws,
                config.trend_window_or_default(),
                config.pool_size,
                cache,
            )?;
            let mix = config.mix_or_default();
            sample_buckets(
                &[
                    (main.high.as_slice(), mix.hot),
                    (main.low.as_slice(), mix.cold),
                    (trend.high.as_slice(), mix.trend),
                ],
                rng,
            )?
        }
    };

    let available = chosen.len();
    let mut normals: [u8; NORMAL_COUNT] = chosen.try_into().map_err(|_| SampleError::InsufficientPool {
        requested: NORMAL_COUNT,
        available,
    })?;
    normals.sort_unstable();
    Ok(normals)
}
