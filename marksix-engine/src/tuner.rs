//! Auto-ajustement des paramètres de stratégie à partir du taux de réussite mesuré.
//!
//! Une précision élevée élargit les pools et allonge les fenêtres des
//! stratégies stables ; une précision faible rapproche les tirages du
//! pool moyen et raccourcit les fenêtres.

use chrono::{DateTime, Utc};

use marksix_db::models::{Mix, NORMAL_COUNT, Region, Strategy, StrategyConfig};

use crate::accuracy::{AccuracyReport, accuracy};
use crate::error::Error;
use crate::store::{ConfigStore, PredictionSource};

/// Borne puis tronque (jamais d'arrondi).
fn clamp_trunc(value: f64, min: f64, max: f64) -> u32 {
    value.clamp(min, max) as u32
}

fn sanitize(accuracy: f64) -> f64 {
    if accuracy.is_finite() {
        accuracy.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Répartition [bas, milieu, haut] des 6 choix, somme toujours égale à 6.
///
/// Si le milieu tombe sous 1, il est forcé à 1 et le plus grand des deux
/// extrêmes cède la différence (à égalité, le haut).
pub fn split_buckets(accuracy: f64) -> [u8; 3] {
    let a = sanitize(accuracy);
    let total = NORMAL_COUNT as i32;
    let mut high = clamp_trunc(2.0 + a * 2.0, 1.0, 4.0) as i32;
    let mut low = clamp_trunc(2.0 + (1.0 - a) * 2.0, 1.0, 4.0) as i32;
    let mut mid = total - high - low;

    if mid < 1 {
        mid = 1;
        while low + mid + high > total {
            if low > high {
                low -= 1;
            } else {
                high -= 1;
            }
        }
    }

    [low as u8, mid as u8, high as u8]
}

/// Nouvelle configuration pour une précision mesurée, sans effet de bord.
pub fn retune(
    strategy: Strategy,
    current: &StrategyConfig,
    report: &AccuracyReport,
    now: DateTime<Utc>,
) -> StrategyConfig {
    let mut next = current.clone();
    next.updated_at = Some(now);

    if report.total == 0 {
        next.last_accuracy = 0.0;
        next.last_total = 0;
        return next;
    }

    let a = sanitize(report.ratio);
    next.last_accuracy = a;
    next.last_total = report.total;

    match strategy {
        Strategy::Hot | Strategy::Cold => {
            next.window = clamp_trunc(30.0 + a * 40.0, 20.0, 80.0);
            next.pool_size = clamp_trunc(12.0 + a * 10.0, 10.0, 24.0);
        }
        Strategy::Trend => {
            next.window = clamp_trunc(8.0 + a * 20.0, 8.0, 30.0);
            next.pool_size = clamp_trunc(10.0 + a * 8.0, 8.0, 20.0);
        }
        Strategy::Balanced => {
            next.bucket_counts = Some(split_buckets(a));
            next.window = clamp_trunc(40.0 + a * 40.0, 30.0, 90.0);
            next.pool_size = clamp_trunc(12.0 + a * 10.0, 10.0, 24.0);
        }
        Strategy::Hybrid => {
            let [cold, trend, hot] = split_buckets(a);
            next.mix = Some(Mix { hot, cold, trend });
            next.window = clamp_trunc(40.0 + a * 40.0, 30.0, 90.0);
            next.pool_size = clamp_trunc(12.0 + a * 10.0, 10.0, 24.0);
            next.trend_window = Some(clamp_trunc(8.0 + a * 20.0, 8.0, 30.0));
        }
        // Rien à ajuster : seule la précision est enregistrée.
        Strategy::Random | Strategy::Ai => {}
    }

    next
}

#[derive(Debug)]
pub enum TuneOutcome {
    Applied(StrategyConfig),
    /// Passe abandonnée pour ce cycle ; la configuration persistée reste inchangée.
    Skipped(Error),
}

#[derive(Debug)]
pub struct TuneReport {
    pub strategy: Strategy,
    pub outcome: TuneOutcome,
}

/// Lecture, ajustement puis écriture de la configuration d'un couple (région, stratégie).
pub fn tune<S>(store: &S, region: Region, strategy: Strategy, limit: u32) -> TuneOutcome
where
    S: ConfigStore + PredictionSource + ?Sized,
{
    let report = match accuracy(store, region, Some(strategy), limit) {
        Ok(report) => report,
        Err(e) => return TuneOutcome::Skipped(Error::Store(e)),
    };
    let current = match store.get_config(region, strategy) {
        Ok(config) => config.unwrap_or_else(|| StrategyConfig::defaults(strategy)),
        Err(e) => return TuneOutcome::Skipped(Error::Store(e)),
    };

    let next = retune(strategy, &current, &report, Utc::now());
    if let Err(source) = store.put_config(region, strategy, &next) {
        return TuneOutcome::Skipped(Error::ConfigPersistence { region, strategy, source });
    }

    tracing::info!(
        %region,
        %strategy,
        accuracy = next.last_accuracy,
        total = next.last_total,
        window = next.window,
        pool_size = next.pool_size,
        "stratégie ajustée"
    );
    TuneOutcome::Applied(next)
}

/// Ajuste toutes les stratégies ajustables d'une région. Ne s'interrompt jamais sur un échec.
pub fn run_tuning_cycle<S>(store: &S, region: Region, limit: u32) -> Vec<TuneReport>
where
    S: ConfigStore + PredictionSource + ?Sized,
{
    Strategy::TUNABLE
        .into_iter()
        .map(|strategy| {
            let outcome = tune(store, region, strategy, limit);
            if let TuneOutcome::Skipped(e) = &outcome {
                tracing::warn!(%region, %strategy, error = %e, "ajustement ignoré pour ce cycle");
            }
            TuneReport { strategy, outcome }
        })
        .collect()
}
