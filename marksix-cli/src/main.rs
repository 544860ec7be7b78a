mod display;
mod import;
mod settings;

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use marksix_db::db::{
    count_draws, fetch_draw, fetch_draws_by_year, insert_prediction, migrate, open_db, pending_periods,
    resolve_predictions,
};
use marksix_db::models::{Draw, NewPrediction, Region, Strategy};
use marksix_db::rusqlite::Connection;
use marksix_engine::ai::{AI_HISTORY, HttpTextGenerator};
use marksix_engine::analysis::special_stats;
use marksix_engine::attributes::{search_draws, special_color_frequency, special_zodiac_frequency};
use marksix_engine::sampler::fallback_chain;
use marksix_engine::store::DrawHistory;
use marksix_engine::{AiError, Engine};

use crate::display::{
    display_accuracy, display_configs, display_draws, display_import_summary, display_recommendation,
    display_search, display_stats, display_tune_reports,
};
use crate::settings::Settings;

#[derive(Parser)]
#[command(name = "marksix", about = "Moteur de recommandation Mark Six auto-ajusté")]
struct Cli {
    /// Fichier de configuration TOML
    #[arg(short, long, default_value = "marksix.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Importer les tirages depuis un fichier CSV
    Import {
        /// Chemin vers le fichier CSV (region;sequence_id;date;n1..n6;special)
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Afficher le chemin de la base de données
    DbPath,

    /// Lister les derniers tirages
    List {
        #[arg(short, long, value_enum, default_value = "primary")]
        region: Region,

        /// Nombre de tirages à afficher
        #[arg(short, long, default_value = "10")]
        last: u32,

        /// Limiter aux tirages d'une année
        #[arg(short, long)]
        year: Option<i32>,
    },

    /// Statistiques du numéro spécial (fréquences, retards, couleurs, signes)
    Stats {
        #[arg(short, long, value_enum, default_value = "primary")]
        region: Region,

        /// Fenêtre d'analyse (nombre de tirages)
        #[arg(short, long, default_value = "100")]
        window: u32,

        /// Limiter aux tirages d'une année
        #[arg(short, long)]
        year: Option<i32>,
    },

    /// Rechercher les tirages par numéro spécial ou par signe
    Search {
        #[arg(short, long, value_enum, default_value = "primary")]
        region: Region,

        /// Numéro spécial (ex. 7) ou signe (ex. 虎)
        #[arg(short, long)]
        term: String,

        /// Limiter aux tirages d'une année
        #[arg(short, long)]
        year: Option<i32>,
    },

    /// Recommander 6 numéros et un spécial
    Recommend {
        #[arg(short, long, value_enum, default_value = "primary")]
        region: Region,

        #[arg(short, long, value_enum, default_value = "hybrid")]
        strategy: Strategy,

        /// Période visée par la recommandation
        #[arg(short, long)]
        period: Option<String>,

        /// Enregistrer la recommandation pour le suivi de précision
        #[arg(long, requires = "period")]
        save: bool,

        /// Seed pour la reproductibilité
        #[arg(long)]
        seed: Option<u64>,

        /// Historique limité aux tirages d'une année
        #[arg(short, long)]
        year: Option<i32>,
    },

    /// Résoudre les prédictions en attente puis ajuster les stratégies
    Settle {
        #[arg(short, long, value_enum, default_value = "primary")]
        region: Region,
    },

    /// Précision des recommandations enregistrées
    Accuracy {
        #[arg(short, long, value_enum, default_value = "primary")]
        region: Region,

        /// Limiter à une stratégie
        #[arg(short, long, value_enum)]
        strategy: Option<Strategy>,
    },

    /// Afficher la configuration de chaque stratégie
    Config {
        #[arg(short, long, value_enum, default_value = "primary")]
        region: Region,
    },

    /// Lancer un cycle d'ajustement
    Tune {
        #[arg(short, long, value_enum, default_value = "primary")]
        region: Region,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let cli = Cli::parse();
    let settings = settings::load(&cli.config)?;
    let conn = open_db(&settings.database)?;
    migrate(&conn)?;

    match cli.command {
        Command::Import { file } => cmd_import(&conn, &file),
        Command::DbPath => {
            println!("{}", settings.database.display());
            Ok(())
        }
        Command::List { region, last, year } => cmd_list(&conn, region, last, year),
        Command::Stats { region, window, year } => cmd_stats(&conn, region, window, year),
        Command::Search { region, term, year } => cmd_search(&conn, region, &term, year),
        Command::Recommend {
            region,
            strategy,
            period,
            save,
            seed,
            year,
        } => cmd_recommend(conn, &settings, region, strategy, period, save, seed, year),
        Command::Settle { region } => cmd_settle(conn, &settings, region),
        Command::Accuracy { region, strategy } => cmd_accuracy(conn, &settings, region, strategy),
        Command::Config { region } => cmd_config(conn, &settings, region),
        Command::Tune { region } => cmd_tune(conn, &settings, region),
    }
}

fn build_engine(conn: Connection, settings: &Settings, seed: Option<u64>) -> Engine<Connection> {
    let engine = match seed {
        Some(seed) => Engine::with_seed(conn, seed),
        None => Engine::new(conn),
    };
    engine.with_accuracy_limit(settings.accuracy_limit)
}

fn ensure_draws(conn: &Connection, region: Region) -> Result<Option<u32>> {
    let n = count_draws(conn, region)?;
    if n == 0 {
        println!("Aucun tirage pour {}. Lancez d'abord : marksix import", region);
        return Ok(None);
    }
    Ok(Some(n))
}

/// Derniers tirages, éventuellement restreints à une année.
fn recent_draws(conn: &Connection, region: Region, year: Option<i32>, limit: u32) -> Result<Vec<Draw>> {
    match year {
        Some(year) => fetch_draws_by_year(conn, region, year, limit),
        None => conn.history(region, limit),
    }
}

fn cmd_import(conn: &Connection, file: &Path) -> Result<()> {
    let result = import::import_csv(conn, file)?;
    display_import_summary(&result);
    Ok(())
}

fn cmd_list(conn: &Connection, region: Region, last: u32, year: Option<i32>) -> Result<()> {
    if ensure_draws(conn, region)?.is_none() {
        return Ok(());
    }
    let draws = recent_draws(conn, region, year, last)?;
    display_draws(&draws);
    Ok(())
}

fn cmd_stats(conn: &Connection, region: Region, window: u32, year: Option<i32>) -> Result<()> {
    let Some(n) = ensure_draws(conn, region)? else {
        return Ok(());
    };
    let draws = recent_draws(conn, region, year, window.min(n))?;
    if draws.is_empty() {
        println!("Aucun tirage pour {} sur cette période.", region);
        return Ok(());
    }
    let effective_window = draws.len() as u32;

    display_stats(
        region,
        &special_stats(&draws),
        &special_color_frequency(&draws),
        &special_zodiac_frequency(&draws),
        effective_window,
    );
    Ok(())
}

fn cmd_search(conn: &Connection, region: Region, term: &str, year: Option<i32>) -> Result<()> {
    let Some(n) = ensure_draws(conn, region)? else {
        return Ok(());
    };
    let draws = recent_draws(conn, region, year, n)?;
    display_search(term, &search_draws(&draws, term));
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_recommend(
    conn: Connection,
    settings: &Settings,
    region: Region,
    strategy: Strategy,
    period: Option<String>,
    save: bool,
    seed: Option<u64>,
    year: Option<i32>,
) -> Result<()> {
    let mut engine = build_engine(conn, settings, seed);

    if strategy == Strategy::Ai {
        let ai = &settings.ai;
        match HttpTextGenerator::new(&ai.endpoint, &ai.model, &ai.api_key, ai.temperature) {
            Ok(generator) => engine = engine.with_generator(Box::new(generator), ai.timeout()),
            Err(AiError::NotConfigured) => {}
            Err(e) => return Err(e.into()),
        }
    }

    // Historique suffisant pour la plus grande fenêtre de la chaîne de repli.
    let depth = fallback_chain(strategy)
        .into_iter()
        .chain(std::iter::once(strategy))
        .map(|s| {
            let config = engine.config(region, s);
            config.window.max(config.trend_window.unwrap_or(0))
        })
        .max()
        .unwrap_or(0)
        .max(AI_HISTORY);
    let draws = recent_draws(engine.store(), region, year, depth)?;

    let rec = match engine.recommend(region, strategy, &draws) {
        Ok(rec) => rec,
        Err(AiError::NotConfigured) => {
            bail!("Stratégie ai non configurée : renseignez ai.api_key dans la configuration ou MARKSIX__AI__API_KEY")
        }
        Err(AiError::Parse) => {
            bail!("La réponse du service n'a pas pu être interprétée. Réessayez ou choisissez une autre stratégie.")
        }
        Err(AiError::Transport(e)) => {
            bail!("Service de génération injoignable ({}). Réessayez plus tard ou choisissez une autre stratégie.", e)
        }
    };
    display_recommendation(region, &rec);

    if let Some(period) = period.filter(|_| save) {
        let id = insert_prediction(engine.store(), &NewPrediction {
            region,
            strategy: rec.strategy,
            period: period.clone(),
            normal_numbers: rec.normal_numbers,
            special_number: rec.special_number,
            prediction_text: rec.text.clone(),
        })?;
        tracing::info!(id, %period, %strategy, "recommandation enregistrée");
    }
    Ok(())
}

fn cmd_settle(conn: Connection, settings: &Settings, region: Region) -> Result<()> {
    let mut resolved = 0;
    for period in pending_periods(&conn, region)? {
        match fetch_draw(&conn, region, &period)? {
            Some(draw) => resolved += resolve_predictions(&conn, &draw)?,
            None => tracing::debug!(%region, %period, "tirage pas encore disponible"),
        }
    }
    println!("{} prédiction(s) résolue(s) pour {}.", resolved, region);

    let engine = build_engine(conn, settings, None);
    let reports = engine.run_tuning_cycle(region);
    display_tune_reports(region, &reports);
    Ok(())
}

fn cmd_accuracy(conn: Connection, settings: &Settings, region: Region, strategy: Option<Strategy>) -> Result<()> {
    let engine = build_engine(conn, settings, None);
    let report = engine.accuracy(region, strategy)?;
    display_accuracy(region, strategy, &report);
    Ok(())
}

fn cmd_config(conn: Connection, settings: &Settings, region: Region) -> Result<()> {
    let engine = build_engine(conn, settings, None);
    let configs: Vec<_> = Strategy::ALL
        .into_iter()
        .map(|s| (s, engine.config(region, s)))
        .collect();
    display_configs(region, &configs);
    Ok(())
}

fn cmd_tune(conn: Connection, settings: &Settings, region: Region) -> Result<()> {
    let engine = build_engine(conn, settings, None);
    let reports = engine.run_tuning_cycle(region);
    display_tune_reports(region, &reports);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use marksix_db::db::upsert_draw;

    fn stored(conn: &Connection, id: &str, date: &str, special: u8) {
        upsert_draw(conn, &Draw {
            region: Region::Primary,
            sequence_id: id.to_string(),
            date: date.to_string(),
            normal_numbers: [2, 3, 4, 5, 6, 8],
            special_number: special,
        })
        .unwrap();
    }

    fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        stored(&conn, "23/150", "2023-12-30", 13);
        stored(&conn, "24/001", "2024-01-02", 1);
        stored(&conn, "24/002", "2024-01-04", 20);
        conn
    }

    #[test]
    fn test_recent_draws_year_scope() {
        let conn = memory_db();
        assert_eq!(recent_draws(&conn, Region::Primary, None, 10).unwrap().len(), 3);

        let ids: Vec<_> = recent_draws(&conn, Region::Primary, Some(2024), 10)
            .unwrap()
            .into_iter()
            .map(|d| d.sequence_id)
            .collect();
        assert_eq!(ids, ["24/002", "24/001"]);
    }

    #[test]
    fn test_search_over_stored_draws() {
        let conn = memory_db();
        // 1 et 13 sont tous deux du Tigre.
        let all = recent_draws(&conn, Region::Primary, None, 10).unwrap();
        assert_eq!(search_draws(&all, "虎").len(), 2);
        assert_eq!(search_draws(&all, "20")[0].sequence_id, "24/002");

        let this_year = recent_draws(&conn, Region::Primary, Some(2024), 10).unwrap();
        let found = search_draws(&this_year, "虎");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].sequence_id, "24/001");
    }
}
