use anyhow::{Context, Result, bail};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row};
use std::path::Path;
use std::str::FromStr;

use crate::models::{
    Draw, NORMAL_COUNT, NewPrediction, Region, ResolvedPrediction, Strategy, StrategyConfig,
    config_key,
};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS draws (
    region        TEXT NOT NULL,
    sequence_id   TEXT NOT NULL,
    date          TEXT NOT NULL,
    n1            INTEGER NOT NULL,
    n2            INTEGER NOT NULL,
    n3            INTEGER NOT NULL,
    n4            INTEGER NOT NULL,
    n5            INTEGER NOT NULL,
    n6            INTEGER NOT NULL,
    special       INTEGER NOT NULL,
    updated_at    TEXT NOT NULL,
    PRIMARY KEY (region, sequence_id)
);

CREATE TABLE IF NOT EXISTS system_config (
    key           TEXT PRIMARY KEY,
    value         TEXT NOT NULL,
    description   TEXT NOT NULL DEFAULT '',
    updated_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS predictions (
    id                     INTEGER PRIMARY KEY AUTOINCREMENT,
    region                 TEXT NOT NULL,
    strategy               TEXT NOT NULL,
    period                 TEXT NOT NULL,
    normal_numbers         TEXT NOT NULL,
    special_number         INTEGER NOT NULL,
    prediction_text        TEXT,
    created_at             TEXT NOT NULL,
    actual_normal_numbers  TEXT,
    actual_special_number  INTEGER,
    accuracy_score         REAL,
    is_result_updated      INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_predictions_lookup
    ON predictions (region, strategy, is_result_updated);
";

pub fn db_path() -> std::path::PathBuf {
    let mut path = std::env::current_dir().unwrap_or_default();
    path.push("data");
    path.push("marksix.db");
    path
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Impossible de créer le répertoire {:?}", parent))?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("Impossible d'ouvrir la base {:?}", path))?;
    Ok(conn)
}

pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)
        .context("Échec de la migration")?;
    Ok(())
}

// Les numéros ne sont joints par des virgules qu'à la frontière de persistance.
fn encode_numbers(numbers: &[u8]) -> String {
    numbers
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn decode_numbers(raw: &str) -> Result<Vec<u8>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u8>()
                .with_context(|| format!("Numéro illisible en base : '{}'", s))
        })
        .collect()
}

fn parse_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = anyhow::Error>,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, e.into())
    })
}

/// Insère ou met à jour un tirage. Retourne `true` si le tirage est nouveau.
pub fn upsert_draw(conn: &Connection, draw: &Draw) -> Result<bool> {
    let exists: bool = conn
        .query_row(
            "SELECT 1 FROM draws WHERE region = ?1 AND sequence_id = ?2",
            rusqlite::params![draw.region.as_str(), draw.sequence_id],
            |_| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    let n = &draw.normal_numbers;
    let now = Utc::now().to_rfc3339();
    if exists {
        conn.execute(
            "UPDATE draws SET date = ?3, n1 = ?4, n2 = ?5, n3 = ?6, n4 = ?7, n5 = ?8, n6 = ?9,
                 special = ?10, updated_at = ?11
             WHERE region = ?1 AND sequence_id = ?2",
            rusqlite::params![
                draw.region.as_str(),
                draw.sequence_id,
                draw.date,
                n[0], n[1], n[2], n[3], n[4], n[5],
                draw.special_number,
                now,
            ],
        ).context("Échec de la mise à jour du tirage")?;
    } else {
        conn.execute(
            "INSERT INTO draws (region, sequence_id, date, n1, n2, n3, n4, n5, n6, special, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            rusqlite::params![
                draw.region.as_str(),
                draw.sequence_id,
                draw.date,
                n[0], n[1], n[2], n[3], n[4], n[5],
                draw.special_number,
                now,
            ],
        ).context("Échec de l'insertion")?;
    }
    Ok(!exists)
}

fn draw_from_row(region: Region, row: &Row<'_>) -> rusqlite::Result<Draw> {
    Ok(Draw {
        region,
        sequence_id: row.get(0)?,
        date: row.get(1)?,
        normal_numbers: [
            row.get::<_, u8>(2)?,
            row.get::<_, u8>(3)?,
            row.get::<_, u8>(4)?,
            row.get::<_, u8>(5)?,
            row.get::<_, u8>(6)?,
            row.get::<_, u8>(7)?,
        ],
        special_number: row.get(8)?,
    })
}

/// Derniers tirages d'une région, le plus récent en premier.
pub fn fetch_last_draws(conn: &Connection, region: Region, limit: u32) -> Result<Vec<Draw>> {
    let mut stmt = conn.prepare(
        "SELECT sequence_id, date, n1, n2, n3, n4, n5, n6, special
         FROM draws WHERE region = ?1 ORDER BY date DESC, sequence_id DESC LIMIT ?2"
    )?;
    let draws = stmt
        .query_map(rusqlite::params![region.as_str(), limit], |row| draw_from_row(region, row))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(draws)
}

/// Derniers tirages d'une année (dates `YYYY-MM-DD`), le plus récent en premier.
pub fn fetch_draws_by_year(conn: &Connection, region: Region, year: i32, limit: u32) -> Result<Vec<Draw>> {
    let mut stmt = conn.prepare(
        "SELECT sequence_id, date, n1, n2, n3, n4, n5, n6, special
         FROM draws WHERE region = ?1 AND date LIKE ?2
         ORDER BY date DESC, sequence_id DESC LIMIT ?3"
    )?;
    let draws = stmt
        .query_map(rusqlite::params![region.as_str(), format!("{year}%"), limit], |row| {
            draw_from_row(region, row)
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(draws)
}

pub fn fetch_draw(conn: &Connection, region: Region, sequence_id: &str) -> Result<Option<Draw>> {
    let draw = conn
        .query_row(
            "SELECT sequence_id, date, n1, n2, n3, n4, n5, n6, special
             FROM draws WHERE region = ?1 AND sequence_id = ?2",
            rusqlite::params![region.as_str(), sequence_id],
            |row| draw_from_row(region, row),
        )
        .optional()?;
    Ok(draw)
}

pub fn count_draws(conn: &Connection, region: Region) -> Result<u32> {
    let count: u32 = conn.query_row(
        "SELECT COUNT(*) FROM draws WHERE region = ?1",
        [region.as_str()],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn get_system_config(conn: &Connection, key: &str) -> Result<Option<String>> {
    let value = conn
        .query_row("SELECT value FROM system_config WHERE key = ?1", [key], |row| row.get(0))
        .optional()
        .with_context(|| format!("Lecture de la configuration '{}' impossible", key))?;
    Ok(value)
}

pub fn set_system_config(conn: &Connection, key: &str, value: &str, description: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO system_config (key, value, description, updated_at) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value,
             description = excluded.description, updated_at = excluded.updated_at",
        rusqlite::params![key, value, description, Utc::now().to_rfc3339()],
    ).with_context(|| format!("Écriture de la configuration '{}' impossible", key))?;
    Ok(())
}

pub fn get_strategy_config(
    conn: &Connection,
    region: Region,
    strategy: Strategy,
) -> Result<Option<StrategyConfig>> {
    let key = config_key(region, strategy);
    match get_system_config(conn, &key)? {
        Some(json) => {
            let config = serde_json::from_str(&json)
                .with_context(|| format!("Configuration '{}' corrompue", key))?;
            Ok(Some(config))
        }
        None => Ok(None),
    }
}

pub fn put_strategy_config(
    conn: &Connection,
    region: Region,
    strategy: Strategy,
    config: &StrategyConfig,
) -> Result<()> {
    let json = serde_json::to_string(config)?;
    let description = format!("Paramètres auto-ajustés de la stratégie {} ({})", strategy, region);
    set_system_config(conn, &config_key(region, strategy), &json, &description)
}

pub fn insert_prediction(conn: &Connection, prediction: &NewPrediction) -> Result<i64> {
    conn.execute(
        "INSERT INTO predictions (region, strategy, period, normal_numbers, special_number, prediction_text, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            prediction.region.as_str(),
            prediction.strategy.as_str(),
            prediction.period,
            encode_numbers(&prediction.normal_numbers),
            prediction.special_number,
            prediction.prediction_text,
            Utc::now().to_rfc3339(),
        ],
    ).context("Échec de l'enregistrement de la prédiction")?;
    Ok(conn.last_insert_rowid())
}

/// Résout les prédictions en attente pour la période du tirage. Retourne le nombre de lignes résolues.
pub fn resolve_predictions(conn: &Connection, draw: &Draw) -> Result<usize> {
    let pending: Vec<(i64, String, u8)> = {
        let mut stmt = conn.prepare(
            "SELECT id, normal_numbers, special_number FROM predictions
             WHERE region = ?1 AND period = ?2 AND is_result_updated = 0"
        )?;
        stmt.query_map(rusqlite::params![draw.region.as_str(), draw.sequence_id], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })?
        .collect::<Result<Vec<_>, _>>()?
    };

    let actual_normals = encode_numbers(&draw.normal_numbers);
    for (id, normals, special) in &pending {
        let normals = decode_numbers(normals)?;
        let hit = *special == draw.special_number || normals.contains(&draw.special_number);
        let score = if hit { 1.0 } else { 0.0 };
        conn.execute(
            "UPDATE predictions SET actual_normal_numbers = ?2, actual_special_number = ?3,
                 accuracy_score = ?4, is_result_updated = 1
             WHERE id = ?1",
            rusqlite::params![id, actual_normals, draw.special_number, score],
        ).context("Échec de la résolution de la prédiction")?;
    }
    Ok(pending.len())
}

/// Périodes des prédictions encore en attente de résultat.
pub fn pending_periods(conn: &Connection, region: Region) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT period FROM predictions
         WHERE region = ?1 AND is_result_updated = 0 ORDER BY period"
    )?;
    let periods = stmt
        .query_map([region.as_str()], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(periods)
}

/// Prédictions résolues, la plus récente en premier.
pub fn fetch_resolved_predictions(
    conn: &Connection,
    region: Region,
    strategy: Option<Strategy>,
    limit: u32,
) -> Result<Vec<ResolvedPrediction>> {
    let mut stmt = conn.prepare(
        "SELECT strategy, period, normal_numbers, special_number, actual_special_number
         FROM predictions
         WHERE region = ?1 AND (?2 IS NULL OR strategy = ?2)
           AND is_result_updated = 1 AND actual_special_number IS NOT NULL
         ORDER BY created_at DESC, id DESC LIMIT ?3"
    )?;
    let rows = stmt
        .query_map(
            rusqlite::params![region.as_str(), strategy.map(|s| s.as_str()), limit],
            |row| {
                Ok((
                    parse_column::<Strategy>(row, 0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, u8>(3)?,
                    row.get::<_, Option<u8>>(4)?,
                ))
            },
        )?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(strategy, period, normals, special, actual)| {
            let predicted_normals = decode_numbers(&normals)?;
            if predicted_normals.len() != NORMAL_COUNT {
                bail!("Prédiction {} : {} numéros normaux au lieu de 6", period, predicted_normals.len());
            }
            Ok(ResolvedPrediction {
                strategy,
                period,
                predicted_normals,
                predicted_special: special,
                actual_special: actual,
                is_resolved: true,
            })
        })
        .collect()
}
