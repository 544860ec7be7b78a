use anyhow::{Context, Result};
use std::path::Path;

use marksix_db::db::upsert_draw;
use marksix_db::models::{Draw, NORMAL_COUNT, Region, validate_draw};
use marksix_db::rusqlite::Connection;

/// Ligne `region;sequence_id;date;n1;n2;n3;n4;n5;n6;special`.
fn parse_record(record: &csv::StringRecord) -> Result<Draw> {
    let get = |idx: usize| -> Result<&str> {
        record
            .get(idx)
            .map(str::trim)
            .with_context(|| format!("Champ manquant à l'index {}", idx))
    };

    let get_u8 = |idx: usize| -> Result<u8> {
        let s = get(idx)?;
        s.parse::<u8>()
            .with_context(|| format!("Impossible de parser '{}' (index {})", s, idx))
    };

    let region: Region = get(0)?.parse()?;
    let sequence_id = get(1)?.to_string();
    let date = get(2)?.to_string();

    let mut normal_numbers = [0u8; NORMAL_COUNT];
    for (i, slot) in normal_numbers.iter_mut().enumerate() {
        *slot = get_u8(3 + i)?;
    }
    let special_number = get_u8(3 + NORMAL_COUNT)?;
    validate_draw(&normal_numbers, special_number)?;

    Ok(Draw {
        region,
        sequence_id,
        date,
        normal_numbers,
        special_number,
    })
}

#[derive(Debug, Default)]
pub struct ImportResult {
    pub total_records: u32,
    pub inserted: u32,
    pub updated: u32,
    pub errors: u32,
}

pub fn import_csv(conn: &Connection, path: &Path) -> Result<ImportResult> {
    let reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Impossible d'ouvrir {:?}", path))?;
    import_records(conn, reader)
}

fn import_records<R: std::io::Read>(conn: &Connection, mut reader: csv::Reader<R>) -> Result<ImportResult> {
    let tx = conn
        .unchecked_transaction()
        .context("Impossible de démarrer la transaction")?;

    let mut result = ImportResult::default();

    for record_result in reader.records() {
        result.total_records += 1;
        let line = result.total_records;
        let draw = match record_result.map_err(anyhow::Error::from).and_then(|r| parse_record(&r)) {
            Ok(draw) => draw,
            Err(e) => {
                tracing::warn!(line, error = %e, "ligne ignorée");
                result.errors += 1;
                continue;
            }
        };
        match upsert_draw(&tx, &draw) {
            Ok(true) => result.inserted += 1,
            Ok(false) => result.updated += 1,
            Err(e) => {
                tracing::warn!(line, sequence_id = %draw.sequence_id, error = %e, "échec d'insertion");
                result.errors += 1;
            }
        }
    }

    tx.commit().context("Échec du commit")?;
    tracing::info!(
        inserted = result.inserted,
        updated = result.updated,
        errors = result.errors,
        "import terminé"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use marksix_db::db::{count_draws, fetch_last_draws, migrate};

    const CSV: &str = "region;sequence_id;date;n1;n2;n3;n4;n5;n6;special
primary;24/001;2024-01-02;1;2;3;4;5;6;7
primary;24/002;2024-01-04;10;20;30;40;41;42;49
secondary;2024001;2024-01-01;5;6;7;8;9;10;11
primary;24/003;2024-01-06;1;1;3;4;5;6;7
primary;24/004;2024-01-09;1;2;3;4;5;6;6
elsewhere;1;2024-01-01;1;2;3;4;5;6;7
primary;24/005;2024-01-11;1;2;3
";

    fn reader(data: &str) -> csv::Reader<&[u8]> {
        csv::ReaderBuilder::new()
            .delimiter(b';')
            .flexible(true)
            .from_reader(data.as_bytes())
    }

    #[test]
    fn test_import_counts_and_rejects_invalid_rows() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();

        let result = import_records(&conn, reader(CSV)).unwrap();
        assert_eq!(result.total_records, 7);
        assert_eq!(result.inserted, 3);
        assert_eq!(result.updated, 0);
        assert_eq!(result.errors, 4);
        assert_eq!(count_draws(&conn, Region::Primary).unwrap(), 2);
        assert_eq!(count_draws(&conn, Region::Secondary).unwrap(), 1);
    }

    #[test]
    fn test_reimport_updates_existing_draws() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        import_records(&conn, reader(CSV)).unwrap();

        let fixed = "region;sequence_id;date;n1;n2;n3;n4;n5;n6;special\nprimary;24/002;2024-01-04;11;20;30;40;41;42;49\n";
        let result = import_records(&conn, reader(fixed)).unwrap();
        assert_eq!(result.updated, 1);

        let latest = &fetch_last_draws(&conn, Region::Primary, 1).unwrap()[0];
        assert_eq!(latest.normal_numbers, [11, 20, 30, 40, 41, 42]);
    }

    #[test]
    fn test_parse_record_reads_all_fields() {
        let record = csv::StringRecord::from(vec!["secondary", " 2024123 ", "2024-12-31", "3", "9", "15", "21", "33", "47", "2"]);
        let draw = parse_record(&record).unwrap();
        assert_eq!(draw.region, Region::Secondary);
        assert_eq!(draw.sequence_id, "2024123");
        assert_eq!(draw.normal_numbers, [3, 9, 15, 21, 33, 47]);
        assert_eq!(draw.special_number, 2);
    }
}
