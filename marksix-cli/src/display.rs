use std::collections::HashMap;

use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL};

use crate::import::ImportResult;
use marksix_db::models::{Draw, Region, Strategy, StrategyConfig};
use marksix_engine::accuracy::AccuracyReport;
use marksix_engine::analysis::NumberStats;
use marksix_engine::attributes::{WaveColor, Zodiac, wave_color, zodiac};
use marksix_engine::sampler::Recommendation;
use marksix_engine::tuner::{TuneOutcome, TuneReport};

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn format_numbers(numbers: &[u8]) -> String {
    numbers
        .iter()
        .map(|n| format!("{:2}", n))
        .collect::<Vec<_>>()
        .join(" - ")
}

fn color_of(number: u8) -> Color {
    match wave_color(number) {
        Some(WaveColor::Red) => Color::Red,
        Some(WaveColor::Blue) => Color::Blue,
        Some(WaveColor::Green) => Color::Green,
        None => Color::White,
    }
}

fn special_cell(region: Region, number: u8) -> Cell {
    let label = match (region, zodiac(number)) {
        (Region::Primary, Some(z)) => format!("{:2} {}", number, z),
        _ => format!("{:2}", number),
    };
    Cell::new(label).fg(color_of(number))
}

pub fn display_draws(draws: &[Draw]) {
    if draws.is_empty() {
        println!("Aucun tirage à afficher.");
        return;
    }

    let mut table = new_table(vec!["Période", "Date", "Numéros", "Spécial"]);
    for draw in draws {
        let mut sorted = draw.normal_numbers;
        sorted.sort_unstable();
        table.add_row(vec![
            Cell::new(&draw.sequence_id),
            Cell::new(&draw.date),
            Cell::new(format_numbers(&sorted)),
            special_cell(draw.region, draw.special_number),
        ]);
    }
    println!("{table}");
}

pub fn display_search(term: &str, draws: &[Draw]) {
    println!("\n🔎 Recherche « {} » : {} tirage(s)\n", term.trim(), draws.len());
    display_draws(draws);
}

pub fn display_import_summary(result: &ImportResult) {
    println!("Import terminé :");
    println!("  Total lignes lues : {}", result.total_records);
    println!("  Insérés           : {}", result.inserted);
    println!("  Mis à jour        : {}", result.updated);
    if result.errors > 0 {
        println!("  Erreurs           : {}", result.errors);
    }
}

pub fn display_stats(
    region: Region,
    stats: &[NumberStats],
    colors: &HashMap<WaveColor, u32>,
    zodiacs: &HashMap<Zodiac, u32>,
    window: u32,
) {
    println!("\n📊 Numéro spécial sur les {} derniers tirages ({})\n", window, region);

    let mut table = new_table(vec!["Numéro", "Fréquence", "Retard"]);
    let mut sorted = stats.to_vec();
    sorted.sort_by(|a, b| b.frequency.cmp(&a.frequency).then(a.number.cmp(&b.number)));
    for stat in &sorted {
        table.add_row(vec![
            Cell::new(format!("{:2}", stat.number)).fg(color_of(stat.number)),
            Cell::new(stat.frequency),
            Cell::new(stat.gap),
        ]);
    }
    println!("{table}");

    println!("\n── Couleurs ──");
    let mut table = new_table(vec!["Couleur", "Fréquence"]);
    for (color, cell_color) in [
        (WaveColor::Red, Color::Red),
        (WaveColor::Blue, Color::Blue),
        (WaveColor::Green, Color::Green),
    ] {
        table.add_row(vec![
            Cell::new(color.to_string()).fg(cell_color),
            Cell::new(colors.get(&color).copied().unwrap_or(0)),
        ]);
    }
    println!("{table}");

    if region == Region::Primary && !zodiacs.is_empty() {
        println!("\n── Signes ──");
        let mut table = new_table(vec!["Signe", "Fréquence"]);
        let mut sorted: Vec<_> = zodiacs.iter().collect();
        sorted.sort_by(|a, b| b.1.cmp(a.1).then(a.0.glyph().cmp(b.0.glyph())));
        for (z, count) in sorted {
            table.add_row(vec![Cell::new(z.to_string()), Cell::new(count)]);
        }
        println!("{table}");
    }
}

pub fn display_recommendation(region: Region, rec: &Recommendation) {
    println!("\n🎲 Recommandation {} ({})\n", rec.strategy, region);

    let mut table = new_table(vec!["Stratégie", "Numéros", "Spécial"]);
    let source = if rec.source == rec.strategy {
        rec.source.to_string()
    } else {
        format!("{} (repli : {})", rec.strategy, rec.source)
    };
    table.add_row(vec![
        Cell::new(source),
        Cell::new(format_numbers(&rec.normal_numbers)),
        special_cell(region, rec.special_number),
    ]);
    println!("{table}");

    if let Some(text) = &rec.text {
        println!("\nRéponse du service :\n{}", text);
    }
}

pub fn display_accuracy(region: Region, strategy: Option<Strategy>, report: &AccuracyReport) {
    let label = strategy.map_or_else(|| "toutes".to_string(), |s| s.to_string());
    println!("\n🎯 Précision {} ({})\n", label, region);

    let mut table = new_table(vec!["Résolues", "Spécial exact", "Spécial parmi les 6", "Réussites", "Taux"]);
    table.add_row(vec![
        Cell::new(report.total),
        Cell::new(report.special_hits),
        Cell::new(report.normal_hits),
        Cell::new(report.correct),
        Cell::new(format!("{:.1} %", report.ratio * 100.0)),
    ]);
    println!("{table}");
}

fn config_row(strategy: Strategy, config: &StrategyConfig) -> Vec<Cell> {
    let buckets = config
        .bucket_counts
        .map(|[l, m, h]| format!("{l}/{m}/{h}"))
        .unwrap_or_else(|| "—".to_string());
    let mix = config
        .mix
        .map(|m| format!("{}/{}/{}", m.hot, m.cold, m.trend))
        .unwrap_or_else(|| "—".to_string());
    let trend = config
        .trend_window
        .map(|w| w.to_string())
        .unwrap_or_else(|| "—".to_string());
    let updated = config
        .updated_at
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "jamais".to_string());

    vec![
        Cell::new(strategy),
        Cell::new(config.window),
        Cell::new(config.pool_size),
        Cell::new(buckets),
        Cell::new(mix),
        Cell::new(trend),
        Cell::new(format!("{:.3} ({})", config.last_accuracy, config.last_total)),
        Cell::new(updated),
    ]
}

const CONFIG_HEADER: [&str; 8] = [
    "Stratégie", "Fenêtre", "Pool", "Bas/Moyen/Haut", "Chaud/Froid/Tendance", "Fenêtre tendance", "Précision", "Mise à jour",
];

pub fn display_configs(region: Region, configs: &[(Strategy, StrategyConfig)]) {
    println!("\n⚙️  Configuration des stratégies ({})\n", region);
    let mut table = new_table(CONFIG_HEADER.to_vec());
    for (strategy, config) in configs {
        table.add_row(config_row(*strategy, config));
    }
    println!("{table}");
}

pub fn display_tune_reports(region: Region, reports: &[TuneReport]) {
    println!("\n🔧 Ajustement des stratégies ({})\n", region);
    let mut table = new_table(CONFIG_HEADER.to_vec());
    let mut skipped = Vec::new();
    for report in reports {
        match &report.outcome {
            TuneOutcome::Applied(config) => {
                table.add_row(config_row(report.strategy, config));
            }
            TuneOutcome::Skipped(e) => skipped.push((report.strategy, e.to_string())),
        }
    }
    println!("{table}");
    for (strategy, reason) in skipped {
        println!("  {} ignorée : {}", strategy, reason);
    }
}
