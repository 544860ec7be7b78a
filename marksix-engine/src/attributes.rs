use std::collections::HashMap;
use std::fmt;

use marksix_db::models::{Draw, MAX_NUMBER, MIN_NUMBER, Region};
use serde::Serialize;

const RED: [u8; 17] = [1, 2, 7, 8, 12, 13, 18, 19, 23, 24, 29, 30, 34, 35, 40, 45, 46];
const BLUE: [u8; 16] = [3, 4, 9, 10, 14, 15, 20, 25, 26, 31, 36, 37, 41, 42, 47, 48];
const GREEN: [u8; 16] = [5, 6, 11, 16, 17, 21, 22, 27, 28, 32, 33, 38, 39, 43, 44, 49];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WaveColor {
    Red,
    Blue,
    Green,
}

impl fmt::Display for WaveColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaveColor::Red => write!(f, "rouge"),
            WaveColor::Blue => write!(f, "bleu"),
            WaveColor::Green => write!(f, "vert"),
        }
    }
}

pub fn wave_color(number: u8) -> Option<WaveColor> {
    if RED.contains(&number) {
        Some(WaveColor::Red)
    } else if BLUE.contains(&number) {
        Some(WaveColor::Blue)
    } else if GREEN.contains(&number) {
        Some(WaveColor::Green)
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Zodiac {
    Tiger,
    Rabbit,
    Dragon,
    Snake,
    Ox,
    Rat,
    Pig,
    Dog,
    Rooster,
    Monkey,
    Goat,
    Horse,
}

/// Cycle fixe de la région principale, le numéro 1 ouvrant sur le Tigre.
const ZODIAC_CYCLE: [Zodiac; 12] = [
    Zodiac::Tiger,
    Zodiac::Rabbit,
    Zodiac::Dragon,
    Zodiac::Snake,
    Zodiac::Ox,
    Zodiac::Rat,
    Zodiac::Pig,
    Zodiac::Dog,
    Zodiac::Rooster,
    Zodiac::Monkey,
    Zodiac::Goat,
    Zodiac::Horse,
];

impl Zodiac {
    pub fn glyph(&self) -> &'static str {
        match self {
            Zodiac::Tiger => "虎",
            Zodiac::Rabbit => "兔",
            Zodiac::Dragon => "龙",
            Zodiac::Snake => "蛇",
            Zodiac::Ox => "牛",
            Zodiac::Rat => "鼠",
            Zodiac::Pig => "猪",
            Zodiac::Dog => "狗",
            Zodiac::Rooster => "鸡",
            Zodiac::Monkey => "猴",
            Zodiac::Goat => "羊",
            Zodiac::Horse => "马",
        }
    }
}

impl fmt::Display for Zodiac {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.glyph())
    }
}

pub fn zodiac(number: u8) -> Option<Zodiac> {
    if !(MIN_NUMBER..=MAX_NUMBER).contains(&number) {
        return None;
    }
    Some(ZODIAC_CYCLE[((number - 1) % 12) as usize])
}

pub fn special_color_frequency(draws: &[Draw]) -> HashMap<WaveColor, u32> {
    let mut counts = HashMap::new();
    for color in draws.iter().filter_map(|d| wave_color(d.special_number)) {
        *counts.entry(color).or_insert(0) += 1;
    }
    counts
}

pub fn special_zodiac_frequency(draws: &[Draw]) -> HashMap<Zodiac, u32> {
    let mut counts = HashMap::new();
    for z in draws.iter().filter_map(|d| zodiac(d.special_number)) {
        *counts.entry(z).or_insert(0) += 1;
    }
    counts
}

/// Nombre maximal de tirages renvoyés par une recherche.
pub const SEARCH_LIMIT: usize = 20;

/// Le terme désigne le spécial par sa valeur ou, en région principale, par son signe.
pub fn matches_special_term(draw: &Draw, term: &str) -> bool {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return false;
    }
    if term.parse::<u8>().is_ok_and(|n| n == draw.special_number) {
        return true;
    }
    draw.region == Region::Primary
        && zodiac(draw.special_number).is_some_and(|z| z.glyph().contains(term.as_str()))
}

/// Tirages dont le spécial correspond au terme, dans l'ordre reçu.
pub fn search_draws(draws: &[Draw], term: &str) -> Vec<Draw> {
    draws
        .iter()
        .filter(|d| matches_special_term(d, term))
        .take(SEARCH_LIMIT)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::make_test_draws;

    #[test]
    fn test_every_number_has_one_color() {
        for n in 1..=49u8 {
            let hits = [RED.contains(&n), BLUE.contains(&n), GREEN.contains(&n)]
                .iter()
                .filter(|&&b| b)
                .count();
            assert_eq!(hits, 1, "numéro {}", n);
        }
        assert_eq!(wave_color(0), None);
        assert_eq!(wave_color(50), None);
    }

    #[test]
    fn test_zodiac_cycle() {
        assert_eq!(zodiac(1), Some(Zodiac::Tiger));
        assert_eq!(zodiac(13), Some(Zodiac::Tiger));
        assert_eq!(zodiac(12), Some(Zodiac::Horse));
        assert_eq!(zodiac(49), Some(Zodiac::Tiger));
        assert_eq!(zodiac(0), None);
    }

    #[test]
    fn test_special_frequencies() {
        let draws = make_test_draws(&[1, 2, 3, 13]);
        let colors = special_color_frequency(&draws);
        assert_eq!(colors.get(&WaveColor::Red), Some(&3));
        assert_eq!(colors.get(&WaveColor::Blue), Some(&1));

        let zodiacs = special_zodiac_frequency(&draws);
        assert_eq!(zodiacs.get(&Zodiac::Tiger), Some(&2));
    }

    #[test]
    fn test_search_by_special_number() {
        let draws = make_test_draws(&[7, 12, 7, 30]);
        let found = search_draws(&draws, " 07 ");
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|d| d.special_number == 7));
        assert!(search_draws(&draws, "8").is_empty());
    }

    #[test]
    fn test_search_by_zodiac_primary_only() {
        // 1 et 13 partagent le Tigre.
        let mut draws = make_test_draws(&[1, 13, 2]);
        assert_eq!(search_draws(&draws, "虎").len(), 2);

        draws[0].region = Region::Secondary;
        let found = search_draws(&draws, "虎");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].special_number, 13);
        assert!(matches_special_term(&draws[0], "1"));
    }

    #[test]
    fn test_search_blank_term_and_limit() {
        let draws = make_test_draws(&[5; 30]);
        assert!(search_draws(&draws, "   ").is_empty());
        assert_eq!(search_draws(&draws, "5").len(), SEARCH_LIMIT);
    }
}
