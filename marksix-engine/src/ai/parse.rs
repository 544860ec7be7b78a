//! Extraction des numéros depuis la réponse libre du service de génération.
//!
//! Les tentatives sont essayées dans l'ordre de `EXTRACTORS` ; la première
//! qui produit 6 numéros distincts et un spécial disjoint l'emporte.

use std::sync::LazyLock;

use regex::Regex;

use marksix_db::models::{MAX_NUMBER, MIN_NUMBER, NORMAL_COUNT};

use crate::error::AiError;

static DIGITS: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\d+").ok());

static SPECIAL_LABEL: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:特码|特碼|特别号码|特別號碼|special(?:\s+number)?|spécial|numéro\s+chance)\s*(?:[:：=]|是|为|為)?\s*\D{0,3}?(\d{1,2})").ok()
});

static NORMAL_LABEL: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:平码|平碼|正码|正碼|normal(?:\s+numbers)?|main\s+numbers|numéros(?:\s+normaux)?)\s*(?:[:：=]|是|为|為)?([^\n]*)").ok()
});

static LIST_ITEM: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*(?:\d{1,2}\s*[.、)）]|[-*•])\s*(.+)$").ok()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedNumbers {
    pub normals: [u8; NORMAL_COUNT],
    pub special: u8,
}

type Extractor = fn(&str) -> Option<ParsedNumbers>;

const EXTRACTORS: [(&str, Extractor); 3] = [
    ("labelled", extract_labelled),
    ("numbered_list", extract_numbered_list),
    ("digit_scan", extract_digit_scan),
];

pub fn parse_numbers(text: &str) -> Result<ParsedNumbers, AiError> {
    for (name, extract) in EXTRACTORS {
        if let Some(parsed) = extract(text) {
            tracing::debug!(extractor = name, ?parsed, "numéros extraits de la réponse");
            return Ok(parsed);
        }
    }
    Err(AiError::Parse)
}

fn in_range(n: u8) -> bool {
    (MIN_NUMBER..=MAX_NUMBER).contains(&n)
}

/// Numéros valides d'un segment : suites de 1 ou 2 chiffres dans 1..=49.
fn numbers_in(segment: &str) -> Vec<u8> {
    let Some(digits) = DIGITS.as_ref() else {
        return Vec::new();
    };
    digits
        .find_iter(segment)
        .map(|m| m.as_str())
        .filter(|s| s.len() <= 2)
        .filter_map(|s| s.parse::<u8>().ok())
        .filter(|&n| in_range(n))
        .collect()
}

/// Dernier spécial étiqueté du texte et sa position ; les mentions d'historique le précèdent.
fn last_labelled_special(text: &str) -> Option<(usize, u8)> {
    SPECIAL_LABEL
        .as_ref()?
        .captures_iter(text)
        .filter_map(|caps| {
            let start = caps.get(0)?.start();
            let n = caps.get(1)?.as_str().parse::<u8>().ok().filter(|&n| in_range(n))?;
            Some((start, n))
        })
        .last()
}

fn labelled_special(text: &str) -> Option<u8> {
    last_labelled_special(text).map(|(_, n)| n)
}

/// Complète la liste de candidats : dédoublonne, écarte le spécial, tronque à 6.
///
/// Sans spécial explicite, le 7e candidat distinct tient ce rôle.
fn assemble(candidates: &[u8], special: Option<u8>) -> Option<ParsedNumbers> {
    let mut distinct: Vec<u8> = Vec::with_capacity(candidates.len());
    for &n in candidates {
        if in_range(n) && !distinct.contains(&n) {
            distinct.push(n);
        }
    }

    let special = match special {
        Some(s) => s,
        None => *distinct.get(NORMAL_COUNT)?,
    };

    let normals: Vec<u8> = distinct
        .into_iter()
        .filter(|&n| n != special)
        .take(NORMAL_COUNT)
        .collect();
    let mut normals: [u8; NORMAL_COUNT] = normals.try_into().ok()?;
    normals.sort_unstable();
    Some(ParsedNumbers { normals, special })
}

fn extract_labelled(text: &str) -> Option<ParsedNumbers> {
    let (special_at, special) = last_labelled_special(text)?;
    let labels: Vec<_> = NORMAL_LABEL.as_ref()?.captures_iter(text).collect();
    // Le bloc retenu est le dernier qui précède le spécial, sinon le dernier tout court.
    let caps = labels
        .iter()
        .rev()
        .find(|c| c.get(0).is_some_and(|m| m.start() < special_at))
        .or_else(|| labels.last())?;
    let mut segment = caps.get(1)?.as_str();
    // Le spécial peut suivre sur la même ligne.
    if let Some(m) = SPECIAL_LABEL.as_ref().and_then(|re| re.find(segment)) {
        segment = &segment[..m.start()];
    }
    assemble(&numbers_in(segment), Some(special))
}

fn extract_numbered_list(text: &str) -> Option<ParsedNumbers> {
    let items = LIST_ITEM.as_ref()?;
    let mut candidates = Vec::new();
    let mut special = None;

    for caps in items.captures_iter(text) {
        let Some(body) = caps.get(1).map(|m| m.as_str()) else {
            continue;
        };
        if let Some(s) = labelled_special(body) {
            special = Some(s);
            continue;
        }
        if let Some(&first) = numbers_in(body).first() {
            candidates.push(first);
        }
    }

    if candidates.len() < NORMAL_COUNT {
        return None;
    }
    assemble(&candidates, special.or_else(|| labelled_special(text)))
}

fn extract_digit_scan(text: &str) -> Option<ParsedNumbers> {
    let special = labelled_special(text);
    let mut candidates = numbers_in(text);
    if let Some(s) = special {
        candidates.retain(|&n| n != s);
    }
    assemble(&candidates, special)
}
