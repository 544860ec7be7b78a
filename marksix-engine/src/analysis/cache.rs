use std::collections::HashMap;

use marksix_db::models::{Draw, Region};

use super::{Frequencies, analyze};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    region: Region,
    window: usize,
    newest: Option<String>,
}

/// Cache explicite des analyses de fréquence, possédé par le moteur.
///
/// La clé inclut l'identifiant du tirage le plus récent : un historique
/// enrichi produit une nouvelle entrée. `invalidate` purge une région
/// après modification de son historique.
#[derive(Debug, Default)]
pub struct FrequencyCache {
    entries: HashMap<CacheKey, Frequencies>,
}

impl FrequencyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frequencies(&mut self, region: Region, window: &[Draw]) -> Frequencies {
        let key = CacheKey {
            region,
            window: window.len(),
            newest: window.first().map(|d| d.sequence_id.clone()),
        };
        if let Some(freq) = self.entries.get(&key) {
            tracing::debug!(%region, window = key.window, "fréquences servies depuis le cache");
            return *freq;
        }
        let freq = analyze(window);
        self.entries.insert(key, freq);
        freq
    }

    pub fn invalidate(&mut self, region: Region) {
        self.entries.retain(|key, _| key.region != region);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
