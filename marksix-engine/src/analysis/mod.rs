pub mod cache;

use marksix_db::models::{Draw, MAX_NUMBER, NUMBER_COUNT};

/// Occurrences du numéro spécial sur une fenêtre, indexées par numéro (1..=49).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frequencies {
    counts: [u32; NUMBER_COUNT],
}

impl Frequencies {
    pub fn count(&self, number: u8) -> u32 {
        match number.checked_sub(1) {
            Some(idx) if (idx as usize) < NUMBER_COUNT => self.counts[idx as usize],
            _ => 0,
        }
    }

    pub fn total(&self) -> u32 {
        self.counts.iter().sum()
    }

    /// Faux si aucune occurrence : le constructeur de pools ne doit pas être appelé.
    pub fn has_signal(&self) -> bool {
        self.counts.iter().any(|&c| c > 0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, u32)> + '_ {
        self.counts
            .iter()
            .enumerate()
            .map(|(idx, &count)| ((idx + 1) as u8, count))
    }
}

/// Compte les numéros spéciaux de `draws` (déjà tronqué à la fenêtre, le plus récent en premier).
pub fn analyze(draws: &[Draw]) -> Frequencies {
    let mut counts = [0u32; NUMBER_COUNT];
    for draw in draws {
        let n = draw.special_number;
        if (1..=MAX_NUMBER).contains(&n) {
            counts[(n - 1) as usize] += 1;
        }
    }
    Frequencies { counts }
}

#[derive(Debug, Clone)]
pub struct NumberStats {
    pub number: u8,
    pub frequency: u32,
    /// Nombre de tirages depuis la dernière sortie comme numéro spécial.
    pub gap: u32,
}

pub fn special_stats(draws: &[Draw]) -> Vec<NumberStats> {
    let mut stats: Vec<NumberStats> = (1..=MAX_NUMBER)
        .map(|n| NumberStats {
            number: n,
            frequency: 0,
            gap: draws.len() as u32,
        })
        .collect();

    for (i, draw) in draws.iter().enumerate() {
        let n = draw.special_number;
        if !(1..=MAX_NUMBER).contains(&n) {
            continue;
        }
        let stat = &mut stats[(n - 1) as usize];
        if stat.frequency == 0 {
            stat.gap = i as u32;
        }
        stat.frequency += 1;
    }

    stats
}

#[cfg(test)]
pub(crate) fn make_test_draws(specials: &[u8]) -> Vec<Draw> {
    use marksix_db::models::Region;

    specials
        .iter()
        .enumerate()
        .map(|(i, &special)| {
            // Six numéros normaux distincts du spécial.
            let mut normals = [0u8; 6];
            let mut candidate = (i as u8 % 40) + 1;
            for slot in normals.iter_mut() {
                if candidate == special {
                    candidate += 1;
                }
                *slot = candidate;
                candidate += 1;
            }
            Draw {
                region: Region::Primary,
                sequence_id: format!("{:03}", specials.len() - i),
                date: format!("2024-{:02}-{:02}", (i / 28) % 12 + 1, (i % 28) + 1),
                normal_numbers: normals,
                special_number: special,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_counts_specials_only() {
        let draws = make_test_draws(&[3, 3, 3, 7, 7, 12]);
        let freq = analyze(&draws);
        assert_eq!(freq.count(3), 3);
        assert_eq!(freq.count(7), 2);
        assert_eq!(freq.count(12), 1);
        assert_eq!(freq.total(), 6);
        // Les numéros normaux des tirages ne sont jamais comptés.
        assert_eq!(freq.count(1), 0);
    }

    #[test]
    fn test_analyze_empty_has_no_signal() {
        let freq = analyze(&[]);
        assert_eq!(freq.total(), 0);
        assert!(!freq.has_signal());
        assert_eq!(freq.iter().count(), 49);
    }

    #[test]
    fn test_count_out_of_range() {
        let freq = analyze(&make_test_draws(&[1]));
        assert_eq!(freq.count(0), 0);
        assert_eq!(freq.count(50), 0);
    }

    #[test]
    fn test_special_stats_gap() {
        let draws = make_test_draws(&[5, 9, 5]);
        let stats = special_stats(&draws);
        assert_eq!(stats[4].frequency, 2);
        assert_eq!(stats[4].gap, 0);
        assert_eq!(stats[8].gap, 1);
        assert_eq!(stats[0].gap, 3);
    }
}
