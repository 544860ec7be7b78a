use marksix_db::models::{MAX_NUMBER, NUMBER_COUNT};

use crate::analysis::Frequencies;

pub const MIN_POOL_SIZE: u32 = 8;
pub const MAX_POOL_SIZE: u32 = 24;

/// Partition de 1..=49 selon la fréquence d'apparition comme numéro spécial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pools {
    pub low: Vec<u8>,
    pub mid: Vec<u8>,
    pub high: Vec<u8>,
}

pub fn clamp_pool_size(pool_size: u32) -> usize {
    pool_size.clamp(MIN_POOL_SIZE, MAX_POOL_SIZE) as usize
}

/// Tri stable sur (fréquence, numéro) croissants : `low` prend les premiers,
/// `high` les derniers, `mid` tout le reste de 1..=49.
///
/// `pool_size` n'est pas borné ici ; l'appelant le passe par `clamp_pool_size`.
pub fn build_pools(freq: &Frequencies, pool_size: usize) -> Pools {
    let mut ranked: Vec<(u32, u8)> = freq.iter().map(|(number, count)| (count, number)).collect();
    ranked.sort_unstable();

    let size = pool_size.min(NUMBER_COUNT);
    let mut low: Vec<u8> = ranked[..size].iter().map(|&(_, n)| n).collect();
    let mut high: Vec<u8> = ranked[NUMBER_COUNT - size..].iter().map(|&(_, n)| n).collect();
    low.sort_unstable();
    high.sort_unstable();

    let mid: Vec<u8> = (1..=MAX_NUMBER)
        .filter(|n| !low.contains(n) && !high.contains(n))
        .collect();

    tracing::debug!(size, mid = mid.len(), "pools construits");
    Pools { low, mid, high }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{analyze, make_test_draws};

    fn scenario_a() -> Frequencies {
        analyze(&make_test_draws(&[3, 3, 3, 7, 7, 12, 20, 33, 41, 49]))
    }

    #[test]
    fn test_scenario_a_pools() {
        let pools = build_pools(&scenario_a(), 3);
        assert_eq!(pools.low, vec![1, 2, 4]);
        // (1,49) < (2,7) < (3,3) : les trois derniers du tri croissant.
        assert_eq!(pools.high, vec![3, 7, 49]);
        assert_eq!(pools.mid.len(), 43);
    }

    #[test]
    fn test_pools_partition_all_sizes() {
        let freq = scenario_a();
        for size in MIN_POOL_SIZE..=MAX_POOL_SIZE {
            let pools = build_pools(&freq, size as usize);
            assert_eq!(pools.low.len(), size as usize);
            assert_eq!(pools.high.len(), size as usize);
            assert!(pools.low.iter().all(|n| !pools.high.contains(n)));

            let mut all: Vec<u8> = pools
                .low
                .iter()
                .chain(pools.mid.iter())
                .chain(pools.high.iter())
                .copied()
                .collect();
            all.sort_unstable();
            assert_eq!(all, (1..=49).collect::<Vec<u8>>(), "taille {}", size);
        }
    }

    #[test]
    fn test_high_holds_most_frequent() {
        let pools = build_pools(&scenario_a(), 8);
        assert!(pools.high.contains(&3));
        assert!(pools.high.contains(&7));
        assert!(!pools.low.contains(&3));
    }

    #[test]
    fn test_oversized_pool_leaves_mid_empty() {
        let pools = build_pools(&scenario_a(), 30);
        assert!(pools.mid.is_empty());
    }

    #[test]
    fn test_clamp_pool_size() {
        assert_eq!(clamp_pool_size(3), 8);
        assert_eq!(clamp_pool_size(16), 16);
        assert_eq!(clamp_pool_size(40), 24);
    }
}
