use rand::RngExt;

/// Spin the bonus wheel: one sector, weighted by `weights` when they match
/// the sector list, uniform otherwise.
pub fn spin(sectors: &[i64], weights: &[u32]) -> i64 {
    spin_with(&mut rand::rng(), sectors, weights)
}

pub fn spin_with<R: RngExt>(rng: &mut R, sectors: &[i64], weights: &[u32]) -> i64 {
    if sectors.is_empty() {
        return 0;
    }
    let total: u64 = if weights.len() == sectors.len() {
        weights.iter().map(|w| u64::from(*w)).sum()
    } else {
        0
    };
    if total == 0 {
        return sectors[rng.random_range(0..sectors.len())];
    }

    let mut roll = rng.random_range(0..total);
    for (sector, weight) in sectors.iter().zip(weights) {
        let weight = u64::from(*weight);
        if roll < weight {
            return *sector;
        }
        roll -= weight;
    }
    sectors[sectors.len() - 1]
}
