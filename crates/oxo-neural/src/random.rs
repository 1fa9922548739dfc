//! Random draws shared by node evaluation and the evolver.
//!
//! The engine uses a narrow bell curve on `[0, 1]` for both mutation gating and
//! mutation deltas: `N(0.5, 0.1)` with out-of-range samples redrawn.

use rand::Rng;
use rand_distr::StandardNormal;

const ID_CHARSET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_LEN: usize = 9;

/// Samples `N(0.5, 0.1)`, redrawing until the sample lies in `[0, 1]`.
pub fn gaussian_unit<R>(rng: &mut R) -> f64
where
    R: Rng + ?Sized,
{
    loop {
        let z: f64 = rng.sample(StandardNormal);
        let sample = 0.5 + 0.1 * z;
        if (0.0..=1.0).contains(&sample) {
            return sample;
        }
    }
}

/// [`gaussian_unit`] rescaled to `[-1, 1]`.
pub fn gaussian_signed<R>(rng: &mut R) -> f64
where
    R: Rng + ?Sized,
{
    gaussian_unit(rng) * 2.0 - 1.0
}

/// Uniform initial weight or constant in `[-1, 1)`.
pub fn initial_weight<R>(rng: &mut R) -> f64
where
    R: Rng + ?Sized,
{
    rng.random_range(-1.0..1.0)
}

/// A 9-character lowercase base-36 identifier.
pub fn base36_id<R>(rng: &mut R) -> String
where
    R: Rng + ?Sized,
{
    (0..ID_LEN)
        .map(|_| char::from(ID_CHARSET[rng.random_range(0..ID_CHARSET.len())]))
        .collect()
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_pcg::Pcg64Mcg;

    use super::*;

    #[test]
    fn test_gaussian_unit_stays_in_range() {
        let mut rng = Pcg64Mcg::seed_from_u64(7);
        for _ in 0..10_000 {
            let v = gaussian_unit(&mut rng);
            assert!((0.0..=1.0).contains(&v));
            let s = gaussian_signed(&mut rng);
            assert!((-1.0..=1.0).contains(&s));
        }
    }

    #[test]
    fn test_base36_id_shape() {
        let mut rng = Pcg64Mcg::seed_from_u64(1);
        let id = base36_id(&mut rng);
        assert_eq!(id.len(), ID_LEN);
        assert!(
            id.chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase())
        );
    }
}
