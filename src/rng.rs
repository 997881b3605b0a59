use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::{Distribution, Normal, Uniform};

use crate::error::{Error, Result};

/// How a freshly built parameter is filled.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Initializer {
    Zeros,
    RandomUniform { min: f32, max: f32 },
    RandomNormal { mean: f32, stdev: f32 },
    /// Uniform in `±sqrt(6 / (fan_in + fan_out))`.
    GlorotUniform,
}

impl Initializer {
    pub fn random_uniform() -> Self {
        Self::RandomUniform { min: -0.05, max: 0.05 }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Initializer::Zeros => "zeros",
            Initializer::RandomUniform { .. } => "random_uniform",
            Initializer::RandomNormal { .. } => "random_normal",
            Initializer::GlorotUniform => "glorot_uniform",
        }
    }

    pub fn fill(&self, values: &mut [f32], fan_in: usize, fan_out: usize, rng: &mut impl Rng) -> Result<()> {
        let dist = match *self {
            Initializer::Zeros => {
                values.fill(0.0);
                return Ok(());
            }
            Initializer::RandomUniform { min, max } => Dist::uniform(min, max)?,
            Initializer::RandomNormal { mean, stdev } => Dist::Normal(
                Normal::new(mean, stdev)
                    .map_err(|_| Error::InvalidConfig(format!("invalid normal distribution N({mean}, {stdev})")))?,
            ),
            Initializer::GlorotUniform => {
                let limit = (6.0 / (fan_in + fan_out) as f32).sqrt();
                Dist::uniform(-limit, limit)?
            }
        };

        for val in values {
            *val = dist.sample(rng);
        }

        Ok(())
    }
}

impl std::str::FromStr for Initializer {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "zeros" => Ok(Self::Zeros),
            "random_uniform" => Ok(Self::random_uniform()),
            "random_normal" => Ok(Self::RandomNormal { mean: 0.0, stdev: 0.05 }),
            "glorot_uniform" => Ok(Self::GlorotUniform),
            _ => Err(Error::UnknownName { kind: "initializer", name: s.to_string() }),
        }
    }
}

enum Dist {
    Normal(Normal<f32>),
    Uniform(Uniform<f32>),
}

impl Dist {
    fn uniform(min: f32, max: f32) -> Result<Self> {
        if !(min.is_finite() && max.is_finite() && min < max) {
            return Err(Error::InvalidConfig(format!("invalid uniform range [{min}, {max})")));
        }

        Ok(Self::Uniform(Uniform::new(min, max)))
    }

    fn sample(&self, rng: &mut impl Rng) -> f32 {
        match self {
            Dist::Normal(x) => x.sample(rng),
            Dist::Uniform(x) => x.sample(rng),
        }
    }
}

/// Seeded generator, or one seeded from the OS when no seed is given.
pub fn seeded(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_uniform_range() {
        let mut values = vec![1.0; 512];
        Initializer::random_uniform().fill(&mut values, 32, 16, &mut seeded(Some(3))).unwrap();
        assert!(values.iter().all(|v| (-0.05..0.05).contains(v)));
        assert!(values.iter().any(|&v| v != values[0]));
    }

    #[test]
    fn zeros() {
        let mut values = vec![1.0; 8];
        Initializer::Zeros.fill(&mut values, 4, 2, &mut seeded(Some(3))).unwrap();
        assert_eq!(values, vec![0.0; 8]);
    }

    #[test]
    fn glorot_limit() {
        let mut values = vec![0.0; 256];
        Initializer::GlorotUniform.fill(&mut values, 4, 2, &mut seeded(Some(1))).unwrap();
        assert!(values.iter().all(|v| v.abs() <= 1.0));
    }

    #[test]
    fn same_seed_same_values() {
        let mut a = vec![0.0; 16];
        let mut b = vec![0.0; 16];
        let init = Initializer::RandomNormal { mean: 0.0, stdev: 1.0 };
        init.fill(&mut a, 4, 4, &mut seeded(Some(9))).unwrap();
        init.fill(&mut b, 4, 4, &mut seeded(Some(9))).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn bad_ranges() {
        let mut values = vec![0.0; 4];
        let init = Initializer::RandomUniform { min: 1.0, max: -1.0 };
        assert!(init.fill(&mut values, 2, 2, &mut seeded(Some(0))).is_err());
        assert!("he_normal".parse::<Initializer>().is_err());
    }
}
