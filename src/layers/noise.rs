use crate::error::{Error, Result};

/// Adds zero-mean gaussian noise to its input while training, and passes
/// the input through unchanged otherwise.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GaussianNoise {
    stdev: f32,
}

impl GaussianNoise {
    pub fn new(stdev: f32) -> Result<Self> {
        if !stdev.is_finite() || stdev < 0.0 {
            return Err(Error::InvalidConfig(format!("noise stdev must be non-negative, got {stdev}")));
        }

        Ok(Self { stdev })
    }

    pub fn stdev(&self) -> f32 {
        self.stdev
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stdev_must_be_valid() {
        assert_eq!(GaussianNoise::new(0.1).unwrap().stdev(), 0.1);
        assert!(GaussianNoise::new(0.0).is_ok());
        assert!(GaussianNoise::new(-0.1).is_err());
        assert!(GaussianNoise::new(f32::NAN).is_err());
    }
}
