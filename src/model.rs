use crate::{MimicError, Result};
use rand::Rng;
use rand_distr::{Distribution, LogNormal};

/// Order in which the bounded jitter and the clamp to the observed range are
/// applied to a sampled interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JitterOrder {
    /// Clamp the raw sample to the observed range, then add jitter. A value
    /// can end up slightly outside the observed range; this matches the
    /// reference behavior and is the default.
    #[default]
    ClampThenJitter,

    /// Add jitter to the raw sample, then clamp. Every value stays inside
    /// the observed range.
    JitterThenClamp,
}

/// A zero-location log-normal model of inter-click intervals.
///
/// Fitted by maximum likelihood from consecutive differences of recorded
/// click timestamps; sampling adds uniform jitter of ±1% of the scale and
/// clamps into the observed interval range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntervalModel {
    shape: f64,
    scale: f64,
    min_interval: f64,
    max_interval: f64,
}

impl IntervalModel {
    /// Fit the model to a sequence of strictly increasing click timestamps.
    ///
    /// Fails with [`MimicError::InsufficientData`] when fewer than two
    /// timestamps are given, and with [`MimicError::Fit`] when any derived
    /// interval is non-positive or non-finite.
    pub fn fit(timestamps: &[f64]) -> Result<Self> {
        if timestamps.len() < 2 {
            return Err(MimicError::InsufficientData {
                needed: 2,
                got: timestamps.len(),
            });
        }

        let intervals: Vec<f64> = timestamps.windows(2).map(|pair| pair[1] - pair[0]).collect();
        if let Some(bad) = intervals.iter().find(|d| !d.is_finite() || **d <= 0.0) {
            return Err(MimicError::Fit(format!(
                "intervals must be positive and finite, got {bad}"
            )));
        }

        // Maximum-likelihood estimate with the location fixed at zero:
        // the log of a log-normal sample is normal, so fit the logs.
        let logs: Vec<f64> = intervals.iter().map(|d| d.ln()).collect();
        let n = logs.len() as f64;
        let mu = logs.iter().sum::<f64>() / n;
        let sigma = (logs.iter().map(|l| (l - mu).powi(2)).sum::<f64>() / n).sqrt();
        let scale = mu.exp();

        if !sigma.is_finite() || !scale.is_finite() || scale <= 0.0 {
            return Err(MimicError::Fit(format!(
                "degenerate parameters: shape={sigma}, scale={scale}"
            )));
        }

        let min_interval = intervals.iter().copied().fold(f64::INFINITY, f64::min);
        let max_interval = intervals.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Ok(Self {
            shape: sigma,
            scale,
            min_interval,
            max_interval,
        })
    }

    /// The shape parameter (sigma of the underlying normal)
    pub fn shape(&self) -> f64 {
        self.shape
    }

    /// The scale parameter (exp of the underlying normal's mean)
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// The location parameter, fixed at zero
    pub fn location(&self) -> f64 {
        0.0
    }

    /// The smallest observed interval
    pub fn min_interval(&self) -> f64 {
        self.min_interval
    }

    /// The largest observed interval
    pub fn max_interval(&self) -> f64 {
        self.max_interval
    }

    /// Draw `n` synthetic intervals using the default jitter order and a
    /// thread-local generator.
    pub fn sample(&self, n: usize) -> Result<Vec<f64>> {
        self.sample_with(n, JitterOrder::default(), &mut rand::thread_rng())
    }

    /// Draw `n` synthetic intervals with an explicit jitter order and
    /// generator.
    pub fn sample_with<R: Rng + ?Sized>(
        &self,
        n: usize,
        order: JitterOrder,
        rng: &mut R,
    ) -> Result<Vec<f64>> {
        let distribution = LogNormal::new(self.scale.ln(), self.shape)
            .map_err(|e| MimicError::Fit(e.to_string()))?;
        let jitter_bound = 0.01 * self.scale;

        let samples = (0..n)
            .map(|_| {
                let raw = distribution.sample(rng);
                let jitter = rng.gen_range(-jitter_bound..=jitter_bound);
                match order {
                    JitterOrder::ClampThenJitter => {
                        raw.clamp(self.min_interval, self.max_interval) + jitter
                    }
                    JitterOrder::JitterThenClamp => {
                        (raw + jitter).clamp(self.min_interval, self.max_interval)
                    }
                }
            })
            .collect();

        Ok(samples)
    }
}
