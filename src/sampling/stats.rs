//! Running estimators with binning error bars.

use num_complex::Complex64;

/// Accumulates complex samples. The sample mean is exact; error bars come
/// from the spread of bin means, which absorbs autocorrelation shorter than
/// a bin. Real and imaginary parts get independent errors.
#[derive(Clone, Debug)]
pub struct BinnedAccumulator {
    bin_size: usize,
    count: usize,
    sum: Complex64,
    /// Sum of squares of real and imaginary parts.
    sum_sq: (f64, f64),
    current: Complex64,
    current_count: usize,
    bin_means: Vec<Complex64>,
}

impl BinnedAccumulator {
    /// Accumulator that forms `num_bins` bins out of `expected_samples`.
    pub fn new(expected_samples: usize, num_bins: usize) -> Self {
        let bin_size = (expected_samples / num_bins.max(1)).max(1);
        Self {
            bin_size,
            count: 0,
            sum: Complex64::new(0.0, 0.0),
            sum_sq: (0.0, 0.0),
            current: Complex64::new(0.0, 0.0),
            current_count: 0,
            bin_means: Vec::with_capacity(num_bins),
        }
    }

    pub fn push(&mut self, x: Complex64) {
        self.count += 1;
        self.sum += x;
        self.sum_sq.0 += x.re * x.re;
        self.sum_sq.1 += x.im * x.im;
        self.current += x;
        self.current_count += 1;
        if self.current_count == self.bin_size {
            self.bin_means.push(self.current / self.bin_size as f64);
            self.current = Complex64::new(0.0, 0.0);
            self.current_count = 0;
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn num_bins(&self) -> usize {
        self.bin_means.len()
    }

    /// Zero when empty.
    pub fn mean(&self) -> Complex64 {
        if self.count == 0 {
            Complex64::new(0.0, 0.0)
        } else {
            self.sum / self.count as f64
        }
    }

    /// Unbiased sample variance of the real and imaginary parts.
    pub fn variance(&self) -> Complex64 {
        if self.count < 2 {
            return Complex64::new(0.0, 0.0);
        }
        let n = self.count as f64;
        let mean = self.mean();
        let var_re = (self.sum_sq.0 - n * mean.re * mean.re) / (n - 1.0);
        let var_im = (self.sum_sq.1 - n * mean.im * mean.im) / (n - 1.0);
        Complex64::new(var_re.max(0.0), var_im.max(0.0))
    }

    /// Standard error of the mean. Uses the bin means once two bins are
    /// complete, the naive sample error before that.
    pub fn error(&self) -> Complex64 {
        let nb = self.bin_means.len();
        if nb < 2 {
            if self.count < 2 {
                return Complex64::new(0.0, 0.0);
            }
            let var = self.variance();
            let n = self.count as f64;
            return Complex64::new((var.re / n).sqrt(), (var.im / n).sqrt());
        }
        let m = self.bin_means.iter().sum::<Complex64>() / nb as f64;
        let (mut var_re, mut var_im) = (0.0, 0.0);
        for b in &self.bin_means {
            var_re += (b.re - m.re).powi(2);
            var_im += (b.im - m.im).powi(2);
        }
        let denom = (nb - 1) as f64 * nb as f64;
        Complex64::new((var_re / denom).sqrt(), (var_im / denom).sqrt())
    }

    pub fn reset(&mut self) {
        let bins = self.bin_means.capacity();
        *self = Self {
            bin_size: self.bin_size,
            bin_means: Vec::with_capacity(bins),
            ..Self::new(0, 1)
        };
    }
}

/// Integrated autocorrelation time `1 + 2 sum_t rho(t)`, summed until the
/// autocorrelation first turns negative.
pub fn autocorrelation_time(samples: &[f64]) -> f64 {
    let n = samples.len();
    if n < 2 {
        return 1.0;
    }
    let mean = samples.iter().sum::<f64>() / n as f64;
    let var = samples.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / n as f64;
    if var <= 0.0 {
        return 1.0;
    }

    let mut tau = 1.0;
    for t in 1..n / 2 {
        let rho = samples[..n - t]
            .iter()
            .zip(&samples[t..])
            .map(|(&x, &y)| (x - mean) * (y - mean))
            .sum::<f64>()
            / ((n - t) as f64 * var);
        if rho < 0.0 {
            break;
        }
        tau += 2.0 * rho;
    }
    tau
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::RandomEngine;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal};

    #[test]
    fn test_mean_and_empty() {
        let mut acc = BinnedAccumulator::new(4, 2);
        assert_eq!(acc.mean(), Complex64::new(0.0, 0.0));
        assert_eq!(acc.error(), Complex64::new(0.0, 0.0));
        for x in [1.0, 2.0, 3.0, 4.0] {
            acc.push(Complex64::new(x, -x));
        }
        assert_eq!(acc.count(), 4);
        assert_eq!(acc.num_bins(), 2);
        assert_relative_eq!(acc.mean().re, 2.5);
        assert_relative_eq!(acc.mean().im, -2.5);
        // Bin means 1.5 and 3.5.
        assert_relative_eq!(acc.error().re, 1.0);
        assert_relative_eq!(acc.variance().re, 5.0 / 3.0);
        acc.reset();
        assert_eq!(acc.count(), 0);
        assert_eq!(acc.num_bins(), 0);
    }

    fn normal_error(n: usize, seed: u64) -> f64 {
        let mut rng = rand_pcg::Pcg64::seed_from_u64(seed);
        let dist = Normal::new(0.0, 1.0).unwrap();
        let mut acc = BinnedAccumulator::new(n, 20);
        for _ in 0..n {
            acc.push(Complex64::new(dist.sample(&mut rng), 0.0));
        }
        acc.error().re
    }

    #[test]
    fn test_error_scales_as_inverse_sqrt() {
        // 16x the samples should shrink the error about 4x.
        let seeds = 20;
        let small: f64 = (0..seeds).map(|s| normal_error(2_000, s)).sum::<f64>() / seeds as f64;
        let large: f64 = (0..seeds).map(|s| normal_error(32_000, 100 + s)).sum::<f64>() / seeds as f64;
        let ratio = small / large;
        assert!((2.5..6.0).contains(&ratio), "ratio {}", ratio);
    }

    #[test]
    fn test_autocorrelation_time() {
        let mut rng = RandomEngine::new(Some(4));
        let white: Vec<f64> = (0..5000).map(|_| rng.rand_double()).collect();
        let tau = autocorrelation_time(&white);
        assert!(tau < 1.5, "tau {}", tau);

        // AR(1) with phi = 0.9: tau = (1 + phi) / (1 - phi) = 19.
        let mut x = 0.0;
        let ar: Vec<f64> = (0..50_000)
            .map(|_| {
                x = 0.9 * x + (rng.rand_double() - 0.5);
                x
            })
            .collect();
        let tau = autocorrelation_time(&ar);
        assert!(tau > 10.0 && tau < 30.0, "tau {}", tau);
        assert_eq!(autocorrelation_time(&[1.0]), 1.0);
    }
}
