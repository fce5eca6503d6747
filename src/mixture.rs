//!
//! Two-component Gaussian mixture fitted by EM with priors
//!
//! Maximum a posteriori EM: the means and variances of the components are
//! pulled toward prior values (from the 5-mer baseline model) with the
//! strength of `κ` and `ν` pseudo-observations.
//!
//! ```text
//! r_ik  = w_k N(x_i; μ_k, σ_k) / Σ_j w_j N(x_i; μ_j, σ_j)
//! N_k   = Σ_i r_ik
//! w_k   = N_k / n
//! μ_k   = (κ μ⁰_k + Σ_i r_ik x_i) / (κ + N_k)
//! σ²_k  = (ν σ⁰²_k + Σ_i r_ik (x_i - μ_k)² + κ (μ_k - μ⁰_k)²) / (ν + N_k)
//! ```
//!
//! Iterations stop when the change of the log-likelihood is below the
//! tolerance.
//!
use crate::hmm::Emission;
use crate::prob::Prob;
use derive_new::new;
use serde::{Deserialize, Serialize};
use thiserror::Error;

///
/// A weighted normal component
///
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, new)]
pub struct Component {
    pub weight: f64,
    pub mean: f64,
    pub stdv: f64,
}

impl Component {
    /// `w N(x; mean, stdv)`
    fn weighted_prob(&self, x: f64) -> Prob {
        Prob::from_prob(self.weight) * Emission::normal(self.mean, self.stdv).prob(x)
    }
}

///
/// Prior `(mean, stdv)` of a component
///
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, new)]
pub struct ComponentPrior {
    pub mean: f64,
    pub stdv: f64,
}

///
/// Fitted mixture
///
#[derive(Clone, Debug, PartialEq)]
pub struct Mixture {
    pub components: [Component; 2],
    /// log-likelihood of the data at the returned parameters
    pub log_likelihood: f64,
    /// number of EM iterations run
    pub iterations: usize,
}

impl std::fmt::Display for Mixture {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        for (k, c) in self.components.iter().enumerate() {
            write!(f, "w{}={:.4} N({:.4},{:.4}) ", k + 1, c.weight, c.mean, c.stdv)?;
        }
        write!(f, "ll={:.4} it={}", self.log_likelihood, self.iterations)
    }
}

///
/// Parameters of the EM
///
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmConfig {
    /// stop when `|ΔLL| < tolerance`
    pub tolerance: f64,
    /// give up after this many iterations
    pub max_iterations: usize,
    /// strength `κ` of the prior on the means
    pub mean_strength: f64,
    /// strength `ν` of the prior on the variances
    pub var_strength: f64,
}

impl Default for EmConfig {
    fn default() -> Self {
        EmConfig {
            tolerance: 0.0001,
            max_iterations: 10_000,
            mean_strength: 1.0,
            var_strength: 1.0,
        }
    }
}

impl EmConfig {
    pub fn with_tolerance(tolerance: f64) -> Self {
        EmConfig {
            tolerance,
            ..Default::default()
        }
    }
}

///
/// Why a fit was abandoned
///
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FitError {
    #[error("no values to fit")]
    Empty,
    #[error("log-likelihood became {log_likelihood} at iteration {iteration}")]
    InvalidLikelihood { iteration: usize, log_likelihood: f64 },
    #[error("variance of component {component} became {variance} at iteration {iteration}")]
    DegenerateVariance {
        iteration: usize,
        component: usize,
        variance: f64,
    },
    #[error("not converged in {0} iterations")]
    NotConverged(usize),
}

///
/// Fit a two-component mixture to `values`.
///
/// Starts from weights 0.5/0.5 and the prior means and stdvs. The result
/// does not depend on the order of `values`.
///
pub fn fit_mixture(
    values: &[f64],
    priors: [ComponentPrior; 2],
    config: &EmConfig,
) -> Result<Mixture, FitError> {
    if values.is_empty() {
        return Err(FitError::Empty);
    }
    let mut xs = values.to_vec();
    xs.sort_by(|a, b| a.total_cmp(b));
    let n = xs.len() as f64;

    let mut components = [
        Component::new(0.5, priors[0].mean, priors[0].stdv),
        Component::new(0.5, priors[1].mean, priors[1].stdv),
    ];
    let mut resp = vec![0.0; xs.len()];
    let mut prev_ll = f64::NEG_INFINITY;

    for iteration in 1..=config.max_iterations {
        // E-step: responsibility of the first component
        let mut ll = 0.0;
        for (r, &x) in resp.iter_mut().zip(xs.iter()) {
            let p0 = components[0].weighted_prob(x);
            let p1 = components[1].weighted_prob(x);
            let total = p0 + p1;
            *r = (p0 / total).to_value();
            ll += total.to_log_value();
        }
        if !ll.is_finite() {
            return Err(FitError::InvalidLikelihood {
                iteration,
                log_likelihood: ll,
            });
        }
        if (ll - prev_ll).abs() < config.tolerance {
            return Ok(Mixture {
                components,
                log_likelihood: ll,
                iterations: iteration,
            });
        }
        prev_ll = ll;

        // M-step
        for (k, prior) in priors.iter().enumerate() {
            let r_k = |r: f64| if k == 0 { r } else { 1.0 - r };
            let n_k: f64 = resp.iter().map(|&r| r_k(r)).sum();
            let sum_x: f64 = resp.iter().zip(xs.iter()).map(|(&r, &x)| r_k(r) * x).sum();
            let mean = (config.mean_strength * prior.mean + sum_x) / (config.mean_strength + n_k);
            let sum_sq: f64 = resp
                .iter()
                .zip(xs.iter())
                .map(|(&r, &x)| r_k(r) * (x - mean) * (x - mean))
                .sum();
            let variance = (config.var_strength * prior.stdv * prior.stdv
                + sum_sq
                + config.mean_strength * (mean - prior.mean) * (mean - prior.mean))
                / (config.var_strength + n_k);
            if !(variance > 0.0 && variance.is_finite()) {
                return Err(FitError::DegenerateVariance {
                    iteration,
                    component: k + 1,
                    variance,
                });
            }
            components[k] = Component::new(n_k / n, mean, variance.sqrt());
        }
    }
    Err(FitError::NotConverged(config.max_iterations))
}

//
// tests
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::mixture_samples;
    use approx::assert_relative_eq;

    fn priors(m1: f64, s1: f64, m2: f64, s2: f64) -> [ComponentPrior; 2] {
        [ComponentPrior::new(m1, s1), ComponentPrior::new(m2, s2)]
    }

    #[test]
    fn recover_generating_mixture() {
        let xs = mixture_samples(&[(0.7, 80.0, 2.0), (0.3, 95.0, 4.0)], 500, 11);
        let fit = fit_mixture(&xs, priors(78.0, 2.0, 97.0, 4.0), &EmConfig::default()).unwrap();
        let [c1, c2] = fit.components;
        println!("{}", fit);
        assert_relative_eq!(c1.mean, 80.0, max_relative = 0.05);
        assert_relative_eq!(c2.mean, 95.0, max_relative = 0.05);
        assert_relative_eq!(c1.stdv, 2.0, max_relative = 0.15);
        assert_relative_eq!(c2.stdv, 4.0, max_relative = 0.15);
        assert_relative_eq!(c1.weight, 0.7, max_relative = 0.15);
        assert_relative_eq!(c2.weight, 0.3, max_relative = 0.15);
        assert_relative_eq!(c1.weight + c2.weight, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn single_observation_goes_to_the_narrow_component() {
        let fit = fit_mixture(&[88.0], priors(88.0, 1.5, 88.0, 3.0), &EmConfig::default()).unwrap();
        let [c1, c2] = fit.components;
        assert!(c1.weight > 0.95, "{}", fit);
        assert_relative_eq!(c1.mean, 88.0, epsilon = 1e-9);
        assert_relative_eq!(c2.mean, 88.0, epsilon = 1e-9);
        assert!(c1.stdv > 0.0 && c2.stdv > 0.0);
    }

    #[test]
    fn order_of_values_does_not_matter() {
        let mut xs = mixture_samples(&[(0.5, 70.0, 1.0), (0.5, 75.0, 3.0)], 200, 3);
        let config = EmConfig::with_tolerance(1e-6);
        let a = fit_mixture(&xs, priors(70.0, 1.0, 75.0, 2.0), &config).unwrap();
        xs.reverse();
        let b = fit_mixture(&xs, priors(70.0, 1.0, 75.0, 2.0), &config).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn failures() {
        let p = priors(80.0, 1.0, 80.0, 2.0);
        assert_eq!(
            fit_mixture(&[], p, &EmConfig::default()),
            Err(FitError::Empty)
        );
        // a value too far for both components underflows the likelihood
        let r = fit_mixture(&[1.0e300], p, &EmConfig::default());
        assert!(matches!(r, Err(FitError::InvalidLikelihood { iteration: 1, .. })));
        // not enough iterations to converge
        let xs = mixture_samples(&[(0.5, 80.0, 1.0), (0.5, 90.0, 1.0)], 100, 0);
        let config = EmConfig {
            max_iterations: 1,
            ..Default::default()
        };
        assert_eq!(fit_mixture(&xs, p, &config), Err(FitError::NotConverged(1)));
    }

    #[test]
    fn priors_keep_variances_positive() {
        // identical values would collapse an unregularized component
        let xs = vec![85.0; 50];
        let fit = fit_mixture(&xs, priors(85.0, 1.0, 85.0, 2.0), &EmConfig::default()).unwrap();
        for c in fit.components.iter() {
            assert!(c.stdv > 0.0);
            assert!(c.stdv.is_finite());
        }
    }
}
