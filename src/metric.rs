use itertools::izip;

pub type WeightFn = fn(f64) -> f64;

/// Per-field weighting rule with the function name already resolved.
#[derive(Debug, Clone, Copy)]
pub enum ResolvedWeight {
    Constant(f64),
    Function(WeightFn),
}

impl ResolvedWeight {
    /// Weighted value for one absolute field difference.
    pub fn apply(&self, diff: f64) -> f64 {
        match self {
            ResolvedWeight::Constant(w) => w * diff,
            ResolvedWeight::Function(f) => f(diff) * diff,
        }
    }
}

/// Look up a registered weight function by name. Unknown names are a
/// configuration-validation failure in the caller, never a per-pair one.
pub fn lookup_weight_fn(name: &str) -> Option<WeightFn> {
    match name {
        "identity" => Some(identity),
        "sqrt" => Some(square_root),
        "log1p" => Some(log1p),
        "inverse" => Some(inverse),
        _ => None,
    }
}

fn identity(diff: f64) -> f64 {
    diff
}

fn square_root(diff: f64) -> f64 {
    diff.sqrt()
}

fn log1p(diff: f64) -> f64 {
    diff.ln_1p()
}

fn inverse(diff: f64) -> f64 {
    1.0 / (1.0 + diff)
}

/// Euclidean norm of the elementwise weighted absolute differences.
pub fn weighted_distance(u: &[f64], v: &[f64], weights: &[ResolvedWeight]) -> f64 {
    debug_assert_eq!(u.len(), v.len());
    debug_assert_eq!(u.len(), weights.len());

    let sum: f64 = izip!(u, v, weights)
        .map(|(a, b, w)| {
            let weighted = w.apply((a - b).abs());
            weighted * weighted
        })
        .sum();
    sum.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_weights_give_euclidean_distance() {
        let weights = [ResolvedWeight::Constant(1.0), ResolvedWeight::Constant(1.0)];
        let d = weighted_distance(&[0.0, 0.0], &[3.0, 4.0], &weights);
        assert!((d - 5.0).abs() < 1e-12, "expected 5.0, got {}", d);
    }

    #[test]
    fn test_constant_weight_scales_each_field() {
        let weights = [ResolvedWeight::Constant(2.0), ResolvedWeight::Constant(0.0)];
        let d = weighted_distance(&[1.0, 10.0], &[4.0, 20.0], &weights);
        // First field contributes (2*3)^2, second is zeroed out entirely
        assert!((d - 6.0).abs() < 1e-12, "expected 6.0, got {}", d);
    }

    #[test]
    fn test_function_weight_applies_to_difference() {
        let f = lookup_weight_fn("inverse").unwrap();
        let weights = [ResolvedWeight::Function(f)];
        // diff = 3, weight = 1/(1+3) = 0.25, weighted = 0.75
        let d = weighted_distance(&[0.0], &[3.0], &weights);
        assert!((d - 0.75).abs() < 1e-12, "expected 0.75, got {}", d);
    }

    #[test]
    fn test_identical_vectors_have_zero_distance() {
        let weights = [ResolvedWeight::Constant(3.5), ResolvedWeight::Constant(1.0)];
        let d = weighted_distance(&[7.0, -2.0], &[7.0, -2.0], &weights);
        assert_eq!(d, 0.0);
    }

    #[test]
    fn test_registry_knows_all_registered_names() {
        for name in ["identity", "sqrt", "log1p", "inverse"] {
            assert!(lookup_weight_fn(name).is_some(), "missing weight fn: {}", name);
        }
        assert!(lookup_weight_fn("cube").is_none());
        assert!(lookup_weight_fn("").is_none());
    }

    #[test]
    fn test_registered_functions_are_monotone_on_samples() {
        for name in ["identity", "sqrt", "log1p", "inverse"] {
            let f = lookup_weight_fn(name).unwrap();
            let samples: Vec<f64> = (0..50).map(|i| i as f64 * 0.5).collect();
            let increasing = samples.windows(2).all(|w| f(w[0]) <= f(w[1]));
            let decreasing = samples.windows(2).all(|w| f(w[0]) >= f(w[1]));
            assert!(
                increasing || decreasing,
                "weight fn {} is not monotone",
                name
            );
        }
    }
}
