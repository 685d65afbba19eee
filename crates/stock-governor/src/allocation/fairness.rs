/// Evenness of a distribution as `1 - gini`, in `[0, 1]` and rounded to six
/// decimals.
///
/// Negative and non-finite entries are dropped. Zeros stay in the population:
/// an outlet that received nothing makes the distribution less even. An empty
/// or all-zero input scores `0.0`.
pub fn fairness_one_minus_gini(values: &[f64]) -> f64 {
    let mut kept: Vec<f64> = values
        .iter()
        .copied()
        .filter(|value| value.is_finite() && *value >= 0.0)
        .collect();
    if kept.is_empty() {
        return 0.0;
    }

    kept.sort_by(f64::total_cmp);
    let n = kept.len() as f64;
    let sum: f64 = kept.iter().sum();
    if sum <= 0.0 {
        return 0.0;
    }

    let ranked: f64 = kept
        .iter()
        .enumerate()
        .map(|(index, value)| (index as f64 + 1.0) * value)
        .sum();
    let gini = (2.0 * (ranked / sum) - (n + 1.0)) / n;

    round6((1.0 - gini).clamp(0.0, 1.0))
}

/// Convenience for integer quantities.
pub fn fairness_of_quantities<I>(quantities: I) -> f64
where
    I: IntoIterator<Item = u64>,
{
    let values: Vec<f64> = quantities.into_iter().map(|q| q as f64).collect();
    fairness_one_minus_gini(&values)
}

pub(crate) fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}
