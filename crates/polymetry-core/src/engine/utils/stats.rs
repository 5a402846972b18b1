pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Biased (population) variance, normalized by `n` rather than `n - 1`.
pub fn population_variance(values: &[f64]) -> Option<f64> {
    let mean = mean(values)?;
    let sum_sq: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
    Some(sum_sq / values.len() as f64)
}

pub fn weighted_mean(values: &[f64], weights: &[f64]) -> Option<f64> {
    if values.is_empty() || values.len() != weights.len() {
        return None;
    }
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return None;
    }
    let weighted: f64 = values.iter().zip(weights.iter()).map(|(v, w)| v * w).sum();
    Some(weighted / total)
}

/// Pearson correlation coefficient of two equal-length series.
pub fn pearson(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.len() != b.len() || a.len() < 2 {
        return None;
    }
    let mean_a = mean(a)?;
    let mean_b = mean(b)?;
    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }
    if var_a == 0.0 || var_b == 0.0 {
        return None;
    }
    Some(cov / (var_a * var_b).sqrt())
}

/// Ordinary-least-squares line fit `y = slope * x + intercept`.
///
/// Returns `None` for fewer than 2 points or when all `x` values coincide.
pub fn fit_line(x: &[f64], y: &[f64]) -> Option<(f64, f64)> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let mean_x = mean(x)?;
    let mean_y = mean(y)?;
    let mut covariance = 0.0;
    let mut variance_x = 0.0;
    for (xi, yi) in x.iter().zip(y.iter()) {
        covariance += (xi - mean_x) * (yi - mean_y);
        variance_x += (xi - mean_x) * (xi - mean_x);
    }
    if variance_x == 0.0 {
        return None;
    }
    let slope = covariance / variance_x;
    Some((slope, mean_y - slope * mean_x))
}
