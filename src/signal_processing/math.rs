use std::f64::consts::PI;

/// Arithmetic mean, zero for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Index of the first maximum
///
/// NaN entries never win. Returns `None` for an empty slice or when every
/// entry is NaN.
pub fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// DFT sample frequencies in cycles per unit of `spacing`
///
/// Standard ordering: `0, 1, …, ⌈n/2⌉−1, −⌊n/2⌋, …, −1` divided by `n·spacing`.
pub fn fft_frequencies(n: usize, spacing: f64) -> Vec<f64> {
    let scale = 1.0 / (n as f64 * spacing);
    let positive = n.div_ceil(2);
    (0..n)
        .map(|i| {
            let bin = if i < positive {
                i as f64
            } else {
                i as f64 - n as f64
            };
            bin * scale
        })
        .collect()
}

/// Angular wavenumbers `2π·f` of the DFT bins
pub fn fft_wavenumbers(n: usize, spacing: f64) -> Vec<f64> {
    fft_frequencies(n, spacing)
        .into_iter()
        .map(|f| 2.0 * PI * f)
        .collect()
}

/// `n` evenly spaced values from `start` to `end` inclusive
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}

/// Piecewise-linear interpolation of `(xs, ys)` at `x`
///
/// `xs` must be strictly increasing; `x` outside the table is clamped to the
/// end values.
pub fn interp_linear(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    debug_assert_eq!(xs.len(), ys.len());
    let n = xs.len();
    if n == 0 {
        return f64::NAN;
    }
    if x <= xs[0] {
        return ys[0];
    }
    if x >= xs[n - 1] {
        return ys[n - 1];
    }
    // First index with xs[hi] > x
    let hi = xs.partition_point(|&v| v <= x);
    let lo = hi - 1;
    let t = (x - xs[lo]) / (xs[hi] - xs[lo]);
    ys[lo] + t * (ys[hi] - ys[lo])
}
