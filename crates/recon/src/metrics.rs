//! Business ratios. All return a percent rounded to one decimal, and 0.0
//! when the denominator is zero or the result is not finite. Attainment
//! ratios (achievement, progress) are also 0.0 for a non-positive target
//! and never negative; growth keeps its sign.

fn ratio_percent(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    let pct = numerator / denominator * 100.0;
    if pct.is_finite() {
        round1(pct)
    } else {
        0.0
    }
}

fn growth_percent(current: f64, previous: f64) -> f64 {
    ratio_percent(current - previous, previous)
}

pub fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Share of `whole` that `part` represents.
pub fn percentage(part: usize, whole: usize) -> f64 {
    ratio_percent(part as f64, whole as f64)
}

fn attainment_percent(value: f64, target: f64) -> f64 {
    if target <= 0.0 || target.is_nan() {
        return 0.0;
    }
    ratio_percent(value, target).max(0.0)
}

pub fn achievement_rate(actual: f64, target: f64) -> f64 {
    attainment_percent(actual, target)
}

pub fn progress_rate(current: f64, target: f64) -> f64 {
    attainment_percent(current, target)
}

/// Year-over-year growth.
pub fn yoy_growth(this_year: f64, last_year: f64) -> f64 {
    growth_percent(this_year, last_year)
}

/// Month-over-month growth.
pub fn mom_growth(this_month: f64, last_month: f64) -> f64 {
    growth_percent(this_month, last_month)
}
