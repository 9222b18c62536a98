/// Arithmetic mean; 0 for an empty slice.
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Median (average of the two middle values for even lengths); 0 for an empty slice.
pub fn median(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        0.5 * (sorted[mid - 1] + sorted[mid])
    } else {
        sorted[mid]
    }
}

/// Circular mean of angles in degrees, mapped to [0, 360). `None` when the
/// resultant vector vanishes.
pub fn circular_mean_deg(angles: &[f64]) -> Option<f64> {
    if angles.is_empty() {
        return None;
    }
    let (s, c) = angles.iter().fold((0.0, 0.0), |(s, c), a| {
        let r = a.to_radians();
        (s + r.sin(), c + r.cos())
    });
    if s.hypot(c) < 1e-12 * angles.len() as f64 {
        return None;
    }
    Some(wrap_deg(s.atan2(c).to_degrees()))
}

/// Wrap an angle in degrees into [0, 360).
pub fn wrap_deg(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}
