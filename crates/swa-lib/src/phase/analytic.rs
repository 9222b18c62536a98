use crate::error::{Result, SlowWaveError};
use realfft::{num_complex::Complex, RealFftPlanner};

/// Instantaneous phase (radians, 0 at positive peaks) of a real trace via the
/// FFT-based Hilbert transform.
pub fn analytic_phase(x: &[f64]) -> Result<Vec<f64>> {
    let hilbert = hilbert_transform(x)?;
    Ok(x.iter()
        .zip(hilbert.iter())
        .map(|(re, im)| im.atan2(*re))
        .collect())
}

/// Imaginary part of the analytic signal.
pub fn hilbert_transform(x: &[f64]) -> Result<Vec<f64>> {
    let n = x.len();
    if n == 0 {
        return Ok(Vec::new());
    }
    let mut planner = RealFftPlanner::<f64>::new();
    let r2c = planner.plan_fft_forward(n);
    let c2r = planner.plan_fft_inverse(n);

    let mut input = x.to_vec();
    let mut spectrum = r2c.make_output_vec();
    r2c.process(&mut input, &mut spectrum)
        .map_err(|e| SlowWaveError::Transform(e.to_string()))?;

    // rotate positive frequencies by -90 degrees
    for c in spectrum.iter_mut() {
        *c = Complex::new(c.im, -c.re);
    }
    spectrum[0] = Complex::new(0.0, 0.0);
    if n % 2 == 0 {
        let nyquist = spectrum.len() - 1;
        spectrum[nyquist] = Complex::new(0.0, 0.0);
    }

    let mut out = c2r.make_output_vec();
    c2r.process(&mut spectrum, &mut out)
        .map_err(|e| SlowWaveError::Transform(e.to_string()))?;
    let scale = 1.0 / n as f64;
    for v in out.iter_mut() {
        *v *= scale;
    }
    Ok(out)
}
