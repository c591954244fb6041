//! Post-capture analysis helpers.

use crate::{CaptureError, Result};

/// Simple moving average over `data` with the given window size.
///
/// Returns one value per full window (`data.len() - window + 1` values).
/// Fails if the window is zero or longer than the data.
pub fn moving_average(data: &[f64], window: usize) -> Result<Vec<f64>> {
    if window == 0 {
        return Err(CaptureError::invalid_argument("window size must be non-zero"));
    }
    if window > data.len() {
        return Err(CaptureError::invalid_argument(format!(
            "window size {window} exceeds data length {}",
            data.len()
        )));
    }

    let inv = 1.0 / window as f64;
    let mut sum: f64 = data[..window].iter().sum();
    let mut averages = Vec::with_capacity(data.len() - window + 1);
    averages.push(sum * inv);

    for i in window..data.len() {
        sum += data[i] - data[i - window];
        averages.push(sum * inv);
    }
    Ok(averages)
}
