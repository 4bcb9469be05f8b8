//! Trailing windows over nullable columns.

/// Trailing (non-centered) window ending at each position.
///
/// A window produces output only when it holds at least `min_periods`
/// present values; by default that is the full window size, so the first
/// `size - 1` positions and any window touching a gap are `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrailingWindow {
    size: usize,
    min_periods: usize,
}

impl TrailingWindow {
    /// Creates a window that requires `size` present values.
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        TrailingWindow {
            size,
            min_periods: size,
        }
    }

    /// Relaxes the number of present values a window needs.
    pub fn with_min_periods(mut self, min_periods: usize) -> Self {
        self.min_periods = min_periods.clamp(1, self.size);
        self
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Applies `primitive` to the present values of every window.
    pub fn apply<F>(&self, data: &[Option<f64>], mut primitive: F) -> Vec<Option<f64>>
    where
        F: FnMut(&[f64]) -> f64,
    {
        let mut result = Vec::with_capacity(data.len());
        let mut window = Vec::with_capacity(self.size);

        for index in 0..data.len() {
            let start = (index + 1).saturating_sub(self.size);
            window.clear();
            window.extend(data[start..=index].iter().flatten().copied());

            if window.len() >= self.min_periods {
                result.push(Some(primitive(&window)));
            } else {
                result.push(None);
            }
        }

        result
    }

    /// Trailing mean.
    pub fn mean(&self, data: &[Option<f64>]) -> Vec<Option<f64>> {
        self.apply(data, |values| values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Trailing mean over `window` periods, requiring a full window.
pub fn rolling_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    TrailingWindow::new(window).mean(values)
}
