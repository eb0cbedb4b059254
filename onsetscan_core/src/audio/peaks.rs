//! Peak picking over an onset envelope.
//!
//! A frame `n` is kept when all of these hold:
//!
//! 1. `x[n]` is the first occurrence of the maximum of `x[n - pre_max .. n + post_max)`,
//! 2. `x[n] >= mean + delta` and `x[n] >= mean * (1 + relative)`, where `mean`
//!    is the average of `x[n - pre_avg .. n + post_avg)`,
//! 3. `n` is at least `wait` frames after the previously kept peak.
//!
//! Windows are truncated at the signal edges and always contain `n`.

use std::ops::Range;

use crate::config::PeakPickConfig;

pub fn pick_peaks(x: &[f32], config: &PeakPickConfig) -> Vec<usize> {
    let mut peaks = Vec::new();
    let mut last: Option<usize> = None;

    for n in 0..x.len() {
        if !is_window_max(x, n, window(n, config.pre_max, config.post_max, x.len())) {
            continue;
        }

        let mean = window_mean(x, window(n, config.pre_avg, config.post_avg, x.len()));
        let value = x[n];
        if value < mean + config.delta || value < mean * (1.0 + config.relative) {
            continue;
        }

        if let Some(prev) = last {
            if n - prev < config.wait {
                continue;
            }
        }

        peaks.push(n);
        last = Some(n);
    }

    peaks
}

fn window(n: usize, pre: usize, post: usize, len: usize) -> Range<usize> {
    let start = n.saturating_sub(pre);
    let end = (n + post.max(1)).min(len);
    start..end
}

/// True when `n` is the earliest index holding the window maximum.
fn is_window_max(x: &[f32], n: usize, range: Range<usize>) -> bool {
    let mut best = range.start;
    for i in range {
        if x[i] > x[best] {
            best = i;
        }
    }
    best == n
}

fn window_mean(x: &[f32], range: Range<usize>) -> f32 {
    let count = range.len();
    x[range].iter().sum::<f32>() / count as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> PeakPickConfig {
        PeakPickConfig::default()
    }

    #[test]
    fn flat_signal_has_no_peaks() {
        assert!(pick_peaks(&[0.0; 100], &defaults()).is_empty());
        assert!(pick_peaks(&[3.0; 100], &defaults()).is_empty());
        assert!(pick_peaks(&[], &defaults()).is_empty());
    }

    #[test]
    fn isolated_spike_is_picked() {
        let mut x = vec![0.0; 50];
        x[20] = 4.0;
        assert_eq!(pick_peaks(&x, &defaults()), vec![20]);
    }

    #[test]
    fn spike_below_absolute_margin_is_rejected() {
        let mut x = vec![0.0; 50];
        x[20] = 0.5;
        // mean over 20 frames is 0.025, so 0.5 < 0.525
        assert!(pick_peaks(&x, &defaults()).is_empty());
    }

    #[test]
    fn spike_below_relative_margin_is_rejected() {
        // Raised floor: mean is about 10.05 so the absolute margin holds but
        // 11.0 < 1.5 * mean does not.
        let mut x = vec![10.0; 50];
        x[20] = 11.0;
        let config = PeakPickConfig {
            relative: 0.0,
            ..defaults()
        };
        assert_eq!(pick_peaks(&x, &config), vec![20]);
        assert!(pick_peaks(&x, &defaults()).is_empty());
    }

    #[test]
    fn ties_resolve_to_earliest_index() {
        let mut x = vec![0.0; 50];
        x[20] = 5.0;
        x[21] = 5.0;
        assert_eq!(pick_peaks(&x, &defaults()), vec![20]);
    }

    #[test]
    fn close_peaks_respect_wait() {
        // Two maxima 12 frames apart with a small one between them; with a
        // narrow max window both pass, then wait decides.
        let mut x = vec![0.0; 60];
        x[10] = 5.0;
        x[22] = 6.0;
        let narrow = PeakPickConfig {
            pre_max: 1,
            post_max: 1,
            ..defaults()
        };
        assert_eq!(pick_peaks(&x, &narrow), vec![10, 22]);

        let long_wait = PeakPickConfig { wait: 15, ..narrow };
        assert_eq!(pick_peaks(&x, &long_wait), vec![10]);
    }

    #[test]
    fn peaks_are_spaced_and_in_range() {
        let x: Vec<f32> = (0..500)
            .map(|i| {
                let t = i as f32;
                ((t * 0.37).sin() * (t * 0.05).cos()).abs() * 3.0 + if i % 17 == 0 { 4.0 } else { 0.0 }
            })
            .collect();
        let peaks = pick_peaks(&x, &defaults());
        assert!(!peaks.is_empty());
        for pair in peaks.windows(2) {
            assert!(pair[1] > pair[0]);
            assert!(pair[1] - pair[0] >= 10);
        }
        assert!(peaks.iter().all(|&p| p < x.len()));
    }

    #[test]
    fn edge_windows_are_truncated() {
        let mut x = vec![0.0; 30];
        x[0] = 3.0;
        x[29] = 3.0;
        assert_eq!(pick_peaks(&x, &defaults()), vec![0, 29]);
    }
}
