//! Terminal summary of a training run.
//!
//! Records cost and gradient norm per step and prints unicode sparklines
//! once the run finishes.

use owo_colors::OwoColorize;

/// Cost and norm history of one run.
#[derive(Debug, Clone, Default)]
pub struct RunProgress {
    cost_history: Vec<f64>,
    norm_history: Vec<f64>,
}

impl RunProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, cost: f64, norm: f64) {
        self.cost_history.push(cost);
        self.norm_history.push(norm);
    }

    pub fn len(&self) -> usize {
        self.cost_history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cost_history.is_empty()
    }

    pub fn costs(&self) -> &[f64] {
        &self.cost_history
    }

    /// `(iteration, cost)` pairs for the epochs-vs-cost chart.
    pub fn cost_points(&self) -> Vec<(f64, f64)> {
        self.cost_history
            .iter()
            .enumerate()
            .map(|(i, &c)| (i as f64, c))
            .collect()
    }

    /// Render sparkline from values, sampling down to `width` characters.
    pub(crate) fn sparkline(values: &[f64], width: usize) -> String {
        let values: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if values.is_empty() {
            return " ".repeat(width);
        }

        let chars = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let range = (max - min).max(1e-12);

        (0..width)
            .map(|i| {
                let idx = if values.len() <= width {
                    (i < values.len()).then_some(i)
                } else {
                    Some(i * values.len() / width)
                };
                match idx {
                    Some(idx) => {
                        let normalized = (values[idx] - min) / range;
                        chars[((normalized * 7.0).round() as usize).min(7)]
                    }
                    None => ' ',
                }
            })
            .collect()
    }

    /// Print the end-of-run summary to stderr.
    pub fn final_summary(&self, name: &str) {
        eprintln!();
        eprintln!("{}", format!(" {} ", name).bold().on_green());

        if let (Some(first), Some(last)) = (self.cost_history.first(), self.cost_history.last()) {
            let delta = last - first;
            let delta_str = if delta < 0.0 {
                format!("{:+.4}", delta).green().to_string()
            } else if delta > 0.0 {
                format!("{:+.4}", delta).red().to_string()
            } else {
                format!("{:+.4}", delta).dimmed().to_string()
            };
            eprintln!(
                "  {}: {:.4} → {:.4}  ({}) over {} steps",
                "cost".bold(),
                first,
                last,
                delta_str,
                self.cost_history.len()
            );
            eprintln!("        [{}]", Self::sparkline(&self.cost_history, 40).cyan());
        }

        if let Some(last) = self.norm_history.last() {
            eprintln!("  {}: {:.4}", "‖g‖".bold(), last);
            eprintln!("        [{}]", Self::sparkline(&self.norm_history, 40).cyan());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparkline_width() {
        let values: Vec<f64> = (0..100).map(|i| i as f64).collect();
        assert_eq!(RunProgress::sparkline(&values, 20).chars().count(), 20);
    }

    #[test]
    fn test_sparkline_pads_short_series() {
        let line = RunProgress::sparkline(&[0.0, 1.0], 4);
        assert_eq!(line, "▁█  ");
    }

    #[test]
    fn test_sparkline_ignores_non_finite() {
        let line = RunProgress::sparkline(&[f64::NAN, 1.0, f64::INFINITY], 2);
        assert_eq!(line.chars().count(), 2);
        assert!(line.starts_with('▁'));
    }

    #[test]
    fn test_cost_points() {
        let mut progress = RunProgress::new();
        progress.record(2.0, 1.0);
        progress.record(1.5, 0.5);
        assert_eq!(progress.cost_points(), vec![(0.0, 2.0), (1.0, 1.5)]);
        assert_eq!(progress.len(), 2);
    }
}
