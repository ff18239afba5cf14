//! Legend click handling for datetime charts.
//!
//! A single click on a legend entry toggles that series; two clicks within
//! the double-click window either isolate the series or, when some series
//! are already hidden, show everything again. The timer itself belongs to
//! the UI layer: [`LegendClicks`] only says when to arm or cancel it.

use std::time::Duration;

use crate::series::Series;

pub const DOUBLE_CLICK_WINDOW: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClickState {
    #[default]
    Idle,
    /// A click arrived and its timer is armed.
    PendingSingle { index: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegendAction {
    Toggle(usize),
    IsolateOrRestore(usize),
}

/// What the UI layer should do after a click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Arm the single timer; call [`LegendClicks::on_timeout`] when it fires.
    ArmTimer(Duration),
    /// Cancel the pending timer and apply the action now.
    CancelTimer(LegendAction),
}

#[derive(Debug, Clone)]
pub struct LegendClicks {
    window: Duration,
    state: ClickState,
}

impl Default for LegendClicks {
    fn default() -> Self {
        Self::new(DOUBLE_CLICK_WINDOW)
    }
}

impl LegendClicks {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            state: ClickState::Idle,
        }
    }

    pub fn state(&self) -> ClickState {
        self.state
    }

    pub fn on_click(&mut self, index: usize) -> ClickOutcome {
        match self.state {
            ClickState::Idle => {
                self.state = ClickState::PendingSingle { index };
                ClickOutcome::ArmTimer(self.window)
            }
            ClickState::PendingSingle { .. } => {
                self.state = ClickState::Idle;
                ClickOutcome::CancelTimer(LegendAction::IsolateOrRestore(index))
            }
        }
    }

    /// The armed timer fired. Returns `None` for a stale timer.
    pub fn on_timeout(&mut self) -> Option<LegendAction> {
        match std::mem::take(&mut self.state) {
            ClickState::PendingSingle { index } => Some(LegendAction::Toggle(index)),
            ClickState::Idle => None,
        }
    }
}

/// Apply a legend action to the series' visibility flags.
pub fn apply_legend_action(series: &mut [Series], action: LegendAction) {
    match action {
        LegendAction::Toggle(index) => {
            if let Some(s) = series.get_mut(index) {
                s.hidden = !s.hidden;
            }
        }
        LegendAction::IsolateOrRestore(index) => {
            let all_visible = series.iter().all(|s| !s.hidden);
            for (i, s) in series.iter_mut().enumerate() {
                s.hidden = all_visible && i != index;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::{build_series, SeriesData};

    fn three_series() -> Vec<Series> {
        ["a", "b", "c"]
            .iter()
            .map(|label| {
                build_series(SeriesData::Values(vec![]), *label, "rgba(1, 2, 3, 1)".to_string())
                    .unwrap()
            })
            .collect()
    }

    fn hidden(series: &[Series]) -> Vec<bool> {
        series.iter().map(|s| s.hidden).collect()
    }

    #[test]
    fn test_single_click_toggles_after_timeout() {
        let mut clicks = LegendClicks::default();
        let mut series = three_series();

        assert_eq!(clicks.on_click(1), ClickOutcome::ArmTimer(DOUBLE_CLICK_WINDOW));
        let action = clicks.on_timeout().unwrap();
        apply_legend_action(&mut series, action);
        assert_eq!(hidden(&series), vec![false, true, false]);
        assert_eq!(clicks.state(), ClickState::Idle);
    }

    #[test]
    fn test_double_click_isolates_then_restores() {
        let mut clicks = LegendClicks::default();
        let mut series = three_series();

        clicks.on_click(2);
        let ClickOutcome::CancelTimer(action) = clicks.on_click(2) else {
            panic!("expected double click");
        };
        apply_legend_action(&mut series, action);
        assert_eq!(hidden(&series), vec![true, true, false]);

        clicks.on_click(0);
        let ClickOutcome::CancelTimer(action) = clicks.on_click(0) else {
            panic!("expected double click");
        };
        apply_legend_action(&mut series, action);
        assert_eq!(hidden(&series), vec![false, false, false]);
    }

    #[test]
    fn test_stale_timeout_is_ignored() {
        let mut clicks = LegendClicks::default();
        clicks.on_click(0);
        clicks.on_click(0);
        assert_eq!(clicks.on_timeout(), None);
    }

    #[test]
    fn test_toggle_out_of_range_is_noop() {
        let mut series = three_series();
        apply_legend_action(&mut series, LegendAction::Toggle(9));
        assert_eq!(hidden(&series), vec![false, false, false]);
    }
}
