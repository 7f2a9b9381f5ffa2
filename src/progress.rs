use crate::chart::{ChartBackend, ChartError, ChartSpec, Rgb, SeriesSpec, Stroke};
use crate::dispatch::Request;
use crate::gateway::GatewayError;
use crate::model::{HabitId, ProgressSeries};
use crate::selection::RangeDays;
use crate::toast::Toasts;
use crate::visibility::{ChartState, VisibilityController, EMPTY_MESSAGE};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Applied,
    Stale,
}

pub struct ProgressChart {
    backend: Option<Box<dyn ChartBackend>>,
    visibility: VisibilityController,
    latest_token: u64,
}

impl ProgressChart {
    /// `backend` is `None` when charting is unavailable; loads then fail
    /// with an error state instead of drawing.
    pub fn new(backend: Option<Box<dyn ChartBackend>>) -> Self {
        ProgressChart {
            backend,
            visibility: VisibilityController::new(),
            latest_token: 0,
        }
    }

    /// Starts loading `habit` over `range`. Returns the request to dispatch,
    /// or nothing when no habit is selected.
    pub fn load(&mut self, habit: Option<&HabitId>, range: RangeDays) -> Option<Request> {
        let id = habit?;
        self.latest_token += 1;
        self.visibility.set_state(ChartState::Loading, None);
        debug!(token = self.latest_token, habit = %id, days = range.days(), "progress load");
        Some(Request::LoadProgress {
            token: self.latest_token,
            id: id.clone(),
            range,
        })
    }

    /// No habit is selected: drop whatever is in flight and show the empty
    /// placeholder.
    pub fn clear(&mut self) {
        self.latest_token += 1;
        self.visibility.set_state(ChartState::Empty, Some(EMPTY_MESSAGE));
    }

    pub fn resolve(
        &mut self,
        token: u64,
        result: Result<ProgressSeries, GatewayError>,
        toasts: &mut Toasts,
    ) -> Resolution {
        if token != self.latest_token {
            debug!(token, latest = self.latest_token, "discarding superseded progress reply");
            return Resolution::Stale;
        }
        match result.map_err(LoadFailure::Gateway).and_then(|series| self.render(series)) {
            Ok(()) => self.visibility.set_state(ChartState::Ready, None),
            Err(failure) => {
                warn!(error = %failure, "progress load failed");
                let message = failure.user_message();
                self.visibility.set_state(ChartState::Error, Some(&message));
                toasts.error(message);
            }
        }
        Resolution::Applied
    }

    fn render(&mut self, series: ProgressSeries) -> Result<(), LoadFailure> {
        let backend = self
            .backend
            .as_ref()
            .ok_or(LoadFailure::Chart(ChartError::Unavailable))?;
        let spec = chart_spec(series);
        self.visibility.destroy_chart();
        let chart = backend.create(spec).map_err(LoadFailure::Chart)?;
        self.visibility.install(chart);
        Ok(())
    }

    pub fn visibility(&self) -> &VisibilityController {
        &self.visibility
    }

    pub fn live_charts(&self) -> usize {
        self.backend
            .as_ref()
            .map(|b| b.live_instances())
            .unwrap_or_default()
    }
}

#[derive(thiserror::Error, Debug)]
enum LoadFailure {
    #[error(transparent)]
    Gateway(GatewayError),
    #[error(transparent)]
    Chart(ChartError),
}

impl LoadFailure {
    fn user_message(&self) -> String {
        match self {
            LoadFailure::Gateway(GatewayError::Transport(_)) => {
                "Could not reach the server to load progress.".to_string()
            }
            LoadFailure::Gateway(GatewayError::Status(code)) => {
                format!("Server returned {} while loading progress.", code)
            }
            LoadFailure::Gateway(GatewayError::Decode(_))
            | LoadFailure::Chart(ChartError::Malformed(_)) => {
                "Progress data from the server was malformed.".to_string()
            }
            LoadFailure::Chart(ChartError::Unavailable) => {
                "Charting is unavailable, progress cannot be drawn.".to_string()
            }
        }
    }
}

/// Ideal pace as a dashed reference line, actual progress as a filled,
/// smoothed line in the habit's colour.
pub fn chart_spec(series: ProgressSeries) -> ChartSpec {
    let color = series
        .habit
        .color
        .as_deref()
        .and_then(Rgb::from_hex)
        .unwrap_or(Rgb::TEAL);
    ChartSpec {
        title: series.habit.name,
        labels: series.dates,
        series: vec![
            SeriesSpec {
                label: "Ideal pace".to_string(),
                values: series.ideal,
                color: Rgb::SLATE,
                stroke: Stroke::Dashed,
                fill: false,
                smooth: false,
            },
            SeriesSpec {
                label: "Actual progress".to_string(),
                values: series.actual,
                color,
                stroke: Stroke::Solid,
                fill: true,
                smooth: true,
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::PlotBackend;
    use crate::model::{HabitSnapshot, RecordId};
    use std::time::Duration;

    fn series(color: Option<&str>) -> ProgressSeries {
        ProgressSeries {
            dates: vec!["2024-03-01".into(), "2024-03-02".into(), "2024-03-03".into()],
            ideal: vec![0.71, 1.43, 2.14],
            actual: vec![1.0, 1.0, 2.0],
            habit: HabitSnapshot {
                name: "Meditate".into(),
                color: color.map(str::to_string),
                target_per_week: Some(5),
            },
        }
    }

    fn chart() -> ProgressChart {
        ProgressChart::new(Some(Box::new(PlotBackend::new())))
    }

    fn token_of(request: Option<Request>) -> u64 {
        match request {
            Some(Request::LoadProgress { token, .. }) => token,
            other => panic!("expected a progress request, got {:?}", other),
        }
    }

    fn toasts() -> Toasts {
        Toasts::new(Duration::from_secs(5))
    }

    #[test]
    fn null_habit_is_a_no_op() {
        let mut chart = chart();
        assert!(chart.load(None, RangeDays::Month).is_none());
        assert_eq!(chart.visibility().state(), ChartState::Empty);
    }

    #[test]
    fn load_then_success_is_ready() {
        let mut chart = chart();
        let mut toasts = toasts();
        let id = RecordId::Int(1);
        let token = token_of(chart.load(Some(&id), RangeDays::Month));
        assert_eq!(chart.visibility().state(), ChartState::Loading);
        let outcome = chart.resolve(token, Ok(series(Some("#ff8800"))), &mut toasts);
        assert_eq!(outcome, Resolution::Applied);
        assert_eq!(chart.visibility().state(), ChartState::Ready);
        assert_eq!(chart.live_charts(), 1);
        let drawn = chart.visibility().chart().unwrap();
        assert_eq!(drawn.series[0].stroke, Stroke::Dashed);
        assert_eq!(drawn.series[1].color, Rgb(0xff, 0x88, 0x00));
        assert_eq!(toasts.len(), 0);
    }

    #[test]
    fn reloading_replaces_rather_than_stacks_charts() {
        let mut chart = chart();
        let mut toasts = toasts();
        let id = RecordId::Int(1);
        for range in RangeDays::ALL {
            let token = token_of(chart.load(Some(&id), range));
            chart.resolve(token, Ok(series(None)), &mut toasts);
            assert_eq!(chart.live_charts(), 1);
        }
    }

    #[test]
    fn failed_fetch_ends_in_error_without_a_live_chart() {
        let mut chart = chart();
        let mut toasts = toasts();
        let id = RecordId::Int(1);
        let token = token_of(chart.load(Some(&id), RangeDays::Month));
        chart.resolve(token, Ok(series(None)), &mut toasts);
        let token = token_of(chart.load(Some(&id), RangeDays::Week));
        chart.resolve(
            token,
            Err(GatewayError::Transport("connection refused".into())),
            &mut toasts,
        );
        assert_eq!(chart.visibility().state(), ChartState::Error);
        assert!(!chart.visibility().message().is_empty());
        assert!(chart.visibility().chart().is_none());
        assert_eq!(chart.live_charts(), 0);
        assert_eq!(toasts.len(), 1);
    }

    #[test]
    fn superseded_reply_is_discarded() {
        let mut chart = chart();
        let mut toasts = toasts();
        let first = token_of(chart.load(Some(&RecordId::Int(1)), RangeDays::Month));
        let second = token_of(chart.load(Some(&RecordId::Int(2)), RangeDays::Month));
        assert_eq!(
            chart.resolve(second, Ok(series(Some("#00ff00"))), &mut toasts),
            Resolution::Applied
        );
        assert_eq!(
            chart.resolve(first, Err(GatewayError::Status(500)), &mut toasts),
            Resolution::Stale
        );
        assert_eq!(chart.visibility().state(), ChartState::Ready);
        assert_eq!(toasts.len(), 0);
    }

    #[test]
    fn clear_discards_in_flight_loads() {
        let mut chart = chart();
        let mut toasts = toasts();
        let token = token_of(chart.load(Some(&RecordId::Int(1)), RangeDays::Month));
        chart.clear();
        assert_eq!(
            chart.resolve(token, Ok(series(None)), &mut toasts),
            Resolution::Stale
        );
        assert_eq!(chart.visibility().state(), ChartState::Empty);
        assert_eq!(chart.visibility().message(), EMPTY_MESSAGE);
    }

    #[test]
    fn missing_capability_is_an_error_state() {
        let mut chart = ProgressChart::new(None);
        let mut toasts = toasts();
        let token = token_of(chart.load(Some(&RecordId::Int(1)), RangeDays::Month));
        chart.resolve(token, Ok(series(None)), &mut toasts);
        assert_eq!(chart.visibility().state(), ChartState::Error);
        assert!(chart.visibility().message().contains("Charting is unavailable"));
    }

    #[test]
    fn malformed_series_is_an_error_state() {
        let mut chart = chart();
        let mut toasts = toasts();
        let mut bad = series(None);
        bad.actual.pop();
        let token = token_of(chart.load(Some(&RecordId::Int(1)), RangeDays::Month));
        chart.resolve(token, Ok(bad), &mut toasts);
        assert_eq!(chart.visibility().state(), ChartState::Error);
        assert_eq!(chart.live_charts(), 0);
    }

    #[test]
    fn habit_without_color_uses_teal() {
        let spec = chart_spec(series(None));
        assert_eq!(spec.series[1].color, Rgb::TEAL);
        assert!(spec.series[1].fill && spec.series[1].smooth);
        assert!(!spec.series[0].fill);
    }
}
