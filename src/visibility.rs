use crate::chart::ChartInstance;
use tracing::debug;

pub const EMPTY_MESSAGE: &str = "Add a habit to see its ideal vs actual progress.";
pub const LOADING_MESSAGE: &str = "Loading progress…";
pub const ERROR_MESSAGE: &str = "Could not load progress.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartState {
    Empty,
    Loading,
    Ready,
    Error,
}

impl ChartState {
    fn default_message(self) -> &'static str {
        match self {
            ChartState::Empty => EMPTY_MESSAGE,
            ChartState::Loading => LOADING_MESSAGE,
            ChartState::Ready => "",
            ChartState::Error => ERROR_MESSAGE,
        }
    }
}

/// One of the two things the chart area can show. An inert surface is
/// skipped by focus and by the accessible text dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Surface {
    pub shown: bool,
    pub inert: bool,
}

impl Surface {
    const SHOWN: Surface = Surface {
        shown: true,
        inert: false,
    };
    const HIDDEN: Surface = Surface {
        shown: false,
        inert: true,
    };
}

/// Owns the chart area: which surface is visible, the placeholder text and
/// the single live chart instance.
#[derive(Debug)]
pub struct VisibilityController {
    state: ChartState,
    message: String,
    chart_surface: Surface,
    placeholder: Surface,
    chart: Option<ChartInstance>,
}

impl VisibilityController {
    pub fn new() -> Self {
        VisibilityController {
            state: ChartState::Empty,
            message: EMPTY_MESSAGE.to_string(),
            chart_surface: Surface::HIDDEN,
            placeholder: Surface::SHOWN,
            chart: None,
        }
    }

    pub fn set_state(&mut self, state: ChartState, message: Option<&str>) {
        if state != self.state {
            debug!(from = ?self.state, to = ?state, "chart visibility");
        }
        self.state = state;
        if state == ChartState::Ready {
            self.chart_surface = Surface::SHOWN;
            self.placeholder = Surface::HIDDEN;
            return;
        }
        self.message = message.unwrap_or(state.default_message()).to_string();
        self.placeholder = Surface::SHOWN;
        self.chart_surface = Surface::HIDDEN;
        if matches!(state, ChartState::Empty | ChartState::Error) {
            self.destroy_chart();
        }
    }

    /// Installs a freshly built chart, releasing any previous one first.
    pub fn install(&mut self, chart: ChartInstance) {
        self.destroy_chart();
        self.chart = Some(chart);
    }

    pub fn destroy_chart(&mut self) {
        if self.chart.take().is_some() {
            debug!("chart instance released");
        }
    }

    pub fn state(&self) -> ChartState {
        self.state
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn chart_surface(&self) -> Surface {
        self.chart_surface
    }

    pub fn placeholder(&self) -> Surface {
        self.placeholder
    }

    pub fn chart(&self) -> Option<&ChartInstance> {
        self.chart.as_ref()
    }
}

impl Default for VisibilityController {
    fn default() -> Self {
        VisibilityController::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{ChartBackend, ChartSpec, PlotBackend};

    const ALL: [ChartState; 4] = [
        ChartState::Empty,
        ChartState::Loading,
        ChartState::Ready,
        ChartState::Error,
    ];

    fn chart(backend: &PlotBackend) -> ChartInstance {
        backend
            .create(ChartSpec {
                title: "t".into(),
                labels: vec!["a".into(), "b".into()],
                series: Vec::new(),
            })
            .unwrap()
    }

    #[test]
    fn exactly_one_surface_is_shown_for_every_transition() {
        let mut vis = VisibilityController::new();
        for from in ALL {
            for to in ALL {
                vis.set_state(from, None);
                vis.set_state(to, None);
                assert_ne!(vis.chart_surface().shown, vis.placeholder().shown);
                assert_eq!(vis.chart_surface().shown, to == ChartState::Ready);
                assert_eq!(vis.chart_surface().inert, !vis.chart_surface().shown);
                assert_eq!(vis.placeholder().inert, !vis.placeholder().shown);
            }
        }
    }

    #[test]
    fn setting_the_same_state_twice_is_idempotent() {
        for state in ALL {
            let mut once = VisibilityController::new();
            once.set_state(state, Some("hello"));
            let mut twice = VisibilityController::new();
            twice.set_state(state, Some("hello"));
            twice.set_state(state, Some("hello"));
            assert_eq!(once.state(), twice.state());
            assert_eq!(once.message(), twice.message());
            assert_eq!(once.chart_surface(), twice.chart_surface());
            assert_eq!(once.placeholder(), twice.placeholder());
        }
    }

    #[test]
    fn empty_and_error_release_the_chart() {
        let backend = PlotBackend::new();
        for state in [ChartState::Empty, ChartState::Error] {
            let mut vis = VisibilityController::new();
            vis.install(chart(&backend));
            vis.set_state(ChartState::Ready, None);
            assert_eq!(backend.live_instances(), 1);
            vis.set_state(state, Some("gone"));
            assert!(vis.chart().is_none());
            assert_eq!(backend.live_instances(), 0);
            assert_eq!(vis.message(), "gone");
        }
    }

    #[test]
    fn loading_keeps_the_chart_but_hides_it() {
        let backend = PlotBackend::new();
        let mut vis = VisibilityController::new();
        vis.install(chart(&backend));
        vis.set_state(ChartState::Ready, None);
        vis.set_state(ChartState::Loading, None);
        assert!(vis.chart().is_some());
        assert!(!vis.chart_surface().shown);
        assert_eq!(vis.message(), LOADING_MESSAGE);
    }

    #[test]
    fn install_replaces_the_previous_instance() {
        let backend = PlotBackend::new();
        let mut vis = VisibilityController::new();
        vis.install(chart(&backend));
        vis.install(chart(&backend));
        assert_eq!(backend.live_instances(), 1);
    }

    #[test]
    fn starts_empty_with_the_empty_message() {
        let vis = VisibilityController::new();
        assert_eq!(vis.state(), ChartState::Empty);
        assert_eq!(vis.message(), EMPTY_MESSAGE);
        assert!(vis.placeholder().shown);
    }
}
