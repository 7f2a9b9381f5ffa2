use crate::chart::{ChartBackend, Rgb};
use crate::dispatch::{Reply, Request};
use crate::habits::{HabitList, Reconciled};
use crate::ideal_self::IdealSelfPanel;
use crate::journal::{validate_draft, JournalPanel};
use crate::model::{HabitId, HabitPatch, NewHabit, DEFAULT_HABIT_COLOR};
use crate::progress::ProgressChart;
use crate::selection::{RangeDays, Selection};
use crate::toast::Toasts;
use std::time::{Duration, Instant};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Send(Request),
    ClearJournalInput,
}

/// Input rejected before anything is sent.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("habit name is required")]
    MissingName,
    #[error("target must be a whole number from 1 to 7")]
    TargetOutOfRange,
    #[error("color must look like #2f7cff")]
    BadColor,
    #[error("journal entry is empty")]
    EmptyJournal,
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub range: RangeDays,
    pub seed_demo: bool,
    pub toast_ttl: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        SessionOptions {
            range: RangeDays::default(),
            seed_demo: true,
            toast_ttl: Duration::from_secs(4),
        }
    }
}

pub struct Session {
    selection: Selection,
    habits: HabitList,
    chart: ProgressChart,
    journal: JournalPanel,
    ideal: IdealSelfPanel,
    toasts: Toasts,
    timeline: Option<String>,
    seed_demo: bool,
    in_flight: usize,
}

impl Session {
    pub fn new(options: SessionOptions, backend: Option<Box<dyn ChartBackend>>) -> Self {
        Session {
            selection: Selection::new(options.range),
            habits: HabitList::new(),
            chart: ProgressChart::new(backend),
            journal: JournalPanel::new(),
            ideal: IdealSelfPanel::new(),
            toasts: Toasts::new(options.toast_ttl),
            timeline: None,
            seed_demo: options.seed_demo,
            in_flight: 0,
        }
    }

    /// Initial loads, issued together.
    pub fn bootstrap(&mut self) -> Vec<Effect> {
        info!(seed_demo = self.seed_demo, "bootstrapping session");
        vec![
            self.send(Request::LoadIdealSelf),
            self.send(Request::LoadHabits {
                seed_if_empty: self.seed_demo,
            }),
            self.send(Request::LoadJournal),
        ]
    }

    pub fn refresh(&mut self) -> Vec<Effect> {
        vec![
            self.send(Request::LoadIdealSelf),
            self.send(Request::LoadHabits {
                seed_if_empty: false,
            }),
            self.send(Request::LoadJournal),
        ]
    }

    pub fn handle(&mut self, reply: Reply) -> Vec<Effect> {
        self.in_flight = self.in_flight.saturating_sub(1);
        if let Some(err) = reply.error() {
            warn!(error = %err, "request failed");
        }
        match reply {
            Reply::Habits(Ok(habits)) => self.apply_habits(habits),
            Reply::Habits(Err(_)) => {
                self.toasts.error("Could not load habits.");
                Vec::new()
            }
            Reply::HabitCreated(Ok(habit)) => {
                self.toasts.success(format!("Added habit {}.", habit.name));
                vec![self.reload_habits()]
            }
            Reply::HabitCreated(Err(_)) => {
                self.toasts.error("Could not add the habit.");
                Vec::new()
            }
            Reply::HabitUpdated(Ok(_)) => vec![self.reload_habits()],
            Reply::HabitUpdated(Err(_)) => {
                self.toasts.error("Could not update the habit.");
                Vec::new()
            }
            Reply::Progress { token, result } => {
                self.chart.resolve(token, result, &mut self.toasts);
                Vec::new()
            }
            Reply::IdealSelf(result) => {
                self.ideal.apply_loaded(result, &mut self.toasts);
                Vec::new()
            }
            Reply::IdealSelfSaved { sent, result } => {
                self.ideal.apply_saved(sent, result, &mut self.toasts);
                Vec::new()
            }
            Reply::Journal(result) => {
                self.journal.apply_loaded(result, &mut self.toasts);
                Vec::new()
            }
            Reply::JournalEntryAdded(result) => {
                match self.journal.apply_added(result, &mut self.toasts) {
                    Some(reload) => vec![Effect::ClearJournalInput, self.send(reload)],
                    None => Vec::new(),
                }
            }
            Reply::Timeline(Ok(text)) => {
                self.timeline = Some(text);
                Vec::new()
            }
            Reply::Timeline(Err(_)) => {
                self.toasts.error("Could not load the timeline.");
                Vec::new()
            }
        }
    }

    fn apply_habits(&mut self, habits: Vec<crate::model::Habit>) -> Vec<Effect> {
        match self.habits.apply(habits, &mut self.selection) {
            Reconciled::Empty => {
                self.chart.clear();
                Vec::new()
            }
            Reconciled::Current(id) => self.load_chart(&id),
        }
    }

    fn load_chart(&mut self, id: &HabitId) -> Vec<Effect> {
        match self.chart.load(Some(id), self.selection.range()) {
            Some(request) => vec![self.send(request)],
            None => Vec::new(),
        }
    }

    fn reload_habits(&mut self) -> Effect {
        self.send(Request::LoadHabits {
            seed_if_empty: false,
        })
    }

    fn send(&mut self, request: Request) -> Effect {
        self.in_flight += 1;
        Effect::Send(request)
    }

    /// Explicit "view progress" on a habit. Always reloads, even when the
    /// habit is already current.
    pub fn view_progress(&mut self, id: &HabitId) -> Vec<Effect> {
        if !self.habits.contains(id) {
            return Vec::new();
        }
        self.selection.set_current_habit(Some(id.clone()));
        self.habits.show_selected(id);
        self.load_chart(id)
    }

    /// Moves the selector by `step` options. Nothing happens when the
    /// selection lands on the habit that is already current.
    pub fn step_selector(&mut self, step: isize) -> Vec<Effect> {
        let Some(id) = self.habits.selector_step(step) else {
            return Vec::new();
        };
        if self.selection.current_habit() == Some(&id) {
            return Vec::new();
        }
        self.view_progress(&id)
    }

    pub fn set_range(&mut self, range: RangeDays) -> Vec<Effect> {
        if !self.selection.range_enabled() {
            self.toasts.info("Select a habit to change the range.");
            return Vec::new();
        }
        if !self.selection.set_range(range) {
            return Vec::new();
        }
        match self.selection.current_habit().cloned() {
            Some(id) => self.load_chart(&id),
            None => Vec::new(),
        }
    }

    pub fn toggle_completion(&mut self, id: &HabitId) -> Vec<Effect> {
        let Some(habit) = self.habits.get(id) else {
            return Vec::new();
        };
        let request = Request::UpdateHabit {
            id: id.clone(),
            patch: HabitPatch::completion(!habit.completed),
        };
        vec![self.send(request)]
    }

    pub fn add_habit(
        &mut self,
        name: &str,
        color: &str,
        target: &str,
    ) -> Result<Vec<Effect>, FormError> {
        let habit = new_habit(name, color, target)?;
        Ok(vec![self.send(Request::CreateHabit(habit))])
    }

    pub fn submit_journal(&mut self, content: &str) -> Result<Vec<Effect>, FormError> {
        let content = validate_draft(content).ok_or(FormError::EmptyJournal)?;
        Ok(vec![self.send(Request::AddJournalEntry(content))])
    }

    pub fn save_ideal_self(&mut self, vision: &str, focus_input: &str) -> Vec<Effect> {
        vec![self.send(IdealSelfPanel::save_request(vision, focus_input))]
    }

    pub fn load_timeline(&mut self) -> Vec<Effect> {
        vec![self.send(Request::LoadTimeline)]
    }

    pub fn tick(&mut self, now: Instant) {
        self.toasts.prune(now);
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn habits(&self) -> &HabitList {
        &self.habits
    }

    pub fn habits_mut(&mut self) -> &mut HabitList {
        &mut self.habits
    }

    pub fn chart(&self) -> &ProgressChart {
        &self.chart
    }

    pub fn journal(&self) -> &JournalPanel {
        &self.journal
    }

    pub fn journal_mut(&mut self) -> &mut JournalPanel {
        &mut self.journal
    }

    pub fn ideal_self(&self) -> &IdealSelfPanel {
        &self.ideal
    }

    pub fn toasts(&self) -> &Toasts {
        &self.toasts
    }

    pub fn timeline(&self) -> Option<&str> {
        self.timeline.as_deref()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }
}

/// Validates habit form input. Blank color means the default; blank target
/// means every day.
pub fn new_habit(name: &str, color: &str, target: &str) -> Result<NewHabit, FormError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(FormError::MissingName);
    }
    Ok(NewHabit {
        name: name.to_string(),
        color: habit_color(color)?,
        target_per_week: weekly_target(target)?,
    })
}

pub fn habit_color(input: &str) -> Result<String, FormError> {
    match input.trim() {
        "" => Ok(DEFAULT_HABIT_COLOR.to_string()),
        raw => Rgb::from_hex(raw)
            .map(|_| raw.to_lowercase())
            .ok_or(FormError::BadColor),
    }
}

pub fn weekly_target(input: &str) -> Result<u8, FormError> {
    match input.trim() {
        "" => Ok(7),
        raw => raw
            .parse::<u8>()
            .ok()
            .filter(|t| (1..=7).contains(t))
            .ok_or(FormError::TargetOutOfRange),
    }
}
