use crate::model::{Habit, HabitId, DEFAULT_HABIT_COLOR, DEFAULT_TARGET_PER_WEEK};
use crate::selection::Selection;

pub const EMPTY_SELECTOR_LABEL: &str = "No habits yet";

#[derive(Debug, Clone, PartialEq)]
pub struct HabitDisplay {
    pub id: HabitId,
    pub name: String,
    pub color: String,
    pub completed: bool,
    pub target_per_week: i64,
    pub streak: i64,
    pub best_streak: i64,
    pub score: f64,
    pub score_label: String,
    pub target_label: String,
    pub streak_label: String,
    pub badge: &'static str,
    /// Percent of the bar, already clamped to 0..=100.
    pub ideal_bar: f64,
    pub actual_bar: f64,
}

pub fn derive(habit: &Habit) -> HabitDisplay {
    let target = habit
        .target_per_week
        .filter(|t| *t > 0)
        .unwrap_or(DEFAULT_TARGET_PER_WEEK);
    let streak = habit.streak.filter(|s| *s >= 0).unwrap_or(0);
    let best_streak = habit.best_streak.filter(|s| *s >= 0).unwrap_or(0);
    let score = habit.score.filter(|s| s.is_finite()).unwrap_or(0.0);
    let color = habit
        .color
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(DEFAULT_HABIT_COLOR)
        .to_string();

    HabitDisplay {
        id: habit.id.clone(),
        name: habit.name.clone(),
        color,
        completed: habit.completed,
        target_per_week: target,
        streak,
        best_streak,
        score,
        score_label: format!("{:.1}%", score),
        target_label: format!("{}/week", target),
        streak_label: format!("Streak: {} (best {})", streak, best_streak),
        badge: if habit.completed {
            "done today"
        } else {
            "not yet"
        },
        ideal_bar: clamp_percent(target as f64 / 7.0 * 100.0),
        actual_bar: clamp_percent(score),
    }
}

fn clamp_percent(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// Decides which habit is current after a fetch: none for an empty
/// collection, the existing one if it survived, else the first habit.
pub fn reconcile(current: Option<&HabitId>, habits: &[Habit]) -> Option<HabitId> {
    let first = habits.first()?;
    match current {
        Some(id) if habits.iter().any(|h| &h.id == id) => Some(id.clone()),
        _ => Some(first.id.clone()),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectorOption {
    pub value: Option<HabitId>,
    pub label: String,
    pub disabled: bool,
}

/// Single-choice control with one option per habit, or a lone disabled
/// placeholder when there are none.
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    options: Vec<SelectorOption>,
    selected: usize,
}

impl Selector {
    fn placeholder() -> Self {
        Selector {
            options: vec![SelectorOption {
                value: None,
                label: EMPTY_SELECTOR_LABEL.to_string(),
                disabled: true,
            }],
            selected: 0,
        }
    }

    fn rebuild(habits: &[Habit], current: Option<&HabitId>) -> Self {
        if habits.is_empty() {
            return Selector::placeholder();
        }
        let options: Vec<SelectorOption> = habits
            .iter()
            .map(|h| SelectorOption {
                value: Some(h.id.clone()),
                label: h.name.clone(),
                disabled: false,
            })
            .collect();
        let selected = current
            .and_then(|id| options.iter().position(|o| o.value.as_ref() == Some(id)))
            .unwrap_or(0);
        Selector { options, selected }
    }

    pub fn options(&self) -> &[SelectorOption] {
        &self.options
    }

    pub fn selected(&self) -> Option<&SelectorOption> {
        self.options.get(self.selected)
    }

    pub fn selected_label(&self) -> &str {
        self.selected().map(|o| o.label.as_str()).unwrap_or_default()
    }

    pub fn is_enabled(&self) -> bool {
        self.options.iter().any(|o| !o.disabled)
    }

    fn show(&mut self, id: &HabitId) {
        if let Some(idx) = self
            .options
            .iter()
            .position(|o| o.value.as_ref() == Some(id))
        {
            self.selected = idx;
        }
    }

    /// The option `step` places away from the selected one, wrapping.
    fn neighbour(&self, step: isize) -> Option<HabitId> {
        if !self.is_enabled() {
            return None;
        }
        let len = self.options.len() as isize;
        let idx = (self.selected as isize + step).rem_euclid(len) as usize;
        self.options[idx].value.clone()
    }
}

impl Default for Selector {
    fn default() -> Self {
        Selector::placeholder()
    }
}

/// Outcome of applying a freshly fetched collection.
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciled {
    Empty,
    Current(HabitId),
}

#[derive(Debug, Default)]
pub struct HabitList {
    habits: Vec<Habit>,
    rows: Vec<HabitDisplay>,
    selector: Selector,
    cursor: usize,
}

impl HabitList {
    pub fn new() -> Self {
        HabitList::default()
    }

    /// Replaces the collection with the server's, re-derives every row,
    /// reconciles the shared current-habit id and rebuilds the selector.
    pub fn apply(&mut self, habits: Vec<Habit>, selection: &mut Selection) -> Reconciled {
        let current = reconcile(selection.current_habit(), &habits);
        selection.set_current_habit(current.clone());
        self.rows = habits.iter().map(derive).collect();
        self.selector = Selector::rebuild(&habits, current.as_ref());
        self.habits = habits;
        self.cursor = self.cursor.min(self.rows.len().saturating_sub(1));
        match current {
            Some(id) => Reconciled::Current(id),
            None => Reconciled::Empty,
        }
    }

    /// Points the selector at `id` after an explicit choice elsewhere.
    pub fn show_selected(&mut self, id: &HabitId) {
        self.selector.show(id);
    }

    pub fn selector_step(&self, step: isize) -> Option<HabitId> {
        self.selector.neighbour(step)
    }

    pub fn contains(&self, id: &HabitId) -> bool {
        self.habits.iter().any(|h| &h.id == id)
    }

    pub fn get(&self, id: &HabitId) -> Option<&Habit> {
        self.habits.iter().find(|h| &h.id == id)
    }

    pub fn rows(&self) -> &[HabitDisplay] {
        &self.rows
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    pub fn is_empty(&self) -> bool {
        self.habits.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn cursor_row(&self) -> Option<&HabitDisplay> {
        self.rows.get(self.cursor)
    }

    pub fn cursor_up(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_down(&mut self) {
        if self.cursor + 1 < self.rows.len() {
            self.cursor += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RecordId;
    use crate::selection::RangeDays;

    fn habit(id: i64, name: &str) -> Habit {
        Habit {
            id: RecordId::Int(id),
            name: name.to_string(),
            color: None,
            target_per_week: None,
            completed: false,
            streak: None,
            best_streak: None,
            score: None,
            completed_days: None,
            created_at: None,
            last_completed: None,
        }
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let row = derive(&habit(1, "Read"));
        assert_eq!(row.target_label, "7/week");
        assert_eq!(row.streak_label, "Streak: 0 (best 0)");
        assert_eq!(row.score_label, "0.0%");
        assert_eq!(row.color, DEFAULT_HABIT_COLOR);
        assert_eq!(row.ideal_bar, 100.0);
    }

    #[test]
    fn invalid_aggregates_fall_back_too() {
        let mut h = habit(1, "Read");
        h.target_per_week = Some(0);
        h.streak = Some(-3);
        h.best_streak = Some(-1);
        h.score = Some(f64::NAN);
        let row = derive(&h);
        assert_eq!(row.target_per_week, 7);
        assert_eq!(row.streak_label, "Streak: 0 (best 0)");
        assert_eq!(row.actual_bar, 0.0);
    }

    #[test]
    fn bars_are_clamped() {
        let mut h = habit(1, "Run");
        h.score = Some(150.0);
        assert_eq!(derive(&h).actual_bar, 100.0);
        h.score = Some(-5.0);
        assert_eq!(derive(&h).actual_bar, 0.0);
        h.target_per_week = Some(14);
        assert_eq!(derive(&h).ideal_bar, 100.0);
    }

    #[test]
    fn score_is_rounded_to_one_decimal() {
        let mut h = habit(1, "Run");
        h.score = Some(42.857);
        h.target_per_week = Some(5);
        h.streak = Some(3);
        h.best_streak = Some(8);
        let row = derive(&h);
        assert_eq!(row.score_label, "42.9%");
        assert_eq!(row.target_label, "5/week");
        assert_eq!(row.streak_label, "Streak: 3 (best 8)");
        assert!((row.ideal_bar - 500.0 / 7.0).abs() < 1e-9);
    }

    #[test]
    fn empty_collection_clears_current_and_shows_placeholder() {
        let mut selection = Selection::new(RangeDays::Month);
        selection.set_current_habit(Some(RecordId::Int(9)));
        let mut list = HabitList::new();
        assert_eq!(list.apply(Vec::new(), &mut selection), Reconciled::Empty);
        assert!(selection.current_habit().is_none());
        let options = list.selector().options();
        assert_eq!(options.len(), 1);
        assert!(options[0].disabled);
        assert_eq!(options[0].label, EMPTY_SELECTOR_LABEL);
        assert!(list.selector_step(1).is_none());
    }

    #[test]
    fn surviving_current_habit_is_kept() {
        let mut selection = Selection::new(RangeDays::Month);
        selection.set_current_habit(Some(RecordId::Int(2)));
        let mut list = HabitList::new();
        let outcome = list.apply(vec![habit(1, "A"), habit(2, "B")], &mut selection);
        assert_eq!(outcome, Reconciled::Current(RecordId::Int(2)));
        assert_eq!(list.selector().selected_label(), "B");
    }

    #[test]
    fn vanished_current_habit_falls_back_to_first() {
        let mut selection = Selection::new(RangeDays::Month);
        selection.set_current_habit(Some(RecordId::Int(7)));
        let mut list = HabitList::new();
        let outcome = list.apply(vec![habit(3, "C"), habit(1, "A")], &mut selection);
        assert_eq!(outcome, Reconciled::Current(RecordId::Int(3)));
        assert_eq!(selection.current_habit(), Some(&RecordId::Int(3)));
        assert_eq!(list.selector().selected_label(), "C");
    }

    #[test]
    fn current_is_always_a_member_of_the_collection() {
        let collections: Vec<Vec<Habit>> = vec![
            vec![],
            vec![habit(1, "A")],
            vec![habit(2, "B"), habit(3, "C")],
            vec![habit(3, "C")],
            vec![],
            vec![habit(4, "D"), habit(1, "A")],
        ];
        let mut selection = Selection::new(RangeDays::Month);
        let mut list = HabitList::new();
        for habits in collections {
            let expect_empty = habits.is_empty();
            list.apply(habits, &mut selection);
            match selection.current_habit() {
                None => assert!(expect_empty),
                Some(id) => assert!(list.contains(id)),
            }
        }
    }

    #[test]
    fn selector_steps_wrap_around() {
        let mut selection = Selection::new(RangeDays::Month);
        let mut list = HabitList::new();
        list.apply(vec![habit(1, "A"), habit(2, "B"), habit(3, "C")], &mut selection);
        assert_eq!(list.selector_step(1), Some(RecordId::Int(2)));
        assert_eq!(list.selector_step(-1), Some(RecordId::Int(3)));
        list.show_selected(&RecordId::Int(3));
        assert_eq!(list.selector_step(1), Some(RecordId::Int(1)));
    }

    #[test]
    fn cursor_stays_in_bounds_after_shrinking() {
        let mut selection = Selection::new(RangeDays::Month);
        let mut list = HabitList::new();
        list.apply(vec![habit(1, "A"), habit(2, "B"), habit(3, "C")], &mut selection);
        list.cursor_down();
        list.cursor_down();
        list.cursor_down();
        assert_eq!(list.cursor(), 2);
        list.apply(vec![habit(1, "A")], &mut selection);
        assert_eq!(list.cursor(), 0);
        assert_eq!(list.cursor_row().map(|r| r.name.as_str()), Some("A"));
    }
}
