use crate::model::HabitId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RangeDays {
    Week,
    Fortnight,
    #[default]
    Month,
    Quarter,
}

impl RangeDays {
    pub const ALL: [RangeDays; 4] = [
        RangeDays::Week,
        RangeDays::Fortnight,
        RangeDays::Month,
        RangeDays::Quarter,
    ];

    pub fn days(self) -> u32 {
        match self {
            RangeDays::Week => 7,
            RangeDays::Fortnight => 14,
            RangeDays::Month => 30,
            RangeDays::Quarter => 90,
        }
    }

    pub fn from_days(days: u32) -> Option<RangeDays> {
        RangeDays::ALL.into_iter().find(|r| r.days() == days)
    }

    pub fn label(self) -> String {
        format!("{}d", self.days())
    }

    pub fn index(self) -> usize {
        RangeDays::ALL
            .iter()
            .position(|r| *r == self)
            .unwrap_or_default()
    }

    pub fn next(self) -> RangeDays {
        RangeDays::ALL[(self.index() + 1) % RangeDays::ALL.len()]
    }

    pub fn prev(self) -> RangeDays {
        let len = RangeDays::ALL.len();
        RangeDays::ALL[(self.index() + len - 1) % len]
    }
}

/// The shared UI selection: which habit the chart and range control apply
/// to, and which range is active. Owned by the session, which is the only
/// writer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    current_habit: Option<HabitId>,
    range: RangeDays,
}

impl Selection {
    pub fn new(range: RangeDays) -> Self {
        Selection {
            current_habit: None,
            range,
        }
    }

    pub fn current_habit(&self) -> Option<&HabitId> {
        self.current_habit.as_ref()
    }

    pub fn range(&self) -> RangeDays {
        self.range
    }

    /// Returns true when the current habit actually changed.
    pub fn set_current_habit(&mut self, habit: Option<HabitId>) -> bool {
        if self.current_habit == habit {
            return false;
        }
        self.current_habit = habit;
        true
    }

    pub fn set_range(&mut self, range: RangeDays) -> bool {
        if self.range == range {
            return false;
        }
        self.range = range;
        true
    }

    /// The range control only applies while a habit is selected.
    pub fn range_enabled(&self) -> bool {
        self.current_habit.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RecordId;

    #[test]
    fn ranges_cycle_through_the_enumerated_set() {
        assert_eq!(RangeDays::default().days(), 30);
        assert_eq!(RangeDays::Quarter.next(), RangeDays::Week);
        assert_eq!(RangeDays::Week.prev(), RangeDays::Quarter);
        assert_eq!(RangeDays::from_days(14), Some(RangeDays::Fortnight));
        assert_eq!(RangeDays::from_days(31), None);
        assert_eq!(RangeDays::Month.label(), "30d");
    }

    #[test]
    fn range_control_follows_current_habit() {
        let mut selection = Selection::new(RangeDays::Month);
        assert!(!selection.range_enabled());
        assert!(selection.set_current_habit(Some(RecordId::Int(1))));
        assert!(!selection.set_current_habit(Some(RecordId::Int(1))));
        assert!(selection.range_enabled());
        assert!(selection.set_current_habit(None));
        assert!(!selection.range_enabled());
    }
}
