use crate::gateway::{Gateway, GatewayError, GatewayResult};
use crate::model::{Habit, HabitId, HabitPatch, IdealSelf, JournalEntry, NewHabit, ProgressSeries};
use crate::selection::RangeDays;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    LoadIdealSelf,
    SaveIdealSelf(IdealSelf),
    LoadJournal,
    AddJournalEntry(String),
    LoadHabits { seed_if_empty: bool },
    CreateHabit(NewHabit),
    UpdateHabit { id: HabitId, patch: HabitPatch },
    LoadProgress { token: u64, id: HabitId, range: RangeDays },
    LoadTimeline,
}

#[derive(Debug)]
pub enum Reply {
    IdealSelf(GatewayResult<IdealSelf>),
    IdealSelfSaved {
        sent: IdealSelf,
        result: GatewayResult<IdealSelf>,
    },
    Journal(GatewayResult<Vec<JournalEntry>>),
    JournalEntryAdded(GatewayResult<JournalEntry>),
    Habits(GatewayResult<Vec<Habit>>),
    HabitCreated(GatewayResult<Habit>),
    HabitUpdated(GatewayResult<Habit>),
    Progress {
        token: u64,
        result: GatewayResult<ProgressSeries>,
    },
    Timeline(GatewayResult<String>),
}

/// Performs one request against the gateway and packages the outcome.
pub fn execute(gateway: &dyn Gateway, request: Request) -> Reply {
    match request {
        Request::LoadIdealSelf => Reply::IdealSelf(gateway.ideal_self()),
        Request::SaveIdealSelf(record) => {
            let result = gateway.save_ideal_self(&record);
            Reply::IdealSelfSaved {
                sent: record,
                result,
            }
        }
        Request::LoadJournal => Reply::Journal(gateway.journal()),
        Request::AddJournalEntry(content) => {
            Reply::JournalEntryAdded(gateway.add_journal_entry(&content))
        }
        Request::LoadHabits { seed_if_empty } => {
            Reply::Habits(load_habits(gateway, seed_if_empty))
        }
        Request::CreateHabit(habit) => Reply::HabitCreated(gateway.create_habit(&habit)),
        Request::UpdateHabit { id, patch } => {
            Reply::HabitUpdated(gateway.update_habit(&id, &patch))
        }
        Request::LoadProgress { token, id, range } => Reply::Progress {
            token,
            result: gateway.progress(&id, range.days()),
        },
        Request::LoadTimeline => Reply::Timeline(gateway.timeline()),
    }
}

/// Fetches the collection, seeding demo data first if it is empty and
/// seeding was asked for. A failed seed is logged and the (empty) first
/// result stands.
pub fn load_habits(gateway: &dyn Gateway, seed_if_empty: bool) -> GatewayResult<Vec<Habit>> {
    let habits = gateway.habits()?;
    if !habits.is_empty() || !seed_if_empty {
        return Ok(habits);
    }
    match gateway.seed_demo() {
        Ok(()) => gateway.habits(),
        Err(err) => {
            warn!(error = %err, "demo seeding failed");
            Ok(habits)
        }
    }
}

pub struct Dispatcher {
    gateway: Arc<dyn Gateway>,
    replies: Sender<Reply>,
}

impl Dispatcher {
    pub fn new(gateway: Arc<dyn Gateway>) -> (Self, Receiver<Reply>) {
        let (tx, rx) = mpsc::channel();
        (
            Dispatcher {
                gateway,
                replies: tx,
            },
            rx,
        )
    }

    pub fn submit(&self, request: Request) {
        debug!(%request, "dispatching");
        let gateway = Arc::clone(&self.gateway);
        let replies = self.replies.clone();
        thread::spawn(move || {
            let reply = execute(gateway.as_ref(), request);
            if replies.send(reply).is_err() {
                debug!("reply dropped, receiver gone");
            }
        });
    }
}

impl std::fmt::Display for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Request::LoadIdealSelf => f.write_str("load ideal self"),
            Request::SaveIdealSelf(_) => f.write_str("save ideal self"),
            Request::LoadJournal => f.write_str("load journal"),
            Request::AddJournalEntry(_) => f.write_str("add journal entry"),
            Request::LoadHabits { .. } => f.write_str("load habits"),
            Request::CreateHabit(h) => write!(f, "create habit {}", h.name),
            Request::UpdateHabit { id, .. } => write!(f, "update habit {}", id),
            Request::LoadProgress { id, range, .. } => {
                write!(f, "load progress {} ({})", id, range.label())
            }
            Request::LoadTimeline => f.write_str("load timeline"),
        }
    }
}

impl Reply {
    pub fn error(&self) -> Option<&GatewayError> {
        match self {
            Reply::IdealSelf(r) => r.as_ref().err(),
            Reply::IdealSelfSaved { result, .. } => result.as_ref().err(),
            Reply::Journal(r) => r.as_ref().err(),
            Reply::JournalEntryAdded(r) => r.as_ref().err(),
            Reply::Habits(r) => r.as_ref().err(),
            Reply::HabitCreated(r) => r.as_ref().err(),
            Reply::HabitUpdated(r) => r.as_ref().err(),
            Reply::Progress { result, .. } => result.as_ref().err(),
            Reply::Timeline(r) => r.as_ref().err(),
        }
    }
}
