use crate::model::{
    Habit, HabitId, HabitPatch, IdealSelf, JournalEntry, NewHabit, NewJournalEntry,
    ProgressSeries,
};
use serde::de::DeserializeOwned;
use tracing::debug;

#[derive(thiserror::Error, Debug)]
pub enum GatewayError {
    #[error("could not reach the server: {0}")]
    Transport(String),
    #[error("server responded with status {0}")]
    Status(u16),
    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl From<ureq::Error> for GatewayError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(code, _) => GatewayError::Status(code),
            ureq::Error::Transport(transport) => GatewayError::Transport(transport.to_string()),
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// The remote data gateway. Implementations must be shareable across the
/// dispatcher's worker threads.
pub trait Gateway: Send + Sync {
    fn ideal_self(&self) -> GatewayResult<IdealSelf>;
    fn save_ideal_self(&self, record: &IdealSelf) -> GatewayResult<IdealSelf>;
    fn journal(&self) -> GatewayResult<Vec<JournalEntry>>;
    fn add_journal_entry(&self, content: &str) -> GatewayResult<JournalEntry>;
    fn habits(&self) -> GatewayResult<Vec<Habit>>;
    fn create_habit(&self, habit: &NewHabit) -> GatewayResult<Habit>;
    fn update_habit(&self, id: &HabitId, patch: &HabitPatch) -> GatewayResult<Habit>;
    fn progress(&self, id: &HabitId, days: u32) -> GatewayResult<ProgressSeries>;
    fn seed_demo(&self) -> GatewayResult<()>;
    fn timeline(&self) -> GatewayResult<String>;
}

pub struct HttpGateway {
    agent: ureq::Agent,
    base_url: String,
}

impl HttpGateway {
    pub fn new(base_url: &str) -> Self {
        HttpGateway {
            agent: ureq::AgentBuilder::new().build(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> GatewayResult<T> {
        debug!(path, "GET");
        let resp = self.agent.get(&self.url(path)).call()?;
        decode(resp)
    }

    fn send_json<B, T>(&self, method: &str, path: &str, body: &B) -> GatewayResult<T>
    where
        B: serde::Serialize,
        T: DeserializeOwned,
    {
        debug!(method, path, "sending");
        let resp = self
            .agent
            .request(method, &self.url(path))
            .send_json(body)?;
        decode(resp)
    }
}

/// Ids are opaque, so text ids are escaped into a single path segment.
fn habit_path(id: &HabitId) -> String {
    format!("/api/habits/{}", urlencoding::encode(&id.to_string()))
}

fn decode<T: DeserializeOwned>(resp: ureq::Response) -> GatewayResult<T> {
    resp.into_json::<T>()
        .map_err(|err| GatewayError::Decode(err.to_string()))
}

impl Gateway for HttpGateway {
    fn ideal_self(&self) -> GatewayResult<IdealSelf> {
        self.get_json("/api/idealself")
    }

    fn save_ideal_self(&self, record: &IdealSelf) -> GatewayResult<IdealSelf> {
        self.send_json("POST", "/api/idealself", record)
    }

    fn journal(&self) -> GatewayResult<Vec<JournalEntry>> {
        self.get_json("/api/journal")
    }

    fn add_journal_entry(&self, content: &str) -> GatewayResult<JournalEntry> {
        self.send_json("POST", "/api/journal", &NewJournalEntry { content })
    }

    fn habits(&self) -> GatewayResult<Vec<Habit>> {
        self.get_json("/api/habits")
    }

    fn create_habit(&self, habit: &NewHabit) -> GatewayResult<Habit> {
        self.send_json("POST", "/api/habits", habit)
    }

    fn update_habit(&self, id: &HabitId, patch: &HabitPatch) -> GatewayResult<Habit> {
        self.send_json("PUT", &habit_path(id), patch)
    }

    fn progress(&self, id: &HabitId, days: u32) -> GatewayResult<ProgressSeries> {
        self.get_json(&format!("{}/progress?days={}", habit_path(id), days))
    }

    fn seed_demo(&self) -> GatewayResult<()> {
        debug!("seeding demo data");
        self.agent.post(&self.url("/api/demo/reset")).call()?;
        Ok(())
    }

    fn timeline(&self) -> GatewayResult<String> {
        let resp = self.agent.get(&self.url("/api/timeline")).call()?;
        resp.into_string()
            .map_err(|err| GatewayError::Decode(err.to_string()))
    }
}
