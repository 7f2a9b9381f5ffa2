use crate::dispatch::Request;
use crate::gateway::GatewayResult;
use crate::model::IdealSelf;
use crate::toast::Toasts;
use tracing::warn;

/// The "ideal self" record: a form mirror plus a read-only summary.
#[derive(Debug, Default)]
pub struct IdealSelfPanel {
    record: IdealSelf,
    loaded: bool,
}

impl IdealSelfPanel {
    pub fn new() -> Self {
        IdealSelfPanel::default()
    }

    pub fn apply_loaded(&mut self, result: GatewayResult<IdealSelf>, toasts: &mut Toasts) {
        match result {
            Ok(record) => {
                self.record = record;
                self.loaded = true;
            }
            Err(err) => {
                warn!(error = %err, "loading ideal self failed");
                toasts.error("Could not load your ideal self.");
            }
        }
    }

    pub fn save_request(vision: &str, focus_input: &str) -> Request {
        Request::SaveIdealSelf(IdealSelf::from_input(vision, focus_input))
    }

    /// The summary is updated from what was sent, not re-fetched.
    pub fn apply_saved(
        &mut self,
        sent: IdealSelf,
        result: GatewayResult<IdealSelf>,
        toasts: &mut Toasts,
    ) {
        match result {
            Ok(_) => {
                self.record = sent;
                self.loaded = true;
                toasts.success("Ideal self saved.");
            }
            Err(err) => {
                warn!(error = %err, "saving ideal self failed");
                toasts.error("Could not save your ideal self.");
            }
        }
    }

    /// `None` when there is nothing to summarise.
    pub fn summary(&self) -> Option<&IdealSelf> {
        if self.record.is_blank() {
            None
        } else {
            Some(&self.record)
        }
    }

    /// Vision and comma-joined focus areas, for pre-filling the form.
    pub fn form_values(&self) -> (String, String) {
        (self.record.vision.clone(), self.record.focus_areas_text())
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::GatewayError;
    use std::time::Duration;

    #[test]
    fn summary_hidden_when_blank() {
        let mut panel = IdealSelfPanel::new();
        let mut toasts = Toasts::new(Duration::from_secs(5));
        panel.apply_loaded(
            Ok(IdealSelf {
                vision: "   ".into(),
                focus_areas: Vec::new(),
            }),
            &mut toasts,
        );
        assert!(panel.is_loaded());
        assert!(panel.summary().is_none());
    }

    #[test]
    fn save_updates_summary_from_what_was_sent() {
        let mut panel = IdealSelfPanel::new();
        let mut toasts = Toasts::new(Duration::from_secs(5));
        let sent = match IdealSelfPanel::save_request("Be consistent", "health, focus") {
            Request::SaveIdealSelf(record) => record,
            other => panic!("unexpected {:?}", other),
        };
        // the echo is ignored in favour of the sent record
        panel.apply_saved(sent, Ok(IdealSelf::default()), &mut toasts);
        let summary = panel.summary().unwrap();
        assert_eq!(summary.vision, "Be consistent");
        assert_eq!(summary.focus_areas, vec!["health", "focus"]);
        assert_eq!(
            panel.form_values(),
            ("Be consistent".to_string(), "health, focus".to_string())
        );
        assert_eq!(toasts.latest().unwrap().message, "Ideal self saved.");
    }

    #[test]
    fn failed_save_keeps_previous_record() {
        let mut panel = IdealSelfPanel::new();
        let mut toasts = Toasts::new(Duration::from_secs(5));
        panel.apply_saved(
            IdealSelf::from_input("new", ""),
            Err(GatewayError::Status(500)),
            &mut toasts,
        );
        assert!(panel.summary().is_none());
        assert_eq!(toasts.len(), 1);
    }
}
