use crate::config::Config;
use crate::gateway::Gateway;
use crate::habits::derive;
use crate::journal::validate_draft;
use crate::model::{newest_first, HabitId, HabitPatch, IdealSelf};
use crate::selection::RangeDays;
use crate::session::{habit_color, new_habit, weekly_target};
use crate::ui;
use anyhow::{anyhow, bail, Context, Result};
use std::io::Write;

pub fn habits(gateway: &dyn Gateway, out: &mut dyn Write) -> Result<()> {
    let habits = gateway.habits().context("listing habits")?;
    if habits.is_empty() {
        writeln!(out, "(no habits)")?;
    }
    for habit in &habits {
        let row = derive(habit);
        writeln!(
            out,
            "{:>4}  {:<24} {:<10} {:<7} {:<22} score {}",
            row.id, row.name, row.badge, row.target_label, row.streak_label, row.score_label
        )?;
    }
    Ok(())
}

pub fn add_habit(
    gateway: &dyn Gateway,
    out: &mut dyn Write,
    name: String,
    color: Option<String>,
    target: Option<String>,
) -> Result<()> {
    let habit = new_habit(
        &name,
        color.as_deref().unwrap_or_default(),
        target.as_deref().unwrap_or_default(),
    )?;
    let created = gateway
        .create_habit(&habit)
        .with_context(|| format!("creating habit {}", habit.name))?;
    writeln!(out, "Added habit {} ({})", created.name, created.id)?;
    Ok(())
}

pub fn toggle(gateway: &dyn Gateway, out: &mut dyn Write, id: String) -> Result<()> {
    let id = HabitId::from(id.as_str());
    let habits = gateway.habits().context("listing habits")?;
    let habit = habits
        .iter()
        .find(|h| h.id == id)
        .ok_or_else(|| anyhow!("habit {} not found", id))?;
    let completed = !habit.completed;
    gateway
        .update_habit(&id, &HabitPatch::completion(completed))
        .with_context(|| format!("updating habit {}", id))?;
    let state = if completed { "done today" } else { "not done today" };
    writeln!(out, "Marked {} {}", habit.name, state)?;
    Ok(())
}

pub fn edit_habit(
    gateway: &dyn Gateway,
    out: &mut dyn Write,
    id: String,
    color: Option<String>,
    target: Option<String>,
) -> Result<()> {
    let patch = HabitPatch {
        completed: None,
        color: color.as_deref().map(habit_color).transpose()?,
        target_per_week: target.as_deref().map(weekly_target).transpose()?,
    };
    if patch.is_empty() {
        bail!("nothing to change, pass --color or --target");
    }
    let id = HabitId::from(id.as_str());
    let updated = gateway
        .update_habit(&id, &patch)
        .with_context(|| format!("updating habit {}", id))?;
    writeln!(out, "Updated habit {} ({})", updated.name, updated.id)?;
    Ok(())
}

pub fn progress(
    gateway: &dyn Gateway,
    out: &mut dyn Write,
    id: String,
    days: Option<u32>,
) -> Result<()> {
    let range = match days {
        None => RangeDays::default(),
        Some(days) => RangeDays::from_days(days)
            .ok_or_else(|| anyhow!("unsupported range {}, use 7, 14, 30 or 90", days))?,
    };
    let id = HabitId::from(id.as_str());
    let series = gateway
        .progress(&id, range.days())
        .with_context(|| format!("loading progress for habit {}", id))?;
    writeln!(out, "{} over {}", series.habit.name, range.label())?;
    writeln!(out, "{:<12} {:>8} {:>8}", "date", "ideal", "actual")?;
    for ((date, ideal), actual) in series
        .dates
        .iter()
        .zip(&series.ideal)
        .zip(&series.actual)
    {
        writeln!(out, "{:<12} {:>8.2} {:>8.0}", date, ideal, actual)?;
    }
    Ok(())
}

pub fn journal(gateway: &dyn Gateway, out: &mut dyn Write) -> Result<()> {
    let mut entries = gateway.journal().context("loading journal")?;
    entries.sort_by(newest_first);
    if entries.is_empty() {
        writeln!(out, "(no entries)")?;
    }
    for entry in &entries {
        writeln!(out, "{}  {}", entry.display_timestamp(), entry.content)?;
    }
    Ok(())
}

pub fn write(gateway: &dyn Gateway, out: &mut dyn Write, content: String) -> Result<()> {
    let content = validate_draft(&content).ok_or_else(|| anyhow!("journal entry is empty"))?;
    gateway
        .add_journal_entry(&content)
        .context("adding journal entry")?;
    writeln!(out, "Journal entry added")?;
    Ok(())
}

/// Prints the record when no flags are given. Otherwise saves, keeping
/// whichever part was not passed.
pub fn vision(
    gateway: &dyn Gateway,
    out: &mut dyn Write,
    vision: Option<String>,
    focus: Option<String>,
) -> Result<()> {
    let current = gateway.ideal_self().context("loading ideal self")?;
    if vision.is_none() && focus.is_none() {
        print_ideal_self(out, &current)?;
        return Ok(());
    }
    let record = IdealSelf::from_input(
        vision.as_deref().unwrap_or(&current.vision),
        focus.as_deref().unwrap_or(&current.focus_areas_text()),
    );
    gateway
        .save_ideal_self(&record)
        .context("saving ideal self")?;
    writeln!(out, "Ideal self saved")?;
    print_ideal_self(out, &record)?;
    Ok(())
}

pub fn seed(gateway: &dyn Gateway, out: &mut dyn Write) -> Result<()> {
    gateway.seed_demo().context("seeding demo data")?;
    writeln!(out, "Demo data loaded")?;
    Ok(())
}

pub fn timeline(gateway: &dyn Gateway, out: &mut dyn Write) -> Result<()> {
    let text = gateway.timeline().context("loading timeline")?;
    writeln!(out, "{}", text.trim_end())?;
    Ok(())
}

pub fn tui(config: Config) -> Result<()> {
    ui::run(config)
}

fn print_ideal_self(out: &mut dyn Write, record: &IdealSelf) -> Result<()> {
    if record.is_blank() {
        writeln!(out, "(no ideal self yet)")?;
        return Ok(());
    }
    writeln!(out, "Vision: {}", record.vision)?;
    if !record.focus_areas.is_empty() {
        writeln!(out, "Focus:  {}", record.focus_areas_text())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::tests::{demo_habit, FakeGateway};

    fn output(run: impl FnOnce(&mut Vec<u8>) -> Result<()>) -> String {
        let mut buf = Vec::new();
        run(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn habits_lists_derived_rows() {
        let gateway = FakeGateway::default();
        gateway.habits.lock().unwrap().push(demo_habit(1, "Meditate"));
        let text = output(|out| habits(&gateway, out));
        assert!(text.contains("Meditate"));
        assert!(text.contains("5/week"));
        assert!(text.contains("Streak: 1 (best 2)"));
        assert!(text.contains("50.0%"));
    }

    #[test]
    fn add_habit_rejects_bad_target_before_sending() {
        let gateway = FakeGateway::default();
        let mut out = Vec::new();
        let err = add_habit(&gateway, &mut out, "Run".into(), None, Some("9".into()));
        assert!(err.is_err());
        assert!(gateway.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn toggle_unknown_habit_fails() {
        let gateway = FakeGateway::default();
        let mut out = Vec::new();
        let err = toggle(&gateway, &mut out, "42".into()).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn toggle_reports_new_state() {
        let gateway = FakeGateway::default();
        gateway.habits.lock().unwrap().push(demo_habit(1, "Walk"));
        let text = output(|out| toggle(&gateway, out, "1".into()));
        assert_eq!(text.trim(), "Marked Walk done today");
    }

    #[test]
    fn edit_habit_needs_a_change() {
        let gateway = FakeGateway::default();
        let mut out = Vec::new();
        assert!(edit_habit(&gateway, &mut out, "1".into(), None, None).is_err());
    }

    #[test]
    fn progress_rejects_unsupported_range() {
        let gateway = FakeGateway::default();
        let mut out = Vec::new();
        assert!(progress(&gateway, &mut out, "1".into(), Some(45)).is_err());
        let text = output(|out| progress(&gateway, out, "1".into(), Some(14)));
        assert!(text.contains("over 14d"));
        assert_eq!(*gateway.calls.lock().unwrap(), vec!["progress 14"]);
    }

    #[test]
    fn vision_without_flags_only_reads() {
        let gateway = FakeGateway::default();
        let text = output(|out| vision(&gateway, out, None, None));
        assert_eq!(text.trim(), "(no ideal self yet)");
        assert_eq!(*gateway.calls.lock().unwrap(), vec!["ideal_self"]);
    }

    #[test]
    fn vision_saves_parsed_focus_areas() {
        let gateway = FakeGateway::default();
        let text = output(|out| {
            vision(
                &gateway,
                out,
                Some("Be consistent".into()),
                Some("health, , focus".into()),
            )
        });
        assert!(text.contains("Focus:  health, focus"));
    }

    #[test]
    fn blank_journal_entry_is_rejected() {
        let gateway = FakeGateway::default();
        let mut out = Vec::new();
        assert!(write(&gateway, &mut out, "  ".into()).is_err());
        assert!(gateway.calls.lock().unwrap().is_empty());
    }
}
