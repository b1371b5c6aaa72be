//! Temporal queries over one contract's milestones.
//!
//! The window arithmetic lives in pure functions that take an explicit
//! `today` so the boundaries are testable with fixed dates. The trait
//! implementation supplies `Utc::now().date_naive()`.

use crate::domain::{Milestone, MilestoneStatus};
use chrono::{Duration, NaiveDate, Weekday};

/// Sort a schedule ascending by `(due_date, id)`.
///
/// Every query result goes through this so callers see a deterministic
/// order even when due dates collide.
pub(super) fn sort_schedule(milestones: &mut [Milestone]) {
    milestones.sort_by(|a, b| (a.due_date, &a.id).cmp(&(b.due_date, &b.id)));
}

/// Milestones due within the next `within_days` days, inclusive on both
/// ends. Status is not considered; completed milestones still show up.
pub(super) fn upcoming_on<'a, I>(
    milestones: I,
    today: NaiveDate,
    within_days: u32,
) -> Vec<Milestone>
where
    I: IntoIterator<Item = &'a Milestone>,
{
    let end = today
        .checked_add_signed(Duration::days(i64::from(within_days)))
        .unwrap_or(NaiveDate::MAX);
    let mut hits: Vec<Milestone> = milestones
        .into_iter()
        .filter(|milestone| (today..=end).contains(&milestone.due_date))
        .cloned()
        .collect();
    sort_schedule(&mut hits);
    hits
}

/// Milestones whose due date has passed without completion.
///
/// A milestone due today is not overdue yet.
pub(super) fn overdue_on<'a, I>(milestones: I, today: NaiveDate) -> Vec<Milestone>
where
    I: IntoIterator<Item = &'a Milestone>,
{
    let mut hits: Vec<Milestone> = milestones
        .into_iter()
        .filter(|milestone| {
            milestone.due_date < today && milestone.status != MilestoneStatus::Completed
        })
        .cloned()
        .collect();
    sort_schedule(&mut hits);
    hits
}

/// Milestones due in the ISO week (Monday through Sunday) containing
/// `today`, any status.
pub(super) fn due_this_week_on<'a, I>(milestones: I, today: NaiveDate) -> Vec<Milestone>
where
    I: IntoIterator<Item = &'a Milestone>,
{
    let week = today.week(Weekday::Mon);
    let window = week.first_day()..=week.last_day();
    let mut hits: Vec<Milestone> = milestones
        .into_iter()
        .filter(|milestone| window.contains(&milestone.due_date))
        .cloned()
        .collect();
    sort_schedule(&mut hits);
    hits
}
