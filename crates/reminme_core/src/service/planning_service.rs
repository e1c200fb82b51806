//! Habit and task use-case service.
//!
//! # Responsibility
//! - Validate habit and task payloads.
//! - Derive habit progress (checked today, streak) from stored checks.
//!
//! # Invariants
//! - Daily streaks count consecutive checked days ending today, or yesterday
//!   when today is not checked yet.
//! - Weekly streaks count consecutive ISO weeks (Monday start) with at least
//!   one check, ending this week or last week.

use crate::model::planning::{
    Habit, HabitCadence, HabitCheck, HabitCheckToggle, HabitDraft, HabitProgress, ProjectTask,
    SubtaskDraft, TaskDraft, TaskPatch,
};
use crate::model::{
    clean_optional, parse_date, validate_optional_date, RecordId, UserId, ValidationError,
};
use crate::repo::planning_repo::{PlanningRepository, TaskQuery};
use crate::repo::{RepoError, RepoResult};
use chrono::{Datelike, Duration, NaiveDate};
use std::collections::BTreeSet;

/// Use-case service for habits and project tasks.
pub struct PlanningService<R: PlanningRepository> {
    repo: R,
}

impl<R: PlanningRepository> PlanningService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn create_habit(&self, owner: UserId, draft: HabitDraft) -> RepoResult<Habit> {
        let draft = draft.cleaned()?;
        self.repo.create_habit(owner, &draft)
    }

    pub fn update_habit(
        &self,
        owner: UserId,
        id: RecordId,
        draft: HabitDraft,
    ) -> RepoResult<Habit> {
        let draft = draft.cleaned()?;
        self.repo.update_habit(owner, id, &draft)
    }

    pub fn delete_habit(&self, owner: UserId, id: RecordId) -> RepoResult<()> {
        self.repo.delete_habit(owner, id)
    }

    /// Lists habits with their state for `today`.
    pub fn list_habit_progress(
        &self,
        owner: UserId,
        today: NaiveDate,
        include_archived: bool,
    ) -> RepoResult<Vec<HabitProgress>> {
        let today_text = today.format("%Y-%m-%d").to_string();
        let habits = self.repo.list_habits(owner, include_archived)?;
        let mut progress = Vec::with_capacity(habits.len());
        for habit in habits {
            let checks = self
                .repo
                .list_habit_checks(owner, habit.id, None, Some(&today_text))?;
            let dates = check_dates(&checks);
            progress.push(HabitProgress {
                checked_today: dates.contains(&today),
                streak: habit_streak(habit.cadence, &dates, today),
                habit,
            });
        }
        Ok(progress)
    }

    /// Toggles the check for `check_date`, defaulting to `today`.
    pub fn toggle_check(
        &self,
        owner: UserId,
        habit_id: RecordId,
        check_date: Option<&str>,
        today: NaiveDate,
    ) -> RepoResult<HabitCheckToggle> {
        let date = match check_date.map(str::trim) {
            Some(value) => parse_date(value)
                .ok_or_else(|| ValidationError::new("date", "must be a YYYY-MM-DD date"))?,
            None => today,
        };
        self.repo
            .toggle_habit_check(owner, habit_id, &date.format("%Y-%m-%d").to_string())
    }

    pub fn list_checks(
        &self,
        owner: UserId,
        habit_id: RecordId,
        from: Option<&str>,
        to: Option<&str>,
    ) -> RepoResult<Vec<HabitCheck>> {
        validate_optional_date("from", from)?;
        validate_optional_date("to", to)?;
        self.repo.list_habit_checks(owner, habit_id, from, to)
    }

    pub fn create_task(&self, owner: UserId, draft: TaskDraft) -> RepoResult<ProjectTask> {
        let draft = draft.cleaned()?;
        self.repo.create_task(owner, &draft)
    }

    pub fn patch_task(
        &self,
        owner: UserId,
        id: RecordId,
        patch: TaskPatch,
    ) -> RepoResult<ProjectTask> {
        patch.validate()?;
        self.repo.patch_task(owner, id, &patch)
    }

    pub fn get_task(&self, owner: UserId, id: RecordId) -> RepoResult<ProjectTask> {
        self.repo
            .get_task(owner, id)?
            .ok_or(RepoError::not_found("task", id))
    }

    pub fn list_tasks(&self, owner: UserId, query: &TaskQuery) -> RepoResult<Vec<ProjectTask>> {
        self.repo.list_tasks(owner, query)
    }

    pub fn list_projects(&self, owner: UserId) -> RepoResult<Vec<String>> {
        self.repo.list_projects(owner)
    }

    pub fn delete_task(&self, owner: UserId, id: RecordId) -> RepoResult<usize> {
        self.repo.delete_task(owner, id)
    }

    /// Inserts generated subtasks under `parent_id`. Untitled entries are dropped.
    pub fn add_subtasks(
        &self,
        owner: UserId,
        parent_id: RecordId,
        subtasks: Vec<SubtaskDraft>,
    ) -> RepoResult<Vec<ProjectTask>> {
        let subtasks: Vec<SubtaskDraft> = subtasks
            .into_iter()
            .filter_map(|subtask| {
                let title = subtask.title.trim();
                (!title.is_empty()).then(|| SubtaskDraft {
                    title: title.to_string(),
                    description: clean_optional(subtask.description),
                })
            })
            .collect();
        self.repo.insert_subtasks(owner, parent_id, &subtasks)
    }
}

fn check_dates(checks: &[HabitCheck]) -> BTreeSet<NaiveDate> {
    checks
        .iter()
        .filter_map(|check| parse_date(&check.check_date))
        .collect()
}

/// Computes the current streak for a habit from its checked dates.
pub fn habit_streak(cadence: HabitCadence, dates: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    match cadence {
        HabitCadence::Daily => {
            let mut cursor = if dates.contains(&today) {
                today
            } else {
                today - Duration::days(1)
            };
            let mut streak = 0;
            while dates.contains(&cursor) {
                streak += 1;
                cursor -= Duration::days(1);
            }
            streak
        }
        HabitCadence::Weekly => {
            let weeks: BTreeSet<NaiveDate> = dates.iter().map(|date| week_start(*date)).collect();
            let this_week = week_start(today);
            let mut cursor = if weeks.contains(&this_week) {
                this_week
            } else {
                this_week - Duration::days(7)
            };
            let mut streak = 0;
            while weeks.contains(&cursor) {
                streak += 1;
                cursor -= Duration::days(7);
            }
            streak
        }
    }
}

fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

#[cfg(test)]
mod tests {
    use super::habit_streak;
    use crate::model::planning::HabitCadence;
    use chrono::NaiveDate;
    use std::collections::BTreeSet;

    fn dates(values: &[&str]) -> BTreeSet<NaiveDate> {
        values
            .iter()
            .map(|value| {
                NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("date should be valid")
            })
            .collect()
    }

    fn day(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("date should be valid")
    }

    #[test]
    fn daily_streak_counts_back_from_today() {
        let checked = dates(&["2026-03-08", "2026-03-09", "2026-03-10"]);
        assert_eq!(habit_streak(HabitCadence::Daily, &checked, day("2026-03-10")), 3);
    }

    #[test]
    fn daily_streak_survives_until_today_is_checked() {
        let checked = dates(&["2026-03-08", "2026-03-09"]);
        assert_eq!(habit_streak(HabitCadence::Daily, &checked, day("2026-03-10")), 2);
        assert_eq!(habit_streak(HabitCadence::Daily, &checked, day("2026-03-11")), 0);
    }

    #[test]
    fn daily_streak_stops_at_gap() {
        let checked = dates(&["2026-03-05", "2026-03-07", "2026-03-08"]);
        assert_eq!(habit_streak(HabitCadence::Daily, &checked, day("2026-03-08")), 2);
    }

    #[test]
    fn weekly_streak_counts_consecutive_weeks() {
        // 2026-03-02 and 2026-03-09 are Mondays.
        let checked = dates(&["2026-02-25", "2026-03-04", "2026-03-12"]);
        assert_eq!(habit_streak(HabitCadence::Weekly, &checked, day("2026-03-13")), 3);
        assert_eq!(habit_streak(HabitCadence::Weekly, &checked, day("2026-03-17")), 3);
        assert_eq!(habit_streak(HabitCadence::Weekly, &checked, day("2026-03-24")), 0);
    }
}
