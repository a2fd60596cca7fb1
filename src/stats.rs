use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::models::{RecordKind, ScoreEntry, Status, StudyRecord};
use crate::schedule::add_days;

/// Label used for records without a subject in the most-studied lookup
pub const NO_SUBJECT: &str = "(none)";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub total: usize,
    pub study: usize,
    pub review: usize,
    pub done: usize,
    pub pending: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyAggregate {
    pub month: String, // YYYY-MM
    pub study: usize,
    pub review: usize,
    pub done: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankEntry {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailyReviews {
    pub date: NaiveDate,
    pub done: usize,
    pub not_done: usize,
}

/// Days of a calendar month paired with the records due on each
#[derive(Debug, Clone)]
pub struct CalendarMonth<'a> {
    pub year: i32,
    pub month: u32,
    pub days: Vec<(NaiveDate, Vec<&'a StudyRecord>)>,
}

impl CalendarMonth<'_> {
    /// Weekday of the first day, 0 = Sunday
    pub fn leading_blanks(&self) -> u32 {
        self.days
            .first()
            .map(|(d, _)| d.weekday().num_days_from_sunday())
            .unwrap_or(0)
    }
}

/// Criteria for the full record list
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub status: Option<Status>,
    pub subject: Option<String>,
    pub query: Option<String>,
}

impl RecordFilter {
    pub fn matches(&self, record: &StudyRecord) -> bool {
        if let Some(status) = self.status {
            if record.status != status {
                return false;
            }
        }
        if let Some(ref subject) = self.subject {
            if !subject.is_empty() && &record.subject != subject {
                return false;
            }
        }
        if let Some(ref query) = self.query {
            if !query.is_empty()
                && !(record.subject.contains(query.as_str())
                    || record.resource.contains(query.as_str())
                    || record.range.contains(query.as_str())
                    || record.stage_label().contains(query.as_str()))
            {
                return false;
            }
        }
        true
    }
}

fn done_dates(records: &[StudyRecord]) -> BTreeSet<NaiveDate> {
    records
        .iter()
        .filter(|r| r.is_done())
        .map(|r| r.created_date)
        .collect()
}

/// Consecutive days, ending today, that each have a completed record
pub fn current_streak(records: &[StudyRecord], today: NaiveDate) -> u32 {
    let days = done_dates(records);
    let mut streak = 0;
    let mut cursor = today;
    while days.contains(&cursor) {
        streak += 1;
        let previous = add_days(cursor, -1);
        if previous == cursor {
            break;
        }
        cursor = previous;
    }
    streak
}

/// Longest run of consecutive days with a completed record, anywhere in history
pub fn longest_streak(records: &[StudyRecord]) -> u32 {
    let mut best = 0;
    let mut run = 0;
    let mut prev: Option<NaiveDate> = None;
    for day in done_dates(records) {
        run = match prev {
            Some(p) if add_days(p, 1) == day => run + 1,
            _ => 1,
        };
        best = best.max(run);
        prev = Some(day);
    }
    best
}

pub fn totals(records: &[StudyRecord]) -> Totals {
    let mut totals = Totals {
        total: records.len(),
        ..Default::default()
    };
    for record in records {
        match record.kind {
            RecordKind::Study => totals.study += 1,
            RecordKind::Review => totals.review += 1,
        }
        match record.status {
            Status::Done => totals.done += 1,
            Status::Pending => totals.pending += 1,
        }
    }
    totals
}

/// Study/review/done counts per month of the due date, ascending by month
pub fn monthly_aggregates(records: &[StudyRecord]) -> Vec<MonthlyAggregate> {
    let mut by_month: BTreeMap<String, MonthlyAggregate> = BTreeMap::new();
    for record in records {
        let month = record.due().format("%Y-%m").to_string();
        let entry = by_month.entry(month.clone()).or_insert_with(|| MonthlyAggregate {
            month,
            study: 0,
            review: 0,
            done: 0,
        });
        match record.kind {
            RecordKind::Study => entry.study += 1,
            RecordKind::Review => entry.review += 1,
        }
        if record.is_done() {
            entry.done += 1;
        }
    }
    by_month.into_values().collect()
}

/// Count records per key, most frequent first.
///
/// Equal counts keep the order in which each key first appears in `records`.
fn rank_by<'a, F>(records: impl Iterator<Item = &'a StudyRecord>, key: F) -> Vec<RankEntry>
where
    F: Fn(&'a StudyRecord) -> Option<&'a str>,
{
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for record in records {
        let Some(name) = key(record) else { continue };
        let count = counts.entry(name).or_insert(0);
        if *count == 0 {
            order.push(name);
        }
        *count += 1;
    }

    let mut ranking: Vec<RankEntry> = order
        .into_iter()
        .map(|name| RankEntry {
            name: name.to_string(),
            count: counts[name],
        })
        .collect();
    // sort_by is stable, which gives the first-seen tie-break
    ranking.sort_by(|a, b| b.count.cmp(&a.count));
    ranking
}

fn non_empty(s: &str) -> Option<&str> {
    if s.is_empty() { None } else { Some(s) }
}

/// Records per non-empty subject
pub fn subject_ranking(records: &[StudyRecord]) -> Vec<RankEntry> {
    rank_by(records.iter(), |r| non_empty(&r.subject))
}

/// Completed records per non-empty subject
pub fn done_subject_ranking(records: &[StudyRecord]) -> Vec<RankEntry> {
    rank_by(records.iter().filter(|r| r.is_done()), |r| non_empty(&r.subject))
}

/// Completed records per non-empty resource
pub fn done_resource_ranking(records: &[StudyRecord]) -> Vec<RankEntry> {
    rank_by(records.iter().filter(|r| r.is_done()), |r| non_empty(&r.resource))
}

/// Subject with the most records; records without a subject count as [`NO_SUBJECT`]
pub fn most_studied_subject(records: &[StudyRecord]) -> Option<String> {
    rank_by(records.iter(), |r| Some(non_empty(&r.subject).unwrap_or(NO_SUBJECT)))
        .into_iter()
        .next()
        .map(|entry| entry.name)
}

/// Review completion for each of the last seven days, oldest first
pub fn seven_day_window(records: &[StudyRecord], today: NaiveDate) -> Vec<DailyReviews> {
    (0..7)
        .map(|i| {
            let date = add_days(today, i - 6);
            let (done, not_done) = records
                .iter()
                .filter(|r| r.is_review() && r.due() == date)
                .fold((0, 0), |(d, n), r| if r.is_done() { (d + 1, n) } else { (d, n + 1) });
            DailyReviews { date, done, not_done }
        })
        .collect()
}

/// Due date first, then subject
pub fn record_order(a: &StudyRecord, b: &StudyRecord) -> Ordering {
    a.due().cmp(&b.due()).then_with(|| a.subject.cmp(&b.subject))
}

/// Reviews due today, whatever their status
pub fn due_today(records: &[StudyRecord], today: NaiveDate) -> Vec<&StudyRecord> {
    let mut due: Vec<&StudyRecord> = records
        .iter()
        .filter(|r| r.is_review() && r.due() == today)
        .collect();
    due.sort_by(|a, b| record_order(a, b));
    due
}

/// Pending reviews whose due date has passed
pub fn overdue(records: &[StudyRecord], today: NaiveDate) -> Vec<&StudyRecord> {
    let mut late: Vec<&StudyRecord> = records
        .iter()
        .filter(|r| r.is_review() && r.status == Status::Pending && r.due() < today)
        .collect();
    late.sort_by(|a, b| record_order(a, b));
    late
}

pub fn filter_records<'a>(records: &'a [StudyRecord], filter: &RecordFilter) -> Vec<&'a StudyRecord> {
    let mut matched: Vec<&StudyRecord> = records.iter().filter(|r| filter.matches(r)).collect();
    matched.sort_by(|a, b| record_order(a, b));
    matched
}

/// Distinct non-empty subjects in first-seen order
pub fn subjects(records: &[StudyRecord]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    records
        .iter()
        .filter(|r| !r.subject.is_empty() && seen.insert(r.subject.as_str()))
        .map(|r| r.subject.clone())
        .collect()
}

/// Records grouped by due date for one calendar month
pub fn calendar_month(records: &[StudyRecord], year: i32, month: u32) -> Option<CalendarMonth<'_>> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let mut days = Vec::new();
    let mut day = first;
    while day.month() == month {
        let due: Vec<&StudyRecord> = records.iter().filter(|r| r.due() == day).collect();
        days.push((day, due));
        let next = add_days(day, 1);
        if next == day {
            break;
        }
        day = next;
    }
    Some(CalendarMonth { year, month, days })
}

/// Shift a (year, month) pair by `delta` months
pub fn shift_month(year: i32, month: u32, delta: i32) -> (i32, u32) {
    let index = year * 12 + (month as i32 - 1) + delta;
    (index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
}

/// Scores in chronological order; same-day entries keep insertion order
pub fn score_history(scores: &[ScoreEntry]) -> Vec<&ScoreEntry> {
    let mut sorted: Vec<&ScoreEntry> = scores.iter().collect();
    sorted.sort_by_key(|s| s.date);
    sorted
}
