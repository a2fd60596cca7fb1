use std::collections::HashMap;

use chrono::NaiveDate;

use crate::models::{Status, StudyRecord};
use crate::stats::{current_streak, due_today, overdue};

/// A named milestone with the condition that unlocks it
pub struct Achievement {
    pub id: &'static str,
    pub name: &'static str,
    pub test: fn(&[StudyRecord], NaiveDate) -> bool,
}

fn done_reviews(records: &[StudyRecord]) -> usize {
    records.iter().filter(|r| r.is_review() && r.is_done()).count()
}

fn max_subject_count(records: &[StudyRecord]) -> usize {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for record in records {
        *counts.entry(record.subject.as_str()).or_insert(0) += 1;
    }
    counts.into_values().max().unwrap_or(0)
}

pub const ACHIEVEMENTS: &[Achievement] = &[
    Achievement { id: "first", name: "First entry", test: |r, _| !r.is_empty() },
    Achievement {
        id: "first_review_done",
        name: "First review completed",
        test: |r, _| done_reviews(r) >= 1,
    },
    Achievement { id: "ten_total", name: "10 records", test: |r, _| r.len() >= 10 },
    Achievement { id: "twentyfive_total", name: "25 records", test: |r, _| r.len() >= 25 },
    Achievement { id: "fifty_total", name: "50 records", test: |r, _| r.len() >= 50 },
    Achievement { id: "hundred_total", name: "100 records", test: |r, _| r.len() >= 100 },
    Achievement {
        id: "ten_reviews_done",
        name: "10 reviews completed",
        test: |r, _| done_reviews(r) >= 10,
    },
    Achievement {
        id: "no_overdue_today",
        name: "Nothing overdue",
        test: |r, today| overdue(r, today).is_empty(),
    },
    Achievement { id: "streak_3", name: "3-day streak", test: |r, today| current_streak(r, today) >= 3 },
    Achievement { id: "streak_7", name: "7-day streak", test: |r, today| current_streak(r, today) >= 7 },
    Achievement { id: "streak_14", name: "14-day streak", test: |r, today| current_streak(r, today) >= 14 },
    Achievement {
        id: "subject_master",
        name: "Subject master (5 records in one subject)",
        test: |r, _| max_subject_count(r) >= 5,
    },
    Achievement {
        id: "all_done_today",
        name: "Today's reviews cleared",
        test: |r, today| {
            let due = due_today(r, today);
            !due.is_empty() && due.iter().all(|x| x.status == Status::Done)
        },
    },
];

/// Ids of every achievement whose condition currently holds, in table order
pub fn satisfied(records: &[StudyRecord], today: NaiveDate) -> Vec<&'static str> {
    ACHIEVEMENTS
        .iter()
        .filter(|a| (a.test)(records, today))
        .map(|a| a.id)
        .collect()
}

/// Add newly satisfied achievements to `unlocked`.
///
/// Ids already present are never removed. Returns the ids added by this call.
pub fn unlock(unlocked: &mut Vec<String>, records: &[StudyRecord], today: NaiveDate) -> Vec<&'static str> {
    let mut added = Vec::new();
    for id in satisfied(records, today) {
        if !unlocked.iter().any(|u| u == id) {
            unlocked.push(id.to_string());
            added.push(id);
        }
    }
    added
}
