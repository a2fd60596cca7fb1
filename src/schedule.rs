//! Spaced-repetition review schedule.
//!
//! A study session logged on day D is followed by reviews due on D, D+1, D+7
//! and D+28. The offsets live on [`ReviewStage::offset_days`].

use chrono::{Days, NaiveDate};

use crate::models::{NewStudyInput, RecordKind, ReviewStage, Status, StudyRecord, new_record_id};

/// Build the four review records for the study record `parent`
pub fn generate_reviews(parent: &StudyRecord) -> Vec<StudyRecord> {
    ReviewStage::ALL
        .iter()
        .map(|stage| StudyRecord {
            id: new_record_id(),
            parent_id: Some(parent.id.clone()),
            kind: RecordKind::Review,
            stage: Some(*stage),
            subject: parent.subject.clone(),
            resource: parent.resource.clone(),
            range: parent.range.clone(),
            priority: parent.priority,
            created_date: parent.created_date,
            due_date: Some(add_days(parent.created_date, stage.offset_days())),
            status: Status::Pending,
        })
        .collect()
}

/// Build a study record plus its reviews.
///
/// Returns `None` when subject, resource or range is missing; callers treat
/// that as a no-op rather than an error.
pub fn new_study_session(input: &NewStudyInput, date: NaiveDate) -> Option<Vec<StudyRecord>> {
    if !input.is_complete() {
        return None;
    }

    let study = StudyRecord::new_study(input, date);
    let mut records = Vec::with_capacity(1 + ReviewStage::ALL.len());
    let reviews = generate_reviews(&study);
    records.push(study);
    records.extend(reviews);
    Some(records)
}

/// Shift a date by a signed number of days, saturating at chrono's range limits
pub fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    let shifted = if days >= 0 {
        date.checked_add_days(Days::new(days as u64))
    } else {
        date.checked_sub_days(Days::new(days.unsigned_abs()))
    };
    shifted.unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Priority;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn session_produces_study_and_four_reviews() {
        let input = NewStudyInput::new("Math", "Textbook", "p.10-20").with_priority(Priority::High);
        let records = new_study_session(&input, date("2024-01-10")).unwrap();

        assert_eq!(records.len(), 5);
        let study = &records[0];
        assert_eq!(study.kind, RecordKind::Study);
        assert_eq!(study.stage, None);
        assert_eq!(study.parent_id, None);

        for review in &records[1..] {
            assert_eq!(review.kind, RecordKind::Review);
            assert_eq!(review.parent_id.as_deref(), Some(study.id.as_str()));
            assert_eq!(review.subject, "Math");
            assert_eq!(review.resource, "Textbook");
            assert_eq!(review.range, "p.10-20");
            assert_eq!(review.priority, Priority::High);
            assert_eq!(review.status, Status::Pending);
            assert_eq!(review.created_date, date("2024-01-10"));
        }
    }

    #[test]
    fn review_due_dates_follow_fixed_offsets() {
        let input = NewStudyInput::new("Math", "Textbook", "ch.3");
        let records = new_study_session(&input, date("2024-01-10")).unwrap();
        let due: Vec<NaiveDate> = records[1..].iter().map(|r| r.due()).collect();

        assert_eq!(
            due,
            vec![
                date("2024-01-10"),
                date("2024-01-11"),
                date("2024-01-17"),
                date("2024-02-07"),
            ]
        );
        let stages: Vec<_> = records[1..].iter().filter_map(|r| r.stage).collect();
        assert_eq!(stages, ReviewStage::ALL.to_vec());
    }

    #[test]
    fn review_ids_are_unique() {
        let input = NewStudyInput::new("History", "Atlas", "maps");
        let records = new_study_session(&input, date("2024-05-01")).unwrap();
        let mut ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 5);
    }

    #[test]
    fn incomplete_session_is_rejected() {
        let input = NewStudyInput::new("Math", "", "p.1");
        assert!(new_study_session(&input, date("2024-01-10")).is_none());
    }

    #[test]
    fn add_days_crosses_month_and_year() {
        assert_eq!(add_days(date("2024-12-30"), 7), date("2025-01-06"));
        assert_eq!(add_days(date("2024-03-01"), -1), date("2024-02-29"));
    }
}
