use chrono::NaiveDate;
use studylog::achievements;
use studylog::database::ITEMS_KEY;
use studylog::models::{NewStudyInput, Priority, ScoreEntry, SettingsPatch, Status, ThemeColor};
use studylog::schedule::add_days;
use studylog::stats;
use studylog::{Database, Store};

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn open(path: &std::path::Path) -> Store {
    Store::open(Database::new(path.to_str().unwrap()).unwrap())
}

#[test]
fn math_session_schedules_reviews_and_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("studylog.db");
    let today = date("2024-01-10");

    {
        let mut store = open(&path);
        let input = NewStudyInput::new("Math", "Textbook", "p.10-20").with_priority(Priority::High);
        store.add_study_session(&input, today, today).unwrap();
    }

    let store = open(&path);
    assert_eq!(store.items().len(), 5);
    let due: Vec<NaiveDate> = store
        .items()
        .iter()
        .filter(|r| r.is_review())
        .map(|r| r.due())
        .collect();
    assert_eq!(
        due,
        vec![date("2024-01-10"), date("2024-01-11"), date("2024-01-17"), date("2024-02-07")]
    );
    assert!(store.items().iter().all(|r| r.subject == "Math" && r.priority == Priority::High));
    assert_eq!(stats::current_streak(store.items(), today), 1);
}

#[test]
fn achievements_only_grow_across_mutations() {
    let mut store = Store::open(Database::open_in_memory().unwrap());
    let start = date("2024-03-01");
    let mut previous: Vec<String> = Vec::new();

    let mut study_ids = Vec::new();
    for day in 0..5 {
        let today = add_days(start, day);
        let added = store
            .add_study_session(&NewStudyInput::new("Chemistry", "Notes", format!("unit {}", day)), today, today)
            .unwrap();
        study_ids.push(added[0].id.clone());
        let same_day = added[1].id.clone();
        store.toggle_status(&same_day, today).unwrap();

        for id in &previous {
            assert!(store.achievements().contains(id), "lost {} on day {}", id, day);
        }
        previous = store.achievements().to_vec();
    }
    assert!(previous.iter().any(|id| id == "streak_3"));
    assert!(previous.iter().any(|id| id == "ten_total"));

    let today = add_days(start, 4);
    for id in &study_ids {
        store.delete_record(id, today).unwrap();
        for unlocked in &previous {
            assert!(store.achievements().contains(unlocked));
        }
    }
    assert!(store.items().is_empty());
    assert_eq!(stats::current_streak(store.items(), today), 0);
}

#[test]
fn export_then_import_reproduces_state() {
    let today = date("2024-01-10");
    let mut source = Store::open(Database::open_in_memory().unwrap());
    let added = source
        .add_study_session(&NewStudyInput::new("Math", "Textbook", "p.1"), today, today)
        .unwrap();
    source
        .add_study_session(&NewStudyInput::new("English", "Reader", "ch2"), today, today)
        .unwrap();
    source.toggle_status(&added[1].id, today).unwrap();
    source
        .update_settings(&SettingsPatch { dark_mode: Some(true), theme_color: Some(ThemeColor::Blue) })
        .unwrap();
    source
        .add_score(ScoreEntry::new("Math".into(), date("2024-01-08"), 72.5))
        .unwrap();

    let json = source.export_backup().to_json().unwrap();

    let mut target = Store::open(Database::open_in_memory().unwrap());
    target.import_backup(&json, today).unwrap();

    assert_eq!(target.items(), source.items());
    assert_eq!(target.settings(), source.settings());
    assert_eq!(target.scores(), source.scores());
    assert_eq!(target.achievements(), source.achievements());
}

#[test]
fn invalid_backup_leaves_storage_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("studylog.db");
    let today = date("2024-01-10");

    let mut store = open(&path);
    store
        .add_study_session(&NewStudyInput::new("Math", "Textbook", "p.1"), today, today)
        .unwrap();
    let raw_before = Database::new(path.to_str().unwrap())
        .unwrap()
        .get_raw(ITEMS_KEY)
        .unwrap();
    let items_before = store.items().to_vec();

    assert!(store.import_backup("this is not json", today).is_err());

    assert_eq!(store.items(), items_before.as_slice());
    let raw_after = Database::new(path.to_str().unwrap())
        .unwrap()
        .get_raw(ITEMS_KEY)
        .unwrap();
    assert_eq!(raw_before, raw_after);
}

#[test]
fn toggling_a_review_feeds_streak_and_window() {
    let today = date("2024-01-10");
    let mut store = Store::open(Database::open_in_memory().unwrap());
    let yesterday = add_days(today, -1);
    let added = store
        .add_study_session(&NewStudyInput::new("Math", "Textbook", "p.1"), yesterday, yesterday)
        .unwrap();
    // the next-day review falls due today
    let next_day = added.iter().find(|r| r.due() == today).unwrap().id.clone();
    assert_eq!(store.toggle_status(&next_day, today).unwrap(), Status::Done);

    let window = stats::seven_day_window(store.items(), today);
    assert_eq!(window[6].done, 1);
    assert_eq!(window[5].not_done, 1);
    // completion counts toward the day the session was logged
    assert_eq!(stats::current_streak(store.items(), today), 0);
    assert_eq!(stats::current_streak(store.items(), yesterday), 1);

    let unlocked = achievements::satisfied(store.items(), today);
    assert!(unlocked.contains(&"first_review_done"));
    assert!(unlocked.contains(&"all_done_today"));
}

#[test]
fn import_over_existing_data_matches_the_exported_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("studylog.db");
    let today = date("2024-01-10");

    let mut source = Store::open(Database::open_in_memory().unwrap());
    let added = source
        .add_study_session(&NewStudyInput::new("Math", "Textbook", "p.1"), today, today)
        .unwrap();
    source.toggle_status(&added[1].id, today).unwrap();
    source
        .update_settings(&SettingsPatch { dark_mode: Some(true), theme_color: Some(ThemeColor::Blue) })
        .unwrap();
    source
        .add_score(ScoreEntry::new("Math".into(), date("2024-01-08"), 72.5))
        .unwrap();
    let json = source.export_backup().to_json().unwrap();

    {
        let mut target = open(&path);
        for back in 0..3 {
            let day = add_days(today, -back);
            target
                .add_study_session(&NewStudyInput::new("Art", "Sketchbook", "p1"), day, today)
                .unwrap();
        }
        target
            .update_settings(&SettingsPatch { dark_mode: Some(false), theme_color: Some(ThemeColor::Green) })
            .unwrap();
        target
            .add_score(ScoreEntry::new("Art".into(), date("2024-01-09"), 50.0))
            .unwrap();
        assert!(target.achievements().iter().any(|id| id == "streak_3"));
        assert!(!source.achievements().iter().any(|id| id == "streak_3"));

        target.import_backup(&json, today).unwrap();
        assert_eq!(target.items(), source.items());
        assert_eq!(target.settings(), source.settings());
        assert_eq!(target.scores(), source.scores());
        assert_eq!(target.achievements(), source.achievements());
    }

    let reopened = open(&path);
    assert_eq!(reopened.items(), source.items());
    assert_eq!(reopened.settings(), source.settings());
    assert_eq!(reopened.scores(), source.scores());
    assert_eq!(reopened.achievements(), source.achievements());
}
