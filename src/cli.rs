use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::achievements::ACHIEVEMENTS;
use crate::backup::{self, BackupError};
use crate::models::{
    NewStudyInput, Priority, RecordPatch, ScoreEntry, SettingsPatch, Status, StudyRecord,
    ThemeColor,
};
use crate::stats::{self, RankEntry, RecordFilter};
use crate::store::{Store, StoreError};
use crate::utils::{parse_date, parse_month};

/// Length of the id prefix shown in listings
const SHORT_ID_LEN: usize = 8;

#[derive(Parser)]
#[command(name = "studylog")]
#[command(about = "Study log with automatic spaced-repetition reviews")]
#[command(version)]
pub struct Cli {
    /// Custom config file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Use development mode (uses separate dev config/database)
    #[arg(long)]
    pub dev: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log a study session and schedule its reviews
    Add {
        /// Subject studied
        subject: String,
        /// Book, course or other material
        resource: String,
        /// Pages, chapters or section covered
        range: String,
        /// Priority (defaults to the configured priority)
        #[arg(long, value_enum)]
        priority: Option<Priority>,
        /// Session date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
    },
    /// Show reviews due today and overdue reviews (default if no subcommand)
    Today,
    /// List records, optionally filtered
    List {
        #[arg(long, value_enum)]
        status: Option<Status>,
        /// Exact subject
        #[arg(long)]
        subject: Option<String>,
        /// Substring matched against subject, resource, range and stage
        #[arg(short, long)]
        query: Option<String>,
    },
    /// Show one record in full
    Show {
        /// Record id or unique id prefix
        id: String,
    },
    /// Toggle a record between pending and done
    Toggle {
        /// Record id or unique id prefix
        id: String,
    },
    /// Edit a record
    Edit {
        /// Record id or unique id prefix
        id: String,
        #[arg(long)]
        subject: Option<String>,
        #[arg(long)]
        resource: Option<String>,
        #[arg(long)]
        range: Option<String>,
        #[arg(long, value_enum)]
        priority: Option<Priority>,
        /// New due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,
    },
    /// Delete a record; deleting a study session also deletes its reviews
    Delete {
        /// Record id or unique id prefix
        id: String,
    },
    /// Show records due in a month
    Calendar {
        /// Month (YYYY-MM), defaults to the current month
        #[arg(long)]
        month: Option<String>,
    },
    /// Totals, last seven days and monthly breakdown
    Dashboard,
    /// Current and longest streak
    Streak,
    /// Subject and resource rankings
    Ranking,
    /// Unlocked and locked achievements
    Achievements,
    /// Record or list test scores
    Score {
        #[command(subcommand)]
        action: ScoreCommands,
    },
    /// Show or change settings
    Settings {
        /// Dark mode on or off
        #[arg(long)]
        dark: Option<bool>,
        #[arg(long, value_enum)]
        theme: Option<ThemeColor>,
    },
    /// Write a backup file
    Export {
        /// Output file, defaults to the backup directory
        path: Option<PathBuf>,
    },
    /// Restore from a backup file
    Import {
        path: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum ScoreCommands {
    /// Record a score (0-100)
    Add {
        subject: String,
        score: f64,
        /// Test date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
    },
    /// List scores in date order
    List {
        #[arg(long)]
        subject: Option<String>,
    },
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),
    #[error("Backup error: {0}")]
    BackupError(#[from] BackupError),
    #[error("Failed to parse date: {0}")]
    DateParseError(String),
    #[error("Invalid month '{0}', expected YYYY-MM")]
    InvalidMonth(String),
    #[error("Score must be between 0 and 100, got {0}")]
    InvalidScore(f64),
    #[error("Failed to access {}: {source}", path.display())]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn parse_date_arg(date: Option<String>, today: NaiveDate) -> Result<NaiveDate, CliError> {
    match date {
        Some(date_str) => parse_date(&date_str)
            .map_err(|e| CliError::DateParseError(format!("Invalid date format '{}': {}", date_str, e))),
        None => Ok(today),
    }
}

fn short_id(id: &str) -> &str {
    id.get(..SHORT_ID_LEN).unwrap_or(id)
}

/// One-line summary of a record
pub fn format_record(record: &StudyRecord) -> String {
    let stage = record
        .stage
        .map(|s| format!(" ({})", s.label()))
        .unwrap_or_default();
    format!(
        "{}  [{}] {} {} {}{}  due {}  {}  {}",
        short_id(&record.id),
        record.kind.as_str(),
        record.subject,
        record.resource,
        record.range,
        stage,
        record.due(),
        record.status.as_str(),
        record.priority.as_str(),
    )
}

/// Numbered ranking lines, or a placeholder when empty
pub fn format_ranking(entries: &[RankEntry]) -> Vec<String> {
    if entries.is_empty() {
        return vec!["  (no data yet)".to_string()];
    }
    entries
        .iter()
        .enumerate()
        .map(|(i, e)| format!("  {}. {} ({})", i + 1, e.name, e.count))
        .collect()
}

fn print_records(title: &str, records: &[&StudyRecord]) {
    println!("{}", title);
    if records.is_empty() {
        println!("  none");
    }
    for record in records {
        println!("  {}", format_record(record));
    }
}

/// Handle the add command
pub fn handle_add(
    input: NewStudyInput,
    date: Option<String>,
    store: &mut Store,
    today: NaiveDate,
) -> Result<(), CliError> {
    let date = parse_date_arg(date, today)?;
    let added = store.add_study_session(&input, date, today)?;
    if added.is_empty() {
        println!("Subject, resource and range are all required; nothing added");
        return Ok(());
    }
    println!("Study session logged (ID: {})", added[0].id);
    for review in &added[1..] {
        println!("  review {:<9} due {}", review.stage_label(), review.due());
    }
    Ok(())
}

/// Handle the today command
pub fn handle_today(store: &Store, today: NaiveDate) -> Result<(), CliError> {
    print_records(&format!("Reviews due today ({})", today), &stats::due_today(store.items(), today));
    println!();
    print_records("Overdue", &stats::overdue(store.items(), today));
    Ok(())
}

/// Handle the list command
pub fn handle_list(filter: RecordFilter, store: &Store) -> Result<(), CliError> {
    let records = stats::filter_records(store.items(), &filter);
    print_records(&format!("{} record(s)", records.len()), &records);
    if records.is_empty() {
        let subjects = stats::subjects(store.items());
        if !subjects.is_empty() {
            println!("Known subjects: {}", subjects.join(", "));
        }
    }
    Ok(())
}

/// Handle the show command
pub fn handle_show(id: &str, store: &Store) -> Result<(), CliError> {
    let id = store.resolve_id(id)?;
    let record = store
        .get(&id)
        .ok_or_else(|| StoreError::RecordNotFound(id.clone()))?;
    println!("ID:       {}", record.id);
    if let Some(ref parent) = record.parent_id {
        println!("Parent:   {}", parent);
    }
    println!("Kind:     {}", record.kind.as_str());
    println!("Stage:    {}", record.stage.map(|s| s.label()).unwrap_or("-"));
    println!("Subject:  {}", record.subject);
    println!("Resource: {}", record.resource);
    println!("Range:    {}", record.range);
    println!("Priority: {}", record.priority.as_str());
    println!("Created:  {}", record.created_date);
    println!("Due:      {}", record.due());
    println!("Status:   {}", record.status.as_str());
    Ok(())
}

/// Handle the toggle command
pub fn handle_toggle(id: &str, store: &mut Store, today: NaiveDate) -> Result<(), CliError> {
    let id = store.resolve_id(id)?;
    let status = store.toggle_status(&id, today)?;
    println!("Record {} is now {}", short_id(&id), status.as_str());
    Ok(())
}

/// Handle the edit command
pub fn handle_edit(
    id: &str,
    mut patch: RecordPatch,
    due: Option<String>,
    store: &mut Store,
    today: NaiveDate,
) -> Result<(), CliError> {
    let id = store.resolve_id(id)?;
    if let Some(due) = due {
        patch.due_date = Some(parse_date_arg(Some(due), today)?);
    }
    if patch.is_empty() {
        println!("Nothing to change");
        return Ok(());
    }
    let updated = store.update_record(&id, &patch, today)?;
    println!("Updated: {}", format_record(&updated));
    Ok(())
}

/// Handle the delete command
pub fn handle_delete(id: &str, store: &mut Store, today: NaiveDate) -> Result<(), CliError> {
    let id = store.resolve_id(id)?;
    let removed = store.delete_record(&id, today)?;
    println!("Deleted {} record(s)", removed);
    Ok(())
}

/// Handle the calendar command
pub fn handle_calendar(month: Option<String>, store: &Store, today: NaiveDate) -> Result<(), CliError> {
    let (year, month_num) = match month {
        Some(m) => parse_month(&m).ok_or(CliError::InvalidMonth(m))?,
        None => (today.year(), today.month()),
    };
    let calendar = stats::calendar_month(store.items(), year, month_num)
        .ok_or_else(|| CliError::InvalidMonth(format!("{:04}-{:02}", year, month_num)))?;

    let (py, pm) = stats::shift_month(year, month_num, -1);
    let (ny, nm) = stats::shift_month(year, month_num, 1);
    println!(
        "{:04}-{:02}   (prev {:04}-{:02}, next {:04}-{:02})",
        calendar.year, calendar.month, py, pm, ny, nm
    );

    println!(" Su  Mo  Tu  We  Th  Fr  Sa");
    let mut line = "    ".repeat(calendar.leading_blanks() as usize);
    for (date, due) in &calendar.days {
        let marker = if due.is_empty() { ' ' } else { '*' };
        line.push_str(&format!("{:>3}{}", date.day(), marker));
        if date.weekday().num_days_from_sunday() == 6 {
            println!("{}", line.trim_end());
            line.clear();
        }
    }
    if !line.is_empty() {
        println!("{}", line.trim_end());
    }

    println!();
    for (date, due) in calendar.days.iter().filter(|(_, due)| !due.is_empty()) {
        println!("{}", date);
        for record in due {
            println!("  {}", format_record(record));
        }
    }
    Ok(())
}

/// Handle the dashboard command
pub fn handle_dashboard(store: &Store, today: NaiveDate) -> Result<(), CliError> {
    let totals = stats::totals(store.items());
    println!(
        "Total {}  study {}  review {}  done {}  pending {}",
        totals.total, totals.study, totals.review, totals.done, totals.pending
    );

    println!();
    println!("Reviews, last 7 days (done / not done)");
    for day in stats::seven_day_window(store.items(), today) {
        println!("  {}  {:>3} / {:<3}", day.date.format("%m-%d"), day.done, day.not_done);
    }

    println!();
    println!("By month (study / review / done)");
    let months = stats::monthly_aggregates(store.items());
    if months.is_empty() {
        println!("  (no data yet)");
    }
    for m in months {
        println!("  {}  {:>4} {:>4} {:>4}", m.month, m.study, m.review, m.done);
    }
    Ok(())
}

/// Handle the streak command
pub fn handle_streak(store: &Store, today: NaiveDate) -> Result<(), CliError> {
    println!("Current streak: {} day(s)", stats::current_streak(store.items(), today));
    println!("Longest streak: {} day(s)", stats::longest_streak(store.items()));
    Ok(())
}

/// Handle the ranking command
pub fn handle_ranking(store: &Store) -> Result<(), CliError> {
    let items = store.items();
    println!(
        "Most studied subject: {}",
        stats::most_studied_subject(items).unwrap_or_else(|| "-".to_string())
    );
    println!("Records by subject");
    format_ranking(&stats::subject_ranking(items))
        .iter()
        .for_each(|l| println!("{}", l));
    println!("Completed by subject");
    format_ranking(&stats::done_subject_ranking(items))
        .iter()
        .for_each(|l| println!("{}", l));
    println!("Completed by resource");
    format_ranking(&stats::done_resource_ranking(items))
        .iter()
        .for_each(|l| println!("{}", l));
    Ok(())
}

/// Handle the achievements command
pub fn handle_achievements(store: &Store) -> Result<(), CliError> {
    let unlocked = store.achievements();
    println!("{} of {} unlocked", unlocked.len(), ACHIEVEMENTS.len());
    for achievement in ACHIEVEMENTS {
        let mark = if unlocked.iter().any(|id| id == achievement.id) { "x" } else { " " };
        println!("  [{}] {}", mark, achievement.name);
    }
    Ok(())
}

/// Handle the score subcommands
pub fn handle_score(action: ScoreCommands, store: &mut Store, today: NaiveDate) -> Result<(), CliError> {
    match action {
        ScoreCommands::Add { subject, score, date } => {
            if !(0.0..=100.0).contains(&score) {
                return Err(CliError::InvalidScore(score));
            }
            let date = parse_date_arg(date, today)?;
            store.add_score(ScoreEntry::new(subject, date, score))?;
            println!("Score recorded");
        }
        ScoreCommands::List { subject } => {
            let history = stats::score_history(store.scores());
            let mut shown = 0;
            for entry in history
                .into_iter()
                .filter(|s| subject.as_ref().is_none_or(|want| &s.subject == want))
            {
                println!("  {}  {:<16} {:>5}", entry.date, entry.subject, entry.score);
                shown += 1;
            }
            if shown == 0 {
                println!("  no scores recorded");
            }
        }
    }
    Ok(())
}

/// Handle the settings command
pub fn handle_settings(patch: SettingsPatch, store: &mut Store) -> Result<(), CliError> {
    let settings = if patch == SettingsPatch::default() {
        store.settings()
    } else {
        store.update_settings(&patch)?
    };
    println!("Dark mode:   {}", if settings.dark_mode { "on" } else { "off" });
    println!("Theme color: {}", settings.theme_color.as_str());
    Ok(())
}

/// Handle the export command
pub fn handle_export(
    path: Option<PathBuf>,
    backup_dir: &Path,
    store: &Store,
    today: NaiveDate,
) -> Result<(), CliError> {
    let path = path.unwrap_or_else(|| backup_dir.join(backup::default_file_name(today)));
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| CliError::IoError {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }
    let json = store.export_backup().to_json()?;
    fs::write(&path, json).map_err(|source| CliError::IoError {
        path: path.clone(),
        source,
    })?;
    println!("Backup written to {}", path.display());
    Ok(())
}

/// Handle the import command
pub fn handle_import(path: &Path, store: &mut Store, today: NaiveDate) -> Result<(), CliError> {
    let text = fs::read_to_string(path).map_err(|source| CliError::IoError {
        path: path.to_path_buf(),
        source,
    })?;
    match store.import_backup(&text, today) {
        Ok(summary) => {
            println!("Backup restored from {}", path.display());
            if let Some(n) = summary.items {
                println!("  records:      {}", n);
            }
            if let Some(n) = summary.scores {
                println!("  scores:       {}", n);
            }
            if summary.settings {
                println!("  settings:     merged");
            }
            if let Some(n) = summary.achievements {
                println!("  achievements: {}", n);
            }
            Ok(())
        }
        Err(e) => {
            println!("Restore failed; nothing was changed. Check the file format.");
            Err(e.into())
        }
    }
}
