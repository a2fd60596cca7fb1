use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Study,
    Review,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Study => "study",
            Self::Review => "review",
        }
    }
}

/// Position of a review in the spaced-repetition sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStage {
    SameDay,
    NextDay,
    OneWeek,
    OneMonth,
}

impl ReviewStage {
    pub const ALL: [ReviewStage; 4] = [
        ReviewStage::SameDay,
        ReviewStage::NextDay,
        ReviewStage::OneWeek,
        ReviewStage::OneMonth,
    ];

    /// Days between the study session and this review
    pub fn offset_days(&self) -> i64 {
        match self {
            Self::SameDay => 0,
            Self::NextDay => 1,
            Self::OneWeek => 7,
            Self::OneMonth => 28,
        }
    }

    /// Human readable label, also matched by list search queries
    pub fn label(&self) -> &'static str {
        match self {
            Self::SameDay => "same day",
            Self::NextDay => "next day",
            Self::OneWeek => "1 week",
            Self::OneMonth => "1 month",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pending,
    Done,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Done => "done",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            Self::Pending => Self::Done,
            Self::Done => Self::Pending,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyRecord {
    pub id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    pub kind: RecordKind,
    #[serde(default)]
    pub stage: Option<ReviewStage>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub resource: String,
    #[serde(default)]
    pub range: String,
    #[serde(default)]
    pub priority: Priority,
    pub created_date: NaiveDate,
    #[serde(default)]
    pub due_date: Option<NaiveDate>, // absent in some imported data
    pub status: Status,
}

impl StudyRecord {
    /// Create a study record for a session held on `date`
    pub fn new_study(input: &NewStudyInput, date: NaiveDate) -> Self {
        Self {
            id: new_record_id(),
            parent_id: None,
            kind: RecordKind::Study,
            stage: None,
            subject: input.subject.trim().to_string(),
            resource: input.resource.trim().to_string(),
            range: input.range.trim().to_string(),
            priority: input.priority,
            created_date: date,
            due_date: Some(date),
            status: Status::Done,
        }
    }

    /// Due date, falling back to the creation date when none was recorded
    pub fn due(&self) -> NaiveDate {
        self.due_date.unwrap_or(self.created_date)
    }

    pub fn is_done(&self) -> bool {
        self.status == Status::Done
    }

    pub fn is_review(&self) -> bool {
        self.kind == RecordKind::Review
    }

    pub fn stage_label(&self) -> &'static str {
        self.stage.map(|s| s.label()).unwrap_or("")
    }

    /// Apply the non-empty fields of a patch
    pub fn apply(&mut self, patch: &RecordPatch) {
        if let Some(ref subject) = patch.subject {
            self.subject = subject.trim().to_string();
        }
        if let Some(ref resource) = patch.resource {
            self.resource = resource.trim().to_string();
        }
        if let Some(ref range) = patch.range {
            self.range = range.trim().to_string();
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(due) = patch.due_date {
            self.due_date = Some(due);
        }
    }
}

/// Generate a fresh opaque record id
pub fn new_record_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Fields entered when logging a study session
#[derive(Debug, Clone, Default)]
pub struct NewStudyInput {
    pub subject: String,
    pub resource: String,
    pub range: String,
    pub priority: Priority,
}

impl NewStudyInput {
    pub fn new(subject: impl Into<String>, resource: impl Into<String>, range: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            resource: resource.into(),
            range: range.into(),
            priority: Priority::default(),
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Subject, resource and range are all required
    pub fn is_complete(&self) -> bool {
        !self.subject.trim().is_empty()
            && !self.resource.trim().is_empty()
            && !self.range.trim().is_empty()
    }
}

/// Editable fields of an existing record
#[derive(Debug, Clone, Default)]
pub struct RecordPatch {
    pub subject: Option<String>,
    pub resource: Option<String>,
    pub range: Option<String>,
    pub priority: Option<Priority>,
    pub due_date: Option<NaiveDate>,
}

impl RecordPatch {
    pub fn is_empty(&self) -> bool {
        self.subject.is_none()
            && self.resource.is_none()
            && self.range.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ThemeColor {
    #[default]
    Zinc,
    Blue,
    Green,
}

impl ThemeColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Zinc => "zinc",
            Self::Blue => "blue",
            Self::Green => "green",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub dark_mode: bool,
    #[serde(default)]
    pub theme_color: ThemeColor,
}

/// Partial settings, shallow-merged over the current ones
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(default)]
    pub dark_mode: Option<bool>,
    #[serde(default)]
    pub theme_color: Option<ThemeColor>,
}

impl Settings {
    pub fn merge(&mut self, patch: &SettingsPatch) {
        if let Some(dark) = patch.dark_mode {
            self.dark_mode = dark;
        }
        if let Some(theme) = patch.theme_color {
            self.theme_color = theme;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub subject: String,
    pub date: NaiveDate,
    pub score: f64,
}

impl ScoreEntry {
    pub fn new(subject: String, date: NaiveDate, score: f64) -> Self {
        Self { subject, date, score }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn record_serializes_with_camel_case_keys() {
        let input = NewStudyInput::new("Math", "Textbook", "p.10-20");
        let record = StudyRecord::new_study(&input, date("2024-01-10"));
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["kind"], "study");
        assert_eq!(value["createdDate"], "2024-01-10");
        assert_eq!(value["dueDate"], "2024-01-10");
        assert_eq!(value["priority"], "medium");
        assert_eq!(value["status"], "done");
        assert!(value["parentId"].is_null());
    }

    #[test]
    fn missing_due_date_falls_back_to_created_date() {
        let json = r#"{"id":"a","kind":"review","stage":"next_day","subject":"Math",
            "createdDate":"2024-03-01","status":"pending"}"#;
        let record: StudyRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.due(), date("2024-03-01"));
        assert_eq!(record.priority, Priority::Medium);
    }

    #[test]
    fn incomplete_input_is_detected() {
        assert!(NewStudyInput::new("Math", "Book", "ch1").is_complete());
        assert!(!NewStudyInput::new("Math", "  ", "ch1").is_complete());
        assert!(!NewStudyInput::new("", "Book", "ch1").is_complete());
    }

    #[test]
    fn settings_merge_only_touches_present_fields() {
        let mut settings = Settings { dark_mode: true, theme_color: ThemeColor::Blue };
        settings.merge(&SettingsPatch { dark_mode: None, theme_color: Some(ThemeColor::Green) });
        assert!(settings.dark_mode);
        assert_eq!(settings.theme_color, ThemeColor::Green);
    }

    #[test]
    fn patch_updates_selected_fields() {
        let input = NewStudyInput::new("Math", "Textbook", "p.1");
        let mut record = StudyRecord::new_study(&input, date("2024-01-10"));
        record.apply(&RecordPatch {
            range: Some("p.2".to_string()),
            due_date: Some(date("2024-01-12")),
            ..Default::default()
        });
        assert_eq!(record.subject, "Math");
        assert_eq!(record.range, "p.2");
        assert_eq!(record.due(), date("2024-01-12"));
    }
}
