use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Test Case Definition (Immutable Input)
/// Records are immutable once created - equality is structural
/// Ordering matters - it is the order a grader runs them in
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TestCaseRecord {
    pub input: String,
    #[serde(alias = "output")]
    pub expected_output: String,
}

impl TestCaseRecord {
    pub fn new(input: impl Into<String>, expected_output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            expected_output: expected_output.into(),
        }
    }

    /// The first side that is empty after trimming, if any
    pub fn blank_side(&self) -> Option<&'static str> {
        if self.input.trim().is_empty() {
            Some("input")
        } else if self.expected_output.trim().is_empty() {
            Some("expected output")
        } else {
            None
        }
    }
}

/// Paired visible/hidden test-case lists attached to one coding question
///
/// Duplicates are legal and order is preserved. A bundle belongs to exactly
/// one question; attaching a new one discards the old one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCaseBundle {
    #[serde(default)]
    pub visible: Vec<TestCaseRecord>,
    #[serde(default)]
    pub hidden: Vec<TestCaseRecord>,
}

impl TestCaseBundle {
    pub fn new(visible: Vec<TestCaseRecord>, hidden: Vec<TestCaseRecord>) -> Self {
        Self { visible, hidden }
    }

    pub fn len(&self) -> usize {
        self.visible.len() + self.hidden.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visible.is_empty() && self.hidden.is_empty()
    }

    /// Visible records first, then hidden
    pub fn records(&self) -> impl Iterator<Item = &TestCaseRecord> {
        self.visible.iter().chain(self.hidden.iter())
    }
}

/// Which of the two lists of a bundle a record lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Visible,
    Hidden,
}

impl Visibility {
    /// Keyword that opens the section in the text format
    pub fn keyword(&self) -> &'static str {
        match self {
            Visibility::Visible => "VISIBLE",
            Visibility::Hidden => "HIDDEN",
        }
    }

    /// Key of the list in the JSON file format
    pub fn json_key(&self) -> &'static str {
        match self {
            Visibility::Visible => "visible_testcases",
            Visibility::Hidden => "hidden_testcases",
        }
    }
}

/// Strongly-typed question kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Mcq,
    Descriptive,
    Code,
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionType::Mcq => write!(f, "mcq"),
            QuestionType::Descriptive => write!(f, "descriptive"),
            QuestionType::Code => write!(f, "code"),
        }
    }
}

/// MCQ answer option, in display order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McqOption {
    pub text: String,
    #[serde(default)]
    pub correct: bool,
}

impl McqOption {
    pub fn new(text: impl Into<String>, correct: bool) -> Self {
        Self {
            text: text.into(),
            correct,
        }
    }
}

/// Question Draft
/// Created empty by an author and mutated by successive edits
///
/// ## Type-specific fields:
/// - `options` only means something for MCQ
/// - `expected_word_count` only for DESCRIPTIVE
/// - `code_language`, `testcases`, `time_limit_ms`, `memory_limit_mb` only for CODE
///
/// `kind` does not change in place; use [`QuestionDraft::change_type`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionDraft {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: QuestionType,
    pub marks: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<McqOption>>,
    #[serde(
        default,
        rename = "expectedWordCount",
        skip_serializing_if = "Option::is_none"
    )]
    pub expected_word_count: Option<u32>,
    #[serde(
        default,
        rename = "codeLanguage",
        skip_serializing_if = "Option::is_none"
    )]
    pub code_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub testcases: Option<TestCaseBundle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_limit_mb: Option<u32>,
}

impl QuestionDraft {
    /// Empty draft with a fresh id
    pub fn new(kind: QuestionType, marks: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            marks,
            options: None,
            expected_word_count: None,
            code_language: None,
            constraints: None,
            testcases: None,
            time_limit_ms: None,
            memory_limit_mb: None,
        }
    }

    /// Replace the attached bundle wholesale, returning the discarded one
    pub fn attach_bundle(&mut self, bundle: TestCaseBundle) -> Option<TestCaseBundle> {
        self.testcases.replace(bundle)
    }

    /// Build a draft of another type, keeping id, marks and constraints
    /// and dropping every field the new type has no use for
    pub fn change_type(&self, kind: QuestionType) -> QuestionDraft {
        let mut changed = self.clone();
        changed.kind = kind;
        changed.strip_foreign_fields();
        changed
    }

    /// Number of options flagged correct (zero when there are no options)
    pub fn correct_option_count(&self) -> usize {
        self.options
            .as_deref()
            .map(|opts| opts.iter().filter(|o| o.correct).count())
            .unwrap_or(0)
    }

    pub(crate) fn strip_foreign_fields(&mut self) {
        if self.kind != QuestionType::Mcq {
            self.options = None;
        }
        if self.kind != QuestionType::Descriptive {
            self.expected_word_count = None;
        }
        if self.kind != QuestionType::Code {
            self.code_language = None;
            self.testcases = None;
            self.time_limit_ms = None;
            self.memory_limit_mb = None;
        }
    }
}

/// Test lifecycle
/// DRAFT -> PUBLISHED is the only transition; there is no way back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Draft,
    Published,
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestStatus::Draft => write!(f, "draft"),
            TestStatus::Published => write!(f, "published"),
        }
    }
}

/// Test aggregate
/// Owns its questions exclusively - no question is shared across tests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Test {
    pub id: Uuid,
    pub status: TestStatus,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub max_marks: u32,
    pub passing_marks: u32,
    pub duration_in_minutes: u32,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default)]
    pub shuffle_questions: bool,
    #[serde(default)]
    pub show_results: bool,
    #[serde(default)]
    pub show_correct_answers: bool,
    #[serde(default)]
    pub questions: Vec<QuestionDraft>,
}

impl Test {
    /// Fresh draft with no questions and all display flags off
    pub fn new_draft(
        title: impl Into<String>,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            status: TestStatus::Draft,
            title: title.into(),
            description: String::new(),
            max_marks: 0,
            passing_marks: 0,
            duration_in_minutes: 0,
            start_date,
            end_date,
            shuffle_questions: false,
            show_results: false,
            show_correct_answers: false,
            questions: Vec::new(),
        }
    }

    pub fn is_published(&self) -> bool {
        self.status == TestStatus::Published
    }
}

/// Partial update of a [`Test`]
///
/// Absent keys are left alone. Field order here is the order in which
/// frozen keys are reported.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TestPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_marks: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passing_marks: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_in_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shuffle_questions: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_results: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_correct_answers: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub questions: Option<Vec<QuestionDraft>>,
}

impl TestPatch {
    /// Serialized names of the keys this patch sets, in declaration order
    pub fn keys(&self) -> Vec<&'static str> {
        let mut keys = Vec::new();
        if self.title.is_some() {
            keys.push("title");
        }
        if self.description.is_some() {
            keys.push("description");
        }
        if self.max_marks.is_some() {
            keys.push("maxMarks");
        }
        if self.passing_marks.is_some() {
            keys.push("passingMarks");
        }
        if self.duration_in_minutes.is_some() {
            keys.push("durationInMinutes");
        }
        if self.start_date.is_some() {
            keys.push("startDate");
        }
        if self.end_date.is_some() {
            keys.push("endDate");
        }
        if self.shuffle_questions.is_some() {
            keys.push("shuffleQuestions");
        }
        if self.show_results.is_some() {
            keys.push("showResults");
        }
        if self.show_correct_answers.is_some() {
            keys.push("showCorrectAnswers");
        }
        if self.questions.is_some() {
            keys.push("questions");
        }
        keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys().is_empty()
    }

    /// Copy every set key onto `test`
    pub(crate) fn apply_to(&self, test: &mut Test) {
        if let Some(title) = &self.title {
            test.title = title.clone();
        }
        if let Some(description) = &self.description {
            test.description = description.clone();
        }
        if let Some(max_marks) = self.max_marks {
            test.max_marks = max_marks;
        }
        if let Some(passing_marks) = self.passing_marks {
            test.passing_marks = passing_marks;
        }
        if let Some(duration) = self.duration_in_minutes {
            test.duration_in_minutes = duration;
        }
        if let Some(start_date) = self.start_date {
            test.start_date = start_date;
        }
        if let Some(end_date) = self.end_date {
            test.end_date = end_date;
        }
        if let Some(shuffle) = self.shuffle_questions {
            test.shuffle_questions = shuffle;
        }
        if let Some(show_results) = self.show_results {
            test.show_results = show_results;
        }
        if let Some(show_correct) = self.show_correct_answers {
            test.show_correct_answers = show_correct;
        }
        if let Some(questions) = &self.questions {
            test.questions = questions.clone();
        }
    }
}
