/// Publication Gate
///
/// **Core Responsibility:**
/// Decide whether a [`Test`] may move from DRAFT to PUBLISHED, and police
/// what may change once it has.
///
/// **Lifecycle:**
/// ```text
/// DRAFT --publish--> PUBLISHED
/// ```
/// There is no transition back. Every function here takes the test by
/// reference and returns a new value, so a failed call leaves the caller's
/// copy exactly as it was.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::types::{QuestionType, Test, TestPatch, TestStatus};
use crate::validator::{self, FieldError, ValidationMode};

/// Fields that stay editable after publication
pub const PUBLISHED_MUTABLE_FIELDS: [&str; 5] = [
    "startDate",
    "endDate",
    "shuffleQuestions",
    "showResults",
    "showCorrectAnswers",
];

/// Why a test could not be published
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PublishError {
    #[error("test is already published")]
    AlreadyPublished,

    #[error("a test needs at least one question before it can be published")]
    NoQuestions,

    #[error("{} multiple-choice question(s) have no correct option", .question_ids.len())]
    MissingCorrectAnswers { question_ids: Vec<Uuid> },

    #[error("code question {question_id} is incomplete: {reason}")]
    IncompleteCodeQuestion { question_id: Uuid, reason: String },

    #[error("question {question_id} has invalid fields: {}", join_errors(.errors))]
    InvalidQuestion {
        question_id: Uuid,
        errors: Vec<FieldError>,
    },
}

fn join_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Rejected patch against a published test
///
/// A published-test edit screen never offers frozen fields, so seeing this
/// means the UI and the gate disagree.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "field", rename_all = "snake_case")]
pub enum EditError {
    #[error("field '{0}' cannot be changed after the test is published")]
    FieldFrozen(String),
}

/// DRAFT -> PUBLISHED
///
/// ## Check order:
/// 1. not already published
/// 2. at least one question
/// 3. every MCQ has a correct option (all offenders reported together)
/// 4. every CODE question has a language and visible + hidden test cases
/// 5. every question passes lenient validation
pub fn publish(test: &Test) -> Result<Test, PublishError> {
    if test.status == TestStatus::Published {
        return Err(PublishError::AlreadyPublished);
    }

    if test.questions.is_empty() {
        return Err(PublishError::NoQuestions);
    }

    let missing: Vec<Uuid> = test
        .questions
        .iter()
        .filter(|q| q.kind == QuestionType::Mcq && q.correct_option_count() == 0)
        .map(|q| q.id)
        .collect();
    if !missing.is_empty() {
        return Err(PublishError::MissingCorrectAnswers {
            question_ids: missing,
        });
    }

    for question in test.questions.iter().filter(|q| q.kind == QuestionType::Code) {
        let problems = validator::check_code(question, ValidationMode::Lenient);
        if let Some(first) = problems.into_iter().next() {
            return Err(PublishError::IncompleteCodeQuestion {
                question_id: question.id,
                reason: first.message,
            });
        }
    }

    for question in &test.questions {
        if let Err(errors) = validator::validate(question, ValidationMode::Lenient) {
            return Err(PublishError::InvalidQuestion {
                question_id: question.id,
                errors,
            });
        }
    }

    let mut published = test.clone();
    published.status = TestStatus::Published;
    Ok(published)
}

/// Apply a partial update, refusing frozen fields on a published test
pub fn apply_edit(test: &Test, patch: &TestPatch) -> Result<Test, EditError> {
    if test.is_published() {
        if let Some(frozen) = patch
            .keys()
            .into_iter()
            .find(|key| !PUBLISHED_MUTABLE_FIELDS.contains(key))
        {
            return Err(EditError::FieldFrozen(frozen.to_string()));
        }
    }

    let mut edited = test.clone();
    patch.apply_to(&mut edited);
    Ok(edited)
}

/// Whether a delete action may be offered for this test right now
///
/// A published test that has not ended yet cannot be deleted.
pub fn can_delete(test: &Test, now: DateTime<Utc>) -> bool {
    !(test.is_published() && test.end_date > now)
}

/// Form-level sanity checks on the test settings
///
/// Not consulted by [`publish`] or [`apply_edit`].
pub fn check_settings(test: &Test) -> Result<(), Vec<FieldError>> {
    let mut errors = Vec::new();

    if test.title.trim().is_empty() {
        errors.push(FieldError::new("title", "title is required"));
    }
    if test.duration_in_minutes == 0 {
        errors.push(FieldError::new(
            "durationInMinutes",
            "duration must be at least 1 minute",
        ));
    }
    if test.passing_marks > test.max_marks {
        errors.push(FieldError::new(
            "passingMarks",
            "passing marks cannot exceed maximum marks",
        ));
    }
    if test.end_date <= test.start_date {
        errors.push(FieldError::new("endDate", "end date must be after start date"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{McqOption, QuestionDraft, TestCaseBundle, TestCaseRecord};
    use chrono::Duration;

    fn draft_test(questions: Vec<QuestionDraft>) -> Test {
        let start = Utc::now();
        let mut test = Test::new_draft("Arrays quiz", start, start + Duration::days(7));
        test.max_marks = 30;
        test.passing_marks = 12;
        test.duration_in_minutes = 60;
        test.questions = questions;
        test
    }

    fn mcq(correct: bool) -> QuestionDraft {
        let mut q = QuestionDraft::new(QuestionType::Mcq, 5);
        q.options = Some(vec![McqOption::new("O(n)", correct), McqOption::new("O(1)", false)]);
        q
    }

    fn code(visible: Vec<TestCaseRecord>, hidden: Vec<TestCaseRecord>) -> QuestionDraft {
        let mut q = QuestionDraft::new(QuestionType::Code, 20);
        q.code_language = Some("python".to_string());
        q.attach_bundle(TestCaseBundle::new(visible, hidden));
        q
    }

    fn complete_code() -> QuestionDraft {
        code(
            vec![TestCaseRecord::new("5 3", "8")],
            vec![TestCaseRecord::new("100 200", "300")],
        )
    }

    #[test]
    fn test_publish_happy_path() {
        let test = draft_test(vec![mcq(true), complete_code()]);
        let published = publish(&test).unwrap();

        assert_eq!(published.status, TestStatus::Published);
        assert_eq!(published.questions, test.questions);
        assert_eq!(test.status, TestStatus::Draft);
    }

    #[test]
    fn test_publish_requires_questions() {
        let test = draft_test(vec![]);
        assert_eq!(publish(&test), Err(PublishError::NoQuestions));
    }

    #[test]
    fn test_publish_reports_all_mcqs_without_answers() {
        let first = mcq(false);
        let second = mcq(false);
        let test = draft_test(vec![first.clone(), mcq(true), second.clone()]);

        let err = publish(&test).unwrap_err();
        assert_eq!(
            err,
            PublishError::MissingCorrectAnswers {
                question_ids: vec![first.id, second.id]
            }
        );
        assert_eq!(test.status, TestStatus::Draft);
    }

    #[test]
    fn test_mcq_check_runs_before_code_check() {
        let bad_mcq = mcq(false);
        let test = draft_test(vec![code(vec![], vec![]), bad_mcq.clone()]);

        match publish(&test) {
            Err(PublishError::MissingCorrectAnswers { question_ids }) => {
                assert_eq!(question_ids, vec![bad_mcq.id]);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_code_question_needs_visible_cases() {
        let question = code(vec![], vec![TestCaseRecord::new("1 1", "2")]);
        let mut test = draft_test(vec![mcq(true), question.clone()]);

        let err = publish(&test).unwrap_err();
        assert_eq!(
            err,
            PublishError::IncompleteCodeQuestion {
                question_id: question.id,
                reason: "at least one visible test case is required".to_string(),
            }
        );

        // fixing the bundle makes the same test publishable
        test.questions[1].attach_bundle(TestCaseBundle::new(
            vec![TestCaseRecord::new("2 3", "5")],
            vec![TestCaseRecord::new("1 1", "2")],
        ));
        assert!(publish(&test).is_ok());
    }

    #[test]
    fn test_code_question_needs_language() {
        let mut question = complete_code();
        question.code_language = None;
        let test = draft_test(vec![question.clone()]);

        match publish(&test) {
            Err(PublishError::IncompleteCodeQuestion { question_id, reason }) => {
                assert_eq!(question_id, question.id);
                assert_eq!(reason, "a programming language is required");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_blank_records_do_not_block_publish() {
        let question = code(
            vec![TestCaseRecord::new("1", "1"), TestCaseRecord::new("", "2")],
            vec![TestCaseRecord::new("3", "3")],
        );
        assert!(publish(&draft_test(vec![question])).is_ok());
    }

    #[test]
    fn test_invalid_question_blocks_publish() {
        let mut essay = QuestionDraft::new(QuestionType::Descriptive, 0);
        essay.expected_word_count = Some(100);
        let test = draft_test(vec![essay.clone()]);

        match publish(&test) {
            Err(PublishError::InvalidQuestion { question_id, errors }) => {
                assert_eq!(question_id, essay.id);
                assert_eq!(errors[0].field, "marks");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_republish_is_rejected() {
        let published = publish(&draft_test(vec![mcq(true)])).unwrap();
        assert_eq!(publish(&published), Err(PublishError::AlreadyPublished));
    }

    #[test]
    fn test_published_title_is_frozen() {
        let published = publish(&draft_test(vec![mcq(true)])).unwrap();

        let patch = TestPatch {
            title: Some("x".to_string()),
            ..Default::default()
        };
        assert_eq!(
            apply_edit(&published, &patch),
            Err(EditError::FieldFrozen("title".to_string()))
        );
    }

    #[test]
    fn test_published_schedule_is_editable() {
        let published = publish(&draft_test(vec![mcq(true)])).unwrap();
        let new_end = published.end_date + Duration::days(3);

        let patch = TestPatch {
            end_date: Some(new_end),
            show_results: Some(true),
            ..Default::default()
        };
        let edited = apply_edit(&published, &patch).unwrap();

        assert_eq!(edited.end_date, new_end);
        assert!(edited.show_results);
        assert_eq!(edited.status, TestStatus::Published);
    }

    #[test]
    fn test_first_frozen_key_is_reported() {
        let published = publish(&draft_test(vec![mcq(true)])).unwrap();
        let patch = TestPatch {
            start_date: Some(Utc::now()),
            passing_marks: Some(1),
            questions: Some(vec![]),
            ..Default::default()
        };
        assert_eq!(
            apply_edit(&published, &patch),
            Err(EditError::FieldFrozen("passingMarks".to_string()))
        );
    }

    #[test]
    fn test_draft_accepts_any_field() {
        let test = draft_test(vec![]);
        let patch = TestPatch {
            title: Some("Renamed".to_string()),
            max_marks: Some(50),
            questions: Some(vec![mcq(true)]),
            ..Default::default()
        };
        let edited = apply_edit(&test, &patch).unwrap();

        assert_eq!(edited.title, "Renamed");
        assert_eq!(edited.max_marks, 50);
        assert_eq!(edited.questions.len(), 1);
        assert_eq!(test.title, "Arrays quiz");
    }

    #[test]
    fn test_empty_patch_is_noop() {
        let published = publish(&draft_test(vec![mcq(true)])).unwrap();
        assert_eq!(apply_edit(&published, &TestPatch::default()), Ok(published.clone()));
    }

    #[test]
    fn test_can_delete() {
        let now = Utc::now();
        let mut published = publish(&draft_test(vec![mcq(true)])).unwrap();

        published.end_date = now + Duration::hours(1);
        assert!(!can_delete(&published, now));

        published.end_date = now - Duration::hours(1);
        assert!(can_delete(&published, now));

        let mut draft = draft_test(vec![]);
        draft.end_date = now + Duration::hours(1);
        assert!(can_delete(&draft, now));
    }

    #[test]
    fn test_check_settings() {
        assert!(check_settings(&draft_test(vec![])).is_ok());

        let mut test = draft_test(vec![]);
        test.title = " ".to_string();
        test.passing_marks = 40;
        test.end_date = test.start_date;

        let errors = check_settings(&test).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["title", "passingMarks", "endDate"]);
    }

    #[test]
    fn test_error_serialization() {
        let err = PublishError::IncompleteCodeQuestion {
            question_id: Uuid::nil(),
            reason: "a programming language is required".to_string(),
        };
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["kind"], "incomplete_code_question");
        assert_eq!(value["reason"], "a programming language is required");

        let edit = serde_json::to_value(EditError::FieldFrozen("title".to_string())).unwrap();
        assert_eq!(edit, serde_json::json!({"kind": "field_frozen", "field": "title"}));

        let none = serde_json::to_value(PublishError::NoQuestions).unwrap();
        assert_eq!(none, serde_json::json!({"kind": "no_questions"}));
    }
}
