/// Question Validator / Normalizer
///
/// Checks one [`QuestionDraft`] for completeness given its type and hands
/// back a normalized copy, or one [`FieldError`] per offending field.
///
/// ## Modes:
/// - `Lenient`: file uploads and publish-time checks. Blank-bodied records
///   were already dropped by the parser and are not looked at again.
/// - `Strict`: manual entry. Any record with a blank input or output is an
///   error the author has to fix.
///
/// ## Reporting:
/// Each field reports only the first rule it broke. Every offending field is
/// reported, in a fixed order (marks, then the type-specific fields).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{QuestionDraft, QuestionType, TestCaseBundle, TestCaseRecord, Visibility};

/// One problem with one form field
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{field}: {message}")]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    #[default]
    Lenient,
    Strict,
}

/// Validate a draft and return its normalized form
pub fn validate(
    question: &QuestionDraft,
    mode: ValidationMode,
) -> Result<QuestionDraft, Vec<FieldError>> {
    let mut errors = Vec::new();

    if question.marks < 1 {
        errors.push(FieldError::new("marks", "marks must be at least 1"));
    }

    match question.kind {
        QuestionType::Mcq => errors.extend(check_options(question)),
        QuestionType::Descriptive => {
            if question.expected_word_count == Some(0) {
                errors.push(FieldError::new(
                    "expectedWordCount",
                    "expected word count must be at least 1",
                ));
            }
        }
        QuestionType::Code => {
            errors.extend(check_code(question, mode));
            errors.extend(check_limits(question));
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(normalize(question, mode))
}

/// Language and test-case requirements of a CODE question
///
/// Lenient mode covers exactly "has a language" and "has at least one
/// visible and one hidden record".
pub fn check_code(question: &QuestionDraft, mode: ValidationMode) -> Vec<FieldError> {
    let mut errors = Vec::new();

    let has_language = question
        .code_language
        .as_deref()
        .map(|lang| !lang.trim().is_empty())
        .unwrap_or(false);
    if !has_language {
        errors.push(FieldError::new(
            "codeLanguage",
            "a programming language is required",
        ));
    }

    let empty = TestCaseBundle::default();
    let bundle = question.testcases.as_ref().unwrap_or(&empty);
    for (section, records) in [
        (Visibility::Visible, &bundle.visible),
        (Visibility::Hidden, &bundle.hidden),
    ] {
        if let Some(err) = check_records(section, records, mode) {
            errors.push(err);
        }
    }

    errors
}

fn check_records(
    section: Visibility,
    records: &[TestCaseRecord],
    mode: ValidationMode,
) -> Option<FieldError> {
    let field = format!("testcases.{}", section_name(section));

    if records.is_empty() {
        return Some(FieldError::new(
            field,
            format!("at least one {} test case is required", section_name(section)),
        ));
    }

    if mode == ValidationMode::Strict {
        let blank = records
            .iter()
            .enumerate()
            .find_map(|(idx, record)| record.blank_side().map(|side| (idx, side)));
        if let Some((idx, side)) = blank {
            return Some(FieldError::new(
                field,
                format!("{} test case {} has an empty {}", section_name(section), idx + 1, side),
            ));
        }
    }

    None
}

fn section_name(section: Visibility) -> &'static str {
    match section {
        Visibility::Visible => "visible",
        Visibility::Hidden => "hidden",
    }
}

fn check_limits(question: &QuestionDraft) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if question.time_limit_ms == Some(0) {
        errors.push(FieldError::new("time_limit_ms", "time limit must be at least 1 ms"));
    }
    if question.memory_limit_mb == Some(0) {
        errors.push(FieldError::new("memory_limit_mb", "memory limit must be at least 1 MB"));
    }
    errors
}

fn check_options(question: &QuestionDraft) -> Option<FieldError> {
    let options = question.options.as_deref().unwrap_or_default();
    options
        .iter()
        .position(|opt| opt.text.trim().is_empty())
        .map(|idx| FieldError::new("options", format!("option {} has no text", idx + 1)))
}

fn normalize(question: &QuestionDraft, mode: ValidationMode) -> QuestionDraft {
    let mut normalized = question.clone();
    normalized.strip_foreign_fields();

    normalized.code_language = normalized
        .code_language
        .map(|lang| lang.trim().to_string());
    normalized.constraints = normalized
        .constraints
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());

    if let Some(options) = normalized.options.as_mut() {
        for opt in options.iter_mut() {
            opt.text = opt.text.trim().to_string();
        }
    }

    if mode == ValidationMode::Strict {
        if let Some(bundle) = normalized.testcases.as_mut() {
            for record in bundle.visible.iter_mut().chain(bundle.hidden.iter_mut()) {
                *record = TestCaseRecord::new(record.input.trim(), record.expected_output.trim());
            }
        }
    }

    normalized
}

/// Non-blocking recommendations for the authoring form
pub fn advisories(question: &QuestionDraft) -> Vec<FieldError> {
    let mut hints = Vec::new();

    if question.kind == QuestionType::Mcq {
        let option_count = question.options.as_ref().map(Vec::len).unwrap_or(0);
        if option_count < 2 {
            hints.push(FieldError::new("options", "at least two options are recommended"));
        }
        if question.correct_option_count() == 0 {
            hints.push(FieldError::new(
                "options",
                "no option is marked correct; the test cannot be published until one is",
            ));
        }
    }

    hints
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::McqOption;

    fn code_question(visible: Vec<TestCaseRecord>, hidden: Vec<TestCaseRecord>) -> QuestionDraft {
        let mut q = QuestionDraft::new(QuestionType::Code, 10);
        q.code_language = Some("python".to_string());
        q.attach_bundle(TestCaseBundle::new(visible, hidden));
        q
    }

    fn fields(errors: &[FieldError]) -> Vec<&str> {
        errors.iter().map(|e| e.field.as_str()).collect()
    }

    #[test]
    fn test_complete_code_question_passes() {
        let q = code_question(
            vec![TestCaseRecord::new("5 3", "8")],
            vec![TestCaseRecord::new("100 200", "300")],
        );
        let validated = validate(&q, ValidationMode::Lenient).unwrap();
        assert_eq!(validated.testcases, q.testcases);
    }

    #[test]
    fn test_code_requires_language() {
        let mut q = code_question(
            vec![TestCaseRecord::new("1", "1")],
            vec![TestCaseRecord::new("2", "2")],
        );
        q.code_language = Some("   ".to_string());

        let errors = validate(&q, ValidationMode::Lenient).unwrap_err();
        assert_eq!(fields(&errors), vec!["codeLanguage"]);
    }

    #[test]
    fn test_code_requires_both_sections() {
        let q = code_question(vec![], vec![]);
        let errors = validate(&q, ValidationMode::Lenient).unwrap_err();
        assert_eq!(fields(&errors), vec!["testcases.visible", "testcases.hidden"]);
        assert_eq!(errors[0].message, "at least one visible test case is required");
    }

    #[test]
    fn test_code_without_bundle() {
        let mut q = QuestionDraft::new(QuestionType::Code, 1);
        q.code_language = Some("java".to_string());
        let errors = validate(&q, ValidationMode::Lenient).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_blank_record_lenient_vs_strict() {
        let q = code_question(
            vec![TestCaseRecord::new("1", "1"), TestCaseRecord::new("  ", "2")],
            vec![TestCaseRecord::new("3", "")],
        );

        assert!(validate(&q, ValidationMode::Lenient).is_ok());

        let errors = validate(&q, ValidationMode::Strict).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].message, "visible test case 2 has an empty input");
        assert_eq!(errors[1].message, "hidden test case 1 has an empty expected output");
    }

    #[test]
    fn test_strict_trims_record_bodies() {
        let q = code_question(
            vec![TestCaseRecord::new(" 1 2 \n", "3\n")],
            vec![TestCaseRecord::new("4", "4")],
        );
        let validated = validate(&q, ValidationMode::Strict).unwrap();
        let bundle = validated.testcases.unwrap();
        assert_eq!(bundle.visible[0], TestCaseRecord::new("1 2", "3"));
    }

    #[test]
    fn test_one_error_per_field() {
        let mut q = code_question(vec![], vec![TestCaseRecord::new("1", "1")]);
        q.marks = 0;
        q.code_language = None;
        q.time_limit_ms = Some(0);

        let errors = validate(&q, ValidationMode::Strict).unwrap_err();
        assert_eq!(
            fields(&errors),
            vec!["marks", "codeLanguage", "testcases.visible", "time_limit_ms"]
        );
    }

    #[test]
    fn test_mcq_draft_without_correct_option_is_valid() {
        let mut q = QuestionDraft::new(QuestionType::Mcq, 2);
        q.options = Some(vec![McqOption::new("A", false), McqOption::new("B", false)]);

        assert!(validate(&q, ValidationMode::Lenient).is_ok());
        assert!(validate(&q, ValidationMode::Strict).is_ok());
    }

    #[test]
    fn test_mcq_blank_option_text() {
        let mut q = QuestionDraft::new(QuestionType::Mcq, 2);
        q.options = Some(vec![McqOption::new("A", true), McqOption::new(" ", false)]);

        let errors = validate(&q, ValidationMode::Lenient).unwrap_err();
        assert_eq!(errors, vec![FieldError::new("options", "option 2 has no text")]);
    }

    #[test]
    fn test_descriptive_word_count() {
        let mut q = QuestionDraft::new(QuestionType::Descriptive, 5);
        assert!(validate(&q, ValidationMode::Lenient).is_ok());

        q.expected_word_count = Some(0);
        let errors = validate(&q, ValidationMode::Lenient).unwrap_err();
        assert_eq!(fields(&errors), vec!["expectedWordCount"]);

        q.expected_word_count = Some(250);
        assert!(validate(&q, ValidationMode::Lenient).is_ok());
    }

    #[test]
    fn test_marks_must_be_positive() {
        let q = QuestionDraft::new(QuestionType::Descriptive, 0);
        let errors = validate(&q, ValidationMode::Lenient).unwrap_err();
        assert_eq!(errors[0].to_string(), "marks: marks must be at least 1");
    }

    #[test]
    fn test_normalization() {
        let mut q = QuestionDraft::new(QuestionType::Mcq, 1);
        q.options = Some(vec![McqOption::new("  yes ", true), McqOption::new("no", false)]);
        q.constraints = Some("   ".to_string());
        q.code_language = Some("rust".to_string());

        let normalized = validate(&q, ValidationMode::Lenient).unwrap();
        let options = normalized.options.unwrap();
        assert_eq!(options[0].text, "yes");
        assert!(normalized.constraints.is_none());
        assert!(normalized.code_language.is_none());
    }

    #[test]
    fn test_mcq_advisories() {
        let mut q = QuestionDraft::new(QuestionType::Mcq, 1);
        q.options = Some(vec![McqOption::new("only", false)]);
        assert_eq!(advisories(&q).len(), 2);

        q.options = Some(vec![McqOption::new("a", true), McqOption::new("b", false)]);
        assert!(advisories(&q).is_empty());

        assert!(advisories(&QuestionDraft::new(QuestionType::Code, 1)).is_empty());
    }
}
