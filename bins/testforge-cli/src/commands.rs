// CLI commands for testforge
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use testforge_common::gate;
use testforge_common::parser::{self, FileFormat};
use testforge_common::validator::{self, FieldError, ValidationMode};
use testforge_common::{QuestionDraft, Test, TestCaseBundle, TestPatch};
use tokio::fs;

/// Read a JSON document from disk into `T`
async fn load_json<T: DeserializeOwned>(path: &str) -> Result<T> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path))
}

/// Print to stdout, or write to `output` when given
async fn emit(content: &str, output: Option<&str>) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, content)
                .await
                .with_context(|| format!("Failed to write {}", path))?;
            eprintln!("📝 Wrote {}", path);
        }
        None => println!("{}", content),
    }
    Ok(())
}

async fn emit_json<T: Serialize>(value: &T, output: Option<&str>) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize result")?;
    emit(&json, output).await
}

/// Explicit format wins, otherwise guess from the file name
fn detect_format(path: &str, explicit: Option<FileFormat>) -> FileFormat {
    explicit.unwrap_or_else(|| {
        let name = Path::new(path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(path);
        FileFormat::from_file_name(name)
    })
}

/// One line per field error, ready for the terminal
fn format_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("\n")
}

async fn load_bundle(path: &str, format: FileFormat) -> Result<TestCaseBundle> {
    let bytes = fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path))?;
    parser::parse_bytes(&bytes, format)
        .with_context(|| format!("Failed to parse {} as {}", path, format))
}

/// Parse an uploaded test case file and print the bundle
pub async fn parse_file(path: &str, format: Option<FileFormat>) -> Result<()> {
    let format = detect_format(path, format);
    eprintln!("🔍 Parsing {} as {}...", path, format);

    let bundle = load_bundle(path, format).await?;

    eprintln!(
        "✅ {} visible, {} hidden test case(s)",
        bundle.visible.len(),
        bundle.hidden.len()
    );
    emit_json(&bundle, None).await
}

/// Convert a test case file between formats
pub async fn convert_file(
    path: &str,
    from: Option<FileFormat>,
    to: FileFormat,
    output: Option<&str>,
) -> Result<()> {
    let from = detect_format(path, from);
    let bundle = load_bundle(path, from).await?;

    let rendered = parser::render(&bundle, to).context("Failed to render bundle")?;
    eprintln!("🔁 Converted {} test case(s) from {} to {}", bundle.len(), from, to);
    emit(rendered.trim_end(), output).await
}

/// Validate a question draft and print the normalized form
pub async fn validate_question(path: &str, strict: bool) -> Result<()> {
    let question: QuestionDraft = load_json(path).await?;
    let mode = if strict {
        ValidationMode::Strict
    } else {
        ValidationMode::Lenient
    };

    match validator::validate(&question, mode) {
        Ok(normalized) => {
            eprintln!("✅ Question {} ({}) is valid", normalized.id, normalized.kind);
            let hints = validator::advisories(&normalized);
            if !hints.is_empty() {
                eprintln!("💡 Recommendations:\n{}", format_field_errors(&hints));
            }
            emit_json(&normalized, None).await
        }
        Err(errors) => bail!(
            "Question {} failed validation:\n{}",
            question.id,
            format_field_errors(&errors)
        ),
    }
}

/// Publish a draft test
pub async fn publish_test(path: &str, output: Option<&str>) -> Result<()> {
    let test: Test = load_json(path).await?;
    eprintln!("🚀 Publishing '{}' ({} question(s))...", test.title, test.questions.len());

    let published = gate::publish(&test).with_context(|| format!("Cannot publish '{}'", test.title))?;

    eprintln!("✅ '{}' is now published", published.title);
    emit_json(&published, output).await
}

/// Apply a patch to a test
pub async fn edit_test(test_path: &str, patch_path: &str, output: Option<&str>) -> Result<()> {
    let test: Test = load_json(test_path).await?;
    let patch: TestPatch = load_json(patch_path).await?;

    if patch.is_empty() {
        eprintln!("⚠️  Patch sets no fields; test unchanged");
    }

    let edited = gate::apply_edit(&test, &patch)
        .with_context(|| format!("Cannot edit '{}' ({})", test.title, test.status))?;

    eprintln!("✅ Updated: {}", patch.keys().join(", "));
    emit_json(&edited, output).await
}

/// Report whether a test may be deleted at `now`
pub async fn can_delete_test(path: &str, now: DateTime<Utc>) -> Result<()> {
    let test: Test = load_json(path).await?;

    if gate::can_delete(&test, now) {
        println!("✅ '{}' can be deleted", test.title);
    } else {
        println!(
            "⛔ '{}' is published and runs until {}; it cannot be deleted yet",
            test.title, test.end_date
        );
    }
    Ok(())
}

/// Check the settings of a test
pub async fn check_test(path: &str) -> Result<()> {
    let test: Test = load_json(path).await?;

    match gate::check_settings(&test) {
        Ok(()) => {
            println!("✅ Settings of '{}' look good", test.title);
            Ok(())
        }
        Err(errors) => bail!(
            "Settings of '{}' need attention:\n{}",
            test.title,
            format_field_errors(&errors)
        ),
    }
}
