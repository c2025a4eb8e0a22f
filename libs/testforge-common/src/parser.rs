/// Test Case Format Parser
///
/// **Core Responsibility:**
/// Turn the content of an uploaded test-case file into a [`TestCaseBundle`].
///
/// **Critical Properties:**
/// - Pure: reads only the content it is handed, no filesystem or network
/// - Knows nothing about question types or publication rules
/// - Never decides whether an empty bundle is acceptable (the validator does)
///
/// Two wire formats are understood: a line-oriented text format and JSON.
/// Saved test cases of unknown shape go through [`coerce_to_bundle`] instead.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::types::{TestCaseBundle, TestCaseRecord, Visibility};

const INPUT_KEYWORD: &str = "INPUT:";
const OUTPUT_KEYWORD: &str = "OUTPUT:";
const MISSING_ARRAYS: &str = "missing or invalid test case arrays";

/// Content could not be turned into a bundle at all
///
/// Always fatal to the ingestion attempt; `reason` is meant to be shown to
/// the author as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{}{}", .reason, line_suffix(.line))]
pub struct MalformedInputError {
    pub reason: String,
    /// 1-based line the problem was found on, when it is known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

impl MalformedInputError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            line: None,
        }
    }

    pub fn at_line(reason: impl Into<String>, line: usize) -> Self {
        Self {
            reason: reason.into(),
            line: Some(line),
        }
    }

    fn missing_arrays() -> Self {
        Self::new(MISSING_ARRAYS)
    }
}

fn line_suffix(line: &Option<usize>) -> String {
    match line {
        Some(n) => format!(" (line {})", n),
        None => String::new(),
    }
}

/// Upload format hint supplied by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Text,
    Json,
}

impl FileFormat {
    /// Guess the format from a file name: `.json` is JSON, anything else text
    pub fn from_file_name(name: &str) -> FileFormat {
        let is_json = name
            .rsplit_once('.')
            .map(|(_, ext)| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        if is_json {
            FileFormat::Json
        } else {
            FileFormat::Text
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileFormat::Text => write!(f, "text"),
            FileFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for FileFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" | "txt" => Ok(FileFormat::Text),
            "json" => Ok(FileFormat::Json),
            other => Err(format!("unknown test case format '{}'", other)),
        }
    }
}

/// Parse file content into a bundle
pub fn parse(content: &str, format: FileFormat) -> Result<TestCaseBundle, MalformedInputError> {
    match format {
        FileFormat::Text => Ok(parse_text(content)),
        FileFormat::Json => parse_json(content),
    }
}

/// Parse raw file bytes, rejecting anything that is not UTF-8
pub fn parse_bytes(bytes: &[u8], format: FileFormat) -> Result<TestCaseBundle, MalformedInputError> {
    let content = std::str::from_utf8(bytes).map_err(|e| {
        let valid = &bytes[..e.valid_up_to()];
        let line = valid.iter().filter(|b| **b == b'\n').count() + 1;
        MalformedInputError::at_line("content is not valid UTF-8 text", line)
    })?;

    parse(content, format)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capture {
    Input,
    Output,
}

/// Single-pass state for the text grammar
#[derive(Default)]
struct TextScanner {
    section: Option<Visibility>,
    mode: Option<Capture>,
    input: Vec<String>,
    output: Vec<String>,
    bundle: TestCaseBundle,
}

impl TextScanner {
    fn feed(&mut self, line: &str) {
        match line {
            "VISIBLE" => self.open_section(Visibility::Visible),
            "HIDDEN" => self.open_section(Visibility::Hidden),
            INPUT_KEYWORD => {
                self.flush();
                self.clear();
                self.mode = Some(Capture::Input);
            }
            OUTPUT_KEYWORD => self.mode = Some(Capture::Output),
            body => match self.mode {
                Some(Capture::Input) => self.input.push(body.to_string()),
                Some(Capture::Output) => self.output.push(body.to_string()),
                None => {}
            },
        }
    }

    fn open_section(&mut self, section: Visibility) {
        self.flush();
        self.section = Some(section);
        self.clear();
    }

    fn clear(&mut self) {
        self.input.clear();
        self.output.clear();
        self.mode = None;
    }

    /// Append the pending record to the current section, if it is complete
    fn flush(&mut self) {
        let Some(section) = self.section else {
            return;
        };

        let record = TestCaseRecord::new(self.input.join("\n"), self.output.join("\n"));
        if record.blank_side().is_some() {
            return;
        }

        match section {
            Visibility::Visible => self.bundle.visible.push(record),
            Visibility::Hidden => self.bundle.hidden.push(record),
        }
    }

    fn finish(mut self) -> TestCaseBundle {
        self.flush();
        self.bundle
    }
}

/// Text grammar: records missing either body are dropped, never rejected
fn parse_text(content: &str) -> TestCaseBundle {
    let mut scanner = TextScanner::default();

    for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
        scanner.feed(line);
    }

    scanner.finish()
}

/// Record shape of the JSON upload format (no aliases accepted)
#[derive(Debug, Deserialize)]
struct FileRecord {
    input: String,
    expected_output: String,
}

fn parse_json(content: &str) -> Result<TestCaseBundle, MalformedInputError> {
    let value: Value = serde_json::from_str(content)
        .map_err(|e| MalformedInputError::new(format!("content is not valid JSON: {}", e)))?;

    let visible = json_list(&value, Visibility::Visible)?;
    let hidden = json_list(&value, Visibility::Hidden)?;

    Ok(TestCaseBundle::new(visible, hidden))
}

fn json_list(value: &Value, section: Visibility) -> Result<Vec<TestCaseRecord>, MalformedInputError> {
    let key = section.json_key();
    let items = value
        .get(key)
        .and_then(Value::as_array)
        .ok_or_else(MalformedInputError::missing_arrays)?;

    items
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            FileRecord::deserialize(item)
                .map(|r| TestCaseRecord::new(r.input, r.expected_output))
                .map_err(|e| invalid_record(key, idx, e))
        })
        .collect()
}

fn invalid_record(key: &str, idx: usize, err: serde_json::Error) -> MalformedInputError {
    MalformedInputError::new(format!("invalid test case at {}[{}]: {}", key, idx, err))
}

/// Normalize previously saved test cases into a bundle
///
/// Accepts the bundle as an object (`visible_testcases`/`hidden_testcases`
/// or `visible`/`hidden`) or as a JSON string holding one. Each list may be
/// an array, a JSON string holding an array, a single record object, or an
/// object keyed by numeric index.
pub fn coerce_to_bundle(raw: &Value) -> Result<TestCaseBundle, MalformedInputError> {
    match raw {
        Value::String(encoded) => {
            let decoded: Value = serde_json::from_str(encoded).map_err(|e| {
                MalformedInputError::new(format!("content is not valid JSON: {}", e))
            })?;
            coerce_object(&decoded)
        }
        other => coerce_object(other),
    }
}

fn coerce_object(value: &Value) -> Result<TestCaseBundle, MalformedInputError> {
    let object = value.as_object().ok_or_else(MalformedInputError::missing_arrays)?;
    let list = |section: Visibility, short_key: &str| {
        let key = section.json_key();
        coerce_list(key, object.get(key).or_else(|| object.get(short_key)), true)
    };

    let visible = list(Visibility::Visible, "visible")?;
    let hidden = list(Visibility::Hidden, "hidden")?;

    Ok(TestCaseBundle::new(visible, hidden))
}

fn coerce_list(
    key: &str,
    raw: Option<&Value>,
    decode_strings: bool,
) -> Result<Vec<TestCaseRecord>, MalformedInputError> {
    let raw = raw.ok_or_else(MalformedInputError::missing_arrays)?;

    match raw {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(idx, item)| coerce_record(key, idx, item))
            .collect(),
        Value::String(encoded) if decode_strings => {
            let decoded: Value = serde_json::from_str(encoded).map_err(|e| {
                MalformedInputError::new(format!("{} is not valid JSON: {}", key, e))
            })?;
            coerce_list(key, Some(&decoded), false)
        }
        Value::Object(map) if map.contains_key("input") => Ok(vec![coerce_record(key, 0, raw)?]),
        Value::Object(map) => {
            let mut indexed = map
                .iter()
                .map(|(k, v)| {
                    k.parse::<usize>().map(|idx| (idx, v)).map_err(|_| {
                        MalformedInputError::new(format!("{} has non-numeric key '{}'", key, k))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            indexed.sort_by_key(|(idx, _)| *idx);

            indexed
                .into_iter()
                .map(|(idx, item)| coerce_record(key, idx, item))
                .collect()
        }
        _ => Err(MalformedInputError::missing_arrays()),
    }
}

fn coerce_record(key: &str, idx: usize, item: &Value) -> Result<TestCaseRecord, MalformedInputError> {
    TestCaseRecord::deserialize(item).map_err(|e| invalid_record(key, idx, e))
}

/// Render a bundle in the text format
pub fn to_text(bundle: &TestCaseBundle) -> String {
    let mut out = String::new();

    for (section, records) in [
        (Visibility::Visible, &bundle.visible),
        (Visibility::Hidden, &bundle.hidden),
    ] {
        out.push_str(section.keyword());
        out.push('\n');
        for record in records {
            out.push_str(INPUT_KEYWORD);
            out.push('\n');
            out.push_str(&record.input);
            out.push('\n');
            out.push_str(OUTPUT_KEYWORD);
            out.push('\n');
            out.push_str(&record.expected_output);
            out.push('\n');
        }
    }

    out
}

#[derive(Serialize)]
struct BundleFile<'a> {
    visible_testcases: &'a [TestCaseRecord],
    hidden_testcases: &'a [TestCaseRecord],
}

/// Render a bundle in the JSON upload format
pub fn to_json(bundle: &TestCaseBundle) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&BundleFile {
        visible_testcases: &bundle.visible,
        hidden_testcases: &bundle.hidden,
    })
}

/// Render a bundle in whichever format was asked for
pub fn render(bundle: &TestCaseBundle, format: FileFormat) -> serde_json::Result<String> {
    match format {
        FileFormat::Text => Ok(to_text(bundle)),
        FileFormat::Json => to_json(bundle),
    }
}
