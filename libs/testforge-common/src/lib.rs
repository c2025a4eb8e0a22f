pub mod types;
pub mod parser;
pub mod validator;
pub mod gate;
pub mod config;

// Re-export commonly used types for convenience
pub use types::{McqOption, QuestionDraft, QuestionType, Test, TestCaseBundle, TestCaseRecord, TestPatch, TestStatus};
pub use parser::{FileFormat, MalformedInputError};
pub use validator::{FieldError, ValidationMode};
pub use gate::{EditError, PublishError};
pub use config::Config;
