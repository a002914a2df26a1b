// SPDX-License-Identifier: MIT

//! Classification and task status types
//!
//! The classifier reply is parsed leniently and normalized so that every
//! later stage can trust the combination of flags it reads.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    #[default]
    Simple,
    Complex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum GenerationType {
    Code,
    Document,
    #[default]
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum QueryAction {
    #[default]
    New,
    Update,
}

/// Language of generated code or format of a generated document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    #[serde(alias = "python")]
    Py,
    #[serde(alias = "typescript")]
    Ts,
    #[serde(alias = "javascript")]
    Js,
    #[serde(alias = "c++")]
    Cpp,
    Java,
    #[serde(alias = "text")]
    Txt,
    #[serde(alias = "markdown")]
    Md,
    #[serde(alias = "docx")]
    Doc,
    Pdf,
}

impl TargetFormat {
    pub const ALL: [TargetFormat; 9] = [
        Self::Py,
        Self::Ts,
        Self::Js,
        Self::Cpp,
        Self::Java,
        Self::Txt,
        Self::Md,
        Self::Doc,
        Self::Pdf,
    ];

    /// Parse a format name, accepting common aliases and a leading dot
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().trim_start_matches('.').to_ascii_lowercase();
        let format = match name.as_str() {
            "py" | "python" => Self::Py,
            "ts" | "tsx" | "typescript" => Self::Ts,
            "js" | "jsx" | "javascript" => Self::Js,
            "cpp" | "c++" | "cc" | "cxx" => Self::Cpp,
            "java" => Self::Java,
            "txt" | "text" => Self::Txt,
            "md" | "markdown" => Self::Md,
            "doc" | "docx" | "word" => Self::Doc,
            "pdf" => Self::Pdf,
            _ => return None,
        };
        Some(format)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Py => "py",
            Self::Ts => "ts",
            Self::Js => "js",
            Self::Cpp => "cpp",
            Self::Java => "java",
            Self::Txt => "txt",
            Self::Md => "md",
            Self::Doc => "doc",
            Self::Pdf => "pdf",
        }
    }

    /// Human-readable name used in prompts
    pub fn label(&self) -> &'static str {
        match self {
            Self::Py => "Python",
            Self::Ts => "TypeScript",
            Self::Js => "JavaScript",
            Self::Cpp => "C++",
            Self::Java => "Java",
            Self::Txt => "plain text",
            Self::Md => "Markdown",
            Self::Doc => "Word document",
            Self::Pdf => "PDF document",
        }
    }

    pub fn generation_type(&self) -> GenerationType {
        match self {
            Self::Py | Self::Ts | Self::Js | Self::Cpp | Self::Java => GenerationType::Code,
            Self::Txt | Self::Md | Self::Doc | Self::Pdf => GenerationType::Document,
        }
    }

    /// Extension for writing the artifact to disk; rich formats are
    /// generated as Markdown
    pub fn file_extension(&self) -> &'static str {
        match self {
            Self::Doc | Self::Pdf => "md",
            other => other.as_str(),
        }
    }

    pub fn default_for(generation: GenerationType) -> Option<Self> {
        match generation {
            GenerationType::Code => Some(Self::Py),
            GenerationType::Document => Some(Self::Md),
            GenerationType::None => None,
        }
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Routing flags produced by the classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Classification {
    pub query_type: QueryType,
    pub needs_web_search: bool,
    pub needs_document_processing: bool,
    pub generation_type: GenerationType,
    pub target_format: Option<TargetFormat>,
    pub action: QueryAction,
    pub file_identifier: Option<String>,
}

impl Default for Classification {
    fn default() -> Self {
        Self::simple()
    }
}

impl Classification {
    /// Plain answer with no extra processing
    pub fn simple() -> Self {
        Self {
            query_type: QueryType::Simple,
            needs_web_search: false,
            needs_document_processing: false,
            generation_type: GenerationType::None,
            target_format: None,
            action: QueryAction::New,
            file_identifier: None,
        }
    }

    /// Complex query asking for a new artifact
    pub fn generate(generation_type: GenerationType, target_format: Option<TargetFormat>) -> Self {
        Self {
            query_type: QueryType::Complex,
            generation_type,
            target_format,
            ..Self::simple()
        }
        .normalized()
    }

    /// Make the flags mutually consistent
    pub fn normalized(mut self) -> Self {
        self.file_identifier = self
            .file_identifier
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());

        if self.query_type == QueryType::Simple {
            self.generation_type = GenerationType::None;
            self.target_format = None;
            self.action = QueryAction::New;
            return self;
        }

        match self.generation_type {
            GenerationType::None => {
                self.target_format = None;
                self.action = QueryAction::New;
            }
            generation => {
                let matches = self
                    .target_format
                    .map_or(false, |f| f.generation_type() == generation);
                if !matches {
                    self.target_format = TargetFormat::default_for(generation);
                }
            }
        }

        if self.action == QueryAction::Update && self.file_identifier.is_none() {
            self.action = QueryAction::New;
        }
        self
    }

    pub fn is_generation(&self) -> bool {
        self.generation_type != GenerationType::None
    }
}

/// A stage failure that did not abort the request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageError {
    pub stage: String,
    pub message: String,
}

/// Classification flags plus what the pipeline actually completed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    #[serde(flatten)]
    pub classification: Classification,
    pub web_search_completed: bool,
    pub document_processed: bool,
    pub code_generated: bool,
    pub document_generated: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<StageError>,
}

impl TaskStatus {
    pub fn new(classification: Classification) -> Self {
        Self {
            classification,
            ..Self::default()
        }
    }

    pub fn artifact_generated(&self) -> bool {
        self.code_generated || self.document_generated
    }
}
