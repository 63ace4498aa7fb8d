// Prompt assembly for question answering and per-file generation tasks

use std::path::Path;

use crate::index::SearchResult;

/// Numbered context blocks followed by the question
pub fn build_prompt(question: &str, context: &[SearchResult]) -> String {
    let mut blocks = String::new();
    for (i, result) in context.iter().enumerate() {
        blocks.push_str(&format!(
            "Context {}:\nFile: {} (Lines {}-{})\nCode:\n{}\n\n",
            i + 1,
            result.path,
            result.start_line,
            result.end_line,
            result.content
        ));
    }

    format!(
        "You answer questions about a source code repository.\n\
         Use the following code context:\n\n\
         {blocks}\n\
         Answer the question below using only the context above:\n\
         {question}\n\n\
         If the context is not enough to answer, say so instead of guessing.\n\n\
         Answer:\n"
    )
}

/// Generation tasks that run over a single file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileTask {
    Explain,
    Tests,
    Docs,
}

impl FileTask {
    pub fn prompt(self, path: &str, language: &str, content: &str) -> String {
        match self {
            FileTask::Explain => explain_prompt(path, language, content),
            FileTask::Tests => tests_prompt(path, language, content),
            FileTask::Docs => docs_prompt(path, language, content),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FileTask::Explain => "explanation",
            FileTask::Tests => "tests",
            FileTask::Docs => "documentation",
        }
    }
}

/// Test framework suggested for a language name from the extension table
pub fn suggested_test_framework(language: &str) -> &'static str {
    match language {
        "Python" => "pytest or unittest",
        "JavaScript" | "JavaScript/React" => "Jest or Mocha",
        "TypeScript" | "TypeScript/React" => "Jest or Jasmine",
        "Java" | "Kotlin" => "JUnit",
        "C" | "C++" | "C/C++ Header" | "C++ Header" => "Google Test (gtest) or Catch2",
        "C#" => "xUnit or NUnit",
        "Go" => "the testing package",
        "Ruby" => "RSpec or Minitest",
        "PHP" => "PHPUnit",
        "Swift" => "XCTest",
        "Rust" => "the built-in #[test] harness",
        _ => "a suitable testing framework",
    }
}

/// Documentation convention for a language name
pub fn doc_format(language: &str) -> &'static str {
    match language {
        "Python" => "Google style docstrings",
        "JavaScript" | "JavaScript/React" => "JSDoc",
        "TypeScript" | "TypeScript/React" => "TSDoc",
        "Java" => "Javadoc",
        "Kotlin" => "KDoc",
        "C" | "C++" | "C/C++ Header" | "C++ Header" => "Doxygen",
        "C#" => "XML documentation comments",
        "Go" => "godoc comments",
        "Ruby" => "YARD",
        "PHP" => "PHPDoc",
        "Swift" => "Swift markup",
        "Rust" => "rustdoc",
        _ => "the language's usual documentation",
    }
}

fn file_block(path: &str, language: &str, content: &str) -> String {
    let fence = Path::new(path).extension().and_then(|ext| ext.to_str()).unwrap_or("");
    format!("File: {path}\nLanguage: {language}\n\n```{fence}\n{content}\n```\n")
}

/// Ask for an explanation of one file
pub fn explain_prompt(path: &str, language: &str, content: &str) -> String {
    format!(
        "You explain source code clearly and concisely.\n\
         Explain the following file:\n\n\
         {file}\n\
         Cover:\n\
         1. What the code does\n\
         2. Its main components and how they interact\n\
         3. The purpose of the key functions and types\n\
         4. Notable patterns or techniques\n\
         5. Possible issues or improvements\n\n\
         Explanation:\n",
        file = file_block(path, language, content)
    )
}

/// Ask for a test suite covering one file
pub fn tests_prompt(path: &str, language: &str, content: &str) -> String {
    format!(
        "You write thorough tests for existing code.\n\
         Write tests for the following file:\n\n\
         {file}\n\
         Use {framework} and cover:\n\
         1. Every public function and method, with several cases each\n\
         2. Edge cases and error handling\n\
         3. Mocks for external dependencies where needed\n\n\
         Use the real function names with realistic inputs and expected outputs.\n\n\
         Test code:\n",
        file = file_block(path, language, content),
        framework = suggested_test_framework(language)
    )
}

/// Ask for inline documentation of one file
pub fn docs_prompt(path: &str, language: &str, content: &str) -> String {
    format!(
        "You write documentation for existing code.\n\
         Document the following file:\n\n\
         {file}\n\
         Write {format} including:\n\
         1. A file-level overview of its purpose\n\
         2. For each function and type: purpose, parameters, return values and errors\n\
         3. Usage examples where they help\n\n\
         The documentation should be ready to paste into the file.\n\n\
         Documentation:\n",
        file = file_block(path, language, content),
        format = doc_format(language)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{Chunk, ChunkMetadata};

    #[test]
    fn test_context_blocks_are_numbered() {
        let chunk = |path: &str, start, end, content: &str| Chunk {
            path: path.to_string(),
            content: content.to_string(),
            start_line: start,
            end_line: end,
            metadata: ChunkMetadata {
                file: path.to_string(),
                language: "Rust".to_string(),
            },
        };
        let context = vec![
            SearchResult::from_chunk(0, &chunk("src/main.rs", 1, 50, "fn main() {}"), 0.9),
            SearchResult::from_chunk(3, &chunk("src/lib.rs", 41, 60, "pub mod config;"), 0.4),
        ];

        let prompt = build_prompt("Where is main?", &context);

        assert!(prompt.contains("Context 1:\nFile: src/main.rs (Lines 1-50)\nCode:\nfn main() {}\n"));
        assert!(prompt.contains("Context 2:\nFile: src/lib.rs (Lines 41-60)\nCode:\npub mod config;\n"));
        assert!(prompt.find("Context 1:").unwrap() < prompt.find("Where is main?").unwrap());
        assert!(prompt.ends_with("Answer:\n"));
    }

    #[test]
    fn test_empty_context() {
        let prompt = build_prompt("What is this?", &[]);
        assert!(!prompt.contains("Context 1:"));
        assert!(prompt.contains("What is this?"));
    }

    #[test]
    fn test_file_prompts_embed_the_file() {
        let content = "def add(a, b):\n    return a + b";

        let explain = explain_prompt("src/math.py", "Python", content);
        assert!(explain.contains("File: src/math.py\nLanguage: Python\n\n```py\ndef add(a, b):\n    return a + b\n```\n"));
        assert!(explain.ends_with("Explanation:\n"));

        let tests = tests_prompt("src/math.py", "Python", content);
        assert!(tests.contains("Use pytest or unittest"));
        assert!(tests.ends_with("Test code:\n"));

        let docs = docs_prompt("src/lib.rs", "Rust", "pub fn add() {}");
        assert!(docs.contains("```rs\npub fn add() {}\n```"));
        assert!(docs.contains("Write rustdoc"));
        assert!(docs.ends_with("Documentation:\n"));
    }

    #[test]
    fn test_unknown_language_falls_back() {
        let tests = FileTask::Tests.prompt("Makefile", "Unknown", "all:\n\tcc main.c");
        assert!(tests.contains("Use a suitable testing framework"));
        assert!(tests.contains("```\nall:"));

        assert_eq!(doc_format("Unknown"), "the language's usual documentation");
        assert_eq!(FileTask::Docs.label(), "documentation");
    }
}
