// SPDX-License-Identifier: MIT

//! Post-processing and style checks for generated artifacts

use once_cell::sync::Lazy;
use regex::Regex;

static TS_VAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bvar\b").unwrap());
static TS_UNTYPED_FUNCTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"function\s+\w+\s*\([^:)]*\)").unwrap());
static TS_TYPE_DECL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(interface|type)\s+\w+").unwrap());
static TS_TYPE_ANNOTATION: Lazy<Regex> = Lazy::new(|| Regex::new(r":\s*[A-Z]\w+(\[\])?").unwrap());
static TS_REACT_FC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"React\.(FC|FunctionComponent)<").unwrap());

static FENCED_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```[^\n`]*\n(.*?)```").unwrap());

const CHATTER_PREFIXES: [&str; 8] = [
    "Here's ",
    "Here is ",
    "Sure! ",
    "Certainly! ",
    "Below is ",
    "I've created ",
    "I have created ",
    "This is ",
];

/// Style problems found in generated TypeScript; empty means acceptable
pub fn typescript_issues(code: &str) -> Vec<&'static str> {
    let mut issues = Vec::new();
    if TS_VAR.is_match(code) {
        issues.push("uses 'var' instead of 'let' or 'const'");
    }
    if TS_UNTYPED_FUNCTION.is_match(code) {
        issues.push("function parameters lack type annotations");
    }
    if !TS_TYPE_DECL.is_match(code) {
        issues.push("no interface or type declarations");
    }
    if !TS_TYPE_ANNOTATION.is_match(code) {
        issues.push("no explicit type annotations");
    }
    if !TS_REACT_FC.is_match(code) {
        issues.push("components are not typed with React.FC");
    }
    issues
}

/// True when the text carries any Markdown structure
pub fn is_valid_markdown(text: &str) -> bool {
    text.contains('#')
        || text.contains("```")
        || (text.contains('[') && text.contains(']'))
        || text.contains("- ")
        || text.contains("* ")
}

/// Code from the first fenced block, or the whole reply without chatter
pub fn extract_code(reply: &str) -> String {
    match FENCED_BLOCK.captures(reply).and_then(|c| c.get(1)) {
        Some(body) => body.as_str().trim_end().to_string(),
        None => strip_leading_chatter(reply),
    }
}

/// Drop leading blank lines and lines that introduce the answer
pub fn strip_leading_chatter(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines
        .iter()
        .position(|line| {
            let trimmed = line.trim_start();
            !trimmed.is_empty() && !CHATTER_PREFIXES.iter().any(|p| trimmed.starts_with(p))
        })
        .unwrap_or(lines.len());
    lines[start..].join("\n").trim_end().to_string()
}

/// Unwrap a document that is entirely one fenced block
pub fn unwrap_document(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.starts_with("```") && trimmed.ends_with("```") && trimmed.matches("```").count() == 2
    {
        if let Some(body) = FENCED_BLOCK.captures(trimmed).and_then(|c| c.get(1)) {
            return body.as_str().trim_end().to_string();
        }
    }
    trimmed.to_string()
}

/// Identifier derived from the first five words of a message
pub fn slug_from_query(query: &str) -> String {
    let slug: String = query
        .split_whitespace()
        .take(5)
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    let slug = slug.trim_matches('_').to_string();
    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typescript_issues() {
        let good = r#"
interface ButtonProps { label: string; onClick: () => void }
const Button: React.FC<ButtonProps> = ({ label, onClick }) => {
    const items: Item[] = [];
    return <button onClick={onClick}>{label}</button>;
};
"#;
        assert!(typescript_issues(good).is_empty(), "{:?}", typescript_issues(good));

        let bad = "var x = 1;\nfunction add(a, b) { return a + b; }";
        let issues = typescript_issues(bad);
        assert!(issues.contains(&"uses 'var' instead of 'let' or 'const'"));
        assert!(issues.contains(&"function parameters lack type annotations"));
        assert_eq!(issues.len(), 5);
    }

    #[test]
    fn test_markdown_check() {
        assert!(is_valid_markdown("# Title\ntext"));
        assert!(is_valid_markdown("see [link](http://x)"));
        assert!(is_valid_markdown("- item"));
        assert!(!is_valid_markdown("Just a plain paragraph of prose."));
    }

    #[test]
    fn test_extract_code_from_fence() {
        let reply = "Here's the code:\n```python\ndef add(a, b):\n    return a + b\n```\nEnjoy!";
        assert_eq!(extract_code(reply), "def add(a, b):\n    return a + b");
    }

    #[test]
    fn test_extract_code_without_fence_strips_chatter() {
        let reply = "Sure! Here you go.\n\ndef add(a, b):\n    return a + b\n";
        assert_eq!(extract_code(reply), "def add(a, b):\n    return a + b");
        assert_eq!(strip_leading_chatter("Here is \n"), "");
    }

    #[test]
    fn test_unwrap_document() {
        assert_eq!(unwrap_document("```markdown\n# Title\nBody\n```"), "# Title\nBody");
        let mixed = "# Title\n```rust\nfn main() {}\n```\n";
        assert_eq!(unwrap_document(mixed), mixed.trim());
    }

    #[test]
    fn test_slug_from_query() {
        assert_eq!(
            slug_from_query("Write a Python function that adds numbers"),
            "write_a_python_function_that"
        );
        assert_eq!(slug_from_query("  Fix: bug #42!  "), "fix_bug_42");
        assert_eq!(slug_from_query("???"), "untitled");
    }
}
