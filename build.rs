use grep::regex::RegexMatcher;
use grep::searcher::{Searcher, Sink, SinkMatch};
use std::error::Error;
use std::path::PathBuf;
use walkdir::WalkDir;

// Directories never scanned: build output and the read-only reference pack.
const SKIPPED_DIRS: [&str; 2] = ["./target", "./examples"];

// Decides whether a matched line is a real violation.
type LineFilter = fn(&str) -> bool;

// Collects the offending lines of one file for one rule.
struct RuleCollector {
    violations: Vec<String>,
    filter: LineFilter,
}

impl Sink for RuleCollector {
    type Error = std::io::Error;

    fn matched(&mut self, _: &Searcher, mat: &SinkMatch) -> Result<bool, Self::Error> {
        let line_number = mat.line_number().unwrap_or(0);
        let line_text = std::str::from_utf8(mat.bytes()).unwrap_or("").trim_end();
        if (self.filter)(line_text) {
            self.violations.push(format!("{line_number}:{line_text}"));
        }
        Ok(true)
    }
}

// A single source-policy rule: a line regex, a post-filter and the message shown
// when it fires.
struct Rule {
    pattern: &'static str,
    filter: LineFilter,
    headline: &'static str,
    advice: &'static str,
    include_build_script: bool,
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    for dir in ["dataset", "split", "cli", "tests", "benches"] {
        println!("cargo:rerun-if-changed={dir}");
    }

    let rules = [
        Rule {
            pattern: r"\b(_[a-zA-Z0-9_]+)\b",
            filter: is_underscore_binding,
            headline: "underscore-prefixed variables",
            advice: "Either use the variable (removing the underscore) or remove it completely.",
            include_build_script: true,
        },
        Rule {
            pattern: r"(//|/\*|///).*(?:FIXED|CORRECTED|FIX|FIXES|NEW|CHANGED|CHANGES|CHANGE|MODIFIED|MODIFIES|MODIFY|UPDATED|UPDATES|UPDATE)",
            filter: always,
            headline: "forbidden comment markers",
            advice: "Comments describing edits belong in version control, not in the source.",
            include_build_script: false,
        },
        Rule {
            pattern: r"(//|/\*).*\*\*",
            filter: is_not_doc_comment,
            headline: "'**' in regular comments",
            advice: "Emphasis markers are only allowed in doc comments.",
            include_build_script: false,
        },
        Rule {
            pattern: r"(//|/\*|///).*",
            filter: is_all_caps_comment,
            headline: "comments with all uppercase alphabetic characters",
            advice: "Rewrite the comment in sentence case or delete it.",
            include_build_script: false,
        },
        Rule {
            pattern: r"#\s*\[\s*allow\s*\(\s*dead_code\s*\)\s*\]",
            filter: always,
            headline: "#[allow(dead_code)] attributes",
            advice: "Either use the code (removing the attribute) or remove it completely.",
            include_build_script: false,
        },
    ];

    for rule in &rules {
        if let Err(e) = enforce(rule) {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}

fn enforce(rule: &Rule) -> Result<(), Box<dyn Error>> {
    let matcher = RegexMatcher::new_line_matcher(rule.pattern)?;
    let mut searcher = Searcher::new();

    for path in rust_sources(rule.include_build_script) {
        let mut collector = RuleCollector {
            violations: Vec::new(),
            filter: rule.filter,
        };
        searcher.search_path(&matcher, &path, &mut collector)?;

        if !collector.violations.is_empty() {
            let mut message = format!(
                "\n❌ ERROR: Found {} {} in {}:\n",
                collector.violations.len(),
                rule.headline,
                path.display()
            );
            for violation in &collector.violations {
                message.push_str(&format!("   {violation}\n"));
            }
            message.push_str(&format!("\n⚠️ {}\n", rule.advice));
            return Err(message.into());
        }
    }
    Ok(())
}

fn rust_sources(include_build_script: bool) -> Vec<PathBuf> {
    WalkDir::new(".")
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| !SKIPPED_DIRS.iter().any(|dir| e.path().starts_with(dir)))
        .filter(|e| include_build_script || e.file_name() != "build.rs")
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "rs"))
        .map(|e| e.path().to_path_buf())
        .filter(|p| std::fs::read_to_string(p).is_ok())
        .collect()
}

fn always(line: &str) -> bool {
    !line.is_empty()
}

fn is_doc_comment(line: &str) -> bool {
    line.trim_start().starts_with("///")
}

fn is_not_doc_comment(line: &str) -> bool {
    !is_doc_comment(line)
}

// Skips matches inside comments and string literals.
fn is_underscore_binding(line: &str) -> bool {
    let trimmed = line.trim_start();
    if trimmed.starts_with("//") || line.contains("/*") {
        return false;
    }
    let in_string = line
        .split('"')
        .enumerate()
        .any(|(i, part)| i % 2 == 1 && part.contains('_'));
    !in_string
}

fn is_all_caps_comment(line: &str) -> bool {
    let trimmed = line.trim_start();
    let comment = if let Some(rest) = trimmed.strip_prefix("///") {
        rest
    } else if let Some(rest) = trimmed.strip_prefix("//") {
        rest
    } else if let Some(start) = line.find("/*") {
        let rest = &line[start + 2..];
        rest.find("*/").map_or(rest, |end| &rest[..end])
    } else {
        return false;
    };

    let letters: Vec<char> = comment.chars().filter(|c| c.is_alphabetic()).collect();
    !letters.is_empty() && letters.iter().all(|c| c.is_uppercase())
}

