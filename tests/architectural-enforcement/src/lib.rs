//! Architectural Enforcement
//!
//! Source scanners used by the integration tests in this package. They keep
//! the delivery path free of calls that could stall a broadcast:
//! - awaited channel sends (a full subscriber would block the publisher)
//! - `blocking_send` / `blocking_recv`
//! - thread sleeps inside async code
//!
//! Test modules (`#[cfg(test)] mod ...`) are not scanned.

use std::fs;
use std::path::Path;

/// One forbidden pattern
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    /// Text that must not appear in production code
    pub pattern: &'static str,
    /// Optional second text that must also be on the line to count
    pub with: Option<&'static str>,
    /// Shown in the violation report
    pub reason: &'static str,
}

/// Patterns that would let one subscriber hold up a broadcast
pub const NON_BLOCKING_RULES: &[Rule] = &[
    Rule {
        pattern: ".send(",
        with: Some(".await"),
        reason: "Awaited channel send (use try_send)",
    },
    Rule {
        pattern: "blocking_send(",
        with: None,
        reason: "Blocking channel send",
    },
    Rule {
        pattern: "blocking_recv(",
        with: None,
        reason: "Blocking channel receive",
    },
    Rule {
        pattern: "std::thread::sleep",
        with: None,
        reason: "Thread sleep (use tokio::time)",
    },
];

/// Lines of `source` outside `#[cfg(test)]` modules, with 1-based numbers
#[must_use]
pub fn production_lines(source: &str) -> Vec<(usize, &str)> {
    let lines: Vec<&str> = source.lines().collect();
    let mut out = Vec::with_capacity(lines.len());
    let mut skip_depth: Option<i64> = None;
    let mut depth: i64 = 0;

    for (idx, line) in lines.iter().enumerate() {
        let trimmed = line.trim();

        if skip_depth.is_none() && trimmed == "#[cfg(test)]" {
            let next = lines[idx + 1..].iter().map(|l| l.trim()).find(|l| !l.is_empty());
            if next.is_some_and(|l| l.starts_with("mod ") || l.starts_with("pub mod ")) {
                skip_depth = Some(depth);
            }
        }

        let opens = i64::try_from(line.matches('{').count()).unwrap_or(0);
        let closes = i64::try_from(line.matches('}').count()).unwrap_or(0);
        depth += opens - closes;

        match skip_depth {
            Some(start) => {
                if depth <= start && closes > 0 {
                    skip_depth = None;
                }
            }
            None => out.push((idx + 1, *line)),
        }
    }
    out
}

/// Check one source text against `rules`
#[must_use]
pub fn check_source(label: &str, source: &str, rules: &[Rule]) -> Vec<String> {
    let mut violations = Vec::new();

    for (line_number, line) in production_lines(source) {
        // Skip comments
        let code_part = line.split("//").next().unwrap_or(line);

        for rule in rules {
            let hit = code_part.contains(rule.pattern)
                && rule.with.map_or(true, |with| code_part.contains(with));
            if hit {
                violations.push(format!(
                    "{}:{} - {}: {}",
                    label,
                    line_number,
                    rule.reason,
                    line.trim()
                ));
            }
        }
    }
    violations
}

/// Check every `.rs` file under `dir`
///
/// A missing directory yields no violations.
#[must_use]
pub fn check_directory(dir: &Path, rules: &[Rule]) -> Vec<String> {
    let mut violations = Vec::new();
    if !dir.exists() {
        return violations;
    }

    for entry in walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
    {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) != Some("rs") {
            continue;
        }
        let Ok(content) = fs::read_to_string(path) else {
            continue;
        };
        violations.extend(check_source(&path.display().to_string(), &content, rules));
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_awaited_send_flagged() {
        let source = "async fn f(tx: Sender<u8>) {\n    tx.send(1).await.ok();\n}\n";
        let violations = check_source("f.rs", source, NON_BLOCKING_RULES);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].starts_with("f.rs:2 - Awaited channel send"));
    }

    #[test]
    fn test_try_send_allowed() {
        let source = "fn f(tx: Sender<u8>) {\n    let _ = tx.try_send(1);\n}\n";
        assert!(check_source("f.rs", source, NON_BLOCKING_RULES).is_empty());
    }

    #[test]
    fn test_comments_ignored() {
        let source = "fn f() {\n    // never std::thread::sleep here\n}\n";
        assert!(check_source("f.rs", source, NON_BLOCKING_RULES).is_empty());
    }

    #[test]
    fn test_cfg_test_module_skipped() {
        let source = "\
fn prod() {}

#[cfg(test)]
mod tests {
    fn helper() {
        std::thread::sleep(d);
    }
}

fn after() {
    std::thread::sleep(d);
}
";
        let violations = check_source("f.rs", source, NON_BLOCKING_RULES);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].starts_with("f.rs:11"));
    }

    #[test]
    fn test_cfg_test_item_not_module_still_scanned() {
        let source = "\
#[cfg(test)]
pub fn from_raw() {
    std::thread::sleep(d);
}
";
        assert_eq!(check_source("f.rs", source, NON_BLOCKING_RULES).len(), 1);
    }
}
