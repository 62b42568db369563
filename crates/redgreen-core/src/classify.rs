//! Failure classification for RED-phase test output.
//!
//! A RED step only counts when tests fail on assertions. Output that carries a
//! tooling-error signature (syntax, import, unresolved names, compiler errors)
//! and no assertion wording means the test code itself is broken.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Tests ran and failed on their assertions.
    Assertion,
    /// The test code did not compile, import or resolve.
    ToolingError,
}

/// Decides why a failing test run failed. Substitutable per ecosystem.
pub trait FailureClassifier {
    fn classify(&self, output: &str) -> FailureKind;
}

// ---------------------------------------------------------------------------
// Signatures
// ---------------------------------------------------------------------------

/// A named tooling-error shape, matched case-insensitively.
pub struct Signature {
    pub id: &'static str,
    pub pattern: &'static str,
}

pub const TOOLING_SIGNATURES: &[Signature] = &[
    Signature { id: "syntax", pattern: r"SyntaxError" },
    Signature { id: "import", pattern: r"ImportError" },
    Signature { id: "module-not-found", pattern: r"ModuleNotFoundError" },
    Signature { id: "name", pattern: r"NameError" },
    Signature { id: "type", pattern: r"TypeError: " },
    Signature { id: "js-module", pattern: r"cannot find module" },
    Signature { id: "rustc", pattern: r"error\[E\d{4}\]" },
    Signature { id: "csc", pattern: r"error CS\d{4}" },
    Signature { id: "go-undefined", pattern: r"undefined: \w" },
];

static TOOLING_RE: OnceLock<Regex> = OnceLock::new();

fn tooling_re() -> &'static Regex {
    TOOLING_RE.get_or_init(|| {
        let alternation = TOOLING_SIGNATURES
            .iter()
            .map(|s| format!("(?:{})", s.pattern))
            .collect::<Vec<_>>()
            .join("|");
        Regex::new(&format!("(?i){alternation}")).unwrap()
    })
}

/// Ids of every tooling signature present in `output`.
pub fn matched_signatures(output: &str) -> Vec<&'static str> {
    TOOLING_SIGNATURES
        .iter()
        .filter(|s| {
            Regex::new(&format!("(?i){}", s.pattern))
                .map(|re| re.is_match(output))
                .unwrap_or(false)
        })
        .map(|s| s.id)
        .collect()
}

// ---------------------------------------------------------------------------
// HeuristicClassifier
// ---------------------------------------------------------------------------

/// Default classifier: a tooling error is a signature match with no
/// occurrence of "assert" anywhere in the output.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicClassifier;

impl FailureClassifier for HeuristicClassifier {
    fn classify(&self, output: &str) -> FailureKind {
        let has_tooling_error = tooling_re().is_match(output);
        let mentions_assertion = output.to_lowercase().contains("assert");
        if has_tooling_error && !mentions_assertion {
            FailureKind::ToolingError
        } else {
            FailureKind::Assertion
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(output: &str) -> FailureKind {
        HeuristicClassifier.classify(output)
    }

    #[test]
    fn plain_assertion_failure() {
        assert_eq!(
            classify("FAILED tests/test_auth.py::test_login - AssertionError: 401 != 200"),
            FailureKind::Assertion
        );
        assert_eq!(classify("expected 3, received 2\n1 failed"), FailureKind::Assertion);
    }

    #[test]
    fn python_import_error_is_tooling() {
        assert_eq!(
            classify("E   ModuleNotFoundError: No module named 'auth'"),
            FailureKind::ToolingError
        );
        assert_eq!(classify("  File \"x.py\", line 3\nSyntaxError: invalid syntax"), FailureKind::ToolingError);
    }

    #[test]
    fn signatures_are_case_insensitive() {
        assert_eq!(
            classify("Error: Cannot find module './login'"),
            FailureKind::ToolingError
        );
    }

    #[test]
    fn assertion_wording_wins_over_signature() {
        let output = "NameError in helper\nassert result == 4";
        assert_eq!(classify(output), FailureKind::Assertion);
    }

    #[test]
    fn compiler_errors_are_tooling() {
        assert_eq!(
            classify("error[E0425]: cannot find value `login` in this scope"),
            FailureKind::ToolingError
        );
        assert_eq!(
            classify("Auth.cs(4,7): error CS0246: The type or namespace name 'Foo' could not be found"),
            FailureKind::ToolingError
        );
        assert_eq!(
            classify("./auth_test.go:9:2: undefined: Login"),
            FailureKind::ToolingError
        );
    }

    #[test]
    fn type_error_needs_the_colon() {
        assert_eq!(classify("TypeErrors are discussed in docs"), FailureKind::Assertion);
    }

    #[test]
    fn empty_output_is_not_tooling() {
        assert_eq!(classify(""), FailureKind::Assertion);
    }

    #[test]
    fn matched_signatures_lists_ids() {
        let ids = matched_signatures("ImportError: x\nerror[E0433]: failed to resolve");
        assert_eq!(ids, vec!["import", "rustc"]);
        assert!(matched_signatures("all good").is_empty());
    }
}
