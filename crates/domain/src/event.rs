//! Script events
//!
//! Events carry opaque script text attached to collections, folders and
//! requests. The core never evaluates them; they are handed to the
//! caller's hook implementation verbatim.

use serde::{Deserialize, Serialize};

/// When a script runs relative to its request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// Before the request is prepared and dispatched
    Prerequest,
    /// After the response is received
    Test,
}

/// Opaque script source, stored as the lines found in the document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    /// The script lines
    #[serde(default)]
    pub exec: Vec<String>,
}

impl Script {
    /// Joins the lines back into one source string.
    #[must_use]
    pub fn source(&self) -> String {
        self.exec.join("\n")
    }

    /// Returns true if there is no script text.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exec.iter().all(|line| line.trim().is_empty())
    }
}

/// A script bound to a lifecycle point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// The lifecycle point
    pub listen: EventKind,
    /// The script to hand to the hook
    #[serde(default)]
    pub script: Script,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_source_joins_lines() {
        let script = Script {
            exec: vec!["const a = 1;".to_string(), "use(a);".to_string()],
        };
        assert_eq!(script.source(), "const a = 1;\nuse(a);");
    }

    #[test]
    fn test_blank_script_is_empty() {
        let script = Script {
            exec: vec![String::new(), "  ".to_string()],
        };
        assert!(script.is_empty());
    }
}
