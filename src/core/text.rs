//! Localized card text lookup.
//!
//! Message bundles themselves live outside this crate. [`TextCatalog`] is the
//! narrow seam card builders read through; [`DefaultCatalog`] carries the
//! English strings the bundled connectors need.

use std::collections::HashMap;

/// Resolves a message key, substituting `{0}`, `{1}`, ... with `args`.
pub trait TextCatalog: Send + Sync {
    fn message(&self, key: &str, args: &[&str]) -> String;

    fn header(&self, title: &str) -> String {
        self.message("header", &[title])
    }

    fn action_label(&self, action: &str) -> String {
        self.message(&format!("{action}.label"), &[])
    }

    fn action_completed_label(&self, action: &str) -> String {
        self.message(&format!("{action}.completedLabel"), &[])
    }
}

const ENGLISH: &[(&str, &str)] = &[
    ("header", "{0}"),
    ("subtitle", "Issue {0}"),
    ("project.title", "Project"),
    ("project.content", "{0}"),
    ("components.title", "Components"),
    ("components.content", "{0}"),
    ("priority.title", "Priority"),
    ("priority.content", "{0}"),
    ("status.title", "Status"),
    ("status.content", "{0}"),
    ("resolution.title", "Resolution"),
    ("resolution.content", "{0}"),
    ("assignee.title", "Assignee"),
    ("assignee.content", "{0}"),
    ("fixVersions.title", "Fix Versions"),
    ("fixVersions.content", "{0}"),
    ("comments.title", "Comments"),
    ("comments.content", "{0}"),
    ("actions.comment.label", "Comment"),
    ("actions.comment.completedLabel", "Commented"),
    ("actions.comment.prompt.label", "Comment"),
    ("actions.watch.label", "Watch"),
    ("actions.watch.completedLabel", "Watching"),
    ("actions.openIn.label", "Open in Jira"),
    ("actions.openIn.completedLabel", "Opened"),
];

/// In-memory catalog. Unknown keys render as the key itself.
#[derive(Debug, Clone)]
pub struct DefaultCatalog {
    messages: HashMap<String, String>,
}

impl DefaultCatalog {
    pub fn new() -> Self {
        DefaultCatalog {
            messages: ENGLISH
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    /// Overrides or adds a single message template.
    pub fn with_message(mut self, key: impl Into<String>, template: impl Into<String>) -> Self {
        self.messages.insert(key.into(), template.into());
        self
    }
}

impl Default for DefaultCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl TextCatalog for DefaultCatalog {
    fn message(&self, key: &str, args: &[&str]) -> String {
        let Some(template) = self.messages.get(key) else {
            return key.to_string();
        };
        args.iter()
            .enumerate()
            .fold(template.clone(), |text, (i, arg)| {
                text.replace(&format!("{{{i}}}"), arg)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitutes_positional_arguments() {
        let catalog = DefaultCatalog::new().with_message("pair", "{0} and {1}");
        assert_eq!(catalog.message("pair", &["a", "b"]), "a and b");
        assert_eq!(catalog.message("subtitle", &["ABC-1"]), "Issue ABC-1");
    }

    #[test]
    fn test_unknown_key_falls_back_to_key() {
        assert_eq!(DefaultCatalog::new().message("nope", &[]), "nope");
    }

    #[test]
    fn test_action_label_helpers() {
        let catalog = DefaultCatalog::new();
        assert_eq!(catalog.action_label("actions.watch"), "Watch");
        assert_eq!(catalog.action_completed_label("actions.watch"), "Watching");
    }
}
