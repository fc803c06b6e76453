//! Bundled backends: Jira for cards, Slack for the channel workflow.

pub mod jira;
pub mod slack;
