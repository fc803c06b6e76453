//! Jira issue cards and their follow-up actions.

use crate::core::card::{
    Card, CardAction, CardActionKey, CardBodyField, CardBodyFieldType, CardBuilder, CardContext,
    HttpMethod,
};
use crate::core::document::{DocumentError, UpstreamDocument};
use crate::core::text::{DefaultCatalog, TextCatalog};
use crate::dispatch::ItemActions;
use crate::upstream::{Payload, Status, UpstreamClient, UpstreamError, path_segment};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Number of comments rendered on a card, newest first.
pub const COMMENTS_SIZE: usize = 2;

/// Token key under which batch requests carry Jira issue identifiers.
pub const ISSUE_TOKEN: &str = "issue_id";

pub struct JiraCardBuilder {
    text: Arc<dyn TextCatalog>,
}

impl JiraCardBuilder {
    pub fn new(text: Arc<dyn TextCatalog>) -> Self {
        JiraCardBuilder { text }
    }

    /// A blank value yields no field at all.
    fn general_field(&self, key: &str, content: &str) -> Option<CardBodyField> {
        if content.trim().is_empty() {
            return None;
        }
        Some(
            CardBodyField::builder(
                self.text.message(&format!("{key}.title"), &[]),
                CardBodyFieldType::General,
            )
            .description(self.text.message(&format!("{key}.content"), &[content]))
            .build(),
        )
    }

    fn optional(
        &self,
        document: &UpstreamDocument,
        key: &str,
        path: &str,
    ) -> Result<Option<CardBodyField>, DocumentError> {
        let content = document.find_string(path)?.unwrap_or_default();
        Ok(self.general_field(key, &content))
    }

    fn joined(
        &self,
        document: &UpstreamDocument,
        key: &str,
        path: &str,
    ) -> Result<Option<CardBodyField>, DocumentError> {
        let content = document.get_string_list(path)?.join(",");
        Ok(self.general_field(key, &content))
    }

    fn comments_field(
        &self,
        document: &UpstreamDocument,
    ) -> Result<Option<CardBodyField>, DocumentError> {
        let mut comments = document.get_object_list("$.fields.comment.comments[*]")?;
        if comments.is_empty() {
            return Ok(None);
        }
        comments.reverse();

        let mut field = CardBodyField::builder(
            self.text.message("comments.title", &[]),
            CardBodyFieldType::Comment,
        );
        for comment in comments.iter().take(COMMENTS_SIZE) {
            let author = comment.find_string("$.author.name")?.unwrap_or_default();
            let body = comment.find_string("$.body")?.unwrap_or_default();
            let entry = if author.trim().is_empty() {
                body
            } else {
                format!("{author} - {body}")
            };
            field = field.content(self.text.message("comments.content", &[entry.as_str()]));
        }
        Ok(Some(field.build()))
    }

    fn comment_action(&self, ctx: &CardContext, issue_id: &str) -> CardAction {
        CardAction::builder(
            self.text.action_label("actions.comment"),
            CardActionKey::UserInput,
            HttpMethod::Post,
            ctx.routed(&format!("api/v1/issues/{}/comment", urlencoding::encode(issue_id))),
        )
        .completed_label(self.text.action_completed_label("actions.comment"))
        .user_input(
            "body",
            self.text.message("actions.comment.prompt.label", &[]),
            "textarea",
        )
        .build()
    }

    fn watch_action(&self, ctx: &CardContext, issue_id: &str) -> CardAction {
        CardAction::builder(
            self.text.action_label("actions.watch"),
            CardActionKey::Direct,
            HttpMethod::Post,
            ctx.routed(&format!("api/v1/issues/{}/watchers", urlencoding::encode(issue_id))),
        )
        .completed_label(self.text.action_completed_label("actions.watch"))
        .build()
    }

    fn open_in_action(&self, ctx: &CardContext, identifier: &str) -> CardAction {
        CardAction::builder(
            self.text.action_label("actions.openIn"),
            CardActionKey::OpenIn,
            HttpMethod::Get,
            ctx.upstream(&format!("browse/{}", urlencoding::encode(identifier))),
        )
        .allow_repeated(true)
        .build()
    }
}

impl Default for JiraCardBuilder {
    fn default() -> Self {
        Self::new(Arc::new(DefaultCatalog::new()))
    }
}

impl CardBuilder for JiraCardBuilder {
    fn item_url(&self, ctx: &CardContext, identifier: &str) -> Result<String, UpstreamError> {
        Ok(ctx.upstream(&format!("rest/api/2/issue/{}", path_segment(identifier)?)))
    }

    fn build(
        &self,
        document: &UpstreamDocument,
        identifier: &str,
        ctx: &CardContext,
    ) -> Result<Card, DocumentError> {
        let issue_id = document.get_string("$.id")?;
        let issue_key = document.get_string("$.key")?;
        let summary = document.get_string("$.fields.summary")?;

        Ok(Card::builder(identifier, "Jira")
            .template(ctx.routed("templates/generic.hbs"))
            .header(
                self.text.header(&summary),
                self.text.message("subtitle", &[issue_key.as_str()]),
            )
            .description(summary.as_str())
            .field(self.optional(document, "project", "$.fields.project.name")?)
            .field(self.joined(document, "components", "$.fields.components[*].name")?)
            .field(self.optional(document, "priority", "$.fields.priority.name")?)
            .field(self.optional(document, "status", "$.fields.status.name")?)
            .field(self.optional(document, "resolution", "$.fields.resolution.name")?)
            .field(self.optional(document, "assignee", "$.fields.assignee.displayName")?)
            .field(self.joined(document, "fixVersions", "$.fields.fixVersions[*].name")?)
            .field(self.comments_field(document)?)
            .action(self.comment_action(ctx, &issue_id))
            .action(self.open_in_action(ctx, identifier))
            .action(self.watch_action(ctx, &issue_id))
            .build())
    }
}

/// Writes issued on behalf of the actions a Jira card exposes.
pub struct JiraActions {
    client: Arc<dyn UpstreamClient>,
}

impl JiraActions {
    pub fn new(client: Arc<dyn UpstreamClient>) -> Self {
        JiraActions { client }
    }

    /// Checks the credentials against the upstream; success is answered with 204.
    pub async fn verify_auth(&self, ctx: &CardContext) -> Result<Status, UpstreamError> {
        self.client
            .fetch(&ctx.upstream("rest/api/2/myself"), &ctx.credentials)
            .await?;
        Ok(Status::NO_CONTENT)
    }
}

#[async_trait]
impl ItemActions for JiraActions {
    async fn comment(
        &self,
        ctx: &CardContext,
        issue_key: &str,
        body: &str,
    ) -> Result<Status, UpstreamError> {
        log::debug!("Adding comment to {} on {}", issue_key, ctx.base_url);
        let comments = ctx.upstream(&format!(
            "rest/api/2/issue/{}/comment",
            path_segment(issue_key)?
        ));
        let outcome = self
            .client
            .mutate(
                HttpMethod::Post,
                &comments,
                Payload::Json(serde_json::json!({ "body": body })),
                &ctx.credentials,
            )
            .await?;
        Ok(outcome.status)
    }

    async fn watch(&self, ctx: &CardContext, issue_key: &str) -> Result<Status, UpstreamError> {
        log::debug!("Adding current user as watcher of {} on {}", issue_key, ctx.base_url);
        let watchers = ctx.upstream(&format!(
            "rest/api/2/issue/{}/watchers",
            path_segment(issue_key)?
        ));
        let myself = self
            .client
            .fetch(&ctx.upstream("rest/api/2/myself"), &ctx.credentials)
            .await?;
        let user = myself.get_string("$.name")?;

        let outcome = self
            .client
            .mutate(
                HttpMethod::Post,
                &watchers,
                Payload::Json(Value::String(user)),
                &ctx.credentials,
            )
            .await?;
        Ok(outcome.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::{Credentials, MemoryUpstream};
    use serde_json::json;

    fn ctx() -> CardContext {
        CardContext::new(
            Credentials::new("Basic abc"),
            "https://jira.example.com",
            "https://hub.example.com/connectors/jira/",
        )
    }

    fn issue() -> UpstreamDocument {
        json!({
            "id": "1234",
            "key": "APF-27",
            "fields": {
                "summary": "Demo issue",
                "project": {"name": "Apollo"},
                "components": [{"name": "ui"}, {"name": "api"}],
                "fixVersions": [],
                "priority": {"name": "Major"},
                "status": {"name": "Open"},
                "resolution": null,
                "assignee": {"displayName": "   "},
                "comment": {"comments": [
                    {"body": "oldest", "author": {"name": "ann"}},
                    {"body": "middle", "author": {"name": "bob"}},
                    {"body": "newest", "author": {"name": "cyd"}}
                ]}
            }
        })
        .into()
    }

    #[test]
    fn test_blank_optional_fields_are_omitted() {
        let card = JiraCardBuilder::default().build(&issue(), "APF-27", &ctx()).unwrap();
        let titles: Vec<&str> = card.body().fields().iter().map(|f| f.title()).collect();

        assert_eq!(titles, vec!["Project", "Components", "Priority", "Status", "Comments"]);
        assert_eq!(
            card.body().field("Components").unwrap().description(),
            Some("ui,api")
        );
    }

    #[test]
    fn test_comments_are_newest_first_and_truncated() {
        let card = JiraCardBuilder::default().build(&issue(), "APF-27", &ctx()).unwrap();
        let comments = card.body().field("Comments").unwrap();

        assert_eq!(comments.kind(), CardBodyFieldType::Comment);
        let texts: Vec<&str> = comments.content().iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["cyd - newest", "bob - middle"]);
    }

    #[test]
    fn test_comment_without_author_shows_body_only() {
        let doc: UpstreamDocument = json!({
            "id": "1", "key": "K-1", "fields": {"summary": "s", "comment": {"comments": [
                {"body": "anonymous note"},
                {"body": "signed", "author": {"name": "ann"}}
            ]}}
        })
        .into();
        let card = JiraCardBuilder::default().build(&doc, "K-1", &ctx()).unwrap();
        let comments = card.body().field("Comments").unwrap();
        let texts: Vec<&str> = comments.content().iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["ann - signed", "anonymous note"]);
    }

    #[test]
    fn test_item_url_encodes_identifier_as_one_segment() {
        let builder = JiraCardBuilder::default();
        assert_eq!(
            builder.item_url(&ctx(), "A/../x").unwrap(),
            "https://jira.example.com/rest/api/2/issue/A%2F..%2Fx"
        );
        assert_eq!(
            builder.item_url(&ctx(), "A#b").unwrap(),
            "https://jira.example.com/rest/api/2/issue/A%23b"
        );
        assert_eq!(builder.item_url(&ctx(), ".."), Err(UpstreamError::NotFound));
    }

    #[test]
    fn test_open_in_url_encodes_identifier() {
        let card = JiraCardBuilder::default().build(&issue(), "APF 27?x", &ctx()).unwrap();
        let open_in = card.action(CardActionKey::OpenIn).unwrap();
        assert_eq!(open_in.url(), "https://jira.example.com/browse/APF%2027%3Fx");
    }

    #[test]
    fn test_no_comments_means_no_comment_field() {
        let doc: UpstreamDocument = json!({
            "id": "1", "key": "K-1", "fields": {"summary": "s", "comment": {"comments": []}}
        })
        .into();
        let card = JiraCardBuilder::default().build(&doc, "K-1", &ctx()).unwrap();
        assert!(card.body().fields().is_empty());
    }

    #[test]
    fn test_missing_summary_is_an_error() {
        let doc: UpstreamDocument = json!({"id": "1", "key": "K-1", "fields": {}}).into();
        assert_eq!(
            JiraCardBuilder::default().build(&doc, "K-1", &ctx()).map(|_| ()),
            Err(DocumentError::Missing("$.fields.summary".into()))
        );
    }

    #[test]
    fn test_action_urls() {
        let card = JiraCardBuilder::default().build(&issue(), "APF-27", &ctx()).unwrap();

        let comment = card.action(CardActionKey::UserInput).unwrap();
        assert_eq!(
            comment.url(),
            "https://hub.example.com/connectors/jira/api/v1/issues/1234/comment"
        );
        assert_eq!(comment.user_input()[0].id, "body");

        let watch = card.action(CardActionKey::Direct).unwrap();
        assert_eq!(
            watch.url(),
            "https://hub.example.com/connectors/jira/api/v1/issues/1234/watchers"
        );

        let open_in = card.action(CardActionKey::OpenIn).unwrap();
        assert_eq!(open_in.url(), "https://jira.example.com/browse/APF-27");
        assert_eq!(open_in.method(), HttpMethod::Get);
        assert!(open_in.allow_repeated());

        assert_eq!(card.header().title(), "Demo issue");
        assert_eq!(card.header().subtitle(), ["Issue APF-27".to_string()]);
        assert_eq!(
            card.template(),
            "https://hub.example.com/connectors/jira/templates/generic.hbs"
        );
    }

    #[tokio::test]
    async fn test_comment_forwards_body_and_status() {
        let url = "https://jira.example.com/rest/api/2/issue/APF-27/comment";
        let upstream = Arc::new(MemoryUpstream::new().on_mutate(HttpMethod::Post, url, Status(201), None));
        let status = JiraActions::new(upstream.clone())
            .comment(&ctx(), "APF-27", "looks good")
            .await
            .unwrap();

        assert_eq!(status, Status(201));
        let call = &upstream.calls_to(url)[0];
        assert_eq!(call.payload, Payload::Json(json!({"body": "looks good"})));
        assert_eq!(call.authorization, "Basic abc");
    }

    #[tokio::test]
    async fn test_comment_on_dot_segment_makes_no_call() {
        let upstream = Arc::new(MemoryUpstream::new());
        let err = JiraActions::new(upstream.clone())
            .comment(&ctx(), "..", "hi")
            .await
            .unwrap_err();

        assert_eq!(err, UpstreamError::NotFound);
        assert_eq!(upstream.call_count(), 0);
    }

    #[tokio::test]
    async fn test_watch_encodes_issue_key() {
        let watchers = "https://jira.example.com/rest/api/2/issue/A%2Fb/watchers";
        let upstream = Arc::new(
            MemoryUpstream::new()
                .on_fetch("https://jira.example.com/rest/api/2/myself", json!({"name": "ann"}))
                .on_mutate(HttpMethod::Post, watchers, Status(204), None),
        );
        let status = JiraActions::new(upstream.clone()).watch(&ctx(), "A/b").await.unwrap();

        assert_eq!(status, Status::NO_CONTENT);
        assert_eq!(upstream.calls_to(watchers).len(), 1);
    }

    #[tokio::test]
    async fn test_watch_resolves_principal_first() {
        let watchers = "https://jira.example.com/rest/api/2/issue/APF-27/watchers";
        let upstream = Arc::new(
            MemoryUpstream::new()
                .on_fetch("https://jira.example.com/rest/api/2/myself", json!({"name": "harshas"}))
                .on_mutate(HttpMethod::Post, watchers, Status(204), None),
        );
        let status = JiraActions::new(upstream.clone())
            .watch(&ctx(), "APF-27")
            .await
            .unwrap();

        assert_eq!(status, Status::NO_CONTENT);
        let calls = upstream.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].method, HttpMethod::Get);
        assert_eq!(calls[1].payload, Payload::Json(json!("harshas")));
    }

    #[tokio::test]
    async fn test_watch_without_principal_makes_no_write() {
        let upstream = Arc::new(MemoryUpstream::new());
        let err = JiraActions::new(upstream.clone())
            .watch(&ctx(), "APF-27")
            .await
            .unwrap_err();

        assert_eq!(err, UpstreamError::NotFound);
        assert_eq!(upstream.call_count(), 1);
    }

    #[tokio::test]
    async fn test_verify_auth() {
        let upstream = Arc::new(
            MemoryUpstream::new()
                .on_fetch("https://jira.example.com/rest/api/2/myself", json!({"name": "x"})),
        );
        let actions = JiraActions::new(upstream);
        assert_eq!(actions.verify_auth(&ctx()).await, Ok(Status::NO_CONTENT));
    }
}
