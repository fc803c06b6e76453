//! The normalized card model.
//!
//! Cards are assembled through the staged builders in this module and are
//! immutable once [`CardDraft::build`] returns. Fields are private and only
//! exposed through accessors.

use crate::core::document::{DocumentError, UpstreamDocument};
use crate::upstream::{Credentials, UpstreamError};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Head,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Head => "HEAD",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CardBodyFieldType {
    General,
    Comment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CardActionKey {
    Direct,
    OpenIn,
    UserInput,
}

/// Per-request routing information shared read-only by every fan-out unit.
#[derive(Debug, Clone)]
pub struct CardContext {
    pub credentials: Credentials,
    /// Location of the upstream system, e.g. `https://jira.example.com`.
    pub base_url: String,
    /// Prefix under which this service's own endpoints are reachable.
    pub routing_prefix: String,
}

impl CardContext {
    pub fn new(
        credentials: Credentials,
        base_url: impl Into<String>,
        routing_prefix: impl Into<String>,
    ) -> Self {
        CardContext {
            credentials,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            routing_prefix: routing_prefix.into(),
        }
    }

    /// Composes an intra-service URL under the routing prefix.
    pub fn routed(&self, relative: &str) -> String {
        let relative = relative.trim_start_matches('/');
        if self.routing_prefix.ends_with('/') {
            format!("{}{}", self.routing_prefix, relative)
        } else {
            format!("{}/{}", self.routing_prefix, relative)
        }
    }

    /// Composes an upstream-absolute URL under the base location.
    pub fn upstream(&self, relative: &str) -> String {
        format!("{}/{}", self.base_url, relative.trim_start_matches('/'))
    }
}

/// Transforms one upstream document into one card. Implementations do no I/O.
pub trait CardBuilder: Send + Sync {
    /// Where the document for `identifier` is read from. Fails when the
    /// identifier cannot address a single item.
    fn item_url(&self, ctx: &CardContext, identifier: &str) -> Result<String, UpstreamError>;

    /// Fails only when a required field is absent.
    fn build(
        &self,
        document: &UpstreamDocument,
        identifier: &str,
        ctx: &CardContext,
    ) -> Result<Card, DocumentError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardHeader {
    title: String,
    subtitle: Vec<String>,
}

impl CardHeader {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn subtitle(&self) -> &[String] {
        &self.subtitle
    }
}

/// One rendering entry of a body field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardBodyContent {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardBodyField {
    title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(rename = "type")]
    kind: CardBodyFieldType,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    content: Vec<CardBodyContent>,
}

impl CardBodyField {
    pub fn builder(title: impl Into<String>, kind: CardBodyFieldType) -> CardBodyFieldBuilder {
        CardBodyFieldBuilder {
            title: title.into(),
            description: None,
            kind,
            content: Vec::new(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn kind(&self) -> CardBodyFieldType {
        self.kind
    }

    pub fn content(&self) -> &[CardBodyContent] {
        &self.content
    }
}

pub struct CardBodyFieldBuilder {
    title: String,
    description: Option<String>,
    kind: CardBodyFieldType,
    content: Vec<CardBodyContent>,
}

impl CardBodyFieldBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn content(mut self, text: impl Into<String>) -> Self {
        self.content.push(CardBodyContent { text: text.into() });
        self
    }

    pub fn build(self) -> CardBodyField {
        CardBodyField {
            title: self.title,
            description: self.description,
            kind: self.kind,
            content: self.content,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardBody {
    description: String,
    fields: Vec<CardBodyField>,
}

impl CardBody {
    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn fields(&self) -> &[CardBodyField] {
        &self.fields
    }

    pub fn field(&self, title: &str) -> Option<&CardBodyField> {
        self.fields.iter().find(|f| f.title == title)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardActionInputField {
    pub id: String,
    pub label: String,
    pub format: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardAction {
    id: Uuid,
    label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    completed_label: Option<String>,
    action_key: CardActionKey,
    url: String,
    #[serde(rename = "type")]
    method: HttpMethod,
    allow_repeated: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    user_input: Vec<CardActionInputField>,
}

impl CardAction {
    pub fn builder(
        label: impl Into<String>,
        action_key: CardActionKey,
        method: HttpMethod,
        url: impl Into<String>,
    ) -> CardActionBuilder {
        CardActionBuilder {
            label: label.into(),
            completed_label: None,
            action_key,
            url: url.into(),
            method,
            allow_repeated: false,
            user_input: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn completed_label(&self) -> Option<&str> {
        self.completed_label.as_deref()
    }

    pub fn action_key(&self) -> CardActionKey {
        self.action_key
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn allow_repeated(&self) -> bool {
        self.allow_repeated
    }

    pub fn user_input(&self) -> &[CardActionInputField] {
        &self.user_input
    }
}

pub struct CardActionBuilder {
    label: String,
    completed_label: Option<String>,
    action_key: CardActionKey,
    url: String,
    method: HttpMethod,
    allow_repeated: bool,
    user_input: Vec<CardActionInputField>,
}

impl CardActionBuilder {
    pub fn completed_label(mut self, label: impl Into<String>) -> Self {
        self.completed_label = Some(label.into());
        self
    }

    pub fn allow_repeated(mut self, allow: bool) -> Self {
        self.allow_repeated = allow;
        self
    }

    pub fn user_input(
        mut self,
        id: impl Into<String>,
        label: impl Into<String>,
        format: impl Into<String>,
    ) -> Self {
        self.user_input.push(CardActionInputField {
            id: id.into(),
            label: label.into(),
            format: format.into(),
        });
        self
    }

    pub fn build(self) -> CardAction {
        CardAction {
            id: Uuid::new_v4(),
            label: self.label,
            completed_label: self.completed_label,
            action_key: self.action_key,
            url: self.url,
            method: self.method,
            allow_repeated: self.allow_repeated,
            user_input: self.user_input,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Card {
    id: Uuid,
    /// Identifier of the upstream item this card was built from.
    source: String,
    name: String,
    template: String,
    header: CardHeader,
    body: CardBody,
    actions: Vec<CardAction>,
}

impl Card {
    pub fn builder(source: impl Into<String>, name: impl Into<String>) -> CardDraft {
        CardDraft {
            source: source.into(),
            name: name.into(),
            template: String::new(),
            header: CardHeader {
                title: String::new(),
                subtitle: Vec::new(),
            },
            description: String::new(),
            fields: Vec::new(),
            actions: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn header(&self) -> &CardHeader {
        &self.header
    }

    pub fn body(&self) -> &CardBody {
        &self.body
    }

    pub fn actions(&self) -> &[CardAction] {
        &self.actions
    }

    pub fn action(&self, key: CardActionKey) -> Option<&CardAction> {
        self.actions.iter().find(|a| a.action_key == key)
    }
}

/// Accumulates card parts; [`build`](CardDraft::build) freezes them.
pub struct CardDraft {
    source: String,
    name: String,
    template: String,
    header: CardHeader,
    description: String,
    fields: Vec<CardBodyField>,
    actions: Vec<CardAction>,
}

impl CardDraft {
    pub fn template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    pub fn header(mut self, title: impl Into<String>, subtitle: impl Into<String>) -> Self {
        self.header = CardHeader {
            title: title.into(),
            subtitle: vec![subtitle.into()],
        };
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// `None` is accepted so optional fields can be chained without branching.
    pub fn field(mut self, field: Option<CardBodyField>) -> Self {
        self.fields.extend(field);
        self
    }

    pub fn action(mut self, action: CardAction) -> Self {
        self.actions.push(action);
        self
    }

    pub fn build(self) -> Card {
        Card {
            id: Uuid::new_v4(),
            source: self.source,
            name: self.name,
            template: self.template,
            header: self.header,
            body: CardBody {
                description: self.description,
                fields: self.fields,
            },
            actions: self.actions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(prefix: &str) -> CardContext {
        CardContext::new(Credentials::new("token"), "https://jira.example.com/", prefix)
    }

    #[test]
    fn test_routed_urls_join_with_single_slash() {
        assert_eq!(ctx("https://hub/conn/").routed("api/v1/x"), "https://hub/conn/api/v1/x");
        assert_eq!(ctx("https://hub/conn").routed("/api/v1/x"), "https://hub/conn/api/v1/x");
    }

    #[test]
    fn test_upstream_urls_strip_trailing_base_slash() {
        assert_eq!(
            ctx("p/").upstream("/browse/ABC-1"),
            "https://jira.example.com/browse/ABC-1"
        );
    }

    #[test]
    fn test_draft_skips_absent_fields() {
        let card = Card::builder("ABC-1", "Jira")
            .description("summary")
            .field(None)
            .field(Some(
                CardBodyField::builder("Status", CardBodyFieldType::General)
                    .description("Open")
                    .build(),
            ))
            .build();

        assert_eq!(card.source(), "ABC-1");
        assert_eq!(card.body().fields().len(), 1);
        assert_eq!(card.body().field("Status").unwrap().description(), Some("Open"));
    }

    #[test]
    fn test_action_serializes_with_wire_names() {
        let action = CardAction::builder(
            "Comment",
            CardActionKey::UserInput,
            HttpMethod::Post,
            "p/api/v1/issues/1/comment",
        )
        .user_input("body", "Comment", "textarea")
        .build();

        let value = serde_json::to_value(&action).unwrap();
        assert_eq!(value["actionKey"], "USER_INPUT");
        assert_eq!(value["type"], "POST");
        assert_eq!(value["allowRepeated"], false);
        assert_eq!(value["userInput"][0]["format"], "textarea");
        assert!(value.get("completedLabel").is_none());
    }
}
