#![warn(unused_extern_crates, missing_debug_implementations, rust_2018_idioms)]
#![forbid(unsafe_code)]

//! An implementation of the siren hypermedia format.
//!
//! Entities model the documents served by cnd's REST API: a tree of
//! properties, embedded sub-entities, navigational links and the actions
//! that are currently legal on the resource.

mod http_serde;

use serde::{Deserialize, Serialize};

/// A siren document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub class: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<SubEntity>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<NavigationalLink>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<Action>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Entity {
    pub fn with_class_member(mut self, class: impl Into<String>) -> Self {
        self.class.push(class.into());
        self
    }

    /// Attach properties to this entity.
    ///
    /// Fails if `properties` does not serialize to a JSON object.
    pub fn with_properties<T>(mut self, properties: T) -> Result<Self, Error>
    where
        T: Serialize,
    {
        let value = serde_json::to_value(properties)?;

        if !value.is_object() {
            return Err(Error::NotAnObject);
        }

        self.properties = Some(value);
        Ok(self)
    }

    pub fn with_link(mut self, link: NavigationalLink) -> Self {
        self.links.push(link);
        self
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    pub fn push_sub_entity(&mut self, sub_entity: SubEntity) {
        self.entities.push(sub_entity);
    }

    /// The href of the first link carrying the given relation.
    pub fn link_with_rel(&self, rel: &str) -> Option<&str> {
        self.links
            .iter()
            .find(|link| link.rel.iter().any(|r| r == rel))
            .map(|link| link.href.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to serialize entity properties")]
    Serde(#[from] serde_json::Error),
    #[error("entity properties must serialize to a JSON object")]
    NotAnObject,
}

/// A sub-entity is either an embedded link or an embedded representation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubEntity {
    Link(EntityLink),
    Representation(EmbeddedRepresentation),
}

impl SubEntity {
    pub fn from_link(link: EntityLink) -> Self {
        SubEntity::Link(link)
    }

    pub fn from_entity(entity: Entity, rel: &[&str]) -> Self {
        SubEntity::Representation(EmbeddedRepresentation {
            rel: rel.iter().map(|rel| (*rel).to_owned()).collect(),
            entity,
        })
    }

    /// The href identifying the resource behind this sub-entity, if any.
    ///
    /// For embedded links this is the link itself, for embedded
    /// representations the representation's `self` link.
    pub fn href(&self) -> Option<&str> {
        match self {
            SubEntity::Link(link) => Some(link.href.as_str()),
            SubEntity::Representation(embedded) => embedded.entity.link_with_rel("self"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityLink {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub class: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub rel: Vec<String>,
    pub href: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub _type: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedRepresentation {
    pub rel: Vec<String>,
    #[serde(flatten)]
    pub entity: Entity,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NavigationalLink {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub class: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub rel: Vec<String>,
    pub href: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub _type: Option<String>,
}

impl NavigationalLink {
    pub fn new(rel: &[&str], href: impl Into<String>) -> Self {
        Self {
            rel: rel.iter().map(|rel| (*rel).to_owned()).collect(),
            href: href.into(),
            class: Vec::new(),
            title: None,
            _type: None,
        }
    }

    pub fn with_class_member(mut self, class: impl Into<String>) -> Self {
        self.class.push(class.into());
        self
    }
}

/// A named next-step that is currently legal on an entity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub class: Vec<String>,
    #[serde(
        default = "default_method",
        with = "http_serde::method",
        skip_serializing_if = "is_get"
    )]
    pub method: http::Method,
    pub href: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub _type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<Field>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

// Absent methods default to GET, both ways.
fn default_method() -> http::Method {
    http::Method::GET
}

fn is_get(method: &http::Method) -> bool {
    *method == http::Method::GET
}

/// An input an action expects the client to fill in.
///
/// The `class` tags describe the semantics of the field, e.g.
/// `["bitcoin", "address"]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub class: Vec<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub _type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}
