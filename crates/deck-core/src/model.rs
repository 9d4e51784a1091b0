//! Presentation, slide, element and participant types

use crate::error::{Error, Result};
use crate::role::Role;
use serde::{Deserialize, Deserializer, Serialize};

/// Maximum presentation ID length in bytes
pub const MAX_PRESENTATION_ID_LEN: usize = 128;

/// Slide identifier, unique within a presentation
pub type SlideId = String;

/// Element identifier, unique within its owning slide
pub type ElementId = String;

/// Presentation identifier - interpolated into hub calls and URL paths
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PresentationId(String);

impl PresentationId {
    /// Create a new presentation ID, validating the format
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();

        if id.is_empty() {
            return Err(Error::InvalidPresentationId("Presentation ID cannot be empty".into()));
        }

        if id.len() > MAX_PRESENTATION_ID_LEN {
            return Err(Error::InvalidPresentationId(format!(
                "Presentation ID exceeds {} bytes",
                MAX_PRESENTATION_ID_LEN
            )));
        }

        // Validate pattern: [a-zA-Z0-9_-]+
        if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            return Err(Error::InvalidPresentationId(
                "Presentation ID must match pattern [a-zA-Z0-9_-]+".into(),
            ));
        }

        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PresentationId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<PresentationId> for String {
    fn from(id: PresentationId) -> Self {
        id.0
    }
}

impl std::fmt::Display for PresentationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A full presentation document as returned by a snapshot fetch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Presentation {
    pub id: PresentationId,
    pub title: String,
    pub creator_name: String,
    #[serde(default)]
    pub slides: Vec<Slide>,
}

/// A slide; `order` defines display sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slide {
    pub id: SlideId,
    pub order: i32,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub elements: Vec<SlideElement>,
}

/// Servers send `"elements": null` for slides nobody has drawn on yet
fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<Vec<T>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl Slide {
    pub fn new(id: impl Into<SlideId>, order: i32) -> Self {
        Self {
            id: id.into(),
            order,
            elements: Vec::new(),
        }
    }
}

/// Free-text block placed on a slide
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextBlock {
    pub id: ElementId,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub text: String,
    pub font_size: f64,
    pub font_family: String,
    pub color: String,
}

/// Image placed on a slide, referenced by URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageBlock {
    pub id: ElementId,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub url: String,
}

/// Slide content, discriminated on the wire by `$type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "$type")]
pub enum SlideElement {
    #[serde(rename = "text")]
    Text(TextBlock),
    #[serde(rename = "image")]
    Image(ImageBlock),
}

impl SlideElement {
    pub fn id(&self) -> &str {
        match self {
            SlideElement::Text(t) => &t.id,
            SlideElement::Image(i) => &i.id,
        }
    }

    /// Top-left corner `(x, y)`
    pub fn position(&self) -> (f64, f64) {
        match self {
            SlideElement::Text(t) => (t.x, t.y),
            SlideElement::Image(i) => (i.x, i.y),
        }
    }

    /// `(width, height)`
    pub fn size(&self) -> (f64, f64) {
        match self {
            SlideElement::Text(t) => (t.width, t.height),
            SlideElement::Image(i) => (i.width, i.height),
        }
    }

    /// Copy of this element moved to `(x, y)`
    pub fn moved_to(&self, x: f64, y: f64) -> Self {
        let mut moved = self.clone();
        match &mut moved {
            SlideElement::Text(t) => {
                t.x = x;
                t.y = y;
            }
            SlideElement::Image(i) => {
                i.x = x;
                i.y = y;
            }
        }
        moved
    }

    /// Wire discriminant (`text` / `image`)
    pub fn kind(&self) -> &'static str {
        match self {
            SlideElement::Text(_) => "text",
            SlideElement::Image(_) => "image",
        }
    }
}

/// A connected user and their role in the session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub name: String,
    pub role: Role,
}

impl Participant {
    pub fn new(name: impl Into<String>, role: Role) -> Self {
        Self {
            name: name.into(),
            role,
        }
    }
}
