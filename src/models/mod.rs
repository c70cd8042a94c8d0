use serde::Serialize;
use std::fmt;
use std::str::FromStr;

pub type SectionId = u32;
pub type ItemId = u32;
pub type UserId = i64;

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct Section {
    pub id: SectionId,
    pub name: String,
    pub parent_id: Option<SectionId>,
    pub position: i64,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Text,
    Photo,
    Document,
    Video,
    Audio,
    Animation,
}

/// Kinds that carry an opaque transport media reference instead of a text body.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Photo,
    Document,
    Video,
    Audio,
    Animation,
}

impl ItemKind {
    pub const ALL: [ItemKind; 6] = [
        ItemKind::Text,
        ItemKind::Photo,
        ItemKind::Document,
        ItemKind::Video,
        ItemKind::Audio,
        ItemKind::Animation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Text => "text",
            ItemKind::Photo => "photo",
            ItemKind::Document => "document",
            ItemKind::Video => "video",
            ItemKind::Audio => "audio",
            ItemKind::Animation => "animation",
        }
    }

    pub fn media(&self) -> Option<MediaKind> {
        match self {
            ItemKind::Text => None,
            ItemKind::Photo => Some(MediaKind::Photo),
            ItemKind::Document => Some(MediaKind::Document),
            ItemKind::Video => Some(MediaKind::Video),
            ItemKind::Audio => Some(MediaKind::Audio),
            ItemKind::Animation => Some(MediaKind::Animation),
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownItemKind(pub String);

impl fmt::Display for UnknownItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown item kind '{}'", self.0)
    }
}

impl std::error::Error for UnknownItemKind {}

impl FromStr for ItemKind {
    type Err = UnknownItemKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ItemKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownItemKind(s.to_string()))
    }
}

impl From<MediaKind> for ItemKind {
    fn from(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Photo => ItemKind::Photo,
            MediaKind::Document => ItemKind::Document,
            MediaKind::Video => ItemKind::Video,
            MediaKind::Audio => ItemKind::Audio,
            MediaKind::Animation => ItemKind::Animation,
        }
    }
}

/// The payload of an item. A text body and a media reference are mutually
/// exclusive, and the kind is derived from the variant.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemContent {
    Text {
        body: String,
    },
    Media {
        media: MediaKind,
        file_id: String,
        caption: Option<String>,
    },
}

impl ItemContent {
    pub fn kind(&self) -> ItemKind {
        match self {
            ItemContent::Text { .. } => ItemKind::Text,
            ItemContent::Media { media, .. } => ItemKind::from(*media),
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct Item {
    pub id: ItemId,
    pub section_id: SectionId,
    pub content: ItemContent,
    pub position: i64,
}

/// Result of a cascading section delete.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct DeletedSubtree {
    pub sections: usize,
    pub items: usize,
}

pub mod db_operations;
