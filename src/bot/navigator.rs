use crate::bot::action_codec::{encode, Action, AdminCommand, AdminOp, AdminTarget, NavTarget};
use crate::helper::content_store::{ContentStore, StoreError};
use crate::models::{Item, Section, SectionId};
use serde::Serialize;
use thiserror::Error;

const SECTIONS_PER_ROW: usize = 2;

#[derive(Error, Debug)]
pub enum NavError {
    #[error("Section {0} not found")]
    NotFound(SectionId),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub data: String,
}

impl Button {
    pub fn new(label: impl Into<String>, action: Action) -> Self {
        Self {
            label: label.into(),
            data: encode(&action),
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RenderBody {
    /// Only the title and buttons are shown.
    Menu,
    /// The node has neither child sections nor items.
    Empty,
    Item {
        item: Item,
        index: usize,
        total: usize,
    },
}

/// Everything a transport needs to show one node of the tree.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct RenderPlan {
    /// HTML, section names escaped.
    pub title: String,
    pub body: RenderBody,
    pub keyboard: Vec<Vec<Button>>,
}

impl RenderPlan {
    pub fn buttons(&self) -> impl Iterator<Item = &Button> {
        self.keyboard.iter().flatten()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewer {
    Public,
    Admin,
}

fn section_rows(children: &[Section]) -> Vec<Vec<Button>> {
    children
        .chunks(SECTIONS_PER_ROW)
        .map(|row| {
            row.iter()
                .map(|s| Button::new(format!("📂 {}", s.name), Action::Section(s.id)))
                .collect()
        })
        .collect()
}

fn page_row(section_id: SectionId, selected: usize, total: usize) -> Vec<Button> {
    (0..total)
        .map(|index| {
            let label = if index == selected {
                format!("· {} ·", index + 1)
            } else {
                (index + 1).to_string()
            };
            Button::new(
                label,
                Action::Show {
                    section: section_id,
                    page: index as u32,
                },
            )
        })
        .collect()
}

fn admin(op: AdminOp, target: AdminTarget) -> Action {
    Action::Admin(AdminCommand { op, target })
}

fn admin_rows(section_id: Option<SectionId>) -> Vec<Vec<Button>> {
    match section_id {
        None => vec![vec![Button::new(
            "➕ Add section",
            admin(AdminOp::AddSection, AdminTarget::Root),
        )]],
        Some(id) => {
            let target = AdminTarget::Section(id);
            vec![
                vec![
                    Button::new("✏️ Rename", admin(AdminOp::Rename, target)),
                    Button::new("🗑 Delete", admin(AdminOp::Delete, target)),
                ],
                vec![
                    Button::new("➕ Add subsection", admin(AdminOp::AddSection, target)),
                    Button::new("📎 Add item", admin(AdminOp::AddItem(None), target)),
                ],
            ]
        }
    }
}

fn nav_row(parent_id: Option<SectionId>) -> Vec<Button> {
    vec![
        Button::new("⬅️ Back", Action::Back(NavTarget::from_parent(parent_id))),
        Button::new("🏠 Home", Action::Home),
    ]
}

fn escape(name: &str) -> String {
    html_escape::encode_text(name).into_owned()
}

/// Builds the view of `target`, showing the item at `page` (clamped to the last one).
pub fn render<S: ContentStore + ?Sized>(
    store: &S,
    target: NavTarget,
    page: u32,
    viewer: Viewer,
) -> Result<RenderPlan, NavError> {
    let section = match target {
        NavTarget::Root => None,
        NavTarget::Section(id) => Some(store.get_section(id)?.ok_or(NavError::NotFound(id))?),
    };
    let section_id = section.as_ref().map(|s| s.id);

    let children = store.get_children(section_id)?;
    let items = match section_id {
        Some(id) => store.get_items(id)?,
        None => Vec::new(),
    };

    let mut keyboard = section_rows(&children);

    let mut title = match &section {
        None => "📌 Main menu".to_string(),
        Some(s) => format!("📂 <b>{}</b>", escape(&s.name)),
    };

    let body = match (section_id, items.is_empty()) {
        (Some(id), false) => {
            let total = items.len();
            let index = (page as usize).min(total - 1);
            keyboard.push(page_row(id, index, total));
            title.push_str(&format!(" · {}/{}", index + 1, total));
            let item = items.into_iter().nth(index).ok_or(NavError::NotFound(id))?;
            RenderBody::Item { item, index, total }
        }
        _ if children.is_empty() => RenderBody::Empty,
        _ => RenderBody::Menu,
    };

    if viewer == Viewer::Admin {
        keyboard.extend(admin_rows(section_id));
    }

    if let Some(s) = &section {
        keyboard.push(nav_row(s.parent_id));
    }

    Ok(RenderPlan {
        title,
        body,
        keyboard,
    })
}
