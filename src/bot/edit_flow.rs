//! Multi-step administrative edits.
//!
//! `transition` is a pure function of (session state, input) plus the store
//! writes it performs. `EditFlowEngine` wraps it with the per-admin session
//! lock. Errors are folded into the reply at one point:
//!
//! * validation problems keep the current state and ask again,
//! * a vanished section or a store failure resets the admin to `Idle`.

use crate::bot::action_codec::{parse_id, Action, AdminCommand, AdminOp, AdminTarget, NavTarget};
use crate::bot::navigator::Button;
use crate::bot::session::{AdminSessions, SessionState};
use crate::helper::content_store::{ContentStore, StoreError};
use crate::models::{ItemContent, Section, SectionId, UserId};
use std::sync::Arc;

/// A freeform message as received from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageContent {
    Item(ItemContent),
    /// Anything that cannot become an item (stickers, voice notes, ...), by transport name.
    Unsupported(String),
}

impl MessageContent {
    pub fn text(&self) -> Option<&str> {
        match self {
            MessageContent::Item(ItemContent::Text { body }) => Some(body),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowInput {
    Command(AdminCommand),
    /// `home` or `back` pressed while something is pending.
    Cancel,
    Message(MessageContent),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowReply {
    /// The admin is asked for the next piece of input.
    Prompt(String),
    /// Like `Prompt`, with a button per top-level section to pick from.
    Pick {
        text: String,
        choices: Vec<Vec<Button>>,
    },
    /// A mutation went through; `refresh` is the node worth re-rendering.
    Done {
        message: String,
        refresh: Option<NavTarget>,
    },
    /// Input was rejected; the pending operation is still waiting.
    Corrective(String),
    /// The pending operation was abandoned.
    Failure(String),
    Cancelled,
}

impl FlowReply {
    pub fn text(&self) -> &str {
        match self {
            FlowReply::Prompt(text)
            | FlowReply::Pick { text, .. }
            | FlowReply::Corrective(text)
            | FlowReply::Failure(text)
            | FlowReply::Done { message: text, .. } => text.as_str(),
            FlowReply::Cancelled => "❎ Pending operation cancelled.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub next: SessionState,
    pub reply: FlowReply,
}

enum FlowError {
    NotFound(SectionId),
    Validation(String),
    Store(StoreError),
}

impl From<StoreError> for FlowError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::SectionNotFound(id) => FlowError::NotFound(id),
            StoreError::EmptyName => FlowError::Validation(EMPTY_NAME.to_string()),
            other => FlowError::Store(other),
        }
    }
}

const EMPTY_NAME: &str = "⚠️ The name must not be empty. Send it again:";
const ITEM_PROMPT: &str = "📎 Send the content now (text, photo, document, video, audio or animation). Media may carry a caption.";
const CHOICES_PER_ROW: usize = 2;

fn escape(text: &str) -> String {
    html_escape::encode_text(text).into_owned()
}

fn step(next: SessionState, reply: FlowReply) -> Result<Step, FlowError> {
    Ok(Step { next, reply })
}

fn existing<S: ContentStore + ?Sized>(store: &S, id: SectionId) -> Result<Section, FlowError> {
    store.get_section(id)?.ok_or(FlowError::NotFound(id))
}

fn pick_prompt(op: AdminOp) -> &'static str {
    match op {
        AdminOp::AddSection => "📌 Send the ID of the parent section (see /list):",
        AdminOp::Rename => "📌 Send the ID of the section to rename (see /list):",
        AdminOp::Delete => "🗑 Send the ID of the section to delete. Its subsections and content go with it (see /list):",
        AdminOp::AddItem(_) => "📌 Send the ID of the section to add content to (see /list):",
    }
}

fn pick_choices<S: ContentStore + ?Sized>(
    store: &S,
    op: AdminOp,
) -> Result<Vec<Vec<Button>>, FlowError> {
    let sections = store.get_children(None)?;
    Ok(sections
        .chunks(CHOICES_PER_ROW)
        .map(|row| {
            row.iter()
                .map(|section| {
                    let command = AdminCommand {
                        op,
                        target: AdminTarget::Section(section.id),
                    };
                    Button::new(section.name.clone(), Action::Admin(command))
                })
                .collect()
        })
        .collect())
}

fn required_name(content: &MessageContent) -> Result<&str, FlowError> {
    let text = content
        .text()
        .ok_or_else(|| FlowError::Validation("⚠️ Send the name as a text message:".to_string()))?;
    let name = text.trim();
    if name.is_empty() {
        return Err(FlowError::Validation(EMPTY_NAME.to_string()));
    }
    Ok(name)
}

/// Starts an admin operation. Whatever was pending before is dropped.
fn command<S: ContentStore + ?Sized>(store: &S, cmd: AdminCommand) -> Result<Step, FlowError> {
    match (cmd.op, cmd.target) {
        (op, AdminTarget::Pick) => step(
            SessionState::AwaitingSectionPick { for_action: op },
            FlowReply::Pick {
                text: pick_prompt(op).to_string(),
                choices: pick_choices(store, op)?,
            },
        ),
        (AdminOp::AddSection, AdminTarget::Root) => step(
            SessionState::AwaitingSectionName { parent_id: None },
            FlowReply::Prompt("✏️ Send the name of the new section:".to_string()),
        ),
        (AdminOp::AddSection, AdminTarget::Section(id)) => {
            let parent = existing(store, id)?;
            step(
                SessionState::AwaitingSectionName { parent_id: Some(id) },
                FlowReply::Prompt(format!(
                    "✏️ Send the name of the new subsection of <b>{}</b>:",
                    escape(&parent.name)
                )),
            )
        }
        (AdminOp::Rename, AdminTarget::Section(id)) => {
            let section = existing(store, id)?;
            step(
                SessionState::AwaitingRename { section_id: id },
                FlowReply::Prompt(format!(
                    "✏️ Send the new name for <b>{}</b>:",
                    escape(&section.name)
                )),
            )
        }
        (AdminOp::Delete, AdminTarget::Section(id)) => {
            let section = existing(store, id)?;
            let deleted = store.delete_section_cascade(id)?;
            log::info!(
                "Deleted section {} ({} sections, {} items)",
                id,
                deleted.sections,
                deleted.items
            );
            step(
                SessionState::Idle,
                FlowReply::Done {
                    message: format!(
                        "✅ Deleted <b>{}</b> with {} subsection(s) and {} item(s).",
                        escape(&section.name),
                        deleted.sections.saturating_sub(1),
                        deleted.items
                    ),
                    refresh: Some(NavTarget::from_parent(section.parent_id)),
                },
            )
        }
        (AdminOp::AddItem(kind), AdminTarget::Section(id)) => {
            existing(store, id)?;
            let prompt = match kind {
                Some(kind) => format!("📎 Send the {} to add:", kind),
                None => ITEM_PROMPT.to_string(),
            };
            step(
                SessionState::AwaitingItemContent { section_id: id, kind },
                FlowReply::Prompt(prompt),
            )
        }
        (AdminOp::Rename, AdminTarget::Root) => Err(FlowError::Validation(
            "⚠️ The main menu cannot be renamed.".to_string(),
        )),
        (AdminOp::Delete, AdminTarget::Root) => Err(FlowError::Validation(
            "⚠️ The main menu cannot be deleted.".to_string(),
        )),
        (AdminOp::AddItem(_), AdminTarget::Root) => Err(FlowError::Validation(
            "⚠️ Content belongs to a section. Open one first.".to_string(),
        )),
    }
}

fn apply<S: ContentStore + ?Sized>(
    store: &S,
    state: SessionState,
    input: &FlowInput,
) -> Result<Step, FlowError> {
    let content = match input {
        FlowInput::Cancel => return step(SessionState::Idle, FlowReply::Cancelled),
        FlowInput::Command(cmd) => return command(store, *cmd),
        FlowInput::Message(content) => content,
    };

    match state {
        SessionState::Idle => Err(FlowError::Validation(
            "Nothing is pending. Use /admin to start.".to_string(),
        )),
        SessionState::AwaitingSectionPick { for_action } => {
            let text = content.text().unwrap_or_default().trim();
            let id = parse_id(text).map_err(|_| {
                FlowError::Validation("❌ Send a numeric section ID (see /list):".to_string())
            })?;
            if store.get_section(id)?.is_none() {
                return Err(FlowError::Validation(format!(
                    "⚠️ There is no section {}. Send another ID:",
                    id
                )));
            }
            // Same path as pressing the section's own button.
            let direct = AdminCommand {
                op: for_action,
                target: AdminTarget::Section(id),
            };
            apply(store, SessionState::Idle, &FlowInput::Command(direct))
        }
        SessionState::AwaitingSectionName { parent_id } => {
            let name = required_name(content)?;
            let id = store.create_section(name, parent_id)?;
            log::info!("Created section {} under {:?}", id, parent_id);
            step(
                SessionState::Idle,
                FlowReply::Done {
                    message: format!("✅ Section <b>{}</b> created.", escape(name)),
                    refresh: Some(NavTarget::from_parent(parent_id)),
                },
            )
        }
        SessionState::AwaitingRename { section_id } => {
            let name = required_name(content)?;
            store.rename_section(section_id, name)?;
            step(
                SessionState::Idle,
                FlowReply::Done {
                    message: format!("✅ Renamed to <b>{}</b>.", escape(name)),
                    refresh: Some(NavTarget::Section(section_id)),
                },
            )
        }
        SessionState::AwaitingItemContent { section_id, kind } => {
            let item = match content {
                MessageContent::Item(item) => item,
                MessageContent::Unsupported(what) => {
                    return Err(FlowError::Validation(format!(
                        "⚠️ {} messages are not supported. Send text, a photo, document, video, audio or animation:",
                        escape(what)
                    )))
                }
            };
            if let ItemContent::Text { body } = item {
                if body.trim().is_empty() {
                    return Err(FlowError::Validation(
                        "⚠️ The text is empty. Send some text:".to_string(),
                    ));
                }
            }
            if let Some(expected) = kind {
                if item.kind() != expected {
                    return Err(FlowError::Validation(format!(
                        "⚠️ Expected a {}, got a {}. Send the {}:",
                        expected,
                        item.kind(),
                        expected
                    )));
                }
            }
            let id = store.create_item(section_id, item)?;
            log::info!("Added {} item {} to section {}", item.kind(), id, section_id);
            step(
                SessionState::Idle,
                FlowReply::Done {
                    message: "✅ Item added to the section.".to_string(),
                    refresh: Some(NavTarget::Section(section_id)),
                },
            )
        }
    }
}

/// Computes the next session state and reply for `input`.
pub fn transition<S: ContentStore + ?Sized>(
    store: &S,
    state: SessionState,
    input: &FlowInput,
) -> Step {
    match apply(store, state, input) {
        Ok(step) => step,
        Err(FlowError::Validation(message)) => Step {
            next: state,
            reply: FlowReply::Corrective(message),
        },
        Err(FlowError::NotFound(id)) => {
            log::warn!("Section {} vanished during {:?}", id, state);
            Step {
                next: SessionState::Idle,
                reply: FlowReply::Failure(format!("⚠️ Section {} no longer exists.", id)),
            }
        }
        Err(FlowError::Store(e)) => {
            log::error!("Content store failure during {:?}: {}", state, e);
            Step {
                next: SessionState::Idle,
                reply: FlowReply::Failure(
                    "❌ Something went wrong, nothing was changed. Please try again.".to_string(),
                ),
            }
        }
    }
}

pub struct EditFlowEngine<S> {
    store: Arc<S>,
    sessions: AdminSessions,
}

impl<S: ContentStore> EditFlowEngine<S> {
    pub fn new(store: Arc<S>, sessions: AdminSessions) -> Self {
        Self { store, sessions }
    }

    pub fn session(&self, admin: UserId) -> SessionState {
        self.sessions.get(admin)
    }

    /// Feeds one input from `admin` through the state machine.
    ///
    /// Returns `None` when there is nothing for the engine to do: a message or a
    /// cancel while the admin is `Idle`.
    pub fn handle(&self, admin: UserId, input: FlowInput) -> Option<FlowReply> {
        self.sessions.update(admin, |state| {
            if state.is_idle() && !matches!(input, FlowInput::Command(_)) {
                return (state, None);
            }
            let Step { next, reply } = transition(self.store.as_ref(), state, &input);
            (next, Some(reply))
        })
    }
}
