use crate::bot::action_codec::{decode, Action, AdminCommand, AdminOp, AdminTarget, NavTarget};
use crate::bot::edit_flow::{EditFlowEngine, FlowInput, FlowReply, MessageContent};
use crate::bot::navigator::{render, Button, NavError, RenderBody, RenderPlan, Viewer};
use crate::bot::session::{AdminSessions, SessionState};
use crate::helper::content_store::{ContentStore, StoreError};
use crate::models::{SectionId, UserId};
use serde::Serialize;
use std::sync::Arc;

const NO_PERMISSION: &str = "❌ You don't have permission to do that.";
const GENERIC_FAILURE: &str = "❌ Something went wrong. Please try again.";
const HINT: &str = "Use /start to open the menu.";

/// An event delivered by the chat transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// An inline button was pressed; `data` is its token.
    Callback { from: UserId, data: String },
    Message { from: UserId, content: MessageContent },
}

/// Something for the transport to deliver back to the user.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound {
    Render { plan: RenderPlan },
    Reply { text: String },
    /// A reply with buttons under it.
    Choice {
        text: String,
        keyboard: Vec<Vec<Button>>,
    },
    /// Short notice attached to a button press.
    Alert { text: String },
}

fn reply(text: impl Into<String>) -> Outbound {
    Outbound::Reply { text: text.into() }
}

fn alert(text: impl Into<String>) -> Outbound {
    Outbound::Alert { text: text.into() }
}

/// `/start@SomeBot args` -> `start`
fn slash_command(text: &str) -> Option<&str> {
    let word = text.trim().strip_prefix('/')?.split_whitespace().next()?;
    Some(word.split('@').next().unwrap_or(word))
}

pub struct Dispatcher<S> {
    admin_id: UserId,
    store: Arc<S>,
    engine: EditFlowEngine<S>,
}

impl<S: ContentStore> Dispatcher<S> {
    pub fn new(admin_id: UserId, store: Arc<S>) -> Self {
        let engine = EditFlowEngine::new(store.clone(), AdminSessions::new());
        Self {
            admin_id,
            store,
            engine,
        }
    }

    pub fn is_admin(&self, user: UserId) -> bool {
        user == self.admin_id
    }

    /// Session state of `user`; anyone but the administrator is always `Idle`.
    pub fn session(&self, user: UserId) -> SessionState {
        if self.is_admin(user) {
            self.engine.session(user)
        } else {
            SessionState::Idle
        }
    }

    fn viewer(&self, user: UserId) -> Viewer {
        if self.is_admin(user) {
            Viewer::Admin
        } else {
            Viewer::Public
        }
    }

    pub fn handle(&self, inbound: Inbound) -> Vec<Outbound> {
        match inbound {
            Inbound::Callback { from, data } => self.on_callback(from, &data),
            Inbound::Message { from, content } => self.on_message(from, content),
        }
    }

    fn on_callback(&self, from: UserId, data: &str) -> Vec<Outbound> {
        let action = match decode(data) {
            Ok(action) => action,
            Err(e) => {
                log::warn!("Unrecognized action '{}' from {}: {}", data, from, e);
                return vec![alert("⚠️ Unrecognized action.")];
            }
        };

        match action {
            Action::Home => {
                let mut out = self.cancel_pending(from);
                out.extend(self.navigate(from, NavTarget::Root, 0));
                out
            }
            Action::Back(target) => {
                let mut out = self.cancel_pending(from);
                match self.try_render(from, target, 0) {
                    Ok(plan) => out.push(Outbound::Render { plan }),
                    // The section went away; the main menu is the closest thing left.
                    Err(NavError::NotFound(_)) => {
                        out.extend(self.navigate(from, NavTarget::Root, 0))
                    }
                    Err(e) => out.push(self.nav_failure(e)),
                }
                out
            }
            Action::Section(id) => self.navigate(from, NavTarget::Section(id), 0),
            Action::Show { section, page } => {
                self.navigate(from, NavTarget::Section(section), page)
            }
            Action::Admin(cmd) => {
                if !self.is_admin(from) {
                    log::warn!("User {} tried admin action '{}'", from, data);
                    return vec![alert(NO_PERMISSION)];
                }
                self.run_flow(from, FlowInput::Command(cmd))
            }
        }
    }

    fn on_message(&self, from: UserId, content: MessageContent) -> Vec<Outbound> {
        let command = content.text().and_then(slash_command);
        match command {
            Some("start" | "menu" | "home") => {
                let mut out = self.cancel_pending(from);
                out.extend(self.navigate(from, NavTarget::Root, 0));
                return out;
            }
            Some("admin") => {
                if !self.is_admin(from) {
                    return vec![reply(NO_PERMISSION)];
                }
                return vec![Outbound::Render {
                    plan: admin_panel(),
                }];
            }
            Some("list") => {
                if !self.is_admin(from) {
                    return vec![reply(NO_PERMISSION)];
                }
                return match self.tree_listing() {
                    Ok(listing) => vec![reply(listing)],
                    Err(e) => {
                        log::error!("Could not list sections: {}", e);
                        vec![reply(GENERIC_FAILURE)]
                    }
                };
            }
            Some("cancel") if self.is_admin(from) => {
                let out = self.cancel_pending(from);
                return if out.is_empty() {
                    vec![reply("Nothing to cancel.")]
                } else {
                    out
                };
            }
            _ => {}
        }

        if !self.is_admin(from) {
            return vec![reply(HINT)];
        }
        match self.engine.handle(from, FlowInput::Message(content)) {
            Some(flow_reply) => self.flow_outbound(from, flow_reply),
            None => vec![reply(HINT)],
        }
    }

    fn cancel_pending(&self, from: UserId) -> Vec<Outbound> {
        if !self.is_admin(from) {
            return Vec::new();
        }
        self.engine
            .handle(from, FlowInput::Cancel)
            .map(|r| vec![reply(r.text())])
            .unwrap_or_default()
    }

    fn run_flow(&self, from: UserId, input: FlowInput) -> Vec<Outbound> {
        match self.engine.handle(from, input) {
            Some(flow_reply) => self.flow_outbound(from, flow_reply),
            None => Vec::new(),
        }
    }

    fn flow_outbound(&self, from: UserId, flow_reply: FlowReply) -> Vec<Outbound> {
        let mut out = vec![match &flow_reply {
            FlowReply::Pick { text, choices } => Outbound::Choice {
                text: text.clone(),
                keyboard: choices.clone(),
            },
            other => reply(other.text()),
        }];
        if let FlowReply::Done {
            refresh: Some(target),
            ..
        } = flow_reply
        {
            match self.try_render(from, target, 0) {
                Ok(plan) => out.push(Outbound::Render { plan }),
                Err(e) => log::warn!("Could not refresh {:?} after edit: {}", target, e),
            }
        }
        out
    }

    fn try_render(&self, from: UserId, target: NavTarget, page: u32) -> Result<RenderPlan, NavError> {
        render(self.store.as_ref(), target, page, self.viewer(from))
    }

    fn navigate(&self, from: UserId, target: NavTarget, page: u32) -> Vec<Outbound> {
        match self.try_render(from, target, page) {
            Ok(plan) => vec![Outbound::Render { plan }],
            Err(e) => vec![self.nav_failure(e)],
        }
    }

    fn nav_failure(&self, e: NavError) -> Outbound {
        match e {
            NavError::NotFound(_) => alert("⚠️ This section no longer exists."),
            NavError::Store(e) => {
                log::error!("Navigation failed: {}", e);
                alert(GENERIC_FAILURE)
            }
        }
    }

    /// Indented dump of the whole tree with ids, for answering picker prompts.
    fn tree_listing(&self) -> Result<String, StoreError> {
        let mut lines = Vec::new();
        self.collect_tree(None, 0, &mut lines)?;
        if lines.is_empty() {
            return Ok("(no sections yet)".to_string());
        }
        Ok(format!("<pre>{}</pre>", lines.join("\n")))
    }

    fn collect_tree(
        &self,
        parent: Option<SectionId>,
        depth: usize,
        lines: &mut Vec<String>,
    ) -> Result<(), StoreError> {
        for section in self.store.get_children(parent)? {
            lines.push(format!(
                "{}- {} (ID={})",
                "  ".repeat(depth),
                html_escape::encode_text(&section.name),
                section.id
            ));
            self.collect_tree(Some(section.id), depth + 1, lines)?;
        }
        Ok(())
    }
}

fn admin_panel() -> RenderPlan {
    let admin = |op, target| Action::Admin(AdminCommand { op, target });
    RenderPlan {
        title: "🛠 Admin panel".to_string(),
        body: RenderBody::Menu,
        keyboard: vec![
            vec![
                Button::new("➕ Add section", admin(AdminOp::AddSection, AdminTarget::Root)),
                Button::new("✏️ Rename section", admin(AdminOp::Rename, AdminTarget::Pick)),
            ],
            vec![
                Button::new("🗑 Delete section", admin(AdminOp::Delete, AdminTarget::Pick)),
                Button::new("📎 Add item", admin(AdminOp::AddItem(None), AdminTarget::Pick)),
            ],
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helper::content_store::{in_memory_store, SqliteContentStore};
    use crate::models::ItemContent;

    const ADMIN: UserId = 100;
    const VISITOR: UserId = 200;

    fn dispatcher() -> (Arc<SqliteContentStore>, Dispatcher<SqliteContentStore>) {
        let store = Arc::new(in_memory_store());
        (store.clone(), Dispatcher::new(ADMIN, store))
    }

    fn press(from: UserId, data: &str) -> Inbound {
        Inbound::Callback {
            from,
            data: data.to_string(),
        }
    }

    fn say(from: UserId, text: &str) -> Inbound {
        Inbound::Message {
            from,
            content: MessageContent::Item(ItemContent::Text {
                body: text.to_string(),
            }),
        }
    }

    fn plan(out: &[Outbound]) -> &RenderPlan {
        out.iter()
            .find_map(|o| match o {
                Outbound::Render { plan } => Some(plan),
                _ => None,
            })
            .expect("a render plan")
    }

    #[test]
    fn admin_builds_a_section_from_the_chat() {
        let (store, bot) = dispatcher();
        bot.handle(press(ADMIN, "admin:add_section:root"));
        let out = bot.handle(say(ADMIN, "Books"));

        assert!(matches!(&out[0], Outbound::Reply { text } if text.contains("Books")));
        let books = store.get_children(None).unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(plan(&out).buttons().next().unwrap().data, format!("section:{}", books[0].id));
        assert_eq!(bot.session(ADMIN), SessionState::Idle);
    }

    #[test]
    fn visitors_cannot_edit() {
        let (store, bot) = dispatcher();
        let section = store.create_section("S", None).unwrap();

        let out = bot.handle(press(VISITOR, &format!("admin:delete:{}", section)));
        assert_eq!(out, vec![alert(NO_PERMISSION)]);
        assert!(store.get_section(section).unwrap().is_some());

        assert_eq!(bot.handle(say(VISITOR, "/admin")), vec![reply(NO_PERMISSION)]);
        assert_eq!(bot.handle(say(VISITOR, "/list")), vec![reply(NO_PERMISSION)]);
        assert_eq!(bot.handle(say(VISITOR, "hello")), vec![reply(HINT)]);
        assert_eq!(bot.session(VISITOR), SessionState::Idle);
    }

    #[test]
    fn visitors_do_not_see_admin_buttons() {
        let (store, bot) = dispatcher();
        store.create_section("S", None).unwrap();
        let out = bot.handle(say(VISITOR, "/start"));
        assert!(plan(&out).buttons().all(|b| !b.data.starts_with("admin:")));

        let out = bot.handle(say(ADMIN, "/start@SectionBot"));
        assert!(plan(&out).buttons().any(|b| b.data == "admin:add_section:root"));
    }

    #[test]
    fn home_cancels_pending_operation() {
        let (_store, bot) = dispatcher();
        bot.handle(press(ADMIN, "admin:add_section:root"));
        let out = bot.handle(press(ADMIN, "home"));

        assert_eq!(out[0], reply(FlowReply::Cancelled.text()));
        assert_eq!(plan(&out).title, "📌 Main menu");
        assert_eq!(bot.session(ADMIN), SessionState::Idle);
    }

    #[test]
    fn malformed_tokens_are_a_no_op() {
        let (_store, bot) = dispatcher();
        bot.handle(press(ADMIN, "admin:rename:pick"));
        let out = bot.handle(press(ADMIN, "admin:rename:-3"));
        assert_eq!(out, vec![alert("⚠️ Unrecognized action.")]);
        assert!(matches!(
            bot.session(ADMIN),
            SessionState::AwaitingSectionPick { .. }
        ));
    }

    #[test]
    fn picker_buttons_complete_the_operation() {
        let (store, bot) = dispatcher();
        let section = store.create_section("Drafts", None).unwrap();

        let out = bot.handle(press(ADMIN, "admin:delete:pick"));
        let data = match &out[..] {
            [Outbound::Choice { keyboard, .. }] => keyboard[0][0].data.clone(),
            other => panic!("expected a choice, got {:?}", other),
        };
        assert_eq!(data, format!("admin:delete:{}", section));

        bot.handle(press(ADMIN, &data));
        assert_eq!(store.get_section(section).unwrap(), None);
        assert_eq!(bot.session(ADMIN), SessionState::Idle);
    }

    #[test]
    fn back_to_a_deleted_section_falls_back_to_root() {
        let (_store, bot) = dispatcher();
        let out = bot.handle(press(VISITOR, "back:42"));
        assert_eq!(plan(&out).title, "📌 Main menu");

        let out = bot.handle(press(VISITOR, "section:42"));
        assert!(matches!(&out[..], [Outbound::Alert { .. }]));
    }

    #[test]
    fn showing_an_empty_section_is_not_an_error() {
        let (store, bot) = dispatcher();
        let section = store.create_section("Three", None).unwrap();
        let out = bot.handle(press(VISITOR, &format!("show:{}:0", section)));
        let plan = plan(&out);
        assert_eq!(plan.body, RenderBody::Empty);
        let tokens: Vec<_> = plan.buttons().map(|b| b.data.as_str()).collect();
        assert_eq!(tokens, vec!["back:root", "home"]);
    }

    #[test]
    fn list_shows_the_tree_with_ids() {
        let (store, bot) = dispatcher();
        assert_eq!(
            bot.handle(say(ADMIN, "/list")),
            vec![reply("(no sections yet)")]
        );

        let a = store.create_section("A & B", None).unwrap();
        let b = store.create_section("Child", Some(a)).unwrap();
        let out = bot.handle(say(ADMIN, "/list"));
        assert_eq!(
            out,
            vec![reply(format!(
                "<pre>- A &amp; B (ID={})\n  - Child (ID={})</pre>",
                a, b
            ))]
        );
    }

    #[test]
    fn list_does_not_disturb_a_pending_pick() {
        let (store, bot) = dispatcher();
        let section = store.create_section("S", None).unwrap();
        bot.handle(press(ADMIN, "admin:add_item:pick"));
        bot.handle(say(ADMIN, "/list"));
        bot.handle(say(ADMIN, &section.to_string()));
        assert_eq!(
            bot.session(ADMIN),
            SessionState::AwaitingItemContent {
                section_id: section,
                kind: None
            }
        );
    }

    #[test]
    fn cancel_command_reports_when_idle() {
        let (_store, bot) = dispatcher();
        assert_eq!(bot.handle(say(ADMIN, "/cancel")), vec![reply("Nothing to cancel.")]);
    }

    #[test]
    fn idle_admin_chatter_gets_a_hint() {
        let (store, bot) = dispatcher();
        assert_eq!(bot.handle(say(ADMIN, "hello")), vec![reply(HINT)]);
        assert!(store.get_children(None).unwrap().is_empty());
    }
}
