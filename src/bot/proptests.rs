//! Property-based tests for the codec and the edit flows.
//!
//! Random interaction sequences are replayed through the dispatcher against an
//! in-memory database, and the stored tree is checked after every step.

use super::action_codec::*;
use super::dispatcher::{Dispatcher, Inbound};
use super::edit_flow::MessageContent;
use super::session::SessionState;
use crate::helper::content_store::{in_memory_store, ContentStore, SqliteContentStore};
use crate::models::{ItemContent, ItemKind, MediaKind, SectionId, UserId};
use proptest::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

const ADMIN: UserId = 7;
const VISITOR: UserId = 8;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_item_kind() -> impl Strategy<Value = ItemKind> {
    prop::sample::select(ItemKind::ALL.to_vec())
}

fn arb_media_kind() -> impl Strategy<Value = MediaKind> {
    prop_oneof![
        Just(MediaKind::Photo),
        Just(MediaKind::Document),
        Just(MediaKind::Video),
        Just(MediaKind::Audio),
        Just(MediaKind::Animation),
    ]
}

fn arb_admin_op() -> impl Strategy<Value = AdminOp> {
    prop_oneof![
        Just(AdminOp::AddSection),
        Just(AdminOp::Rename),
        Just(AdminOp::Delete),
        prop::option::of(arb_item_kind()).prop_map(AdminOp::AddItem),
    ]
}

fn arb_admin_target(ids: impl Strategy<Value = SectionId>) -> impl Strategy<Value = AdminTarget> {
    prop_oneof![
        Just(AdminTarget::Root),
        Just(AdminTarget::Pick),
        ids.prop_map(AdminTarget::Section),
    ]
}

fn arb_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        Just(Action::Home),
        Just(Action::Back(NavTarget::Root)),
        any::<u32>().prop_map(|id| Action::Back(NavTarget::Section(id))),
        any::<u32>().prop_map(Action::Section),
        (any::<u32>(), any::<u32>()).prop_map(|(section, page)| Action::Show { section, page }),
        (arb_admin_op(), arb_admin_target(any::<u32>()))
            .prop_map(|(op, target)| Action::Admin(AdminCommand { op, target })),
    ]
}

/// Actions over a handful of ids so that sequences actually hit existing sections.
fn arb_small_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        1 => Just(Action::Home),
        1 => (0u32..6).prop_map(|id| Action::Back(NavTarget::Section(id))),
        1 => (0u32..6, 0u32..3).prop_map(|(section, page)| Action::Show { section, page }),
        4 => (arb_admin_op(), arb_admin_target(0u32..6))
            .prop_map(|(op, target)| Action::Admin(AdminCommand { op, target })),
    ]
}

fn arb_message() -> impl Strategy<Value = MessageContent> {
    prop_oneof![
        3 => prop::sample::select(vec!["Books", "  ", "1", "2", "3", "5", "x", "/list"])
            .prop_map(|body| MessageContent::Item(ItemContent::Text { body: body.to_string() })),
        1 => (arb_media_kind(), prop::option::of("[a-z]{1,8}")).prop_map(|(media, caption)| {
            MessageContent::Item(ItemContent::Media {
                media,
                file_id: "file".to_string(),
                caption,
            })
        }),
        1 => Just(MessageContent::Unsupported("sticker".to_string())),
    ]
}

#[derive(Debug, Clone)]
enum Input {
    Press(Action),
    Say(MessageContent),
}

fn arb_inbound(from: impl Strategy<Value = UserId>) -> impl Strategy<Value = Inbound> {
    let input = prop_oneof![
        arb_small_action().prop_map(Input::Press),
        arb_message().prop_map(Input::Say),
    ];
    (from, input).prop_map(|(from, input)| match input {
        Input::Press(action) => Inbound::Callback {
            from,
            data: encode(&action),
        },
        Input::Say(content) => Inbound::Message { from, content },
    })
}

// ============================================================================
// Test Helpers
// ============================================================================

type SectionRow = (SectionId, String, Option<SectionId>, i64);
type ItemRow = (u32, SectionId, String, Option<String>, Option<String>, Option<String>, i64);

fn snapshot(store: &SqliteContentStore) -> (Vec<SectionRow>, Vec<ItemRow>) {
    let conn = store.pool().get().unwrap();
    let mut stmt = conn
        .prepare("SELECT id, name, parent_id, position FROM sections ORDER BY id")
        .unwrap();
    let sections = stmt
        .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    let mut stmt = conn
        .prepare("SELECT id, section_id, type, text, file_id, caption, position FROM items ORDER BY id")
        .unwrap();
    let items = stmt
        .query_map([], |r| {
            Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?, r.get(5)?, r.get(6)?))
        })
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    (sections, items)
}

fn assert_tree_invariants(store: &SqliteContentStore) {
    let (sections, items) = snapshot(store);
    let parents: HashMap<SectionId, Option<SectionId>> =
        sections.iter().map(|(id, _, parent, _)| (*id, *parent)).collect();

    for (id, name, _, _) in &sections {
        assert!(!name.trim().is_empty());
        let mut current = parents[id];
        let mut steps = 0;
        while let Some(parent) = current {
            assert!(parents.contains_key(&parent), "section {} has a dangling ancestor", id);
            steps += 1;
            assert!(steps <= sections.len(), "section {} is its own ancestor", id);
            current = parents[&parent];
        }
    }
    for (id, section_id, kind, text, file_id, _, _) in &items {
        assert!(parents.contains_key(section_id), "item {} is orphaned", id);
        assert_eq!(kind == "text", text.is_some());
        assert_eq!(kind == "text", file_id.is_none());
        assert!(text.as_deref().map_or(true, |t| !t.trim().is_empty()), "item {} is blank", id);
    }
}

fn descendants(sections: &[SectionRow], root: SectionId) -> HashSet<SectionId> {
    let mut found = HashSet::from([root]);
    loop {
        let before = found.len();
        for (id, _, parent, _) in sections {
            if parent.map_or(false, |p| found.contains(&p)) {
                found.insert(*id);
            }
        }
        if found.len() == before {
            return found;
        }
    }
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn codec_round_trips(action in arb_action()) {
        let token = encode(&action);
        prop_assert!(token.len() <= MAX_TOKEN_LEN);
        prop_assert_eq!(decode(&token), Ok(action));
    }

    #[test]
    fn decode_never_panics(token in "[a-z_:0-9-]{0,80}") {
        let _ = decode(&token);
    }

    #[test]
    fn tree_stays_a_forest(inputs in prop::collection::vec(arb_inbound(Just(ADMIN)), 1..40)) {
        let store = Arc::new(in_memory_store());
        let bot = Dispatcher::new(ADMIN, store.clone());
        for inbound in inputs {
            bot.handle(inbound);
            assert_tree_invariants(&store);
        }
    }

    #[test]
    fn visitors_never_change_anything(
        setup in prop::collection::vec(arb_inbound(Just(ADMIN)), 0..20),
        visits in prop::collection::vec(arb_inbound(Just(VISITOR)), 1..30),
    ) {
        let store = Arc::new(in_memory_store());
        let bot = Dispatcher::new(ADMIN, store.clone());
        for inbound in setup {
            bot.handle(inbound);
        }

        let before = snapshot(&store);
        let admin_state = bot.session(ADMIN);
        for inbound in visits {
            bot.handle(inbound);
            prop_assert_eq!(bot.session(VISITOR), SessionState::Idle);
        }
        prop_assert_eq!(snapshot(&store), before);
        prop_assert_eq!(bot.session(ADMIN), admin_state);
    }

    #[test]
    fn delete_removes_whole_subtree(
        parents in prop::collection::vec(prop::option::of(0usize..10), 1..12),
        items in prop::collection::vec(0usize..12, 0..20),
        victim in 0usize..12,
    ) {
        let store = Arc::new(in_memory_store());
        let mut ids: Vec<SectionId> = Vec::new();
        for (n, parent) in parents.iter().enumerate() {
            // only earlier sections can be parents, which keeps the input a forest
            let parent_id = parent.filter(|p| *p < n).map(|p| ids[p]);
            ids.push(store.create_section(&format!("S{}", n), parent_id).unwrap());
        }
        for owner in items {
            let section = ids[owner % ids.len()];
            store.create_item(section, &ItemContent::Text { body: "x".to_string() }).unwrap();
        }

        let victim = ids[victim % ids.len()];
        let (sections_before, items_before) = snapshot(&store);
        let doomed = descendants(&sections_before, victim);

        let bot = Dispatcher::new(ADMIN, store.clone());
        bot.handle(Inbound::Callback { from: ADMIN, data: format!("admin:delete:{}", victim) });
        prop_assert_eq!(bot.session(ADMIN), SessionState::Idle);

        let (sections_after, items_after) = snapshot(&store);
        let expected_sections: Vec<_> = sections_before
            .into_iter()
            .filter(|s| !doomed.contains(&s.0))
            .collect();
        let expected_items: Vec<_> = items_before
            .into_iter()
            .filter(|i| !doomed.contains(&i.1))
            .collect();
        prop_assert_eq!(sections_after, expected_sections);
        prop_assert_eq!(items_after, expected_items);
    }
}
