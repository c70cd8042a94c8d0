//! Compact button tokens.
//!
//! Every inline button carries a colon-delimited token such as `show:3:0` or
//! `admin:rename:pick`. Tokens are checked only for shape here; whether the
//! referenced section exists is decided by the navigator and the edit flow.

use crate::models::{ItemKind, SectionId};
use thiserror::Error;

/// Upper bound on an encoded token, imposed by the chat transport's button payload.
pub const MAX_TOKEN_LEN: usize = 64;

const ROOT: &str = "root";
const PICK: &str = "pick";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavTarget {
    Root,
    Section(SectionId),
}

impl NavTarget {
    pub fn from_parent(parent_id: Option<SectionId>) -> Self {
        parent_id.map_or(NavTarget::Root, NavTarget::Section)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminOp {
    AddSection,
    Rename,
    Delete,
    /// Append an item; `Some(kind)` restricts the next message to that kind.
    AddItem(Option<ItemKind>),
}

impl AdminOp {
    fn name(&self) -> &'static str {
        match self {
            AdminOp::AddSection => "add_section",
            AdminOp::Rename => "rename",
            AdminOp::Delete => "delete",
            AdminOp::AddItem(_) => "add_item",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminTarget {
    Root,
    Section(SectionId),
    /// Ask the administrator which section to act on.
    Pick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminCommand {
    pub op: AdminOp,
    pub target: AdminTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Home,
    Back(NavTarget),
    Section(SectionId),
    Show { section: SectionId, page: u32 },
    Admin(AdminCommand),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("token is empty")]
    Empty,
    #[error("token is {0} bytes long")]
    TooLong(usize),
    #[error("unknown action '{0}'")]
    UnknownKind(String),
    #[error("wrong number of arguments for '{kind}': {got}")]
    Arity { kind: &'static str, got: usize },
    #[error("'{0}' is not a non-negative integer")]
    InvalidInteger(String),
    #[error("unknown admin operation '{0}'")]
    UnknownAdminOp(String),
    #[error("unknown item kind '{0}'")]
    UnknownItemKind(String),
}

fn target_arg(target: &AdminTarget) -> String {
    match target {
        AdminTarget::Root => ROOT.to_string(),
        AdminTarget::Pick => PICK.to_string(),
        AdminTarget::Section(id) => id.to_string(),
    }
}

pub fn encode(action: &Action) -> String {
    match action {
        Action::Home => "home".to_string(),
        Action::Back(NavTarget::Root) => format!("back:{}", ROOT),
        Action::Back(NavTarget::Section(id)) => format!("back:{}", id),
        Action::Section(id) => format!("section:{}", id),
        Action::Show { section, page } => format!("show:{}:{}", section, page),
        Action::Admin(AdminCommand { op, target }) => match op {
            AdminOp::AddItem(Some(kind)) => {
                format!("admin:{}:{}:{}", op.name(), target_arg(target), kind)
            }
            _ => format!("admin:{}:{}", op.name(), target_arg(target)),
        },
    }
}

/// Parses a plain decimal number. Signs, blanks and overflow are rejected.
pub fn parse_id(arg: &str) -> Result<u32, DecodeError> {
    if arg.is_empty() || !arg.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DecodeError::InvalidInteger(arg.to_string()));
    }
    arg.parse()
        .map_err(|_| DecodeError::InvalidInteger(arg.to_string()))
}

fn expect_args(kind: &'static str, args: &[&str], expected: usize) -> Result<(), DecodeError> {
    if args.len() != expected {
        return Err(DecodeError::Arity {
            kind,
            got: args.len(),
        });
    }
    Ok(())
}

fn decode_admin(args: &[&str]) -> Result<AdminCommand, DecodeError> {
    // add_item alone accepts a trailing item kind
    let arity_error = || DecodeError::Arity {
        kind: "admin",
        got: args.len(),
    };

    let (op_name, target_str, extra) = match args {
        [op, target] => (*op, *target, None),
        [op, target, kind] => (*op, *target, Some(*kind)),
        _ => return Err(arity_error()),
    };

    let op = match (op_name, extra) {
        ("add_section", None) => AdminOp::AddSection,
        ("rename", None) => AdminOp::Rename,
        ("delete", None) => AdminOp::Delete,
        ("add_item", None) => AdminOp::AddItem(None),
        ("add_item", Some(kind)) => AdminOp::AddItem(Some(
            kind.parse()
                .map_err(|_| DecodeError::UnknownItemKind(kind.to_string()))?,
        )),
        ("add_section" | "rename" | "delete", Some(_)) => return Err(arity_error()),
        (other, _) => return Err(DecodeError::UnknownAdminOp(other.to_string())),
    };

    let target = match target_str {
        ROOT => AdminTarget::Root,
        PICK => AdminTarget::Pick,
        id => AdminTarget::Section(parse_id(id)?),
    };

    Ok(AdminCommand { op, target })
}

pub fn decode(token: &str) -> Result<Action, DecodeError> {
    if token.is_empty() {
        return Err(DecodeError::Empty);
    }
    if token.len() > MAX_TOKEN_LEN {
        return Err(DecodeError::TooLong(token.len()));
    }

    let mut parts = token.split(':');
    let kind = parts.next().unwrap_or_default();
    let args: Vec<&str> = parts.collect();

    match kind {
        "home" => {
            expect_args("home", &args, 0)?;
            Ok(Action::Home)
        }
        "back" => {
            expect_args("back", &args, 1)?;
            match args[0] {
                ROOT => Ok(Action::Back(NavTarget::Root)),
                id => Ok(Action::Back(NavTarget::Section(parse_id(id)?))),
            }
        }
        "section" => {
            expect_args("section", &args, 1)?;
            Ok(Action::Section(parse_id(args[0])?))
        }
        "show" => {
            expect_args("show", &args, 2)?;
            Ok(Action::Show {
                section: parse_id(args[0])?,
                page: parse_id(args[1])?,
            })
        }
        "admin" => decode_admin(&args).map(Action::Admin),
        other => Err(DecodeError::UnknownKind(other.to_string())),
    }
}
