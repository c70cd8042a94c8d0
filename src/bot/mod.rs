//! Chat-facing core: button tokens, tree rendering and admin edit flows.
//!
//! Nothing here talks to a transport. Inbound events go into
//! [`Dispatcher::handle`] and come back out as [`Outbound`] values for the shell
//! to deliver.

pub mod action_codec;
pub mod dispatcher;
pub mod edit_flow;
pub mod navigator;
pub mod session;

#[cfg(test)]
mod proptests;

pub use action_codec::{decode, encode, Action, AdminCommand, AdminOp, AdminTarget, DecodeError, NavTarget};
pub use dispatcher::{Dispatcher, Inbound, Outbound};
pub use edit_flow::{EditFlowEngine, FlowInput, FlowReply, MessageContent};
pub use navigator::{render, Button, NavError, RenderBody, RenderPlan, Viewer};
pub use session::{AdminSessions, SessionState};
