//! Command layer for troupe: `!!plb` parsing, permission checks, replies and
//! the persisted `player_batch.json` configuration.
//!
//! The server side plugs in through two seams: a [`troupe_batch::ServerHost`]
//! that executes commands, and a [`CommandSource`] per incoming line. Player
//! join events go to [`PlayerBatch::on_player_joined`].

mod config;
mod dispatch;
mod error;
mod grammar;
mod help;
mod permission;
mod source;

pub use config::{CONFIG_FILE, PluginConfig, ReadinessSettings};
pub use dispatch::{Dispatch, PlayerBatch};
pub use error::{ConfigError, ParseError};
pub use grammar::{ActionSpec, ROOTS, Request, parse};
pub use help::help_text;
pub use permission::PermissionGate;
pub use source::{CommandSource, SourceReplies, color, context_of};
