//! Tutor Relay Discord - gateway front-end for the tutor relay
//!
//! Turns Discord interactions into calls on the core services and renders
//! their views back as embeds, menus, buttons and modals.

pub mod bot;
pub mod commands;
pub mod error;
pub mod interaction;
pub mod poller;
pub mod render;

pub use bot::{BotSettings, TutorBot, create_discord_client, run_discord_bot};
pub use error::{DiscordError, Result};
pub use interaction::TutorInteraction;
