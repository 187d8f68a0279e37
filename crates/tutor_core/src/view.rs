//! Platform-neutral message payloads.
//!
//! The core describes what a message looks like; the chat adapter turns these
//! into whatever builders its platform library wants.

use serde::{Deserialize, Serialize};

pub const COLOR_BLURPLE: u32 = 0x7289DA;
pub const COLOR_GREEN: u32 = 0x1b541d;
pub const COLOR_RED: u32 = 0xb00505;
pub const COLOR_YELLOW: u32 = 0xffcc1f;
pub const COLOR_ORANGE: u32 = 0xff6600;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    pub title: String,
    pub description: String,
    pub color: u32,
    pub footer: Option<String>,
    /// Stamp the embed with the time it is sent
    pub timestamp: bool,
}

impl Embed {
    pub fn new(title: impl Into<String>, description: impl Into<String>, color: u32) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            color,
            footer: None,
            timestamp: false,
        }
    }

    pub fn with_footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    pub fn timestamped(mut self) -> Self {
        self.timestamp = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuOption {
    pub label: String,
    pub value: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectMenu {
    pub custom_id: String,
    pub placeholder: String,
    pub min_values: u8,
    pub max_values: u8,
    pub options: Vec<MenuOption>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ButtonStyle {
    Success,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub custom_id: String,
    pub label: String,
    pub style: ButtonStyle,
}

impl Button {
    pub fn new(custom_id: impl Into<String>, label: impl Into<String>, style: ButtonStyle) -> Self {
        Self {
            custom_id: custom_id.into(),
            label: label.into(),
            style,
        }
    }
}

/// A message with at most one select menu and one row of buttons
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MessageView {
    pub embeds: Vec<Embed>,
    pub menu: Option<SelectMenu>,
    pub buttons: Vec<Button>,
}

impl MessageView {
    pub fn embed(embed: Embed) -> Self {
        Self {
            embeds: vec![embed],
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldStyle {
    Short,
    Paragraph,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    pub custom_id: String,
    pub label: String,
    pub placeholder: String,
    pub value: Option<String>,
    pub style: FieldStyle,
}

/// A modal form, one text input per row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormView {
    pub custom_id: String,
    pub title: String,
    pub fields: Vec<FormField>,
}
