//! Core views turned into serenity builders.

use serenity::all::{
    ButtonStyle as DiscordButtonStyle, Colour, CreateActionRow, CreateButton, CreateEmbed,
    CreateEmbedFooter, CreateInputText, CreateInteractionResponseMessage, CreateMessage,
    CreateModal, CreateSelectMenu, CreateSelectMenuKind, CreateSelectMenuOption,
    EditInteractionResponse, InputTextStyle, Timestamp,
};
use tutor_core::view::{Button, ButtonStyle, Embed, FieldStyle, FormView, MessageView, SelectMenu};

pub fn embed(embed: &Embed) -> CreateEmbed {
    let mut built = CreateEmbed::new()
        .title(&embed.title)
        .description(&embed.description)
        .colour(Colour::new(embed.color));
    if let Some(footer) = &embed.footer {
        built = built.footer(CreateEmbedFooter::new(footer));
    }
    if embed.timestamp {
        built = built.timestamp(Timestamp::now());
    }
    built
}

fn select_menu(menu: &SelectMenu) -> CreateSelectMenu {
    let options = menu
        .options
        .iter()
        .map(|option| {
            let built = CreateSelectMenuOption::new(&option.label, &option.value);
            match &option.description {
                Some(description) => built.description(description),
                None => built,
            }
        })
        .collect();

    CreateSelectMenu::new(&menu.custom_id, CreateSelectMenuKind::String { options })
        .placeholder(&menu.placeholder)
        .min_values(menu.min_values)
        .max_values(menu.max_values)
}

fn button(button: &Button) -> CreateButton {
    let style = match button.style {
        ButtonStyle::Success => DiscordButtonStyle::Success,
        ButtonStyle::Danger => DiscordButtonStyle::Danger,
    };
    CreateButton::new(&button.custom_id)
        .label(&button.label)
        .style(style)
}

/// Menu row first, then the button row
pub fn components(view: &MessageView) -> Vec<CreateActionRow> {
    let mut rows = Vec::new();
    if let Some(menu) = &view.menu {
        rows.push(CreateActionRow::SelectMenu(select_menu(menu)));
    }
    if !view.buttons.is_empty() {
        rows.push(CreateActionRow::Buttons(
            view.buttons.iter().map(button).collect(),
        ));
    }
    rows
}

fn embeds(view: &MessageView) -> Vec<CreateEmbed> {
    view.embeds.iter().map(embed).collect()
}

pub fn message(view: &MessageView) -> CreateMessage {
    CreateMessage::new()
        .embeds(embeds(view))
        .components(components(view))
}

pub fn response_message(view: &MessageView) -> CreateInteractionResponseMessage {
    CreateInteractionResponseMessage::new()
        .embeds(embeds(view))
        .components(components(view))
}

pub fn edit_response(view: &MessageView) -> EditInteractionResponse {
    EditInteractionResponse::new()
        .embeds(embeds(view))
        .components(components(view))
}

pub fn modal(form: &FormView) -> CreateModal {
    let rows = form
        .fields
        .iter()
        .map(|field| {
            let style = match field.style {
                FieldStyle::Short => InputTextStyle::Short,
                FieldStyle::Paragraph => InputTextStyle::Paragraph,
            };
            let mut input = CreateInputText::new(style, &field.label, &field.custom_id)
                .placeholder(&field.placeholder)
                .required(true);
            if let Some(value) = &field.value {
                input = input.value(value);
            }
            CreateActionRow::InputText(input)
        })
        .collect();

    CreateModal::new(&form.custom_id, &form.title).components(rows)
}
