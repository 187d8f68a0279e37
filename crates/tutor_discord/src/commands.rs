//! Slash command definitions and registration

use serenity::all::{Command, CommandOptionType, CreateCommand, CreateCommandOption, GuildId, Http};
use tracing::{error, info};
use tutor_core::ClassRequestKind;

use crate::error::{DiscordError, Result};
use crate::interaction::{KIND_OPTION, PANEL_COMMAND, PENDING_COMMAND};

/// Create all slash commands for registration
pub fn create_commands() -> Vec<CreateCommand> {
    let mut kind = CreateCommandOption::new(
        CommandOptionType::String,
        KIND_OPTION,
        "Which request the panel starts",
    )
    .required(true);
    for k in ClassRequestKind::ALL {
        kind = kind.add_string_choice(k.as_str(), k.as_str());
    }

    vec![
        CreateCommand::new(PANEL_COMMAND)
            .description("Post a class request panel in this channel")
            .dm_permission(false)
            .default_member_permissions(serenity::model::permissions::Permissions::MANAGE_CHANNELS)
            .add_option(kind),
        CreateCommand::new(PENDING_COMMAND)
            .description("Show your course request in progress")
            .dm_permission(true),
    ]
}

/// Register commands in one guild, or globally without one
pub async fn register_commands(http: &Http, guild_id: Option<u64>) -> Result<()> {
    match guild_id {
        Some(id) => {
            GuildId::new(id)
                .set_commands(http, create_commands())
                .await
                .map_err(|cause| DiscordError::CommandRegistrationFailed {
                    scope: format!("in guild {}", id),
                    cause,
                })?;
            info!("Registered slash commands in guild {}", id);
        }
        None => {
            for command in create_commands() {
                if let Err(cause) = Command::create_global_command(http, command).await {
                    error!("Cannot create slash command: {:?}", cause);
                    return Err(DiscordError::CommandRegistrationFailed {
                        scope: "globally".to_string(),
                        cause,
                    });
                }
            }
            info!("Registered slash commands globally");
        }
    }
    Ok(())
}
