use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum DiscordError {
    #[error("Discord client could not be built")]
    #[diagnostic(
        code(tutor::discord::client_build_failed),
        help("Check that the Discord bot token is valid and has not been regenerated")
    )]
    ClientBuildFailed {
        #[source]
        cause: serenity::Error,
    },

    #[error("Discord gateway connection ended")]
    #[diagnostic(code(tutor::discord::gateway_failed))]
    GatewayFailed {
        #[source]
        cause: serenity::Error,
    },

    #[error("Command registration failed")]
    #[diagnostic(
        code(tutor::discord::command_registration_failed),
        help("Failed to register slash commands {scope}")
    )]
    CommandRegistrationFailed {
        scope: String,
        #[source]
        cause: serenity::Error,
    },

    #[error("Interaction response failed")]
    #[diagnostic(
        code(tutor::discord::response_failed),
        help("The interaction '{interaction}' may have expired before the bot answered")
    )]
    ResponseFailed {
        interaction: String,
        #[source]
        cause: serenity::Error,
    },

    #[error("Message send failed")]
    #[diagnostic(
        code(tutor::discord::message_send_failed),
        help("Failed to send message to {destination}")
    )]
    MessageSendFailed {
        destination: String,
        #[source]
        cause: serenity::Error,
    },

    #[error("'{value}' is not a Discord id")]
    #[diagnostic(code(tutor::discord::invalid_id))]
    InvalidId { value: String },
}

impl DiscordError {
    pub fn response_failed(interaction: impl Into<String>, cause: serenity::Error) -> Self {
        Self::ResponseFailed {
            interaction: interaction.into(),
            cause,
        }
    }

    pub fn send_failed(destination: impl Into<String>, cause: serenity::Error) -> Self {
        Self::MessageSendFailed {
            destination: destination.into(),
            cause,
        }
    }
}

pub type Result<T> = std::result::Result<T, DiscordError>;
