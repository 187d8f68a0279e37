use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serenity::all::{
    ApplicationId, ChannelId, Client, CommandInteraction, ComponentInteraction, Context,
    CreateInteractionResponse, CreateInteractionResponseMessage, EditInteractionResponse,
    EventHandler, GatewayIntents, Interaction, ModalInteraction, Ready,
};
use tracing::{debug, error, info, warn};
use tutor_core::{
    AnnouncementFeed, ClassPrompt, ClassRequestKind, ClassRequestOutcome, ClassRequestService,
    Notifier, Outcome, PendingAction, SubmissionCoordinator, TutorId,
};

use crate::commands;
use crate::error::{DiscordError, Result};
use crate::interaction::TutorInteraction;
use crate::poller;
use crate::render;

const STORAGE_TROUBLE_TEXT: &str = "Something went wrong, please try again later.";

/// Discord side settings the handler needs
#[derive(Debug, Clone)]
pub struct BotSettings {
    pub token: String,
    pub application_id: Option<u64>,
    pub guild_id: Option<u64>,
    pub announcement_channel_id: Option<u64>,
    pub polling_enabled: bool,
    pub announcements_interval: Duration,
    pub private_messages_interval: Duration,
}

/// Discord bot handler
pub struct TutorBot {
    coordinator: Arc<SubmissionCoordinator>,
    class_requests: Arc<ClassRequestService>,
    feed: Arc<AnnouncementFeed>,
    notifier: Notifier,
    settings: BotSettings,
    pollers_started: AtomicBool,
}

/// The three interaction types the bot answers, behind one interface
enum Responder<'a> {
    Command(&'a CommandInteraction),
    Component(&'a ComponentInteraction),
    Modal(&'a ModalInteraction),
}

impl Responder<'_> {
    fn from_interaction(interaction: &Interaction) -> Option<Responder<'_>> {
        match interaction {
            Interaction::Command(c) => Some(Responder::Command(c)),
            Interaction::Component(c) => Some(Responder::Component(c)),
            Interaction::Modal(m) => Some(Responder::Modal(m)),
            _ => None,
        }
    }

    fn label(&self) -> String {
        match self {
            Self::Command(c) => format!("/{}", c.data.name),
            Self::Component(c) => c.data.custom_id.clone(),
            Self::Modal(m) => m.data.custom_id.clone(),
        }
    }

    async fn respond(&self, ctx: &Context, response: CreateInteractionResponse) -> Result<()> {
        let sent = match self {
            Self::Command(c) => c.create_response(&ctx.http, response).await,
            Self::Component(c) => c.create_response(&ctx.http, response).await,
            Self::Modal(m) => m.create_response(&ctx.http, response).await,
        };
        sent.map_err(|e| DiscordError::response_failed(self.label(), e))
    }

    async fn reply_ephemeral(&self, ctx: &Context, content: String) -> Result<()> {
        self.respond(
            ctx,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .content(content)
                    .ephemeral(true),
            ),
        )
        .await
    }

    /// Acknowledge now, answer later with [`Responder::edit`]
    async fn defer_ephemeral(&self, ctx: &Context) -> Result<()> {
        let sent = match self {
            Self::Command(c) => c.defer_ephemeral(&ctx.http).await,
            Self::Component(c) => c.defer_ephemeral(&ctx.http).await,
            Self::Modal(m) => m.defer_ephemeral(&ctx.http).await,
        };
        sent.map_err(|e| DiscordError::response_failed(self.label(), e))
    }

    async fn edit(&self, ctx: &Context, edit: EditInteractionResponse) -> Result<()> {
        let sent = match self {
            Self::Command(c) => c.edit_response(&ctx.http, edit).await,
            Self::Component(c) => c.edit_response(&ctx.http, edit).await,
            Self::Modal(m) => m.edit_response(&ctx.http, edit).await,
        };
        sent.map(|_| ())
            .map_err(|e| DiscordError::response_failed(self.label(), e))
    }
}

impl TutorBot {
    pub fn new(
        coordinator: Arc<SubmissionCoordinator>,
        class_requests: Arc<ClassRequestService>,
        feed: Arc<AnnouncementFeed>,
        settings: BotSettings,
    ) -> Self {
        Self {
            coordinator,
            class_requests,
            feed,
            notifier: Notifier::new(),
            settings,
            pollers_started: AtomicBool::new(false),
        }
    }

    fn start_pollers(&self, ctx: &Context) {
        if !self.settings.polling_enabled || self.pollers_started.swap(true, Ordering::SeqCst) {
            return;
        }

        match self.settings.announcement_channel_id {
            Some(channel) => {
                poller::spawn_announcement_poller(
                    ctx.http.clone(),
                    self.feed.clone(),
                    ChannelId::new(channel),
                    self.settings.announcements_interval,
                );
            }
            None => warn!("No announcement channel configured, course requests won't be posted"),
        }
        poller::spawn_private_message_poller(
            ctx.http.clone(),
            self.feed.clone(),
            self.settings.private_messages_interval,
        );
    }

    async fn handle(
        &self,
        ctx: &Context,
        responder: &Responder<'_>,
        tutor_id: &TutorId,
        event: TutorInteraction,
    ) -> Result<()> {
        match event {
            TutorInteraction::CourseDatesSelected { values } => {
                let outcome = self.coordinator.on_options_selected(tutor_id, &values).await;
                self.reply_outcome(ctx, responder, &outcome).await
            }
            TutorInteraction::CancelCourseRequest => {
                let outcome = self.coordinator.on_cancel(tutor_id).await;
                self.reply_outcome(ctx, responder, &outcome).await
            }
            TutorInteraction::SubmitCourseRequest => {
                // The forward may outlive Discord's answer window
                responder.defer_ephemeral(ctx).await?;
                let outcome = self.coordinator.on_submit(tutor_id).await;
                let text = self.notifier.text(&outcome);
                responder
                    .edit(ctx, EditInteractionResponse::new().content(text))
                    .await
            }
            TutorInteraction::ShowPending => {
                let text = match self.coordinator.pending(tutor_id).await {
                    Ok(Some(pending)) => format!(
                        "You have a request in progress for {} (announcement {}). \nSubmit or cancel it from the announcement.",
                        pending.selected_labels.join(", "),
                        pending.announcement_id
                    ),
                    Ok(None) => self.notifier.text(&Outcome::NothingPending {
                        action: PendingAction::Cancel,
                    }),
                    Err(e) => {
                        error!("Could not read pending request of {}: {}", tutor_id, e);
                        STORAGE_TROUBLE_TEXT.to_string()
                    }
                };
                responder.reply_ephemeral(ctx, text).await
            }
            TutorInteraction::Panel { kind } => self.post_panel(ctx, responder, kind).await,
            TutorInteraction::StartClassRequest { kind } => {
                responder.defer_ephemeral(ctx).await?;
                let edit = match self.class_requests.class_menu(kind, tutor_id).await {
                    ClassPrompt::Choose(view) => render::edit_response(&view),
                    ClassPrompt::NoActiveClasses => EditInteractionResponse::new()
                        .content(ClassPrompt::NO_ACTIVE_CLASSES_TEXT),
                    ClassPrompt::ServerError => EditInteractionResponse::new()
                        .content(ClassRequestOutcome::ServerError.text()),
                };
                responder.edit(ctx, edit).await
            }
            TutorInteraction::ClassSelected { kind, class_id } => {
                let form = ClassRequestService::form(kind, &class_id);
                responder
                    .respond(ctx, CreateInteractionResponse::Modal(render::modal(&form)))
                    .await
            }
            TutorInteraction::ClassFormSubmitted { kind, fields } => {
                responder.defer_ephemeral(ctx).await?;
                let outcome = self.class_requests.submit_form(kind, &fields).await;
                responder
                    .edit(ctx, EditInteractionResponse::new().content(outcome.text()))
                    .await
            }
        }
    }

    async fn reply_outcome(
        &self,
        ctx: &Context,
        responder: &Responder<'_>,
        outcome: &Outcome,
    ) -> Result<()> {
        debug!("Outcome for {}: {:?}", responder.label(), outcome);
        responder
            .reply_ephemeral(ctx, self.notifier.text(outcome))
            .await
    }

    async fn post_panel(
        &self,
        ctx: &Context,
        responder: &Responder<'_>,
        kind: ClassRequestKind,
    ) -> Result<()> {
        let panel = ClassRequestService::panel(kind);
        responder
            .respond(
                ctx,
                CreateInteractionResponse::Message(render::response_message(&panel)),
            )
            .await
    }
}

#[async_trait]
impl EventHandler for TutorBot {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("{} is connected!", ready.user.name);

        if let Err(e) = commands::register_commands(&ctx.http, self.settings.guild_id).await {
            error!("Cannot register slash commands: {:?}", e);
        }

        self.start_pollers(&ctx);
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Some(responder) = Responder::from_interaction(&interaction) else {
            return;
        };
        let Some((tutor_id, event)) = TutorInteraction::parse(&interaction) else {
            warn!("Unhandled interaction: {}", responder.label());
            return;
        };

        info!("Received {} from user {}", event.name(), tutor_id);
        if let Err(e) = self.handle(&ctx, &responder, &tutor_id, event).await {
            error!("Error handling {}: {:?}", responder.label(), e);
        }
    }
}

/// Create the Discord client (without starting it)
pub async fn create_discord_client(bot: TutorBot) -> Result<Client> {
    let token = bot.settings.token.clone();
    let application_id = bot.settings.application_id;

    let mut client_builder = Client::builder(&token, GatewayIntents::GUILDS).event_handler(bot);
    if let Some(app_id) = application_id {
        client_builder = client_builder.application_id(ApplicationId::new(app_id));
    }

    client_builder
        .await
        .map_err(|cause| DiscordError::ClientBuildFailed { cause })
}

/// Create and run the Discord bot
pub async fn run_discord_bot(bot: TutorBot) -> Result<()> {
    let mut client = create_discord_client(bot).await?;

    info!("Starting Discord bot...");
    client
        .start()
        .await
        .map_err(|cause| DiscordError::GatewayFailed { cause })
}
