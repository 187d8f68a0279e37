//! Background loops posting feed output to Discord.

use std::sync::Arc;
use std::time::Duration;

use serenity::all::{ChannelId, Http, UserId};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use tutor_core::{AnnouncementFeed, MessageView, TutorId};

use crate::error::{DiscordError, Result};
use crate::render;

/// Post new announcements into `channel_id` every `period`
pub fn spawn_announcement_poller(
    http: Arc<Http>,
    feed: Arc<AnnouncementFeed>,
    channel_id: ChannelId,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "Polling course requests every {}s into channel {}",
            period.as_secs(),
            channel_id
        );
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;

            let announcements = match feed.poll_announcements().await {
                Ok(announcements) => announcements,
                Err(e) => {
                    warn!("Could not fetch course requests: {}", e);
                    continue;
                }
            };

            for (id, view) in announcements {
                match channel_id
                    .send_message(&http, render::message(&view))
                    .await
                {
                    Ok(_) => info!("Posted announcement {}", id),
                    Err(e) => {
                        error!("Failed to post announcement {}: {}", id, e);
                        feed.forget(&id);
                    }
                }
            }
        }
    })
}

/// DM pending private updates every `period`
pub fn spawn_private_message_poller(
    http: Arc<Http>,
    feed: Arc<AnnouncementFeed>,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;

            let messages = match feed.poll_private_messages().await {
                Ok(messages) => messages,
                Err(e) => {
                    warn!("Could not fetch private messages: {}", e);
                    continue;
                }
            };
            debug!("Delivering {} private update(s)", messages.len());

            for (tutor_id, view) in messages {
                if let Err(e) = send_direct(&http, &tutor_id, &view).await {
                    // The user may have disabled DMs
                    warn!("Private update to {} not delivered: {}", tutor_id, e);
                }
            }
        }
    })
}

pub fn user_id(tutor_id: &TutorId) -> Result<UserId> {
    tutor_id
        .as_str()
        .parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .map(UserId::new)
        .ok_or_else(|| DiscordError::InvalidId {
            value: tutor_id.to_string(),
        })
}

async fn send_direct(http: &Arc<Http>, tutor_id: &TutorId, view: &MessageView) -> Result<()> {
    let user = user_id(tutor_id)?;
    let channel = user
        .create_dm_channel(http)
        .await
        .map_err(|e| DiscordError::send_failed(format!("user {}", tutor_id), e))?;
    channel
        .send_message(http, render::message(view))
        .await
        .map_err(|e| DiscordError::send_failed(format!("user {}", tutor_id), e))?;
    Ok(())
}
