//! Periodic pull of new course requests and private messages.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::announcement::{Announcement, AnnouncementPublisher, CourseRequest};
use crate::api::{CourseApi, PrivateMessage};
use crate::credentials::{CredentialProvider, with_credential_refresh};
use crate::error::CoreError;
use crate::id::{AnnouncementId, TutorId};
use crate::view::{COLOR_BLURPLE, Embed, MessageView};

const UPDATE_FOOTER: &str = "If you have any issue with this update please contact the agency.";

/// Builds what the chat adapter should post or DM next
pub struct AnnouncementFeed {
    api: Arc<dyn CourseApi>,
    credentials: Arc<dyn CredentialProvider>,
    publisher: AnnouncementPublisher,
    seen: Mutex<HashSet<AnnouncementId>>,
}

impl fmt::Debug for AnnouncementFeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnnouncementFeed")
            .field("api", &self.api)
            .field("seen", &self.seen.lock().len())
            .finish_non_exhaustive()
    }
}

impl AnnouncementFeed {
    pub fn new(api: Arc<dyn CourseApi>, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            api,
            credentials,
            publisher: AnnouncementPublisher::new(),
            seen: Mutex::new(HashSet::new()),
        }
    }

    /// Announcements not yet handed out by this feed
    ///
    /// Requests that can't be decoded, carry no id or can't be rendered are
    /// logged and skipped; one bad request doesn't hold up the rest.
    /// Announcements missing from the fetch are closed and forgotten.
    pub async fn poll_announcements(
        &self,
    ) -> Result<Vec<(AnnouncementId, MessageView)>, CoreError> {
        let raw = with_credential_refresh(self.credentials.as_ref(), |credential| {
            let api = self.api.clone();
            async move { api.fetch_course_requests(&credential).await }
        })
        .await?;

        debug!("Fetched {} course request(s)", raw.len());

        let announcements: Vec<Announcement> = raw
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| decode_request(index, entry))
            .collect();

        {
            let listed: HashSet<&AnnouncementId> = announcements.iter().map(|a| &a.id).collect();
            self.seen.lock().retain(|id| listed.contains(id));
        }

        let mut fresh = Vec::new();
        for announcement in announcements {
            if self.seen.lock().contains(&announcement.id) {
                continue;
            }

            match self.publisher.publish(&announcement) {
                Ok(view) => {
                    self.seen.lock().insert(announcement.id.clone());
                    fresh.push((announcement.id, view));
                }
                Err(e) => warn!("Skipping announcement {}: {}", announcement.id, e),
            }
        }

        Ok(fresh)
    }

    /// Let an announcement be handed out again, e.g. after a failed post
    pub fn forget(&self, id: &AnnouncementId) {
        self.seen.lock().remove(id);
    }

    /// Private updates to DM, one per recipient entry
    pub async fn poll_private_messages(&self) -> Result<Vec<(TutorId, MessageView)>, CoreError> {
        let messages = with_credential_refresh(self.credentials.as_ref(), |credential| {
            let api = self.api.clone();
            async move { api.fetch_private_messages(&credential).await }
        })
        .await?;

        Ok(messages
            .into_iter()
            .map(|PrivateMessage { discord_id, message }| (discord_id, update_view(message)))
            .collect())
    }
}

fn decode_request(index: usize, entry: serde_json::Value) -> Option<Announcement> {
    let request = match serde_json::from_value::<CourseRequest>(entry) {
        Ok(request) => request,
        Err(e) => {
            warn!("Skipping course request #{} that could not be read: {}", index + 1, e);
            return None;
        }
    };

    let subject = request.subject.clone();
    let announcement = request.into_announcement();
    if announcement.is_none() {
        warn!("Skipping course request for '{}' without an id", subject);
    }
    announcement
}

pub fn update_view(message: impl Into<String>) -> MessageView {
    MessageView::embed(
        Embed::new("New Update !", message, COLOR_BLURPLE)
            .with_footer(UPDATE_FOOTER)
            .timestamped(),
    )
}
