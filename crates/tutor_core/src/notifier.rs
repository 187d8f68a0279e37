//! User-facing texts for coordinator outcomes.

use crate::coordinator::{Outcome, PendingAction};

pub(crate) const SERVER_ERROR_TEXT: &str =
    "There was an error while communicating with the server!";

#[derive(Debug, Clone, Copy, Default)]
pub struct Notifier;

impl Notifier {
    pub fn new() -> Self {
        Self
    }

    pub fn text(&self, outcome: &Outcome) -> String {
        match outcome {
            Outcome::Recorded { .. } => "If you are done with your selection, please submit! \nTo change it, cancel this request and select again.".to_string(),
            Outcome::AlreadyPending { .. } => "You have registered answers to a previous announcement which you have not yet submitted or cancelled! \nPlease do so before attempting to register a new one for this announcement.".to_string(),
            Outcome::Accepted { labels } => {
                format!("Your request for {} has been sent.", labels.join(", "))
            }
            Outcome::Taken { labels } => format!(
                "Sorry, {} has already been taken by another tutor.",
                labels.join(", ")
            ),
            Outcome::Cancelled { labels } => {
                format!("Your request for {} has been cancelled.", labels.join(", "))
            }
            Outcome::NothingPending {
                action: PendingAction::Submit,
            } => "Please (re)select your date options before submitting a request.".to_string(),
            Outcome::NothingPending {
                action: PendingAction::Cancel,
            } => "You do not have any request in progress at the moment".to_string(),
            Outcome::ServerError => SERVER_ERROR_TEXT.to_string(),
            Outcome::StorageUnavailable => {
                "Something went wrong, please try again later.".to_string()
            }
            Outcome::InvalidSelection { .. } => {
                "That selection could not be read. Please select your date options again.".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_joined_with_comma_space() {
        let notifier = Notifier::new();
        let labels = vec!["Mon 9AM".to_string(), "Wed 2PM".to_string()];

        assert_eq!(
            notifier.text(&Outcome::Accepted {
                labels: labels.clone()
            }),
            "Your request for Mon 9AM, Wed 2PM has been sent."
        );
        assert_eq!(
            notifier.text(&Outcome::Cancelled { labels }),
            "Your request for Mon 9AM, Wed 2PM has been cancelled."
        );
    }

    #[test]
    fn test_failures_are_distinguishable() {
        let notifier = Notifier::new();
        let texts = [
            notifier.text(&Outcome::NothingPending {
                action: PendingAction::Submit,
            }),
            notifier.text(&Outcome::NothingPending {
                action: PendingAction::Cancel,
            }),
            notifier.text(&Outcome::ServerError),
            notifier.text(&Outcome::StorageUnavailable),
        ];

        for (i, a) in texts.iter().enumerate() {
            for b in texts.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }
}
