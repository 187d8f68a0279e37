//! Course announcements and the publisher that renders them.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, de};

use crate::error::{LedgerError, PublishError};
use crate::id::{AnnouncementId, OptionId};
use crate::view::{Button, ButtonStyle, COLOR_BLURPLE, Embed, MenuOption, MessageView, SelectMenu};

pub const COURSE_DATE_SELECTED: &str = "courseDateSelected";
pub const SUBMIT_COURSE_REQUEST: &str = "submitCourseRequest";
pub const CANCEL_COURSE_REQUEST: &str = "cancelCourseRequest";

/// Most options a select menu can carry
pub const MAX_OPTIONS: usize = 25;
/// Longest value a select menu option can carry
pub const MAX_OPTION_VALUE_LEN: usize = 100;

const ANNOUNCEMENT_FOOTER: &str =
    "Please select the date and time that fits you best and we will get back to you on the next steps.";

/// One selectable date slot of an announcement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnouncementOption {
    pub announcement_id: AnnouncementId,
    pub option_id: OptionId,
    pub label: String,
}

impl AnnouncementOption {
    /// The value carried by the select menu entry, `announcementId,optionId,label`
    pub fn encoded_value(&self) -> String {
        format!("{},{},{}", self.announcement_id, self.option_id, self.label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Announcement {
    pub id: AnnouncementId,
    pub subject: String,
    pub level: String,
    /// Exact number of options a tutor must pick
    pub frequency: u32,
    pub pay_per_class: String,
    pub duration_hours: String,
    pub options: Vec<AnnouncementOption>,
}

impl Announcement {
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.options.iter().map(|o| o.label.as_str())
    }
}

/// A selected value taken apart again
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedOption {
    pub announcement_id: AnnouncementId,
    pub option_id: OptionId,
    pub label: String,
}

/// Split a raw select value back into its parts
///
/// The label may itself contain commas. A value with no label falls back to
/// the option id as its label.
pub fn decode_option_value(raw: &str) -> Result<DecodedOption, LedgerError> {
    let mut parts = raw.splitn(3, ',');
    let announcement_id = parts.next().unwrap_or_default().trim();
    let option_id = parts
        .next()
        .map(str::trim)
        .ok_or_else(|| {
            LedgerError::invalid_selection(format!("malformed option value '{}'", raw))
        })?;

    if announcement_id.is_empty() || option_id.is_empty() {
        return Err(LedgerError::invalid_selection(format!(
            "malformed option value '{}'",
            raw
        )));
    }

    let label = parts
        .next()
        .filter(|l| !l.is_empty())
        .unwrap_or(option_id)
        .to_string();

    Ok(DecodedOption {
        announcement_id: AnnouncementId::new(announcement_id),
        option_id: OptionId::new(option_id),
        label,
    })
}

/// Renders announcements into selectable messages
#[derive(Debug, Clone, Default)]
pub struct AnnouncementPublisher;

impl AnnouncementPublisher {
    pub fn new() -> Self {
        Self
    }

    pub fn publish(&self, announcement: &Announcement) -> Result<MessageView, PublishError> {
        let announcement_id = announcement.id.to_string();
        let available = announcement.options.len();

        if available == 0 {
            return Err(PublishError::NoOptions { announcement_id });
        }
        if available > MAX_OPTIONS {
            return Err(PublishError::TooManyOptions {
                announcement_id,
                count: available,
                max: MAX_OPTIONS,
            });
        }
        if announcement.frequency == 0 || announcement.frequency as usize > available {
            return Err(PublishError::FrequencyOutOfRange {
                announcement_id,
                frequency: announcement.frequency,
                available,
            });
        }

        let options = announcement
            .options
            .iter()
            .map(|option| {
                let value = option.encoded_value();
                if value.chars().count() > MAX_OPTION_VALUE_LEN {
                    return Err(PublishError::OptionValueTooLong {
                        value,
                        max: MAX_OPTION_VALUE_LEN,
                    });
                }
                Ok(MenuOption {
                    label: option.label.clone(),
                    value,
                    description: None,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        // frequency <= available <= MAX_OPTIONS, so it fits
        let selections = announcement.frequency as u8;

        let description = format!(
            "**Subject:** {} \n**Level:** {} \n**Class(es) per week:** {} \n**Pay per class:** {} \n**Time slots:** {}\n**Class duration**: {} hour(s)",
            announcement.subject,
            announcement.level,
            announcement.frequency,
            announcement.pay_per_class,
            announcement.labels().collect::<Vec<_>>().join(", "),
            announcement.duration_hours,
        );

        Ok(MessageView {
            embeds: vec![
                Embed::new("New Client Announcement", description, COLOR_BLURPLE)
                    .with_footer(ANNOUNCEMENT_FOOTER)
                    .timestamped(),
            ],
            menu: Some(SelectMenu {
                custom_id: COURSE_DATE_SELECTED.to_string(),
                placeholder: format!("Please select {} date option(s)", announcement.frequency),
                min_values: selections,
                max_values: selections,
                options,
            }),
            buttons: vec![
                Button::new(SUBMIT_COURSE_REQUEST, "Submit request", ButtonStyle::Success),
                Button::new(CANCEL_COURSE_REQUEST, "Cancel request", ButtonStyle::Danger),
            ],
        })
    }
}

/// A number or a string, as the course API is not consistent about which
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Text(String),
    Number(serde_json::Number),
}

impl Default for Scalar {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{}", n),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DateOption {
    Label(String),
    Entry { id: Scalar, label: String },
}

/// `2` and `"2"` are both a count of two
fn count_from_scalar<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    match Scalar::deserialize(deserializer)? {
        Scalar::Number(n) => n
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| de::Error::custom(format!("{} is not a count", n))),
        Scalar::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("'{}' is not a count", s))),
    }
}

/// A new course request as returned by `GET /new_course_requests`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CourseRequest {
    #[serde(rename = "Id", alias = "id", alias = "announcementId", default)]
    pub id: Option<Scalar>,
    #[serde(rename = "Subject", default)]
    pub subject: String,
    #[serde(rename = "Frequency", deserialize_with = "count_from_scalar")]
    pub frequency: u32,
    #[serde(rename = "LevelName", default)]
    pub level: String,
    #[serde(rename = "Money", default)]
    pub money: Scalar,
    #[serde(rename = "Duration", default)]
    pub duration: Scalar,
    #[serde(rename = "DateOptions", default)]
    pub date_options: Vec<DateOption>,
}

impl CourseRequest {
    /// Turn the request into an announcement
    ///
    /// Plain string date options get positional ids starting at 1. Returns
    /// `None` when the request carries no id.
    pub fn into_announcement(self) -> Option<Announcement> {
        let id = self.id.map(|id| AnnouncementId::new(id.to_string()))?;
        if id.is_empty() {
            return None;
        }

        let options = self
            .date_options
            .into_iter()
            .enumerate()
            .map(|(index, option)| {
                let (option_id, label) = match option {
                    DateOption::Label(label) => (OptionId::new((index + 1).to_string()), label),
                    DateOption::Entry { id, label } => (OptionId::new(id.to_string()), label),
                };
                AnnouncementOption {
                    announcement_id: id.clone(),
                    option_id,
                    label,
                }
            })
            .collect();

        Some(Announcement {
            id,
            subject: self.subject,
            level: self.level,
            frequency: self.frequency,
            pay_per_class: self.money.to_string(),
            duration_hours: self.duration.to_string(),
            options,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn announcement(id: &str, frequency: u32, labels: &[&str]) -> Announcement {
        Announcement {
            id: AnnouncementId::new(id),
            subject: "Maths".to_string(),
            level: "GCSE".to_string(),
            frequency,
            pay_per_class: "25".to_string(),
            duration_hours: "1.5".to_string(),
            options: labels
                .iter()
                .enumerate()
                .map(|(i, label)| AnnouncementOption {
                    announcement_id: AnnouncementId::new(id),
                    option_id: OptionId::new(format!("opt{}", i + 1)),
                    label: label.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_publish_requires_exact_frequency() {
        let view = AnnouncementPublisher::new()
            .publish(&announcement("A7", 2, &["Mon 9AM", "Wed 2PM", "Fri 5PM"]))
            .unwrap();

        let menu = view.menu.unwrap();
        assert_eq!(menu.custom_id, COURSE_DATE_SELECTED);
        assert_eq!(menu.min_values, 2);
        assert_eq!(menu.max_values, 2);
        assert_eq!(menu.options[1].value, "A7,opt2,Wed 2PM");
        assert_eq!(menu.options[1].label, "Wed 2PM");
        assert_eq!(view.buttons.len(), 2);
        assert!(view.embeds[0].description.contains("**Time slots:** Mon 9AM, Wed 2PM, Fri 5PM"));
    }

    #[test]
    fn test_publish_rejects_bad_frequencies() {
        let publisher = AnnouncementPublisher::new();

        assert_eq!(
            publisher.publish(&announcement("A1", 0, &["Mon 9AM"])),
            Err(PublishError::FrequencyOutOfRange {
                announcement_id: "A1".to_string(),
                frequency: 0,
                available: 1,
            })
        );
        assert!(matches!(
            publisher.publish(&announcement("A1", 3, &["Mon 9AM", "Tue 9AM"])),
            Err(PublishError::FrequencyOutOfRange { .. })
        ));
        assert!(matches!(
            publisher.publish(&announcement("A1", 1, &[])),
            Err(PublishError::NoOptions { .. })
        ));
    }

    #[test]
    fn test_publish_enforces_platform_caps() {
        let publisher = AnnouncementPublisher::new();

        let labels: Vec<String> = (0..26).map(|i| format!("Slot {}", i)).collect();
        let refs: Vec<&str> = labels.iter().map(String::as_str).collect();
        assert!(matches!(
            publisher.publish(&announcement("A1", 1, &refs)),
            Err(PublishError::TooManyOptions { count: 26, .. })
        ));

        let long = "x".repeat(95);
        assert!(matches!(
            publisher.publish(&announcement("A1", 1, &[long.as_str()])),
            Err(PublishError::OptionValueTooLong { max: 100, .. })
        ));
    }

    #[test]
    fn test_decode_keeps_commas_in_labels() {
        let decoded = decode_option_value("A7,opt1,Mon 9AM, or later").unwrap();
        assert_eq!(decoded.announcement_id.as_str(), "A7");
        assert_eq!(decoded.option_id.as_str(), "opt1");
        assert_eq!(decoded.label, "Mon 9AM, or later");
    }

    #[test]
    fn test_decode_without_label_uses_option_id() {
        let decoded = decode_option_value("A7,optB").unwrap();
        assert_eq!(decoded.label, "optB");
    }

    #[test]
    fn test_decode_rejects_malformed_values() {
        for raw in ["", "A7", ",opt1,Mon", "A7,,Mon"] {
            assert!(
                matches!(decode_option_value(raw), Err(LedgerError::InvalidSelection { .. })),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_course_request_gets_positional_option_ids() {
        let request: CourseRequest = serde_json::from_value(serde_json::json!({
            "Id": 42,
            "Subject": "Physics",
            "Frequency": 1,
            "LevelName": "A-Level",
            "Money": 30,
            "Duration": "2",
            "DateOptions": ["Mon 9AM", "Wed 2PM"]
        }))
        .unwrap();

        let announcement = request.into_announcement().unwrap();
        assert_eq!(announcement.id.as_str(), "42");
        assert_eq!(announcement.pay_per_class, "30");
        assert_eq!(
            announcement
                .options
                .iter()
                .map(|o| (o.option_id.as_str(), o.label.as_str()))
                .collect::<Vec<_>>(),
            vec![("1", "Mon 9AM"), ("2", "Wed 2PM")]
        );
    }

    #[test]
    fn test_course_request_without_id_is_skipped() {
        let request: CourseRequest = serde_json::from_value(serde_json::json!({
            "Subject": "Physics",
            "Frequency": 1,
            "DateOptions": [{"id": "optA", "label": "Mon 9AM"}]
        }))
        .unwrap();

        assert_eq!(request.into_announcement(), None);
    }

    #[test]
    fn test_frequency_accepts_numeric_strings() {
        let parse = |frequency: serde_json::Value| {
            serde_json::from_value::<CourseRequest>(serde_json::json!({
                "Id": "A1",
                "Frequency": frequency,
                "DateOptions": ["Mon 9AM", "Wed 2PM"]
            }))
        };

        assert_eq!(parse(serde_json::json!(2)).unwrap().frequency, 2);
        assert_eq!(parse(serde_json::json!(" 2 ")).unwrap().frequency, 2);
        assert!(parse(serde_json::json!("twice")).is_err());
        assert!(parse(serde_json::json!(-1)).is_err());

        let missing = serde_json::from_value::<CourseRequest>(serde_json::json!({
            "Id": "A1",
            "DateOptions": ["Mon 9AM"]
        }));
        assert!(missing.is_err());
    }
}
