//! Feedback, cancellation and rescheduling requests for a tutor's classes.
//!
//! Each flow runs start button -> class menu -> form -> POST. The adapter
//! renders the views built here and hands the submitted form fields back.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};

use crate::announcement::Scalar;
use crate::api::CourseApi;
use crate::credentials::{CredentialProvider, with_credential_refresh};
use crate::id::{ClassId, TutorId};
use crate::view::{
    Button, ButtonStyle, COLOR_GREEN, COLOR_ORANGE, COLOR_RED, COLOR_YELLOW, Embed, FieldStyle,
    FormField, FormView, MenuOption, MessageView, SelectMenu,
};

const DATE_FORMAT: &str = "%m/%d/%Y";
const MAX_CLASSES_IN_MENU: usize = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassRequestKind {
    Feedback,
    Cancellation,
    Rescheduling,
}

impl ClassRequestKind {
    pub const ALL: [ClassRequestKind; 3] = [Self::Feedback, Self::Cancellation, Self::Rescheduling];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Feedback => "feedback",
            Self::Cancellation => "cancellation",
            Self::Rescheduling => "rescheduling",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == value)
    }

    /// Custom id of the panel's start button
    pub fn start_id(&self) -> String {
        match self {
            Self::Feedback => "startFeedback",
            Self::Cancellation => "startCancellation",
            Self::Rescheduling => "startRescheduling",
        }
        .to_string()
    }

    /// Custom id of the class select menu
    pub fn class_selected_id(&self) -> String {
        format!("{}ClassSelected", self.as_str())
    }

    pub fn form_id(&self) -> String {
        format!("{}Form", self.as_str())
    }

    pub fn from_start_id(custom_id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.start_id() == custom_id)
    }

    pub fn from_class_selected_id(custom_id: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.class_selected_id() == custom_id)
    }

    pub fn from_form_id(custom_id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.form_id() == custom_id)
    }

    fn class_id_field(&self) -> &'static str {
        match self {
            Self::Feedback => "classId",
            Self::Cancellation => "cancellationClassId",
            Self::Rescheduling => "reschedulingClassId",
        }
    }

    fn text_field(&self) -> &'static str {
        match self {
            Self::Feedback => "feedback",
            Self::Cancellation => "cancellationReason",
            Self::Rescheduling => "reschedulingReason",
        }
    }
}

impl fmt::Display for ClassRequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the tutor's active classes, from `GET /tutor_classes/{tutorId}`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TutorClass {
    pub id: Scalar,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub student: String,
    #[serde(default)]
    pub date: String,
}

impl TutorClass {
    pub fn class_id(&self) -> ClassId {
        ClassId::new(self.id.to_string())
    }
}

/// A completed form, ready to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassRequest {
    Feedback {
        class_id: ClassId,
        note: String,
    },
    Cancellation {
        class_id: ClassId,
        reason: String,
    },
    Rescheduling {
        class_id: ClassId,
        reason: String,
        new_date: NaiveDate,
    },
}

impl ClassRequest {
    pub fn kind(&self) -> ClassRequestKind {
        match self {
            Self::Feedback { .. } => ClassRequestKind::Feedback,
            Self::Cancellation { .. } => ClassRequestKind::Cancellation,
            Self::Rescheduling { .. } => ClassRequestKind::Rescheduling,
        }
    }

    pub fn class_id(&self) -> &ClassId {
        match self {
            Self::Feedback { class_id, .. }
            | Self::Cancellation { class_id, .. }
            | Self::Rescheduling { class_id, .. } => class_id,
        }
    }

    /// API path the request is posted to
    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::Feedback { .. } => "/feedback_creation",
            Self::Cancellation { .. } => "/cancellation_request",
            Self::Rescheduling { .. } => "/rescheduling_request",
        }
    }

    pub fn body(&self) -> serde_json::Value {
        match self {
            Self::Feedback { class_id, note } => json!({ "classId": class_id, "note": note }),
            Self::Cancellation { class_id, reason } => {
                json!({ "class_ID": class_id, "reason": reason })
            }
            Self::Rescheduling {
                class_id,
                reason,
                new_date,
            } => json!({
                "class_ID": class_id,
                "reason": reason,
                "new_date": new_date.format(DATE_FORMAT).to_string(),
            }),
        }
    }

    /// Build a request from submitted form fields
    ///
    /// Rescheduling dates must be `MM/DD/YYYY` and after `today`.
    pub fn from_form(
        kind: ClassRequestKind,
        fields: &HashMap<String, String>,
        today: NaiveDate,
    ) -> Result<Self, ClassRequestOutcome> {
        let field = |name: &str| {
            fields
                .get(name)
                .map(|v| v.trim().to_string())
                .unwrap_or_default()
        };

        let class_id = field(kind.class_id_field());
        if class_id.is_empty() {
            return Err(ClassRequestOutcome::InvalidClassId);
        }
        let class_id = ClassId::new(class_id);
        let text = field(kind.text_field());

        Ok(match kind {
            ClassRequestKind::Feedback => Self::Feedback {
                class_id,
                note: text,
            },
            ClassRequestKind::Cancellation => Self::Cancellation {
                class_id,
                reason: text,
            },
            ClassRequestKind::Rescheduling => {
                let new_date = NaiveDate::parse_from_str(&field("newDate"), DATE_FORMAT)
                    .map_err(|_| ClassRequestOutcome::InvalidDateFormat)?;
                if new_date <= today {
                    return Err(ClassRequestOutcome::DatePassed);
                }
                Self::Rescheduling {
                    class_id,
                    reason: text,
                    new_date,
                }
            }
        })
    }
}

/// How a class request ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassRequestOutcome {
    Submitted,
    Rescheduled { new_date: NaiveDate },
    InvalidClassId,
    AlreadyRequested,
    InvalidDateFormat,
    DatePassed,
    ServerError,
}

impl ClassRequestOutcome {
    /// Map the API's answer to `request`; 401 is handled by the caller
    pub fn from_status(status: u16, request: &ClassRequest) -> Self {
        match (status, request) {
            (200, ClassRequest::Rescheduling { new_date, .. }) => Self::Rescheduled {
                new_date: *new_date,
            },
            (200, _) => Self::Submitted,
            (412, _) => Self::InvalidClassId,
            (406, _) => Self::AlreadyRequested,
            (408, _) => Self::InvalidDateFormat,
            (402, _) => Self::DatePassed,
            _ => Self::ServerError,
        }
    }

    pub fn text(&self) -> String {
        match self {
            Self::Submitted => "Your submission has been received successfully! \nYou will receive an email about the status of your request when it is completed.".to_string(),
            Self::Rescheduled { new_date } => format!(
                "You have requested to reschedule your class to {} \nYou will receive an email about the status of your request when it is completed.",
                new_date.format("%d %B %Y")
            ),
            Self::InvalidClassId => "Invalid class ID entered! \nPlease do not change the class ID unless instructed otherwise.".to_string(),
            Self::AlreadyRequested => "You have already submitted a request for this class! \nWe will get back to you soon, thank you.".to_string(),
            Self::InvalidDateFormat => "Invalid date format entered! \nPlease suggest a new date in MM/DD/YYYY format.".to_string(),
            Self::DatePassed => "Invalid date entered! \nYour suggested date has to be in the future.".to_string(),
            Self::ServerError => crate::notifier::SERVER_ERROR_TEXT.to_string(),
        }
    }
}

/// What to show after the start button
#[derive(Debug, Clone, PartialEq)]
pub enum ClassPrompt {
    Choose(MessageView),
    NoActiveClasses,
    ServerError,
}

impl ClassPrompt {
    pub const NO_ACTIVE_CLASSES_TEXT: &'static str = "You do not have any active classes!";
}

#[derive(Clone)]
pub struct ClassRequestService {
    api: Arc<dyn CourseApi>,
    credentials: Arc<dyn CredentialProvider>,
}

impl fmt::Debug for ClassRequestService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassRequestService")
            .field("api", &self.api)
            .finish_non_exhaustive()
    }
}

impl ClassRequestService {
    pub fn new(api: Arc<dyn CourseApi>, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self { api, credentials }
    }

    /// The starter message posted once into a channel
    pub fn panel(kind: ClassRequestKind) -> MessageView {
        let title = match kind {
            ClassRequestKind::Feedback => "Give feedback on a class",
            ClassRequestKind::Cancellation => "Cancel a class",
            ClassRequestKind::Rescheduling => "Reschedule a class",
        };
        MessageView {
            embeds: vec![Embed::new(
                title,
                "**Click on the button below to start**",
                COLOR_YELLOW,
            )],
            menu: None,
            buttons: vec![Button::new(kind.start_id(), "HERE", ButtonStyle::Success)],
        }
    }

    /// Fetch the tutor's classes and offer them in a menu
    pub async fn class_menu(&self, kind: ClassRequestKind, tutor_id: &TutorId) -> ClassPrompt {
        let classes = with_credential_refresh(self.credentials.as_ref(), |credential| {
            let api = self.api.clone();
            let tutor_id = tutor_id.clone();
            async move { api.fetch_tutor_classes(&tutor_id, &credential).await }
        })
        .await;

        let classes = match classes {
            Ok(classes) => classes,
            Err(e) => {
                error!("Could not fetch classes of tutor {}: {}", tutor_id, e);
                return ClassPrompt::ServerError;
            }
        };

        if classes.is_empty() {
            return ClassPrompt::NoActiveClasses;
        }
        if classes.len() > MAX_CLASSES_IN_MENU {
            warn!(
                "Tutor {} has {} classes, only the first {} are offered",
                tutor_id,
                classes.len(),
                MAX_CLASSES_IN_MENU
            );
        }

        let (color, action) = match kind {
            ClassRequestKind::Feedback => (COLOR_GREEN, "submit feedback for"),
            ClassRequestKind::Cancellation => (COLOR_RED, "cancel"),
            ClassRequestKind::Rescheduling => (COLOR_ORANGE, "reschedule"),
        };

        let options = classes
            .iter()
            .take(MAX_CLASSES_IN_MENU)
            .map(|class| MenuOption {
                label: class.name.clone(),
                value: class.class_id().to_string(),
                description: Some(format!(
                    "Student: {} || Class date: {}",
                    class.student, class.date
                )),
            })
            .collect();

        ClassPrompt::Choose(MessageView {
            embeds: vec![Embed::new(
                "Select a class",
                format!("Select the class which you wish to {}", action),
                color,
            )],
            menu: Some(SelectMenu {
                custom_id: kind.class_selected_id(),
                placeholder: "Select the class".to_string(),
                min_values: 1,
                max_values: 1,
                options,
            }),
            buttons: Vec::new(),
        })
    }

    /// The form for one class; the class id rides along as the last field
    pub fn form(kind: ClassRequestKind, class_id: &ClassId) -> FormView {
        let mut fields = Vec::new();
        let title = match kind {
            ClassRequestKind::Feedback => {
                fields.push(FormField {
                    custom_id: kind.text_field().to_string(),
                    label: "Leave feedback of the student's performance".to_string(),
                    placeholder: "The student is exceptional!".to_string(),
                    value: None,
                    style: FieldStyle::Paragraph,
                });
                "Class Feedback Form"
            }
            ClassRequestKind::Cancellation => {
                fields.push(FormField {
                    custom_id: kind.text_field().to_string(),
                    label: "Why would you like to cancel this class?".to_string(),
                    placeholder: "Because I have final exams coming up!".to_string(),
                    value: None,
                    style: FieldStyle::Paragraph,
                });
                "Class Cancellation Form"
            }
            ClassRequestKind::Rescheduling => {
                fields.push(FormField {
                    custom_id: kind.text_field().to_string(),
                    label: "Why would you like to reschedule this class?".to_string(),
                    placeholder: "I am feeling sick :(".to_string(),
                    value: None,
                    style: FieldStyle::Paragraph,
                });
                fields.push(FormField {
                    custom_id: "newDate".to_string(),
                    label: "Suggest a new date in MM/DD/YYYY format".to_string(),
                    placeholder: "MM/DD/YYYY".to_string(),
                    value: None,
                    style: FieldStyle::Short,
                });
                "Class Rescheduling Form"
            }
        };

        fields.push(FormField {
            custom_id: kind.class_id_field().to_string(),
            label: format!("Leave as {} unless instructed otherwise", class_id),
            placeholder: format!("Set as {}", class_id),
            value: Some(class_id.to_string()),
            style: FieldStyle::Short,
        });

        FormView {
            custom_id: kind.form_id(),
            title: title.to_string(),
            fields,
        }
    }

    /// Validate the submitted form and send it
    pub async fn submit_form(
        &self,
        kind: ClassRequestKind,
        fields: &HashMap<String, String>,
    ) -> ClassRequestOutcome {
        let today = chrono::Local::now().date_naive();
        match ClassRequest::from_form(kind, fields, today) {
            Ok(request) => self.submit(request).await,
            Err(outcome) => outcome,
        }
    }

    pub async fn submit(&self, request: ClassRequest) -> ClassRequestOutcome {
        let result = with_credential_refresh(self.credentials.as_ref(), |credential| {
            let api = self.api.clone();
            let request = request.clone();
            async move { api.submit_class_request(&request, &credential).await }
        })
        .await;

        match result {
            Ok(status) => {
                let outcome = ClassRequestOutcome::from_status(status, &request);
                info!(
                    "{} request for class {} answered {} ({:?})",
                    request.kind(),
                    request.class_id(),
                    status,
                    outcome
                );
                outcome
            }
            Err(e) => {
                error!(
                    "{} request for class {} failed: {}",
                    request.kind(),
                    request.class_id(),
                    e
                );
                ClassRequestOutcome::ServerError
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::Authorized;
    use crate::test_helpers::{ScriptedApi, static_credentials};
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn fields(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_custom_ids_round_trip_to_kinds() {
        for kind in ClassRequestKind::ALL {
            assert_eq!(ClassRequestKind::from_start_id(&kind.start_id()), Some(kind));
            assert_eq!(
                ClassRequestKind::from_class_selected_id(&kind.class_selected_id()),
                Some(kind)
            );
            assert_eq!(ClassRequestKind::from_form_id(&kind.form_id()), Some(kind));
        }
        assert_eq!(
            ClassRequestKind::Rescheduling.class_selected_id(),
            "reschedulingClassSelected"
        );
        assert_eq!(ClassRequestKind::from_start_id("startNothing"), None);
    }

    #[test]
    fn test_rescheduling_date_must_be_future() {
        let today = date(2001, 9, 1);
        let form = |new_date: &str| {
            fields(&[
                ("reschedulingReason", "sick"),
                ("newDate", new_date),
                ("reschedulingClassId", "55"),
            ])
        };

        assert_eq!(
            ClassRequest::from_form(ClassRequestKind::Rescheduling, &form("09/09/2001"), today),
            Ok(ClassRequest::Rescheduling {
                class_id: ClassId::new("55"),
                reason: "sick".to_string(),
                new_date: date(2001, 9, 9),
            })
        );
        assert_eq!(
            ClassRequest::from_form(ClassRequestKind::Rescheduling, &form("09/01/2001"), today),
            Err(ClassRequestOutcome::DatePassed)
        );
        assert_eq!(
            ClassRequest::from_form(ClassRequestKind::Rescheduling, &form("2001-09-09"), today),
            Err(ClassRequestOutcome::InvalidDateFormat)
        );
    }

    #[test]
    fn test_missing_class_id_is_invalid() {
        let result = ClassRequest::from_form(
            ClassRequestKind::Feedback,
            &fields(&[("feedback", "great")]),
            date(2024, 1, 1),
        );
        assert_eq!(result, Err(ClassRequestOutcome::InvalidClassId));
    }

    #[test]
    fn test_request_bodies_use_api_field_names() {
        let cancellation = ClassRequest::Cancellation {
            class_id: ClassId::new("7"),
            reason: "exams".to_string(),
        };
        assert_eq!(cancellation.endpoint(), "/cancellation_request");
        assert_eq!(
            cancellation.body(),
            serde_json::json!({"class_ID": "7", "reason": "exams"})
        );

        let feedback = ClassRequest::Feedback {
            class_id: ClassId::new("7"),
            note: "great".to_string(),
        };
        assert_eq!(
            feedback.body(),
            serde_json::json!({"classId": "7", "note": "great"})
        );

        let rescheduling = ClassRequest::Rescheduling {
            class_id: ClassId::new("7"),
            reason: "sick".to_string(),
            new_date: date(2030, 3, 4),
        };
        assert_eq!(
            rescheduling.body(),
            serde_json::json!({"class_ID": "7", "reason": "sick", "new_date": "03/04/2030"})
        );
    }

    #[test]
    fn test_status_mapping() {
        let request = ClassRequest::Rescheduling {
            class_id: ClassId::new("7"),
            reason: String::new(),
            new_date: date(2001, 9, 9),
        };

        assert_eq!(
            ClassRequestOutcome::from_status(200, &request).text(),
            "You have requested to reschedule your class to 09 September 2001 \nYou will receive an email about the status of your request when it is completed."
        );
        assert_eq!(
            ClassRequestOutcome::from_status(412, &request),
            ClassRequestOutcome::InvalidClassId
        );
        assert_eq!(
            ClassRequestOutcome::from_status(406, &request),
            ClassRequestOutcome::AlreadyRequested
        );
        assert_eq!(
            ClassRequestOutcome::from_status(408, &request),
            ClassRequestOutcome::InvalidDateFormat
        );
        assert_eq!(
            ClassRequestOutcome::from_status(402, &request),
            ClassRequestOutcome::DatePassed
        );
        assert_eq!(
            ClassRequestOutcome::from_status(500, &request),
            ClassRequestOutcome::ServerError
        );
    }

    #[test]
    fn test_form_ends_with_class_id() {
        let form = ClassRequestService::form(ClassRequestKind::Rescheduling, &ClassId::new("99"));
        assert_eq!(form.custom_id, "reschedulingForm");
        assert_eq!(form.fields.len(), 3);
        let last = form.fields.last().unwrap();
        assert_eq!(last.custom_id, "reschedulingClassId");
        assert_eq!(last.value.as_deref(), Some("99"));
    }

    #[tokio::test]
    async fn test_class_menu_lists_classes() {
        let api = ScriptedApi::new();
        api.push_classes(Authorized::Done(vec![TutorClass {
            id: Scalar::Text("11223344".to_string()),
            name: "Math GCSE".to_string(),
            student: "Sam".to_string(),
            date: "Thursday 3PM".to_string(),
        }]));
        let service = ClassRequestService::new(Arc::new(api), static_credentials());

        let prompt = service
            .class_menu(ClassRequestKind::Cancellation, &TutorId::new("T"))
            .await;
        let ClassPrompt::Choose(view) = prompt else {
            panic!("expected a class menu, got {:?}", prompt);
        };
        let menu = view.menu.unwrap();
        assert_eq!(menu.custom_id, "cancellationClassSelected");
        assert_eq!(menu.options[0].value, "11223344");
        assert_eq!(
            menu.options[0].description.as_deref(),
            Some("Student: Sam || Class date: Thursday 3PM")
        );
    }

    #[tokio::test]
    async fn test_class_menu_without_classes() {
        let api = ScriptedApi::new();
        api.push_classes(Authorized::Done(Vec::new()));
        let service = ClassRequestService::new(Arc::new(api), static_credentials());

        assert_eq!(
            service
                .class_menu(ClassRequestKind::Feedback, &TutorId::new("T"))
                .await,
            ClassPrompt::NoActiveClasses
        );
    }

    #[tokio::test]
    async fn test_submit_retries_after_expiry() {
        let api = Arc::new(ScriptedApi::new());
        api.push_class_status(Authorized::Expired);
        api.push_class_status(Authorized::Done(200));
        let service = ClassRequestService::new(api.clone(), static_credentials());

        let outcome = service
            .submit(ClassRequest::Feedback {
                class_id: ClassId::new("7"),
                note: "great".to_string(),
            })
            .await;

        assert_eq!(outcome, ClassRequestOutcome::Submitted);
        assert_eq!(api.class_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_submit_transport_failure_is_server_error() {
        let api = ScriptedApi::new();
        let service = ClassRequestService::new(Arc::new(api), static_credentials());

        let outcome = service
            .submit(ClassRequest::Cancellation {
                class_id: ClassId::new("7"),
                reason: "exams".to_string(),
            })
            .await;
        assert_eq!(outcome, ClassRequestOutcome::ServerError);
    }
}
