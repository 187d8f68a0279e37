//! Gateway interactions mapped onto the bot's own closed set of events.

use std::collections::HashMap;

use serenity::all::{ActionRowComponent, ComponentInteractionDataKind, Interaction};
use tutor_core::announcement::{CANCEL_COURSE_REQUEST, COURSE_DATE_SELECTED, SUBMIT_COURSE_REQUEST};
use tutor_core::{ClassId, ClassRequestKind, TutorId};

pub const PANEL_COMMAND: &str = "panel";
pub const PENDING_COMMAND: &str = "pending";
pub const KIND_OPTION: &str = "kind";

/// Everything the bot reacts to, parsed once from the gateway event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TutorInteraction {
    /// `/panel kind:<kind>`
    Panel { kind: ClassRequestKind },
    /// `/pending`
    ShowPending,
    CourseDatesSelected { values: Vec<String> },
    SubmitCourseRequest,
    CancelCourseRequest,
    StartClassRequest { kind: ClassRequestKind },
    ClassSelected {
        kind: ClassRequestKind,
        class_id: ClassId,
    },
    ClassFormSubmitted {
        kind: ClassRequestKind,
        fields: HashMap<String, String>,
    },
}

impl TutorInteraction {
    /// Parse a gateway interaction; `None` for anything the bot doesn't handle
    pub fn parse(interaction: &Interaction) -> Option<(TutorId, Self)> {
        match interaction {
            Interaction::Command(command) => {
                let kind = command
                    .data
                    .options
                    .iter()
                    .find(|opt| opt.name == KIND_OPTION)
                    .and_then(|opt| opt.value.as_str());
                let parsed = Self::from_command(&command.data.name, kind)?;
                Some((TutorId::from(command.user.id.get()), parsed))
            }
            Interaction::Component(component) => {
                let values: &[String] = match &component.data.kind {
                    ComponentInteractionDataKind::StringSelect { values } => values,
                    _ => &[],
                };
                let parsed = Self::from_component(&component.data.custom_id, values)?;
                Some((TutorId::from(component.user.id.get()), parsed))
            }
            Interaction::Modal(modal) => {
                let fields = modal
                    .data
                    .components
                    .iter()
                    .flat_map(|row| row.components.iter())
                    .filter_map(|component| match component {
                        ActionRowComponent::InputText(input) => Some((
                            input.custom_id.clone(),
                            input.value.clone().unwrap_or_default(),
                        )),
                        _ => None,
                    })
                    .collect();
                let parsed = Self::from_modal(&modal.data.custom_id, fields)?;
                Some((TutorId::from(modal.user.id.get()), parsed))
            }
            _ => None,
        }
    }

    pub fn from_command(name: &str, kind: Option<&str>) -> Option<Self> {
        match name {
            PANEL_COMMAND => kind
                .and_then(ClassRequestKind::parse)
                .map(|kind| Self::Panel { kind }),
            PENDING_COMMAND => Some(Self::ShowPending),
            _ => None,
        }
    }

    pub fn from_component(custom_id: &str, values: &[String]) -> Option<Self> {
        match custom_id {
            COURSE_DATE_SELECTED => Some(Self::CourseDatesSelected {
                values: values.to_vec(),
            }),
            SUBMIT_COURSE_REQUEST => Some(Self::SubmitCourseRequest),
            CANCEL_COURSE_REQUEST => Some(Self::CancelCourseRequest),
            other => {
                if let Some(kind) = ClassRequestKind::from_start_id(other) {
                    return Some(Self::StartClassRequest { kind });
                }
                let kind = ClassRequestKind::from_class_selected_id(other)?;
                let class_id = values.first()?;
                Some(Self::ClassSelected {
                    kind,
                    class_id: ClassId::new(class_id.as_str()),
                })
            }
        }
    }

    pub fn from_modal(custom_id: &str, fields: HashMap<String, String>) -> Option<Self> {
        ClassRequestKind::from_form_id(custom_id)
            .map(|kind| Self::ClassFormSubmitted { kind, fields })
    }

    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::Panel { .. } => "panel",
            Self::ShowPending => "pending",
            Self::CourseDatesSelected { .. } => "course dates selected",
            Self::SubmitCourseRequest => "submit course request",
            Self::CancelCourseRequest => "cancel course request",
            Self::StartClassRequest { .. } => "start class request",
            Self::ClassSelected { .. } => "class selected",
            Self::ClassFormSubmitted { .. } => "class form submitted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_course_components() {
        let values = vec!["A7,optB,Wed 2PM".to_string()];
        assert_eq!(
            TutorInteraction::from_component("courseDateSelected", &values),
            Some(TutorInteraction::CourseDatesSelected {
                values: values.clone()
            })
        );
        assert_eq!(
            TutorInteraction::from_component("submitCourseRequest", &[]),
            Some(TutorInteraction::SubmitCourseRequest)
        );
        assert_eq!(
            TutorInteraction::from_component("cancelCourseRequest", &[]),
            Some(TutorInteraction::CancelCourseRequest)
        );
    }

    #[test]
    fn test_class_request_components() {
        assert_eq!(
            TutorInteraction::from_component("startRescheduling", &[]),
            Some(TutorInteraction::StartClassRequest {
                kind: ClassRequestKind::Rescheduling
            })
        );
        assert_eq!(
            TutorInteraction::from_component("feedbackClassSelected", &["11223344".to_string()]),
            Some(TutorInteraction::ClassSelected {
                kind: ClassRequestKind::Feedback,
                class_id: ClassId::new("11223344"),
            })
        );
        assert_eq!(
            TutorInteraction::from_component("feedbackClassSelected", &[]),
            None
        );
        assert_eq!(TutorInteraction::from_component("somethingElse", &[]), None);
    }

    #[test]
    fn test_commands() {
        assert_eq!(
            TutorInteraction::from_command("panel", Some("cancellation")),
            Some(TutorInteraction::Panel {
                kind: ClassRequestKind::Cancellation
            })
        );
        assert_eq!(TutorInteraction::from_command("panel", Some("bogus")), None);
        assert_eq!(TutorInteraction::from_command("panel", None), None);
        assert_eq!(
            TutorInteraction::from_command("pending", None),
            Some(TutorInteraction::ShowPending)
        );
    }

    #[test]
    fn test_modal_forms() {
        let fields: HashMap<String, String> =
            [("cancellationReason".to_string(), "exams".to_string())]
                .into_iter()
                .collect();

        assert_eq!(
            TutorInteraction::from_modal("cancellationForm", fields.clone()),
            Some(TutorInteraction::ClassFormSubmitted {
                kind: ClassRequestKind::Cancellation,
                fields
            })
        );
        assert_eq!(TutorInteraction::from_modal("testModal", HashMap::new()), None);
    }
}
