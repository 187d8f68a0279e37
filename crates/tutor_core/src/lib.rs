//! Tutor Relay Core - course answers, class requests and the course API
//!
//! This crate holds everything the chat adapter drives: the response ledger
//! that keeps at most one pending answer per tutor, the coordinator that
//! submits or cancels it, the announcement publisher and feed, the class
//! request flows, and the client for the agency's REST API.

pub mod announcement;
pub mod api;
pub mod class_requests;
pub mod config;
pub mod coordinator;
pub mod credentials;
pub mod error;
pub mod feed;
pub mod id;
pub mod ledger;
pub mod notifier;
pub mod view;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use announcement::{Announcement, AnnouncementOption, AnnouncementPublisher, CourseRequest};
pub use api::{CourseApi, ForwardRequest, ForwardStatus, HttpCourseApi, PrivateMessage};
pub use class_requests::{
    ClassPrompt, ClassRequest, ClassRequestKind, ClassRequestOutcome, ClassRequestService,
    TutorClass,
};
pub use config::Config;
pub use coordinator::{Outcome, PendingAction, SubmissionCoordinator};
pub use credentials::{Credential, CredentialProvider, JwtCredentialProvider};
pub use error::{
    ApiError, ConfigError, CoreError, CredentialError, LedgerError, PublishError, Result,
};
pub use feed::AnnouncementFeed;
pub use id::{AnnouncementId, ClassId, OptionId, TutorId};
pub use ledger::{FileStore, LedgerStore, MemoryStore, PendingResponse, ResponseLedger};
pub use notifier::Notifier;
pub use view::{
    Button, ButtonStyle, Embed, FieldStyle, FormField, FormView, MenuOption, MessageView,
    SelectMenu,
};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        AnnouncementFeed, AnnouncementId, ClassId, ClassRequestKind, ClassRequestService, Config,
        CoreError, CourseApi, CredentialProvider, MessageView, Notifier, OptionId, Outcome,
        PendingResponse, ResponseLedger, Result, SubmissionCoordinator, TutorId,
    };
}
