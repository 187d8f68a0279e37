use miette::Diagnostic;
use thiserror::Error;

use crate::ledger::PendingResponse;

/// Top-level error for the relay core
#[derive(Error, Diagnostic, Debug)]
pub enum CoreError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Publish(#[from] PublishError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

/// Errors raised by the response ledger
#[derive(Error, Diagnostic, Debug)]
pub enum LedgerError {
    #[error(
        "tutor {} already has a pending response to announcement {}",
        .existing.tutor_id,
        .existing.announcement_id
    )]
    #[diagnostic(
        code(tutor_core::ledger::already_pending),
        help("Submit or cancel the pending response before selecting options for another announcement")
    )]
    AlreadyPending { existing: Box<PendingResponse> },

    #[error("invalid selection: {reason}")]
    #[diagnostic(
        code(tutor_core::ledger::invalid_selection),
        help("A selection needs at least one option and one label per option")
    )]
    InvalidSelection { reason: String },

    #[error("response ledger unavailable during {operation} of {location}")]
    #[diagnostic(
        code(tutor_core::ledger::storage_unavailable),
        help("The ledger file may be unreadable or corrupt; nothing was changed")
    )]
    StorageUnavailable {
        operation: &'static str,
        location: String,
        #[source]
        cause: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl LedgerError {
    pub fn already_pending(existing: PendingResponse) -> Self {
        Self::AlreadyPending {
            existing: Box::new(existing),
        }
    }

    pub fn invalid_selection(reason: impl Into<String>) -> Self {
        Self::InvalidSelection {
            reason: reason.into(),
        }
    }

    pub fn unavailable(
        operation: &'static str,
        location: impl Into<String>,
        cause: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::StorageUnavailable {
            operation,
            location: location.into(),
            cause: cause.into(),
        }
    }
}

/// Errors talking to the course API
#[derive(Error, Diagnostic, Debug)]
pub enum ApiError {
    #[error("request to {endpoint} failed")]
    #[diagnostic(
        code(tutor_core::api::request_failed),
        help("Check that the course API at the configured prefix is reachable")
    )]
    RequestFailed {
        endpoint: String,
        #[source]
        cause: reqwest::Error,
    },

    #[error("{endpoint} answered with unexpected status {status}")]
    #[diagnostic(code(tutor_core::api::unexpected_status))]
    UnexpectedStatus {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("could not decode the response from {endpoint}")]
    #[diagnostic(
        code(tutor_core::api::decode_failed),
        help("The course API response shape may have changed")
    )]
    DecodeFailed {
        endpoint: String,
        #[source]
        cause: reqwest::Error,
    },

    #[error("{endpoint} did not answer within {seconds}s")]
    #[diagnostic(code(tutor_core::api::timeout))]
    Timeout { endpoint: String, seconds: u64 },
}

/// Errors obtaining or refreshing the API credential
#[derive(Error, Diagnostic, Debug)]
pub enum CredentialError {
    #[error("the course API rejected the bot's login")]
    #[diagnostic(
        code(tutor_core::credential::login_rejected),
        help("Check API_USERNAME and API_PASSWORD")
    )]
    LoginRejected { status: u16 },

    #[error("login request failed")]
    #[diagnostic(code(tutor_core::credential::login_failed))]
    LoginFailed {
        #[source]
        cause: ApiError,
    },

    #[error("credential still rejected after {refreshes} refresh(es)")]
    #[diagnostic(
        code(tutor_core::credential::still_expired),
        help("The API keeps rejecting freshly issued tokens; check the API's clock and signing key")
    )]
    StillExpired { refreshes: usize },

    #[error("no API credentials configured")]
    #[diagnostic(
        code(tutor_core::credential::missing),
        help("Set api.username and api.password, or API_USERNAME and API_PASSWORD")
    )]
    MissingCredentials,
}

/// Errors building an announcement view
#[derive(Error, Diagnostic, Debug, PartialEq, Eq)]
pub enum PublishError {
    #[error("announcement {announcement_id} has no date options")]
    #[diagnostic(code(tutor_core::publish::no_options))]
    NoOptions { announcement_id: String },

    #[error("announcement {announcement_id} asks for {frequency} selection(s) out of {available} option(s)")]
    #[diagnostic(
        code(tutor_core::publish::frequency_out_of_range),
        help("Frequency must be between 1 and the number of date options")
    )]
    FrequencyOutOfRange {
        announcement_id: String,
        frequency: u32,
        available: usize,
    },

    #[error("announcement {announcement_id} has {count} options, the limit is {max}")]
    #[diagnostic(code(tutor_core::publish::too_many_options))]
    TooManyOptions {
        announcement_id: String,
        count: usize,
        max: usize,
    },

    #[error("option value '{value}' is longer than {max} characters")]
    #[diagnostic(
        code(tutor_core::publish::option_value_too_long),
        help("Shorten the option label or the announcement id")
    )]
    OptionValueTooLong { value: String, max: usize },
}

/// Configuration errors
#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("failed to read configuration file {path}")]
    #[diagnostic(
        code(tutor_core::config::read_failed),
        help("Create a config file or use environment variables")
    )]
    ReadFailed {
        path: String,
        #[source]
        cause: std::io::Error,
    },

    #[error("failed to parse configuration file {path}")]
    #[diagnostic(
        code(tutor_core::config::parse_failed),
        help("Check the TOML syntax")
    )]
    ParseFailed {
        path: String,
        #[source]
        cause: toml::de::Error,
    },

    #[error("invalid configuration for {field}: {reason}")]
    #[diagnostic(
        code(tutor_core::config::invalid),
        help("Check configuration format and required fields")
    )]
    Invalid { field: String, reason: String },
}

impl ConfigError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
