//! Error types and validation helpers shared by the command handlers.

use std::fmt::{self, Display, Formatter};

use resticly_ui::{AppContext, ClientError, FailureKind, PreferencesError};

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
    /// Already shown to the user as a notification.
    Notified { message: String, exit_code: i32 },
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
            Self::Notified { exit_code, .. } => *exit_code,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) | Self::Notified { message, .. } => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }

    pub(crate) const fn already_reported(&self) -> bool {
        matches!(self, Self::Notified { .. })
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

impl From<ClientError> for CliError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::RequestFailed { kind, message } => {
                let exit_code = match kind {
                    FailureKind::Protocol {
                        status: 400 | 404 | 409 | 422,
                    } => 2,
                    _ => 3,
                };
                Self::Notified { message, exit_code }
            }
            other => Self::failure(other),
        }
    }
}

impl From<PreferencesError> for CliError {
    fn from(err: PreferencesError) -> Self {
        Self::failure(err)
    }
}

/// Show a translated warning and reject the command.
pub(crate) fn reject(ctx: &AppContext, key: &str, default: &str) -> CliError {
    let message = ctx.text(key, default);
    ctx.notifications().warning(message.clone());
    CliError::Notified {
        message,
        exit_code: 2,
    }
}

/// Trimmed value, or `None` when blank.
pub(crate) fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Refuse a destructive command unless `--yes` was passed.
pub(crate) fn require_confirmation(ctx: &AppContext, confirmed: bool) -> CliResult<()> {
    if confirmed {
        Ok(())
    } else {
        Err(reject(
            ctx,
            "validation.confirm",
            "Pass --yes to confirm this deletion",
        ))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use resticly_ui::Severity;

    #[test]
    fn client_errors_map_to_exit_codes() {
        let conflict: CliError = ClientError::RequestFailed {
            kind: FailureKind::Protocol { status: 409 },
            message: "Repository already exists".into(),
        }
        .into();
        assert_eq!(conflict.exit_code(), 2);
        assert!(conflict.already_reported());
        assert_eq!(conflict.display_message(), "Repository already exists");

        let outage: CliError = ClientError::RequestFailed {
            kind: FailureKind::Protocol { status: 503 },
            message: "HTTP error 503".into(),
        }
        .into();
        assert_eq!(outage.exit_code(), 3);

        let transport: CliError = ClientError::RequestFailed {
            kind: FailureKind::Transport,
            message: "connection refused".into(),
        }
        .into();
        assert_eq!(transport.exit_code(), 3);
    }

    #[test]
    fn validation_and_failure_codes() {
        assert_eq!(CliError::validation("bad").exit_code(), 2);
        let failure = CliError::failure(anyhow::anyhow!("boom"));
        assert_eq!(failure.exit_code(), 3);
        assert!(!failure.already_reported());
        assert_eq!(failure.display_message(), "boom");
    }

    #[tokio::test]
    async fn rejection_is_shown_as_a_warning() -> Result<()> {
        let ctx = test_support::context("http://127.0.0.1:9")?;
        let err = require_confirmation(&ctx, false).expect_err("unconfirmed deletion");
        assert_eq!(err.exit_code(), 2);
        let shown = ctx.notifications().active();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].severity, Severity::Warning);
        assert_eq!(shown[0].message, "Pass --yes to confirm this deletion");
        assert!(require_confirmation(&ctx, true).is_ok());
        Ok(())
    }

    #[test]
    fn blank_values_are_rejected() {
        assert_eq!(non_blank("  nas "), Some("nas"));
        assert_eq!(non_blank("   "), None);
    }
}
