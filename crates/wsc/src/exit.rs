use std::process::ExitCode;

/// Outcome of a command: an exit code plus an optional message for the user.
#[derive(Debug)]
pub struct Exit {
    code: ExitCode,
    message: Option<String>,
}

impl Exit {
    pub fn success() -> Self {
        Self {
            code: ExitCode::SUCCESS,
            message: None,
        }
    }

    pub fn error() -> Self {
        Self {
            code: ExitCode::FAILURE,
            message: None,
        }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.code == ExitCode::SUCCESS
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Print the message (stderr on failure) and hand back the exit code.
    pub fn report(self) -> ExitCode {
        if let Some(message) = &self.message {
            if self.is_success() {
                println!("{message}");
            } else {
                eprintln!("{message}");
            }
        }
        self.code
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carries_code_and_message() {
        let exit = Exit::error().with_message("2 of 3 workspaces failed to load");
        assert!(!exit.is_success());
        assert_eq!(exit.message(), Some("2 of 3 workspaces failed to load"));
        assert!(Exit::success().is_success());
    }
}
