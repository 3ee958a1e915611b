use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ComputeResult<T> = Result<T, ReconError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReconErrorCategory {
    InputValidationError,
    IoSystemError,
    ComputationError,
    InternalError,
}

impl ReconErrorCategory {
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::InputValidationError => 2,
            Self::IoSystemError => 3,
            Self::ComputationError => 4,
            Self::InternalError => 5,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InputValidationError => "InputValidationError",
            Self::IoSystemError => "IoSystemError",
            Self::ComputationError => "ComputationError",
            Self::InternalError => "InternalError",
        }
    }
}

/// Error shared by loaders and reconstruction building blocks.
///
/// The placeholder is a stable dotted code (`IO.TABLE_READ`,
/// `RUN.MISSING_TABLE`, ...) that callers and tests can match on without
/// depending on the message text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconError {
    category: ReconErrorCategory,
    placeholder: &'static str,
    message: String,
}

impl ReconError {
    pub fn new(
        category: ReconErrorCategory,
        placeholder: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            placeholder,
            message: message.into(),
        }
    }

    pub fn input_validation(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(
            ReconErrorCategory::InputValidationError,
            placeholder,
            message,
        )
    }

    pub fn io_system(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(ReconErrorCategory::IoSystemError, placeholder, message)
    }

    pub fn computation(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(ReconErrorCategory::ComputationError, placeholder, message)
    }

    pub const fn category(&self) -> ReconErrorCategory {
        self.category
    }

    pub const fn placeholder(&self) -> &'static str {
        self.placeholder
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn exit_code(&self) -> i32 {
        self.category.exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        format!("ERROR: [{}] {}", self.placeholder, self.message)
    }

    pub fn fatal_exit_line(&self) -> String {
        format!("FATAL EXIT CODE: {}", self.exit_code())
    }
}

impl Display for ReconError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.category.as_str(),
            self.placeholder,
            self.message
        )
    }
}

impl Error for ReconError {}

#[cfg(test)]
mod tests {
    use super::{ReconError, ReconErrorCategory};

    #[test]
    fn exit_codes_are_stable_per_category() {
        let cases = [
            (ReconErrorCategory::InputValidationError, 2),
            (ReconErrorCategory::IoSystemError, 3),
            (ReconErrorCategory::ComputationError, 4),
            (ReconErrorCategory::InternalError, 5),
        ];

        for (category, exit_code) in cases {
            assert_eq!(category.exit_code(), exit_code);
        }
    }

    #[test]
    fn error_renders_diagnostic_lines() {
        let error = ReconError::computation(
            "RUN.MISSING_TABLE",
            "no energy-loss table registered for 4He in 27Al",
        );

        assert_eq!(error.exit_code(), 4);
        assert_eq!(
            error.diagnostic_line(),
            "ERROR: [RUN.MISSING_TABLE] no energy-loss table registered for 4He in 27Al"
        );
        assert_eq!(error.fatal_exit_line(), "FATAL EXIT CODE: 4");
        assert_eq!(
            error.to_string(),
            "ComputationError [RUN.MISSING_TABLE] no energy-loss table registered for 4He in 27Al"
        );
    }
}
