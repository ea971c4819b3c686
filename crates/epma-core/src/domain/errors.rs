use std::error::Error;
use std::fmt::{Display, Formatter};

pub type EpmaResult<T> = Result<T, EpmaError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EpmaErrorCategory {
    Success,
    InputValidationError,
    IoSystemError,
    InternalError,
}

impl EpmaErrorCategory {
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::InputValidationError => 2,
            Self::IoSystemError => 3,
            Self::InternalError => 5,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::InputValidationError => "InputValidationError",
            Self::IoSystemError => "IoSystemError",
            Self::InternalError => "InternalError",
        }
    }

    pub const fn is_fatal(self) -> bool {
        !matches!(self, Self::Success)
    }
}

pub const UNSUPPORTED_MINERAL_TYPE: &str = "INPUT.UNSUPPORTED_MINERAL_TYPE";
pub const MISSING_COLUMN: &str = "INPUT.MISSING_COLUMN";
pub const INVALID_OPERATOR_INPUT: &str = "INPUT.OPERATOR_TOLERANCE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpmaError {
    category: EpmaErrorCategory,
    placeholder: &'static str,
    message: String,
}

impl EpmaError {
    pub fn new(
        category: EpmaErrorCategory,
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
        Self::new(EpmaErrorCategory::InputValidationError, placeholder, message)
    }

    pub fn io_system(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(EpmaErrorCategory::IoSystemError, placeholder, message)
    }

    pub fn internal(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(EpmaErrorCategory::InternalError, placeholder, message)
    }

    pub fn unsupported_mineral_type(name: &str) -> Self {
        Self::input_validation(
            UNSUPPORTED_MINERAL_TYPE,
            format!(
                "mineral type '{}' not recognised; expected olivine, orthopyroxene, clinopyroxene or spinel",
                name
            ),
        )
    }

    pub fn missing_column(column: &str) -> Self {
        Self::input_validation(
            MISSING_COLUMN,
            format!("required column '{}' is missing from the input table", column),
        )
    }

    pub fn invalid_operator_input(response: &str) -> Self {
        Self::input_validation(
            INVALID_OPERATOR_INPUT,
            format!("'{}' is not a numeric tolerance", response.trim()),
        )
    }

    pub const fn category(&self) -> EpmaErrorCategory {
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
        let severity = if self.category.is_fatal() {
            "ERROR"
        } else {
            "INFO"
        };
        format!("{}: [{}] {}", severity, self.placeholder, self.message)
    }

    pub fn fatal_exit_line(&self) -> Option<String> {
        self.category
            .is_fatal()
            .then(|| format!("FATAL EXIT CODE: {}", self.exit_code()))
    }
}

impl Display for EpmaError {
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

impl Error for EpmaError {}
