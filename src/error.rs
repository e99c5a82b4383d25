//! Compilation error types and process exit codes.
//!
//! Each failure mode maps onto one [`ReturnCode`] so callers (and shell
//! scripts wrapping the binary) can distinguish what went wrong:
//!
//! | Code | Meaning |
//! |------|--------------------------|
//! | 0 | success |
//! | 1 | generic error |
//! | 2 | parse error |
//! | 3 | type-check error |
//! | 4 | assembly error |
//! | 5 | invalid input |
//! | 6 | file IO error |

use std::fmt;
use std::io;

/// Result type for compilation operations.
pub type CompileResult<T = ()> = Result<T, CompileError>;

/// Process exit code for a compilation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnCode {
    Success = 0,
    Error = 1,
    ParseErr = 2,
    TypeCheckErr = 3,
    AsmErr = 4,
    InvalidInput = 5,
    FileIoErr = 6,
}

/// A compilation error with a categorized kind and a human-readable message.
#[derive(Debug)]
pub struct CompileError {
    /// The category of failure.
    pub kind: CompileErrorKind,
    /// Human-readable description of what went wrong.
    pub message: String,
}

/// The category of compilation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileErrorKind {
    /// Missing files, conflicting flags, unsupported target/frontend combos.
    InvalidInput,
    /// The input could not be turned into a program.
    Parse,
    /// The program is not well-typed.
    TypeCheck,
    /// An IR construct has no SMT encoding (e.g. `Release`).
    SmtEncoding,
    /// A required external tool could not be spawned.
    SubprocessUnavailable,
    /// An external tool exceeded its configured timeout.
    SubprocessTimeout,
    /// An external tool exited with a non-zero status.
    SubprocessFailed,
    /// The external assembler rejected the compiled program.
    Assembly,
    /// Reading or writing a file failed.
    FileIo,
}

impl CompileError {
    /// Create an invalid-input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self {
            kind: CompileErrorKind::InvalidInput,
            message: message.into(),
        }
    }

    /// Create a parse-stage error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self {
            kind: CompileErrorKind::Parse,
            message: message.into(),
        }
    }

    /// Create a type-check error.
    pub fn type_check(message: impl Into<String>) -> Self {
        Self {
            kind: CompileErrorKind::TypeCheck,
            message: message.into(),
        }
    }

    /// Create an SMT-encoding error (unsupported construct).
    pub fn smt_encoding(message: impl Into<String>) -> Self {
        Self {
            kind: CompileErrorKind::SmtEncoding,
            message: message.into(),
        }
    }

    /// Create a subprocess-unavailable error.
    pub fn subprocess_unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: CompileErrorKind::SubprocessUnavailable,
            message: message.into(),
        }
    }

    /// Create a subprocess-timeout error.
    pub fn subprocess_timeout(message: impl Into<String>) -> Self {
        Self {
            kind: CompileErrorKind::SubprocessTimeout,
            message: message.into(),
        }
    }

    /// Create a subprocess-failure error.
    pub fn subprocess_failed(message: impl Into<String>) -> Self {
        Self {
            kind: CompileErrorKind::SubprocessFailed,
            message: message.into(),
        }
    }

    /// Create an assembly error.
    pub fn assembly(message: impl Into<String>) -> Self {
        Self {
            kind: CompileErrorKind::Assembly,
            message: message.into(),
        }
    }

    /// Create a file IO error.
    pub fn file_io(message: impl Into<String>) -> Self {
        Self {
            kind: CompileErrorKind::FileIo,
            message: message.into(),
        }
    }

    /// The exit code this error maps to.
    pub fn return_code(&self) -> ReturnCode {
        match self.kind {
            CompileErrorKind::InvalidInput => ReturnCode::InvalidInput,
            CompileErrorKind::Parse => ReturnCode::ParseErr,
            CompileErrorKind::TypeCheck => ReturnCode::TypeCheckErr,
            CompileErrorKind::Assembly => ReturnCode::AsmErr,
            CompileErrorKind::FileIo => ReturnCode::FileIoErr,
            CompileErrorKind::SmtEncoding
            | CompileErrorKind::SubprocessUnavailable
            | CompileErrorKind::SubprocessTimeout
            | CompileErrorKind::SubprocessFailed => ReturnCode::Error,
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.kind {
            CompileErrorKind::InvalidInput => "invalid input",
            CompileErrorKind::Parse => "parse error",
            CompileErrorKind::TypeCheck => "type-check error",
            CompileErrorKind::SmtEncoding => "SMT encoding error",
            CompileErrorKind::SubprocessUnavailable => "subprocess unavailable",
            CompileErrorKind::SubprocessTimeout => "subprocess timeout",
            CompileErrorKind::SubprocessFailed => "subprocess failed",
            CompileErrorKind::Assembly => "assembly error",
            CompileErrorKind::FileIo => "file IO error",
        };
        write!(f, "{}: {}", label, self.message)
    }
}

impl std::error::Error for CompileError {}

impl From<io::Error> for CompileError {
    fn from(err: io::Error) -> Self {
        CompileError::file_io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_exit_codes() {
        assert_eq!(
            CompileError::invalid_input("x").return_code(),
            ReturnCode::InvalidInput
        );
        assert_eq!(
            CompileError::type_check("x").return_code(),
            ReturnCode::TypeCheckErr
        );
        assert_eq!(CompileError::file_io("x").return_code(), ReturnCode::FileIoErr);
        assert_eq!(CompileError::assembly("x").return_code(), ReturnCode::AsmErr);
        assert_eq!(CompileError::parse("x").return_code(), ReturnCode::ParseErr);
    }

    #[test]
    fn display_includes_category_and_message() {
        let err = CompileError::smt_encoding("release operator has no encoding");
        let text = err.to_string();
        assert!(text.contains("SMT encoding error"));
        assert!(text.contains("release operator"));
    }

    #[test]
    fn io_errors_convert_to_file_io() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "missing");
        let err: CompileError = io_err.into();
        assert_eq!(err.kind, CompileErrorKind::FileIo);
    }
}
