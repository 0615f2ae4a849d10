//! # Diagnostics
//!
//! This module defines the unified, `miette`-based error type for every stage of
//! the normalization pipeline. Errors are constructed through the `err_msg!` and
//! `err_ctx!` macros, which fill in the context boilerplate.
//!
//! # Taxonomy
//!
//! - **ShapeMismatch**: a combinator or custom op did not find the structure it
//!   expects. Local and recoverable: the current mapping fails and the engine
//!   moves on to the next table entry.
//! - **UnboundVariable**: a construct step referenced a variable that the
//!   matching check never bound. This is a malformed rule, not malformed data,
//!   and aborts the stage.
//! - **MalformedTree**: the input tree is structurally invalid (e.g. a missing
//!   tag field). Aborts the pipeline for that document.
//! - **Config**, **Io**, **Internal**: ambient failures outside the engine.
//!
//! # Error Construction Macros
//!
//! - `err_msg!(MalformedTree, "missing field {}", key)` for message-only errors.
//! - `err_ctx!(MalformedTree, "bad offset", src, span)` when a source and span
//!   are available, optionally followed by a help string.

use std::sync::Arc;

use miette::{Diagnostic, LabeledSpan, NamedSource, SourceCode};
use thiserror::Error;

pub type SourceArc = Arc<NamedSource<String>>;

/// A byte range in the original source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// Type-safe error classification that mirrors the `UastError` variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    ShapeMismatch,
    UnboundVariable,
    MalformedTree,
    Config,
    Io,
    Internal,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::ShapeMismatch => "ShapeMismatch",
            ErrorType::UnboundVariable => "UnboundVariable",
            ErrorType::MalformedTree => "MalformedTree",
            ErrorType::Config => "Config",
            ErrorType::Io => "Io",
            ErrorType::Internal => "Internal",
        }
    }
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Minimal, composable error context for diagnostics.
#[derive(Debug, Default)]
pub struct ErrorContext {
    /// The primary source for this error (if any).
    pub source: Option<SourceArc>,
    /// The primary span for this error (if any).
    pub span: Option<Span>,
    /// An optional help message.
    pub help: Option<String>,
}

impl ErrorContext {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_help(help: impl Into<String>) -> Self {
        Self {
            help: Some(help.into()),
            ..Self::default()
        }
    }

    pub fn with_source_and_span(source: SourceArc, span: Span) -> Self {
        Self {
            source: Some(source),
            span: Some(span),
            ..Self::default()
        }
    }
}

/// Unified error type for every failure mode of the engine and its driver.
#[derive(Debug, Error)]
pub enum UastError {
    #[error("Shape mismatch: {message}")]
    ShapeMismatch {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
    #[error("Unbound variable: {message}")]
    UnboundVariable {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
    #[error("Malformed tree: {message}")]
    MalformedTree {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
    #[error("I/O error: {message}")]
    Io {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
}

impl UastError {
    fn get_ctx(&self) -> &ErrorContext {
        match self {
            UastError::ShapeMismatch { ctx, .. }
            | UastError::UnboundVariable { ctx, .. }
            | UastError::MalformedTree { ctx, .. }
            | UastError::Config { ctx, .. }
            | UastError::Io { ctx, .. }
            | UastError::Internal { ctx, .. } => ctx,
        }
    }

    fn message(&self) -> &str {
        match self {
            UastError::ShapeMismatch { message, .. }
            | UastError::UnboundVariable { message, .. }
            | UastError::MalformedTree { message, .. }
            | UastError::Config { message, .. }
            | UastError::Io { message, .. }
            | UastError::Internal { message, .. } => message,
        }
    }

    pub fn error_type(&self) -> ErrorType {
        match self {
            UastError::ShapeMismatch { .. } => ErrorType::ShapeMismatch,
            UastError::UnboundVariable { .. } => ErrorType::UnboundVariable,
            UastError::MalformedTree { .. } => ErrorType::MalformedTree,
            UastError::Config { .. } => ErrorType::Config,
            UastError::Io { .. } => ErrorType::Io,
            UastError::Internal { .. } => ErrorType::Internal,
        }
    }

    /// Only a shape mismatch may be absorbed by falling through to the next rule.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, UastError::ShapeMismatch { .. })
    }

    /// Wraps this error as the cause of a new error of the same type,
    /// prefixing the message with `context`.
    pub fn context(self, context: impl std::fmt::Display) -> UastError {
        let message = format!("{}: {}", context, self.message());
        let ty = self.error_type();
        let source: Option<Box<dyn std::error::Error + Send + Sync + 'static>> = Some(Box::new(self));
        let ctx = ErrorContext::none();
        match ty {
            ErrorType::ShapeMismatch => UastError::ShapeMismatch { message, ctx, source },
            ErrorType::UnboundVariable => UastError::UnboundVariable { message, ctx, source },
            ErrorType::MalformedTree => UastError::MalformedTree { message, ctx, source },
            ErrorType::Config => UastError::Config { message, ctx, source },
            ErrorType::Io => UastError::Io { message, ctx, source },
            ErrorType::Internal => UastError::Internal { message, ctx, source },
        }
    }
}

impl Diagnostic for UastError {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        Some(Box::new(format!("uastify::{}", self.error_type())))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        self.get_ctx()
            .help
            .as_ref()
            .map(|h| Box::new(h) as Box<dyn std::fmt::Display + 'a>)
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        self.get_ctx()
            .source
            .as_ref()
            .map(|s| s.as_ref() as &dyn SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let ctx = self.get_ctx();
        // Labels without source text would point into nothing.
        ctx.source.as_ref()?;
        let span = ctx.span?;
        let label = LabeledSpan::new(
            Some(self.message().to_string()),
            span.start,
            span.end.saturating_sub(span.start),
        );
        Some(Box::new(std::iter::once(label)))
    }
}

impl From<std::io::Error> for UastError {
    fn from(err: std::io::Error) -> Self {
        UastError::Io {
            message: err.to_string(),
            ctx: ErrorContext::none(),
            source: Some(Box::new(err)),
        }
    }
}

/// Converts a source string into an `Arc<NamedSource<String>>` for error contexts.
pub fn to_error_source(name: &str, source: &str) -> SourceArc {
    Arc::new(NamedSource::new(name, source.to_string()))
}

/// Constructs a `UastError` variant with a formatted message and no context.
#[macro_export]
macro_rules! err_msg {
    ($variant:ident, $msg:literal $(, $arg:expr)* $(,)?) => {
        $crate::diagnostics::UastError::$variant {
            message: format!($msg $(, $arg)*),
            ctx: $crate::diagnostics::ErrorContext::none(),
            source: None,
        }
    };
}

/// Constructs a `UastError` variant with a message, a source, a span and an
/// optional help text.
#[macro_export]
macro_rules! err_ctx {
    ($variant:ident, $msg:expr, $src:expr, $span:expr, $help:expr) => {
        $crate::diagnostics::UastError::$variant {
            message: $msg.to_string(),
            ctx: $crate::diagnostics::ErrorContext {
                source: Some($crate::diagnostics::SourceArc::clone($src)),
                span: Some($span),
                help: Some(format!("{}", $help)),
            },
            source: None,
        }
    };
    ($variant:ident, $msg:expr, $src:expr, $span:expr) => {
        $crate::diagnostics::UastError::$variant {
            message: $msg.to_string(),
            ctx: $crate::diagnostics::ErrorContext::with_source_and_span(
                $crate::diagnostics::SourceArc::clone($src),
                $span,
            ),
            source: None,
        }
    };
}
