// Copyright 2025 strata Project Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::{
    backtrace::Backtrace,
    fmt::{Debug, Display},
    sync::Arc,
};

/// ErrorKind is all kinds of Error of strata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Key or field absent.
    ///
    /// Also returned by `xx`-style conditional writes when the key is not cached, in which case the caller has
    /// nothing more to do.
    NotFound,
    /// Returned by `nx`-style conditional writes when the key is already cached.
    ///
    /// Not a real error. The entry that is already cached wins.
    AlreadyExists,
    /// Pool misconfiguration or a shard that failed to open.
    Corruption,
    /// Invalid argument, e.g. an unparsable score bound or an unknown type tag.
    InvalidArgument,
    /// Operation against a key holding the wrong kind of value.
    WrongType,
    /// The shard is over its memory limit and the eviction policy cannot make room.
    OutOfMemory,
    /// The shard pool is not initialized.
    NotReady,
    /// External error, e.g. raised by the backing store.
    External,
}

impl ErrorKind {
    /// Convert self into static str.
    pub fn into_static(self) -> &'static str {
        self.into()
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.into_static())
    }
}

impl From<ErrorKind> for &'static str {
    fn from(v: ErrorKind) -> &'static str {
        match v {
            ErrorKind::NotFound => "Not found",
            ErrorKind::AlreadyExists => "Already exists",
            ErrorKind::Corruption => "Corruption",
            ErrorKind::InvalidArgument => "Invalid argument",
            ErrorKind::WrongType => "Wrong type",
            ErrorKind::OutOfMemory => "Out of memory",
            ErrorKind::NotReady => "Not ready",
            ErrorKind::External => "External error",
        }
    }
}

/// Error is the error struct returned by all strata functions.
///
/// ## Display
///
/// - Via `Display`, the error is printed in a single line:
///
/// ```shell
/// Not found, context: { key: user:1 } => key not exist
/// ```
///
/// - Via `Debug`, the error is printed in multi lines with context, source and backtrace (if captured).
///
/// - Via `{:#?}`, the conventional struct-style Debug representation is used.
pub struct Error {
    kind: ErrorKind,
    message: String,

    context: Vec<(&'static str, String)>,

    source: Option<Arc<anyhow::Error>>,
    backtrace: Option<Arc<Backtrace>>,
}

impl Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // If alternate has been specified, we will print like Debug.
        if f.alternate() {
            let mut de = f.debug_struct("Error");
            de.field("kind", &self.kind);
            de.field("message", &self.message);
            de.field("context", &self.context);
            de.field("source", &self.source);
            de.field("backtrace", &self.backtrace);
            return de.finish();
        }

        write!(f, "{}", self.kind)?;
        if !self.message.is_empty() {
            write!(f, " => {}", self.message)?;
        }
        writeln!(f)?;

        if !self.context.is_empty() {
            writeln!(f)?;
            writeln!(f, "Context:")?;
            for (k, v) in self.context.iter() {
                writeln!(f, "  {}: {}", k, v)?;
            }
        }

        if let Some(source) = &self.source {
            writeln!(f)?;
            writeln!(f, "Source:")?;
            writeln!(f, "  {source:#}")?;
        }

        if let Some(backtrace) = &self.backtrace {
            writeln!(f)?;
            writeln!(f, "Backtrace:")?;
            writeln!(f, "{backtrace}")?;
        }

        Ok(())
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)?;

        if !self.context.is_empty() {
            write!(f, ", context: {{ ")?;
            let mut iter = self.context.iter().peekable();
            while let Some((k, v)) = iter.next() {
                write!(f, "{}: {}", k, v)?;
                if iter.peek().is_some() {
                    write!(f, ", ")?;
                }
            }
            write!(f, " }}")?;
        }

        if !self.message.is_empty() {
            write!(f, " => {}", self.message)?;
        }

        if let Some(source) = &self.source {
            write!(f, ", source: {source}")?;
        }

        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|v| v.as_ref().as_ref())
    }
}

impl Clone for Error {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            context: self.context.clone(),
            source: self.source.clone(),
            backtrace: self.backtrace.clone(),
        }
    }
}

impl Error {
    /// Create a new error.
    ///
    /// Backtraces are only captured for kinds that indicate a real fault. `NotFound` and `AlreadyExists` are
    /// returned on hot paths as ordinary outcomes.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let backtrace = match kind {
            ErrorKind::NotFound | ErrorKind::AlreadyExists => None,
            _ => Some(Arc::new(Backtrace::capture())),
        };
        Self {
            kind,
            message: message.into(),
            context: Vec::new(),
            source: None,
            backtrace,
        }
    }

    /// Add more context in error.
    pub fn with_context(mut self, key: &'static str, value: impl ToString) -> Self {
        self.context.push((key, value.to_string()));
        self
    }

    /// Set source for error.
    ///
    /// # Notes
    ///
    /// If the source has been set, we will raise a panic here.
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        debug_assert!(self.source.is_none(), "the source error has been set");
        self.source = Some(Arc::new(source.into()));
        self
    }

    /// Get the error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Get the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the error context.
    pub fn context(&self) -> &Vec<(&'static str, String)> {
        &self.context
    }

    /// Get the error backtrace.
    pub fn backtrace(&self) -> Option<&Backtrace> {
        self.backtrace.as_deref()
    }

    /// Get the error source.
    pub fn source(&self) -> Option<&anyhow::Error> {
        self.source.as_deref()
    }

    /// Downcast the reference of the source error to a specific error type reference.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source.as_deref().and_then(|e| e.downcast_ref::<E>())
    }

    /// Returns true if the error is [`ErrorKind::NotFound`].
    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }

    /// Returns true if the error is [`ErrorKind::AlreadyExists`].
    pub fn is_already_exists(&self) -> bool {
        self.kind == ErrorKind::AlreadyExists
    }
}

/// Result type for strata.
pub type Result<T> = std::result::Result<T, Error>;

/// Helper methods for Error.
impl Error {
    /// Helper for creating a [`ErrorKind::NotFound`] error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Error::new(ErrorKind::NotFound, message)
    }

    /// Helper for creating a [`ErrorKind::AlreadyExists`] error.
    pub fn already_exists(message: impl Into<String>) -> Self {
        Error::new(ErrorKind::AlreadyExists, message)
    }

    /// Helper for creating a [`ErrorKind::Corruption`] error.
    pub fn corruption(message: impl Into<String>) -> Self {
        Error::new(ErrorKind::Corruption, message)
    }

    /// Helper for creating a [`ErrorKind::InvalidArgument`] error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Error::new(ErrorKind::InvalidArgument, message)
    }

    /// Helper for creating a [`ErrorKind::WrongType`] error.
    pub fn wrong_type() -> Self {
        Error::new(
            ErrorKind::WrongType,
            "operation against a key holding the wrong kind of value",
        )
    }

    /// Helper for creating an error for a value that is not an integer or out of range.
    pub fn not_integer() -> Self {
        Error::invalid_argument("value is not an integer or out of range")
    }

    /// Helper for creating an error for a value that is not a valid float.
    pub fn not_float() -> Self {
        Error::invalid_argument("value is not a valid float")
    }

    /// Helper for creating an error for an index that is out of range.
    pub fn out_of_range() -> Self {
        Error::invalid_argument("index out of range")
    }

    /// Helper for creating a [`ErrorKind::OutOfMemory`] error with context.
    pub fn out_of_memory(maxmemory: u64, used: u64) -> Self {
        Error::new(ErrorKind::OutOfMemory, "command not allowed when used memory > maxmemory")
            .with_context("maxmemory", maxmemory)
            .with_context("used", used)
    }

    /// Helper for creating a [`ErrorKind::NotReady`] error.
    pub fn not_ready() -> Self {
        Error::new(ErrorKind::NotReady, "cache is not initialized")
    }
}
