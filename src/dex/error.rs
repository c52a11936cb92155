use std::fmt;

macro_rules! err {
    ($kind:ident, $msg:literal) => {
        $crate::dex::error::DexError::new($crate::dex::error::DexErrorKind::$kind, $msg)
    };
    ($kind:ident, $fmtstr:literal, $($args:tt)*) => {
        $crate::dex::error::DexError::new($crate::dex::error::DexErrorKind::$kind, &format!($fmtstr, $($args)*))
    };
}

macro_rules! fail {
    ($kind:ident, $msg:literal) => {
        return Err(err!($kind, $msg))
    };
    ($kind:ident, $fmtstr:literal, $($args:tt)*) => {
        return Err(err!($kind, $fmtstr, $($args)*))
    };
}

/// Discriminates what went wrong while reading a dex file.
///
/// The first three kinds are fatal to opening a file. The remaining ones are
/// local to the accessor that reported them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DexErrorKind
{
    MalformedHeader,
    TruncatedFile,
    ChecksumMismatch,
    IndexOutOfRange,
    MalformedString,
    MalformedTypeList,
    MalformedClassData,
    MalformedCodeItem,
    /// `advance()` was called on a class data iterator with nothing left.
    IteratorExhausted,
}

impl fmt::Display for DexErrorKind
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let name = match self
        {
            DexErrorKind::MalformedHeader => "malformed header",
            DexErrorKind::TruncatedFile => "truncated file",
            DexErrorKind::ChecksumMismatch => "checksum mismatch",
            DexErrorKind::IndexOutOfRange => "index out of range",
            DexErrorKind::MalformedString => "malformed string",
            DexErrorKind::MalformedTypeList => "malformed type list",
            DexErrorKind::MalformedClassData => "malformed class data",
            DexErrorKind::MalformedCodeItem => "malformed code item",
            DexErrorKind::IteratorExhausted => "iterator exhausted",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DexError
{
    kind: DexErrorKind,
    msg: String,
    contexts: Vec<String>,
}

impl DexError
{
    pub(crate) fn new(kind: DexErrorKind, msg: &str) -> Self
    {
        DexError {
            kind,
            msg: msg.to_string(),
            contexts: Vec::new(),
        }
    }

    pub(crate) fn with_context(base: DexError, context: String) -> Self
    {
        let mut contexts = base.contexts;
        contexts.push(context);
        DexError { kind: base.kind, msg: base.msg, contexts }
    }

    /// Re-labels a low level failure (usually a short read) with the kind of
    /// the entity that was being decoded when it happened.
    pub(crate) fn reclassify(self, kind: DexErrorKind, context: String) -> Self
    {
        let mut e = DexError::with_context(self, context);
        e.kind = kind;
        e
    }

    pub fn kind(&self) -> DexErrorKind
    {
        self.kind
    }

    pub fn message(&self) -> &str
    {
        &self.msg
    }

    pub fn contexts(&self) -> &[String]
    {
        &self.contexts
    }
}

impl fmt::Display for DexError
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}: {}", self.kind, self.msg)?;
        let mut connector = " for ";
        for context in &self.contexts
        {
            write!(f, "{}{}", connector, context)?;
            connector = " of ";
        }
        Ok(())
    }
}

impl std::error::Error for DexError {}
