//! File-level layout of a compiled root type.

use crate::error::{BindError, Result};
use crate::model::{LayoutDef, RecordDef};
use tracing::debug;

/// Resolves a `crlf` setting to the terminator it stands for.
pub fn resolve_crlf(crlf: &str) -> String {
    match crlf {
        "WINDOWS" => "\r\n".to_string(),
        "UNIX" => "\n".to_string(),
        "MAC" => "\r".to_string(),
        other => other.to_string(),
    }
}

/// Layout settings read off the participating type that declares them.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordLayout {
    declared_by: Option<String>,
    crlf: String,
    eol: Option<String>,
    header: Option<String>,
    footer: Option<String>,
    skip_header: bool,
    skip_footer: bool,
    is_header: bool,
    is_footer: bool,
    padding_char: char,
    record_length: usize,
    ignore_trailing_chars: bool,
    ignore_missing_chars: bool,
}

impl Default for RecordLayout {
    fn default() -> Self {
        Self::from_def(None, &LayoutDef::default())
    }
}

impl RecordLayout {
    /// Reads the layout of `types` (root first).
    ///
    /// The root's own layout wins; otherwise at most one linked type may
    /// declare one. Without any declaration the defaults apply.
    pub fn build(types: &[&RecordDef]) -> Result<Self> {
        let declared = match types.first() {
            Some(root) if root.layout.is_some() => Some(*root),
            _ => {
                let mut declaring = types.iter().skip(1).filter(|r| r.layout.is_some());
                let first = declaring.next();
                if let (Some(first), Some(second)) = (first, declaring.next()) {
                    return Err(BindError::AmbiguousLayout {
                        first: first.name.clone(),
                        second: second.name.clone(),
                    });
                }
                first.copied()
            }
        };

        let layout = match declared.and_then(|r| r.layout.as_ref().map(|l| (r, l))) {
            Some((record, def)) => Self::from_def(Some(&record.name), def),
            None => Self::default(),
        };
        layout.validate()?;

        debug!(
            declared_by = ?layout.declared_by,
            record_length = layout.record_length,
            header = ?layout.header,
            footer = ?layout.footer,
            skip_header = layout.skip_header,
            skip_footer = layout.skip_footer,
            padding_char = ?layout.padding_char,
            ignore_trailing_chars = layout.ignore_trailing_chars,
            ignore_missing_chars = layout.ignore_missing_chars,
            "record layout"
        );
        Ok(layout)
    }

    fn from_def(declared_by: Option<&str>, def: &LayoutDef) -> Self {
        let is_self = |other: &Option<String>| match (declared_by, other) {
            (Some(me), Some(other)) => me == other,
            _ => false,
        };
        Self {
            declared_by: declared_by.map(str::to_string),
            crlf: resolve_crlf(&def.crlf),
            eol: Some(def.eol.clone()).filter(|e| !e.is_empty()),
            header: def.header.clone(),
            footer: def.footer.clone(),
            skip_header: def.skip_header,
            skip_footer: def.skip_footer,
            is_header: is_self(&def.header),
            is_footer: is_self(&def.footer),
            padding_char: def.padding_char,
            record_length: def.length,
            ignore_trailing_chars: def.ignore_trailing_chars,
            ignore_missing_chars: def.ignore_missing_chars,
        }
    }

    fn validate(&self) -> Result<()> {
        let invalid = |reason: &'static str| BindError::InvalidLayout {
            record: self.declared_by.clone().unwrap_or_default(),
            reason,
        };
        if self.has_header() && self.is_header {
            return Err(invalid(
                "record can not be configured with both 'isHeader=true' and 'hasHeader=true'",
            ));
        }
        if self.has_footer() && self.is_footer {
            return Err(invalid(
                "record can not be configured with both 'isFooter=true' and 'hasFooter=true'",
            ));
        }
        // Shadowed by the checks above: is_header implies has_header.
        if (self.is_header || self.is_footer) && (self.skip_header || self.skip_footer) {
            return Err(invalid(
                "skipHeader and/or skipFooter can not be configured on a record where 'isHeader=true' or 'isFooter=true'",
            ));
        }
        Ok(())
    }

    /// Record type the layout was read from, if any declared one.
    pub fn declared_by(&self) -> Option<&str> {
        self.declared_by.as_deref()
    }

    /// Record terminator used when writing.
    pub fn crlf(&self) -> &str {
        &self.crlf
    }

    /// Literal line separator used when reading.
    pub fn eol(&self) -> Option<&str> {
        self.eol.as_deref()
    }

    pub fn header(&self) -> Option<&str> {
        self.header.as_deref()
    }

    pub fn footer(&self) -> Option<&str> {
        self.footer.as_deref()
    }

    pub fn has_header(&self) -> bool {
        self.header.is_some()
    }

    pub fn has_footer(&self) -> bool {
        self.footer.is_some()
    }

    pub fn skip_header(&self) -> bool {
        self.skip_header
    }

    pub fn skip_footer(&self) -> bool {
        self.skip_footer
    }

    pub fn is_header(&self) -> bool {
        self.is_header
    }

    pub fn is_footer(&self) -> bool {
        self.is_footer
    }

    pub fn padding_char(&self) -> char {
        self.padding_char
    }

    /// Expected record length; 0 when unchecked.
    pub fn record_length(&self) -> usize {
        self.record_length
    }

    pub fn ignore_trailing_chars(&self) -> bool {
        self.ignore_trailing_chars
    }

    pub fn ignore_missing_chars(&self) -> bool {
        self.ignore_missing_chars
    }
}
