//! Message matching
//!
//! Filters and outputs declare which messages they want with a
//! `message_matcher` spec. The full matching language lives with the
//! router's matching engine; the pipeline core only needs to compile a spec
//! and evaluate it against message metadata. Supported forms:
//!
//! - `TRUE` (or an all-whitespace spec): match everything
//! - `FALSE`: match nothing
//! - `<field> == '<value>'` / `<field> != '<value>'` where field is one of
//!   `Type`, `Logger`, `Hostname`, `Payload`

use rill_protocol::Message;

use crate::error::PipelineError;

/// A compiled matcher spec
#[derive(Debug, Clone)]
pub struct MessageMatcher {
    spec: String,
    kind: MatchKind,
}

#[derive(Debug, Clone)]
enum MatchKind {
    Everything,
    Nothing,
    Compare {
        field: MatchField,
        value: String,
        negated: bool,
    },
}

#[derive(Debug, Clone, Copy)]
enum MatchField {
    Type,
    Logger,
    Hostname,
    Payload,
}

impl MatchField {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "Type" => Some(Self::Type),
            "Logger" => Some(Self::Logger),
            "Hostname" => Some(Self::Hostname),
            "Payload" => Some(Self::Payload),
            _ => None,
        }
    }

    fn extract<'a>(&self, message: &'a Message) -> &'a str {
        match self {
            Self::Type => &message.msg_type,
            Self::Logger => &message.logger,
            Self::Hostname => &message.hostname,
            Self::Payload => &message.payload,
        }
    }
}

impl MessageMatcher {
    /// Compile a matcher spec
    pub fn parse(spec: &str) -> Result<Self, PipelineError> {
        let trimmed = spec.trim();
        let kind = if trimmed.is_empty() || trimmed == "TRUE" {
            MatchKind::Everything
        } else if trimmed == "FALSE" {
            MatchKind::Nothing
        } else {
            Self::parse_comparison(trimmed).ok_or_else(|| PipelineError::InvalidMatcher {
                spec: spec.to_string(),
            })?
        };
        Ok(Self {
            spec: spec.to_string(),
            kind,
        })
    }

    fn parse_comparison(spec: &str) -> Option<MatchKind> {
        let (lhs, rhs, negated) = if let Some((l, r)) = spec.split_once("==") {
            (l, r, false)
        } else if let Some((l, r)) = spec.split_once("!=") {
            (l, r, true)
        } else {
            return None;
        };

        let field = MatchField::parse(lhs.trim())?;
        let value = rhs
            .trim()
            .strip_prefix('\'')
            .and_then(|v| v.strip_suffix('\''))?;

        Some(MatchKind::Compare {
            field,
            value: value.to_string(),
            negated,
        })
    }

    /// The original spec text
    #[inline]
    pub fn spec(&self) -> &str {
        &self.spec
    }

    /// Evaluate the matcher against a message
    pub fn matches(&self, message: &Message) -> bool {
        match &self.kind {
            MatchKind::Everything => true,
            MatchKind::Nothing => false,
            MatchKind::Compare {
                field,
                value,
                negated,
            } => (field.extract(message) == value) != *negated,
        }
    }
}
