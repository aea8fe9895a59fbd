//! Path strings addressing values inside a payload tree.
//!
//! A path is a sequence of segments. `[key]` addresses a sequence child and
//! `name` (first segment) or `.name` (later segments) addresses a record field:
//!
//! ```text
//! foo[0].bar      -> Property(foo), ArrayIndex(0), Property(bar)
//! [foo][0].bar    -> ArrayIndex(foo), ArrayIndex(0), Property(bar)
//! ```
//!
//! The two forms are never interchangeable: a sequence child can only be
//! reached with brackets and a record field only with the dotted form.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// One step of a [`Path`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// `[key]`: child of a sequence.
    ArrayIndex(String),
    /// `name` / `.name`: field of a record.
    Property(String),
}

impl Segment {
    pub fn key(&self) -> &str {
        match self {
            Segment::ArrayIndex(key) | Segment::Property(key) => key,
        }
    }
}

/// Reasons a path string cannot be parsed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PathSyntaxError {
    #[error("path is empty")]
    Empty,
    #[error("unexpected '{character}' at offset {offset}")]
    UnexpectedCharacter { offset: usize, character: char },
    #[error("unclosed '[' at offset {offset}")]
    UnclosedBracket { offset: usize },
    #[error("empty segment at offset {offset}")]
    EmptySegment { offset: usize },
}

/// Parsed address into a tree. The empty path designates the root itself and
/// only arises programmatically; [`Path::parse`] rejects empty text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Path {
    segments: Vec<Segment>,
}

impl Path {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    pub fn parse(input: &str) -> Result<Self, PathSyntaxError> {
        if input.is_empty() {
            return Err(PathSyntaxError::Empty);
        }

        let mut segments = Vec::new();
        let mut chars = input.char_indices().peekable();

        while let Some(&(offset, character)) = chars.peek() {
            match character {
                '[' => {
                    chars.next();
                    let mut key = String::new();
                    let mut closed = false;
                    for (_, next) in chars.by_ref() {
                        if next == ']' {
                            closed = true;
                            break;
                        }
                        key.push(next);
                    }
                    if !closed {
                        return Err(PathSyntaxError::UnclosedBracket { offset });
                    }
                    if key.is_empty() {
                        return Err(PathSyntaxError::EmptySegment { offset });
                    }
                    segments.push(Segment::ArrayIndex(key));
                }
                '.' if segments.is_empty() => {
                    return Err(PathSyntaxError::UnexpectedCharacter { offset, character });
                }
                ']' => return Err(PathSyntaxError::UnexpectedCharacter { offset, character }),
                _ => {
                    // A bare name is only legal as the first segment.
                    if character == '.' {
                        chars.next();
                    } else if !segments.is_empty() {
                        return Err(PathSyntaxError::UnexpectedCharacter { offset, character });
                    }
                    let start = chars.peek().map(|(index, _)| *index).unwrap_or(input.len());
                    let mut name = String::new();
                    while let Some(&(_, next)) = chars.peek() {
                        if next == '.' || next == '[' {
                            break;
                        }
                        if next == ']' {
                            let (bad_offset, _) = chars.next().unwrap_or((start, next));
                            return Err(PathSyntaxError::UnexpectedCharacter {
                                offset: bad_offset,
                                character: next,
                            });
                        }
                        name.push(next);
                        chars.next();
                    }
                    if name.is_empty() {
                        return Err(PathSyntaxError::EmptySegment { offset: start });
                    }
                    segments.push(Segment::Property(name));
                }
            }
        }

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// New path with `segment` appended.
    pub fn child(&self, segment: Segment) -> Self {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.extend(self.segments.iter().cloned());
        segments.push(segment);
        Self { segments }
    }
}

impl FromStr for Path {
    type Err = PathSyntaxError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Path::parse(input)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::ArrayIndex(key) => write!(f, "[{key}]")?,
                Segment::Property(name) if index == 0 => f.write_str(name)?,
                Segment::Property(name) => write!(f, ".{name}")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn property(name: &str) -> Segment {
        Segment::Property(name.to_string())
    }

    fn index(key: &str) -> Segment {
        Segment::ArrayIndex(key.to_string())
    }

    #[test]
    fn parses_mixed_segments() {
        let path = Path::parse("foo[0].bar").unwrap();
        assert_eq!(path.segments(), &[property("foo"), index("0"), property("bar")]);

        let path = Path::parse("[foo][0].baz").unwrap();
        assert_eq!(path.segments(), &[index("foo"), index("0"), property("baz")]);
    }

    #[test]
    fn display_matches_parsed_text() {
        for text in ["foo", "[foo]", "foo[0].bar", "[foo][0].bar", "a.b.c", "[a b][c]"] {
            assert_eq!(Path::parse(text).unwrap().to_string(), text);
        }
    }

    #[test]
    fn child_appends_with_context_sensitive_separator() {
        let path = Path::root().child(property("foo")).child(index("0")).child(property("bar"));
        assert_eq!(path.to_string(), "foo[0].bar");
    }

    #[test]
    fn rejects_malformed_paths() {
        assert_eq!(Path::parse(""), Err(PathSyntaxError::Empty));
        assert!(matches!(Path::parse(".foo"), Err(PathSyntaxError::UnexpectedCharacter { .. })));
        assert!(matches!(Path::parse("foo..bar"), Err(PathSyntaxError::EmptySegment { .. })));
        assert!(matches!(Path::parse("foo."), Err(PathSyntaxError::EmptySegment { .. })));
        assert!(matches!(Path::parse("foo[0"), Err(PathSyntaxError::UnclosedBracket { .. })));
        assert!(matches!(Path::parse("foo[]"), Err(PathSyntaxError::EmptySegment { .. })));
        assert!(matches!(Path::parse("[0]bar"), Err(PathSyntaxError::UnexpectedCharacter { .. })));
        assert!(matches!(Path::parse("foo]"), Err(PathSyntaxError::UnexpectedCharacter { .. })));
    }
}
