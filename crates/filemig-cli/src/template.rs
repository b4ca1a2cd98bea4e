//! `{field}` path templates and the path policy built from them.
//!
//! A template is literal text with `{name}` placeholders filled from the
//! manifest item's fields. `{{` and `}}` produce literal braces.

use filemig_config::PathTemplates;
use filemig_core::{BoxError, PathPolicy};
use thiserror::Error;

use crate::manifest::ManifestItem;

/// Errors raised while parsing or rendering a template.
#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum TemplateError {
    #[error("unterminated placeholder starting at offset {offset}")]
    Unterminated { offset: usize },
    #[error("unmatched '}}' at offset {offset}")]
    UnmatchedClose { offset: usize },
    #[error("empty placeholder at offset {offset}")]
    EmptyPlaceholder { offset: usize },
    #[error("item has no field named `{name}`")]
    MissingField { name: String },
    #[error("rendered path is empty")]
    EmptyPath,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(String),
}

/// Parsed path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PathTemplate {
    segments: Vec<Segment>,
}

impl PathTemplate {
    pub(crate) fn parse(template: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = template.char_indices().peekable();

        while let Some((offset, ch)) = chars.next() {
            match ch {
                '{' if chars.peek().is_some_and(|(_, next)| *next == '{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek().is_some_and(|(_, next)| *next == '}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for (_, inner) in chars.by_ref() {
                        if inner == '}' {
                            closed = true;
                            break;
                        }
                        name.push(inner);
                    }
                    if !closed {
                        return Err(TemplateError::Unterminated { offset });
                    }
                    let name = name.trim();
                    if name.is_empty() {
                        return Err(TemplateError::EmptyPlaceholder { offset });
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Field(name.to_string()));
                }
                '}' => return Err(TemplateError::UnmatchedClose { offset }),
                other => literal.push(other),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(Self { segments })
    }

    /// Placeholder names in order of appearance.
    pub(crate) fn fields(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Field(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    pub(crate) fn render(&self, item: &ManifestItem) -> Result<String, TemplateError> {
        let mut rendered = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => rendered.push_str(text),
                Segment::Field(name) => {
                    let value = item
                        .field(name)
                        .ok_or_else(|| TemplateError::MissingField { name: name.clone() })?;
                    rendered.push_str(value);
                }
            }
        }
        if rendered.is_empty() {
            return Err(TemplateError::EmptyPath);
        }
        Ok(rendered)
    }
}

/// Path policy rendering one template per side.
#[derive(Debug, Clone)]
pub(crate) struct TemplatePolicy {
    source: PathTemplate,
    destination: PathTemplate,
}

impl TemplatePolicy {
    pub(crate) fn from_config(templates: &PathTemplates) -> Result<Self, TemplateError> {
        Ok(Self {
            source: PathTemplate::parse(&templates.source)?,
            destination: PathTemplate::parse(&templates.destination)?,
        })
    }

    pub(crate) fn fields(&self) -> impl Iterator<Item = &str> {
        self.source.fields().chain(self.destination.fields())
    }
}

impl PathPolicy<ManifestItem> for TemplatePolicy {
    fn source_path(&self, item: &ManifestItem) -> Result<String, BoxError> {
        Ok(self.source.render(item)?)
    }

    fn destination_path(&self, item: &ManifestItem) -> Result<String, BoxError> {
        Ok(self.destination.render(item)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(pairs: &[(&str, &str)]) -> ManifestItem {
        ManifestItem::from_fields(
            1,
            pairs
                .iter()
                .map(|(key, value)| ((*key).to_string(), (*value).to_string())),
        )
    }

    #[test]
    fn renders_fields_and_escaped_braces() -> Result<(), TemplateError> {
        let template = PathTemplate::parse("attachments/{id}/{{raw}}/{ file_name }")?;
        assert_eq!(template.fields().collect::<Vec<_>>(), vec!["id", "file_name"]);
        let rendered = template.render(&item(&[("id", "42"), ("file_name", "cat.png")]))?;
        assert_eq!(rendered, "attachments/42/{raw}/cat.png");
        Ok(())
    }

    #[test]
    fn parse_errors_carry_offsets() {
        assert_eq!(
            PathTemplate::parse("a/{id"),
            Err(TemplateError::Unterminated { offset: 2 })
        );
        assert_eq!(
            PathTemplate::parse("a}"),
            Err(TemplateError::UnmatchedClose { offset: 1 })
        );
        assert_eq!(
            PathTemplate::parse("{ }"),
            Err(TemplateError::EmptyPlaceholder { offset: 0 })
        );
    }

    #[test]
    fn missing_fields_and_empty_results_are_rejected() -> Result<(), TemplateError> {
        let template = PathTemplate::parse("{missing}")?;
        assert_eq!(
            template.render(&item(&[])),
            Err(TemplateError::MissingField {
                name: "missing".to_string()
            })
        );
        let template = PathTemplate::parse("{blank}")?;
        assert_eq!(
            template.render(&item(&[("blank", "")])),
            Err(TemplateError::EmptyPath)
        );
        Ok(())
    }

    #[test]
    fn policy_renders_each_side() -> Result<(), BoxError> {
        let policy = TemplatePolicy::from_config(&PathTemplates {
            source: "{file_name}".to_string(),
            destination: "attachments/{id}/{file_name}".to_string(),
        })?;
        let entry = item(&[("id", "7"), ("file_name", "a.txt")]);
        assert_eq!(policy.source_path(&entry)?, "a.txt");
        assert_eq!(policy.destination_path(&entry)?, "attachments/7/a.txt");
        assert_eq!(
            policy.fields().collect::<Vec<_>>(),
            vec!["file_name", "id", "file_name"]
        );
        Ok(())
    }
}
