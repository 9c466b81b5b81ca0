//! `{{tag}}` expansion for edit-operation arguments.
//!
//! Tags resolve against the open sidecar (any key holding a non-empty
//! string) and then against a fixed set of FileData tags, see
//! [`FileData::template_tag`](crate::model::FileData::template_tag).
//! Expansion repeats until no tag is left, bounded by [`MAX_DEPTH`] passes.

use crate::error::TemplateError;
use crate::model::FileData;
use crate::sidecar::Sidecar;

pub const MAX_DEPTH: usize = 8;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Something that can resolve a template tag to a value.
pub trait TemplateSource {
    fn resolve(&self, tag: &str) -> Option<String>;
}

impl<F> TemplateSource for F
where
    F: Fn(&str) -> Option<String>,
{
    fn resolve(&self, tag: &str) -> Option<String> {
        self(tag)
    }
}

/// Sidecar values first, then FileData tags.
pub struct SidecarTemplateSource<'a> {
    pub sidecar: &'a Sidecar,
    pub file: &'a FileData,
}

impl TemplateSource for SidecarTemplateSource<'_> {
    fn resolve(&self, tag: &str) -> Option<String> {
        self.sidecar
            .get_str(tag)
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.file.template_tag(tag).map(str::to_string))
    }
}

/// True when `input` contains at least one opening delimiter.
pub fn has_template(input: &str) -> bool {
    input.contains(OPEN)
}

/// Expands every `{{tag}}` in `input` until a fixed point is reached.
pub fn expand(input: &str, source: &dyn TemplateSource) -> Result<String, TemplateError> {
    let mut current = input.to_string();
    for _ in 0..MAX_DEPTH {
        if current.matches(OPEN).count() != current.matches(CLOSE).count() {
            return Err(TemplateError::Unbalanced(current));
        }
        if !has_template(&current) {
            return Ok(current);
        }
        current = expand_once(&current, source)?;
    }
    if has_template(&current) {
        Err(TemplateError::TooDeep(input.to_string(), MAX_DEPTH))
    } else {
        Ok(current)
    }
}

fn expand_once(input: &str, source: &dyn TemplateSource) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find(OPEN) {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + OPEN.len()..];
        let end = after_open
            .find(CLOSE)
            .ok_or_else(|| TemplateError::Unbalanced(input.to_string()))?;
        let tag = after_open[..end].trim();
        if tag.is_empty() || tag.contains(OPEN) {
            return Err(TemplateError::Unbalanced(input.to_string()));
        }
        let value = source
            .resolve(tag)
            .ok_or_else(|| TemplateError::Unresolved(tag.to_string()))?;
        out.push_str(&value);
        rest = &after_open[end + CLOSE.len()..];
    }
    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn source(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |tag: &str| map.get(tag).cloned()
    }

    #[test]
    fn plain_strings_pass_through() {
        assert_eq!(expand("no tags", &source(&[])).unwrap(), "no tags");
    }

    #[test]
    fn resolves_tags_and_trims_names() {
        let src = source(&[("year", "2023"), ("title", "Hello")]);
        assert_eq!(expand("{{ title }} ({{year}})", &src).unwrap(), "Hello (2023)");
    }

    #[test]
    fn expansion_is_recursive() {
        let src = source(&[("a", "{{b}}!"), ("b", "deep")]);
        assert_eq!(expand("{{a}}", &src).unwrap(), "deep!");
    }

    #[test]
    fn unresolved_tag_is_an_error() {
        let err = expand("{{missing}}", &source(&[])).unwrap_err();
        assert_eq!(err, TemplateError::Unresolved("missing".to_string()));
    }

    #[test]
    fn unbalanced_delimiters_are_an_error() {
        assert!(matches!(
            expand("{{year", &source(&[("year", "2023")])),
            Err(TemplateError::Unbalanced(_))
        ));
        assert!(matches!(
            expand("year}}", &source(&[])),
            Err(TemplateError::Unbalanced(_))
        ));
    }

    #[test]
    fn self_reference_hits_the_depth_cap() {
        let src = source(&[("loop", "{{loop}}")]);
        assert!(matches!(expand("{{loop}}", &src), Err(TemplateError::TooDeep(_, 8))));
    }
}
