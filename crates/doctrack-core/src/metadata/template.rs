use crate::errors::{DocTrackError, Result};

/// Placeholder name that resolves to the target entity's id
pub const ID_PLACEHOLDER: &str = "id";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Placeholder(String),
}

/// Parsed path template such as `tenants/{tenant_id}/categories/{id}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    raw: String,
    parts: Vec<Part>,
}

impl PathTemplate {
    /// # Errors
    ///
    /// `InvalidPathTemplate` on unbalanced or nested braces and on empty placeholders.
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = |reason: &str| DocTrackError::InvalidPathTemplate {
            template: raw.to_string(),
            reason: reason.to_string(),
        };

        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut chars = raw.chars();
        while let Some(c) = chars.next() {
            match c {
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for n in chars.by_ref() {
                        match n {
                            '}' => {
                                closed = true;
                                break;
                            }
                            '{' => return Err(invalid("nested '{'")),
                            other => name.push(other),
                        }
                    }
                    if !closed {
                        return Err(invalid("unterminated placeholder"));
                    }
                    let name = name.trim();
                    if name.is_empty() {
                        return Err(invalid("empty placeholder"));
                    }
                    if !literal.is_empty() {
                        parts.push(Part::Literal(std::mem::take(&mut literal)));
                    }
                    parts.push(Part::Placeholder(name.to_string()));
                }
                '}' => return Err(invalid("unmatched '}'")),
                other => literal.push(other),
            }
        }
        if !literal.is_empty() {
            parts.push(Part::Literal(literal));
        }
        if parts.is_empty() {
            return Err(invalid("template is empty"));
        }
        Ok(Self {
            raw: raw.to_string(),
            parts,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().filter_map(|p| match p {
            Part::Placeholder(name) => Some(name.as_str()),
            Part::Literal(_) => None,
        })
    }

    pub fn has_placeholders(&self) -> bool {
        self.placeholders().next().is_some()
    }

    pub fn has_placeholder(&self, name: &str) -> bool {
        self.placeholders().any(|p| p == name)
    }

    /// Copy with `/{id}` appended
    pub fn with_id_suffix(&self) -> Self {
        let raw = format!("{}/{{{}}}", self.raw.trim_end_matches('/'), ID_PLACEHOLDER);
        let mut parts = self.parts.clone();
        match parts.last_mut() {
            Some(Part::Literal(text)) => {
                let trimmed = text.trim_end_matches('/').to_string();
                *text = format!("{}/", trimmed);
            }
            _ => parts.push(Part::Literal("/".to_string())),
        }
        parts.push(Part::Placeholder(ID_PLACEHOLDER.to_string()));
        Self { raw, parts }
    }

    /// Substitute every placeholder through `lookup`
    ///
    /// Returns the name of the first placeholder `lookup` cannot resolve.
    pub fn render<F>(&self, mut lookup: F) -> std::result::Result<String, String>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                Part::Literal(text) => out.push_str(text),
                Part::Placeholder(name) => match lookup(name) {
                    Some(value) => out.push_str(&value),
                    None => return Err(name.clone()),
                },
            }
        }
        Ok(out)
    }
}

impl std::fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_render() {
        let template = PathTemplate::parse("tenants/{tenant_id}/categories/{id}").unwrap();
        let names: Vec<_> = template.placeholders().collect();
        assert_eq!(names, vec!["tenant_id", "id"]);

        let rendered = template
            .render(|name| match name {
                "tenant_id" => Some("t1".to_string()),
                "id" => Some("c9".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(rendered, "tenants/t1/categories/c9");
    }

    #[test]
    fn test_render_reports_missing_placeholder() {
        let template = PathTemplate::parse("tenants/{tenant_id}/categories/{id}").unwrap();
        let missing = template.render(|_| None).unwrap_err();
        assert_eq!(missing, "tenant_id");
    }

    #[test]
    fn test_id_suffix() {
        let template = PathTemplate::parse("catalog/").unwrap().with_id_suffix();
        assert_eq!(template.as_str(), "catalog/{id}");
        assert!(template.has_placeholder("id"));
        assert_eq!(
            template.render(|_| Some("p1".to_string())).unwrap(),
            "catalog/p1"
        );
    }

    #[test]
    fn test_malformed_templates() {
        for raw in ["a/{b", "a/}b", "a/{}", "a/{{b}}", ""] {
            assert!(
                matches!(
                    PathTemplate::parse(raw),
                    Err(DocTrackError::InvalidPathTemplate { .. })
                ),
                "{} should be rejected",
                raw
            );
        }
    }
}
