//! Documentation-comment parsing.
//!
//! Handlers and payload types carry free-text documentation exported by the host. The text
//! may still contain comment markers (`/** ... */`, `*`, `///`), which are stripped before
//! lines are inspected. Lines starting with `@` are tags (`@summary`, `@description`,
//! `@property`, `@response`); all other non-empty lines are free text.

use crate::schema::{Schema, SchemaType};

/// A cleaned documentation comment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocBlock {
    lines: Vec<String>,
}

/// A `@property` tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyTag {
    pub name: String,
    pub type_name: String,
    pub description: Option<String>,
}

/// A `@response <status> <description>` tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseTag {
    pub status: u16,
    pub description: String,
}

impl DocBlock {
    pub fn parse(text: &str) -> Self {
        let lines = text
            .lines()
            .map(clean_line)
            .filter(|line| !line.is_empty())
            .collect();
        Self { lines }
    }

    /// Value of the first `@<name>` tag
    pub fn tag(&self, name: &str) -> Option<String> {
        self.tags(name).into_iter().next()
    }

    /// Values of every `@<name>` tag, in order
    pub fn tags(&self, name: &str) -> Vec<String> {
        let marker = format!("@{}", name);
        self.lines
            .iter()
            .filter_map(|line| {
                let rest = line.strip_prefix(&marker)?;
                // `@summary` must not match `@summaryText`
                if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
                    return None;
                }
                let value = rest.trim();
                (!value.is_empty()).then(|| value.to_string())
            })
            .collect()
    }

    /// First line of free text
    pub fn first_line(&self) -> Option<String> {
        self.lines.iter().find(|line| !line.starts_with('@')).cloned()
    }

    /// Parse every `@property` tag.
    ///
    /// Accepts `@property name: type [description]` as well as the
    /// `@property type $name [description]` form used by PHP-style hosts.
    pub fn property_tags(&self) -> Vec<PropertyTag> {
        self.tags("property")
            .iter()
            .filter_map(|value| parse_property_tag(value))
            .collect()
    }

    /// Parse every `@response` tag with a numeric status
    pub fn response_tags(&self) -> Vec<ResponseTag> {
        self.tags("response")
            .iter()
            .filter_map(|value| {
                let (status, description) = value.split_once(char::is_whitespace)?;
                Some(ResponseTag {
                    status: status.parse().ok()?,
                    description: description.trim().to_string(),
                })
            })
            .collect()
    }
}

impl PropertyTag {
    pub fn to_schema(&self) -> Schema {
        let mut schema = Schema::of(SchemaType::from_declared(&self.type_name));
        if self.type_name.starts_with('?') {
            schema.nullable = true;
        }
        schema.description = self.description.clone();
        schema
    }
}

fn clean_line(line: &str) -> String {
    let mut line = line.trim();
    for marker in ["/**", "*/", "///", "//!", "//", "*"] {
        if let Some(rest) = line.strip_prefix(marker) {
            line = rest.trim_start();
        }
    }
    line.strip_suffix("*/").unwrap_or(line).trim().to_string()
}

fn parse_property_tag(value: &str) -> Option<PropertyTag> {
    let mut words = value.split_whitespace();
    let first = words.next()?;

    // `@property name: type [description]`
    if let Some(name) = first.strip_suffix(':') {
        let type_name = words.next()?;
        return Some(PropertyTag {
            name: name.to_string(),
            type_name: type_name.to_string(),
            description: rest_of(words),
        });
    }

    // `@property type $name [description]`
    let name = words.next()?.strip_prefix('$')?;
    Some(PropertyTag {
        name: name.to_string(),
        type_name: first.to_string(),
        description: rest_of(words),
    })
}

fn rest_of<'a>(words: impl Iterator<Item = &'a str>) -> Option<String> {
    let rest = words.collect::<Vec<_>>().join(" ");
    (!rest.is_empty()).then_some(rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HANDLER_DOC: &str = r#"
        /**
         * Show a single item.
         *
         * Looks the item up by its primary key.
         * @summary Get item by ID
         * @description Retrieve a specific item
         * @response 404 Item not found
         * @response abc not a status
         */
    "#;

    #[test]
    fn test_tags_and_first_line() {
        let doc = DocBlock::parse(HANDLER_DOC);

        assert_eq!(doc.tag("summary"), Some("Get item by ID".to_string()));
        assert_eq!(doc.tag("description"), Some("Retrieve a specific item".to_string()));
        assert_eq!(doc.first_line(), Some("Show a single item.".to_string()));
        assert_eq!(doc.tag("deprecated"), None);
    }

    #[test]
    fn test_tag_requires_word_boundary() {
        let doc = DocBlock::parse("@summaryText nope\n@summary yes");
        assert_eq!(doc.tag("summary"), Some("yes".to_string()));
    }

    #[test]
    fn test_response_tags() {
        let doc = DocBlock::parse(HANDLER_DOC);
        assert_eq!(
            doc.response_tags(),
            vec![ResponseTag {
                status: 404,
                description: "Item not found".to_string()
            }]
        );
    }

    #[test]
    fn test_rust_style_doc_comments() {
        let doc = DocBlock::parse("/// Lists items.\n/// @summary List items");
        assert_eq!(doc.first_line(), Some("Lists items.".to_string()));
        assert_eq!(doc.tag("summary"), Some("List items".to_string()));
    }

    #[test]
    fn test_property_tags_both_forms() {
        let doc = DocBlock::parse(
            "@property id: int The identifier\n@property string $name Display name\n@property ?float $price\n@property broken",
        );
        let tags = doc.property_tags();

        assert_eq!(tags.len(), 3);
        assert_eq!(tags[0].name, "id");
        assert_eq!(tags[0].type_name, "int");
        assert_eq!(tags[0].description.as_deref(), Some("The identifier"));
        assert_eq!(tags[1].name, "name");
        assert_eq!(tags[1].type_name, "string");
        assert_eq!(tags[2].name, "price");
        assert!(tags[2].description.is_none());

        let price = tags[2].to_schema();
        assert!(price.is_type(SchemaType::Number));
        assert!(price.nullable);
    }

    #[test]
    fn test_empty_doc() {
        let doc = DocBlock::parse("");
        assert!(doc.first_line().is_none());
        assert!(doc.property_tags().is_empty());
    }
}
