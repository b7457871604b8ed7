//! Validation-rule schema compiler.
//!
//! Turns the per-field rule lists of a rule-based validator (`"required|string|max:255"`,
//! `["nullable", "in:a,b"]`, rule objects such as `{rule: enum, values: [...]}`) into a
//! JSON-Schema object describing the request payload.
//!
//! Tokens are folded left to right into one accumulator schema. Bounds (`min`, `max`,
//! `between`) are interpreted under the type the accumulator has *at that point*, so
//! `["min:3", "integer"]` yields `minLength: 3` on an integer schema.

use crate::schema::{Schema, SchemaType};
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Suffix marking a field as "each element of the parent array"
const ELEMENT_SUFFIX: &str = ".*";

/// Rules for every field of a validator, in declaration order
pub type RuleSet = IndexMap<String, RuleList>;

/// The rules of one field, either as a list or as a single pipe-separated string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleList {
    Piped(String),
    Tokens(Vec<RuleToken>),
}

/// One atomic rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleToken {
    Text(String),
    Object(RuleObject),
}

/// Opaque rule objects that need dedicated handling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum RuleObject {
    /// Value must be one of an enumeration's backing values
    Enum { values: Vec<Value> },
    /// Value must be one of a literal list
    In { values: Vec<Value> },
    /// Uploaded file constraint
    File {
        #[serde(default)]
        types: Vec<String>,
    },
    /// Uploaded image dimension constraint
    Dimensions {
        #[serde(default)]
        min_width: Option<u32>,
        #[serde(default)]
        max_width: Option<u32>,
    },
    #[serde(other)]
    Unknown,
}

/// A text token split into its rule name and raw argument string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Directive<'a> {
    name: &'a str,
    raw_args: Option<&'a str>,
}

impl<'a> Directive<'a> {
    fn parse(token: &'a str) -> Self {
        let token = token.trim();
        match token.split_once(':') {
            Some((name, args)) => Directive {
                name,
                raw_args: Some(args),
            },
            None => Directive {
                name: token,
                raw_args: None,
            },
        }
    }

    fn args(&self) -> Vec<&'a str> {
        self.raw_args
            .map(|raw| raw.split(',').map(str::trim).collect())
            .unwrap_or_default()
    }

    /// Numeric argument at `index`, truncated toward zero
    fn numeric_arg(&self, index: usize) -> Option<i64> {
        let args = self.args();
        let raw = args.get(index)?;
        raw.parse::<f64>().ok().filter(|n| n.is_finite()).map(|n| n.trunc() as i64)
    }
}

impl RuleList {
    /// The individual tokens, splitting the piped form
    pub fn tokens(&self) -> Vec<RuleToken> {
        match self {
            RuleList::Piped(piped) => piped
                .split('|')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(|t| RuleToken::Text(t.to_string()))
                .collect(),
            RuleList::Tokens(tokens) => tokens.clone(),
        }
    }

    /// Whether the list contains the bare `required` keyword
    pub fn is_required(&self) -> bool {
        self.tokens()
            .iter()
            .any(|t| matches!(t, RuleToken::Text(text) if text.trim() == "required"))
    }
}

impl From<&str> for RuleList {
    fn from(piped: &str) -> Self {
        RuleList::Piped(piped.to_string())
    }
}

impl From<Vec<&str>> for RuleList {
    fn from(tokens: Vec<&str>) -> Self {
        RuleList::Tokens(tokens.into_iter().map(|t| RuleToken::Text(t.to_string())).collect())
    }
}

/// Compile one field's rule tokens into its property schema
pub fn compile_field(tokens: &[RuleToken]) -> Schema {
    tokens
        .iter()
        .fold(Schema::of(SchemaType::String), |mut schema, token| {
            match token {
                RuleToken::Text(text) => apply_text_rule(&mut schema, Directive::parse(text)),
                RuleToken::Object(object) => apply_rule_object(&mut schema, object),
            }
            schema
        })
}

/// Compile a whole rule set into an object schema
pub fn compile_all(rules: &RuleSet) -> Schema {
    debug!("Compiling rule set with {} fields", rules.len());

    let mut own_rules: IndexMap<&str, Option<&RuleList>> = IndexMap::new();
    let mut element_rules: IndexMap<&str, &RuleList> = IndexMap::new();

    for (field, list) in rules {
        match field.strip_suffix(ELEMENT_SUFFIX) {
            Some(parent) => {
                own_rules.entry(parent).or_insert(None);
                element_rules.insert(parent, list);
            }
            None => {
                own_rules.insert(field.as_str(), Some(list));
            }
        }
    }

    let mut object = Schema::object(IndexMap::new());

    for (name, list) in own_rules {
        let mut property = match list {
            Some(list) => compile_field(&list.tokens()),
            None => Schema::of(SchemaType::Array),
        };

        if let Some(elements) = element_rules.get(name) {
            property.schema_type = Some(SchemaType::Array);
            property.items = Some(Box::new(compile_field(&elements.tokens())));
        }

        if list.is_some_and(RuleList::is_required) {
            object.require(name);
        }

        object.properties.insert(name.to_string(), property);
    }

    object
}

fn apply_text_rule(schema: &mut Schema, directive: Directive<'_>) {
    match directive.name {
        "string" => schema.set_type(SchemaType::String),
        "integer" | "int" => schema.set_type(SchemaType::Integer),
        "numeric" => schema.set_type(SchemaType::Number),
        "boolean" | "bool" => schema.set_type(SchemaType::Boolean),
        "array" => schema.set_type(SchemaType::Array),
        "json" => schema.set_type(SchemaType::Object),
        "min" => {
            if let Some(bound) = directive.numeric_arg(0) {
                set_lower_bound(schema, bound);
            }
        }
        "max" => {
            if let Some(bound) = directive.numeric_arg(0) {
                set_upper_bound(schema, bound);
            }
        }
        "between" => {
            if let (Some(low), Some(high)) = (directive.numeric_arg(0), directive.numeric_arg(1)) {
                set_lower_bound(schema, low);
                set_upper_bound(schema, high);
            }
        }
        "in" => {
            schema.enum_values = directive
                .args()
                .into_iter()
                .map(|v| Value::String(v.to_string()))
                .collect();
        }
        "regex" => {
            // The pattern may itself contain commas and colons
            if let Some(pattern) = directive.raw_args {
                schema.pattern = Some(pattern.to_string());
            }
        }
        "date" => set_format(schema, "date"),
        "date_format" => set_format(schema, "date-time"),
        "email" => set_format(schema, "email"),
        "url" => set_format(schema, "uri"),
        "ip" | "ipv4" => set_format(schema, "ipv4"),
        "ipv6" => set_format(schema, "ipv6"),
        "file" | "image" => set_format(schema, "binary"),
        "nullable" => schema.nullable = true,
        // consumed by the parent object
        "required" => {}
        other => debug!("Ignoring unrecognized rule: {}", other),
    }
}

fn apply_rule_object(schema: &mut Schema, object: &RuleObject) {
    match object {
        RuleObject::Enum { values } | RuleObject::In { values } => {
            schema.enum_values = values.clone();
        }
        RuleObject::File { .. } | RuleObject::Dimensions { .. } => set_format(schema, "binary"),
        RuleObject::Unknown => debug!("Ignoring unrecognized rule object"),
    }
}

fn set_format(schema: &mut Schema, format: &str) {
    schema.set_type(SchemaType::String);
    schema.format = Some(format.to_string());
}

fn set_lower_bound(schema: &mut Schema, bound: i64) {
    if schema.is_type(SchemaType::String) {
        schema.min_length = Some(bound);
    } else {
        schema.minimum = Some(bound);
    }
}

fn set_upper_bound(schema: &mut Schema, bound: i64) {
    if schema.is_type(SchemaType::String) {
        schema.max_length = Some(bound);
    } else {
        schema.maximum = Some(bound);
    }
}
