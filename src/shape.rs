//! Static shape inference over a payload type's serialization method.
//!
//! The host exports the body of the method that turns a payload into its wire form, e.g.
//!
//! ```text
//! json!({
//!     "id": self.id,
//!     "kind": "item",
//!     "price": 9.99,
//!     "meta": { "archived": false }
//! })
//! ```
//!
//! When the body is a single (optionally `return`ed) `json!` literal, each string key gets a
//! type from its literal value. Non-literal values such as `self.id` give no evidence and are
//! skipped.

use crate::schema::{Schema, SchemaType};
use indexmap::IndexMap;
use log::debug;
use syn::parse::{Parse, ParseStream};
use syn::punctuated::Punctuated;
use syn::{braced, bracketed, token, Expr, Lit, Stmt, Token, UnOp};

/// The literal structure of a `json!` body
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// `{ "key": value, ... }`; entries with non-literal keys are dropped
    Object(Vec<(String, Shape)>),
    /// `[ value, ... ]`
    Array(Vec<Shape>),
    /// A scalar literal
    Literal(SchemaType),
    /// Anything that is not a literal (field access, call, `null`, ...)
    Opaque,
}

impl Parse for Shape {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        if input.peek(token::Brace) {
            let content;
            braced!(content in input);
            let mut entries = Vec::new();
            while !content.is_empty() {
                let key = if content.peek(syn::LitStr) {
                    let lit: syn::LitStr = content.parse()?;
                    Some(lit.value())
                } else {
                    // computed keys carry no static name
                    content.parse::<Expr>()?;
                    None
                };
                content.parse::<Token![:]>()?;
                let value: Shape = content.parse()?;
                if let Some(key) = key {
                    entries.push((key, value));
                }
                if content.is_empty() {
                    break;
                }
                content.parse::<Token![,]>()?;
            }
            return Ok(Shape::Object(entries));
        }

        if input.peek(token::Bracket) {
            let content;
            bracketed!(content in input);
            let elements = Punctuated::<Shape, Token![,]>::parse_terminated(&content)?;
            return Ok(Shape::Array(elements.into_iter().collect()));
        }

        let expr: Expr = input.parse()?;
        Ok(Shape::from_expr(&expr))
    }
}

impl Shape {
    fn from_expr(expr: &Expr) -> Self {
        match expr {
            Expr::Lit(expr_lit) => Self::from_lit(&expr_lit.lit),
            Expr::Unary(unary) if matches!(unary.op, UnOp::Neg(_)) => match &*unary.expr {
                Expr::Lit(expr_lit) => Self::from_lit(&expr_lit.lit),
                _ => Shape::Opaque,
            },
            Expr::Group(group) => Self::from_expr(&group.expr),
            Expr::Paren(paren) => Self::from_expr(&paren.expr),
            _ => Shape::Opaque,
        }
    }

    fn from_lit(lit: &Lit) -> Self {
        match lit {
            Lit::Int(_) => Shape::Literal(SchemaType::Integer),
            Lit::Float(_) => Shape::Literal(SchemaType::Number),
            Lit::Str(_) | Lit::Char(_) => Shape::Literal(SchemaType::String),
            Lit::Bool(_) => Shape::Literal(SchemaType::Boolean),
            _ => Shape::Opaque,
        }
    }

    /// Schema for this shape, or `None` when it carries no type evidence
    pub fn to_schema(&self) -> Option<Schema> {
        match self {
            Shape::Literal(schema_type) => Some(Schema::of(*schema_type)),
            Shape::Object(entries) => Some(Schema::object(infer_entries(entries))),
            Shape::Array(elements) => {
                let items = elements
                    .iter()
                    .find_map(Shape::to_schema)
                    .unwrap_or_else(|| Schema::of(SchemaType::String));
                Some(Schema::array_of(items))
            }
            Shape::Opaque => None,
        }
    }
}

/// Infer property types from a serialization method body.
///
/// Returns an empty map when the body is not a single literal `json!` structure or cannot
/// be parsed.
pub fn infer_properties(body: &str) -> IndexMap<String, Schema> {
    match top_level_shape(body) {
        Some(Shape::Object(entries)) => infer_entries(&entries),
        Some(_) => {
            debug!("Serialization body does not return a keyed structure");
            IndexMap::new()
        }
        None => IndexMap::new(),
    }
}

fn infer_entries(entries: &[(String, Shape)]) -> IndexMap<String, Schema> {
    entries
        .iter()
        .filter_map(|(key, value)| value.to_schema().map(|schema| (key.clone(), schema)))
        .collect()
}

fn top_level_shape(body: &str) -> Option<Shape> {
    let block: syn::Block = match syn::parse_str(&format!("{{ {} }}", body)) {
        Ok(block) => block,
        Err(e) => {
            debug!("Failed to parse serialization body: {}", e);
            return None;
        }
    };

    let [stmt] = block.stmts.as_slice() else {
        debug!("Serialization body has {} statements, expected one", block.stmts.len());
        return None;
    };

    let expr = match stmt {
        Stmt::Expr(Expr::Return(ret), _) => ret.expr.as_deref()?,
        Stmt::Expr(expr, None) => expr,
        Stmt::Macro(stmt_macro) => return literal_macro(&stmt_macro.mac),
        _ => return None,
    };

    match expr {
        Expr::Macro(expr_macro) => literal_macro(&expr_macro.mac),
        _ => None,
    }
}

fn literal_macro(mac: &syn::Macro) -> Option<Shape> {
    let is_json = mac
        .path
        .segments
        .last()
        .is_some_and(|segment| segment.ident == "json");
    if !is_json {
        return None;
    }

    match mac.parse_body::<Shape>() {
        Ok(shape) => Some(shape),
        Err(e) => {
            debug!("Failed to parse json! literal: {}", e);
            None
        }
    }
}
