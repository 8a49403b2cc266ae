//! Parsers for the packed text fields of column rows.

use crate::graph::{ColumnType, DefaultValue, QualifiedName};

/// Split a brace-wrapped label token such as `{a,"b,c",d}`.
///
/// Labels containing commas, quotes or backslashes arrive double-quoted with
/// backslash escapes. Returns `None` when the column is not enumerated.
pub fn parse_enum_labels(token: Option<&str>) -> Option<Vec<String>> {
    let token = token?.trim();
    let inner = token
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
        .unwrap_or(token);
    if inner.is_empty() {
        return Some(Vec::new());
    }

    let mut labels = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = inner.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' if quoted => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            '"' => quoted = !quoted,
            ',' if !quoted => labels.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    labels.push(current);
    Some(labels)
}

/// Remove trailing `::type` casts from a default expression.
///
/// Casts nested inside parentheses or string literals are left alone, so
/// `nextval('seq'::regclass)` and `now()` come back unchanged.
pub fn strip_default_cast(raw: &str) -> String {
    let mut value = raw.trim();
    while let Some(position) = trailing_cast(value) {
        value = value[..position].trim_end();
    }
    value.to_string()
}

/// Build a [`DefaultValue`] from a raw catalog default.
pub fn default_value(raw: Option<&str>) -> Option<DefaultValue> {
    let raw = raw?;
    Some(DefaultValue {
        raw: raw.to_string(),
        value: strip_default_cast(raw),
    })
}

fn trailing_cast(expr: &str) -> Option<usize> {
    let bytes = expr.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut in_ident = false;
    let mut last = None;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\'' if !in_ident => in_string = !in_string,
            b'"' if !in_string => in_ident = !in_ident,
            b'(' | b'[' if !in_string && !in_ident => depth += 1,
            b')' | b']' if !in_string && !in_ident => depth = depth.saturating_sub(1),
            b':' if !in_string
                && !in_ident
                && depth == 0
                && bytes.get(i + 1) == Some(&b':') =>
            {
                last = Some(i);
                i += 1;
            }
            _ => {}
        }
        i += 1;
    }

    let position = last?;
    let cast = expr[position + 2..].trim();
    let is_type_name = !cast.is_empty()
        && cast.chars().all(|c| {
            c.is_alphanumeric() || matches!(c, '_' | ' ' | '.' | '"' | '[' | ']' | '(' | ')' | ',')
        })
        && balanced(cast);
    (position > 0 && is_type_name).then_some(position)
}

/// Whether every `(` and `[` in a cast suffix is closed in order.
fn balanced(cast: &str) -> bool {
    let mut open = Vec::new();
    for c in cast.chars() {
        match c {
            '(' | '[' => open.push(c),
            ')' if open.pop() != Some('(') => return false,
            ']' if open.pop() != Some('[') => return false,
            _ => {}
        }
    }
    open.is_empty()
}

/// A type descriptor split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    /// Base (element) type name.
    pub base: String,
    /// Parenthesized modifiers, e.g. `[10, 2]` for `numeric(10,2)`.
    pub modifiers: Vec<u32>,
    /// Number of trailing `[]` pairs.
    pub array_dimension: u8,
}

/// Parse `base[(m[,n])][[]...]`.
///
/// Unparseable modifiers are kept as part of the base name.
pub fn parse_type_descriptor(descriptor: &str) -> TypeDescriptor {
    let mut rest = descriptor.trim();
    let mut array_dimension = 0u8;
    while let Some(stripped) = rest.strip_suffix("[]") {
        rest = stripped.trim_end();
        array_dimension = array_dimension.saturating_add(1);
    }

    let mut modifiers = Vec::new();
    if let Some(open) = rest.strip_suffix(')').and_then(|r| r.rfind('(')) {
        let parsed: Option<Vec<u32>> = rest[open + 1..rest.len() - 1]
            .split(',')
            .map(|m| m.trim().parse().ok())
            .collect();
        if let Some(parsed) = parsed {
            modifiers = parsed;
            rest = rest[..open].trim_end();
        }
    }

    TypeDescriptor {
        base: rest.to_string(),
        modifiers,
        array_dimension,
    }
}

fn is_character_type(base: &str) -> bool {
    let base = base.to_ascii_lowercase();
    base.contains("char") || base == "bit" || base == "bit varying" || base == "varbit"
}

/// Assemble a [`ColumnType`] from a descriptor and the row's explicit fields.
///
/// Explicit length, precision and scale win over descriptor modifiers.
pub fn column_type(
    descriptor: &str,
    length: Option<u32>,
    precision: Option<u32>,
    scale: Option<u32>,
    domain: Option<QualifiedName>,
    user_defined_type: Option<String>,
) -> ColumnType {
    let parsed = parse_type_descriptor(descriptor);
    let (mod_length, mod_precision, mod_scale) = if is_character_type(&parsed.base) {
        (parsed.modifiers.first().copied(), None, None)
    } else {
        (
            None,
            parsed.modifiers.first().copied(),
            parsed.modifiers.get(1).copied(),
        )
    };

    ColumnType {
        base: parsed.base,
        array_dimension: parsed.array_dimension,
        length: length.or(mod_length),
        precision: precision.or(mod_precision),
        scale: scale.or(mod_scale),
        domain,
        user_defined_type,
    }
}
