//! Template queries over schema-less attribute trees.
//!
//! A query is literal text interleaved with `{expression}` blocks. Each
//! expression is an RFC 9535 JSONPath; a leading `.` or `[` is rooted at `$`.
//! Every block renders to text and the pieces are concatenated:
//!
//! | Selection                  | Rendering                                  |
//! |----------------------------|--------------------------------------------|
//! | nothing                    | [`MISSING`] (`<nil>`)                      |
//! | a string                   | the string, unquoted                       |
//! | number / bool / null       | `4`, `1.5`, `true`, `null`                 |
//! | list / map                 | compact JSON (`[]`, `["1"]`, `{"a":1}`)    |
//! | several nodes              | each rendering, joined by one space        |

use serde_json::Value;
use serde_json_path::JsonPath;

use crate::error::ExtractionError;

/// Rendering of an expression that selected nothing.
pub const MISSING: &str = "<nil>";

/// Rendering of a resource, variable or output that is not in the plan.
pub const ABSENT: &str = "nil";

/// A parsed template query, reusable across trees.
#[derive(Debug, Clone)]
pub struct Query {
    source: String,
    segments: Vec<Segment>,
}

#[derive(Debug, Clone)]
enum Segment {
    Text(String),
    Path(JsonPath),
}

impl Query {
    /// Parse a template query.
    pub fn parse(query: &str) -> Result<Self, ExtractionError> {
        let mut segments = Vec::new();
        let mut text = String::new();
        let mut chars = query.char_indices();

        while let Some((open, c)) = chars.next() {
            if c != '{' {
                text.push(c);
                continue;
            }
            let close = find_close(&mut chars)
                .ok_or_else(|| ExtractionError::parse(query, format!("unclosed `{{` at byte {open}")))?;
            if !text.is_empty() {
                segments.push(Segment::Text(std::mem::take(&mut text)));
            }
            segments.push(Segment::Path(compile(query, &query[open + 1..close])?));
        }
        if !text.is_empty() {
            segments.push(Segment::Text(text));
        }
        if segments.is_empty() {
            return Err(ExtractionError::parse(query, "empty query"));
        }

        Ok(Self {
            source: query.to_string(),
            segments,
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Evaluate against `root`.
    #[must_use]
    pub fn render(&self, root: &Value) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Path(path) => {
                    let nodes = path.query(root).all();
                    if nodes.is_empty() {
                        out.push_str(MISSING);
                        continue;
                    }
                    let rendered: Vec<String> = nodes.into_iter().map(render_value).collect();
                    out.push_str(&rendered.join(" "));
                }
            }
        }
        out
    }
}

/// Parse `query` and evaluate it against `root`.
pub fn extract(root: &Value, query: &str) -> Result<String, ExtractionError> {
    Ok(Query::parse(query)?.render(root))
}

/// Canonical text for one JSON value.
#[must_use]
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Advance past the `}` closing the current block; braces inside quoted
/// JSONPath strings do not count.
fn find_close(chars: &mut std::str::CharIndices<'_>) -> Option<usize> {
    let mut quote: Option<char> = None;
    while let Some((i, c)) = chars.next() {
        match quote {
            Some(_) if c == '\\' => {
                chars.next();
            }
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '\'' || c == '"' => quote = Some(c),
            None if c == '}' => return Some(i),
            None => {}
        }
    }
    None
}

fn compile(query: &str, expression: &str) -> Result<JsonPath, ExtractionError> {
    let expression = expression.trim();
    if expression.is_empty() {
        return Err(ExtractionError::parse(query, "empty expression `{}`"));
    }
    let keyword = expression.split_whitespace().next().unwrap_or_default();
    if matches!(keyword, "range" | "end" | "if" | "else") {
        return Err(ExtractionError::parse(
            query,
            format!("template keyword `{keyword}` is not supported"),
        ));
    }

    let rooted = match expression.chars().next() {
        Some('$') => expression.to_string(),
        Some('@') => format!("${}", &expression[1..]),
        Some('.' | '[') => format!("${expression}"),
        _ => {
            return Err(ExtractionError::parse(
                query,
                format!("expression `{expression}` must start with `$`, `.` or `[`"),
            ));
        }
    };
    JsonPath::parse(&rooted).map_err(|e| ExtractionError::parse(query, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> Value {
        json!({
            "name": "defaultacr",
            "sku": "Premium",
            "admin_enabled": true,
            "zone_redundancy_enabled": false,
            "retention_days": 7,
            "ratio": 1.5,
            "data_endpoint_enabled": null,
            "tags": {},
            "network_rule_set": [],
            "georeplications": [
                {"location": "southeastus5", "zone_redundancy_enabled": false},
                {"location": "southeastus3", "zone_redundancy_enabled": false}
            ],
            "azure_active_directory_role_based_access_control": [
                {"admin_group_object_ids": ["1"], "managed": true}
            ]
        })
    }

    #[test]
    fn scalars_render_naturally() {
        let tree = registry();
        assert_eq!(extract(&tree, "{$.name}").unwrap(), "defaultacr");
        assert_eq!(extract(&tree, "{$.admin_enabled}").unwrap(), "true");
        assert_eq!(extract(&tree, "{$.zone_redundancy_enabled}").unwrap(), "false");
        assert_eq!(extract(&tree, "{$.retention_days}").unwrap(), "7");
        assert_eq!(extract(&tree, "{$.ratio}").unwrap(), "1.5");
        assert_eq!(extract(&tree, "{$.data_endpoint_enabled}").unwrap(), "null");
    }

    #[test]
    fn compound_values_render_as_compact_json() {
        let tree = registry();
        assert_eq!(extract(&tree, "{$.tags}").unwrap(), "{}");
        assert_eq!(extract(&tree, "{$.network_rule_set}").unwrap(), "[]");
        assert_eq!(extract(&tree, "{$..admin_group_object_ids}").unwrap(), r#"["1"]"#);
    }

    #[test]
    fn missing_paths_render_sentinel() {
        let tree = registry();
        assert_eq!(extract(&tree, "{$.nonexistent.field}").unwrap(), MISSING);
        assert_eq!(extract(&tree, "{$.georeplications[7].location}").unwrap(), MISSING);
        assert_eq!(extract(&json!(null), "{$.sku}").unwrap(), MISSING);
    }

    #[test]
    fn multiple_matches_join_with_single_space() {
        let tree = registry();
        assert_eq!(
            extract(&tree, "{$.georeplications[*].location}").unwrap(),
            "southeastus5 southeastus3"
        );
        assert_eq!(
            extract(&tree, "{$.georeplications[?@.location == 'southeastus3'].location}").unwrap(),
            "southeastus3"
        );
    }

    #[test]
    fn leading_dot_and_bracket_are_rooted() {
        let tree = registry();
        assert_eq!(extract(&tree, "{.sku}").unwrap(), "Premium");
        assert_eq!(extract(&tree, "{['sku']}").unwrap(), "Premium");
        assert_eq!(extract(&tree, "{ $.sku }").unwrap(), "Premium");
    }

    #[test]
    fn literal_text_is_kept_around_blocks() {
        let tree = registry();
        assert_eq!(
            extract(&tree, "{$.name}/{$.sku}").unwrap(),
            "defaultacr/Premium"
        );
        assert_eq!(extract(&tree, "sku={$.sku}").unwrap(), "sku=Premium");
    }

    #[test]
    fn braces_inside_quoted_names_do_not_close_block() {
        let tree = json!({"odd}key": "x"});
        assert_eq!(extract(&tree, "{$['odd}key']}").unwrap(), "x");
    }

    #[test]
    fn variable_record_is_a_plain_tree() {
        let record = json!({"value": ["123.45.67.89/16"]});
        assert_eq!(extract(&record, "{$.value}").unwrap(), r#"["123.45.67.89/16"]"#);
        assert_eq!(extract(&record, "{$.value[0]}").unwrap(), "123.45.67.89/16");
    }

    #[test]
    fn malformed_queries_are_parse_errors() {
        let tree = registry();
        for query in ["{$.name", "{}", "{$.[}", "{range .items[*]}", "{end}", "{name}", ""] {
            let err = extract(&tree, query).unwrap_err();
            assert!(
                matches!(&err, ExtractionError::Parse { query: q, .. } if q == query),
                "{query}: {err}"
            );
        }
    }

    #[test]
    fn parsed_query_is_reusable() {
        let query = Query::parse("{$.sku}").unwrap();
        assert_eq!(query.as_str(), "{$.sku}");
        assert_eq!(query.render(&registry()), "Premium");
        assert_eq!(query.render(&json!({"sku": "Basic"})), "Basic");
    }
}
