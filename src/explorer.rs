//! Query-explorer deep links
//!
//! The escape table below matches what the GraphiQL explorer itself produces
//! and is not general URL encoding. In particular `"` becomes `%5C%22` and,
//! inside the variables payload, newlines become a literal `\n`.

use crate::error::Result;
use serde::Serialize;

/// Apply the explorer's substitution table to `text`
///
/// `escaped_newline` selects `%5Cn` (used for the JSON variables payload)
/// instead of `%0A` for newlines.
pub fn encode_query_text(text: &str, escaped_newline: bool) -> String {
    let mut encoded = String::with_capacity(text.len() * 2);

    for c in text.chars() {
        match c {
            ' ' => encoded.push('+'),
            '$' => encoded.push_str("%24"),
            ':' => encoded.push_str("%3A"),
            ',' => encoded.push_str("%2C"),
            '{' => encoded.push_str("%7B"),
            '}' => encoded.push_str("%7D"),
            '(' => encoded.push_str("%28"),
            ')' => encoded.push_str("%29"),
            '=' => encoded.push_str("%3D"),
            '!' => encoded.push_str("%21"),
            '"' => encoded.push_str("%5C%22"),
            '\n' if escaped_newline => encoded.push_str("%5Cn"),
            '\n' => encoded.push_str("%0A"),
            other => encoded.push(other),
        }
    }

    encoded
}

/// Build `{endpoint}/graphql?query=...[&variables=...]`
///
/// Variables are pretty-printed with two-space indentation and wrapped in
/// encoded quotes. The query text is not validated.
pub fn build_explorer_url<T: Serialize + ?Sized>(
    query: &str,
    endpoint: &str,
    variables: Option<&T>,
) -> Result<String> {
    let variables_parameter = match variables {
        Some(variables) => {
            let json = serde_json::to_string_pretty(variables)?;
            format!("&variables=%22{}%22", encode_query_text(&json, true))
        }
        None => String::new(),
    };

    Ok(format!(
        "{}/graphql?query={}{}",
        endpoint,
        encode_query_text(query, false),
        variables_parameter
    ))
}
