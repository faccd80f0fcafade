//! Template variable extraction from provider prompt messages.

use serde_json::Value;

/// Names of `{variable}` placeholders in the `content` of each message,
/// in first-seen order without duplicates.
///
/// A placeholder runs from a `{` to the next `}`, so `{a{b}` names `a{b`.
pub fn expected_template_variables(messages: &Value) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    let Some(messages) = messages.as_array() else {
        return found;
    };

    for content in messages
        .iter()
        .filter_map(|message| message.get("content").and_then(Value::as_str))
    {
        let mut rest = content;
        while let Some(open) = rest.find('{') {
            let after = &rest[open + 1..];
            let Some(close) = after.find('}') else {
                break;
            };
            let name = &after[..close];
            if !name.is_empty() && !found.iter().any(|v| v == name) {
                found.push(name.to_string());
            }
            rest = &after[close + 1..];
        }
    }
    found
}
