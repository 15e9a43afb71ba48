use crate::actions::{ActionData, ActionDefinition};
use std::collections::HashSet;

/// Expands an action's prompt template with the submitted form data.
///
/// Each supplied non-empty field replaces the first occurrence of its
/// `{name}` token; tokens with no supplied value ship verbatim. The two
/// derived fragments are then resolved unconditionally:
///
/// * `{cheapestCarrierText}` becomes " using the cheapest carrier" when
///   `cheapestCarrier` was submitted as "true", otherwise the empty string.
/// * `{deliveryDateText}` becomes " with delivery by <date>" when a
///   `deliveryDate` value is present, otherwise the empty string.
///
/// Parameterless actions return their template untouched.
pub fn render_prompt(action: &ActionDefinition, data: &ActionData) -> String {
    if action.parameters.is_empty() {
        return action.prompt_template.clone();
    }

    let mut prompt = action.prompt_template.clone();
    for spec in &action.parameters {
        if let Some(value) = data.get(&spec.name) {
            if !value.is_empty() {
                prompt = prompt.replacen(&format!("{{{}}}", spec.name), value, 1);
            }
        }
    }

    // Callers may pass fields beyond the declared set; honor them in a
    // stable order so repeated renders agree.
    let declared: HashSet<&str> = action.parameters.iter().map(|p| p.name.as_str()).collect();
    let mut extras: Vec<&String> = data
        .keys()
        .filter(|key| !declared.contains(key.as_str()))
        .collect();
    extras.sort();
    for key in extras {
        if let Some(value) = data.get(key) {
            if !value.is_empty() {
                prompt = prompt.replacen(&format!("{{{}}}", key), value, 1);
            }
        }
    }

    let cheapest_fragment = if data.get("cheapestCarrier").map(String::as_str) == Some("true") {
        " using the cheapest carrier"
    } else {
        ""
    };
    prompt = prompt.replacen("{cheapestCarrierText}", cheapest_fragment, 1);

    let delivery_fragment = match data.get("deliveryDate") {
        Some(date) if !date.is_empty() => format!(" with delivery by {}", date),
        _ => String::new(),
    };
    prompt.replacen("{deliveryDateText}", &delivery_fragment, 1)
}

/// Lists the `{name}` tokens of a template in order of appearance. Empty
/// braces are skipped and an inner `{` restarts the token.
pub fn placeholders(template: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current: Option<String> = None;
    for c in template.chars() {
        match c {
            '{' => current = Some(String::new()),
            '}' => {
                if let Some(token) = current.take() {
                    if !token.is_empty() {
                        tokens.push(token);
                    }
                }
            }
            _ => {
                if let Some(token) = current.as_mut() {
                    token.push(c);
                }
            }
        }
    }
    tokens
}
