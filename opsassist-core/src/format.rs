use regex::Regex;

/// Prepares raw reply text for display. Upstream replies escape newlines as
/// literal `\n` sequences, so those are unescaped first, then the text is
/// trimmed. Replies that carry a numbered shipping-rate listing are rewritten
/// into option cards; everything else passes through unchanged.
pub fn display_text(raw: &str) -> String {
    let processed = raw.replace("\\n", "\n").trim().to_string();
    if processed.contains("shipping options") && processed.contains("**Carrier**:") {
        if let Some(formatted) = format_shipping_options(&processed) {
            return formatted;
        }
    }
    processed
}

/// Splits a numbered rate listing into per-option card markup. Returns
/// `None` when the text has no numbered items to lift out.
fn format_shipping_options(text: &str) -> Option<String> {
    let splitter = Regex::new(r"\n\d+\.").unwrap();
    let parts: Vec<&str> = splitter.split(text).collect();
    if parts.len() < 2 {
        return None;
    }

    let highlight = Regex::new(r"\*\*([^*]+)\*\*").unwrap();
    let card = |index: usize, body: &str| {
        format!(
            "<div class=\"shipping-option\"><div class=\"shipping-option-title\">Option {}</div>{}</div>",
            index,
            highlight.replace_all(body, "<span class=\"highlight\">$1</span>")
        )
    };

    let mut result = format!("{}\n\n", parts[0].trim());
    let last = parts.len() - 1;
    for (index, option) in parts.iter().enumerate().skip(1) {
        // A trailing follow-up offer stays outside the final card.
        if index == last {
            if let Some(pos) = option.find("I can show you") {
                let (body, tail) = option.split_at(pos);
                result.push_str(&card(index, body.trim()));
                result.push_str(&format!(
                    "<div class=\"mt-4\">I can show you{}</div>",
                    &tail["I can show you".len()..]
                ));
                continue;
            }
        }
        result.push_str(&card(index, option.trim()));
    }
    Some(result)
}
