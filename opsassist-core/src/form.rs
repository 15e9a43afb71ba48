use crate::actions::{ActionData, ActionDefinition, ParameterKind, ParameterSpec};
use anyhow::{bail, Result};
use chrono::NaiveDate;
use std::collections::HashMap;

// --- Date Input Handling ---

/// Reduces arbitrary keyboard input to a progressive `MM/DD/YYYY` string.
/// Non-digits are dropped, digits are capped at eight, and slashes are
/// reinserted as soon as each segment fills. Typing "01152025" one key at a
/// time therefore renders as "0", "01", "01/1", ... "01/15/2025".
pub fn mask_date_input(raw: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).take(8).collect();
    match digits.len() {
        0..=2 => digits,
        3..=4 => format!("{}/{}", &digits[..2], &digits[2..]),
        _ => format!("{}/{}/{}", &digits[..2], &digits[2..4], &digits[4..]),
    }
}

/// A date value is accepted only as a complete `MM/DD/YYYY` string naming a
/// real calendar day with the year between 2000 and 2100.
pub fn is_valid_delivery_date(value: &str) -> bool {
    if value.len() != 10 {
        return false;
    }
    for (i, c) in value.chars().enumerate() {
        let ok = match i {
            2 | 5 => c == '/',
            _ => c.is_ascii_digit(),
        };
        if !ok {
            return false;
        }
    }
    let month: u32 = match value[0..2].parse() {
        Ok(m) => m,
        Err(_) => return false,
    };
    let day: u32 = match value[3..5].parse() {
        Ok(d) => d,
        Err(_) => return false,
    };
    let year: i32 = match value[6..10].parse() {
        Ok(y) => y,
        Err(_) => return false,
    };
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) || !(2000..=2100).contains(&year) {
        return false;
    }
    NaiveDate::from_ymd_opt(year, month, day).is_some()
}

// --- Form State ---

/// Live state of one parameter form. Values are written through
/// [`ActionForm::set_value`] so kind-specific masking happens on entry, and
/// submission is gated on [`ActionForm::is_valid`].
#[derive(Debug, Clone)]
pub struct ActionForm {
    action: ActionDefinition,
    values: HashMap<String, String>,
}

impl ActionForm {
    pub fn new(action: ActionDefinition) -> Self {
        Self {
            action,
            values: HashMap::new(),
        }
    }

    pub fn action(&self) -> &ActionDefinition {
        &self.action
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Stores a field value, applying the masking rules of its declared kind.
    /// Date fields keep the masked form, so reads always see the normalized
    /// string.
    pub fn set_value(&mut self, name: &str, raw: &str) -> Result<()> {
        let Some(spec) = self.action.parameters.iter().find(|p| p.name == name) else {
            bail!(
                "action '{}' has no parameter named '{}'",
                self.action.id,
                name
            );
        };
        let stored = match spec.kind {
            ParameterKind::Date => mask_date_input(raw),
            ParameterKind::Checkbox => {
                if raw != "true" && raw != "false" {
                    bail!(
                        "checkbox parameter '{}' accepts only 'true' or 'false', got '{}'",
                        name,
                        raw
                    );
                }
                raw.to_string()
            }
            ParameterKind::Text | ParameterKind::Select => raw.to_string(),
        };
        self.values.insert(name.to_string(), stored);
        Ok(())
    }

    fn field_ok(&self, spec: &ParameterSpec) -> bool {
        let value = self.values.get(&spec.name).map(String::as_str);
        match spec.kind {
            // A checkbox is filled once it has been touched; both states count.
            ParameterKind::Checkbox => !spec.required || value.is_some(),
            ParameterKind::Date => match value {
                Some(v) if !v.is_empty() => is_valid_delivery_date(v),
                _ => !spec.required,
            },
            ParameterKind::Text | ParameterKind::Select => {
                !spec.required || value.map_or(false, |v| !v.is_empty())
            }
        }
    }

    /// True once every parameter passes its fill rule. Optional fields may
    /// stay empty; a partially typed date blocks submission even when the
    /// field is optional.
    pub fn is_valid(&self) -> bool {
        self.action.parameters.iter().all(|spec| self.field_ok(spec))
    }

    /// Human-readable description of each failing field, for error reporting.
    pub fn validation_errors(&self) -> Vec<String> {
        self.action
            .parameters
            .iter()
            .filter(|spec| !self.field_ok(spec))
            .map(|spec| match spec.kind {
                ParameterKind::Date => format!("{} must be a valid MM/DD/YYYY date", spec.label),
                _ => format!("{} is required", spec.label),
            })
            .collect()
    }

    /// Consumes the form, keeping only non-empty fields.
    pub fn into_data(self) -> ActionData {
        self.values
            .into_iter()
            .filter(|(_, value)| !value.is_empty())
            .collect()
    }
}
