// SPDX-FileCopyrightText: 2026 PingRelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `{{key}}` placeholder substitution.

use std::sync::LazyLock;

use pingrelay_core::VariableEntry;
use regex::Regex;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([^{}]+)\}\}").unwrap());

/// Replaces every `{{key}}` placeholder with the schedule's value for that
/// key. Keys match case-sensitively after trimming whitespace inside the
/// braces; a placeholder with no matching variable becomes the empty
/// string rather than leaking template syntax to recipients.
pub fn substitute(text: &str, variables: &[VariableEntry]) -> String {
    PLACEHOLDER
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let key = caps[1].trim();
            variables
                .iter()
                .find(|v| v.key == key)
                .map(|v| v.value.clone())
                .unwrap_or_default()
        })
        .into_owned()
}
