use std::sync::OnceLock;

use regex::{Captures, Regex};

/// Matches `{{ env.NAME }}` with an optional `| default("value")`
fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"\{\{\s*env\.([A-Za-z_][A-Za-z0-9_]*)\s*(?:\|\s*default\("([^"]*)"\))?\s*\}\}"#)
            .expect("placeholder regex is valid")
    })
}

/// Substitute environment variables into raw config text
///
/// Comment lines are copied verbatim so commented-out secrets never need
/// to be set.
pub fn expand_env(input: &str) -> Result<String, String> {
    let mut output = String::with_capacity(input.len());

    for line in input.split_inclusive('\n') {
        if line.trim_start().starts_with('#') {
            output.push_str(line);
            continue;
        }

        let mut missing = None;
        let expanded = placeholder().replace_all(line, |caps: &Captures<'_>| {
            let name = &caps[1];
            match (std::env::var(name), caps.get(2)) {
                (Ok(value), _) => value,
                (Err(_), Some(default)) => default.as_str().to_owned(),
                (Err(_), None) => {
                    missing.get_or_insert_with(|| name.to_owned());
                    String::new()
                }
            }
        });

        if let Some(name) = missing {
            return Err(format!("environment variable not found: `{name}`"));
        }
        output.push_str(&expanded);
    }

    Ok(output)
}
