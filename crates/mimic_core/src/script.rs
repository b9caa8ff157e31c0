//! Renders analyzed steps into a Playwright automation script.
//!
//! Output is deterministic for a given input. Secrets never appear in the
//! script: credentials are read from environment variables named after the
//! credential label (`MIMIC_<LABEL>_USERNAME` and friends).
use std::fmt::Write;

use crate::{ActionStep, CredentialEntry};

const DEFAULT_WAIT_MS: u64 = 5_000;

pub fn render_script(
    artifact_id: &str,
    steps: &[ActionStep],
    credentials: &[CredentialEntry],
) -> String {
    let slots = credential_slots(credentials);
    let mut out = String::new();
    let _ = writeln!(out, "// Automation script generated by mimic.");
    let _ = writeln!(out, "// Recording: {}", single_line(artifact_id));
    let _ = writeln!(out, "// Steps: {}", steps.len());
    out.push_str("const { chromium } = require('playwright');\n\n");

    out.push_str("const credentials = {\n");
    for slot in &slots {
        let prefix = &slot.env_prefix;
        let _ = writeln!(out, "  {}: {{", js_string(&slot.key));
        let _ = writeln!(out, "    username: process.env.{prefix}_USERNAME,");
        let _ = writeln!(out, "    password: process.env.{prefix}_PASSWORD,");
        let _ = writeln!(out, "    apiKey: process.env.{prefix}_API_KEY,");
        out.push_str("  },\n");
    }
    out.push_str("};\n\n");

    out.push_str("(async () => {\n");
    out.push_str("  const browser = await chromium.launch({ headless: false });\n");
    out.push_str("  const page = await browser.newPage();\n");
    let primary = slots.first().map(|slot| slot.key.as_str());
    for step in steps {
        let _ = writeln!(out, "\n  // {}. {}", step.index + 1, single_line(&step.summary()));
        out.push_str(&render_step(step, primary));
    }
    out.push_str("\n  await browser.close();\n");
    out.push_str("})();\n");
    out
}

fn render_step(step: &ActionStep, primary_credential: Option<&str>) -> String {
    let selector = step.selector.as_deref().map(js_string);
    let value = step.value.as_deref();
    match (step.action.as_str(), selector) {
        ("goto", _) => match step.url.as_deref() {
            Some(url) => format!(
                "  await page.goto({}, {{ waitUntil: 'domcontentloaded' }});\n",
                js_string(url)
            ),
            None => unsupported(step),
        },
        ("click", Some(selector)) => format!("  await page.click({selector});\n"),
        ("hover", Some(selector)) => format!("  await page.hover({selector});\n"),
        ("type", Some(selector)) => {
            let text = match credential_slot(step, primary_credential) {
                Some(reference) => reference,
                None => js_string(value.unwrap_or_default()),
            };
            format!("  await page.fill({selector}, {text});\n")
        }
        ("select", Some(selector)) => match value {
            Some(value) => {
                format!("  await page.selectOption({selector}, {});\n", js_string(value))
            }
            None => unsupported(step),
        },
        ("press", _) => match value {
            Some(key) => format!("  await page.keyboard.press({});\n", js_string(key)),
            None => unsupported(step),
        },
        ("wait", Some(selector)) => format!(
            "  await page.waitForSelector({selector}, {{ timeout: {} }});\n",
            step.timeout_ms.unwrap_or(DEFAULT_WAIT_MS)
        ),
        ("wait", None) => format!(
            "  await page.waitForTimeout({});\n",
            step.timeout_ms.unwrap_or(DEFAULT_WAIT_MS)
        ),
        ("scroll", _) => "  await page.evaluate(() => window.scrollBy(0, 500));\n".to_string(),
        ("screenshot", _) => format!(
            "  await page.screenshot({{ path: {} }});\n",
            js_string(&format!("step-{}.png", step.index + 1))
        ),
        _ => unsupported(step),
    }
}

fn unsupported(step: &ActionStep) -> String {
    format!("  // skipped: unsupported {} step\n", single_line(&step.action))
}

/// Typed text that looks like a login field is taken from the first credential.
fn credential_slot(step: &ActionStep, primary_credential: Option<&str>) -> Option<String> {
    let key = primary_credential?;
    let haystack = format!(
        "{} {}",
        step.selector.as_deref().unwrap_or_default(),
        step.description.as_deref().unwrap_or_default()
    )
    .to_ascii_lowercase();
    let field = if haystack.contains("password") {
        "password"
    } else if ["user", "email", "login"].iter().any(|hint| haystack.contains(hint)) {
        "username"
    } else {
        return None;
    };
    Some(format!("credentials[{}].{field}", js_string(key)))
}

/// Object key and environment prefix for one credential in the script.
struct CredentialSlot {
    key: String,
    env_prefix: String,
}

/// Blank entries are dropped. Labels that collide after normalisation get a
/// positional suffix so every slot reads its own environment variables.
fn credential_slots(credentials: &[CredentialEntry]) -> Vec<CredentialSlot> {
    let mut slots: Vec<CredentialSlot> = Vec::new();
    for (position, entry) in credentials.iter().enumerate() {
        if entry.is_blank() {
            continue;
        }
        let base = credential_key(entry, position);
        let mut key = base.clone();
        let mut suffix = position + 1;
        while slots
            .iter()
            .any(|slot| slot.key == key || slot.env_prefix == env_prefix(&key))
        {
            key = format!("{base} {suffix}");
            suffix += 1;
        }
        slots.push(CredentialSlot {
            env_prefix: env_prefix(&key),
            key,
        });
    }
    slots
}

fn credential_key(entry: &CredentialEntry, position: usize) -> String {
    let label = entry.label.trim();
    if label.is_empty() {
        format!("credential{}", position + 1)
    } else {
        label.to_string()
    }
}

fn env_prefix(key: &str) -> String {
    let mut prefix = String::from("MIMIC_");
    let mut last_underscore = true;
    for c in key.chars() {
        if c.is_ascii_alphanumeric() {
            prefix.push(c.to_ascii_uppercase());
            last_underscore = false;
        } else if !last_underscore {
            prefix.push('_');
            last_underscore = true;
        }
    }
    while prefix.ends_with('_') {
        prefix.pop();
    }
    prefix
}

fn js_string(raw: &str) -> String {
    let mut quoted = String::with_capacity(raw.len() + 2);
    quoted.push('\'');
    for c in raw.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '\'' => quoted.push_str("\\'"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(quoted, "\\u{{{:x}}}", c as u32);
            }
            c => quoted.push(c),
        }
    }
    quoted.push('\'');
    quoted
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
