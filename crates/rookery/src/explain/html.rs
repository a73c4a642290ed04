//! Self-contained HTML fragments for the two explanation kinds.
//!
//! Fragments carry their own styles so any sink can embed them verbatim.

use std::fmt::Write;

use super::{AdditiveAttribution, ClassAttribution, RuleExplanation};

/// Height hint for the attribution fragment, in pixels.
pub const ATTRIBUTION_HEIGHT: u32 = 420;
/// Height hint for the rule fragment, in pixels.
pub const RULE_HEIGHT: u32 = 700;

const POSITIVE: &str = "#ff0d57";
const NEGATIVE: &str = "#1e88e5";

/// Segments narrower than this (percent of the bar) get no inline label.
const LABEL_MIN_WIDTH: f64 = 8.0;

/// Escape text for HTML element content and attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// One force-style bar per class: red segments push the output up from the
/// base value, blue segments push it down.
pub fn attribution_fragment(attribution: &AdditiveAttribution) -> String {
    let mut html = String::new();
    html.push_str(&format!(
        "<style>\
         .force{{font-family:sans-serif;font-size:12px;margin:0 0 14px}}\
         .force-bar{{display:flex;height:26px;border-radius:3px;overflow:hidden}}\
         .force-seg{{color:#fff;white-space:nowrap;overflow:hidden;text-overflow:ellipsis;\
         padding:5px 3px;box-sizing:border-box;border-right:1px solid #fff}}\
         .force-pos{{background:{}}}.force-neg{{background:{}}}\
         </style>",
        POSITIVE, NEGATIVE
    ));
    html.push_str("<div class=\"force-plot\">");
    for class in &attribution.classes {
        class_bar(&mut html, class, attribution);
    }
    if attribution.additivity_checked {
        html.push_str("<p class=\"force\">Additivity checked.</p>");
    }
    html.push_str("</div>");
    html
}

fn class_bar(html: &mut String, class: &ClassAttribution, attribution: &AdditiveAttribution) {
    let _ = write!(
        html,
        "<div class=\"force\"><div><strong>{}</strong> &middot; f(x) = {:.3} &middot; base value {:.3}</div>",
        escape(&class.class_label),
        class.model_output,
        class.baseline
    );

    let mut segments: Vec<(String, f64)> = class
        .contributions
        .iter()
        .enumerate()
        .filter(|(_, (_, phi))| **phi != 0.0)
        .map(|(index, (name, phi))| {
            let label = match attribution.feature_values.get(index) {
                Some(value) if !value.is_empty() => format!("{} = {}", name, value),
                _ => name.clone(),
            };
            (label, *phi)
        })
        .collect();

    let total: f64 = segments.iter().map(|(_, phi)| phi.abs()).sum();
    if total == 0.0 {
        html.push_str("<div>No feature moved this output.</div></div>");
        return;
    }

    // Positives largest first, then negatives smallest first, meeting at f(x)
    segments.sort_by(|a, b| b.1.total_cmp(&a.1));
    html.push_str("<div class=\"force-bar\">");
    for (label, phi) in &segments {
        let width = phi.abs() / total * 100.0;
        let class_name = if *phi > 0.0 { "force-pos" } else { "force-neg" };
        let text = if width >= LABEL_MIN_WIDTH {
            escape(label)
        } else {
            String::new()
        };
        let _ = write!(
            html,
            "<span class=\"force-seg {}\" style=\"width:{:.2}%\" title=\"{}: {:+.4}\">{}</span>",
            class_name,
            width,
            escape(label),
            phi,
            text
        );
    }
    html.push_str("</div></div>");
}

/// Rule conditions with precision and coverage.
pub fn rule_fragment(rule: &RuleExplanation) -> String {
    let mut html = String::from(
        "<style>\
         .anchor{font-family:sans-serif;font-size:14px}\
         .anchor table{border-collapse:collapse;margin:8px 0}\
         .anchor td,.anchor th{border:1px solid #ddd;padding:4px 10px;text-align:left}\
         .anchor .cond{background:#fff3cd}\
         </style>",
    );
    let _ = write!(
        html,
        "<div class=\"anchor\"><p>Prediction: <strong>{}</strong></p>",
        escape(&rule.predicted_class)
    );

    if rule.conditions.is_empty() {
        html.push_str("<p>The prediction holds regardless of feature values.</p>");
    } else {
        html.push_str("<p>If all of these hold:</p><table><tr><th>Feature</th><th>Condition</th></tr>");
        for condition in &rule.conditions {
            let _ = write!(
                html,
                "<tr class=\"cond\"><td>{}</td><td>{} {}</td></tr>",
                escape(&condition.feature),
                escape(&condition.operator.to_string()),
                escape(&condition.value.to_string())
            );
        }
        html.push_str("</table>");
    }

    let _ = write!(
        html,
        "<table><tr><th>Precision</th><td>{:.3}</td></tr>\
         <tr><th>Coverage</th><td>{:.3}</td></tr>\
         <tr><th>Samples</th><td>{}</td></tr></table>\
         <p><code>{}</code></p></div>",
        rule.precision,
        rule.coverage,
        rule.samples_drawn,
        escape(&rule.describe())
    );
    html
}

/// Notice shown in place of an explanation whose backend failed.
pub fn failure_fragment(backend: &str, error: &str) -> String {
    format!(
        "<div class=\"explain-failed\" style=\"font-family:sans-serif;color:#8a1c1c\">\
         <strong>{} unavailable:</strong> {}</div>",
        escape(backend),
        escape(error)
    )
}
