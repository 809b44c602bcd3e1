//! Variable substitution and the predicate language used to evaluate
//! workflow stage `condition`s and loop conditions between stages.

use std::collections::HashMap;

use regex::Regex;

/// State available to a template: plain variables, stage/node outputs
/// (`node_id` and `node_id.output` resolve the same value), and any
/// loop-scoped keys (`loop.iteration`, `loop.last.<node_id>`) the caller has
/// already merged in under those literal key names.
pub type TemplateState = HashMap<String, String>;

static PLACEHOLDER: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();

fn placeholder_re() -> &'static Regex {
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{([^{}]+)\}").unwrap())
}

/// Render `template`, substituting `{name}` placeholders from `state`.
/// `{node_id.output}` and `{node_id}` are equivalent lookups. A key with no
/// entry in `state` is left as the literal placeholder text so that
/// observers can detect an unresolved reference rather than silently seeing
/// an empty string.
pub fn render(template: &str, state: &TemplateState) -> String {
    placeholder_re()
        .replace_all(template, |caps: &regex::Captures| {
            let key = caps[1].trim();
            resolve(key, state).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn resolve(key: &str, state: &TemplateState) -> Option<String> {
    if let Some(value) = state.get(key) {
        return Some(value.clone());
    }
    if let Some(node_id) = key.strip_suffix(".output") {
        return state.get(node_id).cloned();
    }
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Contains,
    Eq,
    Ne,
    Matches,
}

const OPERATORS: &[(&str, Operator)] =
    &[(" contains ", Operator::Contains), (" == ", Operator::Eq), (" != ", Operator::Ne), (" matches ", Operator::Matches)];

/// Evaluate a condition of the shape `<A> <op> <B>` after substituting
/// `state` into both sides. Unknown syntax (no recognized operator found)
/// evaluates to false rather than erroring, per the predicate language's
/// closed operator set.
pub fn evaluate(condition: &str, state: &TemplateState) -> bool {
    for (token, op) in OPERATORS {
        if let Some((lhs, rhs)) = condition.split_once(token) {
            let lhs = render(lhs.trim(), state);
            let rhs = render(rhs.trim(), state);
            return match op {
                Operator::Contains => lhs.contains(&rhs),
                Operator::Eq => lhs == rhs,
                Operator::Ne => lhs != rhs,
                Operator::Matches => Regex::new(&rhs).map(|re| re.is_match(&lhs)).unwrap_or(false),
            };
        }
    }
    false
}
