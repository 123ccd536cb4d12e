use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;

static EM_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9.]+)em").expect("valid em regex"));

/// Convert a camelCase property name to its kebab-case CSS form.
///
/// ```
/// use mdpaste::css::camel_to_kebab;
///
/// assert_eq!(camel_to_kebab("borderLeftWidth"), "border-left-width");
/// assert_eq!(camel_to_kebab("color"), "color");
/// ```
pub fn camel_to_kebab(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for ch in name.chars() {
        if ch.is_ascii_uppercase() {
            out.push('-');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Whether a camelCase property holds a size that should become absolute.
pub fn is_size_property(name: &str) -> bool {
    name == "fontSize" || name.to_ascii_lowercase().contains("size")
}

/// Rewrite the first `<n>em` in `value` as pixels relative to `base_px`.
///
/// Returns `None` when the value carries no parseable em length. Text around
/// the length is preserved.
pub fn em_to_px(value: &str, base_px: f64) -> Option<String> {
    let caps = EM_VALUE.captures(value)?;
    let whole = caps.get(0)?;
    let em: f64 = caps[1].parse().ok()?;
    let px = format!("{:.1}px", em * base_px);

    let mut out = String::with_capacity(value.len() + 4);
    out.push_str(&value[..whole.start()]);
    out.push_str(&px);
    out.push_str(&value[whole.end()..]);
    Some(out)
}

/// Parse a `prop: value;` list into an ordered map.
///
/// Empty declarations and declarations without a value are skipped. Only the
/// first colon separates name from value, so values such as URLs survive.
pub fn parse_declarations(css: &str) -> IndexMap<String, String> {
    let mut map = IndexMap::new();
    for decl in css.split(';') {
        let Some((name, value)) = decl.split_once(':') else {
            continue;
        };
        let (name, value) = (name.trim(), value.trim());
        if !name.is_empty() && !value.is_empty() {
            map.insert(name.to_string(), value.to_string());
        }
    }
    map
}

/// Serialize declarations as `k: v; ` pairs.
pub fn serialize_declarations<'a, I>(decls: I) -> String
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    let mut out = String::new();
    for (name, value) in decls {
        out.push_str(name);
        out.push_str(": ");
        out.push_str(value);
        out.push_str("; ");
    }
    out
}
