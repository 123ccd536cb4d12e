use std::sync::LazyLock;

use ammonia::Builder;

static SANITIZER: LazyLock<Builder<'static>> = LazyLock::new(|| {
    let mut builder = Builder::default();
    builder
        // Code block window controls and task list checkboxes
        .add_tags(["svg", "ellipse", "use", "input"])
        .add_generic_attributes(["style", "class", "data-index"])
        .add_tag_attributes("a", ["href", "title", "target"])
        .add_tag_attributes("img", ["src", "alt", "title"])
        .add_tag_attributes("use", ["href", "xlink:href"])
        .add_tag_attributes("svg", ["width", "height", "viewBox"])
        .add_tag_attributes(
            "ellipse",
            ["cx", "cy", "rx", "ry", "stroke", "stroke-width", "fill"],
        )
        .add_tag_attributes("input", ["type", "checked", "disabled"]);
    builder
});

/// Strip everything outside the allow-list while keeping inline styles.
///
/// Scripts, event handler attributes and unknown tags are removed silently.
/// Sanitizing already sanitized output returns it unchanged.
pub fn sanitize_html(html: &str) -> String {
    SANITIZER.clean(html).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn scripts_and_handlers_are_removed() {
        let dirty = r#"<p style="color: red; " onclick="evil()">hi<script>alert(1)</script></p>"#;
        assert_eq!(sanitize_html(dirty), r#"<p style="color: red; ">hi</p>"#);
    }

    #[test]
    fn styling_attributes_survive() {
        let html = r#"<span class="x" data-index="1" style="color: blue; ">t <sup>[1]</sup></span>"#;
        assert_eq!(sanitize_html(html), html);
    }

    #[test]
    fn window_controls_survive() {
        let html = concat!(
            r#"<svg width="45px" height="13px" viewBox="0 0 450 130">"#,
            r#"<ellipse cx="50" cy="65" rx="50" ry="52" fill="red"></ellipse></svg>"#
        );
        let clean = sanitize_html(html);
        assert!(clean.contains(r#"viewBox="0 0 450 130""#), "{clean}");
        assert!(clean.contains(r#"<ellipse cx="50""#), "{clean}");
    }

    #[test]
    fn sanitizing_is_idempotent() {
        let dirty = concat!(
            r#"<h1 style="margin: 0; ">T</h1><a href="https://mp.weixin.qq.com/s" target="_blank">x</a>"#,
            r#"<img src="javascript:alert(1)" onerror="x()"><iframe src="//x"></iframe><b>ok</b>"#
        );
        let once = sanitize_html(dirty);
        assert_eq!(sanitize_html(&once), once);
        assert!(!once.contains("javascript:"));
        assert!(!once.contains("iframe"));
    }
}
