//! Minimal HTML helpers shared by the classifier and placeholder apps.

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; max-width: 720px; margin: 2rem auto; padding: 0 1rem; color: #222; }
h1 { font-size: 1.6rem; }
.flash { background: #fdecea; border: 1px solid #f5c2c0; padding: .6rem .9rem; border-radius: 4px; }
form { margin: 1.5rem 0; }
img.preview { max-width: 100%; max-height: 360px; border-radius: 4px; }
table { border-collapse: collapse; width: 100%; margin-top: 1rem; }
td, th { padding: .4rem .6rem; border-bottom: 1px solid #eee; text-align: left; }
td.score { text-align: right; font-variant-numeric: tabular-nums; }
"#;

/// Escapes text for use in HTML element content and quoted attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Wraps an already-rendered body in the common page shell. `title` is escaped, `body` is not.
pub fn page(title: &str, body: &str) -> String {
    format!(
        "<!doctype html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{title}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n{body}\n</body>\n</html>\n",
        title = escape(title),
    )
}
