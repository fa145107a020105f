//! Display-math normalization for the site's Markdown math renderer.

use regex::{Captures, Regex};
use std::sync::LazyLock;

static BEGIN_ENV: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)(^|[^$])\$\\begin\{(align|equation)\}").unwrap());
static END_ENV: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\end\{(align|equation)\} *\$(\$)?").unwrap());
static TRAILING_BACKSLASH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)([^\\])\\$").unwrap());

/// `$\begin{align}..\end{align}$` -> display math on its own lines, and a lone
/// backslash at line end becomes a LaTeX line break.
pub fn normalize_display_math(md: &str) -> String {
    let md = BEGIN_ENV.replace_all(md, |c: &Captures| format!("{}$$\\begin{{{}}}", &c[1], &c[2]));
    let md = END_ENV.replace_all(&md, |c: &Captures| match c.get(2) {
        Some(_) => c[0].to_string(),
        None => format!("\\end{{{}}}$$", &c[1]),
    });
    let md = pad_display_delimiters(&md);
    TRAILING_BACKSLASH.replace_all(&md, r"${1}\\").into_owned()
}

/// Newline after every `$$` not already followed by one, and before every
/// `$$` not already preceded by one. Text edges are left alone.
fn pad_display_delimiters(md: &str) -> String {
    let b = md.as_bytes();
    let mut out = String::with_capacity(md.len() + 16);
    let mut last = 0;
    for p in 1..b.len() {
        let after_open = p >= 2 && &b[p - 2..p] == b"$$" && b[p] != b'\n';
        let before_close = b[p - 1] != b'\n' && b[p..].starts_with(b"$$");
        if after_open || before_close {
            out.push_str(&md[last..p]);
            out.push('\n');
            last = p;
        }
    }
    out.push_str(&md[last..]);
    out
}
