//! Markdown rewrite passes. Each pass is a pure `&str -> String` that returns
//! its input unchanged when nothing matches. `PIPELINE` fixes their order.

use crate::latex::normalize_display_math;
use crate::links::{resolve_links, HashToSlugTable};
use regex::{Captures, NoExpand, Regex};
use std::sync::LazyLock;

/// One step of the body pipeline. Link resolution is the only step that
/// needs state beyond the text itself.
#[derive(Clone, Copy)]
pub enum Step {
    Text(fn(&str) -> String),
    ResolveLinks,
}

/// Body rewrite order. Later passes rely on the output shape of earlier ones.
pub const PIPELINE: &[(&str, Step)] = &[
    ("manual-replacements", Step::Text(apply_manual_replacements)),
    ("strip-warning-banner", Step::Text(strip_warning_banner)),
    ("unescape-html", Step::Text(unescape_html)),
    ("footnotes", Step::Text(normalize_footnotes)),
    ("unescape-markdown", Step::Text(clean_escapes)),
    ("list-spacing", Step::Text(tighten_list_spacing)),
    ("blockquote-contiguity", Step::Text(join_blockquotes)),
    ("quote-admonitions", Step::Text(wrap_quote_admonitions)),
    ("quote-citations", Step::Text(relocate_quote_citations)),
    ("internal-links", Step::ResolveLinks),
    ("abbreviations", Step::Text(standardize_abbreviations)),
    ("multiplication", Step::Text(normalize_multiplication)),
    ("bullet-spacing", Step::Text(tighten_bullets)),
    ("inline-math-blocks", Step::Text(promote_inline_math_blocks)),
    ("display-math", Step::Text(normalize_display_math)),
];

/// Run the whole body chain. The link table must already hold every post.
pub fn normalize_markdown(md: &str, links: &HashToSlugTable) -> String {
    let mut text = md.to_string();
    for (name, step) in PIPELINE {
        text = match step {
            Step::Text(pass) => pass(&text),
            Step::ResolveLinks => resolve_links(&text, links),
        };
        tracing::trace!(pass = name, len = text.len(), "pass done");
    }
    text
}

// ---------------- 1. manual replacements ----------------

enum Replacement {
    Literal(&'static str, &'static str),
    Pattern(&'static str, &'static str),
}

use Replacement::{Literal, Pattern};

/// Known conversion casualties in the export, fixed one by one. Order matters.
const MANUAL_REPLACEMENTS: &[Replacement] = &[
    Literal("Hoffmann,Ruettler,Nieder(2011) AnimBehav.pdf", "Hoffmann,Ruettler,Nieder(2011)AnimBehav.pdf"),
    Literal("is_in", "is _in"),
    Literal("<em>openai.com/o</em>penai-five/", "openai.com/openai-five/"),
    Literal("(<em>h</em>ttps://", "(https://"),
    Literal("茂", "ï"),
    // Placeholder for a glyph lost before double f; kept so the table lines up.
    Literal("", ""),
    Literal("◻️", "∎"),
    Literal("lesserwrong.com", "lesswrong.com"),
    Pattern(r"\\DeclareMathOperator\*?\{\\argmax\}\{arg\\,max\}", ""),
    Pattern(r"\\DeclareMathOperator\*?\{\\min\}\{min\\,min\}", ""),
    Literal("https://i.stack.imgur.com", "https://i.sstatic.net"),
    Literal("✔️", "✓"),
    Pattern(r"\biff\b", "IFF"),
    Literal("_._", r"\."),
    Literal("\u{a0}", " "),
    Literal("* * *", "<hr/>"),
    Literal("<|endoftext|>", "<endoftext>"),
    Literal("\" wedding\"", "“ wedding”"),
    Literal("\" \"", "“ ”"),
    Literal("Position 0", "Pos. 0"),
    Literal("**Prompt given to the model**", "Prompt given to the model"),
    Literal("2019/2020", "2019 & 2020"),
    Literal("_ [_Anki_](https://apps.ankiweb.net/) _.", "[Anki](https://apps.ankiweb.net/)."),
];

static MANUAL_RES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    MANUAL_REPLACEMENTS
        .iter()
        .map(|r| match r {
            Literal(from, to) => (Regex::new(&regex::escape(from)).unwrap(), *to),
            Pattern(pat, to) => (Regex::new(pat).unwrap(), *to),
        })
        .collect()
});

pub fn apply_manual_replacements(md: &str) -> String {
    let mut out = md.to_string();
    for (re, to) in MANUAL_RES.iter() {
        out = re.replace_all(&out, NoExpand(to)).into_owned();
    }
    out
}

// ---------------- 2. warning banner ----------------

/// Closing sentence of the banner some power-seeking posts carry.
pub const WARNING_SENTINEL: &str =
    "moved away from optimal policies and treated reward functions more realistically.**\n";

/// Keep only what follows the last banner sentinel.
pub fn strip_warning_banner(md: &str) -> String {
    match md.rfind(WARNING_SENTINEL) {
        Some(at) => md[at + WARNING_SENTINEL.len()..].to_string(),
        None => md.to_string(),
    }
}

// ---------------- 3. html entities ----------------

pub fn unescape_html(md: &str) -> String {
    html_escape::decode_html_entities(md).into_owned()
}

// ---------------- 4. footnotes ----------------

static FOOTNOTE_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\\\[([^\]]*)\\\]\]\(.*?\)").unwrap());
static FOOTNOTE_DEF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\.\s*\*{2}\[\^\]\(.*?\)\*{2}\s*").unwrap());
static PAREN_THEN_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\)(\w)").unwrap());

/// `[\[1\]](url)` -> `[^1]`, `1. **[^](url)** text` -> `[^1]: text`.
pub fn normalize_footnotes(md: &str) -> String {
    let md = FOOTNOTE_REF.replace_all(md, "[^${1}]");
    let md = FOOTNOTE_DEF.replace_all(&md, "[^${1}]: ");
    PAREN_THEN_WORD.replace_all(&md, ") ${1}").into_owned()
}

// ---------------- 5. escapes ----------------

static ESCAPED_PUNCT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\\([\[\]()\-])").unwrap());

pub fn clean_escapes(md: &str) -> String {
    let md = md.replace("\\\\", "\\");
    ESCAPED_PUNCT.replace_all(&md, "${1}").into_owned()
}

// ---------------- 6. list spacing ----------------

static GAP_BEFORE_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n(?:[ \t]*\n)+([ \t]*(?:\d+\.|\*) )").unwrap());

pub fn tighten_list_spacing(md: &str) -> String {
    GAP_BEFORE_ITEM.replace_all(md, "\n${1}").into_owned()
}

// ---------------- 7-9. block quotes ----------------

/// An empty line sandwiched between two quote lines becomes a bare `>`.
pub fn join_blockquotes(md: &str) -> String {
    let lines: Vec<&str> = md.split('\n').collect();
    let mut out = Vec::with_capacity(lines.len());
    for (i, &line) in lines.iter().enumerate() {
        let sandwiched = line.is_empty()
            && i > 0
            && i + 1 < lines.len()
            && lines[i - 1].starts_with('>')
            && lines[i + 1].starts_with('>');
        out.push(if sandwiched { ">" } else { line });
    }
    out.join("\n")
}

const ADMONITION_HEADER: &str = "> [!quote]\n>\n";

fn is_quote_line(line: &str) -> bool {
    line.starts_with('>') && line.ends_with('\n')
}

/// Quotes of three or more lines become `[!quote]` callouts, unless they
/// already open with a callout marker.
pub fn wrap_quote_admonitions(md: &str) -> String {
    let lines: Vec<&str> = md.split_inclusive('\n').collect();
    let mut out = String::with_capacity(md.len() + 64);
    let mut i = 0;
    while i < lines.len() {
        if !is_quote_line(lines[i]) {
            out.push_str(lines[i]);
            i += 1;
            continue;
        }
        let start = i;
        while i < lines.len() && is_quote_line(lines[i]) {
            i += 1;
        }
        if i - start >= 3 && !lines[start].starts_with("> [!") {
            out.push_str(ADMONITION_HEADER);
        }
        out.extend(lines[start..i].iter().copied());
    }
    out
}

static CITATION_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^> *[~\-—–]+[ _*]*\[[_*]*(?P<text>[^_*\]]+)[_*]*\]\((?P<url>[^#].*?)\)[ _*]*$").unwrap()
});
static CITATION_PLAIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^> *[~\-—–]+[ _*]*(?P<text>[\w,\-_. ]+?)[ _*]*$").unwrap());
static BARE_QUOTE_BEFORE_TEXT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^> *\n([^>])").unwrap());

fn is_bare_quote(line: &str) -> bool {
    line.trim_end_matches('\n').strip_prefix('>').is_some_and(|rest| rest.trim().is_empty())
}

fn is_quote_header(line: &str) -> bool {
    line.trim_end_matches('\n').trim_end_matches(' ') == "> [!quote]"
}

fn citation_of(line: &str) -> Option<String> {
    if let Some(c) = CITATION_LINK.captures(line) {
        return Some(format!("[{}]({})", &c["text"], &c["url"]));
    }
    CITATION_PLAIN.captures(line).map(|c| c["text"].to_string())
}

/// `block[0]` is the bare `> [!quote]` header.
fn relocate_in_block(block: &[&str]) -> String {
    let Some(cite_at) = (1..block.len()).rev().find(|&j| !is_bare_quote(block[j])) else {
        return block.concat();
    };
    let Some(citation) = citation_of(block[cite_at].trim_end_matches('\n')) else {
        return block.concat();
    };
    let mut body_end = cite_at;
    while body_end > 1 && is_bare_quote(block[body_end - 1]) {
        body_end -= 1;
    }

    let mut out = format!("> [!quote] {citation}\n");
    out.extend(block[1..body_end].iter().copied());
    out.extend(block[cite_at + 1..].iter().copied());
    out
}

/// Move a trailing `— Source` line of a quote callout onto its header, then
/// drop bare `>` lines that dangle before ordinary text.
pub fn relocate_quote_citations(md: &str) -> String {
    let lines: Vec<&str> = md.split_inclusive('\n').collect();
    let mut out = String::with_capacity(md.len());
    let mut i = 0;
    while i < lines.len() {
        if !is_quote_header(lines[i]) {
            out.push_str(lines[i]);
            i += 1;
            continue;
        }
        let start = i;
        i += 1;
        while i < lines.len() && lines[i].starts_with('>') {
            i += 1;
        }
        out.push_str(&relocate_in_block(&lines[start..i]));
    }
    BARE_QUOTE_BEFORE_TEXT.replace_all(&out, "${1}").into_owned()
}

// ---------------- 11. abbreviations ----------------

static EG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\be\.?g\b\.?").unwrap());
static IE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bi\.?e\b\.?").unwrap());

/// `eg`, `E.g`, `e.g.` ... -> `e.g.`; same for `i.e.`.
pub fn standardize_abbreviations(md: &str) -> String {
    let md = EG.replace_all(md, "e.g.");
    IE.replace_all(&md, "i.e.").into_owned()
}

// ---------------- 12. multiplication ----------------

const NUMBER: &str = r"[\-−]?(?:\d{1,3}(?:,?\d{3})*(?:\.\d+)?|\.\d+)";
const TIMES: &str = r"[ \t]*(?:\*|\\times)[ \t]*";

static PRODUCT: LazyLock<Regex> = LazyLock::new(|| {
    let operand = format!(r"(?:{NUMBER}|\bn\b)");
    Regex::new(&format!(
        r"(?P<open>\\\()?(?P<a>{operand}){TIMES}(?P<b>{operand})(?P<close>\\\))?"
    ))
    .unwrap()
});
static COEFF_PRODUCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"\b(coeff){TIMES}(\w+)")).unwrap());

fn render_product(c: &Captures) -> String {
    let product = format!("{}×{}", &c["a"], &c["b"]);
    match (c.name("open"), c.name("close")) {
        (Some(_), Some(_)) | (None, None) => product,
        (Some(open), None) => format!("{}{product}", open.as_str()),
        (None, Some(close)) => format!("{product}{}", close.as_str()),
    }
}

/// `5 * 5`, `\(3\times4\)`, `n*2` -> `5×5`, `3×4`, `n×2`. Repeats until
/// nothing changes so chained products settle in one call.
pub fn normalize_multiplication(md: &str) -> String {
    let mut text = md.to_string();
    loop {
        let next = PRODUCT.replace_all(&text, render_product);
        let next = COEFF_PRODUCT.replace_all(&next, "${1}×${2}").into_owned();
        if next == text {
            return text;
        }
        text = next;
    }
}

// ---------------- 13. bullets ----------------

static GAP_BETWEEN_BULLETS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"( *\*(?:[^*\n][^\n]*)?\n) *\n( *\*(?:[^*\n][^\n]*)?\n)(?: *\n)?").unwrap()
});
static GAP_BEFORE_LIST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n(?: *\n)+( *\*(?: [^\n]*)?\n)").unwrap());

pub fn tighten_bullets(md: &str) -> String {
    let md = GAP_BETWEEN_BULLETS.replace_all(md, "${1}${2}");
    GAP_BEFORE_LIST.replace_all(&md, "\n${1}").into_owned()
}

// ---------------- 14. inline math on its own line ----------------

static LONE_INLINE_MATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^ *\$([^$\n]+)\$ *$").unwrap());

/// A line holding nothing but `$...$` is display math.
pub fn promote_inline_math_blocks(md: &str) -> String {
    LONE_INLINE_MATH
        .replace_all(md, |c: &Captures| format!("$${}$$", &c[1]))
        .into_owned()
}
