use postport::{
    apply_manual_replacements, clean_escapes, join_blockquotes, normalize_footnotes, normalize_markdown,
    normalize_multiplication, promote_inline_math_blocks, relocate_quote_citations, standardize_abbreviations,
    strip_warning_banner, tighten_bullets, tighten_list_spacing, unescape_html, wrap_quote_admonitions,
    HashToSlugTable, Step, PIPELINE, WARNING_SENTINEL,
};

fn links() -> HashToSlugTable {
    let mut t = HashToSlugTable::new();
    t.insert("abc123", "my-post");
    t
}

/// Footnote markers from the export become Markdown footnotes:
/// `[\[1\]](#fn1)` -> `[^1]` and `1. **[^](#fnref1)** text` -> `[^1]: text`.
#[test]
fn footnotes_round_trip() {
    let src = "Claim[\\[1\\]](#fn1).\n\n1. **[^](#fnref1)** The source.";
    assert_eq!(normalize_footnotes(src), "Claim[^1].\n\n[^1]: The source.");
}

/// A closing parenthesis glued to a word gets a separating space.
#[test]
fn footnotes_pass_spaces_after_links() {
    assert_eq!(normalize_footnotes("[link](url)word"), "[link](url) word");
    assert_eq!(normalize_footnotes("[link](url) word"), "[link](url) word");
}

/// Doubled backslashes collapse, then escaped brackets, parens and dashes are unescaped.
#[test]
fn escapes_are_cleaned() {
    assert_eq!(clean_escapes(r"a \\ b \[x\] \(y\) \-z"), r"a \ b [x] (y) -z");
}

/// Blank lines before list items (bulleted or numbered) are removed.
#[test]
fn list_items_are_tightened() {
    let src = "Intro:\n\n* one\n\n* two\n\n1. three";
    assert_eq!(tighten_list_spacing(src), "Intro:\n* one\n* two\n1. three");
}

/// A blank line between two quote lines becomes a bare `>`.
#[test]
fn blockquotes_are_made_contiguous() {
    assert_eq!(join_blockquotes("> a\n\n> b\n"), "> a\n>\n> b\n");
}

/// Quotes of three or more lines get a `[!quote]` header; shorter quotes and
/// existing callouts are untouched.
#[test]
fn long_quotes_become_admonitions() {
    assert_eq!(
        wrap_quote_admonitions("> a\n> b\n> c\n\ntext\n"),
        "> [!quote]\n>\n> a\n> b\n> c\n\ntext\n"
    );
    assert_eq!(wrap_quote_admonitions("> a\n> b\n\ntext\n"), "> a\n> b\n\ntext\n");
    let callout = "> [!note]\n> a\n> b\n";
    assert_eq!(wrap_quote_admonitions(callout), callout);
}

/// A trailing `— [Source](url)` moves onto the callout header; the bare `>`
/// line before it disappears.
#[test]
fn link_citation_moves_to_header() {
    let src = "> [!quote]\n>\n> Body line\n>\n> — [Source](http://example.com)\n\nAfter\n";
    assert_eq!(
        relocate_quote_citations(src),
        "> [!quote] [Source](http://example.com)\n>\n> Body line\n\nAfter\n"
    );
}

/// Plain-text attributions move too.
#[test]
fn plain_citation_moves_to_header() {
    let src = "> [!quote]\n>\n> Body\n> -- Someone Famous\n";
    assert_eq!(relocate_quote_citations(src), "> [!quote] Someone Famous\n>\n> Body\n");
}

/// A bare `>` line directly before ordinary text is dropped even outside callouts.
#[test]
fn dangling_bare_quote_line_is_dropped() {
    assert_eq!(relocate_quote_citations("> quote\n>\nText\n"), "> quote\nText\n");
}

/// `eg`/`E.G.`/`ie.` variants collapse to `e.g.`/`i.e.`; canonical forms are unchanged.
#[test]
fn abbreviations_are_standardized() {
    assert_eq!(
        standardize_abbreviations("eg this, E.G. that, i.e. other, ie. done"),
        "e.g. this, e.g. that, i.e. other, i.e. done"
    );
    assert_eq!(standardize_abbreviations("e.g. fine"), "e.g. fine");
}

/// Products of numbers (and `n`, and `coeff`) use the multiplication sign.
#[test]
fn multiplication_uses_times_sign() {
    assert_eq!(normalize_multiplication("5 * 5"), "5×5");
    assert_eq!(normalize_multiplication(r"\(3\times4\)"), "3×4");
    assert_eq!(normalize_multiplication("coeff*x"), "coeff×x");
    assert_eq!(normalize_multiplication("n*2"), "n×2");
    assert_eq!(normalize_multiplication("1,000 * 2.5"), "1,000×2.5");
}

/// Chained products settle in a single call.
#[test]
fn multiplication_chains_reach_fixed_point() {
    assert_eq!(normalize_multiplication("2*3*4"), "2×3×4");
}

/// Emphasis and non-numeric operands are left alone.
#[test]
fn multiplication_ignores_non_products() {
    assert_eq!(normalize_multiplication("a * b"), "a * b");
    assert_eq!(normalize_multiplication("**bold** text"), "**bold** text");
}

/// Blank lines between bullets and before the first bullet are removed.
#[test]
fn bullets_are_tightened() {
    assert_eq!(tighten_bullets("Intro\n\n* a\n\n* b\n"), "Intro\n* a\n* b\n");
}

/// A line holding only `$...$` becomes `$$...$$`; inline math in prose stays.
#[test]
fn lone_inline_math_is_promoted() {
    assert_eq!(
        promote_inline_math_blocks("$x^2$\n  $y$  \ntext $z$\n"),
        "$$x^2$$\n$$y$$\ntext $z$\n"
    );
}

/// Everything up to and including the banner's closing sentence is dropped.
#[test]
fn warning_banner_is_stripped() {
    let src = format!("**Warning: this post {WARNING_SENTINEL}Real body\n");
    assert_eq!(strip_warning_banner(&src), "Real body\n");
    assert_eq!(strip_warning_banner("No banner\n"), "No banner\n");
}

#[test]
fn html_entities_are_decoded() {
    assert_eq!(unescape_html("a &amp; b &lt;c&gt;"), "a & b <c>");
}

/// Decoding is a single level: a doubly escaped entity needs a second run.
#[test]
fn nested_entities_decode_one_level_per_run() {
    let once = unescape_html("Tom &amp;amp; Jerry");
    assert_eq!(once, "Tom &amp; Jerry");
    assert_eq!(unescape_html(&once), "Tom & Jerry");
}

/// Known export casualties are patched; the empty placeholder entry changes nothing.
#[test]
fn manual_replacements_apply_in_order() {
    assert_eq!(
        apply_manual_replacements("Visit lesserwrong.com iff\u{a0}ok"),
        "Visit lesswrong.com IFF ok"
    );
    assert_eq!(apply_manual_replacements("* * *"), "<hr/>");
    assert_eq!(apply_manual_replacements("<|endoftext|>"), "<endoftext>");
    assert_eq!(apply_manual_replacements("plain text"), "plain text");
}

/// Every pass maps empty input to empty output, and so does the whole chain.
#[test]
fn empty_input_stays_empty() {
    let table = links();
    for (name, step) in PIPELINE {
        let out = match step {
            Step::Text(pass) => pass(""),
            Step::ResolveLinks => postport::resolve_links("", &table),
        };
        assert_eq!(out, "", "pass {name} produced output from nothing");
    }
    assert_eq!(normalize_markdown("", &table), "");
}

/// Running the chain on its own output changes nothing.
#[test]
fn full_chain_is_idempotent() {
    let src = "Intro paragraph with a [link](https://www.lesswrong.com/posts/abc123/title#section) and eg a claim[\\[1\\]](#fn1).\n\
\n\
> First line\n\
> Second line\n\
> Third line\n\
> — [Source](http://example.com)\n\
\n\
* one\n\
\n\
* two\n\
\n\
The product 5 * 5 is big.\n\
\n\
$x^2$\n\
\n\
1. **[^](#fnref1)** The footnote.\n";

    let table = links();
    let once = normalize_markdown(src, &table);
    assert_eq!(
        once,
        "Intro paragraph with a [link](/my-post#section) and e.g. a claim[^1].\n\
\n\
> [!quote] [Source](http://example.com)\n\
>\n\
> First line\n\
> Second line\n\
> Third line\n\
* one\n\
* two\n\
\n\
The product 5×5 is big.\n\
\n\
$$\n\
x^2\n\
$$\n\
\n\
[^1]: The footnote.\n"
    );
    assert_eq!(normalize_markdown(&once, &table), once);
}
