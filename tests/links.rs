#[path = "common/mod.rs"]
mod common;

use common::*;
use postport::{parse_posts, resolve_links, HashToSlugTable};
use serde_json::json;

fn table() -> HashToSlugTable {
    let mut t = HashToSlugTable::new();
    t.insert("abc123", "my-post");
    t
}

/// Links to an imported post become site-relative, keeping the fragment.
#[test]
fn export_links_become_relative() {
    let md = "[text](https://www.lesswrong.com/posts/abc123/title#section)";
    assert_eq!(resolve_links(md, &table()), "[text](/my-post#section)");

    let md = "[text](https://www.alignmentforum.org/posts/abc123/title)";
    assert_eq!(resolve_links(md, &table()), "[text](/my-post)");
}

/// Foreign links, unknown posts and comment permalinks are byte-identical.
#[test]
fn unmatched_links_are_untouched() {
    let md = "[a](https://example.com/abc123) [b](https://www.lesswrong.com/posts/zzz999/other) \
              [c](https://www.lesswrong.com/posts/abc123/title?commentId=42)";
    assert_eq!(resolve_links(md, &table()), md);
}

/// Only link destinations are rewritten, including among nested parentheses.
#[test]
fn surrounding_text_is_preserved() {
    let md = "See https://www.lesswrong.com/posts/abc123/t and [x (y)](https://www.lesswrong.com/posts/abc123/t) \
              then [w](https://en.wikipedia.org/wiki/Foo_(bar)).";
    assert_eq!(
        resolve_links(md, &table()),
        "See https://www.lesswrong.com/posts/abc123/t and [x (y)](/my-post) \
         then [w](https://en.wikipedia.org/wiki/Foo_(bar))."
    );
}

/// The table maps each post's page-URL hash to its permalink, falling back
/// to the raw slug; posts without contents are not linkable.
#[test]
fn table_is_built_from_posts() {
    let posts = vec![
        post("first", "h1", "First", "a"),
        post("second", "h2", "Second", "b"),
        post_without_contents("third", "h3", "Third"),
    ];
    let raw = json!({ "data": { "posts": { "results": posts } } }).to_string();
    let records = parse_posts(&raw).unwrap();
    let tables = tables_for(&["first"]);

    let t = HashToSlugTable::from_posts(&records, &tables);
    assert_eq!(t.len(), 2);
    assert_eq!(t.get("h1"), Some("first-page"));
    assert_eq!(t.get("h2"), Some("second"));
    assert_eq!(t.get("h3"), None);
}

/// The first matching entry, in insertion order, wins.
#[test]
fn first_inserted_hash_wins() {
    let mut t = HashToSlugTable::new();
    t.insert("abc", "short");
    t.insert("abc123", "long");
    assert_eq!(t.resolve("https://www.lesswrong.com/posts/abc123/x").as_deref(), Some("/short"));

    t.insert("abc", "renamed");
    assert_eq!(t.len(), 2);
    assert_eq!(t.resolve("https://www.lesswrong.com/posts/abc123/x").as_deref(), Some("/renamed"));
}

/// An empty table leaves every document alone.
#[test]
fn empty_table_is_a_no_op() {
    let md = "[t](https://www.lesswrong.com/posts/abc123/x)";
    assert_eq!(resolve_links(md, &HashToSlugTable::new()), md);
}
