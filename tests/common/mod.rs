#![allow(dead_code)]

use postport::Tables;
use serde_json::{json, Value};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// A minimal post record as it appears in the export's `data.posts.results`.
/// `hash` is the second-to-last segment of its page URL.
pub fn post(slug: &str, hash: &str, title: &str, markdown: &str) -> Value {
    json!({
        "slug": slug,
        "title": title,
        "draft": false,
        "pageUrl": format!("https://www.lesswrong.com/posts/{hash}/{slug}"),
        "linkUrl": format!("https://www.lesswrong.com/posts/{hash}/{slug}"),
        "postedAt": "2019-07-29T23:55:08.370Z",
        "modifiedAt": "2020-01-02T03:04:05.000Z",
        "baseScore": 42,
        "af": false,
        "contents": { "markdown": markdown, "editedAt": "2019-08-01T10:00:00.000Z" },
        "coauthors": [],
        "tags": [{ "name": "AI" }, { "name": "Personal" }],
    })
}

/// Same record with `contents: null`, which the importer skips.
pub fn post_without_contents(slug: &str, hash: &str, title: &str) -> Value {
    let mut p = post(slug, hash, title, "");
    p["contents"] = Value::Null;
    p
}

fn dump(posts: &[Value]) -> Value {
    json!({ "data": { "posts": { "results": posts } } })
}

/// Write a plain JSON export to `<dir>/posts.json`.
pub fn write_dump(dir: &Path, posts: &[Value]) -> PathBuf {
    let path = dir.join("posts.json");
    fs::write(&path, serde_json::to_vec(&dump(posts)).unwrap()).unwrap();
    path
}

/// Write a zstd-compressed export to `<dir>/posts.json.zst`.
pub fn write_dump_zst(dir: &Path, posts: &[Value]) -> PathBuf {
    let path = dir.join("posts.json.zst");
    let f = File::create(&path).unwrap();
    let mut enc = zstd::stream::write::Encoder::new(f, 3).unwrap();
    enc.write_all(&serde_json::to_vec(&dump(posts)).unwrap()).unwrap();
    enc.finish().unwrap();
    path
}

/// Tables with a permalink for every slug in `slugs` (`<slug>-page`), and an
/// allow-list keeping only `AI` (renamed to `AI Alignment`).
pub fn tables_for(slugs: &[&str]) -> Tables {
    let mut t = Tables::default()
        .with_keep_tags(["AI"])
        .with_tag_rename("AI", "AI Alignment");
    for slug in slugs {
        t = t.with_permalink(*slug, format!("{slug}-page"));
    }
    t
}

pub fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

/// Body of a written document (everything after the closing fence).
pub fn body_of(doc: &str) -> &str {
    let (_, body) = postport::parse_frontmatter(doc).expect("document has frontmatter");
    body
}
