//! Links to other imported posts become site-relative (`/<slug>#<fragment>`).
//!
//! The table is built once from the whole export before any body is
//! rewritten, then shared read-only by every worker.

use crate::config::Tables;
use crate::dump::PostRecord;
use ahash::AHashMap;
use std::ops::Range;

/// Host markers identifying the export site and its mirror.
const HOST_MARKERS: [&str; 2] = ["lesswrong", "alignmentforum"];

/// Post hash (second-to-last path segment of a post URL) -> output slug.
/// Iteration follows insertion order, which is dump order.
#[derive(Clone, Debug, Default)]
pub struct HashToSlugTable {
    entries: Vec<(String, String)>,
    index: AHashMap<String, usize>,
}

impl HashToSlugTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Phase one: every post with contents contributes its hash. The slug is
    /// the post's permalink when one is configured, else its raw slug.
    pub fn from_posts(posts: &[PostRecord], tables: &Tables) -> Self {
        let mut table = Self::new();
        for post in posts.iter().filter(|p| p.has_contents()) {
            let Some(hash) = post.page_url.as_deref().and_then(page_hash) else {
                tracing::debug!(slug = %post.slug, "no page url hash, not linkable");
                continue;
            };
            let slug = tables.permalink_for(&post.slug).unwrap_or(post.slug.as_str());
            table.insert(hash, slug);
        }
        tracing::debug!("Link table holds {} posts", table.len());
        table
    }

    /// A repeated hash keeps its first position and takes the newer slug.
    pub fn insert(&mut self, hash: impl Into<String>, slug: impl Into<String>) {
        let hash = hash.into();
        let slug = slug.into();
        match self.index.get(&hash) {
            Some(&i) => self.entries[i].1 = slug,
            None => {
                self.index.insert(hash.clone(), self.entries.len());
                self.entries.push((hash, slug));
            }
        }
    }

    pub fn get(&self, hash: &str) -> Option<&str> {
        self.index.get(hash).map(|&i| self.entries[i].1.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(h, s)| (h.as_str(), s.as_str()))
    }

    /// Site-relative replacement for `url`, or `None` to leave it untouched.
    /// Comment permalinks are never rewritten.
    pub fn resolve(&self, url: &str) -> Option<String> {
        if url.contains("commentId=") {
            return None;
        }
        let marker = HOST_MARKERS.iter().filter_map(|m| url.find(m)).min()?;
        let after_host = &url[marker..];
        for (hash, slug) in self.iter() {
            let Some(at) = after_host.find(hash) else { continue };
            let tail = &after_host[at + hash.len()..];
            return Some(match tail.split_once('#') {
                Some((_, fragment)) if !fragment.is_empty() => format!("/{slug}#{fragment}"),
                _ => format!("/{slug}"),
            });
        }
        None
    }
}

/// `https://host/posts/<hash>/<title>` -> `<hash>`
pub fn page_hash(page_url: &str) -> Option<&str> {
    page_url.rsplit('/').nth(1).filter(|h| !h.is_empty())
}

/// Byte ranges of the destinations of `[text](destination)` links. Link text
/// may not contain brackets; destinations may nest balanced parentheses.
pub fn link_destinations(md: &str) -> Vec<Range<usize>> {
    let b = md.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    while let Some(off) = md[i..].find('[') {
        let open = i + off;
        let mut j = open + 1;
        while j < b.len() && b[j] != b'[' && b[j] != b']' {
            j += 1;
        }
        if j >= b.len() {
            break;
        }
        if b[j] == b'[' {
            i = j;
            continue;
        }
        if j == open + 1 || b.get(j + 1) != Some(&b'(') {
            i = j + 1;
            continue;
        }

        let start = j + 2;
        let mut depth = 1usize;
        let mut k = start;
        while k < b.len() {
            match b[k] {
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                _ => {}
            }
            k += 1;
        }
        if k >= b.len() || k == start {
            i = j + 1;
            continue;
        }
        out.push(start..k);
        i = k + 1;
    }
    out
}

/// Rewrite every resolvable link destination in place. Everything else is
/// copied byte for byte.
pub fn resolve_links(md: &str, table: &HashToSlugTable) -> String {
    if table.is_empty() {
        return md.to_string();
    }
    let mut out = String::with_capacity(md.len());
    let mut last = 0;
    for span in link_destinations(md) {
        if let Some(local) = table.resolve(&md[span.clone()]) {
            out.push_str(&md[last..span.start]);
            out.push_str(&local);
            last = span.end;
        }
    }
    out.push_str(&md[last..]);
    out
}
