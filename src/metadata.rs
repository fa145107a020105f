//! Metadata extraction: maps a raw post record onto the canonical, ordered
//! frontmatter mapping.

use crate::config::{Tables, REFERRAL_PREFIX};
use crate::dates::published_date;
use crate::dump::PostRecord;
use crate::error::{Diagnostic, ImportError};
use percent_encoding::percent_decode_str;
use serde_json::Value;

/// A frontmatter value. Rendering per variant lives in `frontmatter`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MetadataValue {
    Text(String),
    Bool(bool),
    List(Vec<String>),
}

impl MetadataValue {
    /// Numbers keep their decimal text; null becomes `null`.
    pub fn from_json(v: &Value) -> Self {
        match v {
            Value::Bool(b) => MetadataValue::Bool(*b),
            Value::Array(items) => MetadataValue::List(items.iter().map(json_text).collect()),
            other => MetadataValue::Text(json_text(other)),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

fn json_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        MetadataValue::Text(s.to_string())
    }
}
impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        MetadataValue::Text(s)
    }
}
impl From<bool> for MetadataValue {
    fn from(b: bool) -> Self {
        MetadataValue::Bool(b)
    }
}
impl From<Vec<String>> for MetadataValue {
    fn from(v: Vec<String>) -> Self {
        MetadataValue::List(v)
    }
}

/// Insertion-ordered key/value mapping. Re-inserting a key overwrites the
/// value in place, so callers control the rendered order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetadataMap {
    entries: Vec<(String, MetadataValue)>,
}

impl MetadataMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<MetadataValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(MetadataValue::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetadataValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// (target key, source field) copied verbatim before anything else.
pub const FIELD_RENAMES: &[(&str, &str)] = &[
    ("permalink", "slug"),
    ("lw-was-draft-post", "draft"),
    ("lw-is-af", "af"),
    ("lw-is-debate", "debate"),
    ("lw-page-url", "pageUrl"),
    ("lw-linkpost-url", "linkUrl"),
    ("lw-is-question", "question"),
    ("lw-posted-at", "postedAt"),
    ("lw-last-modification", "modifiedAt"),
    ("lw-curation-date", "curatedDate"),
    ("lw-frontpage-date", "frontpageDate"),
    ("lw-was-unlisted", "unlisted"),
    ("lw-is-shortform", "shortform"),
    ("lw-num-comments-on-upload", "commentCount"),
    ("lw-base-score", "baseScore"),
    ("lw-vote-count", "voteCount"),
    ("af-base-score", "afBaseScore"),
    ("af-num-comments-on-upload", "afCommentCount"),
];

/// Result of a successful extraction: the mapping plus anything the caller
/// must surface for review.
#[derive(Clone, Debug)]
pub struct Extraction {
    pub metadata: MetadataMap,
    pub warnings: Vec<Diagnostic>,
}

pub struct MetadataExtractor<'a> {
    tables: &'a Tables,
    site_dates: bool,
}

impl<'a> MetadataExtractor<'a> {
    pub fn new(tables: &'a Tables) -> Self {
        Self { tables, site_dates: true }
    }

    /// Toggle `date_published` / `original_url`.
    pub fn site_dates(mut self, yes: bool) -> Self {
        self.site_dates = yes;
        self
    }

    pub fn extract(&self, post: &PostRecord) -> Result<Extraction, ImportError> {
        let mut meta = MetadataMap::new();
        let mut warnings = Vec::new();

        for (key, source) in FIELD_RENAMES {
            meta.insert(*key, MetadataValue::from_json(&post.field(source)));
        }

        let permalink = self
            .tables
            .permalink_for(&post.slug)
            .ok_or_else(|| ImportError::MissingPermalink { slug: post.slug.clone() })?;
        meta.insert("permalink", permalink);

        let is_draft = post.draft.unwrap_or(false);
        meta.insert("publish", if is_draft { "false" } else { "true" });

        // Quoted so a colon is never read as a mapping delimiter.
        meta.insert("title", format!("\"{}\"", post.title.replace('"', "'")));

        if let Some(contents) = &post.contents {
            let edited = contents.edited_at.clone().unwrap_or(Value::Null);
            meta.insert("lw-latest-edit", MetadataValue::from_json(&edited));

            let is_linkpost = post.page_url != post.link_url;
            meta.insert("lw-is-linkpost", is_linkpost);
            if is_linkpost {
                let target = post.link_url.as_deref().map(strip_referral_url).unwrap_or_default();
                meta.insert("lw-linkpost-url", target);
            }
        }

        let coauthors: Vec<&str> = post
            .coauthors
            .iter()
            .flatten()
            .map(|c| c.display_name.as_str())
            .collect();
        meta.insert("authors", join_authors(self.tables, &coauthors));

        let names: Vec<&str> = post.tags.iter().flatten().map(|t| t.name.as_str()).collect();
        let tags = filter_tags(self.tables, &names);
        if tags.is_empty() {
            tracing::warn!("ALERT: \"{}\" has no tags", post.title);
            warnings.push(Diagnostic::MissingTags { slug: post.slug.clone(), title: post.title.clone() });
        }
        meta.insert("tags", tags);
        meta.insert("aliases", vec![post.slug.clone()]);

        if let Some(link) = post.podcast_episode.as_ref().and_then(|e| e.episode_link.as_ref()) {
            meta.insert("lw-podcast-link", MetadataValue::from_json(link));
        }
        if let Some(seq) = &post.sequence {
            meta.insert("lw-sequence-title", json_or_null(&seq.title));
            meta.insert("lw-sequence-image-grid", json_or_null(&seq.grid_image_id));
            meta.insert("lw-sequence-image-banner", json_or_null(&seq.banner_image_id));
        }
        if let Some(prev) = &post.prev_post {
            meta.insert("prev-post-slug", prev.slug.as_str());
        }
        if let Some(next) = &post.next_post {
            meta.insert("next-post-slug", next.slug.as_str());
        }
        if let Some(review) = &post.review_winner {
            meta.insert("lw-review-art", json_or_null(&review.review_winner_art));
            meta.insert("lw-review-competitor-count", json_or_null(&review.competitor_count));
            meta.insert("lw-review-year", json_or_null(&review.review_year));
            meta.insert("lw-review-ranking", json_or_null(&review.review_ranking));
            meta.insert("lw-review-category", json_or_null(&review.category));
        }

        if self.site_dates {
            self.add_site_dates(post, &mut meta, &mut warnings);
        }

        Ok(Extraction { metadata: meta, warnings })
    }

    fn add_site_dates(&self, post: &PostRecord, meta: &mut MetadataMap, warnings: &mut Vec<Diagnostic>) {
        match post.field("postedAt") {
            Value::String(posted_at) => match published_date(&posted_at) {
                Some(date) => meta.insert("date_published", date),
                None => {
                    tracing::warn!("{}: unparseable postedAt '{}'", post.slug, posted_at);
                    warnings.push(Diagnostic::MalformedDate {
                        context: post.slug.clone(),
                        key: "lw-posted-at".to_string(),
                        value: posted_at,
                    });
                }
            },
            _ => tracing::debug!("{}: no postedAt, leaving date_published unset", post.slug),
        }
        let page_url = meta.get("lw-page-url").cloned().unwrap_or(MetadataValue::Text("null".into()));
        meta.insert("original_url", page_url);
    }
}

fn json_or_null(v: &Option<Value>) -> MetadataValue {
    MetadataValue::from_json(v.as_ref().unwrap_or(&Value::Null))
}

/// Outbound link target, or `""` when the URL is not a referral redirect.
pub fn strip_referral_url(url: &str) -> String {
    match url.strip_prefix(REFERRAL_PREFIX) {
        Some(target) => percent_decode_str(target).decode_utf8_lossy().into_owned(),
        None => String::new(),
    }
}

/// Primary author first, aliases applied, Oxford comma for three or more.
pub fn join_authors(tables: &Tables, coauthors: &[&str]) -> String {
    let mut authors: Vec<&str> = vec![tables.primary_author.as_str()];
    for &name in coauthors {
        let name = tables.username_aliases.get(name).map(String::as_str).unwrap_or(name);
        authors.push(name);
    }
    match authors.as_slice() {
        [only] => only.to_string(),
        [first, second] => format!("{first} and {second}"),
        [init @ .., last] => format!("{}, and {last}", init.join(", ")),
        [] => String::new(),
    }
}

/// Allow-list, rename, hyphenate, dedupe. Input order is preserved.
pub fn filter_tags(tables: &Tables, names: &[&str]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for &name in names.iter().filter(|n| tables.keep_tags.contains(**n)) {
        let renamed = tables.tag_renames.get(name).map(String::as_str).unwrap_or(name);
        let tag = renamed.replace(' ', "-");
        if !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}
