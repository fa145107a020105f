//! Export-dump schema and loading. Plain `.json` or zstd-compressed `.json.zst`.

use crate::util::open_with_backoff;
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::io::{BufReader, Read};
use std::path::Path;
use zstd::stream::read::Decoder;

/// One post of the export. Fields the pipeline reasons about are typed; the
/// remaining scalars stay in `fields` so the rename table can copy them.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    pub slug: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub draft: Option<bool>,
    #[serde(default)]
    pub page_url: Option<String>,
    #[serde(default)]
    pub link_url: Option<String>,
    #[serde(default)]
    pub contents: Option<Contents>,
    #[serde(default)]
    pub coauthors: Option<Vec<Coauthor>>,
    #[serde(default)]
    pub tags: Option<Vec<Tag>>,
    #[serde(default)]
    pub podcast_episode: Option<PodcastEpisode>,
    #[serde(default)]
    pub sequence: Option<Sequence>,
    #[serde(default)]
    pub prev_post: Option<PostRef>,
    #[serde(default)]
    pub next_post: Option<PostRef>,
    #[serde(default)]
    pub review_winner: Option<ReviewWinner>,

    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contents {
    #[serde(default)]
    pub markdown: Option<String>,
    #[serde(default)]
    pub edited_at: Option<Value>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coauthor {
    pub display_name: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Tag {
    pub name: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodcastEpisode {
    #[serde(default)]
    pub episode_link: Option<Value>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sequence {
    #[serde(default)]
    pub title: Option<Value>,
    #[serde(default)]
    pub grid_image_id: Option<Value>,
    #[serde(default)]
    pub banner_image_id: Option<Value>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PostRef {
    pub slug: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewWinner {
    #[serde(default)]
    pub review_winner_art: Option<Value>,
    #[serde(default)]
    pub competitor_count: Option<Value>,
    #[serde(default)]
    pub review_year: Option<Value>,
    #[serde(default)]
    pub review_ranking: Option<Value>,
    #[serde(default)]
    pub category: Option<Value>,
}

impl PostRecord {
    pub fn has_contents(&self) -> bool {
        self.contents.is_some()
    }

    /// Raw body, empty when the post has no contents.
    pub fn markdown(&self) -> &str {
        self.contents
            .as_ref()
            .and_then(|c| c.markdown.as_deref())
            .unwrap_or("")
    }

    /// Source field by its dump name, typed fields included. Absent -> `Null`.
    pub fn field(&self, key: &str) -> Value {
        match key {
            "slug" => Value::String(self.slug.clone()),
            "title" => Value::String(self.title.clone()),
            "draft" => self.draft.map(Value::Bool).unwrap_or(Value::Null),
            "pageUrl" => self.page_url.clone().map(Value::String).unwrap_or(Value::Null),
            "linkUrl" => self.link_url.clone().map(Value::String).unwrap_or(Value::Null),
            _ => self.fields.get(key).cloned().unwrap_or(Value::Null),
        }
    }
}

#[derive(Deserialize)]
struct ExportDump {
    data: DumpData,
}

#[derive(Deserialize)]
struct DumpData {
    posts: DumpPosts,
}

#[derive(Deserialize)]
struct DumpPosts {
    results: Vec<PostRecord>,
}

/// Parse a dump already held in memory.
pub fn parse_posts(raw: &str) -> Result<Vec<PostRecord>> {
    let dump: ExportDump = serde_json::from_str(raw).context("parse export dump")?;
    Ok(dump.data.posts.results)
}

/// Load `data.posts.results` from `path`. Any failure here aborts the run.
pub fn load_posts(path: &Path, read_buf_bytes: usize) -> Result<Vec<PostRecord>> {
    let file = open_with_backoff(path, 16, 50).with_context(|| format!("open dump {}", path.display()))?;
    let cap = read_buf_bytes.max(8 * 1024);

    let reader: Box<dyn Read> = if path.extension().is_some_and(|e| e == "zst") {
        let mut decoder = Decoder::new(file).with_context(|| format!("zstd decoder for {}", path.display()))?;
        // Large frames otherwise fail with "Frame requires too much memory".
        decoder.window_log_max(31)?;
        Box::new(decoder)
    } else {
        Box::new(file)
    };

    let dump: ExportDump = serde_json::from_reader(BufReader::with_capacity(cap, reader))
        .with_context(|| format!("parse export dump {}", path.display()))?;
    tracing::info!("Loaded {} posts from {}", dump.data.posts.results.len(), path.display());
    Ok(dump.data.posts.results)
}
