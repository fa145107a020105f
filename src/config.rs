use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_PRIMARY_AUTHOR: &str = "Alex Turner";

/// Prefix of the platform's outbound redirect links.
pub const REFERRAL_PREFIX: &str = "https://www.lesswrong.com/out?url=";

/// Lookup tables injected into the extractor and driver. Immutable once built.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Tables {
    pub primary_author: String,
    pub permalinks: HashMap<String, String>, // slug -> permalink
    pub keep_tags: HashSet<String>,
    pub tag_renames: HashMap<String, String>,
    pub username_aliases: HashMap<String, String>,
    pub skip_titles: Vec<String>, // case-insensitive substrings
}

impl Default for Tables {
    fn default() -> Self {
        Self {
            primary_author: DEFAULT_PRIMARY_AUTHOR.to_string(),
            permalinks: HashMap::new(),
            keep_tags: HashSet::new(),
            tag_renames: HashMap::new(),
            username_aliases: HashMap::new(),
            // Superseded by a later post / empty upstream.
            skip_titles: vec![
                "ambiguity detection".to_string(),
                "should I care about rationality?".to_string(),
            ],
        }
    }
}

impl Tables {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).with_context(|| format!("read tables {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parse tables {}", path.display()))
    }

    pub fn with_primary_author(mut self, name: impl Into<String>) -> Self {
        self.primary_author = name.into();
        self
    }
    pub fn with_permalink(mut self, slug: impl Into<String>, permalink: impl Into<String>) -> Self {
        self.permalinks.insert(slug.into(), permalink.into());
        self
    }
    pub fn with_keep_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keep_tags.extend(tags.into_iter().map(Into::into));
        self
    }
    pub fn with_tag_rename(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.tag_renames.insert(from.into(), to.into());
        self
    }
    pub fn with_username_alias(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.username_aliases.insert(from.into(), to.into());
        self
    }
    pub fn with_skip_titles<I, S>(mut self, titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip_titles = titles.into_iter().map(Into::into).collect();
        self
    }

    pub fn permalink_for(&self, slug: &str) -> Option<&str> {
        self.permalinks.get(slug).map(String::as_str)
    }

    pub fn should_skip_title(&self, title: &str) -> bool {
        let title = title.to_lowercase();
        self.skip_titles.iter().any(|needle| title.contains(&needle.to_lowercase()))
    }
}

/// User-facing options with defaults and builder chaining.
#[derive(Clone, Debug)]
pub struct ImportOptions {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub drafts_dir: PathBuf,
    pub limit: Option<usize>,         // only the first N records of the dump
    pub parallelism: Option<usize>,   // Some(N) to set rayon threads, None to use default
    pub progress: bool,
    pub progress_label: Option<String>,
    pub site_dates: bool,             // add date_published / original_url

    // IO tuning
    pub read_buffer_bytes: usize,
    pub write_buffer_bytes: usize,
}

impl Default for ImportOptions {
    fn default() -> Self {
        let output = PathBuf::from("content");
        Self {
            input: PathBuf::from("/tmp/all_posts_md.json"),
            drafts_dir: output.join("drafts"),
            output_dir: output,
            limit: None,
            parallelism: None,
            progress: true,
            progress_label: None,
            site_dates: true,

            read_buffer_bytes: 256 * 1024,
            write_buffer_bytes: 64 * 1024,
        }
    }
}

impl ImportOptions {
    pub fn with_input(mut self, path: impl AsRef<Path>) -> Self {
        self.input = path.as_ref().to_path_buf();
        self
    }
    pub fn with_output_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.output_dir = dir.as_ref().to_path_buf();
        self
    }
    pub fn with_drafts_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.drafts_dir = dir.as_ref().to_path_buf();
        self
    }
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }
    pub fn with_parallelism(mut self, threads: usize) -> Self {
        self.parallelism = Some(threads);
        self
    }
    pub fn with_progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }
    pub fn with_progress_label(mut self, label: impl Into<String>) -> Self {
        self.progress_label = Some(label.into());
        self
    }
    pub fn with_site_dates(mut self, yes: bool) -> Self {
        self.site_dates = yes;
        self
    }
    pub fn with_io_buffers(mut self, read_bytes: usize, write_bytes: usize) -> Self {
        self.read_buffer_bytes = read_bytes.max(8 * 1024);
        self.write_buffer_bytes = write_bytes.max(8 * 1024);
        self
    }
}
