use crate::config::{ImportOptions, Tables};
use crate::dump::{load_posts, PostRecord};
use crate::error::{Diagnostic, ImportError};
use crate::frontmatter::to_frontmatter;
use crate::links::HashToSlugTable;
use crate::metadata::{Extraction, MetadataExtractor};
use crate::passes::normalize_markdown;
use crate::paths::markdown_path;
use crate::progress::maybe_count_progress;
use crate::util::{init_tracing_once, write_file_atomic};
use anyhow::{Context, Result};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One post ready to be written: frontmatter block plus normalized body.
#[derive(Clone, Debug)]
pub struct ConvertedPost {
    pub slug: String,
    pub permalink: String,
    pub frontmatter: String,
    pub body: String,
    pub warnings: Vec<Diagnostic>,
}

impl ConvertedPost {
    pub fn document(&self) -> String {
        let mut doc = String::with_capacity(self.frontmatter.len() + self.body.len());
        doc.push_str(&self.frontmatter);
        doc.push_str(&self.body);
        doc
    }
}

/// What a batch run did. Failures and warnings never stop the batch; they are
/// collected here for review.
#[derive(Debug, Default)]
pub struct ImportReport {
    pub written: Vec<PathBuf>,
    pub skipped: Vec<String>,
    pub warnings: Vec<Diagnostic>,
    pub failures: Vec<ImportError>,
}

impl ImportReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty() && self.failures.is_empty()
    }

    fn log(&self) {
        for w in &self.warnings {
            tracing::warn!("{w}");
        }
        for f in &self.failures {
            tracing::error!("{f}");
        }
        tracing::info!(
            "Wrote {} posts, skipped {}, {} warnings, {} failures",
            self.written.len(),
            self.skipped.len(),
            self.warnings.len(),
            self.failures.len()
        );
    }
}

enum Outcome {
    Converted(ConvertedPost),
    Skipped(String),
    Failed(ImportError),
}

#[derive(Clone)]
pub struct Importer {
    pub(crate) opts: ImportOptions,
    tables: Arc<Tables>,
}

impl Default for Importer {
    fn default() -> Self {
        Self::new()
    }
}

impl Importer {
    pub fn new() -> Self {
        Self { opts: ImportOptions::default(), tables: Arc::new(Tables::default()) }
    }

    // -------- Builder methods --------
    pub fn tables(mut self, tables: Tables) -> Self { self.tables = Arc::new(tables); self }
    pub fn input(mut self, path: impl AsRef<Path>) -> Self { self.opts = self.opts.with_input(path); self }
    pub fn output_dir(mut self, dir: impl AsRef<Path>) -> Self { self.opts = self.opts.with_output_dir(dir); self }
    pub fn drafts_dir(mut self, dir: impl AsRef<Path>) -> Self { self.opts = self.opts.with_drafts_dir(dir); self }
    pub fn limit(mut self, limit: Option<usize>) -> Self { self.opts = self.opts.with_limit(limit); self }
    pub fn parallelism(mut self, threads: usize) -> Self { self.opts = self.opts.with_parallelism(threads); self }
    pub fn progress(mut self, yes: bool) -> Self { self.opts = self.opts.with_progress(yes); self }
    pub fn progress_label(mut self, label: impl Into<String>) -> Self { self.opts = self.opts.with_progress_label(label); self }
    pub fn site_dates(mut self, yes: bool) -> Self { self.opts = self.opts.with_site_dates(yes); self }
    pub fn io_buffers(mut self, read_bytes: usize, write_bytes: usize) -> Self { self.opts = self.opts.with_io_buffers(read_bytes, write_bytes); self }

    /// Metadata plus body for one post. `links` must already cover the whole
    /// export so cross-references resolve regardless of conversion order.
    pub fn convert_post(&self, post: &PostRecord, links: &HashToSlugTable) -> Result<ConvertedPost, ImportError> {
        self.convert_with(post, links, self.opts.site_dates)
    }

    fn convert_with(&self, post: &PostRecord, links: &HashToSlugTable, site_dates: bool) -> Result<ConvertedPost, ImportError> {
        if !post.has_contents() {
            return Err(ImportError::MissingContents { slug: post.slug.clone() });
        }
        let Extraction { metadata, warnings } =
            MetadataExtractor::new(&self.tables).site_dates(site_dates).extract(post)?;
        let permalink = metadata.get_str("permalink").unwrap_or(post.slug.as_str()).to_string();

        Ok(ConvertedPost {
            slug: post.slug.clone(),
            permalink,
            frontmatter: to_frontmatter(&metadata),
            body: normalize_markdown(post.markdown(), links),
            warnings,
        })
    }

    fn classify(&self, post: &PostRecord, links: &HashToSlugTable) -> Outcome {
        if !post.has_contents() {
            tracing::debug!(slug = %post.slug, "no contents, skipping");
            return Outcome::Skipped(post.slug.clone());
        }
        if self.tables.should_skip_title(&post.title) {
            tracing::info!("Skipping \"{}\"", post.title);
            return Outcome::Skipped(post.slug.clone());
        }
        match self.convert_post(post, links) {
            Ok(converted) => Outcome::Converted(converted),
            Err(e) => Outcome::Failed(e),
        }
    }

    /// Convert the export and write `<output_dir>/<permalink>.md` for every
    /// post. Only an unreadable export or an uncreatable output directory is
    /// fatal; a post that cannot be written is reported like any other failure.
    pub fn run(self) -> Result<ImportReport> {
        init_tracing_once();
        if let Some(n) = self.opts.parallelism { if n > 0 { rayon::ThreadPoolBuilder::new().num_threads(n).build_global().ok(); } }

        let posts = load_posts(&self.opts.input, self.opts.read_buffer_bytes)?;
        // Links resolve against the whole export even when only a prefix is converted.
        let links = HashToSlugTable::from_posts(&posts, &self.tables);
        let take = self.opts.limit.map_or(posts.len(), |n| n.min(posts.len()));
        let selected = &posts[..take];
        tracing::info!("Converting {} of {} posts", selected.len(), posts.len());

        let pb = maybe_count_progress(self.opts.progress, selected.len() as u64, self.opts.progress_label.as_deref());
        let outcomes: Vec<Outcome> = selected
            .par_iter()
            .map(|post| {
                let outcome = self.classify(post, &links);
                if let Some(pb) = &pb {
                    pb.inc(1);
                }
                outcome
            })
            .collect();
        if let Some(pb) = pb {
            pb.finish_with_message("converted");
        }

        fs::create_dir_all(&self.opts.output_dir)
            .with_context(|| format!("create {}", self.opts.output_dir.display()))?;

        // Sequential, in dump order.
        let mut report = ImportReport::default();
        for outcome in outcomes {
            match outcome {
                Outcome::Converted(post) => {
                    let path = markdown_path(&self.opts.output_dir, &post.permalink);
                    if let Err(e) = write_file_atomic(&path, &post.document(), self.opts.write_buffer_bytes) {
                        report.failures.push(ImportError::Write {
                            slug: post.slug,
                            path: path.display().to_string(),
                            reason: format!("{e:#}"),
                        });
                        continue;
                    }
                    report.warnings.extend(post.warnings);
                    report.written.push(path);
                }
                Outcome::Skipped(slug) => report.skipped.push(slug),
                Outcome::Failed(e) => report.failures.push(e),
            }
        }
        report.log();
        Ok(report)
    }

    /// Import the one post whose title contains `title_substring` into
    /// `<drafts_dir>/<slug>.md`, always with site dates.
    pub fn run_single(self, title_substring: &str) -> Result<PathBuf> {
        init_tracing_once();
        let posts = load_posts(&self.opts.input, self.opts.read_buffer_bytes)?;
        let post = select_by_title(&posts, title_substring)?;

        let links = HashToSlugTable::from_posts(&posts, &self.tables);
        let converted = self.convert_with(post, &links, true)?;
        for w in &converted.warnings {
            tracing::warn!("{w}");
        }

        let path = markdown_path(&self.opts.drafts_dir, &post.slug);
        write_file_atomic(&path, &converted.document(), self.opts.write_buffer_bytes)?;
        tracing::info!("Processed post: {}", post.title);
        tracing::info!("Output written to: {}", path.display());
        Ok(path)
    }
}

/// Exactly one post whose title contains `needle` (case-sensitive).
pub fn select_by_title<'a>(posts: &'a [PostRecord], needle: &str) -> Result<&'a PostRecord, ImportError> {
    let matches: Vec<&PostRecord> = posts.iter().filter(|p| p.title.contains(needle)).collect();
    match matches.as_slice() {
        [] => Err(ImportError::NoMatchingPost(needle.to_string())),
        [only] => Ok(*only),
        many => Err(ImportError::AmbiguousTitle {
            needle: needle.to_string(),
            candidates: many.iter().map(|p| p.title.clone()).collect(),
        }),
    }
}
