//! Rewrite Markdown references to media the transcoder has already converted:
//! images to `.avif`, videos to `<video>` tags over `.webm`.

use crate::paths::content_files;
use crate::util::write_file_atomic;
use anyhow::{bail, Context, Result};
use regex::{Captures, Regex};
use std::fs;
use std::path::{Path, PathBuf};

pub const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];
pub const VIDEO_EXTENSIONS: [&str; 3] = ["gif", "mov", "mp4"];

/// How references to one converted file are rewritten.
#[derive(Debug)]
pub enum AssetRewrite {
    /// Literal path swap, `a/b.png` -> `a/b.avif`.
    Image { from: String, to: String },
    /// `![](…)`, `![[…]]`, `<img src=…>` (gifs) or `<video src=…>` -> `<video>`.
    Video { pattern: Regex, stem: String, gif: bool },
}

impl AssetRewrite {
    pub fn for_file(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            return Ok(AssetRewrite::Image {
                from: path.to_string_lossy().into_owned(),
                to: path.with_extension("avif").to_string_lossy().into_owned(),
            });
        }
        if !VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            bail!("unsupported asset type `{}`", path.display());
        }

        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .with_context(|| format!("no file stem in {}", path.display()))?
            .to_string();
        let actual_ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        let gif = ext == "gif";
        let file = format!(r"{}\.{}", regex::escape(&stem), regex::escape(actual_ext));

        let parens = format!(r"!?\[\]\((?P<lp>[^)]*?){file}\)");
        let brackets = format!(r"!?\[\[(?P<lb>[^\]]*?){file}\]\]");
        let tag = if gif {
            format!(r#"<img (?P<early>[^>]*?)src="(?P<lt>[^"]*?){file}"(?P<info>[^>]*?)/?>"#)
        } else {
            format!(r#"<video (?P<early>[^>]*?)src="(?P<lt>[^"]*?){file}"(?P<info>[^>]*?)/?>"#)
        };
        let pattern = Regex::new(&format!("{parens}|{brackets}|{tag}"))
            .with_context(|| format!("reference pattern for {}", path.display()))?;

        Ok(AssetRewrite::Video { pattern, stem, gif })
    }

    pub fn apply(&self, md: &str) -> String {
        match self {
            AssetRewrite::Image { from, to } => md.replace(from.as_str(), to),
            AssetRewrite::Video { pattern, stem, gif } => pattern
                .replace_all(md, |c: &Captures| video_tag(c, stem, *gif))
                .into_owned(),
        }
    }
}

fn video_tag(c: &Captures, stem: &str, gif: bool) -> String {
    let dir = ["lp", "lb", "lt"]
        .iter()
        .find_map(|name| c.name(name))
        .map_or("", |m| m.as_str());
    let src = format!("{dir}{stem}.webm");

    let mut extra = String::new();
    for name in ["early", "info"] {
        let Some(attrs) = c.name(name) else { continue };
        let attrs = attrs.as_str().trim();
        // The old MIME type is replaced below.
        let attrs = attrs
            .split_whitespace()
            .filter(|a| !a.starts_with("type=\"video/"))
            .collect::<Vec<_>>()
            .join(" ");
        if !attrs.is_empty() {
            extra.push(' ');
            extra.push_str(&attrs);
        }
    }

    if gif {
        format!(
            r#"<video autoplay loop muted playsinline src="{src}"{extra} type="video/webm"><source src="{src}"></video>"#
        )
    } else {
        format!(r#"<video src="{src}"{extra} type="video/webm"/>"#)
    }
}

/// Files whose references changed.
#[derive(Debug, Default)]
pub struct AssetReport {
    pub updated: Vec<PathBuf>,
}

/// Apply the rewrites for `assets` to every Markdown file under `dir`.
/// Every asset is checked before any file is touched.
pub fn rewrite_assets_in_dir(dir: &Path, assets: &[PathBuf]) -> Result<AssetReport> {
    let rewrites = assets
        .iter()
        .map(|p| AssetRewrite::for_file(p))
        .collect::<Result<Vec<_>>>()?;

    let mut report = AssetReport::default();
    for path in content_files(dir, &["md"]) {
        let original = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
        let rewritten = rewrites.iter().fold(original.clone(), |md, r| r.apply(&md));
        if rewritten != original {
            write_file_atomic(&path, &rewritten, 64 * 1024)?;
            tracing::info!("Rewrote asset references in {}", path.display());
            report.updated.push(path);
        }
    }
    Ok(report)
}
