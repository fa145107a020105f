//! Publication dates: the site's `MM/DD/YYYY` rendering at import time, and
//! the frontmatter updater that stamps `date_published` / `date_updated`.

use crate::error::Diagnostic;
use crate::frontmatter::{parse_frontmatter, to_frontmatter};
use crate::metadata::{MetadataMap, MetadataValue};
use crate::paths::content_files;
use crate::util::write_file_atomic;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time};

const SITE_DATE: &[FormatItem<'static>] = format_description!("[month]/[day]/[year]");
const STAMP: &[FormatItem<'static>] = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
const STAMP_T: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
const DAY_ONLY: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Legacy fields consulted, in order, when a post has never had `date_updated`.
const LEGACY_UPDATE_KEYS: [&str; 2] = ["lw-last-modification", "lw-latest-edit"];

/// `2019-07-29T23:55:08.370Z` -> `07/29/2019`.
pub fn published_date(posted_at: &str) -> Option<String> {
    let dt = OffsetDateTime::parse(posted_at.trim(), &Rfc3339).ok()?;
    dt.format(SITE_DATE).ok()
}

/// Accepts `MM/DD/YYYY`, RFC 3339, `YYYY-MM-DD[ T]HH:MM:SS[.frac]` and
/// `YYYY-MM-DD`. Offsets are dropped; the wall-clock reading is kept.
pub fn parse_timestamp(raw: &str) -> Option<PrimitiveDateTime> {
    let s = raw.trim().trim_matches('"');
    if s.is_empty() {
        return None;
    }
    if let Some(date) = parse_us_date(s) {
        return Some(PrimitiveDateTime::new(date, Time::MIDNIGHT));
    }
    if let Ok(dt) = OffsetDateTime::parse(s, &Rfc3339) {
        return Some(PrimitiveDateTime::new(dt.date(), dt.time()));
    }
    let whole_seconds = s.split_once('.').map_or(s, |(head, _)| head);
    for fmt in [STAMP, STAMP_T] {
        if let Ok(dt) = PrimitiveDateTime::parse(whole_seconds, fmt) {
            return Some(dt);
        }
    }
    Date::parse(s, DAY_ONLY)
        .ok()
        .map(|d| PrimitiveDateTime::new(d, Time::MIDNIGHT))
}

fn parse_us_date(s: &str) -> Option<Date> {
    let mut parts = s.split('/');
    let (m, d, y) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    let month = Month::try_from(m.parse::<u8>().ok()?).ok()?;
    Date::from_calendar_date(y.parse().ok()?, month, d.parse().ok()?).ok()
}

/// `YYYY-MM-DD HH:MM:SS`
pub fn render_timestamp(dt: PrimitiveDateTime) -> String {
    dt.format(STAMP)
        .unwrap_or_else(|_| format!("{} {}", dt.date(), dt.time()))
}

fn wall_clock(now: OffsetDateTime) -> PrimitiveDateTime {
    PrimitiveDateTime::new(now.date(), now.time().replace_nanosecond(0).unwrap_or(Time::MIDNIGHT))
}

/// Non-empty text that is not a serialized "no value" marker.
fn present<'a>(meta: &'a MetadataMap, key: &str) -> Option<&'a str> {
    meta.get_str(key)
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != "None" && *v != "null")
}

/// Stamp a post's frontmatter:
/// - never published: `date_published` and `date_updated` both become `now`;
/// - no `date_updated` yet: take the first legacy edit date, else the
///   publication date;
/// - both fields are then normalized to `YYYY-MM-DD HH:MM:SS`.
///
/// Unparseable dates fall back to `now` and are reported.
pub fn update_publish_date(meta: &mut MetadataMap, now: OffsetDateTime) -> Vec<Diagnostic> {
    update_publish_date_for(meta, now, "frontmatter")
}

fn update_publish_date_for(meta: &mut MetadataMap, now: OffsetDateTime, context: &str) -> Vec<Diagnostic> {
    let now = wall_clock(now);
    let stamp = render_timestamp(now);

    if present(meta, "date_published").is_none() {
        meta.insert("date_published", stamp.as_str());
        meta.insert("date_updated", stamp);
        return Vec::new();
    }

    if present(meta, "date_updated").is_none() {
        let fallback = LEGACY_UPDATE_KEYS
            .iter()
            .find_map(|key| present(meta, key))
            .or_else(|| present(meta, "date_published"))
            .map(str::to_string)
            .unwrap_or_else(|| stamp.clone());
        meta.insert("date_updated", fallback);
    }

    let mut warnings = Vec::new();
    for key in ["date_published", "date_updated"] {
        let normalized = match meta.get(key) {
            Some(MetadataValue::Text(raw)) => match parse_timestamp(raw) {
                Some(dt) => render_timestamp(dt),
                None => {
                    warnings.push(Diagnostic::MalformedDate {
                        context: context.to_string(),
                        key: key.to_string(),
                        value: raw.clone(),
                    });
                    stamp.clone()
                }
            },
            other => {
                warnings.push(Diagnostic::MalformedDate {
                    context: context.to_string(),
                    key: key.to_string(),
                    value: format!("{other:?}"),
                });
                stamp.clone()
            }
        };
        meta.insert(key, normalized);
    }
    warnings
}

/// Outcome of a directory-wide date update.
#[derive(Debug, Default)]
pub struct DateUpdateReport {
    pub updated: Vec<PathBuf>,
    pub warnings: Vec<Diagnostic>,
}

/// Apply `update_publish_date` to every Markdown file under `dir`. Files
/// without a frontmatter block are left alone; files whose metadata does not
/// change are not rewritten.
pub fn update_dates_in_dir(dir: &Path, now: OffsetDateTime) -> Result<DateUpdateReport> {
    let mut report = DateUpdateReport::default();
    for path in content_files(dir, &["md"]) {
        let raw = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
        let Some((original, body)) = parse_frontmatter(&raw) else {
            tracing::debug!(path = %path.display(), "no frontmatter, skipping");
            continue;
        };
        let mut meta = original.clone();
        let context = path.display().to_string();
        report.warnings.extend(update_publish_date_for(&mut meta, now, &context));

        if meta != original {
            let mut out = to_frontmatter(&meta);
            out.push_str(body);
            write_file_atomic(&path, &out, 64 * 1024)?;
            tracing::info!("Updated date information on {}", path.display());
            report.updated.push(path);
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn published_date_uses_month_first() {
        assert_eq!(published_date("2019-07-29T23:55:08.370Z").as_deref(), Some("07/29/2019"));
        assert_eq!(published_date("yesterday"), None);
    }

    #[test]
    fn parses_every_accepted_shape() {
        let want = datetime!(2022-03-04 05:06:07);
        assert_eq!(parse_timestamp("2022-03-04 05:06:07"), Some(want));
        assert_eq!(parse_timestamp("2022-03-04T05:06:07"), Some(want));
        assert_eq!(parse_timestamp("2022-03-04T05:06:07.123"), Some(want));
        assert_eq!(parse_timestamp("2022-03-04T05:06:07Z"), Some(want));
        assert_eq!(parse_timestamp("03/04/2022"), Some(datetime!(2022-03-04 0:00)));
        assert_eq!(parse_timestamp("2022-03-04"), Some(datetime!(2022-03-04 0:00)));
        assert_eq!(parse_timestamp("13/45/2022"), None);
    }
}
