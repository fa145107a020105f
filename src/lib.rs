mod config;
mod dump;
mod error;
mod util;
mod paths;
mod progress;

mod metadata;
mod frontmatter;
mod passes;
mod latex;
mod links;
mod pipeline;

mod dates;
mod assets;

pub use crate::config::{ImportOptions, Tables, DEFAULT_PRIMARY_AUTHOR, REFERRAL_PREFIX};
pub use crate::dump::{load_posts, parse_posts, PostRecord};
pub use crate::error::{Diagnostic, ImportError};
pub use crate::pipeline::{select_by_title, ConvertedPost, ImportReport, Importer};

// Metadata and frontmatter.
pub use crate::metadata::{
    filter_tags, join_authors, strip_referral_url, Extraction, MetadataExtractor, MetadataMap, MetadataValue,
    FIELD_RENAMES,
};
pub use crate::frontmatter::{parse_frontmatter, to_frontmatter};

// Body passes, in pipeline order.
pub use crate::passes::{
    apply_manual_replacements, clean_escapes, join_blockquotes, normalize_footnotes, normalize_markdown,
    normalize_multiplication, promote_inline_math_blocks, relocate_quote_citations, standardize_abbreviations,
    strip_warning_banner, tighten_bullets, tighten_list_spacing, unescape_html, wrap_quote_admonitions, Step,
    PIPELINE, WARNING_SENTINEL,
};
pub use crate::latex::normalize_display_math;
pub use crate::links::{link_destinations, page_hash, resolve_links, HashToSlugTable};

// Post-import maintenance.
pub use crate::dates::{
    parse_timestamp, published_date, render_timestamp, update_dates_in_dir, update_publish_date, DateUpdateReport,
};
pub use crate::assets::{rewrite_assets_in_dir, AssetReport, AssetRewrite};

pub use crate::paths::content_files;
pub use crate::progress::make_count_progress;

pub use crate::util::{init_tracing_once, write_file_atomic};
