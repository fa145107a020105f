use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use postport::{init_tracing_once, rewrite_assets_in_dir, update_dates_in_dir, Importer, Tables};
use std::path::PathBuf;
use time::OffsetDateTime;

/// Import exported posts as site Markdown and maintain the imported files.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Export dump (`.json` or `.json.zst`)
    #[arg(short, long, default_value = "/tmp/all_posts_md.json", value_hint = clap::ValueHint::FilePath)]
    input: PathBuf,

    /// Lookup tables (permalinks, tags, aliases) as JSON
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    tables: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert every post of the export
    Import {
        #[command(flatten)]
        source: SourceArgs,

        /// Output directory for `<permalink>.md`
        #[arg(short, long, default_value = "content", value_hint = clap::ValueHint::DirPath)]
        out: PathBuf,

        /// Convert only the first N records
        #[arg(short, long)]
        limit: Option<usize>,

        /// Worker threads (default: all cores)
        #[arg(long)]
        threads: Option<usize>,

        #[arg(long)]
        no_progress: bool,

        /// Omit `date_published` / `original_url`
        #[arg(long)]
        no_site_dates: bool,
    },

    /// Convert the one post whose title contains TITLE into the drafts directory
    Single {
        title: String,

        #[command(flatten)]
        source: SourceArgs,

        #[arg(short, long, default_value = "content/drafts", value_hint = clap::ValueHint::DirPath)]
        drafts: PathBuf,
    },

    /// Stamp `date_published` / `date_updated` in every content file
    UpdateDates {
        #[arg(short, long, default_value = "content", value_hint = clap::ValueHint::DirPath)]
        content: PathBuf,
    },

    /// Point content references at converted media (`.avif`, `.webm`)
    RewriteAssets {
        #[arg(short, long, default_value = "content", value_hint = clap::ValueHint::DirPath)]
        content: PathBuf,

        /// Media files that have been converted
        #[arg(required = true, value_hint = clap::ValueHint::FilePath)]
        files: Vec<PathBuf>,
    },
}

fn load_tables(source: &SourceArgs) -> Result<Tables> {
    Tables::from_json_file(&source.tables)
}

fn main() -> Result<()> {
    init_tracing_once();
    let cli = Cli::parse();

    match cli.command {
        Commands::Import { source, out, limit, threads, no_progress, no_site_dates } => {
            let mut importer = Importer::new()
                .tables(load_tables(&source)?)
                .input(&source.input)
                .output_dir(&out)
                .limit(limit)
                .progress(!no_progress)
                .progress_label("Importing posts")
                .site_dates(!no_site_dates);
            if let Some(n) = threads {
                importer = importer.parallelism(n);
            }
            let report = importer.run()?;
            println!(
                "Wrote {} posts to {} ({} skipped, {} warnings, {} failures)",
                report.written.len(),
                out.display(),
                report.skipped.len(),
                report.warnings.len(),
                report.failures.len()
            );
            for f in &report.failures {
                println!("  failed: {f}");
            }
        }
        Commands::Single { title, source, drafts } => {
            let path = Importer::new()
                .tables(load_tables(&source)?)
                .input(&source.input)
                .drafts_dir(&drafts)
                .progress(false)
                .run_single(&title)?;
            println!("Output written to: {}", path.display());
        }
        Commands::UpdateDates { content } => {
            let report = update_dates_in_dir(&content, OffsetDateTime::now_utc())?;
            println!("Updated dates in {} files", report.updated.len());
            for w in &report.warnings {
                println!("  warning: {w}");
            }
        }
        Commands::RewriteAssets { content, files } => {
            let report = rewrite_assets_in_dir(&content, &files)?;
            println!("Rewrote references in {} files", report.updated.len());
        }
    }
    Ok(())
}
