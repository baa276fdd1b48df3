//! Command-line interface definitions for the research pipeline.
//!
//! Runtime credentials and provider knobs come from the environment (see
//! `config`); the CLI carries what varies per run: input file, output
//! directory, batch sizing, and the optional bulk-URL mode.

use clap::Parser;

/// Command-line arguments for the company research pipeline.
///
/// # Examples
///
/// ```sh
/// # Research the first 10 companies, 5 at a time
/// company_intel -i data/companies.csv -l 10 -b 5
///
/// # Flat bulk scrape of a URL list (one URL per line)
/// company_intel --bulk-urls urls.txt
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the company CSV file
    #[arg(short, long, required_unless_present = "bulk_urls")]
    pub input: Option<String>,

    /// Base directory for Markdown, JSON, and CSV outputs
    #[arg(short, long, default_value = "outputs/company_research")]
    pub output_dir: String,

    /// Process only the first N companies
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Companies per batch; also bounds in-batch concurrency
    #[arg(short, long, default_value_t = 5)]
    pub batch_size: usize,

    /// File of URLs (one per line) to scrape sequentially instead of
    /// running the company pipeline
    #[arg(long)]
    pub bulk_urls: Option<String>,

    /// Seconds to pause between URLs in bulk mode
    #[arg(long, default_value_t = 1)]
    pub rate_limit_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from([
            "company_intel",
            "--input",
            "./companies.csv",
            "--limit",
            "10",
        ]);
        assert_eq!(cli.input.as_deref(), Some("./companies.csv"));
        assert_eq!(cli.limit, Some(10));
        assert_eq!(cli.batch_size, 5);
        assert_eq!(cli.output_dir, "outputs/company_research");
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from(["company_intel", "-i", "a.csv", "-b", "8", "-o", "/tmp/out"]);
        assert_eq!(cli.batch_size, 8);
        assert_eq!(cli.output_dir, "/tmp/out");
    }

    #[test]
    fn test_bulk_mode_does_not_require_input() {
        let cli = Cli::parse_from(["company_intel", "--bulk-urls", "urls.txt"]);
        assert!(cli.input.is_none());
        assert_eq!(cli.bulk_urls.as_deref(), Some("urls.txt"));
        assert_eq!(cli.rate_limit_secs, 1);
    }

    #[test]
    fn test_input_required_without_bulk_mode() {
        assert!(Cli::try_parse_from(["company_intel"]).is_err());
    }
}
