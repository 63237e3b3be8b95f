use clap::{Parser, Subcommand};
use siteprofile_core::Field;

#[derive(Parser, Debug)]
#[command(author, version, about = "Profile websites from the command line", long_about = None)]
pub(crate) struct Args {
    /// Pretty-print JSON output
    #[arg(short, long, global = true)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Profile a website
    Scrape {
        /// URL of the site to profile
        url: String,

        /// Compute a single field and its dependencies, bypassing the cache
        #[arg(short, long, value_parser = parse_field)]
        field: Option<Field>,

        /// Recompute even when a cached profile exists
        #[arg(long, conflicts_with = "field")]
        force_refresh: bool,
    },

    /// Inspect or purge the profile cache
    #[command(subcommand)]
    Cache(CacheCommand),
}

#[derive(Subcommand, Debug)]
pub(crate) enum CacheCommand {
    /// Print the cached profile for a URL
    Get { url: String },

    /// Remove cached profiles
    Purge {
        /// Remove entries whose TTL has elapsed
        #[arg(long)]
        expired: bool,

        /// Remove entries whose URL contains this domain
        #[arg(long)]
        domain: Option<String>,

        /// Keep only the newest N entries
        #[arg(long)]
        max_entries: Option<usize>,
    },
}

fn parse_field(s: &str) -> Result<Field, String> {
    s.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scrape_field() {
        let args = Args::parse_from(["siteprofile", "scrape", "example.com", "--field", "seo-analysis", "--pretty"]);
        assert!(args.pretty);
        match args.command {
            Command::Scrape { url, field, force_refresh } => {
                assert_eq!(url, "example.com");
                assert_eq!(field, Some(Field::SeoAnalysis));
                assert!(!force_refresh);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_field_conflicts_with_force_refresh() {
        let parsed = Args::try_parse_from(["siteprofile", "scrape", "example.com", "--field", "logo", "--force-refresh"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(Args::try_parse_from(["siteprofile", "scrape", "example.com", "--field", "favicon"]).is_err());
    }

    #[test]
    fn test_parse_cache_purge() {
        let args = Args::parse_from(["siteprofile", "cache", "purge", "--expired", "--max-entries", "100"]);
        match args.command {
            Command::Cache(CacheCommand::Purge { expired, domain, max_entries }) => {
                assert!(expired);
                assert_eq!(domain, None);
                assert_eq!(max_entries, Some(100));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
