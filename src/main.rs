use anyhow::Result;
use clap::Parser;
use log::warn;
use pkgsearch::domain::model::{DependentsRequest, SearchRequest};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// pkgsearch - package search and dependents lookup
///
/// Loads a catalog of package manifests (JSON files) and answers search
/// and dependents queries against it. Results are printed as JSON.
///
/// Examples:
///   pkgsearch search json --framework net8.0
///   pkgsearch dependents Newtonsoft.Json
#[derive(Parser, Debug)]
#[command(author, version = env!("PKGSEARCH_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Catalog directory (defaults to ./catalog; also via PKGSEARCH_CATALOG)
    #[arg(
        long = "catalog",
        short = 'c',
        env = "PKGSEARCH_CATALOG",
        value_name = "PATH",
        global = true
    )]
    pub catalog: Option<PathBuf>,

    /// Largest page a request may ask for (also via PKGSEARCH_MAX_PAGE_SIZE)
    #[arg(long = "max-page-size", value_name = "N", global = true)]
    pub max_page_size: Option<usize>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Search packages by text and filters
    Search(SearchArgs),

    /// List packages that depend on a package
    Dependents(DependentsArgs),

    /// Show how the packages in a manifest file are indexed
    Index(IndexArgs),
}

#[derive(clap::Args, Debug)]
pub struct PagingArgs {
    /// Number of results to skip
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub skip: i64,

    /// Number of results to return
    #[arg(long, default_value_t = pkgsearch::config::DEFAULT_TAKE, allow_negative_numbers = true)]
    pub take: i64,
}

#[derive(clap::Args, Debug)]
pub struct SearchArgs {
    /// Search terms; empty matches every package
    #[arg(value_name = "QUERY", default_value = "")]
    pub query: String,

    #[command(flatten)]
    pub paging: PagingArgs,

    /// Include pre-release versions
    #[arg(long)]
    pub prerelease: bool,

    /// Include SemVer 2.0 versions
    #[arg(long)]
    pub semver2: bool,

    /// Only packages of this package type (exact, case-insensitive)
    #[arg(long = "package-type", value_name = "TYPE")]
    pub package_type: Option<String>,

    /// Only packages targeting this framework (exact, case-insensitive)
    #[arg(long, value_name = "FRAMEWORK")]
    pub framework: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct DependentsArgs {
    /// The package id whose dependents to list
    #[arg(value_name = "ID")]
    pub id: String,

    #[command(flatten)]
    pub paging: PagingArgs,
}

#[derive(clap::Args, Debug)]
pub struct IndexArgs {
    /// Manifest file holding one package or an array of packages
    #[arg(value_name = "FILE")]
    pub manifest: PathBuf,
}

impl From<SearchArgs> for SearchRequest {
    fn from(args: SearchArgs) -> Self {
        SearchRequest {
            query: args.query,
            skip: args.paging.skip,
            take: args.paging.take,
            include_prerelease: args.prerelease,
            include_semver2: args.semver2,
            package_type: args.package_type,
            framework: args.framework,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let runtime = pkgsearch::runtime::RealRuntime;

    let token = CancellationToken::new();
    let interrupt = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            interrupt.cancel();
        }
    });

    match cli.command {
        Commands::Search(args) => {
            pkgsearch::commands::search(
                runtime,
                cli.catalog,
                cli.max_page_size,
                args.into(),
                token,
            )
            .await?
        }
        Commands::Dependents(args) => {
            let request =
                DependentsRequest::new(args.id).with_paging(args.paging.skip, args.paging.take);
            pkgsearch::commands::dependents(runtime, cli.catalog, cli.max_page_size, request, token)
                .await?
        }
        Commands::Index(args) => {
            pkgsearch::commands::index(runtime, cli.catalog, &args.manifest, token).await?
        }
    }
    Ok(())
}
