//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Default extension allow-list: scripts, configuration, and credential
/// material typically worth pulling from a distribution point.
pub const DEFAULT_ALLOW_LIST: &str = "ps1,vbs,txt,cmd,bat,pfx,pem,cer,certs,expect,sql,xml,\
ps1xml,config,ini,ksh,sh,rsh,py,keystore,reg,yml,yaml,token,script,sqlite,plist,au3,cfg";

/// Harvest files from a distribution-point HTTP file share.
///
/// Discovers the remote directory tree from the root package listing,
/// selects files by extension, and retrieves them into a local hierarchy
/// named by content hash.
#[derive(Parser, Debug)]
#[command(name = "dp-harvester")]
#[command(author, version, about)]
pub struct Args {
    /// Protocol to reach the distribution point with
    #[arg(long, default_value = "http", value_parser = ["http", "https"])]
    pub protocol: String,

    /// IP address or hostname of the distribution point
    #[arg(long, default_value = "127.0.0.1")]
    pub server: String,

    /// Port of the HTTP(S) server on the distribution point
    #[arg(long, default_value_t = 80)]
    pub port: u16,

    /// Base output directory for files related to this endpoint
    #[arg(long, default_value = "./loot")]
    pub output: PathBuf,

    /// Comma-separated list of file extensions (no dot) to allow; use 'all'
    /// to allow all file types
    #[arg(long, default_value = DEFAULT_ALLOW_LIST)]
    pub allow: String,

    /// Number of concurrent network operations (1-100)
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub threads: u8,

    /// Validate HTTPS certificates
    #[arg(long)]
    pub validate: bool,

    /// Path to a pre-fetched root listing download (for cases where the
    /// listing cannot be retrieved with this tool)
    #[arg(long)]
    pub datalib: Option<PathBuf>,

    /// Path to a directory of pre-fetched signature blobs (for reprocessing
    /// a server without re-downloading signatures)
    #[arg(long)]
    pub signatures: Option<PathBuf>,

    /// Download files without a file extension
    #[arg(long)]
    pub download_no_ext: bool,

    /// User agent to use for all requests
    #[arg(long, default_value = "dp-harvester")]
    pub useragent: String,

    /// HTTP timeout in seconds
    #[arg(long, default_value_t = 10)]
    pub timeout: u64,

    /// Randomize the order of requests for signatures and files
    #[arg(long)]
    pub randomize: bool,

    /// Print debug/error statements
    #[arg(long)]
    pub verbose: bool,

    /// Get file names from signature blobs instead of crawling directory
    /// listings
    #[arg(long)]
    pub use_signature_method: bool,

    /// Path to a file containing URLs (for reprocessing downloads without
    /// re-scraping the URLs)
    #[arg(long)]
    pub urls_path: Option<PathBuf>,
}
