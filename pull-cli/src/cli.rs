use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Define CLI arguments
#[derive(Parser)]
#[command(
    author = "hua0512 <https://github.com/hua0512>",
    version,
    about = "Fetch and cache remote resources for an owner",
    long_about = "Declares resources (alias=URL) for one owner inside a transaction, commits it\n\
                  and waits until every declared resource has been probed, cached and delivered.\n\
                  \n\
                  With --checkpoint the ledger is restored from the file on start, so resources\n\
                  declared by earlier runs are re-registered and refreshed as well."
)]
pub struct CliArgs {
    /// Resources to declare
    #[arg(
        value_name = "ALIAS=URL",
        help = "Resources to declare, as alias=url (http or https only)"
    )]
    pub resources: Vec<String>,

    /// Owner identity
    #[arg(long, default_value = "cli", help = "Identity of the owner the resources belong to")]
    pub owner: String,

    /// Handler name recorded for declared resources
    #[arg(
        long,
        default_value = "onResourceUpdated",
        help = "Name of the owner handler notified when a resource changes"
    )]
    pub handler: String,

    /// Aliases to refresh
    #[arg(short, long = "refresh", value_name = "ALIAS", help = "Force a re-probe of an alias (can be used multiple times)")]
    pub refresh: Vec<String>,

    /// Aliases to remove
    #[arg(long = "remove", value_name = "ALIAS", help = "Undeclare an alias (can be used multiple times)")]
    pub remove: Vec<String>,

    /// Cache root directory
    #[arg(
        short,
        long,
        default_value = "./cache",
        help = "Root directory of the on-disk cache"
    )]
    pub cache_root: PathBuf,

    /// Cache subdirectory
    #[arg(long, default_value = "pull_cache", help = "Subdirectory of the cache root holding owner directories")]
    pub subdir: String,

    /// Checkpoint file
    #[arg(
        long,
        help = "File the prepared ledger snapshot is written to, and restored from on start"
    )]
    pub checkpoint: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, help = "Enable detailed debug logging")]
    pub verbose: bool,

    /// Probe timeout in seconds
    #[arg(long, default_value = "30", help = "Timeout in seconds for version probes (0 disables)")]
    pub probe_timeout: u64,

    /// Fetch timeout in seconds
    #[arg(long, default_value = "300", help = "Timeout in seconds for body downloads (0 disables)")]
    pub fetch_timeout: u64,

    /// Connection timeout in seconds
    #[arg(
        long,
        default_value = "10",
        help = "Connection timeout in seconds (time to establish initial connection)"
    )]
    pub connect_timeout: u64,

    /// Redirect bound
    #[arg(long, default_value = "10", help = "Maximum number of redirects followed by a probe")]
    pub max_redirects: usize,

    /// How long to wait for the engine
    #[arg(long, default_value = "120", help = "Seconds to wait for all resources to be reported")]
    pub wait: u64,

    /// Custom HTTP headers
    #[arg(
        long = "header",
        short = 'H',
        help = "Add custom HTTP header to requests (can be used multiple times). Format: 'Name: Value'",
        value_name = "HEADER"
    )]
    pub headers: Vec<String>,

    /// Proxy URL (e.g., "http://proxy.example.com:8080")
    #[arg(
        long,
        help = "Proxy server URL (e.g., \"http://proxy.example.com:8080\")"
    )]
    pub proxy: Option<String>,

    /// Proxy type (http, https, socks5, all)
    #[arg(
        long,
        default_value = "http",
        help = "Proxy type (http, https, socks5, all)",
        value_parser = ["http", "https", "socks5", "all"]
    )]
    pub proxy_type: String,

    /// Proxy username
    #[arg(long, help = "Username for proxy authentication")]
    pub proxy_user: Option<String>,

    /// Proxy password
    #[arg(long, help = "Password for proxy authentication")]
    pub proxy_pass: Option<String>,

    /// Use system proxy settings
    #[arg(
        long,
        default_value_t = true,
        action = ArgAction::Set,
        value_name = "BOOL",
        help = "Use system proxy settings if no explicit proxy is configured (true/false)"
    )]
    pub use_system_proxy: bool,

    /// Disable all proxy settings
    #[arg(long, help = "Disable all proxy settings (including system proxy)")]
    pub no_proxy: bool,
}
