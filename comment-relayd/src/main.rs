use clap::Parser;
use comment_relayd::{run, show_key, Settings, DEFAULT_CONFIG_NAME};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Local HTTP bridge for comment commands", long_about = None)]
struct Cli {
    #[arg(
        long,
        default_value = "127.0.0.1:3034",
        help = "Listen address for the comment relay"
    )]
    listen: SocketAddr,

    #[arg(
        long,
        value_name = "DIR",
        help = "Directory holding the relay config file (defaults to the user config dir)"
    )]
    config_dir: Option<PathBuf>,

    #[arg(
        long,
        default_value = DEFAULT_CONFIG_NAME,
        help = "Config file name, without the .json extension"
    )]
    config_name: String,

    #[arg(
        long,
        value_name = "PATH",
        default_value = "output.log",
        help = "Log file served at /output"
    )]
    output_log: PathBuf,

    #[arg(
        long,
        value_name = "PROGRAM",
        default_value = "comment-command",
        help = "Program invoked as `<program> comment <amount> <receiving id>`"
    )]
    command_program: PathBuf,

    #[arg(long, default_value = "owner", help = "Identity commands are issued as")]
    owner_id: String,

    #[arg(
        long,
        default_value_t = 120_000,
        help = "Milliseconds to wait for a command response (0 waits forever)"
    )]
    dispatch_timeout_ms: u64,

    #[arg(
        long,
        help = "OTLP endpoint for relay telemetry (e.g., http://localhost:4318)"
    )]
    otlp_endpoint: Option<String>,

    #[arg(long, help = "Print the request key (generating it if needed) and exit")]
    show_key: bool,
}

impl Cli {
    fn into_settings(self) -> Settings {
        let config_dir = self.config_dir.unwrap_or_else(default_config_dir);
        let dispatch_timeout = match self.dispatch_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        };
        Settings {
            listen: self.listen,
            config_dir,
            config_name: self.config_name,
            output_log: self.output_log,
            command_program: self.command_program,
            owner_id: self.owner_id,
            dispatch_timeout,
            otlp_endpoint: self.otlp_endpoint,
        }
    }
}

fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("comment-relayd"))
        .unwrap_or_else(|| PathBuf::from("state"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let print_key = cli.show_key;
    let settings = cli.into_settings();

    if print_key {
        let key = show_key(&settings).await?;
        println!("{}", key.as_str());
        return Ok(());
    }

    run(settings).await
}
