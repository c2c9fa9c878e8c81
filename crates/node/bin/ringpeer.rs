use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use ringpeer_core::dht::PeerId;
use ringpeer_core::peer::Entry;
use ringpeer_core::peer::Peer;
use ringpeer_core::peer::PeerBuilder;
use ringpeer_node::config::Config;
use ringpeer_node::config::DEFAULT_CONFIG_LOCATION;
use ringpeer_node::console::run_console;
use ringpeer_node::console::ConsoleExit;
use ringpeer_node::logging::init_logging;
use ringpeer_node::logging::LogLevel;
use tokio::io;
use tracing::Instrument;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(about, version, author)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(long, default_value_t = LogLevel::Info, value_enum, env)]
    log_level: LogLevel,

    #[arg(
        long,
        short = 'c',
        env,
        default_value = DEFAULT_CONFIG_LOCATION,
        help = "Config file location. A missing file means defaults"
    )]
    config: String,

    #[arg(
        long,
        short = 's',
        help = "Directory files are served from and received into. Overrides storage_dir in config file"
    )]
    storage_dir: Option<String>,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Command {
    #[command(about = "Starts a ring member with known successors.")]
    Init(InitCommand),
    #[command(about = "Joins an existing ring through a known peer.")]
    Join(JoinCommand),
}

#[derive(Args, Debug)]
struct InitCommand {
    #[arg(help = "Id of this peer", value_parser = clap::value_parser!(u32).range(1..))]
    pub peer: u32,

    #[arg(help = "Id of the first successor", value_parser = clap::value_parser!(u32).range(1..))]
    pub first: u32,

    #[arg(help = "Id of the second successor", value_parser = clap::value_parser!(u32).range(1..))]
    pub second: u32,

    #[arg(help = "Ping interval in seconds", value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: u64,
}

#[derive(Args, Debug)]
struct JoinCommand {
    #[arg(help = "Id of this peer", value_parser = clap::value_parser!(u32).range(1..))]
    pub peer: u32,

    #[arg(help = "Id of a peer already in the ring", value_parser = clap::value_parser!(u32).range(1..))]
    pub known: u32,

    #[arg(help = "Ping interval in seconds", value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: u64,
}

impl Command {
    fn peer(&self) -> u32 {
        match self {
            Command::Init(args) => args.peer,
            Command::Join(args) => args.peer,
        }
    }

    fn split(&self) -> (PeerId, Duration, Entry) {
        match self {
            Command::Init(args) => (
                PeerId::new(args.peer),
                Duration::from_secs(args.interval),
                Entry::Founder {
                    first: PeerId::new(args.first),
                    second: PeerId::new(args.second),
                },
            ),
            Command::Join(args) => (
                PeerId::new(args.peer),
                Duration::from_secs(args.interval),
                Entry::Joiner {
                    known: PeerId::new(args.known),
                },
            ),
        }
    }
}

async fn daemon_run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load_or_default(&cli.config)?;
    if let Some(dir) = cli.storage_dir {
        config.storage_dir = dir;
    }

    let (id, interval, entry) = cli.command.split();
    let builder = config.apply(PeerBuilder::new(id, interval))?;
    let peer: Arc<Peer> = Arc::new(builder.build()?);

    let token = CancellationToken::new();
    let mut serving = peer.start(entry, token.clone()).await?;

    let stdin = io::BufReader::new(io::stdin());
    tokio::select! {
        exit = run_console(&peer, stdin, io::stdout()) => {
            match exit? {
                ConsoleExit::Quit => tracing::debug!("quit requested"),
                ConsoleExit::Eof => tracing::debug!("console input closed"),
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::debug!("interrupted");
        }
        res = &mut serving => {
            // serving only ends on its own when something went wrong
            res??;
            return Ok(());
        }
    }

    peer.shutdown(token).await?;
    serving.await??;
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_level);

    let span = tracing::info_span!("peer", id = cli.command.peer());
    let code = match daemon_run(cli).instrument(span).await {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!("{:#}", e);
            1
        }
    };
    // stdin is read on a blocking thread the runtime would wait for
    std::process::exit(code);
}
