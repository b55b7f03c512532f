use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "wakepoint-cli", version, about = "Wakepoint demo host")]
struct Cli {
    /// Verbose logging (overridable via WAKEPOINT_LOG)
    #[arg(long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Alarm scheduling against the in-process driver
    Alarm {
        #[command(subcommand)]
        action: commands::alarm::AlarmAction,
    },
    /// Permission status and request-flow walkthrough
    Permissions {
        #[command(subcommand)]
        action: commands::permissions::PermissionsAction,
    },
    /// Durable configuration mirror
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// One full schedule-fire-deliver round trip
    Demo(commands::demo::DemoArgs),
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Alarm { action } => commands::alarm::run(action),
        Commands::Permissions { action } => commands::permissions::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Demo(args) => commands::demo::run(args),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_env("WAKEPOINT_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
