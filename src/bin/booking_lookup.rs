use anyhow::Context;
use booking_core::logging::init_logger;
use booking_core::{
    BookingConfig, BookingError, BookingRetriever, BookingService, BookingStore,
    JsonFileBookingStore, MemoryBookingStore, ParseStrategy, PaymentService,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::error;

#[derive(Parser, Debug)]
#[command(name = "booking-lookup", about = "Look up hotel bookings from XML fixtures")]
struct Cli {
    /// Directory holding booking_<id>.xml / <id>.xml fixtures
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Persist parsed bookings as JSON files in this directory
    #[arg(long, global = true)]
    store_dir: Option<PathBuf>,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a booking and print it as JSON
    Lookup {
        confirmation_no: String,
        #[arg(long, value_enum, default_value_t = ParseStrategy::Library)]
        strategy: ParseStrategy,
    },
    /// Parse and store a booking, then print its payment URL
    Pay {
        confirmation_no: String,
        #[arg(long, value_enum, default_value_t = ParseStrategy::Library)]
        strategy: ParseStrategy,
    },
}

fn load_config(cli: &Cli) -> anyhow::Result<BookingConfig> {
    let mut config = match &cli.config {
        Some(path) => BookingConfig::from_toml_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => BookingConfig::default(),
    }
    .with_env_overrides();

    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(dir) = &cli.store_dir {
        config.store_dir = Some(dir.clone());
    }
    Ok(config)
}

async fn run<S: BookingStore>(
    command: Command,
    config: &BookingConfig,
    store: Arc<S>,
) -> anyhow::Result<()> {
    let service = BookingService::from_config(config, Arc::clone(&store));

    match command {
        Command::Lookup {
            confirmation_no,
            strategy,
        } => {
            let record = service.retrieve(&confirmation_no, strategy).await?;
            println!("{}", record.to_json_pretty()?);
        }
        Command::Pay {
            confirmation_no,
            strategy,
        } => {
            service.retrieve(&confirmation_no, strategy).await?;
            let payment = PaymentService::from_config(store, config);
            let url = payment.generate_payment_url(&confirmation_no).await?;
            println!("{}", url);
        }
    }
    Ok(())
}

// NotFound maps to 4 and InvalidStructure to 5, mirroring the 404/500 split
fn exit_code(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<BookingError>() {
        Some(BookingError::NotFound { .. }) => ExitCode::from(4),
        Some(BookingError::InvalidStructure(_)) => ExitCode::from(5),
        _ => ExitCode::FAILURE,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match config.store_dir.clone() {
        Some(dir) => run(cli.command, &config, Arc::new(JsonFileBookingStore::new(dir))).await,
        None => run(cli.command, &config, Arc::new(MemoryBookingStore::new())).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            exit_code(&e)
        }
    }
}
