use azurestack_provider::config::ProviderConfig;
use azurestack_provider::provider::State;
use azurestack_provider::{Client, Provider};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use log::LevelFilter;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::config::{Appender, Config, Root};
use serde_json::Value;
use std::error::Error;
use std::path::{Path, PathBuf};

/// Drive the AzureStack resources from the command line.
#[derive(Parser, Debug)]
#[command(name = "azurestack-provider")]
#[command(version)]
#[command(about = "AzureStack Key Vault and Network resources", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print every resource and data source schema as JSON
    Schema,

    /// Run one resource operation and print the resulting state
    Apply {
        /// Resource type, e.g. azurestack_subnet
        #[arg(long)]
        resource: String,

        #[arg(long, value_enum)]
        operation: Operation,

        /// JSON file with the configured attributes
        #[arg(long)]
        attributes: Option<PathBuf>,

        /// JSON file with the prior state (read, update, delete)
        #[arg(long)]
        state: Option<PathBuf>,

        /// Resource ID (read, update, delete, import)
        #[arg(long)]
        id: Option<String>,
    },

    /// Read a data source and print its state
    Data {
        /// Data source type, e.g. azurestack_key_vault
        #[arg(long)]
        data_source: String,

        /// JSON file with the configured attributes
        #[arg(long)]
        attributes: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Operation {
    Create,
    Read,
    Update,
    Delete,
    Import,
}

fn init_logging() {
    if log4rs::init_file("log4rs.yml", Default::default()).is_ok() {
        return;
    }
    let stderr = ConsoleAppender::builder().target(Target::Stderr).build();
    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(LevelFilter::Warn));
    if let Ok(config) = config {
        let _ = log4rs::init_config(config);
    }
}

fn read_state(path: Option<&Path>) -> Result<State, Box<dyn Error>> {
    let Some(path) = path else {
        return Ok(State::new());
    };
    let raw = std::fs::read_to_string(path)?;
    match serde_json::from_str::<Value>(&raw)? {
        Value::Object(map) => Ok(map),
        _ => Err(format!("{} must contain a JSON object", path.display()).into()),
    }
}

fn required_id(id: Option<String>) -> Result<String, Box<dyn Error>> {
    id.ok_or_else(|| "--id is required for this operation".into())
}

fn print_state(state: Option<State>) -> Result<(), Box<dyn Error>> {
    match state {
        Some(state) => println!("{}", serde_json::to_string_pretty(&state)?),
        None => println!("{}", "resource no longer exists".yellow()),
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let provider = Provider::new()?;

    let (resource, operation, attributes, state, id) = match cli.command {
        Commands::Schema => {
            println!("{}", serde_json::to_string_pretty(&provider.schemas()?)?);
            return Ok(());
        }
        Commands::Data {
            data_source,
            attributes,
        } => {
            let config = read_state(Some(&attributes))?;
            let client = Client::build(&ProviderConfig::from_env()?).await?;
            let state = provider.read_data_source(&client, &data_source, config).await?;
            return print_state(Some(state));
        }
        Commands::Apply {
            resource,
            operation,
            attributes,
            state,
            id,
        } => (resource, operation, attributes, state, id),
    };

    let config = read_state(attributes.as_deref())?;
    let prior = read_state(state.as_deref())?;
    let client = Client::build(&ProviderConfig::from_env()?).await?;
    log::info!("[INFO] {operation:?} {resource}");

    match operation {
        Operation::Create => print_state(provider.create(&client, &resource, config).await?),
        Operation::Read => {
            let id = required_id(id)?;
            print_state(provider.read(&client, &resource, &id, prior).await?)
        }
        Operation::Update => {
            let id = required_id(id)?;
            print_state(provider.update(&client, &resource, &id, prior, config).await?)
        }
        Operation::Delete => {
            let id = required_id(id)?;
            provider.delete(&client, &resource, &id, prior).await?;
            println!("{}", format!("deleted {id}").green());
            Ok(())
        }
        Operation::Import => {
            let id = required_id(id)?;
            print_state(Some(provider.import(&client, &resource, &id).await?))
        }
    }
}

#[tokio::main]
async fn main() {
    // Do as little as possible in main.rs as it can't contain any tests
    init_logging();
    dotenv::dotenv().ok();
    log::info!("#Start main()");

    if let Err(e) = run(Cli::parse()).await {
        eprintln!("{} {e}", "Error:".red().bold());
        std::process::exit(1);
    }
}
