use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use services::{ChatTransport, RegistrationService, TestEngine};
use storage::repository::Storage;
use storage::SupabaseConfig;
use telegram::{TelegramApi, TelegramTransport, UpdateDispatcher};

#[derive(Debug)]
enum ConfigError {
    MissingVar(&'static str),
    InvalidVar { var: &'static str, raw: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingVar(var) => {
                write!(f, "required environment variable {var} is not set")
            }
            ConfigError::InvalidVar { var, raw } => {
                write!(f, "invalid value for {var}: {raw}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

struct Config {
    bot_token: String,
    supabase_url: String,
    supabase_key: String,
    tasks_table: String,
    codes_table: String,
    time_limit: Duration,
    poll_timeout_secs: u64,
}

fn require_var(var: &'static str) -> Result<String, ConfigError> {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingVar(var)),
    }
}

fn var_or(var: &str, default: &str) -> String {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty()).unwrap_or_else(|| default.to_owned())
}

fn parse_secs(var: &'static str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(var) {
        Err(_) => Ok(default),
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidVar { var, raw }),
    }
}

impl Config {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            bot_token: require_var("BOT_TOKEN")?,
            supabase_url: require_var("SUPABASE_URL")?,
            supabase_key: require_var("SUPABASE_KEY")?,
            tasks_table: var_or("TASKS_TABLE", "tasks"),
            codes_table: var_or("CODES_TABLE", "codes"),
            time_limit: Duration::from_secs(parse_secs("TEST_TIME_LIMIT_SECS", 600)?),
            poll_timeout_secs: parse_secs("POLL_TIMEOUT_SECS", 30)?,
        })
    }
}

fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let config = Config::from_env()?;

    let storage = Storage::supabase(
        SupabaseConfig::new(&config.supabase_url, &config.supabase_key)
            .with_tables(&config.tasks_table, &config.codes_table),
    );

    let api = Arc::new(TelegramApi::new(&config.bot_token));
    let transport: Arc<dyn ChatTransport> = Arc::new(TelegramTransport::new(Arc::clone(&api)));

    let engine = Arc::new(
        TestEngine::new(
            Arc::clone(&storage.registrations),
            Arc::clone(&storage.tasks),
            Arc::clone(&transport),
        )
        .with_time_limit(config.time_limit),
    );
    let registration = Arc::new(RegistrationService::new(
        Arc::clone(&storage.registrations),
        transport,
        Arc::clone(&engine),
    ));

    let me = api.get_me().await?;
    tracing::info!(
        id = me.id,
        username = me.username.as_deref().unwrap_or("<unset>"),
        "bot starting (polling)"
    );

    let dispatcher = UpdateDispatcher::new(engine, registration, api);
    dispatcher.run_polling(config.poll_timeout_secs).await;
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
