use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::Value;

use translator_client::config::{ClientConfig, ConfigError};
use translator_client::error::ApiError;
use translator_client::net::client::ApiClient;
use translator_client::net::query::{RetryPolicy, fetch_with_retry};
use translator_client::net::types::{
    ChangePasswordRequest, JobQuery, JobStatus, LoginRequest, RegisterRequest, ResetPasswordRequest, UserPatch,
};
use translator_client::net::{account, auth, billing, jobs};
use translator_client::startup::reconcile_session;
use translator_client::state::cookies::{load_cookies, save_cookies};
use translator_client::state::storage::{FileStorage, SessionStorage};
use translator_client::state::store::SessionStore;
use translator_client::util::navigation::Headless;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Api(#[from] ApiError),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("not logged in; run `translator-cli login` first")]
    NotLoggedIn,
}

#[derive(Parser, Debug)]
#[command(name = "translator-cli", about = "Translation service API client")]
struct Cli {
    #[arg(long, env = "API_BASE_URL")]
    base_url: Option<String>,

    /// Directory holding the persisted session and refresh cookie.
    #[arg(long, env = "TRANSLATOR_STATE_DIR", default_value = ".translator")]
    state_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "TRANSLATOR_PASSWORD")]
        password: String,
        #[arg(long, default_value_t = false)]
        remember_me: bool,
    },
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "TRANSLATOR_PASSWORD")]
        password: String,
    },
    Logout,
    Whoami,
    Refresh,
    ForgotPassword {
        #[arg(long)]
        email: String,
    },
    ResetPassword {
        #[arg(long)]
        token: String,
        #[arg(long, env = "TRANSLATOR_PASSWORD")]
        password: String,
    },
    VerifyEmail {
        #[arg(long)]
        token: String,
    },
    ResendVerification {
        #[arg(long)]
        email: String,
    },
    UpdateProfile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        locale: Option<String>,
    },
    ChangePassword {
        #[arg(long)]
        current: String,
        #[arg(long)]
        new: String,
    },
    Stats,
    Jobs(JobsCommand),
    Billing(BillingCommand),
    /// Raw authenticated GET against an API path.
    Get {
        path: String,
    },
}

#[derive(Args, Debug)]
struct JobsCommand {
    #[command(subcommand)]
    command: JobsSubcommand,
}

#[derive(Subcommand, Debug)]
enum JobsSubcommand {
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        page_size: u32,
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
    },
    Show {
        id: String,
    },
    Cancel {
        id: String,
    },
    Delete {
        id: String,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StatusArg {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl From<StatusArg> for JobStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Pending => Self::Pending,
            StatusArg::Processing => Self::Processing,
            StatusArg::Completed => Self::Completed,
            StatusArg::Failed => Self::Failed,
            StatusArg::Cancelled => Self::Cancelled,
        }
    }
}

#[derive(Args, Debug)]
struct BillingCommand {
    #[command(subcommand)]
    command: BillingSubcommand,
}

#[derive(Subcommand, Debug)]
enum BillingSubcommand {
    Subscription,
    Invoices,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let config = match &cli.base_url {
        Some(base_url) => ClientConfig::new(base_url, ClientConfig::from_env()?.timeouts)?,
        None => ClientConfig::from_env()?,
    };

    let storage: Arc<dyn SessionStorage> = Arc::new(FileStorage::new(&cli.state_dir));
    let store = SessionStore::hydrate(Arc::clone(&storage));
    let client = ApiClient::with_cookies(config, store, Arc::new(Headless), load_cookies(storage.as_ref()))?;

    let session = reconcile_session(&client).await;
    tracing::debug!(is_authenticated = session.is_authenticated, "session reconciled");

    let outcome = run(&client, cli.command).await;
    save_cookies(storage.as_ref(), client.cookie_jar());
    outcome
}

async fn run(client: &ApiClient, command: Command) -> Result<(), CliError> {
    match command {
        Command::Login { email, password, remember_me } => {
            let user = auth::login(client, &LoginRequest { email, password, remember_me }).await?;
            print_json(&user)
        }
        Command::Register { name, email, password } => {
            print_json(&auth::register(client, &RegisterRequest { name, email, password }).await?)
        }
        Command::Logout => {
            auth::logout(client).await;
            print_json(&serde_json::json!({ "loggedOut": true }))
        }
        Command::Whoami => {
            require_session(client)?;
            print_json(&auth::me(client).await?)
        }
        Command::Refresh => {
            require_session(client)?;
            let refreshed = client.refresh_session().await?;
            client.establish_session(refreshed.clone());
            print_json(&refreshed.user)
        }
        Command::ForgotPassword { email } => print_json(&auth::forgot_password(client, &email).await?),
        Command::ResetPassword { token, password } => {
            print_json(&auth::reset_password(client, &ResetPasswordRequest { token, password }).await?)
        }
        Command::VerifyEmail { token } => print_json(&auth::verify_email(client, &token).await?),
        Command::ResendVerification { email } => print_json(&auth::resend_verification(client, &email).await?),
        Command::UpdateProfile { name, locale } => {
            require_session(client)?;
            let patch = UserPatch { name, locale: locale.map(Some), ..UserPatch::default() };
            print_json(&account::update_profile(client, &patch).await?)
        }
        Command::ChangePassword { current, new } => {
            require_session(client)?;
            let request = ChangePasswordRequest { current_password: current, new_password: new };
            print_json(&account::change_password(client, &request).await?)
        }
        Command::Stats => {
            require_session(client)?;
            let policy = RetryPolicy::default();
            print_json(&fetch_with_retry(&policy, || jobs::dashboard_stats(client)).await?)
        }
        Command::Jobs(jobs_command) => {
            require_session(client)?;
            run_jobs(client, jobs_command).await
        }
        Command::Billing(billing_command) => {
            require_session(client)?;
            match billing_command.command {
                BillingSubcommand::Subscription => print_json(&billing::subscription(client).await?),
                BillingSubcommand::Invoices => print_json(&billing::invoices(client).await?),
            }
        }
        Command::Get { path } => {
            let path = if path.starts_with('/') { path } else { format!("/{path}") };
            print_json(&client.get::<Value>(&path).await?)
        }
    }
}

async fn run_jobs(client: &ApiClient, command: JobsCommand) -> Result<(), CliError> {
    match command.command {
        JobsSubcommand::List { page, page_size, status } => {
            let query = JobQuery { page, page_size, status: status.map(JobStatus::from) };
            let policy = RetryPolicy::default();
            print_json(&fetch_with_retry(&policy, || jobs::list_jobs(client, &query)).await?)
        }
        JobsSubcommand::Show { id } => print_json(&jobs::get_job(client, &id).await?),
        JobsSubcommand::Cancel { id } => print_json(&jobs::cancel_job(client, &id).await?),
        JobsSubcommand::Delete { id } => {
            jobs::delete_job(client, &id).await?;
            print_json(&serde_json::json!({ "deleted": id }))
        }
    }
}

fn require_session(client: &ApiClient) -> Result<(), CliError> {
    if client.store().is_authenticated() {
        Ok(())
    } else {
        Err(CliError::NotLoggedIn)
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
