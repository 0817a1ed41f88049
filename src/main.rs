use clap::{Parser, Subcommand};
use greenfriends_client::config::ConfigOverrides;
use greenfriends_client::net::types::{LoginCredentials, RegisterCredentials};
use greenfriends_client::{App, ClientConfig, ClientError, NavigationError};
use serde_json::{Value, json};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("navigation failed: {0}")]
    Navigation(#[from] NavigationError),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "greenfriends", about = "Campus plant guide client")]
struct Cli {
    /// Overrides GREENFRIENDS_API_BASE_URL.
    #[arg(long)]
    base_url: Option<String>,

    /// Overrides GREENFRIENDS_TOKEN_DIR.
    #[arg(long)]
    token_dir: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the route table.
    Routes,
    Register {
        username: String,
        nickname: String,
        email: String,
        #[arg(long, env = "GREENFRIENDS_PASSWORD")]
        password: String,
    },
    Login {
        /// Username or email.
        identifier: String,
        #[arg(long, env = "GREENFRIENDS_PASSWORD")]
        password: String,
    },
    Logout,
    /// Show the signed-in user.
    Whoami,
    /// Navigate to a location as the stored session would.
    Visit {
        location: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let overrides = ConfigOverrides { base_url: cli.base_url, token_dir: cli.token_dir };
    let config = ClientConfig::from_env_with(&overrides)?;
    let mut app = App::from_config(&config)?;

    match cli.command {
        Command::Routes => run_routes(&app),
        Command::Register { username, nickname, email, password } => {
            let credentials = RegisterCredentials { username, nickname, email, password };
            app.auth.register(&credentials).await?;
            print_json(&json!({ "registered": credentials.username }))
        }
        Command::Login { identifier, password } => {
            app.auth.login(&LoginCredentials::new(identifier, password)).await?;
            print_user(&app)
        }
        Command::Logout => {
            app.auth.logout();
            println!("logged out");
            Ok(())
        }
        Command::Whoami => {
            app.refresh_user().await?;
            print_user(&app)
        }
        Command::Visit { location } => run_visit(&mut app, &location).await,
    }
}

fn run_routes(app: &App) -> Result<(), CliError> {
    let routes: Vec<Value> = app
        .router
        .routes()
        .iter()
        .map(|route| {
            json!({
                "path": route.path,
                "name": route.name,
                "view": route.view,
                "redirect": route.redirect,
                "meta": route.meta,
            })
        })
        .collect();
    print_json(&Value::Array(routes))
}

async fn run_visit(app: &mut App, location: &str) -> Result<(), CliError> {
    // A rejected token has already been cleared; navigate as a guest.
    if let Err(e) = app.refresh_user().await {
        tracing::warn!(error = %e, "could not refresh user before navigating");
    }

    let nav = app.router.push(location)?;
    if let Some(from) = nav.redirected_from.as_deref() {
        eprintln!("redirected from {from}");
    }
    print_json(&json!({
        "title": nav.title,
        "route": nav.route,
        "redirectReason": nav.redirect_reason.map(|r| format!("{r:?}")),
    }))
}

fn print_user(app: &App) -> Result<(), CliError> {
    let session = app.auth.snapshot();
    print_json(&json!({
        "status": session.status,
        "authenticated": session.is_authenticated(),
        "user": session.user,
    }))
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
