use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use missionlink::catalog::{self, normalize_iso2};
use missionlink::net::Attachment;
use missionlink::services::dashboard::DashboardController;
use missionlink::services::reports::ReportDraft;
use missionlink::services::{auth, countries, me, reports};
use missionlink::state::country_panel::{EXCERPT_CHARS, excerpt};
use missionlink::types::CountryReport;
use missionlink::{ApiClient, ApiError, ClientConfig};
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("unknown country `{0}`; use an ISO2 code or an English name")]
    UnknownCountry(String),
    #[error("refusing to delete the account; pass --confirm DELETE")]
    ConfirmationRequired,
    #[error("invalid JSON output: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    fn user_message(&self) -> String {
        match self {
            Self::Api(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "missionlink", about = "MissionLink field-assignment client")]
struct Cli {
    #[arg(long, env = "MISSIONLINK_API_BASE_URL")]
    base_url: Option<String>,

    #[arg(long, env = "MISSIONLINK_SESSION_FILE")]
    session_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and store the session.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "MISSIONLINK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account, then sign in.
    Signup {
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "MISSIONLINK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Logout,
    /// Show the stored session.
    Whoami,
    Me(MeCommand),
    Assignments(AssignmentsCommand),
    Reports(ReportsCommand),
    /// Show the map panel for one country.
    Country {
        iso2: String,
    },
    Countries(CountriesCommand),
}

#[derive(Args, Debug)]
struct MeCommand {
    #[command(subcommand)]
    command: MeSubcommand,
}

#[derive(Subcommand, Debug)]
enum MeSubcommand {
    Show,
    /// Change profile fields; omitted fields keep their current value.
    Update {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        bio: Option<String>,
        #[arg(long)]
        website: Option<String>,
        #[arg(long)]
        avatar_url: Option<String>,
    },
    /// Upload a new avatar image (png, jpg, jpeg, gif, webp).
    Avatar {
        path: PathBuf,
    },
    /// Permanently delete the account.
    Delete {
        #[arg(long)]
        confirm: Option<String>,
    },
}

#[derive(Args, Debug)]
struct AssignmentsCommand {
    #[command(subcommand)]
    command: AssignmentsSubcommand,
}

#[derive(Subcommand, Debug)]
enum AssignmentsSubcommand {
    Show,
    /// Replace the assignment list. Accepts ISO2 codes or English names.
    Set {
        countries: Vec<String>,
    },
}

#[derive(Args, Debug)]
struct ReportsCommand {
    #[command(subcommand)]
    command: ReportsSubcommand,
}

#[derive(Subcommand, Debug)]
enum ReportsSubcommand {
    List,
    Create {
        #[arg(long)]
        country: String,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        content: String,
        /// Photo to attach; repeat for several.
        #[arg(long = "image")]
        images: Vec<PathBuf>,
        /// PDF document to attach (max 15MB).
        #[arg(long)]
        pdf: Option<PathBuf>,
    },
    Delete {
        id: i64,
    },
}

#[derive(Args, Debug)]
struct CountriesCommand {
    #[command(subcommand)]
    command: CountriesSubcommand,
}

#[derive(Subcommand, Debug)]
enum CountriesSubcommand {
    Search { query: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("warning: could not read .env: {e}");
        }
    }
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            eprintln!("error: {}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = ClientConfig::from_env();
    if let Some(base_url) = cli.base_url {
        config.api_base_url = base_url.trim_end_matches('/').to_owned();
    }
    if let Some(session_file) = cli.session_file {
        config.session_file = session_file;
    }
    let client = ApiClient::from_config(&config)?;

    match cli.command {
        Command::Login { email, password } => {
            let session = auth::login(&client, &email, &password).await?;
            print_json(&json!({ "email": session.user.email, "role": session.user.role }))
        }
        Command::Signup { name, email, password } => {
            let session = auth::register(&client, &name, &email, &password).await?;
            print_json(&json!({ "email": session.user.email, "role": session.user.role }))
        }
        Command::Logout => {
            auth::logout(&client)?;
            print_json(&json!({ "signed_in": false }))
        }
        Command::Whoami => match auth::current_session(&client) {
            Some(session) => print_json(&json!({ "signed_in": true, "email": session.user.email, "role": session.user.role })),
            None => print_json(&json!({ "signed_in": false })),
        },
        Command::Me(cmd) => run_me(&client, cmd).await,
        Command::Assignments(cmd) => run_assignments(&client, cmd).await,
        Command::Reports(cmd) => run_reports(&client, cmd).await,
        Command::Country { iso2 } => run_country(&client, &iso2).await,
        Command::Countries(CountriesCommand { command: CountriesSubcommand::Search { query } }) => {
            let hits: Vec<Value> = catalog::search(&query)
                .into_iter()
                .map(|name| json!({ "name": name, "iso2": catalog::iso2_for_name(name) }))
                .collect();
            print_json(&Value::Array(hits))
        }
    }
}

async fn run_me(client: &ApiClient, cmd: MeCommand) -> Result<(), CliError> {
    match cmd.command {
        MeSubcommand::Show => {
            let profile = me::fetch_me(client).await?;
            print_json(&serde_json::to_value(profile)?)
        }
        MeSubcommand::Update { name, email, bio, website, avatar_url } => {
            let mut controller = DashboardController::new(client.clone());
            controller.load().await?;
            let form = &mut controller.state_mut().profile;
            for (field, value) in [
                (&mut form.name, name),
                (&mut form.email, email),
                (&mut form.bio, bio),
                (&mut form.website, website),
                (&mut form.avatar_url, avatar_url),
            ] {
                if let Some(value) = value {
                    *field = value;
                }
            }
            let saved = controller.save_profile().await?;
            print_json(&json!({ "saved": saved, "profile": controller.state().profile }))
        }
        MeSubcommand::Avatar { path } => {
            let url = me::upload_avatar(client, Attachment::from_path(&path)?).await?;
            print_json(&json!({ "avatar_url": client.file_url(&url) }))
        }
        MeSubcommand::Delete { confirm } => {
            if confirm.as_deref() != Some("DELETE") {
                return Err(CliError::ConfirmationRequired);
            }
            me::delete_account(client).await?;
            print_json(&json!({ "deleted": true }))
        }
    }
}

async fn run_assignments(client: &ApiClient, cmd: AssignmentsCommand) -> Result<(), CliError> {
    let codes = match cmd.command {
        AssignmentsSubcommand::Show => me::fetch_assignments(client).await?,
        AssignmentsSubcommand::Set { countries } => {
            let wanted = countries.iter().map(|c| resolve_country(c)).collect::<Result<Vec<_>, _>>()?;
            me::save_assignments(client, &wanted).await?
        }
    };
    let listed: Vec<Value> = codes
        .iter()
        .map(|code| json!({ "iso2": code, "name": catalog::display_name(code) }))
        .collect();
    print_json(&Value::Array(listed))
}

async fn run_reports(client: &ApiClient, cmd: ReportsCommand) -> Result<(), CliError> {
    match cmd.command {
        ReportsSubcommand::List => {
            let list = reports::list_reports(client).await?;
            print_json(&serde_json::to_value(list)?)
        }
        ReportsSubcommand::Create { country, title, content, images, pdf } => {
            let draft = ReportDraft {
                country_iso2: resolve_country(&country)?,
                title,
                content,
                images: images.iter().map(|p| Attachment::from_path(p)).collect::<Result<_, _>>()?,
                document: pdf.as_deref().map(Attachment::from_path).transpose()?,
            };
            let mut controller = DashboardController::new(client.clone());
            let id = controller.add_report(&draft).await?;
            print_json(&json!({ "id": id, "reports": controller.state().reports_newest_first() }))
        }
        ReportsSubcommand::Delete { id } => {
            reports::delete_report(client, id).await?;
            print_json(&json!({ "deleted": id }))
        }
    }
}

async fn run_country(client: &ApiClient, iso2: &str) -> Result<(), CliError> {
    let panel = countries::load_country_panel(client, iso2, |panel| {
        tracing::debug!(
            iso2 = %panel.iso2,
            missionaries_settled = panel.missionaries.is_settled(),
            reports_settled = panel.reports.is_settled(),
            hydrating = panel.hydrating,
            "country panel updated"
        );
    })
    .await?;

    // Only the most recent reports are shown, as on the map, each cut to an excerpt.
    let recent: Vec<CountryReport> = panel
        .recent_reports()
        .iter()
        .cloned()
        .map(|mut report| {
            report.content = excerpt(&report.content, EXCERPT_CHARS);
            report
        })
        .collect();
    let mut rendered = serde_json::to_value(&panel)?;
    if let Some(shown) = rendered.pointer_mut("/reports/data") {
        *shown = serde_json::to_value(recent)?;
    }
    print_json(&rendered)
}

fn resolve_country(raw: &str) -> Result<String, CliError> {
    if raw.trim().len() == 2 {
        if let Some(code) = normalize_iso2(raw) {
            return Ok(code);
        }
    }
    catalog::iso2_for_name(raw)
        .map(str::to_owned)
        .ok_or_else(|| CliError::UnknownCountry(raw.to_owned()))
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
