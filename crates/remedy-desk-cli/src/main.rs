mod repl;

use std::io::{self, BufRead, IsTerminal, Write};

use clap::{Parser, Subcommand};
use remedy_desk_core::{render, DeskConfig, FrontDesk, Intent, Notice, NoticeLevel, SessionState};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use repl::Command;

#[derive(Parser)]
#[command(name = "remedy-desk")]
#[command(about = "Clinic front desk: patients, visits and remedy lookup")]
struct Cli {
    /// Directory endpoint URL (overrides REMEDY_DESK_ENDPOINT)
    #[arg(long)]
    endpoint: Option<String>,

    /// Remedy sheet URL or CSV path (overrides REMEDY_DESK_SHEET_URL)
    #[arg(long)]
    sheet: Option<String>,

    /// HTTP timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive desk session (default)
    Session,
    /// Look up a patient by phone number
    Lookup {
        /// Phone number
        phone: String,
    },
    /// Sync remedies and show suggestions for a prescription draft
    Remedies {
        /// Draft text, e.g. "Aconite 6C, bell"
        draft: String,
    },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("remedy_desk=info".parse()?))
        .with(fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = DeskConfig::from_env();
    if let Some(endpoint) = cli.endpoint.as_deref() {
        config = config.with_endpoint(endpoint);
    }
    if let Some(sheet) = cli.sheet {
        config.remedy_sheet_url = sheet;
    }
    if let Some(timeout) = cli.timeout.filter(|secs| *secs > 0) {
        config.request_timeout_secs = timeout;
    }
    if !config.is_directory_configured() {
        tracing::warn!("Directory endpoint not configured; patient search and saves are disabled");
    }

    let mut desk = FrontDesk::from_config(config)?;

    match cli.command.unwrap_or(Commands::Session) {
        Commands::Session => run_session(&mut desk)?,
        Commands::Lookup { phone } => {
            let transition = desk.dispatch(SessionState::new(), Intent::Search { phone });
            print_notice(transition.notice.as_ref());
            println!("{}", render(&transition.state, desk.config()));
        }
        Commands::Remedies { draft } => {
            let transition = desk.dispatch(SessionState::new(), Intent::SyncRemedies);
            print_notice(transition.notice.as_ref());
            let transition = desk.dispatch(transition.state, Intent::EditPrescription(draft));
            let screen = render(&transition.state, desk.config());
            println!("{}", screen);
        }
    }

    Ok(())
}

fn run_session(desk: &mut FrontDesk) -> anyhow::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    println!("Remedy desk. Type 'help' for commands.");
    let transition = desk.dispatch(SessionState::new(), Intent::SyncRemedies);
    print_notice(transition.notice.as_ref());
    let mut state = transition.state;
    println!("{}", render(&state, desk.config()));

    let mut lines = stdin.lock().lines();
    loop {
        print!("desk> ");
        stdout.flush()?;

        let Some(line) = lines.next() else { break };
        let command = match repl::parse_line(&line?) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                println!("{}", message);
                continue;
            }
        };

        let intent = match command {
            Command::Quit => break,
            Command::Help => {
                println!("{}", repl::HELP);
                continue;
            }
            Command::Show => {
                println!("{}", render(&state, desk.config()));
                continue;
            }
            Command::Endpoint => {
                let Some(url) = read_endpoint(&mut lines)? else { break };
                if let Err(e) = desk.set_directory_endpoint(&url) {
                    print_notice(Some(&Notice::from_error(&e)));
                    continue;
                }
                let notice = if desk.config().is_directory_configured() {
                    Notice::success("Directory endpoint set")
                } else {
                    Notice::info("Directory endpoint cleared")
                };
                print_notice(Some(&notice));
                continue;
            }
            Command::Search(phone) => Ok(Intent::Search { phone }),
            Command::Register(fields) => repl::registration_intent(&state, &fields),
            Command::Prescription(text) => Ok(Intent::EditPrescription(text)),
            Command::Pick(n) => Ok(Intent::SelectRemedy(n)),
            Command::Repeat(n) => Ok(Intent::RepeatVisit(n)),
            Command::Visit(fields) => {
                repl::visit_intent(&state, &fields, chrono::Local::now().date_naive())
            }
            Command::Sync => Ok(Intent::SyncRemedies),
            Command::Reset => Ok(Intent::Reset),
        };

        let intent = match intent {
            Ok(intent) => intent,
            Err(message) => {
                println!("{}", message);
                continue;
            }
        };

        let transition = desk.dispatch(state, intent);
        state = transition.state;
        print_notice(transition.notice.as_ref());
        println!("{}", render(&state, desk.config()));
    }

    Ok(())
}

/// Read the endpoint URL without echoing it. Piped input takes the next line.
/// `None` means input ended.
fn read_endpoint<I>(lines: &mut I) -> anyhow::Result<Option<String>>
where
    I: Iterator<Item = io::Result<String>>,
{
    if io::stdin().is_terminal() {
        return Ok(Some(rpassword::prompt_password("endpoint URL: ")?));
    }
    print!("endpoint URL: ");
    io::stdout().flush()?;
    let url = lines.next().transpose()?;
    println!();
    Ok(url)
}

fn print_notice(notice: Option<&Notice>) {
    if let Some(notice) = notice {
        let tag = match notice.level {
            NoticeLevel::Success => "ok",
            NoticeLevel::Info => "info",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        };
        println!("[{}] {}", tag, notice.message);
    }
}
