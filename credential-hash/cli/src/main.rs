//! CLI for hashing and checking clinician credentials.
//!
//! ## Usage
//!
//! ```bash
//! # Hash a password (PBKDF2-HMAC-SHA256)
//! ch hash "Secure@123"
//! echo "Secure@123" | ch hash -
//!
//! # Check a password against a stored record
//! ch verify "<salt>:<key>" "Secure@123"
//!
//! # Policy checks
//! ch strength "Secure@123"
//! ch email doctor@sagalyze.ai
//!
//! # Clinician accounts (stored in ~/.sagalyze-clinicians.jsonl)
//! ch seed-demo
//! ch login --email doctor@sagalyze.ai "Secure@123"
//!
//! # Generate shell completions
//! source <(COMPLETE=bash ch)
//! ```

use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{CommandFactory, Parser, Subcommand, ValueHint};
use clap_complete::Shell;
use color_eyre::eyre::{Result, WrapErr, eyre};
use credential_hash::accounts::{
    Authenticator, Clinician, ClinicianStore, FitzpatrickType, JsonFileStore, NewClinician,
};
use credential_hash::{
    AccountError, CredentialHasher, HasherParams, check_strength, validate_identifier,
};
use tracing_subscriber::{filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use zeroize::Zeroizing;

/// Hash and verify clinician credentials (PBKDF2-HMAC-SHA256)
#[derive(Parser)]
#[command(name = "ch", version, about, long_about = None)]
#[command(after_help = AFTER_HELP)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    /// Clinician store file [default: $SAGALYZE_STORE or ~/.sagalyze-clinicians.jsonl]
    #[arg(long, value_name = "PATH", value_hint = ValueHint::FilePath, global = true)]
    store: Option<PathBuf>,

    /// PBKDF2 iteration count [default: $CREDENTIAL_HASH_ITERATIONS or 100000]
    #[arg(long, value_name = "N", global = true)]
    iterations: Option<u32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive a new credential record from a password
    Hash {
        /// Password (use "-" to read from stdin)
        #[arg(value_name = "PASSWORD")]
        password: Option<String>,
    },

    /// Check a password against a stored credential record
    Verify {
        /// Stored record, "<salt>:<key>"
        #[arg(value_name = "RECORD")]
        record: String,

        /// Candidate password (use "-" to read from stdin)
        #[arg(value_name = "PASSWORD")]
        password: Option<String>,
    },

    /// Check a password against the strength policy
    Strength {
        /// Password (use "-" to read from stdin)
        #[arg(value_name = "PASSWORD")]
        password: Option<String>,
    },

    /// Check that an email address has the local@domain shape
    Email {
        #[arg(value_name = "ADDRESS")]
        address: String,
    },

    /// Register a clinician in the store
    Enroll {
        #[arg(long)]
        email: String,

        #[arg(long)]
        name: Option<String>,

        /// Medical license number
        #[arg(long)]
        license: Option<String>,

        /// Fitzpatrick skin type (1-6)
        #[arg(long, value_name = "TYPE")]
        fitzpatrick: Option<u8>,

        /// Password (use "-" to read from stdin)
        #[arg(value_name = "PASSWORD")]
        password: Option<String>,
    },

    /// Authenticate a clinician against the store
    Login {
        #[arg(long)]
        email: String,

        /// Password (use "-" to read from stdin)
        #[arg(value_name = "PASSWORD")]
        password: Option<String>,
    },

    /// Change a clinician's password
    ///
    /// Passwords not given as flags are read from stdin, one per line:
    /// current first, then new.
    Passwd {
        #[arg(long)]
        email: String,

        /// Current password [default: read from stdin]
        #[arg(long, value_name = "PASSWORD")]
        current: Option<String>,

        /// New password [default: read from stdin]
        #[arg(long, value_name = "PASSWORD")]
        new: Option<String>,
    },

    /// Insert the demo clinician if it is missing
    SeedDemo,

    /// List stored clinicians (password hashes are never shown)
    List {
        /// Output as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

const AFTER_HELP: &str = "\
SHELL COMPLETIONS:
  Enable tab completions by adding one line to your shell config:

  Bash (~/.bashrc):
    source <(COMPLETE=bash ch)

  Zsh (~/.zshrc):
    source <(COMPLETE=zsh ch)

  Fish (~/.config/fish/config.fish):
    COMPLETE=fish ch | source

EXIT STATUS:
  0  success, match, strong, valid
  1  no match, weak, invalid, login failed
  2  error

EXAMPLES:
  ch hash \"Secure@123\"                       # New credential record
  echo \"Secure@123\" | ch hash -               # Password from stdin
  ch verify \"<salt>:<key>\" \"Secure@123\"      # match / no match
  ch strength \"Secure@123\"                   # strong / weak
  ch email doctor@sagalyze.ai                 # valid / invalid
  ch seed-demo                                # Insert demo clinician
  ch login --email doctor@sagalyze.ai -       # Password from stdin
  printf '%s\\n%s\\n' \"$OLD\" \"$NEW\" | ch passwd --email doctor@sagalyze.ai
";

/// Result of a command that answers yes or no.
enum Outcome {
    Yes,
    No,
}

impl From<Outcome> for ExitCode {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Yes => ExitCode::SUCCESS,
            Outcome::No => ExitCode::from(1),
        }
    }
}

impl From<bool> for Outcome {
    fn from(value: bool) -> Self {
        if value { Outcome::Yes } else { Outcome::No }
    }
}

fn main() -> ExitCode {
    // Check for shell completion generation before parsing args
    if let Ok(shell_name) = std::env::var("COMPLETE") {
        return generate_completions(&shell_name);
    }

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json_logs);

    match color_eyre::install().and_then(|()| run(&cli)) {
        Ok(outcome) => outcome.into(),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: &Cli) -> Result<Outcome> {
    let hasher = build_hasher(cli.iterations)?;

    match &cli.command {
        Commands::Hash { password } => {
            let password = read_password(password.as_deref())?;
            let record = hasher.derive(&password)?;
            println!("{record}");
            Ok(Outcome::Yes)
        }
        Commands::Verify { record, password } => {
            let password = read_password(password.as_deref())?;
            let matched = hasher.verify(Some(record.as_str()), &password);
            println!("{}", if matched { "match" } else { "no match" });
            Ok(matched.into())
        }
        Commands::Strength { password } => {
            let password = read_password(password.as_deref())?;
            let strong = check_strength(&password);
            println!("{}", if strong { "strong" } else { "weak" });
            Ok(strong.into())
        }
        Commands::Email { address } => {
            let valid = validate_identifier(address);
            println!("{}", if valid { "valid" } else { "invalid" });
            Ok(valid.into())
        }
        Commands::Enroll {
            email,
            name,
            license,
            fitzpatrick,
            password,
        } => {
            let mut profile = NewClinician::new(email.as_str());
            if let Some(name) = name {
                profile = profile.with_name(name.as_str());
            }
            if let Some(license) = license {
                profile = profile.with_license_number(license.as_str());
            }
            if let Some(n) = fitzpatrick {
                profile = profile.with_fitzpatrick_type(FitzpatrickType::try_from(*n)?);
            }

            let password = read_password(password.as_deref())?;
            let clinician = authenticator(cli, hasher).enroll(profile, &password)?;
            println!("enrolled {} (id {})", clinician.email, clinician.id);
            Ok(Outcome::Yes)
        }
        Commands::Login { email, password } => {
            let password = read_password(password.as_deref())?;
            match authenticator(cli, hasher).authenticate(email, &password) {
                Ok(clinician) => {
                    println!("authenticated {}", clinician.email);
                    Ok(Outcome::Yes)
                }
                Err(AccountError::InvalidCredentials) => {
                    eprintln!("{}", AccountError::InvalidCredentials);
                    Ok(Outcome::No)
                }
                Err(e) => Err(e.into()),
            }
        }
        Commands::Passwd {
            email,
            current,
            new,
        } => {
            let (current, new) = read_password_pair(current.as_deref(), new.as_deref())?;
            match authenticator(cli, hasher).change_password(email, &current, &new) {
                Ok(clinician) => {
                    println!("password changed for {}", clinician.email);
                    Ok(Outcome::Yes)
                }
                Err(AccountError::InvalidCredentials) => {
                    eprintln!("{}", AccountError::InvalidCredentials);
                    Ok(Outcome::No)
                }
                Err(e) => Err(e.into()),
            }
        }
        Commands::SeedDemo => {
            let auth = authenticator(cli, hasher);
            if auth.seed_demo()? {
                println!("inserted demo clinician {}", credential_hash::accounts::DEMO_EMAIL);
            } else {
                println!("demo clinician already present");
            }
            Ok(Outcome::Yes)
        }
        Commands::List { json } => {
            let clinicians = open_store(cli).all()?;
            if *json {
                let rows: Vec<serde_json::Value> = clinicians.iter().map(summary_json).collect();
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                print_table(&clinicians);
            }
            Ok(Outcome::Yes)
        }
    }
}

/// Hasher from `--iterations`, falling back to the environment.
fn build_hasher(iterations: Option<u32>) -> Result<CredentialHasher> {
    let params = match iterations {
        Some(n) => HasherParams::new(n, credential_hash::DEFAULT_KEY_LENGTH_BITS)?,
        None => HasherParams::from_env(),
    };
    Ok(CredentialHasher::new(params))
}

fn open_store(cli: &Cli) -> JsonFileStore {
    match &cli.store {
        Some(path) => JsonFileStore::new(path.clone()),
        None => JsonFileStore::default_path(),
    }
}

fn authenticator(cli: &Cli, hasher: CredentialHasher) -> Authenticator<JsonFileStore> {
    let store = open_store(cli);
    tracing::debug!(path = %store.path().display(), "using clinician store");
    Authenticator::new(store, hasher)
}

fn to_chars(s: &str) -> Zeroizing<Vec<char>> {
    Zeroizing::new(s.chars().collect())
}

/// Get the password from the positional arg or stdin.
fn read_password(arg: Option<&str>) -> Result<Zeroizing<Vec<char>>> {
    match arg {
        Some("-") => read_from_stdin(),
        Some(password) => Ok(to_chars(password)),
        None if !io::stdin().is_terminal() => read_from_stdin(),
        None => Err(eyre!(
            "No password provided. Use a positional argument or pipe to stdin."
        )),
    }
}

/// Read a password from stdin, dropping the trailing line break.
fn read_from_stdin() -> Result<Zeroizing<Vec<char>>> {
    let mut raw = Zeroizing::new(String::new());
    io::stdin()
        .read_to_string(&mut raw)
        .wrap_err("Failed to read from stdin")?;

    let password = raw.trim_end_matches(['\n', '\r']);
    if password.is_empty() {
        return Err(eyre!("Empty input from stdin"));
    }
    Ok(to_chars(password))
}

/// Get the current and new passwords from flags, taking any missing ones
/// from stdin lines in that order.
fn read_password_pair(
    current: Option<&str>,
    new: Option<&str>,
) -> Result<(Zeroizing<Vec<char>>, Zeroizing<Vec<char>>)> {
    let missing = usize::from(current.is_none()) + usize::from(new.is_none());
    let mut lines = if missing > 0 {
        read_lines_from_stdin(missing)?
    } else {
        Vec::new()
    }
    .into_iter();

    let mut take = |flag: Option<&str>| match flag {
        Some(password) => Ok(to_chars(password)),
        None => lines
            .next()
            .ok_or_else(|| eyre!("Missing password line on stdin")),
    };
    let current = take(current)?;
    let new = take(new)?;
    Ok((current, new))
}

/// Read `count` non-empty password lines from stdin.
fn read_lines_from_stdin(count: usize) -> Result<Vec<Zeroizing<Vec<char>>>> {
    let mut raw = Zeroizing::new(String::new());
    io::stdin()
        .read_to_string(&mut raw)
        .wrap_err("Failed to read from stdin")?;

    let lines: Vec<Zeroizing<Vec<char>>> = raw.lines().take(count).map(to_chars).collect();
    if lines.len() < count || lines.iter().any(|line| line.is_empty()) {
        return Err(eyre!(
            "Expected {count} non-empty password line(s) on stdin"
        ));
    }
    Ok(lines)
}

fn summary_json(c: &Clinician) -> serde_json::Value {
    serde_json::json!({
        "id": c.id,
        "email": c.email,
        "name": c.name,
        "license_number": c.license_number,
        "fitzpatrick_type": c.fitzpatrick_type.map(FitzpatrickType::value),
        "has_password": c.password_hash.is_some(),
        "created_at": c.created_at.to_rfc3339(),
    })
}

fn print_table(clinicians: &[Clinician]) {
    if clinicians.is_empty() {
        println!("no clinicians");
        return;
    }

    println!(
        "{:<4} {:<32} {:<20} {:<14} {:<4} CREATED",
        "ID", "EMAIL", "NAME", "LICENSE", "FST"
    );
    for c in clinicians {
        println!(
            "{:<4} {:<32} {:<20} {:<14} {:<4} {}",
            c.id,
            c.email,
            c.name.as_deref().unwrap_or("-"),
            c.license_number.as_deref().unwrap_or("-"),
            c.fitzpatrick_type
                .map(|t| t.to_string())
                .unwrap_or_else(|| "-".into()),
            c.created_at.format("%d %b %Y, %H:%M"),
        );
    }
}

fn init_tracing(verbose: u8, json: bool) {
    let base_filter = match std::env::var("RUST_LOG") {
        Ok(filter) => filter,
        Err(_) => match verbose {
            0 => "warn".to_string(),
            1 => "warn,credential_hash=info".to_string(),
            2 => "info,credential_hash=debug,ch=debug".to_string(),
            _ => "debug,credential_hash=trace,ch=trace".to_string(),
        },
    };

    let filter = EnvFilter::try_new(&base_filter).unwrap_or_else(|_| EnvFilter::new("warn"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_file(verbose >= 3)
                    .with_line_number(verbose >= 3)
                    .with_writer(io::stderr)
                    .compact(),
            )
            .init();
    }
}

/// Generate shell completions and exit.
fn generate_completions(shell_name: &str) -> ExitCode {
    let shell = match shell_name.to_lowercase().as_str() {
        "bash" => Shell::Bash,
        "zsh" => Shell::Zsh,
        "fish" => Shell::Fish,
        "powershell" => Shell::PowerShell,
        "elvish" => Shell::Elvish,
        _ => {
            eprintln!(
                "Unknown shell: {shell_name}. Supported: bash, zsh, fish, powershell, elvish"
            );
            return ExitCode::from(2);
        }
    };

    clap_complete::generate(shell, &mut Cli::command(), "ch", &mut io::stdout());
    ExitCode::SUCCESS
}
