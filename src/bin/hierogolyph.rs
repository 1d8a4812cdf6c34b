//! Hierogolyph CLI - password-based envelope encryption of files
//!
//! Adapters and secrets come from a TOML config file. The salt and wrapped
//! key live in a JSON record created by `hierogolyph init`.

use clap::{Parser, Subcommand};
use std::error::Error as StdError;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

use hierogolyph::file_ops;
use hierogolyph::password::{PasswordReader, StreamPasswordReader, TerminalPasswordReader};
use hierogolyph::{Config, ConfigFile, HierogolyphError};

#[derive(Parser)]
#[command(name = "hierogolyph")]
#[command(version)]
#[command(about = "Password-based envelope encryption.", long_about = None)]
struct Cli {
    /// Read password from stdin instead of from terminal
    #[arg(long, global = true)]
    password_stdin: bool,

    /// Path to the TOML file selecting cipher, hasher, KMS and secrets
    #[arg(
        short,
        long,
        global = true,
        value_name = "FILE",
        env = "HIEROGOLYPH_CONFIG",
        default_value = "hierogolyph.toml"
    )]
    config: PathBuf,

    /// Path to the JSON record holding the salt and wrapped key
    #[arg(
        short,
        long,
        global = true,
        value_name = "FILE",
        env = "HIEROGOLYPH_RECORD",
        default_value = "hierogolyph.json"
    )]
    record: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new salt and wrapped key and write them to the record file
    Init,

    /// Encrypt a file
    #[command(alias = "e")]
    Encrypt {
        /// Path to the file whose contents is to be encrypted
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to the file to write the encrypted text to
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Decrypt a file
    #[command(alias = "d")]
    Decrypt {
        /// Path to the file whose contents is to be decrypted
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to the file to write the unencrypted text to
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Update an encrypted file with new content, while validating
    /// that the password is not accidentally changed.
    #[command(alias = "u")]
    Update {
        /// Path to the file whose contents is to be encrypted
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to the existing encrypted file to replace
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        let label = if e.is_user_error() {
            "Error"
        } else {
            "Internal error"
        };
        eprintln!("{}: {}", label, error_chain(&e));
        process::exit(1);
    }
}

fn run(cli: Cli) -> hierogolyph::Result<()> {
    let config = load_config(&cli.config)?;
    match cli.command {
        Commands::Init => {
            let mut reader = get_password_reader(cli.password_stdin, true);
            file_ops::init_record(&cli.record, &config, &mut *reader)?;
            eprintln!("created {}", cli.record.display());
            Ok(())
        }
        Commands::Encrypt { input, output } => {
            let mut reader = get_password_reader(cli.password_stdin, false);
            file_ops::encrypt_file(&input, &output, &cli.record, &config, &mut *reader)
        }
        Commands::Decrypt { input, output } => {
            let mut reader = get_password_reader(cli.password_stdin, false);
            file_ops::decrypt_file(&input, &output, &cli.record, &config, &mut *reader)
        }
        Commands::Update { input, output } => {
            let mut reader = get_password_reader(cli.password_stdin, false);
            file_ops::update_file(&input, &output, &cli.record, &config, &mut *reader)
        }
    }
}

fn load_config(path: &std::path::Path) -> hierogolyph::Result<Config> {
    ConfigFile::load(path)?.into_config()
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // A second initialisation can only fail if a subscriber is already set.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn get_password_reader(use_stdin: bool, confirm: bool) -> Box<dyn PasswordReader> {
    if use_stdin {
        Box::new(StreamPasswordReader::new(Box::new(std::io::stdin())))
    } else if confirm {
        Box::new(TerminalPasswordReader::with_confirmation())
    } else {
        Box::new(TerminalPasswordReader::new())
    }
}

fn error_chain(err: &HierogolyphError) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source_error().map(|s| s as &(dyn StdError + 'static));
    while let Some(cause) = source {
        // Some messages already embed their cause.
        let text = cause.to_string();
        if !rendered.ends_with(&text) {
            rendered.push_str(": ");
            rendered.push_str(&text);
        }
        source = cause.source();
    }
    rendered
}
