//! secstore: read and write encrypted preferences from the shell
//!
//! Commands:
//!   get <name>                     - print a decrypted value
//!   set <name> <value> [--type T]  - encrypt and store a value
//!   delete <name>                  - remove a value
//!   passphrase                     - set a new passphrase (rotates the key)
//!   status                         - show suite, files, and key state
//!
//! Values live in `<data_dir>/<suite>.json`; the key and IV live in the
//! platform keychain.

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use clap::{Parser, Subcommand, ValueEnum};
use secrecy::SecretString;
use std::path::PathBuf;

use secstore::{EncryptedStore, StoreOptions, Value};
use secstore_core::config::{expand_tilde, SecstoreConfig};
use secstore_core::SecstoreError;
use secstore_secrets::KeychainCredentialStore;
use secstore_storage::{FilePreferenceStore, PreferenceStore};

type CliStore = EncryptedStore<FilePreferenceStore, KeychainCredentialStore>;

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "secstore",
    version,
    about = "Encrypted preference store",
    long_about = "secstore: transparent AES-256 encryption over a plain key-value preference file"
)]
struct Cli {
    /// Path to secstore.toml configuration file
    #[arg(
        long,
        short = 'c',
        env = "SECSTORE_CONFIG",
        default_value = "~/.config/secstore/config.toml"
    )]
    config: PathBuf,

    /// Suite name (overrides [store].suite)
    #[arg(long, short = 's')]
    suite: Option<String>,

    /// Log level (trace, debug, info, warn, error); overrides [log].level
    #[arg(long, env = "SECSTORE_LOG")]
    log: Option<String>,

    /// Log format (json, text); overrides [log].format
    #[arg(long, env = "SECSTORE_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print a decrypted value
    Get {
        name: String,
        /// Print the tagged JSON form instead of the bare value
        #[arg(long)]
        json: bool,
    },

    /// Encrypt and store a value
    Set {
        name: String,
        value: String,
        /// How to interpret VALUE
        #[arg(long, short = 't', value_enum, default_value = "string")]
        r#type: ValueType,
    },

    /// Remove a value
    Delete { name: String },

    /// Set a new passphrase; values written under the old key become unreadable
    ///
    /// Read from SECSTORE_PASSPHRASE when set, otherwise prompted for twice.
    Passphrase,

    /// Show suite, storage paths, and key state
    Status,
}

#[derive(Clone, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ValueType {
    String,
    Integer,
    Float,
    Double,
    Bool,
    /// Base64-encoded bytes
    Data,
    Url,
}

// ── Entry point ────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = expand_tilde(&cli.config);
    let config = SecstoreConfig::load(&config_path)?;

    let level = cli.log.clone().unwrap_or_else(|| config.log.level.clone());
    let format = match cli.log_format.clone() {
        Some(f) => f,
        None => LogFormat::from_str(&config.log.format, true)
            .map_err(|e| SecstoreError::Config(format!("[log].format: {e}")))?,
    };
    init_logging(&level, &format);

    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path.display(),
        "secstore starting"
    );

    let mut options = StoreOptions::from_config(&config);
    if cli.suite.is_some() {
        options.suite = cli.suite.clone();
    }

    let plain = FilePreferenceStore::open(&config.store.data_dir, options.suite.as_deref())?;
    let credentials = KeychainCredentialStore::new(config.keychain.service.clone());
    let mut store = EncryptedStore::new(plain, credentials, options);

    match cli.command {
        Commands::Get { name, json } => cmd_get(&mut store, &name, json),
        Commands::Set {
            name,
            value,
            r#type,
        } => cmd_set(&mut store, &name, &value, r#type),
        Commands::Delete { name } => cmd_delete(&mut store, &name),
        Commands::Passphrase => cmd_passphrase(&mut store),
        Commands::Status => cmd_status(&store, &config),
    }
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

// ── Commands ───────────────────────────────────────────────────────────────────

fn cmd_get(store: &mut CliStore, name: &str, json: bool) -> Result<()> {
    if store.raw_blob(name)?.is_none() {
        anyhow::bail!("no value stored under '{name}'");
    }
    require_key(store)?;

    let value = match store.get(name) {
        Some(v) => v,
        None => {
            let cause = store
                .take_last_error()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown".into());
            anyhow::bail!("value under '{name}' could not be decrypted: {cause}");
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("{}", render(&value)?);
    }
    Ok(())
}

fn cmd_set(store: &mut CliStore, name: &str, raw: &str, ty: ValueType) -> Result<()> {
    let value = parse_value(raw, ty)?;
    require_key(store)?;

    store.set(name, Some(value));
    if let Some(e) = store.take_last_error() {
        anyhow::bail!("storing '{name}' failed: {e}");
    }
    tracing::info!(key = name, "value stored");
    Ok(())
}

fn cmd_delete(store: &mut CliStore, name: &str) -> Result<()> {
    let existed = store.raw_blob(name)?.is_some();
    store.remove(name);
    if let Some(e) = store.take_last_error() {
        anyhow::bail!("deleting '{name}' failed: {e}");
    }
    if existed {
        println!("deleted '{name}'");
    } else {
        println!("'{name}' was not set");
    }
    Ok(())
}

fn cmd_passphrase(store: &mut CliStore) -> Result<()> {
    let entries = store.plain_store().keys()?.len();
    if entries > 0 {
        eprintln!(
            "warning: {entries} stored value(s) were written under the current key and will become unreadable"
        );
    }

    let passphrase = read_passphrase(true)?;
    store
        .set_passphrase(Some(passphrase))
        .context("removing old key material")?;
    store
        .ensure_key_material()
        .context("creating key material")?;

    println!(
        "new key created (fingerprint {})",
        store.key_fingerprint().unwrap_or_else(|| "unknown".into())
    );
    Ok(())
}

fn cmd_status(store: &CliStore, config: &SecstoreConfig) -> Result<()> {
    let entries = store.plain_store().keys()?;

    println!("secstore v{}", env!("CARGO_PKG_VERSION"));
    println!("  suite:       {}", store.suite().unwrap_or("(none)"));
    println!("  data file:   {}", store.plain_store().path().display());
    println!("  entries:     {}", entries.len());
    println!(
        "  keychain:    {} [{}]",
        store
            .options()
            .share_group
            .as_deref()
            .unwrap_or(&config.keychain.service),
        store.options().visibility
    );
    println!(
        "  available:   {}",
        if secstore_secrets::keychain::is_available() { "yes" } else { "no" }
    );
    match store.key_fingerprint() {
        Some(fp) => println!("  key:         present ({fp})"),
        None => println!("  key:         not created (run `secstore passphrase`)"),
    }
    println!("  kdf rounds:  {}", store.options().kdf.iterations);
    Ok(())
}

// ── Helpers ────────────────────────────────────────────────────────────────────

/// Make sure a key exists or can be derived without prompting mid-operation.
fn require_key(store: &mut CliStore) -> Result<()> {
    if store.is_key_created() {
        return Ok(());
    }
    match std::env::var("SECSTORE_PASSPHRASE") {
        Ok(pw) if !pw.is_empty() => {
            store
                .set_passphrase(Some(SecretString::from(pw)))
                .context("resetting key material")?;
            Ok(())
        }
        _ => anyhow::bail!(
            "no key for suite '{}'. Run `secstore passphrase` or set SECSTORE_PASSPHRASE",
            store.suite().unwrap_or("(none)")
        ),
    }
}

fn read_passphrase(confirm: bool) -> Result<SecretString> {
    if let Ok(pw) = std::env::var("SECSTORE_PASSPHRASE") {
        if !pw.is_empty() {
            return Ok(SecretString::from(pw));
        }
    }
    let first = rpassword::prompt_password("Passphrase: ")
        .map_err(|e| anyhow::anyhow!("passphrase prompt: {e}"))?;
    if first.is_empty() {
        anyhow::bail!("passphrase must not be empty");
    }
    if confirm {
        let second = rpassword::prompt_password("Confirm passphrase: ")
            .map_err(|e| anyhow::anyhow!("passphrase prompt: {e}"))?;
        if first != second {
            anyhow::bail!("passphrases do not match");
        }
    }
    Ok(SecretString::from(first))
}

fn parse_value(raw: &str, ty: ValueType) -> Result<Value> {
    let value = match ty {
        ValueType::String => Value::String(raw.to_string()),
        ValueType::Integer => Value::Integer(
            raw.parse()
                .with_context(|| format!("'{raw}' is not an integer"))?,
        ),
        ValueType::Float => {
            Value::Float(raw.parse().with_context(|| format!("'{raw}' is not a float"))?)
        }
        ValueType::Double => {
            Value::Double(raw.parse().with_context(|| format!("'{raw}' is not a double"))?)
        }
        ValueType::Bool => {
            Value::Bool(raw.parse().with_context(|| format!("'{raw}' is not true/false"))?)
        }
        ValueType::Data => Value::Data(
            STANDARD
                .decode(raw)
                .context("data values must be base64")?,
        ),
        ValueType::Url => Value::Url(raw.to_string()),
    };
    Ok(value)
}

fn render(value: &Value) -> Result<String> {
    Ok(match value {
        Value::String(s) | Value::Url(s) => s.clone(),
        Value::Integer(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Double(d) => d.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Data(d) => STANDARD.encode(d),
        Value::Array(_) | Value::Dictionary(_) => serde_json::to_string_pretty(value)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value_types() {
        assert_eq!(
            parse_value("42", ValueType::Integer).unwrap(),
            Value::Integer(42)
        );
        assert_eq!(
            parse_value("true", ValueType::Bool).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            parse_value("AAEC", ValueType::Data).unwrap(),
            Value::Data(vec![0, 1, 2])
        );
        assert!(parse_value("4x", ValueType::Integer).is_err());
        assert!(parse_value("%%", ValueType::Data).is_err());
    }

    #[test]
    fn test_render_scalars() {
        assert_eq!(render(&Value::from("hi")).unwrap(), "hi");
        assert_eq!(render(&Value::Integer(-3)).unwrap(), "-3");
        assert_eq!(render(&Value::Data(vec![0, 1, 2])).unwrap(), "AAEC");
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from([
            "secstore", "--suite", "app", "set", "n", "5", "--type", "integer",
        ])
        .unwrap();
        assert_eq!(cli.suite.as_deref(), Some("app"));
        assert!(matches!(
            cli.command,
            Commands::Set {
                r#type: ValueType::Integer,
                ..
            }
        ));
    }
}
