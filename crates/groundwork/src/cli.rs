use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "groundwork", author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase logging verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Path to the backend config file (default: groundwork.yaml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<Utf8PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Reconcile the backend prerequisites (resource group, vault, key, state storage)
    Bootstrap(BootstrapArgs),

    /// Encrypt or decrypt secret literals against the bootstrap key
    #[command(subcommand)]
    Secrets(SecretsCommands),

    /// Bind managed identities as external database users
    Bind(BindArgs),
}

#[derive(Args)]
pub struct BootstrapArgs {
    /// Directory object id to grant vault key permissions.
    /// Defaults to the principal behind the active credential.
    #[arg(long, value_name = "GUID")]
    pub object_id: Option<String>,

    /// Print shell exports for the storage backend (account name and access key)
    #[arg(long)]
    pub export: bool,
}

#[derive(Subcommand)]
pub enum SecretsCommands {
    /// Encrypt a plaintext into an embeddable base64 literal
    Encrypt(EncryptArgs),

    /// Decrypt an embeddable base64 literal back to plaintext
    Decrypt(DecryptArgs),
}

#[derive(Args)]
pub struct EncryptArgs {
    /// Plaintext to encrypt. Read from stdin when omitted.
    pub value: Option<String>,
}

#[derive(Args)]
pub struct DecryptArgs {
    /// Encrypted literal to decrypt. Read from stdin when omitted.
    pub literal: Option<String>,
}

#[derive(Args)]
pub struct BindArgs {
    /// Deployment outputs JSON file (connection string plus principal ids)
    #[arg(long, value_name = "FILE")]
    pub outputs: Option<Utf8PathBuf>,

    /// ADO-style database connection string. Overrides the outputs file.
    #[arg(long, env = "GROUNDWORK_CONNECTION_STRING", hide_env_values = true)]
    pub connection_string: Option<String>,

    /// Principal id to bind. Repeatable. Overrides the outputs file.
    #[arg(long = "principal", value_name = "GUID")]
    pub principals: Vec<String>,
}
