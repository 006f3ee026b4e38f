use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

mod chat;
mod cli;
mod client;
mod config;
mod error;
mod profile;
mod session;
mod speech;
mod ui;
mod version;
mod voice;

#[cfg(test)]
mod tests;

use cli::CliHandler;
use version::CURRENT_VERSION;

#[derive(Parser)]
#[command(
    name = "muse",
    about = "StyleMuse AI stylist in your terminal",
    long_about = "StyleMuse conversational shopping assistant client

OVERVIEW:
  Talk to your AI stylist, keep your profile and photos up to date, and
  browse ranked product picks without leaving the terminal.

WORKFLOW:
  1. Login with your StyleMuse account
  2. Upload at least one profile photo
  3. Chat with the stylist (typed or voice input)

QUICK START:
  muse login                            # Authenticate
  muse photos upload ./selfies          # Upload profile photos
  muse chat                             # Talk to your stylist
  muse chat --voice                     # Speak instead of typing
  muse profile show                     # Review your profile
  muse status                           # Check session and server status",
    version = CURRENT_VERSION,
    author = "StyleMuse Team",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Login with your StyleMuse credentials
    Login(LoginArgs),

    /// Logout and clear the local session
    Logout,

    /// Show session and server status
    #[command(aliases = &["st"])]
    Status,

    /// Talk to your stylist
    Chat(ChatArgs),

    /// Show or update your profile
    Profile(ProfileArgs),

    /// Manage profile photos
    Photos(PhotosArgs),

    /// Like a recommended item by its identifier
    Like(LikeArgs),

    /// Configure settings
    #[command(aliases = &["cfg"])]
    Config(ConfigArgs),
}

#[derive(Args)]
pub struct LoginArgs {
    /// Username; prompted for when omitted
    pub username: Option<String>,
}

#[derive(Args)]
pub struct ChatArgs {
    /// Use voice input and spoken replies
    #[arg(long)]
    pub voice: bool,

    /// Open (or create) a chat session by name
    #[arg(short, long)]
    pub session: Option<String>,
}

#[derive(Args)]
pub struct ProfileArgs {
    #[command(subcommand)]
    pub command: ProfileCommand,
}

#[derive(Subcommand)]
pub enum ProfileCommand {
    /// Show the stored profile
    Show,

    /// Update profile fields
    Set {
        #[arg(long)]
        top_size: Option<String>,

        #[arg(long)]
        bottom_size: Option<String>,

        #[arg(long)]
        shoe_size: Option<String>,

        #[arg(long)]
        region: Option<String>,

        #[arg(long)]
        gender: Option<String>,

        #[arg(long)]
        age_group: Option<String>,
    },
}

#[derive(Args)]
pub struct PhotosArgs {
    #[command(subcommand)]
    pub command: PhotosCommand,
}

#[derive(Subcommand)]
pub enum PhotosCommand {
    /// List photo references
    #[command(aliases = &["ls"])]
    List,

    /// Upload a photo file, or every image in a directory
    Upload { path: PathBuf },

    /// Remove a photo by URL or object key
    #[command(aliases = &["rm"])]
    Remove { reference: String },
}

#[derive(Args)]
pub struct LikeArgs {
    pub image_id: String,
}

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    Show,
    SetEndpoint { url: String },
    SetTimeout { seconds: u64 },
    SetVoice { voice_id: String },
    Reset,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(format!("stylemuse={}", log_level));
    subscriber.init();

    let mut handler = CliHandler::new(None);

    if let Err(e) = handler.execute(cli.command).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
