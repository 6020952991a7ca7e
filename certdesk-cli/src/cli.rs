use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use shared::CertificateStatus;

/// Manage certificates from the terminal
#[derive(Parser, Debug)]
#[command(name = "certdesk", author, version, about, long_about = None)]
pub struct Cli {
    /// API base URL (overrides CERTDESK_API_BASE_URL)
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Log level when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn", env = "CERTDESK_LOG")]
    pub log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true, default_value_t = false)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log in and store the session
    Login {
        #[arg(short, long)]
        email: Option<String>,
        /// Prompted for when omitted
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Create an account
    Signup {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(short, long)]
        email: String,
        #[arg(long)]
        phone: Option<String>,
        /// Prompted for (with confirmation) when omitted
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Clear the stored session
    Logout,
    /// Show the logged-in user
    Whoami,
    /// List certificates
    List {
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        limit: Option<u32>,
        /// Print the raw records as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Show one certificate
    Show {
        id: String,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Create a certificate
    Create(DraftArgs),
    /// Update a certificate; omitted fields keep their current value
    Update {
        id: String,
        #[command(flatten)]
        draft: DraftArgs,
    },
    /// Delete a certificate
    Delete {
        id: String,
        /// Skip the confirmation prompt
        #[arg(short, long, default_value_t = false)]
        yes: bool,
    },
    /// Set a certificate valid or invalid; flips the current status when omitted
    Toggle {
        id: String,
        #[arg(long)]
        status: Option<CertificateStatus>,
    },
}

/// Certificate fields
#[derive(Args, Debug, Clone, Default)]
pub struct DraftArgs {
    #[arg(long)]
    pub number: Option<String>,
    #[arg(long)]
    pub standard: Option<String>,
    #[arg(long)]
    pub organization: Option<String>,
    #[arg(long)]
    pub country: Option<String>,
    #[arg(long)]
    pub address: Option<String>,
    #[arg(long)]
    pub scope: Option<String>,
    /// YYYY-MM-DD
    #[arg(long)]
    pub initial_registration: Option<NaiveDate>,
    /// YYYY-MM-DD
    #[arg(long)]
    pub issued: Option<NaiveDate>,
    /// YYYY-MM-DD
    #[arg(long)]
    pub expires: Option<NaiveDate>,
    /// YYYY-MM-DD
    #[arg(long)]
    pub recertification_due: Option<NaiveDate>,
    #[arg(long)]
    pub status: Option<CertificateStatus>,
    /// QR code image to upload
    #[arg(long)]
    pub qr: Option<PathBuf>,
}
