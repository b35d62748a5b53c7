//! `stride auth`: one-time OAuth authorization.
//!
//! 1. `stride auth url` prints the approval URL.
//! 2. Approve in the browser; the redirect fails to load, which is expected.
//! 3. Copy `code` from the address bar into `stride auth exchange <CODE>`.

use anyhow::{Context, Result};
use clap::Subcommand;

use stride_core::config::token_path_at;
use stride_core::token::save_token_at;
use stride_strava::auth::DEFAULT_REDIRECT_URI;
use stride_strava::authorization_url;

#[derive(Subcommand, Debug)]
pub enum AuthCommand {
    /// Print the browser URL that grants read access to all activities.
    Url {
        /// Where Strava redirects after approval; nothing needs to listen.
        #[arg(long, default_value = DEFAULT_REDIRECT_URI)]
        redirect_uri: String,
    },

    /// Exchange the one-time code from the redirect for a stored token.
    Exchange {
        /// `code` query parameter of the redirect URL.
        code: String,
    },
}

pub fn run(command: AuthCommand) -> Result<()> {
    let (home, config) = super::load_config()?;
    let credentials = config.credentials()?;
    match command {
        AuthCommand::Url { redirect_uri } => {
            println!("{}", authorization_url(&credentials.client_id, &redirect_uri));
        }
        AuthCommand::Exchange { code } => {
            let token = super::token_endpoint()
                .exchange_code(&credentials, code.trim())
                .context("code exchange failed; codes are single-use, request a fresh one")?;
            save_token_at(&home, &token)?;
            println!("✓ saved {}", token_path_at(&home).display());
            println!("  expires_at: {}", token.expires_at);
        }
    }
    Ok(())
}
