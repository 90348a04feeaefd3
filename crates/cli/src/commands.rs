//! CLI commands

use anyhow::{Context, Result};
use bookfair_client::{
    AuthContext, BookfairClient, RegistrationForm, RequestOptions, UpdateProfileRequest,
    UserProfile,
};
use clap::Subcommand;
use reqwest::Method;
use serde_json::Value;
use std::path::PathBuf;
use tracing::info;

use crate::config::PortalConfig;

const SESSION_FILE: &str = "session.json";

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in and store the session
    Login {
        email: String,

        #[arg(long, env = "BOOKFAIR_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create a vendor account and sign in
    Register {
        #[arg(long)]
        first_name: String,

        #[arg(long, default_value = "")]
        last_name: String,

        #[arg(long, default_value = "")]
        company_name: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        mobile_no: String,

        #[arg(long, env = "BOOKFAIR_PASSWORD", hide_env_values = true)]
        password: String,

        #[arg(long)]
        confirm_password: String,

        /// Account role, e.g. VENDOR or EMPLOYEE
        #[arg(long)]
        role: Option<String>,
    },

    /// Sign out and forget the stored session
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Update the signed-in user's profile
    UpdateProfile {
        #[arg(long)]
        first_name: String,

        #[arg(long, default_value = "")]
        last_name: String,

        #[arg(long, default_value = "")]
        company_name: String,

        #[arg(long)]
        mobile_no: String,
    },

    /// Permanently delete the signed-in user's account
    DeleteAccount {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },

    /// Request a password reset link
    ForgotPassword { email: String },

    /// Set a new password with a reset token
    ResetPassword {
        token: String,

        #[arg(long, env = "BOOKFAIR_NEW_PASSWORD", hide_env_values = true)]
        new_password: String,
    },

    /// Show whether a session is stored and when its access token expires
    Session,

    /// Send an arbitrary request through the authenticated client
    Request {
        /// HTTP method
        #[arg(short = 'X', long, default_value = "GET")]
        method: String,

        /// Path below the base URL, e.g. /api/stalls
        path: String,

        /// JSON request body
        #[arg(long)]
        data: Option<String>,

        /// Send without the access token
        #[arg(long)]
        skip_auth: bool,
    },

    /// Print the effective configuration
    Config,
}

impl Commands {
    pub async fn execute(self, config: PortalConfig, state_dir: PathBuf) -> Result<()> {
        let session_path = state_dir.join(SESSION_FILE);
        let connect = || {
            info!("Using session file: {:?}", session_path);
            config.client(session_path.clone())
        };

        match self {
            Self::Login { email, password } => {
                let client = connect()?;
                let context = AuthContext::new(client);
                let user = context.login(&email, &password).await?;
                println!("Signed in as {} ({})", user.display_name(), user.role);
            }
            Self::Register {
                first_name,
                last_name,
                company_name,
                email,
                mobile_no,
                password,
                confirm_password,
                role,
            } => {
                let client = connect()?;
                let form = RegistrationForm {
                    first_name,
                    last_name,
                    company_name,
                    email,
                    mobile_no,
                    password,
                    confirm_password,
                    role,
                };
                let context = AuthContext::new(client);
                let user = context.register(&form).await?;
                println!("Registered {} ({})", user.email, user.role);
            }
            Self::Logout => {
                AuthContext::new(connect()?).logout().await;
                println!("Signed out");
            }
            Self::Whoami => {
                let context = AuthContext::new(connect()?);
                let user = context
                    .bootstrap()
                    .await
                    .context("Not signed in; run `bookfair login` first")?;
                print_user(&user)?;
            }
            Self::UpdateProfile {
                first_name,
                last_name,
                company_name,
                mobile_no,
            } => {
                let request = UpdateProfileRequest {
                    first_name,
                    last_name,
                    company_name,
                    mobile_no,
                };
                let user = AuthContext::new(connect()?).update_profile(&request).await?;
                print_user(&user)?;
            }
            Self::DeleteAccount { yes } => {
                if !yes {
                    anyhow::bail!("Refusing to delete the account without --yes");
                }
                AuthContext::new(connect()?).delete_account().await?;
                println!("Account deleted");
            }
            Self::ForgotPassword { email } => {
                let message = connect()?.forgot_password(&email).await?;
                println!("{message}");
            }
            Self::ResetPassword {
                token,
                new_password,
            } => {
                let message = connect()?.reset_password(&token, &new_password).await?;
                println!("{message}");
            }
            Self::Session => show_session(&connect()?),
            Self::Request {
                method,
                path,
                data,
                skip_auth,
            } => send_request(&connect()?, &method, &path, data, skip_auth).await?,
            Self::Config => {
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
        }

        Ok(())
    }
}

fn print_user(user: &UserProfile) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(user)?);
    Ok(())
}

fn show_session(client: &BookfairClient) {
    let tokens = client.tokens();
    let Some(session) = tokens.session() else {
        println!("No stored session");
        return;
    };

    let now = tokens.now_ms();
    if session.access_valid_at(now) {
        let remaining_secs = (session.access_expires_at_ms - now) / 1000;
        println!("Access token valid for another {remaining_secs}s");
    } else if session.refresh_token.is_empty() {
        println!("Access token expired and no refresh token is stored");
    } else {
        println!("Access token expired; it will be renewed on the next request");
    }
}

async fn send_request(
    client: &BookfairClient,
    method: &str,
    path: &str,
    data: Option<String>,
    skip_auth: bool,
) -> Result<()> {
    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .with_context(|| format!("Invalid HTTP method: {method}"))?;

    let mut options = RequestOptions::new(method);
    if let Some(data) = data {
        let body: Value = serde_json::from_str(&data).context("--data must be valid JSON")?;
        options = options.json(&body)?;
    }
    if skip_auth {
        options = options.skip_auth();
    }

    let response = client.fetch::<Option<Value>>(path, options).await?;
    if !response.message.is_empty() {
        info!(message = %response.message, "Backend response");
    }
    println!(
        "{}",
        serde_json::to_string_pretty(&response.data.unwrap_or(Value::Null))?
    );
    Ok(())
}
