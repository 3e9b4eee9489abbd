//! CLI commands

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use keystone_core::{ClientConfig, RegisterRequest};
use keystone_http::SessionClientBuilder;
use keystone_session::{FormError, Session};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::info;

use crate::session_file::SessionFile;

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: String,

        /// Password (prefer the environment variable over the flag)
        #[arg(long, env = "KEYSTONE_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create an account and sign in
    Register {
        #[arg(long)]
        email: String,

        #[arg(long, env = "KEYSTONE_PASSWORD", hide_env_values = true)]
        password: String,

        #[arg(long)]
        first_name: String,

        #[arg(long)]
        last_name: String,
    },

    /// Restore the session from the stored session proof
    Restore,

    /// Restore, then fetch a protected resource
    Get {
        /// Path relative to the base URL, e.g. /api/profile
        path: String,
    },

    /// Restore, then show what the route guard decides for a path
    Route {
        /// Application route, e.g. /dashboard
        path: String,
    },

    /// Restore, then sign out
    Logout,
}

impl Commands {
    /// Run the command and return the report to print.
    ///
    /// The saved session proof is loaded first and written back afterwards,
    /// whether or not the command succeeded, since a restore may have rotated
    /// it.
    pub async fn execute(self, config: &ClientConfig, session_file: &SessionFile) -> Result<Value> {
        let client = SessionClientBuilder::from_config(config)
            .build()
            .context("failed to build identity service client")?;
        session_file.load_into(&client);
        let session = Session::new(client);

        let outcome = self.run(&session).await;
        session_file.save_from(session.client())?;
        outcome
    }

    async fn run(self, session: &Session) -> Result<Value> {
        match self {
            Self::Login { email, password } => {
                let outcome = session.login(email, password).await;
                report_form(session, outcome)
            }
            Self::Register {
                email,
                password,
                first_name,
                last_name,
            } => {
                let request = RegisterRequest {
                    email,
                    password,
                    first_name,
                    last_name,
                };
                let outcome = session.register(request).await;
                report_form(session, outcome)
            }
            Self::Restore => {
                session.initialize().await;
                Ok(json!({ "session": session.snapshot() }))
            }
            Self::Get { path } => {
                session.initialize().await;
                let body: Value = session
                    .client()
                    .get(&path)
                    .await
                    .with_context(|| format!("GET {path} failed"))?;
                Ok(json!({ "session": session.snapshot(), "body": body }))
            }
            Self::Route { path } => {
                session.initialize().await;
                let decision = session.guard(&path);
                info!(path = %path, ?decision, "route decision");
                Ok(json!({ "session": session.snapshot(), "route": decision }))
            }
            Self::Logout => {
                session.initialize().await;
                session.logout().await;
                session.client().clear_session_proof();
                Ok(json!({ "session": session.snapshot() }))
            }
        }
    }
}

fn report_form<T>(session: &Session, outcome: Result<T, FormError>) -> Result<Value> {
    match outcome {
        Ok(_) => Ok(json!({ "session": session.snapshot() })),
        Err(form) => {
            print_json(&json!({ "session": session.snapshot(), "error": form }))?;
            bail!("{}", form.message)
        }
    }
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
