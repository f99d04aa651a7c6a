use std::io::{self, IsTerminal};

use anyhow::anyhow;
use diskpull_client::{AuthForm, AuthFormRejection, AuthMode, Credentials, LogoutOutcome};

use crate::cli::{LoginArgs, OutputFormat, RegisterArgs};
use crate::client::{AppContext, CliError, CliResult, classify_auth_error};
use crate::output::render_session;

pub(crate) async fn handle_login(ctx: &AppContext, args: LoginArgs) -> CliResult<()> {
    let credentials = Credentials {
        username: require_non_empty(args.username, "username")?,
        email: String::new(),
        password: resolve_password(args.password)?,
    };
    submit(ctx, AuthMode::Login, &credentials).await?;
    println!("Signed in as {}.", credentials.username);
    Ok(())
}

pub(crate) async fn handle_register(ctx: &AppContext, args: RegisterArgs) -> CliResult<()> {
    let credentials = Credentials {
        username: require_non_empty(args.username, "username")?,
        email: require_non_empty(args.email, "email")?,
        password: resolve_password(args.password)?,
    };
    submit(ctx, AuthMode::Register, &credentials).await?;
    println!("Registered and signed in as {}.", credentials.username);
    Ok(())
}

pub(crate) async fn handle_logout(ctx: &AppContext) -> CliResult<()> {
    let mut form = AuthForm::resume(AuthMode::Login, &ctx.session);
    match ctx.auth().logout_form(&mut form).await {
        LogoutOutcome::NoSession => println!("No active session."),
        LogoutOutcome::Revoked => println!("Signed out."),
        LogoutOutcome::LocalOnly => {
            println!("Signed out locally; the server could not be reached to revoke the session.");
        }
    }
    Ok(())
}

pub(crate) async fn handle_session(ctx: &AppContext, format: OutputFormat) -> CliResult<()> {
    let route = ctx.gate().check().await;
    render_session(
        route,
        ctx.session.is_authenticated(),
        &ctx.config.token_path,
        format,
    )
}

async fn submit(ctx: &AppContext, mode: AuthMode, credentials: &Credentials) -> CliResult<()> {
    let mut form = AuthForm::new(mode);
    match ctx.auth().submit_form(&mut form, credentials).await {
        Ok(_) => Ok(()),
        Err(AuthFormRejection::Auth(err)) => Err(classify_auth_error(err)),
        Err(AuthFormRejection::Transition(event)) => Err(CliError::failure(anyhow!(
            "authentication form rejected {event:?}"
        ))),
    }
}

fn require_non_empty(value: String, field: &str) -> CliResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CliError::validation(format!("{field} cannot be empty")));
    }
    Ok(trimmed.to_string())
}

fn resolve_password(value: Option<String>) -> CliResult<String> {
    if let Some(value) = value {
        if value.is_empty() {
            return Err(CliError::validation("password cannot be empty"));
        }
        return Ok(value);
    }

    if io::stdin().is_terminal() {
        let password = rpassword::prompt_password("Password: ").map_err(|err| {
            CliError::failure(anyhow!("failed to read password from stdin: {err}"))
        })?;
        if password.is_empty() {
            return Err(CliError::validation("password cannot be empty"));
        }
        Ok(password)
    } else {
        Err(CliError::validation(
            "password required; supply via --password or DISKPULL_PASSWORD when running non-interactively",
        ))
    }
}
