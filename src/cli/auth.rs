//! CLI handlers for login, refresh, and validate.

use crate::auth::{Authenticator, OAuthSession, PollOutcome};
use crate::config::AuthConfig;

use super::{LoginArgs, RefreshArgs, ValidateArgs};

/// Process exit code for a poll outcome.
pub fn exit_code(outcome: &PollOutcome) -> i32 {
    match outcome {
        PollOutcome::Succeeded(_) => 0,
        PollOutcome::Failed(_) => 1,
        PollOutcome::Declined => 2,
        PollOutcome::Expired => 3,
        PollOutcome::Cancelled => 130,
    }
}

/// Handle `azdo-auth login`.
pub async fn handle_login(
    config: AuthConfig,
    args: LoginArgs,
) -> Result<i32, Box<dyn std::error::Error>> {
    let auth = Authenticator::new(config)?;
    let challenge = auth.request_device_code().await?;
    let prompt = challenge.prompt();

    println!("🔗 Visit: {}", prompt.verification_uri);
    println!("📋 Enter code: {}", prompt.user_code);
    println!("⏳ Waiting for authorization... (Ctrl-C to cancel)");

    let handle = auth.start_polling(challenge, args.org);
    let cancel = handle.cancellation_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let outcome = handle.wait().await;
    interrupt.abort();

    match &outcome {
        PollOutcome::Succeeded(session) => {
            println!("✅ Signed in to {}", session.server_url());
            print_session(session, args.print_token);
        }
        other => eprintln!("❌ {}", other.message()),
    }
    Ok(exit_code(&outcome))
}

/// Handle `azdo-auth refresh`.
pub async fn handle_refresh(
    config: AuthConfig,
    args: RefreshArgs,
) -> Result<i32, Box<dyn std::error::Error>> {
    let auth = Authenticator::new(config)?;
    match auth
        .refresh_access_token(&args.refresh_token, &args.org)
        .await
    {
        Ok(session) => {
            println!("✅ Access token refreshed for {}", session.server_url());
            print_session(&session, args.print_token);
            Ok(0)
        }
        Err(e) => {
            eprintln!("❌ {e}");
            Ok(1)
        }
    }
}

/// Handle `azdo-auth validate`.
pub async fn handle_validate(
    config: AuthConfig,
    args: ValidateArgs,
) -> Result<i32, Box<dyn std::error::Error>> {
    let auth = Authenticator::new(config)?;
    let result = auth.validate_pat(&args.org, &args.pat).await;

    println!("🔐 Token check for {}\n", args.org);
    for (name, allowed) in [
        ("List projects", result.can_list_projects),
        ("List repositories", result.can_list_repos),
        ("List pull requests", result.can_list_pull_requests),
    ] {
        println!("  {name}: {}", if allowed { "✅" } else { "❌" });
    }
    println!("\n{}", result.message);

    Ok(if result.valid { 0 } else { 1 })
}

fn print_session(session: &OAuthSession, print_token: bool) {
    if let Some(expires) = session.expires_at() {
        println!("   Expires: {}", expires.format("%Y-%m-%d %H:%M UTC"));
    }
    if print_token {
        println!("access_token={}", session.access_token());
        if let Some(refresh) = session.refresh_token() {
            println!("refresh_token={refresh}");
        }
    }
}
