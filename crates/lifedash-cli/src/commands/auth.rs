//! Authorization-code flow commands.

use lifedash_google::CalendarConnector;
use tracing::info;

use crate::error::{ClientError, ClientResult};
use crate::runtime::Runtime;

/// Prints the consent URL and the state to check on the way back.
pub fn url(runtime: &Runtime, open: bool) -> ClientResult<()> {
    let google = runtime.google_config()?;
    let connector = runtime.connector(&google)?;

    let state = CalendarConnector::new_state();
    let url = connector
        .authorization_url(&state)
        .map_err(|e| ClientError::Config(format!("invalid authorization URL: {}", e)))?;

    println!("Open this URL to connect Google Calendar:");
    println!();
    println!("  {}", url);
    println!();
    println!("state: {}", state);
    println!();
    println!(
        "After consenting, run:\n  lifedash auth callback --user <ID> --code <CODE> --state <STATE> --expected-state {}",
        state
    );

    if open {
        open::that(url.as_str())
            .map_err(|e| ClientError::Action(format!("failed to open browser: {}", e)))?;
        info!("opened consent page in browser");
    }
    Ok(())
}

/// Exchanges the redirect's code and stores the user's tokens.
pub async fn callback(
    runtime: &Runtime,
    user: &str,
    code: &str,
    state: Option<&str>,
    expected_state: Option<&str>,
) -> ClientResult<()> {
    check_state(state, expected_state)?;

    let google = runtime.google_config()?;
    let connector = runtime.connector(&google)?;
    let token = connector.complete(user, code).await?;

    println!("Google Calendar connected for {}.", user);
    println!(
        "Access token valid until {}.",
        token.expiry_date.format("%Y-%m-%d %H:%M:%S UTC")
    );
    if token.usable_refresh_token().is_none() {
        println!(
            "No refresh token was issued; remove lifedash from your Google account's \
             third-party access and connect again to enable automatic refresh."
        );
    }
    Ok(())
}

fn check_state(state: Option<&str>, expected: Option<&str>) -> ClientResult<()> {
    match (state, expected) {
        (Some(received), Some(expected))
            if !CalendarConnector::state_matches(expected, received) =>
        {
            Err(ClientError::AuthMismatch(
                "state does not match the one issued with the consent URL".to_string(),
            ))
        }
        _ => Ok(()),
    }
}
