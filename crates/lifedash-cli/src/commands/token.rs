//! Access token command.

use crate::error::ClientResult;
use crate::runtime::Runtime;

/// Prints a usable access token for `user`, refreshing it first if needed.
pub async fn show(runtime: &Runtime, user: &str) -> ClientResult<()> {
    let google = runtime.google_config()?;
    let validator = runtime.validator(&google)?;
    let access_token = validator.get_valid_access_token(user).await?;
    println!("{}", access_token);
    Ok(())
}
