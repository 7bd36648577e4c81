//! Health report command.

use lifedash_google::HealthStatus;

use crate::error::{ClientError, ClientResult};
use crate::runtime::Runtime;

/// Prints the JSON health report. Fails when the token store is down.
pub async fn show(runtime: &Runtime, user: Option<&str>) -> ClientResult<()> {
    let report = runtime.health_checker().check(user).await;

    let text = serde_json::to_string_pretty(&report)
        .map_err(|e| ClientError::Config(format!("failed to serialize health report: {}", e)))?;
    println!("{}", text);

    if report.status == HealthStatus::Down {
        return Err(ClientError::Unavailable(format!(
            "health status down (HTTP {})",
            report.http_status()
        )));
    }
    Ok(())
}
