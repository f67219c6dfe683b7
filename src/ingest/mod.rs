pub mod coordinator;
pub mod report;

pub use coordinator::{IngestCoordinator, IngestError, RunGuard};
pub use report::{CollectMode, IngestReport};

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};

/// Parse a `--since` value: an RFC 3339 timestamp, or a duration ago
/// such as "7d", "12h" or "1week 2days".
pub fn parse_since(s: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        bail!("empty --since value");
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.with_timezone(&Utc));
    }

    match humantime::parse_duration(s) {
        Ok(ago) => {
            let ago = chrono::Duration::from_std(ago)?;
            Ok(now - ago)
        }
        Err(e) => bail!(
            "invalid --since '{}': expected RFC 3339 timestamp or duration like '7d' ({})",
            s,
            e
        ),
    }
}
