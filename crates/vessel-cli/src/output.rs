//! Formatted output helpers for CLI commands.
//!
//! Provides human-readable byte and age formatting plus ID shortening
//! for the table views.

/// Formats a byte count into a human-readable string (e.g., "128.0 MiB").
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = KIB * 1024;
    const GIB: u64 = MIB * 1024;

    if bytes >= GIB {
        format!("{:.1} GiB", bytes as f64 / GIB as f64)
    } else if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{bytes} B")
    }
}

/// Formats an RFC 3339 timestamp as a rough age ("5 minutes ago").
#[must_use]
pub fn format_age(created_at: &str) -> String {
    let Ok(created) = chrono::DateTime::parse_from_rfc3339(created_at) else {
        return created_at.to_string();
    };
    let elapsed = chrono::Utc::now().signed_duration_since(created);

    let (count, unit) = if elapsed.num_days() > 0 {
        (elapsed.num_days(), "day")
    } else if elapsed.num_hours() > 0 {
        (elapsed.num_hours(), "hour")
    } else if elapsed.num_minutes() > 0 {
        (elapsed.num_minutes(), "minute")
    } else {
        (elapsed.num_seconds().max(0), "second")
    };
    let plural = if count == 1 { "" } else { "s" };
    format!("{count} {unit}{plural} ago")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_bytes_displays_bytes() {
        assert_eq!(format_bytes(512), "512 B");
    }

    #[test]
    fn format_bytes_displays_kib() {
        assert_eq!(format_bytes(2048), "2.0 KiB");
    }

    #[test]
    fn format_bytes_displays_mib() {
        assert_eq!(format_bytes(134_217_728), "128.0 MiB");
    }

    #[test]
    fn format_bytes_displays_gib() {
        assert_eq!(format_bytes(2_147_483_648), "2.0 GiB");
    }

    #[test]
    fn format_age_handles_recent_timestamps() {
        let now = chrono::Utc::now().to_rfc3339();
        let age = format_age(&now);
        assert!(age.ends_with("ago"), "{age}");
    }

    #[test]
    fn format_age_passes_garbage_through() {
        assert_eq!(format_age("not-a-date"), "not-a-date");
    }
}
