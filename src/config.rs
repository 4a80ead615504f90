use anyhow::{Context, anyhow};

/// Loads `.env` and validates the required variables. Called once at startup
/// before anything touches the environment.
pub fn load_environment() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    if std::env::var("TELOXIDE_TOKEN").is_err() {
        return Err(anyhow!("TELOXIDE_TOKEN is not set"));
    }

    // Optional, but must parse when present.
    if let Ok(raw) = std::env::var("SUPER_ADMIN_ID") {
        raw.trim()
            .parse::<i64>()
            .with_context(|| format!("SUPER_ADMIN_ID is not a valid user id: {raw:?}"))?;
    }

    Ok(())
}

/// Telegram user id seeded as super admin on startup, if configured.
pub fn super_admin_id() -> Option<i64> {
    std::env::var("SUPER_ADMIN_ID")
        .ok()
        .and_then(|raw| raw.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn missing_token_is_rejected() {
        unsafe {
            std::env::remove_var("TELOXIDE_TOKEN");
        }
        assert!(load_environment().is_err());
    }

    #[test]
    #[serial]
    fn bad_super_admin_id_is_rejected() {
        unsafe {
            std::env::set_var("TELOXIDE_TOKEN", "123:abc");
            std::env::set_var("SUPER_ADMIN_ID", "not-a-number");
        }
        assert!(load_environment().is_err());
        unsafe {
            std::env::set_var("SUPER_ADMIN_ID", "4242");
        }
        assert!(load_environment().is_ok());
        assert_eq!(super_admin_id(), Some(4242));
        unsafe {
            std::env::remove_var("SUPER_ADMIN_ID");
            std::env::remove_var("TELOXIDE_TOKEN");
        }
    }
}
