use std::net::SocketAddr;

use serde::Deserialize;

const DEFAULT_TTL_MINUTES: i64 = 60 * 24;
const MAX_TTL_MINUTES: i64 = 60 * 24 * 365;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Postgres connection string. `None` runs the service on in-memory stores.
    pub database_url: Option<String>,
    pub jwt: JwtConfig,
    /// Answer "not found" instead of "forbidden" for resources owned by someone else.
    pub conceal_forbidden: bool,
    pub listen_addr: SocketAddr,
}

/// Token lifetime in minutes: unset means one day, anything outside 1..=one year is refused.
fn parse_ttl_minutes(raw: Option<&str>) -> anyhow::Result<i64> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_TTL_MINUTES);
    };
    let minutes: i64 = raw
        .trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("JWT_TTL_MINUTES={raw:?}: {e}"))?;
    if !(1..=MAX_TTL_MINUTES).contains(&minutes) {
        anyhow::bail!("JWT_TTL_MINUTES must be between 1 and {MAX_TTL_MINUTES}, got {minutes}");
    }
    Ok(minutes)
}

fn parse_listen_addr(host: &str, port: &str) -> anyhow::Result<SocketAddr> {
    format!("{}:{}", host, port)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid APP_HOST/APP_PORT {host}:{port}: {e}"))
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());
        let secret = std::env::var("JWT_SECRET")?;
        if secret.trim().is_empty() {
            anyhow::bail!("JWT_SECRET must not be empty");
        }
        let jwt = JwtConfig {
            secret,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "stickynotes".into()),
            audience: std::env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "stickynotes-users".into()),
            ttl_minutes: parse_ttl_minutes(std::env::var("JWT_TTL_MINUTES").ok().as_deref())?,
        };
        let conceal_forbidden = std::env::var("NOTES_CONCEAL_FORBIDDEN")
            .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        let listen_addr = parse_listen_addr(
            &std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            &std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into()),
        )?;
        Ok(Self {
            database_url,
            jwt,
            conceal_forbidden,
            listen_addr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_defaults_to_one_day() {
        assert_eq!(parse_ttl_minutes(None).unwrap(), 60 * 24);
        assert_eq!(parse_ttl_minutes(Some("30")).unwrap(), 30);
        assert_eq!(parse_ttl_minutes(Some(" 525600 ")).unwrap(), MAX_TTL_MINUTES);
    }

    #[test]
    fn ttl_out_of_range_is_refused() {
        for raw in ["0", "-5", "525601", "10000000000", "soon"] {
            assert!(parse_ttl_minutes(Some(raw)).is_err(), "{raw:?}");
        }
    }

    #[test]
    fn listen_addr_parsing() {
        let addr = parse_listen_addr("127.0.0.1", "9000").unwrap();
        assert_eq!(addr.port(), 9000);
        assert!(parse_listen_addr("0.0.0.0", "http").is_err());
    }
}
