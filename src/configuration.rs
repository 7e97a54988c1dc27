use chrono::Duration;
use config::ConfigError;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub jwt: JwtSettings,
    pub security: SecuritySettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    pub port: u16,
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }

    pub fn connection_string_without_db(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}",
            self.username, self.password, self.host, self.port
        )
    }
}

/// JWT authentication settings
#[derive(serde::Deserialize, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub access_token_expiry: i64,  // seconds (e.g., 900 for 15 minutes)
    pub refresh_token_expiry: i64, // seconds (e.g., 604800 for 7 days)
    pub issuer: String,
}

/// Account-lockout and password-hashing settings
#[derive(serde::Deserialize, Clone)]
pub struct SecuritySettings {
    pub max_login_attempts: u32,
    pub lockout_duration_minutes: i64,
    pub pbkdf2_iterations: u32,
}

impl SecuritySettings {
    pub fn lockout_duration(&self) -> Duration {
        Duration::minutes(self.lockout_duration_minutes)
    }
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            max_login_attempts: 5,
            lockout_duration_minutes: 30,
            pbkdf2_iterations: 600_000,
        }
    }
}

pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .set_default("security.max_login_attempts", 5)?
        .set_default("security.lockout_duration_minutes", 30)?
        .set_default("security.pbkdf2_iterations", 600_000)?
        .build()?;
    settings.try_deserialize::<Settings>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_lockout_settings_match_policy() {
        let security = SecuritySettings::default();
        assert_eq!(security.max_login_attempts, 5);
        assert_eq!(security.lockout_duration(), Duration::minutes(30));
    }
}
