use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use senselearn_application::{
    LockoutPolicy, MAX_LOCKOUT_DURATION_MINUTES, MAX_OTP_VALIDITY_MINUTES, OtpSettings,
    RateLimitRule, RegistrationSettings,
};
use senselearn_core::AppError;
use tracing_subscriber::EnvFilter;

/// Longest session inactivity timeout: 30 days.
const MAX_SESSION_INACTIVITY_MINUTES: i64 = 30 * 24 * 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailProviderConfig {
    Console { from_address: String },
}

/// Rate-limit rules applied to the public auth route groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitRules {
    pub login: RateLimitRule,
    pub register: RateLimitRule,
    pub password_reset: RateLimitRule,
    pub otp: RateLimitRule,
}

impl Default for RateLimitRules {
    fn default() -> Self {
        Self {
            login: RateLimitRule::new("login", 5, 60),
            register: RateLimitRule::new("register", 5, 60 * 60),
            password_reset: RateLimitRule::new("password_reset", 5, 60 * 60),
            otp: RateLimitRule::new("otp", 10, 60 * 60),
        }
    }
}

impl RateLimitRules {
    /// Every configured rule, in route-group order.
    #[must_use]
    pub fn all(&self) -> [&RateLimitRule; 4] {
        [&self.login, &self.register, &self.password_reset, &self.otp]
    }
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub frontend_url: String,
    pub api_host: String,
    pub api_port: u16,
    pub cookie_secure: bool,
    pub session_inactivity_minutes: i64,
    pub trust_forwarded_for: bool,
    pub csrf_enabled: bool,
    pub lockout: LockoutPolicy,
    pub rate_limits: RateLimitRules,
    pub otp: OtpSettings,
    pub registration: RegistrationSettings,
    pub email_provider: EmailProviderConfig,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let frontend_url = var("FRONTEND_URL").unwrap_or_else(|| "http://localhost:3000".to_owned());
        let api_host = var("API_HOST").unwrap_or_else(|| "127.0.0.1".to_owned());
        let api_port = parse_or("API_PORT", var("API_PORT"), 5000_u16)?;

        let cookie_secure = parse_flag("SESSION_COOKIE_SECURE", var("SESSION_COOKIE_SECURE"), false)?;
        let session_inactivity_minutes = parse_or(
            "SESSION_INACTIVITY_MINUTES",
            var("SESSION_INACTIVITY_MINUTES"),
            30_i64,
        )?;
        if !(1..=MAX_SESSION_INACTIVITY_MINUTES).contains(&session_inactivity_minutes) {
            return Err(AppError::Validation(format!(
                "SESSION_INACTIVITY_MINUTES must be between 1 and {MAX_SESSION_INACTIVITY_MINUTES}"
            )));
        }

        let trust_forwarded_for =
            parse_flag("TRUST_FORWARDED_FOR", var("TRUST_FORWARDED_FOR"), false)?;
        let csrf_enabled = parse_flag("CSRF_ENABLED", var("CSRF_ENABLED"), true)?;

        let default_lockout = LockoutPolicy::default();
        let max_attempts = parse_or(
            "LOCKOUT_MAX_ATTEMPTS",
            var("LOCKOUT_MAX_ATTEMPTS"),
            default_lockout.max_attempts,
        )?;
        if max_attempts == 0 {
            return Err(AppError::Validation(
                "LOCKOUT_MAX_ATTEMPTS must be positive".to_owned(),
            ));
        }
        let lockout_minutes = parse_or(
            "LOCKOUT_DURATION_MINUTES",
            var("LOCKOUT_DURATION_MINUTES"),
            default_lockout.lockout_duration_seconds / 60,
        )?;
        let lockout_duration_seconds = Some(lockout_minutes)
            .filter(|minutes| (1..=MAX_LOCKOUT_DURATION_MINUTES).contains(minutes))
            .and_then(|minutes| minutes.checked_mul(60))
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "LOCKOUT_DURATION_MINUTES must be between 1 and {MAX_LOCKOUT_DURATION_MINUTES}"
                ))
            })?;
        let lockout = LockoutPolicy {
            max_attempts,
            lockout_duration_seconds,
        };

        let defaults = RateLimitRules::default();
        let rate_limits = RateLimitRules {
            login: rule_or("RATE_LIMIT_LOGIN", var("RATE_LIMIT_LOGIN"), defaults.login)?,
            register: rule_or(
                "RATE_LIMIT_REGISTER",
                var("RATE_LIMIT_REGISTER"),
                defaults.register,
            )?,
            password_reset: rule_or(
                "RATE_LIMIT_PASSWORD_RESET",
                var("RATE_LIMIT_PASSWORD_RESET"),
                defaults.password_reset,
            )?,
            otp: rule_or("RATE_LIMIT_OTP", var("RATE_LIMIT_OTP"), defaults.otp)?,
        };

        let default_otp = OtpSettings::default();
        let otp = OtpSettings {
            length: parse_or("OTP_LENGTH", var("OTP_LENGTH"), default_otp.length)?,
            validity_minutes: parse_or(
                "OTP_VALIDITY_MINUTES",
                var("OTP_VALIDITY_MINUTES"),
                default_otp.validity_minutes,
            )?,
            ..default_otp
        };
        if !(4..=10).contains(&otp.length) {
            return Err(AppError::Validation(
                "OTP_LENGTH must be between 4 and 10".to_owned(),
            ));
        }
        if !(1..=MAX_OTP_VALIDITY_MINUTES).contains(&otp.validity_minutes) {
            return Err(AppError::Validation(format!(
                "OTP_VALIDITY_MINUTES must be between 1 and {MAX_OTP_VALIDITY_MINUTES}"
            )));
        }

        let registration = match var("VALID_DISABILITY_TYPES") {
            Some(value) => RegistrationSettings {
                valid_disability_types: value
                    .split(',')
                    .map(|item| item.trim().to_lowercase())
                    .filter(|item| !item.is_empty())
                    .collect(),
            },
            None => RegistrationSettings::default(),
        };

        let email_provider = match var("EMAIL_PROVIDER")
            .unwrap_or_else(|| "console".to_owned())
            .as_str()
        {
            "console" => EmailProviderConfig::Console {
                from_address: var("EMAIL_FROM_ADDRESS")
                    .unwrap_or_else(|| "no-reply@senselearn.io".to_owned()),
            },
            other => {
                return Err(AppError::Validation(format!(
                    "EMAIL_PROVIDER must be 'console', got '{other}'"
                )));
            }
        };

        Ok(Self {
            frontend_url,
            api_host,
            api_port,
            cookie_secure,
            session_inactivity_minutes,
            trust_forwarded_for,
            csrf_enabled,
            lockout,
            rate_limits,
            otp,
            registration,
            email_provider,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Internal(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .compact()
        .init();
}

fn parse_or<T>(name: &str, value: Option<String>, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.map_or(Ok(default), |value| {
        value
            .trim()
            .parse::<T>()
            .map_err(|error| AppError::Validation(format!("invalid {name}: {error}")))
    })
}

fn parse_flag(name: &str, value: Option<String>, default: bool) -> Result<bool, AppError> {
    let Some(value) = value else {
        return Ok(default);
    };

    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(AppError::Validation(format!(
            "{name} must be 'true' or 'false', got '{other}'"
        ))),
    }
}

fn rule_or(
    name: &str,
    value: Option<String>,
    default: RateLimitRule,
) -> Result<RateLimitRule, AppError> {
    match value {
        Some(value) => RateLimitRule::parse(default.category, &value)
            .map_err(|error| AppError::Validation(format!("invalid {name}: {}", error.message()))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<ApiConfig, AppError> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect();
        ApiConfig::from_lookup(|name| values.get(name).cloned())
    }

    #[test]
    fn defaults_apply_without_environment() {
        let config = config_from(&[]);
        assert!(config.is_ok());
        let Ok(config) = config else { return };

        assert_eq!(config.api_port, 5000);
        assert_eq!(config.frontend_url, "http://localhost:3000");
        assert!(config.csrf_enabled);
        assert!(!config.cookie_secure);
        assert!(!config.trust_forwarded_for);
        assert_eq!(config.lockout, LockoutPolicy::default());
        assert_eq!(config.rate_limits, RateLimitRules::default());
        assert_eq!(config.otp.length, 6);
        assert_eq!(config.registration.valid_disability_types.len(), 7);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = config_from(&[
            ("RATE_LIMIT_LOGIN", "20/900"),
            ("LOCKOUT_DURATION_MINUTES", "15"),
            ("CSRF_ENABLED", "false"),
            ("VALID_DISABILITY_TYPES", "Visual, hearing"),
        ]);
        assert!(config.is_ok());
        let Ok(config) = config else { return };

        assert_eq!(config.rate_limits.login, RateLimitRule::new("login", 20, 900));
        assert_eq!(config.lockout.lockout_duration_seconds, 900);
        assert!(!config.csrf_enabled);
        assert_eq!(
            config.registration.valid_disability_types,
            vec!["visual".to_owned(), "hearing".to_owned()]
        );
    }

    #[test]
    fn malformed_values_are_rejected() {
        assert!(config_from(&[("API_PORT", "eighty")]).is_err());
        assert!(config_from(&[("CSRF_ENABLED", "maybe")]).is_err());
        assert!(config_from(&[("RATE_LIMIT_OTP", "10")]).is_err());
        assert!(config_from(&[("EMAIL_PROVIDER", "smtp")]).is_err());
        assert!(config_from(&[("OTP_LENGTH", "2")]).is_err());
    }

    #[test]
    fn out_of_range_durations_are_rejected_at_load() {
        let too_large = [
            ("RATE_LIMIT_LOGIN", "5/9223372036854775807"),
            ("RATE_LIMIT_REGISTER", "5/2592001"),
            ("LOCKOUT_DURATION_MINUTES", "153722867280912930"),
            ("LOCKOUT_DURATION_MINUTES", "10081"),
            ("OTP_VALIDITY_MINUTES", "9223372036854775807"),
            ("OTP_VALIDITY_MINUTES", "1441"),
            ("SESSION_INACTIVITY_MINUTES", "9223372036854775807"),
        ];
        for (name, value) in too_large {
            let result = config_from(&[(name, value)]);
            assert!(
                matches!(result, Err(AppError::Validation(_))),
                "{name}={value} should be rejected"
            );
        }

        assert!(config_from(&[("LOCKOUT_DURATION_MINUTES", "0")]).is_err());
        assert!(config_from(&[("OTP_VALIDITY_MINUTES", "-5")]).is_err());
    }

    #[test]
    fn longest_accepted_durations_load() {
        let config = config_from(&[
            ("RATE_LIMIT_REGISTER", "2/2592000"),
            ("LOCKOUT_DURATION_MINUTES", "10080"),
            ("OTP_VALIDITY_MINUTES", "1440"),
        ]);
        assert!(config.is_ok());
        let Ok(config) = config else { return };

        assert_eq!(config.rate_limits.register.window_seconds, 2_592_000);
        assert_eq!(config.lockout.lockout_duration_seconds, 604_800);
        assert_eq!(config.otp.validity_minutes, 1440);
        assert_eq!(config.rate_limits.all().len(), 4);
    }

    #[test]
    fn socket_address_requires_ip_host() {
        let config = config_from(&[("API_HOST", "localhost")]);
        assert!(config.is_ok_and(|config| config.socket_address().is_err()));
    }
}
