//! Password strength policy.
//!
//! Every rule is evaluated so callers can show the full list of problems at
//! once instead of one error per submit.

use senselearn_core::{AppError, AppResult};
use serde::Serialize;

/// Minimum password length in characters.
pub const PASSWORD_MIN_LENGTH: usize = 8;

/// Maximum password length in characters (bounds Argon2id work per request).
pub const PASSWORD_MAX_LENGTH: usize = 128;

/// Characters that satisfy the special-character rule.
pub const PASSWORD_SPECIAL_CHARACTERS: &str = "!@#$%^&*(),.?\":{}|<>";

/// Length of a run of repeated or sequential characters that is rejected.
const RUN_LENGTH: usize = 4;

/// Validates a plaintext password and joins every violation into one
/// validation error.
pub fn validate_password(password: &str) -> AppResult<()> {
    let violations = password_policy_violations(password);
    if violations.is_empty() {
        return Ok(());
    }

    Err(AppError::Validation(violations.join("; ")))
}

/// Returns every policy rule the password breaks, in a stable order.
#[must_use]
pub fn password_policy_violations(password: &str) -> Vec<String> {
    if password.is_empty() {
        return vec!["Password is required".to_owned()];
    }

    let mut violations = Vec::new();
    let char_count = password.chars().count();

    if char_count < PASSWORD_MIN_LENGTH {
        violations.push(format!(
            "Password must be at least {PASSWORD_MIN_LENGTH} characters long"
        ));
    }

    if char_count > PASSWORD_MAX_LENGTH {
        violations.push(format!(
            "Password must not exceed {PASSWORD_MAX_LENGTH} characters"
        ));
    }

    if is_common_password(password) {
        violations.push(
            "Password is too common. Please choose a more unique password".to_owned(),
        );
    }

    if !password.chars().any(|character| character.is_ascii_uppercase()) {
        violations.push("Password must contain at least one uppercase letter".to_owned());
    }

    if !password.chars().any(|character| character.is_ascii_lowercase()) {
        violations.push("Password must contain at least one lowercase letter".to_owned());
    }

    if !password.chars().any(|character| character.is_ascii_digit()) {
        violations.push("Password must contain at least one digit".to_owned());
    }

    if !password.chars().any(is_special_character) {
        violations.push("Password must contain at least one special character".to_owned());
    }

    if has_repeated_run(password) {
        violations.push("Password contains too many repeated characters".to_owned());
    }

    if has_sequential_run(password) {
        violations.push("Password contains sequential characters".to_owned());
    }

    violations
}

/// Coarse password strength shown next to the password field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PasswordStrength {
    /// Score of 2 or less.
    Weak,
    /// Score between 3 and 5.
    Medium,
    /// Score of 6 or more.
    Strong,
}

/// Scores a password by length tiers and character variety.
#[must_use]
pub fn password_strength(password: &str) -> PasswordStrength {
    if password.is_empty() {
        return PasswordStrength::Weak;
    }

    let length = password.chars().count();
    let mut score: i32 = [8, 12, 16]
        .iter()
        .map(|tier| i32::from(length >= *tier))
        .sum();

    let classes = [
        password.chars().any(|character| character.is_ascii_lowercase()),
        password.chars().any(|character| character.is_ascii_uppercase()),
        password.chars().any(|character| character.is_ascii_digit()),
        password.chars().any(is_special_character),
    ];
    score += classes.iter().map(|present| i32::from(*present)).sum::<i32>();

    if is_common_password(password) {
        score -= 3;
    }

    match score {
        ..=2 => PasswordStrength::Weak,
        3..=5 => PasswordStrength::Medium,
        _ => PasswordStrength::Strong,
    }
}

fn is_special_character(character: char) -> bool {
    PASSWORD_SPECIAL_CHARACTERS.contains(character)
}

fn is_common_password(password: &str) -> bool {
    let lowered = password.to_lowercase();
    COMMON_PASSWORDS.iter().any(|entry| *entry == lowered)
}

fn has_repeated_run(password: &str) -> bool {
    let characters: Vec<char> = password.chars().collect();
    characters
        .windows(RUN_LENGTH)
        .any(|window| window.iter().all(|character| *character == window[0]))
}

fn has_sequential_run(password: &str) -> bool {
    let characters: Vec<char> = password.chars().collect();
    characters.windows(RUN_LENGTH).any(|window| {
        let all_digits = window.iter().all(char::is_ascii_digit);
        let all_letters = window.iter().all(char::is_ascii_alphabetic);
        if !all_digits && !all_letters {
            return false;
        }

        let codes: Vec<i64> = window
            .iter()
            .map(|character| i64::from(u32::from(character.to_ascii_lowercase())))
            .collect();
        let ascending = codes.windows(2).all(|pair| pair[1] == pair[0] + 1);
        let descending = codes.windows(2).all(|pair| pair[1] == pair[0] - 1);
        ascending || descending
    })
}

/// Frequently breached passwords (subset for a fast embedded check).
static COMMON_PASSWORDS: &[&str] = &[
    "password",
    "123456",
    "12345678",
    "123456789",
    "1234567890",
    "qwerty",
    "abc123",
    "password1",
    "password123",
    "welcome",
    "letmein",
    "monkey",
    "dragon",
    "master",
    "sunshine",
    "princess",
    "football",
    "iloveyou",
    "admin",
    "root",
    "toor",
    "trustno1",
    "passw0rd",
    "qwerty123",
    "baseball",
    "superman",
    "starwars",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strong_password_is_accepted() {
        assert!(validate_password("Str0ng!Pass").is_ok());
    }

    #[test]
    fn empty_password_reports_required_only() {
        assert_eq!(
            password_policy_violations(""),
            vec!["Password is required".to_owned()]
        );
    }

    #[test]
    fn every_violation_is_reported() {
        let violations = password_policy_violations("abc");
        assert!(violations.iter().any(|v| v.contains("at least 8")));
        assert!(violations.iter().any(|v| v.contains("uppercase")));
        assert!(violations.iter().any(|v| v.contains("digit")));
        assert!(violations.iter().any(|v| v.contains("special")));
    }

    #[test]
    fn common_password_is_rejected_case_insensitively() {
        let violations = password_policy_violations("PassWord1");
        assert!(violations.iter().any(|v| v.contains("too common")));
    }

    #[test]
    fn repeated_characters_are_rejected() {
        let violations = password_policy_violations("Xaaaa9!yz");
        assert!(violations.iter().any(|v| v.contains("repeated")));
    }

    #[test]
    fn ascending_and_descending_runs_are_rejected() {
        assert!(has_sequential_run("x1234y"));
        assert!(has_sequential_run("Q9876"));
        assert!(has_sequential_run("zAbCd"));
        assert!(has_sequential_run("wdcba"));
        assert!(!has_sequential_run("a1b2c3d4"));
    }

    #[test]
    fn overlong_password_is_rejected() {
        let long = format!("Aa1!{}", "xy".repeat(PASSWORD_MAX_LENGTH));
        let violations = password_policy_violations(&long);
        assert!(violations.iter().any(|v| v.contains("must not exceed")));
    }

    #[test]
    fn strength_tiers_follow_score() {
        assert_eq!(password_strength(""), PasswordStrength::Weak);
        assert_eq!(password_strength("abc"), PasswordStrength::Weak);
        assert_eq!(password_strength("abcdefgh1"), PasswordStrength::Medium);
        assert_eq!(
            password_strength("Correct-Horse-Battery-9"),
            PasswordStrength::Strong
        );
    }

    #[test]
    fn common_password_loses_strength() {
        assert_eq!(password_strength("password123"), PasswordStrength::Weak);
    }
}
