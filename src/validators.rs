/// Input validators - protects against invalid credentials and attacks
/// Features:
/// 1. DoS Protection: Input length limits
/// 2. Phishing Protection: Email validation
/// 3. SQL Injection Prevention: Pattern screening
/// 4. Case normalization: emails are unique case-insensitively

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationError;

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321
const MIN_EMAIL_LENGTH: usize = 5;   // Minimum valid email length

lazy_static! {
    // RFC 5322 simplified email regex (practical validation)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).unwrap();

    // Regex to detect potentially malicious SQL patterns
    static ref SQL_INJECTION_PATTERNS: [Regex; 6] = [
        // Union-based SQL injection
        Regex::new(r"(?i)\s+UNION\s+").unwrap(),
        // Comment-based injection
        Regex::new(r"(--|;|/\*|\*/|xp_|sp_)").unwrap(),
        // Stacked queries
        Regex::new(r"(?i);\s*(INSERT|UPDATE|DELETE|DROP|CREATE|ALTER)").unwrap(),
        // Time-based blind injection
        Regex::new(r"(?i)(SLEEP|WAITFOR|BENCHMARK|DBMS_LOCK)").unwrap(),
        // Boolean-based injection - quotes handled with character class
        Regex::new(r#"(?i)(\bOR\b|\bAND\b)\s*(['"][0-9]*['"]|[0-9]*)\s*=\s*(['"][0-9]*['"]|[0-9]*|True|False)"#).unwrap(),
        // Function-based injection
        Regex::new(r"(?i)(CAST|CONVERT|SUBSTRING|CONCAT|LOAD_FILE)").unwrap(),
    ];
}

/// Validates and normalizes an email address
/// - Checks format using RFC 5322 simplified regex
/// - Verifies length constraints
/// - Detects potential phishing patterns
/// - Returns the trimmed, lowercased form (emails are unique case-insensitively)
pub fn is_valid_email(email: &str) -> Result<String, ValidationError> {
    let trimmed = email.trim();

    // Length validation - prevent DoS attacks with extremely long inputs
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("email".to_string()));
    }

    if trimmed.len() < MIN_EMAIL_LENGTH {
        return Err(ValidationError::TooShort("email".to_string(), MIN_EMAIL_LENGTH));
    }

    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong("email".to_string(), MAX_EMAIL_LENGTH));
    }

    // Format validation - RFC 5322 simplified
    if !EMAIL_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("email".to_string()));
    }

    // Check for suspicious patterns (phishing protection)
    if has_suspicious_email_patterns(trimmed) {
        return Err(ValidationError::SuspiciousContent("email".to_string()));
    }

    // Check for SQL injection patterns in email
    if contains_sql_injection_patterns(trimmed) {
        return Err(ValidationError::PossibleSQLInjection);
    }

    Ok(trimmed.to_lowercase())
}

/// Detects suspicious patterns in email addresses that might indicate phishing
fn has_suspicious_email_patterns(email: &str) -> bool {
    // Check for extremely long local part (before @) - phishing indicator
    if let Some(at_pos) = email.find('@') {
        let local_part = &email[..at_pos];
        if local_part.len() > 64 {
            return true;
        }
    }

    // Check for multiple @ symbols
    if email.matches('@').count() != 1 {
        return true;
    }

    // Check for null bytes
    if email.contains('\0') {
        return true;
    }

    false
}

/// Checks if input contains SQL injection patterns
fn contains_sql_injection_patterns(input: &str) -> bool {
    SQL_INJECTION_PATTERNS.iter().any(|pattern| pattern.is_match(input))
}
