use super::*;

#[test]
fn normalize_email_trims_and_lowercases() {
    assert_eq!(normalize_email("  A@B.Com "), Some("a@b.com".into()));
}

#[test]
fn normalize_email_rejects_malformed() {
    for raw in ["", "   ", "no-at-sign", "@b.com", "a@", "a@b@c.com"] {
        assert_eq!(normalize_email(raw), None, "expected rejection for {raw:?}");
    }
}

#[test]
fn parse_accepts_valid_credentials() {
    let creds = Credentials::parse("A@b.com", "secret1").unwrap();
    assert_eq!(creds.email, "a@b.com");
    assert_eq!(creds.password, "secret1");
}

#[test]
fn parse_rejects_bad_email_before_password() {
    let err = Credentials::parse("nope", "x").unwrap_err();
    assert_eq!(err, AuthError::InvalidInput("Please enter a valid email address".into()));
}

#[test]
fn parse_rejects_short_password() {
    let err = Credentials::parse("a@b.com", "12345").unwrap_err();
    assert!(matches!(err, AuthError::InvalidInput(ref msg) if msg.contains("at least 6")));
}

#[test]
fn parse_counts_password_chars_not_bytes() {
    assert!(Credentials::parse("a@b.com", "åäöåäö").is_ok());
}

#[test]
fn debug_redacts_password() {
    let creds = Credentials::parse("a@b.com", "secret1").unwrap();
    let rendered = format!("{creds:?}");
    assert!(rendered.contains("a@b.com"));
    assert!(!rendered.contains("secret1"));
}
