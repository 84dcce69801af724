/// Two-Factor Authentication (2FA) using TOTP (Time-based One-Time Password)
///
/// Secrets are 160-bit random values, base32-encoded per the otpauth
/// provisioning convention (SHA1, 6 digits, 30-second period). Verification
/// accepts the previous, current, and next time step (+/-1 step of skew).
use base32::Alphabet;
use qrcode::{render::svg, QrCode};
use rand::Rng;
use std::time::{SystemTime, UNIX_EPOCH};
use totp_lite::{totp_custom, Sha1};

use crate::error::{IdentityError, Result};

/// Time step in seconds (standard TOTP).
const PERIOD: u64 = 30;

/// Number of digits in a code.
const DIGITS: u32 = 6;

/// Raw secret length in bytes (160 bits, per RFC 4226 recommendation).
const SECRET_LEN: usize = 20;

const BACKUP_CODE_COUNT: usize = 8;
const BACKUP_CODE_LEN: usize = 8;

/// Backup-code alphabet: uppercase alphanumerics minus the ambiguous
/// 0/O and 1/I pairs.
const BACKUP_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

const BASE32: Alphabet = Alphabet::Rfc4648 { padding: false };

pub struct TOTPGenerator;

impl TOTPGenerator {
    /// Generate a new TOTP secret, base32-encoded for authenticator apps.
    pub fn generate_secret() -> String {
        let mut secret_bytes = [0u8; SECRET_LEN];
        rand::thread_rng().fill(&mut secret_bytes);
        base32::encode(BASE32, &secret_bytes)
    }

    /// Build the otpauth provisioning URI encoding issuer, account label,
    /// secret, algorithm, digit count, and period.
    pub fn provisioning_uri(secret: &str, account: &str, issuer: &str) -> String {
        format!(
            "otpauth://totp/{issuer}:{account}?secret={secret}&issuer={issuer}&algorithm=SHA1&digits={DIGITS}&period={PERIOD}",
            issuer = urlencoding::encode(issuer),
            account = urlencoding::encode(account),
            secret = secret,
        )
    }

    /// Render a provisioning URI as an SVG QR code for enrollment screens.
    pub fn qr_svg(uri: &str) -> Result<String> {
        let code = QrCode::new(uri.as_bytes())
            .map_err(|e| IdentityError::Internal(format!("Failed to build QR code: {e}")))?;

        Ok(code
            .render::<svg::Color>()
            .min_dimensions(200, 200)
            .build())
    }

    /// Verify a TOTP code against a stored secret.
    ///
    /// Accepts codes for the previous, current, and next 30-second step to
    /// tolerate clock skew between the server and the authenticator device.
    pub fn verify_code(secret: &str, code: &str) -> Result<bool> {
        if code.len() != DIGITS as usize || !code.chars().all(|c| c.is_ascii_digit()) {
            return Ok(false);
        }

        let secret_bytes = decode_secret(secret)?;

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| IdentityError::Internal("System clock before Unix epoch".to_string()))?
            .as_secs();

        let window = [now.saturating_sub(PERIOD), now, now + PERIOD];
        Ok(window.iter().any(|t| code_at(&secret_bytes, *t) == code))
    }

    /// Generate backup codes for account recovery: 8 codes, 8 characters
    /// each, from an unambiguous uppercase alphabet. Single-use; callers
    /// remove a code from the set once it has been consumed.
    pub fn generate_backup_codes() -> Vec<String> {
        let mut rng = rand::thread_rng();
        (0..BACKUP_CODE_COUNT)
            .map(|_| {
                (0..BACKUP_CODE_LEN)
                    .map(|_| {
                        let idx = rng.gen_range(0..BACKUP_CODE_ALPHABET.len());
                        BACKUP_CODE_ALPHABET[idx] as char
                    })
                    .collect()
            })
            .collect()
    }

    /// Check a candidate against the remaining backup codes.
    /// Comparison is case-insensitive; a missing set or empty candidate
    /// never matches.
    pub fn verify_backup_code(codes: Option<&[String]>, candidate: &str) -> bool {
        let Some(codes) = codes else {
            return false;
        };
        if candidate.is_empty() {
            return false;
        }

        let candidate = candidate.to_uppercase();
        codes.iter().any(|code| code.to_uppercase() == candidate)
    }

    /// Return the code set minus the consumed code. No code is reusable
    /// after consumption.
    pub fn remove_backup_code(codes: &[String], used: &str) -> Vec<String> {
        let used = used.to_uppercase();
        codes
            .iter()
            .filter(|code| code.to_uppercase() != used)
            .cloned()
            .collect()
    }
}

fn decode_secret(secret: &str) -> Result<Vec<u8>> {
    base32::decode(BASE32, secret)
        .filter(|bytes| bytes.len() == SECRET_LEN)
        .ok_or(IdentityError::InvalidTwoFactorCode)
}

fn code_at(secret_bytes: &[u8], time: u64) -> String {
    totp_custom::<Sha1>(PERIOD, DIGITS, secret_bytes, time)
}
