//! Opaque token generation for deep links

use rand::{distr::Alphanumeric, Rng};

use crate::model::TokenKind;

pub const TOKEN_LENGTH: usize = 12;

/// Marks file tokens so they are easy to tell apart from link tokens
pub const FILE_TOKEN_PREFIX: &str = "get-";

/// Random alphanumeric token of [`TOKEN_LENGTH`] characters.
///
/// Uniqueness is not checked here; the resource store retries on collision.
pub fn generate() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

pub fn generate_for(kind: TokenKind) -> String {
    match kind {
        TokenKind::Link => generate(),
        TokenKind::File => format!("{}{}", FILE_TOKEN_PREFIX, generate()),
    }
}

/// Cheap shape check run before any storage lookup
pub fn is_well_formed(token: &str) -> bool {
    let body = token.strip_prefix(FILE_TOKEN_PREFIX).unwrap_or(token);
    body.len() == TOKEN_LENGTH && body.chars().all(|c| c.is_ascii_alphanumeric())
}
