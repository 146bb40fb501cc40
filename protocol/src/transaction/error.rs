//! Errors surfaced by the transaction builder.

use thiserror::Error;

use super::codec::CodecError;
use crate::authority::AuthorityError;
use crate::crypto::keys::KeyError;
use crate::network::transport::TransportError;

#[derive(Debug, Error)]
pub enum BuilderError {
    /// Permission name outside owner/active/posting.
    #[error("invalid permission: {0:?}")]
    InvalidPermission(String),

    /// Signer resolution was attempted while the key store was locked.
    #[error("wallet is locked")]
    WalletLocked,

    /// Nothing to sign with.
    #[error("no private keys available for signing")]
    MissingKey,

    /// A raw key handed to `append_wif` did not parse.
    #[error("invalid private key: {0}")]
    InvalidKey(#[from] KeyError),

    /// The node rejected (or did not confirm) the transaction's authority.
    #[error("transaction does not carry sufficient authority")]
    InsufficientAuthority,

    /// A network query was attempted without a transport.
    #[error("no RPC transport available in offline mode")]
    OfflineUnavailable,

    /// The codec refused the assembled fields.
    #[error("malformed transaction: {0}")]
    MalformedTransaction(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Authority(AuthorityError),
}

// Permission and transport faults keep their own variants no matter which
// layer reports them.
impl From<AuthorityError> for BuilderError {
    fn from(err: AuthorityError) -> Self {
        match err {
            AuthorityError::InvalidPermission(p) => Self::InvalidPermission(p),
            AuthorityError::Transport(t) => Self::Transport(t),
            other => Self::Authority(other),
        }
    }
}

impl From<CodecError> for BuilderError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Malformed(reason) => Self::MalformedTransaction(reason),
            other => Self::MalformedTransaction(other.to_string()),
        }
    }
}

pub type BuilderResult<T> = Result<T, BuilderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authority_errors_are_flattened() {
        let e: BuilderError = AuthorityError::InvalidPermission("memo".into()).into();
        assert!(matches!(e, BuilderError::InvalidPermission(p) if p == "memo"));

        let e: BuilderError = AuthorityError::Transport(TransportError::NoNodes).into();
        assert!(matches!(e, BuilderError::Transport(TransportError::NoNodes)));

        let e: BuilderError = AuthorityError::UnknownAccount("x".into()).into();
        assert!(matches!(e, BuilderError::Authority(AuthorityError::UnknownAccount(_))));
    }

    #[test]
    fn codec_errors_become_malformed() {
        let e: BuilderError = CodecError::Malformed("bad expiration".into()).into();
        assert_eq!(e.to_string(), "malformed transaction: bad expiration");
    }
}
