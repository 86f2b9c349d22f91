//! Crate-level error type for exchange operations.

use thiserror::Error;

use crate::assignment::ClaimError;
use crate::metadata::MetadataError;
use crate::session::SessionError;
use crate::store::StoreError;
use crate::wishlist::WishError;

/// Reasons a roster change is refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RosterError {
    #[error("Participant name cannot be empty")]
    EmptyName,
    #[error("Participant '{0}' already exists")]
    AlreadyExists(String),
    #[error("Participant '{0}' is not part of this exchange")]
    UnknownParticipant(String),
    #[error("{0} cannot be forbidden from picking themselves")]
    SelfForbidden(String),
    #[error("Names have already been picked; reset the exchange before changing the roster")]
    ClaimsExist,
    #[error("Need at least 2 participants")]
    NotEnoughParticipants,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Claim(#[from] ClaimError),
    #[error(transparent)]
    Wish(#[from] WishError),
    #[error(transparent)]
    Roster(#[from] RosterError),
    #[error(transparent)]
    Metadata(#[from] MetadataError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("User '{0}' not found in the system")]
    UnknownParticipant(String),
    #[error("Incorrect password")]
    IncorrectPassword,
    #[error("{0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, Error>;
