//! Recipient assignment: who may pick whom, and first-claim-wins picking.
//!
//! At setup every participant gets the list of all other participants minus
//! the names they are forbidden to pick. A claim records `taken[name] =
//! participant`; a name can be taken once and a participant claims once.
//!
//! Picking happens through anonymous boxes. The boxes shown to a participant
//! are shuffled with a PRNG seeded from the participant's name, so the same
//! participant sees the same box order on every run. The shuffle is cosmetic.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::models::ExchangeDocument;

pub const BOX_COLORS: [&str; 12] = [
    "red", "green", "blue", "purple", "yellow", "pink", "indigo", "teal", "gray", "orange",
    "cyan", "violet",
];

pub const BOX_ICONS: [&str; 4] = ["gift", "heart", "star", "sparkles"];

/// Reasons a claim is refused. The document is never modified on error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClaimError {
    #[error("Participant '{0}' is not part of this exchange")]
    UnknownParticipant(String),
    #[error("'{name}' is not one of {participant}'s choices")]
    NotEligible { participant: String, name: String },
    #[error("{participant} is not allowed to pick '{name}'")]
    Forbidden { participant: String, name: String },
    #[error("This name has already been picked!")]
    AlreadyClaimed { name: String, by: String },
    #[error("{participant} has already picked a name")]
    AlreadyAssigned { participant: String },
}

/// Computes `names` for a roster: everyone else, minus forbidden names.
///
/// Order follows `participants`.
pub fn eligible_names(
    participants: &[String],
    forbidden: &BTreeMap<String, Vec<String>>,
) -> BTreeMap<String, Vec<String>> {
    participants
        .iter()
        .map(|p| {
            let blocked = forbidden.get(p).map(Vec::as_slice).unwrap_or(&[]);
            let names = participants
                .iter()
                .filter(|other| *other != p && !blocked.contains(*other))
                .cloned()
                .collect();
            (p.clone(), names)
        })
        .collect()
}

/// The name `participant` has claimed, if any.
pub fn recipient_of<'a>(doc: &'a ExchangeDocument, participant: &str) -> Option<&'a str> {
    doc.taken
        .iter()
        .find(|(_, by)| by.as_str() == participant)
        .map(|(name, _)| name.as_str())
}

/// Eligible names for `participant` that nobody has taken yet.
pub fn available_names<'a>(doc: &'a ExchangeDocument, participant: &str) -> Vec<&'a str> {
    doc.eligible_for(participant)
        .iter()
        .filter(|name| !doc.is_taken(name))
        .map(String::as_str)
        .collect()
}

/// Checks that `participant` may claim `name` right now.
pub fn check_claim(doc: &ExchangeDocument, participant: &str, name: &str) -> Result<(), ClaimError> {
    if !doc.has_participant(participant) {
        return Err(ClaimError::UnknownParticipant(participant.to_string()));
    }
    if doc.forbidden_for(participant).iter().any(|n| n == name) {
        return Err(ClaimError::Forbidden {
            participant: participant.to_string(),
            name: name.to_string(),
        });
    }
    if !doc.eligible_for(participant).iter().any(|n| n == name) {
        return Err(ClaimError::NotEligible {
            participant: participant.to_string(),
            name: name.to_string(),
        });
    }
    if let Some(by) = doc.taken.get(name) {
        return Err(ClaimError::AlreadyClaimed {
            name: name.to_string(),
            by: by.clone(),
        });
    }
    if recipient_of(doc, participant).is_some() {
        return Err(ClaimError::AlreadyAssigned {
            participant: participant.to_string(),
        });
    }
    Ok(())
}

/// Records `participant`'s claim on `name`.
pub fn claim(doc: &mut ExchangeDocument, participant: &str, name: &str) -> Result<(), ClaimError> {
    check_claim(doc, participant, name)?;
    doc.taken.insert(name.to_string(), participant.to_string());
    Ok(())
}

/// One anonymous box hiding a candidate name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnonymousBox {
    /// 1-based position, stable for a given participant and name list.
    pub number: usize,
    #[serde(skip)]
    pub hidden_name: String,
    pub color: &'static str,
    pub icon: &'static str,
    /// Someone already claimed the hidden name.
    pub taken: bool,
}

/// Derives a PRNG seed from a participant's name.
fn seed_for(key: &str) -> u64 {
    let digest = Sha256::digest(key.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

/// Shuffles `names` into anonymous boxes, deterministically for `seed_key`.
pub fn anonymous_boxes(names: &[String], seed_key: &str) -> Vec<AnonymousBox> {
    let mut rng = StdRng::seed_from_u64(seed_for(seed_key));
    let mut shuffled = names.to_vec();
    shuffled.shuffle(&mut rng);

    shuffled
        .into_iter()
        .enumerate()
        .map(|(index, hidden_name)| AnonymousBox {
            number: index + 1,
            hidden_name,
            color: BOX_COLORS[rng.random_range(0..BOX_COLORS.len())],
            icon: BOX_ICONS[rng.random_range(0..BOX_ICONS.len())],
            taken: false,
        })
        .collect()
}

/// The boxes `participant` chooses from: one per eligible name, taken ones
/// flagged. Numbering does not change as names get taken.
pub fn boxes_for(doc: &ExchangeDocument, participant: &str) -> Vec<AnonymousBox> {
    let mut boxes = anonymous_boxes(doc.eligible_for(participant), participant);
    for b in &mut boxes {
        b.taken = doc.is_taken(&b.hidden_name);
    }
    boxes
}
