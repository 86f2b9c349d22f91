//! Per-participant wish lists inside the shared document.
//!
//! The functions here edit a document in place; callers run them inside a
//! read-modify-write cycle (see [`crate::store::mutate`]).
//!
//! Lists written by very old clients exist only as one free-text string per
//! participant under `gifts`. Such a string is read as one wish per line and
//! converted into a structured list the first time that list is edited.

use chrono::Utc;
use thiserror::Error;

use crate::models::{ExchangeDocument, Priority, Purchase, UrlMetadata, WishItem};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WishError {
    #[error("Participant '{0}' is not part of this exchange")]
    UnknownParticipant(String),
    #[error("Wish description cannot be empty")]
    EmptyDescription,
    #[error("Invalid URL '{0}'")]
    InvalidUrl(String),
    #[error("No wish with id '{id}' on {participant}'s list")]
    NotFound { participant: String, id: String },
    #[error("A wish with id '{0}' already exists")]
    DuplicateId(String),
}

/// A wish as entered by its owner, before it gets an id and timestamps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WishDraft {
    pub description: String,
    pub url: Option<String>,
    pub priority: Priority,
    pub metadata: Option<UrlMetadata>,
    pub metadata_error: Option<String>,
}

impl WishDraft {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Default::default()
        }
    }

    /// Trims fields and checks them. Runs before any network call.
    pub fn validate(mut self) -> Result<Self, WishError> {
        self.description = self.description.trim().to_string();
        if self.description.is_empty() {
            return Err(WishError::EmptyDescription);
        }
        self.url = self
            .url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());
        if let Some(url) = &self.url {
            validate_url(url)?;
        }
        Ok(self)
    }

    /// Turns the draft into a new wish entry.
    pub fn into_item(self) -> WishItem {
        let mut item = WishItem::new(self.description).with_priority(self.priority);
        item.url = self.url;
        item.metadata = self.metadata;
        item.metadata_error = self.metadata_error;
        item
    }
}

/// Field changes for an existing wish. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WishPatch {
    pub description: Option<String>,
    /// `Some(None)` removes the link.
    pub url: Option<Option<String>>,
    pub priority: Option<Priority>,
    pub metadata: Option<UrlMetadata>,
}

/// Checks that `url` is an absolute http(s) URL.
pub fn validate_url(url: &str) -> Result<(), WishError> {
    match reqwest::Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
        _ => Err(WishError::InvalidUrl(url.to_string())),
    }
}

const LEGACY_TIMESTAMP: i64 = 0;

/// Reads a legacy free-text wish string, one wish per line.
///
/// Leading bullets and numbering are dropped. The first http(s) link in a
/// line becomes the wish's URL. Ids are positional (`legacy-<n>`) so they
/// stay stable across reads of the same text. Legacy text carries no dates,
/// so timestamps are the Unix epoch.
pub fn legacy_items(text: &str) -> Vec<WishItem> {

    text.lines()
        .map(strip_bullet)
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(index, line)| {
            let url = line
                .split_whitespace()
                .find(|word| word.starts_with("http://") || word.starts_with("https://"))
                .map(|word| word.trim_end_matches([',', ';', ')']).to_string());

            let description = match &url {
                Some(url) => {
                    let rest = line.replacen(url.as_str(), "", 1);
                    let rest = rest.trim().trim_end_matches([':', '-']).trim();
                    if rest.is_empty() {
                        url.clone()
                    } else {
                        rest.to_string()
                    }
                }
                None => line.to_string(),
            };

            WishItem {
                id: format!("legacy-{}", index + 1),
                description,
                url,
                priority: Priority::Medium,
                created_at: LEGACY_TIMESTAMP,
                updated_at: LEGACY_TIMESTAMP,
                metadata: None,
                metadata_error: None,
                purchase: None,
            }
        })
        .collect()
}

fn strip_bullet(line: &str) -> &str {
    let line = line.trim();
    let line = line.trim_start_matches(['-', '*', '•']).trim_start();

    // "1." / "2)" numbering
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(rest) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            return rest.trim_start();
        }
    }
    line
}

/// The wish list of `participant`: the structured list if present,
/// otherwise the legacy text converted on the fly.
pub fn list_for(doc: &ExchangeDocument, participant: &str) -> Vec<WishItem> {
    if let Some(list) = doc.wish_lists.get(participant) {
        return list.clone();
    }
    doc.gifts
        .get(participant)
        .map(|text| legacy_items(text))
        .unwrap_or_default()
}

/// Mutable access to a participant's list, converting legacy text first.
fn list_mut<'a>(
    doc: &'a mut ExchangeDocument,
    participant: &str,
) -> Result<&'a mut Vec<WishItem>, WishError> {
    if !doc.has_participant(participant) {
        return Err(WishError::UnknownParticipant(participant.to_string()));
    }
    if !doc.wish_lists.contains_key(participant) {
        let seeded = list_for(doc, participant);
        doc.wish_lists.insert(participant.to_string(), seeded);
    }
    Ok(doc
        .wish_lists
        .entry(participant.to_string())
        .or_default())
}

fn find_mut<'a>(
    list: &'a mut [WishItem],
    participant: &str,
    id: &str,
) -> Result<&'a mut WishItem, WishError> {
    list.iter_mut()
        .find(|item| item.id == id)
        .ok_or_else(|| WishError::NotFound {
            participant: participant.to_string(),
            id: id.to_string(),
        })
}

/// Appends `item` to `participant`'s list.
pub fn append(
    doc: &mut ExchangeDocument,
    participant: &str,
    item: WishItem,
) -> Result<WishItem, WishError> {
    let list = list_mut(doc, participant)?;
    if list.iter().any(|existing| existing.id == item.id) {
        return Err(WishError::DuplicateId(item.id));
    }
    list.push(item.clone());
    Ok(item)
}

/// Applies `patch` to one wish, keeping `createdAt` and bumping `updatedAt`.
pub fn update(
    doc: &mut ExchangeDocument,
    participant: &str,
    id: &str,
    patch: WishPatch,
) -> Result<WishItem, WishError> {
    if let Some(description) = &patch.description {
        if description.trim().is_empty() {
            return Err(WishError::EmptyDescription);
        }
    }
    if let Some(Some(url)) = &patch.url {
        validate_url(url)?;
    }

    let list = list_mut(doc, participant)?;
    let item = find_mut(list, participant, id)?;

    if let Some(description) = patch.description {
        item.description = description.trim().to_string();
    }
    if let Some(url) = patch.url {
        if url != item.url {
            // Metadata belongs to the old link.
            item.metadata = None;
            item.metadata_error = None;
        }
        item.url = url;
    }
    if let Some(priority) = patch.priority {
        item.priority = priority;
    }
    if let Some(metadata) = patch.metadata {
        item.metadata = Some(metadata);
        item.metadata_error = None;
    }
    item.updated_at = Utc::now().timestamp_millis().max(item.created_at);

    Ok(item.clone())
}

/// Removes one wish and returns it.
pub fn remove(doc: &mut ExchangeDocument, participant: &str, id: &str) -> Result<WishItem, WishError> {
    let list = list_mut(doc, participant)?;
    let index = list
        .iter()
        .position(|item| item.id == id)
        .ok_or_else(|| WishError::NotFound {
            participant: participant.to_string(),
            id: id.to_string(),
        })?;
    Ok(list.remove(index))
}

/// Flips the purchase state of one wish on `owner`'s list.
///
/// Unpurchased becomes purchased by `purchaser` now; purchased becomes
/// unpurchased whoever bought it.
pub fn toggle_purchased(
    doc: &mut ExchangeDocument,
    owner: &str,
    id: &str,
    purchaser: &str,
) -> Result<WishItem, WishError> {
    let list = list_mut(doc, owner)?;
    let item = find_mut(list, owner, id)?;

    item.purchase = match item.purchase.take() {
        Some(_) => None,
        None => Some(Purchase {
            purchased_by: purchaser.to_string(),
            purchase_date: Utc::now().timestamp_millis(),
        }),
    };

    Ok(item.clone())
}
