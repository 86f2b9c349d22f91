//! The exchange as participants and organisers use it.
//!
//! [`GiftExchange`] wraps a [`DocumentStore`] and runs every change as a
//! read-modify-write cycle through [`mutate`], so rule checks always see the
//! document as it is right before the write.

use std::collections::BTreeMap;

use crate::assignment::{self, AnonymousBox};
use crate::error::{Error, Result, RosterError};
use crate::hasher;
use crate::metadata::{MetadataError, MetadataFetcher};
use crate::models::{ExchangeDocument, Step, UrlMetadata, WishItem};
use crate::session::Session;
use crate::store::{mutate, DocumentStore};
use crate::wishlist::{self, WishDraft, WishPatch};

/// Outcome of a successful login or session restore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Login {
    pub participant: String,
    /// Name this participant has picked, if any.
    pub recipient: Option<String>,
    /// Stored digest, remembered for silent restore.
    pub password_digest: Option<String>,
    pub next_step: Step,
}

impl Login {
    fn new(doc: &ExchangeDocument, participant: &str, password_digest: Option<String>) -> Self {
        let recipient = assignment::recipient_of(doc, participant).map(str::to_string);
        let next_step = if recipient.is_some() {
            Step::Wishes
        } else {
            Step::Selection
        };
        Self {
            participant: participant.to_string(),
            recipient,
            password_digest,
            next_step,
        }
    }

    pub fn session(&self) -> Session {
        Session::new(self.participant.clone(), self.password_digest.clone())
    }
}

pub struct GiftExchange<S> {
    store: S,
    metadata: Option<MetadataFetcher>,
}

impl<S: DocumentStore> GiftExchange<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            metadata: None,
        }
    }

    /// Enables link previews for wishes added or edited with a URL.
    pub fn with_metadata(mut self, fetcher: MetadataFetcher) -> Self {
        self.metadata = Some(fetcher);
        self
    }

    /// Reads the current document.
    pub async fn document(&self) -> Result<ExchangeDocument> {
        Ok(self.store.fetch().await?.document)
    }

    async fn document_for(&self, participant: &str) -> Result<ExchangeDocument> {
        let doc = self.document().await?;
        ensure_participant(&doc, participant)?;
        Ok(doc)
    }

    // --- Participants ---

    /// Logs `participant` in.
    ///
    /// With a stored password the given one must match. Without one, a
    /// non-empty password is stored for next time.
    pub async fn login(&self, participant: &str, password: Option<&str>) -> Result<Login> {
        let password = password.filter(|p| !p.is_empty());
        let doc = self.document_for(participant).await?;

        if let Some(stored) = doc.passwords.get(participant) {
            return if hasher::verify(password.unwrap_or(""), stored) {
                tracing::info!("{} logged in", participant);
                Ok(Login::new(&doc, participant, Some(stored.clone())))
            } else {
                Err(Error::IncorrectPassword)
            };
        }

        let Some(password) = password else {
            tracing::info!("{} logged in without a password", participant);
            return Ok(Login::new(&doc, participant, None));
        };

        let fresh = hasher::hash_for_storage(password);
        let (doc, digest) = mutate(&self.store, |doc| {
            ensure_participant(doc, participant)?;
            match doc.passwords.get(participant) {
                // Set by a concurrent login in the meantime.
                Some(stored) if hasher::verify(password, stored) => Ok(stored.clone()),
                Some(_) => Err(Error::IncorrectPassword),
                None => {
                    doc.passwords
                        .insert(participant.to_string(), fresh.clone());
                    Ok(fresh.clone())
                }
            }
        })
        .await?;

        tracing::info!("{} logged in and set a password", participant);
        Ok(Login::new(&doc, participant, Some(digest)))
    }

    /// Silently restores a saved session.
    ///
    /// Returns `None` when the participant is gone or the stored password
    /// changed since the session was saved.
    pub async fn restore(&self, session: &Session) -> Result<Option<Login>> {
        let doc = self.document().await?;
        if !doc.has_participant(&session.participant) {
            return Ok(None);
        }

        let stored = doc.passwords.get(&session.participant);
        let valid = match (stored, &session.password_digest) {
            (Some(stored), Some(saved)) => stored == saved,
            (None, None) => true,
            _ => false,
        };

        Ok(valid.then(|| Login::new(&doc, &session.participant, stored.cloned())))
    }

    /// Name `participant` has picked, if any.
    pub async fn recipient(&self, participant: &str) -> Result<Option<String>> {
        let doc = self.document_for(participant).await?;
        Ok(assignment::recipient_of(&doc, participant).map(str::to_string))
    }

    /// Anonymous boxes `participant` can pick from.
    pub async fn boxes(&self, participant: &str) -> Result<Vec<AnonymousBox>> {
        let doc = self.document_for(participant).await?;
        Ok(assignment::boxes_for(&doc, participant))
    }

    /// Claims `name` for `participant`. The first claim on a name wins.
    pub async fn claim(&self, participant: &str, name: &str) -> Result<()> {
        mutate(&self.store, |doc| {
            assignment::claim(doc, participant, name).map_err(Error::from)
        })
        .await?;

        tracing::info!("{} picked a name", participant);
        Ok(())
    }

    /// Opens box `number` (1-based) and claims the name inside.
    pub async fn pick_box(&self, participant: &str, number: usize) -> Result<String> {
        let (_, name) = mutate(&self.store, |doc| {
            ensure_participant(doc, participant)?;
            let name = assignment::boxes_for(doc, participant)
                .into_iter()
                .find(|b| b.number == number)
                .map(|b| b.hidden_name)
                .ok_or_else(|| Error::Validation(format!("There is no box number {}", number)))?;
            assignment::claim(doc, participant, &name)?;
            Ok::<_, Error>(name)
        })
        .await?;

        tracing::info!("{} opened box {}", participant, number);
        Ok(name)
    }

    // --- Wish lists ---

    pub async fn wish_list(&self, participant: &str) -> Result<Vec<WishItem>> {
        let doc = self.document_for(participant).await?;
        Ok(wishlist::list_for(&doc, participant))
    }

    /// Every participant's wish list except `except`'s own.
    pub async fn all_wish_lists(&self, except: &str) -> Result<BTreeMap<String, Vec<WishItem>>> {
        let doc = self.document().await?;
        Ok(doc
            .participants()
            .filter(|p| *p != except)
            .map(|p| (p.to_string(), wishlist::list_for(&doc, p)))
            .collect())
    }

    /// Validates `draft`, looks up link details, and appends the wish.
    pub async fn add_wish(&self, participant: &str, draft: WishDraft) -> Result<WishItem> {
        let mut draft = draft.validate()?;
        if draft.metadata.is_none() {
            if let Some(url) = &draft.url {
                match self.preview(url).await {
                    Some(Ok(metadata)) => draft.metadata = Some(metadata),
                    Some(Err(e)) => draft.metadata_error = Some(e.to_string()),
                    None => {}
                }
            }
        }

        let item = draft.into_item();
        let (_, added) = mutate(&self.store, |doc| {
            wishlist::append(doc, participant, item.clone()).map_err(Error::from)
        })
        .await?;

        tracing::info!("{} added a wish", participant);
        Ok(added)
    }

    pub async fn update_wish(&self, participant: &str, id: &str, patch: WishPatch) -> Result<WishItem> {
        let mut patch = patch;
        if patch.metadata.is_none() {
            if let Some(Some(url)) = &patch.url {
                wishlist::validate_url(url)?;
                if let Some(Ok(metadata)) = self.preview(url).await {
                    patch.metadata = Some(metadata);
                }
            }
        }

        let (_, updated) = mutate(&self.store, |doc| {
            wishlist::update(doc, participant, id, patch.clone()).map_err(Error::from)
        })
        .await?;
        Ok(updated)
    }

    pub async fn remove_wish(&self, participant: &str, id: &str) -> Result<WishItem> {
        let (_, removed) = mutate(&self.store, |doc| {
            wishlist::remove(doc, participant, id).map_err(Error::from)
        })
        .await?;

        tracing::info!("{} removed a wish", participant);
        Ok(removed)
    }

    /// Marks a wish on `owner`'s list as bought by `purchaser`, or unmarks it.
    pub async fn toggle_purchased(&self, owner: &str, id: &str, purchaser: &str) -> Result<WishItem> {
        let (_, item) = mutate(&self.store, |doc| {
            ensure_participant(doc, purchaser)?;
            wishlist::toggle_purchased(doc, owner, id, purchaser).map_err(Error::from)
        })
        .await?;
        Ok(item)
    }

    async fn preview(&self, url: &str) -> Option<std::result::Result<UrlMetadata, MetadataError>> {
        let fetcher = self.metadata.as_ref()?;
        Some(fetcher.fetch(url).await)
    }

    // --- Administration ---

    pub async fn add_participant(&self, name: &str) -> Result<()> {
        let name = name.trim();
        mutate(&self.store, |doc| {
            if name.is_empty() {
                return Err(RosterError::EmptyName.into());
            }
            if doc.has_participant(name) {
                return Err(RosterError::AlreadyExists(name.to_string()).into());
            }
            ensure_no_claims(doc)?;

            let mut roster = roster(doc);
            roster.push(name.to_string());
            doc.names = assignment::eligible_names(&roster, &doc.forbidden);
            Ok::<_, Error>(())
        })
        .await?;

        tracing::info!("Added participant {}", name);
        Ok(())
    }

    /// Removes `name` and everything that refers to them.
    pub async fn remove_participant(&self, name: &str) -> Result<()> {
        mutate(&self.store, |doc| {
            ensure_roster_member(doc, name)?;
            ensure_no_claims(doc)?;

            doc.forbidden.remove(name);
            for blocked in doc.forbidden.values_mut() {
                blocked.retain(|n| n != name);
            }
            doc.forbidden.retain(|_, blocked| !blocked.is_empty());
            doc.passwords.remove(name);
            doc.wish_lists.remove(name);
            doc.gifts.remove(name);
            doc.wishes.remove(name);

            let roster: Vec<String> = roster(doc).into_iter().filter(|p| p != name).collect();
            doc.names = assignment::eligible_names(&roster, &doc.forbidden);
            Ok::<_, Error>(())
        })
        .await?;

        tracing::info!("Removed participant {}", name);
        Ok(())
    }

    /// Forbids `participant` from picking `name`.
    pub async fn forbid(&self, participant: &str, name: &str) -> Result<()> {
        mutate(&self.store, |doc| {
            ensure_roster_member(doc, participant)?;
            ensure_roster_member(doc, name)?;
            if participant == name {
                return Err(RosterError::SelfForbidden(participant.to_string()).into());
            }
            ensure_no_claims(doc)?;

            let blocked = doc.forbidden.entry(participant.to_string()).or_default();
            if !blocked.iter().any(|n| n == name) {
                blocked.push(name.to_string());
            }
            doc.names = assignment::eligible_names(&roster(doc), &doc.forbidden);
            Ok::<_, Error>(())
        })
        .await?;

        tracing::info!("{} may no longer pick {}", participant, name);
        Ok(())
    }

    /// Lifts a forbidden pair.
    pub async fn allow(&self, participant: &str, name: &str) -> Result<()> {
        mutate(&self.store, |doc| {
            ensure_roster_member(doc, participant)?;
            ensure_no_claims(doc)?;

            if let Some(blocked) = doc.forbidden.get_mut(participant) {
                blocked.retain(|n| n != name);
                if blocked.is_empty() {
                    doc.forbidden.remove(participant);
                }
            }
            doc.names = assignment::eligible_names(&roster(doc), &doc.forbidden);
            Ok::<_, Error>(())
        })
        .await?;

        tracing::info!("{} may pick {} again", participant, name);
        Ok(())
    }

    /// Opens name picking: recomputes choices and clears earlier picks.
    pub async fn start(&self) -> Result<ExchangeDocument> {
        let (doc, ()) = mutate(&self.store, |doc| {
            let roster = roster(doc);
            if roster.len() < 2 {
                return Err(RosterError::NotEnoughParticipants.into());
            }
            doc.names = assignment::eligible_names(&roster, &doc.forbidden);
            doc.taken.clear();
            doc.wishes = roster.iter().map(|p| (p.clone(), Vec::new())).collect();
            doc.step = Some(Step::Selection);
            Ok::<_, Error>(())
        })
        .await?;

        tracing::info!("Name picking started with {} participants", doc.names.len());
        Ok(doc)
    }

    /// Clears picks, wish lists and passwords. Participants and forbidden
    /// pairs stay.
    pub async fn reset(&self) -> Result<ExchangeDocument> {
        let (doc, ()) = mutate(&self.store, |doc| {
            let roster = roster(doc);
            doc.names = assignment::eligible_names(&roster, &doc.forbidden);
            doc.taken.clear();
            doc.passwords.clear();
            doc.wish_lists.clear();
            doc.gifts.clear();
            doc.wishes = roster.iter().map(|p| (p.clone(), Vec::new())).collect();
            doc.step = Some(Step::Setup);
            Ok::<_, Error>(())
        })
        .await?;

        tracing::info!("Exchange reset");
        Ok(doc)
    }

    pub async fn set_step(&self, step: Step) -> Result<()> {
        mutate(&self.store, |doc| {
            doc.step = Some(step);
            Ok::<_, Error>(())
        })
        .await?;

        tracing::info!("Step set to {}", step);
        Ok(())
    }
}

fn roster(doc: &ExchangeDocument) -> Vec<String> {
    doc.participants().map(str::to_string).collect()
}

fn ensure_participant(doc: &ExchangeDocument, participant: &str) -> Result<()> {
    if doc.has_participant(participant) {
        Ok(())
    } else {
        Err(Error::UnknownParticipant(participant.to_string()))
    }
}

fn ensure_roster_member(doc: &ExchangeDocument, name: &str) -> Result<()> {
    if doc.has_participant(name) {
        Ok(())
    } else {
        Err(RosterError::UnknownParticipant(name.to_string()).into())
    }
}

fn ensure_no_claims(doc: &ExchangeDocument) -> Result<()> {
    if doc.taken.is_empty() {
        Ok(())
    } else {
        Err(RosterError::ClaimsExist.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignment::ClaimError;
    use crate::models::Priority;
    use crate::store::MemoryDocumentStore;
    use crate::wishlist::WishError;

    async fn exchange_with(names: &[&str]) -> GiftExchange<MemoryDocumentStore> {
        let exchange = GiftExchange::new(MemoryDocumentStore::default());
        for name in names {
            exchange.add_participant(name).await.unwrap();
        }
        exchange.start().await.unwrap();
        exchange
    }

    #[tokio::test]
    async fn test_login_unknown_participant() {
        let exchange = exchange_with(&["Alice", "Bob"]).await;
        assert!(matches!(
            exchange.login("Mallory", None).await,
            Err(Error::UnknownParticipant(_))
        ));
    }

    #[tokio::test]
    async fn test_first_login_sets_password() {
        let exchange = exchange_with(&["Alice", "Bob"]).await;

        let login = exchange.login("Alice", Some("hunter2")).await.unwrap();
        assert_eq!(login.next_step, Step::Selection);
        let digest = login.password_digest.clone().unwrap();
        assert!(digest.starts_with("sha256$"));

        let doc = exchange.document().await.unwrap();
        assert_eq!(doc.passwords.get("Alice"), Some(&digest));

        assert!(matches!(
            exchange.login("Alice", Some("wrong")).await,
            Err(Error::IncorrectPassword)
        ));
        assert!(matches!(
            exchange.login("Alice", None).await,
            Err(Error::IncorrectPassword)
        ));
        let again = exchange.login("Alice", Some("hunter2")).await.unwrap();
        assert_eq!(again.password_digest, Some(digest));
    }

    #[tokio::test]
    async fn test_login_without_password_stores_nothing() {
        let exchange = exchange_with(&["Alice", "Bob"]).await;

        let login = exchange.login("Bob", Some("")).await.unwrap();
        assert_eq!(login.password_digest, None);
        assert!(exchange.document().await.unwrap().passwords.is_empty());
    }

    #[tokio::test]
    async fn test_login_with_legacy_digest() {
        let mut doc = ExchangeDocument::default();
        doc.names.insert("Alice".into(), vec!["Bob".into()]);
        doc.names.insert("Bob".into(), vec!["Alice".into()]);
        doc.passwords
            .insert("Alice".into(), hasher::hash_default("snow"));
        doc.taken.insert("Bob".into(), "Alice".into());
        let exchange = GiftExchange::new(MemoryDocumentStore::new(doc));

        let login = exchange.login("Alice", Some("snow")).await.unwrap();
        assert_eq!(login.recipient.as_deref(), Some("Bob"));
        assert_eq!(login.next_step, Step::Wishes);
    }

    #[tokio::test]
    async fn test_restore_session() {
        let exchange = exchange_with(&["Alice", "Bob"]).await;
        let login = exchange.login("Alice", Some("pw")).await.unwrap();

        let restored = exchange.restore(&login.session()).await.unwrap();
        assert_eq!(restored, Some(login.clone()));

        let stale = Session::new("Alice", Some("sha256$00$00".into()));
        assert_eq!(exchange.restore(&stale).await.unwrap(), None);

        let no_password = Session::new("Alice", None);
        assert_eq!(exchange.restore(&no_password).await.unwrap(), None);

        let bob = Session::new("Bob", None);
        assert!(exchange.restore(&bob).await.unwrap().is_some());

        let gone = Session::new("Mallory", None);
        assert_eq!(exchange.restore(&gone).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_pick_box_claims_hidden_name() {
        let exchange = exchange_with(&["A", "B", "C"]).await;

        let boxes = exchange.boxes("A").await.unwrap();
        assert_eq!(boxes.len(), 2);

        let name = exchange.pick_box("A", boxes[0].number).await.unwrap();
        assert_eq!(name, boxes[0].hidden_name);
        assert_eq!(exchange.recipient("A").await.unwrap(), Some(name.clone()));

        // The same name can't be claimed again.
        let other = if name == "B" { "C" } else { "B" };
        let err = exchange.claim(other, &name).await;
        assert!(matches!(err, Err(Error::Claim(ClaimError::AlreadyClaimed { .. }))));

        let after = exchange.boxes("A").await.unwrap();
        assert!(after[0].taken);

        assert!(matches!(
            exchange.pick_box("B", 99).await,
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_wish_operations() {
        let exchange = exchange_with(&["Alice", "Bob", "Carol"]).await;

        let mut draft = WishDraft::new("Scarf");
        draft.priority = Priority::High;
        let scarf = exchange.add_wish("Alice", draft).await.unwrap();
        let book = exchange
            .add_wish("Alice", WishDraft::new("Book"))
            .await
            .unwrap();
        exchange
            .add_wish("Bob", WishDraft::new("Mug"))
            .await
            .unwrap();

        let list = exchange.wish_list("Alice").await.unwrap();
        assert_eq!(list, vec![scarf.clone(), book.clone()]);

        let bought = exchange
            .toggle_purchased("Alice", &scarf.id, "Bob")
            .await
            .unwrap();
        assert_eq!(bought.purchased_by(), Some("Bob"));

        let patch = WishPatch {
            priority: Some(Priority::Low),
            ..Default::default()
        };
        let edited = exchange.update_wish("Alice", &book.id, patch).await.unwrap();
        assert_eq!(edited.priority, Priority::Low);
        assert_eq!(edited.created_at, book.created_at);

        exchange.remove_wish("Alice", &book.id).await.unwrap();

        let others = exchange.all_wish_lists("Carol").await.unwrap();
        assert_eq!(others.keys().collect::<Vec<_>>(), ["Alice", "Bob"]);
        assert_eq!(others["Alice"].len(), 1);
        assert!(others["Alice"][0].is_purchased());
        assert_eq!(others["Bob"][0].description, "Mug");
    }

    #[tokio::test]
    async fn test_invalid_wish_is_not_written() {
        let exchange = exchange_with(&["Alice", "Bob"]).await;
        let before = exchange.document().await.unwrap();

        let mut draft = WishDraft::new("Lamp");
        draft.url = Some("lamp shop".into());
        assert!(matches!(
            exchange.add_wish("Alice", draft).await,
            Err(Error::Wish(WishError::InvalidUrl(_)))
        ));
        assert!(matches!(
            exchange.toggle_purchased("Alice", "x", "Mallory").await,
            Err(Error::UnknownParticipant(_))
        ));
        assert_eq!(exchange.document().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_roster_administration() {
        let exchange = GiftExchange::new(MemoryDocumentStore::default());
        exchange.add_participant(" Alice ").await.unwrap();

        assert!(matches!(
            exchange.start().await,
            Err(Error::Roster(RosterError::NotEnoughParticipants))
        ));
        assert!(matches!(
            exchange.add_participant("Alice").await,
            Err(Error::Roster(RosterError::AlreadyExists(_)))
        ));
        assert!(matches!(
            exchange.add_participant("  ").await,
            Err(Error::Roster(RosterError::EmptyName))
        ));

        exchange.add_participant("Bob").await.unwrap();
        exchange.add_participant("Carol").await.unwrap();
        exchange.forbid("Alice", "Bob").await.unwrap();
        assert!(matches!(
            exchange.forbid("Alice", "Alice").await,
            Err(Error::Roster(RosterError::SelfForbidden(_)))
        ));

        let doc = exchange.start().await.unwrap();
        assert_eq!(doc.step, Some(Step::Selection));
        assert_eq!(doc.eligible_for("Alice"), ["Carol"]);
        assert_eq!(doc.eligible_for("Bob"), ["Alice", "Carol"]);
        assert!(doc.wishes.values().all(Vec::is_empty));
        assert_eq!(doc.wishes.len(), 3);

        exchange.allow("Alice", "Bob").await.unwrap();
        let doc = exchange.document().await.unwrap();
        assert_eq!(doc.eligible_for("Alice"), ["Bob", "Carol"]);
        assert!(doc.forbidden.is_empty());

        exchange.claim("Alice", "Bob").await.unwrap();
        assert!(matches!(
            exchange.add_participant("Dave").await,
            Err(Error::Roster(RosterError::ClaimsExist))
        ));
    }

    #[tokio::test]
    async fn test_remove_participant_cleans_references() {
        let exchange = exchange_with(&["Alice", "Bob", "Carol"]).await;
        exchange.forbid("Alice", "Carol").await.unwrap();
        exchange.login("Carol", Some("pw")).await.unwrap();
        exchange
            .add_wish("Carol", WishDraft::new("Socks"))
            .await
            .unwrap();

        exchange.remove_participant("Carol").await.unwrap();

        let doc = exchange.document().await.unwrap();
        assert!(!doc.has_participant("Carol"));
        assert!(doc.forbidden.is_empty());
        assert!(doc.passwords.is_empty());
        assert!(doc.wish_lists.get("Carol").is_none());
        assert_eq!(doc.eligible_for("Alice"), ["Bob"]);
    }

    #[tokio::test]
    async fn test_reset_keeps_roster_and_forbidden_pairs() {
        let exchange = exchange_with(&["A", "B", "C"]).await;
        exchange.forbid("A", "B").await.unwrap();
        exchange.start().await.unwrap();
        exchange.login("A", Some("pw")).await.unwrap();
        exchange.claim("A", "C").await.unwrap();
        exchange.add_wish("A", WishDraft::new("Tea")).await.unwrap();

        let doc = exchange.reset().await.unwrap();
        assert_eq!(doc.step, Some(Step::Setup));
        assert!(doc.taken.is_empty());
        assert!(doc.passwords.is_empty());
        assert!(doc.wish_lists.is_empty());
        assert_eq!(doc.forbidden_for("A"), ["B"]);
        assert_eq!(doc.participants().collect::<Vec<_>>(), ["A", "B", "C"]);
        assert_eq!(doc.eligible_for("A"), ["C"]);
    }

    #[tokio::test]
    async fn test_set_step() {
        let exchange = exchange_with(&["A", "B"]).await;
        exchange.set_step(Step::AllWishes).await.unwrap();
        assert_eq!(
            exchange.document().await.unwrap().step,
            Some(Step::AllWishes)
        );
    }

    fn tally(results: Vec<Result<()>>) -> (usize, usize) {
        let mut won = 0;
        let mut already = 0;
        for result in results {
            match result {
                Ok(()) => won += 1,
                Err(Error::Claim(ClaimError::AlreadyClaimed { .. })) => already += 1,
                Err(e) => panic!("unexpected claim error: {}", e),
            }
        }
        (won, already)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_claims_on_shared_store() {
        let exchange = std::sync::Arc::new(exchange_with(&["P0", "P1", "P2", "P3", "P4"]).await);

        let handles: Vec<_> = ["P1", "P2", "P3", "P4"]
            .into_iter()
            .map(|participant| {
                let exchange = exchange.clone();
                tokio::spawn(async move { exchange.claim(participant, "P0").await })
            })
            .collect();

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }
        assert_eq!(tally(results), (1, 3));

        let doc = exchange.document().await.unwrap();
        assert_eq!(doc.taken.len(), 1);
        let winner = doc.taken.get("P0").unwrap();
        assert!(["P1", "P2", "P3", "P4"].contains(&winner.as_str()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_claims_through_server() {
        use crate::server::{router, ApiKeys, AppState, FileDocumentStore};
        use crate::store::HttpDocumentStore;

        let temp_dir = tempfile::TempDir::new().unwrap();
        let state = AppState {
            api_keys: std::sync::Arc::new(ApiKeys::from_keys([("secret", "tests")])),
            store: std::sync::Arc::new(FileDocumentStore::new(temp_dir.path())),
        };
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });
        let url = format!("http://{}/document", addr);

        let names: Vec<String> = (0..8).map(|i| format!("P{}", i)).collect();
        let admin = GiftExchange::new(HttpDocumentStore::new(url.clone(), Some("secret")).unwrap());
        for name in &names {
            admin.add_participant(name).await.unwrap();
        }
        admin.start().await.unwrap();

        let handles: Vec<_> = names[1..]
            .iter()
            .cloned()
            .map(|participant| {
                let store = HttpDocumentStore::new(url.clone(), Some("secret")).unwrap();
                tokio::spawn(async move {
                    GiftExchange::new(store).claim(&participant, "P0").await
                })
            })
            .collect();

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }
        assert_eq!(tally(results), (1, 6));

        let doc = admin.document().await.unwrap();
        assert_eq!(doc.taken.len(), 1);
        assert!(doc.taken.contains_key("P0"));
    }
}
