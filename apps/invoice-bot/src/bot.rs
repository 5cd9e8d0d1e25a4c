//! # Message Dispatcher
//!
//! Runs one inbound message end to end.
//!
//! ## Message Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Bot::handle(user_id, inbound)                                         │
//! │       │   span "message" { user_id, message_id = uuid v4 }             │
//! │       ▼                                                                 │
//! │  sessions.get(user_id).lock()      ← same-user messages queue here     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  user_records().update(|record| machine.handle(turn, inbound))         │
//! │       │      load → phone gate → command / handler chain → save        │
//! │       │      (turn works on a copy of the cart, kept only on commit)   │
//! │       ▼                                                                 │
//! │  Reply { messages, effect }                                            │
//! │       │                                                                 │
//! │       ├── StoreLogo(bytes)  → decode → PNG → logos().save              │
//! │       │                                                                 │
//! │       └── IssueInvoice(inv) → logo? → reserve number → layout → render │
//! │                               → archive → record path → clear cart     │
//! │       ▼                                                                 │
//! │  Vec<Outbound>   (any unexpected error: generic "try later" reply)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::archive::{archive_path, write_document};
use crate::config::BotConfig;
use crate::document::render_text;
use crate::error::{BotError, BotResult};
use crate::logo::normalize_logo;
use crate::state::Sessions;
use invoice_core::conversation::{Effect, Inbound, Locale, Machine, Outbound, Reply, Turn};
use invoice_core::layout::layout_invoice;
use invoice_core::{Cart, Invoice, StateTag, UserId};
use invoice_db::Database;

/// The chat runtime: record store, live carts and the conversation machine.
pub struct Bot {
    db: Database,
    sessions: Sessions,
    machine: Machine,
    config: BotConfig,
}

impl Bot {
    pub fn new(db: Database, config: BotConfig, locale: Locale) -> Self {
        let machine = Machine::new(locale, config.fee(), config.calendar);
        Bot {
            db,
            sessions: Sessions::new(),
            machine,
            config,
        }
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Forgets carts of users silent for at least `max_idle`.
    pub fn evict_idle_sessions(&self, max_idle: Duration) -> usize {
        let evicted = self.sessions.evict_idle(max_idle);
        if evicted > 0 {
            debug!(evicted, live = self.sessions.len(), "Idle sessions evicted");
        }
        evicted
    }

    /// Number of users with a live cart.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Handles one inbound message at the current local time.
    pub async fn handle(&self, user_id: &UserId, inbound: Inbound) -> Vec<Outbound> {
        self.handle_at(user_id, inbound, Local::now().naive_local())
            .await
    }

    /// Handles one inbound message as if it arrived at `now`.
    ///
    /// Never fails: errors are logged and answered with the generic
    /// unavailable reply.
    pub async fn handle_at(
        &self,
        user_id: &UserId,
        inbound: Inbound,
        now: NaiveDateTime,
    ) -> Vec<Outbound> {
        let message_id = Uuid::new_v4();
        let span = info_span!("message", user_id = %user_id, message_id = %message_id);

        async {
            match self.process(user_id, inbound, now).await {
                Ok(messages) => messages,
                Err(err) => {
                    error!(code = ?err.code(), error = %err, "Message could not be processed");
                    self.machine.unavailable_reply().messages
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Answers a message that could not be turned into an [`Inbound`].
    ///
    /// An unreadable photo during logo upload ends the upload like a broken
    /// image does. Anything else gets the generic unavailable reply.
    pub async fn reject(&self, user_id: &UserId, err: BotError) -> Vec<Outbound> {
        let message_id = Uuid::new_v4();
        let span = info_span!("message", user_id = %user_id, message_id = %message_id);

        async {
            let cause = match err {
                BotError::Logo(cause) => cause,
                other => {
                    warn!(code = ?other.code(), error = %other, "Unusable inbound message");
                    return self.machine.unavailable_reply().messages;
                }
            };

            match self.abandon_logo_upload(user_id).await {
                Ok(true) => {
                    warn!(cause = %cause, "Logo rejected");
                    self.machine.logo_failed_reply(&cause).messages
                }
                Ok(false) => {
                    warn!(cause = %cause, "Unreadable photo outside logo upload");
                    self.machine.unavailable_reply().messages
                }
                Err(err) => {
                    error!(code = ?err.code(), error = %err, "Message could not be processed");
                    self.machine.unavailable_reply().messages
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Moves a user waiting for a logo back to the menu.
    async fn abandon_logo_upload(&self, user_id: &UserId) -> BotResult<bool> {
        let session = self.sessions.get(user_id);
        let _cart = session.lock().await;

        let abandoned = self
            .db
            .user_records()
            .update(user_id, |record| {
                let waiting = record.state == StateTag::AwaitingLogoUpload;
                if waiting {
                    record.state = StateTag::Ready;
                }
                waiting
            })
            .await?;
        Ok(abandoned)
    }

    async fn process(
        &self,
        user_id: &UserId,
        inbound: Inbound,
        now: NaiveDateTime,
    ) -> BotResult<Vec<Outbound>> {
        let session = self.sessions.get(user_id);
        let mut cart = session.lock().await;

        // The machine edits a draft; the live cart only changes once the
        // record write has committed.
        let mut draft = Cart::clone(&cart);
        let machine = &self.machine;
        let reply = self
            .db
            .user_records()
            .update(user_id, |record| {
                let mut turn = Turn {
                    user_id,
                    record,
                    cart: &mut draft,
                    now,
                };
                machine.handle(&mut turn, inbound)
            })
            .await?;
        *cart = draft;

        let Reply { mut messages, effect } = reply;
        match effect {
            None => {}
            Some(Effect::StoreLogo(bytes)) => {
                messages.extend(self.store_logo(user_id, &bytes).await?.messages);
            }
            Some(Effect::IssueInvoice(invoice)) => {
                messages.extend(self.issue_invoice(user_id, &mut *cart, *invoice).await?);
            }
        }
        Ok(messages)
    }

    async fn store_logo(&self, user_id: &UserId, bytes: &[u8]) -> BotResult<Reply> {
        match normalize_logo(bytes) {
            Ok(png) => {
                self.db.logos().save(user_id, &png).await?;
                Ok(self.machine.logo_saved_reply())
            }
            Err(BotError::Logo(cause)) => {
                warn!(user_id = %user_id, cause = %cause, "Logo rejected");
                Ok(self.machine.logo_failed_reply(&cause))
            }
            Err(err) => Err(err),
        }
    }

    async fn issue_invoice(
        &self,
        user_id: &UserId,
        cart: &mut Cart,
        invoice: Invoice,
    ) -> BotResult<Vec<Outbound>> {
        let has_logo = self.db.logos().exists(user_id).await?;

        let registry = self.db.invoices();
        let number = registry.reserve_number(&invoice).await?;
        let invoice = invoice.with_number(number);

        let layout = &self.config.layout;
        let instructions = layout_invoice(&invoice, has_logo, layout, &self.machine.locale().labels);
        let document = render_text(&instructions, layout.page_height, layout.line_height);

        let path = archive_path(
            &self.config.output_dir,
            user_id,
            &invoice.number,
            &invoice.customer.name,
        );
        if let Err(err) = write_document(&path, &document.text).await {
            if let Err(release_err) = registry.release(user_id, &invoice.number).await {
                warn!(error = %release_err, number = %invoice.number, "Could not release invoice number");
            }
            return Err(err);
        }

        let path = path.to_string_lossy().into_owned();
        if let Err(err) = registry.set_document_path(user_id, &invoice.number, &path).await {
            warn!(error = %err, number = %invoice.number, "Document path not recorded");
        }

        cart.clear();
        info!(
            user_id = %user_id,
            number = %invoice.number,
            pages = document.pages,
            grand_total = invoice.grand_total.minor(),
            "Invoice issued"
        );

        Ok(vec![
            Outbound::Document {
                path,
                caption: self.machine.invoice_caption(&invoice),
            },
            Outbound::with_keyboard(
                self.machine.prompts().choose.clone(),
                self.machine.main_menu(),
            ),
        ])
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use image::{ImageBuffer, ImageFormat, Rgb};
    use invoice_db::DbConfig;
    use std::io::Cursor;
    use std::sync::Arc;

    struct Fixture {
        bot: Arc<Bot>,
        out: tempfile::TempDir,
        user: UserId,
    }

    async fn fixture() -> Fixture {
        let out = tempfile::tempdir().unwrap();
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let config = BotConfig {
            output_dir: out.path().to_path_buf(),
            ..BotConfig::default()
        };
        Fixture {
            bot: Arc::new(Bot::new(db, config, Locale::default())),
            out,
            user: UserId::from("501"),
        }
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 6, 3)
            .unwrap()
            .and_hms_opt(9, 41, 0)
            .unwrap()
    }

    impl Fixture {
        async fn send(&self, inbound: Inbound) -> Vec<Outbound> {
            self.bot.handle_at(&self.user, inbound, now()).await
        }

        async fn text(&self, text: &str) -> Vec<Outbound> {
            self.send(Inbound::Text(text.to_string())).await
        }

        async fn state(&self) -> StateTag {
            self.bot.db().user_records().load(&self.user).await.unwrap().state
        }

        /// Onboards the user and prepares one product and one customer.
        async fn onboard(&self) {
            self.send(Inbound::Contact {
                phone_number: "+989121234567".to_string(),
            })
            .await;
            self.text("Store: Tehran Pumps - Seller: Sara").await;
            self.text("add product").await;
            self.text("Widget-10").await;
            self.text("add customer").await;
            self.text("Reza - 0912 - Tehran - 12").await;
        }

        async fn fill_cart(&self) {
            self.text("add item").await;
            self.text("Widget - 10 (ID: 501-1)").await;
            self.text("Q2").await;
            self.text("select customer").await;
            self.text("Reza").await;
        }
    }

    fn texts(messages: &[Outbound]) -> Vec<String> {
        messages
            .iter()
            .filter_map(|m| match m {
                Outbound::Text { text, .. } => Some(text.clone()),
                Outbound::Document { .. } => None,
            })
            .collect()
    }

    fn png() -> Vec<u8> {
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_pixel(2, 2, Rgb([1, 2, 3]));
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), ImageFormat::Png).unwrap();
        out
    }

    #[tokio::test]
    async fn test_start_without_phone_requests_contact() {
        let f = fixture().await;

        let out = f.send(Inbound::Start).await;

        match &out[0] {
            Outbound::Text {
                keyboard: Some(keyboard),
                ..
            } => {
                assert!(keyboard.one_time);
                assert!(keyboard.rows[0][0].request_contact);
            }
            other => panic!("unexpected reply {other:?}"),
        }
        // Reads never create records.
        assert_eq!(f.bot.db().user_records().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_full_invoice_flow() {
        let f = fixture().await;
        f.onboard().await;
        f.fill_cart().await;

        let out = f.text("issue invoice").await;

        let Outbound::Document { path, caption } = &out[0] else {
            panic!("expected a document, got {out:?}");
        };
        assert!(path.ends_with("501/230603094112_Reza.txt"));
        assert_eq!(caption, "Invoice 230603094112 issued. Total: 2,006,000");

        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.contains("1,672,000"));
        assert!(text.contains("334,000"));
        assert!(text.contains("2,006,000 Rials"));
        assert!(text.contains("Store: Tehran Pumps"));
        assert!(text.contains("Date: 1402/03/13"));

        // Cart cleared after the document was written.
        let again = f.text("issue invoice").await;
        assert_eq!(texts(&again), vec![f.bot.machine().prompts().empty_cart.clone()]);

        let issued = f.bot.db().invoices().list_for_user(&f.user).await.unwrap();
        assert_eq!(issued.len(), 1);
        assert_eq!(issued[0].document_path.as_deref(), Some(path.as_str()));
        assert_eq!(f.state().await, StateTag::Ready);
    }

    #[tokio::test]
    async fn test_second_invoice_same_minute_gets_suffix() {
        let f = fixture().await;
        f.onboard().await;

        f.fill_cart().await;
        f.text("issue invoice").await;
        f.fill_cart().await;
        let out = f.text("issue invoice").await;

        let Outbound::Document { path, .. } = &out[0] else {
            panic!("expected a document, got {out:?}");
        };
        assert!(path.ends_with("230603094112-2_Reza.txt"));
    }

    #[tokio::test]
    async fn test_invoice_without_customer_keeps_cart() {
        let f = fixture().await;
        f.onboard().await;
        f.text("add item").await;
        f.text("Widget - 10 (ID: 501-1)").await;
        f.text("Q2").await;

        let out = f.text("issue invoice").await;
        assert_eq!(
            texts(&out),
            vec![f.bot.machine().prompts().no_customer_selected.clone()]
        );

        // Selecting a customer afterwards still finds the line in the cart.
        f.text("select customer").await;
        f.text("Reza").await;
        let out = f.text("issue invoice").await;
        assert!(matches!(out[0], Outbound::Document { .. }));
    }

    #[tokio::test]
    async fn test_logo_upload_stores_png() {
        let f = fixture().await;
        f.onboard().await;

        f.text("upload logo").await;
        assert_eq!(f.state().await, StateTag::AwaitingLogoUpload);

        let out = f.send(Inbound::Photo(png())).await;

        assert_eq!(texts(&out), vec![f.bot.machine().prompts().logo_saved.clone()]);
        assert_eq!(f.state().await, StateTag::Ready);
        let stored = f.bot.db().logos().get(&f.user).await.unwrap().unwrap();
        assert_eq!(&stored[..4], &[0x89, b'P', b'N', b'G']);
    }

    #[tokio::test]
    async fn test_broken_logo_reports_cause_and_returns_to_ready() {
        let f = fixture().await;
        f.onboard().await;
        f.text("upload logo").await;

        let out = f.send(Inbound::Photo(b"not an image".to_vec())).await;

        let text = &texts(&out)[0];
        assert!(text.starts_with("The logo could not be processed: "));
        assert_eq!(f.state().await, StateTag::Ready);
        assert!(!f.bot.db().logos().exists(&f.user).await.unwrap());
    }

    #[tokio::test]
    async fn test_logo_appears_in_document() {
        let f = fixture().await;
        f.onboard().await;
        f.text("upload logo").await;
        f.send(Inbound::Photo(png())).await;
        f.fill_cart().await;

        let out = f.text("issue invoice").await;

        let Outbound::Document { path, .. } = &out[0] else {
            panic!("expected a document, got {out:?}");
        };
        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.lines().next().unwrap().contains("[ LOGO ]"));
    }

    #[tokio::test]
    async fn test_unwritable_archive_releases_number_and_keeps_cart() {
        let f = fixture().await;
        f.onboard().await;
        f.fill_cart().await;

        // A file where the user directory should go.
        std::fs::write(f.out.path().join("501"), "blocker").unwrap();

        let out = f.text("issue invoice").await;
        assert_eq!(texts(&out), vec![f.bot.machine().prompts().unavailable.clone()]);
        assert!(f.bot.db().invoices().list_for_user(&f.user).await.unwrap().is_empty());

        std::fs::remove_file(f.out.path().join("501")).unwrap();
        let out = f.text("issue invoice").await;
        assert!(matches!(out[0], Outbound::Document { .. }));
    }

    #[tokio::test]
    async fn test_corrupt_record_gets_unavailable_reply() {
        let f = fixture().await;
        f.onboard().await;
        sqlx::query("UPDATE user_records SET record = '{\"state\": \"shopping\"}'")
            .execute(f.bot.db().pool())
            .await
            .unwrap();

        let out = f.text("add item").await;

        assert_eq!(texts(&out), vec![f.bot.machine().prompts().unavailable.clone()]);
    }

    #[tokio::test]
    async fn test_failed_record_write_leaves_cart_untouched() {
        let f = fixture().await;
        f.onboard().await;
        f.text("add item").await;
        f.text("Widget - 10 (ID: 501-1)").await;
        assert_eq!(f.state().await, StateTag::AwaitingQuantity);

        sqlx::query(
            "CREATE TRIGGER reject_writes BEFORE UPDATE ON user_records \
             BEGIN SELECT RAISE(ABORT, 'read only'); END",
        )
        .execute(f.bot.db().pool())
        .await
        .unwrap();

        let out = f.text("Q2").await;
        assert_eq!(texts(&out), vec![f.bot.machine().prompts().unavailable.clone()]);
        assert_eq!(f.state().await, StateTag::AwaitingQuantity);

        sqlx::query("DROP TRIGGER reject_writes")
            .execute(f.bot.db().pool())
            .await
            .unwrap();

        // The retry adds the line once, not twice.
        f.text("Q2").await;
        assert_eq!(f.state().await, StateTag::Ready);
        f.text("select customer").await;
        f.text("Reza").await;
        let out = f.text("issue invoice").await;
        let Outbound::Document { caption, .. } = &out[0] else {
            panic!("expected a document, got {out:?}");
        };
        assert_eq!(caption, "Invoice 230603094112 issued. Total: 2,006,000");
    }

    #[tokio::test]
    async fn test_unreadable_photo_ends_logo_upload() {
        let f = fixture().await;
        f.onboard().await;
        f.text("upload logo").await;

        let out = f
            .bot
            .reject(&f.user, BotError::Logo("could not read photo".to_string()))
            .await;

        assert_eq!(
            texts(&out),
            vec!["The logo could not be processed: could not read photo".to_string()]
        );
        assert_eq!(f.state().await, StateTag::Ready);
    }

    #[tokio::test]
    async fn test_rejected_message_outside_upload_gets_unavailable_reply() {
        let f = fixture().await;
        f.onboard().await;

        let photo = f
            .bot
            .reject(&f.user, BotError::Logo("could not read photo".to_string()))
            .await;
        let empty = f
            .bot
            .reject(&f.user, BotError::Transport("empty message".to_string()))
            .await;

        let unavailable = vec![f.bot.machine().prompts().unavailable.clone()];
        assert_eq!(texts(&photo), unavailable);
        assert_eq!(texts(&empty), unavailable);
        assert_eq!(f.state().await, StateTag::Ready);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_users_do_not_interfere() {
        let f = fixture().await;

        let mut tasks = Vec::new();
        for i in 0..8 {
            let bot = f.bot.clone();
            tasks.push(tokio::spawn(async move {
                let user = UserId::from(1000 + i as i64);
                bot.handle_at(
                    &user,
                    Inbound::Contact {
                        phone_number: format!("0912{i}"),
                    },
                    now(),
                )
                .await;
                bot.handle_at(&user, Inbound::Text(format!("Store: S{i} - Seller: P{i}")), now())
                    .await;
                bot.handle_at(&user, Inbound::Text("add product".into()), now())
                    .await;
                bot.handle_at(&user, Inbound::Text(format!("Item{i}-{i}")), now())
                    .await;
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        for i in 0..8 {
            let record = f
                .bot
                .db()
                .user_records()
                .load(&UserId::from(1000 + i as i64))
                .await
                .unwrap();
            assert_eq!(record.store_name.as_deref(), Some(format!("S{i}").as_str()));
            assert_eq!(record.products.len(), 1);
            assert_eq!(record.state, StateTag::Ready);
        }
    }
}
