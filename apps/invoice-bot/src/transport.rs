//! # Line Transport
//!
//! Chat messages as JSON lines: inbound on stdin, outbound on stdout.
//!
//! ## Wire Format
//! ```text
//! in   {"user_id": 501, "start": true}
//!      {"user_id": 501, "text": "Add Item"}
//!      {"user_id": 501, "contact": "09121234567"}
//!      {"user_id": 501, "photo_path": "/tmp/upload/logo.jpg"}
//!
//! out  {"user_id": "501", "type": "text", "text": "...", "keyboard": {...}}
//!      {"user_id": "501", "type": "document", "path": "...", "caption": "..."}
//! ```
//!
//! ## Dispatch
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  reader ──► parse line ──► worker for user_id (spawned on first use)    │
//! │                               │   mpsc, one message at a time          │
//! │                               ▼                                         │
//! │                          Bot::handle ──► outbound lines                 │
//! │                                               │   mpsc                  │
//! │                                               ▼                         │
//! │                                          writer task ──► stdout         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Messages of one user are answered in arrival order; different users run
//! concurrently. A line that cannot be parsed is logged and skipped. A line
//! that parses but cannot become a message (no fields, unreadable photo) is
//! answered through [`Bot::reject`].
//!
//! The reader never waits on a single user: when that user's queue is full
//! the message is dropped and answered with the unavailable reply. Workers
//! and carts of silent users are swept on a timer ([`ServeOptions`]).

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::bot::Bot;
use crate::error::{BotError, BotResult};
use invoice_core::conversation::{Inbound, Outbound};
use invoice_core::UserId;

/// Pending messages per user before the reader waits.
const USER_QUEUE_DEPTH: usize = 32;

/// Outbound lines buffered ahead of the writer.
const OUTPUT_QUEUE_DEPTH: usize = 256;

// =============================================================================
// Wire Types
// =============================================================================

/// A user id as sent by the chat platform: a number or a string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum WireUserId {
    Number(i64),
    Text(String),
}

impl From<WireUserId> for UserId {
    fn from(id: WireUserId) -> Self {
        match id {
            WireUserId::Number(n) => UserId::from(n),
            WireUserId::Text(s) => UserId::new(s),
        }
    }
}

/// One inbound JSON line.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundLine {
    user_id: WireUserId,
    #[serde(default)]
    pub text: Option<String>,
    /// Phone number from a shared contact card.
    #[serde(default)]
    pub contact: Option<String>,
    /// Local file holding the downloaded photo.
    #[serde(default)]
    pub photo_path: Option<PathBuf>,
    #[serde(default)]
    pub start: bool,
}

impl InboundLine {
    pub fn parse(line: &str) -> BotResult<Self> {
        Ok(serde_json::from_str(line)?)
    }

    pub fn user_id(&self) -> UserId {
        self.user_id.clone().into()
    }

    /// Converts the line into a machine input.
    ///
    /// When several fields are present the first of start, contact, photo
    /// and text wins. Photo bytes are read from `photo_path`.
    pub async fn into_inbound(self) -> BotResult<Inbound> {
        if self.start {
            return Ok(Inbound::Start);
        }
        if let Some(phone_number) = self.contact {
            return Ok(Inbound::Contact { phone_number });
        }
        if let Some(path) = self.photo_path {
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|e| BotError::Logo(format!("could not read photo: {e}")))?;
            return Ok(Inbound::Photo(bytes));
        }
        match self.text {
            Some(text) if text.trim() == "/start" => Ok(Inbound::Start),
            Some(text) => Ok(Inbound::Text(text)),
            None => Err(BotError::Transport(
                "expected one of start, contact, photo_path, text".to_string(),
            )),
        }
    }
}

/// One outbound JSON line.
#[derive(Debug, Serialize)]
pub struct OutboundLine<'a> {
    pub user_id: &'a str,
    #[serde(flatten)]
    pub message: &'a Outbound,
}

impl OutboundLine<'_> {
    pub fn to_json(&self) -> BotResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

// =============================================================================
// Serve Loop
// =============================================================================

/// Idle handling for [`serve_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServeOptions {
    /// A user worker with an empty queue is stopped after this long without
    /// a message. The next message starts a new one.
    pub worker_idle: Duration,
    /// Carts untouched this long are dropped.
    pub session_idle: Duration,
    /// How often the sweep runs.
    pub sweep_every: Duration,
}

impl Default for ServeOptions {
    fn default() -> Self {
        ServeOptions {
            worker_idle: Duration::from_secs(5 * 60),
            session_idle: Duration::from_secs(60 * 60),
            sweep_every: Duration::from_secs(60),
        }
    }
}

/// Reads inbound lines until EOF and writes every reply.
///
/// Returns once all queued messages are answered and flushed.
pub async fn serve<R, W>(bot: Arc<Bot>, reader: R, writer: W) -> BotResult<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    serve_with(bot, reader, writer, ServeOptions::default()).await
}

/// [`serve`] with explicit idle handling.
pub async fn serve_with<R, W>(
    bot: Arc<Bot>,
    reader: R,
    writer: W,
    options: ServeOptions,
) -> BotResult<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (out_tx, out_rx) = mpsc::channel::<String>(OUTPUT_QUEUE_DEPTH);
    let writer_task = tokio::spawn(write_lines(writer, out_rx));

    let mut dispatcher = Dispatcher::new(bot, out_tx, options);
    let mut lines = reader.lines();
    let mut sweep = tokio::time::interval(options.sweep_every);
    sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut received = 0usize;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                match InboundLine::parse(line) {
                    Ok(inbound) => {
                        received += 1;
                        dispatcher.dispatch(inbound);
                    }
                    Err(e) => warn!(error = %e, "Skipping malformed line"),
                }
            }
            _ = sweep.tick() => dispatcher.sweep(),
        }
    }

    info!(
        messages = received,
        users = dispatcher.workers.len(),
        "Input closed, draining"
    );
    dispatcher.shutdown().await;

    match writer_task.await {
        Ok(result) => result.map_err(BotError::from),
        Err(e) => Err(BotError::Transport(format!("writer task failed: {e}"))),
    }
}

struct Worker {
    tx: mpsc::Sender<InboundLine>,
    handle: JoinHandle<()>,
    last_seen: Instant,
}

/// Routes parsed lines to per-user workers.
struct Dispatcher {
    bot: Arc<Bot>,
    out: mpsc::Sender<String>,
    options: ServeOptions,
    workers: HashMap<UserId, Worker>,
    /// Stopped workers that may still be finishing their last message.
    retired: HashMap<UserId, JoinHandle<()>>,
}

impl Dispatcher {
    fn new(bot: Arc<Bot>, out: mpsc::Sender<String>, options: ServeOptions) -> Self {
        Dispatcher {
            bot,
            out,
            options,
            workers: HashMap::new(),
            retired: HashMap::new(),
        }
    }

    fn dispatch(&mut self, inbound: InboundLine) {
        let user_id = inbound.user_id();
        if !self.workers.contains_key(&user_id) {
            let worker = self.spawn(&user_id);
            self.workers.insert(user_id.clone(), worker);
        }
        let Some(worker) = self.workers.get_mut(&user_id) else {
            return;
        };
        worker.last_seen = Instant::now();

        match worker.tx.try_send(inbound) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(%user_id, depth = USER_QUEUE_DEPTH, "User queue full; dropping message");
                self.answer_busy(&user_id);
            }
            Err(TrySendError::Closed(inbound)) => {
                warn!(%user_id, "User worker stopped; restarting");
                let worker = self.spawn(&user_id);
                if worker.tx.try_send(inbound).is_err() {
                    warn!(%user_id, "Restarted worker refused message");
                }
                if let Some(old) = self.workers.insert(user_id.clone(), worker) {
                    self.retired.insert(user_id, old.handle);
                }
            }
        }
    }

    /// Starts a worker for `user_id`. It waits for the user's previous
    /// worker, if any, so replies stay in order.
    fn spawn(&mut self, user_id: &UserId) -> Worker {
        debug!(%user_id, "Starting user worker");
        let previous = self.retired.remove(user_id);
        let (tx, rx) = mpsc::channel(USER_QUEUE_DEPTH);
        let handle = tokio::spawn(user_worker(
            self.bot.clone(),
            user_id.clone(),
            previous,
            rx,
            self.out.clone(),
        ));
        Worker {
            tx,
            handle,
            last_seen: Instant::now(),
        }
    }

    /// Tells the user their message was dropped, without waiting on the
    /// writer.
    fn answer_busy(&self, user_id: &UserId) {
        for message in self.bot.machine().unavailable_reply().messages {
            let Some(json) = encode(user_id, &message) else {
                continue;
            };
            if self.out.try_send(json).is_err() {
                warn!(%user_id, "Output queue full; busy reply dropped");
                return;
            }
        }
    }

    /// Stops idle workers and drops idle carts.
    fn sweep(&mut self) {
        let now = Instant::now();
        let idle: Vec<UserId> = self
            .workers
            .iter()
            .filter(|(_, w)| {
                now.duration_since(w.last_seen) >= self.options.worker_idle
                    && w.tx.capacity() == w.tx.max_capacity()
            })
            .map(|(user_id, _)| user_id.clone())
            .collect();

        for user_id in idle {
            if let Some(worker) = self.workers.remove(&user_id) {
                // Closing the queue ends the worker after its current message.
                drop(worker.tx);
                self.retired.insert(user_id, worker.handle);
            }
        }
        self.retired.retain(|_, handle| !handle.is_finished());

        let evicted = self.bot.evict_idle_sessions(self.options.session_idle);
        debug!(
            workers = self.workers.len(),
            retiring = self.retired.len(),
            evicted,
            "Idle sweep"
        );
    }

    async fn shutdown(self) {
        let Dispatcher {
            out,
            workers,
            retired,
            ..
        } = self;

        let handles = workers
            .into_iter()
            .map(|(user_id, worker)| (user_id, worker.handle))
            .chain(retired);
        for (user_id, handle) in handles {
            if let Err(e) = handle.await {
                warn!(%user_id, error = %e, "User worker panicked");
            }
        }
        drop(out);
    }
}

fn encode(user_id: &UserId, message: &Outbound) -> Option<String> {
    let line = OutboundLine {
        user_id: user_id.as_str(),
        message,
    };
    match line.to_json() {
        Ok(json) => Some(json),
        Err(e) => {
            warn!(%user_id, error = %e, "Could not encode reply");
            None
        }
    }
}

/// Answers one user's messages in order.
async fn user_worker(
    bot: Arc<Bot>,
    user_id: UserId,
    previous: Option<JoinHandle<()>>,
    mut rx: mpsc::Receiver<InboundLine>,
    out: mpsc::Sender<String>,
) {
    if let Some(previous) = previous {
        if let Err(e) = previous.await {
            warn!(%user_id, error = %e, "User worker panicked");
        }
    }

    while let Some(line) = rx.recv().await {
        let messages = match line.into_inbound().await {
            Ok(inbound) => bot.handle(&user_id, inbound).await,
            Err(e) => bot.reject(&user_id, e).await,
        };

        for message in messages {
            let Some(json) = encode(&user_id, &message) else {
                continue;
            };
            if out.send(json).await.is_err() {
                debug!(%user_id, "Output closed");
                return;
            }
        }
    }
}

async fn write_lines<W>(mut writer: W, mut rx: mpsc::Receiver<String>) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = rx.recv().await {
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    writer.shutdown().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BotConfig;
    use invoice_core::conversation::Locale;
    use invoice_db::{Database, DbConfig};
    use serde_json::Value;

    async fn bot(out: &std::path::Path) -> Arc<Bot> {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let config = BotConfig {
            output_dir: out.to_path_buf(),
            ..BotConfig::default()
        };
        Arc::new(Bot::new(db, config, Locale::default()))
    }

    async fn run(bot: Arc<Bot>, input: &str) -> Vec<Value> {
        let (client, server) = tokio::io::duplex(64 * 1024);
        let reader = tokio::io::BufReader::new(input.as_bytes());

        let collect = tokio::spawn(async move {
            let mut client = client;
            let mut buf = Vec::new();
            tokio::io::AsyncReadExt::read_to_end(&mut client, &mut buf)
                .await
                .unwrap();
            buf
        });
        serve(bot, reader, server).await.unwrap();
        let output = collect.await.unwrap();

        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_user_id_number_or_string() {
        let a = InboundLine::parse(r#"{"user_id": 501, "text": "hi"}"#).unwrap();
        let b = InboundLine::parse(r#"{"user_id": "501", "text": "hi"}"#).unwrap();

        assert_eq!(a.user_id(), UserId::from("501"));
        assert_eq!(a.user_id(), b.user_id());
    }

    #[test]
    fn test_missing_user_id_rejected() {
        let err = InboundLine::parse(r#"{"text": "hi"}"#).unwrap_err();
        assert!(matches!(err, BotError::Transport(_)));
    }

    #[tokio::test]
    async fn test_inbound_precedence() {
        let both = InboundLine::parse(r#"{"user_id": 1, "contact": "0912", "text": "hi"}"#).unwrap();
        assert_eq!(
            both.into_inbound().await.unwrap(),
            Inbound::Contact {
                phone_number: "0912".to_string()
            }
        );

        let start = InboundLine::parse(r#"{"user_id": 1, "start": true, "contact": "0912"}"#).unwrap();
        assert_eq!(start.into_inbound().await.unwrap(), Inbound::Start);

        let command = InboundLine::parse(r#"{"user_id": 1, "text": "/start"}"#).unwrap();
        assert_eq!(command.into_inbound().await.unwrap(), Inbound::Start);

        let empty = InboundLine::parse(r#"{"user_id": 1}"#).unwrap();
        assert!(empty.into_inbound().await.is_err());
    }

    #[tokio::test]
    async fn test_photo_read_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"\x89PNG").unwrap();
        let json = serde_json::json!({ "user_id": 1, "photo_path": file.path() }).to_string();

        let inbound = InboundLine::parse(&json).unwrap().into_inbound().await.unwrap();
        assert_eq!(inbound, Inbound::Photo(b"\x89PNG".to_vec()));
    }

    #[tokio::test]
    async fn test_missing_photo_is_a_logo_error() {
        let line = InboundLine::parse(r#"{"user_id": 1, "photo_path": "/nonexistent/logo.png"}"#)
            .unwrap();
        let err = line.into_inbound().await.unwrap_err();
        assert!(matches!(err, BotError::Logo(cause) if cause.starts_with("could not read photo")));
    }

    #[test]
    fn test_outbound_line_shape() {
        let message = Outbound::Document {
            path: "out/1/x.txt".to_string(),
            caption: "Invoice x".to_string(),
        };
        let json = OutboundLine {
            user_id: "1",
            message: &message,
        }
        .to_json()
        .unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["user_id"], "1");
        assert_eq!(value["type"], "document");
        assert_eq!(value["path"], "out/1/x.txt");
    }

    #[tokio::test]
    async fn test_serve_answers_in_order_and_skips_garbage() {
        let out = tempfile::tempdir().unwrap();
        let bot = bot(out.path()).await;
        let input = concat!(
            "{\"user_id\": 7, \"start\": true}\n",
            "not json\n",
            "\n",
            "{\"user_id\": 7, \"contact\": \"09121234567\"}\n",
        );

        let lines = run(bot.clone(), input).await;

        assert!(lines.len() >= 2);
        assert!(lines.iter().all(|l| l["user_id"] == "7"));
        assert!(lines.iter().all(|l| l["type"] == "text"));

        let record = bot.db().user_records().load(&UserId::from("7")).await.unwrap();
        assert_eq!(record.phone_number.as_deref(), Some("09121234567"));
    }

    #[tokio::test]
    async fn test_serve_handles_many_users() {
        let out = tempfile::tempdir().unwrap();
        let bot = bot(out.path()).await;
        let input: String = (1..=5)
            .map(|u| format!("{{\"user_id\": {u}, \"contact\": \"0912000000{u}\"}}\n"))
            .collect();

        let lines = run(bot.clone(), &input).await;

        for u in 1..=5 {
            let id = u.to_string();
            assert!(lines.iter().any(|l| l["user_id"] == id.as_str()));
        }
        assert_eq!(bot.db().user_records().count().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_unusable_lines_are_answered() {
        let out = tempfile::tempdir().unwrap();
        let bot = bot(out.path()).await;
        let input = concat!(
            "{\"user_id\": 7, \"contact\": \"09121234567\"}\n",
            "{\"user_id\": 7, \"text\": \"Store: Tehran Pumps - Seller: Sara\"}\n",
            "{\"user_id\": 7, \"text\": \"upload logo\"}\n",
            "{\"user_id\": 7, \"photo_path\": \"/nonexistent/logo.png\"}\n",
            "{\"user_id\": 8}\n",
        );

        let lines = run(bot.clone(), input).await;

        let failed = lines
            .iter()
            .filter(|l| l["user_id"] == "7")
            .last()
            .unwrap();
        assert!(failed["text"]
            .as_str()
            .unwrap()
            .starts_with("The logo could not be processed: could not read photo"));
        let record = bot.db().user_records().load(&UserId::from("7")).await.unwrap();
        assert_eq!(record.state, invoice_core::StateTag::Ready);

        let empty: Vec<&Value> = lines.iter().filter(|l| l["user_id"] == "8").collect();
        assert_eq!(empty.len(), 1);
        assert_eq!(empty[0]["text"], bot.machine().prompts().unavailable.as_str());
    }

    #[tokio::test]
    async fn test_full_queue_answers_busy_without_waiting() {
        let out = tempfile::tempdir().unwrap();
        let bot = bot(out.path()).await;
        let (out_tx, mut out_rx) = mpsc::channel(8);
        let mut dispatcher = Dispatcher::new(bot.clone(), out_tx, ServeOptions::default());
        let user = UserId::from("7");
        let start = || InboundLine::parse(r#"{"user_id": 7, "start": true}"#).unwrap();

        // A worker that never reads, with room for one message.
        let (tx, rx) = mpsc::channel(1);
        dispatcher.workers.insert(
            user.clone(),
            Worker {
                tx,
                handle: tokio::spawn(async {}),
                last_seen: Instant::now(),
            },
        );

        dispatcher.dispatch(start());
        dispatcher.dispatch(start());

        let unavailable = bot.machine().prompts().unavailable.clone();
        let busy: Value = serde_json::from_str(&out_rx.try_recv().unwrap()).unwrap();
        assert_eq!(busy["user_id"], "7");
        assert_eq!(busy["text"], unavailable.as_str());
        assert!(out_rx.try_recv().is_err());

        // A stopped worker is replaced and the message still answered.
        drop(rx);
        dispatcher.dispatch(start());
        let reply: Value = serde_json::from_str(&out_rx.recv().await.unwrap()).unwrap();
        assert_eq!(reply["user_id"], "7");
        assert_ne!(reply["text"], unavailable.as_str());

        dispatcher.shutdown().await;
    }

    #[tokio::test]
    async fn test_idle_workers_and_sessions_are_swept() {
        let out = tempfile::tempdir().unwrap();
        let bot = bot(out.path()).await;
        let options = ServeOptions {
            worker_idle: Duration::ZERO,
            session_idle: Duration::ZERO,
            sweep_every: Duration::from_millis(5),
        };
        let (mut input, reader) = tokio::io::duplex(4096);
        let (client, server) = tokio::io::duplex(64 * 1024);

        let serving = tokio::spawn(serve_with(
            bot.clone(),
            tokio::io::BufReader::new(reader),
            server,
            options,
        ));
        let collect = tokio::spawn(async move {
            let mut client = client;
            let mut buf = Vec::new();
            tokio::io::AsyncReadExt::read_to_end(&mut client, &mut buf)
                .await
                .unwrap();
            buf
        });

        // Pauses between lines let the sweep stop the worker each time.
        for line in [
            "{\"user_id\": 7, \"contact\": \"09121234567\"}\n",
            "{\"user_id\": 7, \"text\": \"Store: Tehran Pumps - Seller: Sara\"}\n",
            "{\"user_id\": 7, \"text\": \"add product\"}\n",
            "{\"user_id\": 7, \"text\": \"Widget-10\"}\n",
        ] {
            input.write_all(line.as_bytes()).await.unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
        drop(input);

        serving.await.unwrap().unwrap();
        let output = String::from_utf8(collect.await.unwrap()).unwrap();

        assert!(output.lines().count() >= 4);
        let record = bot.db().user_records().load(&UserId::from("7")).await.unwrap();
        assert_eq!(record.store_name.as_deref(), Some("Tehran Pumps"));
        assert_eq!(record.products.len(), 1);
        assert_eq!(bot.session_count(), 0);
    }
}
