//! Email fetching
//!
//! Connects to the IMAP mailbox, searches for bank alert mails, and
//! downloads message bodies with a bounded pool of blocking workers. The
//! IMAP protocol library is synchronous, so all socket work runs inside
//! `spawn_blocking`; each worker holds its own connection because IMAP
//! sessions are not safe to share across threads.
//!
//! Failure model: a rejected login is fatal ([`Error::Authentication`]).
//! A single message that fails to download or parse is logged and skipped;
//! the batch always continues.

use std::net::TcpStream;
use std::net::ToSocketAddrs;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use mailparse::{dateparse, MailHeaderMap, ParsedMail};
use native_tls::{TlsConnector, TlsStream};
use scraper::Html;
use tracing::{debug, info, warn};

use crate::config::MailboxSettings;
use crate::error::{Error, Result};
use crate::models::{BodyKind, EmailRecord};

type ImapSession = imap::Session<TlsStream<TcpStream>>;

/// Result of one fetch run
#[derive(Debug, Default)]
pub struct FetchOutcome {
    /// Parsed records, sorted by date ascending
    pub records: Vec<EmailRecord>,
    /// Messages that failed to download or parse and were skipped
    pub skipped: usize,
}

/// Mailbox fetcher
pub struct Fetcher {
    settings: MailboxSettings,
    password: String,
}

impl Fetcher {
    pub fn new(settings: MailboxSettings, password: String) -> Self {
        Self { settings, password }
    }

    /// Fetch matching messages, optionally restricted to a date range
    ///
    /// `since` is inclusive, `before` exclusive, matching IMAP SEARCH
    /// semantics.
    pub async fn fetch(
        &self,
        since: Option<NaiveDate>,
        before: Option<NaiveDate>,
    ) -> Result<FetchOutcome> {
        let query = build_search_query(&self.settings.sender_patterns, since, before);
        info!(
            host = %self.settings.host,
            folder = %self.settings.folder,
            "Searching mailbox"
        );

        // Phase 1: search for matching UIDs on a single connection
        let settings = self.settings.clone();
        let password = self.password.clone();
        let search_query = query.clone();
        let mut uids = tokio::task::spawn_blocking(move || -> Result<Vec<u32>> {
            let mut session = connect(&settings, &password)?;
            session.select(&settings.folder)?;
            let uid_set = session.uid_search(&search_query)?;
            let _ = session.logout();

            let mut uids: Vec<u32> = uid_set.into_iter().collect();
            uids.sort_unstable();
            Ok(uids)
        })
        .await
        .map_err(|e| Error::Fetch(format!("Search task panicked: {}", e)))??;

        // Keep the newest max_emails (UIDs are assigned in arrival order)
        if uids.len() > self.settings.max_emails {
            uids = uids.split_off(uids.len() - self.settings.max_emails);
        }

        if uids.is_empty() {
            info!("No matching messages");
            return Ok(FetchOutcome::default());
        }

        // Phase 2: download bodies with a bounded worker pool. Each worker
        // opens its own connection and processes a contiguous UID slice.
        let worker_count = self.settings.concurrency.clamp(1, uids.len());
        let chunk_size = uids.len().div_ceil(worker_count);
        debug!(
            messages = uids.len(),
            workers = worker_count,
            "Downloading message bodies"
        );

        let mut handles = Vec::with_capacity(worker_count);
        for chunk in uids.chunks(chunk_size) {
            let settings = self.settings.clone();
            let password = self.password.clone();
            let chunk = chunk.to_vec();
            handles.push(tokio::task::spawn_blocking(move || {
                fetch_chunk(&settings, &password, &chunk)
            }));
        }

        let mut outcome = FetchOutcome::default();
        for handle in handles {
            match handle.await {
                Ok((records, skipped)) => {
                    outcome.records.extend(records);
                    outcome.skipped += skipped;
                }
                Err(e) => {
                    warn!(error = %e, "Fetch worker panicked; its messages were skipped");
                }
            }
        }

        outcome.records.sort_by_key(|r| r.date);
        info!(
            fetched = outcome.records.len(),
            skipped = outcome.skipped,
            "Fetch complete"
        );
        Ok(outcome)
    }
}

/// Open a TLS connection with explicit timeouts and log in
///
/// A rejected login maps to [`Error::Authentication`]; everything else on
/// the way to a session is a connection-level fetch error.
fn connect(settings: &MailboxSettings, password: &str) -> Result<ImapSession> {
    let timeout = Duration::from_secs(settings.timeout_secs);
    let addr = (settings.host.as_str(), settings.port)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| {
            Error::Fetch(format!("Cannot resolve IMAP host {}", settings.host))
        })?;

    let stream = TcpStream::connect_timeout(&addr, timeout)?;
    stream.set_read_timeout(Some(timeout))?;
    stream.set_write_timeout(Some(timeout))?;

    let tls = TlsConnector::new()?;
    let tls_stream = tls
        .connect(&settings.host, stream)
        .map_err(|e| Error::Fetch(format!("TLS handshake failed: {}", e)))?;

    let client = imap::Client::new(tls_stream);
    client
        .login(&settings.user, password)
        .map_err(|(e, _)| Error::Authentication(format!("Mailbox login rejected: {}", e)))
}

/// Download and parse one worker's share of UIDs
///
/// Per-message failures are logged and counted, never propagated. A failure
/// to even open the worker's connection skips the whole chunk.
fn fetch_chunk(
    settings: &MailboxSettings,
    password: &str,
    uids: &[u32],
) -> (Vec<EmailRecord>, usize) {
    let mut session = match connect(settings, password).and_then(|mut s| {
        s.select(&settings.folder)?;
        Ok(s)
    }) {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, messages = uids.len(), "Worker connection failed; skipping chunk");
            return (Vec::new(), uids.len());
        }
    };

    let mut records = Vec::with_capacity(uids.len());
    let mut skipped = 0;

    for &uid in uids {
        match fetch_one(&mut session, uid) {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!(uid, error = %e, "Skipping message");
                skipped += 1;
            }
        }
    }

    let _ = session.logout();
    (records, skipped)
}

/// Fetch and parse a single message
fn fetch_one(session: &mut ImapSession, uid: u32) -> Result<EmailRecord> {
    let messages = session.uid_fetch(uid.to_string(), "(RFC822 INTERNALDATE)")?;
    let fetch = messages
        .iter()
        .next()
        .ok_or_else(|| Error::Fetch(format!("UID {} not returned by server", uid)))?;

    let raw = fetch
        .body()
        .ok_or_else(|| Error::Fetch(format!("UID {} has no body", uid)))?;

    let internal_date = fetch.internal_date().map(|d| d.with_timezone(&Utc));
    parse_message(uid, raw, internal_date)
}

/// Parse a raw RFC822 message into an [`EmailRecord`]
///
/// Prefers the Date header, falling back to the server's INTERNALDATE.
/// HTML bodies are stripped to text.
pub fn parse_message(
    uid: u32,
    raw: &[u8],
    internal_date: Option<DateTime<Utc>>,
) -> Result<EmailRecord> {
    let parsed = mailparse::parse_mail(raw)?;

    let sender = parsed
        .headers
        .get_first_value("From")
        .unwrap_or_default();
    let subject = parsed
        .headers
        .get_first_value("Subject")
        .unwrap_or_default();

    let date = parsed
        .headers
        .get_first_value("Date")
        .and_then(|d| dateparse(&d).ok())
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .or(internal_date)
        .ok_or_else(|| Error::Fetch(format!("UID {} has no usable date", uid)))?;

    let (body, body_kind) = extract_body(&parsed)?;

    Ok(EmailRecord {
        uid,
        sender,
        subject,
        date,
        body,
        body_kind,
    })
}

/// Pull a text body out of the MIME tree, preferring text/plain
fn extract_body(parsed: &ParsedMail) -> Result<(String, BodyKind)> {
    if let Some(part) = find_part(parsed, "text/plain") {
        return Ok((part.get_body()?, BodyKind::Plain));
    }
    if let Some(part) = find_part(parsed, "text/html") {
        return Ok((strip_html(&part.get_body()?), BodyKind::Html));
    }
    // Single-part messages without an explicit content type still carry text
    if parsed.subparts.is_empty() {
        return Ok((parsed.get_body()?, BodyKind::Plain));
    }
    Err(Error::Fetch("No text part in message".to_string()))
}

/// Depth-first search for the first part with the given MIME type
fn find_part<'a>(part: &'a ParsedMail<'a>, mimetype: &str) -> Option<&'a ParsedMail<'a>> {
    if part.ctype.mimetype.eq_ignore_ascii_case(mimetype) {
        return Some(part);
    }
    part.subparts
        .iter()
        .find_map(|sub| find_part(sub, mimetype))
}

/// Strip markup from an HTML body, collapsing whitespace
pub fn strip_html(html: &str) -> String {
    let document = Html::parse_document(html);
    let text: Vec<&str> = document.root_element().text().collect();
    text.join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Build the IMAP UID SEARCH query
///
/// Sender patterns are OR-joined FROM terms (IMAP OR is a binary prefix
/// operator, so multiple patterns nest); date terms are AND-ed implicitly.
fn build_search_query(
    sender_patterns: &[String],
    since: Option<NaiveDate>,
    before: Option<NaiveDate>,
) -> String {
    let mut terms: Vec<String> = Vec::new();

    if !sender_patterns.is_empty() {
        let mut from_expr = format!("FROM \"{}\"", sender_patterns[0]);
        for pattern in &sender_patterns[1..] {
            from_expr = format!("OR {} FROM \"{}\"", from_expr, pattern);
        }
        terms.push(from_expr);
    }

    // IMAP date format: 01-Jan-2024
    if let Some(date) = since {
        terms.push(format!("SINCE {}", date.format("%d-%b-%Y")));
    }
    if let Some(date) = before {
        terms.push(format!("BEFORE {}", date.format("%d-%b-%Y")));
    }

    if terms.is_empty() {
        "ALL".to_string()
    } else {
        terms.join(" ")
    }
}
