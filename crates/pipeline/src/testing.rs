//! In-memory collaborators shared by the pipeline tests.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mediarelay_resolver::{Error as ResolveError, ResolvedLink};
use mediarelay_transfer::{
    BoxFuture, PollError, ProgressSink, Requester, SessionHandle, SessionStatus,
    SubmissionError, TransferMetrics, TransferSession,
};
use tokio::time::Instant;

use crate::chat::{ChatPlatform, VideoUpload};
use crate::error::ChatError;
use crate::resolve::LinkResolver;
use crate::types::{LinkButton, MessageRef, TransferRequest};

pub const MB: u64 = 1024 * 1024;
pub const ORIGIN_CHAT: i64 = 7;
pub const DUMP_CHAT: i64 = -100;

pub fn request() -> TransferRequest {
    TransferRequest {
        source_ref: "https://terabox.example/s/abc".into(),
        destination_chat: DUMP_CHAT,
        requester: Requester::new(42, "alice"),
        origin: MessageRef {
            chat_id: ORIGIN_CHAT,
            message_id: 1,
        },
    }
}

pub fn status_message() -> MessageRef {
    MessageRef {
        chat_id: ORIGIN_CHAT,
        message_id: 2,
    }
}

pub fn link(thumbnail: bool) -> ResolvedLink {
    ResolvedLink {
        direct_link: "https://cdn.example/d/clip.mp4".into(),
        file_name: "clip.mp4".into(),
        thumbnail_url: thumbnail.then(|| "https://cdn.example/t/clip.jpg".into()),
    }
}

/// A downloaded file of `len` bytes inside `dir`.
pub fn write_file(dir: &Path, name: &str, len: usize) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, vec![0u8; len]).unwrap();
    path
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ChatCall {
    Send {
        chat_id: i64,
        text: String,
    },
    Edit {
        message: MessageRef,
        text: String,
        button: Option<LinkButton>,
        at: Instant,
    },
    Delete(MessageRef),
    Sticker {
        chat_id: i64,
        sticker: String,
    },
    Video {
        chat_id: i64,
        file_name: String,
        caption: String,
        thumbnail: Option<PathBuf>,
    },
    Copy {
        to_chat: i64,
        message: MessageRef,
    },
}

/// How the mock transport streams a video.
#[derive(Debug, Clone)]
pub struct UploadPlan {
    /// Number of progress reports; the last one carries the full size.
    pub reports: u64,
    /// Pause before each report.
    pub step: Duration,
    /// Fail instead of sending report `n`.
    pub fail_at: Option<u64>,
}

impl Default for UploadPlan {
    fn default() -> Self {
        Self {
            reports: 4,
            step: Duration::from_secs(1),
            fail_at: None,
        }
    }
}

pub struct MockChat {
    calls: Mutex<Vec<ChatCall>>,
    next_id: AtomicI32,
    pub fail_edits: AtomicBool,
    pub fail_copy: AtomicBool,
    plan: Mutex<UploadPlan>,
}

impl Default for MockChat {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            next_id: AtomicI32::new(100),
            fail_edits: AtomicBool::new(false),
            fail_copy: AtomicBool::new(false),
            plan: Mutex::new(UploadPlan::default()),
        }
    }
}

impl MockChat {
    pub fn with_plan(plan: UploadPlan) -> Self {
        let chat = Self::default();
        *chat.plan.lock().unwrap() = plan;
        chat
    }

    pub fn calls(&self) -> Vec<ChatCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Texts of every edit, in order.
    pub fn edits(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                ChatCall::Edit { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    /// Edit texts paired with the time they were made.
    pub fn timed_edits(&self) -> Vec<(String, Instant)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                ChatCall::Edit { text, at, .. } => Some((text, at)),
                _ => None,
            })
            .collect()
    }

    pub fn videos(&self) -> Vec<ChatCall> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, ChatCall::Video { .. }))
            .collect()
    }

    pub fn copies(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, ChatCall::Copy { .. }))
            .count()
    }

    pub fn deleted(&self, message: &MessageRef) -> bool {
        self.calls().contains(&ChatCall::Delete(*message))
    }

    fn record(&self, call: ChatCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn message(&self, chat_id: i64) -> MessageRef {
        MessageRef {
            chat_id,
            message_id: self.next_id.fetch_add(1, Ordering::SeqCst),
        }
    }
}

impl ChatPlatform for MockChat {
    fn send_text<'a>(
        &'a self,
        chat_id: i64,
        text: &'a str,
        _button: Option<&'a LinkButton>,
    ) -> BoxFuture<'a, Result<MessageRef, ChatError>> {
        Box::pin(async move {
            self.record(ChatCall::Send {
                chat_id,
                text: text.to_string(),
            });
            Ok(self.message(chat_id))
        })
    }

    fn edit_text<'a>(
        &'a self,
        message: &'a MessageRef,
        text: &'a str,
        button: Option<&'a LinkButton>,
    ) -> BoxFuture<'a, Result<(), ChatError>> {
        Box::pin(async move {
            if self.fail_edits.load(Ordering::SeqCst) {
                return Err(ChatError("message is not modified".into()));
            }
            self.record(ChatCall::Edit {
                message: *message,
                text: text.to_string(),
                button: button.cloned(),
                at: Instant::now(),
            });
            Ok(())
        })
    }

    fn delete_message<'a>(
        &'a self,
        message: &'a MessageRef,
    ) -> BoxFuture<'a, Result<(), ChatError>> {
        Box::pin(async move {
            self.record(ChatCall::Delete(*message));
            Ok(())
        })
    }

    fn send_sticker<'a>(
        &'a self,
        chat_id: i64,
        sticker_id: &'a str,
    ) -> BoxFuture<'a, Result<MessageRef, ChatError>> {
        Box::pin(async move {
            self.record(ChatCall::Sticker {
                chat_id,
                sticker: sticker_id.to_string(),
            });
            Ok(self.message(chat_id))
        })
    }

    fn send_video<'a>(
        &'a self,
        video: VideoUpload<'a>,
        progress: Arc<dyn ProgressSink>,
    ) -> BoxFuture<'a, Result<MessageRef, ChatError>> {
        Box::pin(async move {
            self.record(ChatCall::Video {
                chat_id: video.chat_id,
                file_name: video.file_name.to_string(),
                caption: video.caption.to_string(),
                thumbnail: video.thumbnail.map(Path::to_path_buf),
            });
            let total = tokio::fs::metadata(video.path)
                .await
                .map_err(|e| ChatError(e.to_string()))?
                .len();
            let plan = self.plan.lock().unwrap().clone();
            for n in 1..=plan.reports {
                tokio::time::sleep(plan.step).await;
                if plan.fail_at == Some(n) {
                    return Err(ChatError("connection reset by peer".into()));
                }
                progress.report(total * n / plan.reports, total);
            }
            Ok(self.message(video.chat_id))
        })
    }

    fn copy_message<'a>(
        &'a self,
        to_chat: i64,
        message: &'a MessageRef,
    ) -> BoxFuture<'a, Result<MessageRef, ChatError>> {
        Box::pin(async move {
            if self.fail_copy.load(Ordering::SeqCst) {
                return Err(ChatError("chat not found".into()));
            }
            self.record(ChatCall::Copy {
                to_chat,
                message: *message,
            });
            Ok(self.message(to_chat))
        })
    }

    fn is_member<'a>(
        &'a self,
        _chat_id: i64,
        _user_id: i64,
    ) -> BoxFuture<'a, Result<bool, ChatError>> {
        Box::pin(async { Ok(true) })
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

pub struct MockResolver {
    link: Option<ResolvedLink>,
    thumbnail: Option<Vec<u8>>,
}

impl MockResolver {
    pub fn resolving(link: ResolvedLink) -> Self {
        Self {
            link: Some(link),
            thumbnail: Some(b"\xff\xd8jpeg".to_vec()),
        }
    }

    /// Resolution succeeds but the response carries no direct link.
    pub fn no_direct_link() -> Self {
        Self {
            link: None,
            thumbnail: None,
        }
    }

    pub fn without_thumbnail(mut self) -> Self {
        self.thumbnail = None;
        self
    }
}

impl LinkResolver for MockResolver {
    fn resolve<'a>(
        &'a self,
        _source_url: &'a str,
    ) -> BoxFuture<'a, Result<ResolvedLink, ResolveError>> {
        Box::pin(async move { self.link.clone().ok_or(ResolveError::NoDirectLink) })
    }

    fn fetch_thumbnail<'a>(
        &'a self,
        _url: &'a str,
    ) -> BoxFuture<'a, Result<Vec<u8>, ResolveError>> {
        Box::pin(async move {
            self.thumbnail.clone().ok_or_else(|| ResolveError::Api {
                status: 404,
                body: "not found".into(),
            })
        })
    }
}

// ---------------------------------------------------------------------------
// Download manager
// ---------------------------------------------------------------------------

/// Plays back a scripted sequence of statuses; the last one repeats.
pub struct MockSession {
    reject: bool,
    script: Mutex<VecDeque<Result<SessionStatus, String>>>,
    partial: Option<PathBuf>,
    submitted: Mutex<Vec<String>>,
    cancelled: Mutex<Vec<String>>,
    polls: AtomicI32,
}

impl MockSession {
    pub fn scripted(script: Vec<SessionStatus>) -> Self {
        Self::from_results(script.into_iter().map(Ok).collect())
    }

    /// Like `scripted`, with `Err` entries failing the poll at the
    /// transport level.
    pub fn from_results(script: Vec<Result<SessionStatus, String>>) -> Self {
        Self {
            reject: false,
            script: Mutex::new(script.into()),
            partial: None,
            submitted: Mutex::new(Vec::new()),
            cancelled: Mutex::new(Vec::new()),
            polls: AtomicI32::new(0),
        }
    }

    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Self::scripted(Vec::new())
        }
    }

    /// Every poll fails at the transport level.
    pub fn unreachable_after_submit() -> Self {
        Self::from_results(vec![Err("connection refused".into())])
    }

    /// The file `cancel` reports as written so far.
    pub fn with_partial(mut self, path: PathBuf) -> Self {
        self.partial = Some(path);
        self
    }

    pub fn submitted(&self) -> Vec<String> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn cancelled(&self) -> Vec<String> {
        self.cancelled.lock().unwrap().clone()
    }

    pub fn polls(&self) -> i32 {
        self.polls.load(Ordering::SeqCst)
    }
}

impl TransferSession for MockSession {
    fn submit<'a>(
        &'a self,
        source_url: &'a str,
    ) -> BoxFuture<'a, Result<SessionHandle, SubmissionError>> {
        Box::pin(async move {
            if self.reject {
                return Err(SubmissionError::Rejected("unsupported protocol".into()));
            }
            self.submitted.lock().unwrap().push(source_url.to_string());
            Ok(SessionHandle::new("gid0001"))
        })
    }

    fn poll<'a>(
        &'a self,
        _handle: &'a SessionHandle,
    ) -> BoxFuture<'a, Result<SessionStatus, PollError>> {
        Box::pin(async move {
            self.polls.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock().unwrap();
            let next = if script.len() > 1 {
                script.pop_front()
            } else {
                script.front().cloned()
            };
            match next {
                Some(Ok(status)) => Ok(status),
                Some(Err(e)) => Err(PollError(e)),
                None => Err(PollError("no script".into())),
            }
        })
    }

    fn cancel<'a>(
        &'a self,
        handle: &'a SessionHandle,
    ) -> BoxFuture<'a, Result<Option<PathBuf>, PollError>> {
        Box::pin(async move {
            self.cancelled.lock().unwrap().push(handle.id().to_string());
            Ok(self.partial.clone())
        })
    }
}

/// Active snapshot as the manager would report it.
pub fn active(done: u64, total: u64, speed: f64) -> SessionStatus {
    SessionStatus::Active(
        TransferMetrics::new("clip.mp4", done, total, speed, 0.0).with_session("gid0001"),
    )
}

pub fn completed(path: PathBuf, total: u64, speed: f64) -> SessionStatus {
    SessionStatus::Completed {
        metrics: TransferMetrics::new("clip.mp4", total, total, speed, 0.0)
            .with_session("gid0001"),
        path,
    }
}

pub fn failed(reason: &str, partial_path: Option<PathBuf>) -> SessionStatus {
    SessionStatus::Failed {
        reason: reason.to_string(),
        partial_path,
    }
}
