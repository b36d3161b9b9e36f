use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use async_trait::async_trait;

use super::Probe;

/// One scripted answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeReply {
    Ready,
    Miss,
    Error(String),
}

/// A scripted probe for tests. Returns pre-defined replies in order, then
/// keeps answering with the fallback reply.
pub struct ScriptedProbe {
    replies: Vec<ProbeReply>,
    fallback: ProbeReply,
    index: AtomicUsize,
    seen: Mutex<Vec<String>>,
}

impl ScriptedProbe {
    pub fn new(replies: Vec<ProbeReply>) -> Self {
        Self {
            replies,
            fallback: ProbeReply::Miss,
            index: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// A probe that always answers the same way.
    pub fn always(reply: ProbeReply) -> Self {
        Self {
            fallback: reply,
            ..Self::new(Vec::new())
        }
    }

    /// Ready after `misses` unsuccessful checks.
    pub fn ready_after(misses: usize) -> Self {
        let mut replies = vec![ProbeReply::Miss; misses];
        replies.push(ProbeReply::Ready);
        Self::new(replies)
    }

    /// Number of checks issued so far.
    pub fn calls(&self) -> usize {
        self.index.load(Ordering::SeqCst)
    }

    /// Every locator checked, in order.
    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Probe for ScriptedProbe {
    async fn check(&self, locator: &str) -> Result<bool> {
        let i = self.index.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(locator.to_string());
        }
        match self.replies.get(i).unwrap_or(&self.fallback) {
            ProbeReply::Ready => Ok(true),
            ProbeReply::Miss => Ok(false),
            ProbeReply::Error(msg) => Err(anyhow::anyhow!("{msg}")),
        }
    }
}
