//! Test doubles for the remote service client and stream channel.

use crate::agent::types::{ActiveRun, AgentConfig, TaskDetails};
use crate::client::{RemoteClient, StreamChannel};
use crate::error::{Error, Result};
use crate::scrape::ScrapeConfig;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// One scripted `recv` outcome.
#[derive(Debug)]
pub enum Scripted {
    /// Deliver a text frame immediately.
    Text(String),
    /// Let the poll window elapse once (sleeps `wait`, then `Ok(None)`).
    Idle,
    /// Fail the channel.
    Fail(String),
}

/// Stream channel that replays a fixed script.
pub struct ScriptedChannel {
    frames: VecDeque<Scripted>,
    /// When the script runs out: keep idling (for cancellation and
    /// idle-timeout tests) instead of failing.
    repeat_idle: bool,
}

impl ScriptedChannel {
    pub fn new(frames: Vec<Scripted>) -> Self {
        Self {
            frames: frames.into(),
            repeat_idle: false,
        }
    }

    /// A channel that never delivers anything and never closes.
    pub fn silent() -> Self {
        Self {
            frames: VecDeque::new(),
            repeat_idle: true,
        }
    }

    pub fn then_silent(mut self) -> Self {
        self.repeat_idle = true;
        self
    }
}

#[async_trait]
impl StreamChannel for ScriptedChannel {
    async fn recv(&mut self, wait: Duration) -> Result<Option<String>> {
        match self.frames.pop_front() {
            Some(Scripted::Text(text)) => Ok(Some(text)),
            Some(Scripted::Fail(reason)) => Err(Error::Stream(reason)),
            Some(Scripted::Idle) => {
                tokio::time::sleep(wait).await;
                Ok(None)
            }
            None if self.repeat_idle => {
                tokio::time::sleep(wait).await;
                Ok(None)
            }
            None => Err(Error::Stream("script exhausted".to_string())),
        }
    }

    async fn close(&mut self) {}
}

/// Remote client whose every call is scripted in advance.
pub struct MockRemoteClient {
    run: ActiveRun,
    start_error: Mutex<Option<String>>,
    start_calls: AtomicUsize,
    stop_delay: Mutex<Option<Duration>>,
    stop_calls: Mutex<Vec<ActiveRun>>,
    scrape_results: Mutex<VecDeque<Result<String>>>,
    scrape_count: AtomicUsize,
    channels: Mutex<VecDeque<Box<dyn StreamChannel>>>,
}

impl MockRemoteClient {
    pub fn new() -> Self {
        Self {
            run: ActiveRun {
                agent_id: "agent-1".to_string(),
                session_id: "session-1".to_string(),
            },
            start_error: Mutex::new(None),
            start_calls: AtomicUsize::new(0),
            stop_delay: Mutex::new(None),
            stop_calls: Mutex::new(Vec::new()),
            scrape_results: Mutex::new(VecDeque::new()),
            scrape_count: AtomicUsize::new(0),
            channels: Mutex::new(VecDeque::new()),
        }
    }

    pub fn run(&self) -> ActiveRun {
        self.run.clone()
    }

    pub fn fail_start(&self, reason: impl Into<String>) {
        *self.start_error.lock().unwrap() = Some(reason.into());
    }

    /// Make `stop_agent` take this long, simulating a slow remote stop.
    pub fn set_stop_delay(&self, delay: Duration) {
        *self.stop_delay.lock().unwrap() = Some(delay);
    }

    pub fn push_channel(&self, channel: ScriptedChannel) {
        self.channels.lock().unwrap().push_back(Box::new(channel));
    }

    pub fn push_scrape(&self, result: Result<String>) {
        self.scrape_results.lock().unwrap().push_back(result);
    }

    pub fn start_calls(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn scrape_calls(&self) -> usize {
        self.scrape_count.load(Ordering::SeqCst)
    }

    pub fn stop_calls(&self) -> Vec<ActiveRun> {
        self.stop_calls.lock().unwrap().clone()
    }
}

impl Default for MockRemoteClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteClient for MockRemoteClient {
    async fn start_agent(
        &self,
        _config: &AgentConfig,
        _details: &TaskDetails,
    ) -> Result<ActiveRun> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = self.start_error.lock().unwrap().clone() {
            return Err(Error::RemoteCall(reason));
        }
        Ok(self.run.clone())
    }

    async fn stop_agent(&self, run: &ActiveRun) -> Result<()> {
        let delay = *self.stop_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.stop_calls.lock().unwrap().push(run.clone());
        Ok(())
    }

    async fn scrape(&self, _config: &ScrapeConfig) -> Result<String> {
        self.scrape_count.fetch_add(1, Ordering::SeqCst);
        self.scrape_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::RemoteCall("no scripted scrape result".to_string())))
    }

    async fn open_stream(&self, _run: &ActiveRun) -> Result<Box<dyn StreamChannel>> {
        self.channels
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::Stream("no scripted channel".to_string()))
    }
}
