//! Scripted in-memory surface used by unit tests across modules.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::prompting::PromptStep;
use crate::session::surface::{AutomationSurface, ChainOptions, ChainResult};

pub struct ScriptedSurface {
    open: AtomicBool,
    reset: AtomicBool,
    acquire_ok: AtomicBool,
    resync_ok: AtomicBool,
    /// Raise the reset signal right after the next chain runs.
    reset_after_chain: AtomicBool,
    responses: Mutex<VecDeque<ChainResult>>,
    chains: Mutex<Vec<(Vec<PromptStep>, ChainOptions)>>,
    delay: Mutex<Option<Duration>>,
    pub acquire_calls: AtomicUsize,
    pub resync_calls: AtomicUsize,
    pub close_calls: AtomicUsize,
}

impl ScriptedSurface {
    pub fn new() -> Self {
        Self {
            open: AtomicBool::new(false),
            reset: AtomicBool::new(false),
            acquire_ok: AtomicBool::new(true),
            resync_ok: AtomicBool::new(true),
            reset_after_chain: AtomicBool::new(false),
            responses: Mutex::new(VecDeque::new()),
            chains: Mutex::new(Vec::new()),
            delay: Mutex::new(None),
            acquire_calls: AtomicUsize::new(0),
            resync_calls: AtomicUsize::new(0),
            close_calls: AtomicUsize::new(0),
        }
    }

    /// Queues a successful chain answering with the given raw strings.
    pub fn respond(&self, payload: &[&str]) -> &Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(ChainResult::ok(payload.iter().map(|s| s.to_string()).collect()));
        self
    }

    pub fn fail_next(&self) -> &Self {
        self.responses.lock().unwrap().push_back(ChainResult::failure());
        self
    }

    pub fn refuse_acquire(&self) {
        self.acquire_ok.store(false, Ordering::SeqCst);
    }

    pub fn refuse_resync(&self) {
        self.resync_ok.store(false, Ordering::SeqCst);
    }

    pub fn signal_reset(&self) {
        self.reset.store(true, Ordering::SeqCst);
    }

    pub fn reset_after_next_chain(&self) {
        self.reset_after_chain.store(true, Ordering::SeqCst);
    }

    pub fn drop_connection(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn chains(&self) -> Vec<(Vec<PromptStep>, ChainOptions)> {
        self.chains.lock().unwrap().clone()
    }
}

#[async_trait]
impl AutomationSurface for ScriptedSurface {
    async fn acquire_session(&self, _service_hint: &str) -> bool {
        self.acquire_calls.fetch_add(1, Ordering::SeqCst);
        let ok = self.acquire_ok.load(Ordering::SeqCst);
        self.open.store(ok, Ordering::SeqCst);
        ok
    }

    async fn resync(&self, _service_hint: &str) -> bool {
        self.resync_calls.fetch_add(1, Ordering::SeqCst);
        self.resync_ok.load(Ordering::SeqCst)
    }

    async fn run_chain(&self, steps: &[PromptStep], options: ChainOptions) -> ChainResult {
        self.chains.lock().unwrap().push((steps.to_vec(), options));

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.reset_after_chain.swap(false, Ordering::SeqCst) {
            self.reset.store(true, Ordering::SeqCst);
        }
        if !options.leave_open {
            self.open.store(false, Ordering::SeqCst);
        }

        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(ChainResult::failure)
    }

    async fn close_session(&self) {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.open.store(false, Ordering::SeqCst);
    }

    fn is_session_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn take_reset(&self) -> bool {
        self.reset.swap(false, Ordering::SeqCst)
    }
}
