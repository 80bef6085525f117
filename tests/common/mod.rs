//! Shared test harness for integration tests.
//!
//! Provides [`FakeEngine`], an in-memory [`TranscodeEngine`] that "transcodes"
//! by tagging the staged input with the requested window, and
//! [`TestHarness`] which wires it into a [`BatchController`].

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use sg_core::events::EventBus;
use sg_core::Error;
use sg_engine::args::INPUT_NAME;
use sg_engine::{ProgressSender, TranscodeEngine};
use sg_pipeline::{BatchController, ControllerSettings};

/// One recorded `execute` call.
#[derive(Debug, Clone)]
pub struct ExecCall {
    pub args: Vec<String>,
}

impl ExecCall {
    pub fn output(&self) -> &str {
        self.args.last().map(String::as_str).unwrap_or("")
    }

    /// Value following `flag`.
    pub fn value_of(&self, flag: &str) -> Option<&str> {
        self.args
            .windows(2)
            .find(|pair| pair[0] == flag)
            .map(|pair| pair[1].as_str())
    }
}

/// In-memory engine double.
pub struct FakeEngine {
    files: HashMap<String, Bytes>,
    calls: Arc<Mutex<Vec<ExecCall>>>,
    fail_on: Option<String>,
    ready: bool,
}

impl FakeEngine {
    pub fn new(calls: Arc<Mutex<Vec<ExecCall>>>) -> Self {
        Self {
            files: HashMap::new(),
            calls,
            fail_on: None,
            ready: false,
        }
    }

    /// Make `execute` fail when it is asked to produce `output`.
    pub fn failing_on(mut self, output: &str) -> Self {
        self.fail_on = Some(output.to_string());
        self
    }
}

#[async_trait]
impl TranscodeEngine for FakeEngine {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn is_ready(&self) -> bool {
        self.ready
    }

    async fn initialize(&mut self) -> sg_core::Result<()> {
        self.ready = true;
        Ok(())
    }

    async fn write_input(&mut self, name: &str, bytes: &[u8]) -> sg_core::Result<()> {
        self.files.insert(name.to_string(), Bytes::copy_from_slice(bytes));
        Ok(())
    }

    async fn execute(&mut self, args: &[String], progress: &ProgressSender) -> sg_core::Result<()> {
        let call = ExecCall {
            args: args.to_vec(),
        };
        let output = call.output().to_string();
        let tag = format!(
            "{}|ss={}|t={}",
            String::from_utf8_lossy(self.files.get(INPUT_NAME).map(|b| &b[..]).unwrap_or(b"")),
            call.value_of("-ss").unwrap_or(""),
            call.value_of("-t").unwrap_or("")
        );
        self.calls.lock().push(call);

        if self.fail_on.as_deref() == Some(output.as_str()) {
            return Err(Error::tool("fake", "Invalid too big or non positive size"));
        }
        progress.send(0.25);
        progress.send(1.0);
        self.files.insert(output, Bytes::from(tag));
        Ok(())
    }

    async fn read_output(&mut self, name: &str) -> sg_core::Result<Bytes> {
        self.files
            .get(name)
            .cloned()
            .ok_or_else(|| Error::not_found("engine file", name))
    }

    async fn delete_file(&mut self, name: &str) -> sg_core::Result<()> {
        self.files.remove(name);
        Ok(())
    }
}

/// A controller backed by a [`FakeEngine`], plus handles to inspect it.
pub struct TestHarness {
    pub controller: Arc<BatchController>,
    pub events: Arc<EventBus>,
    pub calls: Arc<Mutex<Vec<ExecCall>>>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_engine(FakeEngine::new)
    }

    pub fn with_engine(build: impl FnOnce(Arc<Mutex<Vec<ExecCall>>>) -> FakeEngine) -> Self {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let events = Arc::new(EventBus::default());
        let controller = Arc::new(BatchController::new(
            Box::new(build(calls.clone())),
            ControllerSettings::default(),
            events.clone(),
        ));
        Self {
            controller,
            events,
            calls,
        }
    }

    pub fn outputs(&self) -> Vec<String> {
        self.calls.lock().iter().map(|c| c.output().to_string()).collect()
    }
}
