#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use eyre::{bail, Result};
use gg_resources::{
    LoadCtx, LoaderConfig, LoaderEvent, MemorySource, Request, Resource, ResourceHandler,
    ResourceLoader, Submission,
};
use parking_lot::Mutex;
use tokio::sync::Semaphore;

pub const TIMEOUT: Duration = Duration::from_secs(5);

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[derive(Debug, PartialEq)]
pub struct Text(pub String);

impl Resource for Text {}

/// Loads `identifier` as text. Identifiers containing `wait` block until the
/// gate has a permit, `missing` fails in `load`, `corrupt` fails in `open`
/// and `panic` panics.
#[derive(Clone)]
pub struct TextHandler {
    pub loads: Arc<Mutex<Vec<String>>>,
    pub opens: Arc<AtomicUsize>,
    pub gate: Arc<Semaphore>,
}

impl TextHandler {
    pub fn new() -> TextHandler {
        TextHandler {
            loads: Arc::new(Mutex::new(Vec::new())),
            opens: Arc::new(AtomicUsize::new(0)),
            gate: Arc::new(Semaphore::new(0)),
        }
    }

    pub fn loads(&self) -> Vec<String> {
        self.loads.lock().clone()
    }

    pub fn load_count(&self) -> usize {
        self.loads.lock().len()
    }

    pub fn release(&self, permits: usize) {
        self.gate.add_permits(permits);
    }
}

#[async_trait]
impl ResourceHandler for TextHandler {
    type Resource = Text;
    type Data = String;

    async fn load(&self, _ctx: &mut LoadCtx, identifier: &str) -> Result<String> {
        self.loads.lock().push(identifier.to_owned());

        if identifier.contains("wait") {
            self.gate.acquire().await?.forget();
        }

        if identifier.contains("missing") {
            bail!("no such resource");
        }

        if identifier.contains("panic") {
            panic!("handler exploded");
        }

        Ok(identifier.to_owned())
    }

    fn open(&self, data: String) -> Result<Text> {
        self.opens.fetch_add(1, Ordering::SeqCst);

        if data.contains("corrupt") {
            bail!("corrupt data");
        }

        Ok(Text(format!("{}-opened", data)))
    }
}

pub fn loader_with(config: LoaderConfig) -> (ResourceLoader, TextHandler) {
    init_tracing();

    let handler = TextHandler::new();
    let mut loader = ResourceLoader::with_config(MemorySource::new(), config).unwrap();
    loader.register_handler(handler.clone());
    (loader, handler)
}

pub fn loader() -> (ResourceLoader, TextHandler) {
    loader_with(LoaderConfig::default())
}

pub fn text(identifier: &str) -> Request {
    Request::new::<Text>(identifier)
}

/// Records which callbacks fired for a batch.
#[derive(Clone, Default)]
pub struct Outcome {
    pub log: Arc<Mutex<Vec<String>>>,
    pub successes: Arc<AtomicUsize>,
    pub errors: Arc<AtomicUsize>,
}

impl Outcome {
    pub fn new() -> Outcome {
        Outcome::default()
    }

    /// Hooks success and error callbacks that log under `name`.
    pub fn track(&self, name: &'static str, submission: Submission) -> Submission {
        let success = self.clone();
        let error = self.clone();

        submission
            .on_success(move |resources| {
                let mut identifiers: Vec<String> =
                    resources.identifiers().map(|v| v.to_string()).collect();
                identifiers.sort();
                success.successes.fetch_add(1, Ordering::SeqCst);
                success
                    .log
                    .lock()
                    .push(format!("{} success [{}]", name, identifiers.join(",")));
            })
            .on_error(move |errors, resources| {
                error.errors.fetch_add(1, Ordering::SeqCst);
                error.log.lock().push(format!(
                    "{} error {}/{}",
                    name,
                    errors.len(),
                    resources.len()
                ));
            })
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    pub fn successes(&self) -> usize {
        self.successes.load(Ordering::SeqCst)
    }

    pub fn errors(&self) -> usize {
        self.errors.load(Ordering::SeqCst)
    }
}

/// Maintains the loader until `cond` holds.
pub fn wait_until(loader: &mut ResourceLoader, mut cond: impl FnMut(&ResourceLoader) -> bool) -> bool {
    let deadline = Instant::now() + TIMEOUT;

    loop {
        loader.maintain();
        if cond(loader) {
            return true;
        }

        let now = Instant::now();
        if now >= deadline {
            return false;
        }

        loader.maintain_blocking((deadline - now).min(Duration::from_millis(20)));
    }
}

/// Waits until the handler saw `count` load calls.
pub fn wait_for_loads(handler: &TextHandler, count: usize) -> bool {
    let deadline = Instant::now() + TIMEOUT;
    while handler.load_count() < count {
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    true
}

pub fn loading_order(events: impl Iterator<Item = LoaderEvent>) -> Vec<String> {
    events
        .filter_map(|event| match event {
            LoaderEvent::Loading { identifier, .. } => Some(identifier.to_string()),
            _ => None,
        })
        .collect()
}
