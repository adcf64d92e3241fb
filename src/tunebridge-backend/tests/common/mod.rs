#![allow(dead_code)]

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::runtime::Runtime;
use tunebridge_backend::{
    BackendProcess, CatalogGateway, LaunchCommand, ProcessLauncher, UrlOpener,
};
use tunebridge_core::BackendConfig;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Mock backend. The blocking client under test must run outside the
/// runtime, so mocks are mounted through `block_on`.
pub struct FakeBackend {
    pub server: Arc<MockServer>,
    pub rt: Runtime,
}

impl FakeBackend {
    pub fn start() -> Self {
        let rt = Runtime::new().expect("runtime");
        let server = Arc::new(rt.block_on(MockServer::start()));
        Self { server, rt }
    }

    /// A backend whose liveness endpoint already answers.
    pub fn online() -> Self {
        let backend = Self::start();
        backend.mount(status_mock());
        backend
    }

    pub fn mount(&self, mock: Mock) {
        self.rt.block_on(mock.mount(&self.server));
    }

    pub fn get_json(&self, endpoint: &str, body: &str) {
        self.mount(
            Mock::given(method("GET"))
                .and(path(endpoint))
                .respond_with(ResponseTemplate::new(200).set_body_string(body)),
        );
    }

    pub fn requested_paths(&self) -> Vec<String> {
        self.rt
            .block_on(self.server.received_requests())
            .unwrap_or_default()
            .into_iter()
            .map(|request| request.url.path().to_string())
            .collect()
    }

    pub fn config(&self) -> BackendConfig {
        BackendConfig {
            base_url: self.server.uri(),
            request_timeout_secs: 5,
            startup_timeout_ms: 500,
            startup_poll_interval_ms: 25,
            ..BackendConfig::default()
        }
    }
}

pub fn status_mock() -> Mock {
    Mock::given(method("GET")).and(path("/")).respond_with(
        ResponseTemplate::new(200).set_body_string(r#"{"status":"online","service":"catalog-bridge"}"#),
    )
}

#[derive(Clone, Default)]
pub struct RecordingOpener {
    pub opened: Arc<Mutex<Vec<String>>>,
}

impl UrlOpener for RecordingOpener {
    fn open(&self, url: &str) -> io::Result<()> {
        self.opened.lock().unwrap().push(url.to_string());
        Ok(())
    }
}

struct IdleProcess;

impl BackendProcess for IdleProcess {
    fn id(&self) -> u32 {
        1
    }

    fn has_exited(&mut self) -> bool {
        false
    }

    fn terminate(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Counts launches; optionally brings the mock backend's liveness endpoint up.
#[derive(Clone, Default)]
pub struct CountingLauncher {
    pub launches: Arc<AtomicUsize>,
    pub commands: Arc<Mutex<Vec<LaunchCommand>>>,
    pub brings_up: Option<(tokio::runtime::Handle, Arc<MockServer>)>,
}

impl CountingLauncher {
    pub fn bringing_up(backend: &FakeBackend) -> Self {
        Self {
            brings_up: Some((backend.rt.handle().clone(), backend.server.clone())),
            ..Self::default()
        }
    }

    pub fn count(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}

impl ProcessLauncher for CountingLauncher {
    fn launch(&self, command: &LaunchCommand) -> io::Result<Box<dyn BackendProcess>> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        self.commands.lock().unwrap().push(command.clone());
        if let Some((handle, server)) = &self.brings_up {
            handle.block_on(status_mock().mount(server));
        }
        Ok(Box::new(IdleProcess))
    }
}

pub fn gateway(
    config: BackendConfig,
    launcher: &CountingLauncher,
    opener: &RecordingOpener,
) -> CatalogGateway {
    CatalogGateway::with_collaborators(
        config,
        Box::new(launcher.clone()),
        Box::new(opener.clone()),
    )
    .expect("gateway")
}
