// ABOUTME: Application state and lifecycle: session construction, event draining, polling

use crate::components::page::Page;
use crate::config::AppConfig;
use crate::session::{ResourcePoller, TerminalSession};
use crate::terminal::{SocketIoClient, Transport, TransportEvent};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

pub struct AppState {
    pub session: TerminalSession,
    pub should_quit: bool,
}

impl AppState {
    pub fn new(session: TerminalSession) -> Self {
        Self {
            session,
            should_quit: false,
        }
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }
}

pub struct App {
    pub state: AppState,
    events: mpsc::UnboundedReceiver<TransportEvent>,
    transport: Arc<dyn Transport>,
    client: Option<Arc<SocketIoClient>>,
    poll_interval: Duration,
    poller: Option<ResourcePoller>,
}

impl App {
    /// Build the client, screen and session from `config`. Nothing connects until [`App::init`].
    pub fn new(config: &AppConfig) -> Result<Self> {
        config.validate().context("invalid configuration")?;

        let options = config.client_options()?;
        let (client, events) = SocketIoClient::new(options);
        let client = Arc::new(client);

        let mut page = Page::standard(config.terminal_theme()?);
        let transport: Arc<dyn Transport> = client.clone();
        let session = TerminalSession::attach(&mut page, transport.clone())
            .context("failed to initialise terminal session")?;

        Ok(Self {
            state: AppState::new(session),
            events,
            transport,
            client: Some(client),
            poll_interval: config.poll_interval(),
            poller: None,
        })
    }

    /// Assemble an app around an existing session and event source
    pub fn with_session(
        session: TerminalSession,
        events: mpsc::UnboundedReceiver<TransportEvent>,
        poll_interval: Duration,
    ) -> Self {
        let transport = session.transport().clone();
        Self {
            state: AppState::new(session),
            events,
            transport,
            client: None,
            poll_interval,
            poller: None,
        }
    }

    /// Connect the transport and start resource polling
    pub async fn init(&mut self) {
        if let Some(client) = &self.client {
            client.connect().await;
        }

        if self.poller.is_none() {
            self.poller = Some(ResourcePoller::spawn(self.transport.clone(), self.poll_interval));
        }
    }

    /// Dispatch every transport event received since the last call
    pub fn drain_events(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events.try_recv() {
            debug!("Dispatching transport event {}", event.name());
            self.state.session.handle_event(event);
            handled += 1;
        }
        handled
    }

    /// Periodic UI work
    pub fn tick(&mut self) {
        self.state.session.terminal_mut().blink();
    }

    pub fn is_polling(&self) -> bool {
        self.poller.as_ref().is_some_and(ResourcePoller::is_running)
    }

    /// Stop polling and close the connection
    pub async fn shutdown(&mut self) {
        info!("Shutting down");
        self.poller = None;
        if let Some(client) = &self.client {
            client.disconnect().await;
        }
    }
}
