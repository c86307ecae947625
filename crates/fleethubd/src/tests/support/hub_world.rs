//! Running hub assembled from its parts, plus scripted device clients.
//!
//! The world wires the same components as the launch sequence but keeps the
//! roster and dispatcher in reach so steps can inspect and drive them.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::Arc;
use std::time::Duration;

use fleethub_config::DuplicatePolicy;

use crate::bootstrap::{Hub, bootstrap_with};
use crate::dispatch::{CommandDispatcher, DispatchFailure};
use crate::events::EventKind;
use crate::roster::SlotView;
use crate::session::SessionHandler;
use crate::transport::{ListenerHandle, SocketListener};

use super::config_loader::TestConfigLoader;
use super::reporter::RecordingHealthReporter;
use super::{StepResult, WAIT_TIMEOUT, eventually};

/// Device side of one TCP connection to the hub.
pub struct DeviceClient {
    stream: TcpStream,
}

impl DeviceClient {
    fn connect(addr: SocketAddr) -> io::Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_read_timeout(Some(WAIT_TIMEOUT))?;
        Ok(Self { stream })
    }

    pub fn send(&mut self, text: &str) -> io::Result<()> {
        self.stream.write_all(text.as_bytes())
    }

    /// Reads whatever the hub sent next.
    pub fn read_text(&mut self) -> io::Result<String> {
        let mut buffer = [0_u8; 256];
        let read = self.stream.read(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer[..read]).into_owned())
    }

    /// Whether nothing arrives from the hub within `window`.
    pub fn stays_silent(&mut self, window: Duration) -> io::Result<bool> {
        self.stream.set_read_timeout(Some(window))?;
        let mut buffer = [0_u8; 64];
        let outcome = match self.stream.read(&mut buffer) {
            Ok(_) => Ok(false),
            Err(error)
                if matches!(
                    error.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                ) =>
            {
                Ok(true)
            }
            Err(error) => Err(error),
        };
        self.stream.set_read_timeout(Some(WAIT_TIMEOUT))?;
        outcome
    }

    /// Whether the hub has closed this connection.
    pub fn closed_by_hub(&mut self) -> bool {
        let mut buffer = [0_u8; 64];
        loop {
            match self.stream.read(&mut buffer) {
                Ok(0) => return true,
                Ok(_) => {}
                Err(error) if error.kind() == io::ErrorKind::ConnectionReset => return true,
                Err(_) => return false,
            }
        }
    }

    pub fn hang_up(&self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

/// Scenario world holding a live hub and its device clients.
pub struct HubWorld {
    loader: TestConfigLoader,
    hub: Option<Hub>,
    listener: Option<ListenerHandle>,
    addr: Option<SocketAddr>,
    dispatcher: Option<CommandDispatcher>,
    devices: HashMap<String, DeviceClient>,
    replies: HashMap<String, String>,
    dispatch_result: Option<Result<String, DispatchFailure>>,
}

impl HubWorld {
    #[must_use]
    pub fn new() -> Self {
        Self::with_policy(DuplicatePolicy::Reject)
    }

    #[must_use]
    pub fn with_policy(policy: DuplicatePolicy) -> Self {
        Self {
            loader: TestConfigLoader::new().with_policy(policy),
            hub: None,
            listener: None,
            addr: None,
            dispatcher: None,
            devices: HashMap::new(),
            replies: HashMap::new(),
            dispatch_result: None,
        }
    }

    /// Replaces the duplicate policy used by the next [`HubWorld::start`].
    pub fn use_policy(&mut self, policy: DuplicatePolicy) {
        self.loader = TestConfigLoader::new().with_policy(policy);
    }

    /// Bootstraps the hub and starts accepting devices.
    pub fn start(&mut self) -> StepResult {
        if self.hub.is_some() {
            return Err("hub already running".to_owned());
        }
        let reporter = RecordingHealthReporter::default();
        let hub = bootstrap_with(&self.loader, &reporter).map_err(|error| error.to_string())?;
        let listener =
            SocketListener::bind(hub.config().listen()).map_err(|error| error.to_string())?;
        let addr = listener.local_addr().map_err(|error| error.to_string())?;
        let events = hub.events();
        events.record(EventKind::ServerStart, format!("Listening on {addr}"));
        let handler = Arc::new(SessionHandler::new(
            hub.roster(),
            Arc::clone(&events),
            hub.config().framing(),
        ));
        let handle = listener
            .start(handler, Arc::clone(&events))
            .map_err(|error| error.to_string())?;
        self.dispatcher = Some(CommandDispatcher::new(hub.roster(), events));
        self.listener = Some(handle);
        self.addr = Some(addr);
        self.hub = Some(hub);
        Ok(())
    }

    /// Opens a connection labelled `label` without sending anything.
    pub fn connect(&mut self, label: &str) -> StepResult {
        let addr = self.addr.ok_or_else(|| "hub not running".to_owned())?;
        let client = DeviceClient::connect(addr).map_err(|error| error.to_string())?;
        self.devices.insert(label.to_owned(), client);
        Ok(())
    }

    /// Connects, sends `line`, and stores the hub's reply under `label`.
    pub fn register(&mut self, label: &str, line: &str) -> StepResult {
        self.connect(label)?;
        let device = self.device(label)?;
        device.send(line).map_err(|error| error.to_string())?;
        let reply = device.read_text().map_err(|error| error.to_string())?;
        self.replies.insert(label.to_owned(), reply);
        Ok(())
    }

    pub fn send(&mut self, label: &str, text: &str) -> StepResult {
        self.device(label)?
            .send(text)
            .map_err(|error| error.to_string())
    }

    pub fn hang_up(&mut self, label: &str) -> StepResult {
        let device = self
            .devices
            .remove(label)
            .ok_or_else(|| format!("no device labelled {label}"))?;
        device.hang_up();
        Ok(())
    }

    pub fn device(&mut self, label: &str) -> Result<&mut DeviceClient, String> {
        self.devices
            .get_mut(label)
            .ok_or_else(|| format!("no device labelled {label}"))
    }

    #[must_use]
    pub fn reply(&self, label: &str) -> Option<&str> {
        self.replies.get(label).map(String::as_str)
    }

    /// Dispatches `command` to the slot named `name`.
    pub fn dispatch(&mut self, name: &str, command: &str) -> StepResult {
        let hub = self.hub.as_ref().ok_or_else(|| "hub not running".to_owned())?;
        let index = hub
            .roster()
            .find_slot_by_name(name)
            .ok_or_else(|| format!("{name} is not on the roster"))?;
        let dispatcher = self
            .dispatcher
            .as_ref()
            .ok_or_else(|| "hub not running".to_owned())?;
        self.dispatch_result = Some(dispatcher.dispatch(index, command));
        Ok(())
    }

    #[must_use]
    pub fn dispatch_result(&self) -> Option<&Result<String, DispatchFailure>> {
        self.dispatch_result.as_ref()
    }

    #[must_use]
    pub fn slot(&self, name: &str) -> Option<SlotView> {
        let hub = self.hub.as_ref()?;
        hub.roster()
            .snapshot()
            .into_iter()
            .find(|slot| slot.name == name)
    }

    #[must_use]
    pub fn connected_slots(&self) -> Vec<String> {
        self.hub
            .as_ref()
            .map(|hub| {
                hub.roster()
                    .snapshot()
                    .into_iter()
                    .filter(|slot| slot.connected)
                    .map(|slot| slot.name)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Waits until the slot named `name` satisfies `predicate`.
    pub fn wait_for_slot(&self, name: &str, predicate: impl Fn(&SlotView) -> bool) -> StepResult {
        if eventually(|| self.slot(name).is_some_and(|slot| predicate(&slot))) {
            Ok(())
        } else {
            Err(format!("slot {name} never reached the expected state: {:?}", self.slot(name)))
        }
    }

    /// Current contents of the event log file.
    #[must_use]
    pub fn event_log(&self) -> String {
        fs::read_to_string(self.loader.event_log_path()).unwrap_or_default()
    }

    /// Waits until the event log holds a `tag` line containing `needle`.
    pub fn wait_for_event(&self, tag: &str, needle: &str) -> StepResult {
        let marker = format!("[{tag}]");
        let found = eventually(|| {
            self.event_log()
                .lines()
                .any(|line| line.contains(&marker) && line.contains(needle))
        });
        if found {
            Ok(())
        } else {
            Err(format!(
                "event log lacks {marker} {needle}:\n{}",
                self.event_log()
            ))
        }
    }

    /// Stops the listener and closes every live session.
    pub fn stop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.shutdown();
            if let Some(hub) = &self.hub {
                hub.roster().close_all();
            }
            let _ = listener.join();
        }
    }
}

impl Default for HubWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for HubWorld {
    fn drop(&mut self) {
        self.stop();
    }
}
