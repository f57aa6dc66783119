//! Background thread that runs data-service requests.
//!
//! The review state lives on the UI thread and must never block on the
//! network. Requests are handed to a [`Dispatcher`]; the [`ServiceWorker`]
//! implementation forwards them to a dedicated thread that owns the
//! [`DataService`] and sends back one [`ServiceResponse`] per request.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use vxt_service::DataService;

use crate::request::{ServiceResponse, TicketedRequest, respond};

/// Sink for outgoing service requests.
pub trait Dispatcher {
    fn dispatch(&mut self, request: TicketedRequest);
}

/// Collects requests without running them. Tests drain and answer them by hand.
impl Dispatcher for Vec<TicketedRequest> {
    fn dispatch(&mut self, request: TicketedRequest) {
        self.push(request);
    }
}

/// Message sent to the worker thread.
enum ThreadMessage {
    Request(TicketedRequest),
    Shutdown,
}

/// Owns the service worker thread and its channels.
pub struct ServiceWorker {
    request_tx: Sender<ThreadMessage>,
    response_rx: Receiver<ServiceResponse>,
    thread_handle: Option<JoinHandle<()>>,
    /// Requests sent but not yet answered
    pending: usize,
}

impl ServiceWorker {
    /// Spawn the worker thread around `service`.
    pub fn spawn(service: Box<dyn DataService>) -> std::io::Result<Self> {
        let (request_tx, request_rx) = mpsc::channel::<ThreadMessage>();
        let (response_tx, response_rx) = mpsc::channel::<ServiceResponse>();

        let thread_handle = thread::Builder::new()
            .name("vxt-service".to_string())
            .spawn(move || {
                log::info!("Service worker thread started");
                Self::thread_loop(service.as_ref(), request_rx, response_tx);
                log::info!("Service worker thread exiting");
            })?;

        Ok(Self {
            request_tx,
            response_rx,
            thread_handle: Some(thread_handle),
            pending: 0,
        })
    }

    fn thread_loop(
        service: &dyn DataService,
        request_rx: Receiver<ThreadMessage>,
        response_tx: Sender<ServiceResponse>,
    ) {
        loop {
            match request_rx.recv() {
                Ok(ThreadMessage::Request(request)) => {
                    log::debug!("Running {:?}", request.ticket);
                    if response_tx.send(respond(service, request)).is_err() {
                        log::warn!("Response channel closed, service worker exiting");
                        break;
                    }
                }
                Ok(ThreadMessage::Shutdown) => {
                    log::debug!("Received shutdown signal");
                    break;
                }
                Err(_) => {
                    log::debug!("Request channel closed, service worker exiting");
                    break;
                }
            }
        }
    }

    /// Take one finished response, if any. Non-blocking.
    pub fn take_one_result(&mut self) -> Option<ServiceResponse> {
        match self.response_rx.try_recv() {
            Ok(response) => {
                self.pending = self.pending.saturating_sub(1);
                Some(response)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                log::warn!("Service worker disconnected");
                None
            }
        }
    }

    /// Wait up to `timeout` for the next response.
    pub fn wait_one_result(&mut self, timeout: Duration) -> Option<ServiceResponse> {
        match self.response_rx.recv_timeout(timeout) {
            Ok(response) => {
                self.pending = self.pending.saturating_sub(1);
                Some(response)
            }
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                log::warn!("Service worker disconnected");
                None
            }
        }
    }

    /// Number of requests still awaiting a response.
    pub fn pending_count(&self) -> usize {
        self.pending
    }
}

impl Dispatcher for ServiceWorker {
    fn dispatch(&mut self, request: TicketedRequest) {
        let ticket = request.ticket;
        if self.request_tx.send(ThreadMessage::Request(request)).is_err() {
            log::error!("Failed to send {ticket:?}: worker channel closed");
        } else {
            self.pending += 1;
        }
    }
}

impl Drop for ServiceWorker {
    fn drop(&mut self) {
        log::debug!("Shutting down service worker thread");
        let _ = self.request_tx.send(ThreadMessage::Shutdown);
        if let Some(handle) = self.thread_handle.take() {
            if let Err(e) = handle.join() {
                log::warn!("Service worker thread panicked: {e:?}");
            }
        }
    }
}
