//! Backing listener for requests that target an in-process application.
//!
//! # Design
//! A request built from an `App` has no address until it is dispatched. At
//! dispatch a `LocalServer` binds a fresh listener, the request URL is pointed
//! at it, and once the response has been captured the server is closed.
//! `close` takes the handle by value, so a listener can only be closed once.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use url::Url;

use crate::error::{FetchError, Result};

/// An axum application used as a request target.
#[derive(Clone)]
pub struct App {
    router: Router,
    bind_addr: SocketAddr,
}

impl App {
    pub fn new(router: Router) -> Self {
        Self {
            router,
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0),
        }
    }

    /// Listen on `addr` instead of an ephemeral loopback port.
    pub fn bind_to(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App").field("bind_addr", &self.bind_addr).finish()
    }
}

impl From<Router> for App {
    fn from(router: Router) -> Self {
        App::new(router)
    }
}

/// A running listener serving an `App`.
#[derive(Debug)]
pub struct LocalServer {
    addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<std::io::Result<()>>,
}

impl LocalServer {
    pub async fn start(app: &App) -> Result<Self> {
        let listener = TcpListener::bind(app.bind_addr).await?;
        let addr = listener.local_addr()?;
        let (shutdown, signal) = oneshot::channel::<()>();
        let router = app.router.clone();
        let task = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = signal.await;
                })
                .await
        });
        tracing::debug!(%addr, "backing listener started");
        Ok(Self {
            addr,
            shutdown,
            task,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn base_url(&self) -> String {
        server_address(self.addr)
    }

    /// Point `url` at this listener, keeping path, query and userinfo.
    pub fn retarget(&self, url: &mut Url) -> Result<()> {
        let base = Url::parse(&self.base_url())?;
        url.set_scheme(base.scheme())
            .map_err(|_| FetchError::InvalidUrl(format!("cannot retarget {url}")))?;
        url.set_host(base.host_str())?;
        url.set_port(base.port())
            .map_err(|_| FetchError::InvalidUrl(format!("cannot set port on {url}")))?;
        Ok(())
    }

    /// Stop accepting connections and wait for the serve task to finish.
    pub async fn close(self) -> Result<()> {
        let _ = self.shutdown.send(());
        match self.task.await {
            Ok(served) => served?,
            Err(join) => {
                return Err(FetchError::Server(std::io::Error::other(join.to_string())));
            }
        }
        tracing::debug!(addr = %self.addr, "backing listener closed");
        Ok(())
    }
}

/// Base URL for a bound address. Wildcard addresses are not routable, so
/// they are replaced with the IPv4 loopback.
pub fn server_address(addr: SocketAddr) -> String {
    let ip = if addr.ip().is_unspecified() {
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    } else {
        addr.ip()
    };
    format!("http://{}", SocketAddr::new(ip, addr.port()))
}
