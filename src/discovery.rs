use mdns_sd::{ServiceDaemon, ServiceInfo};
use std::collections::HashMap;
use std::time::Duration;
use tracing::info;

pub const SERVICE_TYPE: &str = "_rpi-remote._tcp.local.";
const WITHDRAW_WAIT: Duration = Duration::from_secs(1);

#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("mdns daemon error: {0}")]
    Mdns(#[from] mdns_sd::Error),
}

pub trait Broadcaster: Send {
    fn advertise(&mut self, name: &str, port: u16) -> Result<(), DiscoveryError>;
    fn withdraw(&mut self) -> Result<(), DiscoveryError>;
}

#[derive(Debug, Default)]
pub struct NoopBroadcaster;

impl Broadcaster for NoopBroadcaster {
    fn advertise(&mut self, _name: &str, _port: u16) -> Result<(), DiscoveryError> {
        Ok(())
    }

    fn withdraw(&mut self) -> Result<(), DiscoveryError> {
        Ok(())
    }
}

#[derive(Default)]
pub struct MdnsBroadcaster {
    daemon: Option<ServiceDaemon>,
    fullname: Option<String>,
}

impl MdnsBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Broadcaster for MdnsBroadcaster {
    fn advertise(&mut self, name: &str, port: u16) -> Result<(), DiscoveryError> {
        let daemon = ServiceDaemon::new()?;
        let properties = HashMap::from([
            ("name".to_string(), name.to_string()),
            ("version".to_string(), env!("CARGO_PKG_VERSION").to_string()),
        ]);
        let service = ServiceInfo::new(
            SERVICE_TYPE,
            name,
            &advertised_host(name),
            "",
            port,
            properties,
        )?
        .enable_addr_auto();
        let fullname = service.get_fullname().to_string();

        daemon.register(service)?;
        info!(service = %fullname, port, "mdns service registered");
        self.fullname = Some(fullname);
        self.daemon = Some(daemon);
        Ok(())
    }

    fn withdraw(&mut self) -> Result<(), DiscoveryError> {
        let Some(daemon) = self.daemon.take() else {
            return Ok(());
        };
        if let Some(fullname) = self.fullname.take() {
            let receiver = daemon.unregister(&fullname)?;
            let _ = receiver.recv_timeout(WITHDRAW_WAIT);
            info!(service = %fullname, "mdns service unregistered");
        }
        daemon.shutdown()?;
        Ok(())
    }
}

/// The `.local.` host to advertise: the machine's own hostname, so the box keeps the
/// name it already answers to, or a label derived from the service name.
pub fn advertised_host(service_name: &str) -> String {
    #[cfg(unix)]
    if let Some(label) = nix::unistd::gethostname()
        .ok()
        .and_then(|host| host.to_str().and_then(hostname_label))
    {
        return format!("{label}.local.");
    }
    host_label(service_name)
}

pub fn host_label(name: &str) -> String {
    match dns_label(name) {
        Some(label) => format!("{label}.local."),
        None => "pi-remote.local.".to_string(),
    }
}

fn hostname_label(hostname: &str) -> Option<String> {
    hostname.split('.').next().and_then(dns_label)
}

fn dns_label(raw: &str) -> Option<String> {
    let label = raw
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() { ch } else { '-' })
        .collect::<String>();
    let label = label.trim_matches('-');
    (!label.is_empty()).then(|| label.to_ascii_lowercase())
}
