pub mod agents;
pub mod cert_manager;
pub mod healthcheck;
pub mod notifications;
pub mod stop;
