use std::path::Path;
use std::sync::Arc;

use async_nats::{Client, ConnectOptions};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;

use crate::error::{BusError, BusResult};
use crate::message::IncomingMessage;
use crate::traits::{Bus, Subscription};

pub struct NatsBus {
    client: Client,
}

impl NatsBus {
    /// Connect to `url`. `tls://` URLs are handled transparently by
    /// `async-nats`; mutual TLS is layered on by supplying a client
    /// certificate/key pair and CA bundle when the deployment requires it.
    pub async fn connect(url: &str) -> BusResult<Self> {
        let client = async_nats::connect(url)
            .await
            .map_err(|e| BusError::Connect(e.to_string()))?;
        Ok(Self { client })
    }

    pub async fn connect_with_mtls(
        url: &str,
        client_cert: &Path,
        client_key: &Path,
        ca_cert: &Path,
    ) -> BusResult<Self> {
        let client = ConnectOptions::new()
            .add_client_certificate(client_cert.to_path_buf(), client_key.to_path_buf())
            .add_root_certificates(ca_cert.to_path_buf())
            .require_tls(true)
            .connect(url)
            .await
            .map_err(|e| BusError::Connect(e.to_string()))?;
        Ok(Self { client })
    }

    pub fn into_bus(self) -> Arc<dyn Bus> {
        Arc::new(self)
    }
}

#[async_trait]
impl Bus for NatsBus {
    async fn publish(&self, subject: &str, payload: Bytes) -> BusResult<()> {
        self.client
            .publish(subject.to_owned(), payload)
            .await
            .map_err(|e| BusError::Publish(e.to_string()))
    }

    async fn queue_subscribe(&self, subject: &str, queue: &str) -> BusResult<Box<dyn Subscription>> {
        let subscriber = self
            .client
            .queue_subscribe(subject.to_owned(), queue.to_owned())
            .await
            .map_err(|e| BusError::Subscribe(e.to_string()))?;
        Ok(Box::new(NatsSubscription {
            inner: subscriber,
            client: self.client.clone(),
        }))
    }

    async fn subscribe(&self, subject: &str) -> BusResult<Box<dyn Subscription>> {
        let subscriber = self
            .client
            .subscribe(subject.to_owned())
            .await
            .map_err(|e| BusError::Subscribe(e.to_string()))?;
        Ok(Box::new(NatsSubscription {
            inner: subscriber,
            client: self.client.clone(),
        }))
    }
}

struct NatsSubscription {
    inner: async_nats::Subscriber,
    client: Client,
}

#[async_trait]
impl Subscription for NatsSubscription {
    async fn next(&mut self) -> Option<IncomingMessage> {
        let message = self.inner.next().await?;
        let bus: Arc<dyn Bus> = Arc::new(NatsBus {
            client: self.client.clone(),
        });
        Some(IncomingMessage::new(
            message.subject.to_string(),
            message.reply.map(|s| s.to_string()),
            message.payload,
            bus,
        ))
    }
}
