//! Kafka broker driver (feature `kafka`).
//!
//! One dedicated consumer is created per partition and pinned to it with an
//! explicit assignment, so no broker-side consumer group coordination takes
//! place. Offsets are never committed; every cursor opens at the configured
//! [`StartOffset`] and the group id is unique per process.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use rdkafka::consumer::{BaseConsumer, Consumer, StreamConsumer};
use rdkafka::error::KafkaError;
use rdkafka::{ClientConfig, Message, Offset, TopicPartitionList};
use tokio::sync::{watch, Mutex};

use crate::auth::BrokerAuth;
use crate::broker::{BrokerClient, PartitionStream, RawRecord, StartOffset};
use crate::error::{ConsumerError, Result};

const METADATA_TIMEOUT: Duration = Duration::from_secs(10);

pub struct KafkaBroker {
    config: Mutex<ClientConfig>,
    closed: watch::Sender<bool>,
}

impl KafkaBroker {
    pub fn new(bootstrap_servers: impl Into<String>) -> Self {
        let mut config = ClientConfig::new();
        config.set("bootstrap.servers", bootstrap_servers.into());
        config.set("enable.auto.commit", "false");
        config.set("session.timeout.ms", "6000");
        config.set("auto.offset.reset", "smallest");
        // Unique per process: cursors are pinned assignments, not a
        // coordinated consumer group.
        config.set("group.id", format!("fluxgate-{}", std::process::id()));

        let (closed, _) = watch::channel(false);
        Self {
            config: Mutex::new(config),
            closed,
        }
    }

    async fn client_config(&self) -> ClientConfig {
        self.config.lock().await.clone()
    }
}

#[async_trait]
impl BrokerClient for KafkaBroker {
    /// Validates ticket credentials and folds them into the client config.
    ///
    /// The broker itself only sees the credentials once a connection is made,
    /// so a rejection surfaces from the first metadata call.
    async fn authenticate(&self, auth: &BrokerAuth) -> Result<()> {
        auth.validate()?;
        let ticket = match auth {
            BrokerAuth::None => return Ok(()),
            BrokerAuth::Ticket(ticket) => ticket,
        };

        let mut config = self.config.lock().await;
        config.set("security.protocol", "SASL_PLAINTEXT");
        config.set("sasl.mechanism", ticket.mechanism.as_str());
        if ticket.mechanism.eq_ignore_ascii_case("GSSAPI") {
            config.set("sasl.kerberos.service.name", ticket.service_name.as_str());
            config.set(
                "sasl.kerberos.principal",
                format!("{}@{}", ticket.principal, ticket.realm),
            );
            config.set("sasl.kerberos.keytab", ticket.config_path.as_str());
        } else {
            config.set("sasl.username", ticket.principal.as_str());
            config.set("sasl.password", ticket.secret.as_str());
        }
        Ok(())
    }

    async fn topics(&self) -> Result<Vec<String>> {
        let config = self.client_config().await;
        let names = tokio::task::spawn_blocking(move || -> std::result::Result<_, KafkaError> {
            let probe: BaseConsumer = config.create()?;
            let metadata = probe.fetch_metadata(None, METADATA_TIMEOUT)?;
            Ok(metadata
                .topics()
                .iter()
                .map(|topic| topic.name().to_string())
                .collect::<Vec<String>>())
        })
        .await
        .map_err(|e| ConsumerError::Broker(format!("metadata task failed: {e}")))?
        .map_err(|e| ConsumerError::Broker(e.to_string()))?;
        Ok(names)
    }

    async fn partitions(&self, topic: &str) -> Result<Vec<i32>> {
        let config = self.client_config().await;
        let topic_name = topic.to_string();
        let ids = tokio::task::spawn_blocking(move || -> std::result::Result<_, KafkaError> {
            let probe: BaseConsumer = config.create()?;
            let metadata = probe.fetch_metadata(Some(&topic_name), METADATA_TIMEOUT)?;
            let mut ids: Vec<i32> = metadata
                .topics()
                .iter()
                .flat_map(|topic| topic.partitions().iter().map(|partition| partition.id()))
                .collect();
            ids.sort_unstable();
            Ok(ids)
        })
        .await
        .map_err(|e| ConsumerError::Broker(format!("metadata task failed: {e}")))?
        .map_err(|e| ConsumerError::Broker(e.to_string()))?;
        if ids.is_empty() {
            return Err(ConsumerError::Broker(format!("unknown topic '{topic}'")));
        }
        Ok(ids)
    }

    async fn consume(
        &self,
        topic: &str,
        partition: i32,
        start: StartOffset,
    ) -> Result<Box<dyn PartitionStream>> {
        let config = self.client_config().await;
        let consumer: StreamConsumer = config
            .create()
            .map_err(|e| ConsumerError::Broker(e.to_string()))?;

        let offset = match start {
            StartOffset::Oldest => Offset::Beginning,
            StartOffset::Newest => Offset::End,
        };
        let mut assignment = TopicPartitionList::new();
        assignment
            .add_partition_offset(topic, partition, offset)
            .map_err(|e| ConsumerError::Broker(e.to_string()))?;
        consumer
            .assign(&assignment)
            .map_err(|e| ConsumerError::Broker(e.to_string()))?;

        Ok(Box::new(KafkaStream {
            consumer,
            closed: self.closed.subscribe(),
        }))
    }

    async fn close(&self) -> Result<()> {
        self.closed.send_modify(|flag| *flag = true);
        Ok(())
    }
}

struct KafkaStream {
    consumer: StreamConsumer,
    closed: watch::Receiver<bool>,
}

#[async_trait]
impl PartitionStream for KafkaStream {
    async fn next(&mut self) -> Result<Option<RawRecord>> {
        if *self.closed.borrow() {
            return Err(ConsumerError::Broker("broker connection closed".to_string()));
        }
        tokio::select! {
            received = self.consumer.recv() => match received {
                Ok(message) => Ok(Some(RawRecord {
                    topic: message.topic().to_string(),
                    partition: message.partition(),
                    offset: message.offset(),
                    key: message.key().map(Bytes::copy_from_slice),
                    value: message.payload().map(Bytes::copy_from_slice).unwrap_or_default(),
                })),
                Err(KafkaError::PartitionEOF(_)) => Ok(None),
                Err(e) => Err(ConsumerError::Broker(e.to_string())),
            },
            _ = self.closed.changed() => {
                Err(ConsumerError::Broker("broker connection closed".to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TicketAuth;

    fn ticket(mechanism: &str) -> TicketAuth {
        TicketAuth {
            mechanism: mechanism.to_string(),
            config_path: "/etc/broker/client.keytab".to_string(),
            service_name: "kafka".to_string(),
            principal: "svc-bridge".to_string(),
            secret: "s3cret".to_string(),
            realm: "EXAMPLE.ORG".to_string(),
        }
    }

    #[tokio::test]
    async fn test_base_config_disables_commits() {
        let broker = KafkaBroker::new("localhost:9092");
        let config = broker.client_config().await;
        assert_eq!(config.get("bootstrap.servers"), Some("localhost:9092"));
        assert_eq!(config.get("enable.auto.commit"), Some("false"));
        assert!(config.get("group.id").unwrap().starts_with("fluxgate-"));
    }

    #[tokio::test]
    async fn test_gssapi_ticket_maps_to_kerberos_settings() {
        let broker = KafkaBroker::new("localhost:9092");
        broker
            .authenticate(&BrokerAuth::Ticket(ticket("GSSAPI")))
            .await
            .unwrap();

        let config = broker.client_config().await;
        assert_eq!(config.get("security.protocol"), Some("SASL_PLAINTEXT"));
        assert_eq!(config.get("sasl.mechanism"), Some("GSSAPI"));
        assert_eq!(config.get("sasl.kerberos.service.name"), Some("kafka"));
        assert_eq!(
            config.get("sasl.kerberos.principal"),
            Some("svc-bridge@EXAMPLE.ORG")
        );
        assert_eq!(
            config.get("sasl.kerberos.keytab"),
            Some("/etc/broker/client.keytab")
        );
    }

    #[tokio::test]
    async fn test_plain_ticket_maps_to_username_password() {
        let broker = KafkaBroker::new("localhost:9092");
        broker
            .authenticate(&BrokerAuth::Ticket(ticket("PLAIN")))
            .await
            .unwrap();

        let config = broker.client_config().await;
        assert_eq!(config.get("sasl.mechanism"), Some("PLAIN"));
        assert_eq!(config.get("sasl.username"), Some("svc-bridge"));
        assert_eq!(config.get("sasl.password"), Some("s3cret"));
    }

    #[tokio::test]
    async fn test_incomplete_ticket_is_rejected() {
        let broker = KafkaBroker::new("localhost:9092");
        let mut incomplete = ticket("GSSAPI");
        incomplete.realm = String::new();

        let err = broker
            .authenticate(&BrokerAuth::Ticket(incomplete))
            .await
            .unwrap_err();
        assert!(matches!(err, ConsumerError::AuthenticationFailed(_)));
    }
}
