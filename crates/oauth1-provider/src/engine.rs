//! Client serialization chains.
//!
//! Pending authorization transactions live in the user's session, so the
//! consumer they belong to must be reduced to a compact, session-storable
//! value and recovered again on the way back. Applications register ordered
//! strategies for both directions; the engine walks each chain until one
//! strategy resolves.
//!
//! # Example
//!
//! ```ignore
//! use oauth1_provider::{Engine, Serialization, Deserialization};
//! use serde_json::{Value, json};
//!
//! let engine = Engine::builder()
//!     .serialize_client(|client: &Value| -> ProviderResult<Serialization> {
//!         Ok(Serialization::Serialized(client["id"].clone()))
//!     })
//!     .deserialize_client(|id: &Value| -> ProviderResult<Deserialization> {
//!         // look up the consumer by id; Deserialization::Revoked when the
//!         // registration has since been deleted
//!         Ok(Deserialization::Client(json!({ "id": id })))
//!     })
//!     .build();
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{ProviderError, ProviderResult};

/// Result of one serialization strategy.
#[derive(Debug, Clone, PartialEq)]
pub enum Serialization {
    /// The strategy produced the session-storable form; the chain stops.
    Serialized(Value),
    /// The strategy does not handle this client; try the next one.
    Pass,
}

/// Result of one deserialization strategy.
#[derive(Debug, Clone, PartialEq)]
pub enum Deserialization {
    /// The strategy recovered the client; the chain stops.
    Client(Value),
    /// The stored form was recognized but the identity no longer exists
    /// (deauthorized since the transaction was created). The chain stops;
    /// later strategies are not consulted.
    Revoked,
    /// The strategy does not recognize this stored form; try the next one.
    Pass,
}

/// A strategy converting a client object into its session-storable form.
#[async_trait]
pub trait SerializeClient: Send + Sync {
    /// Attempts to serialize `client`.
    ///
    /// # Errors
    ///
    /// Returns an error if the strategy recognizes the client but cannot
    /// serialize it; the chain stops and the error propagates.
    async fn serialize(&self, client: &Value) -> ProviderResult<Serialization>;
}

/// A strategy recovering a client object from its session-storable form.
#[async_trait]
pub trait DeserializeClient: Send + Sync {
    /// Attempts to deserialize `obj`.
    ///
    /// # Errors
    ///
    /// Returns an error if the strategy recognizes the stored form but the
    /// lookup fails; the chain stops and the error propagates.
    async fn deserialize(&self, obj: &Value) -> ProviderResult<Deserialization>;
}

#[async_trait]
impl<F> SerializeClient for F
where
    F: Fn(&Value) -> ProviderResult<Serialization> + Send + Sync,
{
    async fn serialize(&self, client: &Value) -> ProviderResult<Serialization> {
        (self)(client)
    }
}

#[async_trait]
impl<F> DeserializeClient for F
where
    F: Fn(&Value) -> ProviderResult<Deserialization> + Send + Sync,
{
    async fn deserialize(&self, obj: &Value) -> ProviderResult<Deserialization> {
        (self)(obj)
    }
}

/// The provider engine: the client serialization chains.
///
/// Built once at startup via [`Engine::builder`] and shared by reference with
/// every endpoint. The chains are read-only after construction; any number of
/// in-flight requests may traverse them concurrently.
pub struct Engine {
    serializers: Vec<Arc<dyn SerializeClient>>,
    deserializers: Vec<Arc<dyn DeserializeClient>>,
}

impl Engine {
    /// Creates a builder for registering serialization strategies.
    #[must_use]
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Serializes a client through the registered chain.
    ///
    /// Strategies run in registration order. The first to yield
    /// [`Serialization::Serialized`] resolves the operation; a strategy
    /// error stops the chain and propagates.
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error if every strategy passes (or none is
    /// registered).
    pub async fn serialize_client(&self, client: &Value) -> ProviderResult<Value> {
        for serializer in &self.serializers {
            match serializer.serialize(client).await? {
                Serialization::Serialized(obj) => return Ok(obj),
                Serialization::Pass => continue,
            }
        }
        Err(ProviderError::configuration(
            "failed to serialize client: no client serializer registered",
        ))
    }

    /// Deserializes a client through the registered chain.
    ///
    /// Returns `Ok(None)` when a strategy reports the identity as revoked:
    /// the stored form was valid when the session was established, but the
    /// client has since been deauthorized.
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error if every strategy passes (or none is
    /// registered).
    pub async fn deserialize_client(&self, obj: &Value) -> ProviderResult<Option<Value>> {
        for deserializer in &self.deserializers {
            match deserializer.deserialize(obj).await? {
                Deserialization::Client(client) => return Ok(Some(client)),
                Deserialization::Revoked => return Ok(None),
                Deserialization::Pass => continue,
            }
        }
        Err(ProviderError::configuration(
            "failed to deserialize client: no client deserializer registered",
        ))
    }

    /// Number of registered serialization strategies.
    #[must_use]
    pub fn serializer_count(&self) -> usize {
        self.serializers.len()
    }

    /// Number of registered deserialization strategies.
    #[must_use]
    pub fn deserializer_count(&self) -> usize {
        self.deserializers.len()
    }
}

/// Builder assembling an immutable [`Engine`].
#[derive(Default)]
pub struct EngineBuilder {
    serializers: Vec<Arc<dyn SerializeClient>>,
    deserializers: Vec<Arc<dyn DeserializeClient>>,
}

impl EngineBuilder {
    /// Appends a serialization strategy to the chain.
    #[must_use]
    pub fn serialize_client(mut self, strategy: impl SerializeClient + 'static) -> Self {
        self.serializers.push(Arc::new(strategy));
        self
    }

    /// Appends a deserialization strategy to the chain.
    #[must_use]
    pub fn deserialize_client(mut self, strategy: impl DeserializeClient + 'static) -> Self {
        self.deserializers.push(Arc::new(strategy));
        self
    }

    /// Freezes the chains into an [`Engine`].
    #[must_use]
    pub fn build(self) -> Arc<Engine> {
        Arc::new(Engine {
            serializers: self.serializers,
            deserializers: self.deserializers,
        })
    }
}
