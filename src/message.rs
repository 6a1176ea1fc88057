//! Typed messages and the type-erased container they travel in.
//!
//! Every message on a topic is carried as a [`DynMessage`]: the datatype
//! name, a hash of the message definition and the encoded bytes. Consumers
//! that know the concrete type call [`DynMessage::instantiate`]; consumers
//! that do not can still look at the payload through
//! [`DynMessage::to_json_value`].

use crate::error::{HistoryError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Schema hash that matches any definition.
pub const ANY_SCHEMA: &str = "*";

/// A statically-typed message.
///
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct Pose { x: f64, y: f64, theta: f64 }
///
/// impl Message for Pose {
///     const DATATYPE: &'static str = "geometry_msgs/Pose2D";
///     const DEFINITION: &'static str = "float64 x\nfloat64 y\nfloat64 theta";
/// }
/// ```
pub trait Message: Serialize + DeserializeOwned {
    /// Fully qualified type name, e.g. `std_msgs/String`.
    const DATATYPE: &'static str;

    /// Message definition text. Hashed to detect schema drift.
    const DEFINITION: &'static str = "";

    fn schema_hash() -> String {
        schema_hash(Self::DEFINITION)
    }
}

/// Hex SHA-256 of a message definition.
pub fn schema_hash(definition: &str) -> String {
    hex::encode(Sha256::digest(definition.as_bytes()))
}

/// Payload encoding format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayloadEncoding {
    Json,
    MessagePack,
}

impl Default for PayloadEncoding {
    fn default() -> Self {
        PayloadEncoding::MessagePack
    }
}

/// A message whose concrete type is only known at runtime.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynMessage {
    datatype: String,
    schema_hash: String,
    encoding: PayloadEncoding,
    data: Vec<u8>,
}

impl DynMessage {
    /// Encode a typed message with the default encoding.
    pub fn from_message<M: Message>(msg: &M) -> Result<Self> {
        Self::encode(msg, PayloadEncoding::default())
    }

    /// Encode a typed message.
    pub fn encode<M: Message>(msg: &M, encoding: PayloadEncoding) -> Result<Self> {
        let data = match encoding {
            PayloadEncoding::Json => serde_json::to_vec(msg)?,
            PayloadEncoding::MessagePack => rmp_serde::to_vec_named(msg)?,
        };

        Ok(Self {
            datatype: M::DATATYPE.to_string(),
            schema_hash: M::schema_hash(),
            encoding,
            data,
        })
    }

    /// Wrap already-encoded bytes.
    pub fn raw(
        datatype: impl Into<String>,
        schema_hash: impl Into<String>,
        encoding: PayloadEncoding,
        data: Vec<u8>,
    ) -> Self {
        Self {
            datatype: datatype.into(),
            schema_hash: schema_hash.into(),
            encoding,
            data,
        }
    }

    pub fn datatype(&self) -> &str {
        &self.datatype
    }

    pub fn schema_hash(&self) -> &str {
        &self.schema_hash
    }

    pub fn encoding(&self) -> PayloadEncoding {
        self.encoding
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Encoded payload size in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Whether this message can be instantiated as `M`.
    pub fn is<M: Message>(&self) -> bool {
        self.check_type::<M>().is_ok()
    }

    /// Decode into a concrete message type.
    ///
    /// Fails with [`HistoryError::TypeMismatch`] if the datatype differs,
    /// [`HistoryError::SchemaMismatch`] if the definition hash differs (unless
    /// either side is [`ANY_SCHEMA`]), or [`HistoryError::Deserialization`] if
    /// the bytes do not decode.
    pub fn instantiate<M: Message>(&self) -> Result<M> {
        self.check_type::<M>()?;
        self.decode()
    }

    /// Decode into a schemaless JSON value, whatever the datatype.
    pub fn to_json_value(&self) -> Result<serde_json::Value> {
        self.decode()
    }

    fn check_type<M: Message>(&self) -> Result<()> {
        if self.datatype != M::DATATYPE {
            return Err(HistoryError::TypeMismatch {
                expected: M::DATATYPE.to_string(),
                got: self.datatype.clone(),
            });
        }

        let expected = M::schema_hash();
        if self.schema_hash != ANY_SCHEMA && expected != ANY_SCHEMA && self.schema_hash != expected
        {
            return Err(HistoryError::SchemaMismatch {
                datatype: self.datatype.clone(),
                expected,
                got: self.schema_hash.clone(),
            });
        }

        Ok(())
    }

    fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        match self.encoding {
            PayloadEncoding::Json => serde_json::from_slice(&self.data)
                .map_err(|e| HistoryError::Deserialization(e.to_string())),
            PayloadEncoding::MessagePack => Ok(rmp_serde::from_slice(&self.data)?),
        }
    }
}
