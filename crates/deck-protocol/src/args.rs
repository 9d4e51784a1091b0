//! Positional argument helpers

use crate::error::{ProtocolError, ProtocolResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Positional arguments of one invocation, checked for arity up front
pub(crate) struct Arguments<'a> {
    target: &'a str,
    values: std::vec::IntoIter<Value>,
}

impl<'a> Arguments<'a> {
    pub(crate) fn expect(target: &'a str, values: Vec<Value>, expected: usize) -> ProtocolResult<Self> {
        if values.len() != expected {
            return Err(ProtocolError::Arity {
                target: target.to_string(),
                expected,
                got: values.len(),
            });
        }
        Ok(Self {
            target,
            values: values.into_iter(),
        })
    }

    /// Deserialize the next argument
    pub(crate) fn next<T: DeserializeOwned>(&mut self) -> ProtocolResult<T> {
        let value = self.values.next().ok_or_else(|| ProtocolError::InvalidArgument {
            target: self.target.to_string(),
            message: "argument list exhausted".into(),
        })?;
        serde_json::from_value(value).map_err(|e| ProtocolError::InvalidArgument {
            target: self.target.to_string(),
            message: e.to_string(),
        })
    }
}

pub(crate) fn to_value<T: Serialize>(value: &T) -> ProtocolResult<Value> {
    Ok(serde_json::to_value(value)?)
}
