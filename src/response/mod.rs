//! Response approval and field exposure.
//!
//! Every value that leaves the process as a response body must either carry
//! the [`Approved`] capability or travel inside the bypass capsule. Approved
//! values are serialized through a single routine that consults the type's
//! exposure descriptor, so a field that is not on the allow-list never
//! reaches the wire even when it is present on the in-memory object.

use serde_json::{Map, Value};

/// Capability marking a type as eligible to become a response body.
///
/// `exposed_fields` is the per-type exposure descriptor: `Some(list)` is an
/// allow-list applied to every serialized object; `None` means the type
/// declares no annotations and every field is exposed.
pub trait Approved: Send + Sync {
    fn exposed_fields(&self) -> Option<&'static [&'static str]>;

    /// Full serialization of the in-memory object, before exposure filtering.
    fn to_value(&self) -> Result<Value, serde_json::Error>;

    fn type_name(&self) -> &'static str;
}

/// Implement [`Approved`] for a `Serialize` type.
///
/// With a field list the type serializes through the allow-list strategy;
/// without one, every field is exposed.
#[macro_export]
macro_rules! approve_response {
    ($ty:ty) => {
        impl $crate::response::Approved for $ty {
            fn exposed_fields(&self) -> Option<&'static [&'static str]> {
                None
            }
            fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> {
                serde_json::to_value(self)
            }
            fn type_name(&self) -> &'static str {
                stringify!($ty)
            }
        }
    };
    ($ty:ty, fields = [$($field:literal),+ $(,)?]) => {
        impl $crate::response::Approved for $ty {
            fn exposed_fields(&self) -> Option<&'static [&'static str]> {
                Some(&[$($field),+])
            }
            fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> {
                serde_json::to_value(self)
            }
            fn type_name(&self) -> &'static str {
                stringify!($ty)
            }
        }
    };
}

/// Accumulated response body, inspected once by the contract middleware.
pub enum Body {
    /// Marker-carrying value, serialized through exposure rules.
    Approved(Box<dyn Approved>),
    /// Pre-shaped payload passed through unserialized. The single sanctioned
    /// escape hatch, e.g. for mirroring an upstream error payload verbatim.
    Bypass(Value),
    /// Ad-hoc payload without approval; rejected at the contract boundary.
    Unchecked { type_name: String, value: Value },
}

impl std::fmt::Debug for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Body::Approved(v) => write!(f, "Approved({})", v.type_name()),
            Body::Bypass(_) => write!(f, "Bypass"),
            Body::Unchecked { type_name, .. } => write!(f, "Unchecked({})", type_name),
        }
    }
}

/// Serialize an approved value, applying its exposure descriptor.
///
/// The allow-list applies to the top-level object, or to each element when
/// the value serializes to an array of objects. Types without a descriptor
/// are passed through whole.
pub fn serialize_approved(value: &dyn Approved) -> Result<Value, serde_json::Error> {
    let raw = value.to_value()?;
    Ok(match value.exposed_fields() {
        None => raw,
        Some(fields) => apply_exposure(raw, fields),
    })
}

fn apply_exposure(value: Value, fields: &[&str]) -> Value {
    match value {
        Value::Object(obj) => Value::Object(filter_object(obj, fields)),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| apply_exposure(item, fields))
                .collect(),
        ),
        other => other,
    }
}

fn filter_object(obj: Map<String, Value>, fields: &[&str]) -> Map<String, Value> {
    obj.into_iter()
        .filter(|(k, _)| fields.contains(&k.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Annotated {
        record_key: String,
        display_name: String,
    }

    approve_response!(Annotated, fields = ["display_name"]);

    #[derive(Serialize)]
    struct Plain {
        a: i32,
        b: i32,
    }

    approve_response!(Plain);

    #[test]
    fn allow_list_drops_unannotated_fields() {
        let value = serialize_approved(&Annotated {
            record_key: "kv:123".into(),
            display_name: "Alice".into(),
        })
        .unwrap();
        assert_eq!(value["display_name"], "Alice");
        assert!(value.get("record_key").is_none());
    }

    #[test]
    fn undeclared_descriptor_exposes_everything() {
        let value = serialize_approved(&Plain { a: 1, b: 2 }).unwrap();
        assert_eq!(value["a"], 1);
        assert_eq!(value["b"], 2);
    }
}
