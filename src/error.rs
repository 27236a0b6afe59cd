use serde_json::Value;

use crate::shape::Shape;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input is not valid JSON, or does not match a strictly typed field.
    /// `call` is the intrinsic call sitting where the field was expected.
    #[error("at JSON path {path} → {source}{}", call_hint(.call))]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
        call: Option<Value>,
    },

    /// Valid JSON whose shape matches none of a polymorphic property's alternatives.
    #[error("{type_name}: no alternative accepts a JSON {found}")]
    ShapeMismatch {
        type_name: &'static str,
        found: Shape,
    },

    /// Arguments to an intrinsic function are not in the documented form.
    #[error("{function}: {reason}")]
    Intrinsic {
        function: String,
        reason: String,
    },

    #[error("failed to serialize: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn call_hint(call: &Option<Value>) -> String {
    match call {
        Some(call) => format!(" (the value is the intrinsic call {call})"),
        None => String::new(),
    }
}

impl Error {
    pub(crate) fn intrinsic(function: &str, reason: impl Into<String>) -> Self {
        Error::Intrinsic { function: function.to_string(), reason: reason.into() }
    }
}
