use serde::de::DeserializeOwned;

use crate::error::{InstantiateError, Result};

/// Deserialize a declaration document, naming the JSON path of any failure.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str, origin: &str) -> Result<T> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(|err| {
        let path = err.path().to_string();
        InstantiateError::Schema { message: format!("{origin}: at JSON path {path} → {}", err.into_inner()) }
    })
}
