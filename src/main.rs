//! A tiny smoke-test binary exercising the library directly. Not a product
//! frontend — any real frontend lives outside this crate and talks to
//! [`Registry`] directly.

use inkdb::{EngineConfig, Registry, RegistryError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Serialize, Deserialize)]
struct Greeting {
    message: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let config = EngineConfig {
        max_rows_per_segment: 1000,
        root: PathBuf::from("data"),
    };

    let mut registry = Registry::open(config)?;
    match registry.create_table::<Greeting>("greetings") {
        Ok(()) | Err(RegistryError::TableExists(_)) => {}
        Err(e) => return Err(e.into()),
    }

    let key = registry.append(
        "greetings",
        &Greeting {
            message: "hello, inkdb!".to_string(),
        },
    )?;
    registry.commit()?;

    let (values, keys) = registry.get::<Greeting>("greetings", key, key)?;
    println!("stored at {}: {:?}", keys[0], values[0]);
    Ok(())
}
