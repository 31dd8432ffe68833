//! Standard APIs we use everywhere.

#[allow(unused_imports)]
pub use std::path::{Path, PathBuf};

#[allow(unused_imports)]
pub use anyhow::{Context as _, Result, anyhow};
pub use async_trait::async_trait;
pub use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
pub use serde_json::{Map, Value, json};
#[allow(unused_imports)]
pub use tracing::{debug, error, info, instrument, trace, warn};
