//! Command-line entry points.

use tokio::io::{AsyncWrite, AsyncWriteExt as _};

use crate::prelude::*;

pub mod analyze;
pub mod schema;
pub mod serve;

/// Create a writer for a file, or for standard output if `path` is `None`.
pub async fn create_writer(
    path: Option<&Path>,
) -> Result<Box<dyn AsyncWrite + Unpin + Send + 'static>> {
    match path {
        Some(path) => {
            let file = tokio::fs::File::create(path)
                .await
                .with_context(|| format!("failed to create {:?}", path.display()))?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(tokio::io::stdout())),
    }
}

/// Write `value` as pretty-printed JSON, followed by a newline.
pub async fn write_json<T: Serialize>(path: Option<&Path>, value: &T) -> Result<()> {
    let mut wtr = create_writer(path).await?;
    let mut json = serde_json::to_string_pretty(value).context("failed to serialize JSON")?;
    json.push('\n');
    wtr.write_all(json.as_bytes())
        .await
        .context("failed to write JSON")?;
    wtr.flush().await.context("failed to flush output")?;
    Ok(())
}
