// src/params/mod.rs — Parameter-definition loading

pub mod expr;
pub mod parser;

use std::path::Path;

use crate::core::types::ParameterDefinition;
use crate::infra::errors::Result;
pub use parser::{DefinitionTextParser, RecordFailure};

/// Expected file name of a GCC parameter-definition source.
pub const DEFINITIONS_FILE_NAME: &str = "params.def";

/// Read and parse a definitions file. A file that does not look like a
/// parameter-definition source is still parsed, with a warning.
pub async fn load_definitions(path: &Path) -> Result<Vec<ParameterDefinition>> {
    if !path.to_string_lossy().ends_with(DEFINITIONS_FILE_NAME) {
        tracing::warn!(
            "{} does not look like a {} file; parsing anyway",
            path.display(),
            DEFINITIONS_FILE_NAME
        );
    }

    let text = tokio::fs::read_to_string(path).await?;
    let defs = DefinitionTextParser::new().parse(&text);
    tracing::info!(
        "Loaded {} parameter definitions from {}",
        defs.len(),
        path.display()
    );
    Ok(defs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::errors::DiscoveryError;

    #[tokio::test]
    async fn test_load_definitions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.def");
        std::fs::write(
            &path,
            "DEFPARAM(max-foo, \"desc\", 100, 0, 0)\nDEFPARAM(broken)\n",
        )
        .unwrap();

        let defs = load_definitions(&path).await.unwrap();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "max-foo");
    }

    #[tokio::test]
    async fn test_unusual_file_name_still_parsed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("defs.txt");
        std::fs::write(&path, "DEFPARAM(p, \"d\", 1, 0, 4)").unwrap();
        assert_eq!(load_definitions(&path).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let err = load_definitions(Path::new("/nonexistent/params.def"))
            .await
            .unwrap_err();
        assert!(matches!(err, DiscoveryError::Io(_)));
    }
}
