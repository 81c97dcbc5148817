//! Out-of-process AprilTag detection.
//!
//! The gateway never looks at camera frames itself.  Package localisation is
//! delegated to an external script that grabs an image, finds the AprilTag
//! and prints the package's center, distance and tag id as one JSON object
//! on stdout.  This module wraps that collaborator behind the [`Detector`]
//! trait so handlers stay testable without a camera or a Python runtime.

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;
use tokio::process::Command;
use tracing::debug;

use jetgate_types::{Detection, GateError};

/// A single detection capability: hand over the request payload, get the
/// located package back.
#[async_trait]
pub trait Detector: Send + Sync {
    async fn detect(&self, request: &Value) -> Result<Detection, GateError>;
}

/// Production [`Detector`]: spawns the configured script as a child process
/// and parses its stdout.
pub struct ScriptDetector {
    interpreter: String,
    script: PathBuf,
}

impl ScriptDetector {
    pub fn new(script: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: "python3".to_string(),
            script: script.into(),
        }
    }

    /// Override the interpreter (builder-style).  Used by tests to run
    /// shell stand-ins instead of Python.
    pub fn with_interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.interpreter = interpreter.into();
        self
    }
}

#[async_trait]
impl Detector for ScriptDetector {
    async fn detect(&self, request: &Value) -> Result<Detection, GateError> {
        let output = Command::new(&self.interpreter)
            .arg(&self.script)
            .arg(request.to_string())
            .output()
            .await
            .map_err(|e| {
                GateError::Detection(format!("failed to spawn {}: {e}", self.interpreter))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GateError::Detection(format!(
                "detector exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let detection: Detection = serde_json::from_slice(&output.stdout)
            .map_err(|e| GateError::Detection(format!("unparseable detector output: {e}")))?;
        debug!(id = detection.id, distance = detection.distance, "detection complete");
        Ok(detection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[cfg(unix)]
    #[tokio::test]
    async fn detect_parses_the_script_output() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let script = dir.path().join("detect.sh");
        std::fs::write(
            &script,
            "echo '{\"id\":3,\"distance\":41.5,\"center\":[120.0,88.0]}'\n",
        )
        .expect("write script");

        let detector = ScriptDetector::new(&script).with_interpreter("sh");
        let detection = detector.detect(&json!({})).await.expect("detection");
        assert_eq!(detection.id, 3);
        assert_eq!(detection.distance, 41.5);
        assert_eq!(detection.center, [120.0, 88.0]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn script_failure_surfaces_as_detection_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let script = dir.path().join("fail.sh");
        std::fs::write(&script, "echo 'no tag in view' >&2\nexit 1\n").expect("write script");

        let detector = ScriptDetector::new(&script).with_interpreter("sh");
        let err = detector.detect(&json!({})).await.unwrap_err();
        assert!(matches!(err, GateError::Detection(_)));
        assert!(err.to_string().contains("no tag in view"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn malformed_output_surfaces_as_detection_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let script = dir.path().join("garbage.sh");
        std::fs::write(&script, "echo 'not json'\n").expect("write script");

        let detector = ScriptDetector::new(&script).with_interpreter("sh");
        let err = detector.detect(&json!({})).await.unwrap_err();
        assert!(matches!(err, GateError::Detection(_)));
    }

    #[tokio::test]
    async fn missing_interpreter_surfaces_as_detection_error() {
        let detector =
            ScriptDetector::new("detect.py").with_interpreter("definitely-not-a-binary");
        let err = detector.detect(&json!({})).await.unwrap_err();
        assert!(matches!(err, GateError::Detection(_)));
    }
}
