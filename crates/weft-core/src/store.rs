use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;
use ulid::Ulid;

use crate::stack::{is_valid_name, AttentionStack};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Stack file IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode stack file: {0}")]
    Decode(serde_json::Error),
    #[error("Failed to encode stack: {0}")]
    Encode(serde_json::Error),
    #[error("stack file already exists (concurrent access?): {0}")]
    Concurrent(PathBuf),
    #[error(transparent)]
    Stack(#[from] crate::stack::StackError),
}

/// Serialization configuration, passed in explicitly by the caller rather
/// than held in process-wide state.
#[derive(Debug, Clone, Copy)]
pub struct Codec {
    pub pretty: bool,
}

impl Default for Codec {
    fn default() -> Self {
        Self { pretty: true }
    }
}

impl Codec {
    pub fn encode(&self, stack: &AttentionStack) -> Result<String, StoreError> {
        let raw = if self.pretty {
            serde_json::to_string_pretty(stack)
        } else {
            serde_json::to_string(stack)
        };
        raw.map_err(StoreError::Encode)
    }

    pub fn decode(&self, raw: &str) -> Result<AttentionStack, StoreError> {
        serde_json::from_str(raw).map_err(StoreError::Decode)
    }
}

/// Name for a fresh stack backed by `path`: the file stem when it satisfies
/// the name grammar, a generated id otherwise.
pub fn stack_name_for_path(path: &Path) -> String {
    let stem = path.file_stem().and_then(|stem| stem.to_str()).unwrap_or("");
    if is_valid_name(stem) {
        stem.to_string()
    } else {
        Ulid::new().to_string().to_lowercase()
    }
}

/// Load the stack at `path`. A missing or empty file yields a fresh,
/// empty-stack instance named after the file.
pub fn load_stack(path: &Path, codec: &Codec) -> Result<AttentionStack, StoreError> {
    if !path.exists() {
        return Ok(AttentionStack::new(&stack_name_for_path(path))?);
    }
    let raw = fs::read_to_string(path)?;
    if raw.trim().is_empty() {
        return Ok(AttentionStack::new(&stack_name_for_path(path))?);
    }
    codec.decode(&raw)
}

pub fn save_stack(path: &Path, stack: &AttentionStack, codec: &Codec) -> Result<(), StoreError> {
    let raw = codec.encode(stack)?;
    fs::write(path, raw)?;
    Ok(())
}

/// Create-time exclusivity check, the only concurrency guard there is:
/// losing the create race means another invocation owns the file.
pub fn create_stack_file(path: &Path) -> Result<(), StoreError> {
    match fs::OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(_) => Ok(()),
        Err(err) if err.kind() == ErrorKind::AlreadyExists => {
            Err(StoreError::Concurrent(path.to_path_buf()))
        }
        Err(err) => Err(StoreError::Io(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_a_fresh_stack_named_after_the_stem() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("2026-08-07.weft");
        let stack = load_stack(&path, &Codec::default()).expect("load");
        assert_eq!(stack.name(), "2026-08-07");
        assert!(!stack.is_running());
        assert_eq!(stack.thread_count(), 0);
    }

    #[test]
    fn empty_file_yields_a_fresh_stack_too() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("daily.weft");
        create_stack_file(&path).expect("create");
        let stack = load_stack(&path, &Codec::default()).expect("load");
        assert_eq!(stack.name(), "daily");
    }

    #[test]
    fn invalid_stem_falls_back_to_a_generated_name() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("My Stacks!.weft");
        let stack = load_stack(&path, &Codec::default()).expect("load");
        assert!(is_valid_name(stack.name()), "generated name {:?}", stack.name());
        assert_eq!(stack.name().len(), 26);
    }

    #[test]
    fn round_trip_preserves_records_logs_and_focus_order() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("daily.weft");
        let codec = Codec::default();

        let mut stack = AttentionStack::new("daily").expect("stack");
        stack.spawn("build").expect("spawn");
        stack.interrupt("fix-bug").expect("interrupt");
        stack.interrupt("review").expect("interrupt");
        stack.exit(Some("fix-bug")).expect("exit");
        stack.pause();

        save_stack(&path, &stack, &codec).expect("save");
        let loaded = load_stack(&path, &codec).expect("load");
        assert_eq!(loaded, stack);
        assert!(loaded.is_paused());
        assert_eq!(loaded.status_line(), "RUN: PAUSED < review < build");
    }

    #[test]
    fn compact_codec_round_trips_as_well() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("daily.weft");
        let codec = Codec { pretty: false };

        let mut stack = AttentionStack::new("daily").expect("stack");
        stack.interrupt("solo").expect("interrupt");
        save_stack(&path, &stack, &codec).expect("save");

        let raw = std::fs::read_to_string(&path).expect("read");
        assert!(!raw.contains('\n'));
        assert_eq!(load_stack(&path, &codec).expect("load"), stack);
    }

    #[test]
    fn serialized_file_is_self_describing() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("daily.weft");
        let mut stack = AttentionStack::new("daily").expect("stack");
        stack.spawn("build").expect("spawn");
        save_stack(&path, &stack, &Codec::default()).expect("save");

        let raw = std::fs::read_to_string(&path).expect("read");
        assert!(raw.contains("\"name\""));
        assert!(raw.contains("\"threads\""));
        assert!(raw.contains("\"attention\""));
        assert!(raw.contains("build"));
    }

    #[test]
    fn create_refuses_an_existing_file() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("daily.weft");
        create_stack_file(&path).expect("create");
        match create_stack_file(&path) {
            Err(StoreError::Concurrent(reported)) => assert_eq!(reported, path),
            other => panic!("expected Concurrent, got {other:?}"),
        }
    }

    #[test]
    fn garbage_fails_to_decode() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("daily.weft");
        std::fs::write(&path, "not json at all").expect("write");
        assert!(matches!(
            load_stack(&path, &Codec::default()),
            Err(StoreError::Decode(_))
        ));
    }
}
