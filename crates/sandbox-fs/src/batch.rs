//! 文件内容读取：单文件严格读取与多文件部分失败读取。

use std::collections::BTreeMap;
use std::fs;
use std::io;

use serde::Serialize;
use tracing::debug;

use crate::error::{Result, SandboxError};
use crate::resolver::{PathResolver, ResolvedPath};

/// 读取完整文本内容。目标不存在时返回 `NotFound`。
pub fn read(path: &ResolvedPath) -> Result<String> {
    if !path.exists() {
        return Err(SandboxError::NotFound(path.requested().to_string()));
    }
    fs::read_to_string(path.as_path()).map_err(|source| match source.kind() {
        // 检查之后被删除。
        io::ErrorKind::NotFound => SandboxError::NotFound(path.requested().to_string()),
        _ => SandboxError::Read {
            path: path.requested().to_string(),
            source,
        },
    })
}

/// 批量读取中单个路径的结果。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReadOutcome {
    Ok { content: String },
    Failed { code: &'static str, message: String },
}

impl ReadOutcome {
    pub fn content(&self) -> Option<&str> {
        match self {
            Self::Ok { content } => Some(content),
            Self::Failed { .. } => None,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }
}

impl From<Result<String>> for ReadOutcome {
    fn from(result: Result<String>) -> Self {
        match result {
            Ok(content) => Self::Ok { content },
            Err(err) => Self::Failed {
                code: err.code(),
                message: err.to_string(),
            },
        }
    }
}

/// 以调用方原始路径字符串为键的批量读取结果。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct BatchReadResult {
    entries: BTreeMap<String, ReadOutcome>,
}

impl BatchReadResult {
    pub fn get(&self, path: &str) -> Option<&ReadOutcome> {
        self.entries.get(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ReadOutcome)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn failed_count(&self) -> usize {
        self.entries.values().filter(|o| !o.is_ok()).count()
    }
}

/// 逐个解析并读取，单个路径的失败只记录在该路径下，不影响其余路径。
pub fn read_many<S: AsRef<str>>(resolver: &PathResolver, paths: &[S]) -> BatchReadResult {
    let mut entries = BTreeMap::new();
    for raw in paths {
        let raw = raw.as_ref();
        let outcome: ReadOutcome = resolver.resolve(raw).and_then(|p| read(&p)).into();
        if let ReadOutcome::Failed { code, .. } = &outcome {
            debug!(path = %raw, code = %code, "batch entry failed");
        }
        entries.insert(raw.to_string(), outcome);
    }
    BatchReadResult { entries }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::{ReadOutcome, read, read_many};
    use crate::config::SandboxConfig;
    use crate::error::SandboxError;
    use crate::resolver::PathResolver;

    fn resolver(dir: &tempfile::TempDir) -> PathResolver {
        PathResolver::new(&SandboxConfig::new([dir.path()])).unwrap()
    }

    #[test]
    fn test_read_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("hello.txt"), "Hello, World!").unwrap();
        let resolver = resolver(&dir);

        let content = read(&resolver.resolve("hello.txt").unwrap()).unwrap();
        assert_eq!(content, "Hello, World!");
    }

    #[test]
    fn test_read_errors() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("folder")).unwrap();
        fs::write(dir.path().join("binary.bin"), [0xff, 0xfe, 0x00]).unwrap();
        let resolver = resolver(&dir);

        let err = read(&resolver.resolve("absent.txt").unwrap()).unwrap_err();
        assert!(matches!(err, SandboxError::NotFound(ref p) if p == "absent.txt"));

        let err = read(&resolver.resolve("folder").unwrap()).unwrap_err();
        assert!(matches!(err, SandboxError::Read { .. }));

        let err = read(&resolver.resolve("binary.bin").unwrap()).unwrap_err();
        assert!(matches!(err, SandboxError::Read { .. }));
    }

    #[test]
    fn test_read_many_isolates_failures() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "alpha").unwrap();
        let resolver = resolver(&dir);

        let result = read_many(&resolver, &["a.txt", "b.txt", "../escape.txt", ""]);
        assert_eq!(result.len(), 4);
        assert_eq!(result.failed_count(), 3);
        assert_eq!(result.get("a.txt").unwrap().content(), Some("alpha"));

        match result.get("b.txt").unwrap() {
            ReadOutcome::Failed { code, .. } => assert_eq!(*code, "NOT_FOUND"),
            other => panic!("unexpected outcome {other:?}"),
        }
        match result.get("../escape.txt").unwrap() {
            ReadOutcome::Failed { code, .. } => assert_eq!(*code, "OUT_OF_SANDBOX"),
            other => panic!("unexpected outcome {other:?}"),
        }
        match result.get("").unwrap() {
            ReadOutcome::Failed { code, .. } => assert_eq!(*code, "INVALID_PATH"),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_read_many_keys_are_raw_strings() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("docs/readme.md"), "# docs").unwrap();
        let resolver = resolver(&dir);

        let inputs = vec!["docs/../docs/./readme.md".to_string()];
        let result = read_many(&resolver, &inputs);
        let (key, outcome) = result.iter().next().unwrap();
        assert_eq!(key, "docs/../docs/./readme.md");
        assert!(outcome.is_ok());
    }

    #[test]
    fn test_read_many_json_shape() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "alpha").unwrap();
        let resolver = resolver(&dir);

        let result = read_many(&resolver, &["a.txt", "missing.txt"]);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["a.txt"]["status"], "ok");
        assert_eq!(json["a.txt"]["content"], "alpha");
        assert_eq!(json["missing.txt"]["status"], "failed");
        assert_eq!(json["missing.txt"]["code"], "NOT_FOUND");
    }
}
