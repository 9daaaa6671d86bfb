use std::path::PathBuf;

/// 相対パスをディスク上のパスへ解決する
///
/// カタログの相対パスは取り込み元のディスクラベルからの相対で、
/// 区切りは `/` と `\` のどちらもあり得る。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathContext {
    pub disk_label: String,
}

impl PathContext {
    pub fn new(disk_label: impl Into<String>) -> Self {
        Self {
            disk_label: disk_label.into(),
        }
    }

    pub fn resolve(&self, relative_path: &str) -> PathBuf {
        let mut path = PathBuf::from(label_root(&self.disk_label));
        for part in relative_path.split(['/', '\\']).filter(|p| !p.is_empty()) {
            path.push(part);
        }
        path
    }
}

/// `X:` のようなドライブ名は区切りを付けてルートにする
fn label_root(label: &str) -> String {
    let trimmed = label.trim_end_matches(['/', '\\']);
    if trimmed.is_empty() {
        return std::path::MAIN_SEPARATOR.to_string();
    }
    if trimmed.ends_with(':') {
        format!("{}{}", trimmed, std::path::MAIN_SEPARATOR)
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::MAIN_SEPARATOR;

    #[test]
    fn test_resolve_mixed_separators() {
        let ctx = PathContext::new("/mnt/archive");
        let path = ctx.resolve(r"photos\2024/img.jpg");
        assert_eq!(path, PathBuf::from("/mnt/archive/photos/2024/img.jpg"));
    }

    #[test]
    fn test_resolve_drive_label() {
        let ctx = PathContext::new("X:");
        let path = ctx.resolve("photos/img.jpg");
        let expected = format!("X:{0}photos{0}img.jpg", MAIN_SEPARATOR);
        assert_eq!(path, PathBuf::from(expected));
    }
}
