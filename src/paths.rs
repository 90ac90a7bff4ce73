use std::path::{Path, PathBuf};

/// `<stem>.cloned.<ext>` next to `design`.
pub fn out_design(design: impl AsRef<Path>) -> PathBuf {
    let design = design.as_ref();
    let stem = design
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "design".to_string());
    let name = match design.extension() {
        Some(ext) => format!("{stem}.cloned.{}", ext.to_string_lossy()),
        None => format!("{stem}.cloned"),
    };
    design.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_design() {
        assert_eq!(
            out_design("work/top.toml"),
            PathBuf::from("work/top.cloned.toml")
        );
        assert_eq!(out_design("top.json"), PathBuf::from("top.cloned.json"));
        assert_eq!(out_design("top"), PathBuf::from("top.cloned"));
    }
}
