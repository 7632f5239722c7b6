use std::path::Path;
use walkdir::WalkDir;

fn files_with_ext(dir: &Path, exts: &[&str]) -> Vec<String> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|x| x.to_str())
                .is_some_and(|x| exts.contains(&x.to_ascii_lowercase().as_str()))
        })
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect()
}

/// Subtitle fonts, sorted by file name.
pub fn list_fonts(dir: &Path) -> Vec<String> {
    let mut fonts = files_with_ext(dir, &["ttf", "ttc"]);
    fonts.sort();
    fonts
}

/// Background music tracks.
pub fn list_songs(dir: &Path) -> Vec<String> {
    files_with_ext(dir, &["mp3"])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_nested_dirs_and_filters_extensions() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("extra");
        std::fs::create_dir_all(&nested).unwrap();
        for name in ["b.ttf", "a.TTC", "readme.md"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        std::fs::write(nested.join("c.ttf"), b"").unwrap();
        std::fs::write(nested.join("song.mp3"), b"").unwrap();

        assert_eq!(list_fonts(dir.path()), vec!["a.TTC", "b.ttf", "c.ttf"]);
        assert_eq!(list_songs(dir.path()), vec!["song.mp3"]);
        assert!(list_fonts(&dir.path().join("missing")).is_empty());
    }
}
