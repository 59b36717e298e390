use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Writes `bytes` next to `path` first and renames over it, so readers never
/// see a half-written map or tileset.
pub fn write_bytes_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = temp_path_for(path);
    if let Err(error) = fs::write(&tmp_path, bytes) {
        let _ = fs::remove_file(&tmp_path);
        return Err(error);
    }
    replace_file(&tmp_path, path)
}

fn replace_file(tmp_path: &Path, final_path: &Path) -> io::Result<()> {
    match fs::remove_file(final_path) {
        Ok(_) => {}
        Err(error) if error.kind() == io::ErrorKind::NotFound => {}
        Err(error) => {
            let _ = fs::remove_file(tmp_path);
            return Err(error);
        }
    }

    if let Err(error) = fs::rename(tmp_path, final_path) {
        let _ = fs::remove_file(tmp_path);
        return Err(error);
    }
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("asset");
    let tmp_name = format!(".{file_name}.{}.tmp", std::process::id());
    match path.parent() {
        Some(parent) => parent.join(tmp_name),
        None => PathBuf::from(tmp_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn creates_missing_parent_directories() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("nested").join("deeper").join("map.json");

        write_bytes_atomic(&path, b"{}").expect("write");
        assert_eq!(fs::read_to_string(&path).expect("read"), "{}");
    }

    #[test]
    fn replaces_existing_file_and_leaves_no_temp_behind() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("tileset.png");
        write_bytes_atomic(&path, b"old").expect("first write");
        write_bytes_atomic(&path, b"new").expect("second write");

        assert_eq!(fs::read(&path).expect("read"), b"new");
        let leftovers = fs::read_dir(temp.path())
            .expect("list")
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }
}
