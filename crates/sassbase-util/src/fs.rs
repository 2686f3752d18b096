use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

/// A single name found in a directory, classified by what it points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedEntry {
    pub name: String,
    pub is_file: bool,
    pub is_dir: bool,
}

/// Read a stylesheet to string, replacing invalid UTF-8 sequences with the
/// replacement character.
///
/// # Errors
/// Returns an error if the file cannot be read.
pub fn read_to_string_lossy(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// List a directory in one pass.
///
/// Symlinks are classified by their target. Names that are not valid UTF-8
/// are skipped since no stylesheet specifier can refer to them.
///
/// # Errors
/// Returns an error if the directory cannot be opened.
pub fn list_dir(path: &Path) -> io::Result<Vec<ListedEntry>> {
    let mut out = Vec::new();
    for entry in fs::read_dir(path)? {
        let Ok(entry) = entry else {
            continue;
        };
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        let Ok(mut file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_symlink() {
            match fs::metadata(entry.path()) {
                Ok(meta) => file_type = meta.file_type(),
                // Dangling link.
                Err(_) => continue,
            }
        }
        out.push(ListedEntry {
            name,
            is_file: file_type.is_file(),
            is_dir: file_type.is_dir(),
        });
    }
    Ok(out)
}

/// Atomically write bytes to a file by writing to a temp file then renaming.
///
/// Readers see either the old stylesheet or the new one, never a partial write.
///
/// # Errors
/// Returns an error if the write or rename fails.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = path.parent().unwrap_or(Path::new("."));

    // Same directory keeps the rename on one filesystem
    let mut temp_path = parent.to_path_buf();
    temp_path.push(format!(
        ".{}.tmp.{}",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("out"),
        std::process::id()
    ));

    {
        let mut file = File::create(&temp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }

    match fs::rename(&temp_path, path) {
        Ok(()) => Ok(()),
        Err(e) => {
            // Windows refuses to rename over an existing file.
            if cfg!(windows) {
                fs::copy(&temp_path, path)?;
                let _ = fs::remove_file(&temp_path);
                Ok(())
            } else {
                let _ = fs::remove_file(&temp_path);
                Err(e)
            }
        }
    }
}
