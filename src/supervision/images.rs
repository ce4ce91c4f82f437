//! Meme pool: a plain directory, re-read on every pick so images can be
//! added or removed while the bot runs.

use std::fs;
use std::path::{Path, PathBuf};

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::warn;

/// Pick one file from `dir` at random.
///
/// Hidden files and subdirectories are ignored. A missing, unreadable or
/// empty directory logs a warning and yields `None`.
pub fn pick_random_image<R: Rng + ?Sized>(dir: &Path, rng: &mut R) -> Option<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "supervision image directory unavailable");
            return None;
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .filter(|entry| !entry.file_name().to_string_lossy().starts_with('.'))
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();

    if files.is_empty() {
        warn!(dir = %dir.display(), "supervision image directory is empty");
        return None;
    }

    // read_dir order is platform-defined; sort so a seeded rng is reproducible.
    files.sort();
    files.choose(rng).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};
    use tempfile::TempDir;

    #[test]
    fn missing_dir_yields_none() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(pick_random_image(Path::new("/nonexistent/memes"), &mut rng).is_none());
    }

    #[test]
    fn empty_dir_yields_none() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("subdir")).unwrap();
        fs::write(tmp.path().join(".gitkeep"), "").unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(pick_random_image(tmp.path(), &mut rng).is_none());
    }

    #[test]
    fn picks_only_files_from_dir() {
        let tmp = TempDir::new().unwrap();
        for name in ["a.png", "b.jpg", "c.gif"] {
            fs::write(tmp.path().join(name), b"img").unwrap();
        }
        fs::create_dir(tmp.path().join("nested")).unwrap();

        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..20 {
            let pick = pick_random_image(tmp.path(), &mut rng).unwrap();
            assert_eq!(pick.parent(), Some(tmp.path()));
            assert!(pick.is_file());
        }
    }

    #[test]
    fn same_seed_same_pick() {
        let tmp = TempDir::new().unwrap();
        for i in 0..10 {
            fs::write(tmp.path().join(format!("{i}.png")), b"img").unwrap();
        }
        let a = pick_random_image(tmp.path(), &mut StdRng::seed_from_u64(5));
        let b = pick_random_image(tmp.path(), &mut StdRng::seed_from_u64(5));
        assert_eq!(a, b);
    }
}
