use crate::schema;
use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use fs2::FileExt;
use redb::Database;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

pub const DB_FILE: &str = "index.redb";
pub const META_FILE: &str = "meta.toml";
pub const LOCK_FILE: &str = "LOCK";

// Written once when a directory is claimed. A format marker for offline
// tooling that reads the store directly, not configuration.
const META: &str = "\
# replidx database metadata
format = 1
app = \"replidx\"
db_kind = \"redb\"
key_schema = \"v1\"
";

/// An open index database: the redb store plus the directory lock that
/// keeps other processes out for the lifetime of the handle.
pub struct DbHandle {
    pub db_dir: PathBuf,
    pub db: Database,
    // Keep the lock file open so the lock is held until the handle drops.
    _lock_file: File,
}

/// Where a database referred to by name lives: a bare name goes under the
/// platform data directory, anything with a separator is a directory path.
pub fn resolve_db_dir(db: &str) -> Result<PathBuf> {
    let p = Path::new(db);
    if p.has_root() || p.components().nth(1).is_some() {
        return Ok(p.to_path_buf());
    }
    let proj = ProjectDirs::from("net", "replidx", "replidx")
        .context("Unable to determine platform data directory")?;
    Ok(proj.data_dir().join(db))
}

/// Open the index database in `db_dir`, claiming the directory on first
/// use.
///
/// A directory is usable in exactly two states: fresh (nothing but a
/// leftover lock file), which gets the meta marker written, or already a
/// replidx database (meta marker and store file both present). Anything
/// else is refused rather than adopted. The exclusive lock is taken before
/// any file is created, and the index table is opened once under a write
/// transaction so no later reader ever finds it missing.
pub fn open(db_dir: &Path) -> Result<DbHandle> {
    fs::create_dir_all(db_dir)
        .with_context(|| format!("Failed to create {}", db_dir.display()))?;

    let db_path = db_dir.join(DB_FILE);
    let meta_path = db_dir.join(META_FILE);
    let fresh = match (db_path.is_file(), meta_path.is_file()) {
        (true, true) => false,
        (false, false) => {
            ensure_unclaimed(db_dir)?;
            true
        }
        _ => bail!(
            "{} has one of {} and {} but not both; not opening a half-initialized database",
            db_dir.display(),
            META_FILE,
            DB_FILE
        ),
    };

    // Serializes initialization as well as use: one process at a time.
    let lock_file = lock_dir(db_dir)?;

    if fresh {
        fs::write(&meta_path, META)
            .with_context(|| format!("Failed to write {}", meta_path.display()))?;
    }

    let db = Database::create(&db_path)
        .with_context(|| format!("Failed to open redb file {}", db_path.display()))?;

    // Everything lives in the one table; create it up front.
    let tx = db.begin_write().context("begin_write() failed")?;
    tx.open_table(schema::INDEX)?;
    tx.commit().context("commit() failed")?;

    tracing::info!(db_dir = %db_dir.display(), fresh, "index database opened");

    Ok(DbHandle {
        db_dir: db_dir.to_path_buf(),
        db,
        _lock_file: lock_file,
    })
}

fn lock_dir(db_dir: &Path) -> Result<File> {
    let lock_path = db_dir.join(LOCK_FILE);
    let f = File::options()
        .create(true)
        .read(true)
        .write(true)
        .open(&lock_path)
        .with_context(|| format!("Failed to open lock file {}", lock_path.display()))?;
    f.try_lock_exclusive()
        .with_context(|| format!("Index database is in use: {}", db_dir.display()))?;
    Ok(f)
}

// A directory without our files must hold nothing but a lock file from an
// earlier run before we will write into it.
fn ensure_unclaimed(db_dir: &Path) -> Result<()> {
    for entry in fs::read_dir(db_dir)
        .with_context(|| format!("Failed to read directory {}", db_dir.display()))?
    {
        let name = entry?.file_name();
        if name != LOCK_FILE {
            bail!(
                "{} already contains {:?}; not initializing an index over foreign files",
                db_dir.display(),
                name
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn bare_names_resolve_under_the_data_dir() {
        let dir = resolve_db_dir("main").unwrap();
        assert!(dir.ends_with("main"));
        assert_ne!(dir, PathBuf::from("main"));
    }

    #[test]
    fn paths_pass_through() {
        assert_eq!(
            resolve_db_dir("/var/lib/replidx/main").unwrap(),
            PathBuf::from("/var/lib/replidx/main")
        );
        assert_eq!(resolve_db_dir("rel/main").unwrap(), PathBuf::from("rel/main"));
    }

    #[test]
    fn fresh_directory_is_claimed() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("idx");

        let handle = open(&dir).unwrap();
        assert!(dir.join(META_FILE).is_file());
        assert!(dir.join(DB_FILE).is_file());

        // Reopen after release.
        drop(handle);
        open(&dir).unwrap();
    }

    #[test]
    fn foreign_directory_is_refused() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("stray.txt"), b"not ours").unwrap();
        assert!(open(tmp.path()).is_err());
        // Refused before any of our files were dropped in.
        assert!(!tmp.path().join(LOCK_FILE).exists());
    }

    #[test]
    fn half_initialized_directory_is_refused() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(META_FILE), META).unwrap();
        assert!(open(tmp.path()).is_err());
    }
}
