// src/fetch/cache.rs

use sha2::{Digest, Sha256};
use std::{
    fs,
    io::{self, Write},
    path::PathBuf,
};
use tracing::debug;
use url::Url;

use crate::error::Result;

/// Raw payloads on disk, addressed by a hash of the request URL.
#[derive(Debug, Clone)]
pub struct PayloadCache {
    dir: PathBuf,
}

impl PayloadCache {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// `<dir>/estat-<sha256(url)>.json`
    pub fn path_for(&self, url: &Url) -> PathBuf {
        let digest = Sha256::digest(url.as_str().as_bytes());
        self.dir.join(format!("estat-{}.json", hex::encode(digest)))
    }

    pub fn load(&self, url: &Url) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(url);
        match fs::read(&path) {
            Ok(bytes) => {
                debug!(path = %path.display(), "cache hit");
                Ok(Some(bytes))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write via a temp file and rename so readers never see a partial payload.
    pub fn store(&self, url: &Url, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.path_for(url);
        let tmp_path = path.with_extension("json.tmp");
        {
            let mut tmp = fs::File::create(&tmp_path)?;
            tmp.write_all(bytes)?;
            tmp.sync_all()?;
        }
        fs::rename(&tmp_path, &path)?;
        debug!(path = %path.display(), bytes = bytes.len(), "cached payload");
        Ok(path)
    }

    /// Drop the entry for `url`, if any.
    pub fn invalidate(&self, url: &Url) -> Result<bool> {
        match fs::remove_file(self.path_for(url)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn store_load_invalidate() -> anyhow::Result<()> {
        let tmp = tempdir()?;
        let cache = PayloadCache::new(tmp.path().join("nested"))?;
        let u = url("http://testurl/getStatsData?statsDataId=1");

        assert_eq!(cache.load(&u)?, None);
        let path = cache.store(&u, b"{}")?;
        assert!(path.exists());
        assert_eq!(cache.load(&u)?, Some(b"{}".to_vec()));

        assert!(cache.invalidate(&u)?);
        assert!(!cache.invalidate(&u)?);
        assert_eq!(cache.load(&u)?, None);
        Ok(())
    }

    #[test]
    fn distinct_urls_get_distinct_files() -> anyhow::Result<()> {
        let tmp = tempdir()?;
        let cache = PayloadCache::new(tmp.path())?;
        let a = cache.path_for(&url("http://testurl/?statsDataId=1"));
        let b = cache.path_for(&url("http://testurl/?statsDataId=2"));
        assert_ne!(a, b);

        let name = a.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("estat-"));
        assert!(name.ends_with(".json"));
        // 64 hex chars between prefix and extension
        assert_eq!(name.len(), "estat-".len() + 64 + ".json".len());
        Ok(())
    }
}
