//! On-disk token cache: one JSON file per profile

use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{CachedToken, StoreError, TokenStore};
use crate::models::ApiStatus;

const CACHE_FILE_SUFFIX: &str = ".token.json";

/// Cache file layout: the token endpoint's response plus `expire_time`.
#[derive(Debug, Serialize, Deserialize)]
struct CacheRecord {
    #[serde(flatten)]
    status: ApiStatus,
    #[serde(flatten)]
    token: CachedToken,
}

/// Token store rooted at a cache directory
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    dir: PathBuf,
}

impl FileTokenStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Cache file path for a profile.
    pub fn path_for(&self, profile: &str) -> PathBuf {
        self.dir
            .join(format!("{}{}", encode_profile(profile), CACHE_FILE_SUFFIX))
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self, profile: &str) -> Result<CachedToken, StoreError> {
        let path = self.path_for(profile);

        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound { path });
            }
            Err(source) => return Err(StoreError::Read { path, source }),
        };

        match serde_json::from_slice::<CacheRecord>(&bytes) {
            Ok(record) => Ok(record.token),
            Err(source) => Err(StoreError::Corrupt { path, source }),
        }
    }

    fn save(&self, profile: &str, token: &CachedToken) -> Result<(), StoreError> {
        let stem = encode_profile(profile);
        let path = self.dir.join(format!("{}{}", stem, CACHE_FILE_SUFFIX));
        let record = CacheRecord {
            status: ApiStatus::ok(),
            token: token.clone(),
        };
        let content = serde_json::to_vec_pretty(&record).map_err(|e| StoreError::Write {
            path: path.clone(),
            source: io::Error::new(ErrorKind::InvalidData, e),
        })?;

        write_atomic(&self.dir, &stem, &path, &content)
            .map_err(|source| StoreError::Write { path, source })?;
        tracing::debug!("Token cache written for profile {}", profile);
        Ok(())
    }
}

/// Write `content` to a sibling temp file, then rename it over `path`.
///
/// Readers see either the old file or the complete new one.
fn write_atomic(dir: &Path, stem: &str, path: &Path, content: &[u8]) -> io::Result<()> {
    fs::create_dir_all(dir)?;
    let tmp = dir.join(format!(".{}.{}.tmp", stem, uuid::Uuid::new_v4()));

    let result = write_restricted(&tmp, content).and_then(|_| fs::rename(&tmp, path));
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

fn write_restricted(path: &Path, content: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(path)?;

    // Cache file contains a live bearer token
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }

    file.write_all(content)?;
    file.sync_all()
}

/// Encode a profile name as a file stem, one-to-one.
///
/// ASCII letters, digits, `-` and any non-leading `.` are kept; every other
/// byte (including `_`) becomes `_XX` in upper-case hex.
fn encode_profile(profile: &str) -> String {
    let mut stem = String::with_capacity(profile.len());
    for (i, b) in profile.bytes().enumerate() {
        match b {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' => stem.push(b as char),
            b'.' if i > 0 => stem.push('.'),
            _ => stem.push_str(&format!("_{:02X}", b)),
        }
    }
    stem
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use tokio_test::{assert_err, assert_ok};

    fn sample_token() -> CachedToken {
        CachedToken::issued("abc".to_string(), 7200, Utc::now()).unwrap()
    }

    #[test]
    fn test_save_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path());
        let token = sample_token();

        assert_ok!(store.save("Dev", &token));
        let loaded = store.load("Dev").unwrap();
        assert_eq!(loaded, token);
    }

    #[test]
    fn test_load_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path());

        let err = assert_err!(store.load("Dev"));
        assert!(matches!(err, StoreError::NotFound { .. }), "got {:?}", err);
    }

    #[test]
    fn test_load_garbage_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path());
        fs::write(store.path_for("Dev"), b"{\"access_token\": \"abc\", \"expi").unwrap();

        let err = assert_err!(store.load("Dev"));
        assert!(matches!(err, StoreError::Corrupt { .. }), "got {:?}", err);
    }

    #[test]
    fn test_load_missing_expire_time_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path());
        fs::write(
            store.path_for("Dev"),
            br#"{"errcode":0,"errmsg":"ok","access_token":"abc","expires_in":7200}"#,
        )
        .unwrap();

        let err = assert_err!(store.load("Dev"));
        assert!(matches!(err, StoreError::Corrupt { .. }), "got {:?}", err);
    }

    #[test]
    fn test_file_format_matches_token_response() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path());
        let token = sample_token();
        store.save("Dev", &token).unwrap();

        let raw = fs::read_to_string(store.path_for("Dev")).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["errcode"], 0);
        assert_eq!(json["errmsg"], "ok");
        assert_eq!(json["access_token"], "abc");
        assert_eq!(json["expires_in"], 7200);
        let expire_time = json["expire_time"].as_str().unwrap();
        let parsed = chrono::DateTime::parse_from_rfc3339(expire_time).unwrap();
        assert_eq!(parsed.with_timezone(&Utc), token.expires_at);
    }

    #[test]
    fn test_save_overwrites_previous_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path());
        store.save("Dev", &sample_token()).unwrap();

        let newer = CachedToken::issued("xyz".to_string(), 60, Utc::now() + Duration::hours(1)).unwrap();
        store.save("Dev", &newer).unwrap();
        assert_eq!(store.load("Dev").unwrap(), newer);
    }

    #[test]
    fn test_save_creates_cache_dir_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let cache_dir = dir.path().join("nested").join("cache");
        let store = FileTokenStore::new(&cache_dir);
        store.save("Dev", &sample_token()).unwrap();

        let entries: Vec<_> = fs::read_dir(&cache_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(entries, vec!["Dev.token.json".to_string()]);
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path());
        store.save("Dev", &sample_token()).unwrap();

        let mode = fs::metadata(store.path_for("Dev"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_save_into_unwritable_location_is_write_error() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the cache directory should be
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"").unwrap();
        let store = FileTokenStore::new(&blocker);

        let err = assert_err!(store.save("Dev", &sample_token()));
        assert!(matches!(err, StoreError::Write { .. }), "got {:?}", err);
    }

    #[test]
    fn test_profiles_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path());
        store.save("Dev", &sample_token()).unwrap();

        assert!(matches!(
            store.load("Prod"),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_encode_profile() {
        assert_eq!(encode_profile("Dev"), "Dev");
        assert_eq!(encode_profile("team-a_1.x"), "team-a_5F1.x");
        assert_eq!(encode_profile("../etc/passwd"), "_2E._2Fetc_2Fpasswd");
        assert_eq!(encode_profile("运维"), "_E8_BF_90_E7_BB_B4");
        assert_eq!(encode_profile(".."), "_2E.");
        assert_eq!(encode_profile(""), "");
    }

    #[test]
    fn test_distinct_profiles_never_share_a_file() {
        let names = ["运维", "告警", "a/b", "a_b", "a_2Fb", "", "_", ".", "..", "Dev", "dev"];
        let mut stems: Vec<String> = names.iter().map(|n| encode_profile(n)).collect();
        stems.sort();
        stems.dedup();
        assert_eq!(stems.len(), names.len(), "stems collided: {:?}", stems);

        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path());
        let now = Utc::now();
        let ops = CachedToken::issued("TOKEN_A".to_string(), 7200, now).unwrap();
        store.save("运维", &ops).unwrap();

        assert!(matches!(store.load("告警"), Err(StoreError::NotFound { .. })));
        assert_ne!(store.path_for("运维"), store.path_for("告警"));
        assert_eq!(store.load("运维").unwrap(), ops);
    }

    #[test]
    fn test_concurrent_saves_never_expose_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path());
        let now = Utc::now();
        let written: Vec<CachedToken> = (0..4)
            .map(|i| CachedToken::issued(format!("token-{}", i), 7200, now).unwrap())
            .collect();

        std::thread::scope(|s| {
            for token in &written {
                let store = store.clone();
                s.spawn(move || {
                    for _ in 0..50 {
                        store.save("Dev", token).unwrap();
                    }
                });
            }

            let store = store.clone();
            s.spawn(move || {
                for _ in 0..500 {
                    match store.load("Dev") {
                        Ok(token) => assert!(token.token.starts_with("token-")),
                        Err(StoreError::NotFound { .. }) => {}
                        Err(e) => panic!("reader saw {:?}", e),
                    }
                }
            });
        });

        let last = store.load("Dev").unwrap();
        assert!(written.contains(&last));

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .filter(|name| name.ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "temp files left: {:?}", leftovers);
    }
}
