// ABOUTME: Certificate installation into the reverse proxy's watched directory.
// ABOUTME: Bounded search for issued files, restrictive copy, proxy reload.

use glob::glob;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

const CERT_MODE: u32 = 0o640;

/// The issued certificate/key pair as found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertPair {
    pub certificate: PathBuf,
    pub key: PathBuf,
}

/// Errors from certificate installation.
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    #[error("issued certificate files not found for {0}")]
    FilesNotFound(String),

    #[error("failed to install certificate: {0}")]
    Io(#[from] std::io::Error),
}

/// Locate the issued pair under the ACME client's home directory.
///
/// The client's directory naming is not fully predictable (ECC issuance
/// appends a suffix), so the search is layered: the expected path first,
/// then any directory containing the domain name, then a file glob.
pub fn find_issued(home_dir: &Path, domain: &str) -> Result<CertPair, InstallError> {
    // 1. Expected layout: <home>/<domain>/fullchain.cer + <domain>.key
    let expected = home_dir.join(domain);
    if let Some(pair) = pair_in_dir(&expected, domain) {
        return Ok(pair);
    }

    // 2. Any directory whose name contains the domain (e.g. <domain>_ecc)
    if let Ok(entries) = fs::read_dir(home_dir) {
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.contains(domain)
                && let Some(pair) = pair_in_dir(&entry.path(), domain)
            {
                return Ok(pair);
            }
        }
    }

    // 3. Glob for any fullchain with a key sibling mentioning the domain
    let pattern = format!("{}/**/fullchain.cer", home_dir.display());
    if let Ok(paths) = glob(&pattern) {
        for cert in paths.flatten() {
            let Some(dir) = cert.parent() else { continue };
            if !dir.to_string_lossy().contains(domain) {
                continue;
            }
            if let Some(pair) = pair_in_dir(dir, domain) {
                return Ok(pair);
            }
        }
    }

    Err(InstallError::FilesNotFound(domain.to_string()))
}

fn pair_in_dir(dir: &Path, domain: &str) -> Option<CertPair> {
    let certificate = dir.join("fullchain.cer");
    let key = dir.join(format!("{}.key", domain));
    if certificate.is_file() && key.is_file() {
        return Some(CertPair { certificate, key });
    }
    None
}

/// Copy the pair into the proxy certificate directory as
/// `<domain>.crt` / `<domain>.key`, readable by the proxy but nobody else.
pub fn install(pair: &CertPair, cert_dir: &Path, domain: &str) -> Result<(), InstallError> {
    fs::create_dir_all(cert_dir)?;

    let cert_dest = cert_dir.join(format!("{}.crt", domain));
    let key_dest = cert_dir.join(format!("{}.key", domain));

    fs::copy(&pair.certificate, &cert_dest)?;
    fs::copy(&pair.key, &key_dest)?;

    for dest in [&cert_dest, &key_dest] {
        let mut perms = fs::metadata(dest)?.permissions();
        perms.set_mode(CERT_MODE);
        fs::set_permissions(dest, perms)?;
    }

    Ok(())
}

/// Whether the proxy-visible pair for a domain is already in place.
pub fn is_installed(cert_dir: &Path, domain: &str) -> bool {
    cert_dir.join(format!("{}.crt", domain)).is_file()
        && cert_dir.join(format!("{}.key", domain)).is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn issue_fixture(home: &Path, dir_name: &str, domain: &str) {
        let dir = home.join(dir_name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("fullchain.cer"), "CERT").unwrap();
        fs::write(dir.join(format!("{}.key", domain)), "KEY").unwrap();
    }

    #[test]
    fn finds_pair_at_expected_path() {
        let home = tempdir().unwrap();
        issue_fixture(home.path(), "shop.example.org", "shop.example.org");

        let pair = find_issued(home.path(), "shop.example.org").unwrap();
        assert!(pair.certificate.ends_with("shop.example.org/fullchain.cer"));
    }

    #[test]
    fn finds_pair_in_ecc_suffixed_directory() {
        let home = tempdir().unwrap();
        issue_fixture(home.path(), "shop.example.org_ecc", "shop.example.org");

        let pair = find_issued(home.path(), "shop.example.org").unwrap();
        assert!(
            pair.certificate
                .to_string_lossy()
                .contains("shop.example.org_ecc")
        );
    }

    #[test]
    fn missing_pair_is_files_not_found() {
        let home = tempdir().unwrap();
        let err = find_issued(home.path(), "shop.example.org").unwrap_err();
        assert!(matches!(err, InstallError::FilesNotFound(_)));
    }

    #[test]
    fn install_copies_with_restrictive_mode() {
        let home = tempdir().unwrap();
        let certs = tempdir().unwrap();
        issue_fixture(home.path(), "shop.example.org", "shop.example.org");

        let pair = find_issued(home.path(), "shop.example.org").unwrap();
        install(&pair, certs.path(), "shop.example.org").unwrap();

        assert!(is_installed(certs.path(), "shop.example.org"));
        let mode = fs::metadata(certs.path().join("shop.example.org.crt"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, CERT_MODE);
    }
}
