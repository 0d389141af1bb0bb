/// Signed uploads to the image host
///
/// Files (receipts, vehicle photos, documents) are uploaded by the browser
/// straight to the image host. The server only hands out short-lived upload
/// parameters signed with the API secret, so the secret never leaves the server.
///
/// The signature is the hex SHA-256 of the sorted parameter string followed by
/// the secret: `sha256("folder=<folder>&timestamp=<unix>" + secret)`.
///
/// # Example
///
/// ```
/// use fleetdesk_shared::integrations::uploads::UploadSigner;
///
/// let signer = UploadSigner::new("fleetdesk", "api-key", "api-secret");
/// let params = signer.sign("receipts", 1_700_000_000).unwrap();
///
/// assert_eq!(params.folder, "receipts");
/// assert_eq!(params.signature.len(), 64);
/// ```

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Folders uploads may target
pub const UPLOAD_FOLDERS: &[&str] = &["receipts", "vehicles", "documents"];

/// Error type for upload signing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    #[error("Uploads to folder '{0}' are not allowed")]
    FolderNotAllowed(String),
}

/// Parameters the browser sends along with the file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedUpload {
    pub timestamp: i64,
    pub folder: String,
    pub signature: String,
    pub api_key: String,
    pub cloud_name: String,
    pub upload_url: String,
}

/// Signs upload parameters with the image-host API secret
#[derive(Clone)]
pub struct UploadSigner {
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

impl std::fmt::Debug for UploadSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadSigner")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .finish_non_exhaustive()
    }
}

impl UploadSigner {
    pub fn new(
        cloud_name: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            cloud_name: cloud_name.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    /// Signs an upload into `folder` at `timestamp` (Unix seconds)
    pub fn sign(&self, folder: &str, timestamp: i64) -> Result<SignedUpload, UploadError> {
        if !UPLOAD_FOLDERS.contains(&folder) {
            return Err(UploadError::FolderNotAllowed(folder.to_string()));
        }

        let to_sign = format!("folder={}&timestamp={}", folder, timestamp);

        let mut hasher = Sha256::new();
        hasher.update(to_sign.as_bytes());
        hasher.update(self.api_secret.as_bytes());
        let signature = hex::encode(hasher.finalize());

        Ok(SignedUpload {
            timestamp,
            folder: folder.to_string(),
            signature,
            api_key: self.api_key.clone(),
            cloud_name: self.cloud_name.clone(),
            upload_url: format!(
                "https://api.cloudinary.com/v1_1/{}/image/upload",
                self.cloud_name
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> UploadSigner {
        UploadSigner::new("fleetdesk", "123456", "secret")
    }

    #[test]
    fn test_signature_matches_manual_digest() {
        let params = signer().sign("receipts", 1_700_000_000).unwrap();

        let expected = hex::encode(Sha256::digest(
            b"folder=receipts&timestamp=1700000000secret",
        ));
        assert_eq!(params.signature, expected);
        assert_eq!(params.api_key, "123456");
        assert_eq!(
            params.upload_url,
            "https://api.cloudinary.com/v1_1/fleetdesk/image/upload"
        );
    }

    #[test]
    fn test_signature_depends_on_inputs() {
        let a = signer().sign("receipts", 1).unwrap();
        let b = signer().sign("receipts", 2).unwrap();
        let c = signer().sign("vehicles", 1).unwrap();

        assert_ne!(a.signature, b.signature);
        assert_ne!(a.signature, c.signature);
    }

    #[test]
    fn test_folder_allowlist() {
        for folder in UPLOAD_FOLDERS {
            assert!(signer().sign(folder, 1).is_ok());
        }

        assert_eq!(
            signer().sign("../secrets", 1),
            Err(UploadError::FolderNotAllowed("../secrets".to_string()))
        );
    }

    #[test]
    fn test_debug_hides_secret() {
        let debug = format!("{:?}", signer());
        assert!(!debug.contains("secret\""));
        assert!(debug.contains("fleetdesk"));
    }
}
