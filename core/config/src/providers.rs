//! Provider catalog.
//!
//! Maps the helper's provider-type tags to display names and to whether the
//! provider needs the interactive authorization flow before a first mount
//! (OAuth-style sign-in) or is configured purely from typed-in fields.

/// One supported provider type.
#[derive(Debug, Clone, Copy)]
pub struct ProviderInfo {
    /// The helper's type tag, as written into profile blocks.
    pub tag: &'static str,
    /// Human-readable name for presentation layers.
    pub display_name: &'static str,
    /// Whether an undefined remote of this type needs interactive sign-in.
    pub requires_authorization: bool,
}

/// Built-in provider catalog.
pub const PROVIDERS: &[ProviderInfo] = &[
    ProviderInfo { tag: "drive", display_name: "Google Drive", requires_authorization: true },
    ProviderInfo { tag: "dropbox", display_name: "Dropbox", requires_authorization: true },
    ProviderInfo { tag: "onedrive", display_name: "OneDrive", requires_authorization: true },
    ProviderInfo { tag: "box", display_name: "Box", requires_authorization: true },
    ProviderInfo { tag: "mega", display_name: "Mega", requires_authorization: true },
    ProviderInfo { tag: "pcloud", display_name: "pCloud", requires_authorization: true },
    ProviderInfo { tag: "s3", display_name: "Amazon S3", requires_authorization: false },
    ProviderInfo { tag: "b2", display_name: "Backblaze B2", requires_authorization: false },
    ProviderInfo { tag: "webdav", display_name: "WebDAV", requires_authorization: false },
    ProviderInfo { tag: "ftp", display_name: "FTP", requires_authorization: false },
    ProviderInfo { tag: "sftp", display_name: "SFTP", requires_authorization: false },
];

/// Look up a provider by its type tag.
pub fn find(tag: &str) -> Option<&'static ProviderInfo> {
    PROVIDERS.iter().find(|p| p.tag == tag)
}

/// Whether remotes of this type need the interactive flow when undefined.
///
/// Unknown tags default to `true`: the helper's own wizard can configure
/// any provider it knows about.
pub fn requires_authorization(tag: &str) -> bool {
    find(tag).map(|p| p.requires_authorization).unwrap_or(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_known_tag() {
        let info = find("drive").unwrap();
        assert_eq!(info.display_name, "Google Drive");
        assert!(info.requires_authorization);
    }

    #[test]
    fn test_key_based_providers_skip_authorization() {
        assert!(!requires_authorization("s3"));
        assert!(!requires_authorization("webdav"));
    }

    #[test]
    fn test_unknown_tag_defaults_to_authorization() {
        assert!(requires_authorization("koofr"));
    }
}
