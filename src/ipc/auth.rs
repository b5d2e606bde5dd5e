use anyhow::Result;
use std::path::Path;
use uuid::Uuid;

const TOKEN_FILE: &str = "auth_token";

/// Return this daemon's auth token, minting one on first use.
///
/// The token is 32 hex characters (UUID v4 with the dashes stripped), stored
/// at `{data_dir}/auth_token` with owner-only permissions on Unix. Clients
/// must present it in a `daemon.auth` call before any other method is
/// accepted, so the file is the only thing keeping other local processes off
/// the WebSocket port. An empty or whitespace-only file is treated as
/// missing and replaced.
pub fn get_or_create_token(data_dir: &Path) -> Result<String> {
    let path = data_dir.join(TOKEN_FILE);

    if path.exists() {
        let token = std::fs::read_to_string(&path)?.trim().to_string();
        if !token.is_empty() {
            return Ok(token);
        }
    }

    let token = Uuid::new_v4().to_string().replace('-', "");

    std::fs::create_dir_all(data_dir)?;
    std::fs::write(&path, &token)?;

    // Restrict to owner read/write only on Unix
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))?;
    }

    Ok(token)
}
