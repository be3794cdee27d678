// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Lease-based recompute permissions.

use linkcache_tier::Error;

/// Prefix that keeps lease keys apart from entry keys.
pub const LEASE_PREFIX: &str = "lease:";

/// Takes a lease atomically: set-if-absent, then attach the expiry.
///
/// Replies `1` when the lease was taken, `0` when someone else holds it, and `-1` when the
/// key was created but the expiry could not be attached.
pub(crate) const ACQUIRE_SCRIPT: &str = r"
if redis.call('SETNX', KEYS[1], ARGV[1]) == 0 then
    return 0
end
if redis.call('EXPIRE', KEYS[1], ARGV[2]) == 0 then
    return -1
end
return 1
";

/// Returns the Redis key guarding recomputes of `key`.
#[must_use]
pub fn lease_key(key: &str) -> String {
    format!("{LEASE_PREFIX}{key}")
}

/// Interprets the reply of the acquire script.
///
/// Anything other than `0` or `1` is treated as a failure, so the caller never believes it
/// holds a lease that has no expiry attached.
///
/// # Errors
///
/// Returns an [`ErrorKind::UnexpectedScriptResult`](linkcache_tier::ErrorKind::UnexpectedScriptResult)
/// error for unknown replies.
pub fn classify_reply(reply: i64) -> Result<bool, Error> {
    match reply {
        1 => Ok(true),
        0 => Ok(false),
        other => Err(Error::unexpected_script_result(other)),
    }
}

#[cfg(test)]
mod tests {
    use linkcache_tier::ErrorKind;

    use super::*;

    #[test]
    fn reply_mapping() {
        assert!(classify_reply(1).unwrap());
        assert!(!classify_reply(0).unwrap());
        assert_eq!(classify_reply(-1).unwrap_err().kind(), ErrorKind::UnexpectedScriptResult);
        assert_eq!(classify_reply(7).unwrap_err().kind(), ErrorKind::UnexpectedScriptResult);
    }

    #[test]
    fn lease_keys_are_namespaced() {
        assert_eq!(lease_key("abc123"), "lease:abc123");
    }
}
