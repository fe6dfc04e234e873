//! Resource path construction.
//!
//! The control plane addresses partitioned objects as `~Common~name`, so a
//! `/` inside a single segment must become `~` before the segments are
//! joined.

pub const MGMT: &str = "mgmt";
pub const CM: &str = "cm";
pub const DEVICE: &str = "device";
pub const LICENSING: &str = "licensing";
pub const POOL: &str = "pool";
pub const INITIAL_ACTIVATION: &str = "initial-activation";
pub const REGKEY: &str = "regkey";
pub const LICENSES: &str = "licenses";
pub const OFFERINGS: &str = "offerings";
pub const MEMBERS: &str = "members";
pub const TASKS: &str = "tasks";
pub const MEMBER_MANAGEMENT: &str = "member-management";
pub const SHARED: &str = "shared";
pub const FILE_TRANSFER: &str = "file-transfer";
pub const UPLOADS: &str = "uploads";
pub const RESOLVER: &str = "resolver";
pub const DEVICE_GROUPS: &str = "device-groups";
pub const ALL_BIGIP_DEVICES: &str = "cm-bigip-allBigIpDevices";
pub const DEVICES: &str = "devices";
pub const REGISTRATION: &str = "registration";
pub const APPSVCS: &str = "appsvcs";
pub const DECLARE: &str = "declare";

/// Join path segments with `/`, replacing any `/` inside a segment with `~`.
///
/// Order is preserved and empty segments are kept as-is.
///
/// ```
/// assert_eq!(bigiq_client::path::encode(&["a/b", "c"]), "a~b/c");
/// ```
pub fn encode<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(|s| s.as_ref().replace('/', "~"))
        .collect::<Vec<_>>()
        .join("/")
}

/// `mgmt/cm/device/licensing/pool/initial-activation`
pub(crate) fn activations() -> String {
    encode(&[MGMT, CM, DEVICE, LICENSING, POOL, INITIAL_ACTIVATION])
}

pub(crate) fn activation(reg_key: &str) -> String {
    encode(&[MGMT, CM, DEVICE, LICENSING, POOL, INITIAL_ACTIVATION, reg_key])
}

/// `mgmt/cm/device/tasks/licensing/pool/member-management`
pub(crate) fn license_tasks() -> String {
    encode(&[MGMT, CM, DEVICE, TASKS, LICENSING, POOL, MEMBER_MANAGEMENT])
}

pub(crate) fn license_task(id: &str) -> String {
    encode(&[MGMT, CM, DEVICE, TASKS, LICENSING, POOL, MEMBER_MANAGEMENT, id])
}

/// `mgmt/cm/device/licensing/pool/regkey/licenses`
pub(crate) fn pools() -> String {
    encode(&[MGMT, CM, DEVICE, LICENSING, POOL, REGKEY, LICENSES])
}

pub(crate) fn pool(pool_id: &str) -> String {
    encode(&[MGMT, CM, DEVICE, LICENSING, POOL, REGKEY, LICENSES, pool_id])
}

pub(crate) fn members(pool_id: &str, reg_key: &str) -> String {
    encode(&[
        MGMT, CM, DEVICE, LICENSING, POOL, REGKEY, LICENSES, pool_id, OFFERINGS, reg_key, MEMBERS,
    ])
}

pub(crate) fn member(pool_id: &str, reg_key: &str, member_id: &str) -> String {
    encode(&[
        MGMT, CM, DEVICE, LICENSING, POOL, REGKEY, LICENSES, pool_id, OFFERINGS, reg_key, MEMBERS,
        member_id,
    ])
}

/// Relative to the `mgmt` namespace: `shared/file-transfer/uploads/<name>`.
pub(crate) fn upload(file_name: &str) -> String {
    encode(&[SHARED, FILE_TRANSFER, UPLOADS, file_name])
}

/// `mgmt/shared/resolver/device-groups/cm-bigip-allBigIpDevices/devices`
pub(crate) fn managed_devices() -> String {
    encode(&[MGMT, SHARED, RESOLVER, DEVICE_GROUPS, ALL_BIGIP_DEVICES, DEVICES])
}

/// Relative to the `mgmt/tm` namespace: `shared/licensing/registration`.
pub(crate) fn license_registration() -> String {
    encode(&[SHARED, LICENSING, REGISTRATION])
}

/// `mgmt/shared/appsvcs/declare`
pub(crate) fn declarations() -> String {
    encode(&[MGMT, SHARED, APPSVCS, DECLARE])
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn embedded_slash_becomes_tilde() {
        assert_eq!(encode(&["a/b", "c"]), "a~b/c");
        assert_eq!(encode(&["/Common/pool1"]), "~Common~pool1");
    }

    #[test]
    fn empty_segments_are_kept() {
        assert_eq!(encode(&["a", "", "b"]), "a//b");
        assert_eq!(encode::<&str>(&[]), "");
    }

    #[test]
    fn resource_paths() {
        assert_eq!(
            member("P1", "KEY1", "M1"),
            "mgmt/cm/device/licensing/pool/regkey/licenses/P1/offerings/KEY1/members/M1"
        );
        assert_eq!(
            license_task("t-1"),
            "mgmt/cm/device/tasks/licensing/pool/member-management/t-1"
        );
        assert_eq!(activation("KEY1"), "mgmt/cm/device/licensing/pool/initial-activation/KEY1");
        assert_eq!(upload("bigip.lic"), "shared/file-transfer/uploads/bigip.lic");
        assert_eq!(
            managed_devices(),
            "mgmt/shared/resolver/device-groups/cm-bigip-allBigIpDevices/devices"
        );
    }

    proptest! {
        #[test]
        fn encode_preserves_order_and_replaces_slashes(
            segments in proptest::collection::vec("[a-z0-9/]{0,8}", 1..6)
        ) {
            let encoded = encode(&segments);
            let parts: Vec<&str> = encoded.split('/').collect();
            prop_assert_eq!(parts.len(), segments.len());
            for (part, original) in parts.iter().zip(&segments) {
                prop_assert_eq!(part.to_string(), original.replace('/', "~"));
            }
        }
    }
}
