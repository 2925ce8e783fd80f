use configtx_tree::ConfigGroup;
use tracing::debug;

use crate::{
    ADMINS_POLICY_KEY, ConfigTxError,
    payload::{CodecError, ValuePayload},
};

/// Decode the value of type `T` held by `group`, if there is one.
pub(crate) fn read_value<T: ValuePayload>(group: &ConfigGroup) -> Result<Option<T>, CodecError> {
    group
        .value(T::KEY)
        .map(|value| T::decode(&value.value))
        .transpose()
}

/// Encode `payload` and store it in `group` under its context key.
///
/// An existing non-empty mod-policy is kept; otherwise the value is guarded
/// by `Admins`.
pub(crate) fn write_value<T: ValuePayload>(
    group: &mut ConfigGroup,
    payload: &T,
) -> Result<(), ConfigTxError> {
    let bytes = payload
        .encode()
        .map_err(|error| ConfigTxError::InvalidArgument(error.to_string()))?;
    let mod_policy = group
        .value(T::KEY)
        .map(|value| value.mod_policy.as_str())
        .filter(|mod_policy| !mod_policy.is_empty())
        .unwrap_or(ADMINS_POLICY_KEY)
        .to_string();

    let written = group.set_value(T::KEY, bytes, mod_policy);
    debug!(value = T::KEY, version = written.version, "Set value");
    Ok(())
}
