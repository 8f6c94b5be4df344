//! Additional-volume specification parsing.
//!
//! The `--scaleway-volumes` flag carries human-readable sizes such as `50G`
//! (optionally several, space separated). The provider expects volumes keyed
//! by slot index with sizes in bytes.

use std::collections::BTreeMap;

use crate::scaleway::api::VolumeSpec;
use crate::scaleway::error::ScalewayDriverError;

const GIGABYTE: u64 = 1_000_000_000;
const TERABYTE: u64 = 1_000_000_000_000;

/// Volume class used for additional volumes.
const VOLUME_TYPE: &str = "l_ssd";

fn parse_size(token: &str) -> Result<u64, String> {
    let upper = token.to_ascii_uppercase();
    let (digits, unit) = if let Some(rest) = upper.strip_suffix("GB") {
        (rest, GIGABYTE)
    } else if let Some(rest) = upper.strip_suffix("TB") {
        (rest, TERABYTE)
    } else if let Some(rest) = upper.strip_suffix('G') {
        (rest, GIGABYTE)
    } else if let Some(rest) = upper.strip_suffix('T') {
        (rest, TERABYTE)
    } else {
        (upper.as_str(), 1)
    };

    let value: u64 = digits
        .parse()
        .map_err(|_| format!("'{token}' is not a volume size"))?;
    if value == 0 {
        return Err(format!("'{token}' must be a non-zero size"));
    }
    value
        .checked_mul(unit)
        .ok_or_else(|| format!("'{token}' is too large"))
}

/// Parses a volume specification into create-request entries keyed by slot
/// index, starting at `"1"`.
///
/// # Errors
///
/// Returns [`ScalewayDriverError::InvalidVolumeSpec`] when any token is not
/// a positive size with an optional `G`/`GB`/`T`/`TB` suffix.
pub(crate) fn additional_volumes(
    spec: &str,
) -> Result<BTreeMap<String, VolumeSpec>, ScalewayDriverError> {
    let mut volumes = BTreeMap::new();
    for (index, token) in spec.split_whitespace().enumerate() {
        let size = parse_size(token).map_err(|message| ScalewayDriverError::InvalidVolumeSpec {
            spec: spec.to_owned(),
            message,
        })?;
        volumes.insert(
            (index + 1).to_string(),
            VolumeSpec {
                size,
                volume_type: VOLUME_TYPE.to_owned(),
            },
        );
    }
    Ok(volumes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_volume_lands_in_slot_one() {
        let volumes = additional_volumes("50G").unwrap_or_else(|err| panic!("parse: {err}"));
        let spec = volumes.get("1").unwrap_or_else(|| panic!("slot 1 should exist"));
        assert_eq!(spec.size, 50 * GIGABYTE);
        assert_eq!(spec.volume_type, "l_ssd");
    }

    #[test]
    fn multiple_volumes_keep_their_order() {
        let volumes = additional_volumes("50G 1T").unwrap_or_else(|err| panic!("parse: {err}"));
        assert_eq!(volumes.len(), 2);
        assert_eq!(volumes.get("1").map(|spec| spec.size), Some(50 * GIGABYTE));
        assert_eq!(volumes.get("2").map(|spec| spec.size), Some(TERABYTE));
    }

    #[test]
    fn unsuffixed_sizes_are_bytes() {
        let volumes =
            additional_volumes("1000000000").unwrap_or_else(|err| panic!("parse: {err}"));
        assert_eq!(volumes.get("1").map(|spec| spec.size), Some(GIGABYTE));
    }

    #[test]
    fn empty_spec_produces_no_volumes() {
        let volumes = additional_volumes("  ").unwrap_or_else(|err| panic!("parse: {err}"));
        assert!(volumes.is_empty());
    }

    #[test]
    fn rejects_non_numeric_and_zero_sizes() {
        assert!(matches!(
            additional_volumes("fifty"),
            Err(ScalewayDriverError::InvalidVolumeSpec { .. })
        ));
        assert!(matches!(
            additional_volumes("0G"),
            Err(ScalewayDriverError::InvalidVolumeSpec { .. })
        ));
    }
}
