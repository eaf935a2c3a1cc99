//! Copy behavior flags and the reader for `settings` blocks
//!
//! By default overwriting target files is disallowed. Two flags adjust that:
//!
//! - `allow-next-target-files-overwrite` / `deny-next-target-files-overwrite` toggle a
//!   sticky flag that applies to every following item until changed again
//! - `no-target-files-overwrite` sets a flag that applies to the current item only
//!
//! Which vocabulary a `settings` block accepts depends on where it appears, see [`Mode`].

use serde::Serialize;

use crate::document::Node;
use crate::ConfigError;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CopySettings {
    bits: u8,
}

impl CopySettings {
    /// Allow target files overwrite, applies to all next items.
    pub const ALLOW_NEXT_OVERWRITE: u8 = 0x01;
    /// Refuse target files overwrite, applies to the current item only.
    pub const NO_OVERWRITE_CURRENT: u8 = 0x02;

    pub fn from_bits(bits: u8) -> Self {
        Self {
            bits: bits & (Self::ALLOW_NEXT_OVERWRITE | Self::NO_OVERWRITE_CURRENT),
        }
    }

    pub fn bits(&self) -> u8 {
        self.bits
    }

    pub fn contains(&self, flag: u8) -> bool {
        self.bits & flag == flag
    }

    pub fn set(&mut self, flag: u8) {
        self.bits |= flag;
    }

    pub fn unset(&mut self, flag: u8) {
        self.bits &= !flag;
    }

    /// Drop the flags that only apply to a single item.
    pub fn clear_current(&mut self) {
        self.unset(Self::NO_OVERWRITE_CURRENT);
    }

    /// Overwrite is permitted only when it was allowed for this scope and not refused for
    /// this particular item.
    pub fn overwrite_allowed(&self) -> bool {
        self.contains(Self::ALLOW_NEXT_OVERWRITE) && !self.contains(Self::NO_OVERWRITE_CURRENT)
    }
}

impl std::fmt::Display for CopySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:08X}", self.bits)
    }
}

/// Vocabulary accepted by a `settings` block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Settings that carry over to the following items (`allow-next-...`/`deny-next-...`).
    NextScope,
    /// Settings for the item that declares them (`no-target-files-overwrite`).
    CurrentItem,
}

/// Apply a `settings` mapping to `settings`.
///
/// `path` names the settings node in error messages, e.g. `exec/copy/settings`.
pub fn read(
    node: &Node<'_>,
    path: &str,
    settings: &mut CopySettings,
    mode: Mode,
) -> Result<(), ConfigError> {
    if !node.is_map() {
        return Err(ConfigError::malformed(path));
    }
    for item in node.children() {
        if !item.key_is("flags") {
            return Err(ConfigError::malformed(path));
        }
        if !item.is_seq() {
            return Err(ConfigError::malformed(format!("{path}/flags")));
        }
        for flag in item.children() {
            let token = flag.val().unwrap_or_default();
            match (mode, token.as_ref()) {
                (Mode::NextScope, "allow-next-target-files-overwrite") => {
                    settings.set(CopySettings::ALLOW_NEXT_OVERWRITE)
                }
                (Mode::NextScope, "deny-next-target-files-overwrite") => {
                    settings.unset(CopySettings::ALLOW_NEXT_OVERWRITE)
                }
                (Mode::CurrentItem, "no-target-files-overwrite") => {
                    settings.set(CopySettings::NO_OVERWRITE_CURRENT)
                }
                _ => {
                    tracing::debug!("unexpected flag {:?} in {} ({:?})", token, path, mode);
                    return Err(ConfigError::malformed(format!("{path}/flags/*")));
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document;

    fn read_yaml(text: &str, mode: Mode, initial: u8) -> Result<CopySettings, ConfigError> {
        let doc = document::parse(text).unwrap();
        let mut settings = CopySettings::from_bits(initial);
        read(&Node::root(&doc), "exec/copy/settings", &mut settings, mode)?;
        Ok(settings)
    }

    #[test]
    fn default_disallows_overwrite() {
        assert!(!CopySettings::default().overwrite_allowed());
    }

    #[test]
    fn overwrite_needs_allow_and_no_current_refusal() {
        let allow = CopySettings::from_bits(CopySettings::ALLOW_NEXT_OVERWRITE);
        assert!(allow.overwrite_allowed());
        let refused = CopySettings::from_bits(
            CopySettings::ALLOW_NEXT_OVERWRITE | CopySettings::NO_OVERWRITE_CURRENT,
        );
        assert!(!refused.overwrite_allowed());
        let mut cleared = refused;
        cleared.clear_current();
        assert!(cleared.overwrite_allowed());
    }

    #[test]
    fn next_scope_vocabulary() {
        let settings = read_yaml(
            "flags: [allow-next-target-files-overwrite]",
            Mode::NextScope,
            0,
        )
        .unwrap();
        assert_eq!(settings.bits(), CopySettings::ALLOW_NEXT_OVERWRITE);
        let settings = read_yaml(
            "flags: [deny-next-target-files-overwrite]",
            Mode::NextScope,
            0x03,
        )
        .unwrap();
        assert_eq!(settings.bits(), CopySettings::NO_OVERWRITE_CURRENT);
    }

    #[test]
    fn tokens_apply_in_order() {
        let settings = read_yaml(
            "flags:\n  - allow-next-target-files-overwrite\n  - deny-next-target-files-overwrite\n",
            Mode::NextScope,
            0,
        )
        .unwrap();
        assert_eq!(settings.bits(), 0);
    }

    #[test]
    fn current_item_vocabulary() {
        let settings =
            read_yaml("flags: [no-target-files-overwrite]", Mode::CurrentItem, 0x01).unwrap();
        assert_eq!(settings.bits(), 0x03);
    }

    #[test]
    fn vocabularies_do_not_mix() {
        let error = read_yaml("flags: [no-target-files-overwrite]", Mode::NextScope, 0)
            .unwrap_err();
        assert_eq!(error.to_string(), "malformed config: `exec/copy/settings/flags/*`");
        assert!(read_yaml(
            "flags: [allow-next-target-files-overwrite]",
            Mode::CurrentItem,
            0
        )
        .is_err());
    }

    #[test]
    fn malformed_shapes_name_their_path() {
        let error = read_yaml("flags: allow-next-target-files-overwrite", Mode::NextScope, 0)
            .unwrap_err();
        assert_eq!(error.to_string(), "malformed config: `exec/copy/settings/flags`");
        let error = read_yaml("other: []", Mode::NextScope, 0).unwrap_err();
        assert_eq!(error.to_string(), "malformed config: `exec/copy/settings`");
        let error = read_yaml("- flags", Mode::NextScope, 0).unwrap_err();
        assert_eq!(error.to_string(), "malformed config: `exec/copy/settings`");
    }

    #[test]
    fn display_is_hex() {
        assert_eq!(CopySettings::from_bits(0x03).to_string(), "00000003");
    }
}
